//! Configuration errors with include-chain locations.

use camino::{Utf8Path, Utf8PathBuf};
use miette::Diagnostic;
use std::fmt;
use thiserror::Error;

/// Indentation used for `included from` lines.
const INCLUDE_INDENT: &str = "        ";

/// Why a configuration could not be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigErrorKind {
    /// No combo could be identified from the arguments or environment.
    Identify,
    /// A combo file is not a valid JSON object.
    Parse,
    /// The inheritance chain revisits a file that is still loading.
    Cycle,
    /// The merged configuration is not usable.
    Validate,
    /// A combo file could not be read.
    Io,
}

impl ConfigErrorKind {
    /// Stable lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Identify => "identify",
            Self::Parse => "parse",
            Self::Cycle => "cycle",
            Self::Validate => "validate",
            Self::Io => "io",
        }
    }
}

impl fmt::Display for ConfigErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A configuration failure and the chain of files that led to it.
///
/// `locations` is innermost first: the file at fault, then each file that
/// inherited it on the way back to the combo that was requested.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
#[error("{}", render(.locations, .line, .message))]
#[diagnostic(code(multitree::lunch::config))]
pub struct ConfigError {
    kind: ConfigErrorKind,
    message: String,
    locations: Vec<Utf8PathBuf>,
    line: Option<usize>,
}

impl ConfigError {
    /// Create an error of `kind` with no location.
    #[must_use]
    pub fn new(kind: ConfigErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            locations: Vec::new(),
            line: None,
        }
    }

    /// Attach the file at fault.
    #[must_use]
    pub fn at(mut self, file: &Utf8Path) -> Self {
        self.locations.insert(0, file.to_owned());
        self
    }

    /// Attach the line within the file at fault.
    #[must_use]
    pub const fn with_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }

    /// Record that the failing file was reached through `file`.
    #[must_use]
    pub fn included_from(mut self, file: &Utf8Path) -> Self {
        self.locations.push(file.to_owned());
        self
    }

    /// Failure category.
    #[must_use]
    pub const fn kind(&self) -> ConfigErrorKind {
        self.kind
    }

    /// Message without location information.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Files from the one at fault outwards.
    #[must_use]
    pub fn locations(&self) -> &[Utf8PathBuf] {
        &self.locations
    }
}

fn render(locations: &[Utf8PathBuf], line: &Option<usize>, message: &str) -> String {
    let Some((first, rest)) = locations.split_first() else {
        return message.to_owned();
    };
    let mut out = match *line {
        Some(line) => format!("{first}:{line}: {message}"),
        None => format!("{first}: {message}"),
    };
    for location in rest {
        out.push('\n');
        out.push_str(INCLUDE_INDENT);
        out.push_str("included from ");
        out.push_str(location.as_str());
    }
    out
}
