//! Errors raised while assembling API surfaces.

use super::StubLanguage;
use crate::ninja_writer::NinjaWriteError;
use camino::Utf8PathBuf;
use miette::Diagnostic;
use std::io;
use thiserror::Error;

/// A contribution key naming a language with no assembler.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
#[error("unsupported stub library language `{key}`")]
#[diagnostic(
    code(multitree::api_assembly::unsupported_language),
    help("supported keys are cc_libraries, java_libraries and resource_libraries")
)]
pub struct UnsupportedLanguage {
    /// Key as written in the contribution.
    pub key: String,
}

/// Failure to collate or assemble API contributions.
#[derive(Debug, Error, Diagnostic)]
pub enum AssemblyError {
    /// A contribution directory could not be listed.
    #[error("failed to list contributions in {path}")]
    #[diagnostic(code(multitree::api_assembly::read_dir))]
    ReadDir {
        /// Directory being listed.
        path: Utf8PathBuf,
        /// Underlying failure.
        #[source]
        source: io::Error,
    },
    /// A contribution document could not be read.
    #[error("failed to read contribution {path}")]
    #[diagnostic(code(multitree::api_assembly::read))]
    ReadContribution {
        /// Document path.
        path: Utf8PathBuf,
        /// Underlying failure.
        #[source]
        source: io::Error,
    },
    /// A contribution document is malformed.
    #[error("malformed contribution {path}")]
    #[diagnostic(code(multitree::api_assembly::parse))]
    ParseContribution {
        /// Document path.
        path: Utf8PathBuf,
        /// Parser failure.
        #[source]
        source: serde_json::Error,
    },
    /// A contribution declares libraries for an unknown language.
    #[error("contribution {path} cannot be assembled")]
    #[diagnostic(code(multitree::api_assembly::language))]
    UnsupportedLanguage {
        /// Document path.
        path: Utf8PathBuf,
        /// The offending key.
        #[source]
        source: UnsupportedLanguage,
    },
    /// A handler was given a library of another language.
    #[error("{library} was dispatched to the {expected} assembler")]
    #[diagnostic(code(multitree::api_assembly::language_mismatch))]
    LanguageMismatch {
        /// Language the handler assembles.
        expected: StubLanguage,
        /// Library name.
        library: String,
    },
    /// The API build file could not be written.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Write(#[from] NinjaWriteError),
}
