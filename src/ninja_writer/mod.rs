//! Ordered build-IR writer.
//!
//! [`NinjaWriter`] owns a sequence of [`Node`]s in emission order and layers a
//! few helpers on top: phony targets, a memoized `copy_file` rule and global
//! phonies that many call sites can extend. Nothing touches disk until the
//! whole file has rendered successfully.

mod file_io;

pub use file_io::write_ninja_file;

use crate::ninja_syntax::{BuildAction, Line, Node, Pool, Rule, Subninja, SyntaxError, Variable};
use camino::{Utf8Path, Utf8PathBuf};
use miette::Diagnostic;
use std::collections::BTreeMap;
use thiserror::Error;

/// Name of the shared copy rule registered by [`NinjaWriter::add_copy_file`].
pub const COPY_FILE_RULE: &str = "copy_file";
/// Reserved rule name Ninja treats as an alias.
pub const PHONY_RULE: &str = "phony";
/// Copy program used when none is configured.
pub const DEFAULT_COPY_TOOL: &str = "cp";

/// Wrapper around rendered build file text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NinjaContent(String);

impl NinjaContent {
    /// Store the provided build file text.
    #[must_use]
    pub const fn new(content: String) -> Self {
        Self(content)
    }

    /// Borrow the underlying text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the wrapper returning the owned text.
    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

/// Failure to render or persist a build file.
#[derive(Debug, Error, Diagnostic)]
pub enum NinjaWriteError {
    /// A node failed validation; nothing was written.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Syntax(#[from] SyntaxError),
    /// The rendered file could not be written.
    #[error("failed to write build file {path}")]
    #[diagnostic(code(multitree::ninja_writer::io))]
    Io {
        /// Destination path.
        path: Utf8PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
}

/// Ordered collection of build-IR nodes.
#[derive(Debug, Clone)]
pub struct NinjaWriter {
    nodes: Vec<Node>,
    copy_tool: String,
    copy_rule_registered: bool,
    global_phonies: BTreeMap<String, Vec<String>>,
}

impl Default for NinjaWriter {
    fn default() -> Self {
        Self::new(DEFAULT_COPY_TOOL)
    }
}

impl NinjaWriter {
    /// Create an empty writer whose copy rule invokes `copy_tool`.
    #[must_use]
    pub fn new(copy_tool: impl Into<String>) -> Self {
        Self {
            nodes: Vec::new(),
            copy_tool: copy_tool.into(),
            copy_rule_registered: false,
            global_phonies: BTreeMap::new(),
        }
    }

    /// Nodes in emission order.
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Append any node.
    pub fn add_node(&mut self, node: impl Into<Node>) -> &mut Self {
        self.nodes.push(node.into());
        self
    }

    /// Append a top-level variable.
    pub fn add_variable(&mut self, variable: Variable) -> &mut Self {
        self.add_node(variable)
    }

    /// Append a rule.
    pub fn add_rule(&mut self, rule: Rule) -> &mut Self {
        self.add_node(rule)
    }

    /// Append a build statement.
    pub fn add_build_action(&mut self, action: BuildAction) -> &mut Self {
        self.add_node(action)
    }

    /// Append a pool declaration.
    pub fn add_pool(&mut self, pool: Pool) -> &mut Self {
        self.add_node(pool)
    }

    /// Append a `subninja` include.
    pub fn add_subninja(&mut self, subninja: Subninja) -> &mut Self {
        self.add_node(subninja)
    }

    /// Append `# text`.
    pub fn add_comment(&mut self, text: &str) -> &mut Self {
        self.add_node(Line::new(format!("# {text}")))
    }

    /// Append a `default` statement naming `targets`.
    pub fn add_default<I, S>(&mut self, targets: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut line = String::from("default");
        for target in targets {
            line.push(' ');
            line.push_str(&crate::ninja_syntax::escape_path(target.as_ref()));
        }
        self.add_node(Line::new(line))
    }

    /// Append a blank line.
    pub fn add_newline(&mut self) -> &mut Self {
        self.add_node(Line::new(""))
    }

    /// Append `build name: phony deps...`.
    pub fn add_phony<I, S>(&mut self, name: impl Into<String>, deps: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.add_build_action(BuildAction::new(name, PHONY_RULE).with_inputs(deps))
    }

    /// Copy `src` to `dest`, creating the destination directory first.
    ///
    /// The shared [`COPY_FILE_RULE`] is declared on the first call only, so
    /// `N` copies produce one rule and `N` build statements.
    pub fn add_copy_file(&mut self, dest: &Utf8Path, src: &Utf8Path) -> &mut Self {
        if !self.copy_rule_registered {
            self.add_rule(copy_file_rule(&self.copy_tool));
            self.copy_rule_registered = true;
        }
        let out_dir = dest.parent().map_or("", Utf8Path::as_str);
        let mut action = BuildAction::new(dest.as_str(), COPY_FILE_RULE).with_inputs([src.as_str()]);
        action.add_variable("out_dir", out_dir);
        self.add_build_action(action)
    }

    /// Add `deps` to the global phony `name`.
    ///
    /// Global phonies are emitted after every other node, sorted by name.
    /// Repeated dependencies are recorded once.
    pub fn add_global_phony<I, S>(&mut self, name: &str, deps: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let entry = self.global_phonies.entry(name.to_owned()).or_default();
        for dep in deps.into_iter().map(Into::<String>::into) {
            if !entry.contains(&dep) {
                entry.push(dep);
            }
        }
        self
    }

    /// Serialize every node in insertion order, then the global phonies.
    ///
    /// # Errors
    ///
    /// Returns the first [`SyntaxError`] raised by an invalid node.
    pub fn render(&self) -> Result<NinjaContent, SyntaxError> {
        let mut out = String::new();
        for node in &self.nodes {
            push_lines(&mut out, node)?;
        }
        for (name, deps) in &self.global_phonies {
            let phony = BuildAction::new(name.as_str(), PHONY_RULE).with_inputs(deps.iter().cloned());
            push_lines(&mut out, &Node::from(phony))?;
        }
        Ok(NinjaContent::new(out))
    }

    /// Render and write the build file to `path`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns [`NinjaWriteError::Syntax`] before touching the filesystem when
    /// any node is invalid, or [`NinjaWriteError::Io`] when writing fails.
    pub fn write_file(&self, path: &Utf8Path) -> Result<(), NinjaWriteError> {
        let content = self.render()?;
        write_ninja_file(path, &content).map_err(|source| NinjaWriteError::Io {
            path: path.to_owned(),
            source,
        })
    }
}

fn copy_file_rule(copy_tool: &str) -> Rule {
    Rule::with_command(
        COPY_FILE_RULE,
        format!("mkdir -p ${{out_dir}} && {copy_tool} -f ${{in}} ${{out}}"),
    )
}

fn push_lines(out: &mut String, node: &Node) -> Result<(), SyntaxError> {
    for line in node.lines()? {
        out.push_str(&line);
        out.push('\n');
    }
    Ok(())
}
