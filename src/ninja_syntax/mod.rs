//! Build-IR node model.
//!
//! Each node describes one construct of a Ninja build file: a variable, a
//! rule, a build statement, a pool, a `subninja` include or a free-form line.
//! Nodes are cheap to assemble incrementally; validation happens only when a
//! node is rendered, so a half-configured [`Rule`] can be passed around before
//! its `command` is known.
//!
//! # Examples
//!
//! ```
//! use multitree::ninja_syntax::{Node, Rule};
//!
//! let mut rule = Rule::new("touch");
//! rule.add_variable("command", "touch $out").expect("command is allowed");
//! let lines = Node::from(rule).lines().expect("rule is complete");
//! assert_eq!(lines, vec!["rule touch", "  command = touch $out"]);
//! ```

mod build_action;
mod error;
mod rule;

pub use build_action::BuildAction;
pub use error::{BuildActionError, RuleError, SyntaxError};
pub use rule::{RULE_VARIABLES, Rule};

/// Indentation emitted for each nesting level.
pub const INDENT: &str = "  ";

/// A `name = value` binding, optionally indented under a rule or build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    name: String,
    value: String,
    indent: usize,
}

impl Variable {
    /// Create a top-level variable.
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::indented(name, value, 0)
    }

    /// Create a variable nested `indent` levels deep.
    #[must_use]
    pub fn indented(name: impl Into<String>, value: impl Into<String>, indent: usize) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            indent,
        }
    }

    /// Variable name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Bound value, emitted verbatim.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Render the single line for this binding.
    #[must_use]
    pub fn line(&self) -> String {
        format!("{}{} = {}", INDENT.repeat(self.indent), self.name, self.value)
    }
}

/// A concurrency-limiting pool declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pool {
    name: String,
    depth: u32,
}

impl Pool {
    /// Declare pool `name` admitting at most `depth` concurrent jobs.
    #[must_use]
    pub fn new(name: impl Into<String>, depth: u32) -> Self {
        Self {
            name: name.into(),
            depth,
        }
    }

    fn lines(&self) -> Vec<String> {
        vec![
            format!("pool {}", self.name),
            Variable::indented("depth", self.depth.to_string(), 1).line(),
        ]
    }
}

/// Include of another build file sharing this file's scope rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subninja {
    path: String,
}

impl Subninja {
    /// Include the build file at `path`.
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the included file.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }
}

/// A verbatim line: comments, blank lines and `default` statements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line(String);

impl Line {
    /// Wrap `text` as a single output line.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }
}

/// Closed set of build-IR constructs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// Top-level or nested binding.
    Variable(Variable),
    /// Named command template.
    Rule(Rule),
    /// Build statement.
    BuildAction(BuildAction),
    /// Pool declaration.
    Pool(Pool),
    /// Included build file.
    Subninja(Subninja),
    /// Free-form line.
    Line(Line),
}

impl Node {
    /// Render the node into its output lines.
    ///
    /// # Errors
    ///
    /// Returns [`SyntaxError`] when a rule lacks a `command` or a build action
    /// lacks an output or rule name.
    pub fn lines(&self) -> Result<Vec<String>, SyntaxError> {
        match self {
            Self::Variable(variable) => Ok(vec![variable.line()]),
            Self::Rule(rule) => Ok(rule.lines()?),
            Self::BuildAction(action) => Ok(action.lines()?),
            Self::Pool(pool) => Ok(pool.lines()),
            Self::Subninja(subninja) => Ok(vec![format!("subninja {}", escape_path(&subninja.path))]),
            Self::Line(Line(text)) => Ok(vec![text.clone()]),
        }
    }
}

macro_rules! node_from {
    ($($variant:ident),* $(,)?) => {
        $(
            impl From<$variant> for Node {
                fn from(value: $variant) -> Self {
                    Self::$variant(value)
                }
            }
        )*
    };
}

node_from!(Variable, Rule, BuildAction, Pool, Subninja, Line);

/// Escape a path for use in a `build` or `subninja` statement.
///
/// Ninja treats `$`, spaces and colons specially in path lists.
///
/// # Examples
///
/// ```
/// use multitree::ninja_syntax::escape_path;
/// assert_eq!(escape_path("a b:c$d"), "a$ b$:c$$d");
/// ```
#[must_use]
pub fn escape_path(path: &str) -> String {
    let mut escaped = String::with_capacity(path.len());
    for ch in path.chars() {
        match ch {
            '$' => escaped.push_str("$$"),
            ' ' => escaped.push_str("$ "),
            ':' => escaped.push_str("$:"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Sort variables by name, keeping insertion order among equal names.
fn sorted_lines(variables: &[Variable]) -> impl Iterator<Item = String> + '_ {
    let mut sorted: Vec<&Variable> = variables.iter().collect();
    sorted.sort_by(|a, b| a.name.cmp(&b.name));
    sorted.into_iter().map(Variable::line)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, reason = "rendering tests assert on known-good nodes")]

    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Variable::new("cc", "clang"), "cc = clang")]
    #[case(Variable::indented("depth", "4", 1), "  depth = 4")]
    #[case(Variable::indented("x", "", 2), "    x = ")]
    fn variable_renders_with_indent(#[case] variable: Variable, #[case] expected: &str) {
        assert_eq!(variable.line(), expected);
    }

    #[rstest]
    fn pool_renders_depth() {
        let lines = Node::from(Pool::new("link", 2)).lines().expect("pool renders");
        assert_eq!(lines, vec!["pool link", "  depth = 2"]);
    }

    #[rstest]
    fn subninja_and_line_render_verbatim() {
        let sub = Node::from(Subninja::new("out/api surfaces.ninja"))
            .lines()
            .expect("subninja renders");
        assert_eq!(sub, vec!["subninja out/api$ surfaces.ninja"]);
        let line = Node::from(Line::new("# generated")).lines().expect("line renders");
        assert_eq!(line, vec!["# generated"]);
    }

    #[rstest]
    fn incomplete_rule_fails_through_node() {
        let err = Node::from(Rule::new("cc")).lines().expect_err("missing command");
        assert!(matches!(err, SyntaxError::Rule(RuleError::MissingCommand { .. })));
    }
}
