//! Build statements.

use super::{BuildActionError, Variable, escape_path, sorted_lines};
use itertools::Itertools;

/// A `build` statement producing `output` with `rule`.
///
/// Inputs, implicit dependencies and order-only dependencies are each emitted
/// only when non-empty, in `in | implicit || order-only` order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildAction {
    output: String,
    rule: String,
    inputs: Vec<String>,
    implicits: Vec<String>,
    order_only: Vec<String>,
    variables: Vec<Variable>,
}

impl BuildAction {
    /// Start a build statement for `output` using `rule`.
    #[must_use]
    pub fn new(output: impl Into<String>, rule: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            rule: rule.into(),
            inputs: Vec::new(),
            implicits: Vec::new(),
            order_only: Vec::new(),
            variables: Vec::new(),
        }
    }

    /// Set the explicit inputs.
    #[must_use]
    pub fn with_inputs<I, S>(mut self, inputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inputs = inputs.into_iter().map(Into::into).collect();
        self
    }

    /// Set the implicit dependencies.
    #[must_use]
    pub fn with_implicits<I, S>(mut self, implicits: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.implicits = implicits.into_iter().map(Into::into).collect();
        self
    }

    /// Set the order-only dependencies.
    #[must_use]
    pub fn with_order_only<I, S>(mut self, order_only: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.order_only = order_only.into_iter().map(Into::into).collect();
        self
    }

    /// Bind a per-statement variable. Any name is accepted.
    pub fn add_variable(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.variables.push(Variable::indented(name, value, 1));
        self
    }

    /// Output path.
    #[must_use]
    pub fn output(&self) -> &str {
        &self.output
    }

    /// Rule name.
    #[must_use]
    pub fn rule(&self) -> &str {
        &self.rule
    }

    /// Render the statement and its sorted variables.
    ///
    /// # Errors
    ///
    /// Returns [`BuildActionError`] when the output or rule is empty.
    pub fn lines(&self) -> Result<Vec<String>, BuildActionError> {
        if self.output.is_empty() {
            return Err(BuildActionError::MissingOutput {
                rule: self.rule.clone(),
            });
        }
        if self.rule.is_empty() {
            return Err(BuildActionError::MissingRule {
                output: self.output.clone(),
            });
        }
        let mut statement = format!("build {}: {}", escape_path(&self.output), self.rule);
        if !self.inputs.is_empty() {
            statement.push(' ');
            statement.push_str(&join_paths(&self.inputs));
        }
        if !self.implicits.is_empty() {
            statement.push_str(" | ");
            statement.push_str(&join_paths(&self.implicits));
        }
        if !self.order_only.is_empty() {
            statement.push_str(" || ");
            statement.push_str(&join_paths(&self.order_only));
        }
        let mut lines = vec![statement];
        lines.extend(sorted_lines(&self.variables));
        Ok(lines)
    }
}

fn join_paths(paths: &[String]) -> String {
    paths.iter().map(|path| escape_path(path)).join(" ")
}
