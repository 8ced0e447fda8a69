//! Rule blocks: named command templates.

use super::{RuleError, Variable, sorted_lines};

/// Variables Ninja accepts inside a `rule` block.
pub const RULE_VARIABLES: [&str; 10] = [
    "command",
    "depfile",
    "deps",
    "description",
    "dyndep",
    "generator",
    "msvc_deps_prefix",
    "restat",
    "rspfile",
    "rspfile_content",
];

/// A named command template.
///
/// Variables are restricted to [`RULE_VARIABLES`] and rendered in name order,
/// so output does not depend on the order they were added in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    name: String,
    variables: Vec<Variable>,
}

impl Rule {
    /// Start an empty rule called `name`.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            variables: Vec::new(),
        }
    }

    /// Start a rule already bound to `command`.
    #[must_use]
    pub fn with_command(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            variables: vec![Variable::indented("command", command, 1)],
        }
    }

    /// Rule name as referenced by build statements.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Bind a rule variable.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::UnknownVariable`] when `name` is not listed in
    /// [`RULE_VARIABLES`].
    pub fn add_variable(
        &mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<&mut Self, RuleError> {
        let name = name.into();
        if !RULE_VARIABLES.contains(&name.as_str()) {
            return Err(RuleError::UnknownVariable {
                rule: self.name.clone(),
                variable: name,
            });
        }
        self.variables.push(Variable::indented(name, value, 1));
        Ok(self)
    }

    /// Render the rule header followed by its sorted variables.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::MissingCommand`] when no `command` was bound.
    pub fn lines(&self) -> Result<Vec<String>, RuleError> {
        if !self.variables.iter().any(|var| var.name() == "command") {
            return Err(RuleError::MissingCommand {
                rule: self.name.clone(),
            });
        }
        let mut lines = vec![format!("rule {}", self.name)];
        lines.extend(sorted_lines(&self.variables));
        Ok(lines)
    }
}
