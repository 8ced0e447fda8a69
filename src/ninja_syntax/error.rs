//! Validation errors raised while rendering build-IR nodes.

use miette::Diagnostic;
use thiserror::Error;

/// Errors raised by [`super::Rule`].
#[derive(Debug, Error, Diagnostic, Clone, PartialEq, Eq)]
pub enum RuleError {
    /// The variable is not one Ninja accepts inside a rule block.
    #[error("{variable} is not a recognised variable in rule {rule}")]
    #[diagnostic(code(multitree::ninja_syntax::unknown_rule_variable))]
    UnknownVariable {
        /// Rule being configured.
        rule: String,
        /// Rejected variable name.
        variable: String,
    },
    /// The rule was rendered before a `command` was added.
    #[error("command is required in rule {rule}")]
    #[diagnostic(code(multitree::ninja_syntax::missing_command))]
    MissingCommand {
        /// Rule missing its command.
        rule: String,
    },
}

/// Errors raised by [`super::BuildAction`].
#[derive(Debug, Error, Diagnostic, Clone, PartialEq, Eq)]
pub enum BuildActionError {
    /// The build statement has no output path.
    #[error("output is required in a build statement using rule {rule:?}")]
    #[diagnostic(code(multitree::ninja_syntax::missing_output))]
    MissingOutput {
        /// Rule named by the statement, possibly empty.
        rule: String,
    },
    /// The build statement has no rule name.
    #[error("rule is required in the build statement for {output}")]
    #[diagnostic(code(multitree::ninja_syntax::missing_rule))]
    MissingRule {
        /// Output of the offending statement.
        output: String,
    },
}

/// Any failure to render a build-IR node.
#[derive(Debug, Error, Diagnostic, Clone, PartialEq, Eq)]
pub enum SyntaxError {
    /// Invalid rule.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Rule(#[from] RuleError),
    /// Invalid build statement.
    #[error(transparent)]
    #[diagnostic(transparent)]
    BuildAction(#[from] BuildActionError),
}
