//! Choosing between accessible and standard status output.

use std::ffi::OsString;

/// How status updates are presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Static labelled lines, for screen readers, dumb terminals and CI.
    Accessible,
    /// Progress lines redrawn in place.
    Standard,
}

/// Resolve the output mode.
///
/// An explicit choice wins. Otherwise `NO_COLOR` (set to anything, even
/// empty) or `TERM=dumb` selects accessible output.
///
/// # Examples
///
/// ```
/// use multitree::status::{OutputMode, resolve_output_mode_with};
///
/// assert_eq!(resolve_output_mode_with(Some(false), |_| None), OutputMode::Standard);
/// let dumb = resolve_output_mode_with(None, |key| (key == "TERM").then(|| "dumb".into()));
/// assert_eq!(dumb, OutputMode::Accessible);
/// ```
pub fn resolve_output_mode_with<F>(explicit: Option<bool>, mut read_env: F) -> OutputMode
where
    F: FnMut(&str) -> Option<OsString>,
{
    let accessible = explicit.unwrap_or_else(|| {
        read_env("NO_COLOR").is_some() || read_env("TERM").is_some_and(|term| term == "dumb")
    });
    if accessible {
        OutputMode::Accessible
    } else {
        OutputMode::Standard
    }
}
