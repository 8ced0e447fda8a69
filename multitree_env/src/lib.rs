#![forbid(unsafe_code)]

//! Shared environment constants used across multitree crates (library, tests,
//! and helpers).

/// Environment variable naming the orchestrator output directory.
///
/// Relative values are resolved against the workspace root. When unset the
/// orchestrator writes to [`DEFAULT_OUT_DIR`].
pub const OUT_DIR_ENV: &str = "OUT_DIR";

/// Output directory used when [`OUT_DIR_ENV`] is not set.
pub const DEFAULT_OUT_DIR: &str = "out";

/// Environment variable holding the combo file selected by `lunch`.
///
/// # Examples
///
/// ```
/// use multitree_env::COMBO_ENV;
/// assert_eq!(COMBO_ENV, "TARGET_BUILD_COMBO");
/// ```
pub const COMBO_ENV: &str = "TARGET_BUILD_COMBO";

/// Environment variable override for the Ninja executable.
pub const NINJA_ENV: &str = "MULTITREE_NINJA";

/// Environment variable override for the tool used by `copy_file` rules.
pub const COPY_TOOL_ENV: &str = "MULTITREE_COPY_TOOL";
