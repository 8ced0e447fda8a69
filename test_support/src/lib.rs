//! Test utilities for driving the orchestrator end to end.
//!
//! Provides a temporary [`Workspace`], scripted [`FakeInnerTree`] entry
//! points and a fake build runner. Everything here shells out to `/bin/sh`,
//! so the helpers are Unix-only.

pub mod inner_tree;
pub mod workspace;

pub use inner_tree::FakeInnerTree;
pub use workspace::Workspace;

use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use multitree_env::NINJA_ENV;
use std::fs;

/// File the fake runner records its arguments in, next to the script.
pub const NINJA_ARGS_FILE: &str = "ninja.args";

/// Write an executable `/bin/sh` script to `path`.
///
/// # Errors
///
/// Returns an error when the script cannot be written or made executable.
pub fn write_script(path: &Utf8Path, body: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("create {parent}"))?;
    }
    fs::write(path, format!("#!/bin/sh\n{body}\n")).with_context(|| format!("write {path}"))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o755))
            .with_context(|| format!("chmod {path}"))?;
    }
    Ok(())
}

/// Create a fake runner in `dir` that records its arguments and exits with
/// `exit_code`.
///
/// # Errors
///
/// Returns an error when the script cannot be written.
pub fn fake_ninja(dir: &Utf8Path, exit_code: i32) -> Result<Utf8PathBuf> {
    let path = dir.join("fake-ninja");
    write_script(
        &path,
        &format!("echo \"$@\" > \"$(dirname \"$0\")/{NINJA_ARGS_FILE}\"\nexit {exit_code}"),
    )?;
    Ok(path)
}

/// Arguments the fake runner in `dir` was last called with.
#[must_use]
pub fn recorded_ninja_args(dir: &Utf8Path) -> Option<String> {
    fs::read_to_string(dir.join(NINJA_ARGS_FILE))
        .ok()
        .map(|text| text.trim_end().to_owned())
}

/// Environment pointing the orchestrator at `ninja`.
#[must_use]
pub fn runner_env(ninja: &Utf8Path) -> [(&'static str, String); 1] {
    [(NINJA_ENV, ninja.to_string())]
}
