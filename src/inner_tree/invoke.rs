//! Driving an inner tree through its entry point.

use super::{ENTRYPOINT, InnerTree};
use crate::context::RunContext;
use crate::process::{display_command, run_inherited};
use camino::{Utf8Path, Utf8PathBuf};
use miette::Diagnostic;
use std::io;
use std::process::{Command, ExitStatus};
use thiserror::Error;
use tracing::debug;

/// Failure to run an inner tree command.
#[derive(Debug, Error, Diagnostic)]
pub enum InvokeError {
    /// The tree has no executable entry point.
    #[error("inner tree {root} has no executable {entrypoint}")]
    #[diagnostic(
        code(multitree::inner_tree::missing_entrypoint),
        help("each inner tree must provide an executable `.inner_build` at its root")
    )]
    MissingEntrypoint {
        /// Workspace-relative tree root.
        root: Utf8PathBuf,
        /// Entry point that was expected.
        entrypoint: Utf8PathBuf,
    },
    /// The entry point could not be started.
    #[error("failed to start inner tree {root}")]
    #[diagnostic(code(multitree::inner_tree::spawn))]
    Spawn {
        /// Workspace-relative tree root.
        root: Utf8PathBuf,
        /// Underlying failure.
        #[source]
        source: io::Error,
    },
    /// The entry point exited unsuccessfully.
    #[error("inner tree {root} failed: `{command}` exited with {status}")]
    #[diagnostic(code(multitree::inner_tree::failed))]
    Failed {
        /// Workspace-relative tree root.
        root: Utf8PathBuf,
        /// Command line that failed.
        command: String,
        /// Exit status of the entry point.
        status: ExitStatus,
    },
}

#[cfg(unix)]
fn is_executable(path: &Utf8Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .is_ok_and(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
}

#[cfg(not(unix))]
fn is_executable(path: &Utf8Path) -> bool {
    path.is_file()
}

impl InnerTree {
    /// Arguments passed to the entry point, ahead of the command itself.
    ///
    /// `--out_dir` comes first, then one `--api_domain` per owned domain in
    /// name order, then `args`.
    #[must_use]
    pub fn command_args(&self, args: &[&str]) -> Vec<String> {
        let mut argv = vec![String::from("--out_dir"), self.out().root().to_string()];
        for name in self.domains().keys() {
            argv.push(String::from("--api_domain"));
            argv.push(name.clone());
        }
        argv.extend(args.iter().map(|arg| (*arg).to_owned()));
        argv
    }

    /// Run the tree's entry point with `args` and wait for it to finish.
    ///
    /// The command runs from the workspace root with inherited standard
    /// streams. There is no retry.
    ///
    /// # Errors
    ///
    /// Returns [`InvokeError::MissingEntrypoint`] when the entry point is
    /// absent or not executable, [`InvokeError::Spawn`] when it cannot be
    /// started, and [`InvokeError::Failed`] for a non-zero exit.
    pub fn invoke(&self, ctx: &RunContext, args: &[&str]) -> Result<(), InvokeError> {
        let root = self.key().root();
        let entrypoint = ctx.resolve(root).join(ENTRYPOINT);
        if !is_executable(&entrypoint) {
            return Err(InvokeError::MissingEntrypoint {
                root: root.to_owned(),
                entrypoint,
            });
        }
        let mut cmd = Command::new(&entrypoint);
        cmd.current_dir(ctx.workspace()).args(self.command_args(args));
        let status = run_inherited(&mut cmd).map_err(|source| InvokeError::Spawn {
            root: root.to_owned(),
            source,
        })?;
        if status.success() {
            debug!(tree = %self.key(), ?args, "inner tree command finished");
            return Ok(());
        }
        Err(InvokeError::Failed {
            root: root.to_owned(),
            command: display_command(&cmd),
            status,
        })
    }
}
