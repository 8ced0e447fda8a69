//! Subprocess helpers shared by inner-tree invocation and the runner.
//!
//! Every external command is logged before it starts, run to completion and
//! judged by its exit status. Inner trees inherit the orchestrator's standard
//! streams; the runner's output is forwarded line-agnostically through
//! [`run_forwarding_output`] so progress reporting on stderr stays coherent.

mod forward;
mod ninja;

pub use ninja::run_ninja;

use camino::Utf8PathBuf;
use forward::forward_child_output;
use std::io::{self, BufReader};
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use tracing::{debug, info, warn};

/// Render `cmd` as a shell-quoted line for logs and diagnostics.
#[must_use]
pub fn display_command(cmd: &Command) -> String {
    let program_path = PathBuf::from(cmd.get_program());
    let program = Utf8PathBuf::from_path_buf(program_path.clone()).map_or_else(
        |_| program_path.to_string_lossy().into_owned(),
        Utf8PathBuf::into_string,
    );
    let words: Vec<String> = std::iter::once(program)
        .chain(cmd.get_args().map(|arg| arg.to_string_lossy().into_owned()))
        .collect();
    shlex::try_join(words.iter().map(String::as_str)).unwrap_or_else(|_| words.join(" "))
}

fn log_command_execution(cmd: &Command) {
    match cmd.get_current_dir() {
        Some(dir) => info!("Running command: {} (in {})", display_command(cmd), dir.display()),
        None => info!("Running command: {}", display_command(cmd)),
    }
}

/// Run `cmd` to completion with inherited standard streams.
///
/// # Errors
///
/// Returns an [`io::Error`] when the process cannot be spawned.
pub fn run_inherited(cmd: &mut Command) -> io::Result<ExitStatus> {
    log_command_execution(cmd);
    cmd.stdin(Stdio::null())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
}

/// Run `cmd`, copying its stdout and stderr to ours as they arrive.
///
/// # Errors
///
/// Returns an [`io::Error`] when the process cannot be spawned or its pipes
/// are unavailable.
pub fn run_forwarding_output(cmd: &mut Command) -> io::Result<ExitStatus> {
    log_command_execution(cmd);
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    let child = cmd.spawn()?;
    wait_forwarding(child)
}

fn wait_forwarding(mut child: Child) -> io::Result<ExitStatus> {
    let Some(stdout) = child.stdout.take() else {
        terminate_child(&mut child, "stdout pipe unavailable");
        return Err(io::Error::other("child process missing stdout pipe"));
    };
    let Some(stderr) = child.stderr.take() else {
        terminate_child(&mut child, "stderr pipe unavailable");
        return Err(io::Error::other("child process missing stderr pipe"));
    };

    let out_handle = thread::spawn(move || {
        let mut lock = io::stdout().lock();
        forward_child_output(BufReader::new(stdout), &mut lock, "stdout")
    });
    let err_handle = thread::spawn(move || {
        let mut lock = io::stderr().lock();
        forward_child_output(BufReader::new(stderr), &mut lock, "stderr")
    });

    let status = child.wait()?;
    for (handle, stream) in [(out_handle, "stdout"), (err_handle, "stderr")] {
        match handle.join() {
            Ok(stats) if stats.write_failed => {
                debug!("{stream} forwarding encountered closed pipe; output truncated");
            }
            Ok(_) => {}
            Err(err) => warn!("{stream} forwarding thread panicked: {err:?}"),
        }
    }
    Ok(status)
}

fn terminate_child(child: &mut Child, context: &str) {
    if let Err(err) = child.kill() {
        debug!("failed to kill child after {context}: {err}");
    }
    if let Err(err) = child.wait() {
        debug!("failed to reap child after {context}: {err}");
    }
}

/// Turn a non-zero exit into an error naming `program`.
///
/// # Errors
///
/// Returns an [`io::Error`] when `status` is not successful.
pub fn check_exit_status(program: &str, status: ExitStatus) -> io::Result<()> {
    if status.success() {
        Ok(())
    } else {
        Err(io::Error::other(format!("{program} exited with {status}")))
    }
}
