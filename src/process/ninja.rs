//! Invoking the build-graph runner.

use super::{check_exit_status, run_forwarding_output};
use camino::Utf8Path;
use std::io;
use std::process::Command;

/// Run `program -f <build_file> [targets...]` from `workspace`.
///
/// An empty target list lets the runner build its defaults.
///
/// # Errors
///
/// Returns an [`io::Error`] when the runner cannot be spawned or exits with a
/// non-zero status.
pub fn run_ninja(
    program: &Utf8Path,
    workspace: &Utf8Path,
    build_file: &Utf8Path,
    targets: &[String],
) -> io::Result<()> {
    let mut cmd = Command::new(program);
    cmd.current_dir(workspace).arg("-f").arg(build_file).args(targets);
    let status = run_forwarding_output(&mut cmd)?;
    check_exit_status(program.as_str(), status)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use anyhow::{Context, Result, ensure};
    use std::fs;
    use std::os::unix::fs::PermissionsExt;

    fn script(dir: &Utf8Path, body: &str) -> Result<camino::Utf8PathBuf> {
        let path = dir.join("fake-ninja");
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).context("write script")?;
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).context("chmod script")?;
        Ok(path)
    }

    #[test]
    fn passes_build_file_and_targets() -> Result<()> {
        let temp = tempfile::tempdir().context("create temp dir")?;
        let root = Utf8Path::from_path(temp.path()).context("utf-8 temp dir")?;
        let program = script(root, "echo \"$@\" > args.txt")?;
        run_ninja(
            &program,
            root,
            Utf8Path::new("out/multitree.ninja"),
            &[String::from("dist"), String::from("staging")],
        )?;
        let args = fs::read_to_string(root.join("args.txt")).context("read args")?;
        ensure!(args == "-f out/multitree.ninja dist staging\n", "args were {args:?}");
        Ok(())
    }

    #[test]
    fn non_zero_exit_is_an_error() -> Result<()> {
        let temp = tempfile::tempdir().context("create temp dir")?;
        let root = Utf8Path::from_path(temp.path()).context("utf-8 temp dir")?;
        let program = script(root, "exit 2")?;
        let result = run_ninja(&program, root, Utf8Path::new("build.ninja"), &[]);
        ensure!(result.is_err(), "runner failure must surface");
        Ok(())
    }
}
