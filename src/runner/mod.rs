//! CLI execution and command dispatch logic.
//!
//! This module keeps `main` minimal by providing a single entry point that
//! resolves the workspace, output directory and tools once, then hands an
//! explicit [`RunContext`] and [`StatusReporter`] to the selected command.

use crate::cli::{BuildArgs, Cli, Commands, LunchArgs};
use crate::context::{OutDir, RunContext, Tools};
use crate::lunch::{ComboSpec, find_all_lunchable, load_current_config, make_config_header};
use crate::orchestrator::run_pipeline;
use crate::status::{
    AccessibleReporter, IndicatifReporter, OutputMode, SilentReporter, StatusReporter,
    VerboseTimingReporter, resolve_output_mode_with,
};
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::env;
use std::ffi::OsString;
use std::io::{self, Write};
use tracing::debug;

/// Build the [`StatusReporter`] for the resolved output mode.
fn make_reporter(mode: OutputMode, progress_enabled: bool, verbose: bool) -> Box<dyn StatusReporter> {
    let base: Box<dyn StatusReporter> = match (mode, progress_enabled) {
        (OutputMode::Accessible, _) => Box::new(AccessibleReporter),
        (OutputMode::Standard, true) => Box::new(IndicatifReporter::new()),
        (OutputMode::Standard, false) => Box::new(SilentReporter),
    };
    if verbose {
        Box::new(VerboseTimingReporter::new(base))
    } else {
        base
    }
}

/// Absolute workspace root: `-C DIR` anchored at `cwd`, or `cwd` itself.
fn resolve_workspace(cli: &Cli, cwd: &Utf8Path) -> Utf8PathBuf {
    cli.directory
        .as_ref()
        .map_or_else(|| cwd.to_owned(), |dir| cwd.join(dir))
}

fn current_dir() -> Result<Utf8PathBuf> {
    let cwd = env::current_dir().context("reading the current directory")?;
    Utf8PathBuf::from_path_buf(cwd)
        .map_err(|path| anyhow::anyhow!("current directory {} is not UTF-8", path.display()))
}

/// Resolve the run context for `cli` against `cwd` and the environment.
pub fn resolve_context<F>(cli: &Cli, cwd: &Utf8Path, mut read_env: F) -> RunContext
where
    F: FnMut(&str) -> Option<OsString>,
{
    let workspace = resolve_workspace(cli, cwd);
    let out = OutDir::resolve_with(&workspace, cli.out_dir.as_deref(), &mut read_env);
    let tools = Tools::from_env_with(&mut read_env);
    debug!(workspace = %workspace, out = %out.root(), ninja = %tools.ninja(), "resolved run context");
    RunContext::new(workspace, out, tools)
}

/// Execute the parsed [`Cli`] against the process environment.
///
/// # Errors
///
/// Returns the first failure of the selected command.
pub fn run(cli: &Cli) -> Result<()> {
    run_with(cli, &current_dir()?, |key| env::var_os(key))
}

/// Execute `cli` from `cwd`, reading the environment through `read_env`.
///
/// # Errors
///
/// Returns the first failure of the selected command.
pub fn run_with<F>(cli: &Cli, cwd: &Utf8Path, mut read_env: F) -> Result<()>
where
    F: FnMut(&str) -> Option<OsString>,
{
    let ctx = resolve_context(cli, cwd, &mut read_env);
    let command = cli
        .command
        .clone()
        .unwrap_or_else(|| Commands::Build(BuildArgs::default()));
    match command {
        Commands::Lunch(args) => handle_lunch(&ctx, &args, read_env),
        Commands::Build(args) => {
            let mode = resolve_output_mode_with(cli.accessible, &mut read_env);
            let reporter = make_reporter(mode, cli.progress.unwrap_or(true), cli.verbose);
            handle_build(&ctx, &args, read_env, reporter.as_ref())
        }
    }
}

fn handle_lunch<F>(ctx: &RunContext, args: &LunchArgs, read_env: F) -> Result<()>
where
    F: FnMut(&str) -> Option<OsString>,
{
    let mut stdout = io::stdout().lock();
    if args.list {
        for file in find_all_lunchable(ctx.workspace()) {
            writeln!(stdout, "{}", ctx.ninja_path(&file)).context("writing combo list")?;
        }
        return Ok(());
    }
    let selected = load_current_config(ctx.workspace(), &args.args, read_env)?;
    let spec = ComboSpec::from_config(&selected.config)?;
    let header = make_config_header(&selected.file, &spec, selected.variant.as_deref());
    write!(io::stderr(), "{header}").context("writing combo summary")?;
    writeln!(
        stdout,
        "{}\n{}",
        selected.file,
        selected.variant.as_deref().unwrap_or_default()
    )
    .context("writing selected combo")?;
    Ok(())
}

fn handle_build<F>(
    ctx: &RunContext,
    args: &BuildArgs,
    read_env: F,
    reporter: &dyn StatusReporter,
) -> Result<()>
where
    F: FnMut(&str) -> Option<OsString>,
{
    let selected = load_current_config(ctx.workspace(), &args.combo, read_env)?;
    let spec = ComboSpec::from_config(&selected.config).map_err(|err| err.at(&selected.file))?;
    run_pipeline(ctx, &spec, &args.targets, reporter)
        .with_context(|| format!("building combo {}", selected.file))?;
    reporter.report_complete("build");
    Ok(())
}
