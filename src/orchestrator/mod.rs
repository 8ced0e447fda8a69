//! The build pipeline.
//!
//! A run turns a resolved combo into an [`InnerTrees`] registry and then
//! drives six phases. Each phase finishes for every tree, in tree-key order,
//! before the next begins, and the first failure ends the run: nothing is
//! retried and later phases never start.

mod tree_info;

pub use tree_info::{ORCHESTRATOR_PROTOCOL_VERSION, TreeInfo, read_tree_info};

use crate::api_assembly::assemble_apis;
use crate::context::RunContext;
use crate::final_packaging::write_outer_ninja;
use crate::inner_tree::{InnerTree, InnerTrees, TreeKey};
use crate::lunch::ComboSpec;
use crate::process::run_ninja;
use crate::status::{PipelineStage, StatusReporter, report_pipeline_stage};
use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use miette::Diagnostic;
use std::collections::BTreeMap;
use std::io;
use thiserror::Error;
use tracing::info;

/// Protocol failures detected by the orchestrator itself.
#[derive(Debug, Error, Diagnostic)]
pub enum OrchestratorError {
    /// `describe` did not leave a readable tree info file.
    #[error("inner tree {tree} did not write {path}")]
    #[diagnostic(code(multitree::orchestrator::missing_tree_info))]
    MissingTreeInfo {
        /// Offending tree.
        tree: TreeKey,
        /// Expected file.
        path: Utf8PathBuf,
        /// Underlying failure.
        #[source]
        source: io::Error,
    },
    /// The tree info file is not valid.
    #[error("inner tree {tree} wrote a malformed {path}")]
    #[diagnostic(code(multitree::orchestrator::malformed_tree_info))]
    MalformedTreeInfo {
        /// Offending tree.
        tree: TreeKey,
        /// File that failed to parse.
        path: Utf8PathBuf,
        /// Parser failure.
        #[source]
        source: serde_json::Error,
    },
    /// The tree speaks a protocol newer than this orchestrator.
    #[error("inner tree {tree} requires orchestrator protocol {found}, but only {supported} is supported")]
    #[diagnostic(
        code(multitree::orchestrator::protocol_version),
        help("update multitree or build with an older checkout of the inner tree")
    )]
    UnsupportedProtocol {
        /// Offending tree.
        tree: TreeKey,
        /// Version the tree reported.
        found: u32,
        /// Highest supported version.
        supported: u32,
    },
    /// The build-graph runner failed.
    #[error("build runner {program} failed")]
    #[diagnostic(code(multitree::orchestrator::runner))]
    Runner {
        /// Runner executable.
        program: Utf8PathBuf,
        /// Spawn failure or non-zero exit.
        #[source]
        source: io::Error,
    },
}

/// Call `f` for every tree in key order, reporting progress as it goes.
fn each_tree<T, E, F>(trees: &InnerTrees, reporter: &dyn StatusReporter, mut f: F) -> Result<BTreeMap<TreeKey, T>, E>
where
    F: FnMut(&InnerTree) -> Result<T, E>,
{
    let total = u32::try_from(trees.len()).unwrap_or(u32::MAX);
    let mut current = 0_u32;
    trees.for_each_tree(|key, tree| {
        current = current.saturating_add(1);
        reporter.report_task_progress(current, total, &key.to_string());
        f(tree)
    })
}

fn invoke_all(ctx: &RunContext, trees: &InnerTrees, reporter: &dyn StatusReporter, command: &str) -> Result<()> {
    each_tree(trees, reporter, |tree| tree.invoke(ctx, &[command]))?;
    Ok(())
}

/// Run every phase for the trees selected by `spec`, then build `targets`.
///
/// # Errors
///
/// Returns the first failure, with context naming the phase it came from.
pub fn run_pipeline(
    ctx: &RunContext,
    spec: &ComboSpec,
    targets: &[String],
    reporter: &dyn StatusReporter,
) -> Result<()> {
    let trees = InnerTrees::from_combo(ctx, spec).context("invalid combo")?;
    info!(trees = trees.len(), out = %ctx.out().root(), "starting multitree build");

    report_pipeline_stage(reporter, PipelineStage::Interrogate);
    let infos = each_tree(&trees, reporter, |tree| {
        tree.invoke(ctx, &["describe"])?;
        Ok::<_, anyhow::Error>(read_tree_info(tree)?)
    })
    .context("interrogating inner trees")?;

    report_pipeline_stage(reporter, PipelineStage::Export);
    invoke_all(ctx, &trees, reporter, "export_api_contributions")
        .context("exporting API contributions")?;

    report_pipeline_stage(reporter, PipelineStage::Assemble);
    let libraries = assemble_apis(ctx, &trees).context("assembling API surfaces")?;
    info!(libraries = libraries.len(), "assembled API surfaces");

    report_pipeline_stage(reporter, PipelineStage::Analyze);
    invoke_all(ctx, &trees, reporter, "analyze").context("analyzing inner trees")?;

    report_pipeline_stage(reporter, PipelineStage::Package);
    let outer = write_outer_ninja(ctx, &trees, &infos).context("packaging the build")?;

    report_pipeline_stage(reporter, PipelineStage::Execute);
    let program = ctx.tools().ninja();
    run_ninja(program, ctx.workspace(), &ctx.ninja_path(&outer), targets)
        .map_err(|source| OrchestratorError::Runner {
            program: program.to_owned(),
            source,
        })
        .context("running the build")?;
    Ok(())
}
