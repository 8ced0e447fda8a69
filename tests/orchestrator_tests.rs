//! End-to-end runs of the orchestrator pipeline against scripted inner trees.
//!
//! Each test installs fake `.inner_build` entry points in a temporary
//! workspace, runs every phase through a fake build runner and inspects the
//! generated build files.
#![cfg(unix)]

use anyhow::{Context, Result, ensure};
use camino::Utf8Path;
use insta::assert_snapshot;
use multitree::context::{OutDir, RunContext, Tools};
use multitree::lunch::{ComboSpec, LunchConfig};
use multitree::orchestrator::run_pipeline;
use multitree::status::SilentReporter;
use serde_json::{Value, json};
use test_support::{FakeInnerTree, Workspace, fake_ninja, recorded_ninja_args};

fn combo(value: &Value) -> Result<ComboSpec> {
    let config: LunchConfig = value.as_object().cloned().context("combo is an object")?;
    Ok(ComboSpec::from_config(&config)?)
}

fn two_tree_combo() -> Result<ComboSpec> {
    combo(&json!({
        "lunchable": true,
        "system": {"tree": "aosp", "product": "aosp_cf"},
        "modules": {"com.android.bionic": {"inner-tree": "mainline"}}
    }))
}

fn system_tree() -> FakeInnerTree {
    FakeInnerTree::new("aosp").contribution(
        "public_api.json",
        &json!({
            "name": "public_api",
            "version": 1,
            "api_domain": "system",
            "cc_libraries": [{
                "name": "libhwui",
                "headers": [{"root": "frameworks/base/libs/hwui/apex/include", "files": ["canvas.h"]}]
            }]
        }),
    )
}

fn bionic_tree() -> FakeInnerTree {
    FakeInnerTree::new("mainline").contribution(
        "public_api.json",
        &json!({
            "name": "public_api",
            "version": 1,
            "api_domain": "com.android.bionic",
            "cc_libraries": [{
                "name": "libc",
                "headers": [{"root": "bionic/libc/include", "files": ["stdio.h"]}]
            }]
        }),
    )
}

struct Run {
    ws: Workspace,
    ctx: RunContext,
}

impl Run {
    fn new(trees: &[&FakeInnerTree], runner_exit: i32) -> Result<Self> {
        let ws = Workspace::new()?;
        for tree in trees {
            tree.install(ws.root())?;
        }
        let ninja = fake_ninja(ws.root(), runner_exit)?;
        let ctx = RunContext::new(
            ws.root(),
            OutDir::new(ws.root().join("out")),
            Tools::new(ninja, "cp"),
        );
        Ok(Self { ws, ctx })
    }

    fn root(&self) -> &Utf8Path {
        self.ws.root()
    }

    fn build(&self, spec: &ComboSpec) -> Result<()> {
        run_pipeline(&self.ctx, spec, &["droid".to_owned()], &SilentReporter)
    }
}

#[test]
fn two_trees_assemble_one_api_build_file() -> Result<()> {
    let run = Run::new(&[&system_tree(), &bionic_tree()], 0)?;
    run.build(&two_tree_combo()?)?;

    let api_ninja = run.ws.read("out/api_surfaces.ninja")?;
    ensure!(api_ninja.matches("rule copy_file").count() == 1);
    ensure!(api_ninja.matches(": copy_file ").count() == 2);
    ensure!(api_ninja.contains("build public_api-1-libhwui: phony "));
    ensure!(api_ninja.contains("build public_api-1-libc: phony "));
    assert_snapshot!("two_tree_api_surfaces", api_ninja.trim_end());

    let args = recorded_ninja_args(run.root()).context("runner was invoked")?;
    ensure!(args == "-f out/multitree.ninja droid", "runner args: {args}");
    Ok(())
}

#[test]
fn every_phase_runs_for_every_tree_in_order() -> Result<()> {
    let system = system_tree();
    let bionic = bionic_tree();
    let run = Run::new(&[&system, &bionic], 0)?;
    run.build(&two_tree_combo()?)?;
    for tree in [&system, &bionic] {
        ensure!(
            tree.calls(run.root()) == ["describe", "export_api_contributions", "analyze"],
            "unexpected calls: {:?}",
            tree.calls(run.root())
        );
    }
    Ok(())
}

#[test]
fn repeated_runs_are_byte_identical() -> Result<()> {
    let run = Run::new(&[&system_tree(), &bionic_tree()], 0)?;
    let spec = two_tree_combo()?;
    run.build(&spec)?;
    let first = (
        run.ws.read("out/api_surfaces.ninja")?,
        run.ws.read("out/multitree.ninja")?,
    );
    run.build(&spec)?;
    let second = (
        run.ws.read("out/api_surfaces.ninja")?,
        run.ws.read("out/multitree.ninja")?,
    );
    ensure!(first == second);
    Ok(())
}

#[test]
fn failed_analyze_stops_packaging_and_execution() -> Result<()> {
    let system = system_tree().fail_on("analyze");
    let bionic = bionic_tree();
    let run = Run::new(&[&system, &bionic], 0)?;
    let err = run
        .build(&two_tree_combo()?)
        .err()
        .context("analyze failure must fail the run")?;
    ensure!(format!("{err:#}").contains("analyzing inner trees"), "{err:#}");
    ensure!(bionic.calls(run.root()) == ["describe", "export_api_contributions"]);
    ensure!(!run.root().join("out/multitree.ninja").exists());
    ensure!(recorded_ninja_args(run.root()).is_none());
    Ok(())
}

#[test]
fn tree_build_files_are_included_when_required() -> Result<()> {
    let system = system_tree()
        .inner_ninja("build droid: phony\n")
        .build_targets(json!({"dist": [{"dest": "droid.zip", "src": "droid.zip"}]}));
    let run = Run::new(&[&system, &bionic_tree()], 0)?;
    run.build(&two_tree_combo()?)?;
    let outer = run.ws.read("out/multitree.ninja")?;
    ensure!(outer.contains("subninja out/api_surfaces.ninja\n"));
    ensure!(outer.contains("subninja out/trees/aosp@aosp_cf/inner_tree.ninja\n"));
    ensure!(!outer.contains("mainline@/inner_tree.ninja"));
    ensure!(outer.contains("build out/dist/droid.zip: copy_file aosp/droid.zip\n"));
    ensure!(outer.contains("build dist: phony out/dist/droid.zip\n"));
    Ok(())
}

#[test]
fn malformed_contribution_names_the_file() -> Result<()> {
    let broken = FakeInnerTree::new("aosp").raw_contribution("broken.json", "{ not json");
    let run = Run::new(&[&broken, &bionic_tree()], 0)?;
    let err = run
        .build(&two_tree_combo()?)
        .err()
        .context("malformed contribution must fail the run")?;
    let message = format!("{err:#}");
    ensure!(message.contains("api_contributions/broken.json"), "{message}");
    ensure!(!run.root().join("out/api_surfaces.ninja").exists());
    Ok(())
}

#[test]
fn newer_protocol_is_rejected() -> Result<()> {
    let future = system_tree().tree_info(json!({"requires_ninja": false, "orchestrator_protocol_version": 2}));
    let run = Run::new(&[&future, &bionic_tree()], 0)?;
    let err = run.build(&two_tree_combo()?).err().context("run must fail")?;
    ensure!(format!("{err:#}").contains("requires orchestrator protocol 2"), "{err:#}");
    ensure!(future.calls(run.root()) == ["describe"]);
    Ok(())
}

#[test]
fn missing_entrypoint_is_a_protocol_error() -> Result<()> {
    let run = Run::new(&[&system_tree()], 0)?;
    let err = run.build(&two_tree_combo()?).err().context("run must fail")?;
    ensure!(format!("{err:#}").contains("inner tree mainline has no executable"), "{err:#}");
    Ok(())
}

#[test]
fn runner_failure_fails_the_run() -> Result<()> {
    let run = Run::new(&[&system_tree(), &bionic_tree()], 3)?;
    let err = run.build(&two_tree_combo()?).err().context("run must fail")?;
    ensure!(format!("{err:#}").contains("running the build"), "{err:#}");
    ensure!(run.root().join("out/multitree.ninja").exists());
    Ok(())
}
