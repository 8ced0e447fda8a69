//! The top-level build file.
//!
//! `multitree.ninja` includes the assembled API surfaces and every tree's own
//! build file, then copies the artefacts each tree lists in its
//! `build_targets.json` into the shared output locations.

mod targets;

pub use targets::{BuildTargets, DistEntry, ModuleTarget, StagingEntry, load_build_targets};

use crate::context::RunContext;
use crate::inner_tree::{InnerTree, InnerTrees, TreeKey};
use crate::ninja_syntax::Subninja;
use crate::ninja_writer::{NinjaWriteError, NinjaWriter};
use crate::orchestrator::TreeInfo;
use camino::{Utf8Path, Utf8PathBuf};
use miette::Diagnostic;
use std::collections::BTreeMap;
use std::io;
use thiserror::Error;
use tracing::{debug, info};

/// The only module type that is packaged.
pub const APEX_MODULE_TYPE: &str = "apex";
/// Global phony collecting every staged file.
pub const STAGING_PHONY: &str = "staging";
/// Global phony collecting every distributed file.
pub const DIST_PHONY: &str = "dist";

/// Failure to produce the top-level build file.
#[derive(Debug, Error, Diagnostic)]
pub enum PackagingError {
    /// A tree that requires its build file did not write one.
    #[error("inner tree {tree} requires ninja but {path} does not exist")]
    #[diagnostic(code(multitree::final_packaging::missing_inner_ninja))]
    MissingInnerNinja {
        /// Offending tree.
        tree: TreeKey,
        /// Expected build file.
        path: Utf8PathBuf,
    },
    /// The packaging manifest could not be read.
    #[error("failed to read {path}")]
    #[diagnostic(code(multitree::final_packaging::read_targets))]
    ReadTargets {
        /// Manifest path.
        path: Utf8PathBuf,
        /// Underlying failure.
        #[source]
        source: io::Error,
    },
    /// The packaging manifest is malformed.
    #[error("malformed build targets {path}")]
    #[diagnostic(code(multitree::final_packaging::parse_targets))]
    ParseTargets {
        /// Manifest path.
        path: Utf8PathBuf,
        /// Parser failure.
        #[source]
        source: serde_json::Error,
    },
    /// A module of a type that cannot be packaged.
    #[error("inner tree {tree} lists module {name} of unsupported type `{module_type}`")]
    #[diagnostic(
        code(multitree::final_packaging::module_type),
        help("only `apex` modules are packaged")
    )]
    UnsupportedModuleType {
        /// Offending tree.
        tree: TreeKey,
        /// Module name.
        name: String,
        /// Declared type.
        module_type: String,
    },
    /// A staging entry without exactly one source.
    #[error("staging entry {dest} in inner tree {tree} must set exactly one of `src` and `obj`")]
    #[diagnostic(code(multitree::final_packaging::staging_source))]
    AmbiguousStagingSource {
        /// Offending tree.
        tree: TreeKey,
        /// Entry destination.
        dest: String,
    },
    /// Two entries copy into the same output file.
    #[error("{dest} is packaged by both inner tree {first} and inner tree {second}")]
    #[diagnostic(code(multitree::final_packaging::duplicate_destination))]
    DuplicateDestination {
        /// Contested output path.
        dest: Utf8PathBuf,
        /// Tree that listed it first.
        first: TreeKey,
        /// Tree that listed it again.
        second: TreeKey,
    },
    /// The build file could not be written.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Write(#[from] NinjaWriteError),
}

/// Output files already claimed, with the tree that claimed each.
#[derive(Debug, Default)]
struct Destinations(BTreeMap<Utf8PathBuf, TreeKey>);

impl Destinations {
    fn claim(&mut self, dest: &Utf8Path, tree: &TreeKey) -> Result<(), PackagingError> {
        if let Some(first) = self.0.get(dest) {
            return Err(PackagingError::DuplicateDestination {
                dest: dest.to_owned(),
                first: first.clone(),
                second: tree.clone(),
            });
        }
        self.0.insert(dest.to_owned(), tree.clone());
        Ok(())
    }
}

fn package_tree(
    ctx: &RunContext,
    writer: &mut NinjaWriter,
    claimed: &mut Destinations,
    tree: &InnerTree,
    targets: &BuildTargets,
) -> Result<(), PackagingError> {
    let key = tree.key();
    let tree_out = ctx.ninja_path(tree.out().root());
    for module in &targets.modules {
        if module.module_type != APEX_MODULE_TYPE {
            return Err(PackagingError::UnsupportedModuleType {
                tree: key.clone(),
                name: module.name.clone(),
                module_type: module.module_type.clone(),
            });
        }
        let share = ctx.out().module_share_dir(APEX_MODULE_TYPE, &module.name);
        let dest = ctx.ninja_path(&share.join(format!("{}.apex", module.name)));
        claimed.claim(&dest, key)?;
        writer.add_copy_file(&dest, &key.root().join(&module.file));
    }
    let staging = ctx.ninja_path(&ctx.out().staging_dir());
    for entry in &targets.staging {
        let src = match (&entry.src, &entry.obj) {
            (Some(src), None) => key.root().join(src),
            (None, Some(obj)) => tree_out.join(obj),
            _ => {
                return Err(PackagingError::AmbiguousStagingSource {
                    tree: key.clone(),
                    dest: entry.dest.clone(),
                });
            }
        };
        let dest = staging.join(&entry.dest);
        claimed.claim(&dest, key)?;
        writer
            .add_copy_file(&dest, &src)
            .add_global_phony(STAGING_PHONY, [dest.into_string()]);
    }
    let dist = ctx.ninja_path(&ctx.out().dist_dir());
    for entry in &targets.dist {
        let dest = dist.join(&entry.dest);
        claimed.claim(&dest, key)?;
        writer
            .add_copy_file(&dest, &key.root().join(&entry.src))
            .add_global_phony(DIST_PHONY, [dest.into_string()]);
    }
    Ok(())
}

fn requires_ninja(infos: &BTreeMap<TreeKey, TreeInfo>, key: &TreeKey) -> bool {
    infos.get(key).is_some_and(|info| info.requires_ninja)
}

/// Build the top-level writer for `trees`.
///
/// # Errors
///
/// Returns a [`PackagingError`] for a missing tree build file or an invalid
/// packaging manifest.
pub fn generate_outer_ninja(
    ctx: &RunContext,
    trees: &InnerTrees,
    infos: &BTreeMap<TreeKey, TreeInfo>,
) -> Result<NinjaWriter, PackagingError> {
    let mut writer = NinjaWriter::new(ctx.tools().copy_tool());
    writer
        .add_comment("Generated by multitree. Do not edit.")
        .add_subninja(Subninja::new(
            ctx.ninja_path(&ctx.out().api_ninja_file()).into_string(),
        ));
    let mut claimed = Destinations::default();
    for tree in trees.trees() {
        let key = tree.key();
        if requires_ninja(infos, key) {
            let path = tree.out().inner_tree_ninja_file();
            if !path.is_file() {
                return Err(PackagingError::MissingInnerNinja {
                    tree: key.clone(),
                    path,
                });
            }
            writer.add_subninja(Subninja::new(ctx.ninja_path(&path).into_string()));
        }
        match load_build_targets(&tree.out().build_targets_file())? {
            Some(targets) => package_tree(ctx, &mut writer, &mut claimed, tree, &targets)?,
            None => debug!(tree = %key, "no build targets to package"),
        }
    }
    Ok(writer)
}

/// Write `multitree.ninja` and return its path.
///
/// # Errors
///
/// Returns any generation or write failure.
pub fn write_outer_ninja(
    ctx: &RunContext,
    trees: &InnerTrees,
    infos: &BTreeMap<TreeKey, TreeInfo>,
) -> Result<Utf8PathBuf, PackagingError> {
    let writer = generate_outer_ninja(ctx, trees, infos)?;
    let path = ctx.out().outer_ninja_file();
    writer.write_file(&path)?;
    info!("wrote {path}");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{OutDir, Tools};
    use anyhow::{Context, Result, ensure};
    use rstest::rstest;
    use std::fs;

    struct Fixture {
        _temp: tempfile::TempDir,
        ctx: RunContext,
        trees: InnerTrees,
    }

    impl Fixture {
        fn new() -> Result<Self> {
            let temp = tempfile::tempdir().context("create temp dir")?;
            let root = Utf8Path::from_path(temp.path()).context("utf-8 temp dir")?.to_owned();
            let ctx = RunContext::new(root.clone(), OutDir::new(root.join("out")), Tools::default());
            let mut trees = InnerTrees::new();
            trees
                .add_domain(&ctx, "system", Utf8Path::new("aosp"), Some("cf"))
                .map_err(anyhow::Error::new)?;
            Ok(Self {
                _temp: temp,
                ctx,
                trees,
            })
        }

        fn tree(&self) -> Result<&InnerTree> {
            self.trees.trees().next().context("one tree")
        }

        fn write_tree_file(&self, path: &Utf8Path, text: &str) -> Result<()> {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).context("create tree out")?;
            }
            fs::write(path, text).with_context(|| format!("write {path}"))
        }

        fn infos(&self, requires_ninja: bool) -> Result<BTreeMap<TreeKey, TreeInfo>> {
            let key = self.tree()?.key().clone();
            Ok(BTreeMap::from([(
                key,
                TreeInfo {
                    requires_ninja,
                    orchestrator_protocol_version: 1,
                },
            )]))
        }

        fn render(&self, requires_ninja: bool) -> Result<String> {
            let writer = generate_outer_ninja(&self.ctx, &self.trees, &self.infos(requires_ninja)?)?;
            Ok(writer.render()?.into_string())
        }
    }

    #[rstest]
    fn includes_api_surfaces_and_tree_build_file() -> Result<()> {
        let fixture = Fixture::new()?;
        let tree = fixture.tree()?;
        fixture.write_tree_file(&tree.out().inner_tree_ninja_file(), "")?;
        let text = fixture.render(true)?;
        ensure!(
            text == "# Generated by multitree. Do not edit.\n\
                     subninja out/api_surfaces.ninja\n\
                     subninja out/trees/aosp@cf/inner_tree.ninja\n",
            "unexpected build file:\n{text}"
        );
        Ok(())
    }

    #[rstest]
    fn tree_without_ninja_is_not_included() -> Result<()> {
        let fixture = Fixture::new()?;
        let text = fixture.render(false)?;
        ensure!(!text.contains("inner_tree.ninja"));
        Ok(())
    }

    #[rstest]
    fn missing_required_tree_build_file_fails() -> Result<()> {
        let fixture = Fixture::new()?;
        let result = generate_outer_ninja(&fixture.ctx, &fixture.trees, &fixture.infos(true)?);
        ensure!(matches!(result, Err(PackagingError::MissingInnerNinja { .. })));
        Ok(())
    }

    #[rstest]
    fn copies_modules_staging_and_dist() -> Result<()> {
        let fixture = Fixture::new()?;
        let tree = fixture.tree()?;
        fixture.write_tree_file(
            &tree.out().build_targets_file(),
            r#"{
                "modules": [{"name": "com.android.art", "type": "apex", "file": "out/art.apex"}],
                "staging": [
                    {"dest": "system/lib/libc.so", "obj": "lib/libc.so"},
                    {"dest": "etc/init.rc", "src": "rootdir/init.rc"}
                ],
                "dist": [{"dest": "symbols.zip", "src": "out/symbols.zip"}]
            }"#,
        )?;
        let text = fixture.render(false)?;
        for expected in [
            "build out/shared/apex/com.android.art/com.android.art.apex: copy_file aosp/out/art.apex\n",
            "build out/staging/system/lib/libc.so: copy_file out/trees/aosp@cf/lib/libc.so\n",
            "build out/staging/etc/init.rc: copy_file aosp/rootdir/init.rc\n",
            "build out/dist/symbols.zip: copy_file aosp/out/symbols.zip\n",
            "build dist: phony out/dist/symbols.zip\n",
            "build staging: phony out/staging/system/lib/libc.so out/staging/etc/init.rc\n",
        ] {
            ensure!(text.contains(expected), "missing {expected:?} in:\n{text}");
        }
        ensure!(text.matches("rule copy_file").count() == 1);
        ensure!(text.ends_with("build staging: phony out/staging/system/lib/libc.so out/staging/etc/init.rc\n"));
        Ok(())
    }

    #[rstest]
    fn two_trees_packaging_one_destination_fail() -> Result<()> {
        let mut fixture = Fixture::new()?;
        fixture
            .trees
            .add_domain(&fixture.ctx, "vendor", Utf8Path::new("acme"), None)
            .map_err(anyhow::Error::new)?;
        let targets = r#"{"dist": [{"dest": "symbols.zip", "src": "symbols.zip"}]}"#;
        for tree in fixture.trees.trees() {
            fixture.write_tree_file(&tree.out().build_targets_file(), targets)?;
        }
        let result = generate_outer_ninja(&fixture.ctx, &fixture.trees, &BTreeMap::new());
        let (dest, first, second) = match result {
            Err(PackagingError::DuplicateDestination { dest, first, second }) => (dest, first, second),
            other => anyhow::bail!("expected a duplicate destination error, got {other:?}"),
        };
        ensure!(dest == "out/dist/symbols.zip", "dest {dest}");
        ensure!(first == TreeKey::new("acme", None), "first {first}");
        ensure!(second == TreeKey::new("aosp", Some("cf")), "second {second}");
        Ok(())
    }

    #[rstest]
    fn one_tree_listing_a_destination_twice_fails() -> Result<()> {
        let fixture = Fixture::new()?;
        fixture.write_tree_file(
            &fixture.tree()?.out().build_targets_file(),
            r#"{"staging": [{"dest": "etc/a", "src": "a"}, {"dest": "etc/a", "src": "b"}]}"#,
        )?;
        let result = generate_outer_ninja(&fixture.ctx, &fixture.trees, &fixture.infos(false)?);
        ensure!(matches!(result, Err(PackagingError::DuplicateDestination { .. })));
        Ok(())
    }

    #[rstest]
    #[case(r#"{"modules": [{"name": "x", "type": "apk", "file": "x.apk"}]}"#)]
    #[case(r#"{"staging": [{"dest": "a", "src": "a", "obj": "a"}]}"#)]
    #[case(r#"{"staging": [{"dest": "a"}]}"#)]
    #[case(r#"{"dist": "not a list"}"#)]
    fn invalid_targets_fail(#[case] targets: &str) -> Result<()> {
        let fixture = Fixture::new()?;
        fixture.write_tree_file(&fixture.tree()?.out().build_targets_file(), targets)?;
        ensure!(generate_outer_ninja(&fixture.ctx, &fixture.trees, &fixture.infos(false)?).is_err());
        Ok(())
    }
}
