//! Scripted inner trees.
//!
//! A [`FakeInnerTree`] installs an `.inner_build` shell script at its root.
//! The script copies canned files from `<root>/.fake` into whatever
//! `--out_dir` it is given and appends every command it runs to
//! `<root>/.fake/calls`.

use crate::write_script;
use anyhow::{Context, Result};
use camino::Utf8Path;
use serde_json::{Value, json};
use std::fs;

const FAKE_DIR: &str = ".fake";
const CALLS_FILE: &str = "calls";

/// Builder for a scripted inner tree.
#[derive(Debug, Clone)]
pub struct FakeInnerTree {
    root: String,
    tree_info: Value,
    contributions: Vec<(String, String)>,
    inner_ninja: Option<String>,
    build_targets: Option<Value>,
    fail_on: Option<String>,
}

impl FakeInnerTree {
    /// A tree at the workspace-relative `root` that needs no ninja file.
    #[must_use]
    pub fn new(root: &str) -> Self {
        Self {
            root: root.to_owned(),
            tree_info: json!({"requires_ninja": false, "orchestrator_protocol_version": 1}),
            contributions: Vec::new(),
            inner_ninja: None,
            build_targets: None,
            fail_on: None,
        }
    }

    /// Replace the document written by `describe`.
    #[must_use]
    pub fn tree_info(mut self, info: Value) -> Self {
        self.tree_info = info;
        self
    }

    /// Export `document` as `api_contributions/<file>`.
    #[must_use]
    pub fn contribution(mut self, file: &str, document: &Value) -> Self {
        self.contributions.push((file.to_owned(), document.to_string()));
        self
    }

    /// Export raw `text` as `api_contributions/<file>`.
    #[must_use]
    pub fn raw_contribution(mut self, file: &str, text: &str) -> Self {
        self.contributions.push((file.to_owned(), text.to_owned()));
        self
    }

    /// Write `text` as `inner_tree.ninja` during `analyze` and require it.
    #[must_use]
    pub fn inner_ninja(mut self, text: &str) -> Self {
        self.inner_ninja = Some(text.to_owned());
        if let Some(info) = self.tree_info.as_object_mut() {
            info.insert("requires_ninja".to_owned(), Value::Bool(true));
        }
        self
    }

    /// Write `targets` as `build_targets.json` during `analyze`.
    #[must_use]
    pub fn build_targets(mut self, targets: Value) -> Self {
        self.build_targets = Some(targets);
        self
    }

    /// Exit with status 1 when asked to run `command`.
    #[must_use]
    pub fn fail_on(mut self, command: &str) -> Self {
        self.fail_on = Some(command.to_owned());
        self
    }

    fn script(&self) -> String {
        let fail = self.fail_on.as_deref().map_or_else(String::new, |command| {
            format!("if [ \"$cmd\" = \"{command}\" ]; then exit 1; fi\n")
        });
        format!(
            r#"here="$(cd "$(dirname "$0")" && pwd)/{FAKE_DIR}"
out=""
cmd=""
while [ $# -gt 0 ]; do
  case "$1" in
    --out_dir) out="$2"; shift 2 ;;
    --api_domain) shift 2 ;;
    *) cmd="$1"; shift ;;
  esac
done
echo "$cmd" >> "$here/{CALLS_FILE}"
{fail}mkdir -p "$out"
case "$cmd" in
  describe)
    cp "$here/tree_info.json" "$out/tree_info.json" ;;
  export_api_contributions)
    mkdir -p "$out/api_contributions"
    for f in "$here"/api_contributions/*.json; do
      if [ -f "$f" ]; then cp "$f" "$out/api_contributions/"; fi
    done ;;
  analyze)
    if [ -f "$here/inner_tree.ninja" ]; then cp "$here/inner_tree.ninja" "$out/"; fi
    if [ -f "$here/build_targets.json" ]; then cp "$here/build_targets.json" "$out/"; fi ;;
esac
exit 0"#
        )
    }

    /// Install the tree under `workspace`.
    ///
    /// # Errors
    ///
    /// Returns an error when any file cannot be written.
    pub fn install(&self, workspace: &Utf8Path) -> Result<()> {
        let root = workspace.join(&self.root);
        let fake = root.join(FAKE_DIR);
        let contributions = fake.join("api_contributions");
        fs::create_dir_all(&contributions).with_context(|| format!("create {contributions}"))?;
        fs::write(fake.join("tree_info.json"), self.tree_info.to_string())
            .context("write tree info")?;
        for (file, text) in &self.contributions {
            fs::write(contributions.join(file), text).with_context(|| format!("write {file}"))?;
        }
        if let Some(text) = &self.inner_ninja {
            fs::write(fake.join("inner_tree.ninja"), text).context("write inner ninja")?;
        }
        if let Some(targets) = &self.build_targets {
            fs::write(fake.join("build_targets.json"), targets.to_string())
                .context("write build targets")?;
        }
        write_script(&root.join(".inner_build"), &self.script())
    }

    /// Commands the installed tree has run, in order.
    #[must_use]
    pub fn calls(&self, workspace: &Utf8Path) -> Vec<String> {
        let path = workspace.join(&self.root).join(FAKE_DIR).join(CALLS_FILE);
        fs::read_to_string(path)
            .map(|text| text.lines().map(str::to_owned).collect())
            .unwrap_or_default()
    }
}
