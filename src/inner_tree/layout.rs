//! Per-tree output layout.

use camino::{Utf8Path, Utf8PathBuf};

/// Files and directories an inner tree writes under its own output root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutDirLayout {
    root: Utf8PathBuf,
}

impl OutDirLayout {
    /// Lay out a tree's output under `root`.
    #[must_use]
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory passed to the tree as `--out_dir`.
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Capabilities written by `describe`.
    #[must_use]
    pub fn tree_info_file(&self) -> Utf8PathBuf {
        self.root.join("tree_info.json")
    }

    /// Contribution documents written by `export_api_contributions`.
    #[must_use]
    pub fn api_contributions_dir(&self) -> Utf8PathBuf {
        self.root.join("api_contributions")
    }

    /// Build file written by `analyze` for trees that need the runner.
    #[must_use]
    pub fn inner_tree_ninja_file(&self) -> Utf8PathBuf {
        self.root.join("inner_tree.ninja")
    }

    /// Optional packaging manifest written by `analyze`.
    #[must_use]
    pub fn build_targets_file(&self) -> Utf8PathBuf {
        self.root.join("build_targets.json")
    }
}
