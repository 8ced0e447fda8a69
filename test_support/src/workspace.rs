//! A throwaway workspace root.

use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use serde_json::Value;
use std::fs;
use tempfile::TempDir;

/// Temporary directory standing in for a multi-tree checkout.
#[derive(Debug)]
pub struct Workspace {
    _dir: TempDir,
    root: Utf8PathBuf,
}

impl Workspace {
    /// Create an empty workspace.
    ///
    /// # Errors
    ///
    /// Returns an error when the directory cannot be created or its path is
    /// not UTF-8.
    pub fn new() -> Result<Self> {
        let dir = tempfile::tempdir().context("create workspace")?;
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf())
            .map_err(|path| anyhow::anyhow!("workspace {} is not UTF-8", path.display()))?;
        Ok(Self { _dir: dir, root })
    }

    /// Workspace root.
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Write `text` to the workspace-relative `path`.
    ///
    /// # Errors
    ///
    /// Returns an error when the file cannot be written.
    pub fn write(&self, path: &str, text: &str) -> Result<Utf8PathBuf> {
        let full = self.root.join(path);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).with_context(|| format!("create {parent}"))?;
        }
        fs::write(&full, text).with_context(|| format!("write {full}"))?;
        Ok(full)
    }

    /// Write `document` as JSON to the workspace-relative `path`.
    ///
    /// # Errors
    ///
    /// Returns an error when the file cannot be written.
    pub fn write_json(&self, path: &str, document: &Value) -> Result<Utf8PathBuf> {
        let text = serde_json::to_string_pretty(document).context("serialize document")?;
        self.write(path, &text)
    }

    /// Read the workspace-relative `path`.
    ///
    /// # Errors
    ///
    /// Returns an error when the file cannot be read.
    pub fn read(&self, path: &str) -> Result<String> {
        let full = self.root.join(path);
        fs::read_to_string(&full).with_context(|| format!("read {full}"))
    }
}
