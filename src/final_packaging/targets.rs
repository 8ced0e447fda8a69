//! The optional packaging manifest written by `analyze`.

use super::PackagingError;
use camino::Utf8Path;
use serde::Deserialize;
use std::fs;
use std::io;

/// Parsed `build_targets.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BuildTargets {
    /// Modules shared with other trees.
    pub modules: Vec<ModuleTarget>,
    /// Files copied into the staging area.
    pub staging: Vec<StagingEntry>,
    /// Files copied into the distribution area.
    pub dist: Vec<DistEntry>,
}

/// A packaged module.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ModuleTarget {
    /// Module name.
    pub name: String,
    /// Module type. Only `apex` is packaged.
    #[serde(rename = "type")]
    pub module_type: String,
    /// Tree-relative path of the built module.
    pub file: String,
}

/// A staged file; exactly one of `src` and `obj` must be set.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StagingEntry {
    /// Path under the staging area.
    pub dest: String,
    /// Source relative to the tree root.
    #[serde(default)]
    pub src: Option<String>,
    /// Source relative to the tree's output directory.
    #[serde(default)]
    pub obj: Option<String>,
}

/// A distributed file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DistEntry {
    /// Path under the distribution area.
    pub dest: String,
    /// Source relative to the tree root.
    pub src: String,
}

/// Load `path`, treating a missing file as "nothing to package".
///
/// # Errors
///
/// Returns [`PackagingError::ReadTargets`] or [`PackagingError::ParseTargets`]
/// for an unreadable or malformed file.
pub fn load_build_targets(path: &Utf8Path) -> Result<Option<BuildTargets>, PackagingError> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(PackagingError::ReadTargets {
                path: path.to_owned(),
                source,
            });
        }
    };
    serde_json::from_str(&text)
        .map(Some)
        .map_err(|source| PackagingError::ParseTargets {
            path: path.to_owned(),
            source,
        })
}
