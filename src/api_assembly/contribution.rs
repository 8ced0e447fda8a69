//! Contribution documents written by `export_api_contributions`.

use super::AssemblyError;
use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::io;

/// File extension of contribution documents.
pub const CONTRIBUTION_EXTENSION: &str = "json";

/// One domain's contribution to one API surface version.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ApiContribution {
    /// Surface name, for example `public_api`.
    pub name: String,
    /// Surface version.
    pub version: u32,
    /// Domain that exported this document.
    pub api_domain: String,
    /// Native libraries.
    #[serde(default)]
    pub cc_libraries: Vec<CcLibrary>,
    /// Java libraries.
    #[serde(default)]
    pub java_libraries: Vec<JavaLibrary>,
    /// Resource libraries.
    #[serde(default)]
    pub resource_libraries: Vec<ResourceLibrary>,
    /// Host tools. Recorded but not assembled.
    #[serde(default)]
    pub host_executables: Vec<HostExecutable>,
    /// Any other top-level keys.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// A native library's headers and API files.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CcLibrary {
    /// Library name.
    pub name: String,
    /// Header sets exported by the library.
    #[serde(default)]
    pub headers: Vec<HeaderSet>,
    /// API description files.
    #[serde(default)]
    pub api: Vec<String>,
}

/// Header files relative to a tree-relative include root.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HeaderSet {
    /// Include root, relative to the tree root.
    pub root: String,
    /// Header paths, relative to `root`.
    #[serde(default)]
    pub files: Vec<String>,
}

/// A Java library's API files.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct JavaLibrary {
    /// Library name.
    pub name: String,
    /// API description files, relative to the tree root.
    #[serde(default)]
    pub api: Vec<String>,
}

/// A resource library's API files.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ResourceLibrary {
    /// Library name.
    pub name: String,
    /// One API file or several.
    #[serde(default)]
    pub api: StringOrList,
}

/// A host tool built by a tree.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HostExecutable {
    /// Tool name.
    pub name: String,
    /// Tree-relative path of the binary.
    pub binary: String,
    /// Files the binary needs at run time.
    #[serde(default)]
    pub runfiles: Vec<String>,
}

/// A single string, a list of strings, or nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum StringOrList {
    /// No value provided.
    #[default]
    Empty,
    /// A single string item.
    String(String),
    /// A list of string items.
    List(Vec<String>),
}

impl StringOrList {
    /// Items in declaration order.
    #[must_use]
    pub fn as_slice(&self) -> &[String] {
        match self {
            Self::Empty => &[],
            Self::String(item) => std::slice::from_ref(item),
            Self::List(items) => items,
        }
    }
}

/// Contribution files in `dir`, sorted by file name.
///
/// Only top-level `*.json` files are considered. A missing directory holds no
/// contributions.
///
/// # Errors
///
/// Returns [`AssemblyError::ReadDir`] when an existing directory cannot be
/// listed.
pub fn contribution_files(dir: &Utf8Path) -> Result<Vec<Utf8PathBuf>, AssemblyError> {
    let read_dir_error = |source| AssemblyError::ReadDir {
        path: dir.to_owned(),
        source,
    };
    let entries = match dir.read_dir_utf8() {
        Ok(entries) => entries,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(read_dir_error(err)),
    };
    let mut files = Vec::new();
    for result in entries {
        let entry = result.map_err(read_dir_error)?;
        let is_file = entry.file_type().map_err(read_dir_error)?.is_file();
        if is_file && entry.path().extension() == Some(CONTRIBUTION_EXTENSION) {
            files.push(entry.into_path());
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// Read and parse one contribution document.
///
/// # Errors
///
/// Returns [`AssemblyError::ReadContribution`] or
/// [`AssemblyError::ParseContribution`], both naming `path`.
pub fn load_contribution_file(path: &Utf8Path) -> Result<ApiContribution, AssemblyError> {
    let text = fs::read_to_string(path).map_err(|source| AssemblyError::ReadContribution {
        path: path.to_owned(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| AssemblyError::ParseContribution {
        path: path.to_owned(),
        source,
    })
}
