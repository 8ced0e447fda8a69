//! Capabilities a tree reports from `describe`.

use super::OrchestratorError;
use crate::inner_tree::InnerTree;
use serde::Deserialize;
use std::fs;

/// Highest inner-tree protocol version this orchestrator understands.
pub const ORCHESTRATOR_PROTOCOL_VERSION: u32 = 1;

/// Parsed `tree_info.json`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct TreeInfo {
    /// Whether the tree's `inner_tree.ninja` must be included in the build.
    pub requires_ninja: bool,
    /// Protocol version the tree speaks.
    pub orchestrator_protocol_version: u32,
}

/// Read and check the tree info `tree` wrote during `describe`.
///
/// # Errors
///
/// Returns an [`OrchestratorError`] when the file is missing or malformed, or
/// when the tree speaks a newer protocol than
/// [`ORCHESTRATOR_PROTOCOL_VERSION`].
pub fn read_tree_info(tree: &InnerTree) -> Result<TreeInfo, OrchestratorError> {
    let path = tree.out().tree_info_file();
    let text = fs::read_to_string(&path).map_err(|source| OrchestratorError::MissingTreeInfo {
        tree: tree.key().clone(),
        path: path.clone(),
        source,
    })?;
    let info: TreeInfo =
        serde_json::from_str(&text).map_err(|source| OrchestratorError::MalformedTreeInfo {
            tree: tree.key().clone(),
            path,
            source,
        })?;
    if info.orchestrator_protocol_version > ORCHESTRATOR_PROTOCOL_VERSION {
        return Err(OrchestratorError::UnsupportedProtocol {
            tree: tree.key().clone(),
            found: info.orchestrator_protocol_version,
            supported: ORCHESTRATOR_PROTOCOL_VERSION,
        });
    }
    Ok(info)
}
