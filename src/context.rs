//! Explicit run context shared by every pipeline phase.
//!
//! A [`RunContext`] bundles the workspace root, the outer output layout and
//! the external tools. It is built once by the CLI and passed by reference,
//! so nothing in the pipeline reads process-global state.

use camino::{Utf8Path, Utf8PathBuf};
use multitree_env::{COPY_TOOL_ENV, DEFAULT_OUT_DIR, NINJA_ENV, OUT_DIR_ENV};
use std::ffi::OsString;

use crate::ninja_writer::DEFAULT_COPY_TOOL;

/// Runner program used when no override is configured.
pub const NINJA_PROGRAM: &str = "ninja";

/// Layout of the orchestrator's output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutDir {
    root: Utf8PathBuf,
}

impl OutDir {
    /// Use `root` as the output directory.
    #[must_use]
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve the output directory for `workspace`.
    ///
    /// An explicit override wins over the `OUT_DIR` environment variable,
    /// which wins over `out`. Relative locations are anchored at the
    /// workspace root.
    pub fn resolve_with<F>(workspace: &Utf8Path, explicit: Option<&Utf8Path>, mut read_env: F) -> Self
    where
        F: FnMut(&str) -> Option<OsString>,
    {
        let chosen = explicit.map(Utf8Path::to_owned).or_else(|| {
            read_env(OUT_DIR_ENV)
                .filter(|value| !value.is_empty())
                .and_then(|value| Utf8PathBuf::from_path_buf(value.into()).ok())
        });
        let root = chosen.unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_OUT_DIR));
        Self::new(workspace.join(root))
    }

    /// Output root.
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Directory under which every inner tree gets its own output.
    #[must_use]
    pub fn trees_dir(&self) -> Utf8PathBuf {
        self.root.join("trees")
    }

    /// Build file holding the assembled API surfaces.
    #[must_use]
    pub fn api_ninja_file(&self) -> Utf8PathBuf {
        self.root.join("api_surfaces.ninja")
    }

    /// Staging directory for one assembled stub library.
    #[must_use]
    pub fn api_library_dir(&self, surface: &str, version: u32, library: &str) -> Utf8PathBuf {
        self.root
            .join("api_surfaces")
            .join(surface)
            .join(version.to_string())
            .join(library)
    }

    /// Scratch directory for one assembled stub library.
    #[must_use]
    pub fn api_library_work_dir(&self, surface: &str, version: u32, library: &str) -> Utf8PathBuf {
        self.root
            .join("intermediates/api_surfaces")
            .join(surface)
            .join(version.to_string())
            .join(library)
    }

    /// Top-level build file handed to the runner.
    #[must_use]
    pub fn outer_ninja_file(&self) -> Utf8PathBuf {
        self.root.join("multitree.ninja")
    }

    /// Shared location for a packaged module of `module_type`.
    #[must_use]
    pub fn module_share_dir(&self, module_type: &str, name: &str) -> Utf8PathBuf {
        self.root.join("shared").join(module_type).join(name)
    }

    /// Staging area.
    #[must_use]
    pub fn staging_dir(&self) -> Utf8PathBuf {
        self.root.join("staging")
    }

    /// Distribution area.
    #[must_use]
    pub fn dist_dir(&self) -> Utf8PathBuf {
        self.root.join("dist")
    }
}

/// External programs the orchestrator drives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tools {
    ninja: Utf8PathBuf,
    copy_tool: String,
}

impl Default for Tools {
    fn default() -> Self {
        Self::new(NINJA_PROGRAM, DEFAULT_COPY_TOOL)
    }
}

impl Tools {
    /// Use the given runner and copy programs.
    #[must_use]
    pub fn new(ninja: impl Into<Utf8PathBuf>, copy_tool: impl Into<String>) -> Self {
        Self {
            ninja: ninja.into(),
            copy_tool: copy_tool.into(),
        }
    }

    /// Resolve tool overrides through `read_env`.
    ///
    /// Values that are empty or not valid UTF-8 are ignored.
    pub fn from_env_with<F>(mut read_env: F) -> Self
    where
        F: FnMut(&str) -> Option<OsString>,
    {
        let mut read_utf8 = |key: &str| {
            read_env(key)
                .and_then(|value| value.into_string().ok())
                .filter(|value| !value.is_empty())
        };
        let ninja = read_utf8(NINJA_ENV).map_or_else(|| Utf8PathBuf::from(NINJA_PROGRAM), Utf8PathBuf::from);
        let copy_tool = read_utf8(COPY_TOOL_ENV).unwrap_or_else(|| DEFAULT_COPY_TOOL.to_owned());
        Self { ninja, copy_tool }
    }

    /// Runner executable.
    #[must_use]
    pub fn ninja(&self) -> &Utf8Path {
        &self.ninja
    }

    /// Copy program used by the shared copy rule.
    #[must_use]
    pub fn copy_tool(&self) -> &str {
        &self.copy_tool
    }
}

/// Everything a pipeline phase needs to know about its surroundings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunContext {
    workspace: Utf8PathBuf,
    out: OutDir,
    tools: Tools,
}

impl RunContext {
    /// Bundle an absolute `workspace` root with its output layout and tools.
    #[must_use]
    pub fn new(workspace: impl Into<Utf8PathBuf>, out: OutDir, tools: Tools) -> Self {
        Self {
            workspace: workspace.into(),
            out,
            tools,
        }
    }

    /// Workspace root.
    #[must_use]
    pub fn workspace(&self) -> &Utf8Path {
        &self.workspace
    }

    /// Output layout.
    #[must_use]
    pub const fn out(&self) -> &OutDir {
        &self.out
    }

    /// Tool locations.
    #[must_use]
    pub const fn tools(&self) -> &Tools {
        &self.tools
    }

    /// Anchor a workspace-relative `path` at the workspace root.
    #[must_use]
    pub fn resolve(&self, path: &Utf8Path) -> Utf8PathBuf {
        self.workspace.join(path)
    }

    /// Express `path` for a build file run from the workspace root.
    ///
    /// Paths inside the workspace become relative so generated files do not
    /// depend on where the workspace is checked out.
    #[must_use]
    pub fn ninja_path(&self, path: &Utf8Path) -> Utf8PathBuf {
        path.strip_prefix(&self.workspace)
            .map_or_else(|_| path.to_owned(), Utf8Path::to_owned)
    }
}
