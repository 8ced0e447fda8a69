//! Output locations and copy bookkeeping for one stub library.

use super::StubLibraryKey;
use crate::context::OutDir;
use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;
use tracing::warn;

/// Where a stub library is assembled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryLayout {
    /// Final artefact layout other builds depend on.
    pub staging_dir: Utf8PathBuf,
    /// Private intermediates; never a dependency of other rules.
    pub work_dir: Utf8PathBuf,
}

impl LibraryLayout {
    /// Layout for `key` under `out`.
    #[must_use]
    pub fn new(out: &OutDir, key: &StubLibraryKey) -> Self {
        Self {
            staging_dir: out.api_library_dir(&key.surface, key.version, &key.name),
            work_dir: out.api_library_work_dir(&key.surface, key.version, &key.name),
        }
    }
}

/// Pending copies keyed by destination.
///
/// A destination staged twice keeps its first position with the latest
/// source, so the last contribution wins.
#[derive(Debug, Default)]
pub struct StagedCopies {
    copies: IndexMap<Utf8PathBuf, Utf8PathBuf>,
}

impl StagedCopies {
    /// Stage a copy of `src` to `dest`.
    pub fn insert(&mut self, dest: Utf8PathBuf, src: Utf8PathBuf) {
        if let Some(previous) = self.copies.get(&dest)
            && *previous != src
        {
            warn!(%dest, %previous, replacement = %src, "duplicate staged file; last contribution wins");
        }
        self.copies.insert(dest, src);
    }

    /// Copies in first-staged order.
    pub fn iter(&self) -> impl Iterator<Item = (&Utf8Path, &Utf8Path)> {
        self.copies
            .iter()
            .map(|(dest, src)| (dest.as_path(), src.as_path()))
    }

    /// Destinations in first-staged order.
    pub fn destinations(&self) -> impl Iterator<Item = &Utf8Path> {
        self.copies.keys().map(Utf8PathBuf::as_path)
    }
}
