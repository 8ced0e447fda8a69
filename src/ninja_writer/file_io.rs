//! Capability-scoped writes of rendered build files.

use super::NinjaContent;
use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8 as cap_fs};
use std::io::{self, Write};
use tracing::info;

fn write_ninja_file_utf8(dir: &cap_fs::Dir, path: &Utf8Path, content: &NinjaContent) -> io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_str().is_empty()) {
        dir.create_dir_all(parent)?;
    }
    let mut file = dir.create(path)?;
    file.write_all(content.as_str().as_bytes())?;
    file.flush()?;
    file.sync_all()
}

/// Open the nearest existing ancestor of `path` and return it along with the
/// remainder of the path relative to that directory.
fn derive_dir_and_relative(path: &Utf8Path) -> io::Result<(cap_fs::Dir, Utf8PathBuf)> {
    if path.is_relative() {
        let dir = cap_fs::Dir::open_ambient_dir(".", ambient_authority())?;
        return Ok((dir, path.to_owned()));
    }

    let mut ancestors = path.ancestors();
    ancestors.next();
    let (base, dir) = ancestors
        .find_map(|candidate| {
            cap_fs::Dir::open_ambient_dir(candidate, ambient_authority())
                .ok()
                .map(|dir| (candidate, dir))
        })
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no existing ancestor directory for {path}"),
            )
        })?;
    let relative = path
        .strip_prefix(base)
        .map_err(|err| io::Error::new(io::ErrorKind::InvalidInput, err))?
        .to_owned();
    Ok((dir, relative))
}

/// Write `content` to `path`, creating missing parent directories.
///
/// # Errors
///
/// Returns an I/O error when no ancestor of `path` can be opened or the file
/// cannot be created, written or synced.
pub fn write_ninja_file(path: &Utf8Path, content: &NinjaContent) -> io::Result<()> {
    let (dir, relative) = derive_dir_and_relative(path)?;
    write_ninja_file_utf8(&dir, &relative, content)?;
    info!("Wrote build file to {path}");
    Ok(())
}
