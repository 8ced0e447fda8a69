//! Locating combo files under the workspace.

use camino::{Utf8Path, Utf8PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Directory name that holds combo files.
pub const COMBO_DIR_NAME: &str = "multitree_combos";
/// File extension of combo files.
pub const COMBO_EXTENSION: &str = "mcombo";

/// Combo directory that takes precedence over every vendor and device one.
const BUILD_COMBO_DIR: &str = "build/orchestrator/multitree_combos";
/// Roots searched for combo directories after [`BUILD_COMBO_DIR`], in order.
const SEARCH_ROOTS: [&str; 2] = ["vendor", "device"];
/// How deep below a search root a combo directory may sit.
const MAX_DIR_DEPTH: usize = 6;
/// How deep below a combo directory a combo file may sit.
const MAX_FILE_DEPTH: usize = 10;

/// Walk `root` in name order, yielding UTF-8 entries up to `max_depth`.
fn walk(root: &Utf8Path, max_depth: usize) -> WalkDir {
    WalkDir::new(root)
        .max_depth(max_depth)
        .sort_by_file_name()
        .follow_links(false)
}

fn utf8_path(entry: &walkdir::DirEntry) -> Option<Utf8PathBuf> {
    Utf8PathBuf::from_path_buf(entry.path().to_path_buf()).ok()
}

fn find_dirs(root: &Utf8Path, name: &str) -> Vec<Utf8PathBuf> {
    if !root.is_dir() {
        return Vec::new();
    }
    let mut found = Vec::new();
    let mut walker = walk(root, MAX_DIR_DEPTH).into_iter();
    while let Some(next) = walker.next() {
        let Ok(entry) = next else { continue };
        if !entry.file_type().is_dir() || entry.file_name() != name {
            continue;
        }
        if let Some(path) = utf8_path(&entry) {
            found.push(path);
        }
        walker.skip_current_dir();
    }
    found
}

fn find_file(dir: &Utf8Path, file_name: &str) -> Option<Utf8PathBuf> {
    walk(dir, MAX_FILE_DEPTH)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file() && entry.file_name() == file_name)
        .find_map(|entry| utf8_path(&entry))
}

/// Every combo directory in `workspace`, in search precedence order.
///
/// The build-local directory comes first, then directories named
/// `multitree_combos` under `vendor/` and then `device/`, each visited in
/// alphabetical order no deeper than six levels.
#[must_use]
pub fn find_config_dirs(workspace: &Utf8Path) -> Vec<Utf8PathBuf> {
    let mut dirs = Vec::new();
    let build_dir = workspace.join(BUILD_COMBO_DIR);
    if build_dir.is_dir() {
        dirs.push(build_dir);
    }
    for root in SEARCH_ROOTS {
        dirs.extend(find_dirs(&workspace.join(root), COMBO_DIR_NAME));
    }
    debug!(count = dirs.len(), "located combo directories");
    dirs
}

/// First `<name>.mcombo` found across the combo directories.
#[must_use]
pub fn find_named_config(workspace: &Utf8Path, name: &str) -> Option<Utf8PathBuf> {
    let file_name = format!("{name}.{COMBO_EXTENSION}");
    find_config_dirs(workspace)
        .iter()
        .find_map(|dir| find_file(dir, &file_name))
}

/// Split `PRODUCT-VARIANT` on its single hyphen.
///
/// # Examples
///
/// ```
/// use multitree::lunch::parse_product_variant;
/// assert_eq!(parse_product_variant("aosp_cf-userdebug"), Some(("aosp_cf", "userdebug")));
/// assert_eq!(parse_product_variant("a-b-c"), None);
/// assert_eq!(parse_product_variant("plain"), None);
/// ```
#[must_use]
pub fn parse_product_variant(arg: &str) -> Option<(&str, &str)> {
    let (product, variant) = arg.split_once('-')?;
    if variant.contains('-') {
        return None;
    }
    Some((product, variant))
}

/// Combo file and variant selected by command-line arguments.
pub type ChosenConfig = (Option<Utf8PathBuf>, Option<String>);

/// Resolve `lunch`-style arguments to a combo file and variant.
///
/// An existing file path (optionally followed by a variant) wins. A single
/// `PRODUCT-VARIANT` token is otherwise resolved through
/// [`find_named_config`]. Anything unresolvable yields `(None, None)`.
#[must_use]
pub fn choose_config_from_args(workspace: &Utf8Path, args: &[String]) -> ChosenConfig {
    let Some(first) = args.first() else {
        return (None, None);
    };
    let candidate = workspace.join(first);
    if args.len() <= 2 && candidate.is_file() {
        return (Some(candidate), args.get(1).cloned());
    }
    if let [arg] = args {
        if let Some((product, variant)) = parse_product_variant(arg) {
            if let Some(file) = find_named_config(workspace, product) {
                return (Some(file), Some(variant.to_owned()));
            }
            debug!(product, "no combo file named after product");
        }
    }
    (None, None)
}

/// Every combo file under the combo directories, in search order.
#[must_use]
pub fn find_all_combo_files(workspace: &Utf8Path) -> Vec<Utf8PathBuf> {
    find_config_dirs(workspace)
        .iter()
        .flat_map(|dir| {
            walk(dir, MAX_FILE_DEPTH)
                .into_iter()
                .filter_map(Result::ok)
                .filter(|entry| entry.file_type().is_file())
                .filter_map(|entry| utf8_path(&entry))
                .filter(|path| path.extension() == Some(COMBO_EXTENSION))
                .collect::<Vec<_>>()
        })
        .collect()
}
