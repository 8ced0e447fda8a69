//! Lunch combo resolution.
//!
//! A combo file is a JSON object naming which inner trees and products build
//! together. Combos live in `multitree_combos` directories, may inherit from
//! other combos and are selected either by path or by a `PRODUCT-VARIANT`
//! token.

mod error;
mod load;
mod search;

pub use error::{ConfigError, ConfigErrorKind};
pub use load::{INHERITS_KEY, deep_merge, load_config};
pub use search::{
    COMBO_DIR_NAME, COMBO_EXTENSION, ChosenConfig, choose_config_from_args, find_all_combo_files,
    find_config_dirs, find_named_config, parse_product_variant,
};

use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;
use itertools::Itertools;
use multitree_env::COMBO_ENV;
use serde::Deserialize;
use serde_json::Value;
use std::ffi::OsString;
use tracing::debug;

/// A merged combo document.
pub type LunchConfig = serde_json::Map<String, Value>;

/// Key marking a combo as selectable by users.
pub const LUNCHABLE_KEY: &str = "lunchable";

/// Tree and product chosen for one domain.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TreeSelection {
    /// Workspace-relative tree root.
    #[serde(alias = "inner-tree")]
    pub tree: String,
    /// Product built inside the tree, if any.
    #[serde(default)]
    pub product: Option<String>,
}

impl TreeSelection {
    /// Product, treating an empty string as absent.
    #[must_use]
    pub fn product(&self) -> Option<&str> {
        self.product.as_deref().filter(|p| !p.is_empty())
    }
}

/// Typed view of the parts of a combo the orchestrator acts on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ComboSpec {
    /// Whether users may select this combo directly.
    pub lunchable: bool,
    /// Tree providing the `system` domain.
    pub system: Option<TreeSelection>,
    /// Tree providing the `vendor` domain.
    pub vendor: Option<TreeSelection>,
    /// Module domains by name.
    pub modules: IndexMap<String, TreeSelection>,
}

impl ComboSpec {
    /// Interpret a merged combo.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigErrorKind::Validate`] error when a known key has the
    /// wrong shape.
    pub fn from_config(config: &LunchConfig) -> Result<Self, ConfigError> {
        serde_json::from_value(Value::Object(config.clone()))
            .map_err(|err| ConfigError::new(ConfigErrorKind::Validate, err.to_string()))
    }

    /// Every `(domain, selection)` pair: `system`, `vendor`, then modules.
    pub fn domains(&self) -> impl Iterator<Item = (&str, &TreeSelection)> {
        let fixed = [("system", self.system.as_ref()), ("vendor", self.vendor.as_ref())];
        fixed
            .into_iter()
            .filter_map(|(name, selection)| selection.map(|s| (name, s)))
            .chain(self.modules.iter().map(|(name, s)| (name.as_str(), s)))
    }
}

/// The combo a run will use.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedConfig {
    /// Combo file that was loaded.
    pub file: Utf8PathBuf,
    /// Build variant requested alongside the combo.
    pub variant: Option<String>,
    /// Fully merged document.
    pub config: LunchConfig,
}

fn is_lunchable(config: &LunchConfig) -> bool {
    config.get(LUNCHABLE_KEY) == Some(&Value::Bool(true))
}

/// Resolve, load and validate the combo for this run.
///
/// `args` are `lunch`-style arguments. When empty, the value of
/// `TARGET_BUILD_COMBO` read through `read_env` is resolved the same way.
///
/// # Errors
///
/// Returns [`ConfigErrorKind::Identify`] when no combo can be found,
/// [`ConfigErrorKind::Validate`] when the combo is not lunchable, and any
/// error raised while loading it.
pub fn load_current_config<F>(
    workspace: &Utf8Path,
    args: &[String],
    mut read_env: F,
) -> Result<SelectedConfig, ConfigError>
where
    F: FnMut(&str) -> Option<OsString>,
{
    let args: Vec<String> = if args.is_empty() {
        read_env(COMBO_ENV)
            .and_then(|value| value.into_string().ok())
            .filter(|value| !value.is_empty())
            .into_iter()
            .collect()
    } else {
        args.to_vec()
    };
    if args.is_empty() {
        return Err(ConfigError::new(
            ConfigErrorKind::Identify,
            format!("no combo selected; pass one or set {COMBO_ENV}"),
        ));
    }
    let (Some(file), variant) = choose_config_from_args(workspace, &args) else {
        return Err(ConfigError::new(
            ConfigErrorKind::Identify,
            format!("cannot find combo for `{}`", args.join(" ")),
        ));
    };
    let config = load_config(workspace, &file)?;
    if !is_lunchable(&config) {
        return Err(
            ConfigError::new(ConfigErrorKind::Validate, "combo is not lunchable").at(&file),
        );
    }
    debug!(file = %file, ?variant, "selected combo");
    Ok(SelectedConfig {
        file,
        variant,
        config,
    })
}

/// Every combo file whose merged document is lunchable, sorted by path.
///
/// Combos that fail to load are skipped.
#[must_use]
pub fn find_all_lunchable(workspace: &Utf8Path) -> Vec<Utf8PathBuf> {
    find_all_combo_files(workspace)
        .into_iter()
        .filter(|file| match load_config(workspace, file) {
            Ok(config) => is_lunchable(&config),
            Err(err) => {
                debug!(%err, "skipping combo that failed to load");
                false
            }
        })
        .sorted()
        .collect()
}

/// Human-readable summary of the selected combo.
///
/// # Examples
///
/// ```
/// use camino::Utf8Path;
/// use multitree::lunch::{ComboSpec, TreeSelection, make_config_header};
///
/// let spec = ComboSpec {
///     system: Some(TreeSelection { tree: "aosp".into(), product: Some("aosp_cf".into()) }),
///     ..ComboSpec::default()
/// };
/// let header = make_config_header(Utf8Path::new("x.mcombo"), &spec, Some("eng"));
/// assert!(header.contains("system     aosp  aosp_cf"));
/// ```
#[must_use]
pub fn make_config_header(file: &Utf8Path, spec: &ComboSpec, variant: Option<&str>) -> String {
    let mut rows: Vec<[&str; 3]> = vec![
        ["Component", "Path", "Product"],
        ["---------", "----", "-------"],
    ];
    rows.extend(
        spec.domains()
            .map(|(name, sel)| [name, sel.tree.as_str(), sel.product().unwrap_or_default()]),
    );
    let widths: Vec<usize> = (0..3)
        .map(|col| {
            rows.iter()
                .filter_map(|row| row.get(col))
                .map(|cell| cell.len())
                .max()
                .unwrap_or_default()
        })
        .collect();
    let table = rows
        .iter()
        .map(|row| {
            row.iter()
                .zip(&widths)
                .map(|(cell, width)| format!("{cell:<width$}"))
                .join("  ")
                .trim_end()
                .to_owned()
        })
        .join("\n");
    let rule = "=".repeat(40);
    format!(
        "{rule}\n{COMBO_ENV}={file}\nTARGET_BUILD_VARIANT={}\n\n{table}\n{rule}\n",
        variant.unwrap_or_default()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    fn config(value: &Value) -> LunchConfig {
        value.as_object().cloned().unwrap_or_default()
    }

    #[rstest]
    fn combo_spec_reads_trees_and_modules() {
        let spec = ComboSpec::from_config(&config(&json!({
            "lunchable": true,
            "system": {"inner-tree": "aosp", "product": "aosp_cf"},
            "vendor": {"tree": "vendor/acme", "product": ""},
            "modules": {"com.android.bionic": {"tree": "bionic-tree"}},
            "unrelated": 1
        })))
        .unwrap_or_default();
        assert!(spec.lunchable);
        let domains: Vec<_> = spec
            .domains()
            .map(|(name, sel)| (name, sel.tree.as_str(), sel.product()))
            .collect();
        assert_eq!(
            domains,
            vec![
                ("system", "aosp", Some("aosp_cf")),
                ("vendor", "vendor/acme", None),
                ("com.android.bionic", "bionic-tree", None),
            ]
        );
    }

    #[rstest]
    fn combo_spec_rejects_wrong_shapes() {
        let err = ComboSpec::from_config(&config(&json!({"system": "aosp"})));
        assert!(matches!(err, Err(e) if e.kind() == ConfigErrorKind::Validate));
    }

    #[rstest]
    fn header_lists_domains_in_table() {
        let spec = ComboSpec::from_config(&config(&json!({
            "system": {"tree": "aosp", "product": "aosp_cf"},
            "modules": {"com.android.bionic": {"tree": "bionic"}}
        })))
        .unwrap_or_default();
        let header = make_config_header(Utf8Path::new("c.mcombo"), &spec, Some("userdebug"));
        let expected = "\
========================================
TARGET_BUILD_COMBO=c.mcombo
TARGET_BUILD_VARIANT=userdebug

Component           Path    Product
---------           ----    -------
system              aosp    aosp_cf
com.android.bionic  bionic
========================================
";
        assert_eq!(header, expected);
    }

    #[rstest]
    fn missing_selection_is_identify_error() {
        let err = load_current_config(Utf8Path::new("/nonexistent"), &[], |_| None);
        assert!(matches!(err, Err(e) if e.kind() == ConfigErrorKind::Identify));
    }
}
