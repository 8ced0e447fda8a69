//! Loading combo files and merging their inheritance chain.

use super::{ConfigError, ConfigErrorKind, LunchConfig};
use camino::{Utf8Path, Utf8PathBuf};
use serde_json::Value;
use std::fs;
use tracing::debug;

/// Key listing the combo files a combo inherits from.
pub const INHERITS_KEY: &str = "inherits";

/// Files currently being loaded, outermost first.
#[derive(Debug, Default)]
struct LoadStack {
    active: Vec<Utf8PathBuf>,
}

impl LoadStack {
    fn contains(&self, identity: &Utf8Path) -> bool {
        self.active.iter().any(|path| path == identity)
    }

    fn describe_cycle(&self, identity: &Utf8Path) -> String {
        let mut chain: Vec<&str> = self
            .active
            .iter()
            .skip_while(|path| *path != identity)
            .map(|path| path.as_str())
            .collect();
        chain.push(identity.as_str());
        chain.join(" -> ")
    }
}

/// Load `file` and every combo it inherits from.
///
/// Relative paths, both `file` and entries of `inherits`, are resolved
/// against `workspace`. Inherited documents are merged in declaration order
/// with the first definition of a key winning, and the document itself wins
/// over everything it inherits. `inherits` is removed from the result.
///
/// # Errors
///
/// Returns a [`ConfigError`] of kind [`ConfigErrorKind::Cycle`] when a file
/// inherits itself directly or transitively, [`ConfigErrorKind::Parse`] for
/// malformed documents, [`ConfigErrorKind::Validate`] for a malformed
/// `inherits` entry and [`ConfigErrorKind::Io`] when a file cannot be read.
pub fn load_config(workspace: &Utf8Path, file: &Utf8Path) -> Result<LunchConfig, ConfigError> {
    load_with_stack(workspace, file, &mut LoadStack::default())
}

fn load_with_stack(
    workspace: &Utf8Path,
    file: &Utf8Path,
    stack: &mut LoadStack,
) -> Result<LunchConfig, ConfigError> {
    let path = workspace.join(file);
    let identity = path.canonicalize_utf8().map_err(|err| {
        ConfigError::new(ConfigErrorKind::Io, format!("cannot open combo: {err}")).at(&path)
    })?;
    if stack.contains(&identity) {
        return Err(ConfigError::new(
            ConfigErrorKind::Cycle,
            format!("inheritance cycle: {}", stack.describe_cycle(&identity)),
        )
        .at(&path));
    }

    let mut document = read_document(&path)?;
    let parents = take_inherits(&mut document).map_err(|err| err.at(&path))?;
    debug!(file = %path, parents = parents.len(), "loaded combo");

    stack.active.push(identity);
    let mut inherited = LunchConfig::new();
    for parent in parents {
        let loaded = load_with_stack(workspace, Utf8Path::new(&parent), stack)
            .map_err(|err| err.included_from(&path))?;
        deep_merge(&mut inherited, loaded);
    }
    stack.active.pop();

    deep_merge(&mut document, inherited);
    Ok(document)
}

fn read_document(path: &Utf8Path) -> Result<LunchConfig, ConfigError> {
    let text = fs::read_to_string(path).map_err(|err| {
        ConfigError::new(ConfigErrorKind::Io, format!("cannot read combo: {err}")).at(path)
    })?;
    let value: Value = serde_json::from_str(&text).map_err(|err| {
        ConfigError::new(ConfigErrorKind::Parse, err.to_string())
            .at(path)
            .with_line(err.line())
    })?;
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(ConfigError::new(ConfigErrorKind::Parse, "combo must be a JSON object").at(path)),
    }
}

fn take_inherits(document: &mut LunchConfig) -> Result<Vec<String>, ConfigError> {
    match document.shift_remove(INHERITS_KEY) {
        None => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .into_iter()
            .map(|item| match item {
                Value::String(path) => Ok(path),
                other => Err(ConfigError::new(
                    ConfigErrorKind::Validate,
                    format!("inherits entries must be strings, found {other}"),
                )),
            })
            .collect(),
        Some(other) => Err(ConfigError::new(
            ConfigErrorKind::Validate,
            format!("inherits must be a list of paths, found {other}"),
        )),
    }
}

/// Merge `addition` into `merged` without overwriting anything.
///
/// Keys missing from `merged` are inserted. When both sides hold an object
/// the two are merged recursively; otherwise the existing value is kept.
///
/// # Examples
///
/// ```
/// use multitree::lunch::{LunchConfig, deep_merge};
/// use serde_json::json;
///
/// let mut merged: LunchConfig = serde_json::from_value(json!({"a": 1, "n": {"x": 1}})).unwrap();
/// let addition: LunchConfig = serde_json::from_value(json!({"a": 2, "b": 3, "n": {"x": 2, "y": 2}})).unwrap();
/// deep_merge(&mut merged, addition);
/// assert_eq!(serde_json::Value::Object(merged), json!({"a": 1, "n": {"x": 1, "y": 2}, "b": 3}));
/// ```
pub fn deep_merge(merged: &mut LunchConfig, addition: LunchConfig) {
    for (key, value) in addition {
        match (merged.get_mut(&key), value) {
            (None, value) => {
                merged.insert(key, value);
            }
            (Some(Value::Object(existing)), Value::Object(incoming)) => {
                deep_merge(existing, incoming);
            }
            (Some(_), _) => {}
        }
    }
}
