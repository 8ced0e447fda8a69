//! Inner-tree registry.
//!
//! Each distinct `(root, product)` pair is one [`InnerTree`] owning the API
//! domains built inside it and an exclusive slice of the output directory.
//! Trees are kept in a sorted map so every pass over them, and therefore
//! every generated file, is deterministic.

mod invoke;
mod layout;

pub use invoke::InvokeError;
pub use layout::OutDirLayout;

use crate::context::RunContext;
use crate::lunch::{ComboSpec, ConfigError, ConfigErrorKind};
use camino::{Utf8Path, Utf8PathBuf};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

/// Entry point every inner tree provides at its root.
pub const ENTRYPOINT: &str = ".inner_build";
const OUT_DIR_SEPARATOR: char = '@';

fn escape_dir_component(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '%' => escaped.push_str("%25"),
            '/' => escaped.push_str("%2F"),
            OUT_DIR_SEPARATOR => escaped.push_str("%40"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Identity of an inner tree.
///
/// Ordered lexicographically by root, then product, with a missing product
/// sorting before any named one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TreeKey {
    root: Utf8PathBuf,
    product: Option<String>,
}

impl TreeKey {
    /// Identify the tree at `root` building `product`.
    ///
    /// An empty product is treated as absent.
    #[must_use]
    pub fn new(root: impl Into<Utf8PathBuf>, product: Option<&str>) -> Self {
        Self {
            root: root.into(),
            product: product.filter(|p| !p.is_empty()).map(str::to_owned),
        }
    }

    /// Workspace-relative tree root.
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Product built in this tree.
    #[must_use]
    pub fn product(&self) -> Option<&str> {
        self.product.as_deref()
    }

    /// Name of this tree's directory under `<out>/trees`.
    ///
    /// A single flat component, `<root>@<product>` (`<root>@` without a
    /// product), with `%`, `/` and `@` percent-escaped in both halves so
    /// distinct keys never share or nest directories.
    ///
    /// # Examples
    ///
    /// ```
    /// use multitree::inner_tree::TreeKey;
    ///
    /// assert_eq!(TreeKey::new("vendor/acme", Some("phone")).out_dir_name(), "vendor%2Facme@phone");
    /// assert_eq!(TreeKey::new("aosp", None).out_dir_name(), "aosp@");
    /// ```
    #[must_use]
    pub fn out_dir_name(&self) -> String {
        let mut name = escape_dir_component(self.root.as_str());
        name.push(OUT_DIR_SEPARATOR);
        if let Some(product) = self.product() {
            name.push_str(&escape_dir_component(product));
        }
        name
    }
}

impl Ord for TreeKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.root
            .as_str()
            .cmp(other.root.as_str())
            .then_with(|| self.product.cmp(&other.product))
    }
}

impl PartialOrd for TreeKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for TreeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.product {
            Some(product) => write!(f, "{} ({product})", self.root),
            None => write!(f, "{}", self.root),
        }
    }
}

/// A named build slice owned by exactly one tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiDomain {
    /// Domain name, unique across the build.
    pub name: String,
    /// Owning tree.
    pub tree: TreeKey,
    /// Product the domain is built for.
    pub product: Option<String>,
}

/// One inner tree and the domains built inside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InnerTree {
    key: TreeKey,
    domains: BTreeMap<String, ApiDomain>,
    out: OutDirLayout,
}

impl InnerTree {
    fn new(key: TreeKey, trees_dir: &Utf8Path) -> Self {
        let out = OutDirLayout::new(trees_dir.join(key.out_dir_name()));
        Self {
            key,
            domains: BTreeMap::new(),
            out,
        }
    }

    /// Tree identity.
    #[must_use]
    pub const fn key(&self) -> &TreeKey {
        &self.key
    }

    /// Domains owned by this tree, by name.
    #[must_use]
    pub const fn domains(&self) -> &BTreeMap<String, ApiDomain> {
        &self.domains
    }

    /// This tree's output layout.
    #[must_use]
    pub const fn out(&self) -> &OutDirLayout {
        &self.out
    }
}

/// Every inner tree taking part in a build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InnerTrees {
    trees: BTreeMap<TreeKey, InnerTree>,
    domains: BTreeMap<String, TreeKey>,
}

impl InnerTrees {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register domain `name` as built in `root` for `product`.
    ///
    /// The tree is created on first use, with its output under
    /// `<out>/trees`.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigErrorKind::Validate`] error when `name` is already
    /// registered.
    pub fn add_domain(
        &mut self,
        ctx: &RunContext,
        name: &str,
        root: &Utf8Path,
        product: Option<&str>,
    ) -> Result<&ApiDomain, ConfigError> {
        if let Some(existing) = self.domains.get(name) {
            return Err(ConfigError::new(
                ConfigErrorKind::Validate,
                format!("domain {name} is already built by {existing}"),
            ));
        }
        let key = TreeKey::new(root, product);
        let trees_dir = ctx.out().trees_dir();
        let tree = self
            .trees
            .entry(key.clone())
            .or_insert_with(|| InnerTree::new(key.clone(), &trees_dir));
        debug!(domain = name, tree = %key, "registered api domain");
        self.domains.insert(name.to_owned(), key.clone());
        let domain = tree
            .domains
            .entry(name.to_owned())
            .or_insert_with(|| ApiDomain {
                name: name.to_owned(),
                tree: key,
                product: product.filter(|p| !p.is_empty()).map(str::to_owned),
            });
        Ok(domain)
    }

    /// Build the registry from a combo: `system`, `vendor`, then modules.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigErrorKind::Validate`] error for duplicate domains or
    /// a combo that selects no trees.
    pub fn from_combo(ctx: &RunContext, spec: &ComboSpec) -> Result<Self, ConfigError> {
        let mut trees = Self::new();
        for (name, selection) in spec.domains() {
            trees.add_domain(ctx, name, Utf8Path::new(&selection.tree), selection.product())?;
        }
        if trees.is_empty() {
            return Err(ConfigError::new(
                ConfigErrorKind::Validate,
                "combo does not select any inner trees",
            ));
        }
        Ok(trees)
    }

    /// Whether no tree is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }

    /// Number of distinct trees.
    #[must_use]
    pub fn len(&self) -> usize {
        self.trees.len()
    }

    /// Look up a tree by key.
    #[must_use]
    pub fn get(&self, key: &TreeKey) -> Option<&InnerTree> {
        self.trees.get(key)
    }

    /// Look up the domain called `name`.
    #[must_use]
    pub fn domain(&self, name: &str) -> Option<&ApiDomain> {
        let key = self.domains.get(name)?;
        self.trees.get(key)?.domains.get(name)
    }

    /// Trees in key order.
    pub fn trees(&self) -> impl Iterator<Item = &InnerTree> {
        self.trees.values()
    }

    /// Call `f` once per tree in key order, collecting the results.
    ///
    /// Iteration stops at the first error, which is returned unchanged.
    ///
    /// # Errors
    ///
    /// Returns the first error produced by `f`.
    pub fn for_each_tree<T, E, F>(&self, mut f: F) -> Result<BTreeMap<TreeKey, T>, E>
    where
        F: FnMut(&TreeKey, &InnerTree) -> Result<T, E>,
    {
        self.trees
            .iter()
            .map(|(key, tree)| f(key, tree).map(|value| (key.clone(), value)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, reason = "registry tests use known-good fixtures")]

    use super::*;
    use crate::context::{OutDir, Tools};
    use rstest::{fixture, rstest};

    #[fixture]
    fn ctx() -> RunContext {
        RunContext::new("/ws", OutDir::new("/ws/out"), Tools::default())
    }

    #[rstest]
    #[case(TreeKey::new("a", None), TreeKey::new("a", Some("p")))]
    #[case(TreeKey::new("a", Some("p")), TreeKey::new("a", Some("q")))]
    #[case(TreeKey::new("a", Some("z")), TreeKey::new("b", None))]
    #[case(TreeKey::new("a-b", None), TreeKey::new("a/b", None))]
    fn tree_keys_order_lexicographically(#[case] lower: TreeKey, #[case] higher: TreeKey) {
        assert!(lower < higher);
    }

    #[rstest]
    #[case(TreeKey::new("aosp", Some("aosp_cf")), "aosp@aosp_cf")]
    #[case(TreeKey::new("vendor/acme", None), "vendor%2Facme@")]
    #[case(TreeKey::new("bionic", Some("")), "bionic@")]
    #[case(TreeKey::new("a@b%c", Some("d/e")), "a%40b%25c@d%2Fe")]
    fn out_dir_names(#[case] key: TreeKey, #[case] expected: &str) {
        assert_eq!(key.out_dir_name(), expected);
    }

    #[rstest]
    #[case(TreeKey::new("a", Some("b_c")), TreeKey::new("a_b", Some("c")))]
    #[case(TreeKey::new("x", None), TreeKey::new("x", Some("unbundled")))]
    #[case(TreeKey::new("aosp_p/sub", None), TreeKey::new("aosp", Some("p")))]
    #[case(TreeKey::new("a", Some("b@c")), TreeKey::new("a@b", Some("c")))]
    #[case(TreeKey::new("a%2Fb", None), TreeKey::new("a/b", None))]
    fn distinct_trees_get_separate_flat_out_dirs(#[case] first: TreeKey, #[case] second: TreeKey) {
        let (a, b) = (first.out_dir_name(), second.out_dir_name());
        assert_ne!(a, b);
        for name in [&a, &b] {
            assert!(!name.contains('/'), "{name} is nested");
        }
        let trees = Utf8Path::new("/out/trees");
        assert!(!trees.join(&a).starts_with(trees.join(&b)));
        assert!(!trees.join(&b).starts_with(trees.join(&a)));
    }

    #[rstest]
    fn trees_share_domains_by_key(ctx: RunContext) {
        let mut trees = InnerTrees::new();
        trees
            .add_domain(&ctx, "vendor", Utf8Path::new("aosp"), Some("cf"))
            .expect("first domain");
        trees
            .add_domain(&ctx, "system", Utf8Path::new("aosp"), Some("cf"))
            .expect("second domain");
        trees
            .add_domain(&ctx, "system_ext", Utf8Path::new("aosp"), Some("other"))
            .expect("third domain");
        assert_eq!(trees.len(), 2);
        let tree = trees
            .get(&TreeKey::new("aosp", Some("cf")))
            .expect("tree registered");
        assert_eq!(tree.out().root(), "/ws/out/trees/aosp@cf");
        assert_eq!(
            tree.command_args(&["describe"]),
            vec![
                "--out_dir",
                "/ws/out/trees/aosp@cf",
                "--api_domain",
                "system",
                "--api_domain",
                "vendor",
                "describe",
            ]
        );
        assert_eq!(
            trees.domain("system_ext").map(|d| d.tree.product()),
            Some(Some("other"))
        );
    }

    #[rstest]
    fn duplicate_domain_is_rejected(ctx: RunContext) {
        let mut trees = InnerTrees::new();
        trees
            .add_domain(&ctx, "system", Utf8Path::new("a"), None)
            .expect("first registration");
        let err = trees
            .add_domain(&ctx, "system", Utf8Path::new("b"), None)
            .expect_err("duplicate");
        assert_eq!(err.kind(), ConfigErrorKind::Validate);
    }

    #[rstest]
    fn for_each_tree_visits_sorted_and_stops_at_first_error(ctx: RunContext) {
        let mut trees = InnerTrees::new();
        for (name, root) in [("c", "zeta"), ("a", "alpha"), ("b", "mid")] {
            trees
                .add_domain(&ctx, name, Utf8Path::new(root), None)
                .expect("registration");
        }
        let mut seen = Vec::new();
        let results = trees
            .for_each_tree(|key, _| {
                seen.push(key.root().to_string());
                Ok::<_, String>(key.root().as_str().len())
            })
            .expect("all trees succeed");
        assert_eq!(seen, ["alpha", "mid", "zeta"]);
        assert_eq!(results.values().copied().collect::<Vec<_>>(), [5, 3, 4]);

        let mut visited = 0;
        let err = trees.for_each_tree(|key, _| {
            visited += 1;
            if key.root() == "mid" {
                Err(format!("{key} failed"))
            } else {
                Ok(())
            }
        });
        assert_eq!(err, Err(String::from("mid failed")));
        assert_eq!(visited, 2);
    }

    #[rstest]
    fn empty_combo_is_rejected(ctx: RunContext) {
        let err = InnerTrees::from_combo(&ctx, &ComboSpec::default()).expect_err("no trees");
        assert_eq!(err.kind(), ConfigErrorKind::Validate);
    }

    #[cfg(unix)]
    mod entrypoint {
        use super::*;
        use anyhow::{Context, Result, ensure};
        use std::fs;
        use std::os::unix::fs::PermissionsExt;

        fn workspace_with_tree(script: Option<(&str, u32)>) -> Result<(tempfile::TempDir, RunContext, InnerTrees)> {
            let temp = tempfile::tempdir().context("create temp dir")?;
            let root = Utf8Path::from_path(temp.path()).context("utf-8 temp dir")?.to_owned();
            fs::create_dir_all(root.join("tree")).context("create tree")?;
            if let Some((body, mode)) = script {
                let entry = root.join("tree").join(ENTRYPOINT);
                fs::write(&entry, format!("#!/bin/sh\n{body}\n")).context("write entrypoint")?;
                fs::set_permissions(&entry, fs::Permissions::from_mode(mode)).context("chmod")?;
            }
            let ctx = RunContext::new(root.clone(), OutDir::new(root.join("out")), Tools::default());
            let mut trees = InnerTrees::new();
            trees.add_domain(&ctx, "system", Utf8Path::new("tree"), Some("p"))?;
            Ok((temp, ctx, trees))
        }

        fn only_tree(trees: &InnerTrees) -> Result<&InnerTree> {
            trees.trees().next().context("one tree registered")
        }

        #[test]
        fn missing_entrypoint_names_tree() -> Result<()> {
            let (_temp, ctx, trees) = workspace_with_tree(None)?;
            let err = only_tree(&trees)?.invoke(&ctx, &["describe"]).err().context("must fail")?;
            ensure!(matches!(err, InvokeError::MissingEntrypoint { ref root, .. } if root == "tree"));
            Ok(())
        }

        #[test]
        fn non_executable_entrypoint_is_missing() -> Result<()> {
            let (_temp, ctx, trees) = workspace_with_tree(Some(("exit 0", 0o644)))?;
            let err = only_tree(&trees)?.invoke(&ctx, &["describe"]).err().context("must fail")?;
            ensure!(matches!(err, InvokeError::MissingEntrypoint { .. }), "{err}");
            Ok(())
        }

        #[test]
        fn failing_entrypoint_reports_tree() -> Result<()> {
            let (_temp, ctx, trees) = workspace_with_tree(Some(("exit 1", 0o755)))?;
            let err = only_tree(&trees)?.invoke(&ctx, &["analyze"]).err().context("must fail")?;
            let message = err.to_string();
            ensure!(message.starts_with("inner tree tree failed:"), "{message}");
            ensure!(message.contains("analyze"), "{message}");
            Ok(())
        }

        #[test]
        fn entrypoint_runs_from_workspace_with_protocol_args() -> Result<()> {
            let (_temp, ctx, trees) =
                workspace_with_tree(Some(("echo \"$@\" > seen.txt", 0o755)))?;
            only_tree(&trees)?.invoke(&ctx, &["describe"])?;
            let seen = fs::read_to_string(ctx.workspace().join("seen.txt")).context("read args")?;
            let expected = format!("--out_dir {}/out/trees/tree@p --api_domain system describe\n", ctx.workspace());
            ensure!(seen == expected, "saw {seen:?}");
            Ok(())
        }
    }
}
