//! API surface assembly.
//!
//! Assembly runs in two phases. Collation reads every tree's contribution
//! documents, in tree order, and groups the libraries they declare by
//! `(language, surface, version, library)` into [`StubLibrary`] values.
//! Packaging then hands each stub library to the assembler bound to its
//! [`StubLanguage`], which emits copy and phony statements into one shared
//! [`NinjaWriter`]. The result is written to `api_surfaces.ninja`.

mod api_files;
mod cc;
mod contribution;
mod error;
mod staging;

pub use api_files::ApiFileAssembler;
pub use cc::CcAssembler;
pub use contribution::{
    ApiContribution, CONTRIBUTION_EXTENSION, CcLibrary, HeaderSet, HostExecutable, JavaLibrary,
    ResourceLibrary, StringOrList, contribution_files, load_contribution_file,
};
pub use error::{AssemblyError, UnsupportedLanguage};
pub use staging::{LibraryLayout, StagedCopies};

use crate::context::RunContext;
use crate::inner_tree::{InnerTrees, TreeKey};
use crate::ninja_writer::NinjaWriter;
use camino::Utf8PathBuf;
use indexmap::IndexMap;
use std::fmt;
use tracing::{debug, info};

/// Languages with a stub library assembler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StubLanguage {
    /// Native libraries (`cc_libraries`).
    Cc,
    /// Java libraries (`java_libraries`).
    Java,
    /// Resource libraries (`resource_libraries`).
    Resource,
}

impl StubLanguage {
    /// Every language in collation order.
    pub const ALL: [Self; 3] = [Self::Cc, Self::Java, Self::Resource];

    /// Contribution key declaring libraries of this language.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Cc => "cc_libraries",
            Self::Java => "java_libraries",
            Self::Resource => "resource_libraries",
        }
    }

    /// Parse a contribution key.
    ///
    /// # Errors
    ///
    /// Returns [`UnsupportedLanguage`] for keys without an assembler.
    ///
    /// # Examples
    ///
    /// ```
    /// use multitree::api_assembly::StubLanguage;
    /// assert_eq!(StubLanguage::from_key("java_libraries"), Ok(StubLanguage::Java));
    /// assert!(StubLanguage::from_key("rust_libraries").is_err());
    /// ```
    pub fn from_key(key: &str) -> Result<Self, UnsupportedLanguage> {
        Self::ALL
            .into_iter()
            .find(|language| language.key() == key)
            .ok_or_else(|| UnsupportedLanguage {
                key: key.to_owned(),
            })
    }

    /// Assembler bound to this language.
    #[must_use]
    pub fn assembler(self) -> &'static dyn StubLibraryAssembler {
        match self {
            Self::Cc => &CcAssembler,
            Self::Java => &ApiFileAssembler::JAVA,
            Self::Resource => &ApiFileAssembler::RESOURCE,
        }
    }
}

impl fmt::Display for StubLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Cc => "cc",
            Self::Java => "java",
            Self::Resource => "resource",
        })
    }
}

/// Emits the build statements for one stub library.
pub trait StubLibraryAssembler {
    /// Append `library`'s statements to `writer`.
    ///
    /// # Errors
    ///
    /// Returns [`AssemblyError::LanguageMismatch`] when a contribution is not
    /// of the assembler's language.
    fn assemble(
        &self,
        ctx: &RunContext,
        writer: &mut NinjaWriter,
        library: &StubLibrary,
    ) -> Result<(), AssemblyError>;
}

/// A library entry of any supported language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LibraryContribution {
    /// Native library.
    Cc(CcLibrary),
    /// Java library.
    Java(JavaLibrary),
    /// Resource library.
    Resource(ResourceLibrary),
}

impl LibraryContribution {
    /// Language of this entry.
    #[must_use]
    pub const fn language(&self) -> StubLanguage {
        match self {
            Self::Cc(_) => StubLanguage::Cc,
            Self::Java(_) => StubLanguage::Java,
            Self::Resource(_) => StubLanguage::Resource,
        }
    }

    /// Library name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Cc(lib) => &lib.name,
            Self::Java(lib) => &lib.name,
            Self::Resource(lib) => &lib.name,
        }
    }
}

/// Grouping key of a stub library.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StubLibraryKey {
    /// Library language.
    pub language: StubLanguage,
    /// Surface name.
    pub surface: String,
    /// Surface version.
    pub version: u32,
    /// Library name.
    pub name: String,
}

/// One domain's entry for a stub library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StubLibraryContribution {
    /// Tree that exported the entry.
    pub tree: TreeKey,
    /// Domain that exported the entry.
    pub api_domain: String,
    /// The library entry itself.
    pub library: LibraryContribution,
}

/// Every contribution to one library of one surface version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StubLibrary {
    key: StubLibraryKey,
    contributions: Vec<StubLibraryContribution>,
}

impl StubLibrary {
    /// Grouping key.
    #[must_use]
    pub const fn key(&self) -> &StubLibraryKey {
        &self.key
    }

    /// Contributions in tree scan order.
    #[must_use]
    pub fn contributions(&self) -> &[StubLibraryContribution] {
        &self.contributions
    }

    /// Phony target other statements depend on: `surface-version-name`.
    #[must_use]
    pub fn phony_name(&self) -> String {
        format!("{}-{}-{}", self.key.surface, self.key.version, self.key.name)
    }
}

/// A parsed contribution document and where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContributionData {
    /// Tree that exported the document.
    pub tree: TreeKey,
    /// Document path.
    pub file: Utf8PathBuf,
    /// Parsed document.
    pub document: ApiContribution,
}

fn libraries_of(document: &ApiContribution, language: StubLanguage) -> Vec<LibraryContribution> {
    match language {
        StubLanguage::Cc => document
            .cc_libraries
            .iter()
            .cloned()
            .map(LibraryContribution::Cc)
            .collect(),
        StubLanguage::Java => document
            .java_libraries
            .iter()
            .cloned()
            .map(LibraryContribution::Java)
            .collect(),
        StubLanguage::Resource => document
            .resource_libraries
            .iter()
            .cloned()
            .map(LibraryContribution::Resource)
            .collect(),
    }
}

/// Group contributions into stub libraries.
///
/// Libraries appear in the order their key was first seen; contributions
/// keep the order of `data`.
///
/// # Errors
///
/// Returns [`AssemblyError::UnsupportedLanguage`] when a document declares
/// `*_libraries` for a language without an assembler.
pub fn collate_contributions(data: &[ContributionData]) -> Result<Vec<StubLibrary>, AssemblyError> {
    let mut grouped: IndexMap<StubLibraryKey, Vec<StubLibraryContribution>> = IndexMap::new();
    for item in data {
        let document = &item.document;
        for key in document.extra.keys().filter(|key| key.ends_with("_libraries")) {
            StubLanguage::from_key(key).map_err(|source| AssemblyError::UnsupportedLanguage {
                path: item.file.clone(),
                source,
            })?;
        }
        for host in &document.host_executables {
            debug!(name = %host.name, binary = %host.binary, domain = %document.api_domain, "host executable is not assembled");
        }
        for language in StubLanguage::ALL {
            for library in libraries_of(document, language) {
                let key = StubLibraryKey {
                    language,
                    surface: document.name.clone(),
                    version: document.version,
                    name: library.name().to_owned(),
                };
                grouped.entry(key).or_default().push(StubLibraryContribution {
                    tree: item.tree.clone(),
                    api_domain: document.api_domain.clone(),
                    library,
                });
            }
        }
    }
    Ok(grouped
        .into_iter()
        .map(|(key, contributions)| StubLibrary { key, contributions })
        .collect())
}

/// Read every tree's contribution documents in tree order.
///
/// # Errors
///
/// Returns the first listing, read or parse failure, naming the file.
pub fn gather_contributions(trees: &InnerTrees) -> Result<Vec<ContributionData>, AssemblyError> {
    let per_tree = trees.for_each_tree(|key, tree| {
        contribution_files(&tree.out().api_contributions_dir())?
            .into_iter()
            .map(|file| {
                let document = load_contribution_file(&file)?;
                Ok(ContributionData {
                    tree: key.clone(),
                    file,
                    document,
                })
            })
            .collect::<Result<Vec<_>, AssemblyError>>()
    })?;
    Ok(per_tree.into_values().flatten().collect())
}

/// Emit the statements for every stub library into a fresh writer.
///
/// # Errors
///
/// Returns the first assembler failure.
pub fn generate_api_ninja(
    ctx: &RunContext,
    libraries: &[StubLibrary],
) -> Result<NinjaWriter, AssemblyError> {
    let mut writer = NinjaWriter::new(ctx.tools().copy_tool());
    writer.add_comment("API surfaces assembled from inner tree contributions.");
    for library in libraries {
        debug!(
            library = %library.phony_name(),
            language = %library.key().language,
            contributions = library.contributions().len(),
            "assembling stub library"
        );
        library
            .key()
            .language
            .assembler()
            .assemble(ctx, &mut writer, library)?;
    }
    Ok(writer)
}

/// Collate every tree's contributions and write `api_surfaces.ninja`.
///
/// Returns the keys of the assembled stub libraries.
///
/// # Errors
///
/// Returns any collation, assembly or write failure.
pub fn assemble_apis(
    ctx: &RunContext,
    trees: &InnerTrees,
) -> Result<Vec<StubLibraryKey>, AssemblyError> {
    let data = gather_contributions(trees)?;
    let libraries = collate_contributions(&data)?;
    let writer = generate_api_ninja(ctx, &libraries)?;
    let path = ctx.out().api_ninja_file();
    writer.write_file(&path)?;
    info!(
        documents = data.len(),
        libraries = libraries.len(),
        "wrote {path}"
    );
    Ok(libraries.into_iter().map(|library| library.key).collect())
}

fn emit_staged(writer: &mut NinjaWriter, library: &StubLibrary, staged: &StagedCopies) {
    for (dest, src) in staged.iter() {
        writer.add_copy_file(dest, src);
    }
    // Libraries of different languages can share a phony name; merge them.
    writer.add_global_phony(
        &library.phony_name(),
        staged.destinations().map(|dest| dest.as_str().to_owned()),
    );
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, reason = "assembly tests build known-good inputs")]

    use super::*;
    use crate::context::{OutDir, Tools};
    use rstest::{fixture, rstest};
    use serde_json::{Value, json};

    #[fixture]
    fn ctx() -> RunContext {
        RunContext::new("/ws", OutDir::new("/ws/out"), Tools::default())
    }

    fn data(tree: &str, value: &Value) -> ContributionData {
        ContributionData {
            tree: TreeKey::new(tree, None),
            file: Utf8PathBuf::from(format!("/ws/out/trees/{tree}@/api_contributions/x.json")),
            document: serde_json::from_value(value.clone()).expect("valid contribution"),
        }
    }

    fn render(ctx: &RunContext, libraries: &[StubLibrary]) -> String {
        generate_api_ninja(ctx, libraries)
            .expect("assembly succeeds")
            .render()
            .expect("assembly renders")
            .into_string()
    }

    #[rstest]
    fn same_key_from_two_domains_collates_once() {
        let libfoo = json!([{"name": "libfoo", "headers": []}]);
        let libraries = collate_contributions(&[
            data("a", &json!({"name": "public_api", "version": 1, "api_domain": "system", "cc_libraries": libfoo})),
            data("b", &json!({"name": "public_api", "version": 1, "api_domain": "vendor", "cc_libraries": libfoo})),
        ])
        .expect("collation succeeds");
        assert_eq!(libraries.len(), 1);
        let domains: Vec<_> = libraries
            .first()
            .expect("one library")
            .contributions()
            .iter()
            .map(|c| c.api_domain.as_str())
            .collect();
        assert_eq!(domains, ["system", "vendor"]);
    }

    #[rstest]
    fn keys_differ_by_language_and_version() {
        let libraries = collate_contributions(&[
            data("a", &json!({
                "name": "public_api", "version": 1, "api_domain": "system",
                "cc_libraries": [{"name": "libfoo"}],
                "java_libraries": [{"name": "libfoo"}]
            })),
            data("a", &json!({
                "name": "public_api", "version": 2, "api_domain": "system",
                "cc_libraries": [{"name": "libfoo"}]
            })),
        ])
        .expect("collation succeeds");
        let keys: Vec<_> = libraries
            .iter()
            .map(|l| (l.key().language, l.key().version))
            .collect();
        assert_eq!(
            keys,
            [(StubLanguage::Cc, 1), (StubLanguage::Java, 1), (StubLanguage::Cc, 2)]
        );
    }

    #[rstest]
    fn same_name_across_languages_shares_one_phony(ctx: RunContext) {
        let libraries = collate_contributions(&[data(
            "a",
            &json!({
                "name": "public_api", "version": 1, "api_domain": "system",
                "cc_libraries": [{"name": "libfoo", "headers": [{"root": "inc", "files": ["foo.h"]}]}],
                "java_libraries": [{"name": "libfoo", "api": ["api/current.txt"]}]
            }),
        )])
        .expect("collation succeeds");
        assert_eq!(libraries.len(), 2);
        let text = render(&ctx, &libraries);
        assert_eq!(text.matches("build public_api-1-libfoo: phony").count(), 1, "{text}");
        assert!(text.contains(
            "build public_api-1-libfoo: phony out/api_surfaces/public_api/1/libfoo/include/foo.h out/api_surfaces/public_api/1/libfoo/api/current.txt\n"
        ), "{text}");
    }

    #[rstest]
    fn unknown_library_language_fails() {
        let err = collate_contributions(&[data(
            "a",
            &json!({"name": "public_api", "version": 1, "api_domain": "system", "rust_libraries": []}),
        )])
        .expect_err("rust is unsupported");
        assert!(
            matches!(err, AssemblyError::UnsupportedLanguage { ref source, .. } if source.key == "rust_libraries")
        );
    }

    #[rstest]
    fn cc_headers_are_copied_and_grouped(ctx: RunContext) {
        let libraries = collate_contributions(&[data(
            "bionic",
            &json!({
                "name": "public_api", "version": 1, "api_domain": "com.android.bionic",
                "cc_libraries": [{"name": "libc", "headers": [
                    {"root": "libc/include", "files": ["stdio.h", "sys/types.h"]}
                ]}]
            }),
        )])
        .expect("collation succeeds");
        let text = render(&ctx, &libraries);
        assert!(text.contains(
            "build out/api_surfaces/public_api/1/libc/include/sys/types.h: copy_file bionic/libc/include/sys/types.h\n  out_dir = out/api_surfaces/public_api/1/libc/include/sys\n"
        ), "{text}");
        assert!(text.contains(
            "build public_api-1-libc: phony out/api_surfaces/public_api/1/libc/include/stdio.h out/api_surfaces/public_api/1/libc/include/sys/types.h\n"
        ), "{text}");
    }

    #[rstest]
    fn java_and_resource_api_files_are_staged(ctx: RunContext) {
        let libraries = collate_contributions(&[data(
            "fw",
            &json!({
                "name": "public_api", "version": 1, "api_domain": "system",
                "java_libraries": [{"name": "framework", "api": ["api/current.txt"]}],
                "resource_libraries": [{"name": "framework-res", "api": "res/api.txt"}]
            }),
        )])
        .expect("collation succeeds");
        let text = render(&ctx, &libraries);
        assert!(text.contains("build out/api_surfaces/public_api/1/framework/api/current.txt: copy_file fw/api/current.txt\n"));
        assert!(text.contains("build public_api-1-framework-res: phony out/api_surfaces/public_api/1/framework-res/res/api.txt\n"));
        assert_eq!(text.matches("rule copy_file").count(), 1);
    }

    #[rstest]
    fn assembler_rejects_foreign_language(ctx: RunContext) {
        let library = StubLibrary {
            key: StubLibraryKey {
                language: StubLanguage::Cc,
                surface: "public_api".into(),
                version: 1,
                name: "framework".into(),
            },
            contributions: vec![StubLibraryContribution {
                tree: TreeKey::new("fw", None),
                api_domain: "system".into(),
                library: LibraryContribution::Java(JavaLibrary {
                    name: "framework".into(),
                    api: Vec::new(),
                }),
            }],
        };
        let mut writer = NinjaWriter::default();
        let err = CcAssembler
            .assemble(&ctx, &mut writer, &library)
            .expect_err("java library given to cc assembler");
        assert!(matches!(err, AssemblyError::LanguageMismatch { expected: StubLanguage::Cc, .. }));
    }

    #[rstest]
    fn generation_is_deterministic(ctx: RunContext) {
        let inputs = [
            data("t1", &json!({"name": "s", "version": 1, "api_domain": "system",
                "cc_libraries": [{"name": "liba", "headers": [{"root": "inc", "files": ["a.h", "b.h"]}]}]})),
            data("t2", &json!({"name": "s", "version": 1, "api_domain": "vendor",
                "cc_libraries": [{"name": "liba", "headers": [{"root": "inc", "files": ["c.h"]}]}]})),
        ];
        let once = || render(&ctx, &collate_contributions(&inputs).expect("collation succeeds"));
        assert_eq!(once(), once());
    }
}
