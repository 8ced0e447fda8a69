//! Java and resource library assembly: stage declared API files.

use super::{
    AssemblyError, LibraryContribution, LibraryLayout, StagedCopies, StubLanguage, StubLibrary, StubLibraryAssembler,
    emit_staged,
};
use crate::context::RunContext;
use crate::ninja_writer::NinjaWriter;

/// Copies each tree-relative `api` file to `<staging>/<api>`.
#[derive(Debug, Clone, Copy)]
pub struct ApiFileAssembler {
    language: StubLanguage,
}

impl ApiFileAssembler {
    /// Assembler for Java libraries.
    pub const JAVA: Self = Self {
        language: StubLanguage::Java,
    };
    /// Assembler for resource libraries.
    pub const RESOURCE: Self = Self {
        language: StubLanguage::Resource,
    };
}

impl StubLibraryAssembler for ApiFileAssembler {
    fn assemble(
        &self,
        ctx: &RunContext,
        writer: &mut NinjaWriter,
        library: &StubLibrary,
    ) -> Result<(), AssemblyError> {
        let layout = LibraryLayout::new(ctx.out(), library.key());
        let staging_dir = ctx.ninja_path(&layout.staging_dir);
        let mut staged = StagedCopies::default();
        for contribution in library.contributions() {
            let api_files = match (&contribution.library, self.language) {
                (LibraryContribution::Java(java), StubLanguage::Java) => java.api.as_slice(),
                (LibraryContribution::Resource(res), StubLanguage::Resource) => {
                    res.api.as_slice()
                }
                _ => {
                    return Err(AssemblyError::LanguageMismatch {
                        expected: self.language,
                        library: library.key().name.clone(),
                    });
                }
            };
            for api in api_files {
                staged.insert(staging_dir.join(api), contribution.tree.root().join(api));
            }
        }
        emit_staged(writer, library, &staged);
        Ok(())
    }
}
