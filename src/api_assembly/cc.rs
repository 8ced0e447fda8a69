//! Native library assembly: stage headers into an include directory.

use super::{
    AssemblyError, LibraryContribution, LibraryLayout, StagedCopies, StubLanguage, StubLibrary,
    StubLibraryAssembler, emit_staged,
};
use crate::context::RunContext;
use crate::ninja_writer::NinjaWriter;

/// Copies every contributed header to `<staging>/include/<file>`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CcAssembler;

impl StubLibraryAssembler for CcAssembler {
    fn assemble(
        &self,
        ctx: &RunContext,
        writer: &mut NinjaWriter,
        library: &StubLibrary,
    ) -> Result<(), AssemblyError> {
        let layout = LibraryLayout::new(ctx.out(), library.key());
        let include_dir = ctx.ninja_path(&layout.staging_dir).join("include");
        let mut staged = StagedCopies::default();
        for contribution in library.contributions() {
            let LibraryContribution::Cc(cc) = &contribution.library else {
                return Err(AssemblyError::LanguageMismatch {
                    expected: StubLanguage::Cc,
                    library: library.key().name.clone(),
                });
            };
            for set in &cc.headers {
                let header_root = contribution.tree.root().join(&set.root);
                for file in &set.files {
                    staged.insert(include_dir.join(file), header_root.join(file));
                }
            }
        }
        emit_staged(writer, library, &staged);
        Ok(())
    }
}
