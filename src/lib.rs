pub mod codegen;
pub mod error;
pub mod sexpr;

pub use codegen::dest::{BranchTarget, ControlDest, DataDest, LocalLabel};
pub use codegen::CodeGen;
pub use error::CompileError;

/// Compile a source program to a Z80 assembly listing.
///
/// Top-level forms are generated in textual order, each with its value
/// routed to `HL` and a return as the follow-on transfer, so a lone
/// expression compiles to a callable fragment.
pub fn compile(source: &str) -> Result<String, CompileError> {
    let program = sexpr::parse(source)?;
    let mut gen = CodeGen::new();
    for form in &program {
        gen.form(form, DataDest::HL, ControlDest::Ret)?;
    }
    Ok(gen.finish())
}
