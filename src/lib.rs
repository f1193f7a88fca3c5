pub mod ast;
pub mod diagnostic;
pub mod infer;
pub mod kernel;
pub mod lexeme;
pub mod lexer;
pub mod lower;
pub mod parser;
pub mod signature;
pub mod span;
pub mod types;

pub use diagnostic::{render_diagnostics, Diagnostic};
pub use kernel::{
    ConstantValue, DeclarationRecord, Dependency, DependencyOrigin, KernelFunction, KernelPayload,
    KernelSettings, KernelSource,
};
pub use lower::{emit, GlslLowering, Lowering};
pub use signature::{signature_of, MemberDetail, Origin};
pub use types::Ty;

/// Transpile a kernel source with the reference GLSL backend.
pub fn transpile(source: &str, settings: KernelSettings) -> Result<String, Vec<Diagnostic>> {
    let mut unit = KernelFunction::new(source, settings).map_err(|d| vec![d])?;
    unit.to_source(&mut GlslLowering::new())
}
