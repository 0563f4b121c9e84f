//! Lowering: AST-to-AST rewrites run between slot collection and code generation.

mod swizzle;

pub use swizzle::{lower_swizzles, Swizzle, SwizzlePass};

use crate::{ast::Ast, context::CompilerContext, error::MathlResult};

/// A rewrite of the tree in place.
///
/// Passes run in order after slot collection. Before each pass the context's
/// scope stack is reset so inputs, outputs and uniforms are visible.
pub trait LoweringPass {
    /// Name used in logs
    fn name(&self) -> &str;

    /// Rewrite `ast`. Errors abort the compilation.
    fn run(&mut self, ast: &mut Ast, ctx: &mut CompilerContext) -> MathlResult<()>;
}
