//! Host binding descriptor.

use indexmap::IndexMap;
use mathl::CompilerContext;

/// How a host talks to a generated program.
///
/// Output slots follow declaration order, so `out float a; out vec2 b;` puts
/// `a` in slot 0 and `b` in slot 1.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IoBindings {
    /// Output name to slot in the output buffer
    pub outputs: IndexMap<String, usize>,
    /// Output name to declared type name
    pub output_types: IndexMap<String, String>,
    pub output_count: usize,
    /// Input names, in the order the entry point takes them
    pub inputs: Vec<String>,
    pub uniforms: Vec<String>,
}

impl IoBindings {
    pub fn from_context(ctx: &CompilerContext) -> Self {
        let outputs = ctx
            .outputs
            .keys()
            .enumerate()
            .map(|(slot, name)| (name.clone(), slot))
            .collect();
        let output_types = ctx
            .outputs
            .iter()
            .map(|(name, io)| (name.clone(), io.ty.type_name()))
            .collect();

        Self {
            outputs,
            output_types,
            output_count: ctx.outputs.len(),
            inputs: ctx.inputs.keys().cloned().collect(),
            uniforms: ctx.uniforms.keys().cloned().collect(),
        }
    }

    pub fn slot(&self, output: &str) -> Option<usize> {
        self.outputs.get(output).copied()
    }
}
