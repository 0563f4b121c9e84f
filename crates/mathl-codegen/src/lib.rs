//! MathL code generators.
//!
//! Backends turn a compiled [`CompilerContext`] (see `mathl::compile`) into
//! target text. Each backend advertises a name through [`GeneratorDefine`] and
//! is looked up by that name in a [`GeneratorRegistry`]. Besides the text,
//! [`generate`] returns the [`IoBindings`] a host needs to allocate output
//! buffers without parsing the source again.

mod bindings;
mod internal;
mod js;
mod options;
mod precedence;
mod runtime;

use indexmap::IndexMap;
use mathl::{CompilerContext, MathlError, MathlResult};
use tracing::debug;

pub use bindings::IoBindings;
pub use internal::InternalGenerator;
pub use js::JsGenerator;
pub use options::GenOptions;
pub use runtime::JS_RUNTIME;

/// Registration descriptor of a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeneratorDefine {
    /// Name the backend is selected by
    pub type_name: &'static str,
}

/// A code generation backend.
pub trait CodeGenerator {
    fn define(&self) -> GeneratorDefine;

    /// Emit target text for the lowered tree in `ctx.ast`.
    fn generate(&self, ctx: &CompilerContext, options: &GenOptions) -> MathlResult<String>;
}

/// Emitted text plus the host binding contract.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedCode {
    pub text: String,
    pub bindings: IoBindings,
}

/// Backends by name, in registration order.
pub struct GeneratorRegistry {
    generators: IndexMap<&'static str, Box<dyn CodeGenerator>>,
}

impl GeneratorRegistry {
    /// A registry with no backends.
    pub fn empty() -> Self {
        Self {
            generators: IndexMap::new(),
        }
    }

    /// Add `generator` under its advertised name, replacing any previous one.
    pub fn register(&mut self, generator: impl CodeGenerator + 'static) {
        let name = generator.define().type_name;
        self.generators.insert(name, Box::new(generator));
    }

    pub fn get(&self, name: &str) -> MathlResult<&dyn CodeGenerator> {
        self.generators
            .get(name)
            .map(|g| g.as_ref())
            .ok_or_else(|| MathlError::UnknownGenerator(name.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.generators.keys().copied()
    }

    /// Run the backend registered as `target` over `ctx`.
    pub fn generate(
        &self,
        ctx: &CompilerContext,
        target: &str,
        options: &GenOptions,
    ) -> MathlResult<GeneratedCode> {
        let generator = self.get(target)?;
        debug!(target, file = %ctx.filename, "generate");
        let text = generator.generate(ctx, options)?;
        Ok(GeneratedCode {
            text,
            bindings: IoBindings::from_context(ctx),
        })
    }
}

impl Default for GeneratorRegistry {
    /// The built-in backends: `js` and `internal`.
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(JsGenerator);
        registry.register(InternalGenerator);
        registry
    }
}

/// Generate `target` code for `ctx` with the built-in backends.
pub fn generate(ctx: &CompilerContext, target: &str, options: &GenOptions) -> MathlResult<GeneratedCode> {
    GeneratorRegistry::default().generate(ctx, target, options)
}
