//! Nested compilation isolation.
//!
//! A lowering pass that re-parses a code snippet must not let the snippet's
//! scopes or diagnostics leak into the unit being lowered. [`NestedContext`]
//! swaps a fresh context into the active slot and puts the outer one back when
//! dropped, so the outer unit is restored on every exit path, including `?`.
//! Guards nest: each one holds the context it displaced, and the borrow on the
//! slot keeps the restores in LIFO order.

use std::ops::{Deref, DerefMut};

use tracing::trace;

use super::CompilerContext;

/// RAII guard for a nested compilation.
pub struct NestedContext<'a> {
    active: &'a mut CompilerContext,
    outer: Option<CompilerContext>,
}

impl<'a> NestedContext<'a> {
    /// Make `inner` the active context until the guard is dropped.
    pub fn enter(active: &'a mut CompilerContext, inner: CompilerContext) -> Self {
        trace!(outer = %active.filename, inner = %inner.filename, "enter nested context");
        let outer = std::mem::replace(active, inner);
        Self {
            active,
            outer: Some(outer),
        }
    }

    /// A nested unit compiling `source`, sharing the outer unit's type registry.
    pub fn snippet(active: &'a mut CompilerContext, source: &str, filename: &str) -> Self {
        let mut inner = CompilerContext::new(source, filename);
        inner.types = active.types.clone();
        Self::enter(active, inner)
    }

    /// The displaced outer context.
    pub fn outer(&self) -> Option<&CompilerContext> {
        self.outer.as_ref()
    }
}

impl Deref for NestedContext<'_> {
    type Target = CompilerContext;

    fn deref(&self) -> &CompilerContext {
        &*self.active
    }
}

impl DerefMut for NestedContext<'_> {
    fn deref_mut(&mut self) -> &mut CompilerContext {
        &mut *self.active
    }
}

impl Drop for NestedContext<'_> {
    fn drop(&mut self) {
        if let Some(outer) = self.outer.take() {
            *self.active = outer;
            trace!(restored = %self.active.filename, "leave nested context");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ast::SourcePos,
        context::Binding,
        error::{MathlError, MathlResult},
        types::VarType,
    };

    fn failing_snippet(ctx: &mut CompilerContext) -> MathlResult<()> {
        let mut nested = NestedContext::snippet(ctx, "x.yz", "(snippet)");
        nested.set_scope("inner", Binding::of(VarType::named("float")));
        Err(nested.error(
            Some(SourcePos::new(0, 0, 0)),
            MathlError::UndefinedSymbol("x".to_string()),
        ))
    }

    #[test]
    fn test_restores_outer_on_drop() {
        let mut ctx = CompilerContext::new("out float a;", "outer.mathl");
        ctx.set_scope("a", Binding::of(VarType::named("float")));

        {
            let nested = NestedContext::snippet(&mut ctx, "vec2(1.0, 2.0)", "(snippet)");
            assert_eq!(nested.filename, "(snippet)");
            assert!(nested.lookup("a").is_none());
            assert_eq!(nested.outer().map(|c| c.filename.as_str()), Some("outer.mathl"));
        }

        assert_eq!(ctx.filename, "outer.mathl");
        assert!(ctx.lookup("a").is_some());
    }

    #[test]
    fn test_restores_outer_on_error() {
        let mut ctx = CompilerContext::new("out float a;", "outer.mathl");
        let err = failing_snippet(&mut ctx).unwrap_err();

        assert_eq!(ctx.filename, "outer.mathl");
        assert!(ctx.lookup("inner").is_none());
        assert!(format!("{}", err).starts_with("Error: (snippet):1: "));
    }

    #[test]
    fn test_guards_nest() {
        let mut ctx = CompilerContext::new("", "a");
        {
            let mut first = NestedContext::snippet(&mut ctx, "", "b");
            {
                let second = NestedContext::snippet(&mut first, "", "c");
                assert_eq!(second.filename, "c");
            }
            assert_eq!(first.filename, "b");
        }
        assert_eq!(ctx.filename, "a");
    }
}
