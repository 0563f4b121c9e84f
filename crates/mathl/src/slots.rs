//! Slot collection: files qualified top-level declarations into the context's
//! input/output/uniform tables and registers user functions as overloads.

use tracing::debug;

use crate::{
    ast::{Ast, NodeId, NodeKind},
    context::{CompilerContext, TypeArg},
    error::{MathlError, MathlResult},
    traverse::{walk, Walker},
};

/// Populate `ctx`'s I/O tables and function registry from `ast`.
///
/// Declarations are filed in source order, which fixes output slot numbers.
pub fn find_slots(ctx: &mut CompilerContext, ast: &Ast) -> MathlResult<()> {
    let Some(root) = ast.root() else {
        return Err(MathlError::semantic("no program to collect slots from"));
    };

    let mut collector = SlotCollector {
        ctx,
        root,
        functions: 0,
    };
    walk(ast, root, &mut collector)?;

    let functions = collector.functions;
    debug!(
        inputs = ctx.inputs.len(),
        outputs = ctx.outputs.len(),
        uniforms = ctx.uniforms.len(),
        functions,
        "collected slots"
    );
    Ok(())
}

struct SlotCollector<'c> {
    ctx: &'c mut CompilerContext,
    root: NodeId,
    functions: usize,
}

impl SlotCollector<'_> {
    fn declaration(&mut self, ast: &Ast, node: NodeId) -> MathlResult<()> {
        let Some(ty_node) = ast.child(node, 0) else {
            return Ok(());
        };
        let Some(qualifier) = ast.node(ty_node).qualifier else {
            return Ok(());
        };
        let (Some(name), Some(ty)) = (ast.name(node), ast.var_type(ty_node)) else {
            return Err(self.ctx.error_at(
                ast,
                node,
                MathlError::semantic("malformed variable declaration"),
            ));
        };

        self.ctx
            .declare_io(qualifier, name, node, ty.clone())
            .map_err(|err| self.ctx.error_at(ast, node, err))
    }

    fn function(&mut self, ast: &Ast, node: NodeId) -> MathlResult<()> {
        let name = ast.name(node).unwrap_or_default();
        let ret = ast.child(node, 0).and_then(|t| ast.var_type(t));
        let params = ast.child(node, 1).map(|p| ast.children(p)).unwrap_or_default();

        let mut args = Vec::with_capacity(params.len());
        for &param in params {
            match ast.child(param, 0).and_then(|t| ast.var_type(t)) {
                Some(ty) => args.push(TypeArg::Type(ty)),
                None => {
                    return Err(self.ctx.error_at(
                        ast,
                        param,
                        MathlError::semantic("parameter without a type"),
                    ))
                }
            }
        }
        let Some(ret) = ret else {
            return Err(self.ctx.error_at(
                ast,
                node,
                MathlError::semantic("function without a return type"),
            ));
        };

        self.ctx
            .add_poly_func(name, ret, &args, None)
            .map_err(|err| self.ctx.error_at(ast, node, err))?;
        self.functions += 1;
        Ok(())
    }
}

impl Walker for SlotCollector<'_> {
    fn walk_node(&mut self, ast: &Ast, node: NodeId, kind: NodeKind) -> MathlResult<()> {
        if ast.parent(node) != Some(self.root) {
            return Ok(());
        }
        match kind {
            NodeKind::VarDecl => self.declaration(ast, node),
            NodeKind::Function => self.function(ast, node),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ast::StorageQualifier, parser::parse_program};

    fn collect(src: &str) -> MathlResult<(CompilerContext, Ast)> {
        let mut ctx = CompilerContext::new(src, "slots.mathl");
        let mut ast = Ast::new();
        parse_program(&mut ast, &ctx, src)?;
        find_slots(&mut ctx, &ast)?;
        Ok((ctx, ast))
    }

    #[test]
    fn test_declaration_order() {
        let (ctx, _) = collect(
            "out float a;\nin vec3 point;\nout vec2 b;\nuniform float time;\nfloat plain;",
        )
        .unwrap();
        let outputs: Vec<&str> = ctx.outputs.keys().map(String::as_str).collect();
        assert_eq!(outputs, vec!["a", "b"]);
        assert_eq!(ctx.inputs.len(), 1);
        assert_eq!(ctx.uniforms.len(), 1);
        assert_eq!(ctx.io_qualifier("plain"), None);
        assert_eq!(ctx.io_qualifier("time"), Some(StorageQualifier::Uniform));
        assert_eq!(ctx.outputs["b"].ty.type_name(), "vec2");
    }

    #[test]
    fn test_locals_are_not_slots() {
        let (ctx, _) = collect("out float a;\nvoid main() {\n  float a = 1.0;\n}").unwrap();
        assert_eq!(ctx.outputs.len(), 1);
        assert_eq!(ctx.inputs.len(), 0);
    }

    #[test]
    fn test_duplicate_declaration() {
        let err = collect("in float a;\nout float a;").unwrap_err();
        assert!(matches!(err.root(), MathlError::Semantic(_)));
        assert_eq!(err.pos().map(|p| p.line), Some(1));
    }

    #[test]
    fn test_user_functions_registered() {
        let (ctx, _) = collect("float scale(vec2 v, float s) {\n  return v[0] * s;\n}\nvoid main() {}")
            .unwrap();
        let sig = ctx.overloads("scale");
        assert_eq!(sig.len(), 1);
        assert_eq!(sig[0].key, "_scale_float_vec2_float");
        assert!(ctx.has_function("main"));
    }
}
