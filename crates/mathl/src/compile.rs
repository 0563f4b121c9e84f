//! Compile driver: preprocess, parse, collect slots and run lowering passes.

use std::fmt;

use tracing::{debug, error};

use crate::{
    ast::Ast,
    context::CompilerContext,
    error::MathlResult,
    lower::{LoweringPass, SwizzlePass},
    parser::parse_program,
    preprocess::preprocess,
    slots::find_slots,
};

/// Frontend options.
pub struct CompileOptions {
    /// Name used in diagnostics
    pub filename: String,
    /// Run the built-in swizzle lowering pass
    pub lower_swizzles: bool,
    /// Extra passes, run in order after the built-in ones
    pub passes: Vec<Box<dyn LoweringPass>>,
}

impl CompileOptions {
    pub fn new(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            lower_swizzles: true,
            passes: Vec::new(),
        }
    }

    pub fn with_lower_swizzles(mut self, lower_swizzles: bool) -> Self {
        self.lower_swizzles = lower_swizzles;
        self
    }

    pub fn with_pass(mut self, pass: impl LoweringPass + 'static) -> Self {
        self.passes.push(Box::new(pass));
        self
    }
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self::new("(anonymous)")
    }
}

impl fmt::Debug for CompileOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let passes: Vec<&str> = self.passes.iter().map(|p| p.name()).collect();
        f.debug_struct("CompileOptions")
            .field("filename", &self.filename)
            .field("lower_swizzles", &self.lower_swizzles)
            .field("passes", &passes)
            .finish()
    }
}

/// Compile `source` with default options.
pub fn parse(source: &str, filename: &str) -> MathlResult<CompilerContext> {
    compile(source, &mut CompileOptions::new(filename))
}

/// Compile `source` into a context holding the lowered tree in `ctx.ast`.
pub fn compile(source: &str, options: &mut CompileOptions) -> MathlResult<CompilerContext> {
    let mut ctx = CompilerContext::new(source, options.filename.as_str());
    match run(&mut ctx, options) {
        Ok(ast) => {
            ctx.ast = ast;
            Ok(ctx)
        }
        Err(err) => {
            error!(file = %options.filename, "{}", err);
            Err(err)
        }
    }
}

fn run(ctx: &mut CompilerContext, options: &mut CompileOptions) -> MathlResult<Ast> {
    ctx.preprocessed = preprocess(&ctx.source)?;

    let mut ast = Ast::new();
    parse_program(&mut ast, ctx, &ctx.preprocessed)?;
    debug!(file = %ctx.filename, nodes = ast.node_count(), "parsed");

    find_slots(ctx, &ast)?;

    if options.lower_swizzles {
        run_pass(&mut SwizzlePass, &mut ast, ctx)?;
    }
    for pass in options.passes.iter_mut() {
        run_pass(pass.as_mut(), &mut ast, ctx)?;
    }
    Ok(ast)
}

fn run_pass(pass: &mut dyn LoweringPass, ast: &mut Ast, ctx: &mut CompilerContext) -> MathlResult<()> {
    ctx.reset_scope_stack();
    debug!(pass = pass.name(), "run lowering pass");
    pass.run(ast, ctx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ast::{NodeKind, NodeValue},
        error::MathlError,
        traverse::visit,
    };

    struct Rename {
        from: &'static str,
        to: &'static str,
    }

    impl LoweringPass for Rename {
        fn name(&self) -> &str {
            "rename"
        }

        fn run(&mut self, ast: &mut Ast, ctx: &mut CompilerContext) -> MathlResult<()> {
            assert!(ctx.lookup("time").is_some(), "uniforms visible to passes");
            let Some(root) = ast.root() else {
                return Ok(());
            };
            let mut hits = Vec::new();
            visit(ast, root, NodeKind::Ident, &mut |ast, id| {
                if ast.name(id) == Some(self.from) {
                    hits.push(id);
                }
            });
            for id in hits {
                ast.node_mut(id).value = Some(NodeValue::Name(self.to.to_string()));
            }
            Ok(())
        }
    }

    #[test]
    fn test_pipeline() {
        let src = "#define SPEED 2.0\nuniform float time;\nout vec2 a;\nvoid main() {\n  a.yx = vec2(time * SPEED, 0.0);\n}\n";
        let ctx = parse(src, "pipeline.mathl").unwrap();
        assert_eq!(ctx.uniforms.len(), 1);
        assert_eq!(ctx.outputs.len(), 1);
        assert!(ctx.ast.root().is_some());
        assert!(!ctx.preprocessed.contains("SPEED"));

        let mut members = 0;
        visit(&ctx.ast, ctx.ast.root().unwrap(), NodeKind::BasicMemberLookup, &mut |_, _| {
            members += 1
        });
        assert_eq!(members, 0);
    }

    #[test]
    fn test_swizzles_can_be_disabled() {
        let src = "vec3 p;\nvoid main() {\n  float x = p.x;\n}";
        let mut options = CompileOptions::new("raw.mathl").with_lower_swizzles(false);
        let ctx = compile(src, &mut options).unwrap();
        let mut members = 0;
        visit(&ctx.ast, ctx.ast.root().unwrap(), NodeKind::BasicMemberLookup, &mut |_, _| {
            members += 1
        });
        assert_eq!(members, 1);
    }

    #[test]
    fn test_extra_passes_run_in_order() {
        let src = "uniform float time;\nfloat a;\nvoid main() {\n  a = time;\n}";
        let mut options = CompileOptions::new("passes.mathl")
            .with_pass(Rename { from: "a", to: "b" })
            .with_pass(Rename { from: "b", to: "c" });
        let ctx = compile(src, &mut options).unwrap();

        let mut names = Vec::new();
        visit(&ctx.ast, ctx.ast.root().unwrap(), NodeKind::Ident, &mut |ast, id| {
            names.push(ast.name(id).unwrap_or_default().to_string())
        });
        assert_eq!(names, vec!["c", "time"]);
        assert_eq!(format!("{:?}", options).matches("rename").count(), 2);
    }

    #[test]
    fn test_syntax_error_propagates_unwrapped() {
        let err = parse("void main() {\n  float = 1.0;\n}", "bad.mathl").unwrap_err();
        assert!(matches!(err, MathlError::Syntax { .. }));
    }

    #[test]
    fn test_overflowing_literal_is_rejected() {
        let err = parse("out float a;\nvoid main() {\n  a = 1e999;\n}", "inf.mathl").unwrap_err();
        assert!(matches!(err, MathlError::Syntax { .. }));
        assert!(err.to_string().contains("3:7: numeric literal out of range"));
    }

    #[test]
    fn test_semantic_error_is_located() {
        let err = parse("void main() {\n  float t = nope.x;\n}", "bad.mathl").unwrap_err();
        assert_eq!(err.root(), &MathlError::UndefinedSymbol("nope".to_string()));
        assert!(err.to_string().starts_with("Error: bad.mathl:2: nope is not defined"));
    }
}
