//! JavaScript backend.
//!
//! The emitted program is a single `program = function() { ... }` closure.
//! Inputs and uniforms become closure variables, functions are emitted in
//! source order, and the closure returns an object with:
//!
//! - `call(outs, ...inputs)`: stores the output buffer and inputs, runs `main`
//! - a getter/setter pair per uniform
//! - `outputs`, `outputTypes` and `outputCount`, mirroring [`IoBindings`]
//!
//! Outputs are never variables of their own: an identifier bound to an
//! output declaration prints as `__outs[slot]`.

use mathl::{
    context::{Binding, ScopeStack},
    Ast, CompilerContext, MathlError, MathlResult, NodeId, NodeKind, NodeValue, Operator,
    StorageQualifier, TypeRef, VarType,
};
use tracing::{debug, trace};

use crate::{
    bindings::IoBindings,
    options::GenOptions,
    precedence::{needs_parens, precedence, PRIMARY},
    runtime::JS_RUNTIME,
    CodeGenerator, GeneratorDefine,
};

/// The `js` backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsGenerator;

impl CodeGenerator for JsGenerator {
    fn define(&self) -> GeneratorDefine {
        GeneratorDefine { type_name: "js" }
    }

    fn generate(&self, ctx: &CompilerContext, options: &GenOptions) -> MathlResult<String> {
        let root = ctx
            .ast
            .root()
            .ok_or_else(|| MathlError::semantic("nothing to generate: no syntax tree"))?;
        if !ctx.has_function("main") {
            return Err(ctx.error(None, MathlError::semantic("program has no main function")));
        }

        let mut emitter = JsEmitter::new(ctx, options);
        emitter.program(root)?;
        debug!(bytes = emitter.out.len(), "emitted javascript");
        Ok(emitter.out)
    }
}

struct JsEmitter<'a> {
    ctx: &'a CompilerContext,
    ast: &'a Ast,
    options: &'a GenOptions,
    bindings: IoBindings,
    /// Bindings visible at the node being emitted
    scopes: ScopeStack,
    out: String,
}

impl<'a> JsEmitter<'a> {
    fn new(ctx: &'a CompilerContext, options: &'a GenOptions) -> Self {
        let mut scopes = ScopeStack::new();
        for table in [&ctx.inputs, &ctx.outputs, &ctx.uniforms] {
            for (name, io) in table {
                scopes.set(name.clone(), Binding::new(io.ty.clone(), Some(io.decl)));
            }
        }

        Self {
            ctx,
            ast: &ctx.ast,
            options,
            bindings: IoBindings::from_context(ctx),
            scopes,
            out: String::new(),
        }
    }

    fn program(&mut self, root: NodeId) -> MathlResult<()> {
        let ctx = self.ctx;
        if self.options.include_runtime {
            self.out.push_str(JS_RUNTIME);
            self.out.push('\n');
        }

        let pad = self.options.pad(1);
        self.out.push_str("program = function() {\n");
        self.out.push_str(&format!("{}let __outs;\n", pad));
        if !self.bindings.inputs.is_empty() {
            self.out
                .push_str(&format!("{}let {};\n", pad, self.bindings.inputs.join(", ")));
        }
        self.out.push('\n');

        for (name, io) in &ctx.uniforms {
            self.uniform(name, &io.ty);
        }
        self.statement_list(root, 1, false)?;
        self.entry_point();
        self.descriptor();
        self.out.push_str("}\n");
        Ok(())
    }

    fn uniform(&mut self, name: &str, ty: &VarType) {
        let pad = self.options.pad(1);
        let inner = self.options.pad(2);

        self.out
            .push_str(&format!("{}let {} = {};\n", pad, name, ty.zero_value()));
        self.out
            .push_str(&format!("{}function __set{}(val) {{\n", pad, name));
        match ty.size() {
            Some(size) => {
                for i in 0..size {
                    self.out
                        .push_str(&format!("{}{}[{}] = val[{}];\n", inner, name, i, i));
                }
            }
            None => self.out.push_str(&format!("{}{} = val;\n", inner, name)),
        }
        self.out.push_str(&format!("{}}}\n\n", pad));
    }

    fn entry_point(&mut self) {
        let pad = self.options.pad(1);
        let inner = self.options.pad(2);
        let params: String = self
            .bindings
            .inputs
            .iter()
            .map(|name| format!(", ${}", name))
            .collect();

        self.out
            .push_str(&format!("{}let __$func = function(outs{}) {{\n", pad, params));
        self.out.push_str(&format!("{}__outs = outs;\n", inner));
        for name in &self.bindings.inputs {
            self.out.push_str(&format!("{}{} = ${};\n", inner, name, name));
        }
        self.out.push_str(&format!("{}main();\n", inner));
        self.out.push_str(&format!("{}}};\n", pad));
    }

    fn descriptor(&mut self) {
        let pad = self.options.pad(1);
        let inner = self.options.pad(2);
        let entry = self.options.pad(3);
        let b = &self.bindings;

        let mut text = format!("{}return {{\n{}call : __$func,\n", pad, inner);
        for name in &b.uniforms {
            text.push_str(&format!("{}get {}() {{return {}}},\n", inner, name, name));
            text.push_str(&format!("{}set {}(val) {{__set{}(val)}},\n", inner, name, name));
        }

        text.push_str(&format!("{}outputs: {{\n", inner));
        for (name, slot) in &b.outputs {
            text.push_str(&format!("{}{} : {},\n", entry, name, slot));
        }
        text.push_str(&format!("{}}},\n", inner));

        text.push_str(&format!("{}outputTypes: {{\n", inner));
        for (name, ty) in &b.output_types {
            text.push_str(&format!("{}{} : \"{}\",\n", entry, name, ty));
        }
        text.push_str(&format!("{}}},\n", inner));

        text.push_str(&format!("{}outputCount: {}\n{}}};\n", inner, b.output_count, pad));
        self.out.push_str(&text);
    }

    fn statement_list(&mut self, list: NodeId, depth: usize, scoped: bool) -> MathlResult<()> {
        if scoped {
            self.scopes.push();
        }
        let ast = self.ast;
        for &child in ast.children(list) {
            self.line(child, depth)?;
        }
        if scoped {
            self.scopes.pop()?;
        }
        Ok(())
    }

    /// Emit one statement on its own line, or nothing if it produced no text.
    fn line(&mut self, node: NodeId, depth: usize) -> MathlResult<()> {
        let start = self.out.len();
        let pad = self.options.pad(depth);
        self.out.push_str(&pad);

        let body = self.out.len();
        self.statement(node, depth)?;
        if self.out.len() == body {
            self.out.truncate(start);
        } else {
            self.out.push_str(terminator(self.ast.kind(node)));
        }
        Ok(())
    }

    fn statement(&mut self, node: NodeId, depth: usize) -> MathlResult<()> {
        match self.ast.kind(node) {
            NodeKind::Function => self.function(node, depth),
            NodeKind::VarDecl => self.var_decl(node),
            NodeKind::If => self.if_chain(node, depth),
            NodeKind::StatementList => self.block(node, depth),
            NodeKind::Return => {
                self.out.push_str("return");
                if let Some(value) = self.ast.child(node, 0) {
                    self.out.push(' ');
                    self.expression(value)?;
                }
                Ok(())
            }
            _ => self.expression(node),
        }
    }

    fn block(&mut self, node: NodeId, depth: usize) -> MathlResult<()> {
        self.out.push_str("{\n");
        if self.ast.kind(node) == NodeKind::StatementList {
            self.statement_list(node, depth + 1, true)?;
        } else {
            self.scopes.push();
            self.line(node, depth + 1)?;
            self.scopes.pop()?;
        }
        let pad = self.options.pad(depth);
        self.out.push_str(&pad);
        self.out.push('}');
        Ok(())
    }

    fn function(&mut self, node: NodeId, depth: usize) -> MathlResult<()> {
        let ast = self.ast;
        let name = self.name(node)?;
        let (Some(params), Some(body)) = (ast.child(node, 1), ast.child(node, 2)) else {
            return Err(self.malformed(node, "function without parameters or body"));
        };
        trace!(function = name, "emit function");

        self.scopes.push();
        let mut names = Vec::new();
        for &param in ast.children(params) {
            let param_name = self.name(param)?;
            let ty = self.decl_type(param)?;
            self.scopes
                .set(param_name, Binding::new(ty.clone(), Some(param)));
            names.push(param_name);
        }

        self.out
            .push_str(&format!("function {}({}) {{\n", name, names.join(", ")));
        self.statement_list(body, depth + 1, false)?;
        let pad = self.options.pad(depth);
        self.out.push_str(&pad);
        self.out.push('}');
        self.scopes.pop()
    }

    fn var_decl(&mut self, node: NodeId) -> MathlResult<()> {
        let name = self.name(node)?;
        let ty = self.decl_type(node)?;
        let init = self.ast.child(node, 1);

        if self.is_io_restatement(node, name, ty)? {
            let top_level = self.ast.enclosing(node, NodeKind::Function).is_none();
            let uniform = self.ctx.io_qualifier(name) == Some(StorageQualifier::Uniform);
            if let (Some(init), true) = (init, uniform || !top_level) {
                self.ident(name);
                self.out.push_str(" = ");
                self.expression(init)?;
            }
            return Ok(());
        }

        if self.is_param_restatement(node, name, ty)? {
            if let Some(init) = init {
                self.out.push_str(&format!("{} = ", name));
                self.expression(init)?;
            }
            return Ok(());
        }

        self.out.push_str(&format!("let {} = ", name));
        match init {
            Some(init) => self.expression(init)?,
            None => self.out.push_str(&ty.zero_value().to_string()),
        }
        self.scopes.set(name, Binding::new(ty.clone(), Some(node)));
        Ok(())
    }

    /// Whether `node` declares an input, output or uniform again instead of
    /// introducing a new variable.
    ///
    /// At top level every declaration of an I/O name is one. Inside a function
    /// it is one only while the visible binding is still the I/O declaration
    /// and the declared type matches; anything else shadows.
    fn is_io_restatement(&self, node: NodeId, name: &str, ty: &VarType) -> MathlResult<bool> {
        let Some(io) = self.ctx.io_decl(name) else {
            return Ok(false);
        };
        if io.decl == node || self.ast.enclosing(node, NodeKind::Function).is_none() {
            return Ok(true);
        }
        if self.scopes.get(name).and_then(|b| b.decl) != Some(io.decl) {
            return Ok(false);
        }
        self.ctx
            .types_equal(TypeRef::Named(&io.ty), TypeRef::Named(ty))
    }

    /// Whether `node` redeclares a parameter of its own function with the
    /// same type. A JS `let` of a parameter name in the function body is
    /// rejected, so such a declaration becomes an assignment.
    fn is_param_restatement(&self, node: NodeId, name: &str, ty: &VarType) -> MathlResult<bool> {
        let ast = self.ast;
        let Some(binding) = self.scopes.get(name) else {
            return Ok(false);
        };
        let Some(decl) = binding.decl else {
            return Ok(false);
        };
        let Some(params) = ast.parent(decl) else {
            return Ok(false);
        };
        if ast.kind(params) != NodeKind::ParamList
            || ast.parent(params) != ast.enclosing(node, NodeKind::Function)
        {
            return Ok(false);
        }
        self.ctx
            .types_equal(TypeRef::Named(&binding.ty), TypeRef::Named(ty))
    }

    fn if_chain(&mut self, node: NodeId, depth: usize) -> MathlResult<()> {
        let ast = self.ast;
        let (Some(cond), Some(then)) = (ast.child(node, 0), ast.child(node, 1)) else {
            return Err(self.malformed(node, "if without condition or body"));
        };

        self.out.push_str("if (");
        self.expression(cond)?;
        self.out.push_str(") ");
        self.block(then, depth)?;

        let Some(other) = ast.child(node, 2) else {
            return Ok(());
        };
        self.out.push_str(" else ");
        if ast.kind(other) == NodeKind::If {
            self.out.push_str("{\n");
            let inner = self.options.pad(depth + 1);
            self.out.push_str(&inner);
            self.if_chain(other, depth + 1)?;
            self.out.push('\n');
            let pad = self.options.pad(depth);
            self.out.push_str(&pad);
            self.out.push('}');
            Ok(())
        } else {
            self.block(other, depth)
        }
    }

    fn expression(&mut self, node: NodeId) -> MathlResult<()> {
        let ast = self.ast;
        let kind = ast.kind(node);
        match kind {
            NodeKind::IntConstant | NodeKind::FloatConstant | NodeKind::BoolConstant => {
                self.constant(node)
            }
            NodeKind::Ident => {
                let name = self.name(node)?;
                self.ident(name);
                Ok(())
            }
            NodeKind::VarRef => {
                let name = self.name(node)?;
                self.ident(name);
                if let Some(index) = ast.child(node, 1) {
                    self.out.push('[');
                    self.expression(index)?;
                    self.out.push(']');
                }
                Ok(())
            }
            NodeKind::BinOp | NodeKind::Assign => self.binary(node),
            NodeKind::UnaryOp => {
                let op = ast
                    .op(node)
                    .ok_or_else(|| self.malformed(node, "unary operator without an operator"))?;
                let operand = self.operand_of(node, 0)?;
                self.out.push_str(op.symbol());
                self.operand(operand, precedence(ast, operand) < PRIMARY)
            }
            NodeKind::Trinary => {
                let cond = self.operand_of(node, 0)?;
                let then = self.operand_of(node, 1)?;
                let other = self.operand_of(node, 2)?;
                self.out.push_str("((");
                self.expression(cond)?;
                self.out.push_str(") ? (");
                self.expression(then)?;
                self.out.push_str(") : (");
                self.expression(other)?;
                self.out.push_str("))");
                Ok(())
            }
            NodeKind::ArrayLookup => {
                let base = self.operand_of(node, 0)?;
                let index = self.operand_of(node, 1)?;
                self.operand(base, precedence(ast, base) < PRIMARY)?;
                self.out.push('[');
                self.expression(index)?;
                self.out.push(']');
                Ok(())
            }
            NodeKind::BasicMemberLookup => {
                let base = self.operand_of(node, 0)?;
                let member = self.operand_of(node, 1)?;
                self.operand(base, precedence(ast, base) < PRIMARY)?;
                self.out.push('.');
                let member = self.name(member)?;
                self.out.push_str(member);
                Ok(())
            }
            NodeKind::Call => {
                let callee = self.operand_of(node, 0)?;
                match (ast.kind(callee), ast.var_type(callee)) {
                    (NodeKind::VarType, Some(ty)) => self.out.push_str(&ty.type_name()),
                    (NodeKind::Ident, _) => {
                        let name = self.name(callee)?;
                        self.out.push_str(name);
                    }
                    _ => self.operand(callee, precedence(ast, callee) < PRIMARY)?,
                }
                self.out.push('(');
                if let Some(args) = ast.child(node, 1) {
                    self.expression(args)?;
                }
                self.out.push(')');
                Ok(())
            }
            NodeKind::ExprList => {
                for (i, &arg) in ast.children(node).iter().enumerate() {
                    if i > 0 {
                        self.out.push_str(", ");
                    }
                    self.expression(arg)?;
                }
                Ok(())
            }
            NodeKind::StatementList
            | NodeKind::Function
            | NodeKind::ParamList
            | NodeKind::VarDecl
            | NodeKind::VarType
            | NodeKind::If
            | NodeKind::Return => Err(self.malformed(node, format!("{} is not an expression", kind))),
        }
    }

    fn binary(&mut self, node: NodeId) -> MathlResult<()> {
        let ast = self.ast;
        let op = match ast.kind(node) {
            NodeKind::Assign => Operator::Assign,
            _ => ast
                .op(node)
                .ok_or_else(|| self.malformed(node, "binary operator without an operator"))?,
        };
        let lhs = self.operand_of(node, 0)?;
        let rhs = self.operand_of(node, 1)?;

        self.operand(lhs, needs_parens(ast, lhs, op, false))?;
        if op == Operator::Member {
            self.out.push('.');
            if ast.kind(rhs) == NodeKind::Ident {
                let member = self.name(rhs)?;
                self.out.push_str(member);
                return Ok(());
            }
        } else {
            self.out.push_str(&format!(" {} ", op.symbol()));
        }
        self.operand(rhs, needs_parens(ast, rhs, op, true))
    }

    fn operand(&mut self, node: NodeId, parens: bool) -> MathlResult<()> {
        if parens {
            self.out.push('(');
        }
        self.expression(node)?;
        if parens {
            self.out.push(')');
        }
        Ok(())
    }

    fn constant(&mut self, node: NodeId) -> MathlResult<()> {
        let text = match self.ast.value(node) {
            Some(NodeValue::Int(v)) => v.to_string(),
            Some(NodeValue::Float(v)) => format!("{:.*}", self.options.float_precision, v),
            Some(NodeValue::Bool(v)) => v.to_string(),
            _ => return Err(self.malformed(node, "constant without a value")),
        };
        self.out.push_str(&text);
        Ok(())
    }

    fn ident(&mut self, name: &str) {
        match self.output_slot(name) {
            Some(slot) => self.out.push_str(&format!("__outs[{}]", slot)),
            None => self.out.push_str(name),
        }
    }

    /// Slot of `name` if it currently refers to an output declaration.
    fn output_slot(&self, name: &str) -> Option<usize> {
        let io = self.ctx.outputs.get(name)?;
        let visible = self.scopes.get(name)?.decl;
        if visible == Some(io.decl) {
            self.bindings.slot(name)
        } else {
            None
        }
    }

    fn name(&self, node: NodeId) -> MathlResult<&'a str> {
        let ast: &'a Ast = self.ast;
        ast.name(node)
            .ok_or_else(|| self.malformed(node, format!("{} without a name", ast.kind(node))))
    }

    fn decl_type(&self, node: NodeId) -> MathlResult<&'a VarType> {
        let ast: &'a Ast = self.ast;
        ast.child(node, 0)
            .and_then(|t| ast.var_type(t))
            .ok_or_else(|| self.malformed(node, "declaration without a type"))
    }

    fn operand_of(&self, node: NodeId, index: usize) -> MathlResult<NodeId> {
        self.ast.child(node, index).ok_or_else(|| {
            self.malformed(
                node,
                format!("{} is missing operand {}", self.ast.kind(node), index),
            )
        })
    }

    fn malformed(&self, node: NodeId, msg: impl Into<String>) -> MathlError {
        self.ctx.error_at(self.ast, node, MathlError::semantic(msg))
    }
}

fn terminator(kind: NodeKind) -> &'static str {
    match kind {
        NodeKind::Function => "\n\n",
        NodeKind::If | NodeKind::StatementList => "\n",
        _ => ";\n",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn js(src: &str) -> String {
        let ctx = mathl::parse(src, "test.mathl").unwrap();
        JsGenerator
            .generate(&ctx, &GenOptions::default().with_runtime(false))
            .unwrap()
    }

    #[test]
    fn test_program_layout() {
        let src = "in vec3 point;\nout float a;\nuniform vec2 offset;\nvoid main() {\n  a = point.x + offset.y;\n}";
        let expected = r#"program = function() {
  let __outs;
  let point;

  let offset = [0,0];
  function __setoffset(val) {
    offset[0] = val[0];
    offset[1] = val[1];
  }

  function main() {
    __outs[0] = point[0] + offset[1];
  }

  let __$func = function(outs, $point) {
    __outs = outs;
    point = $point;
    main();
  };
  return {
    call : __$func,
    get offset() {return offset},
    set offset(val) {__setoffset(val)},
    outputs: {
      a : 0,
    },
    outputTypes: {
      a : "float",
    },
    outputCount: 1
  };
}
"#;
        assert_eq!(js(src), expected);
    }

    #[test]
    fn test_runtime_prelude() {
        let ctx = mathl::parse("void main() {\n}", "empty.mathl").unwrap();
        let text = JsGenerator.generate(&ctx, &GenOptions::default()).unwrap();
        assert!(text.starts_with(JS_RUNTIME));
        assert!(text.contains("function cross(a, b)"));
        assert!(text.contains("outputCount: 0"));
    }

    #[test]
    fn test_scalar_uniform_setter() {
        let text = js("uniform float time;\nvoid main() {\n}");
        assert!(text.contains("  let time = 0;\n  function __settime(val) {\n    time = val;\n  }\n"));
        assert!(text.contains("    get time() {return time},\n"));
    }

    #[test]
    fn test_redeclared_output() {
        let text = js("out float a;\nout vec2 b;\nvoid main() {\n  float a = 1.0;\n  vec3 b;\n  b[0] = a;\n}");
        assert!(text.contains("    __outs[0] = 1.0000000;\n"));
        assert!(text.contains("    let b = [0,0,0];\n"));
        assert!(text.contains("    b[0] = __outs[0];\n"));
        assert!(!text.contains("let a"));
    }

    #[test]
    fn test_block_scope_ends() {
        let text = js("out float a;\nvoid main() {\n  {\n    vec2 a;\n    a[0] = 1.0;\n  }\n  a = 4.0;\n}");
        assert!(text.contains("    {\n      let a = [0,0];\n      a[0] = 1.0000000;\n    }\n"));
        assert!(text.contains("    __outs[0] = 4.0000000;\n"));
    }

    #[test]
    fn test_parameters_shadow_outputs() {
        let text = js("out float a;\nfloat twice(float a) {\n  return a * 2.0;\n}\nvoid main() {\n  a = twice(a);\n}");
        assert!(text.contains("  function twice(a) {\n    return a * 2.0000000;\n  }\n"));
        assert!(text.contains("    __outs[0] = twice(__outs[0]);\n"));
    }

    #[test]
    fn test_operator_parentheses() {
        let text = js("float a;\nfloat b;\nfloat c;\nout float r;\nvoid main() {\n  r = a + b * c;\n  r = (a + b) * c;\n  r = a - (b - c);\n  r = -(a + b);\n}");
        assert!(text.contains("  let a = 0;\n"));
        assert!(text.contains("__outs[0] = a + b * c;"));
        assert!(text.contains("__outs[0] = (a + b) * c;"));
        assert!(text.contains("__outs[0] = a - (b - c);"));
        assert!(text.contains("__outs[0] = -(a + b);"));
    }

    #[test]
    fn test_if_else_chain() {
        let text = js("in float x;\nout float r;\nvoid main() {\n  if (x > 1.0) {\n    r = 1.0;\n  } else if (x > 0.0) {\n    r = 0.5;\n  } else {\n    r = 0.0;\n  }\n}");
        let expected = "    if (x > 1.0000000) {
      __outs[0] = 1.0000000;
    } else {
      if (x > 0.0000000) {
        __outs[0] = 0.5000000;
      } else {
        __outs[0] = 0.0000000;
      }
    }
";
        assert!(text.contains(expected), "{}", text);
    }

    #[test]
    fn test_calls_and_trinary() {
        let text = js("in vec2 p;\nout vec3 c;\nvoid main() {\n  c = vec3(p.x > 0.5 ? 1.0 : 0.0, dot(p, p), 1);\n}");
        assert!(text.contains(
            "__outs[0] = vec3(((p[0] > 0.5000000) ? (1.0000000) : (0.0000000)), dot(p, p), 1);"
        ));
    }

    #[test]
    fn test_float_precision_option() {
        let ctx = mathl::parse("out float a;\nvoid main() {\n  a = 0.25;\n}", "p.mathl").unwrap();
        let options = GenOptions::default().with_runtime(false).with_float_precision(2);
        let text = JsGenerator.generate(&ctx, &options).unwrap();
        assert!(text.contains("__outs[0] = 0.25;"));
    }

    #[test]
    fn test_missing_main() {
        let ctx = mathl::parse("out float a;", "nomain.mathl").unwrap();
        let err = JsGenerator.generate(&ctx, &GenOptions::default()).unwrap_err();
        assert_eq!(
            err.root(),
            &MathlError::Semantic("program has no main function".to_string())
        );
    }
}
