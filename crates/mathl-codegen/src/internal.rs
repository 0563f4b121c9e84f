//! `internal` backend: prints the lowered tree back as MathL-like source.
//!
//! Used to inspect what the lowering passes produced. The output keeps
//! storage qualifiers and declared types, so it can be read the same way as
//! the input, but no attempt is made to round-trip comments or formatting.

use mathl::{
    traverse::{traverse, TraverseHandler, Traversal},
    CompilerContext, MathlError, MathlResult, NodeId, NodeKind, NodeValue, Operator, VarType,
};
use tracing::debug;

use crate::{
    options::GenOptions,
    precedence::{needs_parens, precedence, PRIMARY},
    CodeGenerator, GeneratorDefine,
};

/// The `internal` backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct InternalGenerator;

impl CodeGenerator for InternalGenerator {
    fn define(&self) -> GeneratorDefine {
        GeneratorDefine {
            type_name: "internal",
        }
    }

    fn generate(&self, ctx: &CompilerContext, options: &GenOptions) -> MathlResult<String> {
        let root = ctx
            .ast
            .root()
            .ok_or_else(|| MathlError::semantic("nothing to generate: no syntax tree"))?;

        let mut ast = ctx.ast.clone();
        let mut emitter = InternalEmitter {
            ctx,
            options,
            out: String::new(),
        };
        traverse(&mut ast, root, 0usize, &mut emitter)?;
        debug!(bytes = emitter.out.len(), "emitted internal");
        Ok(emitter.out)
    }
}

/// Traversal handler; the state is the indentation depth.
struct InternalEmitter<'c> {
    ctx: &'c CompilerContext,
    options: &'c GenOptions,
    out: String,
}

impl TraverseHandler<usize> for InternalEmitter<'_> {
    fn handle(&mut self, tr: &mut Traversal<'_>, node: NodeId, depth: usize) -> MathlResult<()> {
        let kind = tr.ast.kind(node);
        let children = tr.ast.children(node).to_vec();

        match kind {
            NodeKind::StatementList => {
                for child in children {
                    self.line(tr, child, depth)?;
                }
                Ok(())
            }
            NodeKind::Function => {
                let ret = self.type_of(tr, node)?;
                let name = self.name(tr, node)?;
                self.out.push_str(&format!("{} {}(", ret.type_name(), name));
                if let Some(&params) = children.get(1) {
                    tr.descend(self, params, depth)?;
                }
                self.out.push_str(") ");
                let body = self.operand(tr, node, 2)?;
                self.block(tr, body, depth)
            }
            NodeKind::ParamList | NodeKind::ExprList => {
                for (i, child) in children.into_iter().enumerate() {
                    if i > 0 {
                        self.out.push_str(", ");
                    }
                    tr.descend(self, child, depth)?;
                }
                Ok(())
            }
            NodeKind::VarDecl => {
                let ty = self.type_of(tr, node)?;
                let qualifier = children.first().and_then(|&t| tr.ast.node(t).qualifier);
                let name = self.name(tr, node)?;
                if let Some(qualifier) = qualifier {
                    self.out.push_str(qualifier.keyword());
                    self.out.push(' ');
                }
                let (base, suffix) = declarator(&ty);
                self.out.push_str(&format!("{} {}{}", base, name, suffix));
                if let Some(&init) = children.get(1) {
                    self.out.push_str(" = ");
                    tr.descend(self, init, depth)?;
                }
                Ok(())
            }
            NodeKind::VarType => {
                let ty = tr.ast.var_type(node).map(VarType::type_name);
                let ty = ty.ok_or_else(|| self.malformed(tr, node, "type node without a type"))?;
                self.out.push_str(&ty);
                Ok(())
            }
            NodeKind::Ident => {
                let name = self.name(tr, node)?;
                self.out.push_str(&name);
                Ok(())
            }
            NodeKind::VarRef => {
                let name = self.name(tr, node)?;
                self.out.push_str(&name);
                if let Some(&index) = children.get(1) {
                    self.out.push('[');
                    tr.descend(self, index, depth)?;
                    self.out.push(']');
                }
                Ok(())
            }
            NodeKind::IntConstant | NodeKind::FloatConstant | NodeKind::BoolConstant => {
                let text = match tr.ast.value(node) {
                    Some(NodeValue::Int(v)) => v.to_string(),
                    Some(NodeValue::Float(v)) => format!("{:.*}", self.options.float_precision, v),
                    Some(NodeValue::Bool(v)) => v.to_string(),
                    _ => return Err(self.malformed(tr, node, "constant without a value")),
                };
                self.out.push_str(&text);
                Ok(())
            }
            NodeKind::BinOp | NodeKind::Assign => {
                let op = match kind {
                    NodeKind::Assign => Operator::Assign,
                    _ => tr
                        .ast
                        .op(node)
                        .ok_or_else(|| self.malformed(tr, node, "binary operator without an operator"))?,
                };
                let lhs = self.operand(tr, node, 0)?;
                let rhs = self.operand(tr, node, 1)?;

                let parens = needs_parens(tr.ast, lhs, op, false);
                self.wrapped(tr, lhs, depth, parens)?;
                if op == Operator::Member {
                    self.out.push('.');
                } else {
                    self.out.push_str(&format!(" {} ", op.symbol()));
                }
                let parens = needs_parens(tr.ast, rhs, op, true);
                self.wrapped(tr, rhs, depth, parens)
            }
            NodeKind::UnaryOp => {
                let op = tr
                    .ast
                    .op(node)
                    .ok_or_else(|| self.malformed(tr, node, "unary operator without an operator"))?;
                let operand = self.operand(tr, node, 0)?;
                self.out.push_str(op.symbol());
                let parens = precedence(tr.ast, operand) < PRIMARY;
                self.wrapped(tr, operand, depth, parens)
            }
            NodeKind::Trinary => {
                let cond = self.operand(tr, node, 0)?;
                let then = self.operand(tr, node, 1)?;
                let other = self.operand(tr, node, 2)?;
                self.out.push('(');
                tr.descend(self, cond, depth)?;
                self.out.push_str(" ? ");
                tr.descend(self, then, depth)?;
                self.out.push_str(" : ");
                tr.descend(self, other, depth)?;
                self.out.push(')');
                Ok(())
            }
            NodeKind::ArrayLookup => {
                let base = self.operand(tr, node, 0)?;
                let index = self.operand(tr, node, 1)?;
                let parens = precedence(tr.ast, base) < PRIMARY;
                self.wrapped(tr, base, depth, parens)?;
                self.out.push('[');
                tr.descend(self, index, depth)?;
                self.out.push(']');
                Ok(())
            }
            NodeKind::BasicMemberLookup => {
                let base = self.operand(tr, node, 0)?;
                let member = self.operand(tr, node, 1)?;
                let parens = precedence(tr.ast, base) < PRIMARY;
                self.wrapped(tr, base, depth, parens)?;
                self.out.push('.');
                tr.descend(self, member, depth)
            }
            NodeKind::Call => {
                let callee = self.operand(tr, node, 0)?;
                tr.descend(self, callee, depth)?;
                self.out.push('(');
                if let Some(&args) = children.get(1) {
                    tr.descend(self, args, depth)?;
                }
                self.out.push(')');
                Ok(())
            }
            NodeKind::If => {
                let cond = self.operand(tr, node, 0)?;
                let then = self.operand(tr, node, 1)?;
                self.out.push_str("if (");
                tr.descend(self, cond, depth)?;
                self.out.push_str(") ");
                self.block(tr, then, depth)?;
                if let Some(&other) = children.get(2) {
                    self.out.push_str(" else ");
                    if tr.ast.kind(other) == NodeKind::If {
                        tr.descend(self, other, depth)?;
                    } else {
                        self.block(tr, other, depth)?;
                    }
                }
                Ok(())
            }
            NodeKind::Return => {
                self.out.push_str("return");
                if let Some(&value) = children.first() {
                    self.out.push(' ');
                    tr.descend(self, value, depth)?;
                }
                Ok(())
            }
        }
    }
}

impl InternalEmitter<'_> {
    fn line(&mut self, tr: &mut Traversal<'_>, node: NodeId, depth: usize) -> MathlResult<()> {
        let pad = self.options.pad(depth);
        self.out.push_str(&pad);
        let kind = tr.ast.kind(node);
        if kind == NodeKind::StatementList {
            self.block(tr, node, depth)?;
        } else {
            tr.descend(self, node, depth)?;
        }
        match kind {
            NodeKind::Function | NodeKind::If | NodeKind::StatementList => self.out.push('\n'),
            _ => self.out.push_str(";\n"),
        }
        Ok(())
    }

    fn block(&mut self, tr: &mut Traversal<'_>, node: NodeId, depth: usize) -> MathlResult<()> {
        self.out.push_str("{\n");
        if tr.ast.kind(node) == NodeKind::StatementList {
            tr.descend(self, node, depth + 1)?;
        } else {
            self.line(tr, node, depth + 1)?;
        }
        let pad = self.options.pad(depth);
        self.out.push_str(&pad);
        self.out.push('}');
        Ok(())
    }

    fn wrapped(
        &mut self,
        tr: &mut Traversal<'_>,
        node: NodeId,
        depth: usize,
        parens: bool,
    ) -> MathlResult<()> {
        if parens {
            self.out.push('(');
        }
        tr.descend(self, node, depth)?;
        if parens {
            self.out.push(')');
        }
        Ok(())
    }

    fn operand(&self, tr: &Traversal<'_>, node: NodeId, index: usize) -> MathlResult<NodeId> {
        tr.ast.child(node, index).ok_or_else(|| {
            let msg = format!("{} is missing operand {}", tr.ast.kind(node), index);
            self.malformed(tr, node, msg)
        })
    }

    /// Declared type of a `Function` or `VarDecl`.
    fn type_of(&self, tr: &Traversal<'_>, node: NodeId) -> MathlResult<VarType> {
        tr.ast
            .child(node, 0)
            .and_then(|t| tr.ast.var_type(t))
            .cloned()
            .ok_or_else(|| self.malformed(tr, node, "declaration without a type"))
    }

    fn name(&self, tr: &Traversal<'_>, node: NodeId) -> MathlResult<String> {
        tr.ast
            .name(node)
            .map(str::to_string)
            .ok_or_else(|| self.malformed(tr, node, format!("{} without a name", tr.ast.kind(node))))
    }

    fn malformed(&self, tr: &Traversal<'_>, node: NodeId, msg: impl Into<String>) -> MathlError {
        self.ctx.error_at(tr.ast, node, MathlError::semantic(msg))
    }
}

/// Split a declared type into the part before and after the name, so that
/// `float[4]` declares as `float w[4]`. Aliased types print whole.
fn declarator(ty: &VarType) -> (String, String) {
    match ty {
        VarType::Array {
            elem,
            size,
            alias: None,
        } => (elem.type_name(), format!("[{}]", size)),
        VarType::DynamicArray { elem, alias: None } => (elem.type_name(), "[]".to_string()),
        _ => (ty.type_name(), String::new()),
    }
}
