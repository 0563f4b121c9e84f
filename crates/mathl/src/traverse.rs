//! Tree traversal.
//!
//! Four modes, in increasing power:
//!
//! - [`visit`]: read-only preorder, calls a closure on every node of one kind.
//! - [`walk`]: read-only preorder dispatch to a [`Walker`]; always recurses.
//! - [`traverse`]: continuation-passing preorder over a mutable tree. The
//!   handler decides whether and how to recurse via [`Traversal::descend`].
//! - [`scope_walk`]: `traverse` with lexical scopes kept in step with
//!   declarations, functions and member accesses.

use std::collections::HashSet;

use tracing::trace;

use crate::{
    ast::{Ast, NodeId, NodeKind, Operator},
    context::{Binding, CompilerContext, THIS},
    error::{MathlError, MathlResult},
};

/// Call `handler` on every node of `kind` below and including `root`.
pub fn visit(ast: &Ast, root: NodeId, kind: NodeKind, handler: &mut impl FnMut(&Ast, NodeId)) {
    if ast.kind(root) == kind {
        handler(ast, root);
    }
    for &child in ast.children(root) {
        visit(ast, child, kind, handler);
    }
}

/// Read-only per-node dispatch for [`walk`].
pub trait Walker {
    fn walk_node(&mut self, ast: &Ast, node: NodeId, kind: NodeKind) -> MathlResult<()>;
}

/// Preorder walk; the walker sees every node and children are always visited.
pub fn walk<W: Walker>(ast: &Ast, root: NodeId, walker: &mut W) -> MathlResult<()> {
    walker.walk_node(ast, root, ast.kind(root))?;
    for &child in ast.children(root) {
        walk(ast, child, walker)?;
    }
    Ok(())
}

/// Handler for [`traverse`]. Recursion happens only through [`Traversal::descend`].
pub trait TraverseHandler<S> {
    fn handle(&mut self, tr: &mut Traversal<'_>, node: NodeId, state: S) -> MathlResult<()>;
}

/// State of one traversal: the tree plus the set of nodes already handled.
pub struct Traversal<'a> {
    pub ast: &'a mut Ast,
    visited: HashSet<NodeId>,
}

impl<'a> Traversal<'a> {
    pub fn new(ast: &'a mut Ast) -> Self {
        Self {
            ast,
            visited: HashSet::new(),
        }
    }

    /// Hand `node` to the handler unless it was handled already.
    pub fn enter<S, H: TraverseHandler<S>>(
        &mut self,
        handler: &mut H,
        node: NodeId,
        state: S,
    ) -> MathlResult<()> {
        if !self.visited.insert(node) {
            return Ok(());
        }
        handler.handle(self, node, state)
    }

    /// Continue below `node`.
    ///
    /// For a node that was already handled (the usual case, a handler
    /// descending into itself) each current child is entered. An unhandled
    /// node is entered directly. Children moved elsewhere by a rewrite of an
    /// earlier sibling are skipped.
    pub fn descend<S: Clone, H: TraverseHandler<S>>(
        &mut self,
        handler: &mut H,
        node: NodeId,
        state: S,
    ) -> MathlResult<()> {
        if !self.visited.contains(&node) {
            return self.enter(handler, node, state);
        }

        let children = self.ast.children(node).to_vec();
        for child in children {
            if self.ast.parent(child) != Some(node) {
                continue;
            }
            self.enter(handler, child, state.clone())?;
        }
        Ok(())
    }

    /// Replace `old` with `new` in `old`'s parent and forget `old`, so that it
    /// is traversed again if it is reattached later.
    pub fn splice(&mut self, old: NodeId, new: NodeId) -> MathlResult<()> {
        self.ast.replace_in_parent(old, new)?;
        self.release(old);
        Ok(())
    }

    pub fn release(&mut self, node: NodeId) {
        self.visited.remove(&node);
    }

    pub fn is_visited(&self, node: NodeId) -> bool {
        self.visited.contains(&node)
    }
}

/// Continuation-passing preorder traversal starting at `root`.
pub fn traverse<S, H: TraverseHandler<S>>(
    ast: &mut Ast,
    root: NodeId,
    state: S,
    handler: &mut H,
) -> MathlResult<()> {
    Traversal::new(ast).enter(handler, root, state)
}

/// What [`scope_walk`] does after a hook ran.
#[derive(Debug, Clone, PartialEq)]
pub enum Flow {
    /// Continue into the node's children
    Descend,
    /// Leave the subtree alone
    Skip,
    /// The node was replaced by these nodes; traverse them instead
    Replaced(Vec<NodeId>),
}

/// Per-node semantic hook run by [`scope_walk`] with scopes already set up.
pub trait ScopeHook {
    fn hook(&mut self, ast: &mut Ast, ctx: &mut CompilerContext, node: NodeId)
        -> MathlResult<Flow>;
}

/// Traverse `root` keeping `ctx`'s scope stack in step with the tree.
///
/// - `VarDecl` binds its name to its declared type before the hook runs.
/// - `Function` opens a scope and binds its return type.
/// - Member access (`BinOp` with `.` or `BasicMemberLookup`) opens a scope
///   and binds `this` to the type of an identifier base. An unbound base is
///   an `UndefinedSymbol` error.
pub fn scope_walk<H: ScopeHook>(
    ast: &mut Ast,
    root: NodeId,
    ctx: &mut CompilerContext,
    hook: &mut H,
) -> MathlResult<()> {
    ctx.push_scope();
    let mut walker = ScopeWalker { ctx, hook };
    traverse(ast, root, (), &mut walker)?;
    walker.ctx.pop_scope()
}

struct ScopeWalker<'c, H> {
    ctx: &'c mut CompilerContext,
    hook: &'c mut H,
}

impl<H: ScopeHook> ScopeWalker<'_, H> {
    fn bind_decl(&mut self, ast: &Ast, node: NodeId) -> MathlResult<()> {
        let name = ast.name(node);
        let ty = ast.child(node, 0).and_then(|t| ast.var_type(t));
        match (name, ty) {
            (Some(name), Some(ty)) => {
                self.ctx
                    .set_scope(name.to_string(), Binding::new(ty.clone(), Some(node)));
                Ok(())
            }
            _ => Err(self.ctx.error_at(
                ast,
                node,
                MathlError::semantic("malformed variable declaration"),
            )),
        }
    }

    fn open_function(&mut self, ast: &Ast, node: NodeId) -> MathlResult<()> {
        let ret = ast
            .child(node, 0)
            .and_then(|t| ast.var_type(t))
            .cloned()
            .ok_or_else(|| {
                self.ctx
                    .error_at(ast, node, MathlError::semantic("function without a return type"))
            })?;
        self.ctx.push_scope();
        self.ctx.set_return_type(ret);
        Ok(())
    }

    fn open_member(&mut self, ast: &Ast, node: NodeId) -> MathlResult<()> {
        self.ctx.push_scope();

        let Some(base) = ast.child(node, 0) else {
            return Ok(());
        };
        if ast.kind(base) != NodeKind::Ident {
            return Ok(());
        }
        let name = ast.name(base).unwrap_or_default();
        let ty = match self.ctx.lookup(name) {
            Some(binding) => binding.ty.clone(),
            None => {
                return Err(self.ctx.error_at(
                    ast,
                    node,
                    MathlError::UndefinedSymbol(name.to_string()),
                ))
            }
        };
        self.ctx.set_scope(THIS, Binding::of(ty));
        Ok(())
    }
}

impl<H: ScopeHook> TraverseHandler<()> for ScopeWalker<'_, H> {
    fn handle(&mut self, tr: &mut Traversal<'_>, node: NodeId, _state: ()) -> MathlResult<()> {
        let scoped = match tr.ast.kind(node) {
            NodeKind::VarDecl => {
                self.bind_decl(tr.ast, node)?;
                false
            }
            NodeKind::Function => {
                self.open_function(tr.ast, node)?;
                true
            }
            NodeKind::BasicMemberLookup => {
                self.open_member(tr.ast, node)?;
                true
            }
            NodeKind::BinOp => {
                if tr.ast.op(node) == Some(Operator::Member) {
                    self.open_member(tr.ast, node)?;
                    true
                } else {
                    false
                }
            }
            NodeKind::StatementList
            | NodeKind::ParamList
            | NodeKind::VarType
            | NodeKind::Ident
            | NodeKind::IntConstant
            | NodeKind::FloatConstant
            | NodeKind::BoolConstant
            | NodeKind::UnaryOp
            | NodeKind::Assign
            | NodeKind::Trinary
            | NodeKind::ArrayLookup
            | NodeKind::Call
            | NodeKind::ExprList
            | NodeKind::If
            | NodeKind::Return
            | NodeKind::VarRef => false,
        };

        let flow = self.hook.hook(tr.ast, self.ctx, node)?;
        let result = match flow {
            Flow::Descend => tr.descend(self, node, ()),
            Flow::Skip | Flow::Replaced(_) => Ok(()),
        };
        if scoped {
            self.ctx.pop_scope()?;
        }
        result?;

        if let Flow::Replaced(nodes) = flow {
            trace!(%node, replacements = nodes.len(), "descend into replacement");
            tr.release(node);
            for new in nodes {
                tr.enter(self, new, ())?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ast::{NodeData, NodeValue, SourcePos},
        types::VarType,
    };

    fn node(ast: &mut Ast, kind: NodeKind) -> NodeId {
        ast.add_node(kind, SourcePos::default())
    }

    fn decl(ast: &mut Ast, parent: NodeId, name: &str, ty: &str) -> NodeId {
        let d = ast.add(
            NodeData::new(NodeKind::VarDecl, SourcePos::default())
                .with_value(NodeValue::Name(name.to_string())),
        );
        ast.push(d, VarType::named(ty)).unwrap();
        ast.push(parent, d).unwrap();
        d
    }

    /// `float a; { b + c; }`
    fn sample() -> (Ast, NodeId) {
        let mut ast = Ast::new();
        let root = node(&mut ast, NodeKind::StatementList);
        decl(&mut ast, root, "a", "float");
        let inner = node(&mut ast, NodeKind::StatementList);
        ast.push(root, inner).unwrap();
        let add = ast.add(NodeData::new(NodeKind::BinOp, SourcePos::default()).with_op(Operator::Add));
        ast.push(inner, add).unwrap();
        ast.push(add, "b").unwrap();
        ast.push(add, "c").unwrap();
        ast.set_root(root);
        (ast, root)
    }

    #[test]
    fn test_visit_matches_kind() {
        let (ast, root) = sample();
        let mut names = Vec::new();
        visit(&ast, root, NodeKind::Ident, &mut |ast, id| {
            names.push(ast.name(id).unwrap_or_default().to_string())
        });
        assert_eq!(names, vec!["b", "c"]);
    }

    struct KindCounter(Vec<NodeKind>);

    impl Walker for KindCounter {
        fn walk_node(&mut self, _ast: &Ast, _node: NodeId, kind: NodeKind) -> MathlResult<()> {
            self.0.push(kind);
            Ok(())
        }
    }

    #[test]
    fn test_walk_is_preorder() {
        let (ast, root) = sample();
        let mut counter = KindCounter(Vec::new());
        walk(&ast, root, &mut counter).unwrap();
        assert_eq!(
            counter.0,
            vec![
                NodeKind::StatementList,
                NodeKind::VarDecl,
                NodeKind::VarType,
                NodeKind::StatementList,
                NodeKind::BinOp,
                NodeKind::Ident,
                NodeKind::Ident,
            ]
        );
    }

    /// Records depth as state; does not descend into nested statement lists.
    struct DepthRecorder(Vec<(NodeKind, usize)>);

    impl TraverseHandler<usize> for DepthRecorder {
        fn handle(&mut self, tr: &mut Traversal<'_>, node: NodeId, depth: usize) -> MathlResult<()> {
            let kind = tr.ast.kind(node);
            self.0.push((kind, depth));
            if kind == NodeKind::StatementList && depth > 0 {
                return Ok(());
            }
            tr.descend(self, node, depth + 1)
        }
    }

    #[test]
    fn test_traverse_threads_state_and_skips() {
        let (mut ast, root) = sample();
        let mut rec = DepthRecorder(Vec::new());
        traverse(&mut ast, root, 0, &mut rec).unwrap();
        assert_eq!(
            rec.0,
            vec![
                (NodeKind::StatementList, 0),
                (NodeKind::VarDecl, 1),
                (NodeKind::VarType, 2),
                (NodeKind::StatementList, 1),
            ]
        );
    }

    /// Rewrites every `+` into `-`, replacing the node.
    struct AddToSub(usize);

    impl TraverseHandler<()> for AddToSub {
        fn handle(&mut self, tr: &mut Traversal<'_>, node: NodeId, _: ()) -> MathlResult<()> {
            if tr.ast.op(node) == Some(Operator::Add) {
                let sub = tr.ast.add(
                    NodeData::new(NodeKind::BinOp, tr.ast.pos(node)).with_op(Operator::Sub),
                );
                for child in tr.ast.children(node).to_vec() {
                    tr.ast.push(sub, child)?;
                }
                tr.splice(node, sub)?;
                self.0 += 1;
                return tr.descend(self, sub, ());
            }
            tr.descend(self, node, ())
        }
    }

    #[test]
    fn test_traverse_splice() {
        let (mut ast, root) = sample();
        let mut pass = AddToSub(0);
        traverse(&mut ast, root, (), &mut pass).unwrap();
        assert_eq!(pass.0, 1);

        let mut ops = Vec::new();
        visit(&ast, root, NodeKind::BinOp, &mut |ast, id| ops.push(ast.op(id)));
        assert_eq!(ops, vec![Some(Operator::Sub)]);
    }

    /// Records the type bound to `this` at each member access.
    struct ThisRecorder(Vec<String>);

    impl ScopeHook for ThisRecorder {
        fn hook(
            &mut self,
            ast: &mut Ast,
            ctx: &mut CompilerContext,
            node: NodeId,
        ) -> MathlResult<Flow> {
            if ast.kind(node) == NodeKind::BasicMemberLookup {
                self.0.push(ctx.get_scope(THIS)?.type_name());
            }
            Ok(Flow::Descend)
        }
    }

    fn member(ast: &mut Ast, parent: NodeId, base: &str, field: &str) -> NodeId {
        let m = node(ast, NodeKind::BasicMemberLookup);
        ast.push(m, base).unwrap();
        ast.push(m, field).unwrap();
        ast.push(parent, m).unwrap();
        m
    }

    #[test]
    fn test_scope_walk_binds_this() {
        let mut ast = Ast::new();
        let root = node(&mut ast, NodeKind::StatementList);
        decl(&mut ast, root, "p", "vec3");
        decl(&mut ast, root, "q", "vec2");
        member(&mut ast, root, "p", "x");
        member(&mut ast, root, "q", "y");

        let mut ctx = CompilerContext::default();
        let mut hook = ThisRecorder(Vec::new());
        scope_walk(&mut ast, root, &mut ctx, &mut hook).unwrap();

        assert_eq!(hook.0, vec!["vec3", "vec2"]);
        assert_eq!(ctx.scopes().depth(), 0);
    }

    #[test]
    fn test_scope_walk_undefined_member_base() {
        let mut ast = Ast::new();
        let root = node(&mut ast, NodeKind::StatementList);
        member(&mut ast, root, "missing", "x");

        let mut ctx = CompilerContext::default();
        let err = scope_walk(&mut ast, root, &mut ctx, &mut ThisRecorder(Vec::new())).unwrap_err();
        assert_eq!(err.root(), &MathlError::UndefinedSymbol("missing".to_string()));
    }

    /// Records the return type seen inside each function body.
    struct ReturnRecorder(Vec<String>);

    impl ScopeHook for ReturnRecorder {
        fn hook(
            &mut self,
            ast: &mut Ast,
            ctx: &mut CompilerContext,
            node: NodeId,
        ) -> MathlResult<Flow> {
            if ast.kind(node) == NodeKind::Return {
                self.0.push(ctx.return_type()?.type_name());
            }
            Ok(Flow::Descend)
        }
    }

    #[test]
    fn test_scope_walk_function_scope() {
        let mut ast = Ast::new();
        let root = node(&mut ast, NodeKind::StatementList);
        let func = ast.add(
            NodeData::new(NodeKind::Function, SourcePos::default())
                .with_value(NodeValue::Name("f".to_string())),
        );
        ast.push(root, func).unwrap();
        ast.push(func, VarType::named("vec2")).unwrap();
        let params = node(&mut ast, NodeKind::ParamList);
        ast.push(func, params).unwrap();
        decl(&mut ast, params, "arg", "float");
        let body = node(&mut ast, NodeKind::StatementList);
        ast.push(func, body).unwrap();
        let ret = node(&mut ast, NodeKind::Return);
        ast.push(body, ret).unwrap();

        let mut ctx = CompilerContext::default();
        let mut hook = ReturnRecorder(Vec::new());
        scope_walk(&mut ast, root, &mut ctx, &mut hook).unwrap();

        assert_eq!(hook.0, vec!["vec2"]);
        // parameters do not leak out of the function
        assert!(ctx.lookup("arg").is_none());
    }
}
