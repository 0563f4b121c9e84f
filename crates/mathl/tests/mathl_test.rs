//! MathlTest helper for integration tests.
//!
//! Runs the frontend pipeline (preprocess → parse → slot collection →
//! lowering) and renders the lowered tree as s-expressions for comparison.

#![allow(dead_code)]

use mathl::{compile, Ast, CompileOptions, CompilerContext, MathlResult, NodeId, NodeKind};

/// Test helper wrapping a compiled unit.
pub struct MathlTest {
    pub ctx: CompilerContext,
}

impl MathlTest {
    /// Compile `source` with default options.
    pub fn new(source: &str) -> MathlResult<Self> {
        Self::with_options(source, CompileOptions::new("test.mathl"))
    }

    pub fn with_options(source: &str, mut options: CompileOptions) -> MathlResult<Self> {
        let ctx = compile(source, &mut options)?;
        Ok(Self { ctx })
    }

    pub fn ast(&self) -> &Ast {
        &self.ctx.ast
    }

    /// The top-level function named `name`.
    pub fn function(&self, name: &str) -> NodeId {
        let ast = self.ast();
        let root = ast.root().expect("program root");
        ast.children(root)
            .iter()
            .copied()
            .find(|&n| ast.kind(n) == NodeKind::Function && ast.name(n) == Some(name))
            .unwrap_or_else(|| panic!("function '{}' not found", name))
    }

    /// Statements of function `name`, one s-expression each.
    pub fn body(&self, name: &str) -> Vec<String> {
        let ast = self.ast();
        let list = ast.child(self.function(name), 2).expect("function body");
        ast.children(list).iter().map(|&s| sexpr(ast, s)).collect()
    }

    /// Assert the statements of function `name`, ignoring blank lines and
    /// surrounding whitespace in `expected`.
    pub fn assert_body(&self, name: &str, expected: &str) {
        let expected: Vec<&str> = expected
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect();
        let actual = self.body(name);
        assert_eq!(
            actual, expected,
            "body of '{}' does not match\nactual:\n{}",
            name,
            actual.join("\n")
        );
    }

    /// Number of nodes of `kind` in the program.
    pub fn count(&self, kind: NodeKind) -> usize {
        let ast = self.ast();
        let mut n = 0;
        mathl::traverse::visit(ast, ast.root().expect("program root"), kind, &mut |_, _| n += 1);
        n
    }
}

/// Render a subtree: `(head child...)`, where head is the node's value,
/// operator symbol or kind name.
pub fn sexpr(ast: &Ast, id: NodeId) -> String {
    let head = match (ast.value(id), ast.op(id)) {
        (Some(v), _) => v.to_string(),
        (None, Some(op)) => op.symbol().to_string(),
        (None, None) => ast.kind(id).name().to_string(),
    };
    if ast.children(id).is_empty() {
        return head;
    }
    let kids: Vec<String> = ast.children(id).iter().map(|&c| sexpr(ast, c)).collect();
    format!("({} {})", head, kids.join(" "))
}
