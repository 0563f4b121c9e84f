//! Operator precedence of expression nodes, shared by the text backends.

use mathl::{Ast, NodeId, NodeKind, Operator};

/// Precedence of anything that never needs parentheses.
pub(crate) const PRIMARY: u8 = 11;

pub(crate) fn precedence(ast: &Ast, node: NodeId) -> u8 {
    match ast.kind(node) {
        NodeKind::BinOp => ast.op(node).map(Operator::precedence).unwrap_or(PRIMARY),
        NodeKind::Assign => Operator::Assign.precedence(),
        NodeKind::UnaryOp => Operator::Neg.precedence(),
        _ => PRIMARY,
    }
}

/// Whether `child`, an operand of an operator with precedence `parent`, needs
/// parentheses.
///
/// Left operands are wrapped only when they bind strictly looser. Right
/// operands of a left-associative operator are also wrapped at equal
/// precedence, so `a - (b - c)` keeps its meaning.
pub(crate) fn needs_parens(ast: &Ast, child: NodeId, parent: Operator, right: bool) -> bool {
    let prec = precedence(ast, child);
    let outer = parent.precedence();
    prec < outer || (right && prec == outer && !parent.is_right_assoc())
}
