//! Operators carried by `BinOp`, `UnaryOp` and `Assign` nodes.

use std::fmt;

/// An operator symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Assign,
    Or,
    And,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    /// Member access (`.`)
    Member,
    Neg,
    Not,
}

impl Operator {
    pub fn symbol(self) -> &'static str {
        match self {
            Operator::Assign => "=",
            Operator::Or => "||",
            Operator::And => "&&",
            Operator::Eq => "==",
            Operator::Ne => "!=",
            Operator::Lt => "<",
            Operator::Gt => ">",
            Operator::Le => "<=",
            Operator::Ge => ">=",
            Operator::Add => "+",
            Operator::Sub => "-",
            Operator::Mul => "*",
            Operator::Div => "/",
            Operator::Mod => "%",
            Operator::Member => ".",
            Operator::Neg => "-",
            Operator::Not => "!",
        }
    }

    /// Binding strength; a larger number binds tighter.
    pub fn precedence(self) -> u8 {
        match self {
            Operator::Assign => 1,
            Operator::Or => 3,
            Operator::And => 4,
            Operator::Eq | Operator::Ne => 5,
            Operator::Lt | Operator::Gt | Operator::Le | Operator::Ge => 6,
            Operator::Add | Operator::Sub => 7,
            Operator::Mul | Operator::Div | Operator::Mod => 8,
            Operator::Neg | Operator::Not => 9,
            Operator::Member => 10,
        }
    }

    pub fn is_right_assoc(self) -> bool {
        matches!(self, Operator::Assign | Operator::Neg | Operator::Not)
    }

    /// Look up a binary operator by its source symbol.
    pub fn from_binary_symbol(symbol: &str) -> Option<Self> {
        let op = match symbol {
            "=" => Operator::Assign,
            "||" => Operator::Or,
            "&&" => Operator::And,
            "==" => Operator::Eq,
            "!=" => Operator::Ne,
            "<" => Operator::Lt,
            ">" => Operator::Gt,
            "<=" => Operator::Le,
            ">=" => Operator::Ge,
            "+" => Operator::Add,
            "-" => Operator::Sub,
            "*" => Operator::Mul,
            "/" => Operator::Div,
            "%" => Operator::Mod,
            "." => Operator::Member,
            _ => return None,
        };
        Some(op)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}
