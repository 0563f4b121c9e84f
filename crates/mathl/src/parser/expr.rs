//! Expression parsers.
//!
//! Binary operators are parsed by precedence climbing over [`LEVELS`], lowest
//! binding first. Compound assignments are desugared here: `a += b` becomes
//! `Assign(a, BinOp(+, a, b))`.

use nom::{combinator::cut, error::ParseError, multi::separated_list0};

use super::{
    error::{fail, PResult, Problem, SyntaxError},
    primitives::{boolean, expect, identifier, number, symbol, Number},
    Parser, Raw,
};
use crate::ast::{NodeKind, NodeValue, Operator};

/// Binary operator levels, loosest first.
const LEVELS: &[&[(&str, Operator)]] = &[
    &[("||", Operator::Or)],
    &[("&&", Operator::And)],
    &[("==", Operator::Eq), ("!=", Operator::Ne)],
    &[
        ("<=", Operator::Le),
        (">=", Operator::Ge),
        ("<", Operator::Lt),
        (">", Operator::Gt),
    ],
    &[("+", Operator::Add), ("-", Operator::Sub)],
    &[("*", Operator::Mul), ("/", Operator::Div), ("%", Operator::Mod)],
];

/// Assignment operators; `None` is plain `=`.
const ASSIGN_OPS: &[(&str, Option<Operator>)] = &[
    ("+=", Some(Operator::Add)),
    ("-=", Some(Operator::Sub)),
    ("*=", Some(Operator::Mul)),
    ("/=", Some(Operator::Div)),
    ("=", None),
];

/// Whether `input` starts with operator `sym` and not a longer operator.
fn starts_with_op(input: &str, sym: &str) -> bool {
    input.starts_with(sym) && !(sym.len() == 1 && input[1..].starts_with('='))
}

impl Parser<'_> {
    /// Parse a full expression.
    pub(crate) fn expression<'i>(&self, input: &'i str) -> PResult<'i, Raw> {
        self.assignment(input)
    }

    /// Parse an expression that must be present, failing hard otherwise.
    pub(crate) fn required_expression<'i>(&self, input: &'i str) -> PResult<'i, Raw> {
        match self.expression(input) {
            Err(nom::Err::Error(e)) => {
                let e = SyntaxError::expected(input, "an expression").or(e);
                fail(e)
            }
            other => other,
        }
    }

    fn assignment<'i>(&self, input: &'i str) -> PResult<'i, Raw> {
        let (input, target) = self.ternary(input)?;

        for &(sym, op) in ASSIGN_OPS {
            if !starts_with_op(input, sym) {
                continue;
            }
            let start = self.offset(input);
            let (input, _) = symbol(sym)(input)?;
            let (input, rhs) = self.required_assignment(input)?;

            let value = match op {
                Some(op) => Raw::new(NodeKind::BinOp, start)
                    .with_op(op)
                    .with_child(target.clone())
                    .with_child(rhs),
                None => rhs,
            };
            let assign = Raw::new(NodeKind::Assign, target.offset)
                .with_op(Operator::Assign)
                .with_child(target)
                .with_child(value);
            return Ok((input, assign));
        }
        Ok((input, target))
    }

    fn required_assignment<'i>(&self, input: &'i str) -> PResult<'i, Raw> {
        match self.assignment(input) {
            Err(nom::Err::Error(e)) => fail(SyntaxError::expected(input, "an expression").or(e)),
            other => other,
        }
    }

    fn ternary<'i>(&self, input: &'i str) -> PResult<'i, Raw> {
        let (input, cond) = self.binary(input, 0)?;
        let Ok((input, _)) = symbol("?")(input) else {
            return Ok((input, cond));
        };

        let (input, then) = self.required_expression(input)?;
        let (input, _) = expect(":")(input)?;
        let (input, otherwise) = match self.ternary(input) {
            Err(nom::Err::Error(e)) => {
                return fail(SyntaxError::expected(input, "an expression").or(e))
            }
            other => other?,
        };

        let node = Raw::new(NodeKind::Trinary, cond.offset)
            .with_child(cond)
            .with_child(then)
            .with_child(otherwise);
        Ok((input, node))
    }

    fn binary<'i>(&self, input: &'i str, level: usize) -> PResult<'i, Raw> {
        let Some(ops) = LEVELS.get(level) else {
            return self.unary(input);
        };

        let (mut input, mut lhs) = self.binary(input, level + 1)?;
        while let Some(&(sym, op)) = ops.iter().find(|(sym, _)| starts_with_op(input, sym)) {
            let (rest, _) = symbol(sym)(input)?;
            let (rest, rhs) = match self.binary(rest, level + 1) {
                Err(nom::Err::Error(e)) => {
                    return fail(SyntaxError::expected(rest, "an operand").or(e))
                }
                other => other?,
            };
            lhs = Raw::new(NodeKind::BinOp, lhs.offset)
                .with_op(op)
                .with_child(lhs)
                .with_child(rhs);
            input = rest;
        }
        Ok((input, lhs))
    }

    fn unary<'i>(&self, input: &'i str) -> PResult<'i, Raw> {
        let start = self.offset(input);
        let op = if starts_with_op(input, "-") {
            Some(Operator::Neg)
        } else if starts_with_op(input, "!") {
            Some(Operator::Not)
        } else {
            None
        };

        match op {
            Some(op) => {
                let (input, _) = symbol(op.symbol())(input)?;
                let (input, operand) = cut(|i| self.unary(i))(input)?;
                Ok((
                    input,
                    Raw::new(NodeKind::UnaryOp, start)
                        .with_op(op)
                        .with_child(operand),
                ))
            }
            None => self.postfix(input),
        }
    }

    fn postfix<'i>(&self, input: &'i str) -> PResult<'i, Raw> {
        let (mut input, mut base) = self.primary(input)?;

        loop {
            if let Ok((rest, _)) = symbol("[")(input) {
                let (rest, index) = self.required_expression(rest)?;
                let (rest, _) = expect("]")(rest)?;
                base = Raw::new(NodeKind::ArrayLookup, base.offset)
                    .with_child(base)
                    .with_child(index);
                input = rest;
            } else if let Ok((rest, _)) = symbol(".")(input) {
                let member_start = self.offset(rest);
                let (rest, member) = match identifier(rest) {
                    Ok(res) => res,
                    Err(_) => return fail(SyntaxError::expected(rest, "a member name")),
                };
                base = Raw::new(NodeKind::BasicMemberLookup, base.offset)
                    .with_child(base)
                    .with_child(Raw::ident(member, member_start));
                input = rest;
            } else if base.kind == NodeKind::Ident && input.starts_with('(') {
                let (rest, args) = self.arguments(input)?;
                base = Raw::new(NodeKind::Call, base.offset)
                    .with_child(base)
                    .with_child(args);
                input = rest;
            } else {
                return Ok((input, base));
            }
        }
    }

    /// Parse `(a, b, ...)` into an `ExprList`.
    pub(crate) fn arguments<'i>(&self, input: &'i str) -> PResult<'i, Raw> {
        let start = self.offset(input);
        let (input, _) = symbol("(")(input)?;
        let (input, args) = separated_list0(symbol(","), |i| self.expression(i))(input)?;
        let (input, _) = expect(")")(input)?;
        Ok((input, Raw::new(NodeKind::ExprList, start).with_children(args)))
    }

    fn primary<'i>(&self, input: &'i str) -> PResult<'i, Raw> {
        let start = self.offset(input);

        if let Ok((rest, _)) = symbol("(")(input) {
            let (rest, inner) = self.required_expression(rest)?;
            let (rest, _) = expect(")")(rest)?;
            return Ok((rest, inner));
        }

        match number(input) {
            Ok((rest, n)) => {
                let node = match n {
                    Number::Int(v) => {
                        Raw::new(NodeKind::IntConstant, start).with_value(NodeValue::Int(v))
                    }
                    Number::Float(v) => {
                        Raw::new(NodeKind::FloatConstant, start).with_value(NodeValue::Float(v))
                    }
                };
                return Ok((rest, node));
            }
            Err(nom::Err::Failure(e)) => return fail(e),
            Err(_) => {}
        }

        if let Ok((rest, b)) = boolean(input) {
            return Ok((
                rest,
                Raw::new(NodeKind::BoolConstant, start).with_value(NodeValue::Bool(b)),
            ));
        }

        let (rest, name) = identifier(input)?;
        match self.ctx.get_type(name) {
            Some(ty) => {
                // type constructor
                if !rest.starts_with('(') {
                    return fail(SyntaxError::expected(rest, "'(' after a type name"));
                }
                let (rest, args) = self.arguments(rest)?;
                let callee =
                    Raw::new(NodeKind::VarType, start).with_value(NodeValue::Type(ty.clone()));
                Ok((
                    rest,
                    Raw::new(NodeKind::Call, start)
                        .with_child(callee)
                        .with_child(args),
                ))
            }
            None => Ok((rest, Raw::ident(name, start))),
        }
    }

    /// Fail with [`Problem::UnknownType`] if `input` reads `name name`, an
    /// unregistered type in declaration position.
    pub(crate) fn reject_unknown_type<'i>(&self, input: &'i str) -> PResult<'i, ()> {
        let Ok((rest, name)) = identifier(input) else {
            return Ok((input, ()));
        };
        if !self.ctx.has_type(name) && identifier(rest).is_ok() {
            return fail(SyntaxError {
                input,
                problem: Problem::UnknownType(name.to_string()),
            });
        }
        Ok((input, ()))
    }
}
