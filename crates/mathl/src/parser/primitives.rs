//! Primitive parsers for identifiers, keywords, symbols and literals.
//!
//! Token parsers consume trailing whitespace.

use nom::{
    branch::alt,
    bytes::complete::{tag, take_while},
    character::complete::{char, digit0, digit1, one_of, satisfy},
    combinator::{map, map_res, not, opt, peek, recognize, verify},
    sequence::{pair, terminated, tuple},
};

use super::{
    error::{fail, PResult, SyntaxError},
    whitespace::blank,
};

/// Reserved words that can never be identifiers.
pub(crate) const KEYWORDS: &[&str] = &[
    "if", "else", "return", "true", "false", "in", "out", "uniform",
];

/// A numeric literal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Number {
    Int(i64),
    Float(f64),
}

pub(crate) fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$'
}

/// Identifier or keyword text, without trailing whitespace.
pub(crate) fn word(input: &str) -> PResult<'_, &str> {
    recognize(pair(
        satisfy(|c| c.is_ascii_alphabetic() || c == '_' || c == '$'),
        take_while(is_ident_char),
    ))(input)
}

/// Parse an identifier that is not a keyword.
pub(crate) fn identifier(input: &str) -> PResult<'_, &str> {
    terminated(verify(word, |w: &str| !KEYWORDS.contains(&w)), blank)(input)
}

/// Parse a keyword, not followed by further identifier characters.
pub(crate) fn keyword<'i>(kw: &'static str) -> impl FnMut(&'i str) -> PResult<'i, &'i str> {
    terminated(
        terminated(tag(kw), not(satisfy(is_ident_char))),
        blank,
    )
}

/// Parse a punctuation symbol.
pub(crate) fn symbol<'i>(sym: &'static str) -> impl FnMut(&'i str) -> PResult<'i, &'i str> {
    terminated(tag(sym), blank)
}

/// Parse a required symbol, failing with an "expected" message.
pub(crate) fn expect<'i>(sym: &'static str) -> impl FnMut(&'i str) -> PResult<'i, &'i str> {
    move |input: &'i str| match symbol(sym)(input) {
        Ok(res) => Ok(res),
        Err(_) => Err(nom::Err::Failure(SyntaxError::expected(input, sym))),
    }
}

fn exponent(input: &str) -> PResult<'_, &str> {
    recognize(tuple((one_of("eE"), opt(one_of("+-")), digit1)))(input)
}

/// Float literal text: `1.5`, `1.`, `.5`, `2e3`, `1.5e-2`, with an optional `f` suffix.
fn float_text(input: &str) -> PResult<'_, &str> {
    terminated(
        alt((
            recognize(tuple((digit1, char('.'), digit0, opt(exponent)))),
            recognize(tuple((char('.'), digit1, opt(exponent)))),
            recognize(pair(digit1, exponent)),
        )),
        opt(char('f')),
    )(input)
}

/// Float literal value. Literals that overflow to infinity are rejected.
fn float_literal(input: &str) -> PResult<'_, Number> {
    let (rest, text) = float_text(input)?;
    match text.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok((rest, Number::Float(value))),
        _ => fail(SyntaxError::message(input, "numeric literal out of range")),
    }
}

/// Parse a numeric literal.
pub(crate) fn number(input: &str) -> PResult<'_, Number> {
    terminated(
        alt((
            float_literal,
            map_res(terminated(digit1, peek(not(satisfy(is_ident_char)))), |s: &str| {
                s.parse::<i64>().map(Number::Int)
            }),
        )),
        blank,
    )(input)
}

/// Parse a boolean literal.
pub(crate) fn boolean(input: &str) -> PResult<'_, bool> {
    alt((
        map(keyword("true"), |_| true),
        map(keyword("false"), |_| false),
    ))(input)
}
