//! Whitespace parsing utilities.

use nom::{
    character::complete::multispace1,
    combinator::{map, recognize},
    multi::many0,
};

use super::error::PResult;

/// Parse whitespace (spaces, tabs, newlines) - returns the matched string
pub(crate) fn blank_space(input: &str) -> PResult<'_, &str> {
    recognize(many0(multispace1))(input)
}

/// Parse whitespace and discard result - returns ()
/// Token parsers consume trailing whitespace with this.
pub(crate) fn blank(input: &str) -> PResult<'_, ()> {
    map(blank_space, |_| ())(input)
}
