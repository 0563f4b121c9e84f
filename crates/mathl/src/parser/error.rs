//! Parse error types.

use nom::error::{ErrorKind, FromExternalError, ParseError};

use crate::{ast::SourcePos, error::MathlError};

pub(crate) type PResult<'i, T> = nom::IResult<&'i str, T, SyntaxError<'i>>;

/// What went wrong at a failure point.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Problem {
    /// Generic combinator failure; described from the input when reported
    Unexpected,
    Expected(&'static str),
    Message(String),
    /// An identifier in type position that is not a registered type
    UnknownType(String),
}

/// Parse error carrying the remaining input at the failure point.
///
/// When alternatives all fail, the error that got furthest into the input is
/// kept.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SyntaxError<'i> {
    pub input: &'i str,
    pub problem: Problem,
}

impl<'i> SyntaxError<'i> {
    pub fn expected(input: &'i str, what: &'static str) -> Self {
        Self {
            input,
            problem: Problem::Expected(what),
        }
    }

    pub fn message(input: &'i str, message: impl Into<String>) -> Self {
        Self {
            input,
            problem: Problem::Message(message.into()),
        }
    }
}

impl<'i> ParseError<&'i str> for SyntaxError<'i> {
    fn from_error_kind(input: &'i str, _kind: ErrorKind) -> Self {
        Self {
            input,
            problem: Problem::Unexpected,
        }
    }

    fn append(_input: &'i str, _kind: ErrorKind, other: Self) -> Self {
        other
    }

    fn or(self, other: Self) -> Self {
        if other.input.len() < self.input.len() {
            other
        } else {
            self
        }
    }
}

impl<'i, E> FromExternalError<&'i str, E> for SyntaxError<'i> {
    fn from_external_error(input: &'i str, _kind: ErrorKind, _e: E) -> Self {
        Self::message(input, "invalid literal")
    }
}

/// Fail without backtracking.
pub(crate) fn fail<'i, T>(err: SyntaxError<'i>) -> PResult<'i, T> {
    Err(nom::Err::Failure(err))
}

/// Convert a nom error into a crate error positioned in `source`.
///
/// Returns the error together with its position; unknown type names are
/// reported as [`MathlError::UnknownType`], everything else as a syntax error.
pub(crate) fn convert(source: &str, err: nom::Err<SyntaxError<'_>>) -> (MathlError, SourcePos) {
    let err = match err {
        nom::Err::Error(e) | nom::Err::Failure(e) => e,
        nom::Err::Incomplete(_) => SyntaxError::message("", "unexpected end of input"),
    };
    let pos = SourcePos::from_offset(source, source.len() - err.input.len());

    let message = match err.problem {
        Problem::UnknownType(name) => return (MathlError::UnknownType(name), pos),
        Problem::Expected(what) => format!("expected {}, found {}", what, describe(err.input)),
        Problem::Message(message) => message,
        Problem::Unexpected => format!("unexpected {}", describe(err.input)),
    };
    (MathlError::syntax(message, pos), pos)
}

/// Short description of the next token in `input`.
fn describe(input: &str) -> String {
    let word: String = input
        .chars()
        .take_while(|&c| c.is_ascii_alphanumeric() || c == '_' || c == '$' || c == '.')
        .collect();
    match (word.is_empty(), input.chars().next()) {
        (_, None) => "end of input".to_string(),
        (false, _) => format!("'{}'", word),
        (true, Some(c)) => format!("'{}'", c),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_or_keeps_furthest() {
        let src = "float x = ;";
        let near = SyntaxError::expected(&src[0..], "a type");
        let far = SyntaxError::expected(&src[10..], "an expression");
        assert_eq!(near.clone().or(far.clone()), far);
        assert_eq!(far.clone().or(near), far);
    }

    #[test]
    fn test_convert_positions() {
        let src = "float x;\nfloat y = ;";
        let err = SyntaxError::expected(&src[19..], "an expression");
        let (err, pos) = convert(src, nom::Err::Failure(err));
        assert_eq!(pos, SourcePos::new(1, 10, 19));
        assert_eq!(
            err,
            MathlError::syntax("expected an expression, found ';'", pos)
        );
    }

    #[test]
    fn test_convert_unknown_type() {
        let src = "vec5 p;";
        let err = SyntaxError {
            input: src,
            problem: Problem::UnknownType("vec5".to_string()),
        };
        let (err, pos) = convert(src, nom::Err::Error(err));
        assert_eq!(err, MathlError::UnknownType("vec5".to_string()));
        assert_eq!(pos, SourcePos::new(0, 0, 0));
    }

    #[test]
    fn test_describe() {
        assert_eq!(describe(""), "end of input");
        assert_eq!(describe("foo bar"), "'foo'");
        assert_eq!(describe("}"), "'}'");
    }
}
