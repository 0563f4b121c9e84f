//! Source preprocessor.
//!
//! Strips comments and expands object-like `#define` macros. Line structure is
//! preserved (comments keep their newlines, directive lines become empty) so
//! positions in the output map onto the same lines of the input.

use indexmap::IndexMap;
use nom::{
    branch::alt,
    bytes::complete::{tag, take_till, take_till1, take_until, take_while, take_while1},
    character::complete::{char, space0, space1},
    combinator::{map, recognize},
    sequence::{pair, preceded, terminated},
};
use tracing::debug;

use crate::{
    error::MathlResult,
    parser::{convert, fail, is_ident_char, word, PResult, SyntaxError},
};

/// Preprocess `source` into parser input.
pub fn preprocess(source: &str) -> MathlResult<String> {
    let stripped = strip_comments(source)?;

    let mut defines: IndexMap<String, String> = IndexMap::new();
    let mut out = String::with_capacity(stripped.len());
    let mut input = stripped.as_str();

    loop {
        let (rest, line) = rest_of_line(input).map_err(|e| convert(&stripped, e).0)?;
        match define(input) {
            Ok((_, (name, value))) => {
                let value = expand(value, &defines);
                defines.insert(name.to_string(), value);
            }
            Err(nom::Err::Error(_)) => out.push_str(&expand(line, &defines)),
            Err(err) => return Err(convert(&stripped, err).0),
        }
        match rest.strip_prefix('\n') {
            Some(next) => {
                out.push('\n');
                input = next;
            }
            None => break,
        }
    }

    debug!(defines = defines.len(), "preprocessed source");
    Ok(out)
}

fn rest_of_line(input: &str) -> PResult<'_, &str> {
    take_till(|c: char| c == '\n')(input)
}

fn directive_start(input: &str) -> PResult<'_, char> {
    preceded(space0, terminated(char('#'), space0))(input)
}

fn directive_name(input: &str) -> PResult<'_, &str> {
    take_while(is_ident_char)(input)
}

fn macro_name(input: &str) -> PResult<'_, &str> {
    preceded(space1, word)(input)
}

/// `#define NAME value`. Lines that do not start with `#` fail softly.
fn define(input: &str) -> PResult<'_, (&str, &str)> {
    let (input, _) = directive_start(input)?;
    let (rest, directive) = directive_name(input)?;
    if directive != "define" {
        return fail(SyntaxError::message(
            input,
            format!("unsupported directive #{}", directive),
        ));
    }

    let (rest, name) = match macro_name(rest) {
        Ok(res) => res,
        Err(_) => return fail(SyntaxError::message(rest, "expected a macro name after #define")),
    };
    if rest.starts_with('(') {
        return fail(SyntaxError::message(
            rest,
            format!("function-like macro {} is not supported", name),
        ));
    }

    let (rest, value) = rest_of_line(rest)?;
    Ok((rest, (name, value.trim())))
}

enum Token<'a> {
    Word(&'a str),
    Text(&'a str),
}

fn token(input: &str) -> PResult<'_, Token<'_>> {
    alt((
        map(word, Token::Word),
        // numbers like `1e5` are not identifiers
        map(take_while1(is_ident_char), Token::Text),
        map(take_till1(is_ident_char), Token::Text),
    ))(input)
}

/// Replace whole-identifier occurrences of defined names.
fn expand(line: &str, defines: &IndexMap<String, String>) -> String {
    if defines.is_empty() {
        return line.to_string();
    }

    let mut out = String::with_capacity(line.len());
    let mut input = line;
    while let Ok((rest, tok)) = token(input) {
        match tok {
            Token::Word(w) => out.push_str(defines.get(w).map_or(w, String::as_str)),
            Token::Text(text) => out.push_str(text),
        }
        input = rest;
    }
    out
}

enum Piece<'a> {
    Code(&'a str),
    LineComment,
    /// Comment body; only its line breaks are kept
    BlockComment(&'a str),
}

fn line_comment(input: &str) -> PResult<'_, &str> {
    recognize(pair(tag("//"), rest_of_line))(input)
}

fn block_comment(input: &str) -> PResult<'_, &str> {
    let closed: PResult<'_, &str> =
        preceded(tag("/*"), terminated(take_until("*/"), tag("*/")))(input);
    match closed {
        Err(nom::Err::Error(_)) if input.starts_with("/*") => {
            fail(SyntaxError::message(input, "unterminated block comment"))
        }
        other => other,
    }
}

fn piece(input: &str) -> PResult<'_, Piece<'_>> {
    alt((
        map(line_comment, |_| Piece::LineComment),
        map(block_comment, Piece::BlockComment),
        map(take_till1(|c: char| c == '/'), Piece::Code),
        map(recognize(char('/')), Piece::Code),
    ))(input)
}

/// Remove `//` and `/* */` comments, keeping newlines.
fn strip_comments(source: &str) -> MathlResult<String> {
    let mut out = String::with_capacity(source.len());
    let mut input = source;

    while !input.is_empty() {
        let (rest, next) = piece(input).map_err(|e| convert(source, e).0)?;
        match next {
            Piece::Code(text) => out.push_str(text),
            Piece::LineComment => {}
            Piece::BlockComment(body) => {
                for _ in body.matches('\n') {
                    out.push('\n');
                }
                out.push(' ');
            }
        }
        input = rest;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ast::SourcePos, error::MathlError};

    #[test]
    fn test_strip_line_comments() {
        let out = preprocess("float a; // trailing\nfloat b;").unwrap();
        assert_eq!(out, "float a; \nfloat b;");
    }

    #[test]
    fn test_division_is_not_a_comment() {
        let out = preprocess("a = b / c; // half\nd = e/f;/**/g").unwrap();
        assert_eq!(out, "a = b / c; \nd = e/f; g");
    }

    #[test]
    fn test_block_comments_keep_lines() {
        let out = preprocess("a /* one\ntwo\nthree */ b\nc").unwrap();
        assert_eq!(out.lines().count(), 4);
        assert_eq!(out.lines().nth(2), Some("  b"));
        assert_eq!(out.lines().nth(3), Some("c"));
    }

    #[test]
    fn test_unterminated_block_comment() {
        let err = preprocess("a;\n  /* never closed").unwrap_err();
        assert!(matches!(err, MathlError::Syntax { .. }));
        assert_eq!(err.pos(), Some(SourcePos::new(1, 2, 5)));
    }

    #[test]
    fn test_define_expansion() {
        let src = "#define SCALE 2.5\n#define TWICE (SCALE * 2.0)\nfloat x = TWICE + SCALED;";
        let out = preprocess(src).unwrap();
        assert_eq!(out, "\n\nfloat x = (2.5 * 2.0) + SCALED;");
    }

    #[test]
    fn test_redefinition_replaces() {
        let out = preprocess("#define N 1\nN;\n#define N 2\nN;").unwrap();
        assert_eq!(out, "\n1;\n\n2;");
    }

    #[test]
    fn test_define_does_not_touch_numbers() {
        let out = preprocess("#define e 3\nfloat x = 1e5 + e;").unwrap();
        assert_eq!(out, "\nfloat x = 1e5 + 3;");
    }

    #[test]
    fn test_bad_directives() {
        assert!(matches!(
            preprocess("#include \"lib.mathl\""),
            Err(MathlError::Syntax { .. })
        ));
        assert!(matches!(
            preprocess("#define SQ(x) x*x"),
            Err(MathlError::Syntax { .. })
        ));
        assert!(matches!(preprocess("#define"), Err(MathlError::Syntax { .. })));

        let err = preprocess("float a;\n  #pragma once").unwrap_err();
        assert_eq!(err.pos(), Some(SourcePos::new(1, 3, 12)));
        assert!(err.to_string().contains("unsupported directive #pragma"));
    }
}
