//! Error types for MathL compilation.
//!
//! Every failure is fatal to the compilation that raised it: there is no
//! recovery and no batching, the first error is returned up the call chain
//! and the host decides whether to exit.

use std::fmt;

use thiserror::Error;

use crate::ast::{NodeId, SourcePos};

/// Result type for MathL compilation operations.
pub type MathlResult<T> = Result<T, MathlError>;

/// Error that can occur during MathL compilation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MathlError {
    /// Malformed source text
    #[error("syntax error at {pos}: {message}")]
    Syntax { message: String, pos: SourcePos },
    /// Type name missing from the type registry
    #[error("Unknown type {0}")]
    UnknownType(String),
    /// Identifier used without a binding
    #[error("{0} is not defined")]
    UndefinedSymbol(String),
    /// Tree edit referenced a node that is not a child of the given parent
    #[error("{child} is not a child of {parent}")]
    NodeNotFound { parent: NodeId, child: NodeId },
    /// Tree edit received an unusable argument
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// Requested backend is not registered
    #[error("unknown code generator '{0}'")]
    UnknownGenerator(String),
    /// Any other semantic error
    #[error("{0}")]
    Semantic(String),
    /// An error located in the source, with a rendered excerpt
    #[error("{0}")]
    Diagnostic(Box<Diagnostic>),
}

impl MathlError {
    /// Create a new syntax error.
    pub fn syntax(msg: impl Into<String>, pos: SourcePos) -> Self {
        MathlError::Syntax {
            message: msg.into(),
            pos,
        }
    }

    /// Create a new semantic error.
    pub fn semantic(msg: impl Into<String>) -> Self {
        MathlError::Semantic(msg.into())
    }

    /// Create a new invalid argument error.
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        MathlError::InvalidArgument(msg.into())
    }

    /// The underlying error, looking through any diagnostic wrapper.
    pub fn root(&self) -> &MathlError {
        match self {
            MathlError::Diagnostic(diag) => diag.error.root(),
            other => other,
        }
    }

    /// Source position carried by this error, if any.
    pub fn pos(&self) -> Option<SourcePos> {
        match self {
            MathlError::Syntax { pos, .. } => Some(*pos),
            MathlError::Diagnostic(diag) => diag.pos,
            _ => None,
        }
    }
}

/// A fatal error tagged with its file and source location.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub filename: String,
    pub pos: Option<SourcePos>,
    pub error: MathlError,
    /// Source window around `pos`, empty when there is no position
    pub excerpt: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.pos {
            Some(pos) => {
                write!(f, "Error: {}:{}: {}", self.filename, pos.line + 1, self.error)?;
                if !self.excerpt.is_empty() {
                    write!(f, "\n\n{}", self.excerpt)?;
                }
                Ok(())
            }
            None => write!(f, "Error: {}", self.error),
        }
    }
}

/// Render `count` lines of `source` centered on `line` (0-based).
///
/// The offending line is followed by a caret row marking columns
/// `col - 2 ..= col + 2`.
pub fn format_lines(source: &str, line: usize, col: usize, count: usize) -> String {
    let lines: Vec<&str> = source.split('\n').collect();
    let width = lines.len().to_string().len();

    let start = line.saturating_sub(count / 2);
    let end = (line + count / 2 + 1).min(lines.len());

    let mut out = String::new();
    for (i, text) in lines.iter().enumerate().take(end).skip(start) {
        out.push_str(&format!("  {:>width$}: {}\n", i + 1, text, width = width));

        if i == line {
            let len = text.chars().count();
            let lo = col.saturating_sub(2);
            let hi = (col + 2).min(len.saturating_sub(1));
            if lo <= hi && lo < len {
                out.push_str(&" ".repeat(width + 4 + lo));
                out.push_str(&"^".repeat(hi - lo + 1));
                out.push('\n');
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_lines_window() {
        let src = "a\nb\nc\nd\ne\nf\ng";
        let out = format_lines(src, 3, 0, 5);
        let numbered: Vec<&str> = out.lines().filter(|l| l.contains(':')).collect();
        assert_eq!(numbered, vec!["  2: b", "  3: c", "  4: d", "  5: e", "  6: f"]);
    }

    #[test]
    fn test_format_lines_marks_columns() {
        let src = "float x = y;";
        let out = format_lines(src, 0, 10, 5);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "  1: float x = y;");
        // columns 8..=11 are underlined
        assert_eq!(lines[1], format!("{}^^^^", " ".repeat(5 + 8)));
    }

    #[test]
    fn test_format_lines_clamps_at_start() {
        let out = format_lines("one\ntwo", 0, 0, 5);
        assert!(out.starts_with("  1: one\n"));
        assert!(out.contains("  2: two"));
    }

    #[test]
    fn test_root_unwraps_diagnostic() {
        let err = MathlError::Diagnostic(Box::new(Diagnostic {
            filename: "test.mathl".to_string(),
            pos: Some(SourcePos::new(1, 2, 10)),
            error: MathlError::UndefinedSymbol("foo".to_string()),
            excerpt: String::new(),
        }));
        assert_eq!(err.root(), &MathlError::UndefinedSymbol("foo".to_string()));
        assert_eq!(err.pos(), Some(SourcePos::new(1, 2, 10)));
        assert_eq!(format!("{}", err), "Error: test.mathl:2: foo is not defined");
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            format!("{}", MathlError::UnknownType("vec5".to_string())),
            "Unknown type vec5"
        );
        assert_eq!(
            format!("{}", MathlError::UnknownGenerator("glsl".to_string())),
            "unknown code generator 'glsl'"
        );
    }
}
