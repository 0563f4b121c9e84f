//! Filecheck directive matching using the filecheck crate.
//!
//! Directive patterns use filecheck syntax, so a literal `$` in generated
//! JavaScript (`__$func`) is written `$$`.

use filecheck::{Checker, CheckerBuilder, NO_VARIABLES};

/// Directive keywords understood by the filecheck crate.
const DIRECTIVES: [&str; 6] = ["check:", "sameln:", "nextln:", "unordered:", "not:", "regex:"];

/// Build a filechecker from expected text containing directives.
///
/// Lines without a directive are comments and are ignored.
pub fn build_filechecker(expected_text: &str) -> Result<Checker, String> {
    let mut builder = CheckerBuilder::new();
    for line in expected_text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        builder
            .directive(trimmed)
            .map_err(|e| format!("Failed to parse filecheck directive '{}': {}", trimmed, e))?;
    }
    Ok(builder.finish())
}

/// Match actual output against filecheck directives.
pub fn match_filecheck(actual: &str, expected_text: &str) -> Result<(), String> {
    let checker = build_filechecker(expected_text)?;

    if checker
        .check(actual, NO_VARIABLES)
        .map_err(|e| format!("Filecheck error: {}", e))?
    {
        Ok(())
    } else {
        let (_, explain) = checker
            .explain(actual, NO_VARIABLES)
            .map_err(|e| format!("Failed to get filecheck explanation: {}", e))?;
        Err(format!("Filecheck failed:\n{}", explain))
    }
}

/// Whether `expected_text` holds at least one directive.
pub fn has_directives(expected_text: &str) -> bool {
    expected_text
        .lines()
        .map(str::trim)
        .any(|line| DIRECTIVES.iter().any(|d| line.starts_with(d)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_in_order() {
        let actual = "function main() {\n  a = 1;\n  b = 2;\n}\n";
        assert!(match_filecheck(actual, "check: main\nnextln: a = 1;\nnextln: b = 2;").is_ok());
        assert!(match_filecheck(actual, "check: b = 2;\ncheck: a = 1;").is_err());
    }

    #[test]
    fn test_literal_dollar() {
        let actual = "let __$func = function(outs, $point) {";
        assert!(match_filecheck(actual, "check: __$$func = function(outs, $$point)").is_ok());
    }

    #[test]
    fn test_has_directives() {
        assert!(has_directives("a comment\ncheck: x"));
        assert!(!has_directives("just a comment"));
    }
}
