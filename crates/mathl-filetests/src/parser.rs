//! Test file parsing

use crate::filecheck::has_directives;

/// What a test file exercises.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestCommand {
    /// Compile, then print the lowered tree with the `internal` generator
    Lower,
    /// Compile, then generate JavaScript without the runtime prelude
    Js,
    /// Compile and generate JavaScript, expecting a diagnostic
    Error,
}

impl TestCommand {
    fn from_header(line: &str) -> Option<Self> {
        match line.strip_prefix("test ")?.trim() {
            "lower" => Some(TestCommand::Lower),
            "js" => Some(TestCommand::Js),
            "error" => Some(TestCommand::Error),
            _ => None,
        }
    }
}

/// A test case extracted from a test file
#[derive(Debug, Clone)]
pub struct TestCase {
    pub command: TestCommand,
    /// The program, with header and directive lines blanked so line
    /// numbers match the file
    pub source: String,
    /// The filecheck directives, `;` prefix stripped
    pub expected_text: String,
}

/// Parse a test file: a `test <command>` header, a program, then trailing
/// `;`-prefixed filecheck directives.
pub fn parse_test_file(content: &str) -> Result<TestCase, String> {
    let lines: Vec<&str> = content.lines().collect();

    let header = lines
        .iter()
        .position(|l| !l.trim().is_empty())
        .ok_or_else(|| "empty test file".to_string())?;
    let command = TestCommand::from_header(lines[header].trim())
        .ok_or_else(|| format!("unknown test command '{}'", lines[header].trim()))?;

    // The directive block is the trailing run of `;` and blank lines.
    let mut expected_start = lines.len();
    while expected_start > header + 1 {
        let line = lines[expected_start - 1].trim();
        if line.is_empty() || line.starts_with(';') {
            expected_start -= 1;
        } else {
            break;
        }
    }

    let expected_text = lines[expected_start..]
        .iter()
        .map(|l| {
            let trimmed = l.trim();
            if let Some(rest) = trimmed.strip_prefix("; ") {
                rest
            } else if let Some(rest) = trimmed.strip_prefix(';') {
                rest
            } else {
                trimmed
            }
        })
        .collect::<Vec<_>>()
        .join("\n");
    if !has_directives(&expected_text) {
        return Err("no filecheck directives found".to_string());
    }

    let source = lines
        .iter()
        .enumerate()
        .map(|(i, l)| if i <= header || i >= expected_start { "" } else { *l })
        .collect::<Vec<_>>()
        .join("\n");

    Ok(TestCase {
        command,
        source,
        expected_text,
    })
}
