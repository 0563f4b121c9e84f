//! File-based tests for the MathL compiler.
//!
//! Similar to Cranelift's filetests, these tests read `.mathl` files that contain:
//! - A test command header (`test lower`, `test js` or `test error`)
//! - A MathL program
//! - Trailing `;` comments holding filecheck directives for the output
//!
//! Header and directive lines are blanked before compiling, so line numbers
//! in diagnostics are line numbers in the file.

pub mod filecheck;
pub mod parser;

mod test_error;
mod test_js;
mod test_lower;

use std::path::Path;

pub use filecheck::{build_filechecker, has_directives, match_filecheck};
pub use parser::{parse_test_file, TestCase, TestCommand};

/// Run the test held in `content`. `filename` names the program in diagnostics.
pub fn run_test(content: &str, filename: &str) -> Result<(), String> {
    let case = parse_test_file(content)?;
    let actual = match case.command {
        TestCommand::Lower => test_lower::run(&case, filename)?,
        TestCommand::Js => test_js::run(&case, filename)?,
        TestCommand::Error => test_error::run(&case, filename)?,
    };
    match_filecheck(&actual, &case.expected_text)
        .map_err(|e| format!("{}\n\nActual output:\n{}", e, actual))
}

/// Run every `.mathl` file below `dir`, returning `(path, message)` per failure.
pub fn run_directory(dir: &Path) -> Result<Vec<(String, String)>, String> {
    let mut failures = Vec::new();
    for path in collect_files(dir)? {
        let content = std::fs::read_to_string(&path)
            .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if let Err(msg) = run_test(&content, &filename) {
            failures.push((path.display().to_string(), msg));
        }
    }
    Ok(failures)
}

fn collect_files(dir: &Path) -> Result<Vec<std::path::PathBuf>, String> {
    let entries =
        std::fs::read_dir(dir).map_err(|e| format!("Failed to read {}: {}", dir.display(), e))?;
    let mut files = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| e.to_string())?.path();
        if path.is_dir() {
            files.extend(collect_files(&path)?);
        } else if path.extension().and_then(|e| e.to_str()) == Some("mathl") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}
