//! The `error` subtest - diagnostics

use mathl_codegen::{generate, GenOptions};

use crate::parser::TestCase;

/// Compile the program and generate JavaScript; the rendered error is the output.
pub(crate) fn run(case: &TestCase, filename: &str) -> Result<String, String> {
    let result = mathl::parse(&case.source, filename)
        .and_then(|ctx| generate(&ctx, "js", &GenOptions::default()));
    match result {
        Ok(_) => Err("Expected compilation to fail, but it succeeded".to_string()),
        Err(err) => Ok(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use crate::run_test;

    #[test]
    fn test_undefined_symbol() {
        let content = include_str!("../filetests/error/undefined.mathl");
        run_test(content, "undefined.mathl").unwrap();
    }

    #[test]
    fn test_success_is_a_failure() {
        let content = "test error\n\nvoid main() {\n}\n\n; check: Error\n";
        let err = run_test(content, "ok.mathl").unwrap_err();
        assert!(err.contains("Expected compilation to fail"));
    }
}
