//! The `js` subtest - JavaScript generation

use mathl_codegen::{generate, GenOptions};

use crate::parser::TestCase;

/// Compile the program and generate JavaScript without the runtime prelude.
pub(crate) fn run(case: &TestCase, filename: &str) -> Result<String, String> {
    let ctx = mathl::parse(&case.source, filename).map_err(|e| format!("Compilation failed: {}", e))?;
    let options = GenOptions::default().with_runtime(false);
    let code = generate(&ctx, "js", &options).map_err(|e| format!("Code generation failed: {}", e))?;
    Ok(code.text)
}

#[cfg(test)]
mod tests {
    use crate::run_test;

    #[test]
    fn test_outputs() {
        let content = include_str!("../filetests/js/outputs.mathl");
        run_test(content, "outputs.mathl").unwrap();
    }

    #[test]
    fn test_shadowing() {
        let content = include_str!("../filetests/js/shadowing.mathl");
        run_test(content, "shadowing.mathl").unwrap();
    }
}
