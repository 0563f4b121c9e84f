//! The `lower` subtest - lowered tree printed back as MathL

use mathl_codegen::{generate, GenOptions};

use crate::parser::TestCase;

/// Compile the program and print it with the `internal` generator.
pub(crate) fn run(case: &TestCase, filename: &str) -> Result<String, String> {
    let ctx = mathl::parse(&case.source, filename).map_err(|e| format!("Compilation failed: {}", e))?;
    let code = generate(&ctx, "internal", &GenOptions::default())
        .map_err(|e| format!("Code generation failed: {}", e))?;
    Ok(code.text)
}

#[cfg(test)]
mod tests {
    use crate::run_test;

    #[test]
    fn test_swizzle_read() {
        let content = include_str!("../filetests/lower/swizzle_read.mathl");
        run_test(content, "swizzle_read.mathl").unwrap();
    }

    #[test]
    fn test_swizzle_write() {
        let content = include_str!("../filetests/lower/swizzle_write.mathl");
        run_test(content, "swizzle_write.mathl").unwrap();
    }
}
