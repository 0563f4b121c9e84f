//! Emission options.

/// Options shared by all code generators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenOptions {
    /// Spaces per indentation level
    pub indent: usize,
    /// Fractional digits printed for float constants
    pub float_precision: usize,
    /// Prepend the JavaScript math runtime
    pub include_runtime: bool,
}

impl GenOptions {
    pub fn with_indent(mut self, indent: usize) -> Self {
        self.indent = indent;
        self
    }

    pub fn with_float_precision(mut self, float_precision: usize) -> Self {
        self.float_precision = float_precision;
        self
    }

    pub fn with_runtime(mut self, include_runtime: bool) -> Self {
        self.include_runtime = include_runtime;
        self
    }

    /// Indentation for nesting `depth`.
    pub fn pad(&self, depth: usize) -> String {
        " ".repeat(self.indent * depth)
    }
}

impl Default for GenOptions {
    fn default() -> Self {
        Self {
            indent: 2,
            float_precision: 7,
            include_runtime: true,
        }
    }
}
