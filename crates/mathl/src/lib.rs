//! MathL frontend.
//!
//! This crate parses MathL source, a small typed vector language with
//! input/output/uniform declarations and swizzles, into an arena AST, collects
//! the I/O declarations, and lowers high-level constructs so a backend (see
//! `mathl-codegen`) can emit target code from the result.

pub mod ast;
mod compile;
pub mod context;
mod error;
pub mod lower;
pub mod parser;
mod preprocess;
mod slots;
pub mod traverse;
pub mod types;

pub use ast::{Ast, NodeData, NodeId, NodeKind, NodeValue, Operator, SourcePos, StorageQualifier};
pub use compile::{compile, parse, CompileOptions};
pub use context::{CompilerContext, IoDecl, NestedContext, TypeRef};
pub use error::{format_lines, Diagnostic, MathlError, MathlResult};
pub use lower::LoweringPass;
pub use preprocess::preprocess;
pub use slots::find_slots;
pub use types::{VarType, ZeroValue};
