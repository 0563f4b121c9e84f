//! Parser for MathL source text.
//!
//! The nom parsers build a [`Raw`] tree carrying byte offsets, which is then
//! grafted into the [`Ast`] arena with line/column positions. Type names are
//! resolved against the [`CompilerContext`] while parsing, so `vec3(...)`
//! parses as a constructor call and `vec5 p;` is reported as an unknown type.

mod error;
mod expr;
mod primitives;
mod stmt;
mod whitespace;

pub(crate) use self::{
    error::{fail, SyntaxError},
    primitives::{is_ident_char, word},
};

use tracing::trace;

pub(crate) use self::error::{convert, PResult};
use self::whitespace::blank;
use crate::{
    ast::{Ast, NodeData, NodeId, NodeKind, NodeValue, Operator, SourcePos, StorageQualifier},
    context::CompilerContext,
    error::{MathlError, MathlResult},
    types::VarType,
};

/// Parser state shared by all productions.
pub(crate) struct Parser<'c> {
    ctx: &'c CompilerContext,
    full_len: usize,
}

impl<'c> Parser<'c> {
    pub(crate) fn new(ctx: &'c CompilerContext, source: &str) -> Self {
        Self {
            ctx,
            full_len: source.len(),
        }
    }

    /// Byte offset of `input` within the source this parser was created for.
    pub(crate) fn offset(&self, input: &str) -> usize {
        self.full_len - input.len()
    }
}

/// A parsed node before it is placed in the arena.
#[derive(Debug, Clone)]
pub(crate) struct Raw {
    pub kind: NodeKind,
    pub value: Option<NodeValue>,
    pub op: Option<Operator>,
    pub qualifier: Option<StorageQualifier>,
    pub offset: usize,
    pub children: Vec<Raw>,
}

impl Raw {
    pub(crate) fn new(kind: NodeKind, offset: usize) -> Self {
        Self {
            kind,
            value: None,
            op: None,
            qualifier: None,
            offset,
            children: Vec::new(),
        }
    }

    pub(crate) fn ident(name: &str, offset: usize) -> Self {
        Self::new(NodeKind::Ident, offset).with_value(NodeValue::Name(name.to_string()))
    }

    pub(crate) fn var_type(ty: VarType, offset: usize) -> Self {
        Self::new(NodeKind::VarType, offset).with_value(NodeValue::Type(ty))
    }

    pub(crate) fn with_value(mut self, value: NodeValue) -> Self {
        self.value = Some(value);
        self
    }

    pub(crate) fn with_op(mut self, op: Operator) -> Self {
        self.op = Some(op);
        self
    }

    pub(crate) fn with_child(mut self, child: Raw) -> Self {
        self.children.push(child);
        self
    }

    pub(crate) fn with_children(mut self, children: impl IntoIterator<Item = Raw>) -> Self {
        self.children.extend(children);
        self
    }
}

/// Maps byte offsets to line/column positions.
struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    fn new(source: &str) -> Self {
        let mut starts = vec![0];
        starts.extend(source.match_indices('\n').map(|(i, _)| i + 1));
        Self { starts }
    }

    fn pos(&self, offset: usize) -> SourcePos {
        let line = match self.starts.binary_search(&offset) {
            Ok(line) => line,
            Err(next) => next - 1,
        };
        SourcePos::new(line, offset - self.starts[line], offset)
    }
}

fn graft(ast: &mut Ast, raw: Raw, lines: &LineIndex) -> MathlResult<NodeId> {
    let mut data = NodeData::new(raw.kind, lines.pos(raw.offset));
    data.value = raw.value;
    data.op = raw.op;
    data.qualifier = raw.qualifier;
    let id = ast.add(data);
    for child in raw.children {
        let child = graft(ast, child, lines)?;
        ast.push(id, child)?;
    }
    Ok(id)
}

/// Run `production` over the whole of `source` and graft the result.
fn parse_with<F>(ast: &mut Ast, ctx: &CompilerContext, source: &str, production: F) -> MathlResult<NodeId>
where
    F: for<'i> Fn(&Parser<'_>, &'i str) -> PResult<'i, Raw>,
{
    let parser = Parser::new(ctx, source);
    let result = blank(source).and_then(|(input, _)| production(&parser, input));

    let raw = match result {
        Ok(("", raw)) => raw,
        Ok((rest, _)) => {
            let pos = SourcePos::from_offset(source, source.len() - rest.len());
            let token: String = rest.chars().take_while(|c| !c.is_whitespace()).collect();
            return Err(MathlError::syntax(format!("unexpected '{}'", token), pos));
        }
        Err(err) => {
            return Err(match convert(source, err) {
                (err @ MathlError::Syntax { .. }, _) => err,
                (err, pos) => ctx.error(Some(pos), err),
            });
        }
    };

    let id = graft(ast, raw, &LineIndex::new(source))?;
    trace!(nodes = ast.node_count(), "parsed {}", ast.kind(id));
    Ok(id)
}

/// Parse a whole program and make it the root of `ast`.
pub fn parse_program(ast: &mut Ast, ctx: &CompilerContext, source: &str) -> MathlResult<NodeId> {
    let root = parse_with(ast, ctx, source, |p, i| p.program(i))?;
    ast.set_root(root);
    Ok(root)
}

/// Parse a sequence of statements into a detached `StatementList`.
pub fn parse_statements(ast: &mut Ast, ctx: &CompilerContext, source: &str) -> MathlResult<NodeId> {
    parse_with(ast, ctx, source, |p, i| p.statements(i))
}

/// Parse a single expression into a detached node.
pub fn parse_expression(ast: &mut Ast, ctx: &CompilerContext, source: &str) -> MathlResult<NodeId> {
    parse_with(ast, ctx, source, |p, i| p.expression(i))
}
