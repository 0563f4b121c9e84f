//! Swizzle lowering.
//!
//! `v.x` becomes `v[0]`. A multi-axis member in read position such as `v.yx`
//! becomes `vec2(v[1], v[0])`, and a multi-axis assignment `v.xy = e;` becomes
//! one element assignment per axis, spliced into the enclosing statement list.
//!
//! Multi-axis rewrites re-parse a text template in a nested context and put
//! the original operands in place of the `$n1`/`$n2` placeholders. The first
//! placeholder receives the operand itself, later ones a copy.
//!
//! Assignments are rewritten in a second full pass: replacing an `Assign`
//! while its target is still being lowered as a read would revisit it.

use std::{collections::HashMap, sync::OnceLock};

use tracing::{debug, trace};

use super::LoweringPass;
use crate::{
    ast::{Ast, NodeId, NodeKind, SourcePos},
    context::{CompilerContext, NestedContext, TypeRef, THIS},
    error::{MathlError, MathlResult},
    parser::{parse_expression, parse_statements},
    traverse::{scope_walk, visit, Flow, ScopeHook},
};

/// Axis letter sets; a letter's position is its component index.
const AXIS_SETS: [&str; 3] = ["xyzw", "rgba", "uvt"];

const TEMPLATE_FILE: &str = "(swizzle)";

/// A multi-axis swizzle and its rewrite templates.
#[derive(Debug, Clone, PartialEq)]
pub struct Swizzle {
    /// Component index of each letter
    pub indices: Vec<usize>,
    /// `vecN($n1[i0], $n1[i1], ...)`
    pub get: String,
    /// `$n1[i0] = $n2[0]; $n1[i1] = $n2[1]; ...`
    pub set: String,
}

impl Swizzle {
    fn new(indices: Vec<usize>) -> Self {
        let reads: Vec<String> = indices.iter().map(|i| format!("$n1[{}]", i)).collect();
        let writes: Vec<String> = indices
            .iter()
            .enumerate()
            .map(|(k, i)| format!("$n1[{}] = $n2[{}];", i, k))
            .collect();
        Self {
            get: format!("vec{}({})", indices.len(), reads.join(", ")),
            set: writes.join("\n"),
            indices,
        }
    }

    /// The multi-axis swizzle named `member`, if it is one.
    pub fn lookup(member: &str) -> Option<&'static Swizzle> {
        swizzles().get(member)
    }

    /// Component index of a single axis letter.
    pub fn axis(member: &str) -> Option<usize> {
        let mut chars = member.chars();
        let (Some(c), None) = (chars.next(), chars.next()) else {
            return None;
        };
        AXIS_SETS.iter().find_map(|set| set.find(c))
    }

    /// Set template taking each component from its own placeholder `$aK`.
    fn unpacked_set(&self) -> String {
        let writes: Vec<String> = self
            .indices
            .iter()
            .enumerate()
            .map(|(k, i)| format!("$n1[{}] = $a{};", i, k))
            .collect();
        writes.join("\n")
    }
}

/// Every ordered, non-repeating selection of 2 to 4 letters from one axis set.
fn swizzles() -> &'static HashMap<String, Swizzle> {
    static TABLE: OnceLock<HashMap<String, Swizzle>> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut table = HashMap::new();
        for set in AXIS_SETS {
            let axes: Vec<char> = set.chars().collect();
            for len in 2..=axes.len() {
                permutations(axes.len(), len, &mut Vec::new(), &mut |indices| {
                    let name: String = indices.iter().map(|&i| axes[i]).collect();
                    table.insert(name, Swizzle::new(indices.to_vec()));
                });
            }
        }
        table
    })
}

fn permutations(n: usize, len: usize, prefix: &mut Vec<usize>, emit: &mut impl FnMut(&[usize])) {
    if prefix.len() == len {
        emit(prefix);
        return;
    }
    for i in 0..n {
        if prefix.contains(&i) {
            continue;
        }
        prefix.push(i);
        permutations(n, len, prefix, emit);
        prefix.pop();
    }
}

/// The built-in swizzle lowering pass.
#[derive(Debug, Default, Clone, Copy)]
pub struct SwizzlePass;

impl LoweringPass for SwizzlePass {
    fn name(&self) -> &str {
        "swizzle"
    }

    fn run(&mut self, ast: &mut Ast, ctx: &mut CompilerContext) -> MathlResult<()> {
        lower_swizzles(ast, ctx)
    }
}

/// Lower every swizzle in the program rooted at `ast.root()`.
///
/// Expects `ctx`'s scope stack to be reset from the I/O tables.
pub fn lower_swizzles(ast: &mut Ast, ctx: &mut CompilerContext) -> MathlResult<()> {
    let Some(root) = ast.root() else {
        return Ok(());
    };

    let mut reads = SwizzleHook::new(Mode::Read);
    scope_walk(ast, root, ctx, &mut reads)?;

    ctx.reset_scope_stack();
    let mut writes = SwizzleHook::new(Mode::Write);
    scope_walk(ast, root, ctx, &mut writes)?;

    debug!(reads = reads.lowered, writes = writes.lowered, "lowered swizzles");
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Read,
    Write,
}

struct SwizzleHook {
    mode: Mode,
    lowered: usize,
}

impl SwizzleHook {
    fn new(mode: Mode) -> Self {
        Self { mode, lowered: 0 }
    }

    fn lower_read(
        &mut self,
        ast: &mut Ast,
        ctx: &mut CompilerContext,
        node: NodeId,
    ) -> MathlResult<Flow> {
        let Some(member) = member_name(ast, node) else {
            return Ok(Flow::Descend);
        };
        let Some(base) = vector_base(ast, ctx, node, TypeSource::This)? else {
            return Ok(Flow::Descend);
        };
        let pos = ast.pos(node);

        if let Some(index) = Swizzle::axis(&member) {
            let lookup = ast.add_node(NodeKind::ArrayLookup, pos);
            ast.replace_in_parent(node, lookup)?;
            ast.push(lookup, base)?;
            ast.push(lookup, index as i64)?;
            trace!(%node, member = %member, "lower single-axis swizzle");
            return Ok(Flow::Replaced(vec![lookup]));
        }

        let Some(swizzle) = Swizzle::lookup(&member) else {
            return Ok(Flow::Descend);
        };
        if is_assign_target(ast, node) {
            return Ok(Flow::Descend);
        }

        let call = parse_template(ast, ctx, &swizzle.get, pos, parse_expression)?;
        substitute(ast, call, "$n1", base)?;
        ast.replace_in_parent(node, call)?;
        trace!(%node, member = %member, "lower swizzle read");
        Ok(Flow::Replaced(vec![call]))
    }

    /// Split `base.abc = value` into one element assignment per axis, spliced
    /// into the enclosing statement list.
    ///
    /// The element writes run in order and read `value` after earlier writes
    /// landed. When the value reads the target itself, as in `p.xy = p.yx`
    /// (already lowered to `vec2(p[1], p[0])`), the result is
    /// `p[0] = p[1]; p[1] = p[0];` and the swap is lost.
    fn lower_write(
        &mut self,
        ast: &mut Ast,
        ctx: &mut CompilerContext,
        node: NodeId,
    ) -> MathlResult<Flow> {
        let (Some(target), Some(value)) = (ast.child(node, 0), ast.child(node, 1)) else {
            return Ok(Flow::Descend);
        };
        if ast.kind(target) != NodeKind::BasicMemberLookup {
            return Ok(Flow::Descend);
        }
        let Some(member) = member_name(ast, target) else {
            return Ok(Flow::Descend);
        };
        let Some(swizzle) = Swizzle::lookup(&member) else {
            return Ok(Flow::Descend);
        };
        let Some(base) = vector_base(ast, ctx, target, TypeSource::Base)? else {
            return Ok(Flow::Descend);
        };

        let list = match ast.parent(node) {
            Some(list) if ast.kind(list) == NodeKind::StatementList => list,
            _ => {
                return Err(ctx.error_at(
                    ast,
                    node,
                    MathlError::semantic(format!(
                        "assignment to swizzle .{} must be a statement",
                        member
                    )),
                ))
            }
        };
        let pos = ast.pos(node);

        let stmts = match constructor_args(ast, value, swizzle.indices.len()) {
            Some(args) => {
                let stmts = parse_template(ast, ctx, &swizzle.unpacked_set(), pos, parse_statements)?;
                for (k, arg) in args.into_iter().enumerate() {
                    substitute(ast, stmts, &format!("$a{}", k), arg)?;
                }
                stmts
            }
            None => {
                let stmts = parse_template(ast, ctx, &swizzle.set, pos, parse_statements)?;
                substitute(ast, stmts, "$n2", value)?;
                stmts
            }
        };
        substitute(ast, stmts, "$n1", base)?;

        let index = ast.index_of(list, node).ok_or(MathlError::NodeNotFound {
            parent: list,
            child: node,
        })?;
        ast.remove(list, node)?;
        let replacements = ast.children(stmts).to_vec();
        for (k, &stmt) in replacements.iter().enumerate() {
            ast.insert(list, index + k, stmt)?;
        }

        trace!(%node, member = %member, statements = replacements.len(), "lower swizzle write");
        Ok(Flow::Replaced(replacements))
    }
}

impl ScopeHook for SwizzleHook {
    fn hook(&mut self, ast: &mut Ast, ctx: &mut CompilerContext, node: NodeId) -> MathlResult<Flow> {
        let flow = match (self.mode, ast.kind(node)) {
            (Mode::Read, NodeKind::BasicMemberLookup) => self.lower_read(ast, ctx, node)?,
            (Mode::Write, NodeKind::Assign) => self.lower_write(ast, ctx, node)?,
            _ => Flow::Descend,
        };
        if let Flow::Replaced(_) = flow {
            self.lowered += 1;
        }
        Ok(flow)
    }
}

/// Where the type of an identifier base is looked up.
#[derive(Debug, Clone, Copy)]
enum TypeSource {
    /// `this`, bound by the scope walk on entering the member access
    This,
    /// The identifier's own binding
    Base,
}

/// The base of member access `lookup` if it is a vector or array.
///
/// Only identifier bases are type checked; any other base expression is
/// assumed to produce a vector.
fn vector_base(
    ast: &Ast,
    ctx: &CompilerContext,
    lookup: NodeId,
    source: TypeSource,
) -> MathlResult<Option<NodeId>> {
    let Some(base) = ast.child(lookup, 0) else {
        return Ok(None);
    };
    if ast.kind(base) != NodeKind::Ident {
        return Ok(Some(base));
    }

    let name = match source {
        TypeSource::This => THIS,
        TypeSource::Base => ast.name(base).unwrap_or_default(),
    };
    let ty = ctx
        .resolve_type(TypeRef::FromBinding(name))
        .map_err(|err| ctx.error_at(ast, lookup, err))?;
    Ok(ty.is_array().then_some(base))
}

fn member_name(ast: &Ast, lookup: NodeId) -> Option<String> {
    let member = ast.child(lookup, 1)?;
    if ast.kind(member) != NodeKind::Ident {
        return None;
    }
    ast.name(member).map(str::to_string)
}

fn is_assign_target(ast: &Ast, node: NodeId) -> bool {
    match ast.parent(node) {
        Some(parent) => ast.is_assign(parent) && ast.child(parent, 0) == Some(node),
        None => false,
    }
}

/// Arguments of a `vecN(a, b, ...)` constructor call with one argument per
/// component.
fn constructor_args(ast: &Ast, value: NodeId, width: usize) -> Option<Vec<NodeId>> {
    if ast.kind(value) != NodeKind::Call {
        return None;
    }
    let callee = ast.child(value, 0)?;
    let ty = ast.var_type(callee)?;
    if ty.type_name() != format!("vec{}", width) {
        return None;
    }
    let args = ast.children(ast.child(value, 1)?);
    (args.len() == width).then(|| args.to_vec())
}

/// Parse `template` in an isolated context; every new node is placed at `pos`.
fn parse_template(
    ast: &mut Ast,
    ctx: &mut CompilerContext,
    template: &str,
    pos: SourcePos,
    parse: fn(&mut Ast, &CompilerContext, &str) -> MathlResult<NodeId>,
) -> MathlResult<NodeId> {
    let nested = NestedContext::snippet(ctx, template, TEMPLATE_FILE);
    let node = parse(ast, &nested, template)?;
    ast.set_pos_recursive(node, pos);
    Ok(node)
}

/// Replace every `Ident` named `placeholder` below `root` with `operand`.
fn substitute(ast: &mut Ast, root: NodeId, placeholder: &str, operand: NodeId) -> MathlResult<()> {
    let mut sites = Vec::new();
    visit(ast, root, NodeKind::Ident, &mut |ast, id| {
        if ast.name(id) == Some(placeholder) {
            sites.push(id);
        }
    });

    for (k, site) in sites.into_iter().enumerate() {
        let node = if k == 0 { operand } else { ast.copy(operand) };
        ast.replace_in_parent(site, node)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{parser::parse_program, slots::find_slots};

    fn lower(src: &str) -> MathlResult<Ast> {
        let mut ctx = CompilerContext::new(src, "swizzle.mathl");
        let mut ast = Ast::new();
        parse_program(&mut ast, &ctx, src)?;
        find_slots(&mut ctx, &ast)?;
        ctx.reset_scope_stack();
        lower_swizzles(&mut ast, &mut ctx)?;
        Ok(ast)
    }

    fn shape(ast: &Ast, id: NodeId) -> String {
        let head = match (ast.value(id), ast.op(id)) {
            (Some(v), _) => v.to_string(),
            (None, Some(op)) => op.symbol().to_string(),
            (None, None) => ast.kind(id).name().to_string(),
        };
        if ast.children(id).is_empty() {
            return head;
        }
        let kids: Vec<String> = ast.children(id).iter().map(|&c| shape(ast, c)).collect();
        format!("({} {})", head, kids.join(" "))
    }

    /// Statements of the last function in the program.
    fn body(ast: &Ast) -> Vec<String> {
        let root = ast.root().unwrap();
        let func = *ast.children(root).last().unwrap();
        let list = ast.child(func, 2).unwrap();
        ast.children(list).iter().map(|&s| shape(ast, s)).collect()
    }

    fn count(ast: &Ast, kind: NodeKind) -> usize {
        let mut n = 0;
        visit(ast, ast.root().unwrap(), kind, &mut |_, _| n += 1);
        n
    }

    #[test]
    fn test_table() {
        assert_eq!(swizzles().len(), 132);
        assert_eq!(Swizzle::lookup("yx").map(|s| s.indices.clone()), Some(vec![1, 0]));
        assert_eq!(Swizzle::lookup("bgr").map(|s| s.get.as_str()), Some("vec3($n1[2], $n1[1], $n1[0])"));
        assert_eq!(
            Swizzle::lookup("vu").map(|s| s.set.as_str()),
            Some("$n1[1] = $n2[0];\n$n1[0] = $n2[1];")
        );
        assert_eq!(Swizzle::lookup("xx"), None);
        assert_eq!(Swizzle::lookup("xg"), None);
        assert_eq!(Swizzle::lookup("x"), None);
    }

    #[test]
    fn test_axis() {
        assert_eq!(Swizzle::axis("x"), Some(0));
        assert_eq!(Swizzle::axis("a"), Some(3));
        assert_eq!(Swizzle::axis("t"), Some(2));
        assert_eq!(Swizzle::axis("q"), None);
        assert_eq!(Swizzle::axis("xy"), None);
    }

    #[test]
    fn test_round_trip() {
        let ast = lower(
            "in vec3 point;\nvec2 other;\nvoid main() {\n  float a = point.x;\n  vec2 b = point.yx;\n  point.xy = other.yx;\n}",
        )
        .unwrap();
        assert_eq!(
            body(&ast),
            vec![
                "(a float (ArrayLookup point 0))",
                "(b vec2 (Call vec2 (ExprList (ArrayLookup point 1) (ArrayLookup point 0))))",
                "(= (ArrayLookup point 0) (ArrayLookup other 1))",
                "(= (ArrayLookup point 1) (ArrayLookup other 0))",
            ]
        );
        assert_eq!(count(&ast, NodeKind::BasicMemberLookup), 0);
    }

    #[test]
    fn test_write_from_expression() {
        let ast = lower("vec3 p;\nvec2 q;\nvoid main() {\n  p.zx = q * 2.0;\n}").unwrap();
        assert_eq!(
            body(&ast),
            vec![
                "(= (ArrayLookup p 2) (ArrayLookup (* q 2) 0))",
                "(= (ArrayLookup p 0) (ArrayLookup (* q 2) 1))",
            ]
        );
    }

    #[test]
    fn test_single_axis_write() {
        let ast = lower("out vec4 color;\nvoid main() {\n  color.a = 1.0;\n}").unwrap();
        assert_eq!(body(&ast), vec!["(= (ArrayLookup color 3) 1)"]);
    }

    #[test]
    fn test_parameters_and_nested_bases() {
        let ast = lower("float f(vec3 v) {\n  return v.zy.x;\n}").unwrap();
        assert_eq!(
            body(&ast),
            vec!["(Return (ArrayLookup (Call vec2 (ExprList (ArrayLookup v 2) (ArrayLookup v 1))) 0))"]
        );
    }

    #[test]
    fn test_scalar_base_untouched() {
        let ast = lower("float s;\nvoid main() {\n  float t = s.x;\n}").unwrap();
        assert_eq!(count(&ast, NodeKind::BasicMemberLookup), 1);
    }

    #[test]
    fn test_unknown_member_untouched() {
        let ast = lower("vec3 p;\nvoid main() {\n  float t = p.length;\n}").unwrap();
        assert_eq!(count(&ast, NodeKind::BasicMemberLookup), 1);
    }

    #[test]
    fn test_undefined_base() {
        let err = lower("void main() {\n  float t = q.x;\n}").unwrap_err();
        assert_eq!(err.root(), &MathlError::UndefinedSymbol("q".to_string()));
        assert_eq!(err.pos().map(|p| p.line), Some(1));
    }

    #[test]
    fn test_write_must_be_statement() {
        let err = lower("vec2 a;\nvec2 b;\nvoid main() {\n  b = (a.xy = vec2(1.0, 2.0));\n}").unwrap_err();
        assert!(matches!(err.root(), MathlError::Semantic(_)));
    }

    #[test]
    fn test_template_positions() {
        let ast = lower("vec3 p;\nvoid main() {\n  vec2 b = p.yx;\n}").unwrap();
        let root = ast.root().unwrap();
        let main = ast.children(root)[1];
        let decl = ast.children(ast.child(main, 2).unwrap())[0];
        let call = ast.child(decl, 1).unwrap();
        assert_eq!(ast.pos(call), SourcePos::new(2, 11, 33));

        // substituted operands keep their own positions
        let args = ast.child(call, 1).unwrap();
        let first = ast.children(args)[0];
        assert_eq!(ast.pos(first), SourcePos::new(2, 11, 33));
        assert_eq!(ast.pos(ast.child(first, 0).unwrap()), SourcePos::new(2, 11, 33));
    }
}
