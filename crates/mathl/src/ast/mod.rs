//! Abstract syntax tree.
//!
//! The tree is an arena of [`NodeData`] addressed by [`NodeId`]. Each node owns
//! an ordered list of children and keeps a back-reference to its parent. All
//! structural edits go through [`Ast`] so that a node is a child of at most one
//! parent at a time and `parent` always reflects current containment.

mod entity;
mod op;

use std::fmt;

pub use entity::{EntityRef, NodeId, PrimaryMap};
pub use op::Operator;

use crate::{
    error::{MathlError, MathlResult},
    types::VarType,
};

/// Position of a node in the (preprocessed) source. `line` and `col` are 0-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SourcePos {
    pub line: usize,
    pub col: usize,
    /// Byte offset from the start of the source
    pub offset: usize,
}

impl SourcePos {
    pub fn new(line: usize, col: usize, offset: usize) -> Self {
        Self { line, col, offset }
    }

    /// Compute the position of byte `offset` inside `source`.
    pub fn from_offset(source: &str, offset: usize) -> Self {
        let offset = offset.min(source.len());
        let before = &source[..offset];
        let line = before.matches('\n').count();
        let line_start = before.rfind('\n').map(|i| i + 1).unwrap_or(0);
        Self {
            line,
            col: before[line_start..].chars().count(),
            offset,
        }
    }
}

impl fmt::Display for SourcePos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line + 1, self.col + 1)
    }
}

/// Node kind tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Ordered statements; also the program root
    StatementList,
    /// `[VarType return, ParamList, StatementList body]`, value = name
    Function,
    /// Function parameters, each a `VarDecl`
    ParamList,
    /// `[VarType, init?]`, value = declared name
    VarDecl,
    /// value = type
    VarType,
    /// value = name
    Ident,
    IntConstant,
    FloatConstant,
    BoolConstant,
    /// `[lhs, rhs]`, op = operator
    BinOp,
    /// `[operand]`, op = operator
    UnaryOp,
    /// `[target, value]`
    Assign,
    /// `[cond, then, else]`
    Trinary,
    /// `[base, index]`
    ArrayLookup,
    /// `[base, Ident member]`
    BasicMemberLookup,
    /// `[callee, ExprList]`; the callee is an `Ident` or a `VarType` (constructor)
    Call,
    ExprList,
    /// `[cond, StatementList, else?]` where else is a `StatementList` or an `If`
    If,
    /// `[value?]`
    Return,
    /// Synthetic reference to a variable: `[VarType, IntConstant index?]`, value = name
    VarRef,
}

impl NodeKind {
    pub fn name(self) -> &'static str {
        match self {
            NodeKind::StatementList => "StatementList",
            NodeKind::Function => "Function",
            NodeKind::ParamList => "ParamList",
            NodeKind::VarDecl => "VarDecl",
            NodeKind::VarType => "VarType",
            NodeKind::Ident => "Ident",
            NodeKind::IntConstant => "IntConstant",
            NodeKind::FloatConstant => "FloatConstant",
            NodeKind::BoolConstant => "BoolConstant",
            NodeKind::BinOp => "BinOp",
            NodeKind::UnaryOp => "UnaryOp",
            NodeKind::Assign => "Assign",
            NodeKind::Trinary => "Trinary",
            NodeKind::ArrayLookup => "ArrayLookup",
            NodeKind::BasicMemberLookup => "BasicMemberLookup",
            NodeKind::Call => "Call",
            NodeKind::ExprList => "ExprList",
            NodeKind::If => "If",
            NodeKind::Return => "Return",
            NodeKind::VarRef => "VarRef",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Storage qualifier attached to the `VarType` node of a top-level declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageQualifier {
    In,
    Out,
    Uniform,
}

impl StorageQualifier {
    pub fn keyword(self) -> &'static str {
        match self {
            StorageQualifier::In => "in",
            StorageQualifier::Out => "out",
            StorageQualifier::Uniform => "uniform",
        }
    }
}

/// Node payload.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Name(String),
    Type(VarType),
}

impl fmt::Display for NodeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeValue::Int(v) => write!(f, "{}", v),
            NodeValue::Float(v) => write!(f, "{}", v),
            NodeValue::Bool(v) => write!(f, "{}", v),
            NodeValue::Name(name) => write!(f, "{}", name),
            NodeValue::Type(ty) => write!(f, "{}", ty),
        }
    }
}

/// Data of a single node.
#[derive(Debug, Clone)]
pub struct NodeData {
    pub kind: NodeKind,
    pub value: Option<NodeValue>,
    pub op: Option<Operator>,
    pub qualifier: Option<StorageQualifier>,
    pub pos: SourcePos,
    children: Vec<NodeId>,
    parent: Option<NodeId>,
}

impl NodeData {
    pub fn new(kind: NodeKind, pos: SourcePos) -> Self {
        Self {
            kind,
            value: None,
            op: None,
            qualifier: None,
            pos,
            children: Vec::new(),
            parent: None,
        }
    }

    pub fn with_value(mut self, value: NodeValue) -> Self {
        self.value = Some(value);
        self
    }

    pub fn with_op(mut self, op: Operator) -> Self {
        self.op = Some(op);
        self
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }
}

/// Anything that can be appended to a node with [`Ast::push`].
///
/// Literals are coerced into fresh nodes: numbers become `IntConstant` when
/// within 1e-8 of their floor and `FloatConstant` otherwise, strings become
/// `Ident`, and bare types become `VarType` nodes.
#[derive(Debug, Clone)]
pub enum Child {
    Node(NodeId),
    Number(f64),
    Ident(String),
    Type(VarType),
}

impl From<NodeId> for Child {
    fn from(id: NodeId) -> Self {
        Child::Node(id)
    }
}

impl From<f64> for Child {
    fn from(v: f64) -> Self {
        Child::Number(v)
    }
}

impl From<i64> for Child {
    fn from(v: i64) -> Self {
        Child::Number(v as f64)
    }
}

impl From<&str> for Child {
    fn from(name: &str) -> Self {
        Child::Ident(name.to_string())
    }
}

impl From<String> for Child {
    fn from(name: String) -> Self {
        Child::Ident(name)
    }
}

impl From<VarType> for Child {
    fn from(ty: VarType) -> Self {
        Child::Type(ty)
    }
}

/// The syntax tree arena.
#[derive(Debug, Clone, Default)]
pub struct Ast {
    nodes: PrimaryMap<NodeId, NodeData>,
    root: Option<NodeId>,
}

impl Ast {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn set_root(&mut self, root: NodeId) {
        self.root = Some(root);
    }

    /// Number of nodes ever allocated, attached or not.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Allocate a detached node.
    pub fn add(&mut self, data: NodeData) -> NodeId {
        let mut data = data;
        data.children.clear();
        data.parent = None;
        self.nodes.push(data)
    }

    /// Allocate a detached node of `kind` at `pos` with no payload.
    pub fn add_node(&mut self, kind: NodeKind, pos: SourcePos) -> NodeId {
        self.add(NodeData::new(kind, pos))
    }

    pub fn node(&self, id: NodeId) -> &NodeData {
        &self.nodes[id]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut NodeData {
        &mut self.nodes[id]
    }

    pub fn kind(&self, id: NodeId) -> NodeKind {
        self.nodes[id].kind
    }

    pub fn value(&self, id: NodeId) -> Option<&NodeValue> {
        self.nodes[id].value.as_ref()
    }

    /// The identifier payload of an `Ident`, `VarDecl`, `Function` or `VarRef`.
    pub fn name(&self, id: NodeId) -> Option<&str> {
        match &self.nodes[id].value {
            Some(NodeValue::Name(name)) => Some(name),
            _ => None,
        }
    }

    /// The type payload of a `VarType` node.
    pub fn var_type(&self, id: NodeId) -> Option<&VarType> {
        match &self.nodes[id].value {
            Some(NodeValue::Type(ty)) => Some(ty),
            _ => None,
        }
    }

    pub fn op(&self, id: NodeId) -> Option<Operator> {
        self.nodes[id].op
    }

    pub fn pos(&self, id: NodeId) -> SourcePos {
        self.nodes[id].pos
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id].children
    }

    pub fn child(&self, id: NodeId, index: usize) -> Option<NodeId> {
        self.nodes[id].children.get(index).copied()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id].parent
    }

    pub fn index_of(&self, parent: NodeId, child: NodeId) -> Option<usize> {
        self.nodes[parent].children.iter().position(|&c| c == child)
    }

    /// True if `ancestor` is `node` or one of its parents.
    pub fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut cur = Some(node);
        while let Some(id) = cur {
            if id == ancestor {
                return true;
            }
            cur = self.nodes[id].parent;
        }
        false
    }

    /// Nearest proper ancestor of `node` with the given kind.
    pub fn enclosing(&self, node: NodeId, kind: NodeKind) -> Option<NodeId> {
        let mut cur = self.nodes[node].parent;
        while let Some(id) = cur {
            if self.nodes[id].kind == kind {
                return Some(id);
            }
            cur = self.nodes[id].parent;
        }
        None
    }

    /// Append a child, coercing literals into nodes. Returns the appended node.
    pub fn push(&mut self, parent: NodeId, child: impl Into<Child>) -> MathlResult<NodeId> {
        let pos = self.nodes[parent].pos;
        let node = match child.into() {
            Child::Node(node) => {
                self.check_no_cycle(parent, node)?;
                self.detach(node);
                node
            }
            Child::Number(v) => {
                if !v.is_finite() {
                    return Err(MathlError::invalid_argument(format!(
                        "cannot push non-finite number {}",
                        v
                    )));
                }
                if (v - v.floor()).abs() < 1e-8 {
                    self.add(
                        NodeData::new(NodeKind::IntConstant, pos)
                            .with_value(NodeValue::Int(v.floor() as i64)),
                    )
                } else {
                    self.add(
                        NodeData::new(NodeKind::FloatConstant, pos)
                            .with_value(NodeValue::Float(v)),
                    )
                }
            }
            Child::Ident(name) => {
                if name.is_empty() {
                    return Err(MathlError::invalid_argument("cannot push an empty identifier"));
                }
                self.add(NodeData::new(NodeKind::Ident, pos).with_value(NodeValue::Name(name)))
            }
            Child::Type(ty) => {
                self.add(NodeData::new(NodeKind::VarType, pos).with_value(NodeValue::Type(ty)))
            }
        };

        self.attach(parent, node);
        Ok(node)
    }

    /// Insert `node` at `index`, detaching it from any previous parent first.
    pub fn insert(&mut self, parent: NodeId, index: usize, node: NodeId) -> MathlResult<()> {
        if index > self.nodes[parent].children.len() {
            return Err(MathlError::invalid_argument(format!(
                "insert index {} out of range for {} with {} children",
                index,
                parent,
                self.nodes[parent].children.len()
            )));
        }
        self.check_no_cycle(parent, node)?;
        self.detach(node);

        let index = index.min(self.nodes[parent].children.len());
        self.nodes[parent].children.insert(index, node);
        self.nodes[node].parent = Some(parent);
        Ok(())
    }

    /// Remove a direct child, shifting later children down.
    pub fn remove(&mut self, parent: NodeId, node: NodeId) -> MathlResult<()> {
        let index = self
            .index_of(parent, node)
            .ok_or(MathlError::NodeNotFound {
                parent,
                child: node,
            })?;
        self.nodes[parent].children.remove(index);
        self.nodes[node].parent = None;
        Ok(())
    }

    /// Swap `old` for `new` at the same position in `parent`.
    pub fn replace(&mut self, parent: NodeId, old: NodeId, new: NodeId) -> MathlResult<()> {
        if self.index_of(parent, old).is_none() {
            return Err(MathlError::NodeNotFound { parent, child: old });
        }
        if old == new {
            return Ok(());
        }
        self.check_no_cycle(parent, new)?;
        self.detach(new);

        // `new` may have been an earlier sibling, so look the slot up again
        let index = self
            .index_of(parent, old)
            .ok_or(MathlError::NodeNotFound { parent, child: old })?;
        self.nodes[parent].children[index] = new;
        self.nodes[old].parent = None;
        self.nodes[new].parent = Some(parent);
        Ok(())
    }

    /// Replace `old` by `new` inside whatever node currently contains `old`.
    pub fn replace_in_parent(&mut self, old: NodeId, new: NodeId) -> MathlResult<()> {
        let parent = self.nodes[old].parent.ok_or_else(|| {
            MathlError::invalid_argument(format!("{} has no parent to be replaced in", old))
        })?;
        self.replace(parent, old, new)
    }

    /// Detach `node` from its parent, if it has one.
    pub fn detach(&mut self, node: NodeId) {
        if let Some(parent) = self.nodes[node].parent.take() {
            self.nodes[parent].children.retain(|&c| c != node);
        }
    }

    /// Deep copy of a subtree. The copy starts parentless.
    pub fn copy(&mut self, id: NodeId) -> NodeId {
        let data = self.nodes[id].clone();
        let children = data.children.clone();
        let new = self.add(data);
        for child in children {
            let copied = self.copy(child);
            self.attach(new, copied);
        }
        new
    }

    /// Copy the source position of `from` onto `to`.
    pub fn copy_pos(&mut self, from: NodeId, to: NodeId) {
        self.nodes[to].pos = self.nodes[from].pos;
    }

    /// Set the position of every node in the subtree rooted at `id`.
    pub fn set_pos_recursive(&mut self, id: NodeId, pos: SourcePos) {
        self.nodes[id].pos = pos;
        for child in self.nodes[id].children.clone() {
            self.set_pos_recursive(child, pos);
        }
    }

    /// Whether `id` is an assignment. Compound operators are desugared by the
    /// parser, so only the `Assign` tag qualifies.
    pub fn is_assign(&self, id: NodeId) -> bool {
        self.nodes[id].kind == NodeKind::Assign
    }

    /// Build a synthetic reference to the variable `name` of type `ty`.
    ///
    /// Array-typed references carry an `IntConstant` child naming the element.
    pub fn var_ref(&mut self, name: &str, ty: &VarType, index: Option<usize>) -> NodeId {
        let vref = self.add(
            NodeData::new(NodeKind::VarRef, SourcePos::default())
                .with_value(NodeValue::Name(name.to_string())),
        );
        let ty_node = self.add(
            NodeData::new(NodeKind::VarType, SourcePos::default())
                .with_value(NodeValue::Type(ty.clone())),
        );
        self.attach(vref, ty_node);

        if let (true, Some(index)) = (ty.is_array(), index) {
            let idx = self.add(
                NodeData::new(NodeKind::IntConstant, SourcePos::default())
                    .with_value(NodeValue::Int(index as i64)),
            );
            self.attach(vref, idx);
        }
        vref
    }

    /// Whether `node` refers to the same variable (and element) as `vref`.
    pub fn equals_var_ref(&self, node: NodeId, vref: NodeId) -> bool {
        if self.kind(vref) != NodeKind::VarRef {
            return false;
        }
        let Some(name) = self.name(vref) else {
            return false;
        };
        let is_array = self
            .child(vref, 0)
            .and_then(|t| self.var_type(t))
            .map(VarType::is_array)
            .unwrap_or(false);
        let index = self.child(vref, 1).and_then(|i| match self.value(i) {
            Some(NodeValue::Int(v)) => Some(*v),
            _ => None,
        });

        match (is_array, index) {
            (true, Some(index)) => {
                if self.kind(node) != NodeKind::ArrayLookup {
                    return false;
                }
                let base_matches = self
                    .child(node, 0)
                    .map(|b| self.kind(b) == NodeKind::Ident && self.name(b) == Some(name))
                    .unwrap_or(false);
                let index_matches = self
                    .child(node, 1)
                    .map(|i| {
                        self.kind(i) == NodeKind::IntConstant
                            && self.value(i) == Some(&NodeValue::Int(index))
                    })
                    .unwrap_or(false);
                base_matches && index_matches
            }
            _ => self.kind(node) == NodeKind::Ident && self.name(node) == Some(name),
        }
    }

    /// Indented dump of the subtree rooted at `id`.
    pub fn dump(&self, id: NodeId) -> AstDump<'_> {
        AstDump { ast: self, root: id }
    }

    fn attach(&mut self, parent: NodeId, node: NodeId) {
        self.nodes[parent].children.push(node);
        self.nodes[node].parent = Some(parent);
    }

    fn check_no_cycle(&self, parent: NodeId, node: NodeId) -> MathlResult<()> {
        if self.is_ancestor(node, parent) {
            return Err(MathlError::invalid_argument(format!(
                "{} cannot become a descendant of itself via {}",
                node, parent
            )));
        }
        Ok(())
    }
}

/// Display adapter for [`Ast::dump`].
pub struct AstDump<'a> {
    ast: &'a Ast,
    root: NodeId,
}

impl AstDump<'_> {
    fn write_node(&self, f: &mut fmt::Formatter<'_>, id: NodeId, depth: usize) -> fmt::Result {
        let node = self.ast.node(id);
        let tab = "-".repeat(depth);

        write!(f, "{}{}", tab, node.kind)?;
        if let Some(value) = &node.value {
            write!(f, " : {}", value)?;
        } else if let Some(op) = node.op {
            write!(f, " ({})", op)?;
        }
        write!(f, " {{ line:{}", node.pos.line + 1)?;

        if node.children.is_empty() {
            writeln!(f, "}}")
        } else {
            writeln!(f)?;
            for &child in &node.children {
                self.write_node(f, child, depth + 1)?;
            }
            writeln!(f, "{}}}", tab)
        }
    }
}

impl fmt::Display for AstDump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_node(f, self.root, 0)
    }
}
