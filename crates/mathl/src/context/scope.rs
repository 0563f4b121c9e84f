//! Lexical scope tracking.
//!
//! Scopes are kept flattened: `scope` always holds every visible binding, so
//! lookup is a single map probe. `push` snapshots the flattened map and opens
//! an empty local overlay; `pop` restores the saved pair.

use std::collections::HashMap;

use crate::{
    ast::NodeId,
    error::{MathlError, MathlResult},
    types::VarType,
};

/// Name under which a function's declared return type is bound.
pub const RETURN: &str = "$__return__$";

/// Name bound to the base type inside a member access.
pub const THIS: &str = "this";

/// A bound name.
#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    pub ty: VarType,
    /// Declaring node, if the binding came from a declaration
    pub decl: Option<NodeId>,
}

impl Binding {
    pub fn new(ty: VarType, decl: Option<NodeId>) -> Self {
        Self { ty, decl }
    }

    /// A binding with no declaring node (return types, `this`).
    pub fn of(ty: VarType) -> Self {
        Self { ty, decl: None }
    }
}

/// Stack of saved `(scope, local)` frames plus the active pair.
#[derive(Debug, Clone, Default)]
pub struct ScopeStack {
    scope: HashMap<String, Binding>,
    local: HashMap<String, Binding>,
    saved: Vec<(HashMap<String, Binding>, HashMap<String, Binding>)>,
}

impl ScopeStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every frame and binding.
    pub fn clear(&mut self) {
        self.scope.clear();
        self.local.clear();
        self.saved.clear();
    }

    pub fn push(&mut self) {
        let local = std::mem::take(&mut self.local);
        self.saved.push((self.scope.clone(), local));
    }

    pub fn pop(&mut self) -> MathlResult<()> {
        let (scope, local) = self
            .saved
            .pop()
            .ok_or_else(|| MathlError::semantic("scope stack underflow"))?;
        self.scope = scope;
        self.local = local;
        Ok(())
    }

    /// Bind `name` in the local overlay and the flattened scope.
    pub fn set(&mut self, name: impl Into<String>, binding: Binding) {
        let name = name.into();
        self.local.insert(name.clone(), binding.clone());
        self.scope.insert(name, binding);
    }

    pub fn get(&self, name: &str) -> Option<&Binding> {
        self.scope.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.scope.contains_key(name)
    }

    /// Whether `name` was bound since the innermost `push`.
    pub fn is_local(&self, name: &str) -> bool {
        self.local.contains_key(name)
    }

    /// Number of saved frames.
    pub fn depth(&self) -> usize {
        self.saved.len()
    }

    /// The flattened scope.
    pub fn flattened(&self) -> &HashMap<String, Binding> {
        &self.scope
    }
}
