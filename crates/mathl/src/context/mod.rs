//! Compiler context: the symbol table of one compilation unit.
//!
//! A context owns the type registry, the polymorphic function registry, the
//! lexical scope stack, the input/output/uniform declaration tables and the
//! source text used to render diagnostics. Create one per compilation unit
//! with [`CompilerContext::new`]; builtins are seeded on construction.

mod builtins;
mod nested;
mod poly;
mod scope;

use indexmap::IndexMap;

pub use nested::NestedContext;
pub use poly::{build_poly_key, PolySignature, TypeArg};
pub use scope::{Binding, ScopeStack, RETURN, THIS};

use crate::{
    ast::{Ast, NodeId, NodeKind, SourcePos, StorageQualifier},
    error::{format_lines, Diagnostic, MathlError, MathlResult},
    types::VarType,
};

/// Number of source lines shown around a diagnostic.
const EXCERPT_LINES: usize = 5;

/// Something a type can be resolved from.
#[derive(Debug, Clone, Copy)]
pub enum TypeRef<'a> {
    /// A type value
    Named(&'a VarType),
    /// A `VarType`, `Ident`, `VarRef` or declaring node
    FromNode(&'a Ast, NodeId),
    /// The type currently bound to a name in scope
    FromBinding(&'a str),
}

impl<'a> From<&'a VarType> for TypeRef<'a> {
    fn from(ty: &'a VarType) -> Self {
        TypeRef::Named(ty)
    }
}

/// A qualified top-level declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct IoDecl {
    /// The declaring `VarDecl`
    pub decl: NodeId,
    pub ty: VarType,
}

#[derive(Debug, Clone)]
pub struct CompilerContext {
    /// The tree being compiled
    pub ast: Ast,
    pub source: String,
    pub preprocessed: String,
    pub filename: String,

    types: IndexMap<String, VarType>,
    poly_keymap: IndexMap<String, PolySignature>,
    poly_namemap: IndexMap<String, Vec<String>>,
    scopes: ScopeStack,

    /// Declarations in source order; slot numbers follow this order
    pub inputs: IndexMap<String, IoDecl>,
    pub outputs: IndexMap<String, IoDecl>,
    pub uniforms: IndexMap<String, IoDecl>,
}

impl CompilerContext {
    pub fn new(source: impl Into<String>, filename: impl Into<String>) -> Self {
        let mut ctx = Self {
            ast: Ast::new(),
            source: source.into(),
            preprocessed: String::new(),
            filename: filename.into(),
            types: IndexMap::new(),
            poly_keymap: IndexMap::new(),
            poly_namemap: IndexMap::new(),
            scopes: ScopeStack::new(),
            inputs: IndexMap::new(),
            outputs: IndexMap::new(),
            uniforms: IndexMap::new(),
        };
        ctx.reset();
        ctx
    }

    pub fn add_type(&mut self, name: impl Into<String>, ty: VarType) -> VarType {
        self.types.insert(name.into(), ty.clone());
        ty
    }

    pub fn get_type(&self, name: &str) -> Option<&VarType> {
        self.types.get(name)
    }

    pub fn has_type(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// Registered type names in registration order.
    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }

    /// Resolve a type reference to its canonical type value.
    ///
    /// Named types whose registry entry is an array (`vec3`, `mat4`) resolve to
    /// that entry; array types resolve element-wise. Resolution is idempotent.
    pub fn resolve_type(&self, r: TypeRef<'_>) -> MathlResult<VarType> {
        match r {
            TypeRef::Named(ty) => self.canonical(ty),
            TypeRef::FromBinding(name) => {
                let binding = self
                    .scopes
                    .get(name)
                    .ok_or_else(|| MathlError::UndefinedSymbol(name.to_string()))?;
                self.canonical(&binding.ty)
            }
            TypeRef::FromNode(ast, id) => match ast.kind(id) {
                NodeKind::VarType => match ast.var_type(id) {
                    Some(ty) => self.canonical(ty),
                    None => Err(MathlError::semantic(format!("{} has no type", id))),
                },
                NodeKind::Ident => match ast.name(id) {
                    Some(name) => self.canonical(&VarType::named(name)),
                    None => Err(MathlError::semantic(format!("{} has no name", id))),
                },
                NodeKind::VarRef => {
                    let ty_node = ast.child(id, 0).ok_or_else(|| {
                        MathlError::semantic(format!("variable reference {} has no type", id))
                    })?;
                    let ty = self.resolve_type(TypeRef::FromNode(ast, ty_node))?;
                    if ast.children(id).len() > 1 {
                        ty.element().cloned().ok_or_else(|| {
                            MathlError::semantic(format!("{} is not an array type", ty))
                        })
                    } else {
                        Ok(ty)
                    }
                }
                NodeKind::VarDecl | NodeKind::Function => match ast.child(id, 0) {
                    Some(ty_node) => self.resolve_type(TypeRef::FromNode(ast, ty_node)),
                    None => Err(MathlError::semantic(format!("{} has no type", id))),
                },
                kind => Err(MathlError::semantic(format!(
                    "cannot resolve a type from a {} node",
                    kind
                ))),
            },
        }
    }

    /// Resolve a type by registry name.
    pub fn resolve_name(&self, name: &str) -> MathlResult<VarType> {
        self.canonical(&VarType::named(name))
    }

    /// Compare two types by canonical name after resolution.
    pub fn types_equal(&self, a: TypeRef<'_>, b: TypeRef<'_>) -> MathlResult<bool> {
        let a = self.resolve_type(a)?;
        let b = self.resolve_type(b)?;
        Ok(a.type_name() == b.type_name())
    }

    fn canonical(&self, ty: &VarType) -> MathlResult<VarType> {
        match ty {
            VarType::Named(name) => match self.types.get(name) {
                None => Err(MathlError::UnknownType(name.clone())),
                Some(registered) if registered.is_array() => Ok(registered.clone()),
                Some(_) => Ok(ty.clone()),
            },
            VarType::Array { elem, size, alias } => Ok(VarType::Array {
                elem: Box::new(self.canonical(elem)?),
                size: *size,
                alias: alias.clone(),
            }),
            VarType::DynamicArray { elem, alias } => Ok(VarType::DynamicArray {
                elem: Box::new(self.canonical(elem)?),
                alias: alias.clone(),
            }),
        }
    }

    pub fn push_scope(&mut self) {
        self.scopes.push();
    }

    pub fn pop_scope(&mut self) -> MathlResult<()> {
        self.scopes.pop()
    }

    pub fn set_scope(&mut self, name: impl Into<String>, binding: Binding) {
        self.scopes.set(name, binding);
    }

    /// Resolved type bound to `name`.
    pub fn get_scope(&self, name: &str) -> MathlResult<VarType> {
        self.resolve_type(TypeRef::FromBinding(name))
    }

    pub fn lookup(&self, name: &str) -> Option<&Binding> {
        self.scopes.get(name)
    }

    pub fn scopes(&self) -> &ScopeStack {
        &self.scopes
    }

    pub fn set_return_type(&mut self, ty: VarType) {
        self.scopes.set(RETURN, Binding::of(ty));
    }

    pub fn return_type(&self) -> MathlResult<VarType> {
        self.get_scope(RETURN)
    }

    /// Clear the scope stack and rebind every input, output and uniform.
    pub fn reset_scope_stack(&mut self) {
        self.scopes.clear();
        for table in [&self.inputs, &self.outputs, &self.uniforms] {
            for (name, io) in table {
                self.scopes
                    .set(name.clone(), Binding::new(io.ty.clone(), Some(io.decl)));
            }
        }
    }

    /// The declaration table for a qualifier.
    pub fn io_table(&self, qualifier: StorageQualifier) -> &IndexMap<String, IoDecl> {
        match qualifier {
            StorageQualifier::In => &self.inputs,
            StorageQualifier::Out => &self.outputs,
            StorageQualifier::Uniform => &self.uniforms,
        }
    }

    /// File a qualified declaration. A name may be declared once across all tables.
    pub fn declare_io(
        &mut self,
        qualifier: StorageQualifier,
        name: &str,
        decl: NodeId,
        ty: VarType,
    ) -> MathlResult<()> {
        if let Some(existing) = self.io_qualifier(name) {
            return Err(MathlError::semantic(format!(
                "{} is already declared as {}",
                name,
                existing.keyword()
            )));
        }

        let table = match qualifier {
            StorageQualifier::In => &mut self.inputs,
            StorageQualifier::Out => &mut self.outputs,
            StorageQualifier::Uniform => &mut self.uniforms,
        };
        table.insert(name.to_string(), IoDecl { decl, ty });
        Ok(())
    }

    /// The qualifier `name` was declared with, if it is an input, output or uniform.
    pub fn io_qualifier(&self, name: &str) -> Option<StorageQualifier> {
        [
            StorageQualifier::In,
            StorageQualifier::Out,
            StorageQualifier::Uniform,
        ]
        .into_iter()
        .find(|&q| self.io_table(q).contains_key(name))
    }

    pub fn io_decl(&self, name: &str) -> Option<&IoDecl> {
        self.inputs
            .get(name)
            .or_else(|| self.outputs.get(name))
            .or_else(|| self.uniforms.get(name))
    }

    /// Attach file, line and a source excerpt to `error`.
    ///
    /// Errors that already carry a diagnostic are returned unchanged.
    pub fn error(&self, pos: Option<SourcePos>, error: MathlError) -> MathlError {
        if let MathlError::Diagnostic(_) = error {
            return error;
        }
        let pos = pos.or_else(|| error.pos());
        // Positions index the preprocessed text once it exists.
        let text = if self.preprocessed.is_empty() {
            &self.source
        } else {
            &self.preprocessed
        };
        let excerpt = pos
            .map(|p| format_lines(text, p.line, p.col, EXCERPT_LINES))
            .unwrap_or_default();

        MathlError::Diagnostic(Box::new(Diagnostic {
            filename: self.filename.clone(),
            pos,
            error,
            excerpt,
        }))
    }

    /// [`CompilerContext::error`] located at `node`.
    pub fn error_at(&self, ast: &Ast, node: NodeId, error: MathlError) -> MathlError {
        self.error(Some(ast.pos(node)), error)
    }
}

impl Default for CompilerContext {
    fn default() -> Self {
        Self::new("", "(anonymous)")
    }
}
