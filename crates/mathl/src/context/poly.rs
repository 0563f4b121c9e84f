//! Polymorphic function registry.
//!
//! Every overload is identified by a mangled key built from the function
//! name, the canonical return type and the canonical argument types. Two
//! registrations with the same resolved types share a key; the later one wins.

use tracing::trace;

use super::{CompilerContext, TypeRef};
use crate::{
    error::{MathlError, MathlResult},
    types::VarType,
};

/// One registered overload.
#[derive(Debug, Clone, PartialEq)]
pub struct PolySignature {
    pub name: String,
    pub ret: VarType,
    pub args: Vec<VarType>,
    pub key: String,
}

/// A type position in an overload registration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TypeArg<'a> {
    /// Wildcard filled in with the registration's context type
    Context,
    /// A registry type name
    Name(&'a str),
    Type(&'a VarType),
}

impl<'a> From<&'a str> for TypeArg<'a> {
    fn from(name: &'a str) -> Self {
        if name.is_empty() {
            TypeArg::Context
        } else {
            TypeArg::Name(name)
        }
    }
}

impl<'a> From<&'a VarType> for TypeArg<'a> {
    fn from(ty: &'a VarType) -> Self {
        TypeArg::Type(ty)
    }
}

/// Mangle an overload identity: `_name_ret_arg1_arg2...`.
pub fn build_poly_key(name: &str, ret: &VarType, args: &[VarType]) -> String {
    let name: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    let args: Vec<String> = args.iter().map(VarType::safe_name).collect();
    format!("_{}_{}_{}", name, ret.safe_name(), args.join("_"))
}

impl CompilerContext {
    /// Register an overload of `name` and return its mangled key.
    ///
    /// [`TypeArg::Context`] positions are replaced by `context`.
    pub fn add_poly_func<'a>(
        &mut self,
        name: &str,
        ret: impl Into<TypeArg<'a>>,
        args: &[TypeArg<'a>],
        context: Option<&VarType>,
    ) -> MathlResult<String> {
        let ret = self.resolve_arg(ret.into(), context)?;
        let args = args
            .iter()
            .map(|&arg| self.resolve_arg(arg, context))
            .collect::<MathlResult<Vec<_>>>()?;

        let key = build_poly_key(name, &ret, &args);
        trace!(key = %key, "register overload");

        self.poly_keymap.insert(
            key.clone(),
            PolySignature {
                name: name.to_string(),
                ret,
                args,
                key: key.clone(),
            },
        );
        let keys = self.poly_namemap.entry(name.to_string()).or_default();
        if !keys.contains(&key) {
            keys.push(key.clone());
        }
        Ok(key)
    }

    fn resolve_arg(&self, arg: TypeArg<'_>, context: Option<&VarType>) -> MathlResult<VarType> {
        match arg {
            TypeArg::Context => {
                let ty = context.ok_or_else(|| {
                    MathlError::invalid_argument("wildcard type without a context type")
                })?;
                self.resolve_type(TypeRef::Named(ty))
            }
            TypeArg::Name(name) => self.resolve_name(name),
            TypeArg::Type(ty) => self.resolve_type(TypeRef::Named(ty)),
        }
    }

    /// Signature registered under a mangled key.
    pub fn poly_signature(&self, key: &str) -> Option<&PolySignature> {
        self.poly_keymap.get(key)
    }

    /// Every overload of `name`, in registration order.
    pub fn overloads(&self, name: &str) -> Vec<&PolySignature> {
        self.poly_namemap
            .get(name)
            .map(|keys| keys.iter().filter_map(|k| self.poly_keymap.get(k)).collect())
            .unwrap_or_default()
    }

    pub fn has_function(&self, name: &str) -> bool {
        self.poly_namemap.contains_key(name)
    }

    /// The overload of `name` whose argument types match `args` exactly.
    pub fn find_overload(&self, name: &str, args: &[VarType]) -> MathlResult<Option<&PolySignature>> {
        let args = args
            .iter()
            .map(|a| self.resolve_type(TypeRef::Named(a)).map(|t| t.type_name()))
            .collect::<MathlResult<Vec<_>>>()?;

        Ok(self.overloads(name).into_iter().find(|sig| {
            sig.args.len() == args.len()
                && sig.args.iter().zip(&args).all(|(a, b)| &a.type_name() == b)
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_poly_key() {
        let float = VarType::named("float");
        let vec3 = VarType::aliased_array(float.clone(), 3, "vec3");
        assert_eq!(
            build_poly_key("dot", &float, &[vec3.clone(), vec3.clone()]),
            "_dot_float_vec3_vec3"
        );
        assert_eq!(
            build_poly_key("len", &float, &[VarType::array(float.clone(), 4)]),
            "_len_float_float_4_"
        );
    }

    #[test]
    fn test_mangling_is_deterministic() {
        let mut ctx = CompilerContext::default();
        let before = ctx.overloads("blend").len();
        assert_eq!(before, 0);

        let k1 = ctx
            .add_poly_func("blend", "vec3", &["vec3".into(), "float".into()], None)
            .unwrap();
        let k2 = ctx
            .add_poly_func("blend", "vec3", &["vec3".into(), "float".into()], None)
            .unwrap();
        let k3 = ctx
            .add_poly_func("blend", "vec3", &["vec3".into(), "vec3".into()], None)
            .unwrap();

        assert_eq!(k1, k2);
        assert_ne!(k1, k3);
        assert_eq!(ctx.overloads("blend").len(), 2);
        assert_eq!(ctx.poly_signature(&k1).map(|s| s.args.len()), Some(2));
    }

    #[test]
    fn test_context_wildcard() {
        let mut ctx = CompilerContext::default();
        let vec2 = ctx.resolve_name("vec2").unwrap();
        let key = ctx
            .add_poly_func("mix", "", &["".into(), "".into(), "float".into()], Some(&vec2))
            .unwrap();
        assert_eq!(key, "_mix_vec2_vec2_vec2_float");

        assert!(matches!(
            ctx.add_poly_func("mix", "", &[], None),
            Err(MathlError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_unknown_argument_type() {
        let mut ctx = CompilerContext::default();
        assert_eq!(
            ctx.add_poly_func("f", "float", &["vec9".into()], None),
            Err(MathlError::UnknownType("vec9".to_string()))
        );
        assert!(!ctx.has_function("f"));
    }

    #[test]
    fn test_find_overload() {
        let ctx = CompilerContext::default();
        let vec3 = VarType::named("vec3");
        let float = VarType::named("float");

        let sig = ctx
            .find_overload("dot", &[vec3.clone(), vec3.clone()])
            .unwrap()
            .unwrap();
        assert_eq!(sig.ret, float);

        let ctor = ctx
            .find_overload("vec3", &[VarType::named("vec2"), float.clone()])
            .unwrap();
        assert!(ctor.is_some());

        assert!(ctx.find_overload("dot", &[vec3, float]).unwrap().is_none());
    }
}
