//! Builtin types and function overloads.

use tracing::debug;

use super::{CompilerContext, TypeArg};
use crate::types::VarType;

/// Scalar and vector type names indexed by component count.
const WIDTHS: [&str; 5] = ["", "float", "vec2", "vec3", "vec4"];

/// Elementwise math functions and their arity, registered at every width.
const ELEMENTWISE: &[(&str, usize)] = &[
    ("min", 2),
    ("max", 2),
    ("fract", 1),
    ("step", 2),
    ("cos", 1),
    ("sin", 1),
    ("floor", 1),
    ("ceil", 1),
    ("mod", 2),
    ("sqrt", 1),
    ("pow", 2),
    ("log", 1),
];

impl CompilerContext {
    /// Clear every table and seed the builtin types and overloads.
    pub fn reset(&mut self) {
        self.types.clear();
        self.poly_keymap.clear();
        self.poly_namemap.clear();
        self.scopes.clear();
        self.inputs.clear();
        self.outputs.clear();
        self.uniforms.clear();

        self.add_type("void", VarType::named("void"));
        let float = self.add_type("float", VarType::named("float"));
        self.add_type("int", VarType::named("int"));
        self.add_type("bool", VarType::named("bool"));
        self.add_type("vec2", VarType::aliased_array(float.clone(), 2, "vec2"));
        let vec3 = self.add_type("vec3", VarType::aliased_array(float.clone(), 3, "vec3"));
        let vec4 = self.add_type("vec4", VarType::aliased_array(float, 4, "vec4"));
        self.add_type("mat3", VarType::aliased_array(vec3, 3, "mat3"));
        self.add_type("mat4", VarType::aliased_array(vec4, 4, "mat4"));

        for width in 1..WIDTHS.len() {
            for parts in compositions(width) {
                let args: Vec<TypeArg<'_>> =
                    parts.iter().map(|&p| TypeArg::Name(WIDTHS[p])).collect();
                self.register_builtin(WIDTHS[width], TypeArg::Name(WIDTHS[width]), &args, None);
            }
        }

        for width in 2..WIDTHS.len() {
            let context = VarType::named(WIDTHS[width]);
            let ctx_ty = Some(&context);
            self.register_builtin("normalize", TypeArg::Context, &[TypeArg::Context], ctx_ty);
            self.register_builtin(
                "dot",
                TypeArg::Name("float"),
                &[TypeArg::Context, TypeArg::Context],
                ctx_ty,
            );
            self.register_builtin(
                "cross",
                TypeArg::Context,
                &[TypeArg::Context, TypeArg::Context],
                ctx_ty,
            );
        }

        for name in &WIDTHS[1..] {
            let context = VarType::named(*name);
            for &(func, arity) in ELEMENTWISE {
                let args = vec![TypeArg::Context; arity];
                self.register_builtin(func, TypeArg::Context, &args, Some(&context));
            }
        }

        debug!(
            types = self.types.len(),
            overloads = self.poly_keymap.len(),
            "seeded builtins"
        );
    }

    fn register_builtin(
        &mut self,
        name: &str,
        ret: TypeArg<'_>,
        args: &[TypeArg<'_>],
        context: Option<&VarType>,
    ) {
        // only fails on unregistered type names
        if let Err(err) = self.add_poly_func(name, ret, args, context) {
            debug!(func = name, error = %err, "builtin registration failed");
        }
    }
}

/// Every ordered way to split `width` components into parts of 1..=width.
fn compositions(width: usize) -> Vec<Vec<usize>> {
    if width == 0 {
        return vec![Vec::new()];
    }
    let mut out = Vec::new();
    for first in 1..=width {
        for mut rest in compositions(width - first) {
            rest.insert(0, first);
            out.push(rest);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compositions() {
        assert_eq!(compositions(1), vec![vec![1]]);
        assert_eq!(compositions(2), vec![vec![1, 1], vec![2]]);
        assert_eq!(compositions(3).len(), 4);
        assert_eq!(compositions(4).len(), 8);
        assert!(compositions(3).contains(&vec![2, 1]));
        assert!(compositions(3).contains(&vec![1, 2]));
    }

    #[test]
    fn test_constructor_overloads() {
        let ctx = CompilerContext::default();
        assert_eq!(ctx.overloads("vec3").len(), 4);
        assert_eq!(ctx.overloads("vec4").len(), 8);
        assert_eq!(ctx.overloads("float").len(), 1);

        let keys: Vec<&str> = ctx
            .overloads("vec3")
            .into_iter()
            .map(|s| s.key.as_str())
            .collect();
        assert!(keys.contains(&"_vec3_vec3_float_float_float"));
        assert!(keys.contains(&"_vec3_vec3_vec2_float"));
        assert!(keys.contains(&"_vec3_vec3_float_vec2"));
        assert!(keys.contains(&"_vec3_vec3_vec3"));
    }

    #[test]
    fn test_math_overloads() {
        let ctx = CompilerContext::default();
        assert_eq!(ctx.overloads("sin").len(), 4);
        assert!(ctx.poly_signature("_pow_vec2_vec2_vec2").is_some());
        assert!(ctx.poly_signature("_sqrt_float_float").is_some());
        assert!(ctx.poly_signature("_dot_float_vec4_vec4").is_some());
        assert!(ctx.poly_signature("_normalize_vec3_vec3").is_some());
        assert!(ctx.poly_signature("_cross_vec2_vec2_vec2").is_some());
        // vector ops are not registered for scalars
        assert!(ctx.poly_signature("_dot_float_float_float").is_none());
    }

    #[test]
    fn test_reset_clears_declarations() {
        let mut ctx = CompilerContext::default();
        ctx.add_poly_func("user", "float", &[], None).unwrap();
        ctx.add_type("quat", VarType::named("quat"));
        ctx.reset();
        assert!(!ctx.has_function("user"));
        assert!(!ctx.has_type("quat"));
        assert!(ctx.has_type("mat4"));
    }
}
