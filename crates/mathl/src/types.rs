//! MathL type system.
//!
//! Types are plain values: a named scalar/user type, a fixed-size array of an
//! element type (vectors and matrices are aliased arrays), or an unsized
//! array. Identity is the canonical [`VarType::type_name`] after resolution
//! through the compiler context's type registry; aliases only change display.

use std::fmt;

/// A MathL type value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VarType {
    /// Scalar or user type identified by name (`float`, `int`, `vec3` before resolution)
    Named(String),
    /// Fixed-size array, e.g. `vec3` is `Array(float, 3, alias "vec3")`
    Array {
        elem: Box<VarType>,
        size: usize,
        alias: Option<String>,
    },
    /// Unsized array (`float v[]`)
    DynamicArray {
        elem: Box<VarType>,
        alias: Option<String>,
    },
}

/// Default value of a type, as used to initialise uniforms.
#[derive(Debug, Clone, PartialEq)]
pub enum ZeroValue {
    Scalar(f64),
    Seq(Vec<ZeroValue>),
}

impl VarType {
    pub fn named(name: impl Into<String>) -> Self {
        VarType::Named(name.into())
    }

    pub fn array(elem: VarType, size: usize) -> Self {
        VarType::Array {
            elem: Box::new(elem),
            size,
            alias: None,
        }
    }

    /// Fixed-size array displayed under `alias` (how vectors and matrices are declared).
    pub fn aliased_array(elem: VarType, size: usize, alias: impl Into<String>) -> Self {
        VarType::Array {
            elem: Box::new(elem),
            size,
            alias: Some(alias.into()),
        }
    }

    pub fn dynamic_array(elem: VarType) -> Self {
        VarType::DynamicArray {
            elem: Box::new(elem),
            alias: None,
        }
    }

    /// Canonical name of the type: the alias if present, otherwise the structural form.
    pub fn type_name(&self) -> String {
        match self {
            VarType::Named(name) => name.clone(),
            VarType::Array { alias: Some(alias), .. }
            | VarType::DynamicArray { alias: Some(alias), .. } => alias.clone(),
            VarType::Array { elem, size, .. } => format!("{}[{}]", elem.type_name(), size),
            VarType::DynamicArray { elem, .. } => format!("{}[]", elem.type_name()),
        }
    }

    /// Type name with every non-identifier character replaced by `_`.
    ///
    /// Used when the name becomes part of a mangled overload key.
    pub fn safe_name(&self) -> String {
        self.type_name()
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
            .collect()
    }

    /// Name of the innermost element type (`float` for `mat4`).
    pub fn base_name(&self) -> &str {
        match self {
            VarType::Named(name) => name,
            VarType::Array { elem, .. } | VarType::DynamicArray { elem, .. } => elem.base_name(),
        }
    }

    pub fn zero_value(&self) -> ZeroValue {
        match self {
            VarType::Named(_) => ZeroValue::Scalar(0.0),
            VarType::Array { elem, size, .. } => {
                ZeroValue::Seq((0..*size).map(|_| elem.zero_value()).collect())
            }
            VarType::DynamicArray { .. } => ZeroValue::Seq(Vec::new()),
        }
    }

    pub fn is_array(&self) -> bool {
        !matches!(self, VarType::Named(_))
    }

    /// Element type of an array type.
    pub fn element(&self) -> Option<&VarType> {
        match self {
            VarType::Named(_) => None,
            VarType::Array { elem, .. } | VarType::DynamicArray { elem, .. } => Some(elem),
        }
    }

    /// Number of elements of a fixed-size array.
    pub fn size(&self) -> Option<usize> {
        match self {
            VarType::Array { size, .. } => Some(*size),
            _ => None,
        }
    }
}

impl fmt::Display for VarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.type_name())
    }
}

impl ZeroValue {
    /// Number of scalar leaves.
    pub fn len(&self) -> usize {
        match self {
            ZeroValue::Scalar(_) => 1,
            ZeroValue::Seq(items) => items.iter().map(ZeroValue::len).sum(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Renders as a JavaScript literal: `0`, `[0,0,0]`, `[[0,0],[0,0]]`.
impl fmt::Display for ZeroValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ZeroValue::Scalar(v) => write!(f, "{}", v),
            ZeroValue::Seq(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vec3() -> VarType {
        VarType::aliased_array(VarType::named("float"), 3, "vec3")
    }

    #[test]
    fn test_type_name() {
        assert_eq!(VarType::named("float").type_name(), "float");
        assert_eq!(vec3().type_name(), "vec3");
        assert_eq!(VarType::array(VarType::named("int"), 4).type_name(), "int[4]");
        assert_eq!(
            VarType::dynamic_array(VarType::named("float")).type_name(),
            "float[]"
        );
    }

    #[test]
    fn test_type_name_is_stable() {
        let ty = VarType::array(vec3(), 2);
        assert_eq!(ty.type_name(), ty.type_name());
        assert_eq!(ty.type_name(), "vec3[2]");
    }

    #[test]
    fn test_safe_name() {
        assert_eq!(VarType::array(VarType::named("int"), 4).safe_name(), "int_4_");
        assert_eq!(vec3().safe_name(), "vec3");
    }

    #[test]
    fn test_base_name() {
        let mat3 = VarType::aliased_array(vec3(), 3, "mat3");
        assert_eq!(mat3.base_name(), "float");
        assert_eq!(VarType::named("vec2").base_name(), "vec2");
    }

    #[test]
    fn test_zero_value() {
        assert_eq!(VarType::named("float").zero_value(), ZeroValue::Scalar(0.0));
        assert_eq!(format!("{}", vec3().zero_value()), "[0,0,0]");

        let mat2 = VarType::array(VarType::array(VarType::named("float"), 2), 2);
        assert_eq!(format!("{}", mat2.zero_value()), "[[0,0],[0,0]]");
        assert_eq!(mat2.zero_value().len(), 4);

        let dynamic = VarType::dynamic_array(VarType::named("float"));
        assert!(dynamic.zero_value().is_empty());
    }

    #[test]
    fn test_element_and_size() {
        assert_eq!(vec3().element(), Some(&VarType::named("float")));
        assert_eq!(vec3().size(), Some(3));
        assert!(vec3().is_array());
        assert!(!VarType::named("float").is_array());
        assert_eq!(VarType::named("float").element(), None);
    }
}
