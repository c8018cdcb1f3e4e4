//! Type reference resolution.
//!
//! Field and argument types arrive wrapped in `LIST` / `NON_NULL` layers.
//! Nodes only care about the innermost named type and, for scalars, which
//! primitive category a bound value has to be stringified as.

use serde::{Deserialize, Serialize};

use super::model::{TypeKind, TypeRef};
use crate::error::UnresolvableTypeError;

/// Upper bound on wrapping layers accepted before giving up.
pub const MAX_WRAPPING_DEPTH: usize = 32;

/// Primitive value categories understood by the host interpreter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Primitive {
    Number,
    Text,
    Boolean,
}

impl Primitive {
    /// Coercion tag as written in the host plan.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Number => "number",
            Self::Text => "text",
            Self::Boolean => "boolean",
        }
    }
}

/// Unwraps `LIST` / `NON_NULL` layers and returns the base type name and kind.
///
/// The returned kind is never a wrapping kind.
pub fn resolve_base(type_ref: &TypeRef) -> Result<(&str, TypeKind), UnresolvableTypeError> {
    let mut current = type_ref;
    for _ in 0..MAX_WRAPPING_DEPTH {
        if !current.kind.is_wrapping() {
            return match current.name.as_deref() {
                Some(name) => Ok((name, current.kind)),
                None => Err(UnresolvableTypeError::Unnamed { kind: current.kind }),
            };
        }
        current = current
            .of_type
            .as_deref()
            .ok_or(UnresolvableTypeError::MissingInner { kind: current.kind })?;
    }
    Err(UnresolvableTypeError::TooDeep {
        depth: MAX_WRAPPING_DEPTH,
    })
}

/// Maps a built-in scalar to its primitive category.
///
/// Enums, objects and custom scalars have no primitive category.
pub fn scalar_to_primitive(kind: TypeKind, name: &str) -> Option<Primitive> {
    if kind != TypeKind::Scalar {
        return None;
    }
    match name {
        "Int" | "Float" => Some(Primitive::Number),
        "ID" | "String" => Some(Primitive::Text),
        "Boolean" => Some(Primitive::Boolean),
        _ => None,
    }
}
