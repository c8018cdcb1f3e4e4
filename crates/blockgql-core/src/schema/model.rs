//! Schema data model.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// GraphQL type kinds as reported by `__Type.kind`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TypeKind {
    Scalar,
    Object,
    Interface,
    Union,
    Enum,
    InputObject,
    List,
    NonNull,
}

impl TypeKind {
    /// Returns true for `LIST` and `NON_NULL`, which wrap another type.
    pub fn is_wrapping(self) -> bool {
        matches!(self, Self::List | Self::NonNull)
    }

    /// Returns true for kinds that carry output fields.
    pub fn has_fields(self) -> bool {
        matches!(self, Self::Object | Self::Interface)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Scalar => "SCALAR",
            Self::Object => "OBJECT",
            Self::Interface => "INTERFACE",
            Self::Union => "UNION",
            Self::Enum => "ENUM",
            Self::InputObject => "INPUT_OBJECT",
            Self::List => "LIST",
            Self::NonNull => "NON_NULL",
        }
    }
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A possibly wrapped reference to a named type.
///
/// Wrapping kinds chain through `of_type` until a terminal reference with a
/// name is reached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeRef {
    pub kind: TypeKind,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub of_type: Option<Box<TypeRef>>,
}

impl TypeRef {
    /// Terminal reference to a named type.
    pub fn named(kind: TypeKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: Some(name.into()),
            of_type: None,
        }
    }

    pub fn list(inner: TypeRef) -> Self {
        Self {
            kind: TypeKind::List,
            name: None,
            of_type: Some(Box::new(inner)),
        }
    }

    pub fn non_null(inner: TypeRef) -> Self {
        Self {
            kind: TypeKind::NonNull,
            name: None,
            of_type: Some(Box::new(inner)),
        }
    }
}

/// An argument accepted by a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgDef {
    pub name: String,
    pub ty: TypeRef,
}

/// An output field of an object or interface type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    pub name: String,
    pub ty: TypeRef,
    pub args: Vec<ArgDef>,
    pub description: Option<String>,
}

/// A named type of the schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDef {
    pub name: String,
    pub kind: TypeKind,
    /// Declared fields, in schema order. Empty unless `kind` has fields.
    pub fields: Vec<FieldDef>,
    pub description: Option<String>,
}

impl TypeDef {
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Root operation kinds a node tree can be compiled into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Query,
    Mutation,
}

impl OperationKind {
    pub fn keyword(self) -> &'static str {
        match self {
            Self::Query => "query",
            Self::Mutation => "mutation",
        }
    }
}

/// Normalized schema of a single endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    pub query_type: String,
    pub mutation_type: Option<String>,
    /// Types keyed by name, in the order the endpoint listed them.
    pub types: IndexMap<String, TypeDef>,
}

impl Schema {
    pub fn get_type(&self, name: &str) -> Option<&TypeDef> {
        self.types.get(name)
    }

    /// Returns the root type for an operation kind, if the schema defines one.
    pub fn root_type(&self, kind: OperationKind) -> Option<&TypeDef> {
        match kind {
            OperationKind::Query => self.get_type(&self.query_type),
            OperationKind::Mutation => self.mutation_type.as_deref().and_then(|n| self.get_type(n)),
        }
    }

    pub fn type_count(&self) -> usize {
        self.types.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_kind_wire_names() {
        let kind: TypeKind = serde_json::from_str("\"NON_NULL\"").unwrap();
        assert_eq!(kind, TypeKind::NonNull);
        let kind: TypeKind = serde_json::from_str("\"INPUT_OBJECT\"").unwrap();
        assert_eq!(kind, TypeKind::InputObject);
        assert_eq!(TypeKind::Object.to_string(), "OBJECT");
    }

    #[test]
    fn test_type_ref_deserializes_of_type_chain() {
        let json = serde_json::json!({
            "kind": "NON_NULL",
            "name": null,
            "ofType": {
                "kind": "LIST",
                "name": null,
                "ofType": { "kind": "OBJECT", "name": "Pokemon", "ofType": null }
            }
        });
        let parsed: TypeRef = serde_json::from_value(json).unwrap();
        assert_eq!(
            parsed,
            TypeRef::non_null(TypeRef::list(TypeRef::named(TypeKind::Object, "Pokemon")))
        );
    }

    #[test]
    fn test_root_type_lookup() {
        let mut types = IndexMap::new();
        types.insert(
            "Query".to_string(),
            TypeDef {
                name: "Query".into(),
                kind: TypeKind::Object,
                fields: Vec::new(),
                description: None,
            },
        );
        let schema = Schema {
            query_type: "Query".into(),
            mutation_type: Some("Mutation".into()),
            types,
        };
        assert_eq!(schema.root_type(OperationKind::Query).map(|t| t.name.as_str()), Some("Query"));
        // Declared but missing from the type list.
        assert!(schema.root_type(OperationKind::Mutation).is_none());
    }
}
