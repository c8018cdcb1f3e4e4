//! Child suggestions derived from the schema.
//!
//! An editor offers the fields of an object type as ready-made nodes. The
//! list is recomputed from the current schema snapshot on every request.

use std::slice;

use serde::Serialize;
use tracing::warn;

use crate::schema::{FieldDef, Primitive, TypeDef, TypeKind, resolve_base, scalar_to_primitive};

/// A field argument as offered in a suggestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParameterTemplate {
    pub name: String,
    /// Base type of the argument.
    pub type_name: String,
    /// Value category for built-in scalars; `None` for enums, input objects
    /// and custom scalars.
    pub primitive: Option<Primitive>,
}

/// Everything needed to instantiate a [`crate::QueryNode`] for a field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeTemplate {
    pub endpoint: String,
    pub field_name: String,
    pub base_type_name: String,
    pub is_object: bool,
    pub parameters: Vec<ParameterTemplate>,
    pub description: Option<String>,
}

/// Produces suggestion lists for an `(endpoint, type name)` pair.
pub trait SuggestionSource {
    /// Returns `None` when the endpoint has no schema or the type is unknown.
    fn suggestions(&self, endpoint: &str, type_name: &str) -> Option<Vec<NodeTemplate>>;
}

/// Lazy iterator over the templates for a type's fields, in declaration order.
///
/// Fields whose type reference cannot be resolved are skipped.
#[derive(Debug, Clone)]
pub struct Suggestions<'a> {
    endpoint: &'a str,
    fields: slice::Iter<'a, FieldDef>,
}

/// Starts a fresh pass over the fields of `type_def`.
pub fn regenerate_suggestions<'a>(endpoint: &'a str, type_def: &'a TypeDef) -> Suggestions<'a> {
    Suggestions {
        endpoint,
        fields: type_def.fields.iter(),
    }
}

impl Suggestions<'_> {
    fn template(&self, field: &FieldDef) -> Option<NodeTemplate> {
        let (base_name, base_kind) = match resolve_base(&field.ty) {
            Ok(base) => base,
            Err(e) => {
                warn!(field = %field.name, error = %e, "Skipping field with unresolvable type");
                return None;
            }
        };

        let mut parameters = Vec::with_capacity(field.args.len());
        for arg in &field.args {
            match resolve_base(&arg.ty) {
                Ok((type_name, kind)) => parameters.push(ParameterTemplate {
                    name: arg.name.clone(),
                    type_name: type_name.to_string(),
                    primitive: scalar_to_primitive(kind, type_name),
                }),
                Err(e) => {
                    warn!(
                        field = %field.name,
                        argument = %arg.name,
                        error = %e,
                        "Skipping field with unresolvable argument type"
                    );
                    return None;
                }
            }
        }

        Some(NodeTemplate {
            endpoint: self.endpoint.to_string(),
            field_name: field.name.clone(),
            base_type_name: base_name.to_string(),
            is_object: base_kind == TypeKind::Object,
            parameters,
            description: field.description.clone(),
        })
    }
}

impl Iterator for Suggestions<'_> {
    type Item = NodeTemplate;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let field = self.fields.next()?;
            if let Some(template) = self.template(field) {
                return Some(template);
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, self.fields.size_hint().1)
    }
}
