//! Introspection query and response normalization.
//!
//! The endpoint answers the introspection query with a flat array of types.
//! [`parse_response`] turns that envelope into a [`Schema`] keyed by type
//! name, or reports the GraphQL `errors` the endpoint sent instead.

use indexmap::IndexMap;
use indexmap::map::Entry;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::model::{ArgDef, FieldDef, Schema, TypeDef, TypeKind, TypeRef};

/// Introspection document sent to every endpoint.
///
/// `TypeRef` nests seven levels deep, which covers shapes such as
/// `[[Int!]!]!` that real schemas use.
pub const INTROSPECTION_QUERY: &str = r#"query IntrospectionQuery {
  __schema {
    queryType { name }
    mutationType { name }
    types {
      kind
      name
      description
      fields(includeDeprecated: true) {
        name
        description
        args {
          name
          type { ...TypeRef }
        }
        type { ...TypeRef }
      }
    }
  }
}

fragment TypeRef on __Type {
  kind
  name
  ofType {
    kind
    name
    ofType {
      kind
      name
      ofType {
        kind
        name
        ofType {
          kind
          name
          ofType {
            kind
            name
            ofType {
              kind
              name
              ofType {
                kind
                name
              }
            }
          }
        }
      }
    }
  }
}
"#;

/// Why a response body did not yield a schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseProblem {
    /// The body carried a non-empty GraphQL `errors` array.
    Errors(Vec<String>),
    /// The body did not match the introspection envelope.
    Malformed(String),
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    errors: Option<Vec<ErrorEntry>>,
}

#[derive(Debug, Deserialize)]
struct ErrorEntry {
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IntrospectionData {
    #[serde(rename = "__schema")]
    schema: RawSchema,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSchema {
    query_type: RawRoot,
    #[serde(default)]
    mutation_type: Option<RawRoot>,
    types: Vec<RawType>,
}

#[derive(Debug, Deserialize)]
struct RawRoot {
    name: String,
}

#[derive(Debug, Deserialize)]
struct RawType {
    kind: TypeKind,
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    fields: Option<Vec<RawField>>,
}

#[derive(Debug, Deserialize)]
struct RawField {
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    args: Vec<RawArg>,
    #[serde(rename = "type")]
    ty: TypeRef,
}

#[derive(Debug, Deserialize)]
struct RawArg {
    name: String,
    #[serde(rename = "type")]
    ty: TypeRef,
}

/// Parses an introspection response body into a normalized schema.
pub fn parse_response(body: Value) -> Result<Schema, ResponseProblem> {
    let envelope: Envelope =
        serde_json::from_value(body).map_err(|e| ResponseProblem::Malformed(e.to_string()))?;

    if let Some(errors) = envelope.errors
        && !errors.is_empty()
    {
        let messages = errors
            .into_iter()
            .map(|e| e.message.unwrap_or_else(|| "unknown error".to_string()))
            .collect();
        return Err(ResponseProblem::Errors(messages));
    }

    let data = envelope
        .data
        .ok_or_else(|| ResponseProblem::Malformed("response has neither data nor errors".into()))?;
    let data: IntrospectionData =
        serde_json::from_value(data).map_err(|e| ResponseProblem::Malformed(e.to_string()))?;

    normalize(data.schema).map_err(ResponseProblem::Malformed)
}

fn normalize(raw: RawSchema) -> Result<Schema, String> {
    let mut types = IndexMap::with_capacity(raw.types.len());

    for raw_type in raw.types {
        let fields = if raw_type.kind.has_fields() {
            raw_type
                .fields
                .unwrap_or_default()
                .into_iter()
                .map(|f| FieldDef {
                    name: f.name,
                    ty: f.ty,
                    args: f
                        .args
                        .into_iter()
                        .map(|a| ArgDef {
                            name: a.name,
                            ty: a.ty,
                        })
                        .collect(),
                    description: f.description,
                })
                .collect()
        } else {
            Vec::new()
        };

        match types.entry(raw_type.name.clone()) {
            Entry::Occupied(_) => return Err(format!("duplicate type `{}`", raw_type.name)),
            Entry::Vacant(slot) => {
                slot.insert(TypeDef {
                    name: raw_type.name,
                    kind: raw_type.kind,
                    fields,
                    description: raw_type.description,
                });
            }
        }
    }

    debug!(
        types = types.len(),
        query_type = %raw.query_type.name,
        "Normalized introspection schema"
    );

    Ok(Schema {
        query_type: raw.query_type.name,
        mutation_type: raw.mutation_type.map(|m| m.name),
        types,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn scalar(name: &str) -> Value {
        json!({ "kind": "SCALAR", "name": name, "ofType": null })
    }

    fn sample() -> Value {
        json!({
            "data": {
                "__schema": {
                    "queryType": { "name": "Query" },
                    "mutationType": null,
                    "types": [
                        {
                            "kind": "OBJECT",
                            "name": "Query",
                            "description": null,
                            "fields": [{
                                "name": "pokemon",
                                "description": "Look up a pokemon",
                                "args": [{ "name": "id", "type": scalar("ID") }],
                                "type": { "kind": "OBJECT", "name": "Pokemon", "ofType": null }
                            }]
                        },
                        {
                            "kind": "OBJECT",
                            "name": "Pokemon",
                            "description": "A pocket monster",
                            "fields": [
                                { "name": "name", "args": [], "type": scalar("String") },
                                { "name": "weight", "args": [], "type": scalar("Int") }
                            ]
                        },
                        { "kind": "SCALAR", "name": "String", "fields": null },
                        { "kind": "ENUM", "name": "Color", "fields": [] }
                    ]
                }
            }
        })
    }

    #[test]
    fn test_parse_normalizes_types_by_name() {
        let schema = parse_response(sample()).unwrap();
        assert_eq!(schema.query_type, "Query");
        assert_eq!(schema.mutation_type, None);
        assert_eq!(schema.type_count(), 4);

        let pokemon = schema.get_type("Pokemon").unwrap();
        assert_eq!(pokemon.kind, TypeKind::Object);
        let names: Vec<&str> = pokemon.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["name", "weight"]);

        let query = schema.get_type("Query").unwrap();
        assert_eq!(query.fields[0].args[0].name, "id");
        assert_eq!(query.fields[0].description.as_deref(), Some("Look up a pokemon"));
    }

    #[test]
    fn test_non_object_kinds_carry_no_fields() {
        let schema = parse_response(sample()).unwrap();
        assert!(schema.get_type("String").unwrap().fields.is_empty());
        assert!(schema.get_type("Color").unwrap().fields.is_empty());
    }

    #[test]
    fn test_errors_array_is_reported() {
        let body = json!({ "errors": [{ "message": "introspection is disabled" }] });
        assert_eq!(
            parse_response(body),
            Err(ResponseProblem::Errors(vec!["introspection is disabled".into()]))
        );
    }

    #[test]
    fn test_empty_errors_array_is_ignored() {
        let mut body = sample();
        body["errors"] = json!([]);
        assert!(parse_response(body).is_ok());
    }

    #[test]
    fn test_missing_data_is_malformed() {
        assert!(matches!(
            parse_response(json!({})),
            Err(ResponseProblem::Malformed(_))
        ));
        assert!(matches!(
            parse_response(json!({ "data": { "__schema": { "types": [] } } })),
            Err(ResponseProblem::Malformed(_))
        ));
    }

    #[test]
    fn test_duplicate_type_names_are_malformed() {
        let mut body = sample();
        body["data"]["__schema"]["types"]
            .as_array_mut()
            .unwrap()
            .push(json!({ "kind": "SCALAR", "name": "String" }));
        assert_eq!(
            parse_response(body),
            Err(ResponseProblem::Malformed("duplicate type `String`".into()))
        );
    }
}
