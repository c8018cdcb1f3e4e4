use std::collections::HashMap;
use std::sync::Arc;

use blockgql_core::node::persist::{tree_from_xml, tree_to_xml};
use blockgql_core::{
    BoundValue, CacheError, FetchError, GraphQlClient, HttpTransport, NodeCondition, NodeState,
    OperationKind, OperationResponse, QueryNode, Revalidation, SchemaCache, SchemaSynchronizer,
    TransportConfig, TransportError, Workspace, compile, compile_operation,
};
use serde_json::{Value, json};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn scalar(name: &str) -> Value {
    json!({ "kind": "SCALAR", "name": name, "ofType": null })
}

fn object_ref(name: &str) -> Value {
    json!({ "kind": "OBJECT", "name": name, "ofType": null })
}

fn introspection(pokemon_kind: &str) -> Value {
    let pokemon = if pokemon_kind == "OBJECT" {
        json!({
            "kind": "OBJECT",
            "name": "Pokemon",
            "description": "A pocket monster",
            "fields": [
                { "name": "name", "args": [], "type": scalar("String") },
                { "name": "weight", "args": [], "type": scalar("Int") },
                {
                    "name": "evolutions",
                    "args": [],
                    "type": {
                        "kind": "NON_NULL",
                        "name": null,
                        "ofType": { "kind": "LIST", "name": null, "ofType": object_ref("Pokemon") }
                    }
                }
            ]
        })
    } else {
        json!({ "kind": pokemon_kind, "name": "Pokemon", "fields": null })
    };

    json!({
        "data": {
            "__schema": {
                "queryType": { "name": "Query" },
                "mutationType": { "name": "Mutation" },
                "types": [
                    {
                        "kind": "OBJECT",
                        "name": "Query",
                        "fields": [{
                            "name": "pokemon",
                            "description": "Look up a pokemon",
                            "args": [{
                                "name": "id",
                                "type": { "kind": "NON_NULL", "name": null, "ofType": scalar("ID") }
                            }],
                            "type": object_ref("Pokemon")
                        }]
                    },
                    {
                        "kind": "OBJECT",
                        "name": "Mutation",
                        "fields": [{
                            "name": "rename",
                            "args": [{ "name": "name", "type": scalar("String") }],
                            "type": object_ref("Pokemon")
                        }]
                    },
                    pokemon,
                    { "kind": "SCALAR", "name": "String" },
                    { "kind": "SCALAR", "name": "Int" },
                    { "kind": "SCALAR", "name": "ID" }
                ]
            }
        }
    })
}

async fn mount_schema(server: &MockServer, body: Value) {
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(body_partial_json(json!({ "variables": {} })))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

fn transport() -> Arc<HttpTransport> {
    let config = TransportConfig {
        timeout_secs: 5,
        user_agent: "blockgql-tests".into(),
        headers: HashMap::from([("X-Client".to_string(), "blocks".to_string())]),
    };
    Arc::new(HttpTransport::from_config(&config).unwrap())
}

#[tokio::test]
async fn test_fetch_populates_cache() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(header("x-client", "blocks"))
        .and(header("user-agent", "blockgql-tests"))
        .respond_with(ResponseTemplate::new(200).set_body_json(introspection("OBJECT")))
        .expect(1)
        .mount(&server)
        .await;

    let endpoint = format!("{}/graphql", server.uri());
    let cache = SchemaCache::new();
    let schema = cache.fetch(transport().as_ref(), &endpoint, &[]).await.unwrap();

    assert_eq!(schema.query_type, "Query");
    assert_eq!(schema.mutation_type.as_deref(), Some("Mutation"));
    assert!(cache.contains(&endpoint));

    let roots = cache.root_suggestions(&endpoint, OperationKind::Query).unwrap();
    assert_eq!(roots.len(), 1);
    assert_eq!(roots[0].field_name, "pokemon");
    assert_eq!(roots[0].parameters[0].type_name, "ID");
    let mutations = cache.root_suggestions(&endpoint, OperationKind::Mutation).unwrap();
    assert_eq!(mutations[0].field_name, "rename");
}

#[tokio::test]
async fn test_schema_errors_leave_cache_untouched() {
    let server = MockServer::start().await;
    mount_schema(&server, introspection("OBJECT")).await;
    let endpoint = format!("{}/graphql", server.uri());
    let cache = Arc::new(SchemaCache::new());
    let transport = transport();
    cache.fetch(transport.as_ref(), &endpoint, &[]).await.unwrap();

    server.reset().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(json!({ "errors": [{ "message": "introspection disabled" }] })),
        )
        .mount(&server)
        .await;

    let err = cache.fetch(transport.as_ref(), &endpoint, &[]).await.unwrap_err();
    let CacheError::Schema(err) = err else {
        panic!("expected schema errors, got {err:?}");
    };
    assert_eq!(err.messages, ["introspection disabled"]);
    assert!(cache.get(&endpoint).unwrap().get_type("Pokemon").is_some());
}

#[tokio::test]
async fn test_http_failure_is_fetch_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
        .mount(&server)
        .await;
    let endpoint = format!("{}/graphql", server.uri());

    let err = SchemaCache::new()
        .fetch(transport().as_ref(), &endpoint, &[])
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CacheError::Fetch(FetchError::Transport(TransportError::Status { status: 503, .. }))
    ));
}

#[tokio::test]
async fn test_refresh_marks_changed_types_stale() {
    let server = MockServer::start().await;
    mount_schema(&server, introspection("OBJECT")).await;
    let endpoint = format!("{}/graphql", server.uri());
    let transport = transport();

    let sync = SchemaSynchronizer::new(Arc::new(SchemaCache::new()));
    let mut ws = Workspace::new();

    let mut pokemon = QueryNode::object(&endpoint, "pokemon", "Pokemon").with_parameter("id", "ID");
    pokemon.bind_parameter(0, Some(BoundValue::Text("25".into())));
    pokemon.push_child(QueryNode::scalar(&endpoint, "name", "String")).unwrap();
    let id = ws.add_root(pokemon);

    let report = sync.refresh(transport.as_ref(), &endpoint, &[], &mut ws).await.unwrap();
    assert_eq!(report.bound, 2);
    let Some(Revalidation::Bound { suggestions }) = ws.last_result(id) else {
        panic!("pokemon should be bound");
    };
    assert_eq!(suggestions.len(), 3);
    assert!(suggestions[2].is_object);

    server.reset().await;
    mount_schema(&server, introspection("SCALAR")).await;
    let report = sync.refresh(transport.as_ref(), &endpoint, &[], &mut ws).await.unwrap();
    assert_eq!(report.stale, 1);

    let node = ws.find(id).unwrap();
    assert_eq!(
        node.state(),
        &NodeState::Stale(NodeCondition::KindMismatch {
            type_name: "Pokemon".into(),
            expected_object: true,
            found: blockgql_core::TypeKind::Scalar,
        })
    );
    assert_eq!(node.child_count(), 1);
    assert_eq!(
        compile(node).render(),
        "pokemon(id: \"25\") {\n  name\n}\n"
    );
}

#[tokio::test]
async fn test_persisted_tree_executes() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(body_partial_json(json!({
            "query": "query {\n  pokemon(id: \"25\") {\n  name\n}\n\n}\n"
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "data": { "pokemon": { "name": "Pikachu" } } })),
        )
        .expect(1)
        .mount(&server)
        .await;
    let endpoint = format!("{}/graphql", server.uri());

    let mut pokemon = QueryNode::object(&endpoint, "pokemon", "Pokemon").with_parameter("id", "ID");
    pokemon.bind_parameter(0, Some(BoundValue::Text("25".into())));
    pokemon.push_child(QueryNode::scalar(&endpoint, "name", "String")).unwrap();
    pokemon.add_child(1).unwrap();

    let restored = tree_from_xml(&tree_to_xml(&pokemon).unwrap()).unwrap();
    let document = compile_operation(OperationKind::Query, None, &[restored]).render();

    let client = GraphQlClient::new(transport(), &endpoint);
    let response = client.query("pokemon", &document).await.unwrap();
    assert_eq!(
        response,
        OperationResponse::Data(json!({ "pokemon": { "name": "Pikachu" } }))
    );
}
