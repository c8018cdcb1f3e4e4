//! Revalidation of live nodes against the schema cache.
//!
//! [`SchemaSynchronizer`] owns a handle to the [`SchemaCache`] and moves
//! nodes between `Unbound`, `Bound` and `Stale`. It never edits a node's
//! parameters or child slots; a node whose type changed underneath it keeps
//! its structure and carries a [`NodeCondition`] instead.
//!
//! Live nodes are enumerated by an [`EditorSurface`]. Notifications for a
//! sync pass are collected while the surface is being walked and delivered
//! once the walk is over.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::{CacheError, MutationError};
use crate::node::suggestions::{NodeTemplate, regenerate_suggestions};
use crate::node::{NodeCondition, NodeId, NodeState, QueryNode};
use crate::schema::{FetchOutcome, SchemaCache, TypeKind};
use crate::transport::Transport;

/// Result of revalidating one node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Revalidation {
    /// The endpoint has no schema yet; the node was left alone.
    NoSchema,
    Stale(NodeCondition),
    /// The node matches its type. Object nodes get the current suggestions.
    Bound { suggestions: Vec<NodeTemplate> },
}

/// The editor's view of its live nodes.
pub trait EditorSurface {
    /// Calls `visit` once for every live node bound to `endpoint`.
    fn visit_live_nodes(&mut self, endpoint: &str, visit: &mut dyn FnMut(&mut QueryNode));

    fn on_revalidated(&mut self, _node: NodeId, _result: &Revalidation) {}

    fn on_node_created(&mut self, _node: NodeId) {}

    fn on_node_structure_changed(&mut self, _node: NodeId) {}
}

/// Counts for one sync pass over an endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub endpoint: String,
    pub bound: usize,
    pub stale: usize,
    pub unbound: usize,
}

impl SyncReport {
    pub fn visited(&self) -> usize {
        self.bound + self.stale + self.unbound
    }
}

pub struct SchemaSynchronizer {
    cache: Arc<SchemaCache>,
}

impl SchemaSynchronizer {
    pub fn new(cache: Arc<SchemaCache>) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &Arc<SchemaCache> {
        &self.cache
    }

    /// Re-resolves `node` against the cached schema for its endpoint.
    ///
    /// Idempotent: with an unchanged schema a second call yields the same
    /// state and the same suggestions.
    pub fn revalidate(&self, node: &mut QueryNode) -> Revalidation {
        let Some(schema) = self.cache.get(node.endpoint()) else {
            return Revalidation::NoSchema;
        };

        let resolved = match schema.get_type(node.base_type_name()) {
            None => Err(NodeCondition::TypeRemoved {
                endpoint: node.endpoint().to_string(),
                type_name: node.base_type_name().to_string(),
            }),
            Some(type_def) if (type_def.kind == TypeKind::Object) != node.is_object() => {
                Err(NodeCondition::KindMismatch {
                    type_name: node.base_type_name().to_string(),
                    expected_object: node.is_object(),
                    found: type_def.kind,
                })
            }
            Some(type_def) => Ok(type_def),
        };

        let type_def = match resolved {
            Ok(type_def) => type_def,
            Err(condition) => {
                if !matches!(node.state(), NodeState::Stale(c) if *c == condition) {
                    warn!(
                        endpoint = %node.endpoint(),
                        field = %node.field_name(),
                        %condition,
                        "Node is stale"
                    );
                }
                node.set_state(NodeState::Stale(condition.clone()));
                return Revalidation::Stale(condition);
            }
        };

        if node.state() != &NodeState::Bound {
            debug!(
                endpoint = %node.endpoint(),
                field = %node.field_name(),
                type_name = %type_def.name,
                "Node bound"
            );
        }
        node.set_state(NodeState::Bound);
        node.set_type_description(type_def.description.clone());

        let suggestions = if node.is_object() {
            regenerate_suggestions(node.endpoint(), type_def).collect()
        } else {
            Vec::new()
        };
        Revalidation::Bound { suggestions }
    }

    /// Revalidates every live node bound to `endpoint`.
    pub fn sync_endpoint(&self, endpoint: &str, surface: &mut dyn EditorSurface) -> SyncReport {
        let mut results: Vec<(NodeId, Revalidation)> = Vec::new();
        surface.visit_live_nodes(endpoint, &mut |node| {
            if node.endpoint() == endpoint {
                results.push((node.id(), self.revalidate(node)));
            }
        });

        let mut report = SyncReport {
            endpoint: endpoint.to_string(),
            ..SyncReport::default()
        };
        for (id, result) in &results {
            match result {
                Revalidation::NoSchema => report.unbound += 1,
                Revalidation::Stale(_) => report.stale += 1,
                Revalidation::Bound { .. } => report.bound += 1,
            }
            surface.on_revalidated(*id, result);
        }

        info!(
            endpoint = %endpoint,
            bound = report.bound,
            stale = report.stale,
            unbound = report.unbound,
            "Synchronized nodes"
        );
        report
    }

    /// Consumes a fetch outcome.
    ///
    /// A loaded schema triggers a sync pass; failures are returned without
    /// touching any node.
    pub fn apply(
        &self,
        endpoint: &str,
        outcome: FetchOutcome,
        surface: &mut dyn EditorSurface,
    ) -> Result<SyncReport, CacheError> {
        outcome.into_result()?;
        Ok(self.sync_endpoint(endpoint, surface))
    }

    /// Fetches the schema for `endpoint` and synchronizes the surface with it.
    pub async fn refresh(
        &self,
        transport: &dyn Transport,
        endpoint: &str,
        headers: &[(String, String)],
        surface: &mut dyn EditorSurface,
    ) -> Result<SyncReport, CacheError> {
        let outcome = self.cache.load(transport, endpoint, headers).await;
        self.apply(endpoint, outcome, surface)
    }

    /// Instantiates a suggestion and validates it right away.
    pub fn create_node(&self, template: &NodeTemplate, surface: &mut dyn EditorSurface) -> QueryNode {
        let mut node = QueryNode::from_template(template);
        let result = self.revalidate(&mut node);
        surface.on_node_created(node.id());
        surface.on_revalidated(node.id(), &result);
        node
    }

    /// Inserts a node built from `template` as child `index` of `parent`.
    pub fn insert_child(
        &self,
        parent: &mut QueryNode,
        index: usize,
        template: &NodeTemplate,
        surface: &mut dyn EditorSurface,
    ) -> Result<NodeId, MutationError> {
        let slot = parent.add_child(index)?;
        let child = self.create_node(template, surface);
        let id = child.id();
        *slot = Some(child);
        surface.on_node_structure_changed(parent.id());
        Ok(id)
    }
}

/// Notification recorded by a [`Workspace`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceEvent {
    Created(NodeId),
    StructureChanged(NodeId),
    Revalidated(NodeId),
}

/// In-memory editor surface holding root nodes.
#[derive(Debug, Default)]
pub struct Workspace {
    roots: Vec<QueryNode>,
    last_results: HashMap<NodeId, Revalidation>,
    events: Vec<SurfaceEvent>,
}

impl Workspace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_root(&mut self, node: QueryNode) -> NodeId {
        let id = node.id();
        self.roots.push(node);
        self.on_node_created(id);
        id
    }

    pub fn roots(&self) -> &[QueryNode] {
        &self.roots
    }

    pub fn find(&self, id: NodeId) -> Option<&QueryNode> {
        self.roots.iter().find_map(|root| root.find(id))
    }

    /// Applies `edit` to the node `id` and records a structure change.
    pub fn mutate<R>(&mut self, id: NodeId, edit: impl FnOnce(&mut QueryNode) -> R) -> Option<R> {
        let node = self.roots.iter_mut().find_map(|root| root.find_mut(id))?;
        let result = edit(node);
        self.on_node_structure_changed(id);
        Some(result)
    }

    /// Last revalidation result delivered for `id`.
    pub fn last_result(&self, id: NodeId) -> Option<&Revalidation> {
        self.last_results.get(&id)
    }

    pub fn events(&self) -> &[SurfaceEvent] {
        &self.events
    }

    pub fn take_events(&mut self) -> Vec<SurfaceEvent> {
        std::mem::take(&mut self.events)
    }
}

impl EditorSurface for Workspace {
    fn visit_live_nodes(&mut self, endpoint: &str, visit: &mut dyn FnMut(&mut QueryNode)) {
        for root in &mut self.roots {
            root.visit_mut(&mut |node| {
                if node.endpoint() == endpoint {
                    visit(node);
                }
            });
        }
    }

    fn on_revalidated(&mut self, node: NodeId, result: &Revalidation) {
        self.last_results.insert(node, result.clone());
        self.events.push(SurfaceEvent::Revalidated(node));
    }

    fn on_node_created(&mut self, node: NodeId) {
        self.events.push(SurfaceEvent::Created(node));
    }

    fn on_node_structure_changed(&mut self, node: NodeId) {
        self.events.push(SurfaceEvent::StructureChanged(node));
    }
}

#[cfg(test)]
mod tests {
    use indexmap::IndexMap;

    use super::*;
    use crate::error::{FetchError, TransportError};
    use crate::node::BoundValue;
    use crate::schema::{ArgDef, FieldDef, OperationKind, Schema, TypeDef, TypeRef};

    const E1: &str = "https://poke.example/graphql";
    const E2: &str = "https://other.example/graphql";

    fn object(name: &str, fields: Vec<FieldDef>) -> TypeDef {
        TypeDef {
            name: name.into(),
            kind: TypeKind::Object,
            fields,
            description: Some(format!("{name} type")),
        }
    }

    fn scalar(name: &str) -> TypeDef {
        TypeDef {
            name: name.into(),
            kind: TypeKind::Scalar,
            fields: Vec::new(),
            description: None,
        }
    }

    fn field(name: &str, ty: TypeRef) -> FieldDef {
        FieldDef {
            name: name.into(),
            ty,
            args: Vec::new(),
            description: None,
        }
    }

    fn schema(types: Vec<TypeDef>) -> Schema {
        Schema {
            query_type: "Query".into(),
            mutation_type: None,
            types: types.into_iter().map(|t| (t.name.clone(), t)).collect::<IndexMap<_, _>>(),
        }
    }

    fn poke_schema() -> Schema {
        schema(vec![
            object(
                "Query",
                vec![FieldDef {
                    name: "pokemon".into(),
                    ty: TypeRef::named(TypeKind::Object, "Pokemon"),
                    args: vec![ArgDef {
                        name: "id".into(),
                        ty: TypeRef::named(TypeKind::Scalar, "ID"),
                    }],
                    description: None,
                }],
            ),
            object(
                "Pokemon",
                vec![
                    field("name", TypeRef::named(TypeKind::Scalar, "String")),
                    field("weight", TypeRef::named(TypeKind::Scalar, "Int")),
                ],
            ),
            scalar("String"),
            scalar("Int"),
            scalar("ID"),
        ])
    }

    fn pokemon_tree(endpoint: &str) -> QueryNode {
        let mut node = QueryNode::object(endpoint, "pokemon", "Pokemon").with_parameter("id", "ID");
        node.bind_parameter(0, Some(BoundValue::Text("25".into())));
        node.push_child(QueryNode::scalar(endpoint, "name", "String")).unwrap();
        node.add_child(1).unwrap();
        node
    }

    fn synchronizer() -> SchemaSynchronizer {
        SchemaSynchronizer::new(Arc::new(SchemaCache::new()))
    }

    #[test]
    fn test_no_schema_leaves_node_unbound() {
        let sync = synchronizer();
        let mut node = pokemon_tree(E1);
        assert_eq!(sync.revalidate(&mut node), Revalidation::NoSchema);
        assert_eq!(node.state(), &NodeState::Unbound);
    }

    #[test]
    fn test_bound_object_gets_suggestions() {
        let sync = synchronizer();
        sync.cache().insert(E1, poke_schema());
        let mut node = pokemon_tree(E1);

        let Revalidation::Bound { suggestions } = sync.revalidate(&mut node) else {
            panic!("expected a bound node");
        };
        let names: Vec<&str> = suggestions.iter().map(|t| t.field_name.as_str()).collect();
        assert_eq!(names, ["name", "weight"]);
        assert_eq!(node.state(), &NodeState::Bound);
        assert_eq!(node.description(), Some("Pokemon type"));
    }

    #[test]
    fn test_type_description_follows_schema() {
        let with_description = |text: &str| {
            let mut schema = poke_schema();
            if let Some(pokemon) = schema.types.get_mut("Pokemon") {
                pokemon.description = Some(text.into());
            }
            schema
        };
        let sync = synchronizer();
        let mut node = pokemon_tree(E1);

        sync.cache().insert(E1, with_description("old text"));
        sync.revalidate(&mut node);
        assert_eq!(node.description(), Some("old text"));

        sync.cache().insert(E1, with_description("new text"));
        sync.revalidate(&mut node);
        assert_eq!(node.description(), Some("new text"));
        assert_eq!(node.type_description(), Some("new text"));
    }

    #[test]
    fn test_revalidate_is_idempotent() {
        let sync = synchronizer();
        sync.cache().insert(E1, poke_schema());
        let mut node = pokemon_tree(E1);

        let first = sync.revalidate(&mut node);
        let snapshot = node.clone();
        let second = sync.revalidate(&mut node);
        assert_eq!(first, second);
        assert_eq!(node, snapshot);
    }

    #[test]
    fn test_removed_type_marks_stale_and_keeps_structure() {
        let sync = synchronizer();
        sync.cache().insert(E1, poke_schema());
        let mut ws = Workspace::new();
        let id = ws.add_root(pokemon_tree(E1));
        sync.sync_endpoint(E1, &mut ws);

        sync.cache().insert(E1, schema(vec![object("Query", Vec::new()), scalar("String")]));
        let report = sync.sync_endpoint(E1, &mut ws);
        assert_eq!(report.stale, 1);
        assert_eq!(report.bound, 1);

        let node = ws.find(id).unwrap();
        assert_eq!(
            node.state(),
            &NodeState::Stale(NodeCondition::TypeRemoved {
                endpoint: E1.into(),
                type_name: "Pokemon".into(),
            })
        );
        assert_eq!(node.child_count(), 2);
        assert_eq!(node.parameters()[0].value, Some(BoundValue::Text("25".into())));
        assert!(matches!(ws.last_result(id), Some(Revalidation::Stale(_))));
    }

    #[test]
    fn test_kind_mismatch() {
        let sync = synchronizer();
        sync.cache().insert(E1, schema(vec![scalar("Pokemon")]));
        let mut node = pokemon_tree(E1);

        assert_eq!(
            sync.revalidate(&mut node),
            Revalidation::Stale(NodeCondition::KindMismatch {
                type_name: "Pokemon".into(),
                expected_object: true,
                found: TypeKind::Scalar,
            })
        );
        assert_eq!(node.child_count(), 2);

        let mut leaf = QueryNode::scalar(E1, "trainer", "Query");
        sync.cache().insert(E1, poke_schema());
        assert!(matches!(
            sync.revalidate(&mut leaf),
            Revalidation::Stale(NodeCondition::KindMismatch { expected_object: false, .. })
        ));
    }

    #[test]
    fn test_stale_node_recovers_when_type_returns() {
        let sync = synchronizer();
        sync.cache().insert(E1, schema(vec![scalar("String")]));
        let mut node = pokemon_tree(E1);
        assert!(matches!(sync.revalidate(&mut node), Revalidation::Stale(_)));

        sync.cache().insert(E1, poke_schema());
        assert!(matches!(sync.revalidate(&mut node), Revalidation::Bound { .. }));
        assert_eq!(node.state(), &NodeState::Bound);
    }

    #[test]
    fn test_sync_leaves_other_endpoints_alone() {
        let sync = synchronizer();
        let mut ws = Workspace::new();
        let first = ws.add_root(pokemon_tree(E1));
        let second = ws.add_root(pokemon_tree(E2));

        sync.cache().insert(E1, poke_schema());
        sync.cache().insert(E2, poke_schema());
        sync.sync_endpoint(E1, &mut ws);
        sync.sync_endpoint(E2, &mut ws);
        let before = ws.find(second).unwrap().clone();

        sync.cache().insert(E1, schema(Vec::new()));
        let report = sync.sync_endpoint(E1, &mut ws);

        assert_eq!(report.visited(), 2);
        assert!(matches!(ws.find(first).unwrap().state(), NodeState::Stale(_)));
        assert_eq!(ws.find(second).unwrap(), &before);
        assert_eq!(before.state(), &NodeState::Bound);
    }

    #[test]
    fn test_failed_fetch_changes_nothing() {
        let sync = synchronizer();
        sync.cache().insert(E1, poke_schema());
        let mut ws = Workspace::new();
        let id = ws.add_root(pokemon_tree(E1));
        sync.sync_endpoint(E1, &mut ws);
        ws.take_events();

        let outcome = FetchOutcome::TransportFailed(FetchError::Transport(TransportError::Status {
            endpoint: E1.into(),
            status: 502,
        }));
        assert!(sync.apply(E1, outcome, &mut ws).is_err());
        assert!(ws.events().is_empty());
        assert_eq!(ws.find(id).unwrap().state(), &NodeState::Bound);
        assert!(sync.cache().contains(E1));
    }

    #[test]
    fn test_insert_child_from_suggestion() {
        let sync = synchronizer();
        sync.cache().insert(E1, poke_schema());
        let mut ws = Workspace::new();

        let roots = sync.cache().root_suggestions(E1, OperationKind::Query).unwrap();
        let mut root = sync.create_node(&roots[0], &mut ws);
        let root_id = root.id();
        let Revalidation::Bound { suggestions } = sync.revalidate(&mut root) else {
            panic!("root should be bound");
        };
        let child_id = sync.insert_child(&mut root, 0, &suggestions[1], &mut ws).unwrap();
        ws.add_root(root);

        let root = ws.find(root_id).unwrap();
        assert_eq!(root.child_count(), 2);
        assert_eq!(root.child(0).map(QueryNode::id), Some(child_id));
        assert!(root.child(1).is_none());

        let child = ws.find(child_id).unwrap();
        assert_eq!(child.field_name(), "weight");
        assert_eq!(child.state(), &NodeState::Bound);
        assert_eq!(ws.last_result(child_id), Some(&Revalidation::Bound { suggestions: Vec::new() }));
        assert!(ws.events().contains(&SurfaceEvent::Created(child_id)));
        assert!(ws.events().contains(&SurfaceEvent::StructureChanged(root_id)));
    }
}
