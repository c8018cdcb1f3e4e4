//! Query nodes.
//!
//! A [`QueryNode`] is one selected field of a query tree. Its shape is
//! either [`NodeShape::Scalar`] (a leaf) or [`NodeShape::Object`] with an
//! ordered list of child slots. A slot may be empty while the user is still
//! editing; empty slots compile to nothing.
//!
//! Nodes never hold schema data. They keep `(endpoint, base_type_name)` and
//! [`crate::SchemaSynchronizer`] re-resolves that pair through the cache.

mod mutator;
pub mod persist;
pub mod suggestions;

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use thiserror::Error;

use crate::schema::TypeKind;
use suggestions::NodeTemplate;

/// Characters left as is when the endpoint goes into a connection check.
///
/// Reserved URI characters stay readable; spaces and everything else outside
/// the set are percent-encoded.
const CHECK_ENDPOINT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b';')
    .remove(b',')
    .remove(b'/')
    .remove(b'?')
    .remove(b':')
    .remove(b'@')
    .remove(b'&')
    .remove(b'=')
    .remove(b'+')
    .remove(b'$')
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')')
    .remove(b'#');

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a node within the editor session.
///
/// Clones share the identity of the node they were cloned from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    fn next() -> Self {
        Self(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A value plugged into a parameter slot.
#[derive(Debug, Clone, PartialEq)]
pub enum BoundValue {
    Text(String),
    Number(f64),
    Boolean(bool),
    /// Enum value, written bare in the query.
    Enum(String),
}

/// A field argument and the value bound to it, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    /// Base type name of the argument.
    pub type_name: String,
    pub value: Option<BoundValue>,
}

impl Parameter {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            value: None,
        }
    }
}

/// Scalar leaf or object with child slots.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeShape {
    Scalar,
    Object { children: Vec<Option<QueryNode>> },
}

/// Why a node no longer matches its schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NodeCondition {
    #[error("type `{type_name}` no longer exists at {endpoint}")]
    TypeRemoved { endpoint: String, type_name: String },

    #[error("type `{type_name}` is now {found} but the block was built as {}", shape_label(.expected_object))]
    KindMismatch {
        type_name: String,
        expected_object: bool,
        found: TypeKind,
    },
}

fn shape_label(expected_object: &bool) -> &'static str {
    if *expected_object { "an object" } else { "a scalar" }
}

/// Validity of a node relative to the current schema.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum NodeState {
    /// No schema has been loaded for the node's endpoint yet.
    #[default]
    Unbound,
    Bound,
    /// The schema changed underneath the node; its structure is kept as is.
    Stale(NodeCondition),
}

/// One selected field of a query tree.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryNode {
    id: NodeId,
    endpoint: String,
    field_name: String,
    base_type_name: String,
    parameters: Vec<Parameter>,
    shape: NodeShape,
    state: NodeState,
    description: Option<String>,
    type_description: Option<String>,
}

impl QueryNode {
    /// Creates a scalar leaf.
    pub fn scalar(
        endpoint: impl Into<String>,
        field_name: impl Into<String>,
        base_type_name: impl Into<String>,
    ) -> Self {
        Self::with_shape(endpoint, field_name, base_type_name, NodeShape::Scalar)
    }

    /// Creates an object node with no child slots.
    pub fn object(
        endpoint: impl Into<String>,
        field_name: impl Into<String>,
        base_type_name: impl Into<String>,
    ) -> Self {
        Self::with_shape(
            endpoint,
            field_name,
            base_type_name,
            NodeShape::Object {
                children: Vec::new(),
            },
        )
    }

    fn with_shape(
        endpoint: impl Into<String>,
        field_name: impl Into<String>,
        base_type_name: impl Into<String>,
        shape: NodeShape,
    ) -> Self {
        Self {
            id: NodeId::next(),
            endpoint: endpoint.into(),
            field_name: field_name.into(),
            base_type_name: base_type_name.into(),
            parameters: Vec::new(),
            shape,
            state: NodeState::Unbound,
            description: None,
            type_description: None,
        }
    }

    /// Instantiates a node from a suggestion.
    ///
    /// Object nodes start with a single empty child slot, the same default a
    /// freshly dropped block gets.
    pub fn from_template(template: &NodeTemplate) -> Self {
        let mut node = if template.is_object {
            Self::object(&template.endpoint, &template.field_name, &template.base_type_name)
        } else {
            Self::scalar(&template.endpoint, &template.field_name, &template.base_type_name)
        };
        if let NodeShape::Object { children } = &mut node.shape {
            children.push(None);
        }
        node.parameters = template
            .parameters
            .iter()
            .map(|p| Parameter::new(&p.name, &p.type_name))
            .collect();
        node.description = template.description.clone();
        node
    }

    /// Appends an unbound parameter.
    pub fn with_parameter(mut self, name: impl Into<String>, type_name: impl Into<String>) -> Self {
        self.parameters.push(Parameter::new(name, type_name));
        self
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn field_name(&self) -> &str {
        &self.field_name
    }

    pub fn base_type_name(&self) -> &str {
        &self.base_type_name
    }

    pub fn is_object(&self) -> bool {
        matches!(self.shape, NodeShape::Object { .. })
    }

    pub fn shape(&self) -> &NodeShape {
        &self.shape
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    /// Binds a value to the parameter at `index`. Returns false if there is no such parameter.
    pub fn bind_parameter(&mut self, index: usize, value: Option<BoundValue>) -> bool {
        match self.parameters.get_mut(index) {
            Some(param) => {
                param.value = value;
                true
            }
            None => false,
        }
    }

    /// Binds a value to the parameter called `name`.
    pub fn bind_parameter_named(&mut self, name: &str, value: Option<BoundValue>) -> bool {
        match self.parameters.iter().position(|p| p.name == name) {
            Some(index) => self.bind_parameter(index, value),
            None => false,
        }
    }

    /// Child slots; always empty for scalars.
    pub fn children(&self) -> &[Option<QueryNode>] {
        match &self.shape {
            NodeShape::Scalar => &[],
            NodeShape::Object { children } => children,
        }
    }

    pub fn child_count(&self) -> usize {
        self.children().len()
    }

    pub fn child(&self, index: usize) -> Option<&QueryNode> {
        self.children().get(index).and_then(Option::as_ref)
    }

    pub fn child_mut(&mut self, index: usize) -> Option<&mut QueryNode> {
        match &mut self.shape {
            NodeShape::Scalar => None,
            NodeShape::Object { children } => children.get_mut(index).and_then(Option::as_mut),
        }
    }

    pub fn state(&self) -> &NodeState {
        &self.state
    }

    pub(crate) fn set_state(&mut self, state: NodeState) {
        self.state = state;
    }

    /// Tooltip text: the field's own description, else its type's.
    pub fn description(&self) -> Option<&str> {
        self.description
            .as_deref()
            .or(self.type_description.as_deref())
    }

    /// Description of the base type as of the last successful revalidation.
    pub fn type_description(&self) -> Option<&str> {
        self.type_description.as_deref()
    }

    pub(crate) fn set_type_description(&mut self, description: Option<String>) {
        self.type_description = description;
    }

    /// Connection check shared by the node's output and its child inputs.
    ///
    /// The endpoint is URI-encoded so the check never contains spaces,
    /// which keeps the `"<endpoint> <field>"` form unambiguous.
    pub fn output_check(&self) -> String {
        format!(
            "{} {}",
            utf8_percent_encode(&self.endpoint, CHECK_ENDPOINT),
            self.field_name
        )
    }

    /// Visits this node and every populated descendant, depth first.
    pub fn visit(&self, visit: &mut dyn FnMut(&QueryNode)) {
        visit(self);
        for child in self.children().iter().flatten() {
            child.visit(visit);
        }
    }

    /// Mutable variant of [`QueryNode::visit`].
    pub fn visit_mut(&mut self, visit: &mut dyn FnMut(&mut QueryNode)) {
        visit(self);
        if let NodeShape::Object { children } = &mut self.shape {
            for child in children.iter_mut().flatten() {
                child.visit_mut(visit);
            }
        }
    }

    /// Finds a node by id in this subtree.
    pub fn find(&self, id: NodeId) -> Option<&QueryNode> {
        if self.id == id {
            return Some(self);
        }
        self.children().iter().flatten().find_map(|c| c.find(id))
    }

    pub fn find_mut(&mut self, id: NodeId) -> Option<&mut QueryNode> {
        if self.id == id {
            return Some(self);
        }
        match &mut self.shape {
            NodeShape::Scalar => None,
            NodeShape::Object { children } => {
                children.iter_mut().flatten().find_map(|c| c.find_mut(id))
            }
        }
    }
}
