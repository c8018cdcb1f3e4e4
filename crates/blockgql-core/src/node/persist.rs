//! Persisted block representation.
//!
//! A node's own state is stored in a `<mutation>` element:
//!
//! ```xml
//! <mutation gql_url="https://poke.example/graphql" gql_name="pokemon"
//!           gql_type="Pokemon" gql_scalar="false" gql_fields="2">
//!   <gql_parameter gql_name="id" gql_type="ID"/>
//! </mutation>
//! ```
//!
//! `gql_fields` is only written for object nodes and its presence is what
//! marks a node as an object. Whole trees nest `<block type="gql">` elements,
//! with children in `<value name="GQL_FIELD{i}">` and bound parameter values
//! in `<value name="GQL_PARAMETER{i}">`.

use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};

use super::{BoundValue, QueryNode};
use crate::error::PersistError;

const ATTR_URL: &str = "gql_url";
const ATTR_NAME: &str = "gql_name";
const ATTR_TYPE: &str = "gql_type";
const ATTR_SCALAR: &str = "gql_scalar";
const ATTR_FIELDS: &str = "gql_fields";

const FIELD_INPUT_PREFIX: &str = "GQL_FIELD";
const PARAMETER_INPUT_PREFIX: &str = "GQL_PARAMETER";

/// Child count assumed for object nodes persisted without `gql_fields`.
const DEFAULT_CHILD_COUNT: usize = 1;

/// Largest `gql_fields` value accepted when loading a node.
pub const MAX_CHILD_SLOTS: usize = 1024;

/// Element whose text content is a value and is kept as written.
const VALUE_FIELD_ELEMENT: &str = "field";

/// Minimal element tree used between the XML events and the node model.
#[derive(Debug, Clone, Default, PartialEq)]
struct Element {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<Element>,
    text: String,
}

impl Element {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    fn attr(mut self, key: &str, value: impl Into<String>) -> Self {
        self.attributes.push((key.to_string(), value.into()));
        self
    }

    fn child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    fn get(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    fn require(&self, key: &'static str) -> Result<&str, PersistError> {
        self.get(key).ok_or(PersistError::MissingAttribute(key))
    }

    fn expect_name(&self, expected: &'static str) -> Result<(), PersistError> {
        if self.name == expected {
            Ok(())
        } else {
            Err(PersistError::UnexpectedElement {
                expected,
                found: self.name.clone(),
            })
        }
    }

    fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }
}

fn xml_error(err: impl std::fmt::Display) -> PersistError {
    PersistError::Xml(err.to_string())
}

fn write_element(writer: &mut Writer<Vec<u8>>, element: &Element) -> Result<(), PersistError> {
    let mut start = BytesStart::new(element.name.as_str());
    for (key, value) in &element.attributes {
        start.push_attribute((key.as_str(), value.as_str()));
    }

    if element.children.is_empty() && element.text.is_empty() {
        return writer.write_event(Event::Empty(start)).map_err(xml_error);
    }

    writer.write_event(Event::Start(start)).map_err(xml_error)?;
    if !element.text.is_empty() {
        writer
            .write_event(Event::Text(BytesText::new(&element.text)))
            .map_err(xml_error)?;
    }
    for child in &element.children {
        write_element(writer, child)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new(element.name.as_str())))
        .map_err(xml_error)
}

fn to_string(element: &Element) -> Result<String, PersistError> {
    let mut writer = Writer::new(Vec::new());
    write_element(&mut writer, element)?;
    String::from_utf8(writer.into_inner()).map_err(xml_error)
}

fn open_element(start: &BytesStart<'_>) -> Result<Element, PersistError> {
    let mut element = Element::new(&String::from_utf8_lossy(start.name().as_ref()));
    for attr in start.attributes() {
        let attr = attr.map_err(xml_error)?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value().map_err(xml_error)?.into_owned();
        element.attributes.push((key, value));
    }
    Ok(element)
}

fn parse(xml: &str) -> Result<Element, PersistError> {
    let mut reader = Reader::from_str(xml);

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        match reader.read_event().map_err(xml_error)? {
            Event::Start(start) => stack.push(open_element(&start)?),
            Event::Empty(start) => {
                let element = open_element(&start)?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(element),
                    None => root = root.or(Some(element)),
                }
            }
            Event::Text(text) => {
                if let Some(current) = stack.last_mut() {
                    let text = text.unescape().map_err(xml_error)?;
                    // Indentation between elements is dropped, value text is not.
                    if current.name == VALUE_FIELD_ELEMENT || !text.trim().is_empty() {
                        current.text.push_str(&text);
                    }
                }
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| PersistError::Xml("unbalanced closing tag".into()))?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(element),
                    None => root = root.or(Some(element)),
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(PersistError::Xml("unclosed element".into()));
    }
    root.ok_or(PersistError::Empty)
}

fn mutation_element(node: &QueryNode) -> Element {
    let mut mutation = Element::new("mutation")
        .attr(ATTR_URL, node.endpoint())
        .attr(ATTR_NAME, node.field_name())
        .attr(ATTR_TYPE, node.base_type_name())
        .attr(ATTR_SCALAR, (!node.is_object()).to_string());
    if node.is_object() {
        mutation = mutation.attr(ATTR_FIELDS, node.child_count().to_string());
    }
    for param in node.parameters() {
        mutation = mutation.child(
            Element::new("gql_parameter")
                .attr(ATTR_NAME, param.name.as_str())
                .attr(ATTR_TYPE, param.type_name.as_str()),
        );
    }
    mutation
}

fn parse_child_count(value: &str) -> Result<usize, PersistError> {
    match value.parse::<usize>() {
        Ok(count) if count <= MAX_CHILD_SLOTS => Ok(count),
        _ => Err(PersistError::InvalidAttribute {
            name: ATTR_FIELDS,
            value: value.to_string(),
        }),
    }
}

fn node_from_mutation(mutation: &Element) -> Result<QueryNode, PersistError> {
    mutation.expect_name("mutation")?;
    let endpoint = mutation.require(ATTR_URL)?;
    let field_name = mutation.require(ATTR_NAME)?;
    let base_type_name = mutation.require(ATTR_TYPE)?;

    let child_count = match (mutation.get(ATTR_FIELDS), mutation.get(ATTR_SCALAR)) {
        (Some(count), _) => Some(parse_child_count(count)?),
        (None, Some("false")) => Some(DEFAULT_CHILD_COUNT),
        (None, _) => None,
    };

    let mut node = match child_count {
        Some(_) => QueryNode::object(endpoint, field_name, base_type_name),
        None => QueryNode::scalar(endpoint, field_name, base_type_name),
    };
    if let Some(count) = child_count {
        node.set_child_count(count)
            .map_err(|e| PersistError::Xml(e.to_string()))?;
    }

    for param in mutation.children_named("gql_parameter") {
        node = node.with_parameter(param.require(ATTR_NAME)?, param.require(ATTR_TYPE)?);
    }
    Ok(node)
}

/// Serializes a node's own state (not its children) to a `<mutation>` element.
pub fn mutation_to_xml(node: &QueryNode) -> Result<String, PersistError> {
    to_string(&mutation_element(node))
}

/// Rebuilds a node from a `<mutation>` element.
///
/// Object nodes come back with `gql_fields` empty slots and every parameter
/// unbound; children are restored separately.
pub fn mutation_from_xml(xml: &str) -> Result<QueryNode, PersistError> {
    node_from_mutation(&parse(xml)?)
}

fn value_block(value: &BoundValue) -> Element {
    let (block_type, field, text) = match value {
        BoundValue::Text(s) => ("text", "TEXT", s.clone()),
        BoundValue::Number(n) => ("math_number", "NUM", n.to_string()),
        BoundValue::Boolean(b) => ("logic_boolean", "BOOL", if *b { "TRUE" } else { "FALSE" }.to_string()),
        BoundValue::Enum(s) => ("gql_enum", "ENUM", s.clone()),
    };
    Element::new("block")
        .attr("type", block_type)
        .child(Element::new(VALUE_FIELD_ELEMENT).attr("name", field).text(text))
}

fn value_from_block(block: &Element) -> Result<BoundValue, PersistError> {
    block.expect_name("block")?;
    let block_type = block.require("type")?;
    let text = block
        .children_named(VALUE_FIELD_ELEMENT)
        .next()
        .map(|f| f.text.clone())
        .unwrap_or_default();

    match block_type {
        "text" => Ok(BoundValue::Text(text)),
        "math_number" => text
            .parse::<f64>()
            .map(BoundValue::Number)
            .map_err(|_| PersistError::InvalidAttribute {
                name: "NUM",
                value: text,
            }),
        "logic_boolean" => match text.as_str() {
            "TRUE" => Ok(BoundValue::Boolean(true)),
            "FALSE" => Ok(BoundValue::Boolean(false)),
            _ => Err(PersistError::InvalidAttribute {
                name: "BOOL",
                value: text,
            }),
        },
        "gql_enum" => Ok(BoundValue::Enum(text)),
        other => Err(PersistError::InvalidAttribute {
            name: "type",
            value: other.to_string(),
        }),
    }
}

fn tree_element(node: &QueryNode) -> Element {
    let mut block = Element::new("block")
        .attr("type", "gql")
        .child(mutation_element(node));

    for (i, param) in node.parameters().iter().enumerate() {
        if let Some(value) = &param.value {
            block = block.child(
                Element::new("value")
                    .attr("name", format!("{PARAMETER_INPUT_PREFIX}{i}"))
                    .child(value_block(value)),
            );
        }
    }
    for (i, child) in node.children().iter().enumerate() {
        if let Some(child) = child {
            block = block.child(
                Element::new("value")
                    .attr("name", format!("{FIELD_INPUT_PREFIX}{i}"))
                    .child(tree_element(child)),
            );
        }
    }
    block
}

fn node_from_tree(block: &Element) -> Result<QueryNode, PersistError> {
    block.expect_name("block")?;
    let mutation = block
        .children_named("mutation")
        .next()
        .ok_or(PersistError::MissingAttribute("mutation"))?;
    let mut node = node_from_mutation(mutation)?;

    for value in block.children_named("value") {
        let name = value.require("name")?;
        let Some(inner) = value.children_named("block").next() else {
            continue;
        };
        let invalid = || PersistError::InvalidAttribute {
            name: "name",
            value: name.to_string(),
        };

        if let Some(index) = name.strip_prefix(PARAMETER_INPUT_PREFIX) {
            let index: usize = index.parse().map_err(|_| invalid())?;
            if !node.bind_parameter(index, Some(value_from_block(inner)?)) {
                return Err(invalid());
            }
        } else if let Some(index) = name.strip_prefix(FIELD_INPUT_PREFIX) {
            let index: usize = index.parse().map_err(|_| invalid())?;
            node.set_child(index, node_from_tree(inner)?)
                .map_err(|_| invalid())?;
        } else {
            return Err(invalid());
        }
    }
    Ok(node)
}

/// Serializes a whole tree, including bound parameter values.
pub fn tree_to_xml(node: &QueryNode) -> Result<String, PersistError> {
    to_string(&tree_element(node))
}

/// Rebuilds a tree written by [`tree_to_xml`]. Empty slots stay empty.
pub fn tree_from_xml(xml: &str) -> Result<QueryNode, PersistError> {
    node_from_tree(&parse(xml)?)
}
