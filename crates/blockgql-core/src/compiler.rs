//! Query compilation.
//!
//! A node tree compiles bottom-up into a [`Fragment`] plan:
//!
//! - a scalar node is the literal field name;
//! - an object node is a `string-append` over its header, one indented line
//!   per non-empty child and the closing brace, with every part coerced to
//!   text before joining.
//!
//! The plan can be handed to the host interpreter ([`Fragment::to_host_code`])
//! or evaluated directly into query text ([`Fragment::render`]). Compilation
//! reads node state only; it never consults the schema cache and never fails.
//! Unbound parameters become `null` and empty child slots are left out.

use std::fmt::Write as _;

use tracing::debug;

use crate::node::{BoundValue, NodeShape, NodeState, QueryNode};
use crate::schema::{OperationKind, Primitive};

const INDENT: &str = "  ";
const NULL_TOKEN: &str = "null";

/// One element of a compiled plan.
#[derive(Debug, Clone, PartialEq)]
pub enum Fragment {
    /// Literal query text.
    Literal(String),
    /// An unbound parameter.
    Null,
    /// A value bound to a parameter, stringified by the host.
    Value(BoundValue),
    /// Concatenation of `parts`, each coerced by the matching tag.
    Append {
        parts: Vec<Fragment>,
        coercions: Vec<Primitive>,
    },
}

/// A compiled node: its fragment and the coercion tags of its parts.
#[derive(Debug, Clone, PartialEq)]
pub struct Compiled {
    pub fragment: Fragment,
    /// Empty for scalar leaves; one `text` tag per part for objects.
    pub coercions: Vec<Primitive>,
}

impl Compiled {
    /// Shorthand for [`Fragment::render`] on the compiled fragment.
    pub fn render(&self) -> String {
        self.fragment.render()
    }
}

impl Fragment {
    /// Returns true when the fragment contributes no text.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Literal(text) => text.is_empty(),
            Self::Append { parts, .. } => parts.iter().all(Fragment::is_empty),
            Self::Null | Self::Value(_) => false,
        }
    }

    /// Evaluates the plan into query text.
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.render_into(&mut out);
        out
    }

    fn render_into(&self, out: &mut String) {
        match self {
            Self::Literal(text) => out.push_str(text),
            Self::Null => out.push_str(NULL_TOKEN),
            Self::Value(value) => out.push_str(&value_token(value)),
            Self::Append { parts, .. } => {
                for part in parts {
                    part.render_into(out);
                }
            }
        }
    }

    /// Prints the plan as the host interpreter's s-expression.
    ///
    /// Objects become
    /// `(call-yail-primitive string-append (*list-for-runtime* ...) '(text ...) "join")`.
    pub fn to_host_code(&self) -> String {
        let mut out = String::new();
        self.host_code_into(&mut out);
        out
    }

    fn host_code_into(&self, out: &mut String) {
        match self {
            Self::Literal(text) => out.push_str(&host_string(text)),
            Self::Null => out.push_str(&host_string(NULL_TOKEN)),
            Self::Value(value) => match value {
                BoundValue::Number(_) => out.push_str(&value_token(value)),
                BoundValue::Boolean(true) => out.push_str("#t"),
                BoundValue::Boolean(false) => out.push_str("#f"),
                BoundValue::Text(_) | BoundValue::Enum(_) => {
                    out.push_str(&host_string(&value_token(value)))
                }
            },
            Self::Append { parts, coercions } => {
                out.push_str("(call-yail-primitive string-append (*list-for-runtime*");
                for part in parts {
                    out.push(' ');
                    part.host_code_into(out);
                }
                out.push_str(") '(");
                let tags: Vec<&str> = coercions.iter().map(|c| c.as_str()).collect();
                out.push_str(&tags.join(" "));
                out.push_str(") \"join\")");
            }
        }
    }
}

/// GraphQL literal for a bound value.
fn value_token(value: &BoundValue) -> String {
    match value {
        BoundValue::Text(text) => graphql_string(text),
        BoundValue::Number(n) => n.to_string(),
        BoundValue::Boolean(b) => b.to_string(),
        BoundValue::Enum(name) => name.clone(),
    }
}

fn graphql_string(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {
                let _ = write!(out, "\\u{:04X}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

fn host_string(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Accumulates the parts of an object node, merging adjacent literals.
#[derive(Default)]
struct PartsBuilder {
    parts: Vec<Fragment>,
}

impl PartsBuilder {
    fn literal(&mut self, text: &str) {
        if let Some(Fragment::Literal(last)) = self.parts.last_mut() {
            last.push_str(text);
        } else {
            self.parts.push(Fragment::Literal(text.to_string()));
        }
    }

    fn fragment(&mut self, fragment: Fragment) {
        match fragment {
            Fragment::Literal(text) => self.literal(&text),
            other => self.parts.push(other),
        }
    }

    /// One indented line per non-empty child.
    fn body<'a>(&mut self, children: impl IntoIterator<Item = &'a QueryNode>) {
        for child in children {
            let compiled = compile(child);
            if compiled.fragment.is_empty() {
                continue;
            }
            self.literal(INDENT);
            self.fragment(compiled.fragment);
            self.literal("\n");
        }
        self.literal("}\n");
    }

    fn finish(self) -> Compiled {
        let coercions = vec![Primitive::Text; self.parts.len()];
        Compiled {
            fragment: Fragment::Append {
                parts: self.parts,
                coercions: coercions.clone(),
            },
            coercions,
        }
    }
}

/// Compiles a node and its populated descendants.
pub fn compile(node: &QueryNode) -> Compiled {
    if let NodeState::Stale(condition) = node.state() {
        debug!(field = %node.field_name(), %condition, "Compiling stale node");
    }

    let children = match node.shape() {
        NodeShape::Scalar => {
            return Compiled {
                fragment: Fragment::Literal(node.field_name().to_string()),
                coercions: Vec::new(),
            };
        }
        NodeShape::Object { children } => children,
    };

    let mut builder = PartsBuilder::default();
    builder.literal(node.field_name());
    if !node.parameters().is_empty() {
        builder.literal("(");
        for (i, param) in node.parameters().iter().enumerate() {
            if i > 0 {
                builder.literal(", ");
            }
            builder.literal(&format!("{}: ", param.name));
            match &param.value {
                Some(value) => builder.fragment(Fragment::Value(value.clone())),
                None => builder.fragment(Fragment::Null),
            }
        }
        builder.literal(")");
    }
    builder.literal(" {\n");
    builder.body(children.iter().flatten());
    builder.finish()
}

/// Wraps root nodes in a `query` or `mutation` operation.
pub fn compile_operation(kind: OperationKind, name: Option<&str>, roots: &[QueryNode]) -> Compiled {
    let mut builder = PartsBuilder::default();
    builder.literal(kind.keyword());
    if let Some(name) = name.filter(|n| !n.is_empty()) {
        builder.literal(" ");
        builder.literal(name);
    }
    builder.literal(" {\n");
    builder.body(roots);
    builder.finish()
}
