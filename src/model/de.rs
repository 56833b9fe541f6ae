//! Schema-directed decoding of the JSON document format.
//!
//! Encoding lives on the types themselves (`to_json` and the `Serialize`
//! impls); decoding needs a schema to resolve type names, so it takes the
//! form of `from_json` constructors.

use super::{Attrs, Fragment, Mark, MarkSet, Node, Schema, SchemaError, Slice};
use displaydoc::Display;
use serde_json::Value;
use thiserror::Error;

/// Errors when decoding JSON into model values.
#[derive(Debug, Clone, Display, Error, PartialEq, Eq)]
pub enum JsonError {
    /// there is no node type '{0}' in this schema
    UnknownNodeType(String),
    /// there is no mark type '{0}' in this schema
    UnknownMarkType(String),
    /// invalid input for {0}
    Invalid(&'static str),
    /// schema error: {0}
    Schema(#[from] SchemaError),
}

fn attrs_from_json(value: Option<&Value>) -> Result<Option<Attrs>, JsonError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(map)) => Ok(Some(
            map.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
        )),
        Some(_) => Err(JsonError::Invalid("attrs")),
    }
}

impl Mark {
    /// Decode a mark from its JSON representation. Unknown type names and
    /// malformed shapes are errors.
    pub fn from_json(schema: &Schema, value: &Value) -> Result<Mark, JsonError> {
        let obj = value.as_object().ok_or(JsonError::Invalid("Mark"))?;
        let name = obj
            .get("type")
            .and_then(Value::as_str)
            .ok_or(JsonError::Invalid("Mark.type"))?;
        let r#type = schema
            .mark_type(name)
            .ok_or_else(|| JsonError::UnknownMarkType(name.to_owned()))?;
        let attrs = attrs_from_json(obj.get("attrs"))?;
        Ok(r#type.create(attrs.as_ref())?)
    }
}

impl Fragment {
    /// Decode a fragment from its JSON representation: `null` for the
    /// empty fragment, an array of nodes otherwise.
    pub fn from_json(schema: &Schema, value: &Value) -> Result<Fragment, JsonError> {
        match value {
            Value::Null => Ok(Fragment::EMPTY),
            Value::Array(items) => {
                let mut nodes = Vec::with_capacity(items.len());
                for item in items {
                    nodes.push(Node::from_json(schema, item)?);
                }
                Ok(Fragment::from(nodes))
            }
            _ => Err(JsonError::Invalid("Fragment")),
        }
    }
}

impl Node {
    /// Decode a node from its JSON representation. Unknown node or mark
    /// type names, non-string text, and non-array content or marks are
    /// errors.
    pub fn from_json(schema: &Schema, value: &Value) -> Result<Node, JsonError> {
        let obj = value.as_object().ok_or(JsonError::Invalid("Node"))?;
        let marks = match obj.get("marks") {
            None => MarkSet::NONE,
            Some(Value::Array(items)) => {
                let mut marks = Vec::with_capacity(items.len());
                for item in items {
                    marks.push(Mark::from_json(schema, item)?);
                }
                MarkSet::set_from(marks)
            }
            Some(_) => return Err(JsonError::Invalid("Node.marks")),
        };
        let name = obj
            .get("type")
            .and_then(Value::as_str)
            .ok_or(JsonError::Invalid("Node.type"))?;
        if schema.text_type().name() == name {
            let text = match obj.get("text") {
                Some(Value::String(text)) => text.as_str(),
                _ => return Err(JsonError::Invalid("Node.text")),
            };
            return Ok(schema.text(text)?.mark(marks));
        }
        let content = match obj.get("content") {
            None => Fragment::EMPTY,
            Some(value) => Fragment::from_json(schema, value)?,
        };
        let attrs = attrs_from_json(obj.get("attrs"))?;
        let r#type = schema
            .node_type(name)
            .ok_or_else(|| JsonError::UnknownNodeType(name.to_owned()))?;
        Ok(r#type.create(attrs.as_ref(), content, marks)?)
    }
}

impl Slice {
    /// Decode a slice from its JSON representation: `null` for the empty
    /// slice, otherwise content plus optional open depths.
    pub fn from_json(schema: &Schema, value: &Value) -> Result<Slice, JsonError> {
        let obj = match value {
            Value::Null => return Ok(Slice::default()),
            Value::Object(obj) => obj,
            _ => return Err(JsonError::Invalid("Slice")),
        };
        let content = match obj.get("content") {
            None => Fragment::EMPTY,
            Some(value) => Fragment::from_json(schema, value)?,
        };
        let open_start = open_depth(obj.get("openStart"), "Slice.openStart")?;
        let open_end = open_depth(obj.get("openEnd"), "Slice.openEnd")?;
        Ok(Slice::new(content, open_start, open_end))
    }
}

fn open_depth(value: Option<&Value>, what: &'static str) -> Result<usize, JsonError> {
    match value {
        None | Some(Value::Null) => Ok(0),
        Some(value) => value
            .as_u64()
            .map(|n| n as usize)
            .ok_or(JsonError::Invalid(what)),
    }
}

impl Schema {
    /// Decode a node from JSON. See [`Node::from_json`].
    pub fn node_from_json(&self, value: &Value) -> Result<Node, JsonError> {
        Node::from_json(self, value)
    }

    /// Decode a mark from JSON. See [`Mark::from_json`].
    pub fn mark_from_json(&self, value: &Value) -> Result<Mark, JsonError> {
        Mark::from_json(self, value)
    }
}
