//! # A basic document schema
//!
//! A ready-made schema with the usual block and inline vocabulary:
//! paragraphs, blockquotes, headings, code blocks, lists, images, and the
//! `em`/`strong`/`link`/`code` marks. It doubles as a usage example for
//! [`SchemaSpec`] and backs the node builders in [`helper`].

pub mod helper;

use crate::model::{AttributeSpec, MarkSpec, NodeSpec, Schema, SchemaSpec};
use serde_json::json;

/// The spec of the basic schema.
pub fn schema_spec() -> SchemaSpec {
    SchemaSpec {
        nodes: vec![
            (
                "doc".into(),
                NodeSpec {
                    content: Some("block+".into()),
                    ..Default::default()
                },
            ),
            (
                "paragraph".into(),
                NodeSpec {
                    content: Some("inline*".into()),
                    group: Some("block".into()),
                    ..Default::default()
                },
            ),
            (
                "blockquote".into(),
                NodeSpec {
                    content: Some("block+".into()),
                    group: Some("block".into()),
                    ..Default::default()
                },
            ),
            (
                "horizontal_rule".into(),
                NodeSpec {
                    group: Some("block".into()),
                    ..Default::default()
                },
            ),
            (
                "heading".into(),
                NodeSpec {
                    content: Some("inline*".into()),
                    group: Some("block".into()),
                    attrs: vec![("level".into(), AttributeSpec::with_default(json!(1)))],
                    ..Default::default()
                },
            ),
            (
                "code_block".into(),
                NodeSpec {
                    content: Some("text*".into()),
                    marks: Some("".into()),
                    group: Some("block".into()),
                    ..Default::default()
                },
            ),
            (
                "ordered_list".into(),
                NodeSpec {
                    content: Some("list_item+".into()),
                    group: Some("block".into()),
                    attrs: vec![("order".into(), AttributeSpec::with_default(json!(1)))],
                    ..Default::default()
                },
            ),
            (
                "bullet_list".into(),
                NodeSpec {
                    content: Some("list_item+".into()),
                    group: Some("block".into()),
                    ..Default::default()
                },
            ),
            (
                "list_item".into(),
                NodeSpec {
                    content: Some("paragraph block*".into()),
                    ..Default::default()
                },
            ),
            (
                "text".into(),
                NodeSpec {
                    group: Some("inline".into()),
                    ..Default::default()
                },
            ),
            (
                "image".into(),
                NodeSpec {
                    inline: true,
                    group: Some("inline".into()),
                    attrs: vec![
                        ("src".into(), AttributeSpec::required()),
                        ("alt".into(), AttributeSpec::with_default(json!(null))),
                        ("title".into(), AttributeSpec::with_default(json!(null))),
                    ],
                    ..Default::default()
                },
            ),
            (
                "hard_break".into(),
                NodeSpec {
                    inline: true,
                    group: Some("inline".into()),
                    ..Default::default()
                },
            ),
        ],
        marks: vec![
            ("em".into(), MarkSpec::default()),
            ("strong".into(), MarkSpec::default()),
            (
                "link".into(),
                MarkSpec {
                    attrs: vec![
                        ("href".into(), AttributeSpec::required()),
                        ("title".into(), AttributeSpec::with_default(json!(null))),
                    ],
                    inclusive: false,
                    ..Default::default()
                },
            ),
            ("code".into(), MarkSpec::default()),
        ],
        top_node: None,
    }
}

/// Compile the basic schema.
pub fn schema() -> Schema {
    Schema::new(schema_spec()).expect("the basic schema compiles")
}
