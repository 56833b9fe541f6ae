use crate::basic::helper::{
    a, basic_schema, blockquote, br, doc, em, h2, hr, img, li, p, text, ul,
};
use crate::model::{Fragment, JsonError, Node, SchemaError, Slice};
use serde_json::json;

#[test]
fn node_round_trips() {
    let schema = basic_schema();
    let d = doc((
        h2(vec![text("Title "), em("emphasized")]),
        blockquote((p(vec![a("http://x", "link"), br(), img("x.png")]), hr())),
        ul(li(p("item"))),
    ));
    let json = d.to_json();
    let back = schema.node_from_json(&json).unwrap();
    assert_eq!(back, d);
    assert_eq!(back.to_json(), json);
}

#[test]
fn serialize_matches_to_json() {
    let d = doc(p(em("hi")));
    assert_eq!(serde_json::to_value(&d).unwrap(), d.to_json());
}

#[test]
fn json_shape_omits_empty_fields() {
    let d = doc(p("hi"));
    assert_eq!(
        d.to_json(),
        json!({
            "type": "doc",
            "content": [
                { "type": "paragraph", "content": [ { "type": "text", "text": "hi" } ] }
            ]
        })
    );

    let marked = em("hi");
    assert_eq!(
        marked.to_json(),
        json!({ "type": "text", "marks": [ { "type": "em" } ], "text": "hi" })
    );

    let linked = a("http://x", "y");
    assert_eq!(
        linked.to_json(),
        json!({
            "type": "text",
            "marks": [ { "type": "link", "attrs": { "href": "http://x", "title": null } } ],
            "text": "y"
        })
    );

    // Attributes appear whenever the type declares any.
    assert_eq!(
        h2(Fragment::EMPTY).to_json(),
        json!({ "type": "heading", "attrs": { "level": 2 } })
    );
}

#[test]
fn fragment_serializes_to_null_when_empty() {
    assert_eq!(Fragment::EMPTY.to_json(), json!(null));
    let schema = basic_schema();
    assert_eq!(
        Fragment::from_json(&schema, &json!(null)).unwrap(),
        Fragment::EMPTY
    );
    assert!(Fragment::from_json(&schema, &json!("nope")).is_err());
}

#[test]
fn unknown_names_are_rejected() {
    let schema = basic_schema();
    assert_eq!(
        schema.node_from_json(&json!({ "type": "table" })),
        Err(JsonError::UnknownNodeType("table".into()))
    );
    assert_eq!(
        schema.mark_from_json(&json!({ "type": "underline" })),
        Err(JsonError::UnknownMarkType("underline".into()))
    );
}

#[test]
fn malformed_nodes_are_rejected() {
    let schema = basic_schema();
    assert_eq!(
        schema.node_from_json(&json!(17)),
        Err(JsonError::Invalid("Node"))
    );
    assert_eq!(
        schema.node_from_json(&json!({ "type": "text", "text": 17 })),
        Err(JsonError::Invalid("Node.text"))
    );
    assert_eq!(
        schema.node_from_json(&json!({ "type": "text", "text": "" })),
        Err(JsonError::Schema(SchemaError::EmptyText))
    );
    assert_eq!(
        schema.node_from_json(&json!({ "type": "paragraph", "content": {} })),
        Err(JsonError::Invalid("Fragment"))
    );
    assert_eq!(
        schema.node_from_json(&json!({ "type": "paragraph", "marks": {} })),
        Err(JsonError::Invalid("Node.marks"))
    );
    // A required attribute must be present.
    assert_eq!(
        schema.node_from_json(&json!({ "type": "image" })),
        Err(JsonError::Schema(SchemaError::MissingAttr {
            owner: "image".into(),
            attr: "src".into()
        }))
    );
}

#[test]
fn mark_round_trips() {
    let schema = basic_schema();
    let mark = schema
        .mark_from_json(&json!({ "type": "link", "attrs": { "href": "http://x" } }))
        .unwrap();
    assert_eq!(mark.attrs().get("href"), Some(&json!("http://x")));
    // Defaults are filled in.
    assert_eq!(mark.attrs().get("title"), Some(&json!(null)));
    let back = schema.mark_from_json(&mark.to_json()).unwrap();
    assert_eq!(back, mark);
}

#[test]
fn slice_round_trips() {
    let schema = basic_schema();
    let d = doc((p("ab"), p("cd")));
    let slice = d.slice(2..6, false).unwrap();
    assert_eq!((slice.open_start, slice.open_end), (1, 1));
    let json = slice.to_json();
    assert_eq!(json["openStart"], json!(1));
    let back = Slice::from_json(&schema, &json).unwrap();
    assert_eq!(back, slice);

    // Zero depths are omitted.
    let flat = d.slice(4..4, false).unwrap();
    assert_eq!(flat.to_json(), json!(null));
    assert_eq!(Slice::from_json(&schema, &json!(null)).unwrap(), Slice::default());

    let inner = d.slice(1..3, false).unwrap();
    assert_eq!((inner.open_start, inner.open_end), (0, 0));
    let json = inner.to_json();
    assert_eq!(json.get("openStart"), None);
    assert_eq!(Slice::from_json(&schema, &json).unwrap(), inner);

    assert_eq!(
        Slice::from_json(&schema, &json!({ "content": null, "openStart": "x" })),
        Err(JsonError::Invalid("Slice.openStart"))
    );
}

#[test]
fn documents_survive_a_string_round_trip() {
    let d = doc((p(vec![text("plain "), em("emphasis")]), blockquote(p("q"))));
    let encoded = serde_json::to_string(&d).unwrap();
    let value: serde_json::Value = serde_json::from_str(&encoded).unwrap();
    let back = Node::from_json(&basic_schema(), &value).unwrap();
    assert_eq!(back, d);
}
