//! # Node builders for the basic schema
//!
//! Functions to build documents programmatically, mainly for tests and
//! examples. They all panic on misuse instead of returning results, which
//! keeps test documents terse.

use super::schema;
use crate::model::{Attrs, Fragment, Mark, MarkSet, Node, Schema};
use serde_json::json;

thread_local! {
    static SCHEMA: Schema = schema();
}

/// The shared basic schema instance the builders use.
pub fn basic_schema() -> Schema {
    SCHEMA.with(Schema::clone)
}

fn node(name: &str, attrs: Option<&Attrs>, content: impl Into<Fragment>) -> Node {
    basic_schema()
        .node(name, attrs, content, MarkSet::NONE)
        .expect("valid basic-schema node")
}

/// Create a document node.
pub fn doc(content: impl Into<Fragment>) -> Node {
    node("doc", None, content)
}

/// Create a paragraph node.
pub fn p(content: impl Into<Fragment>) -> Node {
    node("paragraph", None, content)
}

/// Create a blockquote node.
pub fn blockquote(content: impl Into<Fragment>) -> Node {
    node("blockquote", None, content)
}

/// Create a heading node of the given level.
pub fn h(level: u8, content: impl Into<Fragment>) -> Node {
    let attrs: Attrs = vec![("level".to_owned(), json!(level))].into_iter().collect();
    node("heading", Some(&attrs), content)
}

/// Create a heading (level 1) node.
pub fn h1(content: impl Into<Fragment>) -> Node {
    h(1, content)
}

/// Create a heading (level 2) node.
pub fn h2(content: impl Into<Fragment>) -> Node {
    h(2, content)
}

/// Create a code block node.
pub fn code_block(content: impl Into<Fragment>) -> Node {
    node("code_block", None, content)
}

/// Create a bullet list node.
pub fn ul(content: impl Into<Fragment>) -> Node {
    node("bullet_list", None, content)
}

/// Create an ordered list node.
pub fn ol(content: impl Into<Fragment>) -> Node {
    node("ordered_list", None, content)
}

/// Create a list item node.
pub fn li(content: impl Into<Fragment>) -> Node {
    node("list_item", None, content)
}

/// Create a horizontal rule node.
pub fn hr() -> Node {
    node("horizontal_rule", None, Fragment::EMPTY)
}

/// Create a hard break node.
pub fn br() -> Node {
    node("hard_break", None, Fragment::EMPTY)
}

/// Create an image node.
pub fn img(src: &str) -> Node {
    let attrs: Attrs = vec![("src".to_owned(), json!(src))].into_iter().collect();
    node("image", Some(&attrs), Fragment::EMPTY)
}

/// Create a text node.
pub fn text(content: &str) -> Node {
    basic_schema().text(content).expect("nonempty text")
}

/// The `em` mark.
pub fn em_mark() -> Mark {
    basic_schema().mark("em", None).expect("em mark")
}

/// The `strong` mark.
pub fn strong_mark() -> Mark {
    basic_schema().mark("strong", None).expect("strong mark")
}

/// The `code` mark.
pub fn code_mark() -> Mark {
    basic_schema().mark("code", None).expect("code mark")
}

/// A `link` mark pointing at the given target.
pub fn link_mark(href: &str) -> Mark {
    let attrs: Attrs = vec![("href".to_owned(), json!(href))].into_iter().collect();
    basic_schema()
        .mark("link", Some(&attrs))
        .expect("link mark")
}

/// Create an emphasized text node.
pub fn em(content: &str) -> Node {
    text(content).mark(MarkSet::from(em_mark()))
}

/// Create a strong text node.
pub fn strong(content: &str) -> Node {
    text(content).mark(MarkSet::from(strong_mark()))
}

/// Create a code text node.
pub fn code(content: &str) -> Node {
    text(content).mark(MarkSet::from(code_mark()))
}

/// Create a linked text node.
pub fn a(href: &str, content: &str) -> Node {
    text(content).mark(MarkSet::from(link_mark(href)))
}

impl From<&str> for Node {
    fn from(src: &str) -> Node {
        text(src)
    }
}

impl From<&str> for Fragment {
    fn from(src: &str) -> Fragment {
        Fragment::from(text(src))
    }
}

impl<A, B> From<(A, B)> for Fragment
where
    A: Into<Node>,
    B: Into<Node>,
{
    fn from((a, b): (A, B)) -> Fragment {
        Fragment::from(vec![a.into(), b.into()])
    }
}

impl<A, B, C> From<(A, B, C)> for Fragment
where
    A: Into<Node>,
    B: Into<Node>,
    C: Into<Node>,
{
    fn from((a, b, c): (A, B, C)) -> Fragment {
        Fragment::from(vec![a.into(), b.into(), c.into()])
    }
}
