use super::fragment::Index;
use super::{
    range_span, replace, Attrs, ContentMatch, ContentMatchError, Fragment, Mark, MarkSet,
    MarkType, NodeType, ReplaceError, ResolveError, ResolvedPos, Slice,
};
use derivative::Derivative;
use displaydoc::Display;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use std::fmt::{self, Debug};
use std::ops::RangeBounds;
use std::rc::Rc;
use thiserror::Error;

/// Errors raised by [`Node::check`].
#[derive(Debug, Clone, Display, Error, PartialEq, Eq)]
pub enum CheckError {
    /// invalid content for node {node}
    InvalidContent {
        /// The type of the offending node
        node: String,
    },
    /// invalid mark set on node {node}
    InvalidMarks {
        /// The type of the offending node
        node: String,
    },
}

struct NodeData {
    r#type: NodeType,
    attrs: Attrs,
    content: Fragment,
    marks: MarkSet,
    text: Option<Text>,
}

/// A node in the tree that makes up a document. A document is itself a
/// node whose type is the schema's top node type.
///
/// Nodes are immutable values behind a cheap handle: cloning shares the
/// underlying record, and every "mutating" operation builds a new node that
/// shares all untouched subtrees.
#[derive(Clone)]
pub struct Node {
    data: Rc<NodeData>,
}

impl Node {
    pub(crate) fn new(r#type: NodeType, attrs: Attrs, content: Fragment, marks: MarkSet) -> Node {
        Node {
            data: Rc::new(NodeData {
                r#type,
                attrs,
                content,
                marks,
                text: None,
            }),
        }
    }

    pub(crate) fn new_text(r#type: NodeType, marks: MarkSet, text: Text) -> Node {
        Node {
            data: Rc::new(NodeData {
                r#type,
                attrs: Attrs::EMPTY,
                content: Fragment::EMPTY,
                marks,
                text: Some(text),
            }),
        }
    }

    pub(crate) fn ptr_eq(a: &Node, b: &Node) -> bool {
        Rc::ptr_eq(&a.data, &b.data)
    }

    /// The type of this node.
    pub fn r#type(&self) -> &NodeType {
        &self.data.r#type
    }

    /// The attributes of this node.
    pub fn attrs(&self) -> &Attrs {
        &self.data.attrs
    }

    /// The marks attached to this node.
    pub fn marks(&self) -> &MarkSet {
        &self.data.marks
    }

    /// The node's children. Empty for leaves and text nodes.
    pub fn content(&self) -> &Fragment {
        &self.data.content
    }

    /// For text nodes, the node's text.
    pub fn text(&self) -> Option<&Text> {
        self.data.text.as_ref()
    }

    /// How many integer positions this node occupies: the utf-16 character
    /// count for text, one for any other leaf, and the content size plus
    /// the two enclosing tokens otherwise.
    pub fn node_size(&self) -> usize {
        if let Some(text) = self.text() {
            text.len_utf16()
        } else if self.is_leaf() {
            1
        } else {
            self.content().size() + 2
        }
    }

    /// The number of children.
    pub fn child_count(&self) -> usize {
        self.content().child_count()
    }

    /// The child at `index`; panics when no such child exists.
    pub fn child(&self, index: usize) -> &Node {
        self.content().child(index)
    }

    /// The child at `index`, or `None` when out of range.
    pub fn maybe_child(&self, index: usize) -> Option<&Node> {
        self.content().maybe_child(index)
    }

    /// The node's first child, if any.
    pub fn first_child(&self) -> Option<&Node> {
        self.content().first_child()
    }

    /// The node's last child, if any.
    pub fn last_child(&self) -> Option<&Node> {
        self.content().last_child()
    }

    /// True when this is a block (non-inline) node.
    pub fn is_block(&self) -> bool {
        self.r#type().is_block()
    }

    /// True when this is an inline node (a text node or a node of inline
    /// type).
    pub fn is_inline(&self) -> bool {
        self.r#type().is_inline()
    }

    /// True when this is a text node.
    pub fn is_text(&self) -> bool {
        self.data.text.is_some()
    }

    /// True when this is a textblock node: a block with inline content.
    pub fn is_textblock(&self) -> bool {
        self.r#type().is_textblock()
    }

    /// True when this is a leaf node.
    pub fn is_leaf(&self) -> bool {
        self.r#type().is_leaf()
    }

    /// True when this is an atom: a node that does not have directly
    /// editable content.
    pub fn is_atom(&self) -> bool {
        self.r#type().is_atom()
    }

    /// Create a new node with the same markup as this node, containing the
    /// given content. Returns this node when the content is identical.
    pub fn copy(&self, content: Fragment) -> Node {
        if content == self.data.content {
            return self.clone();
        }
        Node {
            data: Rc::new(NodeData {
                r#type: self.data.r#type.clone(),
                attrs: self.data.attrs.clone(),
                content,
                marks: self.data.marks.clone(),
                text: self.data.text.clone(),
            }),
        }
    }

    /// Create a copy of this node with the given set of marks.
    pub fn mark(&self, marks: MarkSet) -> Node {
        if marks == self.data.marks {
            return self.clone();
        }
        Node {
            data: Rc::new(NodeData {
                r#type: self.data.r#type.clone(),
                attrs: self.data.attrs.clone(),
                content: self.data.content.clone(),
                marks,
                text: self.data.text.clone(),
            }),
        }
    }

    /// For text nodes, create a copy carrying the given text.
    pub fn with_text(&self, text: Text) -> Node {
        debug_assert!(self.is_text(), "with_text on a non-text node");
        Node::new_text(self.data.r#type.clone(), self.data.marks.clone(), text)
    }

    /// Create a copy of this node with only the content between the given
    /// positions.
    pub fn cut<R: RangeBounds<usize>>(&self, range: R) -> Node {
        if let Some(text) = self.text() {
            let (from, to) = range_span(range, text.len_utf16());
            if from == 0 && to == text.len_utf16() {
                return self.clone();
            }
            self.with_text(text.cut(from, to))
        } else {
            let size = self.content().size();
            let (from, to) = range_span(range, size);
            if from == 0 && to == size {
                self.clone()
            } else {
                self.copy(self.content().cut(from..to))
            }
        }
    }

    /// Cut out the part of the document between the given positions and
    /// return it as a [`Slice`] whose open depths record how far the cut
    /// points sat below the shared ancestor.
    pub fn slice<R: RangeBounds<usize>>(
        &self,
        range: R,
        include_parents: bool,
    ) -> Result<Slice, ResolveError> {
        let (from, to) = range_span(range, self.content().size());
        if from == to {
            return Ok(Slice::default());
        }

        let rp_from = self.resolve(from)?;
        let rp_to = self.resolve(to)?;

        let depth = if include_parents {
            0
        } else {
            rp_from.shared_depth(to)
        };
        let start = rp_from.start(depth);
        let node = rp_from.node(depth);
        let content = node.content().cut(rp_from.pos() - start..rp_to.pos() - start);
        Ok(Slice::new(
            content,
            rp_from.depth() - depth,
            rp_to.depth() - depth,
        ))
    }

    /// Splice `slice` into this document over the given range. Fails when
    /// the slice's open sides cannot be joined onto the surrounding nodes,
    /// or when any rebuilt node ends up with content its type rejects.
    pub fn replace<R: RangeBounds<usize>>(
        &self,
        range: R,
        slice: &Slice,
    ) -> Result<Node, ReplaceError> {
        let (from, to) = range_span(range, self.content().size());
        assert!(to >= from, "replace: {} >= {}", to, from);

        let rp_from = self.resolve(from)?;
        let rp_to = self.resolve(to)?;
        replace(&rp_from, &rp_to, slice)
    }

    /// Resolve the given position in the document, returning a structure
    /// with information about its context. Resolution results are memoised
    /// per document in a small thread-local cache.
    pub fn resolve(&self, pos: usize) -> Result<ResolvedPos, ResolveError> {
        ResolvedPos::resolve_cached(self, pos)
    }

    /// Find the node directly after the given position, descending as far
    /// as necessary. Returns `None` when the position points at the end of
    /// a node.
    pub fn node_at(&self, pos: usize) -> Option<Node> {
        let mut node = self.clone();
        let mut pos = pos;
        loop {
            let Index { index, offset } = node.content().find_index(pos, false).ok()?;
            let child = node.maybe_child(index)?.clone();
            if offset == pos || child.is_text() {
                return Some(child);
            }
            pos -= offset + 1;
            node = child;
        }
    }

    /// Invoke a callback for all descendant nodes recursively between the
    /// given two positions that are relative to the start of this node's
    /// content. The callback is invoked with the node, its position, its
    /// parent, and its index; returning `false` skips the node's children.
    pub fn nodes_between<F>(&self, from: usize, to: usize, f: &mut F)
    where
        F: FnMut(&Node, usize, Option<&Node>, usize) -> bool,
    {
        self.content().nodes_between(from, to, f, 0, Some(self));
    }

    /// Call the given callback for every descendant node.
    pub fn descendants<F>(&self, f: &mut F)
    where
        F: FnMut(&Node, usize, Option<&Node>, usize) -> bool,
    {
        self.nodes_between(0, self.content().size(), f);
    }

    /// Concatenate all the text nodes found in this node and its children.
    pub fn text_content(&self) -> String {
        if let Some(text) = self.text() {
            return text.as_str().to_owned();
        }
        let mut buf = String::new();
        let content = self.content();
        content.text_between(&mut buf, true, 0, content.size(), Some(""), None);
        buf
    }

    /// Get all text between positions `from` and `to`, separating blocks
    /// with `block_separator` and standing in `leaf_text` for non-text leaf
    /// nodes.
    pub fn text_between(
        &self,
        from: usize,
        to: usize,
        block_separator: Option<&str>,
        leaf_text: Option<&str>,
    ) -> String {
        let mut buf = String::new();
        self.content()
            .text_between(&mut buf, true, from, to, block_separator, leaf_text);
        buf
    }

    /// Test whether a given mark is on any (partially) covered node in the
    /// given range.
    pub fn range_has_mark(&self, from: usize, to: usize, mark: &Mark) -> bool {
        let mut found = false;
        if to > from {
            self.nodes_between(from, to, &mut |node, _pos, _parent, _index| {
                if mark.is_in_set(node.marks()) {
                    found = true;
                }
                !found
            });
        }
        found
    }

    /// Test whether a mark of the given type is on any (partially) covered
    /// node in the given range.
    pub fn range_has_mark_type(&self, from: usize, to: usize, mark_type: &MarkType) -> bool {
        let mut found = false;
        if to > from {
            self.nodes_between(from, to, &mut |node, _pos, _parent, _index| {
                if mark_type.is_in_set(node.marks()).is_some() {
                    found = true;
                }
                !found
            });
        }
        found
    }

    /// Compare the markup (type, attributes, and marks) of this node to
    /// those of another.
    pub fn same_markup(&self, other: &Node) -> bool {
        self.has_markup(other.r#type(), Some(other.attrs()), Some(other.marks()))
    }

    /// Check whether this node's markup correspond to the given type,
    /// attributes, and marks. `None` attributes compare against the type's
    /// defaults, `None` marks against the empty set.
    pub fn has_markup(
        &self,
        r#type: &NodeType,
        attrs: Option<&Attrs>,
        marks: Option<&MarkSet>,
    ) -> bool {
        if self.r#type() != r#type {
            return false;
        }
        let attrs_eq = match attrs {
            Some(attrs) => *attrs == self.data.attrs,
            None => match r#type.default_attrs() {
                Some(default) => default == self.data.attrs,
                None => self.data.attrs.is_empty(),
            },
        };
        if !attrs_eq {
            return false;
        }
        match marks {
            Some(marks) => MarkSet::same_set(marks, self.marks()),
            None => self.marks().is_empty(),
        }
    }

    /// Get the content match after parsing this node's content up to the
    /// given child index. Errors when the content up to that index is not
    /// valid for the node's type.
    pub fn content_match_at(&self, index: usize) -> Result<ContentMatch, ContentMatchError> {
        self.r#type()
            .content_match()
            .match_fragment_range(self.content(), 0..index)
            .ok_or(ContentMatchError::InvalidContent)
    }

    /// Test whether replacing the children between the child indices `from`
    /// and `to` with the given slice of the replacement fragment would
    /// leave the node's content valid.
    pub fn can_replace<R: RangeBounds<usize>>(
        &self,
        from: usize,
        to: usize,
        replacement: Option<&Fragment>,
        range: R,
    ) -> Result<bool, ContentMatchError> {
        let empty = Fragment::EMPTY;
        let replacement = replacement.unwrap_or(&empty);
        let (start, end) = range_span(range, replacement.child_count());

        let one = self
            .content_match_at(from)?
            .match_fragment_range(replacement, start..end);
        let two = match one.and_then(|m| m.match_fragment_range(self.content(), to..)) {
            Some(two) => two,
            None => return Ok(false),
        };
        if !two.valid_end() {
            return Ok(false);
        }
        for i in start..end {
            if !self.r#type().allows_marks(replacement.child(i).marks()) {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Test whether replacing the children between the given child indices
    /// with a node of the given type would leave the node's content valid.
    pub fn can_replace_with(
        &self,
        from: usize,
        to: usize,
        r#type: &NodeType,
        marks: Option<&MarkSet>,
    ) -> Result<bool, ContentMatchError> {
        if let Some(marks) = marks {
            if !self.r#type().allows_marks(marks) {
                return Ok(false);
            }
        }
        let start = self.content_match_at(from)?.match_type(r#type);
        let end = start.and_then(|m| m.match_fragment_range(self.content(), to..));
        Ok(end.map_or(false, |m| m.valid_end()))
    }

    /// Test whether the given node's content could be appended to this
    /// node.
    pub fn can_append(&self, other: &Node) -> Result<bool, ContentMatchError> {
        if other.content().size() > 0 {
            self.can_replace(self.child_count(), self.child_count(), Some(other.content()), ..)
        } else {
            Ok(self.r#type().compatible_content(other.r#type()))
        }
    }

    /// Check whether this node and its descendants conform to the schema:
    /// content must match the content expressions, and mark sets must be
    /// normalised.
    pub fn check(&self) -> Result<(), CheckError> {
        if !self.r#type().valid_content(self.content()) {
            return Err(CheckError::InvalidContent {
                node: self.r#type().name().to_owned(),
            });
        }
        let mut normalised = MarkSet::NONE;
        for mark in self.marks() {
            normalised = mark.add_to_set(&normalised);
        }
        if !MarkSet::same_set(&normalised, self.marks()) {
            return Err(CheckError::InvalidMarks {
                node: self.r#type().name().to_owned(),
            });
        }
        for child in self.content().children() {
            child.check()?;
        }
        Ok(())
    }

    /// The JSON representation of this node.
    pub fn to_json(&self) -> Value {
        let mut obj = serde_json::Map::new();
        obj.insert(
            "type".to_owned(),
            Value::String(self.r#type().name().to_owned()),
        );
        if !self.attrs().is_empty() {
            obj.insert("attrs".to_owned(), self.attrs().to_object());
        }
        if self.child_count() > 0 {
            obj.insert("content".to_owned(), self.content().to_json());
        }
        if !self.marks().is_empty() {
            obj.insert(
                "marks".to_owned(),
                Value::Array(self.marks().into_iter().map(Mark::to_json).collect()),
            );
        }
        if let Some(text) = self.text() {
            obj.insert("text".to_owned(), Value::String(text.as_str().to_owned()));
        }
        Value::Object(obj)
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        Node::ptr_eq(self, other)
            || (self.same_markup(other)
                && self.data.text == other.data.text
                && self.data.content == other.data.content)
    }
}

impl Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(text) = self.text() {
            if self.marks().is_empty() {
                write!(f, "{:?}", text.as_str())
            } else {
                write!(f, "{:?}{:?}", text.as_str(), self.marks())
            }
        } else {
            write!(f, "{}", self.r#type().name())?;
            if !self.attrs().is_empty() {
                write!(f, "{:?}", self.attrs())?;
            }
            if self.child_count() > 0 {
                write!(f, "{:?}", self.content())?;
            }
            Ok(())
        }
    }
}

impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

/// The payload of a text node: a string that knows its length in utf-16
/// code units, which is the unit the position scheme counts text in.
#[derive(Derivative, Default, Debug, Clone, Eq, Deserialize)]
#[derivative(PartialEq)]
#[serde(from = "String")]
pub struct Text {
    #[derivative(PartialEq = "ignore")]
    len_utf16: usize,
    content: String,
}

impl Text {
    /// Return the contained string.
    pub fn as_str(&self) -> &str {
        &self.content
    }

    /// The length of this string if it were encoded in utf-16.
    pub fn len_utf16(&self) -> usize {
        self.len_utf16
    }

    /// Join two texts together.
    pub fn join(&self, other: &Self) -> Self {
        let mut content = String::with_capacity(self.content.len() + other.content.len());
        content.push_str(&self.content);
        content.push_str(&other.content);
        Text {
            content,
            len_utf16: self.len_utf16 + other.len_utf16,
        }
    }

    /// The sub-text between two utf-16 offsets.
    pub fn cut(&self, from: usize, to: usize) -> Text {
        Text::from(self.slice_units(from, to).to_owned())
    }

    /// Borrow the substring between two utf-16 offsets. Offsets past the
    /// end are clamped; an offset inside a surrogate pair is invalid.
    pub fn slice_units(&self, from: usize, to: usize) -> &str {
        let start = self.byte_offset(from);
        let end = self.byte_offset(to);
        &self.content[start..end.max(start)]
    }

    fn byte_offset(&self, units: usize) -> usize {
        let mut rest = units;
        for (at, c) in self.content.char_indices() {
            if rest == 0 {
                return at;
            }
            let width = c.len_utf16();
            if width > rest {
                panic!("text offset {} lands inside a surrogate pair", units);
            }
            rest -= width;
        }
        self.content.len()
    }
}

impl From<String> for Text {
    fn from(src: String) -> Text {
        Text {
            len_utf16: src.encode_utf16().count(),
            content: src,
        }
    }
}

impl From<&str> for Text {
    fn from(src: &str) -> Text {
        Text::from(src.to_owned())
    }
}

impl Serialize for Text {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.content.serialize(serializer)
    }
}
