use super::Node;
use derivative::Derivative;
use derive_new::new;
use displaydoc::Display;
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use std::ops::{Bound, RangeBounds};
use std::rc::Rc;
use thiserror::Error;

/// Pin a range expression down to concrete `(from, to)` offsets in the
/// offset space it is applied to, substituting `0` and `or_end` for
/// unbounded ends.
pub(crate) fn range_span<R: RangeBounds<usize>>(range: R, or_end: usize) -> (usize, usize) {
    let from = match range.start_bound() {
        Bound::Unbounded => 0,
        Bound::Included(&at) => at,
        Bound::Excluded(&at) => at + 1,
    };
    let to = match range.end_bound() {
        Bound::Unbounded => or_end,
        Bound::Included(&at) => at + 1,
        Bound::Excluded(&at) => at,
    };
    (from, to)
}

/// Error when no child index exists for a position.
#[derive(Debug, Copy, Clone, Display, Error, PartialEq, Eq)]
pub enum IndexError {
    /// position {pos} outside of fragment
    OutOfRange {
        /// The offending position
        pos: usize,
    },
}

/// A child index and the offset at which that child starts.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, new)]
pub(crate) struct Index {
    pub index: usize,
    pub offset: usize,
}

#[derive(Derivative)]
#[derivative(Debug, PartialEq)]
struct FragInner {
    children: Vec<Node>,
    #[derivative(PartialEq = "ignore")]
    size: usize,
}

/// An ordered run of sibling nodes, with the summed size of its children
/// kept alongside.
///
/// Fragments are immutable: operations hand back new fragments, and a
/// clone shares the child list. The empty fragment is a `const` and never
/// allocates.
#[derive(Clone)]
pub struct Fragment {
    inner: Option<Rc<FragInner>>,
}

impl Fragment {
    /// The shared empty fragment.
    pub const EMPTY: Self = Fragment { inner: None };

    /// Create a new empty fragment.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_parts(children: Vec<Node>, size: usize) -> Self {
        if children.is_empty() {
            Fragment::EMPTY
        } else {
            Fragment {
                inner: Some(Rc::new(FragInner { children, size })),
            }
        }
    }

    /// The summed `node_size` of the children. This is the authoritative
    /// extent of the fragment's offset space.
    pub fn size(&self) -> usize {
        self.inner.as_ref().map_or(0, |inner| inner.size)
    }

    /// Get a slice of all child nodes.
    pub fn children(&self) -> &[Node] {
        self.inner.as_ref().map_or(&[], |inner| &inner.children[..])
    }

    /// The first child of the fragment, or `None` if it is empty.
    pub fn first_child(&self) -> Option<&Node> {
        self.children().first()
    }

    /// The last child of the fragment, or `None` if it is empty.
    pub fn last_child(&self) -> Option<&Node> {
        self.children().last()
    }

    /// The number of child nodes in this fragment.
    pub fn child_count(&self) -> usize {
        self.children().len()
    }

    /// The child at `index`; panics when no such child exists.
    pub fn child(&self, index: usize) -> &Node {
        &self.children()[index]
    }

    /// The child at `index`, or `None` when out of range.
    pub fn maybe_child(&self, index: usize) -> Option<&Node> {
        self.children().get(index)
    }

    /// Concatenate two fragments. When the seam joins two text nodes with
    /// identical markup, they become a single text node.
    pub fn append(self, other: Fragment) -> Fragment {
        if other.child_count() == 0 {
            return self;
        }
        if self.child_count() == 0 {
            return other;
        }
        let size = self.size() + other.size();
        let mut children = self.children().to_vec();
        let mut rest = other.children();
        let merged = {
            let last = children.last().expect("nonempty fragment");
            let first = &rest[0];
            match (last.text(), first.text()) {
                (Some(lt), Some(ft)) if last.same_markup(first) => {
                    Some(last.with_text(lt.join(ft)))
                }
                _ => None,
            }
        };
        if let Some(node) = merged {
            *children.last_mut().expect("nonempty fragment") = node;
            rest = &rest[1..];
        }
        children.extend_from_slice(rest);
        Fragment::from_parts(children, size)
    }

    /// The part of this fragment's offset space covered by `range`, as a
    /// fragment. Children the range cuts through are themselves cut.
    pub fn cut<R: RangeBounds<usize>>(&self, range: R) -> Self {
        let (from, to) = range_span(range, self.size());

        if from == 0 && to == self.size() {
            return self.clone();
        }

        let mut result = Vec::new();
        let mut size = 0;
        if to > from {
            let mut pos = 0;
            for child in self.children() {
                if pos >= to {
                    break;
                }
                let end = pos + child.node_size();
                if end > from {
                    let new_child = if pos < from || end > to {
                        if let Some(text) = child.text() {
                            let start = from.saturating_sub(pos);
                            let stop = usize::min(text.len_utf16(), to - pos);
                            child.cut(start..stop)
                        } else {
                            let inner_start = pos + 1;
                            let start = from.saturating_sub(inner_start);
                            let stop = usize::min(child.content().size(), to - inner_start);
                            child.cut(start..stop)
                        }
                    } else {
                        child.clone()
                    };
                    size += new_child.node_size();
                    result.push(new_child);
                }
                pos = end;
            }
        }
        Fragment::from_parts(result, size)
    }

    /// Cut out the sub-fragment between the two given child indices.
    pub fn cut_by_index(&self, from: usize, to: usize) -> Self {
        if from == to {
            return Fragment::EMPTY;
        }
        let children = self.children()[from..to].to_vec();
        let size = children.iter().map(Node::node_size).sum();
        Fragment::from_parts(children, size)
    }

    /// A fragment with the child at `index` swapped for `node`, its size
    /// adjusted by the difference. Returns this fragment when the new child
    /// equals the old one.
    pub fn replace_child(&self, index: usize, node: Node) -> Fragment {
        let current = &self.children()[index];
        if *current == node {
            return self.clone();
        }
        let size = self.size() + node.node_size() - current.node_size();
        let mut children = self.children().to_vec();
        children[index] = node;
        Fragment::from_parts(children, size)
    }

    /// Create a new fragment by prepending the given node.
    pub fn add_to_start(&self, node: Node) -> Fragment {
        let size = self.size() + node.node_size();
        let mut children = Vec::with_capacity(self.child_count() + 1);
        children.push(node);
        children.extend_from_slice(self.children());
        Fragment::from_parts(children, size)
    }

    /// Create a new fragment by appending the given node.
    pub fn add_to_end(&self, node: Node) -> Fragment {
        let size = self.size() + node.node_size();
        let mut children = self.children().to_vec();
        children.push(node);
        Fragment::from_parts(children, size)
    }

    /// Depth-first walk over the descendants whose span overlaps
    /// `[from, to)`, calling `f` with each node, its position, its parent,
    /// and its index. Returning `false` from `f` skips that node's
    /// children.
    pub fn nodes_between<F>(
        &self,
        from: usize,
        to: usize,
        f: &mut F,
        node_start: usize,
        parent: Option<&Node>,
    ) where
        F: FnMut(&Node, usize, Option<&Node>, usize) -> bool,
    {
        let mut pos = 0;
        for (index, child) in self.children().iter().enumerate() {
            if pos >= to {
                break;
            }
            let end = pos + child.node_size();
            if end > from && f(child, node_start + pos, parent, index) {
                let content = child.content();
                if content.size() > 0 {
                    let start = pos + 1;
                    content.nodes_between(
                        from.saturating_sub(start),
                        usize::min(content.size(), to.saturating_sub(start)),
                        f,
                        node_start + start,
                        Some(child),
                    );
                }
            }
            pos = end;
        }
    }

    /// Append the text found between `from` and `to` onto `text`, writing
    /// `block_separator` at each block boundary and `leaf_text` in place of
    /// non-text leaves.
    pub fn text_between(
        &self,
        text: &mut String,
        mut separated: bool,
        from: usize,
        to: usize,
        block_separator: Option<&str>,
        leaf_text: Option<&str>,
    ) {
        self.nodes_between(
            from,
            to,
            &mut move |node, pos, _parent, _index| {
                if let Some(txt) = node.text() {
                    let start = from.saturating_sub(pos);
                    text.push_str(txt.slice_units(start, to - pos));
                    separated = block_separator.is_none();
                } else if node.is_leaf() {
                    if let Some(leaf_text) = leaf_text {
                        text.push_str(leaf_text);
                    }
                    separated = block_separator.is_none();
                } else if !separated && node.is_block() {
                    text.push_str(block_separator.unwrap_or(""));
                    separated = true;
                }
                true
            },
            0,
            None,
        )
    }

    /// Find the first position at which this fragment and another fragment
    /// differ, or `None` if they are the same.
    pub fn find_diff_start(&self, other: &Fragment, pos: usize) -> Option<usize> {
        let mut pos = pos;
        let mut i = 0;
        loop {
            if i == self.child_count() || i == other.child_count() {
                return if self.child_count() == other.child_count() {
                    None
                } else {
                    Some(pos)
                };
            }
            let child_a = self.child(i);
            let child_b = other.child(i);
            if child_a == child_b {
                pos += child_a.node_size();
                i += 1;
                continue;
            }
            if !child_a.same_markup(child_b) {
                return Some(pos);
            }
            if let (Some(ta), Some(tb)) = (child_a.text(), child_b.text()) {
                if ta != tb {
                    let mut add = 0;
                    for (ca, cb) in ta.as_str().chars().zip(tb.as_str().chars()) {
                        if ca != cb {
                            break;
                        }
                        add += ca.len_utf16();
                    }
                    return Some(pos + add);
                }
            }
            if child_a.content().size() > 0 || child_b.content().size() > 0 {
                if let Some(inner) = child_a
                    .content()
                    .find_diff_start(child_b.content(), pos + 1)
                {
                    return Some(inner);
                }
            }
            pos += child_a.node_size();
            i += 1;
        }
    }

    /// Find the first position, searching from the end, at which this
    /// fragment and the given fragment differ, or `None` if they are the
    /// same. Since the tails may align to different absolute positions, two
    /// offsets are returned: one in this fragment, one in the other.
    pub fn find_diff_end(
        &self,
        other: &Fragment,
        pos_a: usize,
        pos_b: usize,
    ) -> Option<(usize, usize)> {
        let mut i_a = self.child_count();
        let mut i_b = other.child_count();
        let mut pos_a = pos_a;
        let mut pos_b = pos_b;
        loop {
            if i_a == 0 || i_b == 0 {
                return if i_a == i_b {
                    None
                } else {
                    Some((pos_a, pos_b))
                };
            }
            i_a -= 1;
            i_b -= 1;
            let child_a = self.child(i_a);
            let child_b = other.child(i_b);
            let size = child_a.node_size();
            if child_a == child_b {
                pos_a -= size;
                pos_b -= size;
                continue;
            }
            if !child_a.same_markup(child_b) {
                return Some((pos_a, pos_b));
            }
            if let (Some(ta), Some(tb)) = (child_a.text(), child_b.text()) {
                if ta != tb {
                    let mut same = 0;
                    for (ca, cb) in ta.as_str().chars().rev().zip(tb.as_str().chars().rev()) {
                        if ca != cb {
                            break;
                        }
                        same += ca.len_utf16();
                    }
                    return Some((pos_a - same, pos_b - same));
                }
            }
            if child_a.content().size() > 0 || child_b.content().size() > 0 {
                if let Some(inner) =
                    child_a
                        .content()
                        .find_diff_end(child_b.content(), pos_a - 1, pos_b - 1)
                {
                    return Some(inner);
                }
            }
            pos_a -= size;
            pos_b -= size;
        }
    }

    pub(crate) fn find_index(&self, pos: usize, round: bool) -> Result<Index, IndexError> {
        if pos == 0 {
            return Ok(Index::new(0, 0));
        }
        if pos == self.size() {
            return Ok(Index::new(self.child_count(), pos));
        }
        if pos > self.size() {
            return Err(IndexError::OutOfRange { pos });
        }
        let mut offset = 0;
        for (index, child) in self.children().iter().enumerate() {
            let end = offset + child.node_size();
            if end >= pos {
                // On a boundary the later index wins; inside a child,
                // `round` decides.
                return Ok(if end == pos || round {
                    Index::new(index + 1, end)
                } else {
                    Index::new(index, offset)
                });
            }
            offset = end;
        }
        panic!("fragment size {} does not cover position {}", self.size(), pos)
    }

    /// The JSON representation of this fragment: `null` when empty, the
    /// array of child nodes otherwise.
    pub fn to_json(&self) -> Value {
        if self.child_count() == 0 {
            Value::Null
        } else {
            Value::Array(self.children().iter().map(Node::to_json).collect())
        }
    }
}

impl Default for Fragment {
    fn default() -> Self {
        Fragment::EMPTY
    }
}

impl PartialEq for Fragment {
    fn eq(&self, other: &Self) -> bool {
        match (&self.inner, &other.inner) {
            (None, None) => true,
            (Some(a), Some(b)) => Rc::ptr_eq(a, b) || a == b,
            _ => self.child_count() == 0 && other.child_count() == 0,
        }
    }
}

impl fmt::Debug for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.children()).finish()
    }
}

impl Serialize for Fragment {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl From<Vec<Node>> for Fragment {
    /// Build a fragment from a list of nodes, merging adjacent text nodes
    /// with the same markup.
    fn from(nodes: Vec<Node>) -> Fragment {
        if nodes.is_empty() {
            return Fragment::EMPTY;
        }
        let mut joined: Vec<Node> = Vec::with_capacity(nodes.len());
        let mut size = 0;
        for node in nodes {
            size += node.node_size();
            let merge = match joined.last() {
                Some(last) if node.is_text() && last.same_markup(&node) => {
                    let lt = last.text().expect("text node");
                    let nt = node.text().expect("text node");
                    Some(last.with_text(lt.join(nt)))
                }
                _ => None,
            };
            match merge {
                Some(merged) => *joined.last_mut().expect("nonempty") = merged,
                None => joined.push(node),
            }
        }
        Fragment::from_parts(joined, size)
    }
}

impl From<Node> for Fragment {
    fn from(node: Node) -> Fragment {
        let size = node.node_size();
        Fragment::from_parts(vec![node], size)
    }
}

impl From<Option<Node>> for Fragment {
    fn from(node: Option<Node>) -> Fragment {
        match node {
            Some(node) => Fragment::from(node),
            None => Fragment::EMPTY,
        }
    }
}
