use super::fragment::{Index, IndexError};
use super::{MarkSet, Node};
use derive_new::new;
use displaydoc::Display;
use std::cell::RefCell;
use std::fmt;
use thiserror::Error;

/// Errors at `resolve`.
#[derive(Debug, Copy, Clone, Display, Error, PartialEq, Eq)]
pub enum ResolveError {
    /// position {pos} out of range
    RangeError {
        /// The position that was out of range
        pos: usize,
    },
    /// index error: {0}
    Index(#[from] IndexError),
}

/// A step in the resolution path: an ancestor node, the index the path
/// takes into it, and the absolute position before the child at that index.
#[derive(Clone, PartialEq, new)]
pub struct ResolvedNode {
    /// The ancestor node
    pub node: Node,
    /// The index into the node's content
    pub index: usize,
    /// The absolute position before the child at `index`
    pub before: usize,
}

impl fmt::Debug for ResolvedNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} @ {} (index {})",
            self.node.r#type().name(),
            self.before,
            self.index
        )
    }
}

/// A resolved position: an integer position decomposed into the path of
/// ancestors it sits inside, with index and offset information at every
/// depth.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPos {
    pos: usize,
    path: Vec<ResolvedNode>,
    parent_offset: usize,
    depth: usize,
}

const RESOLVE_CACHE_SIZE: usize = 12;

struct ResolveCache {
    elts: Vec<Option<ResolvedPos>>,
    next: usize,
}

thread_local! {
    static RESOLVE_CACHE: RefCell<ResolveCache> = RefCell::new(ResolveCache {
        elts: vec![None; RESOLVE_CACHE_SIZE],
        next: 0,
    });
}

impl ResolvedPos {
    pub(crate) fn new(pos: usize, path: Vec<ResolvedNode>, parent_offset: usize) -> Self {
        Self {
            depth: path.len() - 1,
            pos,
            path,
            parent_offset,
        }
    }

    /// The position that was resolved.
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// The number of levels the parent of this position is removed from the
    /// root.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// The offset of this position into its parent node.
    pub fn parent_offset(&self) -> usize {
        self.parent_offset
    }

    /// The innermost node the position sits in. Text nodes never appear
    /// here: a position inside one reports the node *around* the text,
    /// since text carries no content of its own.
    pub fn parent(&self) -> &Node {
        self.node(self.depth)
    }

    /// The root the position was resolved against.
    pub fn doc(&self) -> &Node {
        self.node(0)
    }

    /// The ancestor at `depth`; depth 0 is the root, `self.depth()` the
    /// parent.
    pub fn node(&self, depth: usize) -> &Node {
        &self.path[depth].node
    }

    /// Which child of the ancestor at `depth` the path continues into.
    pub fn index(&self, depth: usize) -> usize {
        self.path[depth].index
    }

    /// The index pointing after this position into the ancestor at the
    /// given level.
    pub fn index_after(&self, depth: usize) -> usize {
        let index = self.index(depth);
        if depth == self.depth && self.text_offset() == 0 {
            index
        } else {
            index + 1
        }
    }

    /// The absolute position where the content of the ancestor at `depth`
    /// begins.
    pub fn start(&self, depth: usize) -> usize {
        if depth == 0 {
            0
        } else {
            self.path[depth - 1].before + 1
        }
    }

    /// The absolute position where the content of the ancestor at `depth`
    /// ends.
    pub fn end(&self, depth: usize) -> usize {
        self.start(depth) + self.node(depth).content().size()
    }

    /// The absolute position just in front of the ancestor at `depth` —
    /// or the position itself when `depth` is one past `self.depth()`.
    /// `None` at the root, which has no outside.
    pub fn before(&self, depth: usize) -> Option<usize> {
        if depth == 0 {
            None
        } else if depth == self.depth + 1 {
            Some(self.pos)
        } else {
            Some(self.path[depth - 1].before)
        }
    }

    /// The absolute position just behind the ancestor at `depth` — or the
    /// position itself when `depth` is one past `self.depth()`. `None` at
    /// the root, which has no outside.
    pub fn after(&self, depth: usize) -> Option<usize> {
        if depth == 0 {
            None
        } else if depth == self.depth + 1 {
            Some(self.pos)
        } else {
            Some(self.path[depth - 1].before + self.path[depth].node.node_size())
        }
    }

    /// When this position points into a text node, the distance between the
    /// position and the start of the text node. Zero otherwise.
    pub fn text_offset(&self) -> usize {
        self.pos - self.path[self.depth].before
    }

    /// The absolute position where the child at the given index of the node
    /// at the given depth starts.
    pub fn pos_at_index(&self, index: usize, depth: usize) -> usize {
        let node = self.node(depth);
        let mut pos = self.start(depth);
        for i in 0..index {
            pos += node.child(i).node_size();
        }
        pos
    }

    /// The node that ends at this position, if any; for a position inside
    /// a text node, the text up to the position.
    pub fn node_before(&self) -> Option<Node> {
        let index = self.index(self.depth);
        let d_off = self.text_offset();
        if d_off > 0 {
            return Some(self.parent().child(index).cut(0..d_off));
        }
        if index == 0 {
            None
        } else {
            Some(self.parent().child(index - 1).clone())
        }
    }

    /// The node that starts at this position, if any; for a position
    /// inside a text node, the text from the position on.
    pub fn node_after(&self) -> Option<Node> {
        let parent = self.parent();
        let index = self.index(self.depth);
        if index == parent.child_count() {
            return None;
        }
        let d_off = self.text_offset();
        let child = parent.child(index);
        if d_off > 0 {
            Some(child.cut(d_off..))
        } else {
            Some(child.clone())
        }
    }

    /// Get the marks at this position, factoring in the surrounding marks'
    /// inclusivity. A non-inclusive mark at the position's left side is only
    /// kept when the node after the position carries it too.
    pub fn marks(&self) -> MarkSet {
        let parent = self.parent();
        let index = self.index(self.depth);

        if parent.content().size() == 0 {
            return MarkSet::NONE;
        }
        if self.text_offset() > 0 {
            return parent.child(index).marks().clone();
        }

        let before = if index > 0 {
            parent.maybe_child(index - 1)
        } else {
            None
        };
        let (main, other) = match before {
            Some(main) => (main, parent.maybe_child(index)),
            None => match parent.maybe_child(index) {
                Some(other) => (other, None),
                None => return MarkSet::NONE,
            },
        };

        let mut marks = main.marks().clone();
        let mut i = 0;
        while i < marks.len() {
            let mark = marks.marks()[i].clone();
            if !mark.r#type().inclusive() && other.map_or(true, |o| !mark.is_in_set(o.marks())) {
                marks = mark.remove_from_set(&marks);
            } else {
                i += 1;
            }
        }
        marks
    }

    /// Get the marks that should be applied to text inserted after a
    /// deletion spanning from this position to `end`. Returns `None` when
    /// no inline content follows this position.
    pub fn marks_across(&self, end: &ResolvedPos) -> Option<MarkSet> {
        let after = self.parent().maybe_child(self.index(self.depth))?;
        if !after.is_inline() {
            return None;
        }
        let next = end.parent().maybe_child(end.index(end.depth));
        let mut marks = after.marks().clone();
        let mut i = 0;
        while i < marks.len() {
            let mark = marks.marks()[i].clone();
            if !mark.r#type().inclusive() && next.map_or(true, |n| !mark.is_in_set(n.marks())) {
                marks = mark.remove_from_set(&marks);
            } else {
                i += 1;
            }
        }
        Some(marks)
    }

    /// The depth up to which this position and the given (absolute)
    /// position share the same parent nodes.
    pub fn shared_depth(&self, pos: usize) -> usize {
        for depth in (1..=self.depth).rev() {
            if self.start(depth) <= pos && pos <= self.end(depth) {
                return depth;
            }
        }
        0
    }

    /// Returns a range based on the place where this position and the given
    /// position diverge around block content. If both point into the same
    /// textblock, for example, a range around that textblock is returned.
    /// If they point into different blocks, the range around those blocks
    /// in their shared ancestor is returned. The predicate, when given,
    /// must hold for the range's parent node.
    pub fn block_range(
        &self,
        other: &ResolvedPos,
        pred: Option<&dyn Fn(&Node) -> bool>,
    ) -> Option<NodeRange> {
        if other.pos < self.pos {
            return other.block_range(self, pred);
        }
        let skip = self.parent().r#type().inline_content() || self.pos == other.pos;
        let mut d = self.depth as isize - if skip { 1 } else { 0 };
        while d >= 0 {
            let depth = d as usize;
            if other.pos <= self.end(depth) && pred.map_or(true, |p| p(self.node(depth))) {
                return Some(NodeRange::new(self.clone(), other.clone(), depth));
            }
            d -= 1;
        }
        None
    }

    /// Resolve a position in the given document, without touching the
    /// memoisation cache.
    pub fn resolve(doc: &Node, pos: usize) -> Result<ResolvedPos, ResolveError> {
        if pos > doc.content().size() {
            return Err(ResolveError::RangeError { pos });
        }
        let mut path = Vec::new();
        let mut start = 0;
        let mut parent_offset = pos;
        let mut node = doc.clone();
        loop {
            let Index { index, offset } = node.content().find_index(parent_offset, false)?;
            let rem = parent_offset - offset;
            path.push(ResolvedNode::new(node.clone(), index, start + offset));
            if rem == 0 {
                break;
            }
            let child = node.child(index).clone();
            if child.is_text() {
                break;
            }
            parent_offset = rem - 1;
            start += offset + 1;
            node = child;
        }
        Ok(ResolvedPos::new(pos, path, parent_offset))
    }

    /// Resolve through the thread-local ring buffer, keyed by document
    /// identity and position.
    pub(crate) fn resolve_cached(doc: &Node, pos: usize) -> Result<ResolvedPos, ResolveError> {
        RESOLVE_CACHE.with(|cache| {
            let mut cache = cache.borrow_mut();
            for elt in cache.elts.iter().flatten() {
                if elt.pos == pos && Node::ptr_eq(elt.doc(), doc) {
                    return Ok(elt.clone());
                }
            }
            let result = ResolvedPos::resolve(doc, pos)?;
            let at = cache.next;
            cache.elts[at] = Some(result.clone());
            cache.next = (at + 1) % RESOLVE_CACHE_SIZE;
            Ok(result)
        })
    }
}

/// Represents a flat range of content: a contiguous run of child nodes of
/// a single parent node at a given depth.
#[derive(Debug, Clone, PartialEq, new)]
pub struct NodeRange {
    /// A resolved position across the start of the range
    pub from: ResolvedPos,
    /// A position across the end of the range
    pub to: ResolvedPos,
    /// The depth of the node that this range points into
    pub depth: usize,
}

impl NodeRange {
    /// The absolute position at the start of the range.
    pub fn start(&self) -> usize {
        self.from
            .before(self.depth + 1)
            .expect("range depth above root")
    }

    /// The absolute position at the end of the range.
    pub fn end(&self) -> usize {
        self.to.after(self.depth + 1).expect("range depth above root")
    }

    /// The parent node the range points into.
    pub fn parent(&self) -> &Node {
        self.from.node(self.depth)
    }

    /// The start index of the range in the parent.
    pub fn start_index(&self) -> usize {
        self.from.index(self.depth)
    }

    /// The end index of the range in the parent.
    pub fn end_index(&self) -> usize {
        self.to.index_after(self.depth)
    }
}
