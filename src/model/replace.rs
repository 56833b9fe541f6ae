use super::fragment::{Index, IndexError};
use super::{ContentMatchError, Fragment, Node, NodeType, ResolveError, ResolvedPos};
use displaydoc::Display;
use log::trace;
use serde::{Serialize, Serializer};
use serde_json::Value;
use thiserror::Error;

/// A slice represents a piece cut out of a larger document. It stores not
/// only a fragment, but also the depth up to which nodes on both sides are
/// "open": cut through, so that their content may be a valid start, middle,
/// or end of a child sequence rather than a complete one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Slice {
    /// The fragment the slice carries.
    pub content: Fragment,
    /// How many levels are cut through on the left edge.
    pub open_start: usize,
    /// How many levels are cut through on the right edge.
    pub open_end: usize,
}

impl Slice {
    /// Create a slice. A non-zero open depth requires the corresponding
    /// edge of the fragment to nest at least that deep. Open nodes need not
    /// satisfy their content expressions, but their content should be a
    /// plausible start, middle, or end of one, depending on which sides
    /// are open.
    pub fn new(content: Fragment, open_start: usize, open_end: usize) -> Slice {
        Slice {
            content,
            open_start,
            open_end,
        }
    }

    /// The size a slice would add when inserted into a document.
    pub fn size(&self) -> usize {
        self.content.size() - self.open_start - self.open_end
    }

    /// Create a slice from a fragment, taking the maximum possible open
    /// depth on both sides: descending along the first and last children
    /// while they are not leaves. Isolating nodes stop the descent unless
    /// `open_isolating` is set.
    pub fn max_open(fragment: Fragment, open_isolating: bool) -> Slice {
        let mut open_start = 0;
        let mut cur = fragment.first_child();
        while let Some(node) = cur {
            if node.is_leaf() || (!open_isolating && node.r#type().spec().isolating) {
                break;
            }
            open_start += 1;
            cur = node.first_child();
        }
        let mut open_end = 0;
        let mut cur = fragment.last_child();
        while let Some(node) = cur {
            if node.is_leaf() || (!open_isolating && node.r#type().spec().isolating) {
                break;
            }
            open_end += 1;
            cur = node.last_child();
        }
        Slice::new(fragment, open_start, open_end)
    }

    /// Insert a fragment at the given position inside the slice's content,
    /// keeping the open depths intact. Returns `Ok(None)` when the
    /// insertion point cannot accommodate the fragment.
    pub fn insert_at(&self, pos: usize, fragment: Fragment) -> Result<Option<Slice>, InsertError> {
        let content = insert_into(&self.content, pos + self.open_start, fragment, None)?;
        Ok(content.map(|c| Slice::new(c, self.open_start, self.open_end)))
    }

    /// Remove the content between the given positions, which must be a
    /// "flat" range: its endpoints either fall inside the same child, or
    /// both sit at this slice's own depth.
    pub fn remove_between(&self, from: usize, to: usize) -> Result<Slice, RemoveError> {
        let content = remove_range(
            &self.content,
            from + self.open_start,
            to + self.open_start,
        )?;
        Ok(Slice::new(content, self.open_start, self.open_end))
    }

    /// The JSON representation of this slice: `null` when empty, otherwise
    /// the content with the non-zero open depths.
    pub fn to_json(&self) -> Value {
        if self.content.size() == 0 {
            return Value::Null;
        }
        let mut obj = serde_json::Map::new();
        obj.insert("content".to_owned(), self.content.to_json());
        if self.open_start > 0 {
            obj.insert("openStart".to_owned(), Value::from(self.open_start));
        }
        if self.open_end > 0 {
            obj.insert("openEnd".to_owned(), Value::from(self.open_end));
        }
        Value::Object(obj)
    }
}

impl Serialize for Slice {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

/// Error on insertion into a slice.
#[derive(Debug, Display, Error)]
pub enum InsertError {
    /// index error: {0}
    Index(#[from] IndexError),
    /// content match error: {0}
    Content(#[from] ContentMatchError),
}

/// Error on removal from a slice.
#[derive(Debug, Display, Error, PartialEq, Eq)]
pub enum RemoveError {
    /// removing a non-flat range
    NonFlat,
    /// index error: {0}
    Index(#[from] IndexError),
}

fn insert_into(
    content: &Fragment,
    dist: usize,
    insert: Fragment,
    parent: Option<&Node>,
) -> Result<Option<Fragment>, InsertError> {
    let Index { index, offset } = content.find_index(dist, false)?;
    let child = content.maybe_child(index);
    if offset == dist || matches!(child, Some(c) if c.is_text()) {
        if let Some(parent) = parent {
            if !parent.can_replace(index, index, Some(&insert), ..)? {
                return Ok(None);
            }
        }
        Ok(Some(
            content.cut(..dist).append(insert).append(content.cut(dist..)),
        ))
    } else {
        let child = child.expect("offset != dist implies a child").clone();
        let inner = insert_into(child.content(), dist - offset - 1, insert, None)?;
        Ok(inner.map(|inner| content.replace_child(index, child.copy(inner))))
    }
}

fn remove_range(content: &Fragment, from: usize, to: usize) -> Result<Fragment, RemoveError> {
    let Index { index, offset } = content.find_index(from, false)?;
    let child = content.maybe_child(index);
    let Index {
        index: index_to,
        offset: offset_to,
    } = content.find_index(to, false)?;
    if offset == from || matches!(child, Some(c) if c.is_text()) {
        if offset_to != to && !content.child(index_to).is_text() {
            return Err(RemoveError::NonFlat);
        }
        return Ok(content.cut(0..from).append(content.cut(to..)));
    }
    if index != index_to {
        return Err(RemoveError::NonFlat);
    }
    let child = child.expect("offset != from implies a child").clone();
    let inner = remove_range(child.content(), from - offset - 1, to - offset - 1)?;
    Ok(content.replace_child(index, child.copy(inner)))
}

/// An error that can occur when replacing a slice.
#[derive(Debug, Clone, Display, Error, PartialEq, Eq)]
pub enum ReplaceError {
    /// inserted content deeper than insertion position
    InsertTooDeep,
    /// inconsistent open depths
    InconsistentOpenDepths {
        /// The resolved depth of the `from` position
        from_depth: usize,
        /// The slice's left open depth
        open_start: usize,
        /// The resolved depth of the `to` position
        to_depth: usize,
        /// The slice's right open depth
        open_end: usize,
    },
    /// could not resolve a position: {0}
    Resolve(#[from] ResolveError),
    /// cannot join {0:?} onto {1:?}
    CannotJoin(NodeType, NodeType),
    /// invalid content for node {0:?}
    InvalidContent(NodeType),
}

pub(crate) fn replace(
    rp_from: &ResolvedPos,
    rp_to: &ResolvedPos,
    slice: &Slice,
) -> Result<Node, ReplaceError> {
    if slice.open_start > rp_from.depth() {
        Err(ReplaceError::InsertTooDeep)
    } else if rp_from.depth() - slice.open_start != rp_to.depth() - slice.open_end {
        Err(ReplaceError::InconsistentOpenDepths {
            from_depth: rp_from.depth(),
            open_start: slice.open_start,
            to_depth: rp_to.depth(),
            open_end: slice.open_end,
        })
    } else {
        trace!(
            "replace {}..{} with slice of size {}",
            rp_from.pos(),
            rp_to.pos(),
            slice.size()
        );
        replace_outer(rp_from, rp_to, slice, 0)
    }
}

fn replace_outer(
    rp_from: &ResolvedPos,
    rp_to: &ResolvedPos,
    slice: &Slice,
    depth: usize,
) -> Result<Node, ReplaceError> {
    let index = rp_from.index(depth);
    let node = rp_from.node(depth);
    if index == rp_to.index(depth) && depth < rp_from.depth() - slice.open_start {
        // The edit is still fully inside a single child at this level.
        let inner = replace_outer(rp_from, rp_to, slice, depth + 1)?;
        Ok(node.copy(node.content().replace_child(index, inner)))
    } else if slice.content.size() == 0 {
        // Pure deletion: join the two sides.
        let content = replace_two_way(rp_from, rp_to, depth)?;
        close(node, content)
    } else if slice.open_start == 0
        && slice.open_end == 0
        && rp_from.depth() == depth
        && rp_to.depth() == depth
    {
        // Flat case: no open nodes, both positions at this level.
        let parent = rp_from.parent();
        let content = parent.content();
        let new_content = content
            .cut(0..rp_from.parent_offset())
            .append(slice.content.clone())
            .append(content.cut(rp_to.parent_offset()..));
        close(parent, new_content)
    } else {
        let (node_with_slice, start, end) = prepare_slice_for_replace(slice, rp_from);
        let rp_start = ResolvedPos::resolve(&node_with_slice, start)?;
        let rp_end = ResolvedPos::resolve(&node_with_slice, end)?;
        let content = replace_three_way(rp_from, &rp_start, &rp_end, rp_to, depth)?;
        close(node, content)
    }
}

fn check_join(main: &Node, sub: &Node) -> Result<(), ReplaceError> {
    if sub.r#type().compatible_content(main.r#type()) {
        Ok(())
    } else {
        Err(ReplaceError::CannotJoin(
            sub.r#type().clone(),
            main.r#type().clone(),
        ))
    }
}

fn joinable<'a>(
    rp_before: &'a ResolvedPos,
    rp_after: &ResolvedPos,
    depth: usize,
) -> Result<&'a Node, ReplaceError> {
    let node = rp_before.node(depth);
    check_join(node, rp_after.node(depth))?;
    Ok(node)
}

fn add_node(child: Node, target: &mut Vec<Node>) {
    let merged = match (target.last(), child.text()) {
        (Some(last), Some(child_text)) if child.same_markup(last) => last
            .text()
            .map(|last_text| child.with_text(last_text.join(child_text))),
        _ => None,
    };
    match merged {
        Some(node) => *target.last_mut().expect("nonempty target") = node,
        None => target.push(child),
    }
}

/// Emit the children of the node at `depth` between the optional `start`
/// and `end` boundaries, including partial text slices at the boundaries
/// themselves. A missing boundary means the node's own edge on that side.
fn add_range(
    start: Option<&ResolvedPos>,
    end: Option<&ResolvedPos>,
    depth: usize,
    target: &mut Vec<Node>,
) {
    let node = end.or(start).expect("a range needs a boundary").node(depth);
    let mut start_index = 0;
    let end_index = match end {
        Some(rp_end) => rp_end.index(depth),
        None => node.child_count(),
    };

    if let Some(rp_start) = start {
        start_index = rp_start.index(depth);
        if rp_start.depth() > depth {
            start_index += 1;
        } else if rp_start.text_offset() > 0 {
            add_node(
                rp_start.node_after().expect("text offset implies a node"),
                target,
            );
            start_index += 1;
        }
    }
    for i in start_index..end_index {
        add_node(node.child(i).clone(), target);
    }
    if let Some(rp_end) = end {
        if rp_end.depth() == depth && rp_end.text_offset() > 0 {
            add_node(
                rp_end.node_before().expect("text offset implies a node"),
                target,
            );
        }
    }
}

fn close(node: &Node, content: Fragment) -> Result<Node, ReplaceError> {
    if node.r#type().valid_content(&content) {
        Ok(node.copy(content))
    } else {
        Err(ReplaceError::InvalidContent(node.r#type().clone()))
    }
}

fn replace_three_way(
    rp_from: &ResolvedPos,
    rp_start: &ResolvedPos,
    rp_end: &ResolvedPos,
    rp_to: &ResolvedPos,
    depth: usize,
) -> Result<Fragment, ReplaceError> {
    let open_start = if rp_from.depth() > depth {
        Some(joinable(rp_from, rp_start, depth + 1)?)
    } else {
        None
    };
    let open_end = if rp_to.depth() > depth {
        Some(joinable(rp_end, rp_to, depth + 1)?)
    } else {
        None
    };

    let mut content = Vec::new();
    add_range(None, Some(rp_from), depth, &mut content);
    match (open_start, open_end) {
        (Some(os), Some(oe)) if rp_start.index(depth) == rp_end.index(depth) => {
            check_join(os, oe)?;
            let inner = replace_three_way(rp_from, rp_start, rp_end, rp_to, depth + 1)?;
            let closed = close(os, inner)?;
            add_node(closed, &mut content);
        }
        (open_start, open_end) => {
            if let Some(os) = open_start {
                let inner = replace_two_way(rp_from, rp_start, depth + 1)?;
                add_node(close(os, inner)?, &mut content);
            }
            add_range(Some(rp_start), Some(rp_end), depth, &mut content);
            if let Some(oe) = open_end {
                let inner = replace_two_way(rp_end, rp_to, depth + 1)?;
                add_node(close(oe, inner)?, &mut content);
            }
        }
    }
    add_range(Some(rp_to), None, depth, &mut content);
    Ok(Fragment::from(content))
}

fn replace_two_way(
    rp_from: &ResolvedPos,
    rp_to: &ResolvedPos,
    depth: usize,
) -> Result<Fragment, ReplaceError> {
    let mut content = Vec::new();
    add_range(None, Some(rp_from), depth, &mut content);
    if rp_from.depth() > depth {
        let node = joinable(rp_from, rp_to, depth + 1)?;
        let inner = replace_two_way(rp_from, rp_to, depth + 1)?;
        add_node(close(node, inner)?, &mut content);
    }
    add_range(Some(rp_to), None, depth, &mut content);
    Ok(Fragment::from(content))
}

/// Wrap the slice's content in the nodes along `$along`'s spine so it can
/// be resolved like a little document of the same shape, and return that
/// node with the start and end positions of the original content in it.
fn prepare_slice_for_replace(slice: &Slice, rp_along: &ResolvedPos) -> (Node, usize, usize) {
    let extra = rp_along.depth() - slice.open_start;
    let parent = rp_along.node(extra);
    let mut node = parent.copy(slice.content.clone());
    for i in (0..extra).rev() {
        node = rp_along.node(i).copy(Fragment::from(node));
    }
    let start = slice.open_start + extra;
    let end = node.content().size() - slice.open_end - extra;
    (node, start, end)
}
