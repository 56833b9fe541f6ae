//! # The document content model
//!
//! Documents are trees of [`Node`]s tagged with [`Mark`]s, constrained by
//! a [`Schema`] whose content expressions compile into [`ContentMatch`]
//! automata. Flat integer positions resolve into [`ResolvedPos`] paths,
//! and [`Slice`]s of a document are spliced back in with
//! [`Node::replace`].

mod content;
mod de;
mod dom;
mod fragment;
mod mark;
mod node;
mod replace;
mod resolved_pos;
mod schema;

pub use content::{ContentMatch, ContentMatchError};
pub use de::JsonError;
pub use dom::{DomSpec, DomSpecError};
pub use fragment::{Fragment, IndexError};
pub use mark::{Mark, MarkSet};
pub use node::{CheckError, Node, Text};
pub use replace::{InsertError, RemoveError, ReplaceError, Slice};
pub use resolved_pos::{NodeRange, ResolveError, ResolvedNode, ResolvedPos};
pub use schema::{
    AttributeSpec, Attrs, MarkSpec, MarkType, NodeSpec, NodeType, Schema, SchemaError, SchemaSpec,
};

pub(crate) use fragment::range_span;
pub(crate) use replace::replace;
