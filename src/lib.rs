#![warn(missing_docs)]
//! # An immutable rich-text document model
//!
//! This crate implements the content model of a rich-text document engine: a
//! persistent tree of nodes and marks constrained by a runtime-compiled
//! [`Schema`], an integer position scheme with a memoised resolver, and a
//! schema-validated structural replace over partially-open [`Slice`]s.
//!
//! Documents are plain values. Every operation that would "change" a node
//! returns a new node that shares all untouched subtrees with the old one,
//! so old document versions stay valid and cheap to keep around.
//!
//! [`Schema`]: model::Schema
//! [`Slice`]: model::Slice

#[cfg(test)]
mod tests;

pub mod basic;
pub mod model;
