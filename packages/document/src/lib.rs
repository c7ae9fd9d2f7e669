//! # DarkDOM Document
//!
//! The document-tree collaborator the engine runs against: the
//! [`DocumentTree`] trait with its query/mutation primitives, a selector
//! engine, and [`MemoryDocument`], an arena-backed implementation used by
//! tests, benches and headless hosts.

pub mod memory;
pub mod selector;
pub mod tree;

pub use memory::{MemoryDocument, RecordedEvent};
pub use selector::{Selector, SelectorError};
pub use tree::{DocumentTree, DomEvent, NodeId, NodeKind};
