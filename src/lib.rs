//! Hierarchical composite cache keys.
//!
//! A [`Cachetree`] is the root of a namespace of compound keys. Schema entries
//! declared with [`KeyNode::add`] describe how children are reached, and each
//! traversal yields a new [`KeyNode`] whose key is its parent's key plus one
//! segment. Field operations on a node are forwarded, with the node's key, to
//! the shared [`Store`].

pub mod key;
pub mod store;
pub mod tree;

pub use store::{
  FieldReply, FieldValue, FieldWrites, KeyPattern, MemoryStore, MemoryStoreConfig, Store,
  StoreChange, StoreChangeOperation, StoreError, StoreResult, StoreStats,
};
pub use tree::{
  AccessorKind, Cachetree, ChildDef, CompoundKey, KeyNode, KeyRule, Schema, Segment, TreeConfig,
  TreeError, TreeHandle, TreeResult, Validator,
};
