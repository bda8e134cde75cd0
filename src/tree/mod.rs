//! The key tree
//!
//! - [`Cachetree`]: root node owning the store and tree-wide config
//! - [`KeyNode`]: one compound key, its field operations and its children
//! - [`Schema`] / [`ChildDef`]: declarative child definitions

pub mod config;
mod error;
mod node;
mod root;
mod schema;

pub use crate::key::{CompoundKey, Segment};
pub use config::TreeConfig;
pub use error::{TreeError, TreeResult};
pub use node::KeyNode;
pub use root::{Cachetree, TreeHandle};
pub use schema::{AccessorKind, ChildDef, KeyRule, Predicate, Schema, Validator};
