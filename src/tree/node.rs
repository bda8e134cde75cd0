//! Key nodes

use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::fmt;

use super::error::{TreeError, TreeResult};
use super::root::TreeHandle;
use super::schema::{AccessorKind, ChildDef, KeyRule, Schema, SchemaEntry};
use crate::key::{CompoundKey, Segment};
use crate::store::{FieldReply, FieldValue, FieldWrites, KeyPattern, StoreResult};

/// Names taken by node operations; a child may not shadow them
const RESERVED_NAMES: &[&str] = &[
  "get", "set", "exists", "del", "flush", "add", "key", "root", "child_key", "fields",
];

/// One compound key in the tree.
///
/// A node holds its key, a handle to the tree it belongs to (store and
/// tree-wide config) and the children registered on it. The key never
/// changes after construction.
pub struct KeyNode {
  key: CompoundKey,
  tree: TreeHandle,
  schema: RwLock<BTreeMap<String, SchemaEntry>>,
}

impl KeyNode {
  /// Build a descendant node. The key must have more than one segment.
  pub fn new(key: impl Into<CompoundKey>, tree: &TreeHandle) -> TreeResult<Self> {
    Self::build(key.into(), tree.clone(), false)
  }

  /// Build a one-segment node in `tree`'s store, with no children
  /// registered. The key must have exactly one segment.
  pub fn root(key: impl Into<CompoundKey>, tree: &TreeHandle) -> TreeResult<Self> {
    Self::build(key.into(), tree.clone(), true)
  }

  /// Root node over a key known to be a single valid segment
  pub(crate) fn with_valid_key(key: CompoundKey, tree: TreeHandle) -> Self {
    Self {
      key,
      tree,
      schema: RwLock::new(BTreeMap::new()),
    }
  }

  fn build(key: CompoundKey, tree: TreeHandle, root: bool) -> TreeResult<Self> {
    if !key.is_valid() {
      return Err(TreeError::InvalidKey(format!("{:?}", key.segments())));
    }
    let depth_ok = if root { key.len() == 1 } else { key.len() > 1 };
    if !depth_ok {
      return Err(TreeError::InvalidKey(format!(
        "{} node needs {} segment(s), got {}",
        if root { "root" } else { "child" },
        if root { "exactly one" } else { "more than one" },
        key.len()
      )));
    }
    Ok(Self::with_valid_key(key, tree))
  }

  pub fn key(&self) -> &CompoundKey {
    &self.key
  }

  pub fn tree(&self) -> &TreeHandle {
    &self.tree
  }

  pub fn is_root(&self) -> bool {
    self.key.len() == 1
  }

  /// Joined store key for this node, using the tree's join delimiter
  pub fn cache_key(&self) -> Option<String> {
    self.key.join(self.tree.delimiter())
  }

  /// This node's key extended by `segment`, `None` for an invalid segment
  pub fn child_key(&self, segment: impl Into<Segment>) -> Option<CompoundKey> {
    self.key.child(segment)
  }

  // ==========================================================================
  // Field operations
  // ==========================================================================

  /// Read fields (all of them when `fields` is empty)
  pub async fn get(&self, fields: &[&str]) -> StoreResult<FieldReply> {
    self.tree.store().get(&self.key, fields).await
  }

  /// Read one field; `None` when it was never stored
  pub async fn get_field(&self, field: &str) -> StoreResult<Option<FieldValue>> {
    Ok(self.get(&[field]).await?.into_value())
  }

  pub async fn set(&self, writes: FieldWrites) -> StoreResult<usize> {
    self.tree.store().set(&self.key, writes).await
  }

  pub async fn set_field(
    &self,
    field: impl Into<String>,
    value: impl Into<FieldValue>,
  ) -> StoreResult<usize> {
    self.set(FieldWrites::pair(field, value)).await
  }

  pub async fn exists(&self, field: Option<&str>) -> StoreResult<bool> {
    self.tree.store().exists(&self.key, field).await
  }

  pub async fn del(&self, fields: &[&str]) -> StoreResult<usize> {
    self.tree.store().del(&self.key, fields).await
  }

  /// Field names stored under this node (extended store contract)
  pub async fn fields(&self) -> StoreResult<Vec<String>> {
    self.tree.store().fields(&self.key).await
  }

  /// Remove this node's key together with every key below it.
  ///
  /// Descendants are listed first; if that fails nothing is deleted.
  /// Atomicity of the final removal is whatever the store's `flush` gives.
  pub async fn flush(&self) -> StoreResult<usize> {
    let store = self.tree.store();
    let pattern = KeyPattern::descendants(&self.key);
    let descendants = store.keys(&pattern).await?;

    let mut keys = Vec::with_capacity(descendants.len() + 1);
    keys.push(self.key.clone());
    keys.extend(descendants.into_iter().map(CompoundKey::from));
    tracing::debug!("flush {:?} with {} descendant(s)", self.key, keys.len() - 1);
    store.flush(&keys).await
  }

  // ==========================================================================
  // Schema
  // ==========================================================================

  /// Register a named child.
  ///
  /// Ignored when the name is empty, already registered, or shadows a node
  /// operation; the first definition of a name stays in effect.
  pub fn add(&self, name: impl Into<String>, def: impl Into<ChildDef>) -> &Self {
    self.register(name.into(), &def.into());
    self
  }

  /// Register every entry of `schema`
  pub fn add_all(&self, schema: &Schema) -> &Self {
    for (name, def) in schema.iter() {
      self.register(name.to_string(), def);
    }
    self
  }

  fn register(&self, name: String, def: &ChildDef) {
    if name.is_empty() {
      tracing::warn!("ignoring child with empty name on {:?}", self.key);
      return;
    }
    if RESERVED_NAMES.contains(&name.as_str()) {
      tracing::warn!(
        "ignoring child '{}' on {:?}: name is a node operation",
        name,
        self.key
      );
      return;
    }

    let mut schema = self.schema.write();
    if schema.contains_key(&name) {
      tracing::warn!(
        "ignoring duplicate child '{}' on {:?}: first definition kept",
        name,
        self.key
      );
      return;
    }
    let entry = SchemaEntry::from_def(def, self.tree.config().use_properties);
    schema.insert(name, entry);
  }

  /// Traverse to a registered child.
  ///
  /// Fixed children ignore `value`; other children validate it and append
  /// it (after any prefix) to this node's key. Nested definitions are
  /// registered on the returned node.
  pub fn child(&self, name: &str, value: Option<Segment>) -> TreeResult<KeyNode> {
    let entry = self.entry(name)?;
    self.create(name, &entry, value)
  }

  /// Traverse a function child with a value
  pub fn at(&self, name: &str, value: impl Into<Segment>) -> TreeResult<KeyNode> {
    let entry = self.entry(name)?;
    if entry.kind != AccessorKind::Function {
      return Err(TreeError::WrongAccessor(name.to_string()));
    }
    self.create(name, &entry, Some(value.into()))
  }

  /// Traverse a function child without a value
  pub fn call(&self, name: &str) -> TreeResult<KeyNode> {
    let entry = self.entry(name)?;
    if entry.kind != AccessorKind::Function {
      return Err(TreeError::WrongAccessor(name.to_string()));
    }
    self.create(name, &entry, None)
  }

  /// Read a property child (fixed children on property-mode trees)
  pub fn prop(&self, name: &str) -> TreeResult<KeyNode> {
    let entry = self.entry(name)?;
    if entry.kind != AccessorKind::Property {
      return Err(TreeError::WrongAccessor(name.to_string()));
    }
    self.create(name, &entry, None)
  }

  fn entry(&self, name: &str) -> TreeResult<SchemaEntry> {
    self
      .schema
      .read()
      .get(name)
      .cloned()
      .ok_or_else(|| TreeError::UnknownChild(name.to_string()))
  }

  fn create(&self, name: &str, entry: &SchemaEntry, value: Option<Segment>) -> TreeResult<KeyNode> {
    let segment = entry.resolve(name, value).map_err(|e| {
      tracing::debug!("child '{}' of {:?}: {}", name, self.key, e);
      e
    })?;
    let key = self
      .child_key(segment.clone())
      .ok_or_else(|| TreeError::InvalidKey(format!("invalid segment '{}'", segment)))?;
    let node = KeyNode::new(key, &self.tree)?;
    node.add_all(&entry.children);
    Ok(node)
  }

  /// Registered child names, sorted
  pub fn names(&self) -> Vec<String> {
    self.schema.read().keys().cloned().collect()
  }

  pub fn has_child(&self, name: &str) -> bool {
    self.schema.read().contains_key(name)
  }

  pub fn accessor(&self, name: &str) -> Option<AccessorKind> {
    self.schema.read().get(name).map(|e| e.kind)
  }

  pub fn rule(&self, name: &str) -> Option<KeyRule> {
    self.schema.read().get(name).map(|e| e.rule.clone())
  }
}

impl Clone for KeyNode {
  fn clone(&self) -> Self {
    Self {
      key: self.key.clone(),
      tree: self.tree.clone(),
      schema: RwLock::new(self.schema.read().clone()),
    }
  }
}

impl fmt::Debug for KeyNode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("KeyNode")
      .field("key", &self.key)
      .field("children", &self.names())
      .finish()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::tree::Cachetree;

  #[test]
  fn test_clone_copies_schema() {
    let tree = Cachetree::new();
    tree.add("alpha", "bravo");
    let copy = tree.node().clone();
    copy.add("charlie", "delta");
    assert_eq!(copy.names(), vec!["alpha", "charlie"]);
    assert_eq!(tree.names(), vec!["alpha"]);
  }

  #[test]
  fn test_children_share_tree() {
    let tree = Cachetree::new();
    tree.add("alpha", ChildDef::any());
    let child = tree.at("alpha", "x").unwrap();
    assert!(child.tree().same_tree(tree.tree()));
  }

  #[test]
  fn test_flush_includes_own_key() {
    tokio_test::block_on(async {
      let tree = Cachetree::new();
      tree.add("alpha", ChildDef::any());
      let node = tree.at("alpha", "x").unwrap();
      node.set_field("f", 1).await.unwrap();
      assert_eq!(node.flush().await.unwrap(), 1);
      assert!(!node.exists(None).await.unwrap());
    });
  }
}
