//! Tree root

use std::ops::Deref;
use std::sync::Arc;

use super::config::{TreeConfig, DEFAULT_PREFIX};
use super::error::TreeResult;
use super::node::KeyNode;
use crate::key::{CompoundKey, Segment};
use crate::store::{MemoryStore, MemoryStoreConfig, Store};

struct TreeShared {
  store: Arc<dyn Store>,
  config: TreeConfig,
}

/// Shared handle to a tree's store and config, held by every node
#[derive(Clone)]
pub struct TreeHandle {
  inner: Arc<TreeShared>,
}

impl TreeHandle {
  pub fn store(&self) -> &Arc<dyn Store> {
    &self.inner.store
  }

  pub fn config(&self) -> &TreeConfig {
    &self.inner.config
  }

  /// The store's join delimiter when it reports one, else the configured
  /// delimiter
  pub fn delimiter(&self) -> &str {
    self
      .inner
      .store
      .key_delimiter()
      .unwrap_or(&self.inner.config.delimiter)
  }

  /// Whether both handles belong to the same tree
  pub fn same_tree(&self, other: &TreeHandle) -> bool {
    Arc::ptr_eq(&self.inner, &other.inner)
  }
}

impl std::fmt::Debug for TreeHandle {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("TreeHandle")
      .field("config", &self.inner.config)
      .finish()
  }
}

/// The root node of a key tree.
///
/// Owns the store shared by every node and the tree-wide config, and
/// dereferences to the one-segment root [`KeyNode`].
#[derive(Debug, Clone)]
pub struct Cachetree {
  root: KeyNode,
}

impl Cachetree {
  /// In-memory tree rooted at `cache` with default options
  pub fn new() -> Self {
    Self::from_parts(None, TreeConfig::default())
  }

  /// Tree over an existing store with default options. Keys are joined
  /// with the store's delimiter when it reports one.
  pub fn with_store(store: Arc<dyn Store>) -> Self {
    Self::from_parts(Some(store), TreeConfig::default())
  }

  /// Tree from a config, building a memory store and registering the
  /// config's schema on the root
  pub fn with_config(config: TreeConfig) -> TreeResult<Self> {
    Self::open(None, None, config)
  }

  /// Explicit construction.
  ///
  /// `key` overrides `config.prefix` as the root segment. Without a store a
  /// [`MemoryStore`] using the tree delimiter is created.
  pub fn open(
    store: Option<Arc<dyn Store>>,
    key: Option<Segment>,
    config: TreeConfig,
  ) -> TreeResult<Self> {
    let schema = config.schema()?;
    let root_key = CompoundKey::from(key.unwrap_or_else(|| config.prefix.clone()));
    let handle = Self::handle(store, config);
    let root = KeyNode::root(root_key, &handle)?;
    if let Some(schema) = schema {
      root.add_all(&schema);
    }
    tracing::debug!("opened tree at {:?}", root.key());
    Ok(Self { root })
  }

  fn from_parts(store: Option<Arc<dyn Store>>, config: TreeConfig) -> Self {
    let root_key = CompoundKey::from(Segment::from(DEFAULT_PREFIX));
    let handle = Self::handle(store, config);
    Self {
      root: KeyNode::with_valid_key(root_key, handle),
    }
  }

  fn handle(store: Option<Arc<dyn Store>>, config: TreeConfig) -> TreeHandle {
    let store = store.unwrap_or_else(|| {
      Arc::new(MemoryStore::with_config(MemoryStoreConfig {
        delimiter: config.delimiter.clone(),
      }))
    });
    if let Some(delimiter) = store.key_delimiter() {
      if delimiter != config.delimiter {
        tracing::debug!(
          "store joins keys with '{}', not the configured '{}'",
          delimiter,
          config.delimiter
        );
      }
    }
    TreeHandle {
      inner: Arc::new(TreeShared { store, config }),
    }
  }

  pub fn store(&self) -> &Arc<dyn Store> {
    self.root.tree().store()
  }

  pub fn config(&self) -> &TreeConfig {
    self.root.tree().config()
  }

  pub fn node(&self) -> &KeyNode {
    &self.root
  }

  pub fn into_node(self) -> KeyNode {
    self.root
  }
}

impl Default for Cachetree {
  fn default() -> Self {
    Self::new()
  }
}

impl Deref for Cachetree {
  type Target = KeyNode;

  fn deref(&self) -> &KeyNode {
    &self.root
  }
}
