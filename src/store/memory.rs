//! In-memory reference store

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;

use super::config::MemoryStoreConfig;
use super::contract::{FieldReply, FieldWrites, Store, StoreError, StoreResult};
use super::events::{StoreChange, StoreChangeOperation};
use super::pattern::KeyPattern;
use super::value::FieldValue;
use crate::key::CompoundKey;

/// Store statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreStats {
  pub keys: usize,
  pub fields: usize,
  pub hits: u64,
  pub misses: u64,
}

impl StoreStats {
  pub fn hit_rate(&self) -> f64 {
    let total = self.hits + self.misses;
    if total == 0 {
      0.0
    } else {
      self.hits as f64 / total as f64
    }
  }
}

/// Fields stored under one joined key
#[derive(Debug, Clone)]
struct HashEntry {
  /// Insertion order of the key, reported by `keys`
  seq: u64,
  fields: BTreeMap<String, FieldValue>,
}

/// In-memory store keyed by joined compound keys.
///
/// One lock guards the whole map, so concurrent callers observe the
/// operations in some serial order.
pub struct MemoryStore {
  data: RwLock<HashMap<String, HashEntry>>,
  delimiter: String,
  next_seq: AtomicU64,
  hits: AtomicU64,
  misses: AtomicU64,
  change_tx: broadcast::Sender<StoreChange>,
}

impl Default for MemoryStore {
  fn default() -> Self {
    Self::new()
  }
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::with_config(MemoryStoreConfig::default())
  }

  pub fn with_config(config: MemoryStoreConfig) -> Self {
    let (change_tx, _) = broadcast::channel(1000);
    Self {
      data: RwLock::new(HashMap::new()),
      delimiter: config.delimiter,
      next_seq: AtomicU64::new(0),
      hits: AtomicU64::new(0),
      misses: AtomicU64::new(0),
      change_tx,
    }
  }

  pub fn delimiter(&self) -> &str {
    &self.delimiter
  }

  /// Join a compound key into its store key. A single-segment key passes
  /// through unchanged; `None` means the key is invalid.
  pub fn cache_key(&self, key: &CompoundKey) -> Option<String> {
    key.join(&self.delimiter)
  }

  /// Subscribe to store changes
  pub fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
    self.change_tx.subscribe()
  }

  /// Number of stored keys
  pub fn len(&self) -> usize {
    self.data.read().len()
  }

  pub fn is_empty(&self) -> bool {
    self.data.read().is_empty()
  }

  pub fn stats(&self) -> StoreStats {
    let data = self.data.read();
    StoreStats {
      keys: data.len(),
      fields: data.values().map(|e| e.fields.len()).sum(),
      hits: self.hits.load(Ordering::Relaxed),
      misses: self.misses.load(Ordering::Relaxed),
    }
  }

  fn emit_change(&self, change: StoreChange) {
    let _ = self.change_tx.send(change);
  }

  fn require_key(&self, key: &CompoundKey, op: &str) -> StoreResult<String> {
    self.cache_key(key).ok_or_else(|| {
      tracing::debug!("{}: invalid key {:?}", op, key);
      StoreError::InvalidKey
    })
  }

  fn record_lookup(&self, hit: bool) {
    if hit {
      self.hits.fetch_add(1, Ordering::Relaxed);
    } else {
      self.misses.fetch_add(1, Ordering::Relaxed);
    }
  }
}

#[async_trait]
impl Store for MemoryStore {
  async fn get(&self, key: &CompoundKey, fields: &[&str]) -> StoreResult<FieldReply> {
    let cache_key = self.require_key(key, "get")?;
    let data = self.data.read();
    let entry = data.get(&cache_key);
    self.record_lookup(entry.is_some());
    tracing::trace!("get {} {:?}", cache_key, fields);

    let reply = match fields {
      [] => FieldReply::All(entry.map(|e| e.fields.clone()).unwrap_or_default()),
      [field] => FieldReply::Value(entry.and_then(|e| e.fields.get(*field).cloned())),
      many => FieldReply::Fields(
        many
          .iter()
          .map(|field| {
            let value = entry.and_then(|e| e.fields.get(*field).cloned());
            (field.to_string(), value)
          })
          .collect(),
      ),
    };
    Ok(reply)
  }

  async fn set(&self, key: &CompoundKey, writes: FieldWrites) -> StoreResult<usize> {
    let cache_key = self.require_key(key, "set")?;
    if writes.is_empty() {
      tracing::debug!("set {}: no field writes", cache_key);
      return Err(StoreError::InvalidData);
    }
    let count = writes.distinct_fields();

    let mut touched: Vec<String> = Vec::with_capacity(writes.len());
    {
      let mut data = self.data.write();
      let entry = data.entry(cache_key.clone()).or_insert_with(|| HashEntry {
        seq: self.next_seq.fetch_add(1, Ordering::Relaxed),
        fields: BTreeMap::new(),
      });
      for (field, value) in writes.into_pairs() {
        if !touched.contains(&field) {
          touched.push(field.clone());
        }
        entry.fields.insert(field, value);
      }
    }

    tracing::trace!("set {} ({} fields)", cache_key, count);
    self.emit_change(StoreChange::new(cache_key, StoreChangeOperation::Set, touched));
    Ok(count)
  }

  async fn exists(&self, key: &CompoundKey, field: Option<&str>) -> StoreResult<bool> {
    let cache_key = self.require_key(key, "exists")?;
    let data = self.data.read();
    let exists = match (data.get(&cache_key), field) {
      (Some(entry), Some(field)) => entry.fields.contains_key(field),
      (Some(entry), None) => !entry.fields.is_empty(),
      (None, _) => false,
    };
    Ok(exists)
  }

  async fn del(&self, key: &CompoundKey, fields: &[&str]) -> StoreResult<usize> {
    let cache_key = self.require_key(key, "del")?;
    let mut removed: Vec<String> = Vec::new();
    {
      let mut data = self.data.write();
      if let Some(entry) = data.get_mut(&cache_key) {
        for field in fields {
          if entry.fields.remove(*field).is_some() {
            removed.push(field.to_string());
          }
        }
      }
    }

    let count = removed.len();
    tracing::trace!("del {} ({} removed)", cache_key, count);
    if count > 0 {
      self.emit_change(StoreChange::new(
        cache_key,
        StoreChangeOperation::Delete,
        removed,
      ));
    }
    Ok(count)
  }

  async fn keys(&self, pattern: &KeyPattern) -> StoreResult<Vec<String>> {
    let regex = pattern.compile(&self.delimiter).map_err(|e| {
      tracing::debug!("keys: {}", e);
      e
    })?;
    let data = self.data.read();
    let mut matches: Vec<(u64, &String)> = data
      .iter()
      .filter(|(k, _)| regex.is_match(k))
      .map(|(k, e)| (e.seq, k))
      .collect();
    matches.sort_by_key(|(seq, _)| *seq);

    tracing::trace!("keys {} ({} matches)", regex.as_str(), matches.len());
    Ok(matches.into_iter().map(|(_, k)| k.clone()).collect())
  }

  async fn flush(&self, keys: &[CompoundKey]) -> StoreResult<usize> {
    if keys.is_empty() {
      tracing::debug!("flush: no keys given");
      return Err(StoreError::InvalidKey);
    }

    let mut flushed: Vec<String> = Vec::new();
    {
      let mut data = self.data.write();
      for key in keys {
        if let Some(cache_key) = self.cache_key(key) {
          if data.remove(&cache_key).is_some() {
            flushed.push(cache_key);
          }
        }
      }
    }

    let count = flushed.len();
    tracing::trace!("flush {} keys ({} removed)", keys.len(), count);
    for cache_key in flushed {
      self.emit_change(StoreChange::new(
        cache_key,
        StoreChangeOperation::Flush,
        Vec::new(),
      ));
    }
    Ok(count)
  }

  fn key_delimiter(&self) -> Option<&str> {
    Some(&self.delimiter)
  }

  fn supports_fields(&self) -> bool {
    true
  }

  async fn fields(&self, key: &CompoundKey) -> StoreResult<Vec<String>> {
    let cache_key = self.require_key(key, "fields")?;
    let data = self.data.read();
    Ok(
      data
        .get(&cache_key)
        .map(|e| e.fields.keys().cloned().collect())
        .unwrap_or_default(),
    )
  }
}
