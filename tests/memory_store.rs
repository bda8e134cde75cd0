//! Memory store tests - field operations, key scans and flush

use cachetree::{
  CompoundKey, FieldReply, FieldValue, FieldWrites, KeyPattern, MemoryStore, MemoryStoreConfig,
  Segment, Store, StoreChangeOperation, StoreError,
};
use regex::Regex;
use serde_json::json;

fn key(parts: &[&str]) -> CompoundKey {
  parts.iter().map(|p| Segment::from(*p)).collect()
}

async fn phonetic_store() -> MemoryStore {
  let store = MemoryStore::new();
  for k in ["icao", "icao:more", "itu", "alpha:icao"] {
    let key = CompoundKey::split(k, ":");
    store.set(&key, FieldWrites::pair("f", 1)).await.unwrap();
  }
  store
}

// =============================================================================
// Get / Set
// =============================================================================

#[tokio::test]
async fn test_set_then_get_single_field() {
  let store = MemoryStore::new();
  let k = key(&["icao"]);
  assert_eq!(store.set(&k, FieldWrites::pair("alpha", "alfa")).await.unwrap(), 1);

  let reply = store.get(&k, &["alpha"]).await.unwrap();
  assert_eq!(reply, FieldReply::Value(Some(FieldValue::from("alfa"))));
}

#[tokio::test]
async fn test_get_missing_field_is_none() {
  let store = MemoryStore::new();
  let k = key(&["icao"]);
  assert_eq!(store.get(&k, &["alpha"]).await.unwrap(), FieldReply::Value(None));

  store.set(&k, FieldWrites::pair("bravo", 2)).await.unwrap();
  assert_eq!(store.get(&k, &["alpha"]).await.unwrap(), FieldReply::Value(None));
}

#[tokio::test]
async fn test_get_all_fields() {
  let store = MemoryStore::new();
  let k = key(&["icao"]);
  assert_eq!(
    store.get(&k, &[]).await.unwrap(),
    FieldReply::All(Default::default())
  );

  store
    .set(&k, FieldWrites::pair("alpha", "alfa").with("bravo", 2))
    .await
    .unwrap();
  let all = store.get(&k, &[]).await.unwrap().into_map();
  assert_eq!(all.len(), 2);
  assert_eq!(all["alpha"], FieldValue::from("alfa"));
  assert_eq!(all["bravo"], FieldValue::Integer(2));
}

#[tokio::test]
async fn test_get_many_fields() {
  let store = MemoryStore::new();
  let k = key(&["icao"]);
  store.set(&k, FieldWrites::pair("alpha", "alfa")).await.unwrap();

  match store.get(&k, &["alpha", "zulu"]).await.unwrap() {
    FieldReply::Fields(map) => {
      assert_eq!(map.len(), 2);
      assert_eq!(map["alpha"], Some(FieldValue::from("alfa")));
      assert_eq!(map["zulu"], None);
    }
    other => panic!("unexpected reply {:?}", other),
  }
}

#[tokio::test]
async fn test_set_counts_distinct_fields() {
  let store = MemoryStore::new();
  let writes = FieldWrites::from_flat(vec![
    "a".into(),
    1.into(),
    "b".into(),
    2.into(),
    "a".into(),
    3.into(),
  ])
  .unwrap();
  assert_eq!(store.set(&key(&["icao"]), writes).await.unwrap(), 2);
  assert_eq!(
    store.get(&key(&["icao"]), &["a"]).await.unwrap().into_value(),
    Some(FieldValue::Integer(3))
  );
}

#[tokio::test]
async fn test_set_from_object() {
  let store = MemoryStore::new();
  let writes = FieldWrites::from_object(json!({ "alpha": "alfa", "bravo": true })).unwrap();
  assert_eq!(store.set(&key(&["icao"]), writes).await.unwrap(), 2);
  assert!(store.exists(&key(&["icao"]), Some("bravo")).await.unwrap());
}

#[tokio::test]
async fn test_set_rejects_bad_shapes() {
  assert_eq!(
    FieldWrites::from_flat(vec!["alpha".into()]).unwrap_err(),
    StoreError::InvalidData
  );
  assert_eq!(
    FieldWrites::from_flat(vec![true.into(), 1.into()]).unwrap_err(),
    StoreError::InvalidField
  );

  let store = MemoryStore::new();
  assert_eq!(
    store
      .set(&key(&["icao"]), FieldWrites::new())
      .await
      .unwrap_err(),
    StoreError::InvalidData
  );
  assert!(store.is_empty());
}

#[tokio::test]
async fn test_invalid_key() {
  let store = MemoryStore::new();
  let empty = CompoundKey::default();
  assert_eq!(store.get(&empty, &[]).await.unwrap_err(), StoreError::InvalidKey);
  assert_eq!(
    store
      .set(&empty, FieldWrites::pair("a", 1))
      .await
      .unwrap_err(),
    StoreError::InvalidKey
  );
  assert_eq!(store.exists(&empty, None).await.unwrap_err(), StoreError::InvalidKey);
  assert_eq!(store.del(&empty, &["a"]).await.unwrap_err(), StoreError::InvalidKey);

  let blank = key(&["cache", ""]);
  assert_eq!(store.get(&blank, &[]).await.unwrap_err(), StoreError::InvalidKey);
}

// =============================================================================
// Exists / Del
// =============================================================================

#[tokio::test]
async fn test_exists_and_del_round_trip() {
  let store = MemoryStore::new();
  let k = key(&["cache", "alpha"]);
  store.set(&k, FieldWrites::pair("bravo", "charlie")).await.unwrap();
  assert!(store.exists(&k, Some("bravo")).await.unwrap());
  assert!(store.exists(&k, None).await.unwrap());

  assert_eq!(store.del(&k, &["bravo"]).await.unwrap(), 1);
  assert!(!store.exists(&k, Some("bravo")).await.unwrap());
  assert!(!store.exists(&k, None).await.unwrap());
  assert_eq!(store.get(&k, &["bravo"]).await.unwrap(), FieldReply::Value(None));
}

#[tokio::test]
async fn test_del_counts_only_removed() {
  let store = MemoryStore::new();
  let k = key(&["icao"]);
  store
    .set(&k, FieldWrites::pair("a", 1).with("b", 2))
    .await
    .unwrap();
  assert_eq!(store.del(&k, &["a", "zulu", "a"]).await.unwrap(), 1);
  assert_eq!(store.del(&key(&["missing"]), &["a"]).await.unwrap(), 0);
}

#[tokio::test]
async fn test_fields() {
  let store = MemoryStore::new();
  assert!(store.supports_fields());
  let k = key(&["icao"]);
  store
    .set(&k, FieldWrites::pair("bravo", 1).with("alpha", 2))
    .await
    .unwrap();
  assert_eq!(store.fields(&k).await.unwrap(), vec!["alpha", "bravo"]);
  assert!(store.fields(&key(&["itu"])).await.unwrap().is_empty());
}

// =============================================================================
// Key Scans
// =============================================================================

#[tokio::test]
async fn test_keys_glob() {
  let store = phonetic_store().await;
  assert_eq!(
    store.keys(&"ic*".into()).await.unwrap(),
    vec!["icao", "icao:more"]
  );
  assert_eq!(store.keys(&"i?u".into()).await.unwrap(), vec!["itu"]);
  assert!(store.keys(&"phonetic".into()).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_keys_regex() {
  let store = phonetic_store().await;
  let pattern = KeyPattern::from(Regex::new(".*icao.*").unwrap());
  assert_eq!(
    store.keys(&pattern).await.unwrap(),
    vec!["icao", "icao:more", "alpha:icao"]
  );
}

#[tokio::test]
async fn test_keys_case_insensitive_and_anchored() {
  let store = phonetic_store().await;
  assert_eq!(store.keys(&"ICAO".into()).await.unwrap(), vec!["icao"]);
  assert!(store.keys(&"cao".into()).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_keys_compound_pattern() {
  let store = phonetic_store().await;
  let pattern = KeyPattern::from(key(&["alpha", "*"]));
  assert_eq!(store.keys(&pattern).await.unwrap(), vec!["alpha:icao"]);
}

#[tokio::test]
async fn test_keys_invalid_pattern() {
  let store = phonetic_store().await;
  assert!(matches!(
    store.keys(&"".into()).await,
    Err(StoreError::InvalidPattern(_))
  ));
}

// =============================================================================
// Flush
// =============================================================================

#[tokio::test]
async fn test_flush_counts_removed_keys() {
  let store = phonetic_store().await;
  let removed = store
    .flush(&[key(&["icao"]), key(&["itu"]), key(&["zulu"])])
    .await
    .unwrap();
  assert_eq!(removed, 2);
  assert_eq!(store.len(), 2);
}

#[tokio::test]
async fn test_flush_without_keys() {
  let store = phonetic_store().await;
  assert_eq!(store.flush(&[]).await.unwrap_err(), StoreError::InvalidKey);
  assert_eq!(store.len(), 4);
}

#[tokio::test]
async fn test_custom_delimiter_config() {
  let store = MemoryStore::with_config(MemoryStoreConfig::from_value(&json!({ "delimiter": 7 })));
  let k = key(&["a", "b"]);
  store.set(&k, FieldWrites::pair("f", 1)).await.unwrap();
  assert_eq!(store.keys(&"*".into()).await.unwrap(), vec!["a7b"]);
}

// =============================================================================
// Change Feed
// =============================================================================

#[tokio::test]
async fn test_change_feed() {
  let store = MemoryStore::new();
  let mut rx = store.subscribe();
  let k = key(&["icao"]);

  store.set(&k, FieldWrites::pair("a", 1)).await.unwrap();
  store.del(&k, &["a"]).await.unwrap();
  store.flush(&[k.clone()]).await.unwrap();

  let set = rx.recv().await.unwrap();
  assert_eq!(set.operation, StoreChangeOperation::Set);
  assert_eq!(set.key, "icao");
  assert_eq!(set.fields, vec!["a"]);
  assert_eq!(rx.recv().await.unwrap().operation, StoreChangeOperation::Delete);
  assert_eq!(rx.recv().await.unwrap().operation, StoreChangeOperation::Flush);
}
