//! TTL-bounded item-path cache persisted as a single snapshot blob.
//!
//! The snapshot is valid or stale as a unit: one write timestamp covers every
//! entry, and a stale snapshot is evicted wholesale rather than per key. Load
//! never fails — missing or corrupt storage degrades to an empty snapshot so
//! the enrichment pass can always proceed.

use crate::store::KeyValueStore;
use crate::util::now_epoch_ms;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

pub const CACHE_KEY: &str = "workboxItemPaths";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub path: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheSnapshot {
    #[serde(default)]
    pub items: BTreeMap<String, CacheEntry>,
    #[serde(default)]
    pub timestamp: u128,
}

pub struct PathCache<S: KeyValueStore> {
    store: S,
    key: String,
    ttl_ms: u128,
}

impl<S: KeyValueStore> PathCache<S> {
    pub fn new(store: S, ttl_ms: u128) -> Self {
        Self {
            store,
            key: CACHE_KEY.to_string(),
            ttl_ms,
        }
    }

    /// Load the current snapshot. Missing or corrupt storage yields the empty
    /// snapshot `{items: {}, timestamp: 0}`. Legacy snapshots whose values
    /// are bare path strings are upgraded in place, stamped with a fresh
    /// timestamp, and persisted back before being returned; the upgrade is
    /// idempotent.
    pub fn load(&self) -> CacheSnapshot {
        let Some(raw) = self.store.get(&self.key) else {
            return CacheSnapshot::default();
        };
        let Ok(value) = serde_json::from_str::<Value>(&raw) else {
            return CacheSnapshot::default();
        };
        let (mut snapshot, migrated) = Self::from_value(value);
        if migrated {
            // The migration write counts as a save: restamp, so an upgraded
            // snapshot is never stale on arrival.
            snapshot.timestamp = now_epoch_ms();
            self.persist(&snapshot);
        }
        snapshot
    }

    /// Replace the stored snapshot with `items`, stamped with the current
    /// time. Best-effort: a full store must not break enrichment, so failures
    /// are logged and swallowed.
    pub fn save(&self, items: BTreeMap<String, CacheEntry>) {
        let snapshot = CacheSnapshot {
            items,
            timestamp: now_epoch_ms(),
        };
        self.persist(&snapshot);
    }

    /// Whether the snapshot is still within its TTL.
    pub fn is_valid(&self, snapshot: &CacheSnapshot) -> bool {
        now_epoch_ms().saturating_sub(snapshot.timestamp) < self.ttl_ms
    }

    /// Eager eviction: drop the stored snapshot entirely if it has expired.
    /// Returns true when an eviction happened.
    pub fn evict_if_stale(&self) -> bool {
        let snapshot = self.load();
        if self.is_valid(&snapshot) {
            return false;
        }
        if snapshot.items.is_empty() && snapshot.timestamp == 0 {
            return false;
        }
        if let Err(err) = self.store.remove(&self.key) {
            tracing::warn!(error = %err, "cache eviction failed");
            return false;
        }
        tracing::debug!(entries = snapshot.items.len(), "evicted stale path cache");
        true
    }

    /// Drop the stored snapshot unconditionally.
    pub fn clear(&self) -> anyhow::Result<()> {
        self.store.remove(&self.key)
    }

    fn persist(&self, snapshot: &CacheSnapshot) {
        let text = match serde_json::to_string(snapshot) {
            Ok(text) => text,
            Err(err) => {
                tracing::warn!(error = %err, "cache serialization failed");
                return;
            }
        };
        if let Err(err) = self.store.set(&self.key, &text) {
            tracing::warn!(error = %err, "cache save failed");
        }
    }

    fn from_value(value: Value) -> (CacheSnapshot, bool) {
        let timestamp = value
            .get("timestamp")
            .and_then(Value::as_u64)
            .map(u128::from)
            .unwrap_or(0);
        let mut items = BTreeMap::new();
        let mut migrated = false;
        if let Some(map) = value.get("items").and_then(Value::as_object) {
            for (id, entry) in map {
                match entry {
                    // Legacy shape: bare path string.
                    Value::String(path) => {
                        migrated = true;
                        items.insert(id.clone(), CacheEntry { path: path.clone() });
                    }
                    Value::Object(obj) => {
                        if let Some(path) = obj.get("path").and_then(Value::as_str) {
                            items.insert(
                                id.clone(),
                                CacheEntry {
                                    path: path.to_string(),
                                },
                            );
                        }
                    }
                    _ => {}
                }
            }
        }
        (CacheSnapshot { items, timestamp }, migrated)
    }
}
