//! Item-path enrichment pipeline.
//!
//! One pass scans the document for unprocessed workbox items, annotates each
//! with its content path, and keeps the snapshot cache warm. Items are marked
//! processed before the remote answers, so an item is enriched at most once
//! per page lifetime even when the lookup later fails; items whose id cannot
//! be parsed are left untouched for a future pass.

use crate::cache::{CacheEntry, PathCache};
use crate::config::HelperConfig;
use crate::page::{Document, NodeId};
use crate::remote::{alias, RemoteTransport};
use crate::store::KeyValueStore;
use crate::util::extract_item_id;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Sentinel shown (and cached) when the remote response omits a path.
pub const PATH_UNAVAILABLE: &str = "Path not available";

#[derive(Debug, Default, Clone, Serialize)]
pub struct EnrichSummary {
    /// Items that received a new annotation this pass.
    pub annotated: usize,
    /// Annotations filled synchronously from the valid cache.
    pub from_cache: usize,
    /// Annotations filled from the batched remote lookup.
    pub fetched: usize,
    /// Items left unprocessed (no parsable id).
    pub unresolved: usize,
}

pub struct Enricher<'a, S: KeyValueStore, T: RemoteTransport> {
    cache: &'a PathCache<S>,
    transport: &'a T,
    config: &'a HelperConfig,
}

impl<'a, S: KeyValueStore, T: RemoteTransport> Enricher<'a, S, T> {
    pub fn new(cache: &'a PathCache<S>, transport: &'a T, config: &'a HelperConfig) -> Self {
        Self {
            cache,
            transport,
            config,
        }
    }

    /// Run one enrichment pass over `doc`. Idempotent: a second pass over an
    /// unchanged document annotates nothing and issues no remote calls.
    pub fn process_items(&self, doc: &mut Document) -> EnrichSummary {
        let mut summary = EnrichSummary::default();
        let candidates: Vec<NodeId> = doc
            .query_class(&self.config.item_class)
            .into_iter()
            .filter(|item| doc.attr(*item, &self.config.processed_attr).is_none())
            .collect();
        if candidates.is_empty() {
            return summary;
        }

        let snapshot = self.cache.load();
        let use_cache = self.cache.is_valid(&snapshot);
        let mut pending: Vec<(String, NodeId)> = Vec::new();

        for item in candidates {
            let Some(content) = doc.descendant_with_tag(item, "div") else {
                summary.unresolved += 1;
                continue;
            };
            let id = doc
                .attr(content, "onclick")
                .and_then(extract_item_id);
            let Some(id) = id else {
                // No parsable token: leave unmarked so a later pass can retry.
                summary.unresolved += 1;
                continue;
            };
            if doc
                .descendant_with_class(item, &self.config.path_span_class)
                .is_some()
            {
                continue;
            }

            let value_span = self.insert_placeholder(doc, item, content);
            doc.set_attr(item, &self.config.processed_attr, "true");
            summary.annotated += 1;

            match snapshot.items.get(&id) {
                Some(entry) if use_cache => {
                    doc.set_text(value_span, &entry.path);
                    summary.from_cache += 1;
                }
                _ => pending.push((id, value_span)),
            }
        }

        if pending.is_empty() {
            return summary;
        }

        let ids: Vec<String> = pending.iter().map(|(id, _)| id.clone()).collect();
        let fetched = self.fetch_paths(&ids);

        // A concurrent pass may have written the cache while the remote call
        // was in flight: re-read, merge, write the whole snapshot once.
        let mut merged = self.cache.load();
        for (id, value_span) in pending {
            let path = fetched
                .get(&id)
                .cloned()
                .unwrap_or_else(|| PATH_UNAVAILABLE.to_string());
            doc.set_text(value_span, &path);
            merged.items.insert(id, CacheEntry { path });
            summary.fetched += 1;
        }
        self.cache.save(merged.items);

        tracing::debug!(
            annotated = summary.annotated,
            from_cache = summary.from_cache,
            fetched = summary.fetched,
            "enrichment pass complete"
        );
        summary
    }

    fn insert_placeholder(&self, doc: &mut Document, item: NodeId, content: NodeId) -> NodeId {
        let container = doc.create_node("div", &[self.config.path_span_class.as_str()]);
        let label = doc.create_node("span", &[]);
        doc.set_text(label, &self.config.path_label);
        let value = doc.create_node("span", &[]);
        doc.set_text(value, "Loading...");
        doc.append_child(container, label);
        doc.append_child(container, value);
        let parent = doc.parent(content).unwrap_or(item);
        doc.insert_after(parent, content, container);
        value
    }

    /// One batched lookup for every queued id. Transport failure degrades to
    /// an empty map; the caller fills the sentinel per id.
    fn fetch_paths(&self, ids: &[String]) -> BTreeMap<String, String> {
        let selections: Vec<String> = ids
            .iter()
            .enumerate()
            .map(|(i, id)| {
                format!(
                    "{}: item(path: \"{}\", language: \"{}\") {{ {} }}",
                    alias("item", i),
                    id,
                    self.config.language,
                    self.config.path_fields
                )
            })
            .collect();
        let document = format!("query {{ {} }}", selections.join("\n"));

        let data = match self.transport.execute(&document) {
            Ok(data) => data,
            Err(err) => {
                tracing::warn!(items = ids.len(), error = %err, "path lookup batch failed");
                return BTreeMap::new();
            }
        };

        ids.iter()
            .enumerate()
            .map(|(i, id)| {
                let path = data
                    .get(&alias("item", i))
                    .and_then(|item| item.get("path"))
                    .and_then(Value::as_str)
                    .unwrap_or(PATH_UNAVAILABLE);
                (id.clone(), path.to_string())
            })
            .collect()
    }
}
