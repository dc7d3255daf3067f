//! Helper configuration.
//!
//! One schema-versioned config document covers the host selectors, cache TTL,
//! debounce window, batch sizes, endpoint routes, and the workflow-state
//! catalog. Defaults reproduce the host application's observed constants, so
//! a missing config file means stock behavior rather than an error.

use crate::workflow::WorkflowState;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const CONFIG_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HelperConfig {
    pub schema_version: u32,

    // Host markup surface.
    #[serde(default = "default_item_class")]
    pub item_class: String,
    #[serde(default = "default_wrapper_class")]
    pub wrapper_class: String,
    #[serde(default = "default_path_span_class")]
    pub path_span_class: String,
    #[serde(default = "default_processed_attr")]
    pub processed_attr: String,
    #[serde(default = "default_path_label")]
    pub path_label: String,
    #[serde(default = "default_checkbox_class")]
    pub checkbox_class: String,
    #[serde(default = "default_node_id_attr")]
    pub node_id_attr: String,

    // Remote surface.
    #[serde(default = "default_query_endpoint")]
    pub query_endpoint: String,
    #[serde(default = "default_authoring_endpoint")]
    pub authoring_endpoint: String,
    #[serde(default = "default_path_fields")]
    pub path_fields: String,
    #[serde(default = "default_language")]
    pub language: String,

    // Tuning.
    #[serde(default = "default_cache_ttl_ms")]
    pub cache_ttl_ms: u128,
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    #[serde(default = "default_query_batch")]
    pub query_batch: usize,
    #[serde(default = "default_update_batch")]
    pub update_batch: usize,

    /// Passphrase for the settings-key cipher.
    #[serde(default = "default_passphrase")]
    pub passphrase: String,

    /// Workflow catalog, a fixed total order established at startup.
    #[serde(default = "default_states")]
    pub states: Vec<WorkflowState>,
}

fn default_item_class() -> String {
    "scWorkBoxData".to_string()
}
fn default_wrapper_class() -> String {
    "scWorkboxContentContainer".to_string()
}
fn default_path_span_class() -> String {
    "scWorkBoxItemPath".to_string()
}
fn default_processed_attr() -> String {
    "data-path-processed".to_string()
}
fn default_path_label() -> String {
    "Item Path: ".to_string()
}
fn default_checkbox_class() -> String {
    "tree-node-checkbox".to_string()
}
fn default_node_id_attr() -> String {
    "data-node-id".to_string()
}
fn default_query_endpoint() -> String {
    "/sitecore/api/graph/edge".to_string()
}
fn default_authoring_endpoint() -> String {
    "/sitecore/api/authoring/graphql/v1".to_string()
}
fn default_path_fields() -> String {
    "path".to_string()
}
fn default_language() -> String {
    "en".to_string()
}
fn default_cache_ttl_ms() -> u128 {
    86_400_000
}
fn default_debounce_ms() -> u64 {
    300
}
fn default_query_batch() -> usize {
    10
}
fn default_update_batch() -> usize {
    5
}
fn default_passphrase() -> String {
    "FhxImvR3U4uIZUSR".to_string()
}

fn default_states() -> Vec<WorkflowState> {
    vec![
        WorkflowState {
            id: "{08BC4A4D-5F9E-42BB-8218-74DD24F61310}".to_string(),
            display_name: "Draft".to_string(),
            order: 0,
        },
        WorkflowState {
            id: "{E1FA22C6-9226-4909-BA05-C0BF5CC850C8}".to_string(),
            display_name: "Awaiting Approval".to_string(),
            order: 1,
        },
        WorkflowState {
            id: "{65ED77CF-DDB0-48B7-92AD-8668415623EA}".to_string(),
            display_name: "Content Review".to_string(),
            order: 2,
        },
        WorkflowState {
            id: "{D7C975E2-4F04-4858-889E-6990C4D22DAB}".to_string(),
            display_name: "Approved".to_string(),
            order: 3,
        },
    ]
}

pub fn default_config() -> HelperConfig {
    HelperConfig {
        schema_version: CONFIG_SCHEMA_VERSION,
        item_class: default_item_class(),
        wrapper_class: default_wrapper_class(),
        path_span_class: default_path_span_class(),
        processed_attr: default_processed_attr(),
        path_label: default_path_label(),
        checkbox_class: default_checkbox_class(),
        node_id_attr: default_node_id_attr(),
        query_endpoint: default_query_endpoint(),
        authoring_endpoint: default_authoring_endpoint(),
        path_fields: default_path_fields(),
        language: default_language(),
        cache_ttl_ms: default_cache_ttl_ms(),
        debounce_ms: default_debounce_ms(),
        query_batch: default_query_batch(),
        update_batch: default_update_batch(),
        passphrase: default_passphrase(),
        states: default_states(),
    }
}

/// Render a pretty JSON config stub.
pub fn config_stub() -> String {
    serde_json::to_string_pretty(&default_config()).expect("serialize config stub")
}

pub fn load_config(path: &Path) -> Result<HelperConfig> {
    let bytes = fs::read(path).with_context(|| format!("read config {}", path.display()))?;
    let config: HelperConfig =
        serde_json::from_slice(&bytes).context("parse helper config JSON")?;
    validate_config(&config)?;
    Ok(config)
}

pub fn validate_config(config: &HelperConfig) -> Result<()> {
    if config.schema_version != CONFIG_SCHEMA_VERSION {
        return Err(anyhow!(
            "unsupported config schema_version {}",
            config.schema_version
        ));
    }
    if config.query_batch == 0 || config.update_batch == 0 {
        return Err(anyhow!("batch sizes must be at least 1"));
    }
    for (label, value) in [
        ("item_class", &config.item_class),
        ("wrapper_class", &config.wrapper_class),
        ("path_span_class", &config.path_span_class),
        ("processed_attr", &config.processed_attr),
    ] {
        if value.trim().is_empty() {
            return Err(anyhow!("{label} must be non-empty"));
        }
    }
    if config.states.is_empty() {
        return Err(anyhow!("workflow catalog must have at least one state"));
    }
    Ok(())
}
