//! Workflow-advancement engine.
//!
//! A run is a batched query → compute-next-state → batched mutate pipeline
//! over a fixed, strictly increasing state catalog. Every input id produces
//! exactly one outcome — success, failure, or skipped — no matter what the
//! remote does: a failed batch degrades to per-item failure records instead
//! of aborting the run, and each batch is attempted exactly once.

use crate::remote::{alias, RemoteTransport};
use crate::util::normalize_state_id;
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Field the authoring mutation writes the new state into.
const WORKFLOW_STATE_FIELD: &str = "__Workflow state";

/// Display name recorded when a query batch fails outright.
const ERROR_STATE_NAME: &str = "Error";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowState {
    pub id: String,
    pub display_name: String,
    pub order: u32,
}

/// Immutable total order over workflow states, established at startup.
#[derive(Debug, Clone)]
pub struct WorkflowCatalog {
    states: Vec<WorkflowState>,
}

impl WorkflowCatalog {
    /// Build and validate a catalog: orders must be exactly `0..N-1`.
    pub fn new(mut states: Vec<WorkflowState>) -> Result<Self> {
        if states.is_empty() {
            return Err(anyhow!("workflow catalog is empty"));
        }
        states.sort_by_key(|s| s.order);
        for (expected, state) in states.iter().enumerate() {
            if state.order as usize != expected {
                return Err(anyhow!(
                    "workflow orders must be contiguous from 0 (missing order {expected})"
                ));
            }
        }
        Ok(Self { states })
    }

    pub fn states(&self) -> &[WorkflowState] {
        &self.states
    }

    /// First state in the progression (order 0).
    pub fn initial(&self) -> &WorkflowState {
        &self.states[0]
    }

    /// Terminal state (maximal order).
    pub fn terminal(&self) -> &WorkflowState {
        self.states.last().expect("catalog is non-empty")
    }

    /// Catalog entry whose id matches `state_id` after normalization.
    pub fn find(&self, state_id: &str) -> Option<&WorkflowState> {
        let wanted = normalize_state_id(state_id);
        self.states
            .iter()
            .find(|s| normalize_state_id(&s.id) == wanted)
    }

    /// Strict linear transition: the state with `order + 1`, or `None` for
    /// the maximal order and for unrecognized ids. Comparison is brace- and
    /// case-insensitive.
    pub fn next(&self, current_id: &str) -> Option<&WorkflowState> {
        let current = self.find(current_id)?;
        self.states.get(current.order as usize + 1)
    }
}

/// Current workflow state as reported by the remote, or a sentinel.
#[derive(Debug, Clone, Serialize)]
pub struct StateInfo {
    pub state_id: Option<String>,
    pub display_name: String,
}

impl StateInfo {
    fn no_workflow() -> Self {
        Self {
            state_id: None,
            display_name: "No workflow".to_string(),
        }
    }

    fn error() -> Self {
        Self {
            state_id: None,
            display_name: ERROR_STATE_NAME.to_string(),
        }
    }
}

/// Per-item result of the query phase; `next_state` is derived, not fetched.
#[derive(Debug, Clone, Serialize)]
pub struct ItemWorkflowRecord {
    pub item_id: String,
    pub current_state: StateInfo,
    pub current_workflow: Option<String>,
    pub next_state: Option<WorkflowState>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Success {
        path: String,
        target_state_id: String,
        target_state_name: String,
    },
    Failure {
        reason: String,
    },
    Skipped {
        reason: String,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct UpdateOutcome {
    pub item_id: String,
    pub current_state_name: String,
    #[serde(flatten)]
    pub outcome: Outcome,
}

/// The structured result object handed to the notification collaborator.
#[derive(Debug, Serialize)]
pub struct WorkflowRunReport {
    pub success: bool,
    pub requested: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub outcomes: Vec<UpdateOutcome>,
}

pub struct WorkflowEngine<'a, T: RemoteTransport> {
    catalog: &'a WorkflowCatalog,
    transport: &'a T,
    query_batch: usize,
    update_batch: usize,
}

impl<'a, T: RemoteTransport> WorkflowEngine<'a, T> {
    pub fn new(
        catalog: &'a WorkflowCatalog,
        transport: &'a T,
        query_batch: usize,
        update_batch: usize,
    ) -> Self {
        Self {
            catalog,
            transport,
            query_batch: query_batch.max(1),
            update_batch: update_batch.max(1),
        }
    }

    /// Run the full pipeline over the selected ids.
    pub fn advance(&self, item_ids: &[String]) -> WorkflowRunReport {
        let records = self.query_states(item_ids);
        let outcomes = self.apply_updates(&records);

        let mut succeeded = 0;
        let mut failed = 0;
        let mut skipped = 0;
        for outcome in &outcomes {
            match outcome.outcome {
                Outcome::Success { .. } => succeeded += 1,
                Outcome::Failure { .. } => failed += 1,
                Outcome::Skipped { .. } => skipped += 1,
            }
        }
        tracing::info!(
            requested = item_ids.len(),
            succeeded,
            failed,
            skipped,
            "workflow run finished"
        );
        WorkflowRunReport {
            success: failed == 0,
            requested: item_ids.len(),
            succeeded,
            failed,
            skipped,
            outcomes,
        }
    }

    /// Query phase: current workflow name and state per item, one remote call
    /// per batch, sequentially. A failed batch yields error-state records for
    /// its items instead of aborting the run.
    pub fn query_states(&self, item_ids: &[String]) -> Vec<ItemWorkflowRecord> {
        let mut records = Vec::with_capacity(item_ids.len());
        for batch in item_ids.chunks(self.query_batch) {
            records.extend(self.query_batch_states(batch));
        }
        records
    }

    fn query_batch_states(&self, batch: &[String]) -> Vec<ItemWorkflowRecord> {
        let selections: Vec<String> = batch
            .iter()
            .enumerate()
            .map(|(i, id)| {
                format!(
                    "{}: item(where: {{itemId: \"{}\"}}) {{ workflow {{ workflow {{ displayName }} workflowState {{ stateId displayName }} }} }}",
                    alias("item", i),
                    wire_id(id)
                )
            })
            .collect();
        let document = format!("query {{ {} }}", selections.join("\n"));

        let data = match self.transport.execute(&document) {
            Ok(data) => data,
            Err(err) => {
                tracing::warn!(items = batch.len(), error = %err, "workflow query batch failed");
                return batch
                    .iter()
                    .map(|id| ItemWorkflowRecord {
                        item_id: id.clone(),
                        current_state: StateInfo::error(),
                        current_workflow: None,
                        next_state: None,
                    })
                    .collect();
            }
        };

        batch
            .iter()
            .enumerate()
            .map(|(i, id)| {
                let item = data.get(&alias("item", i));
                let workflow = item.and_then(|v| v.get("workflow"));
                let state = workflow.and_then(|v| v.get("workflowState"));
                let state_id = state
                    .and_then(|v| v.get("stateId"))
                    .and_then(Value::as_str)
                    .map(str::to_string);
                let current_state = match state.filter(|v| !v.is_null()) {
                    Some(state) => StateInfo {
                        state_id: state_id.clone(),
                        display_name: state
                            .get("displayName")
                            .and_then(Value::as_str)
                            .unwrap_or("Unknown")
                            .to_string(),
                    },
                    None => StateInfo::no_workflow(),
                };
                let current_workflow = workflow
                    .and_then(|v| v.get("workflow"))
                    .and_then(|v| v.get("displayName"))
                    .and_then(Value::as_str)
                    .map(str::to_string);
                let next_state = state_id
                    .as_deref()
                    .and_then(|sid| self.catalog.next(sid))
                    .cloned();
                ItemWorkflowRecord {
                    item_id: id.clone(),
                    current_state,
                    current_workflow,
                    next_state,
                }
            })
            .collect()
    }

    /// Update phase: one combined mutation per batch covering the eligible
    /// items; skipped items never appear in an outgoing payload. A failed
    /// batch records a failure for each non-skipped item.
    pub fn apply_updates(&self, records: &[ItemWorkflowRecord]) -> Vec<UpdateOutcome> {
        let mut outcomes = Vec::with_capacity(records.len());
        for batch in records.chunks(self.update_batch) {
            outcomes.extend(self.apply_update_batch(batch));
        }
        outcomes
    }

    fn apply_update_batch(&self, batch: &[ItemWorkflowRecord]) -> Vec<UpdateOutcome> {
        enum Planned<'r> {
            Skip(&'r ItemWorkflowRecord, String),
            Update {
                record: &'r ItemWorkflowRecord,
                target: WorkflowState,
                alias_index: usize,
            },
        }

        let terminal_id = normalize_state_id(&self.catalog.terminal().id);
        let mut planned = Vec::with_capacity(batch.len());
        let mut mutations = Vec::new();
        for record in batch {
            if record.current_workflow.is_none() {
                planned.push(Planned::Skip(record, "No workflow assigned".to_string()));
                continue;
            }
            let at_terminal = record
                .current_state
                .state_id
                .as_deref()
                .is_some_and(|sid| normalize_state_id(sid) == terminal_id);
            if at_terminal {
                planned.push(Planned::Skip(record, "Already approved".to_string()));
                continue;
            }
            // Unrecognized current state falls back to the start of the
            // progression rather than being left unmodified.
            let target = record
                .next_state
                .clone()
                .unwrap_or_else(|| self.catalog.initial().clone());
            let alias_index = mutations.len();
            mutations.push(format!(
                "{}: updateItem(input: {{ itemId: \"{}\" fields: [{{ name: \"{}\" value: \"{}\" }}] }}) {{ item {{ path }} }}",
                alias("update", alias_index),
                wire_id(&record.item_id),
                WORKFLOW_STATE_FIELD,
                target.id
            ));
            planned.push(Planned::Update {
                record,
                target,
                alias_index,
            });
        }

        let data = if mutations.is_empty() {
            Ok(serde_json::Map::new())
        } else {
            self.transport
                .execute(&format!("mutation {{ {} }}", mutations.join("\n")))
        };

        match data {
            Ok(data) => planned
                .into_iter()
                .map(|plan| match plan {
                    Planned::Skip(record, reason) => skipped_outcome(record, reason),
                    Planned::Update {
                        record,
                        target,
                        alias_index,
                    } => {
                        let item = data
                            .get(&alias("update", alias_index))
                            .and_then(|v| v.get("item"))
                            .filter(|v| !v.is_null());
                        match item {
                            Some(item) => UpdateOutcome {
                                item_id: record.item_id.clone(),
                                current_state_name: record.current_state.display_name.clone(),
                                outcome: Outcome::Success {
                                    path: item
                                        .get("path")
                                        .and_then(Value::as_str)
                                        .unwrap_or("Unknown")
                                        .to_string(),
                                    target_state_id: target.id.clone(),
                                    target_state_name: target.display_name.clone(),
                                },
                            },
                            None => failure_outcome(record, "update rejected by remote"),
                        }
                    }
                })
                .collect(),
            Err(err) => {
                tracing::warn!(items = batch.len(), error = %err, "workflow update batch failed");
                planned
                    .into_iter()
                    .map(|plan| match plan {
                        Planned::Skip(record, reason) => skipped_outcome(record, reason),
                        Planned::Update { record, .. } => failure_outcome(record, "Update failed"),
                    })
                    .collect()
            }
        }
    }
}

fn skipped_outcome(record: &ItemWorkflowRecord, reason: String) -> UpdateOutcome {
    UpdateOutcome {
        item_id: record.item_id.clone(),
        current_state_name: record.current_state.display_name.clone(),
        outcome: Outcome::Skipped { reason },
    }
}

fn failure_outcome(record: &ItemWorkflowRecord, reason: &str) -> UpdateOutcome {
    UpdateOutcome {
        item_id: record.item_id.clone(),
        current_state_name: record.current_state.display_name.clone(),
        outcome: Outcome::Failure {
            reason: reason.to_string(),
        },
    }
}

/// Item ids travel without decorative braces on the wire.
fn wire_id(id: &str) -> String {
    id.chars().filter(|c| *c != '{' && *c != '}').collect()
}
