//! Integration tests for the workflow-advancement engine: batching, outcome
//! accounting, skip rules, and per-batch failure isolation.

mod common;

use common::MockTransport;
use serde_json::{json, Value};
use workbox_helper::config::default_config;
use workbox_helper::workflow::{Outcome, WorkflowCatalog, WorkflowEngine};

fn catalog() -> WorkflowCatalog {
    WorkflowCatalog::new(default_config().states).expect("default catalog")
}

/// Query response for one batch: each entry is `(state_index, has_workflow)`,
/// with `None` meaning the item has no workflow assigned.
fn state_response(catalog: &WorkflowCatalog, entries: &[Option<usize>]) -> Value {
    let mut data = serde_json::Map::new();
    for (i, entry) in entries.iter().enumerate() {
        let item = match entry {
            Some(state_index) => {
                let state = &catalog.states()[*state_index];
                json!({
                    "workflow": {
                        "workflow": { "displayName": "Sample Workflow" },
                        "workflowState": {
                            "stateId": state.id,
                            "displayName": state.display_name
                        }
                    }
                })
            }
            None => json!({ "workflow": null }),
        };
        data.insert(format!("item{i}"), item);
    }
    Value::Object(data)
}

/// Update response acknowledging `count` mutations with item paths.
fn update_response(count: usize) -> Value {
    let mut data = serde_json::Map::new();
    for i in 0..count {
        data.insert(
            format!("update{i}"),
            json!({ "item": { "path": format!("/content/item-{i}") } }),
        );
    }
    Value::Object(data)
}

fn ids(n: usize) -> Vec<String> {
    (0..n)
        .map(|i| format!("{{00000000-0000-0000-0000-{i:012}}}"))
        .collect()
}

#[test]
fn every_input_id_gets_exactly_one_outcome() {
    let catalog = catalog();
    let transport = MockTransport::new();
    // 12 ids: two query batches (10 + 2), three update batches (5 + 5 + 2).
    transport.push_ok(state_response(&catalog, &[Some(0); 10]));
    transport.push_ok(state_response(&catalog, &[Some(0); 2]));
    transport.push_ok(update_response(5));
    transport.push_ok(update_response(5));
    transport.push_ok(update_response(2));

    let engine = WorkflowEngine::new(&catalog, &transport, 10, 5);
    let report = engine.advance(&ids(12));

    assert_eq!(report.requested, 12);
    assert_eq!(report.outcomes.len(), 12);
    assert_eq!(report.succeeded, 12);
    assert!(report.success);
    assert_eq!(transport.call_count(), 5);

    let input = ids(12);
    for (outcome, id) in report.outcomes.iter().zip(&input) {
        assert_eq!(&outcome.item_id, id);
    }
}

#[test]
fn progression_is_strict_and_linear() {
    let catalog = catalog();
    let transport = MockTransport::new();
    transport.push_ok(state_response(&catalog, &[Some(0)]));
    transport.push_ok(update_response(1));

    let engine = WorkflowEngine::new(&catalog, &transport, 10, 5);
    let id = ids(1);
    let report = engine.advance(&id);
    match &report.outcomes[0].outcome {
        Outcome::Success {
            target_state_name, ..
        } => assert_eq!(target_state_name, "Awaiting Approval"),
        other => panic!("expected success, got {other:?}"),
    }

    // Run again with the item now one state further along.
    transport.push_ok(state_response(&catalog, &[Some(1)]));
    transport.push_ok(update_response(1));
    let report = engine.advance(&id);
    match &report.outcomes[0].outcome {
        Outcome::Success {
            target_state_name, ..
        } => assert_eq!(target_state_name, "Content Review"),
        other => panic!("expected success, got {other:?}"),
    }
}

#[test]
fn terminal_and_workflowless_items_are_skipped_and_never_mutated() {
    let catalog = catalog();
    let terminal_index = catalog.states().len() - 1;
    let transport = MockTransport::new();
    transport.push_ok(state_response(&catalog, &[Some(terminal_index), None]));

    let engine = WorkflowEngine::new(&catalog, &transport, 10, 5);
    let report = engine.advance(&ids(2));

    assert_eq!(report.outcomes.len(), 2);
    assert_eq!(report.skipped, 2);
    assert!(report.success);
    match &report.outcomes[0].outcome {
        Outcome::Skipped { reason } => assert_eq!(reason, "Already approved"),
        other => panic!("expected skip, got {other:?}"),
    }
    match &report.outcomes[1].outcome {
        Outcome::Skipped { reason } => assert_eq!(reason, "No workflow assigned"),
        other => panic!("expected skip, got {other:?}"),
    }
    // Both items skipped: the update phase issued no mutation at all.
    assert_eq!(transport.call_count(), 1);
    assert!(transport.documents()[0].starts_with("query"));
}

#[test]
fn a_failed_query_batch_does_not_abort_the_run() {
    let catalog = catalog();
    let transport = MockTransport::new();
    transport.push_err("gateway timeout");
    transport.push_ok(state_response(&catalog, &[Some(0), Some(0)]));
    transport.push_ok(update_response(2));

    // Batch size 2: ids 0-1 fail to query, ids 2-3 succeed.
    let engine = WorkflowEngine::new(&catalog, &transport, 2, 5);
    let report = engine.advance(&ids(4));

    assert_eq!(report.outcomes.len(), 4);
    // Error-state items carry no workflow and are skipped downstream.
    assert_eq!(report.outcomes[0].current_state_name, "Error");
    assert!(matches!(
        report.outcomes[0].outcome,
        Outcome::Skipped { .. }
    ));
    assert!(matches!(
        report.outcomes[2].outcome,
        Outcome::Success { .. }
    ));
    assert!(matches!(
        report.outcomes[3].outcome,
        Outcome::Success { .. }
    ));
}

#[test]
fn a_failed_update_batch_records_failures_but_keeps_skips() {
    let catalog = catalog();
    let transport = MockTransport::new();
    transport.push_ok(state_response(&catalog, &[Some(0), None, Some(1)]));
    transport.push_err("bad gateway");

    let engine = WorkflowEngine::new(&catalog, &transport, 10, 5);
    let report = engine.advance(&ids(3));

    assert_eq!(report.outcomes.len(), 3);
    assert!(!report.success);
    assert_eq!(report.failed, 2);
    assert_eq!(report.skipped, 1);
    match &report.outcomes[0].outcome {
        Outcome::Failure { reason } => assert_eq!(reason, "Update failed"),
        other => panic!("expected failure, got {other:?}"),
    }
    assert!(matches!(
        report.outcomes[1].outcome,
        Outcome::Skipped { .. }
    ));
}

#[test]
fn unrecognized_current_state_resets_to_the_initial_state() {
    let catalog = catalog();
    let transport = MockTransport::new();
    let data = json!({
        "item0": {
            "workflow": {
                "workflow": { "displayName": "Sample Workflow" },
                "workflowState": {
                    "stateId": "{FFFFFFFF-0000-0000-0000-000000000000}",
                    "displayName": "Mystery"
                }
            }
        }
    });
    transport.push_ok(data);
    transport.push_ok(update_response(1));

    let engine = WorkflowEngine::new(&catalog, &transport, 10, 5);
    let report = engine.advance(&ids(1));

    match &report.outcomes[0].outcome {
        Outcome::Success {
            target_state_id,
            target_state_name,
            ..
        } => {
            assert_eq!(target_state_id, &catalog.initial().id);
            assert_eq!(target_state_name, "Draft");
        }
        other => panic!("expected success, got {other:?}"),
    }
    // The mutation carried the initial state id.
    let mutation = &transport.documents()[1];
    assert!(mutation.contains(&catalog.initial().id));
}

#[test]
fn update_alias_missing_from_response_is_a_failure_not_a_skip() {
    let catalog = catalog();
    let transport = MockTransport::new();
    transport.push_ok(state_response(&catalog, &[Some(0), Some(0)]));
    // Remote acknowledged only the first mutation.
    transport.push_ok(update_response(1));

    let engine = WorkflowEngine::new(&catalog, &transport, 10, 5);
    let report = engine.advance(&ids(2));

    assert!(matches!(
        report.outcomes[0].outcome,
        Outcome::Success { .. }
    ));
    assert!(matches!(
        report.outcomes[1].outcome,
        Outcome::Failure { .. }
    ));
    assert!(!report.success);
}

#[test]
fn wire_ids_travel_without_braces() {
    let catalog = catalog();
    let transport = MockTransport::new();
    transport.push_ok(state_response(&catalog, &[Some(0)]));
    transport.push_ok(update_response(1));

    let engine = WorkflowEngine::new(&catalog, &transport, 10, 5);
    engine.advance(&["{AAAA-BBBB}".to_string()]);

    let docs = transport.documents();
    assert!(docs[0].contains("itemId: \"AAAA-BBBB\""));
    assert!(!docs[0].contains("{AAAA-BBBB}"));
}
