//! Selection tracker.
//!
//! An upstream collaborator injects checkboxes next to tree nodes and records
//! the selection on them; this module only reads and clears that annotation.

use crate::page::Document;

/// Item ids of all checked checkboxes, in document order. Checkboxes without
/// an id annotation are ignored.
pub fn checked_item_ids(doc: &Document, checkbox_class: &str, id_attr: &str) -> Vec<String> {
    doc.query_class(checkbox_class)
        .into_iter()
        .filter(|node| doc.attr(*node, "checked") == Some("true"))
        .filter_map(|node| doc.attr(node, id_attr).map(str::to_string))
        .collect()
}

/// Uncheck every checked checkbox and return how many were cleared.
pub fn clear_selection(doc: &mut Document, checkbox_class: &str) -> usize {
    let checked: Vec<_> = doc
        .query_class(checkbox_class)
        .into_iter()
        .filter(|node| doc.attr(*node, "checked") == Some("true"))
        .collect();
    for node in &checked {
        doc.set_attr(*node, "checked", "false");
        doc.set_attr(*node, "data-checked", "false");
        doc.set_attr(*node, "data-covered", "false");
    }
    checked.len()
}
