//! Shared fixtures for the pipeline integration tests.
#![allow(dead_code)]

use serde_json::{Map, Value};
use std::cell::RefCell;
use std::collections::VecDeque;
use workbox_helper::page::{Document, NodeSpec, Page};
use workbox_helper::remote::{RemoteError, RemoteTransport};

type Hook = Box<dyn Fn()>;

/// Scripted transport: queued responses are handed out in order, and every
/// executed query document is captured for assertions.
#[derive(Default)]
pub struct MockTransport {
    responses: RefCell<VecDeque<Result<Map<String, Value>, RemoteError>>>,
    documents: RefCell<Vec<String>>,
    on_execute: RefCell<Option<Hook>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_ok(&self, data: Value) {
        let Value::Object(map) = data else {
            panic!("scripted response must be a JSON object");
        };
        self.responses.borrow_mut().push_back(Ok(map));
    }

    pub fn push_err(&self, message: &str) {
        self.responses
            .borrow_mut()
            .push_back(Err(RemoteError::Transport(message.to_string())));
    }

    /// Run `hook` at the start of every `execute`, before the response is
    /// dequeued. Lets a test interleave a concurrent cache write with an
    /// in-flight remote call.
    pub fn on_execute(&self, hook: impl Fn() + 'static) {
        *self.on_execute.borrow_mut() = Some(Box::new(hook));
    }

    pub fn call_count(&self) -> usize {
        self.documents.borrow().len()
    }

    pub fn documents(&self) -> Vec<String> {
        self.documents.borrow().clone()
    }
}

impl RemoteTransport for MockTransport {
    fn execute(&self, document: &str) -> Result<Map<String, Value>, RemoteError> {
        if let Some(hook) = self.on_execute.borrow().as_ref() {
            hook();
        }
        self.documents.borrow_mut().push(document.to_string());
        self.responses
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Err(RemoteError::Transport("no scripted response".to_string())))
    }
}

impl RemoteTransport for &MockTransport {
    fn execute(&self, document: &str) -> Result<Map<String, Value>, RemoteError> {
        (**self).execute(document)
    }
}

fn item_spec(onclick: Option<&str>) -> Value {
    let mut content = serde_json::json!({"tag": "div"});
    if let Some(onclick) = onclick {
        content["attrs"] = serde_json::json!({ "onclick": onclick });
    }
    serde_json::json!({
        "tag": "div",
        "classes": ["scWorkBoxData"],
        "children": [content]
    })
}

/// A workbox document whose items carry the given onclick attributes (ids
/// usually look like `{AAA...}` embedded in a handler string).
pub fn workbox_document(onclicks: &[Option<&str>]) -> Document {
    let items: Vec<Value> = onclicks.iter().map(|o| item_spec(*o)).collect();
    let spec: NodeSpec = serde_json::from_value(serde_json::json!({
        "tag": "body",
        "children": [{
            "tag": "div",
            "classes": ["scWorkboxContentContainer"],
            "children": items
        }]
    }))
    .expect("build workbox fixture");
    Document::from_spec(&spec)
}

pub fn workbox_page_for_ids(ids: &[&str]) -> Page {
    let onclicks: Vec<String> = ids
        .iter()
        .map(|id| format!("javascript:scForm.postRequest('{id}')"))
        .collect();
    let refs: Vec<Option<&str>> = onclicks.iter().map(|s| Some(s.as_str())).collect();
    Page {
        document: workbox_document(&refs),
        frame: None,
    }
}

/// Text of the path annotation attached to the `index`-th workbox item, or
/// `None` when the item has no annotation yet.
pub fn annotation_text(doc: &Document, index: usize) -> Option<String> {
    let item = *doc.query_class("scWorkBoxData").get(index)?;
    let span = doc.descendant_with_class(item, "scWorkBoxItemPath")?;
    let value = *doc.children(span).last()?;
    Some(doc.text(value).to_string())
}

pub fn is_processed(doc: &Document, index: usize) -> bool {
    let items = doc.query_class("scWorkBoxData");
    doc.attr(items[index], "data-path-processed").is_some()
}
