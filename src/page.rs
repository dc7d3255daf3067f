//! Minimal host-document model.
//!
//! The helper runs against a third-party admin UI whose markup is an external
//! interface. This module models just enough of it: an arena of nodes with a
//! tag, classes, attributes, text, and children. Structural mutations bump a
//! revision counter so the change detector can tell whether anything new has
//! rendered since its last pass.
//!
//! Documents round-trip through JSON so integration tests and the `wbx`
//! binary can work from page fixtures.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// Serialized node tree used in fixtures; flattened into the arena on load.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeSpec {
    pub tag: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub classes: Vec<String>,
    #[serde(default, skip_serializing_if = "std::collections::BTreeMap::is_empty")]
    pub attrs: std::collections::BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeSpec>,
}

#[derive(Debug, Clone)]
struct ArenaNode {
    tag: String,
    classes: Vec<String>,
    attrs: std::collections::BTreeMap<String, String>,
    text: String,
    children: Vec<NodeId>,
}

#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<ArenaNode>,
    root: NodeId,
    revision: u64,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Empty document with a single `body` root.
    pub fn new() -> Self {
        Self {
            nodes: vec![ArenaNode {
                tag: "body".to_string(),
                classes: Vec::new(),
                attrs: Default::default(),
                text: String::new(),
                children: Vec::new(),
            }],
            root: NodeId(0),
            revision: 0,
        }
    }

    pub fn from_spec(spec: &NodeSpec) -> Self {
        let mut doc = Self {
            nodes: Vec::new(),
            root: NodeId(0),
            revision: 0,
        };
        doc.root = doc.build(spec);
        doc
    }

    fn build(&mut self, spec: &NodeSpec) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(ArenaNode {
            tag: spec.tag.clone(),
            classes: spec.classes.clone(),
            attrs: spec.attrs.clone(),
            text: spec.text.clone(),
            children: Vec::new(),
        });
        for child in &spec.children {
            let child_id = self.build(child);
            self.nodes[id.0].children.push(child_id);
        }
        id
    }

    pub fn to_spec(&self) -> NodeSpec {
        self.spec_for(self.root)
    }

    fn spec_for(&self, id: NodeId) -> NodeSpec {
        let node = &self.nodes[id.0];
        NodeSpec {
            tag: node.tag.clone(),
            classes: node.classes.clone(),
            attrs: node.attrs.clone(),
            text: node.text.clone(),
            children: node.children.iter().map(|c| self.spec_for(*c)).collect(),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Revision counter; bumped on every structural or attribute mutation.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn tag(&self, id: NodeId) -> &str {
        &self.nodes[id.0].tag
    }

    pub fn text(&self, id: NodeId) -> &str {
        &self.nodes[id.0].text
    }

    pub fn set_text(&mut self, id: NodeId, text: &str) {
        self.nodes[id.0].text = text.to_string();
        self.revision += 1;
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.nodes[id.0].classes.iter().any(|c| c == class)
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.nodes[id.0].attrs.get(name).map(String::as_str)
    }

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) {
        self.nodes[id.0]
            .attrs
            .insert(name.to_string(), value.to_string());
        self.revision += 1;
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// All nodes carrying `class`, in depth-first document order.
    pub fn query_class(&self, class: &str) -> Vec<NodeId> {
        let mut found = Vec::new();
        self.walk(self.root, &mut |doc, id| {
            if doc.has_class(id, class) {
                found.push(id);
            }
        });
        found
    }

    /// First descendant of `id` (excluding `id` itself) with the given tag.
    pub fn descendant_with_tag(&self, id: NodeId, tag: &str) -> Option<NodeId> {
        for child in self.nodes[id.0].children.clone() {
            if self.tag(child) == tag {
                return Some(child);
            }
            if let Some(found) = self.descendant_with_tag(child, tag) {
                return Some(found);
            }
        }
        None
    }

    /// First descendant of `id` (excluding `id` itself) with the given class.
    pub fn descendant_with_class(&self, id: NodeId, class: &str) -> Option<NodeId> {
        for child in self.nodes[id.0].children.clone() {
            if self.has_class(child, class) {
                return Some(child);
            }
            if let Some(found) = self.descendant_with_class(child, class) {
                return Some(found);
            }
        }
        None
    }

    pub fn create_node(&mut self, tag: &str, classes: &[&str]) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(ArenaNode {
            tag: tag.to_string(),
            classes: classes.iter().map(|c| c.to_string()).collect(),
            attrs: Default::default(),
            text: String::new(),
            children: Vec::new(),
        });
        self.revision += 1;
        id
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[parent.0].children.push(child);
        self.revision += 1;
    }

    /// Insert `node` as the next sibling of `after` under `parent`. Falls
    /// back to appending when `after` is not a child of `parent`.
    pub fn insert_after(&mut self, parent: NodeId, after: NodeId, node: NodeId) {
        let children = &mut self.nodes[parent.0].children;
        match children.iter().position(|c| *c == after) {
            Some(pos) => children.insert(pos + 1, node),
            None => children.push(node),
        }
        self.revision += 1;
    }

    /// Parent of `id`, if any.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        (0..self.nodes.len())
            .map(NodeId)
            .find(|candidate| self.nodes[candidate.0].children.contains(&id))
    }

    fn walk(&self, id: NodeId, visit: &mut impl FnMut(&Document, NodeId)) {
        visit(self, id);
        for child in self.nodes[id.0].children.clone() {
            self.walk(child, visit);
        }
    }
}

/// The watched surfaces: the top-level document plus at most one nested
/// frame document, already located by the hosting shell.
#[derive(Debug, Clone, Default)]
pub struct Page {
    pub document: Document,
    pub frame: Option<Document>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageSpec {
    pub document: NodeSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame: Option<NodeSpec>,
}

impl Page {
    pub fn from_spec(spec: &PageSpec) -> Self {
        Self {
            document: Document::from_spec(&spec.document),
            frame: spec.frame.as_ref().map(Document::from_spec),
        }
    }

    pub fn to_spec(&self) -> PageSpec {
        PageSpec {
            document: self.document.to_spec(),
            frame: self.frame.as_ref().map(Document::to_spec),
        }
    }
}

/// Whether the workbox wrapper has rendered in the top document or the frame.
pub fn workbox_present(page: &Page, wrapper_class: &str) -> bool {
    if !page.document.query_class(wrapper_class).is_empty() {
        return true;
    }
    page.frame
        .as_ref()
        .is_some_and(|frame| !frame.query_class(wrapper_class).is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Document {
        let spec: NodeSpec = serde_json::from_str(
            r#"{
                "tag": "body",
                "children": [
                    {"tag": "div", "classes": ["wrapper"], "children": [
                        {"tag": "div", "classes": ["item"], "attrs": {"onclick": "x"}},
                        {"tag": "div", "classes": ["item"]}
                    ]}
                ]
            }"#,
        )
        .expect("parse spec");
        Document::from_spec(&spec)
    }

    #[test]
    fn query_class_finds_nodes_in_document_order() {
        let doc = sample();
        assert_eq!(doc.query_class("item").len(), 2);
        assert_eq!(doc.query_class("wrapper").len(), 1);
        assert_eq!(doc.query_class("missing").len(), 0);
    }

    #[test]
    fn insert_after_places_node_between_siblings() {
        let mut doc = sample();
        let wrapper = doc.query_class("wrapper")[0];
        let items = doc.query_class("item");
        let inserted = doc.create_node("div", &["note"]);
        doc.insert_after(wrapper, items[0], inserted);
        let children = doc.children(wrapper);
        assert_eq!(children[1], inserted);
        assert_eq!(children.len(), 3);
    }

    #[test]
    fn mutations_bump_the_revision() {
        let mut doc = sample();
        let before = doc.revision();
        let node = doc.create_node("span", &[]);
        doc.append_child(doc.root(), node);
        doc.set_attr(node, "k", "v");
        assert!(doc.revision() > before);
    }

    #[test]
    fn round_trips_through_spec() {
        let doc = sample();
        let rebuilt = Document::from_spec(&doc.to_spec());
        assert_eq!(rebuilt.query_class("item").len(), 2);
        let item = rebuilt.query_class("item")[0];
        assert_eq!(rebuilt.attr(item, "onclick"), Some("x"));
    }

    #[test]
    fn workbox_presence_checks_top_and_frame() {
        let page = Page {
            document: sample(),
            frame: None,
        };
        assert!(workbox_present(&page, "wrapper"));
        assert!(!workbox_present(&page, "missing"));

        let page = Page {
            document: Document::new(),
            frame: Some(sample()),
        };
        assert!(workbox_present(&page, "wrapper"));
    }
}
