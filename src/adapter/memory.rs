//! In-memory host adapter.
//!
//! `MemoryDom` keeps the host tree in an index arena and records every
//! mutation the reconciler commits, which is what the diff tests assert
//! against (zero-op idempotence, exact move counts, attribute clearing).
//! It doubles as the headless/string-render adapter: `render_to_string`
//! serializes any subtree.

use std::collections::HashMap;

use super::HostAdapter;
use crate::types::{Handler, HostId, PropValue};

// =============================================================================
// Nodes
// =============================================================================

#[derive(Debug)]
enum MemKind {
    Element(String),
    Text(String),
}

#[derive(Debug)]
struct MemNode {
    kind: MemKind,
    attrs: HashMap<String, PropValue>,
    handlers: HashMap<String, Handler>,
    children: Vec<HostId>,
    parent: Option<HostId>,
}

impl MemNode {
    fn new(kind: MemKind) -> Self {
        MemNode {
            kind,
            attrs: HashMap::new(),
            handlers: HashMap::new(),
            children: Vec::new(),
            parent: None,
        }
    }
}

// =============================================================================
// Mutation Log
// =============================================================================

/// One committed host mutation, recorded in commit order.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    Create { node: HostId, tag: String },
    CreateText { node: HostId },
    UpdateText { node: HostId },
    SetAttribute { node: HostId, name: String },
    RemoveAttribute { node: HostId, name: String },
    SetHandler { node: HostId, name: String },
    RemoveHandler { node: HostId, name: String },
    /// First attachment of a node under a parent.
    Insert { parent: HostId, node: HostId },
    /// Repositioning of an already-attached node under the same parent.
    Move { parent: HostId, node: HostId },
    Remove { parent: HostId, node: HostId },
    Replace { parent: HostId, new: HostId, old: HostId },
}

// =============================================================================
// MemoryDom
// =============================================================================

/// Host tree held entirely in memory, with a mutation log.
#[derive(Debug, Default)]
pub struct MemoryDom {
    nodes: Vec<Option<MemNode>>,
    ops: Vec<Mutation>,
}

impl MemoryDom {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a detached container element to render into.
    pub fn create_container(&mut self) -> HostId {
        let id = self.alloc(MemNode::new(MemKind::Element("#container".to_string())));
        self.ops.pop(); // containers are scaffolding, not reconciler output
        id
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    pub fn tag(&self, node: HostId) -> Option<&str> {
        match &self.node(node)?.kind {
            MemKind::Element(tag) => Some(tag),
            MemKind::Text(_) => None,
        }
    }

    pub fn text(&self, node: HostId) -> Option<&str> {
        match &self.node(node)?.kind {
            MemKind::Text(content) => Some(content),
            MemKind::Element(_) => None,
        }
    }

    pub fn attr(&self, node: HostId, name: &str) -> Option<&PropValue> {
        self.node(node)?.attrs.get(name)
    }

    /// The handler map the event adapter dispatches from.
    pub fn handlers(&self, node: HostId) -> Vec<&str> {
        match self.node(node) {
            Some(n) => n.handlers.keys().map(String::as_str).collect(),
            None => Vec::new(),
        }
    }

    pub fn children(&self, node: HostId) -> Vec<HostId> {
        match self.node(node) {
            Some(n) => n.children.clone(),
            None => Vec::new(),
        }
    }

    pub fn parent(&self, node: HostId) -> Option<HostId> {
        self.node(node)?.parent
    }

    pub fn is_alive(&self, node: HostId) -> bool {
        self.node(node).is_some()
    }

    // -------------------------------------------------------------------------
    // Mutation log access
    // -------------------------------------------------------------------------

    pub fn ops(&self) -> &[Mutation] {
        &self.ops
    }

    pub fn take_ops(&mut self) -> Vec<Mutation> {
        std::mem::take(&mut self.ops)
    }

    pub fn clear_ops(&mut self) {
        self.ops.clear();
    }

    pub fn count_ops(&self, pred: impl Fn(&Mutation) -> bool) -> usize {
        self.ops.iter().filter(|m| pred(m)).count()
    }

    // -------------------------------------------------------------------------
    // String rendering
    // -------------------------------------------------------------------------

    /// Serialize a subtree. Attributes print sorted for stable output;
    /// handler props are omitted.
    pub fn render_to_string(&self, node: HostId) -> String {
        let mut out = String::new();
        self.write_node(node, &mut out);
        out
    }

    fn write_node(&self, id: HostId, out: &mut String) {
        let Some(node) = self.node(id) else {
            return;
        };
        match &node.kind {
            MemKind::Text(content) => out.push_str(content),
            MemKind::Element(tag) => {
                out.push('<');
                out.push_str(tag);
                let mut attrs: Vec<_> = node.attrs.iter().collect();
                attrs.sort_by(|a, b| a.0.cmp(b.0));
                for (name, value) in attrs {
                    out.push(' ');
                    out.push_str(name);
                    out.push_str("=\"");
                    out.push_str(&format_value(value));
                    out.push('"');
                }
                out.push('>');
                for child in &node.children {
                    self.write_node(*child, out);
                }
                out.push_str("</");
                out.push_str(tag);
                out.push('>');
            }
        }
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    fn node(&self, id: HostId) -> Option<&MemNode> {
        self.nodes.get(id.0)?.as_ref()
    }

    fn node_mut(&mut self, id: HostId) -> Option<&mut MemNode> {
        self.nodes.get_mut(id.0)?.as_mut()
    }

    fn alloc(&mut self, node: MemNode) -> HostId {
        let id = HostId(self.nodes.len());
        match &node.kind {
            MemKind::Element(tag) => self.ops.push(Mutation::Create {
                node: id,
                tag: tag.clone(),
            }),
            MemKind::Text(_) => self.ops.push(Mutation::CreateText { node: id }),
        }
        self.nodes.push(Some(node));
        id
    }

    fn detach(&mut self, parent: HostId, node: HostId) {
        if let Some(p) = self.node_mut(parent) {
            p.children.retain(|c| *c != node);
        }
        if let Some(n) = self.node_mut(node) {
            n.parent = None;
        }
    }
}

fn format_value(value: &PropValue) -> String {
    match value {
        PropValue::Str(s) => s.to_string(),
        PropValue::Bool(b) => b.to_string(),
        PropValue::Int(n) => n.to_string(),
        PropValue::Float(x) => x.to_string(),
        PropValue::Map(_) => "[map]".to_string(),
        PropValue::Handler(_) => "[handler]".to_string(),
    }
}

impl HostAdapter for MemoryDom {
    fn create(&mut self, tag: &str) -> HostId {
        self.alloc(MemNode::new(MemKind::Element(tag.to_string())))
    }

    fn create_text(&mut self, content: &str) -> HostId {
        self.alloc(MemNode::new(MemKind::Text(content.to_string())))
    }

    fn update_text(&mut self, node: HostId, content: &str) {
        let mut updated = false;
        if let Some(n) = self.node_mut(node) {
            if let MemKind::Text(stored) = &mut n.kind {
                *stored = content.to_string();
                updated = true;
            }
        }
        if updated {
            self.ops.push(Mutation::UpdateText { node });
        }
    }

    fn set_attribute(&mut self, node: HostId, name: &str, value: &PropValue) {
        let Some(n) = self.node_mut(node) else {
            return;
        };
        n.attrs.insert(name.to_string(), value.clone());
        self.ops.push(Mutation::SetAttribute {
            node,
            name: name.to_string(),
        });
    }

    fn remove_attribute(&mut self, node: HostId, name: &str) {
        let prefix = format!("{name}.");
        let Some(n) = self.node_mut(node) else {
            return;
        };
        // dotted prefix clears a whole nested group
        n.attrs.retain(|k, _| k != name && !k.starts_with(&prefix));
        self.ops.push(Mutation::RemoveAttribute {
            node,
            name: name.to_string(),
        });
    }

    fn set_handler(&mut self, node: HostId, name: &str, handler: &Handler) {
        let Some(n) = self.node_mut(node) else {
            return;
        };
        n.handlers.insert(name.to_string(), handler.clone());
        self.ops.push(Mutation::SetHandler {
            node,
            name: name.to_string(),
        });
    }

    fn remove_handler(&mut self, node: HostId, name: &str) {
        let Some(n) = self.node_mut(node) else {
            return;
        };
        n.handlers.remove(name);
        self.ops.push(Mutation::RemoveHandler {
            node,
            name: name.to_string(),
        });
    }

    fn insert_before(&mut self, parent: HostId, node: HostId, anchor: Option<HostId>) {
        let was_attached = self.parent(node) == Some(parent);
        if let Some(old_parent) = self.parent(node) {
            self.detach(old_parent, node);
        }
        let Some(p) = self.node_mut(parent) else {
            return;
        };
        let at = match anchor {
            Some(a) => p.children.iter().position(|c| *c == a).unwrap_or(p.children.len()),
            None => p.children.len(),
        };
        p.children.insert(at, node);
        if let Some(n) = self.node_mut(node) {
            n.parent = Some(parent);
        }
        if was_attached {
            self.ops.push(Mutation::Move { parent, node });
        } else {
            self.ops.push(Mutation::Insert { parent, node });
        }
    }

    fn append_child(&mut self, parent: HostId, node: HostId) {
        self.insert_before(parent, node, None);
    }

    fn remove_child(&mut self, parent: HostId, node: HostId) {
        self.detach(parent, node);
        self.ops.push(Mutation::Remove { parent, node });
    }

    fn replace_child(&mut self, parent: HostId, new: HostId, old: HostId) {
        if let Some(old_parent) = self.parent(new) {
            self.detach(old_parent, new);
        }
        let Some(p) = self.node_mut(parent) else {
            return;
        };
        match p.children.iter().position(|c| *c == old) {
            Some(at) => p.children[at] = new,
            None => p.children.push(new),
        }
        if let Some(n) = self.node_mut(new) {
            n.parent = Some(parent);
        }
        if let Some(n) = self.node_mut(old) {
            n.parent = None;
        }
        self.ops.push(Mutation::Replace { parent, new, old });
    }

    fn release(&mut self, node: HostId) {
        if node.0 < self.nodes.len() {
            self.nodes[node.0] = None;
        }
    }
}
