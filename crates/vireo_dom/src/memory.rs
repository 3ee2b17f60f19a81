//! In-memory host
//!
//! A complete `NodeOps` implementation over a slotmap arena, used by
//! tests and headless runs. Every operation is appended to an op log so
//! tests can assert not just the final tree but how it was reached
//! (patch-minimality assertions count structural ops).

use std::fmt::Write as _;
use std::rc::Rc;

use rustc_hash::FxHashMap;
use slotmap::SlotMap;

use vireo_core::Value;

use crate::node_ops::{Listener, NodeId, NodeOps};

/// One recorded host operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DomOp {
    CreateElement(String),
    CreateText(String),
    CreateComment(String),
    InsertBefore,
    AppendChild,
    RemoveChild,
    SetTextContent(String),
    SetAttribute(String),
    RemoveAttribute(String),
    SetClass(String),
    SetProp(String),
    SetInlineStyle(String),
    RemoveInlineStyle(String),
    SetListener(String),
    RemoveListener(String),
    SetStyleScope(String),
}

impl DomOp {
    /// Structural ops create, move or remove nodes; aspect ops only
    /// touch an existing node.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            DomOp::CreateElement(_)
                | DomOp::CreateText(_)
                | DomOp::CreateComment(_)
                | DomOp::InsertBefore
                | DomOp::AppendChild
                | DomOp::RemoveChild
        )
    }
}

enum NodeKind {
    Element {
        tag: Rc<str>,
        ns: Option<Rc<str>>,
        attrs: FxHashMap<Rc<str>, Rc<str>>,
        class: Option<Rc<str>>,
        style: FxHashMap<Rc<str>, Rc<str>>,
        props: FxHashMap<Rc<str>, Value>,
        listeners: FxHashMap<Rc<str>, Listener>,
        style_scope: Option<Rc<str>>,
    },
    Text(Rc<str>),
    Comment(Rc<str>),
}

struct MemoryNode {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// The in-memory host tree.
#[derive(Default)]
pub struct MemoryDom {
    nodes: SlotMap<NodeId, MemoryNode>,
    ops: Vec<DomOp>,
}

impl MemoryDom {
    pub fn new() -> Self {
        Self::default()
    }

    fn new_element(&mut self, tag: &str, ns: Option<&str>) -> NodeId {
        self.nodes.insert(MemoryNode {
            kind: NodeKind::Element {
                tag: Rc::from(tag),
                ns: ns.map(Rc::from),
                attrs: FxHashMap::default(),
                class: None,
                style: FxHashMap::default(),
                props: FxHashMap::default(),
                listeners: FxHashMap::default(),
                style_scope: None,
            },
            parent: None,
            children: Vec::new(),
        })
    }

    fn detach(&mut self, node: NodeId) {
        if let Some(parent) = self.nodes.get(node).and_then(|n| n.parent) {
            if let Some(p) = self.nodes.get_mut(parent) {
                p.children.retain(|&c| c != node);
            }
            if let Some(n) = self.nodes.get_mut(node) {
                n.parent = None;
            }
        }
    }

    /// A detached element usable as a mount point.
    pub fn create_root(&mut self) -> NodeId {
        self.new_element("root", None)
    }

    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.nodes
            .get(node)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.nodes.contains_key(node)
    }

    pub fn attribute(&self, node: NodeId, name: &str) -> Option<Rc<str>> {
        match &self.nodes.get(node)?.kind {
            NodeKind::Element { attrs, .. } => attrs.get(name).cloned(),
            _ => None,
        }
    }

    pub fn class_of(&self, node: NodeId) -> Option<Rc<str>> {
        match &self.nodes.get(node)?.kind {
            NodeKind::Element { class, .. } => class.clone(),
            _ => None,
        }
    }

    pub fn style_of(&self, node: NodeId, name: &str) -> Option<Rc<str>> {
        match &self.nodes.get(node)?.kind {
            NodeKind::Element { style, .. } => style.get(name).cloned(),
            _ => None,
        }
    }

    pub fn prop_of(&self, node: NodeId, name: &str) -> Option<Value> {
        match &self.nodes.get(node)?.kind {
            NodeKind::Element { props, .. } => props.get(name).cloned(),
            _ => None,
        }
    }

    /// Dispatch an event to the listener registered on a node.
    pub fn dispatch(&self, node: NodeId, event: &str, payload: &Value) {
        let listener = match &self.nodes.get(node).map(|n| &n.kind) {
            Some(NodeKind::Element { listeners, .. }) => listeners.get(event).cloned(),
            _ => None,
        };
        if let Some(listener) = listener {
            listener(payload);
        }
    }

    pub fn op_log(&self) -> &[DomOp] {
        &self.ops
    }

    pub fn clear_ops(&mut self) {
        self.ops.clear();
    }

    pub fn count_ops(&self, pred: impl Fn(&DomOp) -> bool) -> usize {
        self.ops.iter().filter(|op| pred(op)).count()
    }

    /// Serialize a subtree to an HTML-ish string for assertions.
    pub fn to_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.write_html(node, &mut out);
        out
    }

    fn write_html(&self, node: NodeId, out: &mut String) {
        let Some(n) = self.nodes.get(node) else {
            return;
        };
        match &n.kind {
            NodeKind::Text(text) => out.push_str(text),
            NodeKind::Comment(text) => {
                let _ = write!(out, "<!--{text}-->");
            }
            NodeKind::Element {
                tag, attrs, class, style, ..
            } => {
                let _ = write!(out, "<{tag}");
                if let Some(class) = class {
                    if !class.is_empty() {
                        let _ = write!(out, " class=\"{class}\"");
                    }
                }
                let mut names: Vec<_> = attrs.keys().collect();
                names.sort();
                for name in names {
                    let _ = write!(out, " {name}=\"{}\"", attrs[name]);
                }
                if !style.is_empty() {
                    let mut styles: Vec<_> = style.iter().collect();
                    styles.sort_by_key(|(k, _)| k.clone());
                    out.push_str(" style=\"");
                    for (name, value) in styles {
                        let _ = write!(out, "{name}:{value};");
                    }
                    out.push('"');
                }
                out.push('>');
                for &child in &n.children {
                    self.write_html(child, out);
                }
                let _ = write!(out, "</{tag}>");
            }
        }
    }
}

impl NodeOps for MemoryDom {
    fn create_element(&mut self, tag: &str) -> NodeId {
        self.ops.push(DomOp::CreateElement(tag.to_string()));
        self.new_element(tag, None)
    }

    fn create_element_ns(&mut self, ns: &str, tag: &str) -> NodeId {
        self.ops.push(DomOp::CreateElement(tag.to_string()));
        self.new_element(tag, Some(ns))
    }

    fn create_text(&mut self, text: &str) -> NodeId {
        self.ops.push(DomOp::CreateText(text.to_string()));
        self.nodes.insert(MemoryNode {
            kind: NodeKind::Text(Rc::from(text)),
            parent: None,
            children: Vec::new(),
        })
    }

    fn create_comment(&mut self, text: &str) -> NodeId {
        self.ops.push(DomOp::CreateComment(text.to_string()));
        self.nodes.insert(MemoryNode {
            kind: NodeKind::Comment(Rc::from(text)),
            parent: None,
            children: Vec::new(),
        })
    }

    fn insert_before(&mut self, parent: NodeId, node: NodeId, before: Option<NodeId>) {
        self.ops.push(DomOp::InsertBefore);
        if !self.nodes.contains_key(parent) || !self.nodes.contains_key(node) {
            return;
        }
        self.detach(node);
        let index = {
            let p = &self.nodes[parent];
            match before {
                Some(before) => match p.children.iter().position(|&c| c == before) {
                    Some(i) => i,
                    None => p.children.len(),
                },
                None => p.children.len(),
            }
        };
        self.nodes[parent].children.insert(index, node);
        self.nodes[node].parent = Some(parent);
    }

    fn remove_child(&mut self, parent: NodeId, node: NodeId) {
        self.ops.push(DomOp::RemoveChild);
        if let Some(p) = self.nodes.get_mut(parent) {
            p.children.retain(|&c| c != node);
        }
        // Dropping the subtree mirrors a host releasing detached nodes.
        self.drop_subtree(node);
    }

    fn append_child(&mut self, parent: NodeId, node: NodeId) {
        self.ops.push(DomOp::AppendChild);
        self.detach(node);
        if self.nodes.contains_key(parent) && self.nodes.contains_key(node) {
            self.nodes[parent].children.push(node);
            self.nodes[node].parent = Some(parent);
        }
    }

    fn parent_node(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(node)?.parent
    }

    fn next_sibling(&self, node: NodeId) -> Option<NodeId> {
        let parent = self.nodes.get(node)?.parent?;
        let siblings = &self.nodes.get(parent)?.children;
        let i = siblings.iter().position(|&c| c == node)?;
        siblings.get(i + 1).copied()
    }

    fn first_child(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(node)?.children.first().copied()
    }

    fn tag_name(&self, node: NodeId) -> Option<Rc<str>> {
        match &self.nodes.get(node)?.kind {
            NodeKind::Element { tag, .. } => Some(tag.clone()),
            _ => None,
        }
    }

    fn is_element(&self, node: NodeId) -> bool {
        matches!(
            self.nodes.get(node).map(|n| &n.kind),
            Some(NodeKind::Element { .. })
        )
    }

    fn is_text(&self, node: NodeId) -> bool {
        matches!(
            self.nodes.get(node).map(|n| &n.kind),
            Some(NodeKind::Text(_))
        )
    }

    fn is_comment(&self, node: NodeId) -> bool {
        matches!(
            self.nodes.get(node).map(|n| &n.kind),
            Some(NodeKind::Comment(_))
        )
    }

    fn text_content(&self, node: NodeId) -> Option<Rc<str>> {
        match &self.nodes.get(node)?.kind {
            NodeKind::Text(text) | NodeKind::Comment(text) => Some(text.clone()),
            NodeKind::Element { .. } => {
                let mut out = String::new();
                self.collect_text(node, &mut out);
                Some(Rc::from(out.as_str()))
            }
        }
    }

    fn set_text_content(&mut self, node: NodeId, text: &str) {
        self.ops.push(DomOp::SetTextContent(text.to_string()));
        let is_element = self.is_element(node);
        if is_element {
            // Setting text content replaces any element children.
            for child in self.children(node) {
                self.drop_subtree(child);
            }
            if let Some(n) = self.nodes.get_mut(node) {
                n.children.clear();
            }
            if !text.is_empty() && self.nodes.contains_key(node) {
                let text_node = self.nodes.insert(MemoryNode {
                    kind: NodeKind::Text(Rc::from(text)),
                    parent: Some(node),
                    children: Vec::new(),
                });
                self.nodes[node].children.push(text_node);
            }
        } else if let Some(n) = self.nodes.get_mut(node) {
            if let NodeKind::Text(t) | NodeKind::Comment(t) = &mut n.kind {
                *t = Rc::from(text);
            }
        }
    }

    fn set_style_scope(&mut self, node: NodeId, scope: &str) {
        self.ops.push(DomOp::SetStyleScope(scope.to_string()));
        if let Some(NodeKind::Element { style_scope, .. }) = self.kind_mut(node) {
            *style_scope = Some(Rc::from(scope));
        }
    }

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) {
        self.ops.push(DomOp::SetAttribute(name.to_string()));
        if let Some(NodeKind::Element { attrs, .. }) = self.kind_mut(node) {
            attrs.insert(Rc::from(name), Rc::from(value));
        }
    }

    fn remove_attribute(&mut self, node: NodeId, name: &str) {
        self.ops.push(DomOp::RemoveAttribute(name.to_string()));
        if let Some(NodeKind::Element { attrs, .. }) = self.kind_mut(node) {
            attrs.remove(name);
        }
    }

    fn set_class(&mut self, node: NodeId, value: &str) {
        self.ops.push(DomOp::SetClass(value.to_string()));
        if let Some(NodeKind::Element { class, .. }) = self.kind_mut(node) {
            *class = Some(Rc::from(value));
        }
    }

    fn set_prop(&mut self, node: NodeId, name: &str, value: Value) {
        self.ops.push(DomOp::SetProp(name.to_string()));
        if let Some(NodeKind::Element { props, .. }) = self.kind_mut(node) {
            props.insert(Rc::from(name), value);
        }
    }

    fn set_inline_style(&mut self, node: NodeId, name: &str, value: &str) {
        self.ops.push(DomOp::SetInlineStyle(name.to_string()));
        if let Some(NodeKind::Element { style, .. }) = self.kind_mut(node) {
            style.insert(Rc::from(name), Rc::from(value));
        }
    }

    fn remove_inline_style(&mut self, node: NodeId, name: &str) {
        self.ops.push(DomOp::RemoveInlineStyle(name.to_string()));
        if let Some(NodeKind::Element { style, .. }) = self.kind_mut(node) {
            style.remove(name);
        }
    }

    fn set_listener(&mut self, node: NodeId, event: &str, listener: Listener) {
        self.ops.push(DomOp::SetListener(event.to_string()));
        if let Some(NodeKind::Element { listeners, .. }) = self.kind_mut(node) {
            listeners.insert(Rc::from(event), listener);
        }
    }

    fn remove_listener(&mut self, node: NodeId, event: &str) {
        self.ops.push(DomOp::RemoveListener(event.to_string()));
        if let Some(NodeKind::Element { listeners, .. }) = self.kind_mut(node) {
            listeners.remove(event);
        }
    }
}

impl MemoryDom {
    fn kind_mut(&mut self, node: NodeId) -> Option<&mut NodeKind> {
        self.nodes.get_mut(node).map(|n| &mut n.kind)
    }

    fn collect_text(&self, node: NodeId, out: &mut String) {
        if let Some(n) = self.nodes.get(node) {
            match &n.kind {
                NodeKind::Text(text) => out.push_str(text),
                NodeKind::Comment(_) => {}
                NodeKind::Element { .. } => {
                    for &child in &n.children {
                        self.collect_text(child, out);
                    }
                }
            }
        }
    }

    fn drop_subtree(&mut self, node: NodeId) {
        let children = self.children(node);
        for child in children {
            self.drop_subtree(child);
        }
        self.nodes.remove(node);
    }
}
