//! Host-node interface
//!
//! The patcher mutates the host tree exclusively through this trait, so
//! the same diff drives a real platform DOM or the in-memory host used
//! by tests. Nodes are addressed by opaque arena keys.

use std::cell::RefCell;
use std::rc::Rc;

use slotmap::new_key_type;

use vireo_core::Value;

new_key_type! {
    /// Opaque handle to a host node.
    pub struct NodeId;
}

/// Event listener attached to a host node. The payload is whatever the
/// host dispatches with the event.
pub type Listener = Rc<dyn Fn(&Value)>;

/// Minimal host abstraction: structural operations used by the patcher
/// plus the attribute/property/listener surface the platform modules
/// patch through.
pub trait NodeOps {
    // Structure.
    fn create_element(&mut self, tag: &str) -> NodeId;
    fn create_element_ns(&mut self, ns: &str, tag: &str) -> NodeId;
    fn create_text(&mut self, text: &str) -> NodeId;
    fn create_comment(&mut self, text: &str) -> NodeId;
    fn insert_before(&mut self, parent: NodeId, node: NodeId, before: Option<NodeId>);
    fn remove_child(&mut self, parent: NodeId, node: NodeId);
    fn append_child(&mut self, parent: NodeId, node: NodeId);
    fn parent_node(&self, node: NodeId) -> Option<NodeId>;
    fn next_sibling(&self, node: NodeId) -> Option<NodeId>;
    fn first_child(&self, node: NodeId) -> Option<NodeId>;

    // Inspection (hydration walks server-rendered markup in lockstep).
    fn tag_name(&self, node: NodeId) -> Option<Rc<str>>;
    fn is_element(&self, node: NodeId) -> bool;
    fn is_text(&self, node: NodeId) -> bool;
    fn is_comment(&self, node: NodeId) -> bool;
    fn text_content(&self, node: NodeId) -> Option<Rc<str>>;

    // Content and per-aspect patching.
    fn set_text_content(&mut self, node: NodeId, text: &str);
    fn set_style_scope(&mut self, node: NodeId, scope: &str);
    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str);
    fn remove_attribute(&mut self, node: NodeId, name: &str);
    fn set_class(&mut self, node: NodeId, class: &str);
    fn set_prop(&mut self, node: NodeId, name: &str, value: Value);
    fn set_inline_style(&mut self, node: NodeId, name: &str, value: &str);
    fn remove_inline_style(&mut self, node: NodeId, name: &str);
    fn set_listener(&mut self, node: NodeId, event: &str, listener: Listener);
    fn remove_listener(&mut self, node: NodeId, event: &str);
}

/// Shared handle to a host. Borrows are taken per operation, never held
/// across hook or watcher callbacks.
pub type SharedDom = Rc<RefCell<dyn NodeOps>>;

/// Wrap a host implementation for use by the patcher.
pub fn shared_dom(ops: impl NodeOps + 'static) -> SharedDom {
    Rc::new(RefCell::new(ops))
}
