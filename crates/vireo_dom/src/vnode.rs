//! Virtual nodes
//!
//! A `VNode` is the immutable descriptor a render function produces:
//! element, component placeholder, text or comment. The patcher compares
//! descriptor trees and mutates the host only where they differ.

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use vireo_core::Value;

use crate::node_ops::{Listener, NodeId, SharedDom};

/// Identity key used by the keyed-children diff.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Key {
    Str(Rc<str>),
    Int(i64),
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key::Str(Rc::from(s))
    }
}

impl From<i64> for Key {
    fn from(n: i64) -> Self {
        Key::Int(n)
    }
}

/// Hook invoked when a directive binds, updates or unbinds on a node.
pub type DirectiveHook = Rc<dyn Fn(&SharedDom, NodeId, &Value)>;

/// A user directive carried on a vnode. Hooks are attached at creation
/// time; the directive module dispatches them last, after every built-in
/// module has patched its aspect.
#[derive(Clone)]
pub struct Directive {
    pub name: Rc<str>,
    pub value: Value,
    pub arg: Option<Rc<str>>,
    pub bind: Option<DirectiveHook>,
    pub update: Option<DirectiveHook>,
    pub unbind: Option<DirectiveHook>,
}

impl Directive {
    pub fn new(name: impl Into<Rc<str>>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            arg: None,
            bind: None,
            update: None,
            unbind: None,
        }
    }

    pub fn with_arg(mut self, arg: impl Into<Rc<str>>) -> Self {
        self.arg = Some(arg.into());
        self
    }

    pub fn on_bind(mut self, hook: impl Fn(&SharedDom, NodeId, &Value) + 'static) -> Self {
        self.bind = Some(Rc::new(hook));
        self
    }

    pub fn on_update(mut self, hook: impl Fn(&SharedDom, NodeId, &Value) + 'static) -> Self {
        self.update = Some(Rc::new(hook));
        self
    }

    pub fn on_unbind(mut self, hook: impl Fn(&SharedDom, NodeId, &Value) + 'static) -> Self {
        self.unbind = Some(Rc::new(hook));
        self
    }
}

/// Node-level hooks, installed by the component layer on placeholder
/// vnodes and dispatched by the patcher at the matching points.
#[derive(Clone, Default)]
pub struct VNodeHooks {
    /// Element creation found a component placeholder: instantiate and
    /// mount the child, leaving its root element on the vnode.
    pub init: Option<Rc<dyn Fn(&mut VNode)>>,
    /// A matching placeholder is being patched: carry the instance over
    /// and push updated props/listeners/slots into it.
    pub prepatch: Option<Rc<dyn Fn(&VNode, &mut VNode)>>,
    /// Fired after module updates when the vnode was patched in place.
    pub update: Option<Rc<dyn Fn(&VNode, &VNode)>>,
    /// The node entered the host tree.
    pub insert: Option<Rc<dyn Fn(&VNode)>>,
    /// The node's subtree is being torn down.
    pub destroy: Option<Rc<dyn Fn(&VNode)>>,
}

/// Declarative per-node data. Every aspect is patched by its module:
/// attrs, class, style, dom-props, listeners, directives.
#[derive(Clone, Default)]
pub struct VNodeData {
    pub key: Option<Key>,
    pub ref_name: Option<Rc<str>>,
    pub slot: Option<Rc<str>>,
    pub ns: Option<Rc<str>>,
    pub attrs: FxHashMap<Rc<str>, Value>,
    /// Static class from the template, merged ahead of the binding.
    pub class_static: Option<Rc<str>>,
    /// Dynamic class binding: string, list of strings, or record of
    /// flag -> bool.
    pub class: Option<Value>,
    pub style: FxHashMap<Rc<str>, Value>,
    pub dom_props: FxHashMap<Rc<str>, Value>,
    pub on: FxHashMap<Rc<str>, Listener>,
    /// Listeners a component placeholder forwards to its root element.
    pub native_on: FxHashMap<Rc<str>, Listener>,
    /// Component props extracted by the component layer.
    pub props: FxHashMap<Rc<str>, Value>,
    pub directives: Vec<Directive>,
    pub hook: Option<VNodeHooks>,
}

impl VNodeData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key(mut self, key: impl Into<Key>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn attr(mut self, name: impl Into<Rc<str>>, value: impl Into<Value>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    pub fn class_static(mut self, class: impl Into<Rc<str>>) -> Self {
        self.class_static = Some(class.into());
        self
    }

    pub fn class(mut self, binding: impl Into<Value>) -> Self {
        self.class = Some(binding.into());
        self
    }

    pub fn style(mut self, name: impl Into<Rc<str>>, value: impl Into<Value>) -> Self {
        self.style.insert(name.into(), value.into());
        self
    }

    pub fn dom_prop(mut self, name: impl Into<Rc<str>>, value: impl Into<Value>) -> Self {
        self.dom_props.insert(name.into(), value.into());
        self
    }

    pub fn prop(mut self, name: impl Into<Rc<str>>, value: impl Into<Value>) -> Self {
        self.props.insert(name.into(), value.into());
        self
    }

    pub fn on(mut self, event: impl Into<Rc<str>>, listener: impl Fn(&Value) + 'static) -> Self {
        self.on.insert(event.into(), Rc::new(listener));
        self
    }

    pub fn native_on(
        mut self,
        event: impl Into<Rc<str>>,
        listener: impl Fn(&Value) + 'static,
    ) -> Self {
        self.native_on.insert(event.into(), Rc::new(listener));
        self
    }

    pub fn directive(mut self, directive: Directive) -> Self {
        self.directives.push(directive);
        self
    }

    pub fn ref_name(mut self, name: impl Into<Rc<str>>) -> Self {
        self.ref_name = Some(name.into());
        self
    }

    pub fn slot(mut self, name: impl Into<Rc<str>>) -> Self {
        self.slot = Some(name.into());
        self
    }
}

/// A virtual node.
#[derive(Clone, Default)]
pub struct VNode {
    pub tag: Option<Rc<str>>,
    pub data: Option<Rc<VNodeData>>,
    pub children: Vec<VNode>,
    pub text: Option<Rc<str>>,
    /// Host node this descriptor is currently bound to.
    pub elm: Option<NodeId>,
    pub key: Option<Key>,
    /// Mounted child component behind a placeholder vnode. Stored
    /// type-erased; the component layer downcasts.
    pub component_instance: Option<Rc<dyn Any>>,
    pub is_comment: bool,
    /// Static subtrees are reused wholesale when keys match.
    pub is_static: bool,
}

impl VNode {
    pub fn element(tag: impl Into<Rc<str>>) -> Self {
        Self {
            tag: Some(tag.into()),
            ..Default::default()
        }
    }

    pub fn text_node(text: impl Into<Rc<str>>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn comment(text: impl Into<Rc<str>>) -> Self {
        Self {
            text: Some(text.into()),
            is_comment: true,
            ..Default::default()
        }
    }

    /// Placeholder rendered when a render function yields nothing.
    pub fn empty() -> Self {
        Self::comment("")
    }

    pub fn with_data(mut self, data: VNodeData) -> Self {
        self.key = data.key.clone();
        self.data = Some(Rc::new(data));
        self
    }

    pub fn with_children(mut self, children: Vec<VNode>) -> Self {
        self.children = children;
        self
    }

    pub fn with_key(mut self, key: impl Into<Key>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn mark_static(mut self) -> Self {
        self.is_static = true;
        self
    }

    pub fn is_element(&self) -> bool {
        self.tag.is_some()
    }

    pub fn is_text(&self) -> bool {
        self.tag.is_none() && !self.is_comment
    }

    /// True for placeholder vnodes the component layer hung an init
    /// hook on.
    pub fn is_component_placeholder(&self) -> bool {
        self.data
            .as_ref()
            .and_then(|d| d.hook.as_ref())
            .map(|h| h.init.is_some())
            .unwrap_or(false)
    }

    pub(crate) fn hook(&self) -> Option<&VNodeHooks> {
        self.data.as_ref().and_then(|d| d.hook.as_ref())
    }

    /// Copy of this node without its children; used where only identity
    /// and bindings matter (insert-hook queue).
    pub(crate) fn header_clone(&self) -> VNode {
        VNode {
            tag: self.tag.clone(),
            data: self.data.clone(),
            children: Vec::new(),
            text: self.text.clone(),
            elm: self.elm,
            key: self.key.clone(),
            component_instance: self.component_instance.clone(),
            is_comment: self.is_comment,
            is_static: self.is_static,
        }
    }
}

impl fmt::Debug for VNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.tag, self.is_comment) {
            (Some(tag), _) => write!(f, "<{tag} key={:?} children={}>", self.key, self.children.len()),
            (None, true) => write!(f, "<!-- {:?} -->", self.text),
            (None, false) => write!(f, "#text({:?})", self.text),
        }
    }
}

/// Two vnodes describe the same host node iff their keys match and the
/// tag, comment flag and data presence agree; `<input>` elements must
/// also agree on their `type` attribute, which hosts cannot change in
/// place.
pub fn same_vnode(a: &VNode, b: &VNode) -> bool {
    a.key == b.key
        && a.tag == b.tag
        && a.is_comment == b.is_comment
        && a.data.is_some() == b.data.is_some()
        && same_input_type(a, b)
}

fn same_input_type(a: &VNode, b: &VNode) -> bool {
    if a.tag.as_deref() != Some("input") {
        return true;
    }
    let type_of = |v: &VNode| {
        v.data
            .as_ref()
            .and_then(|d| d.attrs.get("type"))
            .map(|t| t.to_display_string())
    };
    type_of(a) == type_of(b)
}

// =========================================================================
// Children normalization
// =========================================================================

/// Children as accepted at vnode-creation sites: nothing, loose text, a
/// single node, a flat list, or arbitrarily nested lists.
pub enum Children {
    None,
    Text(Rc<str>),
    One(Box<VNode>),
    Many(Vec<VNode>),
    Nested(Vec<Children>),
}

impl From<&str> for Children {
    fn from(s: &str) -> Self {
        Children::Text(Rc::from(s))
    }
}

impl From<String> for Children {
    fn from(s: String) -> Self {
        Children::Text(Rc::from(s.as_str()))
    }
}

impl From<VNode> for Children {
    fn from(vnode: VNode) -> Self {
        Children::One(Box::new(vnode))
    }
}

impl From<Vec<VNode>> for Children {
    fn from(vnodes: Vec<VNode>) -> Self {
        Children::Many(vnodes)
    }
}

impl From<Vec<Children>> for Children {
    fn from(nested: Vec<Children>) -> Self {
        Children::Nested(nested)
    }
}

impl From<()> for Children {
    fn from(_: ()) -> Self {
        Children::None
    }
}

/// One-level flatten for children emitted by a compiler, which already
/// guarantees vnode items and at most one nesting level.
pub fn simple_normalize(children: Children) -> Vec<VNode> {
    match children {
        Children::None => Vec::new(),
        Children::Text(text) => vec![VNode::text_node(text)],
        Children::One(vnode) => vec![*vnode],
        Children::Many(vnodes) => vnodes,
        Children::Nested(nested) => {
            let mut out = Vec::new();
            for child in nested {
                match child {
                    Children::Many(vnodes) => out.extend(vnodes),
                    other => out.extend(simple_normalize(other)),
                }
            }
            out
        }
    }
}

/// Deep flatten with adjacent-text coalescing, for hand-written render
/// functions that may nest freely and mix loose strings in.
pub fn full_normalize(children: Children) -> Vec<VNode> {
    let mut out: Vec<VNode> = Vec::new();
    normalize_into(children, &mut out);
    out
}

fn normalize_into(children: Children, out: &mut Vec<VNode>) {
    match children {
        Children::None => {}
        Children::Text(text) => push_text(out, &text),
        Children::One(vnode) => push_node(out, *vnode),
        Children::Many(vnodes) => {
            for vnode in vnodes {
                push_node(out, vnode);
            }
        }
        Children::Nested(nested) => {
            for child in nested {
                normalize_into(child, out);
            }
        }
    }
}

fn push_node(out: &mut Vec<VNode>, vnode: VNode) {
    if vnode.is_text() {
        if let Some(text) = vnode.text.clone() {
            push_text(out, &text);
            return;
        }
    }
    out.push(vnode);
}

fn push_text(out: &mut Vec<VNode>, text: &str) {
    if let Some(last) = out.last_mut() {
        if last.is_text() {
            let merged = format!("{}{}", last.text.as_deref().unwrap_or(""), text);
            last.text = Some(Rc::from(merged.as_str()));
            return;
        }
    }
    out.push(VNode::text_node(text));
}
