//! Attribute module
//!
//! Null and `false` bindings remove the attribute; `true` renders as the
//! empty string, the way boolean attributes serialize.

use vireo_core::Value;

use crate::modules::PatchModule;
use crate::node_ops::SharedDom;
use crate::vnode::VNode;

pub struct AttrsModule;

fn attr_text(value: &Value) -> Option<String> {
    match value {
        Value::Null | Value::Bool(false) => None,
        Value::Bool(true) => Some(String::new()),
        other => Some(other.to_display_string()),
    }
}

impl PatchModule for AttrsModule {
    fn create(&self, dom: &SharedDom, vnode: &VNode) {
        let (Some(elm), Some(data)) = (vnode.elm, vnode.data.as_ref()) else {
            return;
        };
        for (name, value) in &data.attrs {
            if let Some(text) = attr_text(value) {
                dom.borrow_mut().set_attribute(elm, name, &text);
            }
        }
    }

    fn update(&self, dom: &SharedDom, old: &VNode, vnode: &VNode) {
        let (Some(elm), Some(data)) = (vnode.elm, vnode.data.as_ref()) else {
            return;
        };
        let empty;
        let old_attrs = match old.data.as_ref() {
            Some(old_data) => &old_data.attrs,
            None => {
                empty = Default::default();
                &empty
            }
        };
        for (name, value) in &data.attrs {
            let unchanged = old_attrs
                .get(name)
                .map(|prev| prev.same_observable(value))
                .unwrap_or(false);
            if unchanged {
                continue;
            }
            match attr_text(value) {
                Some(text) => dom.borrow_mut().set_attribute(elm, name, &text),
                None => dom.borrow_mut().remove_attribute(elm, name),
            }
        }
        for name in old_attrs.keys() {
            if !data.attrs.contains_key(name) {
                dom.borrow_mut().remove_attribute(elm, name);
            }
        }
    }
}
