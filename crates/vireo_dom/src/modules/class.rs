//! Class module
//!
//! Merges the static class with the dynamic binding (string, list of
//! strings, or record of flag -> truthy) into one class string.

use vireo_core::Value;

use crate::modules::PatchModule;
use crate::node_ops::SharedDom;
use crate::vnode::{VNode, VNodeData};

pub struct ClassModule;

fn class_string(data: &VNodeData) -> String {
    let mut parts: Vec<String> = Vec::new();
    if let Some(static_class) = &data.class_static {
        if !static_class.is_empty() {
            parts.push(static_class.to_string());
        }
    }
    if let Some(binding) = &data.class {
        collect_class(binding, &mut parts);
    }
    parts.join(" ")
}

fn collect_class(binding: &Value, parts: &mut Vec<String>) {
    match binding {
        Value::Str(s) if !s.is_empty() => parts.push(s.to_string()),
        Value::List(list) => {
            for item in list.to_vec() {
                collect_class(&item, parts);
            }
        }
        Value::Record(record) => {
            for key in record.keys() {
                if record.get(&key).is_truthy() {
                    parts.push(key.to_string());
                }
            }
        }
        _ => {}
    }
}

impl PatchModule for ClassModule {
    fn create(&self, dom: &SharedDom, vnode: &VNode) {
        let (Some(elm), Some(data)) = (vnode.elm, vnode.data.as_ref()) else {
            return;
        };
        let class = class_string(data);
        if !class.is_empty() {
            dom.borrow_mut().set_class(elm, &class);
        }
    }

    fn update(&self, dom: &SharedDom, old: &VNode, vnode: &VNode) {
        let (Some(elm), Some(data)) = (vnode.elm, vnode.data.as_ref()) else {
            return;
        };
        let class = class_string(data);
        let old_class = old.data.as_ref().map(|d| class_string(d)).unwrap_or_default();
        if class != old_class {
            dom.borrow_mut().set_class(elm, &class);
        }
    }
}
