//! Inline-style module

use vireo_core::Value;

use crate::modules::PatchModule;
use crate::node_ops::SharedDom;
use crate::vnode::VNode;

pub struct StyleModule;

fn style_text(value: &Value) -> Option<String> {
    match value {
        Value::Null | Value::Bool(false) => None,
        other => Some(other.to_display_string()),
    }
}

impl PatchModule for StyleModule {
    fn create(&self, dom: &SharedDom, vnode: &VNode) {
        let (Some(elm), Some(data)) = (vnode.elm, vnode.data.as_ref()) else {
            return;
        };
        for (name, value) in &data.style {
            if let Some(text) = style_text(value) {
                dom.borrow_mut().set_inline_style(elm, name, &text);
            }
        }
    }

    fn update(&self, dom: &SharedDom, old: &VNode, vnode: &VNode) {
        let (Some(elm), Some(data)) = (vnode.elm, vnode.data.as_ref()) else {
            return;
        };
        let empty;
        let old_style = match old.data.as_ref() {
            Some(old_data) => &old_data.style,
            None => {
                empty = Default::default();
                &empty
            }
        };
        for (name, value) in &data.style {
            let unchanged = old_style
                .get(name)
                .map(|prev| prev.same_observable(value))
                .unwrap_or(false);
            if unchanged {
                continue;
            }
            match style_text(value) {
                Some(text) => dom.borrow_mut().set_inline_style(elm, name, &text),
                None => dom.borrow_mut().remove_inline_style(elm, name),
            }
        }
        for name in old_style.keys() {
            if !data.style.contains_key(name) {
                dom.borrow_mut().remove_inline_style(elm, name);
            }
        }
    }
}
