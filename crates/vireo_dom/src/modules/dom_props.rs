//! DOM-property module
//!
//! Properties land on the node object itself rather than its attribute
//! map; unlike attributes they are re-assigned even when only the host
//! may have drifted (form fields mutate their own `value`).

use crate::modules::PatchModule;
use crate::node_ops::SharedDom;
use crate::vnode::VNode;

pub struct DomPropsModule;

impl PatchModule for DomPropsModule {
    fn create(&self, dom: &SharedDom, vnode: &VNode) {
        let (Some(elm), Some(data)) = (vnode.elm, vnode.data.as_ref()) else {
            return;
        };
        for (name, value) in &data.dom_props {
            dom.borrow_mut().set_prop(elm, name, value.clone());
        }
    }

    fn update(&self, dom: &SharedDom, old: &VNode, vnode: &VNode) {
        let (Some(elm), Some(data)) = (vnode.elm, vnode.data.as_ref()) else {
            return;
        };
        for (name, value) in &data.dom_props {
            dom.borrow_mut().set_prop(elm, name, value.clone());
        }
        if let Some(old_data) = old.data.as_ref() {
            for name in old_data.dom_props.keys() {
                if !data.dom_props.contains_key(name) {
                    dom.borrow_mut().set_prop(elm, name, vireo_core::Value::Null);
                }
            }
        }
    }
}
