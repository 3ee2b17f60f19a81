//! Listener module
//!
//! Listeners are compared by handle identity: a render that produces a
//! fresh closure re-registers it, an unchanged handle is left alone.

use std::rc::Rc;

use crate::modules::PatchModule;
use crate::node_ops::SharedDom;
use crate::vnode::VNode;

pub struct EventsModule;

impl PatchModule for EventsModule {
    fn create(&self, dom: &SharedDom, vnode: &VNode) {
        let (Some(elm), Some(data)) = (vnode.elm, vnode.data.as_ref()) else {
            return;
        };
        for (event, listener) in &data.on {
            dom.borrow_mut().set_listener(elm, event, listener.clone());
        }
    }

    fn update(&self, dom: &SharedDom, old: &VNode, vnode: &VNode) {
        let (Some(elm), Some(data)) = (vnode.elm, vnode.data.as_ref()) else {
            return;
        };
        let empty;
        let old_on = match old.data.as_ref() {
            Some(old_data) => &old_data.on,
            None => {
                empty = Default::default();
                &empty
            }
        };
        for (event, listener) in &data.on {
            let unchanged = old_on
                .get(event)
                .map(|prev| Rc::ptr_eq(prev, listener))
                .unwrap_or(false);
            if !unchanged {
                dom.borrow_mut().set_listener(elm, event, listener.clone());
            }
        }
        for event in old_on.keys() {
            if !data.on.contains_key(event) {
                dom.borrow_mut().remove_listener(elm, event);
            }
        }
    }
}
