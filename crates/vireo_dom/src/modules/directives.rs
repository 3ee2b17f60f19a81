//! Directive module
//!
//! Funnels user directives through the patch cycle: `bind` on create,
//! `update` when a node is patched in place, `unbind` on teardown.
//! Applied last so directives observe the node after every built-in
//! aspect has been patched.

use rustc_hash::FxHashMap;

use crate::modules::PatchModule;
use crate::node_ops::SharedDom;
use crate::vnode::{Directive, VNode};

pub struct DirectivesModule;

fn directives_of(vnode: &VNode) -> &[Directive] {
    vnode
        .data
        .as_ref()
        .map(|d| d.directives.as_slice())
        .unwrap_or(&[])
}

impl PatchModule for DirectivesModule {
    fn create(&self, dom: &SharedDom, vnode: &VNode) {
        let Some(elm) = vnode.elm else {
            return;
        };
        for directive in directives_of(vnode) {
            if let Some(bind) = &directive.bind {
                bind(dom, elm, &directive.value);
            }
        }
    }

    fn update(&self, dom: &SharedDom, old: &VNode, vnode: &VNode) {
        let Some(elm) = vnode.elm else {
            return;
        };
        let old_dirs: FxHashMap<&str, &Directive> = directives_of(old)
            .iter()
            .map(|d| (&*d.name, d))
            .collect();
        let mut seen: FxHashMap<&str, ()> = FxHashMap::default();
        for directive in directives_of(vnode) {
            seen.insert(&directive.name, ());
            match old_dirs.get(&*directive.name) {
                Some(_) => {
                    if let Some(update) = &directive.update {
                        update(dom, elm, &directive.value);
                    }
                }
                None => {
                    if let Some(bind) = &directive.bind {
                        bind(dom, elm, &directive.value);
                    }
                }
            }
        }
        for (name, directive) in old_dirs {
            if !seen.contains_key(name) {
                if let Some(unbind) = &directive.unbind {
                    unbind(dom, elm, &directive.value);
                }
            }
        }
    }

    fn destroy(&self, dom: &SharedDom, vnode: &VNode) {
        let Some(elm) = vnode.elm else {
            return;
        };
        for directive in directives_of(vnode) {
            if let Some(unbind) = &directive.unbind {
                unbind(dom, elm, &directive.value);
            }
        }
    }
}
