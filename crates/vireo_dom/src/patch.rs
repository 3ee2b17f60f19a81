//! Patcher
//!
//! Diffs an old vnode tree against a new one and applies the minimal
//! host mutations through the node-ops interface, dispatching module and
//! vnode hooks along the way. Children reconciliation is the four-pointer
//! keyed diff: matching ends are patched in place, crossed ends become
//! single moves, and only then does a lazily-built key index decide
//! between move, create and remove.

use std::cell::Cell;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::modules::{platform_modules, PatchModule};
use crate::node_ops::{NodeId, SharedDom};
use crate::vnode::{same_vnode, Key, VNode};

/// What the new tree is patched against.
pub enum PatchTarget {
    /// Nothing mounted yet: create the tree detached (component mounts
    /// insert the result through their placeholder).
    Empty,
    /// A real host node: initial mount replaces it, or hydration adopts
    /// it.
    HostNode(NodeId),
    /// The previously rendered tree.
    Tree(VNode),
}

/// An insert hook captured during creation, fired once patching is done
/// and the nodes are attached.
struct InsertEntry {
    hook: Rc<dyn Fn(&VNode)>,
    vnode: VNode,
}

type InsertQueue = Vec<InsertEntry>;

pub struct Patcher {
    modules: Vec<Box<dyn PatchModule>>,
}

impl Patcher {
    pub fn new(modules: Vec<Box<dyn PatchModule>>) -> Self {
        Self { modules }
    }

    /// A patcher with the standard platform modules.
    pub fn with_platform_modules() -> Self {
        Self::new(platform_modules())
    }

    /// Patch `vnode` against `old`, returning the root host node of the
    /// new tree.
    pub fn patch(
        &self,
        dom: &SharedDom,
        old: PatchTarget,
        vnode: &mut VNode,
        hydrating: bool,
    ) -> Option<NodeId> {
        let mut queue: InsertQueue = Vec::new();
        match old {
            PatchTarget::Empty => {
                self.create_elm(dom, vnode, &mut queue, None, None);
            }
            PatchTarget::Tree(old_vnode) => {
                if same_vnode(&old_vnode, vnode) {
                    self.patch_vnode(dom, old_vnode, vnode, &mut queue);
                } else {
                    self.replace(dom, old_vnode, vnode, &mut queue);
                }
            }
            PatchTarget::HostNode(el) => {
                if hydrating {
                    if self.hydrate(dom, el, vnode, &mut queue) {
                        invoke_insert_hooks(queue);
                        return vnode.elm;
                    }
                    vireo_core::config::dev_warn(
                        "hydration mismatch: server markup does not match the \
                         rendered tree, falling back to a full client render",
                    );
                    *vnode = reset_tree(std::mem::take(vnode));
                    queue.clear();
                }
                let parent = dom.borrow().parent_node(el);
                let ref_elm = dom.borrow().next_sibling(el);
                self.create_elm(dom, vnode, &mut queue, parent, ref_elm);
                if let Some(parent) = parent {
                    dom.borrow_mut().remove_child(parent, el);
                }
            }
        }
        invoke_insert_hooks(queue);
        vnode.elm
    }

    /// Tear a mounted tree down: destroy hooks over the whole subtree,
    /// then removal of the root from its parent (with remove hooks, so
    /// deferred-removal effects still run).
    pub fn teardown(&self, dom: &SharedDom, vnode: &VNode) {
        self.invoke_destroy_hooks(dom, vnode);
        if let Some(elm) = vnode.elm {
            if let Some(parent) = dom.borrow().parent_node(elm) {
                if vnode.tag.is_some() {
                    self.remove_with_hooks(dom, vnode, parent, elm);
                } else {
                    dom.borrow_mut().remove_child(parent, elm);
                }
            }
        }
    }

    // ---------------------------------------------------------------------
    // Creation
    // ---------------------------------------------------------------------

    fn create_elm(
        &self,
        dom: &SharedDom,
        vnode: &mut VNode,
        queue: &mut InsertQueue,
        parent_elm: Option<NodeId>,
        ref_elm: Option<NodeId>,
    ) {
        if self.create_component(dom, vnode, queue, parent_elm, ref_elm) {
            return;
        }
        match (vnode.tag.clone(), vnode.is_comment) {
            (Some(tag), _) => {
                let ns = vnode.data.as_ref().and_then(|d| d.ns.clone());
                let elm = {
                    let mut ops = dom.borrow_mut();
                    match ns {
                        Some(ns) => ops.create_element_ns(&ns, &tag),
                        None => ops.create_element(&tag),
                    }
                };
                vnode.elm = Some(elm);
                if !vnode.children.is_empty() {
                    for child in &mut vnode.children {
                        self.create_elm(dom, child, queue, Some(elm), None);
                    }
                } else if let Some(text) = vnode.text.clone() {
                    let text_node = dom.borrow_mut().create_text(&text);
                    dom.borrow_mut().append_child(elm, text_node);
                }
                if vnode.data.is_some() {
                    self.invoke_create_hooks(dom, vnode, queue);
                }
                insert(dom, parent_elm, elm, ref_elm);
            }
            (None, true) => {
                let elm = dom
                    .borrow_mut()
                    .create_comment(vnode.text.as_deref().unwrap_or(""));
                vnode.elm = Some(elm);
                insert(dom, parent_elm, elm, ref_elm);
            }
            (None, false) => {
                let elm = dom
                    .borrow_mut()
                    .create_text(vnode.text.as_deref().unwrap_or(""));
                vnode.elm = Some(elm);
                insert(dom, parent_elm, elm, ref_elm);
            }
        }
    }

    /// Component placeholders carry an init hook that instantiates and
    /// mounts the child, leaving its root element on the vnode.
    fn create_component(
        &self,
        dom: &SharedDom,
        vnode: &mut VNode,
        queue: &mut InsertQueue,
        parent_elm: Option<NodeId>,
        ref_elm: Option<NodeId>,
    ) -> bool {
        let Some(init) = vnode.hook().and_then(|h| h.init.clone()) else {
            return false;
        };
        init(vnode);
        if vnode.component_instance.is_none() {
            return false;
        }
        self.invoke_create_hooks(dom, vnode, queue);
        if let Some(elm) = vnode.elm {
            insert(dom, parent_elm, elm, ref_elm);
        }
        true
    }

    fn invoke_create_hooks(&self, dom: &SharedDom, vnode: &VNode, queue: &mut InsertQueue) {
        for module in &self.modules {
            module.create(dom, vnode);
        }
        if let Some(insert_hook) = vnode.hook().and_then(|h| h.insert.clone()) {
            queue.push(InsertEntry {
                hook: insert_hook,
                vnode: vnode.header_clone(),
            });
        }
    }

    // ---------------------------------------------------------------------
    // In-place patch
    // ---------------------------------------------------------------------

    fn replace(
        &self,
        dom: &SharedDom,
        old_vnode: VNode,
        vnode: &mut VNode,
        queue: &mut InsertQueue,
    ) {
        let old_elm = old_vnode.elm;
        let parent = old_elm.and_then(|e| dom.borrow().parent_node(e));
        let ref_elm = old_elm.and_then(|e| dom.borrow().next_sibling(e));
        self.create_elm(dom, vnode, queue, parent, ref_elm);
        if let (Some(parent), Some(old_elm)) = (parent, old_elm) {
            if old_vnode.tag.is_some() {
                self.remove_with_hooks(dom, &old_vnode, parent, old_elm);
            } else {
                dom.borrow_mut().remove_child(parent, old_elm);
            }
        }
        self.invoke_destroy_hooks(dom, &old_vnode);
    }

    fn patch_vnode(
        &self,
        dom: &SharedDom,
        old: VNode,
        vnode: &mut VNode,
        queue: &mut InsertQueue,
    ) {
        let Some(elm) = old.elm else {
            // The old node never materialized; build from scratch.
            self.create_elm(dom, vnode, queue, None, None);
            return;
        };
        vnode.elm = Some(elm);

        // Static subtrees are adopted wholesale.
        if vnode.is_static && old.is_static && vnode.key == old.key {
            vnode.component_instance = old.component_instance.clone();
            return;
        }

        if let Some(prepatch) = vnode.hook().and_then(|h| h.prepatch.clone()) {
            prepatch(&old, vnode);
        }

        if vnode.data.is_some() {
            for module in &self.modules {
                module.update(dom, &old, vnode);
            }
            if let Some(update) = vnode.hook().and_then(|h| h.update.clone()) {
                update(&old, vnode);
            }
        }

        if vnode.text.is_none() {
            let old_had_children = !old.children.is_empty();
            let has_children = !vnode.children.is_empty();
            let old_text = old.text.clone();
            match (old_had_children, has_children) {
                (true, true) => {
                    self.update_children(dom, elm, old.children, &mut vnode.children, queue);
                }
                (false, true) => {
                    if old_text.map(|t| !t.is_empty()).unwrap_or(false) {
                        dom.borrow_mut().set_text_content(elm, "");
                    }
                    for child in &mut vnode.children {
                        self.create_elm(dom, child, queue, Some(elm), None);
                    }
                }
                (true, false) => {
                    for child in old.children {
                        self.remove_vnode(dom, child, elm);
                    }
                }
                (false, false) => {
                    if old_text.is_some() {
                        dom.borrow_mut().set_text_content(elm, "");
                    }
                }
            }
        } else if old.text != vnode.text {
            dom.borrow_mut()
                .set_text_content(elm, vnode.text.as_deref().unwrap_or(""));
        }
    }

    // ---------------------------------------------------------------------
    // Keyed children diff
    // ---------------------------------------------------------------------

    fn update_children(
        &self,
        dom: &SharedDom,
        parent: NodeId,
        old_children: Vec<VNode>,
        new_children: &mut Vec<VNode>,
        queue: &mut InsertQueue,
    ) {
        let mut old: Vec<Option<VNode>> = old_children.into_iter().map(Some).collect();
        let mut old_start: i64 = 0;
        let mut old_end: i64 = old.len() as i64 - 1;
        let mut new_start: i64 = 0;
        let mut new_end: i64 = new_children.len() as i64 - 1;
        // Built on the first miss of the four fast paths.
        let mut key_index: Option<FxHashMap<Key, i64>> = None;

        while old_start <= old_end && new_start <= new_end {
            if old[old_start as usize].is_none() {
                old_start += 1;
                continue;
            }
            if old[old_end as usize].is_none() {
                old_end -= 1;
                continue;
            }

            if same_vnode(
                old[old_start as usize].as_ref().unwrap(),
                &new_children[new_start as usize],
            ) {
                let old_v = old[old_start as usize].take().unwrap();
                self.patch_vnode(dom, old_v, &mut new_children[new_start as usize], queue);
                old_start += 1;
                new_start += 1;
                continue;
            }

            if same_vnode(
                old[old_end as usize].as_ref().unwrap(),
                &new_children[new_end as usize],
            ) {
                let old_v = old[old_end as usize].take().unwrap();
                self.patch_vnode(dom, old_v, &mut new_children[new_end as usize], queue);
                old_end -= 1;
                new_end -= 1;
                continue;
            }

            if same_vnode(
                old[old_start as usize].as_ref().unwrap(),
                &new_children[new_end as usize],
            ) {
                // Old start drifted right: one move to after the old end.
                let old_v = old[old_start as usize].take().unwrap();
                let after = old[old_end as usize]
                    .as_ref()
                    .and_then(|v| v.elm)
                    .and_then(|e| dom.borrow().next_sibling(e));
                self.patch_vnode(dom, old_v, &mut new_children[new_end as usize], queue);
                if let Some(elm) = new_children[new_end as usize].elm {
                    insert(dom, Some(parent), elm, after);
                }
                old_start += 1;
                new_end -= 1;
                continue;
            }

            if same_vnode(
                old[old_end as usize].as_ref().unwrap(),
                &new_children[new_start as usize],
            ) {
                // Old end drifted left: one move to before the old start.
                let old_v = old[old_end as usize].take().unwrap();
                let before = old[old_start as usize].as_ref().and_then(|v| v.elm);
                self.patch_vnode(dom, old_v, &mut new_children[new_start as usize], queue);
                if let Some(elm) = new_children[new_start as usize].elm {
                    insert(dom, Some(parent), elm, before);
                }
                old_end -= 1;
                new_start += 1;
                continue;
            }

            if key_index.is_none() {
                let mut map = FxHashMap::default();
                for i in old_start..=old_end {
                    if let Some(v) = &old[i as usize] {
                        if let Some(key) = &v.key {
                            map.insert(key.clone(), i);
                        }
                    }
                }
                key_index = Some(map);
            }
            let found = match &new_children[new_start as usize].key {
                Some(key) => key_index.as_ref().unwrap().get(key).copied(),
                None => {
                    // Unkeyed node: linear probe for a same-shaped one.
                    let mut found = None;
                    for i in old_start..=old_end {
                        if let Some(v) = &old[i as usize] {
                            if v.key.is_none()
                                && same_vnode(v, &new_children[new_start as usize])
                            {
                                found = Some(i);
                                break;
                            }
                        }
                    }
                    found
                }
            };
            let before = old[old_start as usize].as_ref().and_then(|v| v.elm);
            match found {
                None => {
                    self.create_elm(
                        dom,
                        &mut new_children[new_start as usize],
                        queue,
                        Some(parent),
                        before,
                    );
                }
                Some(i) => {
                    let candidate = old[i as usize].take().unwrap();
                    if same_vnode(&candidate, &new_children[new_start as usize]) {
                        self.patch_vnode(
                            dom,
                            candidate,
                            &mut new_children[new_start as usize],
                            queue,
                        );
                        if let Some(elm) = new_children[new_start as usize].elm {
                            insert(dom, Some(parent), elm, before);
                        }
                    } else {
                        // Same key, different element: keep the old one
                        // for the removal sweep and create fresh.
                        old[i as usize] = Some(candidate);
                        self.create_elm(
                            dom,
                            &mut new_children[new_start as usize],
                            queue,
                            Some(parent),
                            before,
                        );
                    }
                }
            }
            new_start += 1;
        }

        if old_start > old_end {
            // Old range exhausted: everything left in the new range is an
            // addition, anchored before the node that follows the range.
            let ref_elm = new_children
                .get((new_end + 1) as usize)
                .and_then(|v| v.elm);
            for i in new_start..=new_end {
                self.create_elm(
                    dom,
                    &mut new_children[i as usize],
                    queue,
                    Some(parent),
                    ref_elm,
                );
            }
        } else if new_start > new_end {
            for i in old_start..=old_end {
                if let Some(old_v) = old[i as usize].take() {
                    self.remove_vnode(dom, old_v, parent);
                }
            }
        }
    }

    // ---------------------------------------------------------------------
    // Removal
    // ---------------------------------------------------------------------

    fn remove_vnode(&self, dom: &SharedDom, vnode: VNode, parent: NodeId) {
        if vnode.tag.is_some() {
            if let Some(elm) = vnode.elm {
                self.remove_with_hooks(dom, &vnode, parent, elm);
            }
            self.invoke_destroy_hooks(dom, &vnode);
        } else if let Some(elm) = vnode.elm {
            dom.borrow_mut().remove_child(parent, elm);
        }
    }

    /// Give every module a say before detaching: the node is released
    /// only after all modules (and the patcher itself) have called the
    /// completion callback, so a module may defer the actual detachment.
    fn remove_with_hooks(&self, dom: &SharedDom, vnode: &VNode, parent: NodeId, elm: NodeId) {
        let pending = Cell::new(self.modules.len() + 1);
        let pending = Rc::new(pending);
        let dom_for_done = dom.clone();
        let done: Rc<dyn Fn()> = Rc::new(move || {
            let left = pending.get() - 1;
            pending.set(left);
            if left == 0 {
                dom_for_done.borrow_mut().remove_child(parent, elm);
            }
        });
        for module in &self.modules {
            module.remove(dom, vnode, &done);
        }
        done();
    }

    /// Destroy hooks fire over the whole subtree, children first.
    fn invoke_destroy_hooks(&self, dom: &SharedDom, vnode: &VNode) {
        for child in &vnode.children {
            self.invoke_destroy_hooks(dom, child);
        }
        if vnode.data.is_some() {
            for module in &self.modules {
                module.destroy(dom, vnode);
            }
            if let Some(destroy) = vnode.hook().and_then(|h| h.destroy.clone()) {
                destroy(vnode);
            }
        }
    }

    // ---------------------------------------------------------------------
    // Hydration
    // ---------------------------------------------------------------------

    /// Adopt server-rendered markup by walking the host tree in lockstep
    /// with the vnode tree. Returns false on any shape mismatch; the
    /// caller falls back to a full render.
    fn hydrate(
        &self,
        dom: &SharedDom,
        elm: NodeId,
        vnode: &mut VNode,
        queue: &mut InsertQueue,
    ) -> bool {
        vnode.elm = Some(elm);

        if let Some(init) = vnode.hook().and_then(|h| h.init.clone()) {
            // Component placeholder: the init hook sees the bound element
            // and mounts the child against it.
            init(vnode);
            if vnode.component_instance.is_none() {
                return false;
            }
            self.invoke_create_hooks(dom, vnode, queue);
            return true;
        }

        match (vnode.tag.clone(), vnode.is_comment) {
            (Some(tag), _) => {
                if !dom.borrow().is_element(elm) {
                    return false;
                }
                match dom.borrow().tag_name(elm) {
                    Some(host_tag) if host_tag.eq_ignore_ascii_case(&tag) => {}
                    _ => return false,
                }
                if !vnode.children.is_empty() {
                    let mut host_child = dom.borrow().first_child(elm);
                    for child in &mut vnode.children {
                        let Some(c) = host_child else {
                            return false;
                        };
                        if !self.hydrate(dom, c, child, queue) {
                            return false;
                        }
                        host_child = dom.borrow().next_sibling(c);
                    }
                    if host_child.is_some() {
                        return false;
                    }
                } else if let Some(text) = vnode.text.clone() {
                    let host_text = dom.borrow().text_content(elm);
                    if host_text.as_deref() != Some(&*text) {
                        dom.borrow_mut().set_text_content(elm, &text);
                    }
                }
                if vnode.data.is_some() {
                    self.invoke_create_hooks(dom, vnode, queue);
                }
                true
            }
            (None, true) => dom.borrow().is_comment(elm),
            (None, false) => {
                if !dom.borrow().is_text(elm) {
                    return false;
                }
                let text = vnode.text.clone().unwrap_or_else(|| Rc::from(""));
                let host_text = dom.borrow().text_content(elm);
                if host_text.as_deref() != Some(&*text) {
                    dom.borrow_mut().set_text_content(elm, &text);
                }
                true
            }
        }
    }
}

fn insert(dom: &SharedDom, parent: Option<NodeId>, elm: NodeId, ref_elm: Option<NodeId>) {
    let Some(parent) = parent else {
        return;
    };
    match ref_elm {
        Some(ref_elm) if dom.borrow().parent_node(ref_elm) == Some(parent) => {
            dom.borrow_mut().insert_before(parent, elm, Some(ref_elm));
        }
        _ => dom.borrow_mut().append_child(parent, elm),
    }
}

fn invoke_insert_hooks(queue: InsertQueue) {
    for entry in queue {
        (entry.hook)(&entry.vnode);
    }
}

/// Clear the element bindings a failed hydration pass may have left on
/// the tree, so the fallback render starts clean.
fn reset_tree(mut vnode: VNode) -> VNode {
    vnode.elm = None;
    vnode.children = vnode.children.into_iter().map(reset_tree).collect();
    vnode
}
