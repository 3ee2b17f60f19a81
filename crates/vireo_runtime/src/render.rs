//! Render scope
//!
//! Render functions are typed closures over a `RenderScope` borrowed
//! from the instance being rendered: `h` creates element or component
//! vnodes, `get` resolves reactive state (which is what subscribes the
//! render watcher), and `slot` splices in content the parent passed
//! down.

use std::any::Any;
use std::rc::Rc;

use vireo_core::Value;

use crate::component::Component;
use crate::events::BusHandler;
use crate::options::ComponentOptions;
use vireo_dom::{full_normalize, simple_normalize, Children, VNode, VNodeData, VNodeHooks};

pub struct RenderScope<'a> {
    vm: &'a Component,
}

impl<'a> RenderScope<'a> {
    pub(crate) fn new(vm: &'a Component) -> Self {
        Self { vm }
    }

    pub fn vm(&self) -> &Component {
        self.vm
    }

    /// Resolve reactive state; reads subscribe the active watcher.
    pub fn get(&self, name: &str) -> Value {
        self.vm.get(name)
    }

    /// Invoke a declared method.
    pub fn call(&self, name: &str, args: &[Value]) -> Value {
        self.vm.call(name, args)
    }

    /// Create an element or component vnode. A tag registered in the
    /// component registry yields a component placeholder; anything else
    /// is a host element. Children are deep-normalized with text
    /// coalescing, the contract for hand-written render functions.
    pub fn h(&self, tag: &str, data: VNodeData, children: impl Into<Children>) -> VNode {
        let children = full_normalize(children.into());
        match self.vm.options().find_component(tag) {
            Some(child_options) => component_vnode(self.vm, child_options, data, children),
            None => VNode::element(tag).with_data(data).with_children(children),
        }
    }

    /// `h` for compiler-emitted call sites: the compiler guarantees flat
    /// vnode children, so normalization is a one-level flatten.
    pub fn h_compiled(&self, tag: &str, data: VNodeData, children: impl Into<Children>) -> VNode {
        let children = simple_normalize(children.into());
        match self.vm.options().find_component(tag) {
            Some(child_options) => component_vnode(self.vm, child_options, data, children),
            None => VNode::element(tag).with_data(data).with_children(children),
        }
    }

    /// Create a component vnode from explicit options.
    pub fn component(
        &self,
        options: &Rc<ComponentOptions>,
        data: VNodeData,
        children: impl Into<Children>,
    ) -> VNode {
        component_vnode(
            self.vm,
            options.clone(),
            data,
            full_normalize(children.into()),
        )
    }

    /// A text vnode rendering the display form of a value.
    pub fn text(&self, value: impl Into<Value>) -> VNode {
        VNode::text_node(value.into().to_display_string())
    }

    pub fn comment(&self, text: &str) -> VNode {
        VNode::comment(text)
    }

    /// The default slot: children the parent placed inside this
    /// component's placeholder.
    pub fn slot(&self) -> Vec<VNode> {
        self.vm
            .slot_children()
            .into_iter()
            .filter(|c| c.data.as_ref().and_then(|d| d.slot.as_ref()).is_none())
            .collect()
    }

    /// A named slot: slot children tagged with this name.
    pub fn slot_named(&self, name: &str) -> Vec<VNode> {
        self.vm
            .slot_children()
            .into_iter()
            .filter(|c| {
                c.data
                    .as_ref()
                    .and_then(|d| d.slot.as_deref())
                    .map(|s| s == name)
                    .unwrap_or(false)
            })
            .collect()
    }
}

/// Build a component placeholder vnode: declared props are pulled out of
/// the data, listeners become child-bus subscriptions, native listeners
/// stay on the root element, and the lifecycle hooks wire instance
/// creation into the patcher.
pub(crate) fn component_vnode(
    parent: &Component,
    child_options: Rc<ComponentOptions>,
    mut data: VNodeData,
    slot_children: Vec<VNode>,
) -> VNode {
    // Placeholder identity: same options handle + key <=> patch in place.
    let tag: Rc<str> = Rc::from(format!(
        "component-{:p}-{}",
        Rc::as_ptr(&child_options),
        child_options.name.as_deref().unwrap_or("anonymous")
    ));

    let mut props_data: Vec<(Rc<str>, Value)> = Vec::new();
    for spec in &child_options.props {
        if let Some(value) = data.props.remove(&spec.name) {
            props_data.push((spec.name.clone(), value));
        } else if let Some(value) = data.attrs.remove(&spec.name) {
            props_data.push((spec.name.clone(), value));
        }
    }

    // Placeholder `on` listeners subscribe to the child's events; the
    // `native_on` set takes their place on the real root element.
    let listeners: Vec<(Rc<str>, BusHandler)> = data.on.drain().collect();
    data.on = std::mem::take(&mut data.native_on);

    let parent_weak = parent.downgrade();

    let init: Rc<dyn Fn(&mut VNode)> = {
        let child_options = child_options.clone();
        let props_data = props_data.clone();
        let listeners = listeners.clone();
        let slot_children = slot_children.clone();
        Rc::new(move |vnode: &mut VNode| {
            let Some(parent) = parent_weak.upgrade() else {
                return;
            };
            let child = Component::new_child(
                child_options.clone(),
                &parent,
                props_data.clone(),
                listeners.clone(),
                slot_children.clone(),
            );
            // During hydration the placeholder arrives pre-bound to the
            // server-rendered element; mount against it.
            let target = vnode.elm;
            child.mount(target, target.is_some());
            vnode.elm = child.el();
            vnode.component_instance = Some(Rc::new(child) as Rc<dyn Any>);
        })
    };

    let prepatch: Rc<dyn Fn(&VNode, &mut VNode)> = {
        let props_data = props_data.clone();
        let listeners = listeners.clone();
        let slot_children = slot_children.clone();
        Rc::new(move |old: &VNode, vnode: &mut VNode| {
            let Some(instance) = old.component_instance.clone() else {
                return;
            };
            vnode.component_instance = Some(instance.clone());
            if let Some(child) = instance.downcast_ref::<Component>() {
                child.update_from_parent(&props_data, listeners.clone(), slot_children.clone());
                vnode.elm = child.el();
            }
        })
    };

    let insert: Rc<dyn Fn(&VNode)> = Rc::new(move |vnode: &VNode| {
        let Some(child) = placeholder_instance(vnode) else {
            return;
        };
        if !child.is_mounted() {
            child.set_mounted();
        } else if child.is_inactive() {
            let child = child.clone();
            vireo_core::queue_activated(move || child.activate());
        }
    });

    let destroy: Rc<dyn Fn(&VNode)> = Rc::new(move |vnode: &VNode| {
        let Some(child) = placeholder_instance(vnode) else {
            return;
        };
        if !child.is_destroyed() {
            child.destroy();
        }
    });

    data.hook = Some(VNodeHooks {
        init: Some(init),
        prepatch: Some(prepatch),
        update: None,
        insert: Some(insert),
        destroy: Some(destroy),
    });

    VNode::element(tag).with_data(data)
}

fn placeholder_instance(vnode: &VNode) -> Option<&Component> {
    vnode
        .component_instance
        .as_ref()
        .and_then(|i| i.downcast_ref::<Component>())
}
