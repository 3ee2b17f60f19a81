//! Vireo Runtime
//!
//! Component runtime for the Vireo view library:
//!
//! - **Component instances**: Reactive state, computed properties, user
//!   watchers and the render watcher, wired through a strict
//!   initialization order
//! - **Options**: Declarative component descriptions with mixin merging
//! - **Render scope**: The `h`-style vnode constructor render closures
//!   receive
//! - **Apps**: Binding a root component to a host tree
//!
//! # Example
//!
//! ```rust
//! use std::rc::Rc;
//! use vireo_dom::{shared_dom, MemoryDom, VNodeData};
//! use vireo_runtime::{App, ComponentOptions, Record, run_ticks};
//!
//! let mem = Rc::new(std::cell::RefCell::new(MemoryDom::new()));
//! let (body, mount) = {
//!     let mut m = mem.borrow_mut();
//!     let body = m.create_root();
//!     let mount = m.create_element("div");
//!     m.append_child(body, mount);
//!     (body, mount)
//! };
//!
//! let options = ComponentOptions::new()
//!     .data(|| Record::new().with("count", 0))
//!     .render(|scope| {
//!         Ok(scope.h("p", VNodeData::new(), scope.text(scope.get("count"))))
//!     });
//!
//! let app = App::new(mem.clone());
//! let vm = app.mount(options, mount);
//!
//! vm.set_value("count", 1); // batched
//! run_ticks();              // flushed
//! assert_eq!(mem.borrow().to_html(body), "<root><p>1</p></root>");
//! ```

pub mod component;
pub mod events;
pub mod lifecycle;
pub mod options;
pub mod render;

use std::rc::Rc;

use vireo_dom::{PatchModule, Patcher, SharedDom};

pub use component::{Component, RefTarget, WatchHandle, WatchOptions, WeakComponent};
pub use events::{BusHandler, EventBus};
pub use lifecycle::LifecycleHook;
pub use options::{
    merge_options, resolve_options, ComponentOptions, InjectSpec, PropSpec, WatchSpec,
};
pub use render::RenderScope;

// The reactive surface, re-exported so integrators depend on one crate.
pub use vireo_core::{
    configure, del, next_tick, observe, run_ticks, set, List, Record, RuntimeConfig, RuntimeError,
    Value,
};

/// Make a plain value tree reactive and hand it back: reads through it
/// subscribe watchers, writes notify them.
pub fn observable(value: Value) -> Value {
    observe(&value);
    value
}
pub use vireo_dom::{
    shared_dom, Children, Directive, Key, MemoryDom, NodeId, NodeOps, VNode, VNodeData,
};

/// Binds components to one host tree: a shared host handle plus the
/// patcher every instance in the app renders through.
pub struct App {
    dom: SharedDom,
    patcher: Rc<Patcher>,
}

impl App {
    pub fn new(dom: SharedDom) -> Self {
        Self {
            dom,
            patcher: Rc::new(Patcher::with_platform_modules()),
        }
    }

    /// An app with a custom module list (replacing the platform set).
    pub fn with_modules(dom: SharedDom, modules: Vec<Box<dyn PatchModule>>) -> Self {
        Self {
            dom,
            patcher: Rc::new(Patcher::new(modules)),
        }
    }

    pub fn dom(&self) -> &SharedDom {
        &self.dom
    }

    /// Create a root instance and mount it over `el`.
    pub fn mount(&self, options: ComponentOptions, el: NodeId) -> Component {
        let vm = Component::new_root(Rc::new(options), self.dom.clone(), self.patcher.clone());
        tracing::debug!(component = vm.id(), "mounting root component");
        vm.mount(Some(el), false);
        vm
    }

    /// Create a root instance and hydrate it onto server-rendered
    /// markup rooted at `el`.
    pub fn hydrate(&self, options: ComponentOptions, el: NodeId) -> Component {
        let vm = Component::new_root(Rc::new(options), self.dom.clone(), self.patcher.clone());
        tracing::debug!(component = vm.id(), "hydrating root component");
        vm.mount(Some(el), true);
        vm
    }
}
