//! Patch modules
//!
//! Each module owns one aspect of a node (attributes, class, style, DOM
//! properties, listeners, directives) and patches it through the host
//! interface at the hook points the patcher dispatches. Hooks of a given
//! kind fire in module order; the directive module runs last.

mod attrs;
mod class;
mod directives;
mod dom_props;
mod events;
mod style;

use std::rc::Rc;

use crate::node_ops::SharedDom;
use crate::vnode::VNode;

pub use attrs::AttrsModule;
pub use class::ClassModule;
pub use directives::DirectivesModule;
pub use dom_props::DomPropsModule;
pub use events::EventsModule;
pub use style::StyleModule;

/// Per-aspect patching hooks. All default to no-ops; a module implements
/// the subset it needs.
pub trait PatchModule {
    /// A node was created for `vnode`; apply the aspect from scratch.
    fn create(&self, dom: &SharedDom, vnode: &VNode) {
        let _ = (dom, vnode);
    }

    /// A kept-alive subtree is re-entering the tree.
    fn activate(&self, dom: &SharedDom, vnode: &VNode) {
        let _ = (dom, vnode);
    }

    /// `vnode` was matched against `old` and patched in place; reconcile
    /// the aspect.
    fn update(&self, dom: &SharedDom, old: &VNode, vnode: &VNode) {
        let _ = (dom, old, vnode);
    }

    /// The node is leaving the tree. `done` must be called once the
    /// module no longer needs the node in place; the default releases it
    /// immediately. Deferred-removal effects hold on to `done`.
    fn remove(&self, dom: &SharedDom, vnode: &VNode, done: &Rc<dyn Fn()>) {
        let _ = (dom, vnode);
        done();
    }

    /// The vnode's subtree is being torn down for good. The node may
    /// already be detached from its parent.
    fn destroy(&self, dom: &SharedDom, vnode: &VNode) {
        let _ = (dom, vnode);
    }
}

/// The platform module list, in dispatch order.
pub fn platform_modules() -> Vec<Box<dyn PatchModule>> {
    vec![
        Box::new(AttrsModule),
        Box::new(ClassModule),
        Box::new(StyleModule),
        Box::new(DomPropsModule),
        Box::new(EventsModule),
        Box::new(DirectivesModule),
    ]
}
