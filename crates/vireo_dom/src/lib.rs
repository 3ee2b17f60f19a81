//! Vireo Virtual DOM
//!
//! Virtual-node model and patcher for the Vireo view runtime:
//!
//! - **VNodes**: Immutable node descriptors produced by render functions
//! - **Node-ops**: The abstract host interface the patcher mutates
//!   through, with an in-memory implementation for tests and headless
//!   runs
//! - **Modules**: Pluggable per-aspect patchers (attributes, class,
//!   style, DOM properties, listeners, directives)
//! - **Patcher**: Tree diffing with four-pointer keyed children
//!   reconciliation and hydration of pre-rendered markup
//!
//! # Example
//!
//! ```rust
//! use vireo_dom::{shared_dom, MemoryDom, PatchTarget, Patcher, VNode, VNodeData};
//!
//! let dom = shared_dom(MemoryDom::new());
//! let patcher = Patcher::with_platform_modules();
//!
//! let mut tree = VNode::element("div")
//!     .with_data(VNodeData::new().attr("id", "app"))
//!     .with_children(vec![VNode::text_node("hello")]);
//!
//! let root = patcher.patch(&dom, PatchTarget::Empty, &mut tree, false).unwrap();
//! let html = dom.borrow_mut().text_content(root).unwrap();
//! assert_eq!(&*html, "hello");
//! ```

pub mod memory;
pub mod modules;
pub mod node_ops;
pub mod patch;
pub mod vnode;

pub use memory::{DomOp, MemoryDom};
pub use modules::{platform_modules, PatchModule};
pub use node_ops::{shared_dom, Listener, NodeId, NodeOps, SharedDom};
pub use patch::{PatchTarget, Patcher};
pub use vnode::{
    full_normalize, same_vnode, simple_normalize, Children, Directive, DirectiveHook, Key, VNode,
    VNodeData, VNodeHooks,
};
