//! Integration tests for the patcher
//!
//! These tests verify that:
//! - Keyed reorders move nodes instead of recreating them
//! - Create/destroy hooks pair up over a mount/teardown round trip
//! - Module updates touch only the aspects that changed
//! - Hydration adopts matching markup and falls back on mismatch

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use vireo_dom::{
    shared_dom, Directive, DomOp, MemoryDom, NodeOps, PatchTarget, Patcher, SharedDom, VNode,
    VNodeData, VNodeHooks,
};

fn memory_pair() -> (Rc<RefCell<MemoryDom>>, SharedDom) {
    let mem = Rc::new(RefCell::new(MemoryDom::new()));
    let dom: SharedDom = mem.clone();
    (mem, dom)
}

fn keyed_item(key: &str) -> VNode {
    VNode::element("li")
        .with_data(VNodeData::new().key(key))
        .with_children(vec![VNode::text_node(key)])
}

fn list_of(keys: &[&str]) -> VNode {
    VNode::element("ul").with_children(keys.iter().map(|k| keyed_item(k)).collect())
}

#[test]
fn test_initial_mount_replaces_placeholder() {
    let (mem, dom) = memory_pair();
    let (body, placeholder) = {
        let mut m = mem.borrow_mut();
        let body = m.create_root();
        let placeholder = m.create_element("div");
        m.append_child(body, placeholder);
        (body, placeholder)
    };

    let patcher = Patcher::with_platform_modules();
    let mut tree = VNode::element("p").with_children(vec![VNode::text_node("hi")]);
    let root = patcher
        .patch(&dom, PatchTarget::HostNode(placeholder), &mut tree, false)
        .unwrap();

    let m = mem.borrow();
    assert_eq!(m.to_html(body), "<root><p>hi</p></root>");
    assert!(!m.contains(placeholder));
    assert_eq!(tree.elm, Some(root));
}

#[test]
fn test_keyed_reorder_is_one_move() {
    let (mem, dom) = memory_pair();
    let patcher = Patcher::with_platform_modules();

    let mut old_tree = list_of(&["a", "b", "c", "d"]);
    patcher.patch(&dom, PatchTarget::Empty, &mut old_tree, false);
    mem.borrow_mut().clear_ops();

    // [a b c d] -> [d a b c]: old end drifted to the front.
    let mut new_tree = list_of(&["d", "a", "b", "c"]);
    let root = patcher
        .patch(&dom, PatchTarget::Tree(old_tree), &mut new_tree, false)
        .unwrap();

    let m = mem.borrow();
    assert_eq!(
        m.to_html(root),
        "<ul><li>d</li><li>a</li><li>b</li><li>c</li></ul>"
    );
    // Exactly one structural op: the single insert_before that moved d.
    assert_eq!(m.count_ops(|op| op.is_structural()), 1);
    assert_eq!(m.count_ops(|op| matches!(op, DomOp::InsertBefore)), 1);
}

#[test]
fn test_keyed_reverse_moves_without_recreation() {
    let (mem, dom) = memory_pair();
    let patcher = Patcher::with_platform_modules();

    let mut old_tree = list_of(&["a", "b", "c", "d", "e"]);
    patcher.patch(&dom, PatchTarget::Empty, &mut old_tree, false);
    mem.borrow_mut().clear_ops();

    let mut new_tree = list_of(&["e", "d", "c", "b", "a"]);
    let root = patcher
        .patch(&dom, PatchTarget::Tree(old_tree), &mut new_tree, false)
        .unwrap();

    let m = mem.borrow();
    assert_eq!(
        m.to_html(root),
        "<ul><li>e</li><li>d</li><li>c</li><li>b</li><li>a</li></ul>"
    );
    // Reversal is all moves: nothing created, nothing removed.
    assert_eq!(m.count_ops(|op| matches!(op, DomOp::CreateElement(_))), 0);
    assert_eq!(m.count_ops(|op| matches!(op, DomOp::RemoveChild)), 0);
}

#[test]
fn test_keyed_insert_and_remove() {
    let (mem, dom) = memory_pair();
    let patcher = Patcher::with_platform_modules();

    let mut old_tree = list_of(&["a", "b", "c"]);
    patcher.patch(&dom, PatchTarget::Empty, &mut old_tree, false);
    mem.borrow_mut().clear_ops();

    let mut new_tree = list_of(&["a", "x", "c"]);
    let root = patcher
        .patch(&dom, PatchTarget::Tree(old_tree), &mut new_tree, false)
        .unwrap();

    let m = mem.borrow();
    assert_eq!(m.to_html(root), "<ul><li>a</li><li>x</li><li>c</li></ul>");
    // b removed, x created; a and c untouched.
    assert_eq!(m.count_ops(|op| matches!(op, DomOp::CreateElement(_))), 1);
    assert_eq!(m.count_ops(|op| matches!(op, DomOp::RemoveChild)), 1);
}

#[test]
fn test_unkeyed_children_patch_in_place() {
    let (mem, dom) = memory_pair();
    let patcher = Patcher::with_platform_modules();

    let mut old_tree = VNode::element("div").with_children(vec![
        VNode::element("span").with_children(vec![VNode::text_node("one")]),
        VNode::element("span").with_children(vec![VNode::text_node("two")]),
    ]);
    patcher.patch(&dom, PatchTarget::Empty, &mut old_tree, false);
    mem.borrow_mut().clear_ops();

    let mut new_tree = VNode::element("div").with_children(vec![
        VNode::element("span").with_children(vec![VNode::text_node("uno")]),
        VNode::element("span").with_children(vec![VNode::text_node("two")]),
    ]);
    let root = patcher
        .patch(&dom, PatchTarget::Tree(old_tree), &mut new_tree, false)
        .unwrap();

    let m = mem.borrow();
    assert_eq!(m.to_html(root), "<div><span>uno</span><span>two</span></div>");
    assert_eq!(m.count_ops(|op| op.is_structural()), 0);
    assert_eq!(
        m.count_ops(|op| matches!(op, DomOp::SetTextContent(_))),
        1
    );
}

#[test]
fn test_text_fast_path() {
    let (mem, dom) = memory_pair();
    let patcher = Patcher::with_platform_modules();

    let mut old_tree = VNode::element("p").with_children(vec![VNode::text_node("0")]);
    patcher.patch(&dom, PatchTarget::Empty, &mut old_tree, false);
    mem.borrow_mut().clear_ops();

    let mut new_tree = VNode::element("p").with_children(vec![VNode::text_node("1")]);
    let root = patcher
        .patch(&dom, PatchTarget::Tree(old_tree), &mut new_tree, false)
        .unwrap();

    let m = mem.borrow();
    assert_eq!(m.to_html(root), "<p>1</p>");
    // The text node was updated, not replaced.
    assert_eq!(m.count_ops(|op| op.is_structural()), 0);
}

#[test]
fn test_tag_change_replaces_wholesale() {
    let (mem, dom) = memory_pair();
    let patcher = Patcher::with_platform_modules();

    let (body, placeholder) = {
        let mut m = mem.borrow_mut();
        let body = m.create_root();
        let placeholder = m.create_element("div");
        m.append_child(body, placeholder);
        (body, placeholder)
    };
    let mut old_tree = VNode::element("span").with_children(vec![VNode::text_node("x")]);
    patcher.patch(&dom, PatchTarget::HostNode(placeholder), &mut old_tree, false);

    let mut new_tree = VNode::element("em").with_children(vec![VNode::text_node("x")]);
    patcher.patch(&dom, PatchTarget::Tree(old_tree), &mut new_tree, false);

    assert_eq!(mem.borrow().to_html(body), "<root><em>x</em></root>");
}

#[test]
fn test_create_destroy_hooks_pair_on_round_trip() {
    let (_mem, dom) = memory_pair();
    let patcher = Patcher::with_platform_modules();

    let inserted = Rc::new(Cell::new(0u32));
    let destroyed = Rc::new(Cell::new(0u32));

    let hooked = |tag: &str| {
        let inserted = inserted.clone();
        let destroyed = destroyed.clone();
        let mut hooks = VNodeHooks::default();
        hooks.insert = Some(Rc::new(move |_| inserted.set(inserted.get() + 1)));
        hooks.destroy = Some(Rc::new(move |_| destroyed.set(destroyed.get() + 1)));
        let mut data = VNodeData::new();
        data.hook = Some(hooks);
        VNode::element(tag).with_data(data)
    };

    let mut tree = hooked("div").with_children(vec![hooked("span"), hooked("span")]);
    patcher.patch(&dom, PatchTarget::Empty, &mut tree, false);
    assert_eq!(inserted.get(), 3);
    assert_eq!(destroyed.get(), 0);

    patcher.teardown(&dom, &tree);
    assert_eq!(destroyed.get(), 3);
}

#[test]
fn test_attr_and_class_updates_are_minimal() {
    let (mem, dom) = memory_pair();
    let patcher = Patcher::with_platform_modules();

    let make = |count: i64, active: bool| {
        VNode::element("div").with_data(
            VNodeData::new()
                .attr("data-count", count)
                .attr("title", "fixed")
                .class_static("box")
                .class(if active { "active" } else { "" }),
        )
    };

    let mut old_tree = make(1, false);
    let root = patcher
        .patch(&dom, PatchTarget::Empty, &mut old_tree, false)
        .unwrap();
    {
        let m = mem.borrow();
        assert_eq!(m.attribute(root, "data-count").as_deref(), Some("1"));
        assert_eq!(m.class_of(root).as_deref(), Some("box"));
    }
    mem.borrow_mut().clear_ops();

    let mut new_tree = make(2, true);
    patcher.patch(&dom, PatchTarget::Tree(old_tree), &mut new_tree, false);

    let m = mem.borrow();
    assert_eq!(m.attribute(root, "data-count").as_deref(), Some("2"));
    assert_eq!(m.class_of(root).as_deref(), Some("box active"));
    // `title` did not change and was not rewritten.
    assert_eq!(
        m.count_ops(|op| matches!(op, DomOp::SetAttribute(name) if name == "title")),
        0
    );
    assert_eq!(
        m.count_ops(|op| matches!(op, DomOp::SetAttribute(name) if name == "data-count")),
        1
    );
    assert_eq!(m.count_ops(|op| matches!(op, DomOp::SetClass(_))), 1);
}

#[test]
fn test_removed_attr_is_cleared() {
    let (mem, dom) = memory_pair();
    let patcher = Patcher::with_platform_modules();

    let mut old_tree =
        VNode::element("div").with_data(VNodeData::new().attr("id", "x").attr("hidden", true));
    let root = patcher
        .patch(&dom, PatchTarget::Empty, &mut old_tree, false)
        .unwrap();
    assert_eq!(mem.borrow().attribute(root, "hidden").as_deref(), Some(""));

    let mut new_tree = VNode::element("div").with_data(VNodeData::new().attr("id", "x"));
    patcher.patch(&dom, PatchTarget::Tree(old_tree), &mut new_tree, false);
    assert!(mem.borrow().attribute(root, "hidden").is_none());
}

#[test]
fn test_directive_bind_update_unbind() {
    let (_mem, dom) = memory_pair();
    let patcher = Patcher::with_platform_modules();

    let log = Rc::new(RefCell::new(Vec::new()));
    let directive = |log: &Rc<RefCell<Vec<&'static str>>>| {
        let bind_log = log.clone();
        let update_log = log.clone();
        let unbind_log = log.clone();
        Directive::new("focus", true)
            .on_bind(move |_, _, _| bind_log.borrow_mut().push("bind"))
            .on_update(move |_, _, _| update_log.borrow_mut().push("update"))
            .on_unbind(move |_, _, _| unbind_log.borrow_mut().push("unbind"))
    };

    let mut old_tree =
        VNode::element("input").with_data(VNodeData::new().directive(directive(&log)));
    patcher.patch(&dom, PatchTarget::Empty, &mut old_tree, false);
    assert_eq!(*log.borrow(), vec!["bind"]);

    let mut new_tree =
        VNode::element("input").with_data(VNodeData::new().directive(directive(&log)));
    patcher.patch(&dom, PatchTarget::Tree(old_tree), &mut new_tree, false);
    assert_eq!(*log.borrow(), vec!["bind", "update"]);

    patcher.teardown(&dom, &new_tree);
    assert_eq!(*log.borrow(), vec!["bind", "update", "unbind"]);
}

#[test]
fn test_hydration_adopts_matching_markup() {
    let (mem, dom) = memory_pair();
    let patcher = Patcher::with_platform_modules();

    // Server-rendered markup: <div><span>hi</span></div>
    let server_root = {
        let mut m = mem.borrow_mut();
        let div = m.create_element("div");
        let span = m.create_element("span");
        let text = m.create_text("hi");
        m.append_child(span, text);
        m.append_child(div, span);
        m.clear_ops();
        div
    };

    let mut tree = VNode::element("div").with_children(vec![
        VNode::element("span").with_children(vec![VNode::text_node("hi")])
    ]);
    let root = patcher
        .patch(&dom, PatchTarget::HostNode(server_root), &mut tree, true)
        .unwrap();

    let m = mem.borrow();
    assert_eq!(root, server_root);
    assert_eq!(m.count_ops(|op| op.is_structural()), 0);
    assert_eq!(m.to_html(root), "<div><span>hi</span></div>");
}

#[test]
fn test_hydration_mismatch_falls_back_to_render() {
    let (mem, dom) = memory_pair();
    let patcher = Patcher::with_platform_modules();

    let (body, server_root) = {
        let mut m = mem.borrow_mut();
        let body = m.create_root();
        let div = m.create_element("div");
        let em = m.create_element("em");
        m.append_child(div, em);
        m.append_child(body, div);
        (body, div)
    };

    // The client renders a <span> where the server sent an <em>.
    let mut tree = VNode::element("div").with_children(vec![
        VNode::element("span").with_children(vec![VNode::text_node("x")])
    ]);
    let root = patcher
        .patch(&dom, PatchTarget::HostNode(server_root), &mut tree, true)
        .unwrap();

    let m = mem.borrow();
    assert_ne!(root, server_root);
    assert_eq!(m.to_html(body), "<root><div><span>x</span></div></root>");
}

#[test]
fn test_append_prepend_are_linear() {
    let (mem, dom) = memory_pair();
    let patcher = Patcher::with_platform_modules();

    let mut old_tree = list_of(&["a", "b"]);
    patcher.patch(&dom, PatchTarget::Empty, &mut old_tree, false);
    mem.borrow_mut().clear_ops();

    // Prepend + append around an untouched middle.
    let mut new_tree = list_of(&["new-head", "a", "b", "new-tail"]);
    let root = patcher
        .patch(&dom, PatchTarget::Tree(old_tree), &mut new_tree, false)
        .unwrap();

    let m = mem.borrow();
    assert_eq!(
        m.to_html(root),
        "<ul><li>new-head</li><li>a</li><li>b</li><li>new-tail</li></ul>"
    );
    // Two creations (li + their text nodes) and their insertions; the
    // kept nodes contribute no ops at all.
    assert_eq!(m.count_ops(|op| matches!(op, DomOp::CreateElement(_))), 2);
}
