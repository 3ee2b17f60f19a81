//! End-to-end tests for the reactivity -> render -> patch loop
//!
//! Each test drives a mounted component through mutations and asserts
//! both the final host tree and the way it was reached (the in-memory
//! host records every node operation).

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use vireo_core::reset_scheduler;
use vireo_dom::{DomOp, MemoryDom, NodeId, NodeOps};
use vireo_runtime::{
    configure, run_ticks, set, App, Component, ComponentOptions, Record, Value, VNodeData,
    WatchOptions,
};

struct Host {
    mem: Rc<RefCell<MemoryDom>>,
    app: App,
    body: NodeId,
    mount: NodeId,
}

fn host() -> Host {
    reset_scheduler();
    vireo_core::reset_config();
    let mem = Rc::new(RefCell::new(MemoryDom::new()));
    let (body, mount) = {
        let mut m = mem.borrow_mut();
        let body = m.create_root();
        let mount = m.create_element("div");
        m.append_child(body, mount);
        (body, mount)
    };
    let app = App::new(mem.clone());
    Host {
        mem,
        app,
        body,
        mount,
    }
}

impl Host {
    fn html(&self) -> String {
        self.mem.borrow().to_html(self.body)
    }

    fn clear_ops(&self) {
        self.mem.borrow_mut().clear_ops();
    }

    fn structural_ops(&self) -> usize {
        self.mem.borrow().count_ops(|op| op.is_structural())
    }
}

#[test]
fn test_counter_updates_one_text_node() {
    let h = host();
    let options = ComponentOptions::new()
        .data(|| Record::new().with("n", 0))
        .render(|s| Ok(s.h("div", VNodeData::new(), s.text(s.get("n")))));
    let vm = h.app.mount(options, h.mount);
    assert_eq!(h.html(), "<root><div>0</div></root>");

    h.clear_ops();
    vm.set_value("n", 1);
    // Batched: nothing happens until the flush.
    assert_eq!(h.html(), "<root><div>0</div></root>");

    run_ticks();
    assert_eq!(h.html(), "<root><div>1</div></root>");
    // One text write; no element was created, moved or removed.
    assert_eq!(h.structural_ops(), 0);
    assert_eq!(
        h.mem
            .borrow()
            .count_ops(|op| matches!(op, DomOp::SetTextContent(_))),
        1
    );
}

#[test]
fn test_computed_cascade_evaluates_once() {
    let h = host();
    let evals = Rc::new(Cell::new(0u32));
    let renders = Rc::new(Cell::new(0u32));
    let evals_in = evals.clone();
    let renders_in = renders.clone();

    let options = ComponentOptions::new()
        .data(|| Record::new().with("a", 1).with("b", 2))
        .computed("sum", move |vm: &Component| {
            evals_in.set(evals_in.get() + 1);
            Ok(Value::Int(
                vm.get("a").as_int().unwrap_or(0) + vm.get("b").as_int().unwrap_or(0),
            ))
        })
        .render(move |s| {
            renders_in.set(renders_in.get() + 1);
            Ok(s.h("span", VNodeData::new(), s.text(s.get("sum"))))
        });
    let vm = h.app.mount(options, h.mount);
    assert_eq!(h.html(), "<root><span>3</span></root>");
    assert_eq!(evals.get(), 1);
    assert_eq!(renders.get(), 1);

    vm.set_value("a", 10);
    run_ticks();
    assert_eq!(h.html(), "<root><span>12</span></root>");
    // Exactly one re-evaluation, one re-render.
    assert_eq!(evals.get(), 2);
    assert_eq!(renders.get(), 2);
}

#[test]
fn test_computed_caches_between_unrelated_renders() {
    let h = host();
    let evals = Rc::new(Cell::new(0u32));
    let evals_in = evals.clone();

    let options = ComponentOptions::new()
        .data(|| Record::new().with("a", 1).with("other", 0))
        .computed("double", move |vm: &Component| {
            evals_in.set(evals_in.get() + 1);
            Ok(Value::Int(vm.get("a").as_int().unwrap_or(0) * 2))
        })
        .render(|s| {
            let text = format!(
                "{}:{}",
                s.get("double").to_display_string(),
                s.get("other").to_display_string()
            );
            Ok(s.h("span", VNodeData::new(), text.as_str()))
        });
    let vm = h.app.mount(options, h.mount);
    assert_eq!(evals.get(), 1);

    // A re-render for unrelated state reuses the cached computed value.
    vm.set_value("other", 1);
    run_ticks();
    assert_eq!(h.html(), "<root><span>2:1</span></root>");
    assert_eq!(evals.get(), 1);
}

#[test]
fn test_conditional_dependency_swap_in_render() {
    let h = host();
    let renders = Rc::new(Cell::new(0u32));
    let renders_in = renders.clone();

    let options = ComponentOptions::new()
        .data(|| {
            Record::new()
                .with("flag", true)
                .with("x", 1)
                .with("y", 2)
        })
        .render(move |s| {
            renders_in.set(renders_in.get() + 1);
            let shown = if s.get("flag").is_truthy() {
                s.get("x")
            } else {
                s.get("y")
            };
            Ok(s.h("div", VNodeData::new(), s.text(shown)))
        });
    let vm = h.app.mount(options, h.mount);
    assert_eq!(renders.get(), 1);

    // y is not a dependency while flag is true.
    vm.set_value("y", 20);
    run_ticks();
    assert_eq!(renders.get(), 1);

    vm.set_value("flag", false);
    run_ticks();
    assert_eq!(renders.get(), 2);
    assert_eq!(h.html(), "<root><div>20</div></root>");

    // After the swap, x is no longer a dependency but y is.
    vm.set_value("x", 10);
    run_ticks();
    assert_eq!(renders.get(), 2);

    vm.set_value("y", 30);
    run_ticks();
    assert_eq!(renders.get(), 3);
    assert_eq!(h.html(), "<root><div>30</div></root>");
}

#[test]
fn test_list_mutators_rerender_index_writes_do_not() {
    let h = host();
    let renders = Rc::new(Cell::new(0u32));
    let renders_in = renders.clone();

    let options = ComponentOptions::new()
        .data(|| {
            Record::new().with(
                "items",
                Value::List(vec![Value::Int(1), Value::Int(2)].into_iter().collect()),
            )
        })
        .render(move |s| {
            renders_in.set(renders_in.get() + 1);
            let items = s.get("items");
            let children: Vec<_> = items
                .as_list()
                .map(|l| l.to_vec())
                .unwrap_or_default()
                .into_iter()
                .map(|item| s.h("li", VNodeData::new(), s.text(item)))
                .collect();
            Ok(s.h("ul", VNodeData::new(), children))
        });
    let vm = h.app.mount(options, h.mount);
    assert_eq!(h.html(), "<root><ul><li>1</li><li>2</li></ul></root>");

    let items = vm.get("items");
    let list = items.as_list().unwrap().clone();

    // Raw index write: not intercepted, no update.
    list.store(0, 9);
    run_ticks();
    assert_eq!(renders.get(), 1);

    // Intercepted mutator: one re-render.
    list.push(3);
    run_ticks();
    assert_eq!(renders.get(), 2);
    assert_eq!(h.html(), "<root><ul><li>9</li><li>2</li><li>3</li></ul></root>");
}

#[test]
fn test_reactive_set_and_del_rerender() {
    let h = host();
    let options = ComponentOptions::new()
        .data(|| {
            Record::new().with("obj", Value::Record(Record::new().with("a", 1)))
        })
        .render(|s| {
            let obj = s.get("obj");
            let record = obj.as_record().unwrap();
            let mut parts: Vec<String> = Vec::new();
            for key in record.keys() {
                parts.push(format!("{key}={}", record.get(&key).to_display_string()));
            }
            Ok(s.h("div", VNodeData::new(), parts.join(",").as_str()))
        });
    let vm = h.app.mount(options, h.mount);
    assert_eq!(h.html(), "<root><div>a=1</div></root>");

    let obj = vm.get("obj");
    set(&obj, "b", 2);
    run_ticks();
    assert_eq!(h.html(), "<root><div>a=1,b=2</div></root>");

    vireo_runtime::del(&obj, "a");
    run_ticks();
    assert_eq!(h.html(), "<root><div>b=2</div></root>");

    // Raw insertion is invisible to the render watcher.
    obj.as_record().unwrap().insert_raw("c", 3);
    run_ticks();
    assert_eq!(h.html(), "<root><div>b=2</div></root>");
}

#[test]
fn test_update_loop_guard_aborts_flush() {
    let h = host();
    configure(|c| c.max_update_count = 8);

    let options = ComponentOptions::new()
        .data(|| Record::new().with("a", 0))
        .watch("a", |vm: &Component, new: &Value, _old: &Value| {
            // Self-amplifying write.
            vm.set_value("a", new.as_int().unwrap_or(0) + 1);
            Ok(())
        })
        .render(|s| Ok(s.h("div", VNodeData::new(), s.text(s.get("a")))));
    let vm = h.app.mount(options, h.mount);

    vm.set_value("a", 1);
    run_ticks(); // must terminate

    let final_a = vm.get("a").as_int().unwrap();
    assert!(final_a > 1);
    assert!(final_a <= 12);
}

#[test]
fn test_user_watcher_fires_before_render() {
    let h = host();
    let order = Rc::new(RefCell::new(Vec::new()));
    let order_w = order.clone();
    let order_r = order.clone();

    let options = ComponentOptions::new()
        .data(|| Record::new().with("n", 0))
        .watch("n", move |_vm: &Component, _new: &Value, _old: &Value| {
            order_w.borrow_mut().push("watcher");
            Ok(())
        })
        .render(move |s| {
            order_r.borrow_mut().push("render");
            Ok(s.h("div", VNodeData::new(), s.text(s.get("n"))))
        });
    let vm = h.app.mount(options, h.mount);
    order.borrow_mut().clear();

    vm.set_value("n", 1);
    run_ticks();
    // The user watcher was created before the render watcher, so its id
    // sorts first within the flush.
    assert_eq!(*order.borrow(), vec!["watcher", "render"]);
}

#[test]
fn test_next_tick_observes_patched_dom() {
    let h = host();
    let options = ComponentOptions::new()
        .data(|| Record::new().with("n", 0))
        .render(|s| Ok(s.h("div", VNodeData::new(), s.text(s.get("n")))));
    let vm = h.app.mount(options, h.mount);

    vm.set_value("n", 7);
    let seen = Rc::new(RefCell::new(String::new()));
    let seen_in = seen.clone();
    let mem = h.mem.clone();
    let body = h.body;
    vireo_runtime::next_tick(move || {
        *seen_in.borrow_mut() = mem.borrow().to_html(body);
    });
    run_ticks();
    assert_eq!(&*seen.borrow(), "<root><div>7</div></root>");
}

#[test]
fn test_watch_handle_unwatches() {
    let h = host();
    let fired = Rc::new(Cell::new(0u32));
    let options = ComponentOptions::new()
        .data(|| Record::new().with("n", 0))
        .render(|s| Ok(s.h("div", VNodeData::new(), s.text(s.get("n")))));
    let vm = h.app.mount(options, h.mount);

    let fired_in = fired.clone();
    let handle = vm.watch(
        "n",
        move |_, _, _| {
            fired_in.set(fired_in.get() + 1);
            Ok(())
        },
        WatchOptions::default(),
    );

    vm.set_value("n", 1);
    run_ticks();
    assert_eq!(fired.get(), 1);

    handle.unwatch();
    vm.set_value("n", 2);
    run_ticks();
    assert_eq!(fired.get(), 1);
}

#[test]
fn test_immediate_watcher_fires_on_creation() {
    let h = host();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let options = ComponentOptions::new()
        .data(|| Record::new().with("n", 5))
        .render(|s| Ok(s.h("div", VNodeData::new(), s.text(s.get("n")))));
    let vm = h.app.mount(options, h.mount);

    let seen_in = seen.clone();
    vm.watch(
        "n",
        move |_, new, old| {
            seen_in
                .borrow_mut()
                .push((new.as_int(), old.as_int()));
            Ok(())
        },
        WatchOptions {
            immediate: true,
            ..Default::default()
        },
    );
    assert_eq!(*seen.borrow(), vec![(Some(5), None)]);
}

#[test]
fn test_deep_watcher_sees_nested_writes() {
    let h = host();
    let fired = Rc::new(Cell::new(0u32));
    let options = ComponentOptions::new()
        .data(|| {
            Record::new().with(
                "profile",
                Value::Record(Record::new().with("name", "ada")),
            )
        })
        .render(|s| Ok(s.h("div", VNodeData::new(), ())));
    let vm = h.app.mount(options, h.mount);

    let fired_in = fired.clone();
    vm.watch(
        "profile",
        move |_, _, _| {
            fired_in.set(fired_in.get() + 1);
            Ok(())
        },
        WatchOptions {
            deep: true,
            ..Default::default()
        },
    );

    let profile = vm.get("profile");
    profile.as_record().unwrap().assign("name", "grace");
    run_ticks();
    assert_eq!(fired.get(), 1);
}

#[test]
fn test_render_error_keeps_previous_tree() {
    let h = host();
    let errors = Rc::new(Cell::new(0u32));
    let errors_in = errors.clone();
    configure(move |c| {
        let errors_in = errors_in.clone();
        c.error_handler = Some(Rc::new(move |_err, _ctx| {
            errors_in.set(errors_in.get() + 1);
        }));
    });

    let options = ComponentOptions::new()
        .data(|| Record::new().with("n", 0).with("explode", false))
        .render(|s| {
            if s.get("explode").is_truthy() {
                return Err(vireo_runtime::RuntimeError::Render(
                    "boom".to_string(),
                ));
            }
            Ok(s.h("div", VNodeData::new(), s.text(s.get("n"))))
        });
    let vm = h.app.mount(options, h.mount);
    assert_eq!(h.html(), "<root><div>0</div></root>");

    vm.set_value("explode", true);
    run_ticks();
    // The error was routed and the view did not blank.
    assert_eq!(errors.get(), 1);
    assert_eq!(h.html(), "<root><div>0</div></root>");

    vm.set_value("explode", false);
    vm.set_value("n", 3);
    run_ticks();
    assert_eq!(h.html(), "<root><div>3</div></root>");
}

#[test]
fn test_method_name_reads_as_null() {
    let h = host();
    let options = ComponentOptions::new()
        .method("helper", |_, _| Value::Int(1))
        .render(|s| Ok(s.h("div", VNodeData::new(), s.text(s.get("helper")))));
    let vm = h.app.mount(options, h.mount);
    // A method is declared state but not readable as a value: it
    // renders as the empty display form and is invoked through `call`.
    assert_eq!(h.html(), "<root><div></div></root>");
    assert_eq!(vm.call("helper", &[]).as_int(), Some(1));
}

#[test]
fn test_keyed_list_render_reorders_with_moves() {
    let h = host();
    let options = ComponentOptions::new()
        .data(|| {
            Record::new().with(
                "keys",
                Value::List(
                    ["a", "b", "c", "d"]
                        .into_iter()
                        .map(Value::from)
                        .collect(),
                ),
            )
        })
        .render(|s| {
            let keys = s.get("keys");
            let children: Vec<_> = keys
                .as_list()
                .map(|l| l.to_vec())
                .unwrap_or_default()
                .into_iter()
                .map(|k| {
                    let key = k.as_str().unwrap_or("").to_string();
                    s.h(
                        "li",
                        VNodeData::new().key(key.as_str()),
                        key.as_str(),
                    )
                })
                .collect();
            Ok(s.h("ul", VNodeData::new(), children))
        });
    let vm = h.app.mount(options, h.mount);
    assert_eq!(
        h.html(),
        "<root><ul><li>a</li><li>b</li><li>c</li><li>d</li></ul></root>"
    );

    h.clear_ops();
    let keys = vm.get("keys");
    let list = keys.as_list().unwrap();
    list.splice(0, 4, vec!["d".into(), "a".into(), "b".into(), "c".into()]);
    run_ticks();

    assert_eq!(
        h.html(),
        "<root><ul><li>d</li><li>a</li><li>b</li><li>c</li></ul></root>"
    );
    // One move, nothing created or destroyed.
    assert_eq!(h.structural_ops(), 1);
    assert_eq!(
        h.mem
            .borrow()
            .count_ops(|op| matches!(op, DomOp::InsertBefore)),
        1
    );
}
