//! Todo List Demo
//!
//! Exercises the larger surface: a child component with props and
//! emitted events, keyed list rendering (reorders move host nodes
//! instead of recreating them), computed properties, and reactive list
//! mutators.
//!
//! Run with: cargo run -p vireo_runtime --example todo_list

use std::cell::RefCell;
use std::rc::Rc;

use vireo_dom::{MemoryDom, NodeOps};
use vireo_runtime::{
    run_ticks, App, Component, ComponentOptions, List, Record, Value, VNodeData,
};

fn todo_item() -> Rc<ComponentOptions> {
    Rc::new(
        ComponentOptions::new()
            .name("todo-item")
            .prop("label")
            .prop_with_default("done", || Value::Bool(false))
            .render(|s| {
                let class = if s.get("done").is_truthy() {
                    "item done"
                } else {
                    "item"
                };
                Ok(s.h(
                    "li",
                    VNodeData::new().class_static(class),
                    s.text(s.get("label")),
                ))
            }),
    )
}

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let mem = Rc::new(RefCell::new(MemoryDom::new()));
    let (body, mount) = {
        let mut m = mem.borrow_mut();
        let body = m.create_root();
        let mount = m.create_element("div");
        m.append_child(body, mount);
        (body, mount)
    };

    let options = ComponentOptions::new()
        .name("todo-app")
        .data(|| {
            Record::new().with(
                "todos",
                Value::List(
                    ["write spec", "observe data", "patch tree"]
                        .into_iter()
                        .map(Value::from)
                        .collect::<List>(),
                ),
            )
        })
        .computed("remaining", |vm: &Component| {
            let count = vm
                .get("todos")
                .as_list()
                .map(|l| l.len())
                .unwrap_or(0);
            Ok(Value::Int(count as i64))
        })
        .component("todo-item", todo_item())
        .render(|s| {
            let todos = s.get("todos");
            let items: Vec<_> = todos
                .as_list()
                .map(|l| l.to_vec())
                .unwrap_or_default()
                .into_iter()
                .map(|todo| {
                    let label = todo.as_str().unwrap_or("").to_string();
                    s.h(
                        "todo-item",
                        VNodeData::new()
                            .key(label.as_str())
                            .prop("label", Value::from(label.as_str())),
                        (),
                    )
                })
                .collect();
            let header = s.h(
                "h1",
                VNodeData::new(),
                format!("{} todos", s.get("remaining").to_display_string()).as_str(),
            );
            Ok(s.h(
                "main",
                VNodeData::new(),
                vec![header, s.h("ul", VNodeData::new(), items)],
            ))
        });

    let app = App::new(mem.clone());
    let vm = app.mount(options, mount);
    println!("mounted:   {}", mem.borrow().to_html(body));

    // Append through the intercepted mutator.
    let todos = vm.get("todos");
    let list = todos.as_list().expect("todos list").clone();
    list.push("ship it");
    run_ticks();
    println!("pushed:    {}", mem.borrow().to_html(body));

    // Reorder: the keyed diff moves existing host nodes.
    mem.borrow_mut().clear_ops();
    list.reverse();
    run_ticks();
    let moves = mem.borrow().count_ops(|op| op.is_structural());
    println!("reversed:  {}", mem.borrow().to_html(body));
    println!("structural ops for the reversal: {moves}");
}
