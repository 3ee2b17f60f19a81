//! Counter Demo
//!
//! The smallest closed reactive loop: a data record, a render function
//! reading it, and mutations flowing through the scheduler back into
//! the host tree. The host is the in-memory implementation, so the demo
//! prints the serialized tree after each flush.
//!
//! Run with: cargo run -p vireo_runtime --example counter

use std::cell::RefCell;
use std::rc::Rc;

use vireo_dom::{MemoryDom, NodeOps};
use vireo_runtime::{run_ticks, App, Component, ComponentOptions, Record, Value, VNodeData};

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
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
        .name("counter")
        .data(|| Record::new().with("count", 0))
        .method("increment", |vm: &Component, _| {
            let next = vm.get("count").as_int().unwrap_or(0) + 1;
            vm.set_value("count", next);
            Value::Null
        })
        .render(|s| {
            let vm = s.vm().clone();
            Ok(s.h(
                "button",
                VNodeData::new().class_static("counter").on("click", move |_| {
                    vm.call("increment", &[]);
                }),
                s.text(s.get("count")),
            ))
        });

    let app = App::new(mem.clone());
    let vm = app.mount(options, mount);
    println!("mounted: {}", mem.borrow().to_html(body));

    // Simulate three clicks, flushing between each.
    for _ in 0..3 {
        let button = vm.el().expect("counter root element");
        mem.borrow().dispatch(button, "click", &Value::Null);
        run_ticks();
        println!("clicked: {}", mem.borrow().to_html(body));
    }
}
