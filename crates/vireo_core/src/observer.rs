//! Deep observation
//!
//! `observe` instruments a value tree so that reads register dependencies
//! and writes notify them. Each observed container carries one `Observer`
//! holding the container-level dep used for collection mutations and for
//! key addition/removal, which property-level deps cannot see.

use std::cell::Cell;
use std::rc::Rc;

use crate::config::dev_warn;
use crate::dep::Dep;
use crate::value::{List, Record, Value};

thread_local! {
    /// Deep-observation toggle: while false, `observe` is a no-op. Used
    /// to bracket prop binding and injection resolution, where the owner
    /// of the values already observes them.
    static OBSERVING: Cell<bool> = const { Cell::new(true) };
}

/// Per-container observation state.
pub struct Observer {
    dep: Rc<Dep>,
    /// Number of component instances using this record as their root
    /// data. Guards against reactive key addition at the root.
    root_count: Cell<u32>,
}

impl Observer {
    fn new() -> Rc<Self> {
        Rc::new(Self {
            dep: Dep::new(),
            root_count: Cell::new(0),
        })
    }

    /// The container-level dep.
    pub fn dep(&self) -> &Rc<Dep> {
        &self.dep
    }

    pub fn root_count(&self) -> u32 {
        self.root_count.get()
    }

    pub fn retain_as_root(&self) {
        self.root_count.set(self.root_count.get() + 1);
    }

    pub fn release_as_root(&self) {
        let n = self.root_count.get();
        self.root_count.set(n.saturating_sub(1));
    }
}

/// Run `f` with observation suspended: `observe` calls inside it return
/// `None` and leave values untouched.
pub fn without_observation<R>(f: impl FnOnce() -> R) -> R {
    let prev = OBSERVING.with(|o| o.replace(false));
    let result = f();
    OBSERVING.with(|o| o.set(prev));
    result
}

pub(crate) fn is_observing() -> bool {
    OBSERVING.with(|o| o.get())
}

/// Observe a value tree. Idempotent: an already-observed container
/// returns its existing observer. Primitives and frozen containers are
/// left untouched.
pub fn observe(value: &Value) -> Option<Rc<Observer>> {
    match value {
        Value::Record(record) => observe_record(record),
        Value::List(list) => observe_list(list),
        _ => None,
    }
}

fn observe_record(record: &Record) -> Option<Rc<Observer>> {
    if let Some(ob) = record.observer() {
        return Some(ob);
    }
    if !is_observing() || record.is_frozen() {
        return None;
    }
    let ob = Observer::new();
    record.attach_observer(ob.clone());
    // Walk: make every existing entry reactive, then recurse.
    for key in record.keys() {
        record.ensure_reactive(&key);
        observe(&record.peek(&key));
    }
    Some(ob)
}

fn observe_list(list: &List) -> Option<Rc<Observer>> {
    if let Some(ob) = list.observer() {
        return Some(ob);
    }
    if !is_observing() || list.is_frozen() {
        return None;
    }
    let ob = Observer::new();
    list.attach_observer(ob.clone());
    for item in list.to_vec() {
        observe(&item);
    }
    Some(ob)
}

/// Define a reactive entry on a record: the entry gets its dep and the
/// value is observed (subject to the observation toggle). Used when
/// binding props and by [`set`].
pub fn define_reactive(record: &Record, key: &str, value: Value) {
    record.insert_raw(key, value.clone());
    record.ensure_reactive(key);
    observe(&value);
}

/// Keys addressing an entry of a container: a record key or a list index.
#[derive(Clone, Copy, Debug)]
pub enum ContainerKey<'a> {
    Key(&'a str),
    Index(usize),
}

impl<'a> From<&'a str> for ContainerKey<'a> {
    fn from(key: &'a str) -> Self {
        ContainerKey::Key(key)
    }
}

impl From<usize> for ContainerKey<'_> {
    fn from(index: usize) -> Self {
        ContainerKey::Index(index)
    }
}

/// Reactively set an entry on a container. For lists this is a splice at
/// a valid index (or an append at `len`); for records an existing key is
/// plainly assigned, while a new key becomes a reactive entry and the
/// container dep is notified so watchers of the record itself re-run.
pub fn set<'a>(container: &Value, key: impl Into<ContainerKey<'a>>, value: impl Into<Value>) {
    let value = value.into();
    match (container, key.into()) {
        (Value::List(list), ContainerKey::Index(index)) => {
            if index > list.len() {
                dev_warn(&format!(
                    "set: index {index} out of bounds for list of length {}",
                    list.len()
                ));
                return;
            }
            list.splice(index, usize::from(index < list.len()), vec![value]);
        }
        (Value::Record(record), ContainerKey::Key(k)) => {
            if record.contains_key(k) {
                record.assign(k, value);
                return;
            }
            if record.is_frozen() {
                dev_warn(&format!("set: cannot add key `{k}` to a frozen record"));
                return;
            }
            let ob = record.observer();
            if let Some(ob) = &ob {
                if ob.root_count() > 0 {
                    dev_warn(&format!(
                        "set: avoid adding reactive key `{k}` to root data; \
                         declare it upfront instead"
                    ));
                    return;
                }
            }
            match ob {
                Some(ob) => {
                    define_reactive(record, k, value);
                    ob.dep().notify();
                }
                // Unobserved target: plain insertion is all there is.
                None => record.insert_raw(k, value),
            }
        }
        (_, key) => {
            dev_warn(&format!("set: container/key mismatch ({key:?})"));
        }
    }
}

/// Reactively delete an entry from a container. For lists this is a
/// splice; for records the entry is removed and the container dep
/// notified (property deps of a removed key no longer fire).
pub fn del<'a>(container: &Value, key: impl Into<ContainerKey<'a>>) {
    match (container, key.into()) {
        (Value::List(list), ContainerKey::Index(index)) => {
            if index < list.len() {
                list.splice(index, 1, Vec::new());
            }
        }
        (Value::Record(record), ContainerKey::Key(k)) => {
            if record.is_frozen() {
                dev_warn(&format!("del: cannot remove key `{k}` from a frozen record"));
                return;
            }
            if let Some(ob) = record.observer() {
                if ob.root_count() > 0 {
                    dev_warn(&format!("del: avoid removing key `{k}` from root data"));
                    return;
                }
            }
            if record.remove_entry(k).is_some() {
                if let Some(ob) = record.observer() {
                    ob.dep().notify();
                }
            }
        }
        (_, key) => {
            dev_warn(&format!("del: container/key mismatch ({key:?})"));
        }
    }
}
