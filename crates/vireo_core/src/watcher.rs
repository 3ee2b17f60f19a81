//! Watchers
//!
//! A watcher is a re-evaluable computation bound to a dynamic set of
//! deps. Running its getter with the watcher on top of the active stack
//! collects the exact set of reactive reads; a later notify on any of
//! them re-queues the watcher. Lazy watchers back computed properties,
//! user watchers carry a change callback, and the render watcher of a
//! component patches the host tree as a side effect of its getter.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use rustc_hash::FxHashSet;

use crate::config::dev_warn;
use crate::dep::{pop_active_watcher, push_active_watcher, Dep};
use crate::error::{handle_error, RuntimeError};
use crate::value::{Record, Value};

thread_local! {
    static NEXT_WATCHER_ID: Cell<u64> = const { Cell::new(1) };
}

/// The evaluation a watcher re-runs.
pub type Getter = Box<dyn FnMut() -> Result<Value, RuntimeError>>;

/// Change callback: `(new_value, old_value)`.
pub type WatchCallback = Box<dyn Fn(&Value, &Value) -> Result<(), RuntimeError>>;

/// Construction-time flags and hooks.
#[derive(Default)]
pub struct WatcherOptions {
    /// Traverse the result so every nested reactive property subscribes.
    pub deep: bool,
    /// User-supplied watcher: getter and callback errors are trapped and
    /// routed instead of propagated.
    pub user: bool,
    /// Do not evaluate until first read; re-evaluation is deferred to the
    /// next read after an invalidation (computed properties).
    pub lazy: bool,
    /// Re-run synchronously on notify instead of going through the
    /// scheduler.
    pub sync: bool,
    /// Invoked just before each scheduled re-run.
    pub before: Option<Box<dyn Fn()>>,
    /// Invoked after the flush in which this watcher ran.
    pub after: Option<Box<dyn Fn()>>,
}

pub struct Watcher {
    id: u64,
    self_weak: Weak<Watcher>,
    getter: RefCell<Getter>,
    cb: Option<WatchCallback>,
    deep: bool,
    user: bool,
    lazy: bool,
    sync: bool,
    active: Cell<bool>,
    dirty: Cell<bool>,
    value: RefCell<Value>,
    before: Option<Box<dyn Fn()>>,
    after: Option<Box<dyn Fn()>>,
    // Current deps and the set collected by the in-flight getter run,
    // each mirrored by an id set for O(1) dedupe.
    deps: RefCell<Vec<Rc<Dep>>>,
    dep_ids: RefCell<FxHashSet<u64>>,
    new_deps: RefCell<Vec<Rc<Dep>>>,
    new_dep_ids: RefCell<FxHashSet<u64>>,
}

impl Watcher {
    /// Create a watcher. Non-lazy watchers evaluate immediately, which
    /// performs the initial dependency collection.
    pub fn new(getter: Getter, cb: Option<WatchCallback>, options: WatcherOptions) -> Rc<Self> {
        let id = NEXT_WATCHER_ID.with(|n| {
            let id = n.get();
            n.set(id + 1);
            id
        });
        let watcher = Rc::new_cyclic(|self_weak| Self {
            id,
            self_weak: self_weak.clone(),
            getter: RefCell::new(getter),
            cb,
            deep: options.deep,
            user: options.user,
            lazy: options.lazy,
            sync: options.sync,
            active: Cell::new(true),
            dirty: Cell::new(options.lazy),
            value: RefCell::new(Value::Null),
            before: options.before,
            after: options.after,
            deps: RefCell::new(Vec::new()),
            dep_ids: RefCell::new(FxHashSet::default()),
            new_deps: RefCell::new(Vec::new()),
            new_dep_ids: RefCell::new(FxHashSet::default()),
        });
        if !watcher.lazy {
            let value = watcher.get_trapped();
            *watcher.value.borrow_mut() = value;
        }
        watcher
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_active(&self) -> bool {
        self.active.get()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.get()
    }

    pub fn is_lazy(&self) -> bool {
        self.lazy
    }

    /// The most recently computed value.
    pub fn value(&self) -> Value {
        self.value.borrow().clone()
    }

    fn rc(&self) -> Rc<Watcher> {
        self.self_weak
            .upgrade()
            .expect("watcher method called on a dropped watcher")
    }

    /// Evaluate the getter with this watcher collecting dependencies,
    /// then reconcile the dep sets.
    pub fn get(&self) -> Result<Value, RuntimeError> {
        push_active_watcher(self.rc());
        let result = match self.getter.try_borrow_mut() {
            Ok(mut getter) => getter(),
            Err(_) => Err(RuntimeError::Custom(
                "re-entrant watcher evaluation".to_string(),
            )),
        };
        let outcome = match result {
            Ok(value) => {
                if self.deep {
                    traverse(&value);
                }
                Ok(value)
            }
            Err(err) => {
                if self.user {
                    handle_error(&err, "user watcher getter");
                    Ok(Value::Null)
                } else {
                    Err(err)
                }
            }
        };
        pop_active_watcher();
        self.cleanup_deps();
        outcome
    }

    fn get_trapped(&self) -> Value {
        match self.get() {
            Ok(value) => value,
            Err(err) => {
                handle_error(&err, "watcher getter");
                Value::Null
            }
        }
    }

    /// Record a dep touched during the in-flight getter run. First-time
    /// subscriptions call back into the dep.
    pub(crate) fn add_dep(&self, dep: Rc<Dep>) {
        let dep_id = dep.id();
        if self.new_dep_ids.borrow().contains(&dep_id) {
            return;
        }
        self.new_dep_ids.borrow_mut().insert(dep_id);
        if !self.dep_ids.borrow().contains(&dep_id) {
            dep.add_sub(&self.rc());
        }
        self.new_deps.borrow_mut().push(dep);
    }

    /// Unsubscribe from deps the latest run no longer touched, then swap
    /// the pending set in as current.
    fn cleanup_deps(&self) {
        {
            let new_ids = self.new_dep_ids.borrow();
            for dep in self.deps.borrow().iter() {
                if !new_ids.contains(&dep.id()) {
                    dep.remove_sub(self.id);
                }
            }
        }
        self.deps.swap(&self.new_deps);
        self.dep_ids.swap(&self.new_dep_ids);
        self.new_deps.borrow_mut().clear();
        self.new_dep_ids.borrow_mut().clear();
    }

    /// A subscribed dep changed. Lazy watchers only mark themselves
    /// dirty; sync watchers run in place; everything else goes through
    /// the scheduler.
    pub fn update(&self) {
        if self.lazy {
            self.dirty.set(true);
        } else if self.sync {
            self.run();
        } else {
            crate::scheduler::queue_watcher(self.rc());
        }
    }

    /// Re-evaluate and fire the callback when the result is observably
    /// different, or is a container (it may have mutated in place), or
    /// when watching deep.
    pub fn run(&self) {
        if !self.active.get() {
            return;
        }
        let value = match self.get() {
            Ok(value) => value,
            Err(err) => {
                handle_error(&err, "watcher getter");
                return;
            }
        };
        let old = self.value.borrow().clone();
        if !value.same_observable(&old) || value.is_container() || self.deep {
            *self.value.borrow_mut() = value.clone();
            if let Some(cb) = &self.cb {
                if let Err(err) = cb(&value, &old) {
                    handle_error(&err, "watcher callback");
                }
            }
        }
    }

    /// Evaluate a lazy watcher and clear its dirty bit (computed
    /// properties call this on read).
    pub fn evaluate(&self) {
        let value = self.get_trapped();
        *self.value.borrow_mut() = value;
        self.dirty.set(false);
    }

    /// Forward every dep of this watcher to the currently-active one, so
    /// an outer watcher transitively depends on the reactive inputs of a
    /// computed expression.
    pub fn depend(&self) {
        for dep in self.deps.borrow().iter() {
            dep.depend();
        }
    }

    /// Unsubscribe from all deps and deactivate.
    pub fn teardown(&self) {
        if !self.active.get() {
            return;
        }
        for dep in self.deps.borrow().iter() {
            dep.remove_sub(self.id);
        }
        self.deps.borrow_mut().clear();
        self.dep_ids.borrow_mut().clear();
        self.active.set(false);
    }

    pub(crate) fn call_before(&self) {
        if let Some(before) = &self.before {
            before();
        }
    }

    pub(crate) fn call_after(&self) {
        if let Some(after) = &self.after {
            after();
        }
    }

    /// Number of deps currently subscribed (diagnostics and tests).
    pub fn dep_count(&self) -> usize {
        self.deps.borrow().len()
    }
}

/// Split a dotted path into segments, rejecting anything that is not a
/// plain identifier chain (`a.b.c`).
pub fn parse_path(path: &str) -> Option<Vec<Rc<str>>> {
    if path.is_empty() {
        return None;
    }
    let mut segments = Vec::new();
    for segment in path.split('.') {
        if segment.is_empty()
            || !segment
                .chars()
                .all(|c| c.is_alphanumeric() || c == '_' || c == '$')
        {
            return None;
        }
        segments.push(Rc::from(segment));
    }
    Some(segments)
}

/// Build a getter walking a dotted path from a record root, subscribing
/// along the way. Returns `None` (with a warning) for invalid paths;
/// callers substitute a no-op getter.
pub fn path_getter(root: &Record, path: &str) -> Option<Getter> {
    let Some(segments) = parse_path(path) else {
        dev_warn(&format!(
            "watch path `{path}` is not a dotted identifier chain"
        ));
        return None;
    };
    let root = root.clone();
    Some(Box::new(move || {
        let mut current = Value::Record(root.clone());
        for segment in &segments {
            match &current {
                Value::Record(record) => current = record.get(segment),
                _ => return Ok(Value::Null),
            }
        }
        Ok(current)
    }))
}

/// A getter that always yields null; stand-in for invalid watch paths.
pub fn noop_getter() -> Getter {
    Box::new(|| Ok(Value::Null))
}

/// Touch every reactive property reachable from `value` so a deep
/// watcher subscribes to all of them. A seen-set of container dep ids
/// short-circuits cycles.
pub fn traverse(value: &Value) {
    let mut seen = FxHashSet::default();
    traverse_inner(value, &mut seen);
}

fn traverse_inner(value: &Value, seen: &mut FxHashSet<u64>) {
    match value {
        Value::Record(record) => {
            if record.is_frozen() {
                return;
            }
            if let Some(ob) = record.observer() {
                if !seen.insert(ob.dep().id()) {
                    return;
                }
            }
            for key in record.keys() {
                // Subscribing read.
                traverse_inner(&record.get(&key), seen);
            }
        }
        Value::List(list) => {
            if list.is_frozen() {
                return;
            }
            if let Some(ob) = list.observer() {
                if !seen.insert(ob.dep().id()) {
                    return;
                }
            }
            for item in list.to_vec() {
                traverse_inner(&item, seen);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::observe;
    use crate::value::List;

    fn observed_record(record: Record) -> Record {
        observe(&Value::Record(record.clone()));
        record
    }

    #[test]
    fn test_watcher_collects_deps() {
        let data = observed_record(Record::new().with("a", 1).with("b", 2));
        let source = data.clone();
        let watcher = Watcher::new(
            Box::new(move || Ok(source.get("a"))),
            None,
            WatcherOptions::default(),
        );
        // One property dep; "b" was never read.
        assert_eq!(watcher.dep_count(), 1);
        assert_eq!(watcher.value().as_int(), Some(1));
    }

    #[test]
    fn test_conditional_read_drops_stale_deps() {
        let data = observed_record(
            Record::new().with("flag", true).with("x", 1).with("y", 2),
        );
        let source = data.clone();
        let watcher = Watcher::new(
            Box::new(move || {
                Ok(if source.get("flag").is_truthy() {
                    source.get("x")
                } else {
                    source.get("y")
                })
            }),
            None,
            WatcherOptions {
                sync: true,
                ..Default::default()
            },
        );
        assert_eq!(watcher.dep_count(), 2); // flag + x

        data.assign("flag", false);
        assert_eq!(watcher.dep_count(), 2); // flag + y
        assert_eq!(watcher.value().as_int(), Some(2));

        // x is no longer subscribed: its dep has no live watchers.
        let x_dep = data.entry_dep("x").unwrap();
        assert_eq!(x_dep.subscriber_count(), 0);
    }

    #[test]
    fn test_sync_watcher_fires_callback() {
        let data = observed_record(Record::new().with("n", 0));
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_cb = seen.clone();
        let source = data.clone();
        let _watcher = Watcher::new(
            Box::new(move || Ok(source.get("n"))),
            Some(Box::new(move |new, old| {
                seen_cb
                    .borrow_mut()
                    .push((new.as_int().unwrap(), old.as_int().unwrap()));
                Ok(())
            })),
            WatcherOptions {
                sync: true,
                ..Default::default()
            },
        );
        data.assign("n", 5);
        assert_eq!(*seen.borrow(), vec![(5, 0)]);
    }

    #[test]
    fn test_same_value_write_does_not_fire() {
        let data = observed_record(Record::new().with("n", 1));
        let fired = Rc::new(Cell::new(0));
        let fired_cb = fired.clone();
        let source = data.clone();
        let _watcher = Watcher::new(
            Box::new(move || Ok(source.get("n"))),
            Some(Box::new(move |_, _| {
                fired_cb.set(fired_cb.get() + 1);
                Ok(())
            })),
            WatcherOptions {
                sync: true,
                ..Default::default()
            },
        );
        data.assign("n", 1);
        assert_eq!(fired.get(), 0);
    }

    #[test]
    fn test_teardown_unsubscribes() {
        let data = observed_record(Record::new().with("a", 1));
        let source = data.clone();
        let watcher = Watcher::new(
            Box::new(move || Ok(source.get("a"))),
            None,
            WatcherOptions {
                sync: true,
                ..Default::default()
            },
        );
        let dep = data.entry_dep("a").unwrap();
        assert_eq!(dep.subscriber_count(), 1);
        watcher.teardown();
        assert_eq!(dep.subscriber_count(), 0);
        assert!(!watcher.is_active());
    }

    #[test]
    fn test_lazy_watcher_defers_and_caches() {
        let data = observed_record(Record::new().with("a", 1).with("b", 2));
        let evals = Rc::new(Cell::new(0u32));
        let evals_inner = evals.clone();
        let source = data.clone();
        let watcher = Watcher::new(
            Box::new(move || {
                evals_inner.set(evals_inner.get() + 1);
                Ok(Value::Int(
                    source.get("a").as_int().unwrap() + source.get("b").as_int().unwrap(),
                ))
            }),
            None,
            WatcherOptions {
                lazy: true,
                ..Default::default()
            },
        );
        assert_eq!(evals.get(), 0);
        assert!(watcher.is_dirty());

        watcher.evaluate();
        assert_eq!(evals.get(), 1);
        assert_eq!(watcher.value().as_int(), Some(3));
        assert!(!watcher.is_dirty());

        // Invalidation marks dirty without re-evaluating.
        data.assign("a", 10);
        assert!(watcher.is_dirty());
        assert_eq!(evals.get(), 1);

        watcher.evaluate();
        assert_eq!(watcher.value().as_int(), Some(12));
    }

    #[test]
    fn test_deep_watcher_sees_nested_mutation() {
        let nested = Record::new().with("x", 1);
        let data = observed_record(Record::new().with("nested", Value::Record(nested.clone())));
        let fired = Rc::new(Cell::new(0));
        let fired_cb = fired.clone();
        let source = data.clone();
        let _watcher = Watcher::new(
            Box::new(move || Ok(source.get("nested"))),
            Some(Box::new(move |_, _| {
                fired_cb.set(fired_cb.get() + 1);
                Ok(())
            })),
            WatcherOptions {
                deep: true,
                sync: true,
                ..Default::default()
            },
        );
        nested.assign("x", 2);
        assert_eq!(fired.get(), 1);
    }

    #[test]
    fn test_path_getter() {
        let inner = Record::new().with("c", 7);
        let root = observed_record(
            Record::new().with("b", Value::Record(inner)),
        );
        let mut getter = path_getter(&root, "b.c").unwrap();
        assert_eq!(getter().unwrap().as_int(), Some(7));

        let mut broken = path_getter(&root, "b.missing.deeper").unwrap();
        assert!(broken().unwrap().is_null());

        assert!(path_getter(&root, "b..c").is_none());
        assert!(path_getter(&root, "b[0]").is_none());
    }

    #[test]
    fn test_list_mutator_notifies_watcher() {
        let list = List::from_values(vec![1.into()]);
        let data = observed_record(Record::new().with("items", Value::List(list.clone())));
        let fired = Rc::new(Cell::new(0));
        let fired_cb = fired.clone();
        let source = data.clone();
        let _watcher = Watcher::new(
            Box::new(move || Ok(source.get("items"))),
            Some(Box::new(move |_, _| {
                fired_cb.set(fired_cb.get() + 1);
                Ok(())
            })),
            WatcherOptions {
                sync: true,
                ..Default::default()
            },
        );
        list.push(2);
        assert_eq!(fired.get(), 1);

        // Raw index writes are not intercepted.
        list.store(0, 9);
        assert_eq!(fired.get(), 1);
    }
}
