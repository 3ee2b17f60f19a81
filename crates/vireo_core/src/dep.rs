//! Dependency slots
//!
//! A `Dep` is the subscriber list behind one reactive property or one
//! observed container. Reads connect the dep to whichever watcher is on
//! top of the active-watcher stack; writes fan out to every subscriber.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use smallvec::SmallVec;

use crate::watcher::Watcher;

thread_local! {
    static NEXT_DEP_ID: Cell<u64> = const { Cell::new(1) };

    /// The watcher stack. The top entry records every dep touched while
    /// its getter runs; an empty stack means reads are untracked.
    static ACTIVE_WATCHERS: RefCell<Vec<Rc<Watcher>>> = const { RefCell::new(Vec::new()) };
}

/// One dependency slot: a monotonically-increasing id plus the watchers
/// currently subscribed, in subscription order.
pub struct Dep {
    id: u64,
    subs: RefCell<SmallVec<[Weak<Watcher>; 4]>>,
}

impl Dep {
    pub fn new() -> Rc<Self> {
        let id = NEXT_DEP_ID.with(|n| {
            let id = n.get();
            n.set(id + 1);
            id
        });
        Rc::new(Self {
            id,
            subs: RefCell::new(SmallVec::new()),
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Connect this dep to the active watcher, if any. The watcher owns
    /// the dedupe bookkeeping and calls back [`Dep::add_sub`] on a
    /// first-time subscription.
    pub fn depend(self: &Rc<Self>) {
        if let Some(watcher) = active_watcher() {
            watcher.add_dep(self.clone());
        }
    }

    pub(crate) fn add_sub(&self, watcher: &Rc<Watcher>) {
        self.subs.borrow_mut().push(Rc::downgrade(watcher));
    }

    pub(crate) fn remove_sub(&self, watcher_id: u64) {
        self.subs.borrow_mut().retain(|w| match w.upgrade() {
            Some(w) => w.id() != watcher_id,
            None => false,
        });
    }

    /// Fan a change out to every live subscriber.
    pub fn notify(&self) {
        // Collect strong handles first: running a watcher may subscribe
        // or unsubscribe on this very dep.
        let subs: SmallVec<[Rc<Watcher>; 4]> = {
            let mut subs = self.subs.borrow_mut();
            subs.retain(|w| w.strong_count() > 0);
            subs.iter().filter_map(Weak::upgrade).collect()
        };
        for watcher in subs {
            watcher.update();
        }
    }

    /// Number of live subscribers (diagnostics and tests).
    pub fn subscriber_count(&self) -> usize {
        self.subs
            .borrow()
            .iter()
            .filter(|w| w.strong_count() > 0)
            .count()
    }
}

pub(crate) fn push_active_watcher(watcher: Rc<Watcher>) {
    ACTIVE_WATCHERS.with(|stack| stack.borrow_mut().push(watcher));
}

pub(crate) fn pop_active_watcher() {
    ACTIVE_WATCHERS.with(|stack| {
        stack.borrow_mut().pop();
    });
}

/// The watcher currently collecting dependencies, if any.
pub fn active_watcher() -> Option<Rc<Watcher>> {
    ACTIVE_WATCHERS.with(|stack| stack.borrow().last().cloned())
}

/// True while some watcher is collecting dependencies. Cheap guard used
/// by computed-property accessors to decide whether to forward deps.
pub fn has_active_watcher() -> bool {
    ACTIVE_WATCHERS.with(|stack| !stack.borrow().is_empty())
}

/// Run `f` with dependency collection suspended, so reads inside it
/// subscribe nothing.
pub fn untracked<R>(f: impl FnOnce() -> R) -> R {
    // Swap the stack out wholesale and restore it afterwards.
    let saved = ACTIVE_WATCHERS.with(|stack| std::mem::take(&mut *stack.borrow_mut()));
    let result = f();
    ACTIVE_WATCHERS.with(|stack| *stack.borrow_mut() = saved);
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dep_ids_are_monotonic() {
        let a = Dep::new();
        let b = Dep::new();
        assert!(b.id() > a.id());
    }

    #[test]
    fn test_no_active_watcher_by_default() {
        assert!(active_watcher().is_none());
        assert!(!has_active_watcher());
    }
}
