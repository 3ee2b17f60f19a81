//! Update scheduler
//!
//! Watcher invalidations are batched into a queue and drained in one
//! flush, in ascending watcher-id order: parents before children (they
//! are constructed first) and user watchers before the render watcher of
//! the same component. A watcher enqueued while the flush is running is
//! spliced in past the cursor so it still runs, in order, in the same
//! flush.
//!
//! There is no ambient microtask queue to defer to, so the suspension
//! point is explicit: a scheduled flush is pushed onto the pending-tick
//! queue and runs when the host pumps [`run_ticks`] (an event loop once
//! per turn, tests after each mutation batch). [`next_tick`] rides the
//! same queue, which is what guarantees user callbacks observe
//! post-flush state.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::config::with_config;
use crate::watcher::Watcher;

type Tick = Box<dyn FnOnce()>;

#[derive(Default)]
struct SchedulerState {
    queue: Vec<Rc<Watcher>>,
    /// Watcher ids currently queued; cleared per id just before its run
    /// so a watcher may legitimately re-enqueue itself.
    has: FxHashSet<u64>,
    /// Per-id re-enqueue counts within one flush (runaway-loop guard).
    circular: FxHashMap<u64, u32>,
    waiting: bool,
    flushing: bool,
    index: usize,
}

thread_local! {
    static SCHEDULER: RefCell<SchedulerState> = RefCell::new(SchedulerState::default());
    static TICKS: RefCell<VecDeque<Tick>> = RefCell::new(VecDeque::new());
    static PUMPING: Cell<bool> = const { Cell::new(false) };
    /// Activation callbacks queued during patch (kept-alive subtrees),
    /// run after the flush that revived them.
    static ACTIVATED: RefCell<Vec<Tick>> = RefCell::new(Vec::new());
}

/// Enqueue a watcher for the next flush. Deduplicates by id; while a
/// flush is running the watcher is inserted just past its sorted
/// position so the current pass picks it up.
pub fn queue_watcher(watcher: Rc<Watcher>) {
    let should_flush = SCHEDULER.with(|state| {
        let mut state = state.borrow_mut();
        let id = watcher.id();
        if state.has.contains(&id) {
            return false;
        }
        state.has.insert(id);
        if !state.flushing {
            state.queue.push(watcher);
        } else {
            // Keep the tail of the queue sorted past the cursor.
            let mut i = state.queue.len();
            while i > state.index && state.queue[i - 1].id() > id {
                i -= 1;
            }
            state.queue.insert(i, watcher);
        }
        if !state.waiting {
            state.waiting = true;
            return true;
        }
        false
    });
    if should_flush {
        if with_config(|c| c.async_flush) {
            TICKS.with(|ticks| {
                ticks
                    .borrow_mut()
                    .push_back(Box::new(flush_scheduler_queue))
            });
        } else {
            flush_scheduler_queue();
        }
    }
}

/// Queue a callback behind any pending flush. Callbacks run in FIFO
/// order when the host pumps [`run_ticks`].
pub fn next_tick(cb: impl FnOnce() + 'static) {
    TICKS.with(|ticks| ticks.borrow_mut().push_back(Box::new(cb)));
}

/// Queue an activation callback; the scheduler runs these after the
/// current flush, once updated hooks have fired.
pub fn queue_activated(cb: impl FnOnce() + 'static) {
    ACTIVATED.with(|activated| activated.borrow_mut().push(Box::new(cb)));
}

/// Pump the pending-tick queue until it is empty. Re-entrant calls
/// return immediately; the outermost pump drains everything, including
/// ticks queued by the ticks it runs.
pub fn run_ticks() {
    if PUMPING.with(|p| p.replace(true)) {
        return;
    }
    loop {
        let tick = TICKS.with(|ticks| ticks.borrow_mut().pop_front());
        match tick {
            Some(tick) => tick(),
            None => break,
        }
    }
    PUMPING.with(|p| p.set(false));
}

/// True when a flush or tick callback is still pending.
pub fn has_pending_ticks() -> bool {
    TICKS.with(|ticks| !ticks.borrow().is_empty())
}

/// Drain the watcher queue in ascending id order.
fn flush_scheduler_queue() {
    let max_update_count = with_config(|c| c.max_update_count);
    SCHEDULER.with(|state| {
        let mut state = state.borrow_mut();
        state.flushing = true;
        state.queue.sort_by_key(|w| w.id());
    });

    loop {
        let next = SCHEDULER.with(|state| {
            let mut state = state.borrow_mut();
            if state.index < state.queue.len() {
                let watcher = state.queue[state.index].clone();
                state.index += 1;
                Some(watcher)
            } else {
                None
            }
        });
        let Some(watcher) = next else { break };
        let id = watcher.id();

        watcher.call_before();
        SCHEDULER.with(|state| {
            state.borrow_mut().has.remove(&id);
        });
        watcher.run();

        // The run may have re-enqueued the same watcher; count it and
        // abort the flush past the configured threshold.
        let runaway = SCHEDULER.with(|state| {
            let mut state = state.borrow_mut();
            if state.has.contains(&id) {
                let count = state.circular.entry(id).or_insert(0);
                *count += 1;
                *count > max_update_count
            } else {
                false
            }
        });
        if runaway {
            crate::config::dev_warn(&format!(
                "aborting update flush: watcher {id} re-enqueued itself more than \
                 {max_update_count} times (likely an infinite update loop)"
            ));
            break;
        }
    }

    // Snapshot what ran, then reset all scheduler state before firing
    // post-flush hooks (the hooks may schedule new work).
    let ran = SCHEDULER.with(|state| {
        let mut state = state.borrow_mut();
        let ran = std::mem::take(&mut state.queue);
        state.has.clear();
        state.circular.clear();
        state.index = 0;
        state.waiting = false;
        state.flushing = false;
        ran
    });

    for watcher in &ran {
        watcher.call_after();
    }
    let activated = ACTIVATED.with(|activated| std::mem::take(&mut *activated.borrow_mut()));
    for cb in activated {
        cb();
    }
}

/// Drop all scheduler state (test isolation).
pub fn reset_scheduler() {
    SCHEDULER.with(|state| *state.borrow_mut() = SchedulerState::default());
    TICKS.with(|ticks| ticks.borrow_mut().clear());
    ACTIVATED.with(|activated| activated.borrow_mut().clear());
    PUMPING.with(|p| p.set(false));
}
