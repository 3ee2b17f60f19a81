//! Component event bus
//!
//! Per-instance publish/subscribe used by `$on`/`$emit` and by the
//! listeners a parent binds on a child placeholder.

use std::rc::Rc;

use rustc_hash::FxHashMap;

use vireo_core::Value;

/// Handler registered on the bus. The payload is whatever the emitter
/// passes along.
pub type BusHandler = Rc<dyn Fn(&Value)>;

struct BusEntry {
    handler: BusHandler,
    once: bool,
}

/// Dispatches component events to registered handlers.
#[derive(Default)]
pub struct EventBus {
    handlers: FxHashMap<Rc<str>, Vec<BusEntry>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(&mut self, event: impl Into<Rc<str>>, handler: BusHandler) {
        self.handlers
            .entry(event.into())
            .or_default()
            .push(BusEntry {
                handler,
                once: false,
            });
    }

    pub fn once(&mut self, event: impl Into<Rc<str>>, handler: BusHandler) {
        self.handlers
            .entry(event.into())
            .or_default()
            .push(BusEntry {
                handler,
                once: true,
            });
    }

    /// Remove one handler (by handle identity) from an event.
    pub fn off_handler(&mut self, event: &str, handler: &BusHandler) {
        if let Some(entries) = self.handlers.get_mut(event) {
            entries.retain(|e| !Rc::ptr_eq(&e.handler, handler));
        }
    }

    /// Remove every handler for an event.
    pub fn off_event(&mut self, event: &str) {
        self.handlers.remove(event);
    }

    /// Remove everything.
    pub fn off_all(&mut self) {
        self.handlers.clear();
    }

    /// Collect the handlers to fire for an event, consuming `once`
    /// entries. Callers invoke the result outside any borrow, since a
    /// handler may re-enter the bus.
    pub fn take_handlers(&mut self, event: &str) -> Vec<BusHandler> {
        let Some(entries) = self.handlers.get_mut(event) else {
            return Vec::new();
        };
        let fired: Vec<BusHandler> = entries.iter().map(|e| e.handler.clone()).collect();
        entries.retain(|e| !e.once);
        fired
    }

    pub fn handler_count(&self, event: &str) -> usize {
        self.handlers.get(event).map(|e| e.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_on_and_take() {
        let mut bus = EventBus::new();
        let count = Rc::new(Cell::new(0));
        let count_inner = count.clone();
        bus.on("ping", Rc::new(move |_| count_inner.set(count_inner.get() + 1)));

        for handler in bus.take_handlers("ping") {
            handler(&Value::Null);
        }
        for handler in bus.take_handlers("ping") {
            handler(&Value::Null);
        }
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn test_once_fires_one_time() {
        let mut bus = EventBus::new();
        let count = Rc::new(Cell::new(0));
        let count_inner = count.clone();
        bus.once("ping", Rc::new(move |_| count_inner.set(count_inner.get() + 1)));

        for handler in bus.take_handlers("ping") {
            handler(&Value::Null);
        }
        assert_eq!(bus.handler_count("ping"), 0);
        for handler in bus.take_handlers("ping") {
            handler(&Value::Null);
        }
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_off_handler_by_identity() {
        let mut bus = EventBus::new();
        let a: BusHandler = Rc::new(|_| {});
        let b: BusHandler = Rc::new(|_| {});
        bus.on("e", a.clone());
        bus.on("e", b);
        bus.off_handler("e", &a);
        assert_eq!(bus.handler_count("e"), 1);
    }
}
