//! Vireo Core Runtime
//!
//! This crate provides the reactive foundation of the Vireo view runtime:
//!
//! - **Observed Values**: Deep observation of record/list data trees;
//!   reads register dependencies, writes notify them
//! - **Watchers**: Re-evaluable computations bound to the exact set of
//!   reactive properties their last run touched
//! - **Scheduler**: Batched, id-ordered asynchronous flushes with a
//!   runaway-loop guard and a next-tick queue
//!
//! # Example
//!
//! ```rust
//! use vireo_core::{observe, run_ticks, Record, Value, Watcher, WatcherOptions};
//!
//! let data = Record::new().with("count", 0);
//! observe(&Value::Record(data.clone()));
//!
//! // Watch `count`; the getter's reads define the subscription set.
//! let source = data.clone();
//! let watcher = Watcher::new(
//!     Box::new(move || Ok(source.get("count"))),
//!     Some(Box::new(|new, old| {
//!         println!("count: {old:?} -> {new:?}");
//!         Ok(())
//!     })),
//!     WatcherOptions::default(),
//! );
//!
//! data.assign("count", 1); // enqueues the watcher
//! run_ticks();             // flushes the batch
//! assert_eq!(watcher.value().as_int(), Some(1));
//! ```

pub mod config;
pub mod dep;
pub mod error;
pub mod observer;
pub mod scheduler;
pub mod value;
pub mod watcher;

pub use config::{configure, reset_config, RuntimeConfig};
pub use dep::{active_watcher, has_active_watcher, untracked, Dep};
pub use error::{handle_error, RuntimeError};
pub use observer::{
    define_reactive, del, observe, set, without_observation, ContainerKey, Observer,
};
pub use scheduler::{
    has_pending_ticks, next_tick, queue_activated, queue_watcher, reset_scheduler, run_ticks,
};
pub use value::{List, Record, Value};
pub use watcher::{
    noop_getter, parse_path, path_getter, traverse, Getter, WatchCallback, Watcher,
    WatcherOptions,
};
