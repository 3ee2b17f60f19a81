//! Runtime configuration
//!
//! Process-wide knobs for the reactive runtime, read through accessor
//! functions. The scheduler consults `async_flush` and
//! `max_update_count`; diagnostics go through `dev_warnings`; trapped
//! errors route through the optional error handler.

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::RuntimeError;

/// Handler receiving trapped errors along with a short context tag.
pub type ErrorHandler = Rc<dyn Fn(&RuntimeError, &str)>;

pub struct RuntimeConfig {
    /// When false, `queue_watcher` flushes synchronously instead of
    /// deferring to the next tick. Intended for tests.
    pub async_flush: bool,
    /// Emit development warnings (bad watch paths, frozen writes,
    /// update-loop aborts).
    pub dev_warnings: bool,
    /// How many times a single watcher may re-enter one flush before the
    /// flush is aborted as a runaway update loop.
    pub max_update_count: u32,
    /// Global sink for errors trapped in user getters, callbacks and
    /// lifecycle hooks. Defaults to logging via `tracing::error!`.
    pub error_handler: Option<ErrorHandler>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            async_flush: true,
            dev_warnings: true,
            max_update_count: 100,
            error_handler: None,
        }
    }
}

thread_local! {
    static CONFIG: RefCell<RuntimeConfig> = RefCell::new(RuntimeConfig::default());
}

/// Mutate the runtime configuration.
pub fn configure(f: impl FnOnce(&mut RuntimeConfig)) {
    CONFIG.with(|config| f(&mut config.borrow_mut()));
}

/// Reset the configuration to defaults (test isolation).
pub fn reset_config() {
    CONFIG.with(|config| *config.borrow_mut() = RuntimeConfig::default());
}

pub(crate) fn with_config<R>(f: impl FnOnce(&RuntimeConfig) -> R) -> R {
    CONFIG.with(|config| f(&config.borrow()))
}

/// Emit a development warning, honoring the `dev_warnings` switch.
pub fn dev_warn(message: &str) {
    if with_config(|c| c.dev_warnings) {
        tracing::warn!("{message}");
    }
}
