use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("invalid watch path `{0}`")]
    BadPath(String),

    #[error("render error: {0}")]
    Render(String),

    #[error("watcher callback error: {0}")]
    Callback(String),

    #[error("lifecycle hook error: {0}")]
    Hook(String),

    #[error("{0}")]
    Custom(String),
}

/// Route a trapped error to the configured handler, falling back to the
/// log. Trapping sites tag the error with where it came from so
/// integrators can triage without a backtrace.
pub fn handle_error(err: &RuntimeError, context: &str) {
    let handler = crate::config::with_config(|c| c.error_handler.clone());
    match handler {
        Some(handler) => handler(err, context),
        None => tracing::error!("error in {context}: {err}"),
    }
}
