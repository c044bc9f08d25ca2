//! Error types for the decision runner.
//!
//! These errors stay inside the runner: the queue converts every terminal
//! failure into a fallback decision before anything reaches the engine.

/// Errors from provider calls and response handling.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// The provider returned an error or was unreachable.
    #[error("provider error: {0}")]
    Provider(String),

    /// The response could not be parsed into a valid decision.
    #[error("response parse error: {0}")]
    Parse(String),

    /// The per-call deadline was exceeded.
    #[error("timeout: provider call exceeded deadline")]
    Timeout,

    /// Serialization failure building the request payload.
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
}
