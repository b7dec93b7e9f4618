//! Flow error types
//!
//! Step failures are not errors here: they become `Failed` transitions and
//! the flow restarts. A `FlowError` ends a participant's run.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FlowError {
    /// The run's cancellation token fired
    #[error("Flow cancelled")]
    Cancelled,

    /// An injected test/harness bound ran out
    #[error("{what} bound of {limit} exhausted")]
    BoundExhausted { what: &'static str, limit: u32 },

    /// Opening or closing an isolated browser context failed
    #[error("Browser context error: {0}")]
    Context(String),

    /// The alarm could not be signalled
    #[error("Alarm error: {0}")]
    Alarm(String),
}

impl FlowError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, FlowError::Cancelled)
    }
}
