//! Error types for page interactions

use thiserror::Error;

/// Failures raised by the interaction layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ActionError {
    /// Navigation or reload did not complete
    #[error("Navigation timeout: {0}")]
    NavTimeout(String),

    /// Wait operation timed out
    #[error("Wait timeout: {0}")]
    WaitTimeout(String),

    /// Element anchor could not be resolved
    #[error("Anchor not found: {0}")]
    AnchorNotFound(String),

    /// Dropdown option was not found
    #[error("Option not found in dropdown: {0}")]
    OptionNotFound(String),

    /// CDP communication or protocol error
    #[error("CDP I/O error: {0}")]
    CdpIo(String),

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ActionError {
    /// Absence of an element rather than a failure of the interaction layer.
    pub fn is_absence(&self) -> bool {
        matches!(
            self,
            ActionError::AnchorNotFound(_) | ActionError::WaitTimeout(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absence_covers_lookup_misses_only() {
        assert!(ActionError::AnchorNotFound("x".into()).is_absence());
        assert!(ActionError::WaitTimeout("x".into()).is_absence());
        assert!(!ActionError::CdpIo("socket closed".into()).is_absence());
        assert!(!ActionError::NavTimeout("x".into()).is_absence());
    }
}
