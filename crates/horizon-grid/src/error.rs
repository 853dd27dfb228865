//! Error types for the grid engine.

/// Result type alias for grid operations.
pub type Result<T> = std::result::Result<T, GridError>;

/// Errors surfaced to callers of the grid engine.
///
/// Stale fetch results and coalesced requests are not errors; they are
/// recovered inside the data communicator and only logged.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GridError {
    /// Two settings cannot be active together, or a setting is invalid.
    #[error("Configuration conflict: {0}")]
    ConfigurationConflict(String),

    /// The operation is not available for the bound source or selection mode.
    #[error("Unsupported operation '{operation}': {reason}")]
    Unsupported {
        operation: &'static str,
        reason: String,
    },

    /// A single range request is larger than the maximum transfer size.
    #[error("Requested range of {requested} items exceeds the maximum of {max}")]
    RangeTooLarge { requested: usize, max: usize },

    /// The item, key or index does not resolve to an element.
    #[error("No such element: {0}")]
    NotFound(String),

    /// An argument violates the operation's contract.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl GridError {
    /// Create a configuration conflict error.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::ConfigurationConflict(message.into())
    }

    /// Create an unsupported-operation error.
    pub fn unsupported(operation: &'static str, reason: impl Into<String>) -> Self {
        Self::Unsupported {
            operation,
            reason: reason.into(),
        }
    }

    /// Create a not-found error.
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    /// Returns `true` for [`GridError::Unsupported`], so callers can branch on capability.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = GridError::RangeTooLarge {
            requested: 600,
            max: 500,
        };
        assert_eq!(
            err.to_string(),
            "Requested range of 600 items exceeds the maximum of 500"
        );

        let err = GridError::unsupported("scroll_to_item", "source has no index provider");
        assert!(err.is_unsupported());
        assert!(err.to_string().contains("scroll_to_item"));
    }
}
