//! Error types for the MotorDB index engine.

use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in MotorDB core operations.
///
/// Lookup and delete misses are not errors: they surface as `None` and
/// `false`. Errors are reserved for rejected construction parameters and
/// failed structural self-checks.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Tree order below the structural minimum.
    #[error("invalid tree order {order}: must be at least {min}")]
    InvalidOrder {
        /// The rejected order.
        order: usize,
        /// Smallest accepted order.
        min: usize,
    },

    /// Hash table capacity of zero.
    #[error("invalid hash capacity {capacity}: must be at least 1")]
    InvalidCapacity {
        /// The rejected capacity.
        capacity: usize,
    },

    /// Configuration could not be interpreted.
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// Description of the problem.
        message: String,
    },

    /// An index structure failed its invariant check.
    #[error("index corruption: {message}")]
    Corruption {
        /// Description of the violated invariant.
        message: String,
    },
}

impl CoreError {
    /// Creates an invalid order error.
    pub fn invalid_order(order: usize, min: usize) -> Self {
        Self::InvalidOrder { order, min }
    }

    /// Creates an invalid capacity error.
    pub fn invalid_capacity(capacity: usize) -> Self {
        Self::InvalidCapacity { capacity }
    }

    /// Creates an invalid configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Creates a corruption error.
    pub fn corruption(message: impl Into<String>) -> Self {
        Self::Corruption {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        assert_eq!(
            CoreError::invalid_order(1, 2).to_string(),
            "invalid tree order 1: must be at least 2"
        );
        assert_eq!(
            CoreError::invalid_capacity(0).to_string(),
            "invalid hash capacity 0: must be at least 1"
        );
        assert_eq!(
            CoreError::corruption("leaf chain cycle").to_string(),
            "index corruption: leaf chain cycle"
        );
    }
}
