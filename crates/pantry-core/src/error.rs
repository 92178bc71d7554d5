//! Error types for the pantry system.

use thiserror::Error;

/// Result type alias using PantryError.
pub type Result<T> = std::result::Result<T, PantryError>;

/// Errors that can occur in the pantry system.
#[derive(Error, Debug)]
pub enum PantryError {
    /// Referenced record not found.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: i64 },

    /// Case-insensitive name collision on insert or rename.
    #[error("An item named '{name}' already exists")]
    DuplicateName { name: String },

    /// Zero or negative quantity where a positive denominator is required.
    #[error("Invalid quantity: {quantity}")]
    InvalidQuantity { quantity: f64 },

    /// Delete blocked because other records still reference the target.
    #[error("{entity} {id} is still referenced and cannot be deleted")]
    ReferentialConflict { entity: &'static str, id: i64 },

    /// Storage engine failure (I/O, lock, constraint). Retryable by callers.
    #[error("Storage error: {message}")]
    Storage { message: String },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl PantryError {
    /// Create a not-found error.
    pub fn not_found(entity: &'static str, id: i64) -> Self {
        Self::NotFound { entity, id }
    }

    /// Create a duplicate-name error.
    pub fn duplicate_name(name: impl Into<String>) -> Self {
        Self::DuplicateName { name: name.into() }
    }

    /// Create an invalid-quantity error.
    pub fn invalid_quantity(quantity: f64) -> Self {
        Self::InvalidQuantity { quantity }
    }

    /// Create a storage error.
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Get the error code for bridge responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NOT_FOUND",
            Self::DuplicateName { .. } => "DUPLICATE_NAME",
            Self::InvalidQuantity { .. } => "INVALID_QUANTITY",
            Self::ReferentialConflict { .. } => "REFERENTIAL_CONFLICT",
            Self::Storage { .. } => "STORAGE_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
            Self::Config { .. } => "CONFIG_ERROR",
        }
    }

    /// Whether a caller may reasonably retry the failed operation.
    ///
    /// Only engine-level failures (busy database, transient I/O) qualify;
    /// the domain errors will fail the same way every time.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage { .. } | Self::Io(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PantryError::duplicate_name("Rice");
        assert!(err.to_string().contains("Rice"));

        let err = PantryError::not_found("inventory item", 42);
        assert!(err.to_string().contains("42"));
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(
            PantryError::duplicate_name("x").error_code(),
            "DUPLICATE_NAME"
        );
        assert_eq!(
            PantryError::invalid_quantity(0.0).error_code(),
            "INVALID_QUANTITY"
        );
        assert_eq!(PantryError::storage("locked").error_code(), "STORAGE_ERROR");
    }

    #[test]
    fn test_retryable() {
        assert!(PantryError::storage("database is locked").is_retryable());
        assert!(!PantryError::duplicate_name("x").is_retryable());
        assert!(!PantryError::invalid_quantity(-1.0).is_retryable());
    }
}
