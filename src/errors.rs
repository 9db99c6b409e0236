//! Unified error type for the storefront.
//!
//! Every core operation reports one of the user-facing kinds (`NotFound`,
//! `InvalidInput`, `PermissionDenied`, `InvalidState`, `Unauthenticated`) or an
//! internal failure wrapping the collaborator error that caused it.

use thiserror::Error;

/// Errors produced by storefront operations.
#[derive(Debug, Error)]
pub enum Error {
    /// A referenced entity does not exist (or is not visible to the caller)
    #[error("{entity} not found")]
    NotFound {
        /// Kind of entity, e.g. `"Product"`
        entity: &'static str,
        /// Identifier that failed to resolve
        id: String,
    },

    /// Missing or malformed request fields
    #[error("{message}")]
    InvalidInput {
        /// Human-readable explanation
        message: String,
    },

    /// Ownership or role mismatch
    #[error("{message}")]
    PermissionDenied {
        /// Human-readable explanation
        message: String,
    },

    /// Operation is illegal in the entity's current state
    #[error("{message}")]
    InvalidState {
        /// Human-readable explanation
        message: String,
    },

    /// Missing, unknown, or expired credentials
    #[error("{message}")]
    Unauthenticated {
        /// Human-readable explanation
        message: String,
    },

    /// Configuration could not be loaded
    #[error("Configuration error: {message}")]
    Config {
        /// Human-readable explanation
        message: String,
    },

    /// Password hashing or digest parsing failed
    #[error("Password hashing error: {message}")]
    PasswordHash {
        /// Human-readable explanation
        message: String,
    },

    /// Persistence failure
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// I/O failure (binding sockets, reading files)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Builds a `NotFound` error for the given entity kind and id.
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Builds an `InvalidInput` error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Builds a `PermissionDenied` error.
    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::PermissionDenied {
            message: message.into(),
        }
    }

    /// Builds an `InvalidState` error.
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    /// Builds an `Unauthenticated` error.
    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::Unauthenticated {
            message: message.into(),
        }
    }

    /// True for failures whose detail must stay with operators.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(
            self,
            Self::Config { .. } | Self::PasswordHash { .. } | Self::Database(_) | Self::Io(_)
        )
    }
}

impl From<argon2::password_hash::Error> for Error {
    fn from(err: argon2::password_hash::Error) -> Self {
        Self::PasswordHash {
            message: err.to_string(),
        }
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message_hides_id() {
        let err = Error::not_found("Product", 42);
        assert_eq!(err.to_string(), "Product not found");
        assert!(matches!(err, Error::NotFound { entity: "Product", ref id } if id == "42"));
    }

    #[test]
    fn test_internal_classification() {
        assert!(Error::Database(sea_orm::DbErr::Custom("boom".to_string())).is_internal());
        assert!(!Error::invalid_state("nope").is_internal());
        assert!(!Error::unauthenticated("who").is_internal());
    }
}
