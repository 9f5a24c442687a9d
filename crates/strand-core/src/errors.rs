//! Unified error type for strand
//!
//! Every failure the sync core can report is data, not control flow: errors are
//! recorded on a merge context and travel back to the requester inside the
//! terminal acknowledgment, so they have to survive a round trip through the
//! wire format.

use serde::{Deserialize, Serialize};

/// Error type shared by all strand crates
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SyncError {
    /// Malformed put batch or a value the validator rejected
    #[error("Validation failed: {message}")]
    Validation {
        /// Which soul/field was rejected and why
        message: String,
    },

    /// A peer or storage adapter reported failure for a sub-acknowledgment
    #[error("Remote acknowledgment error: {message}")]
    RemoteAck {
        /// Error text reported by the remote side
        message: String,
    },

    /// Encoding or decoding a wire message failed
    #[error("Serialization error: {message}")]
    Serialization {
        /// Error message describing the serialization failure
        message: String,
    },

    /// Configuration could not be loaded or is inconsistent
    #[error("Invalid configuration: {message}")]
    Config {
        /// Error message describing the configuration issue
        message: String,
    },

    /// Internal invariant violation
    #[error("Internal error: {message}")]
    Internal {
        /// Error message describing the internal error
        message: String,
    },
}

impl SyncError {
    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a remote acknowledgment error
    pub fn remote_ack(message: impl Into<String>) -> Self {
        Self::RemoteAck {
            message: message.into(),
        }
    }

    /// Create a serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Stable numeric code, unique per variant
    pub fn code(&self) -> u16 {
        match self {
            Self::Validation { .. } => 100,
            Self::RemoteAck { .. } => 200,
            Self::Serialization { .. } => 300,
            Self::Config { .. } => 400,
            Self::Internal { .. } => 500,
        }
    }
}

/// Standard Result type for strand operations
pub type Result<T> = std::result::Result<T, SyncError>;

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(err.to_string())
    }
}

impl From<toml::de::Error> for SyncError {
    fn from(err: toml::de::Error) -> Self {
        Self::config(err.to_string())
    }
}

impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        Self::internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = SyncError::validation("no state");
        assert!(matches!(err, SyncError::Validation { .. }));
        assert_eq!(err.to_string(), "Validation failed: no state");
    }

    #[test]
    fn test_error_codes_are_unique() {
        let errors = [
            SyncError::validation("a"),
            SyncError::remote_ack("b"),
            SyncError::serialization("c"),
            SyncError::config("d"),
            SyncError::internal("e"),
        ];
        let codes: std::collections::HashSet<_> = errors.iter().map(SyncError::code).collect();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn test_error_survives_json() {
        let err = SyncError::remote_ack("disk full");
        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("\"kind\":\"remote_ack\""));
        let back: SyncError = serde_json::from_str(&json).unwrap();
        assert_eq!(back, err);
    }
}
