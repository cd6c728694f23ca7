// SPDX-License-Identifier: MIT
//
// QKD Entropy Engine
// Quantum key material as a random-byte source

//! Error types for the QKD entropy engine
//!
//! Provides a unified error taxonomy using `thiserror` for ergonomic error handling.

pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for engine operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Endpoint missing or configuration value invalid
    #[error("Configuration error: {0}")]
    Config(String),

    /// Network communication failed (connection, timeout)
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-success HTTP status, or an expected response field absent/malformed
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The service returned a zero-length key block
    #[error("Service returned an empty key block")]
    EmptyKey,

    /// An operation requiring a session handle ran before open
    #[error("Not connected to the key service")]
    NotConnected,
}

impl Error {
    /// Check if error is transient and worth retrying at the caller level.
    ///
    /// Only transport-level failures qualify; protocol and configuration
    /// errors are deterministic and retrying them cannot help.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Transport(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(!Error::Config("no url".to_string()).is_retryable());
        assert!(!Error::Protocol("HTTP 500".to_string()).is_retryable());
        assert!(!Error::EmptyKey.is_retryable());
        assert!(!Error::NotConnected.is_retryable());
    }

    #[test]
    fn test_display() {
        let e = Error::Protocol("missing field 'key_handle'".to_string());
        assert_eq!(e.to_string(), "Protocol error: missing field 'key_handle'");
        assert_eq!(
            Error::NotConnected.to_string(),
            "Not connected to the key service"
        );
    }
}
