//! Error types for pad table recovery.
//!
//! Only genuinely malformed input is an error here. A scan that finds
//! nothing, or finds no physical table, is an ordinary outcome and is
//! reported through [`crate::RecoveryOutcome`] instead.

use thiserror::Error;

/// Primary error type for padscan.
#[derive(Debug, Error)]
pub enum RecoveryError {
    /// IO error during file operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A register window was too short to hold DW0 and DW1.
    #[error("Insufficient data: expected at least {expected} bytes, got {actual}")]
    InsufficientData { expected: usize, actual: usize },

    /// The pad mode nibble (DW0[13:10]) holds a value outside 0..=7.
    #[error("Invalid pad mode {mode} (DW0[13:10] must be 0..=7)")]
    InvalidMode { mode: u8 },

    /// The ground-truth oracle could not be read or parsed.
    #[error("Oracle unavailable: {message}")]
    OracleUnavailable { message: String },

    /// The hint artifact could not be read or parsed.
    #[error("Hints unavailable: {message}")]
    HintsUnavailable { message: String },

    /// Configuration error.
    #[error("Configuration error: {message}")]
    ConfigError { message: String },
}

/// Result type alias for recovery operations.
pub type Result<T> = std::result::Result<T, RecoveryError>;

/// Extension trait for adding context to errors.
pub trait ResultExt<T> {
    /// Add context to an error, reporting it as an oracle failure.
    fn oracle_context(self, msg: impl Into<String>) -> Result<T>;
}

impl<T, E: std::fmt::Display> ResultExt<T> for std::result::Result<T, E> {
    fn oracle_context(self, msg: impl Into<String>) -> Result<T> {
        self.map_err(|e| RecoveryError::OracleUnavailable {
            message: format!("{}: {}", msg.into(), e),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RecoveryError::InsufficientData {
            expected: 8,
            actual: 3,
        };
        assert!(err.to_string().contains('8'));
        assert!(err.to_string().contains('3'));
    }

    #[test]
    fn test_invalid_mode_display() {
        let err = RecoveryError::InvalidMode { mode: 12 };
        assert!(err.to_string().contains("12"));
    }

    #[test]
    fn test_oracle_context() {
        let raw: std::result::Result<(), &str> = Err("bad line");
        let err = raw.oracle_context("gpio.h").unwrap_err();
        assert!(matches!(err, RecoveryError::OracleUnavailable { .. }));
        assert!(err.to_string().contains("gpio.h: bad line"));
    }
}
