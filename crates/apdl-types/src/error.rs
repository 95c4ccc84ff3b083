//! Error types for APDL
//!
//! Every failure is surfaced to the caller with a readable diagnostic.
//! Nothing is retried internally and nothing is swallowed.

use thiserror::Error;

/// Result type for APDL operations
pub type Result<T> = std::result::Result<T, ApdlError>;

/// APDL error types
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApdlError {
    // ========================================================================
    // Validation Errors
    // ========================================================================

    /// Wrong number of arguments for an operation
    #[error("Incorrect number of arguments for {operation}: expected {expected}, got {got}")]
    ArgumentCount {
        operation: String,
        expected: usize,
        got: usize,
    },

    /// Argument could not be parsed
    #[error("Invalid {field} '{value}': {reason}")]
    ArgumentFormat {
        field: String,
        value: String,
        reason: String,
    },

    /// Expiry date not strictly in the future
    #[error("Invalid (past) time passed: {expiry}. Time now: {now}")]
    PastExpiry { expiry: String, now: String },

    /// Operation name not recognised by the dispatcher
    #[error("Unknown operation: {name}")]
    UnknownOperation { name: String },

    // ========================================================================
    // Storage Errors
    // ========================================================================

    /// Read from the ledger store failed
    #[error("Failed to read state '{key}': {message}")]
    StorageRead { key: String, message: String },

    /// Write to the ledger store failed
    #[error("Failed to write state '{key}': {message}")]
    StorageWrite { key: String, message: String },

    /// Stored record could not be encoded or decoded
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// No agreement record has been initialized
    #[error("Agreement record '{key}' has not been initialized")]
    NotInitialized { key: String },

    // ========================================================================
    // Protocol Errors
    // ========================================================================

    /// Operation not allowed in the current status
    #[error("Invalid status for {operation}. Current status: {status}")]
    InvalidStateTransition { operation: String, status: String },

    /// Dual-signature gate rejected the attestation
    #[error("Signature verification failed. Penalty not applied. comparisons: {comparisons}")]
    SignatureVerification { comparisons: String },

    /// Refund attempted before the expiry instant
    #[error("APDL contract not yet expired (expiry {expiry})")]
    NotYetExpired { expiry: String },

    /// Balance arithmetic left the i64 range
    #[error("Balance overflow for {key}")]
    BalanceOverflow { key: String },
}

impl ApdlError {
    /// Create an argument format error
    pub fn argument_format(
        field: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::ArgumentFormat {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid state transition error
    pub fn invalid_transition(operation: impl Into<String>, status: impl ToString) -> Self {
        Self::InvalidStateTransition {
            operation: operation.into(),
            status: status.to_string(),
        }
    }

    /// Whether the error was raised before any state was read or written
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::ArgumentCount { .. }
                | Self::ArgumentFormat { .. }
                | Self::PastExpiry { .. }
                | Self::UnknownOperation { .. }
        )
    }

    /// Get an error code for responses
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::ArgumentCount { .. } => "ARGUMENT_COUNT",
            Self::ArgumentFormat { .. } => "ARGUMENT_FORMAT",
            Self::PastExpiry { .. } => "PAST_EXPIRY",
            Self::UnknownOperation { .. } => "UNKNOWN_OPERATION",
            Self::StorageRead { .. } => "STORAGE_READ",
            Self::StorageWrite { .. } => "STORAGE_WRITE",
            Self::Serialization { .. } => "SERIALIZATION",
            Self::NotInitialized { .. } => "NOT_INITIALIZED",
            Self::InvalidStateTransition { .. } => "INVALID_STATE_TRANSITION",
            Self::SignatureVerification { .. } => "SIGNATURE_VERIFICATION",
            Self::NotYetExpired { .. } => "NOT_YET_EXPIRED",
            Self::BalanceOverflow { .. } => "BALANCE_OVERFLOW",
        }
    }
}

impl From<serde_json::Error> for ApdlError {
    fn from(e: serde_json::Error) -> Self {
        ApdlError::Serialization {
            message: e.to_string(),
        }
    }
}
