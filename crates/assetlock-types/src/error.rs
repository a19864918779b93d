//! Error types for the AssetLock engine.
//!
//! All errors use the `AL_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Ledger collaborator / binding errors
//! - 2xx: Agreement validation errors
//! - 3xx: Lock state errors
//! - 4xx: Authorization errors
//! - 5xx: Fungible balance errors
//! - 6xx: Mechanism / codec errors
//! - 7xx: Query errors
//! - 9xx: General / internal errors
//!
//! Every variant is a recoverable business failure; none abort the process.

use thiserror::Error;

use crate::LockMechanism;

/// Central error enum for all AssetLock operations.
#[derive(Debug, Error)]
pub enum AssetLockError {
    // =================================================================
    // Ledger Errors (1xx)
    // =================================================================
    /// No storage contract is bound yet.
    #[error("AL_ERR_100: Interop storage contract is not configured")]
    InteropNotConfigured,

    /// The storage collaborator rejected a delegated call.
    #[error("AL_ERR_101: Ledger call {function} failed: {reason}")]
    Ledger { function: String, reason: String },

    // =================================================================
    // Validation Errors (2xx)
    // =================================================================
    /// A required agreement or payload field is empty / zero.
    #[error("AL_ERR_200: Missing required field: {field}")]
    MissingField { field: &'static str },

    /// The agreement is well-formed but inconsistent (e.g. self-lock).
    #[error("AL_ERR_201: Invalid agreement: {reason}")]
    InvalidAgreement { reason: String },

    // =================================================================
    // Lock State Errors (3xx)
    // =================================================================
    #[error("AL_ERR_300: Asset {key} is already locked")]
    AlreadyLocked { key: String },

    #[error("AL_ERR_301: No lock found for {key}")]
    NotLocked { key: String },

    /// The lock's expiry has passed (or the requested expiry is not in the future).
    #[error("AL_ERR_302: Lock expired at {expiry_secs} (now {now_secs})")]
    Expired { expiry_secs: u64, now_secs: u64 },

    // =================================================================
    // Authorization Errors (4xx)
    // =================================================================
    #[error("AL_ERR_400: Unauthorized: {reason}")]
    Unauthorized { reason: String },

    // =================================================================
    // Balance Errors (5xx)
    // =================================================================
    #[error(
        "AL_ERR_500: Insufficient balance of {asset_type}: requested {requested}, unlocked {available}"
    )]
    InsufficientBalance {
        asset_type: String,
        requested: u64,
        available: u64,
    },

    /// No units were ever declared for this asset type.
    #[error("AL_ERR_501: Asset type {0} doesn't have a count declared")]
    UnknownAssetType(String),

    #[error("AL_ERR_502: Balance overflow for {asset_type}")]
    BalanceOverflow { asset_type: String },

    // =================================================================
    // Mechanism Errors (6xx)
    // =================================================================
    /// HTLC preimage does not hash to the stored digest.
    #[error("AL_ERR_600: Invalid hash preimage")]
    InvalidPreimage,

    /// The descriptor's mechanism doesn't match what was expected.
    #[error("AL_ERR_601: Unsupported lock mechanism: expected {expected}, got {actual}")]
    UnsupportedMechanism {
        expected: LockMechanism,
        actual: LockMechanism,
    },

    /// Payload encoding / decoding failed.
    #[error("AL_ERR_602: Codec error: {0}")]
    Codec(String),

    // =================================================================
    // Query Errors (7xx)
    // =================================================================
    #[error("AL_ERR_700: Invalid query: {reason}")]
    InvalidQuery { reason: String },

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    /// Registry invariant broken. Indicates a bug, not a bad request.
    #[error("AL_ERR_900: Internal error: {0}")]
    Internal(String),

    /// Configuration error (inconsistent bounds, zero caps, etc.).
    #[error("AL_ERR_902: Configuration error: {0}")]
    Configuration(String),
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, AssetLockError>;

impl From<serde_json::Error> for AssetLockError {
    fn from(err: serde_json::Error) -> Self {
        Self::Codec(err.to_string())
    }
}

impl AssetLockError {
    /// Shorthand for [`AssetLockError::Unauthorized`].
    pub fn unauthorized(reason: impl Into<String>) -> Self {
        Self::Unauthorized {
            reason: reason.into(),
        }
    }

    /// Shorthand for [`AssetLockError::InvalidAgreement`].
    pub fn invalid_agreement(reason: impl Into<String>) -> Self {
        Self::InvalidAgreement {
            reason: reason.into(),
        }
    }

    /// Shorthand for [`AssetLockError::InvalidQuery`].
    pub fn invalid_query(reason: impl Into<String>) -> Self {
        Self::InvalidQuery {
            reason: reason.into(),
        }
    }
}
