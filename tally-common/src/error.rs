//tally-common/src/error.rs
//! Standardized error types for all Tally components

use thiserror::Error;

/// Standard result type used throughout Tally
pub type TokenResult<T> = std::result::Result<T, TokenError>;

/// Comprehensive error type for all ledger operations.
///
/// Every core variant aborts the enclosing operation with no partial state
/// change; callers resubmit a corrected operation rather than retry.
#[derive(Error, Debug)]
pub enum TokenError {
    // Capability/feature gate failed
    #[error("not authorized: {0}")]
    Authorization(String),

    // Identity misuse
    #[error("invalid recipient")]
    InvalidRecipient,

    #[error("invalid source")]
    InvalidSource,

    #[error("invalid spender")]
    InvalidSpender,

    // Insufficient funds or permission for the requested movement
    #[error("insufficient balance")]
    InsufficientBalance,

    #[error("allowance exceeded")]
    AllowanceExceeded,

    // Arithmetic and domain bounds
    #[error("arithmetic overflow")]
    Overflow,

    #[error("arithmetic underflow")]
    Underflow,

    #[error("supply ceiling exceeded")]
    SupplyCeilingExceeded,

    #[error("zero value")]
    ZeroValue,

    // Authorization-flow failures
    #[error("invalid signature")]
    InvalidSignature,

    #[error("signature expired")]
    SignatureExpired,

    #[error("authorization not yet valid")]
    NotYetValid,

    #[error("nonce already used")]
    NonceReused,

    #[error("access denied: {0}")]
    AccessDenied(String),

    // External receiver/spender capability declined or misbehaved
    #[error("callback rejected: {0}")]
    CallbackRejected(String),

    // Ambient errors
    #[error("database error: {0}")]
    Database(#[from] rocksdb::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl TokenError {
    /// Create a new authorization error
    pub fn authorization(msg: impl Into<String>) -> Self {
        Self::Authorization(msg.into())
    }

    /// Create a new access-denied error
    pub fn access_denied(msg: impl Into<String>) -> Self {
        Self::AccessDenied(msg.into())
    }

    /// Create a new callback-rejected error
    pub fn callback_rejected(msg: impl Into<String>) -> Self {
        Self::CallbackRejected(msg.into())
    }

    /// Create a new serialization error
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }

    /// Create a new validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a new config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
