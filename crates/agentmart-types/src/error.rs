//! Error types for agentmart
//!
//! The processor never lets a failure escape without the request reaching a
//! terminal status; callers always receive one of these typed errors, never a
//! raw fault.

use crate::RequestStatus;
use thiserror::Error;

/// Result type for agentmart operations
pub type Result<T> = std::result::Result<T, MartError>;

/// Agentmart error types
#[derive(Debug, Clone, Error)]
pub enum MartError {
    // ========================================================================
    // Amount Errors
    // ========================================================================

    /// Amount overflow during arithmetic
    #[error("Amount overflow during arithmetic operation")]
    AmountOverflow,

    /// Amount underflow during arithmetic
    #[error("Amount underflow during arithmetic operation")]
    AmountUnderflow,

    /// Currency mismatch
    #[error("Currency mismatch: expected {expected}, got {actual}")]
    CurrencyMismatch { expected: String, actual: String },

    /// Invalid amount
    #[error("Invalid amount: {message}")]
    InvalidAmount { message: String },

    // ========================================================================
    // Catalog Errors
    // ========================================================================

    /// No active listing for the slug
    #[error("No active agent listed under slug '{slug}'")]
    AgentNotFound { slug: String },

    /// Slug failed validation
    #[error("Invalid agent slug '{slug}': {reason}")]
    InvalidSlug { slug: String, reason: String },

    /// Listing does not keep per-session conversation state
    #[error("Agent '{slug}' does not support multi-turn sessions")]
    NotConversational { slug: String },

    // ========================================================================
    // Wallet Errors
    // ========================================================================

    /// Account has no ledger history
    #[error("Account {account} not found in wallet ledger")]
    WalletNotFound { account: String },

    /// Insufficient balance
    #[error("Insufficient balance for {account}: requested {requested}, available {available}")]
    InsufficientBalance {
        account: String,
        requested: f64,
        available: f64,
    },

    // ========================================================================
    // Lifecycle Errors
    // ========================================================================

    /// Request not found
    #[error("Request {request_id} not found")]
    RequestNotFound { request_id: String },

    /// Request already reached a terminal status
    #[error("Request {request_id} is already terminal ({status})")]
    AlreadyTerminal {
        request_id: String,
        status: RequestStatus,
    },

    /// Status change outside the transition table
    #[error("Illegal status transition: {from} -> {to}")]
    IllegalTransition {
        from: RequestStatus,
        to: RequestStatus,
    },

    // ========================================================================
    // External Collaborator Errors
    // ========================================================================

    /// External service failed (transient; caller may try again later)
    #[error("External service error: {message}")]
    ExternalService { message: String },

    /// Reply from the external service was missing required fields
    #[error("Malformed reply from external service: {message}")]
    MalformedReply { message: String },

    // ========================================================================
    // General Errors
    // ========================================================================

    /// Internal error
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl MartError {
    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Create an external service error
    pub fn external(message: impl Into<String>) -> Self {
        Self::ExternalService {
            message: message.into(),
        }
    }

    /// Create a malformed reply error
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedReply {
            message: message.into(),
        }
    }

    /// Check if this is a retriable error
    pub fn is_retriable(&self) -> bool {
        matches!(self, Self::ExternalService { .. } | Self::Internal { .. })
    }

    /// Check if this is a user-correctable error (not a system fault)
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::AgentNotFound { .. }
                | Self::InvalidSlug { .. }
                | Self::NotConversational { .. }
                | Self::InsufficientBalance { .. }
        )
    }

    /// Get an error code for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::AmountOverflow => "AMOUNT_OVERFLOW",
            Self::AmountUnderflow => "AMOUNT_UNDERFLOW",
            Self::CurrencyMismatch { .. } => "CURRENCY_MISMATCH",
            Self::InvalidAmount { .. } => "INVALID_AMOUNT",
            Self::AgentNotFound { .. } => "AGENT_NOT_FOUND",
            Self::InvalidSlug { .. } => "INVALID_SLUG",
            Self::NotConversational { .. } => "NOT_CONVERSATIONAL",
            Self::WalletNotFound { .. } => "WALLET_NOT_FOUND",
            Self::InsufficientBalance { .. } => "INSUFFICIENT_BALANCE",
            Self::RequestNotFound { .. } => "REQUEST_NOT_FOUND",
            Self::AlreadyTerminal { .. } => "ALREADY_TERMINAL",
            Self::IllegalTransition { .. } => "ILLEGAL_TRANSITION",
            Self::ExternalService { .. } => "EXTERNAL_SERVICE_ERROR",
            Self::MalformedReply { .. } => "MALFORMED_REPLY",
            Self::Internal { .. } => "INTERNAL_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = MartError::InsufficientBalance {
            account: "test".to_string(),
            requested: 100.0,
            available: 50.0,
        };
        assert_eq!(err.error_code(), "INSUFFICIENT_BALANCE");
    }

    #[test]
    fn test_retriable_errors() {
        assert!(MartError::external("upstream 503").is_retriable());
        assert!(MartError::internal("oops").is_retriable());
        assert!(!MartError::malformed("no success field").is_retriable());
    }

    #[test]
    fn test_user_errors() {
        let not_found = MartError::AgentNotFound {
            slug: "summarizer".to_string(),
        };
        assert!(not_found.is_user_error());
        assert!(!MartError::internal("oops").is_user_error());
    }
}
