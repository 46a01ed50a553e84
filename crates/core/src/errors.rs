use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("bank name must not be empty")]
    EmptyBankName,
    #[error("unsupported flow type `{0}` (expected new|resend|add_bank)")]
    UnknownFlowType(String),
    #[error("unsupported property type `{0}` (expected residential|commercial)")]
    UnknownPropertyType(String),
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

/// Failure of a single call against a partner bank.
///
/// Every variant is a distinct discriminant so retry decisions never depend on message text.
#[derive(Clone, Debug, Error, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "class", content = "detail", rename_all = "snake_case")]
pub enum BankError {
    #[error("bank rejected the access token (unauthorized)")]
    Unauthorized,
    #[error("bank denied access (forbidden)")]
    Forbidden,
    #[error("bank rate limit reached")]
    RateLimited,
    #[error("bank call timed out after {0}s")]
    Timeout(u64),
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("bank server error (status {status}): {message}")]
    Server { status: u16, message: String },
    #[error("bank rejected the proposal: {0}")]
    BusinessRejection(String),
    #[error("could not decode bank response: {0}")]
    Decode(String),
    #[error("operation not supported by bank integration: {0}")]
    Unsupported(String),
}

impl BankError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }

    pub fn error_class(&self) -> &'static str {
        match self {
            Self::Unauthorized => "unauthorized",
            Self::Forbidden => "forbidden",
            Self::RateLimited => "rate_limited",
            Self::Timeout(_) => "timeout",
            Self::Transport(_) => "transport",
            Self::Server { .. } => "server",
            Self::BusinessRejection(_) => "business_rejection",
            Self::Decode(_) => "decode",
            Self::Unsupported(_) => "unsupported",
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("storage failure: {0}")]
    Storage(String),
    #[error("conflicting record: {0}")]
    Conflict(String),
    #[error("record not found: {0}")]
    NotFound(String),
    #[error("decode error: {0}")]
    Decode(String),
}
