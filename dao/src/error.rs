//! Error types for the governance extension

use staking_core::error::{codes as sdk_codes, ErrorCode, SDK_CODESPACE};
use thiserror::Error;

/// Result type for governance operations
pub type Result<T> = std::result::Result<T, Error>;

/// Codespace for governance errors
pub const DEFAULT_CODESPACE: &str = "dao";

/// Codes in the governance codespace
pub mod codes {
    /// Invalid proposal content
    pub const INVALID_CONTENT: u32 = 6;
    /// Invalid proposal type
    pub const INVALID_PROPOSAL_TYPE: u32 = 7;
    /// Invalid vote
    pub const INVALID_VOTE: u32 = 8;
    /// No handler registered for the proposal route
    pub const NO_PROPOSAL_HANDLER: u32 = 11;

    /// Invalid coins (framework codespace)
    pub const INVALID_COINS: u32 = 10;
}

/// Governance errors
#[derive(Error, Debug)]
pub enum Error {
    /// Content failed validation
    #[error("invalid proposal content: {0}")]
    InvalidContent(String),

    /// Unsupported proposal type
    #[error("invalid proposal type: {0}")]
    InvalidProposalType(String),

    /// Unsupported vote
    #[error("invalid vote option: {0}")]
    InvalidVote(String),

    /// No handler for the content's route
    #[error("no handler exists for proposal route {0}")]
    UnknownProposalRoute(String),

    /// Route already registered
    #[error("route {0} has already been initialized")]
    DuplicateRoute(String),

    /// Registration after sealing
    #[error("router sealed; cannot register {0} route handler")]
    RouterSealed(String),

    /// Route is not alphanumeric
    #[error("route expressions can only contain alphanumeric characters: {0}")]
    InvalidRoute(String),

    /// Missing or malformed address
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// Malformed or non-positive coins
    #[error("invalid coins: {0}")]
    InvalidCoins(String),

    /// Error raised by the shared staking primitives
    #[error(transparent)]
    Staking(#[from] staking_core::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ErrorCode for Error {
    fn code(&self) -> u32 {
        match self {
            Error::InvalidContent(_) => codes::INVALID_CONTENT,
            Error::InvalidProposalType(_) => codes::INVALID_PROPOSAL_TYPE,
            Error::InvalidVote(_) => codes::INVALID_VOTE,
            Error::UnknownProposalRoute(_) => codes::NO_PROPOSAL_HANDLER,
            Error::DuplicateRoute(_) | Error::RouterSealed(_) | Error::InvalidRoute(_) => {
                sdk_codes::INTERNAL
            }
            Error::InvalidAddress(_) => sdk_codes::INVALID_ADDRESS,
            Error::InvalidCoins(_) => codes::INVALID_COINS,
            Error::Staking(e) => e.code(),
            Error::Json(_) => sdk_codes::TX_DECODE,
        }
    }

    fn codespace(&self) -> &'static str {
        match self {
            Error::InvalidContent(_)
            | Error::InvalidProposalType(_)
            | Error::InvalidVote(_)
            | Error::UnknownProposalRoute(_) => DEFAULT_CODESPACE,
            Error::Staking(e) => e.codespace(),
            _ => SDK_CODESPACE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        let err = Error::UnknownProposalRoute("treasury".into());
        assert_eq!(err.code(), 11);
        assert_eq!(err.codespace(), "dao");
        assert_eq!(err.to_string(), "no handler exists for proposal route treasury");

        let err = Error::InvalidCoins("-1stake".into());
        assert_eq!((err.code(), err.codespace()), (10, "sdk"));
    }

    #[test]
    fn test_staking_errors_keep_their_codes() {
        let err: Error = staking_core::Error::BadDelegationAmount.into();
        assert_eq!(err.codespace(), "staking");
        assert_eq!(err.to_string(), "amount must be > 0");
    }
}
