//! Error types for the application shell

use staking_core::error::{codes, ErrorCode, SDK_CODESPACE};
use thiserror::Error;

/// Result type for application operations
pub type Result<T> = std::result::Result<T, Error>;

/// Memo longer than allowed
pub const CODE_MEMO_TOO_LARGE: u32 = 12;

/// Application errors
#[derive(Error, Debug)]
pub enum Error {
    /// Staking error
    #[error(transparent)]
    Staking(#[from] staking_core::Error),

    /// Governance error
    #[error(transparent)]
    Dao(#[from] dao::Error),

    /// No handler for the message route
    #[error("unrecognized message route: {0}")]
    UnknownRoute(String),

    /// Route registered twice
    #[error("route {0} has already been registered")]
    DuplicateRoute(String),

    /// Transaction bytes could not be decoded
    #[error("tx decode error: {0}")]
    TxDecode(String),

    /// Transaction is structurally invalid
    #[error("invalid transaction: {0}")]
    InvalidTx(String),

    /// Memo over the limit
    #[error("maximum number of characters is {max} but received {len} characters")]
    MemoTooLarge {
        /// Characters received
        len: usize,
        /// Allowed characters
        max: usize,
    },

    /// Block lifecycle called out of order
    #[error("block error: {0}")]
    Block(String),

    /// Invalid genesis
    #[error("genesis error: {0}")]
    Genesis(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Metrics registration
    #[error("metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ErrorCode for Error {
    fn code(&self) -> u32 {
        match self {
            Error::Staking(e) => e.code(),
            Error::Dao(e) => e.code(),
            Error::UnknownRoute(_) | Error::InvalidTx(_) => codes::UNKNOWN_REQUEST,
            Error::TxDecode(_) | Error::Json(_) => codes::TX_DECODE,
            Error::MemoTooLarge { .. } => CODE_MEMO_TOO_LARGE,
            Error::DuplicateRoute(_)
            | Error::Block(_)
            | Error::Genesis(_)
            | Error::Config(_)
            | Error::Metrics(_)
            | Error::Io(_) => codes::INTERNAL,
        }
    }

    fn codespace(&self) -> &'static str {
        match self {
            Error::Staking(e) => e.codespace(),
            Error::Dao(e) => e.codespace(),
            _ => SDK_CODESPACE,
        }
    }
}
