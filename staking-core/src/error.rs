//! Error types for the staking module
//!
//! Every error carries a numeric code and a codespace so that outer layers
//! can map failures to user-facing codes without parsing messages.

use rust_decimal::Decimal;
use thiserror::Error;

/// Result type for staking operations
pub type Result<T> = std::result::Result<T, Error>;

/// Codespace for staking errors
pub const DEFAULT_CODESPACE: &str = "staking";

/// Codespace for errors raised by the surrounding framework (store, codec)
pub const SDK_CODESPACE: &str = "sdk";

/// Codes in the staking codespace
pub mod codes {
    /// Invalid validator
    pub const INVALID_VALIDATOR: u32 = 101;
    /// Invalid delegation
    pub const INVALID_DELEGATION: u32 = 102;
    /// Invalid input
    pub const INVALID_INPUT: u32 = 103;
    /// Validator jailed
    pub const VALIDATOR_JAILED: u32 = 104;

    /// Internal framework error
    pub const INTERNAL: u32 = 1;
    /// Transaction could not be decoded
    pub const TX_DECODE: u32 = 2;
    /// Insufficient funds
    pub const INSUFFICIENT_FUNDS: u32 = 5;
    /// Unknown request
    pub const UNKNOWN_REQUEST: u32 = 6;
    /// Invalid address
    pub const INVALID_ADDRESS: u32 = 7;
}

/// Maps an error to its numeric code and codespace
pub trait ErrorCode {
    /// Numeric code within the codespace
    fn code(&self) -> u32;

    /// Codespace discriminator
    fn codespace(&self) -> &'static str;
}

/// Staking errors
#[derive(Error, Debug)]
pub enum Error {
    /// Delegator address missing
    #[error("delegator address is nil or empty")]
    NilDelegatorAddress,

    /// Validator address missing
    #[error("validator address is nil or empty")]
    NilValidatorAddress,

    /// Validator address does not match the delegator
    #[error("validator address is invalid")]
    BadValidatorAddress,

    /// Non-positive delegation amount
    #[error("amount must be > 0")]
    BadDelegationAmount,

    /// Share amount out of range
    #[error("invalid shares amount")]
    BadSharesAmount,

    /// Minimum self-delegation is not positive
    #[error("minimum self delegation must be a positive integer")]
    MinSelfDelegationInvalid,

    /// Self-delegation below the validator's minimum
    #[error("validator's self delegation must be greater than their minimum self delegation")]
    SelfDelegationBelowMinimum,

    /// Minimum self-delegation may only grow
    #[error("minimum self delegation cannot be decrease")]
    MinSelfDelegationDecreased,

    /// Malformed or out-of-policy input
    #[error("{0}")]
    InvalidInput(String),

    /// Unknown validator
    #[error("validator does not exist for that address")]
    NoValidatorFound,

    /// Operator already runs a validator
    #[error("validator already exist for this operator address, must use new validator operator address")]
    ValidatorOwnerExists,

    /// Consensus key already bound to another validator
    #[error("validator already exist for this pubkey, must use new validator pubkey")]
    ValidatorPubKeyExists,

    /// Validator is jailed
    #[error("validator for this address is currently jailed")]
    ValidatorJailed,

    /// Validator has no tokens left but outstanding shares
    #[error("cannot delegate to validators with invalid (zero) ex-rate")]
    DelegatorShareExRateInvalid,

    /// Coin denomination differs from the bond denomination
    #[error("invalid coin denomination: got {got}, expected {expected}")]
    BadDenom {
        /// Denomination received
        got: String,
        /// Bond denomination
        expected: String,
    },

    /// No delegation for the pair
    #[error("no delegation for this (address, validator) pair")]
    NoDelegation,

    /// Commission above the validator's max rate
    #[error("commission cannot be more than the max rate")]
    CommissionGtMaxRate,

    /// Commission change above the validator's max change rate
    #[error("commission cannot be changed more than max change rate")]
    CommissionGtMaxChangeRate,

    /// Negative max change rate
    #[error("commission change rate must be positive")]
    CommissionChangeRateNegative,

    /// Max change rate above max rate
    #[error("commission change rate cannot be more than the max rate")]
    CommissionChangeRateGtMaxRate,

    /// Redelegation to the source validator
    #[error("cannot redelegate to the same validator")]
    SelfRedelegation,

    /// Redelegation destination missing
    #[error("redelegation destination validator not found")]
    BadRedelegationDst,

    /// Redelegation out of a validator that is still receiving one
    #[error("redelegation to this validator already in progress, first redelegation to this validator must complete before next redelegation")]
    TransitiveRedelegation,

    /// Redelegation entry cap reached
    #[error("too many redelegation entries for (delegator, src-validator, dst-validator) tuple")]
    MaxRedelegationEntries,

    /// Unbonding entry cap reached
    #[error("too many unbonding delegation entries for (delegator, validator) tuple")]
    MaxUnbondingEntries,

    /// Redelegation truncates to zero tokens
    #[error("too few tokens to redelegate (truncates to zero tokens)")]
    TinyRedelegationAmount,

    /// Account cannot cover the amount
    #[error("insufficient funds: need {need}, have {have}")]
    InsufficientFunds {
        /// Requested amount
        need: Decimal,
        /// Available amount
        have: Decimal,
    },

    /// Malformed bech32 address or key
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// Decimal overflow or division by zero
    #[error("arithmetic error: {0}")]
    Arithmetic(String),

    /// Broken ledger invariant
    #[error("invariant broken: {0}")]
    InvariantBroken(String),

    /// Unknown message type name
    #[error("unrecognized message type: {0}")]
    UnknownMsgType(String),

    /// Codec registration error
    #[error("codec error: {0}")]
    Codec(String),

    /// Storage error (RocksDB)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ErrorCode for Error {
    fn code(&self) -> u32 {
        use codes::*;
        match self {
            Error::NilDelegatorAddress
            | Error::NilValidatorAddress
            | Error::InvalidInput(_) => INVALID_INPUT,
            Error::BadValidatorAddress | Error::InvalidAddress(_) => INVALID_ADDRESS,
            Error::BadDelegationAmount
            | Error::BadSharesAmount
            | Error::DelegatorShareExRateInvalid
            | Error::BadDenom { .. }
            | Error::NoDelegation
            | Error::SelfRedelegation
            | Error::BadRedelegationDst
            | Error::TransitiveRedelegation
            | Error::MaxRedelegationEntries
            | Error::MaxUnbondingEntries
            | Error::TinyRedelegationAmount => INVALID_DELEGATION,
            Error::MinSelfDelegationInvalid
            | Error::SelfDelegationBelowMinimum
            | Error::MinSelfDelegationDecreased
            | Error::NoValidatorFound
            | Error::ValidatorOwnerExists
            | Error::ValidatorPubKeyExists
            | Error::CommissionGtMaxRate
            | Error::CommissionGtMaxChangeRate
            | Error::CommissionChangeRateNegative
            | Error::CommissionChangeRateGtMaxRate => INVALID_VALIDATOR,
            Error::ValidatorJailed => VALIDATOR_JAILED,
            Error::InsufficientFunds { .. } => INSUFFICIENT_FUNDS,
            Error::UnknownMsgType(_) => UNKNOWN_REQUEST,
            Error::Json(_) => TX_DECODE,
            Error::Arithmetic(_)
            | Error::InvariantBroken(_)
            | Error::Codec(_)
            | Error::Storage(_)
            | Error::Serialization(_)
            | Error::Io(_) => INTERNAL,
        }
    }

    fn codespace(&self) -> &'static str {
        match self {
            Error::InsufficientFunds { .. }
            | Error::InvalidAddress(_)
            | Error::Arithmetic(_)
            | Error::InvariantBroken(_)
            | Error::UnknownMsgType(_)
            | Error::Codec(_)
            | Error::Storage(_)
            | Error::Serialization(_)
            | Error::Json(_)
            | Error::Io(_) => SDK_CODESPACE,
            _ => DEFAULT_CODESPACE,
        }
    }
}

impl From<rocksdb::Error> for Error {
    fn from(err: rocksdb::Error) -> Self {
        Error::Storage(err.to_string())
    }
}

impl From<bech32::Error> for Error {
    fn from(err: bech32::Error) -> Self {
        Error::InvalidAddress(err.to_string())
    }
}
