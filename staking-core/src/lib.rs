//! Staking Core
//!
//! Validator delegation state machine with an indexed-delegation extension.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                 Message layer                        │
//! │  route / type / signers / sign bytes / validate      │
//! └────────────────────┬────────────────────────────────┘
//!                      │ dispatched by (route, type)
//!                      ↓
//! ┌─────────────────────────────────────────────────────┐
//! │                 Staking Ledger                       │
//! │  apply_* against a cache branch of the store        │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//!                      ↓
//! ┌─────────────────────────────────────────────────────┐
//! │          KV store (memory / RocksDB)                 │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! # Invariants
//!
//! - Share accounting: Σ(delegation shares) == validator.delegator_shares
//! - Pool accounting: bonded + not-bonded pools match validator tokens and
//!   pending unbonding balances
//! - Atomicity: a failed operation leaves the store untouched
//! - Determinism: same messages in the same order → same state

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod address;
pub mod bank;
pub mod codec;
pub mod config;
pub mod context;
pub mod error;
pub mod invariants;
pub mod keys;
pub mod ledger;
pub mod msg;
pub mod policy;
pub mod storage;
pub mod store;
pub mod tags;
pub mod types;

// Re-exports
pub use address::{AccAddress, ConsPubKey, ValAddress};
pub use config::{Params, StorageConfig};
pub use context::{BlockHeader, Context};
pub use error::{ErrorCode, Error, Result};
pub use ledger::{Keeper, ValidatorUpdate};
pub use msg::{Msg, StakingMsg};
pub use store::{CommitStore, KvStore, MemStore};
pub use storage::RocksStore;
pub use tags::Tags;
pub use types::{BondStatus, Coin, Delegation, Description, Pool, Validator};

/// Module name, used as the message route and the error codespace
pub const MODULE_NAME: &str = "staking";

/// Route for every staking message
pub const ROUTER_KEY: &str = MODULE_NAME;
