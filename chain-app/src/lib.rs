//! Chain application shell
//!
//! Hosts the staking ledger and the governance extension behind the block
//! lifecycle a consensus engine drives.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │              Consensus engine / block replay         │
//! └────────────────────┬────────────────────────────────┘
//!                      │ init_chain / begin_block / deliver_tx / end_block / commit
//!                      ↓
//! ┌─────────────────────────────────────────────────────┐
//! │                  StakingApp                          │
//! │  decode → validate_basic → route → cache branch     │
//! └──────────┬─────────────────────────────┬────────────┘
//!            │ "staking"                   │ proposals
//!            ↓                             ↓
//! ┌──────────────────────┐   ┌──────────────────────────┐
//! │   staking::Keeper    │   │   dao::ProposalRouter    │
//! └──────────┬───────────┘   └─────────────┬────────────┘
//!            └──────────────┬──────────────┘
//!                           ↓
//!               KV store (memory / RocksDB)
//! ```
//!
//! # Block lifecycle
//!
//! - **init_chain**: fund genesis accounts, apply genesis validators
//! - **check_tx**: decode and stateless validation only
//! - **deliver_tx**: every message of a tx in one cache branch
//! - **end_block**: release matured unbondings, recompute the bonded set
//! - **commit**: persist and compute the app hash

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod app;
pub mod config;
pub mod error;
pub mod genesis;
pub mod metrics;
pub mod msg;
pub mod router;
pub mod tx;

// Re-exports
pub use app::{AppInfo, EndBlockResponse, StakingApp, TxResponse};
pub use config::Config;
pub use error::{Error, Result};
pub use genesis::{GenesisAccount, GenesisState};
pub use msg::AppMsg;
