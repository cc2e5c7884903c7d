//! Genesis state

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use staking_core::msg::MsgCreateValidator;
use staking_core::types::{coins_valid, Coin};
use staking_core::{AccAddress, Msg, Params};
use std::collections::BTreeSet;
use std::path::Path;

/// Funded account at genesis
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisAccount {
    /// Account address
    pub address: AccAddress,
    /// Initial balance
    pub coins: Vec<Coin>,
}

/// Initial chain state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisState {
    /// Staking parameters; the node configuration applies when absent
    #[serde(default)]
    pub params: Option<Params>,
    /// Funded accounts
    #[serde(default)]
    pub accounts: Vec<GenesisAccount>,
    /// Validators created at genesis, applied in order
    #[serde(default)]
    pub gen_txs: Vec<MsgCreateValidator>,
}

impl GenesisState {
    /// Load from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Stateless checks
    pub fn validate(&self) -> Result<()> {
        if let Some(params) = &self.params {
            params.validate()?;
        }

        let mut seen = BTreeSet::new();
        for account in &self.accounts {
            if account.address.is_empty() {
                return Err(Error::Genesis("account address is empty".into()));
            }
            if !seen.insert(account.address.clone()) {
                return Err(Error::Genesis(format!(
                    "duplicate account {}",
                    account.address
                )));
            }
            if !coins_valid(&account.coins) {
                return Err(Error::Genesis(format!(
                    "invalid coins for account {}",
                    account.address
                )));
            }
        }

        for gen_tx in &self.gen_txs {
            gen_tx.validate_basic()?;
        }
        Ok(())
    }
}
