//! Staking parameters and storage tuning

use crate::error::{Error, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Staking parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Params {
    /// Time an unbonding entry waits before release (seconds)
    pub unbonding_time_secs: u64,

    /// Size of the bonded validator set
    pub max_validators: u16,

    /// Max entries per unbonding or redelegation tuple
    pub max_entries: u16,

    /// Denomination accepted for bonding
    pub bond_denom: String,

    /// Bond a new validator right away when a slot is free
    pub bond_on_create: bool,

    /// Tokens per unit of consensus power
    pub power_reduction: Decimal,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            unbonding_time_secs: 60 * 60 * 24 * 21, // 3 weeks
            max_validators: 100,
            max_entries: 7,
            bond_denom: "stake".to_string(),
            bond_on_create: true,
            power_reduction: Decimal::ONE,
        }
    }
}

impl Params {
    /// Unbonding period as a chrono duration
    pub fn unbonding_time(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.unbonding_time_secs.min(i64::MAX as u64) as i64)
    }

    /// Reject parameter sets the ledger cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.bond_denom.trim().is_empty() {
            return Err(Error::InvalidInput("bond denom cannot be blank".into()));
        }
        if self.max_validators == 0 {
            return Err(Error::InvalidInput("max validators must be positive".into()));
        }
        if self.max_entries == 0 {
            return Err(Error::InvalidInput("max entries must be positive".into()));
        }
        if self.power_reduction <= Decimal::ZERO || !self.power_reduction.fract().is_zero() {
            return Err(Error::InvalidInput(
                "power reduction must be a positive integer".into(),
            ));
        }
        Ok(())
    }
}

/// RocksDB configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Data directory for RocksDB
    pub data_dir: PathBuf,

    /// Write buffer size (MB)
    pub write_buffer_size_mb: usize,

    /// Max write buffers
    pub max_write_buffer_number: i32,

    /// Max background jobs (compaction + flush)
    pub max_background_jobs: i32,

    /// Enable statistics
    pub enable_statistics: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data/stakingd"),
            write_buffer_size_mb: 64,
            max_write_buffer_number: 3,
            max_background_jobs: 2,
            enable_statistics: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_params() {
        let params = Params::default();
        assert_eq!(params.unbonding_time(), chrono::Duration::days(21));
        assert_eq!(params.max_validators, 100);
        assert_eq!(params.max_entries, 7);
        assert_eq!(params.bond_denom, "stake");
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_params_validation() {
        let mut params = Params::default();
        params.bond_denom = " ".into();
        assert!(params.validate().is_err());

        let mut params = Params::default();
        params.max_entries = 0;
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_partial_params_use_defaults() {
        let params: Params = serde_json::from_str(r#"{"max_validators": 3}"#).unwrap();
        assert_eq!(params.max_validators, 3);
        assert_eq!(params.bond_denom, "stake");
    }
}
