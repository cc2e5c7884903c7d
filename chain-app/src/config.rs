//! Configuration for the staking node

use crate::{Error, Result};
use dao::ContentLimits;
use serde::{Deserialize, Serialize};
use staking_core::{Params, StorageConfig};
use std::path::PathBuf;
use std::str::FromStr;

/// Node configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Chain ID
    pub chain_id: String,

    /// RocksDB configuration
    pub storage: StorageConfig,

    /// Staking parameters, overridden by genesis when it carries its own
    pub staking: Params,

    /// Governance content limits
    pub governance: ContentLimits,

    /// Genesis file
    pub genesis_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            chain_id: "staking-1".to_string(),
            storage: StorageConfig::default(),
            staking: Params::default(),
            governance: ContentLimits::default(),
            genesis_file: None,
        }
    }
}

fn parse_env<T: FromStr>(name: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e: T::Err| Error::Config(format!("invalid {}: {}", name, e)))
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Config::default();

        if let Ok(chain_id) = std::env::var("STAKINGD_CHAIN_ID") {
            config.chain_id = chain_id;
        }

        if let Ok(data_dir) = std::env::var("STAKINGD_DATA_DIR") {
            config.storage.data_dir = PathBuf::from(data_dir);
        }

        if let Ok(genesis) = std::env::var("STAKINGD_GENESIS") {
            config.genesis_file = Some(PathBuf::from(genesis));
        }

        if let Ok(denom) = std::env::var("STAKINGD_BOND_DENOM") {
            config.staking.bond_denom = denom;
        }

        if let Ok(v) = std::env::var("STAKINGD_MAX_VALIDATORS") {
            config.staking.max_validators = parse_env("STAKINGD_MAX_VALIDATORS", &v)?;
        }

        if let Ok(v) = std::env::var("STAKINGD_UNBONDING_TIME_SECS") {
            config.staking.unbonding_time_secs = parse_env("STAKINGD_UNBONDING_TIME_SECS", &v)?;
        }

        Ok(config)
    }

    /// Reject configurations the node cannot start with
    pub fn validate(&self) -> Result<()> {
        if self.chain_id.trim().is_empty() {
            return Err(Error::Config("chain id cannot be blank".into()));
        }
        self.staking.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.staking.unbonding_time_secs, 21 * 24 * 60 * 60);
        assert_eq!(config.staking.max_validators, 100);
        assert_eq!(config.staking.max_entries, 7);
        assert_eq!(config.staking.bond_denom, "stake");
        assert_eq!(config.governance, ContentLimits::default());
        config.validate().unwrap();
    }

    #[test]
    fn test_from_file_partial() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
chain_id = "hackatom-1"

[staking]
max_validators = 4
bond_denom = "uatom"

[governance]
max_title_length = 140
reject_blank = true
"#
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.chain_id, "hackatom-1");
        assert_eq!(config.staking.max_validators, 4);
        assert_eq!(config.staking.bond_denom, "uatom");
        assert_eq!(config.staking.max_entries, 7);
        assert_eq!(config.governance.max_title_length, Some(140));
        assert!(config.governance.reject_blank);
        assert!(config.genesis_file.is_none());
    }

    #[test]
    fn test_invalid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "chain_id = [").unwrap();
        assert!(matches!(Config::from_file(file.path()), Err(Error::Config(_))));
    }

    #[test]
    fn test_validate_rejects_blank_chain_id() {
        let config = Config {
            chain_id: " ".into(),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }
}
