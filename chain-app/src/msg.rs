//! Messages accepted by the application

use crate::{Error, Result};
use dao::DaoMsg;
use staking_core::codec::Registry;
use staking_core::{AccAddress, Msg, StakingMsg};

/// Any message the application can decode
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppMsg {
    /// Staking message
    Staking(StakingMsg),
    /// Governance message
    Dao(DaoMsg),
}

impl From<StakingMsg> for AppMsg {
    fn from(msg: StakingMsg) -> Self {
        AppMsg::Staking(msg)
    }
}

impl From<DaoMsg> for AppMsg {
    fn from(msg: DaoMsg) -> Self {
        AppMsg::Dao(msg)
    }
}

impl AppMsg {
    /// Registered codec name
    pub fn type_name(&self) -> &'static str {
        match self {
            AppMsg::Staking(m) => m.type_name(),
            AppMsg::Dao(m) => m.type_name(),
        }
    }
}

impl Msg for AppMsg {
    type Error = Error;

    fn route(&self) -> &'static str {
        match self {
            AppMsg::Staking(m) => m.route(),
            AppMsg::Dao(m) => m.route(),
        }
    }

    fn msg_type(&self) -> &'static str {
        match self {
            AppMsg::Staking(m) => m.msg_type(),
            AppMsg::Dao(m) => m.msg_type(),
        }
    }

    fn signers(&self) -> Vec<AccAddress> {
        match self {
            AppMsg::Staking(m) => m.signers(),
            AppMsg::Dao(m) => m.signers(),
        }
    }

    fn sign_bytes(&self) -> Result<Vec<u8>> {
        match self {
            AppMsg::Staking(m) => Ok(m.sign_bytes()?),
            AppMsg::Dao(m) => Ok(m.sign_bytes()?),
        }
    }

    fn validate_basic(&self) -> Result<()> {
        match self {
            AppMsg::Staking(m) => Ok(m.validate_basic()?),
            AppMsg::Dao(m) => Ok(m.validate_basic()?),
        }
    }
}

/// Registry of every message the application decodes
pub fn registry() -> Result<Registry<AppMsg>> {
    let mut registry = Registry::new();
    staking_core::msg::register_msgs(&mut registry)?;
    dao::register_codec(&mut registry)?;
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_names() {
        let registry = registry().unwrap();
        let names: Vec<_> = registry.names().collect();
        assert_eq!(
            names,
            vec![
                "cosmos-sdk/MsgBeginRedelegate",
                "cosmos-sdk/MsgCreateValidator",
                "cosmos-sdk/MsgDelegate",
                "cosmos-sdk/MsgDeposit",
                "cosmos-sdk/MsgEditValidator",
                "cosmos-sdk/MsgIndexDelegate",
                "cosmos-sdk/MsgSubmitProposal",
                "cosmos-sdk/MsgUndelegate",
                "cosmos-sdk/MsgVote",
            ]
        );
    }
}
