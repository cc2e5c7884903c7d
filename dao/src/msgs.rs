//! Governance messages

use crate::content::{Content, ProposalContent};
use crate::error::{Error, Result};
use crate::ROUTER_KEY;
use serde::{Deserialize, Serialize};
use staking_core::codec::{self, Named, Registry};
use staking_core::types::{coins_valid, Coin};
use staking_core::{AccAddress, Msg};
use std::fmt;

/// Message type of [`MsgSubmitProposal`]
pub const TYPE_SUBMIT_PROPOSAL: &str = "submit_proposal";
/// Message type of [`MsgDeposit`]
pub const TYPE_DEPOSIT: &str = "deposit";
/// Message type of [`MsgVote`]
pub const TYPE_VOTE: &str = "vote";

fn ensure_coins(coins: &[Coin]) -> Result<()> {
    if !coins_valid(coins) {
        let rendered: Vec<String> = coins.iter().map(ToString::to_string).collect();
        return Err(Error::InvalidCoins(rendered.join(",")));
    }
    Ok(())
}

/// Submit a proposal with an optional initial deposit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgSubmitProposal {
    /// Proposal content
    pub content: Content,
    /// Deposit sent with the proposal
    pub initial_deposit: Vec<Coin>,
    /// Proposer
    pub proposer: AccAddress,
}

impl MsgSubmitProposal {
    /// Build a submit message
    pub fn new(content: impl Into<Content>, initial_deposit: Vec<Coin>, proposer: AccAddress) -> Self {
        Self {
            content: content.into(),
            initial_deposit,
            proposer,
        }
    }
}

impl Named for MsgSubmitProposal {
    const TYPE_NAME: &'static str = "cosmos-sdk/MsgSubmitProposal";
}

impl Msg for MsgSubmitProposal {
    type Error = Error;

    fn route(&self) -> &'static str {
        ROUTER_KEY
    }

    fn msg_type(&self) -> &'static str {
        TYPE_SUBMIT_PROPOSAL
    }

    fn signers(&self) -> Vec<AccAddress> {
        vec![self.proposer.clone()]
    }

    fn sign_bytes(&self) -> Result<Vec<u8>> {
        Ok(codec::sign_bytes(self)?)
    }

    fn validate_basic(&self) -> Result<()> {
        if self.proposer.is_empty() {
            return Err(Error::InvalidAddress("proposer address is empty".into()));
        }
        ensure_coins(&self.initial_deposit)?;
        self.content.validate_basic()
    }
}

/// Add to a proposal's deposit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgDeposit {
    /// Target proposal
    pub proposal_id: u64,
    /// Depositor
    pub depositor: AccAddress,
    /// Coins deposited
    pub amount: Vec<Coin>,
}

impl MsgDeposit {
    /// Build a deposit message
    pub fn new(proposal_id: u64, depositor: AccAddress, amount: Vec<Coin>) -> Self {
        Self {
            proposal_id,
            depositor,
            amount,
        }
    }
}

impl Named for MsgDeposit {
    const TYPE_NAME: &'static str = "cosmos-sdk/MsgDeposit";
}

impl Msg for MsgDeposit {
    type Error = Error;

    fn route(&self) -> &'static str {
        ROUTER_KEY
    }

    fn msg_type(&self) -> &'static str {
        TYPE_DEPOSIT
    }

    fn signers(&self) -> Vec<AccAddress> {
        vec![self.depositor.clone()]
    }

    fn sign_bytes(&self) -> Result<Vec<u8>> {
        Ok(codec::sign_bytes(self)?)
    }

    fn validate_basic(&self) -> Result<()> {
        if self.depositor.is_empty() {
            return Err(Error::InvalidAddress("depositor address is empty".into()));
        }
        if self.amount.is_empty() {
            return Err(Error::InvalidCoins("deposit is empty".into()));
        }
        ensure_coins(&self.amount)
    }
}

/// Vote choice
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum VoteOption {
    /// In favour
    Yes,
    /// Counted for quorum only
    Abstain,
    /// Against
    No,
    /// Against, and the deposit is burned when vetoes win
    NoWithVeto,
}

impl fmt::Display for VoteOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            VoteOption::Yes => "Yes",
            VoteOption::Abstain => "Abstain",
            VoteOption::No => "No",
            VoteOption::NoWithVeto => "NoWithVeto",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for VoteOption {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Yes" => Ok(VoteOption::Yes),
            "Abstain" => Ok(VoteOption::Abstain),
            "No" => Ok(VoteOption::No),
            "NoWithVeto" => Ok(VoteOption::NoWithVeto),
            other => Err(Error::InvalidVote(other.to_string())),
        }
    }
}

/// Cast a vote on a proposal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgVote {
    /// Target proposal
    pub proposal_id: u64,
    /// Voter
    pub voter: AccAddress,
    /// Choice
    pub option: VoteOption,
}

impl MsgVote {
    /// Build a vote message
    pub fn new(proposal_id: u64, voter: AccAddress, option: VoteOption) -> Self {
        Self {
            proposal_id,
            voter,
            option,
        }
    }
}

impl Named for MsgVote {
    const TYPE_NAME: &'static str = "cosmos-sdk/MsgVote";
}

impl Msg for MsgVote {
    type Error = Error;

    fn route(&self) -> &'static str {
        ROUTER_KEY
    }

    fn msg_type(&self) -> &'static str {
        TYPE_VOTE
    }

    fn signers(&self) -> Vec<AccAddress> {
        vec![self.voter.clone()]
    }

    fn sign_bytes(&self) -> Result<Vec<u8>> {
        Ok(codec::sign_bytes(self)?)
    }

    fn validate_basic(&self) -> Result<()> {
        if self.voter.is_empty() {
            return Err(Error::InvalidAddress("voter address is empty".into()));
        }
        Ok(())
    }
}

/// Every governance message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DaoMsg {
    /// Submit a proposal
    SubmitProposal(MsgSubmitProposal),
    /// Deposit on a proposal
    Deposit(MsgDeposit),
    /// Vote on a proposal
    Vote(MsgVote),
}

impl From<MsgSubmitProposal> for DaoMsg {
    fn from(msg: MsgSubmitProposal) -> Self {
        DaoMsg::SubmitProposal(msg)
    }
}

impl From<MsgDeposit> for DaoMsg {
    fn from(msg: MsgDeposit) -> Self {
        DaoMsg::Deposit(msg)
    }
}

impl From<MsgVote> for DaoMsg {
    fn from(msg: MsgVote) -> Self {
        DaoMsg::Vote(msg)
    }
}

impl DaoMsg {
    fn inner(&self) -> &dyn Msg<Error = Error> {
        match self {
            DaoMsg::SubmitProposal(m) => m,
            DaoMsg::Deposit(m) => m,
            DaoMsg::Vote(m) => m,
        }
    }

    /// Registered codec name
    pub fn type_name(&self) -> &'static str {
        match self {
            DaoMsg::SubmitProposal(_) => MsgSubmitProposal::TYPE_NAME,
            DaoMsg::Deposit(_) => MsgDeposit::TYPE_NAME,
            DaoMsg::Vote(_) => MsgVote::TYPE_NAME,
        }
    }
}

impl Msg for DaoMsg {
    type Error = Error;

    fn route(&self) -> &'static str {
        self.inner().route()
    }

    fn msg_type(&self) -> &'static str {
        self.inner().msg_type()
    }

    fn signers(&self) -> Vec<AccAddress> {
        self.inner().signers()
    }

    fn sign_bytes(&self) -> Result<Vec<u8>> {
        self.inner().sign_bytes()
    }

    fn validate_basic(&self) -> Result<()> {
        self.inner().validate_basic()
    }
}

/// Register every governance message under its codec name
pub fn register_msgs<T>(registry: &mut Registry<T>) -> Result<()>
where
    T: From<DaoMsg>,
{
    registry.register(MsgSubmitProposal::TYPE_NAME, |v| {
        serde_json::from_value::<MsgSubmitProposal>(v).map(|m| T::from(DaoMsg::from(m)))
    })?;
    registry.register(MsgDeposit::TYPE_NAME, |v| {
        serde_json::from_value::<MsgDeposit>(v).map(|m| T::from(DaoMsg::from(m)))
    })?;
    registry.register(MsgVote::TYPE_NAME, |v| {
        serde_json::from_value::<MsgVote>(v).map(|m| T::from(DaoMsg::from(m)))
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{SoftwareUpgradeProposal, TextProposal, UpgradePlan};
    use serde_json::json;

    fn acc(b: u8) -> AccAddress {
        AccAddress::new(vec![b; 20])
    }

    #[test]
    fn test_submit_proposal() {
        let msg = MsgSubmitProposal::new(
            TextProposal::new("title", "body"),
            vec![Coin::new("stake", 10)],
            acc(1),
        );
        assert_eq!(msg.route(), "dao");
        assert_eq!(msg.msg_type(), "submit_proposal");
        assert_eq!(msg.signers(), vec![acc(1)]);
        assert!(msg.validate_basic().is_ok());

        let no_proposer = MsgSubmitProposal::new(
            TextProposal::new("title", "body"),
            vec![],
            AccAddress::default(),
        );
        assert!(matches!(no_proposer.validate_basic(), Err(Error::InvalidAddress(_))));

        let negative = MsgSubmitProposal::new(
            TextProposal::new("title", "body"),
            vec![Coin::new("stake", -1)],
            acc(1),
        );
        assert!(matches!(negative.validate_basic(), Err(Error::InvalidCoins(_))));

        let bad_plan = MsgSubmitProposal::new(
            SoftwareUpgradeProposal::new(
                "t",
                "d",
                UpgradePlan {
                    name: String::new(),
                    height: 10,
                    info: String::new(),
                },
            ),
            vec![],
            acc(1),
        );
        assert!(matches!(bad_plan.validate_basic(), Err(Error::InvalidContent(_))));
    }

    #[test]
    fn test_deposit_and_vote() {
        let deposit = MsgDeposit::new(1, acc(2), vec![Coin::new("stake", 5)]);
        assert_eq!(deposit.msg_type(), "deposit");
        assert!(deposit.validate_basic().is_ok());
        assert!(MsgDeposit::new(1, acc(2), vec![]).validate_basic().is_err());
        assert!(MsgDeposit::new(1, AccAddress::default(), vec![Coin::new("stake", 5)])
            .validate_basic()
            .is_err());

        let vote = MsgVote::new(1, acc(3), VoteOption::NoWithVeto);
        assert_eq!(vote.msg_type(), "vote");
        assert!(vote.validate_basic().is_ok());
        assert_eq!("NoWithVeto".parse::<VoteOption>().unwrap(), VoteOption::NoWithVeto);
        assert!(matches!("Maybe".parse::<VoteOption>(), Err(Error::InvalidVote(_))));
    }

    #[test]
    fn test_sign_bytes_embed_content_envelope() {
        let msg = MsgSubmitProposal::new(TextProposal::new("t", "d"), vec![], acc(1));
        let bytes = msg.sign_bytes().unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["type"], json!("cosmos-sdk/MsgSubmitProposal"));
        assert_eq!(value["value"]["content"]["type"], json!("dao/TextProposal"));

        let decoded: MsgSubmitProposal = serde_json::from_value(value["value"].clone()).unwrap();
        assert_eq!(decoded.sign_bytes().unwrap(), bytes);
    }

    #[test]
    fn test_registry() {
        let mut registry: Registry<DaoMsg> = Registry::new();
        register_msgs(&mut registry).unwrap();
        assert!(registry.is_registered("cosmos-sdk/MsgVote"));

        let envelope = codec::Envelope::wrap(&MsgVote::new(7, acc(1), VoteOption::Yes)).unwrap();
        let decoded = registry.decode(envelope).unwrap();
        assert_eq!(decoded.type_name(), "cosmos-sdk/MsgVote");
        assert_eq!(decoded.route(), "dao");
    }
}
