//! DAO governance extension
//!
//! Proposal content, governance messages and the handler table that executes
//! passed proposals. The proposal lifecycle itself (deposit period, voting,
//! tally) belongs to the surrounding governance subsystem; this crate only
//! supplies the data and validation contracts plus execution dispatch.
//!
//! ```text
//! MsgSubmitProposal { content } ──► validate_basic ──► (lifecycle) ──►
//!     ProposalRouter::execute(content) ──► handler for content.proposal_route()
//! ```

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod content;
pub mod error;
pub mod msgs;
pub mod router;

pub use content::{
    validate_abstract, Content, ContentLimits, ProposalContent, SoftwareUpgradeProposal,
    TextProposal, UpgradePlan,
};
pub use error::{Error, Result};
pub use msgs::{DaoMsg, MsgDeposit, MsgSubmitProposal, MsgVote, VoteOption};
pub use router::{default_router, ProposalRouter};

/// Module name
pub const MODULE_NAME: &str = "dao";

/// Route for governance messages and built-in proposal content
pub const ROUTER_KEY: &str = MODULE_NAME;

/// Register governance messages and proposal content under their codec names
pub fn register_codec<T>(registry: &mut staking_core::codec::Registry<T>) -> Result<()>
where
    T: From<DaoMsg>,
{
    msgs::register_msgs(registry)?;
    Ok(())
}
