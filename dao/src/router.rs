//! Proposal execution handlers keyed by route
//!
//! Once a proposal passes, the governance lifecycle hands its content to
//! [`ProposalRouter::execute`]. The router is filled at startup and sealed;
//! after that the table is immutable.

use crate::content::{Content, ProposalContent, UpgradePlan};
use crate::error::{Error, Result};
use crate::ROUTER_KEY;
use staking_core::store::{KvStore, KvStoreExt};
use staking_core::Context;
use std::collections::BTreeMap;
use std::fmt;
use tracing::info;

/// Key of the scheduled upgrade plan
pub const UPGRADE_PLAN_KEY: &[u8] = &[0x71];

/// Handler executing passed proposal content
pub type ProposalHandler = Box<dyn Fn(&mut Context<'_>, &Content) -> Result<()>>;

/// Route → handler table
#[derive(Default)]
pub struct ProposalRouter {
    routes: BTreeMap<String, ProposalHandler>,
    sealed: bool,
}

impl fmt::Debug for ProposalRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProposalRouter")
            .field("routes", &self.routes.keys().collect::<Vec<_>>())
            .field("sealed", &self.sealed)
            .finish()
    }
}

fn is_valid_route(route: &str) -> bool {
    !route.is_empty() && route.chars().all(|c| c.is_ascii_alphanumeric())
}

impl ProposalRouter {
    /// Empty, unsealed router
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `route`
    pub fn add_route<H>(&mut self, route: &str, handler: H) -> Result<&mut Self>
    where
        H: Fn(&mut Context<'_>, &Content) -> Result<()> + 'static,
    {
        if self.sealed {
            return Err(Error::RouterSealed(route.to_string()));
        }
        if !is_valid_route(route) {
            return Err(Error::InvalidRoute(route.to_string()));
        }
        if self.routes.contains_key(route) {
            return Err(Error::DuplicateRoute(route.to_string()));
        }
        self.routes.insert(route.to_string(), Box::new(handler));
        Ok(self)
    }

    /// Refuse further registrations
    pub fn seal(&mut self) {
        self.sealed = true;
    }

    /// Whether the router is sealed
    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// Whether a handler exists for `route`
    pub fn has_route(&self, route: &str) -> bool {
        self.routes.contains_key(route)
    }

    /// Execute passed content in a cache branch; a failing handler leaves no writes
    pub fn execute(&self, ctx: &mut Context<'_>, content: &Content) -> Result<()> {
        let route = content.proposal_route();
        let handler = self
            .routes
            .get(route)
            .ok_or_else(|| Error::UnknownProposalRoute(route.to_string()))?;
        ctx.branch_with(|ctx| handler(ctx, content))
    }
}

/// Handler for the built-in `dao` route
pub fn dao_proposal_handler(ctx: &mut Context<'_>, content: &Content) -> Result<()> {
    match content {
        Content::Text(p) => {
            info!(title = %p.title, "Text proposal passed");
            Ok(())
        }
        Content::SoftwareUpgrade(p) => schedule_upgrade(ctx, &p.plan),
    }
}

fn schedule_upgrade(ctx: &mut Context<'_>, plan: &UpgradePlan) -> Result<()> {
    if let Some(existing) = scheduled_upgrade(ctx.store())? {
        return Err(Error::InvalidContent(format!(
            "upgrade {} already scheduled at height {}",
            existing.name, existing.height
        )));
    }
    if plan.height <= ctx.block_height() {
        return Err(Error::InvalidContent(format!(
            "upgrade height {} must be above the current height {}",
            plan.height,
            ctx.block_height()
        )));
    }
    ctx.store_mut().set_encoded(UPGRADE_PLAN_KEY, plan)?;
    info!(name = %plan.name, height = plan.height, "Software upgrade scheduled");
    Ok(())
}

/// Currently scheduled upgrade plan
pub fn scheduled_upgrade(store: &dyn KvStore) -> Result<Option<UpgradePlan>> {
    Ok(store.get_decoded(UPGRADE_PLAN_KEY)?)
}

/// Router with the built-in `dao` route, sealed
pub fn default_router() -> Result<ProposalRouter> {
    let mut router = ProposalRouter::new();
    router.add_route(ROUTER_KEY, dao_proposal_handler)?;
    router.seal();
    Ok(router)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{SoftwareUpgradeProposal, TextProposal};
    use chrono::{TimeZone, Utc};
    use staking_core::{BlockHeader, MemStore};

    fn header(height: u64) -> BlockHeader {
        BlockHeader {
            chain_id: "dao-test".into(),
            height,
            time: Utc.with_ymd_and_hms(2022, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    fn upgrade(height: u64) -> Content {
        SoftwareUpgradeProposal::new(
            "upgrade",
            "move to v2",
            UpgradePlan {
                name: "v2".into(),
                height,
                info: String::new(),
            },
        )
        .into()
    }

    #[test]
    fn test_registration_rules() {
        let mut router = ProposalRouter::new();
        router.add_route("dao", dao_proposal_handler).unwrap();
        assert!(matches!(
            router.add_route("dao", dao_proposal_handler),
            Err(Error::DuplicateRoute(_))
        ));
        assert!(matches!(
            router.add_route("bad-route", dao_proposal_handler),
            Err(Error::InvalidRoute(_))
        ));

        router.seal();
        assert!(router.is_sealed());
        assert!(matches!(
            router.add_route("treasury", dao_proposal_handler),
            Err(Error::RouterSealed(_))
        ));
        assert!(router.has_route("dao"));
        assert!(!router.has_route("treasury"));
    }

    #[test]
    fn test_unknown_route() {
        let router = ProposalRouter::new();
        let mut store = MemStore::new();
        let mut ctx = Context::new(&mut store, header(1));
        let err = router
            .execute(&mut ctx, &TextProposal::new("t", "d").into())
            .unwrap_err();
        assert!(matches!(err, Error::UnknownProposalRoute(route) if route == "dao"));
    }

    #[test]
    fn test_text_proposal_is_noop() {
        let router = default_router().unwrap();
        let mut store = MemStore::new();
        let mut ctx = Context::new(&mut store, header(1));
        router
            .execute(&mut ctx, &TextProposal::new("t", "d").into())
            .unwrap();
        drop(ctx);
        assert!(store.is_empty());
    }

    #[test]
    fn test_software_upgrade_scheduling() {
        let router = default_router().unwrap();
        let mut store = MemStore::new();

        let mut ctx = Context::new(&mut store, header(10));
        assert!(matches!(
            router.execute(&mut ctx, &upgrade(10)),
            Err(Error::InvalidContent(_))
        ));
        router.execute(&mut ctx, &upgrade(100)).unwrap();
        assert!(matches!(
            router.execute(&mut ctx, &upgrade(200)),
            Err(Error::InvalidContent(_))
        ));
        drop(ctx);

        let plan = scheduled_upgrade(&store).unwrap().unwrap();
        assert_eq!(plan.name, "v2");
        assert_eq!(plan.height, 100);
    }

    #[test]
    fn test_failing_handler_rolls_back() {
        let mut router = ProposalRouter::new();
        router
            .add_route("dao", |ctx, _content| {
                ctx.store_mut().set(b"partial", b"write".to_vec())?;
                Err(Error::InvalidContent("boom".into()))
            })
            .unwrap();

        let mut store = MemStore::new();
        let mut ctx = Context::new(&mut store, header(1));
        assert!(router
            .execute(&mut ctx, &TextProposal::new("t", "d").into())
            .is_err());
        drop(ctx);
        assert!(store.is_empty());
    }
}
