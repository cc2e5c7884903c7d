//! Message dispatch by route

use crate::msg::AppMsg;
use crate::{Error, Result};
use staking_core::{Context, Keeper, Msg, StakingMsg, Tags};
use std::collections::BTreeMap;
use std::fmt;

/// Applies messages for one route
pub trait Handler {
    /// Apply `msg` against `ctx`, returning tags for indexing
    fn handle(&self, ctx: &mut Context<'_>, msg: &AppMsg) -> Result<Tags>;
}

/// Route → handler table
#[derive(Default)]
pub struct Router {
    routes: BTreeMap<&'static str, Box<dyn Handler>>,
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("routes", &self.routes.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Router {
    /// Empty router
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `route`
    pub fn add_route(&mut self, route: &'static str, handler: Box<dyn Handler>) -> Result<()> {
        if self.routes.contains_key(route) {
            return Err(Error::DuplicateRoute(route.to_string()));
        }
        self.routes.insert(route, handler);
        Ok(())
    }

    /// Whether `route` has a handler
    pub fn has_route(&self, route: &str) -> bool {
        self.routes.contains_key(route)
    }

    /// Dispatch `msg` by its route
    pub fn dispatch(&self, ctx: &mut Context<'_>, msg: &AppMsg) -> Result<Tags> {
        let route = msg.route();
        let handler = self
            .routes
            .get(route)
            .ok_or_else(|| Error::UnknownRoute(route.to_string()))?;
        handler.handle(ctx, msg)
    }
}

/// Handler for the `staking` route
#[derive(Debug, Clone)]
pub struct StakingHandler {
    keeper: Keeper,
}

impl StakingHandler {
    /// Wrap a keeper
    pub fn new(keeper: Keeper) -> Self {
        Self { keeper }
    }
}

impl Handler for StakingHandler {
    fn handle(&self, ctx: &mut Context<'_>, msg: &AppMsg) -> Result<Tags> {
        let msg = match msg {
            AppMsg::Staking(m) => m,
            other => return Err(Error::UnknownRoute(other.route().to_string())),
        };
        let tags = match msg {
            StakingMsg::CreateValidator(m) => self.keeper.apply_create_validator(ctx, m)?,
            StakingMsg::EditValidator(m) => self.keeper.apply_edit_validator(ctx, m)?,
            StakingMsg::Delegate(m) => self.keeper.apply_delegate(ctx, m)?,
            StakingMsg::Undelegate(m) => self.keeper.apply_undelegate(ctx, m)?,
            StakingMsg::BeginRedelegate(m) => self.keeper.apply_begin_redelegate(ctx, m)?,
            StakingMsg::IndexDelegate(m) => self.keeper.apply_index_delegate(ctx, m)?,
        };
        Ok(tags)
    }
}
