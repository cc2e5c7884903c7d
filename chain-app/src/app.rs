//! Application shell
//!
//! Drives the staking keeper through the block lifecycle. Every delivered
//! transaction runs in one cache branch: either all of its messages apply or
//! none do.

use crate::config::Config;
use crate::genesis::GenesisState;
use crate::metrics::Metrics;
use crate::router::{Router, StakingHandler};
use crate::tx::{tx_hash, Tx, TxDecoder};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use dao::{validate_abstract, Content, ContentLimits, ProposalContent, ProposalRouter};
use serde::Serialize;
use sha2::{Digest, Sha256};
use staking_core::error::ErrorCode;
use staking_core::keys::PARAMS_KEY;
use staking_core::{
    bank, invariants, tags, BlockHeader, CommitStore, Context, Keeper, KvStore, Tags,
    ValidatorUpdate,
};
use std::fmt;
use tracing::{debug, info, warn};

/// Result of checking or delivering a transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TxResponse {
    /// Zero on success
    pub code: u32,
    /// Codespace of `code`, empty on success
    pub codespace: String,
    /// Error message, empty on success
    pub log: String,
    /// Tags emitted by the messages
    pub tags: Tags,
    /// Transaction hash
    pub hash: String,
}

impl TxResponse {
    fn ok(hash: String, tags: Tags) -> Self {
        Self {
            code: 0,
            codespace: String::new(),
            log: String::new(),
            tags,
            hash,
        }
    }

    fn err(hash: String, error: &Error) -> Self {
        Self {
            code: error.code(),
            codespace: error.codespace().to_string(),
            log: error.to_string(),
            tags: Tags::new(),
            hash,
        }
    }

    /// Whether the transaction was accepted
    pub fn is_ok(&self) -> bool {
        self.code == 0
    }
}

/// Result of ending a block
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EndBlockResponse {
    /// Consensus power changes
    pub validator_updates: Vec<ValidatorUpdate>,
    /// Tags from matured unbondings and redelegations
    pub tags: Tags,
}

/// Last committed state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppInfo {
    /// Chain ID
    pub chain_id: String,
    /// Last committed height
    pub last_height: u64,
    /// Uppercase hex app hash of the last commit
    pub last_app_hash: String,
}

fn staking_router(keeper: &Keeper) -> Result<Router> {
    let mut router = Router::new();
    router.add_route(
        staking_core::ROUTER_KEY,
        Box::new(StakingHandler::new(keeper.clone())),
    )?;
    Ok(router)
}

/// SHA-256 over every key and value in order, each length-prefixed.
///
/// Reads the whole state on every commit: cost grows with total state size,
/// not with the block's writes.
// TODO: hash only the committed write set, chained to the previous app hash.
fn app_hash(store: &dyn KvStore) -> Result<Vec<u8>> {
    let mut hasher = Sha256::new();
    for (key, value) in store.prefix_scan(&[])? {
        hasher.update((key.len() as u64).to_be_bytes());
        hasher.update(&key);
        hasher.update((value.len() as u64).to_be_bytes());
        hasher.update(&value);
    }
    Ok(hasher.finalize().to_vec())
}

/// Staking application
pub struct StakingApp<S: CommitStore> {
    store: S,
    keeper: Keeper,
    decoder: TxDecoder,
    router: Router,
    proposals: ProposalRouter,
    limits: ContentLimits,
    metrics: Metrics,
    chain_id: String,
    header: Option<BlockHeader>,
    last_height: u64,
    last_app_hash: Vec<u8>,
}

impl<S: CommitStore> fmt::Debug for StakingApp<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StakingApp")
            .field("chain_id", &self.chain_id)
            .field("params", self.keeper.params())
            .field("router", &self.router)
            .field("proposals", &self.proposals)
            .field("header", &self.header)
            .field("last_height", &self.last_height)
            .finish_non_exhaustive()
    }
}

impl<S: CommitStore> StakingApp<S> {
    /// Create the application over `store`.
    ///
    /// Parameters recorded at genesis take precedence over the configured ones.
    pub fn new(store: S, config: &Config) -> Result<Self> {
        config.validate()?;

        let params = match store.get(PARAMS_KEY)? {
            Some(bytes) => serde_json::from_slice(&bytes)?,
            None => config.staking.clone(),
        };
        let keeper = Keeper::new(params);
        let router = staking_router(&keeper)?;

        Ok(Self {
            store,
            router,
            keeper,
            decoder: TxDecoder::new()?,
            proposals: dao::default_router()?,
            limits: config.governance.clone(),
            metrics: Metrics::new()?,
            chain_id: config.chain_id.clone(),
            header: None,
            last_height: 0,
            last_app_hash: Vec::new(),
        })
    }

    /// Fund genesis accounts and create genesis validators, then commit.
    pub fn init_chain(
        &mut self,
        genesis: &GenesisState,
        time: DateTime<Utc>,
    ) -> Result<Vec<ValidatorUpdate>> {
        if self.last_height > 0 || self.header.is_some() || self.store.get(PARAMS_KEY)?.is_some() {
            return Err(Error::Genesis("chain is already initialized".into()));
        }
        genesis.validate()?;

        if let Some(params) = &genesis.params {
            self.keeper = Keeper::new(params.clone());
            self.router = staking_router(&self.keeper)?;
        }

        let params = serde_json::to_vec(self.keeper.params())?;
        let header = BlockHeader {
            chain_id: self.chain_id.clone(),
            height: 0,
            time,
        };

        let keeper = &self.keeper;
        let mut ctx = Context::new(&mut self.store, header);
        let updates = ctx.branch_with(|ctx| -> Result<Vec<ValidatorUpdate>> {
            ctx.store_mut().set(PARAMS_KEY, params)?;
            for account in &genesis.accounts {
                for coin in &account.coins {
                    bank::add_coins(ctx.store_mut(), &account.address, coin)?;
                }
            }
            for gen_tx in &genesis.gen_txs {
                keeper
                    .apply_create_validator(ctx, gen_tx)
                    .map_err(|e| Error::Genesis(format!("gen tx {}: {}", gen_tx.validator_address, e)))?;
            }
            Ok(keeper.end_block(ctx)?)
        })?;

        self.last_app_hash = app_hash(&self.store)?;
        self.store.commit()?;

        info!(
            chain_id = %self.chain_id,
            accounts = genesis.accounts.len(),
            validators = updates.len(),
            app_hash = %hex::encode_upper(&self.last_app_hash),
            "Chain initialized"
        );
        Ok(updates)
    }

    /// Decode and run stateless checks; the store is not touched
    pub fn check_tx(&self, bytes: &[u8]) -> TxResponse {
        let hash = tx_hash(bytes);
        match self.decode_checked(bytes) {
            Ok(_) => TxResponse::ok(hash, Tags::new()),
            Err(e) => {
                debug!(hash = %hash, error = %e, "CheckTx rejected");
                TxResponse::err(hash, &e)
            }
        }
    }

    fn decode_checked(&self, bytes: &[u8]) -> Result<Tx> {
        let tx = self.decoder.decode(bytes)?;
        tx.validate_basic()?;
        Ok(tx)
    }

    /// Open a block
    pub fn begin_block(&mut self, header: BlockHeader) -> Result<()> {
        if let Some(open) = &self.header {
            return Err(Error::Block(format!("block {} is still open", open.height)));
        }
        if header.chain_id != self.chain_id {
            return Err(Error::Block(format!(
                "chain id {} does not match {}",
                header.chain_id, self.chain_id
            )));
        }
        if header.height <= self.last_height {
            return Err(Error::Block(format!(
                "height {} does not follow committed height {}",
                header.height, self.last_height
            )));
        }
        debug!(height = header.height, time = %header.time, "Begin block");
        self.header = Some(header);
        Ok(())
    }

    /// Apply a transaction inside the open block
    pub fn deliver_tx(&mut self, bytes: &[u8]) -> TxResponse {
        let hash = tx_hash(bytes);
        let header = match &self.header {
            Some(header) => header.clone(),
            None => return TxResponse::err(hash, &Error::Block("no open block".into())),
        };

        let tx = match self.decode_checked(bytes) {
            Ok(tx) => tx,
            Err(e) => {
                warn!(hash = %hash, error = %e, "Rejected undecodable transaction");
                self.metrics.record_tx("unknown", false);
                return TxResponse::err(hash, &e);
            }
        };
        let msg_type = tx.primary_type();

        let router = &self.router;
        let mut ctx = Context::new(&mut self.store, header);
        let result = ctx.branch_with(|ctx| -> Result<Tags> {
            let mut tags = Tags::new();
            for msg in &tx.msgs {
                tags.extend(router.dispatch(ctx, msg)?);
            }
            Ok(tags)
        });

        match result {
            Ok(mut tags) => {
                tags.extend(ctx.take_tags());
                self.metrics.record_tx(msg_type, true);
                info!(hash = %hash, msg_type, msgs = tx.msgs.len(), "Transaction delivered");
                TxResponse::ok(hash, tags)
            }
            Err(e) => {
                self.metrics.record_tx(msg_type, false);
                warn!(
                    hash = %hash,
                    msg_type,
                    code = e.code(),
                    codespace = e.codespace(),
                    error = %e,
                    "Transaction failed"
                );
                TxResponse::err(hash, &e)
            }
        }
    }

    /// Release matured entries and recompute the bonded set
    pub fn end_block(&mut self) -> Result<EndBlockResponse> {
        let header = self
            .header
            .clone()
            .ok_or_else(|| Error::Block("end block without an open block".into()))?;

        let mut ctx = Context::new(&mut self.store, header);
        let validator_updates = self.keeper.end_block(&mut ctx)?;
        let tags = ctx.take_tags();

        let bonded = self.keeper.bonded_validators(&self.store)?.len();
        self.metrics.bonded_validators.set(bonded as i64);

        if cfg!(debug_assertions) {
            invariants::check_all(&self.keeper, &self.store)?;
        }

        Ok(EndBlockResponse {
            validator_updates,
            tags,
        })
    }

    /// Persist the block and return the app hash
    pub fn commit(&mut self) -> Result<Vec<u8>> {
        let header = self
            .header
            .take()
            .ok_or_else(|| Error::Block("commit without an open block".into()))?;

        let hash = app_hash(&self.store)?;
        self.store.commit()?;

        self.last_height = header.height;
        self.last_app_hash = hash.clone();
        self.metrics.blocks_committed.inc();

        info!(
            height = header.height,
            app_hash = %hex::encode_upper(&hash),
            "Block committed"
        );
        Ok(hash)
    }

    /// Run the handler for a passed proposal inside the open block
    pub fn execute_proposal(&mut self, content: &Content) -> Result<Tags> {
        validate_abstract(&self.limits, content)?;
        content.validate_basic()?;

        let header = self
            .header
            .clone()
            .ok_or_else(|| Error::Block("proposals execute inside an open block".into()))?;

        let mut ctx = Context::new(&mut self.store, header);
        self.proposals.execute(&mut ctx, content)?;

        let mut tags = Tags::new()
            .with(tags::ACTION, "execute_proposal")
            .with("proposal-route", content.proposal_route())
            .with("proposal-type", content.proposal_type());
        tags.extend(ctx.take_tags());

        info!(
            proposal_type = content.proposal_type(),
            title = content.title(),
            "Proposal executed"
        );
        Ok(tags)
    }

    /// Last committed height and hash
    pub fn info(&self) -> AppInfo {
        AppInfo {
            chain_id: self.chain_id.clone(),
            last_height: self.last_height,
            last_app_hash: hex::encode_upper(&self.last_app_hash),
        }
    }

    /// Resume from a previously committed height
    pub fn restore(&mut self, height: u64, app_hash: Vec<u8>) -> Result<()> {
        if self.header.is_some() {
            return Err(Error::Block("cannot restore with an open block".into()));
        }
        self.last_height = height;
        self.last_app_hash = app_hash;
        info!(height, "Restored committed state");
        Ok(())
    }

    /// Staking keeper
    pub fn keeper(&self) -> &Keeper {
        &self.keeper
    }

    /// Underlying store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Underlying store, mutably
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Metrics collector
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use staking_core::types::epoch;
    use staking_core::MemStore;

    fn app() -> StakingApp<MemStore> {
        StakingApp::new(MemStore::new(), &Config::default()).unwrap()
    }

    fn header(height: u64) -> BlockHeader {
        BlockHeader {
            chain_id: "staking-1".into(),
            height,
            time: epoch(),
        }
    }

    #[test]
    fn test_block_ordering() {
        let mut app = app();
        assert!(app.end_block().is_err());
        assert!(app.commit().is_err());

        app.begin_block(header(1)).unwrap();
        assert!(matches!(app.begin_block(header(2)), Err(Error::Block(_))));
        app.end_block().unwrap();
        app.commit().unwrap();
        assert_eq!(app.info().last_height, 1);

        assert!(matches!(app.begin_block(header(1)), Err(Error::Block(_))));
        let mut other_chain = header(2);
        other_chain.chain_id = "other".into();
        assert!(matches!(app.begin_block(other_chain), Err(Error::Block(_))));
    }

    #[test]
    fn test_deliver_outside_block() {
        let mut app = app();
        let response = app.deliver_tx(b"{}");
        assert!(!response.is_ok());
        assert_eq!(response.code, 1);
        assert_eq!(response.codespace, "sdk");
    }

    #[test]
    fn test_empty_store_hash() {
        assert_eq!(
            hex::encode(app_hash(&MemStore::new()).unwrap()),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_init_chain_twice() {
        let mut app = app();
        app.init_chain(&GenesisState::default(), epoch()).unwrap();
        assert!(matches!(
            app.init_chain(&GenesisState::default(), epoch()),
            Err(Error::Genesis(_))
        ));
    }
}
