//! Staking Node Binary
//!
//! Opens the RocksDB state store, initializes the chain from genesis on first
//! start and replays blocks from a JSON-lines file:
//!
//! ```text
//! {"height": 1, "time": "2026-01-01T00:00:00Z", "txs": [<tx>, ...], "proposals": [<content>, ...]}
//! ```
//!
//! Blocks at or below the last committed height are skipped, so the same file
//! can be replayed after a restart.

use anyhow::{bail, Context as _, Result};
use chain_app::{Config, GenesisState, StakingApp};
use chain_app::tx::StdTx;
use chrono::{DateTime, Utc};
use dao::Content;
use serde::Deserialize;
use staking_core::{BlockHeader, RocksStore};
use std::io::{BufRead, BufReader};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const META_LAST_HEIGHT: &[u8] = b"last_height";
const META_APP_HASH: &[u8] = b"app_hash";

#[derive(Debug, Deserialize)]
struct BlockFile {
    height: u64,
    time: DateTime<Utc>,
    #[serde(default)]
    txs: Vec<StdTx>,
    #[serde(default)]
    proposals: Vec<Content>,
}

fn load_config() -> Result<Config> {
    let config = if let Ok(config_path) = std::env::var("STAKINGD_CONFIG") {
        info!("Loading config from: {}", config_path);
        Config::from_file(&config_path)?
    } else {
        info!("Loading config from environment variables");
        Config::from_env()?
    };
    config.validate()?;
    Ok(config)
}

fn save_commit(app: &StakingApp<RocksStore>, height: u64, hash: &[u8]) -> Result<()> {
    app.store().put_meta(META_LAST_HEIGHT, &height.to_be_bytes())?;
    app.store().put_meta(META_APP_HASH, hash)?;
    Ok(())
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    info!("Starting staking node");

    let config = load_config()?;
    info!(chain_id = %config.chain_id, data_dir = ?config.storage.data_dir, "Configuration loaded");

    let store = RocksStore::open(&config.storage)?;
    let last_height = store.get_meta(META_LAST_HEIGHT)?;
    let last_hash = store.get_meta(META_APP_HASH)?.unwrap_or_default();
    let mut app = StakingApp::new(store, &config)?;

    match last_height {
        Some(bytes) => {
            let bytes: [u8; 8] = bytes
                .as_slice()
                .try_into()
                .context("corrupt last height metadata")?;
            app.restore(u64::from_be_bytes(bytes), last_hash)?;
        }
        None => {
            let genesis = match &config.genesis_file {
                Some(path) => GenesisState::from_file(path)
                    .with_context(|| format!("reading genesis {}", path.display()))?,
                None => {
                    warn!("No genesis file configured, starting from an empty state");
                    GenesisState::default()
                }
            };
            let updates = app.init_chain(&genesis, Utc::now())?;
            info!(validators = updates.len(), "Genesis applied");
            let info = app.info();
            let hash = hex::decode(&info.last_app_hash)?;
            save_commit(&app, 0, &hash)?;
        }
    }

    let Some(blocks_path) = std::env::args().nth(1) else {
        info!(height = app.info().last_height, "No blocks file given, exiting");
        return Ok(());
    };

    let file = std::fs::File::open(&blocks_path)
        .with_context(|| format!("opening blocks file {}", blocks_path))?;

    for (line_no, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let block: BlockFile = serde_json::from_str(&line)
            .with_context(|| format!("parsing block on line {}", line_no + 1))?;

        let committed = app.info().last_height;
        if block.height <= committed {
            continue;
        }
        if block.height != committed + 1 {
            bail!("block {} does not follow committed height {}", block.height, committed);
        }

        app.begin_block(BlockHeader {
            chain_id: config.chain_id.clone(),
            height: block.height,
            time: block.time,
        })?;

        let mut failed = 0usize;
        for tx in &block.txs {
            let response = app.deliver_tx(&tx.to_bytes()?);
            if !response.is_ok() {
                failed += 1;
            }
        }

        for content in &block.proposals {
            if let Err(e) = app.execute_proposal(content) {
                warn!(height = block.height, error = %e, "Proposal execution failed");
            }
        }

        let end = app.end_block()?;
        let hash = app.commit()?;
        save_commit(&app, block.height, &hash)?;

        info!(
            height = block.height,
            txs = block.txs.len(),
            failed,
            validator_updates = end.validator_updates.len(),
            "Block applied"
        );
    }

    info!(
        height = app.info().last_height,
        app_hash = %app.info().last_app_hash,
        "Replay finished"
    );
    println!("{}", app.metrics().gather_text());

    Ok(())
}
