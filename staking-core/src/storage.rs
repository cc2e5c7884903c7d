//! Storage layer using RocksDB
//!
//! # Column Families
//!
//! - `state` - Ledger state (validators, delegations, balances, pool)
//! - `meta` - Commit metadata kept outside the state hash
//!
//! Writes are buffered in memory and reach the database in a single
//! `WriteBatch` on [`CommitStore::commit`], so a crash between blocks never
//! leaves a half-applied block on disk.

use crate::{
    config::StorageConfig,
    error::{Error, Result},
    store::{CommitStore, KvStore},
};
use rocksdb::{
    ColumnFamily, ColumnFamilyDescriptor, DBCompressionType, Direction, IteratorMode, Options,
    WriteBatch, DB,
};
use std::collections::BTreeMap;
use std::fmt;

/// Column family names
const CF_STATE: &str = "state";
const CF_META: &str = "meta";

/// RocksDB-backed store
pub struct RocksStore {
    db: DB,
    pending: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
}

impl RocksStore {
    /// Open or create database
    pub fn open(config: &StorageConfig) -> Result<Self> {
        let path = &config.data_dir;
        std::fs::create_dir_all(path)?;

        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);
        db_opts.set_write_buffer_size(config.write_buffer_size_mb * 1024 * 1024);
        db_opts.set_max_write_buffer_number(config.max_write_buffer_number);
        db_opts.set_max_background_jobs(config.max_background_jobs);
        if config.enable_statistics {
            db_opts.enable_statistics();
        }

        let cf_descriptors = vec![
            ColumnFamilyDescriptor::new(CF_STATE, Self::cf_options_state()),
            ColumnFamilyDescriptor::new(CF_META, Options::default()),
        ];

        let db = DB::open_cf_descriptors(&db_opts, path, cf_descriptors)?;

        tracing::info!(path = ?path, "Opened RocksDB state store");

        Ok(Self {
            db,
            pending: BTreeMap::new(),
        })
    }

    fn cf_options_state() -> Options {
        let mut opts = Options::default();
        // State is read on every message, favour LZ4 for speed
        opts.set_compression_type(DBCompressionType::Lz4);
        let mut block_opts = rocksdb::BlockBasedOptions::default();
        block_opts.set_bloom_filter(10.0, false);
        opts.set_block_based_table_factory(&block_opts);
        opts
    }

    fn cf_handle(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| Error::Storage(format!("Column family {} not found", name)))
    }

    /// Read a metadata value (committed immediately, never hashed)
    pub fn get_meta(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let cf = self.cf_handle(CF_META)?;
        Ok(self.db.get_cf(cf, key)?)
    }

    /// Write a metadata value
    pub fn put_meta(&self, key: &[u8], value: &[u8]) -> Result<()> {
        let cf = self.cf_handle(CF_META)?;
        self.db.put_cf(cf, key, value)?;
        Ok(())
    }

    /// Drop uncommitted writes
    pub fn discard(&mut self) {
        self.pending.clear();
    }

    /// Number of uncommitted writes
    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}

impl KvStore for RocksStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        if let Some(value) = self.pending.get(key) {
            return Ok(value.clone());
        }
        let cf = self.cf_handle(CF_STATE)?;
        Ok(self.db.get_cf(cf, key)?)
    }

    fn set(&mut self, key: &[u8], value: Vec<u8>) -> Result<()> {
        self.pending.insert(key.to_vec(), Some(value));
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> Result<()> {
        self.pending.insert(key.to_vec(), None);
        Ok(())
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        let cf = self.cf_handle(CF_STATE)?;
        let mut merged = BTreeMap::new();

        let iter = self
            .db
            .iterator_cf(cf, IteratorMode::From(prefix, Direction::Forward));
        for item in iter {
            let (key, value) = item?;
            if !key.starts_with(prefix) {
                break;
            }
            merged.insert(key.to_vec(), value.to_vec());
        }

        let overlay = self
            .pending
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix));
        for (key, value) in overlay {
            match value {
                Some(value) => {
                    merged.insert(key.clone(), value.clone());
                }
                None => {
                    merged.remove(key);
                }
            }
        }

        Ok(merged.into_iter().collect())
    }
}

impl CommitStore for RocksStore {
    fn commit(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }

        let cf = self.cf_handle(CF_STATE)?;
        let mut batch = WriteBatch::default();
        for (key, value) in &self.pending {
            match value {
                Some(value) => batch.put_cf(cf, key, value),
                None => batch.delete_cf(cf, key),
            }
        }
        let writes = self.pending.len();
        self.db.write(batch)?;
        self.pending.clear();

        tracing::debug!(writes, "State batch committed");
        Ok(())
    }
}

impl fmt::Debug for RocksStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RocksStore")
            .field("path", &self.db.path())
            .field("pending", &self.pending.len())
            .finish()
    }
}
