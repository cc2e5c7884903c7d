//! Execution context handed to every ledger operation

use crate::error::{Error, Result};
use crate::store::{CacheStore, KvStore};
use crate::tags::Tags;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Block clock supplied by the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    /// Chain identifier
    pub chain_id: String,
    /// Block height
    pub height: u64,
    /// Block time
    pub time: DateTime<Utc>,
}

/// Store handle, block header and the tags emitted so far
pub struct Context<'a> {
    store: &'a mut dyn KvStore,
    header: BlockHeader,
    tags: Tags,
}

impl<'a> Context<'a> {
    /// Wrap a store for one block
    pub fn new(store: &'a mut dyn KvStore, header: BlockHeader) -> Self {
        Self {
            store,
            header,
            tags: Tags::new(),
        }
    }

    /// Read access to the store
    pub fn store(&self) -> &dyn KvStore {
        &*self.store
    }

    /// Write access to the store
    pub fn store_mut(&mut self) -> &mut dyn KvStore {
        &mut *self.store
    }

    /// Current block header
    pub fn header(&self) -> &BlockHeader {
        &self.header
    }

    /// Current block height
    pub fn block_height(&self) -> u64 {
        self.header.height
    }

    /// Current block time
    pub fn block_time(&self) -> DateTime<Utc> {
        self.header.time
    }

    /// Record tags for indexing
    pub fn emit(&mut self, tags: Tags) {
        self.tags.extend(tags);
    }

    /// Tags emitted so far
    pub fn tags(&self) -> &Tags {
        &self.tags
    }

    /// Take the emitted tags, leaving none behind
    pub fn take_tags(&mut self) -> Tags {
        std::mem::take(&mut self.tags)
    }

    /// Run `f` against a cache branch of the store.
    ///
    /// Writes and tags reach this context only when `f` succeeds.
    pub fn branch<T, F>(&mut self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Context<'_>) -> Result<T>,
    {
        self.branch_with(f)
    }

    /// [`Context::branch`] for callers with their own error type
    pub fn branch_with<T, E, F>(&mut self, f: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&mut Context<'_>) -> std::result::Result<T, E>,
        E: From<Error>,
    {
        let header = self.header.clone();
        let mut cache = CacheStore::new(&mut *self.store);

        let (result, tags) = {
            let mut sub = Context::new(&mut cache, header);
            let result = f(&mut sub);
            (result, sub.tags)
        };

        let value = result?;
        cache.write()?;
        self.tags.extend(tags);
        Ok(value)
    }
}

impl fmt::Debug for Context<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("header", &self.header)
            .field("tags", &self.tags)
            .finish()
    }
}
