//! Key-value store abstraction
//!
//! All ledger state goes through [`KvStore`]. A [`CacheStore`] branches a
//! parent store: reads fall through, writes are buffered and only reach the
//! parent on [`CacheStore::write`]. Dropping a branch discards its writes,
//! which is how failed operations roll back.

use crate::error::Result;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Ordered byte key-value store
pub trait KvStore {
    /// Read a value
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Write a value
    fn set(&mut self, key: &[u8], value: Vec<u8>) -> Result<()>;

    /// Remove a value
    fn delete(&mut self, key: &[u8]) -> Result<()>;

    /// All pairs whose key starts with `prefix`, in key order
    fn prefix_scan(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>>;
}

/// Store that can make its pending writes durable
pub trait CommitStore: KvStore {
    /// Persist every write since the last commit
    fn commit(&mut self) -> Result<()>;
}

/// Typed access on top of raw bytes (bincode)
pub trait KvStoreExt: KvStore {
    /// Read and decode
    fn get_decoded<T: DeserializeOwned>(&self, key: &[u8]) -> Result<Option<T>> {
        match self.get(key)? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Encode and write
    fn set_encoded<T: Serialize>(&mut self, key: &[u8], value: &T) -> Result<()> {
        self.set(key, bincode::serialize(value)?)
    }

    /// Decode every value under `prefix`
    fn scan_decoded<T: DeserializeOwned>(&self, prefix: &[u8]) -> Result<Vec<T>> {
        self.prefix_scan(prefix)?
            .into_iter()
            .map(|(_, v)| Ok(bincode::deserialize(&v)?))
            .collect()
    }
}

impl<S: KvStore + ?Sized> KvStoreExt for S {}

/// In-memory store
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MemStore {
    data: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl MemStore {
    /// Empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True when no keys are stored
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl KvStore for MemStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.data.get(key).cloned())
    }

    fn set(&mut self, key: &[u8], value: Vec<u8>) -> Result<()> {
        self.data.insert(key.to_vec(), value);
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> Result<()> {
        self.data.remove(key);
        Ok(())
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        Ok(self
            .data
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }
}

impl CommitStore for MemStore {
    fn commit(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Buffered writes over a parent store
pub struct CacheStore<'a, S: KvStore + ?Sized> {
    parent: &'a mut S,
    writes: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
}

impl<'a, S: KvStore + ?Sized> CacheStore<'a, S> {
    /// Branch `parent`
    pub fn new(parent: &'a mut S) -> Self {
        Self {
            parent,
            writes: BTreeMap::new(),
        }
    }

    /// Number of buffered writes
    pub fn pending(&self) -> usize {
        self.writes.len()
    }

    /// Flush buffered writes to the parent
    pub fn write(self) -> Result<()> {
        let Self { parent, writes } = self;
        for (key, value) in writes {
            match value {
                Some(value) => parent.set(&key, value)?,
                None => parent.delete(&key)?,
            }
        }
        Ok(())
    }
}

impl<S: KvStore + ?Sized> fmt::Debug for CacheStore<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheStore")
            .field("pending", &self.writes.len())
            .finish()
    }
}

impl<S: KvStore + ?Sized> KvStore for CacheStore<'_, S> {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        match self.writes.get(key) {
            Some(value) => Ok(value.clone()),
            None => self.parent.get(key),
        }
    }

    fn set(&mut self, key: &[u8], value: Vec<u8>) -> Result<()> {
        self.writes.insert(key.to_vec(), Some(value));
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> Result<()> {
        self.writes.insert(key.to_vec(), None);
        Ok(())
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        let mut merged: BTreeMap<Vec<u8>, Vec<u8>> =
            self.parent.prefix_scan(prefix)?.into_iter().collect();

        let overlay = self
            .writes
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mem_store_prefix_scan() {
        let mut store = MemStore::new();
        store.set(b"a1", b"x".to_vec()).unwrap();
        store.set(b"a2", b"y".to_vec()).unwrap();
        store.set(b"b1", b"z".to_vec()).unwrap();

        let keys: Vec<_> = store.prefix_scan(b"a").unwrap().into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec![b"a1".to_vec(), b"a2".to_vec()]);
    }

    #[test]
    fn test_cache_write_flushes() {
        let mut store = MemStore::new();
        store.set(b"k", b"old".to_vec()).unwrap();

        let mut cache = CacheStore::new(&mut store);
        cache.set(b"k", b"new".to_vec()).unwrap();
        cache.set(b"n", b"1".to_vec()).unwrap();
        assert_eq!(cache.get(b"k").unwrap(), Some(b"new".to_vec()));
        cache.write().unwrap();

        assert_eq!(store.get(b"k").unwrap(), Some(b"new".to_vec()));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_cache_drop_discards() {
        let mut store = MemStore::new();
        store.set(b"k", b"v".to_vec()).unwrap();
        {
            let mut cache = CacheStore::new(&mut store);
            cache.delete(b"k").unwrap();
            cache.set(b"x", b"y".to_vec()).unwrap();
            assert_eq!(cache.get(b"k").unwrap(), None);
        }
        assert_eq!(store.get(b"k").unwrap(), Some(b"v".to_vec()));
        assert_eq!(store.get(b"x").unwrap(), None);
    }

    #[test]
    fn test_cache_prefix_scan_overlays_writes() {
        let mut store = MemStore::new();
        store.set(b"p1", b"a".to_vec()).unwrap();
        store.set(b"p2", b"b".to_vec()).unwrap();

        let mut cache = CacheStore::new(&mut store);
        cache.delete(b"p1").unwrap();
        cache.set(b"p3", b"c".to_vec()).unwrap();

        let scanned = cache.prefix_scan(b"p").unwrap();
        assert_eq!(
            scanned,
            vec![(b"p2".to_vec(), b"b".to_vec()), (b"p3".to_vec(), b"c".to_vec())]
        );
    }

    #[test]
    fn test_nested_branches() {
        let mut store = MemStore::new();
        let mut outer = CacheStore::new(&mut store);
        outer.set(b"a", b"1".to_vec()).unwrap();
        {
            let mut inner = CacheStore::new(&mut outer);
            inner.set(b"b", b"2".to_vec()).unwrap();
            // dropped without write
        }
        outer.write().unwrap();
        assert_eq!(store.get(b"a").unwrap(), Some(b"1".to_vec()));
        assert_eq!(store.get(b"b").unwrap(), None);
    }
}
