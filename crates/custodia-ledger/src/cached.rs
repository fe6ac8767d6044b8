use std::any::Any;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use custodia_core::constants::COMPOSITE_KEY_NORMALIZED_PREFIX;
use custodia_core::{CustodiaError, Result};

use crate::host::{HostLedger, LedgerKey, LedgerValue};

/// Which of the facade's caches are active. Both default on; hosts that
/// guarantee their own per-transaction read-your-writes snapshot can turn
/// either off (spec §4.C: "optional").
#[derive(Debug, Clone, Copy)]
pub struct CacheConfig {
    pub read_cache: bool,
    pub write_cache: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            read_cache: true,
            write_cache: true,
        }
    }
}

/// Wraps a `HostLedger` with the read/write/sorted-key/side caches described
/// in spec §4.C. Lives for exactly one transaction; every cache is dropped
/// with it, which is how "a cancelled transaction discards every cached
/// write" (spec §5) falls out naturally — the facade never buffers writes
/// that the host hasn't already durably applied.
pub struct CachedLedger<'a, L: HostLedger> {
    host: &'a L,
    config: CacheConfig,
    read_cache: RefCell<HashMap<LedgerKey, Option<LedgerValue>>>,
    /// Sorted view of every key this facade has observed, with a flag for
    /// whether it was materialized by a full range scan starting there.
    sorted_keys: RefCell<BTreeMap<LedgerKey, bool>>,
    side_cache: RefCell<HashMap<String, Rc<dyn Any>>>,
}

impl<'a, L: HostLedger> CachedLedger<'a, L> {
    pub fn new(host: &'a L, config: CacheConfig) -> Self {
        Self {
            host,
            config,
            read_cache: RefCell::new(HashMap::new()),
            sorted_keys: RefCell::new(BTreeMap::new()),
            side_cache: RefCell::new(HashMap::new()),
        }
    }

    fn reject_reserved_prefix(key: &[u8]) -> Result<()> {
        if key.first() == Some(&0x00) {
            return Err(CustodiaError::invalid_input(
                "keys beginning with 0x00 are reserved for composite-key delimiters",
            ));
        }
        Ok(())
    }

    pub fn get(&self, key: &[u8]) -> Result<Option<LedgerValue>> {
        Self::reject_reserved_prefix(key)?;
        if self.config.read_cache {
            if let Some(cached) = self.read_cache.borrow().get(key) {
                return Ok(cached.clone());
            }
        }
        let value = self.host.get(key)?;
        if self.config.read_cache {
            self.read_cache
                .borrow_mut()
                .insert(key.to_vec(), value.clone());
            self.sorted_keys.borrow_mut().insert(key.to_vec(), false);
        }
        Ok(value)
    }

    pub fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        Self::reject_reserved_prefix(key)?;
        self.host.put(key, value)?;
        if self.config.write_cache {
            self.read_cache
                .borrow_mut()
                .insert(key.to_vec(), Some(value.to_vec()));
            self.sorted_keys.borrow_mut().insert(key.to_vec(), false);
        }
        Ok(())
    }

    pub fn del(&self, key: &[u8]) -> Result<()> {
        Self::reject_reserved_prefix(key)?;
        self.host.del(key)?;
        if self.config.write_cache {
            self.read_cache.borrow_mut().insert(key.to_vec(), None);
            self.sorted_keys.borrow_mut().insert(key.to_vec(), false);
        }
        Ok(())
    }

    /// Range scan merging cached and host-backed entries in one total
    /// order (spec §4.C sorted-key view).
    pub fn range(&self, start: &[u8], end: &[u8]) -> Result<Vec<(LedgerKey, LedgerValue)>> {
        let host_rows = self.host.range(start, end)?;
        if !self.config.read_cache {
            return Ok(host_rows);
        }

        {
            let mut read_cache = self.read_cache.borrow_mut();
            let mut sorted = self.sorted_keys.borrow_mut();
            for (k, v) in &host_rows {
                read_cache.insert(k.clone(), Some(v.clone()));
                sorted.entry(k.clone()).or_insert(false);
            }
            sorted
                .entry(start.to_vec())
                .and_modify(|is_start| *is_start = true)
                .or_insert(true);
        }

        let read_cache = self.read_cache.borrow();
        let sorted = self.sorted_keys.borrow();
        let in_range = sorted.range(start.to_vec()..).take_while(|(k, _)| {
            end.is_empty() || k.as_slice() < end
        });

        let mut out = Vec::new();
        for (k, _) in in_range {
            if let Some(Some(v)) = read_cache.get(k) {
                out.push((k.clone(), v.clone()));
            }
        }
        Ok(out)
    }

    pub fn composite_key(&self, table: &str, parts: &[&[u8]]) -> LedgerKey {
        let key = self.host.composite_key(table, parts);
        debug_assert_eq!(key.first(), Some(&COMPOSITE_KEY_NORMALIZED_PREFIX));
        key
    }

    pub fn split_composite_key(&self, key: &[u8]) -> Result<(String, Vec<Vec<u8>>)> {
        self.host.split_composite_key(key)
    }

    pub fn tx_id(&self) -> String {
        self.host.tx_id()
    }

    pub fn tx_timestamp(&self) -> custodia_core::Timestamp {
        self.host.tx_timestamp()
    }

    /// Memoize an arbitrary value under `key` for the lifetime of this
    /// transaction (spec §4.C side cache — e.g. access decisions).
    pub fn side_cache_put<T: Any>(&self, key: &str, value: T) {
        self.side_cache
            .borrow_mut()
            .insert(key.to_string(), Rc::new(value));
    }

    pub fn side_cache_get<T: Any + Clone>(&self, key: &str) -> Option<T> {
        self.side_cache
            .borrow()
            .get(key)
            .and_then(|v| v.downcast_ref::<T>().cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryLedger;

    #[test]
    fn read_cache_serves_without_host_roundtrip() {
        let host = MemoryLedger::new("tx", 0);
        let ledger = CachedLedger::new(&host, CacheConfig::default());
        ledger.put(b"a", b"1").unwrap();
        host.del(b"a").unwrap(); // sneak a change in behind the facade's back
        assert_eq!(ledger.get(b"a").unwrap(), Some(b"1".to_vec()));
    }

    #[test]
    fn reserved_prefix_rejected() {
        let host = MemoryLedger::new("tx", 0);
        let ledger = CachedLedger::new(&host, CacheConfig::default());
        assert!(ledger.get(&[0x00, 1, 2]).is_err());
    }

    #[test]
    fn side_cache_roundtrip() {
        let host = MemoryLedger::new("tx", 0);
        let ledger = CachedLedger::new(&host, CacheConfig::default());
        ledger.side_cache_put("decision", true);
        assert_eq!(ledger.side_cache_get::<bool>("decision"), Some(true));
        assert_eq!(ledger.side_cache_get::<i32>("missing"), None);
    }

    #[test]
    fn range_merges_cache_and_host() {
        let host = MemoryLedger::new("tx", 0);
        let ledger = CachedLedger::new(&host, CacheConfig::default());
        ledger.put(b"a", b"1").unwrap();
        ledger.put(b"b", b"2").unwrap();
        ledger.put(b"c", b"3").unwrap();
        let rows = ledger.range(b"a", b"c").unwrap();
        assert_eq!(rows.len(), 2);
    }
}
