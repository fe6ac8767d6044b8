use std::cell::RefCell;
use std::collections::BTreeMap;

use custodia_core::constants::{COMPOSITE_KEY_DELIMITER, COMPOSITE_KEY_NORMALIZED_PREFIX};
use custodia_core::{CustodiaError, Result, Timestamp};

use crate::host::{HostLedger, LedgerKey, LedgerValue};

/// In-process reference `HostLedger`, backed by a `BTreeMap` rather than the
/// teacher's `sled` tree — persistence here belongs to the embedding host,
/// not to this crate, so a process-local map is enough for tests and for
/// hosts that want a ready-made in-memory backend.
pub struct MemoryLedger {
    data: RefCell<BTreeMap<LedgerKey, LedgerValue>>,
    tx_id: String,
    tx_timestamp: Timestamp,
}

impl MemoryLedger {
    pub fn new(tx_id: impl Into<String>, tx_timestamp: Timestamp) -> Self {
        Self {
            data: RefCell::new(BTreeMap::new()),
            tx_id: tx_id.into(),
            tx_timestamp,
        }
    }
}

impl HostLedger for MemoryLedger {
    fn get(&self, key: &[u8]) -> Result<Option<LedgerValue>> {
        Ok(self.data.borrow().get(key).cloned())
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.data.borrow_mut().insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn del(&self, key: &[u8]) -> Result<()> {
        self.data.borrow_mut().remove(key);
        Ok(())
    }

    fn range(&self, start: &[u8], end: &[u8]) -> Result<Vec<(LedgerKey, LedgerValue)>> {
        let data = self.data.borrow();
        let iter = if end.is_empty() {
            data.range(start.to_vec()..)
        } else {
            data.range(start.to_vec()..end.to_vec())
        };
        Ok(iter.map(|(k, v)| (k.clone(), v.clone())).collect())
    }

    fn composite_key(&self, table: &str, parts: &[&[u8]]) -> LedgerKey {
        let mut raw = Vec::new();
        raw.push(COMPOSITE_KEY_NORMALIZED_PREFIX);
        raw.extend_from_slice(table.as_bytes());
        for part in parts {
            raw.push(COMPOSITE_KEY_DELIMITER);
            raw.extend_from_slice(part);
        }
        raw
    }

    fn split_composite_key(&self, key: &[u8]) -> Result<(String, Vec<Vec<u8>>)> {
        if key.first() != Some(&COMPOSITE_KEY_NORMALIZED_PREFIX) {
            return Err(CustodiaError::invalid_input("not a composite key"));
        }
        let mut segments = key[1..].split(|b| *b == COMPOSITE_KEY_DELIMITER);
        let table = segments
            .next()
            .ok_or_else(|| CustodiaError::invalid_input("composite key missing table tag"))?;
        let table = String::from_utf8(table.to_vec())
            .map_err(|e| CustodiaError::invalid_input(format!("table tag not utf8: {e}")))?;
        let parts = segments.map(|s| s.to_vec()).collect();
        Ok((table, parts))
    }

    fn tx_id(&self) -> String {
        self.tx_id.clone()
    }

    fn tx_timestamp(&self) -> Timestamp {
        self.tx_timestamp
    }
}
