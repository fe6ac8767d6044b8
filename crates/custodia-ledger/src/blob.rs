use std::cell::RefCell;
use std::collections::HashMap;

use custodia_core::{Hash32, Result};
use sha2::{Digest, Sha256};

/// Optional external content-addressed store for off-chain index rows
/// (spec §4.E off-chain mode, §6 "external blob datastore"). Deletion is
/// not required — content ids are immutable once written.
pub trait BlobStore {
    fn put(&self, bytes: &[u8]) -> Result<String>;
    fn get(&self, content_id: &str) -> Result<Option<Vec<u8>>>;
}

/// In-memory reference `BlobStore`, content-addressed by hex SHA-256.
#[derive(Default)]
pub struct MemoryBlobStore {
    data: RefCell<HashMap<String, Vec<u8>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BlobStore for MemoryBlobStore {
    fn put(&self, bytes: &[u8]) -> Result<String> {
        let digest: [u8; 32] = Sha256::digest(bytes).into();
        let id = Hash32::from_bytes(digest).to_hex();
        self.data.borrow_mut().insert(id.clone(), bytes.to_vec());
        Ok(id)
    }

    fn get(&self, content_id: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.data.borrow().get(content_id).cloned())
    }
}
