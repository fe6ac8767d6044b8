//! Host ledger abstraction and the caching facade the rest of Custodia
//! transacts through (spec §4.C, §6).

pub mod blob;
pub mod cached;
pub mod host;
pub mod memory;
pub mod tx;

pub use blob::{BlobStore, MemoryBlobStore};
pub use cached::{CacheConfig, CachedLedger};
pub use host::{HostLedger, LedgerKey, LedgerValue};
pub use memory::MemoryLedger;
pub use tx::Transaction;
