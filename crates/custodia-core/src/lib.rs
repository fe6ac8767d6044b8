pub mod asset;
pub mod constants;
pub mod edge;
pub mod error;
pub mod index_table;
pub mod key;
pub mod types;

pub use asset::{asset_id, Asset};
pub use edge::{AccessType, Edge, EdgeData, EdgeKind};
pub use error::{CustodiaError, Result};
pub use index_table::IndexTableDescriptor;
pub use key::{Key, KeyKind};
pub use types::{AssetId, Hash32, KeyId, Timestamp};
