//! Key-Access Graph: edge storage and the five-strategy access-resolution
//! traversal (spec §4.D).

pub mod edge_store;
pub mod ids;
pub mod traversal;

pub use edge_store::{add_edge, edges_from, get_edge, get_key_along_path, revoke, update_edge_data, verify_access_path};
pub use ids::write_only_key_id;
pub use traversal::{check_access, resolve_access, AssetAccess, CallerKeys, DatatypeLink, Strategy};
