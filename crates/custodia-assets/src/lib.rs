//! Asset Manager: asset lifecycle, access grant/revoke/check, filtered
//! iteration, and the bookkeeping tables layered on top of the Key-Access
//! Graph and Index Engine (spec §4.F).

pub mod asset_store;
pub mod bookkeeping;
pub mod config;
pub mod iter;
pub mod key_path;
pub mod manager;

pub use bookkeeping::{asset_history, record_consent_log, record_history, HistoryEvent};
pub use config::CustodiaConfig;
pub use iter::{get_asset_iter, IterOptions, IterPage};
pub use key_path::{resolve_key_path, KeyPathSpec};
pub use manager::{
    add_access, add_asset, check_access, delete_asset, get_asset, get_asset_key, remove_access,
    update_asset, AccessControl, NewAsset,
};
