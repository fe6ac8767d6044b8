use custodia_core::{Asset, AssetId, CustodiaError, Result};
use custodia_ledger::{CachedLedger, HostLedger};

/// Simple (non-composite) ledger key for an asset record (spec §6 persisted
/// layout: `asset/{asset_id}`).
fn asset_key(id: &AssetId) -> Vec<u8> {
    format!("asset/{}", id.as_str()).into_bytes()
}

pub fn load_asset<L: HostLedger>(ledger: &CachedLedger<L>, id: &AssetId) -> Result<Option<Asset>> {
    match ledger.get(&asset_key(id))? {
        Some(bytes) => {
            let asset: Asset = serde_json::from_slice(&bytes)
                .map_err(|e| CustodiaError::integrity(format!("corrupt asset record: {e}")))?;
            Ok(Some(asset))
        }
        None => Ok(None),
    }
}

pub fn store_asset<L: HostLedger>(ledger: &CachedLedger<L>, asset: &Asset) -> Result<()> {
    let bytes = serde_json::to_vec(asset)
        .map_err(|e| CustodiaError::integrity(format!("cannot serialize asset: {e}")))?;
    ledger.put(&asset_key(&asset.asset_id), &bytes)
}

pub fn delete_asset_record<L: HostLedger>(ledger: &CachedLedger<L>, id: &AssetId) -> Result<()> {
    ledger.del(&asset_key(id))
}
