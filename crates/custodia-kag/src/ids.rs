use custodia_core::constants::WRITE_ONLY_KEY_PREFIX;
use custodia_core::{AssetId, KeyId};

/// Synthesize the phantom target key id used by "grant write without
/// revealing read" (spec §4.D strategy 3). Deterministic in its three
/// inputs so both the grantor and a later access check compute the same id
/// without any ledger round-trip.
pub fn write_only_key_id(asset_id: &AssetId, asset_key_id: &KeyId, owner_id: &KeyId) -> KeyId {
    KeyId::new(format!(
        "{WRITE_ONLY_KEY_PREFIX}{}-{}-{}",
        asset_id.as_str(),
        asset_key_id.as_str(),
        owner_id.as_str()
    ))
}
