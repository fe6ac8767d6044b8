use custodia_core::{Asset, Key, Result};
use custodia_ledger::{CachedLedger, HostLedger};

/// Sum type replacing the source's `interface{}` key-path parameter (spec
/// §9 Design Notes). Exhaustive match at every call site rejects unknown
/// variants at compile time.
pub enum KeyPathSpec<'a, L: HostLedger> {
    /// The caller already holds the target key's material directly (e.g.
    /// their own asset key from a prior `add_asset` in the same session).
    DirectKey(Key),
    /// An explicit KAG path, `path[0]` equal to the caller's own key id,
    /// walked with `custodia_kag::get_key_along_path`.
    PathVector(Vec<custodia_core::KeyId>),
    /// Computed per-asset: returns a path to walk.
    PathFn(&'a dyn Fn(&CachedLedger<L>, &Key, &Asset) -> Result<Vec<custodia_core::KeyId>>),
    /// Computed per-asset: returns the raw key material directly, skipping
    /// path walking entirely.
    ByteFn(&'a dyn Fn(&CachedLedger<L>, &Key, &Asset) -> Result<Vec<u8>>),
}

/// Materialize the target asset key's bytes for `asset`, given the
/// caller's own seed key and a `KeyPathSpec` (spec §4.F `get_asset_key`).
pub fn resolve_key_path<L: HostLedger>(
    ledger: &CachedLedger<L>,
    caller: &Key,
    asset: &Asset,
    spec: &KeyPathSpec<'_, L>,
) -> Result<Vec<u8>> {
    match spec {
        KeyPathSpec::DirectKey(key) => Ok(key.material().to_vec()),
        KeyPathSpec::PathVector(path) => {
            custodia_kag::get_key_along_path(ledger, path, caller.material().to_vec(), caller.kind)
        }
        KeyPathSpec::PathFn(f) => {
            let path = f(ledger, caller, asset)?;
            custodia_kag::get_key_along_path(ledger, &path, caller.material().to_vec(), caller.kind)
        }
        KeyPathSpec::ByteFn(f) => f(ledger, caller, asset),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use custodia_core::{EdgeData, EdgeKind, KeyId};
    use custodia_ledger::{CacheConfig, MemoryLedger};

    #[test]
    fn path_vector_walks_kag() {
        let host = MemoryLedger::new("tx", 0);
        let ledger = CachedLedger::new(&host, CacheConfig::default());
        let caller = custodia_crypto::generate_symmetric_key(KeyId::new("user-sym-caller"));
        let asset_key = custodia_crypto::generate_symmetric_key(KeyId::new("asset-key-1"));
        custodia_kag::add_edge(&ledger, &caller, &asset_key, EdgeData::new(EdgeKind::Read)).unwrap();

        let spec: KeyPathSpec<custodia_ledger::MemoryLedger> =
            KeyPathSpec::PathVector(vec![caller.key_id.clone(), asset_key.key_id.clone()]);
        let asset = custodia_core::Asset {
            asset_id: custodia_core::asset_id("ns", "a1"),
            owner_ids: [KeyId::new("owner")],
            datatypes: Default::default(),
            public_data: Vec::new(),
            private_data: Vec::new(),
            asset_key_id: asset_key.key_id.clone(),
            asset_key_hash: custodia_crypto::hash(asset_key.material()),
            index_table_name: None,
            metadata: Default::default(),
        };
        let recovered = resolve_key_path(&ledger, &caller, &asset, &spec).unwrap();
        assert_eq!(recovered, asset_key.material());
    }
}
