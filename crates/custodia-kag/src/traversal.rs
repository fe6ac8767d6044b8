use custodia_core::constants::GROUP_ADMIN_TRAVERSAL_DEPTH;
use custodia_core::{AccessType, AssetId, EdgeKind, KeyId, Result};
use custodia_ledger::{CachedLedger, HostLedger};

use crate::edge_store::{edges_from, get_edge};
use crate::ids::write_only_key_id;

/// The principal keys a caller can assert ownership of when requesting
/// access (spec §4.D strategies 1-3).
#[derive(Clone)]
pub struct CallerKeys {
    pub private_key_id: Option<KeyId>,
    pub sym_key_id: Option<KeyId>,
}

impl CallerKeys {
    fn candidates(&self) -> impl Iterator<Item = &KeyId> {
        self.private_key_id.iter().chain(self.sym_key_id.iter())
    }
}

/// A single datatype consent check, pre-resolved by the caller (spec §4.D
/// strategy 4: "for each datatype of the asset and each ancestor datatype").
/// `consent_key_id`/`datatype_key_id` are computed by `custodia-identity`,
/// which owns the datatype hierarchy and the deterministic consent-id
/// derivation; this crate only checks whether the resulting edge exists.
pub struct DatatypeLink {
    pub consent_key_id: KeyId,
    pub datatype_key_id: KeyId,
}

/// Everything the asset side of an access query needs (spec §4.D).
pub struct AssetAccess<'a> {
    pub asset_id: &'a AssetId,
    pub asset_key_id: &'a KeyId,
    pub owner_id: &'a KeyId,
    pub datatype_links: &'a [DatatypeLink],
}

/// Which strategy produced a positive access decision, kept for logging and
/// for the side-cache memoization key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Ownership,
    DirectEdge,
    WriteOnlyPhantom,
    DatatypeConsent,
    GroupAdminClosure,
}

/// Run the five ordered strategies from spec §4.D and return the first one
/// that witnesses access, if any. `caller_owner_identity` is the principal
/// id compared against `asset.owner_id` for strategy 1 (typically the
/// caller's own symmetric or private key id, whichever the owner field was
/// recorded with).
pub fn resolve_access<L: HostLedger>(
    ledger: &CachedLedger<L>,
    caller_owner_identity: &KeyId,
    caller: &CallerKeys,
    asset: &AssetAccess<'_>,
    requested: AccessType,
) -> Result<Option<Strategy>> {
    // 1. Ownership: caller is the recorded owner, or a direct admin of it.
    if caller_owner_identity == asset.owner_id {
        return Ok(Some(Strategy::Ownership));
    }
    for candidate in caller.candidates() {
        if let Some(edge) = get_edge(ledger, candidate, asset.owner_id)? {
            if edge.edge_data.kind == EdgeKind::Admin {
                return Ok(Some(Strategy::Ownership));
            }
        }
    }

    if let Some(strategy) = direct_strategies(ledger, caller, asset, requested)? {
        return Ok(Some(strategy));
    }

    // 5. Group admin closure: one hop through groups the caller directly
    // administers, then re-run strategies 2-4 with the group as principal.
    for candidate in caller.candidates() {
        for edge in edges_from(ledger, candidate)? {
            if edge.edge_data.kind != EdgeKind::Admin {
                continue;
            }
            let group_as_caller = CallerKeys {
                private_key_id: Some(edge.target_key_id.clone()),
                sym_key_id: Some(edge.target_key_id.clone()),
            };
            if let Some(strategy) = direct_strategies(ledger, &group_as_caller, asset, requested)? {
                let _ = strategy;
                return Ok(Some(Strategy::GroupAdminClosure));
            }
        }
    }
    let _ = GROUP_ADMIN_TRAVERSAL_DEPTH; // one-hop bound enforced by the loop shape above

    Ok(None)
}

/// Strategies 2-4, factored out so the group-admin closure (strategy 5) can
/// re-run them with a group's keys standing in for the caller's.
fn direct_strategies<L: HostLedger>(
    ledger: &CachedLedger<L>,
    caller: &CallerKeys,
    asset: &AssetAccess<'_>,
    requested: AccessType,
) -> Result<Option<Strategy>> {
    // 2. Direct edge from the caller's private/sym key to the asset key.
    for candidate in caller.candidates() {
        if let Some(edge) = get_edge(ledger, candidate, asset.asset_key_id)? {
            if edge.edge_data.kind.satisfies(requested) {
                return Ok(Some(Strategy::DirectEdge));
            }
        }
    }

    // 3. Write-only phantom edge, relevant only for write requests.
    if requested == AccessType::Write {
        let phantom = write_only_key_id(asset.asset_id, asset.asset_key_id, asset.owner_id);
        for candidate in caller.candidates() {
            if let Some(edge) = get_edge(ledger, candidate, &phantom)? {
                if edge.edge_data.kind.satisfies(AccessType::Write) {
                    return Ok(Some(Strategy::WriteOnlyPhantom));
                }
            }
        }
    }

    // 4. Datatype consent, one check per (already-normalized) datatype.
    for link in asset.datatype_links {
        if let Some(edge) = get_edge(ledger, &link.consent_key_id, &link.datatype_key_id)? {
            if edge.edge_data.kind.satisfies(requested) {
                return Ok(Some(Strategy::DatatypeConsent));
            }
        }
    }

    Ok(None)
}

fn memo_key(caller: &CallerKeys, asset: &AssetAccess<'_>, requested: AccessType) -> String {
    format!(
        "kag-access:{:?}:{:?}:{}:{:?}",
        caller.private_key_id, caller.sym_key_id, asset.asset_key_id, requested
    )
}

/// `resolve_access` plus the transaction-scoped memoization described in
/// spec §4.D: results are cached for the (caller, asset, requested) triple,
/// and a positive write decision implicitly satisfies a later read check.
pub fn check_access<L: HostLedger>(
    ledger: &CachedLedger<L>,
    caller_owner_identity: &KeyId,
    caller: &CallerKeys,
    asset: &AssetAccess<'_>,
    requested: AccessType,
) -> Result<bool> {
    if let Some(cached) = ledger.side_cache_get::<bool>(&memo_key(caller, asset, requested)) {
        return Ok(cached);
    }
    if requested == AccessType::Read {
        if let Some(true) = ledger.side_cache_get::<bool>(&memo_key(caller, asset, AccessType::Write)) {
            ledger.side_cache_put(&memo_key(caller, asset, AccessType::Read), true);
            return Ok(true);
        }
    }

    let decision = resolve_access(ledger, caller_owner_identity, caller, asset, requested)?.is_some();
    ledger.side_cache_put(&memo_key(caller, asset, requested), decision);
    Ok(decision)
}

#[cfg(test)]
mod tests {
    use super::*;
    use custodia_core::{EdgeData, KeyKind};
    use custodia_crypto::generate_symmetric_key;
    use custodia_ledger::{CacheConfig, MemoryLedger};

    fn asset_id() -> AssetId {
        AssetId("a-test".into())
    }

    #[test]
    fn ownership_by_identity_match() {
        let host = MemoryLedger::new("tx", 0);
        let ledger = CachedLedger::new(&host, CacheConfig::default());
        let owner = KeyId::new("user-sym-owner");
        let asset_key = KeyId::new("asset-key-1");
        let aid = asset_id();
        let asset = AssetAccess {
            asset_id: &aid,
            asset_key_id: &asset_key,
            owner_id: &owner,
            datatype_links: &[],
        };
        let caller = CallerKeys {
            private_key_id: None,
            sym_key_id: Some(owner.clone()),
        };
        let result = resolve_access(&ledger, &owner, &caller, &asset, AccessType::Read).unwrap();
        assert_eq!(result, Some(Strategy::Ownership));
    }

    #[test]
    fn direct_read_edge_grants_read_not_write() {
        let host = MemoryLedger::new("tx", 0);
        let ledger = CachedLedger::new(&host, CacheConfig::default());
        let caller_sym = generate_symmetric_key(KeyId::new("user-sym-caller"));
        let asset_key = generate_symmetric_key(KeyId::new("asset-key-1"));
        crate::edge_store::add_edge(&ledger, &caller_sym, &asset_key, EdgeData::new(EdgeKind::Read)).unwrap();

        let owner = KeyId::new("user-sym-owner");
        let aid = asset_id();
        let asset = AssetAccess {
            asset_id: &aid,
            asset_key_id: &asset_key.key_id,
            owner_id: &owner,
            datatype_links: &[],
        };
        let caller = CallerKeys {
            private_key_id: None,
            sym_key_id: Some(caller_sym.key_id.clone()),
        };
        let not_owner = KeyId::new("user-sym-caller");
        assert_eq!(
            resolve_access(&ledger, &not_owner, &caller, &asset, AccessType::Read).unwrap(),
            Some(Strategy::DirectEdge)
        );
        assert_eq!(
            resolve_access(&ledger, &not_owner, &caller, &asset, AccessType::Write).unwrap(),
            None
        );
    }

    #[test]
    fn write_only_phantom_grants_write_but_not_read() {
        let host = MemoryLedger::new("tx", 0);
        let ledger = CachedLedger::new(&host, CacheConfig::default());
        let caller_sym = generate_symmetric_key(KeyId::new("user-sym-caller"));
        let owner = KeyId::new("user-sym-owner");
        let aid = asset_id();
        let asset_key_id = KeyId::new("asset-key-1");
        let phantom_id = write_only_key_id(&aid, &asset_key_id, &owner);
        let phantom = custodia_core::Key::new(phantom_id.clone(), KeyKind::Symmetric, vec![0u8; 32]);

        crate::edge_store::add_edge(
            &ledger,
            &caller_sym,
            &phantom,
            EdgeData::new(EdgeKind::WriteOnly {
                phantom_key_id: phantom_id,
            }),
        )
        .unwrap();

        let asset = AssetAccess {
            asset_id: &aid,
            asset_key_id: &asset_key_id,
            owner_id: &owner,
            datatype_links: &[],
        };
        let caller = CallerKeys {
            private_key_id: None,
            sym_key_id: Some(caller_sym.key_id.clone()),
        };
        let not_owner = KeyId::new("someone-else");
        assert_eq!(
            resolve_access(&ledger, &not_owner, &caller, &asset, AccessType::Write).unwrap(),
            Some(Strategy::WriteOnlyPhantom)
        );
        assert_eq!(
            resolve_access(&ledger, &not_owner, &caller, &asset, AccessType::Read).unwrap(),
            None
        );
    }

    #[test]
    fn group_admin_closure_one_hop() {
        let host = MemoryLedger::new("tx", 0);
        let ledger = CachedLedger::new(&host, CacheConfig::default());
        let caller_priv = generate_symmetric_key(KeyId::new("user-priv-caller"));
        let group = generate_symmetric_key(KeyId::new("group-priv-g1"));
        let asset_key = generate_symmetric_key(KeyId::new("asset-key-1"));

        crate::edge_store::add_edge(&ledger, &caller_priv, &group, EdgeData::new(EdgeKind::Admin)).unwrap();
        crate::edge_store::add_edge(&ledger, &group, &asset_key, EdgeData::new(EdgeKind::Read)).unwrap();

        let owner = KeyId::new("user-sym-owner");
        let aid = asset_id();
        let asset = AssetAccess {
            asset_id: &aid,
            asset_key_id: &asset_key.key_id,
            owner_id: &owner,
            datatype_links: &[],
        };
        let caller = CallerKeys {
            private_key_id: Some(caller_priv.key_id.clone()),
            sym_key_id: None,
        };
        let not_owner = KeyId::new("someone-else");
        assert_eq!(
            resolve_access(&ledger, &not_owner, &caller, &asset, AccessType::Read).unwrap(),
            Some(Strategy::GroupAdminClosure)
        );
    }
}
