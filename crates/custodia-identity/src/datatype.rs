use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::instrument;

use custodia_core::constants::DATATYPE_KEY_PREFIX;
use custodia_core::{CustodiaError, KeyId, Result};
use custodia_ledger::{CachedLedger, HostLedger};

const MAX_ANCESTOR_DEPTH: usize = 64;

/// Hierarchical tag with an optional parent, forming a forest (spec §3/§4.G).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Datatype {
    pub id: String,
    pub parent_id: Option<String>,
}

fn datatype_key(id: &str) -> Vec<u8> {
    format!("datatype/{id}").into_bytes()
}

/// Register a datatype. Registration requires a system role (spec §4.G);
/// the caller asserts that via `is_system_role`, checked here rather than
/// inside the KAG since "system role" is an identity-layer concept.
#[instrument(skip(ledger), fields(id = %datatype.id))]
pub fn register_datatype<L: HostLedger>(
    ledger: &CachedLedger<L>,
    datatype: &Datatype,
    is_system_role: bool,
) -> Result<()> {
    if !is_system_role {
        return Err(CustodiaError::NoAccess);
    }
    let bytes = serde_json::to_vec(datatype)
        .map_err(|e| CustodiaError::integrity(format!("cannot serialize datatype: {e}")))?;
    ledger.put(&datatype_key(&datatype.id), &bytes)
}

pub fn get_datatype<L: HostLedger>(ledger: &CachedLedger<L>, id: &str) -> Result<Option<Datatype>> {
    match ledger.get(&datatype_key(id))? {
        Some(bytes) => {
            let dt: Datatype = serde_json::from_slice(&bytes)
                .map_err(|e| CustodiaError::integrity(format!("corrupt datatype record: {e}")))?;
            Ok(Some(dt))
        }
        None => Ok(None),
    }
}

/// Ids of every ancestor of `id`, nearest first, walking `parent_id`
/// pointers up to `MAX_ANCESTOR_DEPTH`.
pub fn ancestors<L: HostLedger>(ledger: &CachedLedger<L>, id: &str) -> Result<Vec<String>> {
    let mut out = Vec::new();
    let mut current = id.to_string();
    for _ in 0..MAX_ANCESTOR_DEPTH {
        match get_datatype(ledger, &current)? {
            Some(dt) => match dt.parent_id {
                Some(parent) => {
                    out.push(parent.clone());
                    current = parent;
                }
                None => break,
            },
            None => break,
        }
    }
    Ok(out)
}

fn is_ancestor_of<L: HostLedger>(ledger: &CachedLedger<L>, candidate: &str, of: &str) -> Result<bool> {
    Ok(ancestors(ledger, of)?.iter().any(|a| a == candidate))
}

/// Returns the subset of `datatypes` that are leaves under the parent
/// partial order: any datatype that is an ancestor of another member of the
/// set is removed (spec §4.G `normalize`). Idempotent (spec §8 invariant).
pub fn normalize<L: HostLedger>(
    ledger: &CachedLedger<L>,
    datatypes: &BTreeSet<String>,
) -> Result<BTreeSet<String>> {
    let mut leaves = BTreeSet::new();
    for candidate in datatypes {
        let mut is_ancestor_of_another = false;
        for other in datatypes {
            if other == candidate {
                continue;
            }
            if is_ancestor_of(ledger, candidate, other)? {
                is_ancestor_of_another = true;
                break;
            }
        }
        if !is_ancestor_of_another {
            leaves.insert(candidate.clone());
        }
    }
    Ok(leaves)
}

/// `datatype_key_id(datatype, owner)` (spec §3/§4.G): deterministic id of
/// the symmetric key interposed between `owner` and any asset tagged with
/// `datatype`.
pub fn datatype_key_id(datatype: &str, owner: &KeyId) -> KeyId {
    KeyId::new(format!("{DATATYPE_KEY_PREFIX}{datatype}-{owner}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use custodia_ledger::{CacheConfig, MemoryLedger};

    fn dt(id: &str, parent: Option<&str>) -> Datatype {
        Datatype {
            id: id.to_string(),
            parent_id: parent.map(str::to_string),
        }
    }

    #[test]
    fn normalize_drops_ancestors_present_with_descendants() {
        let host = MemoryLedger::new("tx", 0);
        let ledger = CachedLedger::new(&host, CacheConfig::default());
        register_datatype(&ledger, &dt("d1", None), true).unwrap();
        register_datatype(&ledger, &dt("d2", Some("d1")), true).unwrap();

        let set: BTreeSet<String> = ["d1".to_string(), "d2".to_string()].into_iter().collect();
        let normalized = normalize(&ledger, &set).unwrap();
        assert_eq!(normalized, ["d2".to_string()].into_iter().collect());
    }

    #[test]
    fn normalize_is_idempotent() {
        let host = MemoryLedger::new("tx", 0);
        let ledger = CachedLedger::new(&host, CacheConfig::default());
        register_datatype(&ledger, &dt("d1", None), true).unwrap();
        register_datatype(&ledger, &dt("d2", Some("d1")), true).unwrap();
        let set: BTreeSet<String> = ["d1".to_string(), "d2".to_string()].into_iter().collect();
        let once = normalize(&ledger, &set).unwrap();
        let twice = normalize(&ledger, &once).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn registration_without_system_role_is_denied() {
        let host = MemoryLedger::new("tx", 0);
        let ledger = CachedLedger::new(&host, CacheConfig::default());
        assert!(register_datatype(&ledger, &dt("d1", None), false).is_err());
    }
}
