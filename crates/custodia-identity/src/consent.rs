use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use custodia_core::constants::CONSENT_KEY_PREFIX;
use custodia_core::{AccessType, EdgeData, EdgeKind, Key, KeyId, KeyKind, Result};
use custodia_kag::{add_edge, revoke};
use custodia_ledger::{CachedLedger, HostLedger};

use crate::datatype::{ancestors, datatype_key_id};

/// A relation `(owner, target, datatype, access, expires_at)` realized as a
/// KAG edge from a deterministic `consent_key_id` to the datatype key (spec
/// §3 Consent).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Consent {
    pub owner: KeyId,
    pub target: KeyId,
    pub datatype: String,
    pub access: AccessTypeTag,
    pub expires_at: DateTime<Utc>,
}

/// Serializable mirror of `custodia_core::AccessType` (which isn't
/// `Serialize` since it's shared with non-persisted call sites too).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccessTypeTag {
    Read,
    Write,
}

impl From<AccessTypeTag> for AccessType {
    fn from(tag: AccessTypeTag) -> Self {
        match tag {
            AccessTypeTag::Read => AccessType::Read,
            AccessTypeTag::Write => AccessType::Write,
        }
    }
}

/// `consent_key_id = H(datatype ∥ target ∥ owner)` (spec §3).
pub fn consent_key_id(datatype: &str, target: &KeyId, owner: &KeyId) -> KeyId {
    let mut preimage = Vec::new();
    preimage.extend_from_slice(datatype.as_bytes());
    preimage.extend_from_slice(target.as_str().as_bytes());
    preimage.extend_from_slice(owner.as_str().as_bytes());
    KeyId::new(format!(
        "{CONSENT_KEY_PREFIX}{}",
        custodia_crypto::hash(&preimage).to_hex()
    ))
}

/// Grant `consent.target` `consent.access` on all of `consent.owner`'s
/// assets tagged `consent.datatype` (including descendants, via the
/// ancestor walk KAG traversal performs at check time). The consent edge's
/// source is a synthetic key derived from `consent_key_id` — its material
/// is irrelevant since the edge only needs to *exist* for
/// `custodia_kag::edge_store::get_edge` to find it; `wrapped_target` is a
/// throwaway wrap of the datatype key's own material under itself.
pub fn grant_consent<L: HostLedger>(
    ledger: &CachedLedger<L>,
    consent: &Consent,
    datatype_key: &Key,
) -> Result<()> {
    let source_id = consent_key_id(&consent.datatype, &consent.target, &consent.owner);
    let source = Key::new(source_id, KeyKind::Symmetric, datatype_key.material().to_vec());
    let kind = match consent.access {
        AccessTypeTag::Read => EdgeKind::Read,
        AccessTypeTag::Write => EdgeKind::Write,
    };
    let edge_data = EdgeData::new(kind).with_annotation("expires_at", consent.expires_at.to_rfc3339());
    add_edge(ledger, &source, datatype_key, edge_data)
}

pub fn revoke_consent<L: HostLedger>(
    ledger: &CachedLedger<L>,
    owner: &KeyId,
    target: &KeyId,
    datatype: &str,
) -> Result<()> {
    let source_id = consent_key_id(datatype, target, owner);
    let datatype_key_id = datatype_key_id(datatype, owner);
    revoke(ledger, &source_id, &datatype_key_id)
}

/// Build the `DatatypeLink` list KAG traversal needs for datatype-consent
/// checks (spec §4.D strategy 4): one link per datatype tagged on the
/// asset plus each of its ancestors.
pub fn datatype_links<L: HostLedger>(
    ledger: &CachedLedger<L>,
    asset_datatypes: &[String],
    caller: &KeyId,
    owner: &KeyId,
) -> Result<Vec<custodia_kag::DatatypeLink>> {
    let mut links = Vec::new();
    for dt in asset_datatypes {
        let mut chain = vec![dt.clone()];
        chain.extend(ancestors(ledger, dt)?);
        for d in chain {
            links.push(custodia_kag::DatatypeLink {
                consent_key_id: consent_key_id(&d, caller, owner),
                datatype_key_id: datatype_key_id(&d, owner),
            });
        }
    }
    Ok(links)
}
