use std::collections::{BTreeMap, BTreeSet};

use serde_json::{Map, Value};
use tracing::{debug, instrument, warn};

use custodia_core::{
    AccessType, Asset, AssetId, CustodiaError, EdgeData, EdgeKind, IndexTableDescriptor, Key, KeyId,
    Result,
};
use custodia_identity::datatype_key_id;
use custodia_index::{delete_row, get_table, put_row};
use custodia_kag::{add_edge, check_access as kag_check_access, revoke, update_edge_data, write_only_key_id, AssetAccess, CallerKeys};
use custodia_ledger::{CachedLedger, HostLedger};

use crate::asset_store::{delete_asset_record, load_asset, store_asset};
use crate::bookkeeping::{record_history, HistoryEvent};

/// Everything needed to add a new asset (spec §4.F `add_asset`).
pub struct NewAsset {
    pub asset_id: AssetId,
    pub owner_id: KeyId,
    pub datatypes: BTreeSet<String>,
    pub public_data: Vec<u8>,
    pub private_data_plaintext: Vec<u8>,
    pub index_table_name: Option<String>,
    pub metadata: BTreeMap<String, String>,
    /// Material for `datatype_key_id(datatype, owner)`, one entry per tag in
    /// `datatypes`, used to wire the datatype→asset-key edge that lets a
    /// datatype-consent holder later recover the asset key.
    pub datatype_keys: BTreeMap<String, Key>,
}

/// Row view of an asset fed to the Index Engine: its `metadata` plus the
/// asset id under the table's declared primary-key field.
fn asset_row(asset: &Asset, primary_key_field: &str) -> Map<String, Value> {
    let mut row: Map<String, Value> = asset
        .metadata
        .iter()
        .map(|(k, v)| (k.clone(), Value::String(v.clone())))
        .collect();
    row.insert(primary_key_field.to_string(), Value::String(asset.asset_id.as_str().to_string()));
    row
}

fn resolve_table<L: HostLedger>(ledger: &CachedLedger<L>, table_name: &str) -> Result<IndexTableDescriptor> {
    Ok(get_table(ledger, table_name)?.unwrap_or_else(|| IndexTableDescriptor::new(table_name, "asset_id")))
}

/// Write (or move) `asset`'s index row, diffing against `previous` when an
/// update changed indexed values (spec §4.E/§4.F).
fn index_asset_row<L: HostLedger>(
    ledger: &CachedLedger<L>,
    table_name: &str,
    asset: &Asset,
    previous: Option<&Asset>,
) -> Result<()> {
    let table = resolve_table(ledger, table_name)?;
    let row = asset_row(asset, &table.primary_key_field);
    let previous_row = previous.map(|a| asset_row(a, &table.primary_key_field));
    put_row(ledger, None, None, &table, &row, previous_row.as_ref(), Some(asset.asset_id.as_str()))
}

fn deindex_asset_row<L: HostLedger>(ledger: &CachedLedger<L>, table_name: &str, asset: &Asset) -> Result<()> {
    let table = resolve_table(ledger, table_name)?;
    let row = asset_row(asset, &table.primary_key_field);
    delete_row(ledger, None, &table, &row, Some(asset.asset_id.as_str()))
}

/// Add or remove `datatype_key_id(datatype, owner)→asset_key` edges so a
/// datatype-consent holder can walk `[consent_key_id, datatype_key_id,
/// asset_key_id]` to recover the asset key, not just pass the boolean
/// `check_access` gate.
fn reconcile_datatype_edges<L: HostLedger>(
    ledger: &CachedLedger<L>,
    old_datatypes: &BTreeSet<String>,
    new_datatypes: &BTreeSet<String>,
    datatype_keys: &BTreeMap<String, Key>,
    asset_key: &Key,
    owner: &KeyId,
) -> Result<()> {
    for added in new_datatypes.difference(old_datatypes) {
        let dt_key = datatype_keys
            .get(added)
            .ok_or_else(|| CustodiaError::invalid_input(format!("missing datatype key for '{added}'")))?;
        add_edge(ledger, dt_key, asset_key, EdgeData::new(EdgeKind::Write))?;
    }
    for removed in old_datatypes.difference(new_datatypes) {
        revoke(ledger, &datatype_key_id(removed, owner), &asset_key.key_id)?;
    }
    Ok(())
}

/// `add_asset(asset, key, grant_to_caller)` (spec §4.F). `caller` supplies
/// the wrapping key used for the caller-grant edge when `grant_to_caller`
/// is set; it is ignored otherwise.
#[instrument(skip(ledger, new, key, caller), fields(asset_id = %new.asset_id))]
pub fn add_asset<L: HostLedger>(
    ledger: &CachedLedger<L>,
    new: NewAsset,
    key: &Key,
    grant_to_caller: bool,
    caller: Option<&Key>,
) -> Result<Asset> {
    if !new.asset_id.has_valid_prefix() {
        return Err(CustodiaError::invalid_input("asset id missing required prefix"));
    }
    if load_asset(ledger, &new.asset_id)?.is_some() {
        return Err(CustodiaError::already_exists(new.asset_id.as_str().to_string()));
    }
    let asset_key_hash = custodia_crypto::hash(key.material());
    let private_data = custodia_crypto::sym_encrypt(key.material(), &new.private_data_plaintext)
        .map_err(|e| CustodiaError::integrity(e.to_string()))?;
    let datatype_keys = new.datatype_keys;

    let asset = Asset {
        asset_id: new.asset_id.clone(),
        owner_ids: [new.owner_id.clone()],
        datatypes: new.datatypes,
        public_data: new.public_data,
        private_data,
        asset_key_id: key.key_id.clone(),
        asset_key_hash,
        index_table_name: new.index_table_name,
        metadata: new.metadata,
    };
    store_asset(ledger, &asset)?;

    for datatype in &asset.datatypes {
        let dt_key = datatype_keys
            .get(datatype)
            .ok_or_else(|| CustodiaError::invalid_input(format!("missing datatype key for '{datatype}'")))?;
        add_edge(ledger, dt_key, key, EdgeData::new(EdgeKind::Write))?;
    }

    if let Some(table_name) = &asset.index_table_name {
        index_asset_row(ledger, table_name, &asset, None)?;
    }

    if grant_to_caller {
        let caller = caller
            .ok_or_else(|| CustodiaError::invalid_input("grant_to_caller requires a caller key"))?;
        add_edge(ledger, caller, key, EdgeData::new(EdgeKind::Read))?;
    }

    record_history(ledger, &asset.asset_id, HistoryEvent::Added)?;
    debug!(asset_id = %asset.asset_id, "asset added");
    Ok(asset)
}

fn check_key_hash(asset: &Asset, key: &Key) -> Result<()> {
    let provided = custodia_crypto::hash(key.material());
    if provided.as_bytes() != asset.asset_key_hash.as_bytes() {
        return Err(CustodiaError::integrity("asset key hash mismatch"));
    }
    Ok(())
}

fn require_write_access<L: HostLedger>(
    ledger: &CachedLedger<L>,
    caller_identity: &KeyId,
    caller: &CallerKeys,
    asset: &Asset,
) -> Result<()> {
    let access = AssetAccess {
        asset_id: &asset.asset_id,
        asset_key_id: &asset.asset_key_id,
        owner_id: asset.owner(),
        datatype_links: &[],
    };
    let allowed = kag_check_access(ledger, caller_identity, caller, &access, AccessType::Write)?;
    if !allowed {
        warn!(asset_id = %asset.asset_id, "write access denied");
        return Err(CustodiaError::NoAccess);
    }
    Ok(())
}

/// `update_asset(asset, key, strict?)` (spec §4.F). `new_private_data` and
/// `new_public_data` replace the asset's payloads; `new_owner_id` is only
/// honored when it equals the asset's current owner (ownership change is
/// otherwise rejected, even to the caller's own identity, per §3's "only in
/// the one update where the caller is the current owner" — a no-op rename
/// is allowed, a transfer is not, consistent with the single-owner
/// invariant this core enforces).
#[instrument(skip_all, fields(asset_id = %id))]
pub fn update_asset<L: HostLedger>(
    ledger: &CachedLedger<L>,
    caller_identity: &KeyId,
    caller: &CallerKeys,
    id: &AssetId,
    key: &Key,
    new_private_data: Vec<u8>,
    new_public_data: Option<Vec<u8>>,
    new_datatypes: Option<BTreeSet<String>>,
    datatype_keys: &BTreeMap<String, Key>,
    strict: bool,
) -> Result<Asset> {
    let mut asset = match load_asset(ledger, id)? {
        Some(a) => a,
        None if strict => return Err(CustodiaError::not_found(id.as_str().to_string())),
        None => return Err(CustodiaError::not_found(id.as_str().to_string())),
    };
    require_write_access(ledger, caller_identity, caller, &asset)?;
    check_key_hash(&asset, key)?;
    let previous_asset = asset.clone();

    asset.private_data = custodia_crypto::sym_encrypt(key.material(), &new_private_data)
        .map_err(|e| CustodiaError::integrity(e.to_string()))?;
    if let Some(public_data) = new_public_data {
        asset.public_data = public_data;
    }
    if let Some(datatypes) = new_datatypes {
        reconcile_datatype_edges(ledger, &asset.datatypes, &datatypes, datatype_keys, key, asset.owner())?;
        asset.datatypes = datatypes;
    }
    store_asset(ledger, &asset)?;

    if let Some(table_name) = asset.index_table_name.clone() {
        index_asset_row(ledger, &table_name, &asset, Some(&previous_asset))?;
    }

    record_history(ledger, &asset.asset_id, HistoryEvent::Updated)?;
    Ok(asset)
}

/// `delete_asset(id, key)` (spec §4.F). Pruning policy decided in
/// DESIGN.md: every edge whose target is the asset key is revoked so no
/// wrapped-key blob outlives its asset.
#[instrument(skip_all, fields(asset_id = %id))]
pub fn delete_asset<L: HostLedger>(
    ledger: &CachedLedger<L>,
    caller_identity: &KeyId,
    caller: &CallerKeys,
    id: &AssetId,
    key: &Key,
    known_grantees: &[KeyId],
) -> Result<()> {
    let asset = load_asset(ledger, id)?.ok_or_else(|| CustodiaError::not_found(id.as_str().to_string()))?;
    require_write_access(ledger, caller_identity, caller, &asset)?;
    check_key_hash(&asset, key)?;

    for grantee in known_grantees {
        revoke(ledger, grantee, &asset.asset_key_id)?;
        let phantom = write_only_key_id(&asset.asset_id, &asset.asset_key_id, asset.owner());
        revoke(ledger, grantee, &phantom)?;
    }
    if let Some(table_name) = &asset.index_table_name {
        deindex_asset_row(ledger, table_name, &asset)?;
    }
    delete_asset_record(ledger, id)?;
    record_history(ledger, id, HistoryEvent::Deleted)?;
    Ok(())
}

/// `get_asset(id, key)` (spec §4.F). Decrypts `private_data` when `key` is
/// provided and its hash matches; otherwise returns the asset with
/// ciphertext untouched.
#[instrument(skip_all, fields(asset_id = %id))]
pub fn get_asset<L: HostLedger>(
    ledger: &CachedLedger<L>,
    caller_identity: &KeyId,
    caller: &CallerKeys,
    id: &AssetId,
    key: Option<&Key>,
) -> Result<(Asset, Option<Vec<u8>>)> {
    let asset = load_asset(ledger, id)?.ok_or_else(|| CustodiaError::not_found(id.as_str().to_string()))?;

    if key.is_some() {
        let access = AssetAccess {
            asset_id: &asset.asset_id,
            asset_key_id: &asset.asset_key_id,
            owner_id: asset.owner(),
            datatype_links: &[],
        };
        let allowed = kag_check_access(ledger, caller_identity, caller, &access, AccessType::Read)?;
        if !allowed {
            return Err(CustodiaError::NoAccess);
        }
    }

    let decrypted = match key {
        Some(key) => {
            check_key_hash(&asset, key)?;
            Some(
                custodia_crypto::sym_decrypt(key.material(), &asset.private_data)
                    .map_err(|e| CustodiaError::integrity(e.to_string()))?,
            )
        }
        None => None,
    };
    Ok((asset, decrypted))
}

/// `get_asset_key(id, key_path)` (spec §4.F): materializes the target
/// asset key by walking the KAG along `key_path`, starting at the
/// caller's own key.
pub fn get_asset_key<L: HostLedger>(
    ledger: &CachedLedger<L>,
    caller: &Key,
    id: &AssetId,
    spec: &crate::key_path::KeyPathSpec<'_, L>,
) -> Result<Vec<u8>> {
    let asset = load_asset(ledger, id)?.ok_or_else(|| CustodiaError::not_found(id.as_str().to_string()))?;
    crate::key_path::resolve_key_path(ledger, caller, &asset, spec)
}

/// A pending access grant/revoke/check (spec §4.F `add_access` /
/// `remove_access` / `check_access`). `grantor` is the already-resolved
/// wrapping key representing the grantee's identity — for an asymmetric
/// grantee this is the *public*-key proxy keyed under their private id
/// (see `custodia_identity::user::seed_user_edges` for the same
/// technique), since RSA-OAEP only encrypts under the public half.
pub struct AccessControl {
    pub grantor: Key,
    pub asset_id: AssetId,
    pub asset_key: Key,
    pub access: AccessType,
}

#[instrument(skip_all, fields(asset_id = %ac.asset_id, grantor = %ac.grantor.key_id))]
pub fn add_access<L: HostLedger>(
    ledger: &CachedLedger<L>,
    owner_identity: &KeyId,
    ac: &AccessControl,
    allow_before_create: bool,
) -> Result<()> {
    match load_asset(ledger, &ac.asset_id)? {
        Some(asset) if asset.owner() != owner_identity => return Err(CustodiaError::NoAccess),
        Some(_) => {}
        None if !allow_before_create => {
            return Err(CustodiaError::not_found(ac.asset_id.as_str().to_string()))
        }
        None => {}
    }

    match ac.access {
        AccessType::WriteOnly => {
            let phantom_id = write_only_key_id(&ac.asset_id, &ac.asset_key.key_id, owner_identity);
            let phantom_target = Key::new(phantom_id.clone(), ac.asset_key.kind, ac.asset_key.material().to_vec());
            add_edge(
                ledger,
                &ac.grantor,
                &phantom_target,
                EdgeData::new(EdgeKind::WriteOnly { phantom_key_id: phantom_id }),
            )
        }
        AccessType::Read => add_edge(ledger, &ac.grantor, &ac.asset_key, EdgeData::new(EdgeKind::Read)),
        AccessType::Write => add_edge(ledger, &ac.grantor, &ac.asset_key, EdgeData::new(EdgeKind::Write)),
    }
}

#[instrument(skip_all, fields(asset_id = %ac.asset_id, grantor = %ac.grantor.key_id))]
pub fn remove_access<L: HostLedger>(
    ledger: &CachedLedger<L>,
    owner_identity: &KeyId,
    ac: &AccessControl,
) -> Result<()> {
    let asset = load_asset(ledger, &ac.asset_id)?.ok_or_else(|| CustodiaError::not_found(ac.asset_id.as_str().to_string()))?;
    if asset.owner() != owner_identity {
        return Err(CustodiaError::NoAccess);
    }

    match ac.access {
        AccessType::Write => update_edge_data(
            ledger,
            &ac.grantor.key_id,
            &ac.asset_key.key_id,
            EdgeData::new(EdgeKind::Read),
        ),
        AccessType::Read => revoke(ledger, &ac.grantor.key_id, &ac.asset_key.key_id),
        AccessType::WriteOnly => {
            let phantom_id = write_only_key_id(&ac.asset_id, &ac.asset_key.key_id, owner_identity);
            revoke(ledger, &ac.grantor.key_id, &phantom_id)
        }
    }
}

/// `check_access(access_control)` (spec §4.F): "caller may only check own
/// access unless caller is owner" is enforced by the caller of this
/// function (the host authenticates `caller_identity` against
/// `ac.grantor.key_id` or asset ownership before calling).
pub fn check_access<L: HostLedger>(
    ledger: &CachedLedger<L>,
    caller_identity: &KeyId,
    caller: &CallerKeys,
    asset: &Asset,
    datatype_links: &[custodia_kag::DatatypeLink],
    requested: AccessType,
) -> Result<bool> {
    let access = AssetAccess {
        asset_id: &asset.asset_id,
        asset_key_id: &asset.asset_key_id,
        owner_id: asset.owner(),
        datatype_links,
    };
    kag_check_access(ledger, caller_identity, caller, &access, requested)
}
