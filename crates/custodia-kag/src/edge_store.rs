use custodia_core::{CustodiaError, Edge, EdgeData, Key, KeyId, Result};
use custodia_ledger::{CachedLedger, HostLedger};
use tracing::instrument;

const EDGE_TABLE: &str = "edge";

fn edge_key<L: HostLedger>(ledger: &CachedLedger<L>, source: &KeyId, target: &KeyId) -> Vec<u8> {
    ledger.composite_key(EDGE_TABLE, &[source.as_str().as_bytes(), target.as_str().as_bytes()])
}

fn load_edge<L: HostLedger>(
    ledger: &CachedLedger<L>,
    source: &KeyId,
    target: &KeyId,
) -> Result<Option<Edge>> {
    let key = edge_key(ledger, source, target);
    match ledger.get(&key)? {
        Some(bytes) => {
            let edge: Edge = serde_json::from_slice(&bytes)
                .map_err(|e| CustodiaError::integrity(format!("corrupt edge record: {e}")))?;
            Ok(Some(edge))
        }
        None => Ok(None),
    }
}

fn store_edge<L: HostLedger>(ledger: &CachedLedger<L>, edge: &Edge) -> Result<()> {
    let key = edge_key(ledger, &edge.source_key_id, &edge.target_key_id);
    let bytes = serde_json::to_vec(edge)
        .map_err(|e| CustodiaError::integrity(format!("cannot serialize edge: {e}")))?;
    ledger.put(&key, &bytes)
}

/// Edge existence check without decrypting anything.
pub fn get_edge<L: HostLedger>(
    ledger: &CachedLedger<L>,
    source: &KeyId,
    target: &KeyId,
) -> Result<Option<Edge>> {
    load_edge(ledger, source, target)
}

/// `add_edge(S, T, edge_data)` (spec §4.D): fails unless `source`'s kind can
/// wrap `target`'s material. Idempotent on the `(S, T)` pair — a repeat call
/// overwrites `edge_data` and re-wraps the target material.
#[instrument(skip(ledger, source, target, edge_data), fields(source = %source.key_id, target = %target.key_id))]
pub fn add_edge<L: HostLedger>(
    ledger: &CachedLedger<L>,
    source: &Key,
    target: &Key,
    edge_data: EdgeData,
) -> Result<()> {
    if !source.kind.can_wrap(target.kind) {
        return Err(CustodiaError::invalid_input(format!(
            "{:?} cannot wrap {:?}",
            source.kind, target.kind
        )));
    }
    let wrapped_target = custodia_crypto::wrap(source, target.material())
        .map_err(|e| CustodiaError::integrity(e.to_string()))?;
    let edge = Edge {
        source_key_id: source.key_id.clone(),
        target_key_id: target.key_id.clone(),
        wrapped_target,
        edge_data,
    };
    store_edge(ledger, &edge)
}

/// `update_edge_data` (spec §4.D): preserves `wrapped_target`; fails if the
/// edge is absent.
pub fn update_edge_data<L: HostLedger>(
    ledger: &CachedLedger<L>,
    source: &KeyId,
    target: &KeyId,
    new_data: EdgeData,
) -> Result<()> {
    let mut edge = load_edge(ledger, source, target)?
        .ok_or_else(|| CustodiaError::not_found(format!("edge {source}->{target}")))?;
    edge.edge_data = new_data;
    store_edge(ledger, &edge)
}

/// `revoke(S, T)` (spec §4.D): deletes the edge; missing edge is a no-op
/// success.
pub fn revoke<L: HostLedger>(ledger: &CachedLedger<L>, source: &KeyId, target: &KeyId) -> Result<()> {
    let key = edge_key(ledger, source, target);
    ledger.del(&key)
}

/// Walk `path = [k0, k1, ..., kn]`, decrypting each hop's `wrapped_target`
/// under the material recovered for the previous key, starting from
/// `seed_material_for_k0`. Returns `kn`'s material. A single-element path
/// returns the seed unchanged (spec §4.D).
pub fn get_key_along_path<L: HostLedger>(
    ledger: &CachedLedger<L>,
    path: &[KeyId],
    seed_material_for_k0: Vec<u8>,
    seed_kind: custodia_core::KeyKind,
) -> Result<Vec<u8>> {
    if path.is_empty() {
        return Err(CustodiaError::invalid_input("empty key path"));
    }
    let mut material = seed_material_for_k0;
    let mut kind = seed_kind;

    // Every hop past the seed recovers a key wrapped for decryption, never
    // for further wrapping, so it is always handled as symmetric material
    // from here on (matches how `wrap`/`unwrap` dispatch on `Key::kind`).
    for window in path.windows(2) {
        let (from, to) = (&window[0], &window[1]);
        let edge = load_edge(ledger, from, to)?
            .ok_or_else(|| CustodiaError::not_found(format!("edge {from}->{to}")))?;
        let holder = Key::new(from.clone(), kind, material.clone());
        material = custodia_crypto::unwrap(&holder, &edge.wrapped_target)
            .map_err(|e| CustodiaError::integrity(e.to_string()))?;
        kind = custodia_core::KeyKind::Symmetric;
    }
    Ok(material)
}

/// Existence-only check over a path — no decryption (spec §4.D
/// `verify_access_path`).
pub fn verify_access_path<L: HostLedger>(ledger: &CachedLedger<L>, path: &[KeyId]) -> Result<bool> {
    if path.len() < 2 {
        return Ok(true);
    }
    for window in path.windows(2) {
        if load_edge(ledger, &window[0], &window[1])?.is_none() {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Range-scan every edge whose source is `source`. Used by the group-admin
/// closure strategy to discover which groups a caller directly administers
/// (spec §4.D strategy 5).
pub fn edges_from<L: HostLedger>(ledger: &CachedLedger<L>, source: &KeyId) -> Result<Vec<Edge>> {
    let prefix = ledger.composite_key(EDGE_TABLE, &[source.as_str().as_bytes()]);
    let mut end = prefix.clone();
    end.extend_from_slice(&[0xFF, 0xFF, 0xFF, 0xFF]);
    let rows = ledger.range(&prefix, &end)?;
    let mut edges = Vec::with_capacity(rows.len());
    for (_, bytes) in rows {
        let edge: Edge = serde_json::from_slice(&bytes)
            .map_err(|e| CustodiaError::integrity(format!("corrupt edge record: {e}")))?;
        edges.push(edge);
    }
    Ok(edges)
}
