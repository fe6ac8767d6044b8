use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::types::{AssetId, Hash32, KeyId, Timestamp, ASSET_ID_PREFIX};

/// Derive the canonical asset id for `(namespace, id)` (spec §6):
/// `"a-" ++ base64url(sha256(namespace + "-" + id))`.
pub fn asset_id(namespace: &str, id: &str) -> AssetId {
    let preimage = format!("{}-{}", namespace, id);
    let digest = custodia_sha256(preimage.as_bytes());
    let encoded = base64url_encode(&digest);
    AssetId(format!("{}{}", ASSET_ID_PREFIX, encoded))
}

// Kept dependency-free (no custodia-crypto dependency from core, to avoid a
// cycle); this is the same SHA-256 algorithm custodia-crypto exposes as
// `hash()`, duplicated here only for id derivation.
fn custodia_sha256(data: &[u8]) -> [u8; 32] {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(data);
    let out = hasher.finalize();
    let mut arr = [0u8; 32];
    arr.copy_from_slice(&out);
    arr
}

fn base64url_encode(bytes: &[u8]) -> String {
    const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";
    let mut out = String::with_capacity((bytes.len() + 2) / 3 * 4);
    for chunk in bytes.chunks(3) {
        let b0 = chunk[0] as u32;
        let b1 = *chunk.get(1).unwrap_or(&0) as u32;
        let b2 = *chunk.get(2).unwrap_or(&0) as u32;
        let n = (b0 << 16) | (b1 << 8) | b2;
        out.push(ALPHABET[((n >> 18) & 0x3F) as usize] as char);
        out.push(ALPHABET[((n >> 12) & 0x3F) as usize] as char);
        if chunk.len() > 1 {
            out.push(ALPHABET[((n >> 6) & 0x3F) as usize] as char);
        }
        if chunk.len() > 2 {
            out.push(ALPHABET[(n & 0x3F) as usize] as char);
        }
    }
    out
}

/// An encrypted application asset (spec §3 Asset).
///
/// Single-owner by design (Non-goal: no multi-owner assets). `private_data`
/// is never written decrypted; `asset_key_hash` is fixed at creation and
/// every future update must present a key whose SHA-256 hash matches it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Asset {
    pub asset_id: AssetId,
    /// Singleton by construction — index 0 is always the current owner.
    pub owner_ids: [KeyId; 1],
    /// Normalized datatype set (leaves only under the parent partial order).
    pub datatypes: BTreeSet<String>,
    pub public_data: Vec<u8>,
    /// Ciphertext, or an external-blob pointer when off-chain (spec §4.E
    /// off-chain mode reuses the same pointer convention for index rows;
    /// assets may also point off-chain via `BlobPointer` in `metadata`).
    pub private_data: Vec<u8>,
    pub asset_key_id: KeyId,
    pub asset_key_hash: Hash32,
    pub index_table_name: Option<String>,
    pub metadata: BTreeMap<String, String>,
}

impl Asset {
    pub fn owner(&self) -> &KeyId {
        &self.owner_ids[0]
    }
}
