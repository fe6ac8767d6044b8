use custodia_core::{CustodiaError, Result};

/// Per-table secret material for an `encrypted` index table (spec §4.E:
/// "indexed values are deterministically hashed under a secret derived from
/// the table owner's key material; this preserves `GetRowsByPartialKey` but
/// DISABLES arbitrary `GetRowsByRange`"). Segment hashing is deterministic
/// so repeated writes of the same logical value still land on the same
/// composite key, but the hash output carries none of the source value's
/// numeric order.
pub struct TableSecret {
    material: [u8; 32],
}

impl TableSecret {
    pub fn derive(owner_key_material: &[u8], table_name: &str) -> Self {
        let mut seed = Vec::with_capacity(owner_key_material.len() + table_name.len());
        seed.extend_from_slice(owner_key_material);
        seed.extend_from_slice(table_name.as_bytes());
        Self {
            material: custodia_crypto::sym_key_from_seed(&seed),
        }
    }

    /// Deterministic keyed hash of one already-canonically-encoded key
    /// segment. Not order-preserving by design.
    pub fn encode_segment(&self, encoded_segment: &str) -> String {
        let mut input = Vec::with_capacity(self.material.len() + encoded_segment.len());
        input.extend_from_slice(&self.material);
        input.extend_from_slice(encoded_segment.as_bytes());
        custodia_crypto::hash(&input).to_hex()
    }

    pub fn encrypt_row(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        custodia_crypto::sym_encrypt(&self.material, plaintext)
            .map_err(|e| CustodiaError::integrity(e.to_string()))
    }

    pub fn decrypt_row(&self, ciphertext: &[u8]) -> Result<Vec<u8>> {
        custodia_crypto::sym_decrypt(&self.material, ciphertext)
            .map_err(|e| CustodiaError::integrity(e.to_string()))
    }
}
