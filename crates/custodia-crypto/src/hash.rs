use custodia_core::Hash32;
use sha2::{Digest, Sha256};

/// Compute SHA-256 of arbitrary bytes → 32-byte digest (spec §4.A `hash`).
pub fn hash(data: &[u8]) -> Hash32 {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let out = hasher.finalize();
    let mut arr = [0u8; 32];
    arr.copy_from_slice(&out);
    Hash32::from_bytes(arr)
}

/// Derive a 32-byte AES-256 key from a seed: SHA-256(seed) (spec §4.A
/// `sym_key_from_seed`).
pub fn sym_key_from_seed(seed: &[u8]) -> [u8; 32] {
    *hash(seed).as_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_deterministic() {
        assert_eq!(hash(b"hello").to_hex(), hash(b"hello").to_hex());
        assert_ne!(hash(b"hello").to_hex(), hash(b"world").to_hex());
    }

    #[test]
    fn sym_key_from_seed_is_32_bytes_and_deterministic() {
        let k1 = sym_key_from_seed(b"seed-material");
        let k2 = sym_key_from_seed(b"seed-material");
        assert_eq!(k1, k2);
        assert_eq!(k1.len(), 32);
    }
}
