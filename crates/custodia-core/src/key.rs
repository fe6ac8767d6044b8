use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::types::KeyId;

/// Which algorithm family a [`Key`] participates in. Algorithm is fixed per
/// kind — there is no negotiation (spec §4.A).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyKind {
    /// RSA-2048-OAEP-SHA256 public half.
    AsymmetricPublic,
    /// RSA-2048-OAEP-SHA256 private half.
    AsymmetricPrivate,
    /// AES-256-GCM key.
    Symmetric,
}

impl KeyKind {
    /// Whether a key of this kind can be used to wrap (encrypt) the
    /// material of `target` (spec §4.D `add_edge` precondition):
    /// asymmetric-public wraps symmetric or asymmetric-private; symmetric
    /// wraps symmetric or asymmetric-private.
    pub fn can_wrap(self, target: KeyKind) -> bool {
        match self {
            KeyKind::AsymmetricPublic | KeyKind::Symmetric => {
                matches!(target, KeyKind::Symmetric | KeyKind::AsymmetricPrivate)
            }
            KeyKind::AsymmetricPrivate => false,
        }
    }
}

/// An identified cryptographic key (spec §3 Key).
///
/// `material` is held in memory only as long as the `Key` is alive and is
/// zeroized on drop. `Key` deliberately does NOT implement `Serialize` —
/// the only way key material ever reaches the ledger is as ciphertext
/// inside a KAG edge's `wrapped_target`, produced by `custodia-crypto`.
#[derive(Clone)]
pub struct Key {
    pub key_id: KeyId,
    pub kind: KeyKind,
    material: Vec<u8>,
}

impl Key {
    pub fn new(key_id: KeyId, kind: KeyKind, material: Vec<u8>) -> Self {
        Self {
            key_id,
            kind,
            material,
        }
    }

    pub fn material(&self) -> &[u8] {
        &self.material
    }
}

impl Drop for Key {
    fn drop(&mut self) {
        self.material.zeroize();
    }
}

impl std::fmt::Debug for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Key {{ key_id: {:?}, kind: {:?} }}", self.key_id, self.kind)
    }
}
