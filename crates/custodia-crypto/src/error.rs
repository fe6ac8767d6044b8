use thiserror::Error;

/// Crypto-layer failures. Callers at the KAG/Asset Manager boundary map
/// these onto `CustodiaError::IntegrityError` (spec §4.A: "Failures:
/// DecryptionError on tag mismatch or wrong key").
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("decryption failed: authentication tag mismatch or wrong key")]
    DecryptionFailed,

    #[error("encryption failed")]
    EncryptionFailed,

    #[error("malformed key material")]
    MalformedKey,

    #[error("ciphertext too short to contain a nonce")]
    CiphertextTooShort,

    #[error("key kind mismatch: expected {expected}, got {got}")]
    KindMismatch {
        expected: &'static str,
        got: &'static str,
    },
}

impl From<CryptoError> for custodia_core::CustodiaError {
    fn from(e: CryptoError) -> Self {
        custodia_core::CustodiaError::IntegrityError(e.to_string())
    }
}
