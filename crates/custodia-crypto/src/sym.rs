use aes_gcm::aead::{Aead, AeadCore, KeyInit};
use aes_gcm::{Aes256Gcm, Key as AesKey, Nonce};
use rand_core::OsRng;

use crate::error::CryptoError;

const NONCE_LEN: usize = 12;

/// AES-256-GCM encrypt. A random 96-bit nonce is generated and prepended to
/// the returned ciphertext (spec §4.A `sym_encrypt`): `nonce || ciphertext`.
pub fn sym_encrypt(key_material: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let cipher = cipher_for(key_material)?;
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
    let mut ciphertext = cipher
        .encrypt(&nonce, plaintext)
        .map_err(|_| CryptoError::EncryptionFailed)?;
    let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    out.extend_from_slice(nonce.as_slice());
    out.append(&mut ciphertext);
    Ok(out)
}

/// AES-256-GCM decrypt. Splits the prepended nonce back off before
/// authenticating and decrypting.
pub fn sym_decrypt(key_material: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if ciphertext.len() < NONCE_LEN {
        return Err(CryptoError::CiphertextTooShort);
    }
    let cipher = cipher_for(key_material)?;
    let (nonce_bytes, body) = ciphertext.split_at(NONCE_LEN);
    let nonce = Nonce::from_slice(nonce_bytes);
    cipher
        .decrypt(nonce, body)
        .map_err(|_| CryptoError::DecryptionFailed)
}

fn cipher_for(key_material: &[u8]) -> Result<Aes256Gcm, CryptoError> {
    if key_material.len() != 32 {
        return Err(CryptoError::MalformedKey);
    }
    let key = AesKey::<Aes256Gcm>::from_slice(key_material);
    Ok(Aes256Gcm::new(key))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let key = [7u8; 32];
        let plaintext = b"the vault holds what the owner allows";
        let ciphertext = sym_encrypt(&key, plaintext).unwrap();
        assert_ne!(ciphertext, plaintext.to_vec());
        let decrypted = sym_decrypt(&key, &ciphertext).unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn wrong_key_fails() {
        let key = [7u8; 32];
        let wrong_key = [9u8; 32];
        let ciphertext = sym_encrypt(&key, b"secret").unwrap();
        assert!(matches!(
            sym_decrypt(&wrong_key, &ciphertext),
            Err(CryptoError::DecryptionFailed)
        ));
    }

    #[test]
    fn tampered_ciphertext_fails() {
        let key = [1u8; 32];
        let mut ciphertext = sym_encrypt(&key, b"payload").unwrap();
        let last = ciphertext.len() - 1;
        ciphertext[last] ^= 0xFF;
        assert!(sym_decrypt(&key, &ciphertext).is_err());
    }

    #[test]
    fn nonces_are_not_reused_across_calls() {
        let key = [3u8; 32];
        let a = sym_encrypt(&key, b"same plaintext").unwrap();
        let b = sym_encrypt(&key, b"same plaintext").unwrap();
        assert_ne!(a, b, "random nonce must vary encryption output");
    }
}
