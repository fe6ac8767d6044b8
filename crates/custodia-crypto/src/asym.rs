use rand_core::OsRng;
use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey, EncodeRsaPrivateKey, EncodeRsaPublicKey};
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;

use crate::error::CryptoError;

/// RSA-2048 modulus size (spec §4.A: "RSA-2048-OAEP-SHA256").
pub const RSA_KEY_BITS: usize = 2048;

/// Generate a fresh RSA-2048 keypair, returning `(public_der, private_der)`
/// as PKCS#1 DER bytes — the `material` carried by a [`custodia_core::Key`]
/// of kind `AsymmetricPublic`/`AsymmetricPrivate`.
pub fn generate_keypair() -> Result<(Vec<u8>, Vec<u8>), CryptoError> {
    let private_key =
        RsaPrivateKey::new(&mut OsRng, RSA_KEY_BITS).map_err(|_| CryptoError::EncryptionFailed)?;
    let public_key = RsaPublicKey::from(&private_key);
    let public_der = public_key
        .to_pkcs1_der()
        .map_err(|_| CryptoError::MalformedKey)?
        .as_bytes()
        .to_vec();
    let private_der = private_key
        .to_pkcs1_der()
        .map_err(|_| CryptoError::MalformedKey)?
        .as_bytes()
        .to_vec();
    Ok((public_der, private_der))
}

/// RSA-OAEP-SHA256 encrypt under a PKCS#1-DER-encoded public key (spec §4.A
/// `asym_encrypt`).
pub fn asym_encrypt(public_key_der: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let public_key =
        RsaPublicKey::from_pkcs1_der(public_key_der).map_err(|_| CryptoError::MalformedKey)?;
    public_key
        .encrypt(&mut OsRng, Oaep::new::<Sha256>(), plaintext)
        .map_err(|_| CryptoError::EncryptionFailed)
}

/// RSA-OAEP-SHA256 decrypt under a PKCS#1-DER-encoded private key (spec
/// §4.A `asym_decrypt`).
pub fn asym_decrypt(private_key_der: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let private_key =
        RsaPrivateKey::from_pkcs1_der(private_key_der).map_err(|_| CryptoError::MalformedKey)?;
    private_key
        .decrypt(Oaep::new::<Sha256>(), ciphertext)
        .map_err(|_| CryptoError::DecryptionFailed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let (public_der, private_der) = generate_keypair().unwrap();
        let plaintext = b"a 32-byte symmetric key would go here!!";
        let ciphertext = asym_encrypt(&public_der, &plaintext[..32]).unwrap();
        let decrypted = asym_decrypt(&private_der, &ciphertext).unwrap();
        assert_eq!(decrypted, &plaintext[..32]);
    }

    #[test]
    fn wrong_private_key_fails() {
        let (public_der, _) = generate_keypair().unwrap();
        let (_, other_private_der) = generate_keypair().unwrap();
        let ciphertext = asym_encrypt(&public_der, b"short secret").unwrap();
        assert!(asym_decrypt(&other_private_der, &ciphertext).is_err());
    }
}
