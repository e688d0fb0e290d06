//! Content encryption for sensitive items.
//!
//! AES-256-GCM over a PBKDF2-HMAC-SHA256 derived key. Salt (16 bytes) and IV
//! (12 bytes) are fresh random values on every call and travel base64-encoded
//! inside [`CryptoParams`] next to the ciphertext, together with a format
//! version tag for forward compatibility.
//!
//! The subsystem is stateless: a pure transform over content + passphrase and
//! the OS CSPRNG. It never touches storage or the network, and passphrases
//! are never persisted anywhere.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::{engine::general_purpose, Engine as _};
use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::error::CryptoError;
use crate::model::{CryptoParams, EncryptedContent, PlainContent};

pub const PBKDF2_ITERATIONS: u32 = 100_000;
pub const SALT_LEN: usize = 16;
pub const IV_LEN: usize = 12;
pub const CRYPTO_VERSION: u32 = 1;

const KEY_LEN: usize = 32;

/// Derive the AES key. Zeroized on drop.
fn derive_key(passphrase: &str, salt: &[u8], iterations: u32) -> Zeroizing<[u8; KEY_LEN]> {
    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    pbkdf2_hmac::<Sha256>(passphrase.as_bytes(), salt, iterations, key.as_mut());
    key
}

/// Encrypt plain content with a passphrase.
pub fn encrypt_content(
    content: &PlainContent,
    passphrase: &str,
) -> Result<EncryptedContent, CryptoError> {
    let mut salt = [0u8; SALT_LEN];
    rand::rngs::OsRng.fill_bytes(&mut salt);
    let mut iv = [0u8; IV_LEN];
    rand::rngs::OsRng.fill_bytes(&mut iv);

    let key = derive_key(passphrase, &salt, PBKDF2_ITERATIONS);
    let cipher =
        Aes256Gcm::new_from_slice(key.as_ref()).map_err(|_| CryptoError::EncryptFailed)?;

    let plaintext = Zeroizing::new(serde_json::to_vec(content)?);
    let nonce = Nonce::from(iv);
    let ciphertext = cipher
        .encrypt(&nonce, plaintext.as_slice())
        .map_err(|_| CryptoError::EncryptFailed)?;

    Ok(EncryptedContent {
        ciphertext: general_purpose::STANDARD.encode(ciphertext),
        crypto: CryptoParams {
            alg: "AES-GCM".to_string(),
            key_derivation: "PBKDF2".to_string(),
            salt: general_purpose::STANDARD.encode(salt),
            iv: general_purpose::STANDARD.encode(iv),
            iterations: PBKDF2_ITERATIONS,
            version: CRYPTO_VERSION,
        },
    })
}

/// Decrypt encrypted content with a passphrase.
///
/// Fails with [`CryptoError::UnsupportedVersion`] on an unrecognized format
/// version, and with the uniform [`CryptoError::DecryptFailed`] for a wrong
/// passphrase or tampered ciphertext.
pub fn decrypt_content(
    encrypted: &EncryptedContent,
    passphrase: &str,
) -> Result<PlainContent, CryptoError> {
    let params = &encrypted.crypto;
    if params.version != CRYPTO_VERSION {
        return Err(CryptoError::UnsupportedVersion(params.version));
    }

    let salt = general_purpose::STANDARD.decode(&params.salt)?;
    let iv = general_purpose::STANDARD.decode(&params.iv)?;
    let ciphertext = general_purpose::STANDARD.decode(&encrypted.ciphertext)?;
    let iv: [u8; IV_LEN] = iv
        .as_slice()
        .try_into()
        .map_err(|_| CryptoError::DecryptFailed)?;

    let key = derive_key(passphrase, &salt, params.iterations);
    let cipher =
        Aes256Gcm::new_from_slice(key.as_ref()).map_err(|_| CryptoError::DecryptFailed)?;

    let nonce = Nonce::from(iv);
    let plaintext = Zeroizing::new(
        cipher
            .decrypt(&nonce, ciphertext.as_slice())
            .map_err(|_| CryptoError::DecryptFailed)?,
    );

    // The tag already authenticated the bytes; a parse failure here still
    // reports the uniform decryption error to avoid a distinguishable path.
    serde_json::from_slice(&plaintext).map_err(|_| CryptoError::DecryptFailed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PlainContent {
        PlainContent::url("https://example.com/article?id=42")
    }

    #[test]
    fn roundtrip_url_and_text() {
        for content in [sample(), PlainContent::text("meeting notes\nline two")] {
            let encrypted = encrypt_content(&content, "correct horse").unwrap();
            let decrypted = decrypt_content(&encrypted, "correct horse").unwrap();
            assert_eq!(decrypted, content);
        }
    }

    #[test]
    fn wrong_passphrase_is_uniform_decrypt_error() {
        let encrypted = encrypt_content(&sample(), "passphrase-one").unwrap();
        let err = decrypt_content(&encrypted, "passphrase-two").unwrap_err();
        assert!(matches!(err, CryptoError::DecryptFailed));
    }

    #[test]
    fn tampered_ciphertext_is_uniform_decrypt_error() {
        let mut encrypted = encrypt_content(&sample(), "pass").unwrap();
        let mut raw = general_purpose::STANDARD
            .decode(&encrypted.ciphertext)
            .unwrap();
        raw[0] ^= 0x01;
        encrypted.ciphertext = general_purpose::STANDARD.encode(raw);
        let err = decrypt_content(&encrypted, "pass").unwrap_err();
        assert!(matches!(err, CryptoError::DecryptFailed));
    }

    #[test]
    fn salt_and_iv_are_fresh_per_call() {
        let a = encrypt_content(&sample(), "pass").unwrap();
        let b = encrypt_content(&sample(), "pass").unwrap();
        assert_ne!(a.crypto.salt, b.crypto.salt);
        assert_ne!(a.crypto.iv, b.crypto.iv);
        assert_ne!(a.ciphertext, b.ciphertext);
    }

    #[test]
    fn unknown_version_fails_fast() {
        let mut encrypted = encrypt_content(&sample(), "pass").unwrap();
        encrypted.crypto.version = 2;
        let err = decrypt_content(&encrypted, "pass").unwrap_err();
        assert!(matches!(err, CryptoError::UnsupportedVersion(2)));
    }

    #[test]
    fn params_record_fixed_algorithms() {
        let encrypted = encrypt_content(&sample(), "pass").unwrap();
        assert_eq!(encrypted.crypto.alg, "AES-GCM");
        assert_eq!(encrypted.crypto.key_derivation, "PBKDF2");
        assert_eq!(encrypted.crypto.iterations, PBKDF2_ITERATIONS);
    }
}
