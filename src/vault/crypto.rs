//! Gesture Vault Cryptography
//!
//! - Key derivation: SHA-256 of the canonical gesture string, used
//!   directly as an AES-256 key. No salt and no stretching, so the same
//!   gesture always yields the same key and nothing extra needs storing.
//!   Stored records depend on this exact derivation.
//! - Encryption: AES-256-GCM with a fresh random 12-byte nonce per call,
//!   stored as base64(nonce || ciphertext || tag).
//! - Decryption failures collapse into one `DecryptionError` whatever
//!   the cause, so a wrong gesture and a damaged blob look the same.

use crate::error::{GestureVaultError, Result};
use crate::vault::types::EncryptedBlob;
use aes_gcm::aead::Aead;
use aes_gcm::{Aes256Gcm, Key, KeyInit, Nonce};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use rand::rngs::OsRng;
use rand::RngCore;
use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

/// AES-GCM nonce length in bytes
pub const NONCE_LEN: usize = 12;

/// AES-GCM authentication tag length in bytes
pub const TAG_LEN: usize = 16;

/// Derive the 256-bit cipher key from a canonical gesture string
pub fn derive_key(gesture_key: &SecretString) -> Zeroizing<[u8; 32]> {
    let digest = Sha256::digest(gesture_key.expose_secret().as_bytes());
    let mut key = Zeroizing::new([0u8; 32]);
    key.copy_from_slice(&digest);
    key
}

fn cipher_for(gesture_key: &SecretString) -> Aes256Gcm {
    let key = derive_key(gesture_key);
    Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key[..]))
}

/// Encrypt a secret under a gesture
pub fn encrypt(secret: &SecretString, gesture_key: &SecretString) -> Result<EncryptedBlob> {
    encrypt_with(&mut OsRng, secret, gesture_key)
}

pub(crate) fn encrypt_with<R: RngCore + ?Sized>(
    rng: &mut R,
    secret: &SecretString,
    gesture_key: &SecretString,
) -> Result<EncryptedBlob> {
    let mut nonce = [0u8; NONCE_LEN];
    rng.try_fill_bytes(&mut nonce)
        .map_err(|e| GestureVaultError::GenerationError(e.to_string()))?;

    let cipher = cipher_for(gesture_key);
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce), secret.expose_secret().as_bytes())
        .map_err(|e| GestureVaultError::CryptoError(e.to_string()))?;

    let mut blob = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    blob.extend_from_slice(&nonce);
    blob.extend_from_slice(&ciphertext);

    tracing::debug!("Encrypted secret into {} byte blob", blob.len());
    Ok(EncryptedBlob::from_encoded(BASE64.encode(blob)))
}

/// Split a blob into nonce and ciphertext, or `None` if it is malformed
pub(crate) fn split_blob(blob: &EncryptedBlob) -> Option<(Vec<u8>, Vec<u8>)> {
    let bytes = BASE64.decode(blob.as_str().trim()).ok()?;
    if bytes.len() < NONCE_LEN + TAG_LEN {
        return None;
    }
    let (nonce, ciphertext) = bytes.split_at(NONCE_LEN);
    Some((nonce.to_vec(), ciphertext.to_vec()))
}

/// Decrypt a blob with a gesture
pub fn decrypt(blob: &EncryptedBlob, gesture_key: &SecretString) -> Result<SecretString> {
    let (nonce, ciphertext) = split_blob(blob).ok_or(GestureVaultError::DecryptionError)?;

    let cipher = cipher_for(gesture_key);
    let plaintext = cipher
        .decrypt(Nonce::from_slice(&nonce), ciphertext.as_slice())
        .map(Zeroizing::new)
        .map_err(|_| GestureVaultError::DecryptionError)?;

    let text = std::str::from_utf8(&plaintext).map_err(|_| GestureVaultError::DecryptionError)?;
    Ok(SecretString::from(text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn key(text: &str) -> SecretString {
        SecretString::from(text)
    }

    #[test]
    fn test_key_is_plain_sha256_of_gesture() {
        // SHA-256("abc")
        let derived = derive_key(&key("abc"));
        assert_eq!(
            derived[..4],
            [0xba, 0x78, 0x16, 0xbf],
            "derivation must stay unsalted SHA-256"
        );
        assert_eq!(*derive_key(&key("abc")), *derived);
    }

    #[test]
    fn test_round_trip_edge_lengths() {
        let k = key("dots:0-4-8-5");
        for plaintext in [String::new(), "x".repeat(10_000)] {
            let blob = encrypt(&SecretString::from(plaintext.as_str()), &k).unwrap();
            let back = decrypt(&blob, &k).unwrap();
            assert_eq!(back.expose_secret(), plaintext);
        }
    }

    #[test]
    fn test_same_input_encrypts_differently() {
        let k = key("piano:C4,E4");
        let s = SecretString::from("hunter2");
        let a = encrypt(&s, &k).unwrap();
        let b = encrypt(&s, &k).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_wrong_key_and_corruption_are_indistinguishable() {
        let blob = encrypt(&SecretString::from("secret"), &key("right")).unwrap();

        let wrong = decrypt(&blob, &key("wrong")).unwrap_err();

        let mut raw = BASE64.decode(blob.as_str()).unwrap();
        let last = raw.len() - 1;
        raw[last] ^= 0x01;
        let tampered = EncryptedBlob::from_encoded(BASE64.encode(raw));
        let corrupt = decrypt(&tampered, &key("right")).unwrap_err();

        let garbage = decrypt(&EncryptedBlob::from_encoded("%%%".to_string()), &key("right"))
            .unwrap_err();
        let short = decrypt(
            &EncryptedBlob::from_encoded(BASE64.encode([0u8; 20])),
            &key("right"),
        )
        .unwrap_err();

        for err in [wrong, corrupt, garbage, short] {
            assert!(matches!(err, GestureVaultError::DecryptionError));
            assert_eq!(err.to_string(), "Decryption failed");
        }
    }

    #[test]
    fn test_blob_layout_is_nonce_then_ciphertext_and_tag() {
        let blob = encrypt(&SecretString::from("abcd"), &key("k")).unwrap();
        let (nonce, ciphertext) = split_blob(&blob).unwrap();
        assert_eq!(nonce.len(), NONCE_LEN);
        assert_eq!(ciphertext.len(), 4 + TAG_LEN);
    }

    #[test]
    fn test_missing_entropy_is_a_generation_error() {
        let err = encrypt_with(
            &mut crate::vault::test_support::FailingRng,
            &SecretString::from("x"),
            &key("k"),
        )
        .unwrap_err();
        assert!(matches!(err, GestureVaultError::GenerationError(_)));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_decrypt_inverts_encrypt(plaintext in ".{0,200}", gesture in ".{1,40}") {
            let k = key(&gesture);
            let blob = encrypt(&SecretString::from(plaintext.as_str()), &k).unwrap();
            let back = decrypt(&blob, &k).unwrap();
            prop_assert_eq!(back.expose_secret(), plaintext.as_str());
        }

        #[test]
        fn prop_other_gesture_fails(gesture in "[a-z]{1,20}", other in "[A-Z]{1,20}") {
            let blob = encrypt(&SecretString::from("s3cret"), &key(&gesture)).unwrap();
            prop_assert!(matches!(
                decrypt(&blob, &key(&other)),
                Err(GestureVaultError::DecryptionError)
            ));
        }
    }
}
