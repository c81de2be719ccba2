//! Encryption for the store file and for backups.
//!
//! The store file is sealed with the installation key using XChaCha20-Poly1305:
//!
//! ```text
//! [ magic "DAYBOOK1" (8) | nonce (24) | ciphertext + tag ]
//! ```
//!
//! The magic is also bound as associated data, so a file from another format
//! version fails authentication instead of decrypting to garbage.
//!
//! Backups are independent of the installation key and use Age passphrase
//! encryption so they can be restored on another device.

use std::io::{Read, Write};
use std::iter;

use age::secrecy::SecretString;
use chacha20poly1305::aead::{Aead, AeadCore, KeyInit, OsRng, Payload};
use chacha20poly1305::{XChaCha20Poly1305, XNonce};
use zeroize::Zeroizing;

use crate::error::{Result, StoreError};
use crate::keys::EncryptionKey;

/// File header of a sealed store.
pub const STORE_MAGIC: &[u8; 8] = b"DAYBOOK1";

const NONCE_LENGTH: usize = 24;

/// Seal `plaintext` with the installation key.
pub fn seal(key: &EncryptionKey, plaintext: &[u8]) -> Result<Vec<u8>> {
    let key_bytes = key.to_bytes()?;
    let cipher = XChaCha20Poly1305::new_from_slice(&key_bytes[..])
        .map_err(|e| StoreError::Crypto(format!("Invalid key length: {}", e)))?;
    let nonce = XChaCha20Poly1305::generate_nonce(&mut OsRng);

    let ciphertext = cipher
        .encrypt(
            &nonce,
            Payload {
                msg: plaintext,
                aad: STORE_MAGIC,
            },
        )
        .map_err(|_| StoreError::Crypto("Sealing failed".to_string()))?;

    let mut out = Vec::with_capacity(STORE_MAGIC.len() + NONCE_LENGTH + ciphertext.len());
    out.extend_from_slice(STORE_MAGIC);
    out.extend_from_slice(&nonce);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Open a sealed store image.
///
/// # Errors
///
/// Returns `StoreError::Crypto` if the header is not a Daybook store, or if
/// authentication fails (wrong key or corrupted file).
pub fn unseal(key: &EncryptionKey, sealed: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
    let body = sealed
        .strip_prefix(STORE_MAGIC.as_slice())
        .ok_or_else(|| StoreError::Crypto("Not a daybook store file".to_string()))?;
    if body.len() < NONCE_LENGTH {
        return Err(StoreError::Crypto("Store file is truncated".to_string()));
    }
    let (nonce, ciphertext) = body.split_at(NONCE_LENGTH);

    let key_bytes = key.to_bytes()?;
    let cipher = XChaCha20Poly1305::new_from_slice(&key_bytes[..])
        .map_err(|e| StoreError::Crypto(format!("Invalid key length: {}", e)))?;

    let plaintext = cipher
        .decrypt(
            XNonce::from_slice(nonce),
            Payload {
                msg: ciphertext,
                aad: STORE_MAGIC,
            },
        )
        .map_err(|_| StoreError::Crypto("Incorrect key or corrupted store file".to_string()))?;

    Ok(Zeroizing::new(plaintext))
}

/// Encrypt data using Age passphrase-based encryption (scrypt KDF).
pub fn encrypt_with_passphrase(data: &[u8], passphrase: &str) -> Result<Vec<u8>> {
    let encryptor =
        age::Encryptor::with_user_passphrase(SecretString::from(passphrase.to_string()));

    let mut encrypted = Vec::new();
    let mut writer = encryptor
        .wrap_output(&mut encrypted)
        .map_err(|e| StoreError::Crypto(format!("Failed to create encryptor: {}", e)))?;

    writer
        .write_all(data)
        .map_err(|e| StoreError::Crypto(format!("Encryption write failed: {}", e)))?;

    writer
        .finish()
        .map_err(|e| StoreError::Crypto(format!("Encryption finish failed: {}", e)))?;

    Ok(encrypted)
}

/// Decrypt data produced by [`encrypt_with_passphrase`].
///
/// # Errors
///
/// Returns `StoreError::IncorrectPassphrase` when the passphrase does not match,
/// `StoreError::Crypto` for any other failure.
pub fn decrypt_with_passphrase(encrypted_data: &[u8], passphrase: &str) -> Result<Zeroizing<Vec<u8>>> {
    let decryptor = age::Decryptor::new(encrypted_data)
        .map_err(|e| StoreError::Crypto(format!("Failed to create decryptor: {}", e)))?;

    let identity = age::scrypt::Identity::new(SecretString::from(passphrase.to_string()));
    let mut reader = decryptor
        .decrypt(iter::once(&identity as &dyn age::Identity))
        .map_err(|e| match e {
            age::DecryptError::NoMatchingKeys
            | age::DecryptError::DecryptionFailed
            | age::DecryptError::KeyDecryptionFailed => StoreError::IncorrectPassphrase,
            _ => StoreError::Crypto(format!("Decryption failed: {}", e)),
        })?;

    let mut decrypted = Zeroizing::new(Vec::new());
    reader
        .read_to_end(&mut decrypted)
        .map_err(|e| StoreError::Crypto(format!("Failed to read decrypted data: {}", e)))?;

    Ok(decrypted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seal_unseal_round_trip() {
        let key = EncryptionKey::generate().unwrap();
        let sealed = seal(&key, b"sqlite image").unwrap();

        assert!(sealed.starts_with(STORE_MAGIC));
        assert_eq!(unseal(&key, &sealed).unwrap().as_slice(), b"sqlite image");
    }

    #[test]
    fn test_seal_uses_fresh_nonce() {
        let key = EncryptionKey::generate().unwrap();
        assert_ne!(seal(&key, b"same").unwrap(), seal(&key, b"same").unwrap());
    }

    #[test]
    fn test_unseal_wrong_key_fails() {
        let key = EncryptionKey::generate().unwrap();
        let other = EncryptionKey::generate().unwrap();
        let sealed = seal(&key, b"secret").unwrap();

        let err = unseal(&other, &sealed).unwrap_err();
        assert!(err.to_string().contains("Incorrect key"));
    }

    #[test]
    fn test_unseal_corrupted_fails() {
        let key = EncryptionKey::generate().unwrap();
        let mut sealed = seal(&key, b"secret data").unwrap();
        let last = sealed.len() - 1;
        sealed[last] ^= 0xFF;

        assert!(unseal(&key, &sealed).is_err());
    }

    #[test]
    fn test_unseal_rejects_foreign_and_truncated_files() {
        let key = EncryptionKey::generate().unwrap();
        assert!(unseal(&key, b"SQLite format 3\0").is_err());
        assert!(unseal(&key, b"DAYBOOK1short").is_err());
    }

    #[test]
    fn test_passphrase_round_trip_and_wrong_passphrase() {
        let encrypted = encrypt_with_passphrase(b"backup", "correct-passphrase-123").unwrap();

        let decrypted = decrypt_with_passphrase(&encrypted, "correct-passphrase-123").unwrap();
        assert_eq!(decrypted.as_slice(), b"backup");

        let result = decrypt_with_passphrase(&encrypted, "wrong-passphrase-456");
        assert!(matches!(result, Err(StoreError::IncorrectPassphrase)));
    }
}
