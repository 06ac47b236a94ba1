//! Tagged authenticated encryption using ChaCha20-Poly1305
//!
//! Every ciphertext in the vault is bound to an [`EncryptionTag`]. The tag's
//! label is fed to the AEAD as associated data, so a ciphertext produced for
//! one purpose (say, an item key) never authenticates under another (say,
//! item content), even when the same key is used for both.
//!
//! The output format is: `nonce (12 bytes) || ciphertext || auth_tag (16 bytes)`.

use std::fmt;

use chacha20poly1305::{
    aead::{Aead, KeyInit, Payload},
    ChaCha20Poly1305, Key, Nonce,
};
use serde::{Deserialize, Serialize};

/// Size of ChaCha20-Poly1305 nonce in bytes
pub const NONCE_SIZE: usize = 12;
/// Size of ChaCha20-Poly1305 key in bytes (256 bits)
pub const KEY_SIZE: usize = 32;
/// Size of the Poly1305 authentication tag in bytes
pub const AUTH_TAG_SIZE: usize = 16;

/// Domain-separation label for every kind of ciphertext the vault produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EncryptionTag {
    /// An item key wrapped under a share key
    ItemKey,
    /// Serialized item content under its item key
    ItemContent,
    /// Serialized vault metadata
    VaultMetadata,
    /// Data sealed under a key derived from a user passphrase
    Passphrase,
    /// A detached signature sealed under the key of the thing it signs
    Signature,
}

impl EncryptionTag {
    pub const ALL: [EncryptionTag; 5] = [
        EncryptionTag::ItemKey,
        EncryptionTag::ItemContent,
        EncryptionTag::VaultMetadata,
        EncryptionTag::Passphrase,
        EncryptionTag::Signature,
    ];

    /// The associated-data label bound into every ciphertext under this tag.
    /// These values are part of the on-disk format and must never change.
    pub const fn label(&self) -> &'static str {
        match self {
            EncryptionTag::ItemKey => "sealvault:item-key",
            EncryptionTag::ItemContent => "sealvault:item-content",
            EncryptionTag::VaultMetadata => "sealvault:vault-metadata",
            EncryptionTag::Passphrase => "sealvault:passphrase",
            EncryptionTag::Signature => "sealvault:signature",
        }
    }
}

impl fmt::Display for EncryptionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Errors from the tagged AEAD
#[derive(Debug, thiserror::Error)]
pub enum CipherError {
    #[error("invalid key size, expected {expected}, got {actual}")]
    InvalidKeySize { expected: usize, actual: usize },
    /// Authentication failed. Covers a wrong key, a wrong tag, a truncated
    /// buffer and any modification of nonce, body or auth tag.
    #[error("authentication failed for {0} ciphertext")]
    Authentication(EncryptionTag),
    #[error("cipher error: {0}")]
    Default(#[from] anyhow::Error),
}

fn cipher_for(key: &[u8]) -> Result<ChaCha20Poly1305, CipherError> {
    if key.len() != KEY_SIZE {
        return Err(CipherError::InvalidKeySize {
            expected: KEY_SIZE,
            actual: key.len(),
        });
    }
    Ok(ChaCha20Poly1305::new(Key::from_slice(key)))
}

/// Encrypt `plaintext` under raw `key` bytes, bound to `tag`.
///
/// A fresh random nonce is drawn for every call.
pub fn encrypt(key: &[u8], plaintext: &[u8], tag: EncryptionTag) -> Result<Vec<u8>, CipherError> {
    let cipher = cipher_for(key)?;

    let mut nonce_bytes = [0u8; NONCE_SIZE];
    getrandom::getrandom(&mut nonce_bytes)
        .map_err(|e| anyhow::anyhow!("failed to generate nonce: {}", e))?;
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(
            nonce,
            Payload {
                msg: plaintext,
                aad: tag.label().as_bytes(),
            },
        )
        .map_err(|_| anyhow::anyhow!("{} encrypt error", tag))?;

    let mut out = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    out.extend_from_slice(nonce.as_ref());
    out.extend_from_slice(ciphertext.as_ref());
    Ok(out)
}

/// Decrypt `data` produced by [`encrypt`] under the same key and tag.
///
/// Any mismatch surfaces as [`CipherError::Authentication`].
pub fn decrypt(key: &[u8], data: &[u8], tag: EncryptionTag) -> Result<Vec<u8>, CipherError> {
    let cipher = cipher_for(key)?;
    if data.len() < NONCE_SIZE + AUTH_TAG_SIZE {
        return Err(CipherError::Authentication(tag));
    }

    let nonce = Nonce::from_slice(&data[..NONCE_SIZE]);
    cipher
        .decrypt(
            nonce,
            Payload {
                msg: &data[NONCE_SIZE..],
                aad: tag.label().as_bytes(),
            },
        )
        .map_err(|_| CipherError::Authentication(tag))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_labels_are_stable() {
        assert_eq!(EncryptionTag::ItemKey.label(), "sealvault:item-key");
        assert_eq!(EncryptionTag::ItemContent.label(), "sealvault:item-content");
        assert_eq!(
            EncryptionTag::VaultMetadata.label(),
            "sealvault:vault-metadata"
        );
        assert_eq!(EncryptionTag::Passphrase.label(), "sealvault:passphrase");
        assert_eq!(EncryptionTag::Signature.label(), "sealvault:signature");
    }

    #[test]
    fn test_labels_are_distinct() {
        for (i, a) in EncryptionTag::ALL.iter().enumerate() {
            for b in EncryptionTag::ALL.iter().skip(i + 1) {
                assert_ne!(a.label(), b.label());
            }
        }
    }

    #[test]
    fn test_encrypt_decrypt() {
        let key = [7u8; KEY_SIZE];
        let ct = encrypt(&key, b"hunter2", EncryptionTag::ItemContent).unwrap();
        assert_eq!(ct.len(), NONCE_SIZE + 7 + AUTH_TAG_SIZE);
        let pt = decrypt(&key, &ct, EncryptionTag::ItemContent).unwrap();
        assert_eq!(pt, b"hunter2");
    }

    #[test]
    fn test_fresh_nonce_per_call() {
        let key = [7u8; KEY_SIZE];
        let a = encrypt(&key, b"same", EncryptionTag::ItemContent).unwrap();
        let b = encrypt(&key, b"same", EncryptionTag::ItemContent).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_cross_tag_rejected() {
        let key = [7u8; KEY_SIZE];
        let ct = encrypt(&key, b"item key bytes", EncryptionTag::ItemKey).unwrap();
        for tag in EncryptionTag::ALL {
            let result = decrypt(&key, &ct, tag);
            if tag == EncryptionTag::ItemKey {
                assert!(result.is_ok());
            } else {
                assert!(matches!(result, Err(CipherError::Authentication(t)) if t == tag));
            }
        }
    }

    #[test]
    fn test_truncated_is_authentication_failure() {
        let key = [1u8; KEY_SIZE];
        let result = decrypt(&key, &[0u8; 5], EncryptionTag::Signature);
        assert!(matches!(result, Err(CipherError::Authentication(_))));
    }

    #[test]
    fn test_wrong_key_size() {
        let result = encrypt(&[0u8; 16], b"x", EncryptionTag::ItemKey);
        assert!(matches!(
            result,
            Err(CipherError::InvalidKeySize {
                expected: 32,
                actual: 16
            })
        ));
    }
}
