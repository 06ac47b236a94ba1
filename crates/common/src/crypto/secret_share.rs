//! Sealing a symmetric secret to an Ed25519 public key
//!
//! Used wherever a key has to travel to a specific holder of an Ed25519 key:
//! share keys sent to an identity (the server-side response representation
//! and invites), legacy item keys sealed to the vault public key, and legacy
//! metadata keys.
//!
//! The construction is ephemeral ECDH over X25519 (after converting both
//! Ed25519 keys to Montgomery form). The AES-256 key-wrap KEK (RFC 3394) is
//! derived from the exact ephemeral and recipient key bytes together with the
//! shared secret, so the wrap's integrity check rejects a wrong recipient or
//! a modification of any byte, the ephemeral key's sign bit included.

use std::convert::TryFrom;
use std::fmt;

use aes_kw::KekAes256 as Kek;
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, Zeroizing};

use super::keys::{KeyError, PublicKey, SecretKey, PUBLIC_KEY_SIZE};
use super::secret::{Secret, SecretError, SECRET_SIZE};
use crate::wire;

/// Size of AES Key Wrap integrity block in bytes
pub const KW_BLOCK_SIZE: usize = 8;
/// Total size of a sealed share in bytes
///
/// Layout: ephemeral_pubkey (32) || wrapped_secret (40) = 72 bytes
pub const SECRET_SHARE_SIZE: usize = PUBLIC_KEY_SIZE + SECRET_SIZE + KW_BLOCK_SIZE;

const KEK_CONTEXT: &str = "sealvault 2024-06 secret share key-wrap key";

/// Errors that can occur during share creation or recovery
#[derive(Debug, thiserror::Error)]
pub enum SecretShareError {
    #[error("invalid share size, expected {expected}, got {actual}")]
    InvalidSize { expected: usize, actual: usize },
    /// The wrap integrity check failed: wrong recipient or modified share
    #[error("share could not be unwrapped")]
    Unwrap,
    #[error("share error: {0}")]
    Default(#[from] anyhow::Error),
    #[error("key error: {0}")]
    Key(#[from] KeyError),
    #[error("secret error: {0}")]
    Secret(#[from] SecretError),
}

/// A secret sealed to one recipient's public key
///
/// # Wire Format
///
/// ```text
/// [ ephemeral_pubkey: 32 bytes ][ wrapped_secret: 40 bytes ]
/// ```
///
/// Serialized as standard base64.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SecretShare([u8; SECRET_SHARE_SIZE]);

impl fmt::Debug for SecretShare {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SecretShare").field(&self.to_base64()).finish()
    }
}

impl TryFrom<&[u8]> for SecretShare {
    type Error = SecretShareError;
    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        if bytes.len() != SECRET_SHARE_SIZE {
            return Err(SecretShareError::InvalidSize {
                expected: SECRET_SHARE_SIZE,
                actual: bytes.len(),
            });
        }
        let mut share = [0; SECRET_SHARE_SIZE];
        share.copy_from_slice(bytes);
        Ok(SecretShare(share))
    }
}

impl TryFrom<String> for SecretShare {
    type Error = SecretShareError;
    fn try_from(encoded: String) -> Result<Self, Self::Error> {
        SecretShare::from_base64(&encoded)
    }
}

impl From<SecretShare> for String {
    fn from(share: SecretShare) -> Self {
        share.to_base64()
    }
}

impl SecretShare {
    pub fn from_base64(encoded: &str) -> Result<Self, SecretShareError> {
        let bytes = wire::decode(encoded, "secret share")
            .map_err(|e| anyhow::anyhow!("{}", e))?;
        SecretShare::try_from(bytes.as_slice())
    }

    pub fn to_base64(&self) -> String {
        wire::encode(self.0)
    }

    /// Seal `secret` so only the holder of `recipient`'s secret key can recover it
    pub fn new(secret: &Secret, recipient: &PublicKey) -> Result<Self, SecretShareError> {
        let ephemeral_private = SecretKey::generate()?;
        let ephemeral_public = ephemeral_private.public();

        let ephemeral_x25519_private = ephemeral_private.to_x25519();
        let recipient_x25519_public = recipient.to_x25519()?;
        let shared_secret = ephemeral_x25519_private.diffie_hellman(&recipient_x25519_public);

        let kek = derive_kek(&ephemeral_public, recipient, shared_secret.as_bytes());
        let wrapped = kek
            .wrap_vec(secret.bytes())
            .map_err(|_| anyhow::anyhow!("AES-KW wrap error"))?;

        let ephemeral_bytes = ephemeral_public.to_bytes();
        if ephemeral_bytes.len() + wrapped.len() != SECRET_SHARE_SIZE {
            return Err(anyhow::anyhow!("expected share size is incorrect").into());
        };

        let mut share = [0; SECRET_SHARE_SIZE];
        share[..PUBLIC_KEY_SIZE].copy_from_slice(&ephemeral_bytes);
        share[PUBLIC_KEY_SIZE..].copy_from_slice(&wrapped);
        Ok(SecretShare(share))
    }

    /// Recover the sealed secret with the recipient's secret key
    ///
    /// Fails with [`SecretShareError::Unwrap`] if the share was sealed to a
    /// different key or was modified.
    pub fn recover(&self, recipient_secret: &SecretKey) -> Result<Secret, SecretShareError> {
        // The ephemeral key is part of the sealed bytes; if it does not
        // parse, the share was modified.
        let ephemeral_public = PublicKey::try_from(&self.0[..PUBLIC_KEY_SIZE])
            .map_err(|_| SecretShareError::Unwrap)?;
        let ephemeral_x25519_public = ephemeral_public
            .to_x25519()
            .map_err(|_| SecretShareError::Unwrap)?;

        let recipient_x25519_private = recipient_secret.to_x25519();
        let shared_secret = recipient_x25519_private.diffie_hellman(&ephemeral_x25519_public);

        let kek = derive_kek(
            &ephemeral_public,
            &recipient_secret.public(),
            shared_secret.as_bytes(),
        );

        let mut unwrapped = kek
            .unwrap_vec(&self.0[PUBLIC_KEY_SIZE..])
            .map_err(|_| SecretShareError::Unwrap)?;
        let secret = Secret::from_slice(&unwrapped);
        unwrapped.zeroize();
        Ok(secret?)
    }

    /// Get a reference to the raw share bytes
    pub fn bytes(&self) -> &[u8] {
        &self.0
    }
}

/// KEK = BLAKE3-derive(ephemeral_pub || recipient_pub || dh)
fn derive_kek(ephemeral: &PublicKey, recipient: &PublicKey, shared_secret: &[u8; 32]) -> Kek {
    let mut material = Zeroizing::new(Vec::with_capacity(3 * PUBLIC_KEY_SIZE));
    material.extend_from_slice(&ephemeral.to_bytes());
    material.extend_from_slice(&recipient.to_bytes());
    material.extend_from_slice(shared_secret);
    let mut kek_bytes = blake3::derive_key(KEK_CONTEXT, &material);
    let kek = Kek::from(kek_bytes);
    kek_bytes.zeroize();
    kek
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_share_secret() {
        let secret = Secret::from_slice(&[42u8; SECRET_SIZE]).unwrap();
        let private_key = SecretKey::generate().unwrap();
        let share = SecretShare::new(&secret, &private_key.public()).unwrap();
        let recovered_secret = share.recover(&private_key).unwrap();
        assert_eq!(secret, recovered_secret);
    }

    #[test]
    fn test_share_different_keys() {
        let secret = Secret::generate().unwrap();
        let alice_private = SecretKey::generate().unwrap();
        let bob_private = SecretKey::generate().unwrap();

        let share = SecretShare::new(&secret, &alice_private.public()).unwrap();
        assert_eq!(secret, share.recover(&alice_private).unwrap());
        assert!(matches!(
            share.recover(&bob_private),
            Err(SecretShareError::Unwrap)
        ));
    }

    #[test]
    fn test_share_modified_fails() {
        let secret = Secret::generate().unwrap();
        let private_key = SecretKey::generate().unwrap();
        let share = SecretShare::new(&secret, &private_key.public()).unwrap();

        let mut bytes = share.bytes().to_vec();
        bytes[SECRET_SHARE_SIZE - 1] ^= 0x01;
        let modified = SecretShare::try_from(bytes.as_slice()).unwrap();
        assert!(modified.recover(&private_key).is_err());
    }

    #[test]
    fn test_share_every_bit_flip_fails() {
        let secret = Secret::generate().unwrap();
        let private_key = SecretKey::generate().unwrap();
        let share = SecretShare::new(&secret, &private_key.public()).unwrap();

        for index in 0..SECRET_SHARE_SIZE {
            for bit in 0..8 {
                let mut bytes = share.bytes().to_vec();
                bytes[index] ^= 1 << bit;
                let modified = SecretShare::try_from(bytes.as_slice()).unwrap();
                assert!(
                    matches!(modified.recover(&private_key), Err(SecretShareError::Unwrap)),
                    "flip of byte {} bit {} was not rejected",
                    index,
                    bit
                );
            }
        }
    }

    #[test]
    fn test_share_serde_json_roundtrip() {
        let secret = Secret::generate().unwrap();
        let private_key = SecretKey::generate().unwrap();
        let share = SecretShare::new(&secret, &private_key.public()).unwrap();

        let json = serde_json::to_string(&share).unwrap();
        assert_eq!(json, format!("\"{}\"", share.to_base64()));
        let recovered_share: SecretShare = serde_json::from_str(&json).unwrap();
        assert_eq!(share, recovered_share);
        assert_eq!(secret, recovered_share.recover(&private_key).unwrap());
    }

    #[test]
    fn test_share_invalid_length() {
        assert!(matches!(
            SecretShare::try_from(&[0u8; SECRET_SHARE_SIZE - 1][..]),
            Err(SecretShareError::InvalidSize { .. })
        ));
        let too_long = wire::encode([0u8; SECRET_SHARE_SIZE + 1]);
        assert!(SecretShare::from_base64(&too_long).is_err());
    }
}
