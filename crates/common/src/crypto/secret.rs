//! 256-bit symmetric keys
//!
//! A [`Secret`] is the in-memory form of every symmetric key in the hierarchy:
//! current-scheme share keys, item keys and legacy metadata keys. The bytes
//! are wiped when the value is dropped and never show up in `Debug` output.

use std::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop};

use super::cipher::{self, CipherError, EncryptionTag, KEY_SIZE};
use super::keys::SecretKey;

/// Size of a symmetric secret in bytes (256 bits)
pub const SECRET_SIZE: usize = KEY_SIZE;

/// Context string for deriving a vault attestation key from a share secret
const ATTESTATION_KEY_CONTEXT: &str = "sealvault 2024-06 vault attestation signing key";

/// Errors that can occur when building a secret
#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    #[error("invalid secret size, expected {expected}, got {actual}")]
    InvalidSize { expected: usize, actual: usize },
    #[error("secret error: {0}")]
    Default(#[from] anyhow::Error),
}

/// A 256-bit symmetric encryption key
///
/// # Examples
///
/// ```ignore
/// let secret = Secret::generate()?;
/// let ciphertext = secret.encrypt(EncryptionTag::ItemContent, b"sensitive data")?;
/// let recovered = secret.decrypt(EncryptionTag::ItemContent, &ciphertext)?;
/// assert_eq!(b"sensitive data", &recovered[..]);
/// ```
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Secret([u8; SECRET_SIZE]);

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Secret").field(&"[REDACTED]").finish()
    }
}

impl From<[u8; SECRET_SIZE]> for Secret {
    fn from(bytes: [u8; SECRET_SIZE]) -> Self {
        Secret(bytes)
    }
}

impl Secret {
    /// Generate a new random secret using a cryptographically secure RNG
    pub fn generate() -> Result<Self, SecretError> {
        let mut buff = [0; SECRET_SIZE];
        getrandom::getrandom(&mut buff)
            .map_err(|e| anyhow::anyhow!("failed to generate random bytes: {}", e))?;
        Ok(Self(buff))
    }

    /// Create a secret from a byte slice
    ///
    /// # Errors
    ///
    /// Returns an error if the slice length is not exactly `SECRET_SIZE` bytes.
    pub fn from_slice(data: &[u8]) -> Result<Self, SecretError> {
        if data.len() != SECRET_SIZE {
            return Err(SecretError::InvalidSize {
                expected: SECRET_SIZE,
                actual: data.len(),
            });
        }
        let mut buff = [0; SECRET_SIZE];
        buff.copy_from_slice(data);
        Ok(buff.into())
    }

    /// Get a reference to the secret key bytes
    pub fn bytes(&self) -> &[u8] {
        self.0.as_ref()
    }

    /// Encrypt `data` under this secret, bound to `tag`
    pub fn encrypt(&self, tag: EncryptionTag, data: &[u8]) -> Result<Vec<u8>, CipherError> {
        cipher::encrypt(self.bytes(), data, tag)
    }

    /// Decrypt `data` under this secret, checking it was sealed under `tag`
    pub fn decrypt(&self, tag: EncryptionTag, data: &[u8]) -> Result<Vec<u8>, CipherError> {
        cipher::decrypt(self.bytes(), data, tag)
    }

    /// Derive the Ed25519 key a current-scheme vault attests its metadata with.
    ///
    /// Anyone holding the share secret can derive it, so it proves the signer
    /// was a member of the vault at the time of signing.
    pub fn attestation_key(&self) -> SecretKey {
        let mut seed = blake3::derive_key(ATTESTATION_KEY_CONTEXT, self.bytes());
        let key = SecretKey::from(seed);
        seed.zeroize();
        key
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_encrypt_decrypt() {
        let secret = Secret::generate().unwrap();
        let data = b"hello world";
        let encrypted = secret.encrypt(EncryptionTag::ItemContent, data).unwrap();
        let decrypted = secret
            .decrypt(EncryptionTag::ItemContent, &encrypted)
            .unwrap();
        assert_eq!(data, &decrypted[..]);
    }

    #[test]
    fn test_wrong_secret_fails() {
        let secret = Secret::generate().unwrap();
        let other = Secret::generate().unwrap();
        let encrypted = secret.encrypt(EncryptionTag::ItemKey, b"data").unwrap();
        assert!(other.decrypt(EncryptionTag::ItemKey, &encrypted).is_err());
    }

    #[test]
    fn test_from_slice_size() {
        assert!(Secret::from_slice(&[1u8; SECRET_SIZE]).is_ok());
        assert!(matches!(
            Secret::from_slice(&[1u8; 31]),
            Err(SecretError::InvalidSize {
                expected: 32,
                actual: 31
            })
        ));
    }

    #[test]
    fn test_debug_is_redacted() {
        let secret = Secret::from([0xab; SECRET_SIZE]);
        let debug = format!("{:?}", secret);
        assert!(debug.contains("REDACTED"));
        assert!(!debug.contains("171"));
        assert!(!debug.contains("ab"));
    }

    #[test]
    fn test_attestation_key_is_deterministic() {
        let secret = Secret::from([9u8; SECRET_SIZE]);
        let a = secret.attestation_key().public();
        let b = secret.attestation_key().public();
        assert_eq!(a, b);

        let other = Secret::from([10u8; SECRET_SIZE]);
        assert_ne!(a, other.attestation_key().public());
    }
}
