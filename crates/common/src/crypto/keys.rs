use std::fmt;

use curve25519_dalek::edwards::CompressedEdwardsY;
use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};
use serde::{Deserialize, Serialize};
use x25519_dalek::{PublicKey as X25519PublicKey, StaticSecret};
use zeroize::Zeroize;

/// Size of Ed25519 private key in bytes
pub const PRIVATE_KEY_SIZE: usize = 32;
/// Size of Ed25519 public key in bytes
pub const PUBLIC_KEY_SIZE: usize = 32;
/// Size of an Ed25519 signature in bytes
pub const SIGNATURE_SIZE: usize = 64;

/// Errors that can occur during key operations
#[derive(Debug, thiserror::Error)]
pub enum KeyError {
    #[error("key error: {0}")]
    Default(#[from] anyhow::Error),
}

/// Ed25519 public key for identities, vault signing keys and legacy vault keys
///
/// Serialized as lowercase hex so records stay readable in JSON and TOML.
///
/// # Examples
///
/// ```ignore
/// let secret_key = SecretKey::generate()?;
/// let public_key = secret_key.public();
///
/// let hex = public_key.to_hex();
/// let recovered = PublicKey::from_hex(&hex)?;
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PublicKey(VerifyingKey);

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PublicKey").field(&self.to_hex()).finish()
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl TryFrom<&[u8]> for PublicKey {
    type Error = KeyError;
    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        if bytes.len() != PUBLIC_KEY_SIZE {
            return Err(anyhow::anyhow!(
                "invalid public key size, expected {}, got {}",
                PUBLIC_KEY_SIZE,
                bytes.len()
            )
            .into());
        }
        let mut buff = [0; PUBLIC_KEY_SIZE];
        buff.copy_from_slice(bytes);
        let key = VerifyingKey::from_bytes(&buff)
            .map_err(|_| anyhow::anyhow!("public key is not a valid edwards point"))?;
        Ok(PublicKey(key))
    }
}

impl TryFrom<String> for PublicKey {
    type Error = KeyError;
    fn try_from(hex: String) -> Result<Self, Self::Error> {
        PublicKey::from_hex(&hex)
    }
}

impl From<PublicKey> for String {
    fn from(key: PublicKey) -> Self {
        key.to_hex()
    }
}

impl PublicKey {
    /// Parse a public key from a hexadecimal string
    ///
    /// Accepts both plain hex and "0x"-prefixed hex strings.
    pub fn from_hex(hex: &str) -> Result<Self, KeyError> {
        let hex = hex.strip_prefix("0x").unwrap_or(hex);
        let mut buff = [0; PUBLIC_KEY_SIZE];
        hex::decode_to_slice(hex, &mut buff)
            .map_err(|_| anyhow::anyhow!("public key hex decode error"))?;
        PublicKey::try_from(&buff[..])
    }

    /// Convert public key to raw bytes
    pub fn to_bytes(&self) -> [u8; PUBLIC_KEY_SIZE] {
        self.0.to_bytes()
    }

    /// Convert public key to hexadecimal string
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    /// Convert Ed25519 public key to X25519 (Montgomery curve) for ECDH
    ///
    /// # Errors
    ///
    /// Returns an error if the Ed25519 point cannot be converted (invalid point).
    #[allow(clippy::wrong_self_convention)]
    pub(crate) fn to_x25519(&self) -> Result<X25519PublicKey, KeyError> {
        let edwards_bytes = self.to_bytes();
        let edwards_point = CompressedEdwardsY::from_slice(&edwards_bytes)
            .map_err(|_| anyhow::anyhow!("public key invalid edwards point"))?
            .decompress()
            .ok_or_else(|| anyhow::anyhow!("public key failed to decompress edwards point"))?;

        let montgomery_point = edwards_point.to_montgomery();
        Ok(X25519PublicKey::from(montgomery_point.to_bytes()))
    }

    /// Verify an Ed25519 signature on a message.
    ///
    /// Uses strict verification, rejecting malleable and small-order signatures.
    pub fn verify(&self, msg: &[u8], signature: &Signature) -> Result<(), ed25519_dalek::SignatureError> {
        self.0.verify_strict(msg, signature)
    }
}

/// Ed25519 secret key
///
/// Used for the user's identity, for legacy vault signing and vault keys, and
/// for the attestation key derived from a current-scheme share secret. Wiped
/// on drop; `Debug` only prints the public half.
#[derive(Clone)]
pub struct SecretKey(SigningKey);

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretKey")
            .field("public", &self.public())
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

impl From<[u8; PRIVATE_KEY_SIZE]> for SecretKey {
    fn from(secret: [u8; PRIVATE_KEY_SIZE]) -> Self {
        Self(SigningKey::from_bytes(&secret))
    }
}

impl SecretKey {
    /// Parse a secret key from a hexadecimal string
    ///
    /// Accepts both plain hex and "0x"-prefixed hex strings.
    pub fn from_hex(hex: &str) -> Result<Self, KeyError> {
        let hex = hex.strip_prefix("0x").unwrap_or(hex);
        let mut buff = [0; PRIVATE_KEY_SIZE];
        hex::decode_to_slice(hex, &mut buff)
            .map_err(|_| anyhow::anyhow!("private key hex decode error"))?;
        let key = Self::from(buff);
        buff.zeroize();
        Ok(key)
    }

    /// Build a secret key from a byte slice of exactly `PRIVATE_KEY_SIZE` bytes
    pub fn from_slice(bytes: &[u8]) -> Result<Self, KeyError> {
        if bytes.len() != PRIVATE_KEY_SIZE {
            return Err(anyhow::anyhow!(
                "invalid private key size, expected {}, got {}",
                PRIVATE_KEY_SIZE,
                bytes.len()
            )
            .into());
        }
        let mut buff = [0; PRIVATE_KEY_SIZE];
        buff.copy_from_slice(bytes);
        let key = Self::from(buff);
        buff.zeroize();
        Ok(key)
    }

    /// Generate a new random secret key using a cryptographically secure RNG
    pub fn generate() -> Result<Self, KeyError> {
        let mut bytes = [0u8; PRIVATE_KEY_SIZE];
        getrandom::getrandom(&mut bytes)
            .map_err(|e| anyhow::anyhow!("failed to generate random bytes: {}", e))?;
        let key = Self::from(bytes);
        bytes.zeroize();
        Ok(key)
    }

    /// Derive the public key from this secret key
    pub fn public(&self) -> PublicKey {
        PublicKey(self.0.verifying_key())
    }

    /// Convert secret key to raw bytes
    pub fn to_bytes(&self) -> [u8; PRIVATE_KEY_SIZE] {
        self.0.to_bytes()
    }

    /// Convert secret key to hexadecimal string
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    /// Convert Ed25519 secret key to X25519 (Montgomery curve) for ECDH
    ///
    /// The scalar bytes of the Ed25519 key are directly used as the X25519 private key.
    pub(crate) fn to_x25519(&self) -> StaticSecret {
        let mut scalar_bytes = self.0.to_scalar_bytes();
        let secret = StaticSecret::from(scalar_bytes);
        scalar_bytes.zeroize();
        secret
    }

    /// Sign a message with this secret key using Ed25519.
    pub fn sign(&self, msg: &[u8]) -> Signature {
        self.0.sign(msg)
    }
}

/// Parse a detached signature from raw bytes
pub fn signature_from_slice(bytes: &[u8]) -> Result<Signature, KeyError> {
    Signature::from_slice(bytes).map_err(|_| {
        anyhow::anyhow!(
            "invalid signature size, expected {}, got {}",
            SIGNATURE_SIZE,
            bytes.len()
        )
        .into()
    })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_keypair_generation() {
        let private_key = SecretKey::generate().unwrap();
        let public_key = private_key.public();

        let private_hex = private_key.to_hex();
        let recovered_private = SecretKey::from_hex(&private_hex).unwrap();
        assert_eq!(private_key.to_bytes(), recovered_private.to_bytes());

        let public_hex = public_key.to_hex();
        let recovered_public = PublicKey::from_hex(&public_hex).unwrap();
        assert_eq!(public_key, recovered_public);
    }

    #[test]
    fn test_public_key_serde_is_hex() {
        let public_key = SecretKey::generate().unwrap().public();
        let json = serde_json::to_string(&public_key).unwrap();
        assert_eq!(json, format!("\"{}\"", public_key.to_hex()));
        let recovered: PublicKey = serde_json::from_str(&json).unwrap();
        assert_eq!(public_key, recovered);
    }

    #[test]
    fn test_sign_and_verify() {
        let secret_key = SecretKey::generate().unwrap();
        let public_key = secret_key.public();
        let message = b"hello, world!";

        let signature = secret_key.sign(message);
        assert!(public_key.verify(message, &signature).is_ok());

        // Verify fails with wrong message
        let wrong_message = b"hello, world?";
        assert!(public_key.verify(wrong_message, &signature).is_err());

        // Verify fails with wrong key
        let other_key = SecretKey::generate().unwrap().public();
        assert!(other_key.verify(message, &signature).is_err());
    }

    #[test]
    fn test_signature_from_slice() {
        let secret_key = SecretKey::generate().unwrap();
        let signature = secret_key.sign(b"msg");
        let parsed = signature_from_slice(&signature.to_bytes()).unwrap();
        assert_eq!(signature, parsed);
        assert!(signature_from_slice(&[0u8; 12]).is_err());
    }

    #[test]
    fn test_debug_hides_secret() {
        let secret_key = SecretKey::from([5u8; PRIVATE_KEY_SIZE]);
        let debug = format!("{:?}", secret_key);
        assert!(debug.contains("REDACTED"));
        assert!(!debug.contains(&hex::encode([5u8; PRIVATE_KEY_SIZE])));
    }
}
