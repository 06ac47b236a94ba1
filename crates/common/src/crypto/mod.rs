//! Cryptographic primitives for SealVault
//!
//! - **Symmetric encryption**: ChaCha20-Poly1305 with an [`EncryptionTag`]
//!   bound in as associated data ([`cipher`], [`Secret`])
//! - **Identity & signing**: Ed25519 keypairs ([`SecretKey`]/[`PublicKey`])
//!   and the [`IdentityKey`] seam for the signed-in user
//! - **Key sealing**: ephemeral X25519 ECDH + AES-KW ([`SecretShare`]) for
//!   sending a symmetric key to the holder of an Ed25519 key
//! - **Commitments**: BLAKE3 [`Fingerprint`]s of keys, and the labelled
//!   messages every signature is made over ([`Attestation`])
//!
//! # Key Sealing Protocol
//!
//! To seal a secret for a recipient:
//! 1. Generate an ephemeral Ed25519 keypair
//! 2. Convert both keys to X25519 (Montgomery curve)
//! 3. Perform ECDH to derive a shared secret
//! 4. Use AES-KW to wrap the secret with the shared secret
//! 5. Package as `ephemeral_pubkey || wrapped_secret`
//!
//! The recipient reverses the steps with their own secret key.

mod attest;
pub mod cipher;
mod fingerprint;
mod identity;
mod keys;
mod secret;
mod secret_share;

pub use attest::Attestation;
pub use cipher::{CipherError, EncryptionTag};
pub use ed25519_dalek::Signature;
pub use fingerprint::{Fingerprint, FINGERPRINT_SIZE};
pub use identity::IdentityKey;
pub use keys::{signature_from_slice, KeyError, PublicKey, SecretKey, SIGNATURE_SIZE};
pub use secret::{Secret, SecretError, SECRET_SIZE};
pub use secret_share::{SecretShare, SecretShareError, SECRET_SHARE_SIZE};
