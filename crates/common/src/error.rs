//! Error taxonomy for the vault crypto core.
//!
//! Errors carry identifiers only (share id, rotation, tag, version). Plaintext
//! and key bytes never reach an error value.

use crate::crypto::{Attestation, CipherError, EncryptionTag, SecretShareError};
use crate::keystore::KeystoreError;
use crate::share::{Rotation, ShareId};
use crate::wire::EncodingError;

/// A needed key is not in the keyring the caller supplied
///
/// Not retryable without fresher key state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyResolutionError {
    #[error("share {share_id} has no active key")]
    NoActiveKey { share_id: ShareId },
    #[error("share {share_id} has no key for rotation {rotation}")]
    UnknownRotation { share_id: ShareId, rotation: Rotation },
    /// Content references a rotation the keyring no longer (or does not yet) hold
    #[error("key rotation {rotation} is not available for share {share_id}")]
    KeyRotationNotFound { share_id: ShareId, rotation: Rotation },
    #[error("item belongs to share {expected}, keyring is for share {actual}")]
    ShareMismatch { expected: ShareId, actual: ShareId },
}

/// Authentication failed somewhere. Signals possible tampering and is always
/// fatal for the operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CryptoIntegrityError {
    #[error("decryption failed for {tag} ciphertext")]
    DecryptionFailed { tag: EncryptionTag },
    #[error("signature invalid for {subject:?}")]
    SignatureInvalid { subject: Attestation },
}

/// A decrypted record could not be interpreted
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    #[error("unsupported content format version {version}")]
    UnsupportedContentVersion { version: u16 },
    #[error("malformed {record} record")]
    MalformedContent { record: &'static str },
}

/// A keyring could not be built from the supplied keys
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyringError {
    #[error("share {share_id} lists rotation {rotation} more than once")]
    DuplicateRotation { share_id: ShareId, rotation: Rotation },
    #[error("share {share_id} has more than one active key")]
    MultipleActiveKeys { share_id: ShareId },
}

/// Coarse classification for callers deciding how to surface a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    KeyResolution,
    Integrity,
    Schema,
    Keystore,
    Encoding,
    Internal,
}

#[derive(Debug, thiserror::Error)]
pub enum VaultCryptoError {
    #[error("key resolution error: {0}")]
    KeyResolution(#[from] KeyResolutionError),
    #[error("integrity error: {0}")]
    Integrity(#[from] CryptoIntegrityError),
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),
    #[error("keyring error: {0}")]
    Keyring(#[from] KeyringError),
    #[error("keystore error: {0}")]
    Keystore(#[from] KeystoreError),
    #[error("encoding error: {0}")]
    Encoding(#[from] EncodingError),
    #[error("invite is addressed to a different identity")]
    InviteRecipientMismatch,
    #[error("vault crypto error: {0}")]
    Default(#[from] anyhow::Error),
}

impl VaultCryptoError {
    pub fn class(&self) -> ErrorClass {
        match self {
            VaultCryptoError::KeyResolution(_) | VaultCryptoError::Keyring(_) => {
                ErrorClass::KeyResolution
            }
            VaultCryptoError::Integrity(_) => ErrorClass::Integrity,
            VaultCryptoError::Schema(_) => ErrorClass::Schema,
            VaultCryptoError::Keystore(_) => ErrorClass::Keystore,
            VaultCryptoError::Encoding(_) => ErrorClass::Encoding,
            VaultCryptoError::InviteRecipientMismatch | VaultCryptoError::Default(_) => {
                ErrorClass::Internal
            }
        }
    }

    pub(crate) fn signature_invalid(subject: Attestation) -> Self {
        CryptoIntegrityError::SignatureInvalid { subject }.into()
    }

    /// Map a failed [`SecretShare`](crate::crypto::SecretShare) unseal. A
    /// share that does not open is an integrity failure for `tag`.
    pub(crate) fn unsealing(tag: EncryptionTag) -> impl FnOnce(SecretShareError) -> Self {
        move |err| match err {
            SecretShareError::Unwrap
            | SecretShareError::InvalidSize { .. }
            | SecretShareError::Key(_) => CryptoIntegrityError::DecryptionFailed { tag }.into(),
            other => VaultCryptoError::Default(anyhow::Error::new(other)),
        }
    }
}

impl From<CipherError> for VaultCryptoError {
    fn from(err: CipherError) -> Self {
        match err {
            CipherError::Authentication(tag) => CryptoIntegrityError::DecryptionFailed { tag }.into(),
            other => VaultCryptoError::Default(anyhow::Error::new(other)),
        }
    }
}
