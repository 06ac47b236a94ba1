use serde::{Deserialize, Serialize};

use crate::crypto::{Fingerprint, PublicKey};
use crate::error::KeyringError;
use crate::share::{CryptoScheme, LegacyKeyChain, Rotation, ShareId, ShareKey, ShareKeyring};

/// Vault metadata encrypted under a share key and signed twice: by the
/// author's identity and by the vault's own attestation key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedVaultMetadata {
    /// `nonce || ciphertext || tag`, base64
    pub ciphertext: String,
    pub key_rotation: Rotation,
    pub format_version: u16,
    /// Legacy shares only: the metadata key sealed to the vault key
    pub wrapped_key: Option<String>,
    pub author: PublicKey,
    pub author_signature: String,
    pub vault_signature: String,
}

/// Everything a new vault needs persisted: its first key generation and its
/// encrypted metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultProvisioningBundle {
    pub share_id: ShareId,
    pub scheme: CryptoScheme,
    pub owner: PublicKey,
    pub share_key: ShareKey,
    pub metadata: EncryptedVaultMetadata,
}

impl VaultProvisioningBundle {
    pub fn keyring(&self) -> Result<ShareKeyring, KeyringError> {
        ShareKeyring::new(self.share_id, self.scheme, vec![self.share_key.clone()])
    }
}

/// A freshly minted key generation. Nothing changes until the caller
/// publishes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RotationBundle {
    pub share_id: ShareId,
    pub share_key: ShareKey,
    /// The generation that was active before this one
    pub retired: Option<Rotation>,
}

impl RotationBundle {
    /// The keyring to publish: every old key kept but retired, plus the new one
    pub fn apply(&self, keyring: &ShareKeyring) -> Result<ShareKeyring, KeyringError> {
        let mut keys: Vec<ShareKey> = keyring.keys().iter().map(ShareKey::retired).collect();
        keys.push(self.share_key.clone());
        ShareKeyring::new(keyring.share_id(), keyring.scheme(), keys)
    }
}

/// The server-side form of a share key: sealed to the owner's identity
/// instead of wrapped by a device keystore
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareKeyResponse {
    pub rotation: Rotation,
    pub response_key: String,
    pub create_time: i64,
    pub is_active: bool,
    pub fingerprint: Fingerprint,
    pub acceptance_signature: String,
    pub chain: Option<LegacyKeyChain>,
}

impl From<&ShareKey> for ShareKeyResponse {
    fn from(key: &ShareKey) -> Self {
        ShareKeyResponse {
            rotation: key.rotation,
            response_key: key.response_key.clone(),
            create_time: key.create_time,
            is_active: key.is_active,
            fingerprint: key.fingerprint,
            acceptance_signature: key.acceptance_signature.clone(),
            chain: key.chain.clone(),
        }
    }
}
