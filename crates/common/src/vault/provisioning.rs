use std::sync::Arc;

use zeroize::Zeroizing;

use super::types::{EncryptedVaultMetadata, RotationBundle, ShareKeyResponse, VaultProvisioningBundle};
use crate::codec::{VaultMetadata, VersionedRecord};
use crate::config::EngineConfig;
use crate::crypto::{Attestation, EncryptionTag, IdentityKey, Secret, SecretShare};
use crate::error::{KeyResolutionError, SchemaError, VaultCryptoError};
use crate::keystore::PlatformKeystore;
use crate::share::chain::verify_signature;
use crate::share::{
    CryptoScheme, Rotation, ShareId, ShareKey, ShareKeyring, UnlockedShareKey,
};
use crate::wire;

/// Mints vault key hierarchies and checks them on the way back in
///
/// Everything produced here is rooted in the engine's identity through an
/// acceptance signature, and everything read back is verified against it
/// before any key is used. A broken link makes the vault unreadable.
#[derive(Clone)]
pub struct VaultProvisioningEngine {
    pub(super) keystore: Arc<dyn PlatformKeystore>,
    pub(super) identity: Arc<dyn IdentityKey>,
    default_scheme: CryptoScheme,
}

impl std::fmt::Debug for VaultProvisioningEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultProvisioningEngine")
            .field("identity", &self.identity.public_key())
            .field("default_scheme", &self.default_scheme)
            .finish_non_exhaustive()
    }
}

impl VaultProvisioningEngine {
    pub fn new(keystore: Arc<dyn PlatformKeystore>, identity: Arc<dyn IdentityKey>) -> Self {
        Self::with_config(keystore, identity, &EngineConfig::default())
    }

    pub fn with_config(
        keystore: Arc<dyn PlatformKeystore>,
        identity: Arc<dyn IdentityKey>,
        config: &EngineConfig,
    ) -> Self {
        VaultProvisioningEngine {
            keystore,
            identity,
            default_scheme: config.default_scheme,
        }
    }

    /// Create a vault under the configured default scheme
    pub fn create_vault(
        &self,
        metadata: &VaultMetadata,
    ) -> Result<VaultProvisioningBundle, VaultCryptoError> {
        self.create_vault_with_scheme(self.default_scheme, metadata)
    }

    pub fn create_vault_with_scheme(
        &self,
        scheme: CryptoScheme,
        metadata: &VaultMetadata,
    ) -> Result<VaultProvisioningBundle, VaultCryptoError> {
        let share_id = ShareId::new();
        let key = UnlockedShareKey::generate(scheme, Rotation::FIRST)?;
        let share_key = ShareKey::seal(
            &share_id,
            &key,
            self.identity.as_ref(),
            self.keystore.as_ref(),
            true,
        )?;
        let metadata = self.seal_metadata(&share_id, &key, metadata)?;

        tracing::info!(share_id = %share_id, scheme = ?scheme, "provisioned vault");
        Ok(VaultProvisioningBundle {
            share_id,
            scheme,
            owner: self.identity.public_key(),
            share_key,
            metadata,
        })
    }

    /// Verify and decrypt vault metadata
    ///
    /// The share key must chain to this identity, and both metadata
    /// signatures must hold, before anything is decrypted.
    pub fn open_vault(
        &self,
        keyring: &ShareKeyring,
        encrypted: &EncryptedVaultMetadata,
    ) -> Result<VaultMetadata, VaultCryptoError> {
        let key = self.resolve(keyring, encrypted.key_rotation)?;
        let ciphertext = wire::decode(&encrypted.ciphertext, "ciphertext")?;
        let message = metadata_message(&keyring.share_id(), encrypted, &ciphertext);

        verify_signature(
            &key.attestation_key().public(),
            &message,
            &encrypted.vault_signature,
            Attestation::VaultMetadata,
        )?;
        verify_signature(
            &encrypted.author,
            &message,
            &encrypted.author_signature,
            Attestation::VaultMetadata,
        )?;

        let plaintext = match &key {
            UnlockedShareKey::Symmetric { secret, .. } => {
                Zeroizing::new(secret.decrypt(EncryptionTag::VaultMetadata, &ciphertext)?)
            }
            UnlockedShareKey::Legacy { vault, .. } => {
                let wrapped = encrypted.wrapped_key.as_deref().ok_or(
                    SchemaError::MalformedContent {
                        record: VaultMetadata::RECORD,
                    },
                )?;
                let metadata_key = SecretShare::from_base64(wrapped)
                    .and_then(|share| share.recover(vault))
                    .map_err(VaultCryptoError::unsealing(EncryptionTag::VaultMetadata))?;
                Zeroizing::new(metadata_key.decrypt(EncryptionTag::VaultMetadata, &ciphertext)?)
            }
        };
        Ok(VaultMetadata::decode(&plaintext, encrypted.format_version)?)
    }

    /// Re-encrypt and re-sign metadata under the active key
    pub fn update_metadata(
        &self,
        keyring: &ShareKeyring,
        metadata: &VaultMetadata,
    ) -> Result<EncryptedVaultMetadata, VaultCryptoError> {
        let key = keyring.unlock_active(self.keystore.as_ref(), &self.identity.public_key())?;
        let encrypted = self.seal_metadata(&keyring.share_id(), &key, metadata)?;
        tracing::debug!(
            share_id = %keyring.share_id(),
            rotation = %encrypted.key_rotation,
            "updated vault metadata"
        );
        Ok(encrypted)
    }

    /// Mint the next key generation
    ///
    /// The returned bundle holds the new active key; the previous active key
    /// is reported as retired. Apply it with [`RotationBundle::apply`] and
    /// publish the result in one step.
    pub fn rotate(&self, keyring: &ShareKeyring) -> Result<RotationBundle, VaultCryptoError> {
        let rotation = match keyring.latest_rotation() {
            Some(latest) => latest
                .next()
                .ok_or_else(|| anyhow::anyhow!("rotation counter exhausted"))?,
            None => Rotation::FIRST,
        };
        let retired = keyring.active().ok().map(|key| key.rotation);

        let key = UnlockedShareKey::generate(keyring.scheme(), rotation)?;
        let share_key = ShareKey::seal(
            &keyring.share_id(),
            &key,
            self.identity.as_ref(),
            self.keystore.as_ref(),
            true,
        )?;

        tracing::info!(
            share_id = %keyring.share_id(),
            rotation = %rotation,
            retired = ?retired.map(|r| r.get()),
            "minted share key rotation"
        );
        Ok(RotationBundle {
            share_id: keyring.share_id(),
            share_key,
            retired,
        })
    }

    /// Bring a server-held share key onto this device
    ///
    /// Verifies the acceptance chain, opens the response key with the
    /// identity, checks it against the signed fingerprint and wraps it with
    /// the local keystore.
    pub fn import_share_key(
        &self,
        share_id: &ShareId,
        scheme: CryptoScheme,
        response: &ShareKeyResponse,
    ) -> Result<ShareKey, VaultCryptoError> {
        let candidate = ShareKey {
            rotation: response.rotation,
            wrapped_key_material: String::new(),
            response_key: response.response_key.clone(),
            create_time: response.create_time,
            is_active: response.is_active,
            fingerprint: response.fingerprint,
            acceptance_signature: response.acceptance_signature.clone(),
            chain: response.chain.clone(),
        };
        candidate.verify_acceptance(share_id, &self.identity.public_key())?;

        let key = UnlockedShareKey::from_sealed(
            scheme,
            response.rotation,
            &response.response_key,
            self.identity.as_ref(),
        )?;
        if key.fingerprint() != response.fingerprint {
            return Err(VaultCryptoError::signature_invalid(Attestation::Acceptance));
        }
        key.check_chain(response.chain.as_ref())?;

        let wrapped = self.keystore.wrap(&key.material())?;
        tracing::debug!(share_id = %share_id, rotation = %response.rotation, "imported share key");
        Ok(ShareKey {
            wrapped_key_material: wire::encode(wrapped),
            ..candidate
        })
    }

    fn resolve(
        &self,
        keyring: &ShareKeyring,
        rotation: Rotation,
    ) -> Result<UnlockedShareKey, VaultCryptoError> {
        keyring
            .unlock(rotation, self.keystore.as_ref(), &self.identity.public_key())
            .map_err(|err| {
                tracing::warn!(
                    share_id = %keyring.share_id(),
                    rotation = %rotation,
                    class = ?err.class(),
                    "vault key did not verify"
                );
                match err {
                    VaultCryptoError::KeyResolution(KeyResolutionError::UnknownRotation {
                        share_id,
                        rotation,
                    }) => KeyResolutionError::KeyRotationNotFound { share_id, rotation }.into(),
                    other => other,
                }
            })
    }

    fn seal_metadata(
        &self,
        share_id: &ShareId,
        key: &UnlockedShareKey,
        metadata: &VaultMetadata,
    ) -> Result<EncryptedVaultMetadata, VaultCryptoError> {
        let encoded = metadata.encode()?;
        let (ciphertext, wrapped_key) = match key {
            UnlockedShareKey::Symmetric { secret, .. } => {
                (secret.encrypt(EncryptionTag::VaultMetadata, &encoded)?, None)
            }
            UnlockedShareKey::Legacy { vault, .. } => {
                let metadata_key = Secret::generate().map_err(anyhow::Error::new)?;
                let share =
                    SecretShare::new(&metadata_key, &vault.public()).map_err(anyhow::Error::new)?;
                (
                    metadata_key.encrypt(EncryptionTag::VaultMetadata, &encoded)?,
                    Some(share.to_base64()),
                )
            }
        };

        let mut encrypted = EncryptedVaultMetadata {
            ciphertext: wire::encode(&ciphertext),
            key_rotation: key.rotation(),
            format_version: VaultMetadata::CURRENT_VERSION,
            wrapped_key,
            author: self.identity.public_key(),
            author_signature: String::new(),
            vault_signature: String::new(),
        };
        let message = metadata_message(share_id, &encrypted, &ciphertext);
        encrypted.author_signature = wire::encode(self.identity.sign(&message).to_bytes());
        encrypted.vault_signature = wire::encode(key.attestation_key().sign(&message).to_bytes());
        Ok(encrypted)
    }
}

/// Both metadata signatures cover the share, rotation, layout version,
/// author, ciphertext and (legacy) wrapped metadata key
fn metadata_message(share_id: &ShareId, encrypted: &EncryptedVaultMetadata, ciphertext: &[u8]) -> Vec<u8> {
    Attestation::VaultMetadata.message(&[
        share_id.as_bytes(),
        &encrypted.key_rotation.get().to_be_bytes(),
        &encrypted.format_version.to_be_bytes(),
        &encrypted.author.to_bytes(),
        ciphertext,
        encrypted.wrapped_key.as_deref().unwrap_or_default().as_bytes(),
    ])
}
