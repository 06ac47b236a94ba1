use std::sync::Arc;

use zeroize::Zeroizing;

use super::scheme::scheme_for;
use super::types::{EncryptedItemContent, EncryptedItemKey, Item, ItemId, ItemRevision};
use crate::codec::{ItemContent, VersionedRecord};
use crate::crypto::{EncryptionTag, IdentityKey, PublicKey, Secret};
use crate::error::{KeyResolutionError, SchemaError, VaultCryptoError};
use crate::keystore::PlatformKeystore;
use crate::share::{Rotation, ShareKeyring, UnlockedShareKey};
use crate::wire;

/// Creates, opens and updates items for the signed-in identity
///
/// Holds no mutable state: every call works only on what it is given, so one
/// engine can serve any number of threads. Callers serialize `update` per
/// item.
#[derive(Clone)]
pub struct ItemCryptoEngine {
    keystore: Arc<dyn PlatformKeystore>,
    identity: Arc<dyn IdentityKey>,
}

impl std::fmt::Debug for ItemCryptoEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ItemCryptoEngine")
            .field("identity", &self.identity.public_key())
            .finish_non_exhaustive()
    }
}

impl ItemCryptoEngine {
    pub fn new(keystore: Arc<dyn PlatformKeystore>, identity: Arc<dyn IdentityKey>) -> Self {
        ItemCryptoEngine { keystore, identity }
    }

    pub fn identity(&self) -> PublicKey {
        self.identity.public_key()
    }

    /// Encrypt new content under the keyring's active key
    ///
    /// Either both halves come back or neither does.
    pub fn create(
        &self,
        keyring: &ShareKeyring,
        plaintext: &ItemContent,
    ) -> Result<(EncryptedItemContent, EncryptedItemKey), VaultCryptoError> {
        let encoded = plaintext.encode()?;
        self.seal(keyring, &encoded, ItemContent::CURRENT_VERSION)
    }

    /// [`ItemCryptoEngine::create`], packaged as a first-revision [`Item`]
    pub fn create_item(
        &self,
        keyring: &ShareKeyring,
        plaintext: &ItemContent,
    ) -> Result<Item, VaultCryptoError> {
        let (content, item_key) = self.create(keyring, plaintext)?;
        let item = Item::new(ItemId::new(), keyring.share_id(), content, item_key);
        tracing::debug!(
            item_id = %item.id,
            share_id = %item.share_id,
            rotation = %item.content.key_rotation,
            kind = plaintext.kind(),
            "created item"
        );
        Ok(item)
    }

    /// Decrypt the live revision of `item`
    pub fn open(&self, item: &Item, keyring: &ShareKeyring) -> Result<ItemContent, VaultCryptoError> {
        check_share(item, keyring)?;
        self.open_content(&item.content, &item.item_key, keyring)
    }

    /// Decrypt a history entry of `item`
    pub fn open_revision(
        &self,
        item: &Item,
        revision: &ItemRevision,
        keyring: &ShareKeyring,
    ) -> Result<ItemContent, VaultCryptoError> {
        check_share(item, keyring)?;
        self.open_content(&revision.content, &revision.item_key, keyring)
    }

    pub fn open_content(
        &self,
        content: &EncryptedItemContent,
        item_key: &EncryptedItemKey,
        keyring: &ShareKeyring,
    ) -> Result<ItemContent, VaultCryptoError> {
        let plaintext = self.decrypt(content, item_key, keyring)?;
        Ok(ItemContent::decode(&plaintext, content.content_format_version)?)
    }

    /// Re-encrypt `item` with new content under its existing item key
    ///
    /// The prior revision moves to history untouched; history is never
    /// decrypted here.
    pub fn update(
        &self,
        item: &Item,
        keyring: &ShareKeyring,
        plaintext: &ItemContent,
    ) -> Result<Item, VaultCryptoError> {
        check_share(item, keyring)?;
        let rotation = check_rotation(&item.content, &item.item_key)?;
        let share_key = self.resolve(keyring, rotation)?;
        let scheme = scheme_for(keyring.scheme());

        let wrapped = wire::decode(&item.item_key.key, "item_key")?;
        let item_key = scheme.unwrap(&share_key, &wrapped)?;
        scheme.verify_key(&share_key, &item_key, item.content.signatures.as_ref())?;

        let encoded = plaintext.encode()?;
        let ciphertext = item_key.encrypt(EncryptionTag::ItemContent, &encoded)?;
        let signatures = scheme.sign(&share_key, &item_key, &ciphertext, self.identity.as_ref())?;

        let mut history = item.history.clone();
        history.push(ItemRevision {
            revision: item.revision,
            content: item.content.clone(),
            item_key: item.item_key.clone(),
        });
        let updated = Item {
            id: item.id,
            share_id: item.share_id,
            content: EncryptedItemContent {
                ciphertext: wire::encode(ciphertext),
                key_rotation: rotation,
                content_format_version: ItemContent::CURRENT_VERSION,
                signatures,
            },
            item_key: item.item_key.clone(),
            revision: item.revision + 1,
            history,
        };
        tracing::debug!(
            item_id = %updated.id,
            revision = updated.revision,
            "updated item"
        );
        Ok(updated)
    }

    /// Decrypt to the serialized record without interpreting it
    pub(crate) fn decrypt(
        &self,
        content: &EncryptedItemContent,
        item_key: &EncryptedItemKey,
        keyring: &ShareKeyring,
    ) -> Result<Zeroizing<Vec<u8>>, VaultCryptoError> {
        let rotation = check_rotation(content, item_key)?;
        let share_key = self.resolve(keyring, rotation)?;
        let scheme = scheme_for(keyring.scheme());

        let wrapped = wire::decode(&item_key.key, "item_key")?;
        let key = scheme.unwrap(&share_key, &wrapped)?;
        scheme.verify_key(&share_key, &key, content.signatures.as_ref())?;

        let ciphertext = wire::decode(&content.ciphertext, "ciphertext")?;
        let plaintext = Zeroizing::new(
            key.decrypt(EncryptionTag::ItemContent, &ciphertext)
                .map_err(|err| {
                    tracing::warn!(
                        share_id = %keyring.share_id(),
                        rotation = %rotation,
                        "item content failed authentication"
                    );
                    err
                })?,
        );
        scheme.verify_content(&key, &ciphertext, content.signatures.as_ref())?;
        Ok(plaintext)
    }

    /// Encrypt an already serialized record under a fresh item key wrapped
    /// with the keyring's active key. `version` is recorded as given.
    pub(crate) fn seal(
        &self,
        keyring: &ShareKeyring,
        encoded: &[u8],
        version: u16,
    ) -> Result<(EncryptedItemContent, EncryptedItemKey), VaultCryptoError> {
        let share_key = keyring.unlock_active(self.keystore.as_ref(), &self.identity.public_key())?;
        let scheme = scheme_for(keyring.scheme());
        let rotation = share_key.rotation();

        let item_key = Secret::generate().map_err(anyhow::Error::new)?;
        let ciphertext = item_key.encrypt(EncryptionTag::ItemContent, encoded)?;
        let wrapped = scheme.wrap(&share_key, &item_key)?;
        let signatures = scheme.sign(&share_key, &item_key, &ciphertext, self.identity.as_ref())?;

        Ok((
            EncryptedItemContent {
                ciphertext: wire::encode(ciphertext),
                key_rotation: rotation,
                content_format_version: version,
                signatures,
            },
            EncryptedItemKey {
                key: wire::encode(wrapped),
                key_rotation: rotation,
            },
        ))
    }

    /// Unlock the share key for `rotation`. A rotation the keyring does not
    /// hold is reported as unavailable to the content that needs it.
    fn resolve(
        &self,
        keyring: &ShareKeyring,
        rotation: Rotation,
    ) -> Result<UnlockedShareKey, VaultCryptoError> {
        keyring
            .unlock(rotation, self.keystore.as_ref(), &self.identity.public_key())
            .map_err(|err| match err {
                VaultCryptoError::KeyResolution(KeyResolutionError::UnknownRotation {
                    share_id,
                    rotation,
                }) => KeyResolutionError::KeyRotationNotFound { share_id, rotation }.into(),
                other => other,
            })
    }
}

fn check_share(item: &Item, keyring: &ShareKeyring) -> Result<(), KeyResolutionError> {
    if item.share_id != keyring.share_id() {
        return Err(KeyResolutionError::ShareMismatch {
            expected: item.share_id,
            actual: keyring.share_id(),
        });
    }
    Ok(())
}

fn check_rotation(
    content: &EncryptedItemContent,
    item_key: &EncryptedItemKey,
) -> Result<Rotation, SchemaError> {
    if content.key_rotation != item_key.key_rotation {
        return Err(SchemaError::MalformedContent { record: "item" });
    }
    Ok(content.key_rotation)
}
