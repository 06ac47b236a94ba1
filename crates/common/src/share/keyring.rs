use crate::crypto::PublicKey;
use crate::error::{KeyResolutionError, KeyringError, VaultCryptoError};
use crate::keystore::PlatformKeystore;

use super::key::{CryptoScheme, Rotation, ShareId, ShareKey, UnlockedShareKey};

/// Read-only view over every key generation of one share
///
/// Keys are kept sorted by rotation. Construction rejects duplicate
/// rotations and more than one active key; a keyring with no active key is
/// allowed (it can still open old content) but cannot encrypt.
///
/// A keyring is a value: publishing a new rotation means building a new
/// keyring and swapping it in whole, never editing one in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareKeyring {
    share_id: ShareId,
    scheme: CryptoScheme,
    keys: Vec<ShareKey>,
}

impl ShareKeyring {
    pub fn new(
        share_id: ShareId,
        scheme: CryptoScheme,
        mut keys: Vec<ShareKey>,
    ) -> Result<Self, KeyringError> {
        keys.sort_by_key(|k| k.rotation);
        for pair in keys.windows(2) {
            if pair[0].rotation == pair[1].rotation {
                return Err(KeyringError::DuplicateRotation {
                    share_id,
                    rotation: pair[0].rotation,
                });
            }
        }
        if keys.iter().filter(|k| k.is_active).count() > 1 {
            return Err(KeyringError::MultipleActiveKeys { share_id });
        }
        Ok(ShareKeyring {
            share_id,
            scheme,
            keys,
        })
    }

    pub fn share_id(&self) -> ShareId {
        self.share_id
    }

    pub fn scheme(&self) -> CryptoScheme {
        self.scheme
    }

    pub fn keys(&self) -> &[ShareKey] {
        &self.keys
    }

    /// The key used for new encryptions
    pub fn active(&self) -> Result<&ShareKey, KeyResolutionError> {
        self.keys
            .iter()
            .find(|k| k.is_active)
            .ok_or(KeyResolutionError::NoActiveKey {
                share_id: self.share_id,
            })
    }

    pub fn by_rotation(&self, rotation: Rotation) -> Result<&ShareKey, KeyResolutionError> {
        self.keys
            .binary_search_by_key(&rotation, |k| k.rotation)
            .map(|idx| &self.keys[idx])
            .map_err(|_| KeyResolutionError::UnknownRotation {
                share_id: self.share_id,
                rotation,
            })
    }

    pub fn contains(&self, rotation: Rotation) -> bool {
        self.by_rotation(rotation).is_ok()
    }

    pub fn latest_rotation(&self) -> Option<Rotation> {
        self.keys.last().map(|k| k.rotation)
    }

    /// A keyring with every key except `rotation`
    pub fn without_rotation(&self, rotation: Rotation) -> Self {
        ShareKeyring {
            share_id: self.share_id,
            scheme: self.scheme,
            keys: self
                .keys
                .iter()
                .filter(|k| k.rotation != rotation)
                .cloned()
                .collect(),
        }
    }

    /// Unwrap the key for `rotation`, verifying it is rooted in `owner`
    /// before handing it out
    pub fn unlock(
        &self,
        rotation: Rotation,
        keystore: &dyn PlatformKeystore,
        owner: &PublicKey,
    ) -> Result<UnlockedShareKey, VaultCryptoError> {
        let key = self.by_rotation(rotation)?;
        key.verify_acceptance(&self.share_id, owner)?;
        key.unlock(self.scheme, keystore)
    }

    pub fn unlock_active(
        &self,
        keystore: &dyn PlatformKeystore,
        owner: &PublicKey,
    ) -> Result<UnlockedShareKey, VaultCryptoError> {
        let rotation = self.active()?.rotation;
        self.unlock(rotation, keystore, owner)
    }
}
