use std::fmt::{Debug, Display};

use async_trait::async_trait;

use crate::share::{Rotation, ShareId, ShareKeyring};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ShareKeyProviderError<T> {
    #[error("unhandled share key provider error: {0}")]
    Provider(#[from] T),
    #[error("share {0} not found")]
    ShareNotFound(ShareId),
    /// A publish would drop a rotation the provider still holds, or
    ///  would reuse one with different key material
    #[error("publish conflicts with rotation {rotation} of share {share_id}")]
    Conflict { share_id: ShareId, rotation: Rotation },
}

/// Where keyrings come from and where new key generations go
///
/// Implementations must make `publish` atomic: a reader sees either the old
///  keyring or the new one, never a mix.
#[async_trait]
pub trait ShareKeyProvider: Send + Sync + Debug + Clone + 'static {
    type Error: Display + Debug + Send;

    async fn exists(&self, share_id: ShareId) -> Result<bool, ShareKeyProviderError<Self::Error>>;

    /// Get the full keyring for a share
    ///
    /// # Returns
    /// * `Ok(ShareKeyring)` - Every published rotation, retired ones included
    /// * `Err(ShareKeyProviderError::ShareNotFound)` - Nothing was ever published for `share_id`
    async fn keyring(
        &self,
        share_id: ShareId,
    ) -> Result<ShareKeyring, ShareKeyProviderError<Self::Error>>;

    /// Replace the stored keyring for a share
    ///
    /// Should fail with `ShareKeyProviderError::Conflict` if `keyring` is
    ///  missing a rotation that is currently stored, or changes the
    ///  fingerprint of one.
    async fn publish(&self, keyring: ShareKeyring)
        -> Result<(), ShareKeyProviderError<Self::Error>>;

    /// Rotations currently published for a share, oldest first
    async fn rotations(
        &self,
        share_id: ShareId,
    ) -> Result<Vec<Rotation>, ShareKeyProviderError<Self::Error>> {
        let keyring = self.keyring(share_id).await?;
        Ok(keyring.keys().iter().map(|key| key.rotation).collect())
    }
}

/// Check `next` can replace `current` without losing or altering a key
pub(crate) fn check_publish(
    current: &ShareKeyring,
    next: &ShareKeyring,
) -> Result<(), (ShareId, Rotation)> {
    for key in current.keys() {
        match next.by_rotation(key.rotation) {
            Ok(replacement) if replacement.fingerprint == key.fingerprint => {}
            _ => return Err((current.share_id(), key.rotation)),
        }
    }
    Ok(())
}
