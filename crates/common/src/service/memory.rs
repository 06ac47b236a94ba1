use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use super::provider::{check_publish, ShareKeyProvider, ShareKeyProviderError};
use crate::share::{ShareId, ShareKeyring};

/// In-memory share key provider
#[derive(Debug, Clone, Default)]
pub struct MemoryShareKeyProvider {
    inner: Arc<RwLock<HashMap<ShareId, ShareKeyring>>>,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MemoryShareKeyProviderError {
    #[error("memory provider error: {0}")]
    Internal(String),
}

impl MemoryShareKeyProvider {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> ShareKeyProviderError<MemoryShareKeyProviderError> {
    ShareKeyProviderError::Provider(MemoryShareKeyProviderError::Internal(format!(
        "failed to acquire lock: {}",
        e
    )))
}

#[async_trait]
impl ShareKeyProvider for MemoryShareKeyProvider {
    type Error = MemoryShareKeyProviderError;

    async fn exists(&self, share_id: ShareId) -> Result<bool, ShareKeyProviderError<Self::Error>> {
        let inner = self.inner.read().map_err(poisoned)?;
        Ok(inner.contains_key(&share_id))
    }

    async fn keyring(
        &self,
        share_id: ShareId,
    ) -> Result<ShareKeyring, ShareKeyProviderError<Self::Error>> {
        let inner = self.inner.read().map_err(poisoned)?;
        inner
            .get(&share_id)
            .cloned()
            .ok_or(ShareKeyProviderError::ShareNotFound(share_id))
    }

    async fn publish(
        &self,
        keyring: ShareKeyring,
    ) -> Result<(), ShareKeyProviderError<Self::Error>> {
        let mut inner = self.inner.write().map_err(poisoned)?;
        if let Some(current) = inner.get(&keyring.share_id()) {
            check_publish(current, &keyring).map_err(|(share_id, rotation)| {
                ShareKeyProviderError::Conflict { share_id, rotation }
            })?;
        }
        tracing::debug!(
            share_id = %keyring.share_id(),
            rotations = keyring.keys().len(),
            "published keyring"
        );
        inner.insert(keyring.share_id(), keyring);
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::share::{CryptoScheme, Rotation};
    use crate::testkit::TestUser;

    #[tokio::test]
    async fn test_publish_and_fetch() {
        let provider = MemoryShareKeyProvider::new();
        let user = TestUser::new().unwrap();
        let keyring = user.keyring(CryptoScheme::ShareKey).unwrap();

        assert!(!provider.exists(keyring.share_id()).await.unwrap());
        provider.publish(keyring.clone()).await.unwrap();
        assert!(provider.exists(keyring.share_id()).await.unwrap());
        assert_eq!(provider.keyring(keyring.share_id()).await.unwrap(), keyring);
        assert_eq!(
            provider.rotations(keyring.share_id()).await.unwrap(),
            vec![Rotation::FIRST]
        );
    }

    #[tokio::test]
    async fn test_missing_share() {
        let provider = MemoryShareKeyProvider::new();
        let share_id = ShareId::new();
        assert_eq!(
            provider.keyring(share_id).await.unwrap_err(),
            ShareKeyProviderError::ShareNotFound(share_id)
        );
    }

    #[tokio::test]
    async fn test_publish_cannot_drop_rotation() {
        let provider = MemoryShareKeyProvider::new();
        let user = TestUser::new().unwrap();
        let keyring = user.keyring(CryptoScheme::ShareKey).unwrap();
        let rotated = user.vaults.rotate(&keyring).unwrap().apply(&keyring).unwrap();
        provider.publish(rotated.clone()).await.unwrap();

        let err = provider
            .publish(rotated.without_rotation(Rotation::FIRST))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ShareKeyProviderError::Conflict {
                share_id: keyring.share_id(),
                rotation: Rotation::FIRST
            }
        );
        assert_eq!(provider.keyring(keyring.share_id()).await.unwrap(), rotated);
    }
}
