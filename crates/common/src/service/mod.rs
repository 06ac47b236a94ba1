//! Async boundary around the synchronous engines.
//!
//! The engines are CPU-bound and never suspend; [`VaultService`] runs them on
//! the blocking pool and fetches and publishes keyrings through a
//! [`ShareKeyProvider`].

mod memory;
mod provider;

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

pub use memory::{MemoryShareKeyProvider, MemoryShareKeyProviderError};
pub use provider::{ShareKeyProvider, ShareKeyProviderError};

use crate::codec::{ItemContent, VaultMetadata};
use crate::config::EngineConfig;
use crate::crypto::IdentityKey;
use crate::error::VaultCryptoError;
use crate::item::{Item, ItemCryptoEngine, ItemId};
use crate::keystore::PlatformKeystore;
use crate::migration::{MigratedItem, MigrationEngine};
use crate::share::ShareId;
use crate::vault::{
    EncryptedVaultMetadata, RotationBundle, VaultProvisioningBundle, VaultProvisioningEngine,
};

#[derive(thiserror::Error, Debug)]
pub enum ServiceError<E> {
    #[error("share key provider error: {0}")]
    Provider(#[from] ShareKeyProviderError<E>),
    #[error(transparent)]
    Crypto(#[from] VaultCryptoError),
    #[error("blocking task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

#[derive(Debug, Clone)]
pub struct VaultService<P: ShareKeyProvider> {
    provider: P,
    items: ItemCryptoEngine,
    vaults: VaultProvisioningEngine,
    migration: MigrationEngine,
    migration_concurrency: usize,
}

impl<P: ShareKeyProvider> VaultService<P> {
    pub fn new(
        provider: P,
        keystore: Arc<dyn PlatformKeystore>,
        identity: Arc<dyn IdentityKey>,
        config: &EngineConfig,
    ) -> Self {
        let items = ItemCryptoEngine::new(keystore.clone(), identity.clone());
        VaultService {
            provider,
            vaults: VaultProvisioningEngine::with_config(keystore, identity, config),
            migration: MigrationEngine::with_config(items.clone(), config),
            items,
            migration_concurrency: config.migration_concurrency.max(1),
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Provision a vault and publish its first keyring
    pub async fn create_vault(
        &self,
        metadata: VaultMetadata,
    ) -> Result<VaultProvisioningBundle, ServiceError<P::Error>> {
        let vaults = self.vaults.clone();
        let bundle =
            tokio::task::spawn_blocking(move || vaults.create_vault(&metadata)).await??;
        let keyring = bundle.keyring().map_err(VaultCryptoError::from)?;
        self.provider.publish(keyring).await?;
        Ok(bundle)
    }

    pub async fn open_vault(
        &self,
        share_id: ShareId,
        metadata: EncryptedVaultMetadata,
    ) -> Result<VaultMetadata, ServiceError<P::Error>> {
        let keyring = self.provider.keyring(share_id).await?;
        let vaults = self.vaults.clone();
        Ok(tokio::task::spawn_blocking(move || vaults.open_vault(&keyring, &metadata)).await??)
    }

    /// Mint the next rotation and publish it in one step
    pub async fn rotate(&self, share_id: ShareId) -> Result<RotationBundle, ServiceError<P::Error>> {
        let keyring = self.provider.keyring(share_id).await?;
        let vaults = self.vaults.clone();
        let (bundle, rotated) = tokio::task::spawn_blocking(move || {
            let bundle = vaults.rotate(&keyring)?;
            let rotated = bundle.apply(&keyring)?;
            Ok::<_, VaultCryptoError>((bundle, rotated))
        })
        .await??;
        self.provider.publish(rotated).await?;
        Ok(bundle)
    }

    pub async fn create_item(
        &self,
        share_id: ShareId,
        content: ItemContent,
    ) -> Result<Item, ServiceError<P::Error>> {
        let keyring = self.provider.keyring(share_id).await?;
        let items = self.items.clone();
        Ok(tokio::task::spawn_blocking(move || items.create_item(&keyring, &content)).await??)
    }

    pub async fn open_item(&self, item: Item) -> Result<ItemContent, ServiceError<P::Error>> {
        let keyring = self.provider.keyring(item.share_id).await?;
        let items = self.items.clone();
        Ok(tokio::task::spawn_blocking(move || items.open(&item, &keyring)).await??)
    }

    /// Callers serialize updates per item
    pub async fn update_item(
        &self,
        item: Item,
        content: ItemContent,
    ) -> Result<Item, ServiceError<P::Error>> {
        let keyring = self.provider.keyring(item.share_id).await?;
        let items = self.items.clone();
        Ok(tokio::task::spawn_blocking(move || items.update(&item, &keyring, &content)).await??)
    }

    pub async fn migrate_item(
        &self,
        item: Item,
        destination: ShareId,
    ) -> Result<MigratedItem, ServiceError<P::Error>> {
        let source = self.provider.keyring(item.share_id).await?;
        let destination = self.provider.keyring(destination).await?;
        let migration = self.migration.clone();
        Ok(
            tokio::task::spawn_blocking(move || migration.migrate(&item, &source, &destination))
                .await??,
        )
    }

    /// Migrate many items into `destination`, at most
    ///  `migration_concurrency` at a time
    ///
    /// Results come back in input order. Dropping the returned future
    ///  abandons whatever has not finished; nothing needs undoing since
    ///  nothing is committed until the caller persists the results.
    pub async fn migrate_items(
        &self,
        items: Vec<Item>,
        destination: ShareId,
    ) -> Result<Vec<(ItemId, Result<MigratedItem, ServiceError<P::Error>>)>, ServiceError<P::Error>>
    {
        let destination = self.provider.keyring(destination).await?;
        let semaphore = Arc::new(Semaphore::new(self.migration_concurrency));
        let mut tasks = JoinSet::new();
        let mut results: Vec<(ItemId, Option<Result<MigratedItem, ServiceError<P::Error>>>)> =
            items.iter().map(|item| (item.id, None)).collect();

        for (index, item) in items.into_iter().enumerate() {
            let source = match self.provider.keyring(item.share_id).await {
                Ok(source) => source,
                Err(e) => {
                    results[index].1 = Some(Err(e.into()));
                    continue;
                }
            };
            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(anyhow::Error::new)
                .map_err(VaultCryptoError::from)?;
            let migration = self.migration.clone();
            let destination = destination.clone();
            tasks.spawn_blocking(move || {
                let _permit = permit;
                (index, migration.migrate(&item, &source, &destination))
            });
        }

        while let Some(joined) = tasks.join_next().await {
            let (index, migrated) = joined?;
            results[index].1 = Some(migrated.map_err(ServiceError::from));
        }

        tracing::info!(
            destination = %destination.share_id(),
            items = results.len(),
            "migrated items"
        );
        Ok(results
            .into_iter()
            .filter_map(|(id, result)| result.map(|result| (id, result)))
            .collect())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::testkit::TestUser;

    fn service(user: &TestUser) -> VaultService<MemoryShareKeyProvider> {
        VaultService::new(
            MemoryShareKeyProvider::new(),
            user.keystore.clone(),
            user.identity.clone(),
            &EngineConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_item_lifecycle() {
        let user = TestUser::new().unwrap();
        let service = service(&user);
        let bundle = service
            .create_vault(VaultMetadata::new("Personal", ""))
            .await
            .unwrap();
        assert_eq!(
            service
                .open_vault(bundle.share_id, bundle.metadata.clone())
                .await
                .unwrap(),
            VaultMetadata::new("Personal", "")
        );

        let item = service
            .create_item(bundle.share_id, ItemContent::note("T", "N"))
            .await
            .unwrap();
        let item = service
            .update_item(item, ItemContent::note("T", "N2"))
            .await
            .unwrap();
        assert_eq!(
            service.open_item(item).await.unwrap(),
            ItemContent::note("T", "N2")
        );
    }

    #[tokio::test]
    async fn test_rotate_publishes() {
        let user = TestUser::new().unwrap();
        let service = service(&user);
        let bundle = service
            .create_vault(VaultMetadata::new("Personal", ""))
            .await
            .unwrap();
        let item = service
            .create_item(bundle.share_id, ItemContent::note("T", "N"))
            .await
            .unwrap();

        let rotation = service.rotate(bundle.share_id).await.unwrap();
        let keyring = service.provider().keyring(bundle.share_id).await.unwrap();
        assert_eq!(keyring.active().unwrap().rotation, rotation.share_key.rotation);
        assert_eq!(
            service.open_item(item).await.unwrap(),
            ItemContent::note("T", "N")
        );
    }

    #[tokio::test]
    async fn test_unknown_share() {
        let user = TestUser::new().unwrap();
        let service = service(&user);
        let err = service
            .create_item(ShareId::new(), ItemContent::note("T", "N"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Provider(ShareKeyProviderError::ShareNotFound(_))
        ));
    }
}
