use std::sync::Arc;

use super::keystore::MemoryKeystore;
use crate::codec::VaultMetadata;
use crate::crypto::SecretKey;
use crate::item::ItemCryptoEngine;
use crate::migration::MigrationEngine;
use crate::share::{CryptoScheme, ShareKeyring};
use crate::vault::VaultProvisioningEngine;

/// One identity on one device, with every engine wired up
#[derive(Debug, Clone)]
pub struct TestUser {
    pub identity: Arc<SecretKey>,
    pub keystore: Arc<MemoryKeystore>,
    pub items: ItemCryptoEngine,
    pub vaults: VaultProvisioningEngine,
    pub migration: MigrationEngine,
}

impl TestUser {
    pub fn new() -> anyhow::Result<Self> {
        Self::with_identity(Arc::new(SecretKey::generate()?))
    }

    /// The same identity on a fresh device
    pub fn with_identity(identity: Arc<SecretKey>) -> anyhow::Result<Self> {
        Ok(Self::build(identity, Arc::new(MemoryKeystore::new()?)))
    }

    /// A fresh identity sharing `keystore`
    pub fn with_keystore(keystore: Arc<MemoryKeystore>) -> anyhow::Result<Self> {
        Ok(Self::build(Arc::new(SecretKey::generate()?), keystore))
    }

    fn build(identity: Arc<SecretKey>, keystore: Arc<MemoryKeystore>) -> Self {
        let items = ItemCryptoEngine::new(keystore.clone(), identity.clone());
        TestUser {
            vaults: VaultProvisioningEngine::new(keystore.clone(), identity.clone()),
            migration: MigrationEngine::new(items.clone()),
            items,
            identity,
            keystore,
        }
    }

    /// Keyring of a brand new vault, one active key at rotation 1
    pub fn keyring(&self, scheme: CryptoScheme) -> anyhow::Result<ShareKeyring> {
        let bundle = self
            .vaults
            .create_vault_with_scheme(scheme, &VaultMetadata::new("test", ""))?;
        Ok(bundle.keyring()?)
    }
}
