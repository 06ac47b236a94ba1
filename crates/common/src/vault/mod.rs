//! Vault key hierarchies: creating a vault, rotating its share key, sharing
//! it with another identity and reading or writing its metadata.

mod invite;
mod provisioning;
mod types;

pub use invite::{AcceptedInvite, InviteKey, VaultInvite};
pub use provisioning::VaultProvisioningEngine;
pub use types::{EncryptedVaultMetadata, RotationBundle, ShareKeyResponse, VaultProvisioningBundle};
