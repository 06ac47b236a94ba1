/**
 * Versioned binary records for plaintext
 *  item content and vault metadata.
 */
pub mod codec;
/**
 * Engine configuration, loaded from TOML.
 */
pub mod config;
/**
 * Cryptographic types and operations.
 *  - Symmetric secrets and the tagged AEAD
 *  - Public and Private identity keys
 *  - Key-to-key key sharing
 *  - Fingerprints and attestation messages
 */
pub mod crypto;
/**
 * Error taxonomy shared by every engine.
 */
pub mod error;
/**
 * Per-item keys: create, open and update
 *  encrypted items under a share's keyring.
 */
pub mod item;
/**
 * The seam to the platform's device keystore.
 */
pub mod keystore;
/**
 * Re-homing items (and their history)
 *  from one share to another.
 */
pub mod migration;
/**
 * Thin async wrapper over the engines,
 *  plus the share key provider it reads
 *  keyrings from.
 */
pub mod service;
/**
 * Share keys, their rotations, and the
 *  keyring that resolves them.
 */
pub mod share;
/**
 * In-memory keystore and wired-up test
 *  identities.
 */
pub mod testkit;
/**
 * Vault provisioning, rotation, invites
 *  and metadata.
 */
pub mod vault;
/**
 * Base64 helpers for everything that
 *  crosses the wire.
 */
pub mod wire;

pub mod prelude {
    pub use crate::codec::{ItemContent, ItemPayload, VaultMetadata};
    pub use crate::config::EngineConfig;
    pub use crate::crypto::{IdentityKey, PublicKey, SecretKey};
    pub use crate::error::{ErrorClass, VaultCryptoError};
    pub use crate::item::{Item, ItemCryptoEngine};
    pub use crate::keystore::PlatformKeystore;
    pub use crate::migration::{MigrationEngine, MigrationOutcome};
    pub use crate::share::{CryptoScheme, Rotation, ShareId, ShareKeyring};
    pub use crate::vault::VaultProvisioningEngine;
}
