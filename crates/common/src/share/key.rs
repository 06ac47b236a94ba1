use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use zeroize::Zeroizing;

use super::chain::{acceptance_message, verify_signature, LegacyKeyChain};
use crate::crypto::{
    Attestation, EncryptionTag, Fingerprint, IdentityKey, PublicKey, Secret, SecretKey,
    SecretShare, SECRET_SHARE_SIZE, SECRET_SIZE,
};
use crate::error::{SchemaError, VaultCryptoError};
use crate::keystore::{unwrap_zeroizing, PlatformKeystore};
use crate::wire;

const SHARE_KEY_MATERIAL: &str = "share key material";

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShareId(Uuid);

impl ShareId {
    pub fn new() -> Self {
        ShareId(Uuid::new_v4())
    }

    pub fn from_uuid(id: Uuid) -> Self {
        ShareId(id)
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }
}

impl Default for ShareId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ShareId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ShareId({})", self.0)
    }
}

impl fmt::Display for ShareId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Generation of a share key. Monotonic within a share, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Rotation(u64);

impl Rotation {
    pub const FIRST: Rotation = Rotation(1);

    pub const fn new(rotation: u64) -> Self {
        Rotation(rotation)
    }

    pub const fn get(&self) -> u64 {
        self.0
    }

    pub fn next(&self) -> Option<Rotation> {
        self.0.checked_add(1).map(Rotation)
    }
}

impl fmt::Display for Rotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Which key hierarchy a share uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CryptoScheme {
    /// Rotating symmetric share keys wrap item keys directly
    #[default]
    ShareKey,
    /// A signing + vault key pair per share; item keys are sealed to the
    /// vault key and carry detached signatures
    LegacyVaultKey,
}

/// One generation of a share's key as held by this device
///
/// `wrapped_key_material` is the key wrapped by the platform keystore.
/// `response_key` is the same key sealed to the owner's identity; it is the
/// representation the server stores and hands back to new devices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareKey {
    pub rotation: Rotation,
    pub wrapped_key_material: String,
    pub response_key: String,
    pub create_time: i64,
    pub is_active: bool,
    pub fingerprint: Fingerprint,
    /// Owner identity over the fingerprint, base64
    pub acceptance_signature: String,
    /// Present exactly for legacy shares
    pub chain: Option<LegacyKeyChain>,
}

impl ShareKey {
    /// Seal `key` for storage: wrap it with the keystore, seal it to the
    /// owner's identity and sign its fingerprint.
    pub(crate) fn seal(
        share_id: &ShareId,
        key: &UnlockedShareKey,
        identity: &dyn IdentityKey,
        keystore: &dyn PlatformKeystore,
        is_active: bool,
    ) -> Result<Self, VaultCryptoError> {
        let material = key.material();
        let wrapped = keystore.wrap(&material)?;
        let fingerprint = key.fingerprint();
        let signature = identity.sign(&acceptance_message(share_id, key.rotation(), &fingerprint));

        Ok(ShareKey {
            rotation: key.rotation(),
            wrapped_key_material: wire::encode(wrapped),
            response_key: key.seal_to(&identity.public_key())?,
            create_time: time::OffsetDateTime::now_utc().unix_timestamp(),
            is_active,
            fingerprint,
            acceptance_signature: wire::encode(signature.to_bytes()),
            chain: key.chain(),
        })
    }

    /// Unwrap the key material with the keystore
    ///
    /// Checks the material against the stored fingerprint, but not the
    /// acceptance signature. [`ShareKeyring::unlock`](super::ShareKeyring::unlock)
    /// does both.
    pub fn unlock(
        &self,
        scheme: CryptoScheme,
        keystore: &dyn PlatformKeystore,
    ) -> Result<UnlockedShareKey, VaultCryptoError> {
        let wrapped = wire::decode(&self.wrapped_key_material, "wrapped_key_material")?;
        let material = unwrap_zeroizing(keystore, &wrapped)?;
        let key = UnlockedShareKey::from_material(scheme, self.rotation, &material)?;

        if key.fingerprint() != self.fingerprint {
            return Err(VaultCryptoError::signature_invalid(Attestation::Acceptance));
        }
        key.check_chain(self.chain.as_ref())?;
        Ok(key)
    }

    /// Run `f` with the unwrapped key; the key is wiped when `f` returns
    pub fn with_unlocked<T>(
        &self,
        scheme: CryptoScheme,
        keystore: &dyn PlatformKeystore,
        f: impl FnOnce(&UnlockedShareKey) -> Result<T, VaultCryptoError>,
    ) -> Result<T, VaultCryptoError> {
        let key = self.unlock(scheme, keystore)?;
        f(&key)
    }

    /// Check the acceptance signature (and for legacy shares the rest of the
    /// chain) roots this key in `owner`.
    pub fn verify_acceptance(
        &self,
        share_id: &ShareId,
        owner: &PublicKey,
    ) -> Result<(), VaultCryptoError> {
        if let Some(chain) = &self.chain {
            if chain.signing_fingerprint() != self.fingerprint {
                return Err(VaultCryptoError::signature_invalid(Attestation::Acceptance));
            }
        }
        verify_signature(
            owner,
            &acceptance_message(share_id, self.rotation, &self.fingerprint),
            &self.acceptance_signature,
            Attestation::Acceptance,
        )?;
        if let Some(chain) = &self.chain {
            chain.verify()?;
        }
        Ok(())
    }

    /// A copy of this key marked inactive
    pub fn retired(&self) -> Self {
        ShareKey {
            is_active: false,
            ..self.clone()
        }
    }
}

/// Share key material in the clear. Wiped when dropped.
pub enum UnlockedShareKey {
    Symmetric {
        rotation: Rotation,
        secret: Secret,
    },
    Legacy {
        rotation: Rotation,
        signing: SecretKey,
        vault: SecretKey,
    },
}

impl fmt::Debug for UnlockedShareKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnlockedShareKey::Symmetric { rotation, .. } => f
                .debug_struct("Symmetric")
                .field("rotation", rotation)
                .field("secret", &"[REDACTED]")
                .finish(),
            UnlockedShareKey::Legacy {
                rotation,
                signing,
                vault,
            } => f
                .debug_struct("Legacy")
                .field("rotation", rotation)
                .field("signing", &signing.public())
                .field("vault", &vault.public())
                .finish(),
        }
    }
}

impl UnlockedShareKey {
    pub fn generate(scheme: CryptoScheme, rotation: Rotation) -> Result<Self, VaultCryptoError> {
        Ok(match scheme {
            CryptoScheme::ShareKey => UnlockedShareKey::Symmetric {
                rotation,
                secret: Secret::generate().map_err(anyhow::Error::new)?,
            },
            CryptoScheme::LegacyVaultKey => UnlockedShareKey::Legacy {
                rotation,
                signing: SecretKey::generate().map_err(anyhow::Error::new)?,
                vault: SecretKey::generate().map_err(anyhow::Error::new)?,
            },
        })
    }

    pub fn rotation(&self) -> Rotation {
        match self {
            UnlockedShareKey::Symmetric { rotation, .. } => *rotation,
            UnlockedShareKey::Legacy { rotation, .. } => *rotation,
        }
    }

    pub fn scheme(&self) -> CryptoScheme {
        match self {
            UnlockedShareKey::Symmetric { .. } => CryptoScheme::ShareKey,
            UnlockedShareKey::Legacy { .. } => CryptoScheme::LegacyVaultKey,
        }
    }

    /// Commitment covered by the acceptance signature
    pub fn fingerprint(&self) -> Fingerprint {
        match self {
            UnlockedShareKey::Symmetric { secret, .. } => Fingerprint::of_secret(secret),
            UnlockedShareKey::Legacy { signing, .. } => {
                Fingerprint::of_public_key(&signing.public())
            }
        }
    }

    /// Check this material is what `chain` describes. Symmetric keys have
    /// no chain; legacy keys must have one naming the same vault key.
    pub(crate) fn check_chain(&self, chain: Option<&LegacyKeyChain>) -> Result<(), VaultCryptoError> {
        match (self, chain) {
            (UnlockedShareKey::Symmetric { .. }, None) => Ok(()),
            (UnlockedShareKey::Legacy { vault, .. }, Some(chain)) => {
                if vault.public() != chain.vault_public {
                    return Err(VaultCryptoError::signature_invalid(Attestation::VaultKey));
                }
                Ok(())
            }
            _ => Err(SchemaError::MalformedContent {
                record: SHARE_KEY_MATERIAL,
            }
            .into()),
        }
    }

    /// Key that co-signs vault metadata alongside the author's identity
    pub(crate) fn attestation_key(&self) -> SecretKey {
        match self {
            UnlockedShareKey::Symmetric { secret, .. } => secret.attestation_key(),
            UnlockedShareKey::Legacy { signing, .. } => signing.clone(),
        }
    }

    pub(crate) fn chain(&self) -> Option<LegacyKeyChain> {
        match self {
            UnlockedShareKey::Symmetric { .. } => None,
            UnlockedShareKey::Legacy { signing, vault, .. } => {
                Some(LegacyKeyChain::new(signing, vault.public()))
            }
        }
    }

    /// Raw bytes handed to the keystore: the secret, or signing || vault
    pub(crate) fn material(&self) -> Zeroizing<Vec<u8>> {
        let mut out = Zeroizing::new(Vec::with_capacity(2 * SECRET_SIZE));
        match self {
            UnlockedShareKey::Symmetric { secret, .. } => out.extend_from_slice(secret.bytes()),
            UnlockedShareKey::Legacy { signing, vault, .. } => {
                out.extend_from_slice(&Zeroizing::new(signing.to_bytes())[..]);
                out.extend_from_slice(&Zeroizing::new(vault.to_bytes())[..]);
            }
        }
        out
    }

    pub(crate) fn from_material(
        scheme: CryptoScheme,
        rotation: Rotation,
        material: &[u8],
    ) -> Result<Self, VaultCryptoError> {
        let malformed = || SchemaError::MalformedContent {
            record: SHARE_KEY_MATERIAL,
        };
        match (scheme, material.len()) {
            (CryptoScheme::ShareKey, SECRET_SIZE) => Ok(UnlockedShareKey::Symmetric {
                rotation,
                secret: Secret::from_slice(material).map_err(|_| malformed())?,
            }),
            (CryptoScheme::LegacyVaultKey, len) if len == 2 * SECRET_SIZE => {
                Ok(UnlockedShareKey::Legacy {
                    rotation,
                    signing: SecretKey::from_slice(&material[..SECRET_SIZE])
                        .map_err(|_| malformed())?,
                    vault: SecretKey::from_slice(&material[SECRET_SIZE..])
                        .map_err(|_| malformed())?,
                })
            }
            _ => Err(malformed().into()),
        }
    }

    /// Seal the material to `recipient`, one [`SecretShare`] per 32-byte
    /// secret, concatenated and base64 encoded
    pub(crate) fn seal_to(&self, recipient: &PublicKey) -> Result<String, VaultCryptoError> {
        let material = self.material();
        let mut sealed = Vec::with_capacity(2 * SECRET_SHARE_SIZE);
        for chunk in material.chunks(SECRET_SIZE) {
            let secret = Secret::from_slice(chunk).map_err(anyhow::Error::new)?;
            let share = SecretShare::new(&secret, recipient).map_err(anyhow::Error::new)?;
            sealed.extend_from_slice(share.bytes());
        }
        Ok(wire::encode(sealed))
    }

    /// Open material produced by [`UnlockedShareKey::seal_to`]
    pub(crate) fn from_sealed(
        scheme: CryptoScheme,
        rotation: Rotation,
        sealed: &str,
        identity: &dyn IdentityKey,
    ) -> Result<Self, VaultCryptoError> {
        let bytes = wire::decode(sealed, "response_key")?;
        if bytes.is_empty() || bytes.len() % SECRET_SHARE_SIZE != 0 {
            return Err(SchemaError::MalformedContent {
                record: SHARE_KEY_MATERIAL,
            }
            .into());
        }
        let mut material = Zeroizing::new(Vec::with_capacity(2 * SECRET_SIZE));
        for chunk in bytes.chunks(SECRET_SHARE_SIZE) {
            let share = SecretShare::try_from(chunk)
                .map_err(VaultCryptoError::unsealing(EncryptionTag::ItemKey))?;
            let secret = identity
                .recover(&share)
                .map_err(VaultCryptoError::unsealing(EncryptionTag::ItemKey))?;
            material.extend_from_slice(secret.bytes());
        }
        Self::from_material(scheme, rotation, &material)
    }
}
