//! The two ways an item key can hang off a share.
//!
//! [`ShareKeyScheme`] wraps the item key with the symmetric share key.
//! [`LegacyVaultScheme`] seals it to the share's vault public key and adds
//! two detached signatures: the vault signing key over the item key, and the
//! author's identity over the content ciphertext.

use zeroize::Zeroizing;

use super::types::ItemSignatures;
use crate::crypto::{
    Attestation, CipherError, EncryptionTag, Fingerprint, IdentityKey, PublicKey, Secret, SecretShare,
};
use crate::error::{SchemaError, VaultCryptoError};
use crate::share::chain::verify_signature;
use crate::share::{CryptoScheme, UnlockedShareKey};
use crate::wire;

const ITEM_KEY: &str = "item key";

pub(crate) trait ItemKeyScheme: Send + Sync {
    fn wrap(&self, share_key: &UnlockedShareKey, item_key: &Secret) -> Result<Vec<u8>, VaultCryptoError>;

    fn unwrap(&self, share_key: &UnlockedShareKey, wrapped: &[u8]) -> Result<Secret, VaultCryptoError>;

    /// Detached signatures for freshly encrypted content, if the scheme uses them
    fn sign(
        &self,
        share_key: &UnlockedShareKey,
        item_key: &Secret,
        ciphertext: &[u8],
        author: &dyn IdentityKey,
    ) -> Result<Option<ItemSignatures>, VaultCryptoError>;

    /// Check the item key is vouched for. Runs before the key decrypts anything.
    fn verify_key(
        &self,
        share_key: &UnlockedShareKey,
        item_key: &Secret,
        signatures: Option<&ItemSignatures>,
    ) -> Result<(), VaultCryptoError>;

    /// Check the author signed this exact ciphertext
    fn verify_content(
        &self,
        item_key: &Secret,
        ciphertext: &[u8],
        signatures: Option<&ItemSignatures>,
    ) -> Result<(), VaultCryptoError>;
}

pub(crate) fn scheme_for(scheme: CryptoScheme) -> &'static dyn ItemKeyScheme {
    match scheme {
        CryptoScheme::ShareKey => &ShareKeyScheme,
        CryptoScheme::LegacyVaultKey => &LegacyVaultScheme,
    }
}

fn scheme_mismatch() -> VaultCryptoError {
    SchemaError::MalformedContent {
        record: "share key material",
    }
    .into()
}

fn item_key_from(bytes: &[u8]) -> Result<Secret, VaultCryptoError> {
    Secret::from_slice(bytes).map_err(|_| SchemaError::MalformedContent { record: ITEM_KEY }.into())
}

pub(crate) struct ShareKeyScheme;

impl ItemKeyScheme for ShareKeyScheme {
    fn wrap(&self, share_key: &UnlockedShareKey, item_key: &Secret) -> Result<Vec<u8>, VaultCryptoError> {
        match share_key {
            UnlockedShareKey::Symmetric { secret, .. } => {
                Ok(secret.encrypt(EncryptionTag::ItemKey, item_key.bytes())?)
            }
            UnlockedShareKey::Legacy { .. } => Err(scheme_mismatch()),
        }
    }

    fn unwrap(&self, share_key: &UnlockedShareKey, wrapped: &[u8]) -> Result<Secret, VaultCryptoError> {
        match share_key {
            UnlockedShareKey::Symmetric { secret, .. } => {
                let bytes = Zeroizing::new(secret.decrypt(EncryptionTag::ItemKey, wrapped)?);
                item_key_from(&bytes)
            }
            UnlockedShareKey::Legacy { .. } => Err(scheme_mismatch()),
        }
    }

    fn sign(
        &self,
        _share_key: &UnlockedShareKey,
        _item_key: &Secret,
        _ciphertext: &[u8],
        _author: &dyn IdentityKey,
    ) -> Result<Option<ItemSignatures>, VaultCryptoError> {
        Ok(None)
    }

    fn verify_key(
        &self,
        _share_key: &UnlockedShareKey,
        _item_key: &Secret,
        _signatures: Option<&ItemSignatures>,
    ) -> Result<(), VaultCryptoError> {
        Ok(())
    }

    fn verify_content(
        &self,
        _item_key: &Secret,
        _ciphertext: &[u8],
        _signatures: Option<&ItemSignatures>,
    ) -> Result<(), VaultCryptoError> {
        Ok(())
    }
}

pub(crate) struct LegacyVaultScheme;

impl LegacyVaultScheme {
    fn item_key_message(item_key: &Secret, author: &PublicKey) -> Vec<u8> {
        Attestation::ItemKey.message(&[
            Fingerprint::of_secret(item_key).as_bytes(),
            &author.to_bytes(),
        ])
    }

    fn content_message(ciphertext: &[u8]) -> Vec<u8> {
        Attestation::ItemContent.message(&[ciphertext])
    }

    fn seal_signature(item_key: &Secret, signature: &[u8]) -> Result<String, VaultCryptoError> {
        Ok(wire::encode(item_key.encrypt(EncryptionTag::Signature, signature)?))
    }

    /// Decrypt a sealed signature back to its base64 form for verification
    ///
    /// A sealed signature that does not open is a signature that does not
    /// verify for `subject`.
    fn open_signature(
        item_key: &Secret,
        sealed: &str,
        subject: Attestation,
    ) -> Result<String, VaultCryptoError> {
        let bytes = wire::decode(sealed, "signature")?;
        match item_key.decrypt(EncryptionTag::Signature, &bytes) {
            Ok(signature) => Ok(wire::encode(signature)),
            Err(CipherError::Authentication(_)) => Err(VaultCryptoError::signature_invalid(subject)),
            Err(other) => Err(other.into()),
        }
    }

    fn signatures(signatures: Option<&ItemSignatures>, subject: Attestation) -> Result<&ItemSignatures, VaultCryptoError> {
        signatures.ok_or_else(|| VaultCryptoError::signature_invalid(subject))
    }
}

impl ItemKeyScheme for LegacyVaultScheme {
    fn wrap(&self, share_key: &UnlockedShareKey, item_key: &Secret) -> Result<Vec<u8>, VaultCryptoError> {
        match share_key {
            UnlockedShareKey::Legacy { vault, .. } => {
                let share = SecretShare::new(item_key, &vault.public()).map_err(anyhow::Error::new)?;
                Ok(share.bytes().to_vec())
            }
            UnlockedShareKey::Symmetric { .. } => Err(scheme_mismatch()),
        }
    }

    fn unwrap(&self, share_key: &UnlockedShareKey, wrapped: &[u8]) -> Result<Secret, VaultCryptoError> {
        match share_key {
            UnlockedShareKey::Legacy { vault, .. } => {
                let share = SecretShare::try_from(wrapped)
                    .map_err(VaultCryptoError::unsealing(EncryptionTag::ItemKey))?;
                share
                    .recover(vault)
                    .map_err(VaultCryptoError::unsealing(EncryptionTag::ItemKey))
            }
            UnlockedShareKey::Symmetric { .. } => Err(scheme_mismatch()),
        }
    }

    fn sign(
        &self,
        share_key: &UnlockedShareKey,
        item_key: &Secret,
        ciphertext: &[u8],
        author: &dyn IdentityKey,
    ) -> Result<Option<ItemSignatures>, VaultCryptoError> {
        let UnlockedShareKey::Legacy { signing, .. } = share_key else {
            return Err(scheme_mismatch());
        };
        let author_public = author.public_key();
        let key_signature = signing.sign(&Self::item_key_message(item_key, &author_public));
        let content_signature = author.sign(&Self::content_message(ciphertext));

        Ok(Some(ItemSignatures {
            author: author_public,
            author_signature: Self::seal_signature(item_key, &content_signature.to_bytes())?,
            item_key_signature: Self::seal_signature(item_key, &key_signature.to_bytes())?,
        }))
    }

    fn verify_key(
        &self,
        share_key: &UnlockedShareKey,
        item_key: &Secret,
        signatures: Option<&ItemSignatures>,
    ) -> Result<(), VaultCryptoError> {
        let UnlockedShareKey::Legacy { signing, .. } = share_key else {
            return Err(scheme_mismatch());
        };
        let signatures = Self::signatures(signatures, Attestation::ItemKey)?;
        let signature = Self::open_signature(item_key, &signatures.item_key_signature, Attestation::ItemKey)?;
        verify_signature(
            &signing.public(),
            &Self::item_key_message(item_key, &signatures.author),
            &signature,
            Attestation::ItemKey,
        )
    }

    fn verify_content(
        &self,
        item_key: &Secret,
        ciphertext: &[u8],
        signatures: Option<&ItemSignatures>,
    ) -> Result<(), VaultCryptoError> {
        let signatures = Self::signatures(signatures, Attestation::ItemContent)?;
        let signature = Self::open_signature(
            item_key,
            &signatures.author_signature,
            Attestation::ItemContent,
        )?;
        verify_signature(
            &signatures.author,
            &Self::content_message(ciphertext),
            &signature,
            Attestation::ItemContent,
        )
    }
}
