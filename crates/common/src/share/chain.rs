//! Authenticity chain for share keys.
//!
//! Every share key carries an acceptance signature: the owning identity
//! signing the key's fingerprint, bound to the share and rotation. Legacy
//! shares extend the chain one more link, with the vault signing key
//! vouching for the vault (encryption) key.
//!
//! ```text
//! identity ──acceptance──▶ signing key ──vault key signature──▶ vault key
//!                                      └──item key signature──▶ item key
//! ```

use serde::{Deserialize, Serialize};

use super::key::{Rotation, ShareId};
use crate::crypto::{signature_from_slice, Attestation, Fingerprint, PublicKey, SecretKey, Signature};
use crate::error::VaultCryptoError;
use crate::wire;

/// Public half of a legacy share's key pair, with the link between them
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyKeyChain {
    pub signing_public: PublicKey,
    pub vault_public: PublicKey,
    /// Signing key over the vault key fingerprint, base64
    pub vault_key_signature: String,
}

impl LegacyKeyChain {
    pub fn new(signing: &SecretKey, vault_public: PublicKey) -> Self {
        let message = vault_key_message(&vault_public);
        LegacyKeyChain {
            signing_public: signing.public(),
            vault_public,
            vault_key_signature: wire::encode(signing.sign(&message).to_bytes()),
        }
    }

    /// The fingerprint a legacy share key's acceptance signature covers
    pub fn signing_fingerprint(&self) -> Fingerprint {
        Fingerprint::of_public_key(&self.signing_public)
    }

    /// Check the signing key vouches for the vault key
    pub fn verify(&self) -> Result<(), VaultCryptoError> {
        let signature = decode_signature(&self.vault_key_signature, Attestation::VaultKey)?;
        self.signing_public
            .verify(&vault_key_message(&self.vault_public), &signature)
            .map_err(|_| VaultCryptoError::signature_invalid(Attestation::VaultKey))
    }
}

fn vault_key_message(vault_public: &PublicKey) -> Vec<u8> {
    Attestation::VaultKey.message(&[Fingerprint::of_public_key(vault_public).as_bytes()])
}

pub(crate) fn acceptance_message(
    share_id: &ShareId,
    rotation: Rotation,
    fingerprint: &Fingerprint,
) -> Vec<u8> {
    Attestation::Acceptance.message(&[
        share_id.as_bytes(),
        &rotation.get().to_be_bytes(),
        fingerprint.as_bytes(),
    ])
}

pub(crate) fn inviter_acceptance_message(
    share_id: &ShareId,
    rotation: Rotation,
    fingerprint: &Fingerprint,
    invitee: &PublicKey,
) -> Vec<u8> {
    Attestation::InviterAcceptance.message(&[
        share_id.as_bytes(),
        &rotation.get().to_be_bytes(),
        fingerprint.as_bytes(),
        &invitee.to_bytes(),
    ])
}

/// Decode a base64 signature. A field that is not a signature at all fails
/// the same way a bad signature does.
pub(crate) fn decode_signature(
    encoded: &str,
    subject: Attestation,
) -> Result<Signature, VaultCryptoError> {
    let bytes = wire::decode(encoded, "signature")?;
    signature_from_slice(&bytes).map_err(|_| VaultCryptoError::signature_invalid(subject))
}

/// Verify `encoded` is `signer`'s signature over `message`
pub(crate) fn verify_signature(
    signer: &PublicKey,
    message: &[u8],
    encoded: &str,
    subject: Attestation,
) -> Result<(), VaultCryptoError> {
    let signature = decode_signature(encoded, subject)?;
    signer
        .verify(message, &signature)
        .map_err(|_| VaultCryptoError::signature_invalid(subject))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::error::CryptoIntegrityError;

    #[test]
    fn test_chain_verifies() {
        let signing = SecretKey::generate().unwrap();
        let vault = SecretKey::generate().unwrap();
        let chain = LegacyKeyChain::new(&signing, vault.public());
        chain.verify().unwrap();
    }

    #[test]
    fn test_swapped_vault_key_fails() {
        let signing = SecretKey::generate().unwrap();
        let vault = SecretKey::generate().unwrap();
        let mut chain = LegacyKeyChain::new(&signing, vault.public());
        chain.vault_public = SecretKey::generate().unwrap().public();

        let err = chain.verify().unwrap_err();
        assert!(matches!(
            err,
            VaultCryptoError::Integrity(CryptoIntegrityError::SignatureInvalid {
                subject: Attestation::VaultKey
            })
        ));
    }

    #[test]
    fn test_swapped_signing_key_fails() {
        let signing = SecretKey::generate().unwrap();
        let vault = SecretKey::generate().unwrap();
        let mut chain = LegacyKeyChain::new(&signing, vault.public());
        chain.signing_public = SecretKey::generate().unwrap().public();
        assert!(chain.verify().is_err());
    }

    #[test]
    fn test_acceptance_is_bound_to_share_and_rotation() {
        let fp = Fingerprint::of_public_key(&SecretKey::generate().unwrap().public());
        let share_a = ShareId::new();
        let share_b = ShareId::new();
        assert_ne!(
            acceptance_message(&share_a, Rotation::new(1), &fp),
            acceptance_message(&share_b, Rotation::new(1), &fp)
        );
        assert_ne!(
            acceptance_message(&share_a, Rotation::new(1), &fp),
            acceptance_message(&share_a, Rotation::new(2), &fp)
        );
    }

    #[test]
    fn test_garbage_signature_is_invalid() {
        let key = SecretKey::generate().unwrap();
        let result = verify_signature(
            &key.public(),
            b"msg",
            &wire::encode([1u8; 10]),
            Attestation::Acceptance,
        );
        assert!(matches!(
            result,
            Err(VaultCryptoError::Integrity(
                CryptoIntegrityError::SignatureInvalid { .. }
            ))
        ));
    }
}
