use serde::{Deserialize, Serialize};

use super::provisioning::VaultProvisioningEngine;
use crate::crypto::{Attestation, Fingerprint, PublicKey};
use crate::error::{KeyringError, VaultCryptoError};
use crate::share::chain::{inviter_acceptance_message, verify_signature};
use crate::share::{CryptoScheme, LegacyKeyChain, Rotation, ShareId, ShareKey, ShareKeyring, UnlockedShareKey};

/// One key generation re-encrypted for an invitee
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InviteKey {
    pub rotation: Rotation,
    /// The key material sealed to the invitee's identity, base64
    pub sealed_key: String,
    pub fingerprint: Fingerprint,
    pub is_active: bool,
    pub create_time: i64,
    /// Inviter identity over (share, rotation, fingerprint, invitee), base64
    pub inviter_signature: String,
    pub chain: Option<LegacyKeyChain>,
}

/// Every key generation of a share, readable only by `invitee`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultInvite {
    pub share_id: ShareId,
    pub scheme: CryptoScheme,
    pub inviter: PublicKey,
    pub invitee: PublicKey,
    pub keys: Vec<InviteKey>,
}

/// The invitee's side of an accepted invite: share keys rooted in the
/// invitee's own identity and wrapped by the invitee's keystore
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptedInvite {
    pub share_id: ShareId,
    pub scheme: CryptoScheme,
    pub inviter: PublicKey,
    pub keys: Vec<ShareKey>,
}

impl AcceptedInvite {
    pub fn keyring(&self) -> Result<ShareKeyring, KeyringError> {
        ShareKeyring::new(self.share_id, self.scheme, self.keys.clone())
    }
}

impl VaultProvisioningEngine {
    /// Re-encrypt every generation in `keyring` to `invitee`
    ///
    /// Each key is verified against this identity before it is shared.
    pub fn create_invite(
        &self,
        keyring: &ShareKeyring,
        invitee: &PublicKey,
    ) -> Result<VaultInvite, VaultCryptoError> {
        let share_id = keyring.share_id();
        let inviter = self.identity.public_key();

        let keys = keyring
            .keys()
            .iter()
            .map(|share_key| {
                let key = keyring.unlock(share_key.rotation, self.keystore.as_ref(), &inviter)?;
                let signature = self.identity.sign(&inviter_acceptance_message(
                    &share_id,
                    share_key.rotation,
                    &share_key.fingerprint,
                    invitee,
                ));
                Ok(InviteKey {
                    rotation: share_key.rotation,
                    sealed_key: key.seal_to(invitee)?,
                    fingerprint: share_key.fingerprint,
                    is_active: share_key.is_active,
                    create_time: share_key.create_time,
                    inviter_signature: crate::wire::encode(signature.to_bytes()),
                    chain: share_key.chain.clone(),
                })
            })
            .collect::<Result<Vec<_>, VaultCryptoError>>()?;

        tracing::info!(
            share_id = %share_id,
            invitee = %invitee,
            keys = keys.len(),
            "created vault invite"
        );
        Ok(VaultInvite {
            share_id,
            scheme: keyring.scheme(),
            inviter,
            invitee: *invitee,
            keys,
        })
    }

    /// Take ownership of the keys in an invite addressed to this identity
    ///
    /// Every inviter signature and every fingerprint has to check out; one
    /// bad generation rejects the whole invite.
    pub fn accept_invite(&self, invite: &VaultInvite) -> Result<AcceptedInvite, VaultCryptoError> {
        if invite.invitee != self.identity.public_key() {
            return Err(VaultCryptoError::InviteRecipientMismatch);
        }

        let keys = invite
            .keys
            .iter()
            .map(|invite_key| self.accept_key(invite, invite_key))
            .collect::<Result<Vec<_>, _>>()?;

        tracing::info!(
            share_id = %invite.share_id,
            inviter = %invite.inviter,
            keys = keys.len(),
            "accepted vault invite"
        );
        Ok(AcceptedInvite {
            share_id: invite.share_id,
            scheme: invite.scheme,
            inviter: invite.inviter,
            keys,
        })
    }

    fn accept_key(
        &self,
        invite: &VaultInvite,
        invite_key: &InviteKey,
    ) -> Result<ShareKey, VaultCryptoError> {
        verify_signature(
            &invite.inviter,
            &inviter_acceptance_message(
                &invite.share_id,
                invite_key.rotation,
                &invite_key.fingerprint,
                &invite.invitee,
            ),
            &invite_key.inviter_signature,
            Attestation::InviterAcceptance,
        )?;
        if let Some(chain) = &invite_key.chain {
            if chain.signing_fingerprint() != invite_key.fingerprint {
                return Err(VaultCryptoError::signature_invalid(Attestation::InviterAcceptance));
            }
            chain.verify()?;
        }

        let key = UnlockedShareKey::from_sealed(
            invite.scheme,
            invite_key.rotation,
            &invite_key.sealed_key,
            self.identity.as_ref(),
        )?;
        if key.fingerprint() != invite_key.fingerprint {
            return Err(VaultCryptoError::signature_invalid(Attestation::InviterAcceptance));
        }
        key.check_chain(invite_key.chain.as_ref())?;

        let share_key = ShareKey::seal(
            &invite.share_id,
            &key,
            self.identity.as_ref(),
            self.keystore.as_ref(),
            invite_key.is_active,
        )?;
        Ok(ShareKey {
            create_time: invite_key.create_time,
            ..share_key
        })
    }
}
