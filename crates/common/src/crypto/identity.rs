use ed25519_dalek::Signature;

use super::keys::{PublicKey, SecretKey};
use super::secret::Secret;
use super::secret_share::{SecretShare, SecretShareError};

/// The signed-in user's long-term identity key
///
/// Engines only ever see this trait, so the secret half can live behind a
/// hardware token or OS key store as long as it can sign and open shares
/// sealed to it.
pub trait IdentityKey: Send + Sync {
    fn public_key(&self) -> PublicKey;

    fn sign(&self, msg: &[u8]) -> Signature;

    /// Open a [`SecretShare`] sealed to this identity
    fn recover(&self, share: &SecretShare) -> Result<Secret, SecretShareError>;

    fn verify(&self, msg: &[u8], signature: &Signature) -> bool {
        self.public_key().verify(msg, signature).is_ok()
    }
}

impl IdentityKey for SecretKey {
    fn public_key(&self) -> PublicKey {
        self.public()
    }

    fn sign(&self, msg: &[u8]) -> Signature {
        SecretKey::sign(self, msg)
    }

    fn recover(&self, share: &SecretShare) -> Result<Secret, SecretShareError> {
        share.recover(self)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_secret_key_identity() {
        let key = SecretKey::generate().unwrap();
        let identity: &dyn IdentityKey = &key;

        let sig = identity.sign(b"accept");
        assert!(identity.verify(b"accept", &sig));
        assert!(!identity.verify(b"reject", &sig));

        let secret = Secret::generate().unwrap();
        let share = SecretShare::new(&secret, &identity.public_key()).unwrap();
        assert_eq!(identity.recover(&share).unwrap(), secret);
    }
}
