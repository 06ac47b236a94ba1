use std::sync::atomic::{AtomicBool, Ordering};

use crate::crypto::{EncryptionTag, Secret};
use crate::keystore::{KeystoreError, PlatformKeystore};

/// Keystore backed by a random in-memory device key
///
/// Wraps with ChaCha20-Poly1305. `lock` makes every call refuse, the way a
///  platform keystore behaves while the device is locked.
#[derive(Debug)]
pub struct MemoryKeystore {
    device_key: Secret,
    locked: AtomicBool,
}

impl MemoryKeystore {
    pub fn new() -> anyhow::Result<Self> {
        Ok(MemoryKeystore {
            device_key: Secret::generate()?,
            locked: AtomicBool::new(false),
        })
    }

    pub fn lock(&self) {
        self.locked.store(true, Ordering::SeqCst);
    }

    pub fn unlock(&self) {
        self.locked.store(false, Ordering::SeqCst);
    }

    fn check_unlocked(&self) -> Result<(), KeystoreError> {
        if self.locked.load(Ordering::SeqCst) {
            return Err(KeystoreError::Refused("device is locked".to_string()));
        }
        Ok(())
    }
}

impl PlatformKeystore for MemoryKeystore {
    fn wrap(&self, plaintext: &[u8]) -> Result<Vec<u8>, KeystoreError> {
        self.check_unlocked()?;
        self.device_key
            .encrypt(EncryptionTag::Passphrase, plaintext)
            .map_err(|e| KeystoreError::Refused(e.to_string()))
    }

    fn unwrap(&self, wrapped: &[u8]) -> Result<Vec<u8>, KeystoreError> {
        self.check_unlocked()?;
        self.device_key
            .decrypt(EncryptionTag::Passphrase, wrapped)
            .map_err(|_| KeystoreError::UnwrapFailed)
    }
}
