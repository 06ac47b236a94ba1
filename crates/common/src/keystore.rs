//! The device keystore seam.
//!
//! Share key material at rest is wrapped by a device-held master key that
//! this crate never sees. Platforms plug in their own implementation (secure
//! enclave, OS keychain, TPM); tests use
//! [`MemoryKeystore`](crate::testkit::MemoryKeystore).

use zeroize::Zeroizing;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeystoreError {
    /// The platform declined the operation (locked device, revoked key, ...)
    #[error("keystore refused the operation: {0}")]
    Refused(String),
    /// Wrapped material did not authenticate under the device key
    #[error("keystore could not unwrap key material")]
    UnwrapFailed,
}

/// Wrap and unwrap opaque key material with a device-held master key
pub trait PlatformKeystore: Send + Sync {
    fn wrap(&self, plaintext: &[u8]) -> Result<Vec<u8>, KeystoreError>;

    fn unwrap(&self, wrapped: &[u8]) -> Result<Vec<u8>, KeystoreError>;
}

/// Unwrap into a buffer that is wiped when dropped
pub(crate) fn unwrap_zeroizing(
    keystore: &dyn PlatformKeystore,
    wrapped: &[u8],
) -> Result<Zeroizing<Vec<u8>>, KeystoreError> {
    keystore.unwrap(wrapped).map(Zeroizing::new)
}
