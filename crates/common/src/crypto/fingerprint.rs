use std::fmt;

use serde::{Deserialize, Serialize};

use super::keys::PublicKey;
use super::secret::Secret;

pub const FINGERPRINT_SIZE: usize = 32;

const SECRET_FINGERPRINT_CONTEXT: &str = "sealvault 2024-06 symmetric key fingerprint";
const PUBLIC_FINGERPRINT_CONTEXT: &str = "sealvault 2024-06 public key fingerprint";

/// A BLAKE3 commitment to a key, used as the signed subject in acceptance
/// and chain signatures.
///
/// Fingerprints of symmetric keys are derived with a dedicated context, so
/// publishing one reveals nothing usable about the key.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Fingerprint([u8; FINGERPRINT_SIZE]);

impl Fingerprint {
    pub fn of_secret(secret: &Secret) -> Self {
        Fingerprint(blake3::derive_key(
            SECRET_FINGERPRINT_CONTEXT,
            secret.bytes(),
        ))
    }

    pub fn of_public_key(key: &PublicKey) -> Self {
        Fingerprint(blake3::derive_key(
            PUBLIC_FINGERPRINT_CONTEXT,
            &key.to_bytes(),
        ))
    }

    pub fn as_bytes(&self) -> &[u8; FINGERPRINT_SIZE] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(hex: &str) -> Result<Self, anyhow::Error> {
        let mut buff = [0; FINGERPRINT_SIZE];
        hex::decode_to_slice(hex, &mut buff)
            .map_err(|_| anyhow::anyhow!("fingerprint hex decode error"))?;
        Ok(Fingerprint(buff))
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl TryFrom<String> for Fingerprint {
    type Error = anyhow::Error;
    fn try_from(hex: String) -> Result<Self, Self::Error> {
        Fingerprint::from_hex(&hex)
    }
}

impl From<Fingerprint> for String {
    fn from(fp: Fingerprint) -> Self {
        fp.to_hex()
    }
}
