use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use super::{from_bytes, to_bytes, VersionedRecord};
use crate::error::SchemaError;

pub const CURRENT_VAULT_METADATA_VERSION: u16 = 1;

/// Decrypted vault name and presentation hints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct VaultMetadata {
    pub name: String,
    pub description: String,
    pub display: VaultDisplay,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct VaultDisplay {
    /// Packed `0xRRGGBB`
    pub color: u32,
    pub icon: String,
}

impl VaultMetadata {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        VaultMetadata {
            name: name.into(),
            description: description.into(),
            display: VaultDisplay::default(),
        }
    }
}

impl VersionedRecord for VaultMetadata {
    const CURRENT_VERSION: u16 = CURRENT_VAULT_METADATA_VERSION;
    const RECORD: &'static str = "vault metadata";

    fn encode(&self) -> Result<Zeroizing<Vec<u8>>, SchemaError> {
        to_bytes(self, Self::RECORD)
    }

    fn decode(bytes: &[u8], version: u16) -> Result<Self, SchemaError> {
        match version {
            CURRENT_VAULT_METADATA_VERSION => from_bytes(bytes, Self::RECORD),
            version => Err(SchemaError::UnsupportedContentVersion { version }),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_roundtrip() {
        let mut metadata = VaultMetadata::new("Personal", "everyday logins");
        metadata.display = VaultDisplay {
            color: 0x6d4aff,
            icon: "house".to_string(),
        };
        let bytes = metadata.encode().unwrap();
        let decoded = VaultMetadata::decode(&bytes, CURRENT_VAULT_METADATA_VERSION).unwrap();
        assert_eq!(metadata, decoded);
        assert_eq!(*decoded.encode().unwrap(), *bytes);
    }

    #[test]
    fn test_wiped_on_drop() {
        fn zeroized_on_drop<T: ZeroizeOnDrop>() {}
        zeroized_on_drop::<VaultMetadata>();
        zeroized_on_drop::<VaultDisplay>();

        let mut metadata = VaultMetadata::new("Personal", "everyday logins");
        metadata.zeroize();
        assert!(metadata.name.is_empty());
        assert!(metadata.description.is_empty());
    }

    #[test]
    fn test_unknown_version() {
        let bytes = VaultMetadata::new("a", "b").encode().unwrap();
        assert_eq!(
            VaultMetadata::decode(&bytes, 2),
            Err(SchemaError::UnsupportedContentVersion { version: 2 })
        );
    }

    #[test]
    fn test_garbage_is_malformed() {
        assert_eq!(
            VaultMetadata::decode(&[0xff; 3], CURRENT_VAULT_METADATA_VERSION),
            Err(SchemaError::MalformedContent {
                record: "vault metadata"
            })
        );
    }
}
