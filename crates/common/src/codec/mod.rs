//! Versioned canonical binary schema for plaintext records.
//!
//! Records are encoded with bincode using fixed-width integers and rejecting
//! trailing bytes, so `encode(decode(bytes)) == bytes` for every valid
//! current-version buffer. The version lives next to the ciphertext (never
//! inside the plaintext), so a reader knows which layout to expect before it
//! parses a single byte.

mod item;
mod vault;

use bincode::Options;
use serde::{de::DeserializeOwned, Serialize};
use zeroize::Zeroizing;

use crate::error::SchemaError;

pub use item::{
    CustomField, CustomFieldValue, ItemContent, ItemPayload, CONTENT_FORMAT_V1,
    CONTENT_FORMAT_V2, CURRENT_CONTENT_FORMAT_VERSION,
};
pub use vault::{VaultDisplay, VaultMetadata, CURRENT_VAULT_METADATA_VERSION};

/// Upper bound on a single encoded record
pub const MAX_RECORD_SIZE: u64 = 1 << 20;

/// A plaintext record with a versioned binary layout
pub trait VersionedRecord: Sized {
    /// Version written by [`VersionedRecord::encode`]
    const CURRENT_VERSION: u16;
    /// Name used in errors
    const RECORD: &'static str;

    fn encode(&self) -> Result<Zeroizing<Vec<u8>>, SchemaError>;

    /// Decode `bytes` laid out as `version`. Unknown versions are rejected,
    /// never guessed at.
    fn decode(bytes: &[u8], version: u16) -> Result<Self, SchemaError>;
}

fn options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_limit(MAX_RECORD_SIZE)
        .reject_trailing_bytes()
}

pub(crate) fn to_bytes<T: Serialize>(
    value: &T,
    record: &'static str,
) -> Result<Zeroizing<Vec<u8>>, SchemaError> {
    options()
        .serialize(value)
        .map(Zeroizing::new)
        .map_err(|_| SchemaError::MalformedContent { record })
}

pub(crate) fn from_bytes<T: DeserializeOwned>(
    bytes: &[u8],
    record: &'static str,
) -> Result<T, SchemaError> {
    options()
        .deserialize(bytes)
        .map_err(|_| SchemaError::MalformedContent { record })
}
