use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::crypto::PublicKey;
use crate::share::{Rotation, ShareId};

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(Uuid);

impl ItemId {
    pub fn new() -> Self {
        ItemId(Uuid::new_v4())
    }

    pub fn from_uuid(id: Uuid) -> Self {
        ItemId(id)
    }
}

impl Default for ItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ItemId({})", self.0)
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Legacy-scheme detached signatures, each sealed under the item key with
/// tag `Signature`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemSignatures {
    pub author: PublicKey,
    /// Author identity over the content ciphertext
    pub author_signature: String,
    /// Vault signing key over the item key fingerprint and author
    pub item_key_signature: String,
}

/// Encrypted item content as stored and transmitted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedItemContent {
    /// `nonce || ciphertext || tag`, base64
    pub ciphertext: String,
    pub key_rotation: Rotation,
    pub content_format_version: u16,
    pub signatures: Option<ItemSignatures>,
}

/// The item key wrapped for its share
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedItemKey {
    /// Base64. Current scheme: AEAD under the share key with tag `ItemKey`.
    /// Legacy scheme: a secret share sealed to the vault key.
    pub key: String,
    pub key_rotation: Rotation,
}

/// A past revision, kept exactly as it was stored along with the key that
/// opens it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRevision {
    pub revision: u64,
    pub content: EncryptedItemContent,
    pub item_key: EncryptedItemKey,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub share_id: ShareId,
    pub content: EncryptedItemContent,
    pub item_key: EncryptedItemKey,
    pub revision: u64,
    /// Oldest first
    pub history: Vec<ItemRevision>,
}

impl Item {
    pub const FIRST_REVISION: u64 = 1;

    pub fn new(
        id: ItemId,
        share_id: ShareId,
        content: EncryptedItemContent,
        item_key: EncryptedItemKey,
    ) -> Self {
        Item {
            id,
            share_id,
            content,
            item_key,
            revision: Self::FIRST_REVISION,
            history: Vec::new(),
        }
    }
}
