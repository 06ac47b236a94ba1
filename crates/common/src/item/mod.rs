//! Per-item encryption.
//!
//! Every item has its own random key. The content is encrypted under it with
//! tag `ItemContent`, and the key itself is wrapped for the share according
//! to the share's [`CryptoScheme`](crate::share::CryptoScheme).

mod engine;
mod scheme;
mod types;

pub use engine::ItemCryptoEngine;
pub use types::{EncryptedItemContent, EncryptedItemKey, Item, ItemId, ItemRevision, ItemSignatures};
