//! Share keys and the keyring that resolves them.
//!
//! A share (vault) owns an ordered list of key generations. Exactly one is
//! active for new encryptions; retired ones stay around to open older
//! content. See [`chain`] for how each generation is rooted in the owner's
//! identity.

pub mod chain;
mod key;
mod keyring;

pub use chain::LegacyKeyChain;
pub use key::{CryptoScheme, Rotation, ShareId, ShareKey, UnlockedShareKey};
pub use keyring::ShareKeyring;
