//! In-process fixtures for unit and integration tests
//!
//! ```rust,ignore
//! use common::testkit::TestUser;
//!
//! let alice = TestUser::new()?;
//! let keyring = alice.keyring(CryptoScheme::ShareKey)?;
//! let item = alice.items.create_item(&keyring, &ItemContent::note("T", "N"))?;
//! ```
mod keystore;
mod user;

pub use keystore::MemoryKeystore;
pub use user::TestUser;
