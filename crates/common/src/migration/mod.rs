//! Moving items between shares.
//!
//! A migration splits an item into units: its live content and each of its
//! history entries. Every unit is decrypted with the source keyring and
//! re-encrypted for the destination independently, so one unreadable
//! revision never holds back the rest.

mod engine;
mod outcome;
mod state;

pub use engine::{MigratedItem, MigrationEngine};
pub use outcome::{EncryptedMigrateContent, MigrationFailure, MigrationOutcome};
pub use state::{InvalidTransition, MigrationUnit, UnitKind, UnitState};
