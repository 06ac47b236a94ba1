use serde::{Deserialize, Serialize};

use super::state::UnitKind;
use crate::error::ErrorClass;
use crate::item::{EncryptedItemContent, EncryptedItemKey, ItemRevision, ItemSignatures};
use crate::share::Rotation;

/// One unit re-encrypted for the destination share, ready to persist
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedMigrateContent {
    pub revision: u64,
    pub wrapped_item_key: String,
    pub ciphertext: String,
    /// Copied from the source unchanged
    pub content_format_version: u16,
    /// The destination's active rotation
    pub key_rotation: Rotation,
    pub signatures: Option<ItemSignatures>,
}

impl EncryptedMigrateContent {
    pub(crate) fn new(revision: u64, content: EncryptedItemContent, item_key: EncryptedItemKey) -> Self {
        EncryptedMigrateContent {
            revision,
            wrapped_item_key: item_key.key,
            ciphertext: content.ciphertext,
            content_format_version: content.content_format_version,
            key_rotation: content.key_rotation,
            signatures: content.signatures,
        }
    }

    pub fn content(&self) -> EncryptedItemContent {
        EncryptedItemContent {
            ciphertext: self.ciphertext.clone(),
            key_rotation: self.key_rotation,
            content_format_version: self.content_format_version,
            signatures: self.signatures.clone(),
        }
    }

    pub fn item_key(&self) -> EncryptedItemKey {
        EncryptedItemKey {
            key: self.wrapped_item_key.clone(),
            key_rotation: self.key_rotation,
        }
    }

    pub fn to_revision(&self) -> ItemRevision {
        ItemRevision {
            revision: self.revision,
            content: self.content(),
            item_key: self.item_key(),
        }
    }
}

/// Why a unit did not migrate. Identifiers and error class only.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("migrating {unit} failed: {reason}")]
pub struct MigrationFailure {
    pub unit: UnitKind,
    pub class: ErrorClass,
    pub reason: String,
}

/// Result of migrating a group of units
///
/// Partial failure is a value, not an error: the caller decides whether to
/// retry the failed units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationOutcome {
    /// Every unit migrated (trivially so when there were none)
    AllMigrated(Vec<EncryptedMigrateContent>),
    SomeMigrated {
        migrated: Vec<EncryptedMigrateContent>,
        failed: Vec<MigrationFailure>,
    },
    NoneMigrated(Vec<MigrationFailure>),
}

impl MigrationOutcome {
    pub(crate) fn from_parts(
        migrated: Vec<EncryptedMigrateContent>,
        failed: Vec<MigrationFailure>,
    ) -> Self {
        match (migrated.is_empty(), failed.is_empty()) {
            (_, true) => MigrationOutcome::AllMigrated(migrated),
            (true, false) => MigrationOutcome::NoneMigrated(failed),
            (false, false) => MigrationOutcome::SomeMigrated { migrated, failed },
        }
    }

    pub fn migrated(&self) -> &[EncryptedMigrateContent] {
        match self {
            MigrationOutcome::AllMigrated(migrated)
            | MigrationOutcome::SomeMigrated { migrated, .. } => migrated,
            MigrationOutcome::NoneMigrated(_) => &[],
        }
    }

    pub fn failed(&self) -> &[MigrationFailure] {
        match self {
            MigrationOutcome::AllMigrated(_) => &[],
            MigrationOutcome::SomeMigrated { failed, .. } | MigrationOutcome::NoneMigrated(failed) => {
                failed
            }
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, MigrationOutcome::AllMigrated(_))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn migrated(revision: u64) -> EncryptedMigrateContent {
        EncryptedMigrateContent {
            revision,
            wrapped_item_key: String::new(),
            ciphertext: String::new(),
            content_format_version: 2,
            key_rotation: Rotation::FIRST,
            signatures: None,
        }
    }

    fn failed(revision: u64) -> MigrationFailure {
        MigrationFailure {
            unit: UnitKind::History { revision },
            class: ErrorClass::Integrity,
            reason: "decryption failed".to_string(),
        }
    }

    #[test]
    fn test_from_parts() {
        assert!(MigrationOutcome::from_parts(vec![], vec![]).is_complete());
        assert!(matches!(
            MigrationOutcome::from_parts(vec![migrated(1)], vec![]),
            MigrationOutcome::AllMigrated(m) if m.len() == 1
        ));
        assert!(matches!(
            MigrationOutcome::from_parts(vec![], vec![failed(1)]),
            MigrationOutcome::NoneMigrated(f) if f.len() == 1
        ));

        let some = MigrationOutcome::from_parts(vec![migrated(1)], vec![failed(2)]);
        assert!(!some.is_complete());
        assert_eq!(some.migrated().len(), 1);
        assert_eq!(some.failed()[0].unit, UnitKind::History { revision: 2 });
    }

    #[test]
    fn test_failure_message() {
        assert_eq!(
            failed(3).to_string(),
            "migrating history revision 3 failed: decryption failed"
        );
    }
}
