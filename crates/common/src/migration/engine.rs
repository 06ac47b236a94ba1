use super::outcome::{EncryptedMigrateContent, MigrationFailure, MigrationOutcome};
use super::state::{MigrationUnit, UnitKind, UnitState};
use crate::config::EngineConfig;
use crate::error::{KeyResolutionError, VaultCryptoError};
use crate::item::{EncryptedItemContent, EncryptedItemKey, Item, ItemCryptoEngine, ItemId};
use crate::share::{ShareId, ShareKeyring};

/// Re-homes items from one share to another
///
/// Each unit (the live content, and every history entry) is decrypted with
/// the source keyring and re-encrypted under a fresh item key for the
/// destination on its own. Nothing is written anywhere; the caller persists
/// the result and swaps it in.
#[derive(Debug, Clone)]
pub struct MigrationEngine {
    items: ItemCryptoEngine,
    migrate_history: bool,
}

impl MigrationEngine {
    pub fn new(items: ItemCryptoEngine) -> Self {
        Self::with_config(items, &EngineConfig::default())
    }

    pub fn with_config(items: ItemCryptoEngine, config: &EngineConfig) -> Self {
        MigrationEngine {
            items,
            migrate_history: config.migrate_history,
        }
    }

    /// Migrate `item` from `source` into `destination`'s active key
    ///
    /// Fails outright only when `item` is not in `source`. Everything else
    /// is reported per unit in the returned [`MigratedItem`].
    pub fn migrate(
        &self,
        item: &Item,
        source: &ShareKeyring,
        destination: &ShareKeyring,
    ) -> Result<MigratedItem, VaultCryptoError> {
        if item.share_id != source.share_id() {
            return Err(KeyResolutionError::ShareMismatch {
                expected: item.share_id,
                actual: source.share_id(),
            }
            .into());
        }

        let mut units = Vec::with_capacity(1 + item.history.len());

        let mut live = MigrationUnit::new(UnitKind::Live);
        let live_outcome = match self.migrate_unit(
            &mut live,
            item,
            item.revision,
            &item.content,
            &item.item_key,
            source,
            destination,
        ) {
            Ok(migrated) => MigrationOutcome::from_parts(vec![migrated], vec![]),
            Err(failure) => MigrationOutcome::from_parts(vec![], vec![failure]),
        };
        units.push(live);

        let mut migrated = Vec::new();
        let mut failed = Vec::new();
        if self.migrate_history {
            for entry in &item.history {
                let mut unit = MigrationUnit::new(UnitKind::History {
                    revision: entry.revision,
                });
                match self.migrate_unit(
                    &mut unit,
                    item,
                    entry.revision,
                    &entry.content,
                    &entry.item_key,
                    source,
                    destination,
                ) {
                    Ok(content) => migrated.push(content),
                    Err(failure) => failed.push(failure),
                }
                units.push(unit);
            }
        }
        let history_outcome = MigrationOutcome::from_parts(migrated, failed);

        tracing::debug!(
            item_id = %item.id,
            source = %source.share_id(),
            destination = %destination.share_id(),
            live_migrated = live_outcome.is_complete(),
            history_migrated = history_outcome.migrated().len(),
            history_failed = history_outcome.failed().len(),
            "migrated item"
        );
        Ok(MigratedItem {
            item_id: item.id,
            destination: destination.share_id(),
            live: live_outcome,
            history: history_outcome,
            units,
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn migrate_unit(
        &self,
        unit: &mut MigrationUnit,
        item: &Item,
        revision: u64,
        content: &EncryptedItemContent,
        item_key: &EncryptedItemKey,
        source: &ShareKeyring,
        destination: &ShareKeyring,
    ) -> Result<EncryptedMigrateContent, MigrationFailure> {
        let result = self.reencrypt(unit, revision, content, item_key, source, destination);
        result.map_err(|err| {
            unit.fail();
            tracing::warn!(
                item_id = %item.id,
                unit = %unit.kind(),
                class = ?err.class(),
                "migration unit failed"
            );
            MigrationFailure {
                unit: unit.kind(),
                class: err.class(),
                reason: err.to_string(),
            }
        })
    }

    fn reencrypt(
        &self,
        unit: &mut MigrationUnit,
        revision: u64,
        content: &EncryptedItemContent,
        item_key: &EncryptedItemKey,
        source: &ShareKeyring,
        destination: &ShareKeyring,
    ) -> Result<EncryptedMigrateContent, VaultCryptoError> {
        let plaintext = self.items.decrypt(content, item_key, source)?;
        unit.advance(UnitState::Decrypted).map_err(anyhow::Error::new)?;

        // schema version travels unchanged
        let (content, item_key) =
            self.items
                .seal(destination, &plaintext, content.content_format_version)?;
        unit.advance(UnitState::ReEncrypted).map_err(anyhow::Error::new)?;
        Ok(EncryptedMigrateContent::new(revision, content, item_key))
    }
}

/// An item re-encrypted for its destination share, not yet persisted
#[derive(Debug, Clone)]
pub struct MigratedItem {
    pub item_id: ItemId,
    pub destination: ShareId,
    /// Outcome for the live content; exactly one unit
    pub live: MigrationOutcome,
    /// Outcome for the history entries, migrated independently of `live`
    pub history: MigrationOutcome,
    units: Vec<MigrationUnit>,
}

impl MigratedItem {
    pub fn units(&self) -> &[MigrationUnit] {
        &self.units
    }

    pub fn is_complete(&self) -> bool {
        self.live.is_complete() && self.history.is_complete()
    }

    /// Mark every re-encrypted unit committed, once the caller has
    /// persisted the result. Failed units stay failed.
    pub fn commit(&mut self) {
        let committed = self
            .units
            .iter_mut()
            .map(MigrationUnit::commit)
            .filter(|moved| *moved)
            .count();
        tracing::debug!(item_id = %self.item_id, committed, "committed migrated units");
    }

    /// The destination record: the migrated live content plus whichever
    /// history entries made it, oldest first
    pub fn into_item(self) -> Result<Item, MigrationFailure> {
        let live = match self.live {
            MigrationOutcome::AllMigrated(mut migrated) if migrated.len() == 1 => migrated.remove(0),
            MigrationOutcome::NoneMigrated(mut failed) if !failed.is_empty() => {
                return Err(failed.remove(0))
            }
            _ => {
                return Err(MigrationFailure {
                    unit: UnitKind::Live,
                    class: crate::error::ErrorClass::Internal,
                    reason: "live content has no migration result".to_string(),
                })
            }
        };

        let mut history: Vec<_> = self
            .history
            .migrated()
            .iter()
            .map(EncryptedMigrateContent::to_revision)
            .collect();
        history.sort_by_key(|entry| entry.revision);

        Ok(Item {
            id: self.item_id,
            share_id: self.destination,
            content: live.content(),
            item_key: live.item_key(),
            revision: live.revision,
            history,
        })
    }
}
