use std::fmt;

use serde::{Deserialize, Serialize};

/// Where a migration unit is in its life
///
/// `Pending → Decrypted → ReEncrypted → Committed`, or `Failed` from any
/// non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitState {
    Pending,
    Decrypted,
    ReEncrypted,
    Committed,
    Failed,
}

impl UnitState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, UnitState::Committed | UnitState::Failed)
    }

    pub fn can_transition_to(&self, next: UnitState) -> bool {
        use UnitState::*;
        matches!(
            (self, next),
            (Pending, Decrypted)
                | (Decrypted, ReEncrypted)
                | (ReEncrypted, Committed)
                | (Pending | Decrypted | ReEncrypted, Failed)
        )
    }
}

/// What a unit migrates: the live content or one history entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum UnitKind {
    Live,
    History { revision: u64 },
}

impl fmt::Display for UnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitKind::Live => write!(f, "live content"),
            UnitKind::History { revision } => write!(f, "history revision {}", revision),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("{kind} cannot move from {from:?} to {to:?}")]
pub struct InvalidTransition {
    pub kind: UnitKind,
    pub from: UnitState,
    pub to: UnitState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationUnit {
    kind: UnitKind,
    state: UnitState,
}

impl MigrationUnit {
    pub(crate) fn new(kind: UnitKind) -> Self {
        MigrationUnit {
            kind,
            state: UnitState::Pending,
        }
    }

    pub fn kind(&self) -> UnitKind {
        self.kind
    }

    pub fn state(&self) -> UnitState {
        self.state
    }

    pub(crate) fn advance(&mut self, next: UnitState) -> Result<(), InvalidTransition> {
        if !self.state.can_transition_to(next) {
            return Err(InvalidTransition {
                kind: self.kind,
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        Ok(())
    }

    /// Move a re-encrypted unit to `Committed`. Returns whether it moved;
    /// units in any other state are left alone.
    pub(crate) fn commit(&mut self) -> bool {
        if self.state != UnitState::ReEncrypted {
            return false;
        }
        self.state = UnitState::Committed;
        true
    }

    /// Move to `Failed` unless already terminal
    pub(crate) fn fail(&mut self) {
        if !self.state.is_terminal() {
            self.state = UnitState::Failed;
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_happy_path() {
        let mut unit = MigrationUnit::new(UnitKind::Live);
        for next in [UnitState::Decrypted, UnitState::ReEncrypted, UnitState::Committed] {
            unit.advance(next).unwrap();
        }
        assert_eq!(unit.state(), UnitState::Committed);
        assert!(unit.state().is_terminal());
    }

    #[test]
    fn test_no_skipping() {
        let mut unit = MigrationUnit::new(UnitKind::History { revision: 2 });
        let err = unit.advance(UnitState::ReEncrypted).unwrap_err();
        assert_eq!(err.from, UnitState::Pending);
        assert_eq!(unit.state(), UnitState::Pending);
        assert_eq!(
            err.to_string(),
            "history revision 2 cannot move from Pending to ReEncrypted"
        );
    }

    #[test]
    fn test_commit_only_from_reencrypted() {
        let mut unit = MigrationUnit::new(UnitKind::Live);
        assert!(!unit.commit());
        assert_eq!(unit.state(), UnitState::Pending);

        unit.advance(UnitState::Decrypted).unwrap();
        unit.advance(UnitState::ReEncrypted).unwrap();
        assert!(unit.commit());
        assert_eq!(unit.state(), UnitState::Committed);
        assert!(!unit.commit());

        let mut failed = MigrationUnit::new(UnitKind::History { revision: 1 });
        failed.fail();
        assert!(!failed.commit());
        assert_eq!(failed.state(), UnitState::Failed);
    }

    #[test]
    fn test_terminal_states_stay_put() {
        let mut unit = MigrationUnit::new(UnitKind::Live);
        unit.fail();
        assert_eq!(unit.state(), UnitState::Failed);
        assert!(unit.advance(UnitState::Decrypted).is_err());

        let mut unit = MigrationUnit::new(UnitKind::Live);
        unit.advance(UnitState::Decrypted).unwrap();
        unit.advance(UnitState::ReEncrypted).unwrap();
        unit.advance(UnitState::Committed).unwrap();
        unit.fail();
        assert_eq!(unit.state(), UnitState::Committed);
        assert!(!UnitState::Committed.can_transition_to(UnitState::Failed));
    }
}
