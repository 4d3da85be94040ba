//! Per-migration lifecycle

use crate::error::{Error, Result};
use serde::Serialize;
use std::fmt;

/// Lifecycle state of one migration id
///
/// ```text
/// Pending -> Applying -> Applied -> Reverting -> Pending
///               |                      |
///               v                      v
///           RolledBack              Applied (revert failed)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MigrationState {
    /// Not in the ledger
    Pending,
    /// Inside its apply transaction
    Applying,
    /// Committed and recorded
    Applied,
    /// Apply failed and its transaction was rolled back
    RolledBack,
    /// Inside its revert transaction
    Reverting,
}

impl MigrationState {
    /// State name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Applying => "applying",
            Self::Applied => "applied",
            Self::RolledBack => "rolled_back",
            Self::Reverting => "reverting",
        }
    }

    /// Whether `self -> next` is a legal move
    #[must_use]
    pub const fn can_transition(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending | Self::RolledBack, Self::Applying)
                | (Self::Applying, Self::Applied | Self::RolledBack)
                | (Self::Applied, Self::Reverting)
                | (Self::Reverting, Self::Pending | Self::Applied)
        )
    }

    /// Move to `next` for migration `id`
    ///
    /// # Errors
    ///
    /// [`Error::InvalidTransition`] for an illegal move.
    pub fn transition(self, id: &str, next: Self) -> Result<Self> {
        if self.can_transition(next) {
            tracing::trace!(migration = id, from = self.as_str(), to = next.as_str(), "State change");
            Ok(next)
        } else {
            Err(Error::InvalidTransition {
                id: id.to_string(),
                from: self.as_str(),
                to: next.as_str(),
            })
        }
    }
}

impl fmt::Display for MigrationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::MigrationState::*;
    use super::*;

    #[test]
    fn test_apply_path() {
        let state = Pending.transition("1", Applying).unwrap();
        let state = state.transition("1", Applied).unwrap();
        assert_eq!(state, Applied);
    }

    #[test]
    fn test_failed_apply_can_retry() {
        let state = Applying.transition("1", RolledBack).unwrap();
        assert_eq!(state.transition("1", Applying).unwrap(), Applying);
    }

    #[test]
    fn test_revert_path_and_failure() {
        assert_eq!(Applied.transition("1", Reverting).unwrap(), Reverting);
        assert_eq!(Reverting.transition("1", Pending).unwrap(), Pending);
        assert_eq!(Reverting.transition("1", Applied).unwrap(), Applied);
    }

    #[test]
    fn test_illegal_transitions() {
        for (from, to) in [
            (Pending, Applied),
            (Applied, Applying),
            (Applied, Pending),
            (RolledBack, Applied),
            (Pending, Reverting),
        ] {
            let err = from.transition("42", to).unwrap_err();
            assert!(matches!(err, Error::InvalidTransition { .. }), "{from} -> {to}");
        }
    }
}
