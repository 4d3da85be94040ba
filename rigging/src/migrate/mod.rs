//! Migration engine
//!
//! Applies and reverts [`MigrationScript`]s through a [`SchemaExecutor`],
//! recording progress in a [`VersionLedger`].
//!
//! Guarantees:
//!
//! - The ledger lock is held for the whole apply or revert run and released
//!   on success and on failure.
//! - Every script runs in its own transaction. Statements are generated
//!   before the transaction opens, so an operation the dialect cannot express
//!   stops the run without touching the database.
//! - The ledger is updated only after the script's transaction commits.
//! - A failed script is rolled back; earlier scripts in the run stay applied.
//!
//! # Example
//!
//! ```rust,no_run
//! use rigging::dialect::DialectId;
//! use rigging::migrate::{FileLedger, MigrationEngine, MigrationScript, SqlxExecutor};
//! use std::path::Path;
//!
//! # async fn example() -> rigging::Result<()> {
//! let scripts = MigrationScript::load_dir(Path::new("migrations"))?;
//! let ledger = FileLedger::new(".rigging/ledger.json");
//! let executor = SqlxExecutor::connect("sqlite://app.db").await?;
//!
//! let mut engine = MigrationEngine::new(scripts, ledger, executor)?;
//! let applied = engine.apply_pending(DialectId::Sqlite).await?;
//! println!("applied {} migrations", applied.len());
//! # Ok(())
//! # }
//! ```

mod executor;
mod ledger;
mod script;
mod state;

pub use executor::{RecordingExecutor, SchemaExecutor, SqlxExecutor};
pub use ledger::{FileLedger, LedgerEntry, MemoryLedger, VersionLedger, LOCK_POLL_INTERVAL};
pub use script::{MigrationScript, ID_LEN};
pub use state::MigrationState;

#[cfg(test)]
pub use executor::MockSchemaExecutor;
#[cfg(test)]
pub use ledger::MockVersionLedger;

use crate::dialect::{self, DialectId};
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::time::Duration;

/// Default bound on waiting for the ledger lock
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// Ids applied by one run, in application order
pub type AppliedSet = Vec<String>;

/// Ids reverted by one run, newest first
pub type RevertedSet = Vec<String>;

/// Status line for one known script
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationStatus {
    /// Script id
    pub id: String,
    /// Script name
    pub name: String,
    /// `Applied` or `Pending`
    pub state: MigrationState,
    /// Commit time for applied scripts
    pub applied_at: Option<DateTime<Utc>>,
}

/// SQL a pending script would run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedMigration {
    /// Script id
    pub id: String,
    /// Script name
    pub name: String,
    /// Statements, in execution order
    pub statements: Vec<String>,
}

/// Sequences scripts against a ledger and an executor
#[derive(Debug)]
pub struct MigrationEngine<L, E> {
    scripts: Vec<MigrationScript>,
    ledger: L,
    executor: E,
    lock_timeout: Duration,
}

impl<L, E> MigrationEngine<L, E>
where
    L: VersionLedger,
    E: SchemaExecutor,
{
    /// Create an engine over `scripts`, which are sorted by id
    ///
    /// # Errors
    ///
    /// [`Error::DuplicateMigrationId`] if two scripts share an id.
    pub fn new(mut scripts: Vec<MigrationScript>, ledger: L, executor: E) -> Result<Self> {
        scripts.sort_by(|a, b| a.id.cmp(&b.id));
        if let Some(pair) = scripts.windows(2).find(|pair| pair[0].id == pair[1].id) {
            return Err(Error::DuplicateMigrationId(pair[0].id.clone()));
        }
        Ok(Self {
            scripts,
            ledger,
            executor,
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        })
    }

    /// Bound the wait for the ledger lock
    #[must_use]
    pub const fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    /// Known scripts in id order
    #[must_use]
    pub fn scripts(&self) -> &[MigrationScript] {
        &self.scripts
    }

    /// Ledger
    #[must_use]
    pub const fn ledger(&self) -> &L {
        &self.ledger
    }

    /// Executor
    #[must_use]
    pub const fn executor(&self) -> &E {
        &self.executor
    }

    /// Mutable executor access
    pub fn executor_mut(&mut self) -> &mut E {
        &mut self.executor
    }

    /// Every known script with its state
    pub async fn status(&self) -> Result<Vec<MigrationStatus>> {
        let applied: HashMap<String, DateTime<Utc>> = self
            .ledger
            .list()
            .await?
            .into_iter()
            .map(|e| (e.id, e.applied_at))
            .collect();

        for id in applied.keys() {
            if !self.scripts.iter().any(|s| &s.id == id) {
                tracing::warn!(migration = %id, "Ledger records a migration with no script");
            }
        }

        Ok(self
            .scripts
            .iter()
            .map(|script| {
                let applied_at = applied.get(&script.id).copied();
                MigrationStatus {
                    id: script.id.clone(),
                    name: script.name.clone(),
                    state: if applied_at.is_some() {
                        MigrationState::Applied
                    } else {
                        MigrationState::Pending
                    },
                    applied_at,
                }
            })
            .collect())
    }

    /// Scripts not yet in the ledger, in id order
    pub async fn pending(&self) -> Result<Vec<&MigrationScript>> {
        let applied: HashSet<String> = self.ledger.list().await?.into_iter().map(|e| e.id).collect();
        Ok(self
            .scripts
            .iter()
            .filter(|s| !applied.contains(&s.id))
            .collect())
    }

    /// Statements `apply_pending` would run, without running them
    pub async fn plan_pending(&self, dialect: DialectId) -> Result<Vec<PlannedMigration>> {
        let pending = self.pending().await?;
        pending
            .into_iter()
            .map(|script| {
                Ok(PlannedMigration {
                    id: script.id.clone(),
                    name: script.name.clone(),
                    statements: dialect::emit_all(&script.up, dialect)?,
                })
            })
            .collect()
    }

    /// Apply every pending script in id order
    ///
    /// # Errors
    ///
    /// [`Error::LedgerLocked`] when the lock cannot be taken,
    /// [`Error::DialectUnsupportedOperation`] when a script cannot be
    /// expressed, [`Error::Statement`] when a statement fails. Scripts applied
    /// before the failure remain applied.
    pub async fn apply_pending(&mut self, dialect: DialectId) -> Result<AppliedSet> {
        self.ledger.lock(self.lock_timeout).await?;
        let result = self.apply_locked(dialect).await;
        let unlocked = self.ledger.unlock().await;
        let applied = result?;
        unlocked?;
        Ok(applied)
    }

    async fn apply_locked(&mut self, dialect: DialectId) -> Result<AppliedSet> {
        let recorded: HashSet<String> = self.ledger.list().await?.into_iter().map(|e| e.id).collect();
        let mut applied = Vec::new();

        for script in self.scripts.iter().filter(|s| !recorded.contains(&s.id)) {
            let statements = dialect::emit_all(&script.up, dialect)?;
            let state = MigrationState::Pending.transition(&script.id, MigrationState::Applying)?;

            if let Err(e) = run_in_transaction(&mut self.executor, &script.id, &statements).await {
                state.transition(&script.id, MigrationState::RolledBack)?;
                tracing::warn!(migration = %script.id, error = %e, "Migration rolled back");
                return Err(e);
            }
            self.ledger.append(&script.id).await?;
            state.transition(&script.id, MigrationState::Applied)?;

            tracing::info!(
                migration = %script.id,
                name = %script.name,
                statements = statements.len(),
                "Applied migration"
            );
            applied.push(script.id.clone());
        }

        Ok(applied)
    }

    /// Revert the newest `steps` applied scripts, newest first
    ///
    /// Asking for more steps than the ledger holds reverts everything
    /// recorded. Zero steps is a no-op.
    ///
    /// # Errors
    ///
    /// [`Error::NothingToRevert`] on an empty ledger,
    /// [`Error::UnknownMigration`] or [`Error::ScriptNotReversible`] if any
    /// selected script cannot be reverted (checked before anything runs),
    /// [`Error::Statement`] when a statement fails.
    pub async fn revert(&mut self, steps: usize, dialect: DialectId) -> Result<RevertedSet> {
        if steps == 0 {
            return Ok(Vec::new());
        }
        self.ledger.lock(self.lock_timeout).await?;
        let result = self.revert_locked(steps, dialect).await;
        let unlocked = self.ledger.unlock().await;
        let reverted = result?;
        unlocked?;
        Ok(reverted)
    }

    async fn revert_locked(&mut self, steps: usize, dialect: DialectId) -> Result<RevertedSet> {
        let entries = self.ledger.list().await?;
        if entries.is_empty() {
            return Err(Error::NothingToRevert);
        }

        let mut selected = Vec::new();
        for entry in entries.iter().rev().take(steps) {
            let script = self
                .scripts
                .iter()
                .find(|s| s.id == entry.id)
                .ok_or_else(|| Error::UnknownMigration(entry.id.clone()))?;
            if !script.is_reversible() {
                return Err(Error::ScriptNotReversible(script.id.clone()));
            }
            selected.push((script, dialect::emit_all(&script.down, dialect)?));
        }

        let mut reverted = Vec::new();
        for (script, statements) in selected {
            let state = MigrationState::Applied.transition(&script.id, MigrationState::Reverting)?;

            if let Err(e) = run_in_transaction(&mut self.executor, &script.id, &statements).await {
                state.transition(&script.id, MigrationState::Applied)?;
                tracing::warn!(migration = %script.id, error = %e, "Revert rolled back");
                return Err(e);
            }
            self.ledger.remove(&script.id).await?;
            state.transition(&script.id, MigrationState::Pending)?;

            tracing::info!(migration = %script.id, name = %script.name, "Reverted migration");
            reverted.push(script.id.clone());
        }

        Ok(reverted)
    }
}

async fn run_in_transaction<E: SchemaExecutor>(
    executor: &mut E,
    id: &str,
    statements: &[String],
) -> Result<()> {
    executor.begin().await?;

    let mut failure = None;
    for sql in statements {
        tracing::debug!(migration = id, sql = %sql, "Executing statement");
        if let Err(e) = executor.execute(sql).await {
            failure = Some(Error::Statement {
                id: id.to_string(),
                sql: sql.clone(),
                message: e.to_string(),
            });
            break;
        }
    }
    if failure.is_none() {
        if let Err(e) = executor.commit().await {
            failure = Some(e);
        }
    }

    match failure {
        None => Ok(()),
        Some(error) => {
            if let Err(rollback_error) = executor.rollback().await {
                tracing::warn!(migration = id, error = %rollback_error, "Rollback failed");
            }
            Err(error)
        }
    }
}
