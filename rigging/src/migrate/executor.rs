//! Statement execution against a database

use crate::error::{Error, Result};
use async_trait::async_trait;
use sqlx::any::AnyPoolOptions;
use sqlx::{Any, AnyPool, Executor, Transaction};

/// Runs SQL inside engine-controlled transactions
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SchemaExecutor: Send {
    /// Open a transaction
    async fn begin(&mut self) -> Result<()>;

    /// Run one statement in the open transaction
    async fn execute(&mut self, sql: &str) -> Result<()>;

    /// Commit the open transaction
    async fn commit(&mut self) -> Result<()>;

    /// Roll back the open transaction
    async fn rollback(&mut self) -> Result<()>;
}

/// Executor over a sqlx `Any` pool
///
/// The pool holds a single connection so every statement of a script runs on
/// the connection that owns its transaction.
pub struct SqlxExecutor {
    pool: AnyPool,
    tx: Option<Transaction<'static, Any>>,
}

impl std::fmt::Debug for SqlxExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlxExecutor")
            .field("pool", &self.pool)
            .field("in_transaction", &self.tx.is_some())
            .finish()
    }
}

impl SqlxExecutor {
    /// Connect to `url` (`sqlite:`, `postgres://`, ...)
    pub async fn connect(url: &str) -> Result<Self> {
        sqlx::any::install_default_drivers();
        let pool = AnyPoolOptions::new().max_connections(1).connect(url).await?;
        tracing::debug!(url = %redact(url), "Connected migration executor");
        Ok(Self::from_pool(pool))
    }

    /// Wrap an existing pool
    #[must_use]
    pub const fn from_pool(pool: AnyPool) -> Self {
        Self { pool, tx: None }
    }

    /// Underlying pool
    #[must_use]
    pub const fn pool(&self) -> &AnyPool {
        &self.pool
    }
}

fn redact(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            format!("{}://***{}", &url[..scheme_end], &url[at..])
        }
        _ => url.to_string(),
    }
}

#[async_trait]
impl SchemaExecutor for SqlxExecutor {
    async fn begin(&mut self) -> Result<()> {
        if self.tx.is_some() {
            return Err(Error::Database(sqlx::Error::Protocol(
                "transaction already open".into(),
            )));
        }
        self.tx = Some(self.pool.begin().await?);
        Ok(())
    }

    async fn execute(&mut self, sql: &str) -> Result<()> {
        match self.tx.as_mut() {
            Some(tx) => (&mut **tx).execute(sql).await?,
            None => (&self.pool).execute(sql).await?,
        };
        Ok(())
    }

    async fn commit(&mut self) -> Result<()> {
        if let Some(tx) = self.tx.take() {
            tx.commit().await?;
        }
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        if let Some(tx) = self.tx.take() {
            tx.rollback().await?;
        }
        Ok(())
    }
}

/// Executor that records statements instead of running them
///
/// Backs dry runs (`--print-sql`) and tests. A statement containing the
/// configured failure substring fails, which exercises rollback paths.
#[derive(Debug, Default, Clone)]
pub struct RecordingExecutor {
    committed: Vec<String>,
    pending: Vec<String>,
    in_transaction: bool,
    fail_on: Option<String>,
    rollbacks: usize,
}

impl RecordingExecutor {
    /// Recorder that accepts every statement
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail any statement containing `needle`
    #[must_use]
    pub fn fail_on(mut self, needle: impl Into<String>) -> Self {
        self.fail_on = Some(needle.into());
        self
    }

    /// Stop injecting failures
    pub fn clear_failure(&mut self) {
        self.fail_on = None;
    }

    /// Statements from committed transactions, in order
    #[must_use]
    pub fn committed(&self) -> &[String] {
        &self.committed
    }

    /// Number of rolled back transactions
    #[must_use]
    pub const fn rollbacks(&self) -> usize {
        self.rollbacks
    }

    /// Whether a transaction is open
    #[must_use]
    pub const fn in_transaction(&self) -> bool {
        self.in_transaction
    }
}

#[async_trait]
impl SchemaExecutor for RecordingExecutor {
    async fn begin(&mut self) -> Result<()> {
        if self.in_transaction {
            return Err(Error::Database(sqlx::Error::Protocol(
                "transaction already open".into(),
            )));
        }
        self.in_transaction = true;
        Ok(())
    }

    async fn execute(&mut self, sql: &str) -> Result<()> {
        if self.fail_on.as_deref().is_some_and(|needle| sql.contains(needle)) {
            return Err(Error::Database(sqlx::Error::Protocol(format!(
                "injected failure on `{sql}`"
            ))));
        }
        if self.in_transaction {
            self.pending.push(sql.to_string());
        } else {
            self.committed.push(sql.to_string());
        }
        Ok(())
    }

    async fn commit(&mut self) -> Result<()> {
        self.committed.append(&mut self.pending);
        self.in_transaction = false;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        self.pending.clear();
        self.in_transaction = false;
        self.rollbacks += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_recording_commit_and_rollback() {
        let mut exec = RecordingExecutor::new().fail_on("boom");
        exec.begin().await.unwrap();
        exec.execute("CREATE TABLE a (x INTEGER)").await.unwrap();
        exec.commit().await.unwrap();

        exec.begin().await.unwrap();
        exec.execute("CREATE TABLE b (x INTEGER)").await.unwrap();
        assert!(exec.execute("boom").await.is_err());
        exec.rollback().await.unwrap();

        assert_eq!(exec.committed(), ["CREATE TABLE a (x INTEGER)"]);
        assert_eq!(exec.rollbacks(), 1);
        assert!(!exec.in_transaction());
    }

    #[tokio::test]
    async fn test_nested_begin_is_rejected() {
        let mut exec = RecordingExecutor::new();
        exec.begin().await.unwrap();
        assert!(exec.begin().await.is_err());
    }

    #[test]
    fn test_redact_hides_credentials() {
        assert_eq!(
            redact("postgres://app:secret@db:5432/app"),
            "postgres://***@db:5432/app"
        );
        assert_eq!(redact("sqlite::memory:"), "sqlite::memory:");
    }

    #[cfg(feature = "sqlite")]
    #[tokio::test]
    async fn test_sqlx_transaction_rollback() {
        let mut exec = SqlxExecutor::connect("sqlite::memory:").await.unwrap();
        exec.execute("CREATE TABLE kept (x INTEGER)").await.unwrap();

        exec.begin().await.unwrap();
        exec.execute("CREATE TABLE discarded (x INTEGER)").await.unwrap();
        exec.rollback().await.unwrap();

        exec.execute("INSERT INTO kept (x) VALUES (1)").await.unwrap();
        assert!(exec.execute("INSERT INTO discarded (x) VALUES (1)").await.is_err());
    }
}
