//! `rig db`: migration commands

use super::Project;
use anyhow::{Context, Result};
use clap::Subcommand;
use console::{style, Emoji};
use rigging::dialect::DialectId;
use rigging::migrate::{
    FileLedger, MigrationEngine, MigrationScript, MigrationState, RecordingExecutor, SqlxExecutor,
};
use std::io::Write;
use std::path::PathBuf;

static SUCCESS: Emoji = Emoji("✓", "√");
static INFO: Emoji = Emoji("ℹ", "i");

/// Migration commands
#[derive(Debug, Clone, Subcommand)]
pub enum DbCommand {
    /// Apply pending migrations
    Migrate {
        /// Print the SQL instead of running it
        #[arg(long)]
        print_sql: bool,
        /// Dialect for --print-sql when no database is configured
        #[arg(long, requires = "print_sql")]
        dialect: Option<DialectId>,
    },
    /// Revert the newest applied migrations
    Rollback {
        /// How many migrations to revert
        #[arg(short, long, default_value = "1")]
        steps: usize,
    },
    /// List migrations and whether they are applied
    Status,
    /// Create an empty migration script
    New {
        /// Snake case description, e.g. `add_slug_to_posts`
        name: String,
    },
}

impl DbCommand {
    /// Execute the db command
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - No database is configured (migrate, rollback)
    /// - A migration script cannot be read
    /// - The ledger is locked or a statement fails
    pub async fn execute(&self, project: &Project) -> Result<()> {
        match self {
            Self::Migrate {
                print_sql: true,
                dialect,
            } => print_sql(project, *dialect).await,
            Self::Migrate { .. } => migrate(project, true).await.map(|_| ()),
            Self::Rollback { steps } => rollback(project, *steps).await,
            Self::Status => status(project).await,
            Self::New { name } => new_script(project, name).map(|_| ()),
        }
    }
}

fn load_scripts(project: &Project) -> Result<Vec<MigrationScript>> {
    let dir = project.migrations_dir();
    MigrationScript::load_dir(&dir)
        .with_context(|| format!("Failed to load migrations from {}", dir.display()))
}

fn ledger(project: &Project) -> FileLedger {
    FileLedger::new(project.ledger_path())
}

async fn connect(project: &Project) -> Result<(DialectId, SqlxExecutor)> {
    let dialect = project.config.dialect()?;
    if dialect == DialectId::MsSql {
        return Err(rigging::Error::DialectUnsupportedOperation {
            dialect,
            operation: "Running migrations directly (use `rig db migrate --print-sql`)".into(),
        }
        .into());
    }
    let executor = SqlxExecutor::connect(project.config.database_url()?)
        .await
        .context("Failed to connect to the database")?;
    Ok((dialect, executor))
}

/// Apply every pending migration, returning the applied ids
///
/// With `report_empty` a message is printed when nothing is pending.
///
/// # Errors
///
/// Returns an error if the scripts cannot be loaded, the database cannot be
/// reached, or any migration fails.
pub async fn migrate(project: &Project, report_empty: bool) -> Result<Vec<String>> {
    let scripts = load_scripts(project)?;
    let (dialect, executor) = connect(project).await?;
    let mut engine = MigrationEngine::new(scripts, ledger(project), executor)?
        .with_lock_timeout(project.config.lock_timeout());

    println!("\n{} Running migrations ({dialect})...", style("→").cyan());
    let applied = engine
        .apply_pending(dialect)
        .await
        .context("Migration failed")?;

    if applied.is_empty() {
        if report_empty {
            println!("{} No pending migrations", INFO);
        }
    } else {
        for id in &applied {
            println!("  {} {}", SUCCESS, style(id).green());
        }
        println!(
            "{} Applied {} migration(s)",
            style(SUCCESS).green(),
            applied.len()
        );
    }
    Ok(applied)
}

async fn print_sql(project: &Project, dialect: Option<DialectId>) -> Result<()> {
    let dialect = match dialect {
        Some(dialect) => dialect,
        None => project.config.dialect()?,
    };
    let engine = MigrationEngine::new(load_scripts(project)?, ledger(project), RecordingExecutor::new())?;
    let planned = engine.plan_pending(dialect).await?;

    let mut out = std::io::stdout().lock();
    if planned.is_empty() {
        writeln!(out, "-- no pending migrations")?;
    }
    for migration in planned {
        writeln!(out, "-- {} {}", migration.id, migration.name)?;
        for sql in migration.statements {
            writeln!(out, "{sql};")?;
        }
        writeln!(out)?;
    }
    Ok(())
}

async fn rollback(project: &Project, steps: usize) -> Result<()> {
    let scripts = load_scripts(project)?;
    let (dialect, executor) = connect(project).await?;
    let mut engine = MigrationEngine::new(scripts, ledger(project), executor)?
        .with_lock_timeout(project.config.lock_timeout());

    println!("\n{} Rolling back {steps} migration(s)...", style("→").cyan());
    let reverted = engine
        .revert(steps, dialect)
        .await
        .context("Rollback failed")?;

    for id in &reverted {
        println!("  {} {}", SUCCESS, style(id).yellow());
    }
    println!(
        "{} Reverted {} migration(s)",
        style(SUCCESS).green(),
        reverted.len()
    );
    Ok(())
}

async fn status(project: &Project) -> Result<()> {
    let engine = MigrationEngine::new(load_scripts(project)?, ledger(project), RecordingExecutor::new())?;
    let rows = engine.status().await?;

    println!("\n{} Migrations", INFO);
    if rows.is_empty() {
        println!("  {}", style("(no migration scripts)").dim());
        return Ok(());
    }

    println!("{:<16} {:<10} {:<22} {}", "ID", "State", "Applied at", "Name");
    println!("{}", "─".repeat(72));
    for row in rows {
        let state = match row.state {
            MigrationState::Applied => style(row.state.as_str()).green(),
            _ => style(row.state.as_str()).yellow(),
        };
        let applied_at = row
            .applied_at
            .map(|at| at.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_default();
        println!("{:<16} {:<10} {:<22} {}", row.id, state, applied_at, row.name);
    }
    Ok(())
}

/// Write an empty script named `name`, returning its path
///
/// # Errors
///
/// Returns an error if the name is not snake case or the file cannot be
/// created.
pub fn new_script(project: &Project, name: &str) -> Result<PathBuf> {
    if name.is_empty()
        || !name
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_')
    {
        return Err(rigging::Error::InvalidMigrationName {
            name: name.to_string(),
            reason: "use lowercase letters, digits and underscores",
        }
        .into());
    }

    let id = MigrationScript::timestamp_id(chrono::Utc::now());
    let dir = project.migrations_dir();
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create {}", dir.display()))?;

    let path = dir.join(format!("{id}_{name}.toml"));
    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    file.write_all(script_template(&id, name).as_bytes())
        .with_context(|| format!("Failed to write {}", path.display()))?;

    println!(
        "{} Created migration: {}",
        style(SUCCESS).green(),
        style(path.display()).cyan()
    );
    Ok(path)
}

fn script_template(id: &str, name: &str) -> String {
    format!(
        r#"id = "{id}"
name = "{name}"

# [[up]]
# op = "add_column"
# table = "posts"
# column = {{ name = "slug", nullable = true, column_type = {{ type = "string", limit = 120 }} }}

# [[down]]
# op = "remove_column"
# table = "posts"
# column = "slug"
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RiggingConfig;

    #[test]
    fn test_new_script_is_loadable() {
        let dir = tempfile::tempdir().unwrap();
        let project = Project::new(dir.path(), RiggingConfig::default());

        let path = new_script(&project, "add_slug_to_posts").unwrap();
        let script = MigrationScript::load_file(&path).unwrap();
        assert_eq!(script.name, "add_slug_to_posts");
        assert!(script.up.is_empty());
        assert!(!script.is_reversible());
    }

    #[test]
    fn test_new_script_rejects_bad_name() {
        let dir = tempfile::tempdir().unwrap();
        let project = Project::new(dir.path(), RiggingConfig::default());
        for name in ["Add Slug", "", "add-slug"] {
            let err = new_script(&project, name).unwrap_err();
            assert_eq!(crate::exit::code(&err), 2, "{name:?}");
        }
        assert!(!project.migrations_dir().exists());
    }

    #[tokio::test]
    async fn test_mssql_migrate_is_a_dialect_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = RiggingConfig::default();
        config.database.dialect = Some(DialectId::MsSql);
        let project = Project::new(dir.path(), config);

        let cmd = DbCommand::Migrate {
            print_sql: false,
            dialect: None,
        };
        let err = cmd.execute(&project).await.unwrap_err();
        assert_eq!(crate::exit::code(&err), 5);
        assert!(format!("{err:#}").contains("--print-sql"));
    }

    #[tokio::test]
    async fn test_status_without_database() {
        let dir = tempfile::tempdir().unwrap();
        let project = Project::new(dir.path(), RiggingConfig::default());
        new_script(&project, "first").unwrap();
        DbCommand::Status.execute(&project).await.unwrap();
    }

    #[tokio::test]
    async fn test_migrate_requires_database() {
        let dir = tempfile::tempdir().unwrap();
        let project = Project::new(dir.path(), RiggingConfig::default());
        let cmd = DbCommand::Migrate {
            print_sql: false,
            dialect: None,
        };
        assert!(cmd.execute(&project).await.is_err());
    }
}
