//! `rig` configuration
//!
//! Loaded with figment, later sources overriding earlier ones:
//!
//! 1. Built-in defaults
//! 2. `~/.config/rigging/config.toml`
//! 3. `rigging.toml` in the project root, or the file given with `--config`
//! 4. `RIGGING_*` environment variables, `__` separating sections
//!    (`RIGGING_DATABASE__URL=postgres://...`)
//!
//! ```toml
//! [layout]
//! models_dir = "src/models"
//! migrations_dir = "db/migrations"
//!
//! [database]
//! url = "sqlite://app.db"
//!
//! [migrations]
//! lock_timeout_ms = 10000
//! ```

use anyhow::{bail, Context, Result};
use figment::providers::{Env, Format, Toml};
use figment::Figment;
use rigging::dialect::DialectId;
use rigging::plan::ProjectLayout;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Project-level config file name
pub const FILE_NAME: &str = "rigging.toml";

/// Root configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiggingConfig {
    /// Where generated files go
    pub layout: ProjectLayout,
    /// Target database
    pub database: DatabaseConfig,
    /// Migration bookkeeping
    pub migrations: MigrationsConfig,
    /// Template overrides
    pub templates: TemplatesConfig,
}

/// `[database]`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQL dialect; inferred from `url` when unset
    pub dialect: Option<DialectId>,
    /// Connection URL
    pub url: Option<String>,
}

/// `[migrations]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MigrationsConfig {
    /// Version ledger file, relative to the project root
    pub ledger_path: PathBuf,
    /// Bound on waiting for the ledger lock
    pub lock_timeout_ms: u64,
}

impl Default for MigrationsConfig {
    fn default() -> Self {
        Self {
            ledger_path: PathBuf::from(".rigging/ledger.json"),
            lock_timeout_ms: 5000,
        }
    }
}

/// `[templates]`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplatesConfig {
    /// Directory of `<id>.hbs` overrides
    pub dir: Option<PathBuf>,
}

impl RiggingConfig {
    /// Load configuration for the project at `root`
    ///
    /// # Errors
    ///
    /// Returns an error if `explicit` does not exist or any source fails to
    /// parse.
    pub fn load(root: &Path, explicit: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::new().merge(Toml::string(&toml::to_string(&Self::default())?));

        if let Some(user) = Self::user_config_path().filter(|p| p.exists()) {
            figment = figment.merge(Toml::file(user));
        }

        match explicit {
            Some(path) => {
                if !path.exists() {
                    bail!("Config file not found: {}", path.display());
                }
                figment = figment.merge(Toml::file(path));
            }
            None => {
                let local = root.join(FILE_NAME);
                if local.exists() {
                    figment = figment.merge(Toml::file(local));
                }
            }
        }

        figment = figment.merge(Env::prefixed("RIGGING_").split("__").lowercase(true));

        let config: Self = figment.extract().context("Invalid rigging configuration")?;
        tracing::debug!(?config, "Loaded configuration");
        Ok(config)
    }

    /// `~/.config/rigging/config.toml`, or the platform equivalent
    #[must_use]
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("rigging").join("config.toml"))
    }

    /// Dialect from `[database].dialect`, else inferred from the URL
    ///
    /// # Errors
    ///
    /// Returns an error if neither is usable.
    pub fn dialect(&self) -> Result<DialectId> {
        if let Some(dialect) = self.database.dialect {
            return Ok(dialect);
        }
        let url = self.database_url()?;
        DialectId::from_url(url).with_context(|| {
            format!("Cannot infer a dialect from '{url}'; set [database].dialect")
        })
    }

    /// Connection URL
    ///
    /// # Errors
    ///
    /// Returns an error if no URL is configured.
    pub fn database_url(&self) -> Result<&str> {
        self.database.url.as_deref().context(
            "No database configured; set [database].url in rigging.toml or RIGGING_DATABASE__URL",
        )
    }

    /// Ledger lock timeout
    #[must_use]
    pub const fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.migrations.lock_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RiggingConfig::default();
        assert_eq!(config.layout.models_dir, PathBuf::from("src/models"));
        assert_eq!(config.migrations.ledger_path, PathBuf::from(".rigging/ledger.json"));
        assert_eq!(config.lock_timeout(), Duration::from_secs(5));
        assert!(config.database_url().is_err());
    }

    #[test]
    fn test_project_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(FILE_NAME),
            "[layout]\nmigrations_dir = \"db/migrate\"\n\n[database]\nurl = \"postgres://localhost/app\"\n",
        )
        .unwrap();

        let config = RiggingConfig::load(dir.path(), None).unwrap();
        assert_eq!(config.layout.migrations_dir, PathBuf::from("db/migrate"));
        assert_eq!(config.layout.models_dir, PathBuf::from("src/models"));
        assert_eq!(config.dialect().unwrap(), DialectId::Postgres);
    }

    #[test]
    fn test_explicit_dialect_wins() {
        let config = RiggingConfig {
            database: DatabaseConfig {
                dialect: Some(DialectId::MsSql),
                url: Some("sqlite::memory:".into()),
            },
            ..RiggingConfig::default()
        };
        assert_eq!(config.dialect().unwrap(), DialectId::MsSql);
    }

    #[test]
    fn test_missing_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(RiggingConfig::load(dir.path(), Some(&missing)).is_err());
    }

    #[test]
    fn test_defaults_serialize_to_toml() {
        let text = toml::to_string(&RiggingConfig::default()).unwrap();
        assert!(text.contains("[migrations]"));
        let parsed: RiggingConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed, RiggingConfig::default());
    }
}
