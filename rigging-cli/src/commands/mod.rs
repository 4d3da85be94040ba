//! CLI command implementations

pub mod db;
pub mod generate;
pub mod inflect;

pub use db::DbCommand;
pub use generate::GenerateCommand;
pub use inflect::InflectCommand;

use crate::config::RiggingConfig;
use anyhow::{Context, Result};
use rigging::template::{DirectoryTemplates, EmbeddedTemplates, TemplateSource};
use std::path::{Path, PathBuf};

/// The project a command runs against
#[derive(Debug, Clone)]
pub struct Project {
    /// Project root
    pub root: PathBuf,
    /// Loaded configuration
    pub config: RiggingConfig,
}

impl Project {
    /// Project at `root` with configuration loaded from it
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be loaded.
    pub fn load(root: impl Into<PathBuf>, config_path: Option<&Path>) -> Result<Self> {
        let root = root.into();
        let config = RiggingConfig::load(&root, config_path)
            .with_context(|| format!("Failed to load configuration for {}", root.display()))?;
        Ok(Self { root, config })
    }

    /// Project with an explicit configuration
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, config: RiggingConfig) -> Self {
        Self {
            root: root.into(),
            config,
        }
    }

    /// Absolute path of a project-relative path
    #[must_use]
    pub fn path(&self, relative: &Path) -> PathBuf {
        self.root.join(relative)
    }

    /// Migrations directory
    #[must_use]
    pub fn migrations_dir(&self) -> PathBuf {
        self.path(&self.config.layout.migrations_dir)
    }

    /// Ledger file
    #[must_use]
    pub fn ledger_path(&self) -> PathBuf {
        self.path(&self.config.migrations.ledger_path)
    }

    /// Template source: the configured override directory, else the user
    /// template directory when it exists, else the built-ins
    #[must_use]
    pub fn templates(&self) -> Box<dyn TemplateSource> {
        if let Some(dir) = &self.config.templates.dir {
            return Box::new(DirectoryTemplates::new(self.path(dir)));
        }
        match DirectoryTemplates::default_dir().filter(|dir| dir.is_dir()) {
            Some(dir) => Box::new(DirectoryTemplates::new(dir)),
            None => Box::new(EmbeddedTemplates),
        }
    }

    /// Crate name from the project's `Cargo.toml`, with dashes as underscores
    #[must_use]
    pub fn crate_name(&self) -> Option<String> {
        let manifest = std::fs::read_to_string(self.root.join("Cargo.toml")).ok()?;
        let value: toml::Value = toml::from_str(&manifest).ok()?;
        let name = value.get("package")?.get("name")?.as_str()?;
        Some(name.replace('-', "_"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crate_name_from_manifest() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("Cargo.toml"),
            "[package]\nname = \"my-blog\"\nversion = \"0.1.0\"\n",
        )
        .unwrap();
        let project = Project::new(dir.path(), RiggingConfig::default());
        assert_eq!(project.crate_name().as_deref(), Some("my_blog"));
    }

    #[test]
    fn test_crate_name_missing_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let project = Project::new(dir.path(), RiggingConfig::default());
        assert_eq!(project.crate_name(), None);
    }

    #[test]
    fn test_configured_paths_are_rooted() {
        let project = Project::new("/srv/app", RiggingConfig::default());
        assert_eq!(project.migrations_dir(), PathBuf::from("/srv/app/migrations"));
        assert_eq!(project.ledger_path(), PathBuf::from("/srv/app/.rigging/ledger.json"));
    }
}
