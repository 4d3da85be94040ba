//! Migration scripts
//!
//! A script is an id, a name and two operation lists. On disk it is a TOML
//! file named `<id>_<name>.toml`:
//!
//! ```toml
//! id = "20250101120000"
//! name = "create_posts"
//!
//! [[up]]
//! op = "create_table"
//! table = "posts"
//! # ...
//!
//! [[down]]
//! op = "drop_table"
//! table = "posts"
//! ```

use crate::dialect::SchemaOperation;
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};

/// Length of a `YYYYMMDDHHMMSS` id
pub const ID_LEN: usize = 14;

/// An immutable, identified pair of operation lists
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationScript {
    /// Timestamp token, `YYYYMMDDHHMMSS`
    pub id: String,
    /// Snake case description (`create_posts`)
    pub name: String,
    /// Operations applied by a migration
    #[serde(default)]
    pub up: Vec<SchemaOperation>,
    /// Operations undoing `up`, in execution order
    #[serde(default)]
    pub down: Vec<SchemaOperation>,
}

impl MigrationScript {
    /// Create a script
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        up: Vec<SchemaOperation>,
        down: Vec<SchemaOperation>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            up,
            down,
        }
    }

    /// Id for a script authored at `now`
    ///
    /// ```
    /// use chrono::TimeZone;
    /// use rigging::migrate::MigrationScript;
    ///
    /// let now = chrono::Utc.with_ymd_and_hms(2025, 3, 9, 7, 5, 1).unwrap();
    /// assert_eq!(MigrationScript::timestamp_id(now), "20250309070501");
    /// ```
    #[must_use]
    pub fn timestamp_id(now: DateTime<Utc>) -> String {
        now.format("%Y%m%d%H%M%S").to_string()
    }

    /// Whether `id` is a well-formed timestamp token
    #[must_use]
    pub fn is_valid_id(id: &str) -> bool {
        id.len() == ID_LEN && id.bytes().all(|b| b.is_ascii_digit())
    }

    /// `<id>_<name>.toml`
    #[must_use]
    pub fn file_name(&self) -> String {
        format!("{}_{}.toml", self.id, self.name)
    }

    /// Whether the script can be reverted
    #[must_use]
    pub fn is_reversible(&self) -> bool {
        !self.down.is_empty()
    }

    /// Serialize to the on-disk TOML form
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Parse the on-disk TOML form; `path` is only used for error messages
    pub fn from_toml(path: &Path, source: &str) -> Result<Self> {
        let script: Self = toml::from_str(source).map_err(|e| Error::InvalidScript {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        if !Self::is_valid_id(&script.id) {
            return Err(Error::InvalidScript {
                path: path.to_path_buf(),
                message: format!("id '{}' is not a {ID_LEN}-digit timestamp", script.id),
            });
        }
        Ok(script)
    }

    /// Read one script file
    pub fn load_file(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let script = Self::from_toml(path, &source)?;
        let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
        if !stem.starts_with(&script.id) {
            return Err(Error::InvalidScript {
                path: path.to_path_buf(),
                message: format!("file name does not start with id {}", script.id),
            });
        }
        Ok(script)
    }

    /// Read every `*.toml` script in `dir`, sorted by id
    ///
    /// A missing directory yields no scripts.
    pub fn load_dir(dir: &Path) -> Result<Vec<Self>> {
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Error::io(dir, e)),
        };

        let mut paths: Vec<PathBuf> = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| Error::io(dir, e))?.path();
            if path.extension().is_some_and(|ext| ext == "toml") && path.is_file() {
                paths.push(path);
            }
        }

        let mut scripts = paths
            .iter()
            .map(|path| Self::load_file(path))
            .collect::<Result<Vec<_>>>()?;
        scripts.sort_by(|a, b| a.id.cmp(&b.id));

        let mut seen = HashSet::new();
        for script in &scripts {
            if !seen.insert(script.id.as_str()) {
                return Err(Error::DuplicateMigrationId(script.id.clone()));
            }
        }

        tracing::debug!(dir = %dir.display(), count = scripts.len(), "Loaded migration scripts");
        Ok(scripts)
    }
}
