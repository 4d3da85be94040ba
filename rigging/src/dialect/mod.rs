//! SQL dialect adapters
//!
//! Maps [`SchemaOperation`]s to statements for one database family. Each
//! dialect is a pure function in its own module, selected through the static
//! [`DIALECTS`] table which also carries the dialect's quoting, identifier
//! limits and literal spellings.
//!
//! ```
//! use rigging::dialect::{emit, ColumnSpec, ColumnType, DialectId, SchemaOperation};
//!
//! let op = SchemaOperation::CreateTable {
//!     table: "posts".into(),
//!     columns: vec![
//!         ColumnSpec::primary_key("id"),
//!         ColumnSpec::new("title", ColumnType::String { limit: 255 }).not_null(),
//!     ],
//! };
//! let sql = emit(&op, DialectId::Postgres).unwrap();
//! assert_eq!(
//!     sql,
//!     vec![r#"CREATE TABLE "posts" ("id" BIGINT GENERATED BY DEFAULT AS IDENTITY PRIMARY KEY, "title" VARCHAR(255) NOT NULL)"#]
//! );
//! ```

mod common;
mod mssql;
mod mysql;
mod ops;
mod postgres;
mod sqlite;

pub use ops::{CascadePolicy, ColumnSpec, ColumnType, DefaultValue, SchemaOperation};

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Supported database families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DialectId {
    /// SQLite (embedded)
    Sqlite,
    /// PostgreSQL
    Postgres,
    /// MySQL / MariaDB
    #[serde(rename = "mysql")]
    MySql,
    /// Microsoft SQL Server
    #[serde(rename = "mssql")]
    MsSql,
}

impl DialectId {
    /// Every supported dialect
    pub const ALL: [Self; 4] = [Self::Sqlite, Self::Postgres, Self::MySql, Self::MsSql];

    /// Canonical lower-case name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sqlite => "sqlite",
            Self::Postgres => "postgres",
            Self::MySql => "mysql",
            Self::MsSql => "mssql",
        }
    }

    /// Infer the dialect from a connection URL scheme
    ///
    /// ```
    /// use rigging::dialect::DialectId;
    ///
    /// assert_eq!(DialectId::from_url("sqlite::memory:"), Some(DialectId::Sqlite));
    /// assert_eq!(DialectId::from_url("postgresql://localhost/app"), Some(DialectId::Postgres));
    /// assert_eq!(DialectId::from_url("redis://localhost"), None);
    /// ```
    #[must_use]
    pub fn from_url(url: &str) -> Option<Self> {
        let scheme = url.split(':').next()?;
        scheme.parse().ok()
    }

    /// Static rules for this dialect
    #[must_use]
    pub fn rules(self) -> &'static DialectRules {
        match self {
            Self::Sqlite => &DIALECTS[0],
            Self::Postgres => &DIALECTS[1],
            Self::MySql => &DIALECTS[2],
            Self::MsSql => &DIALECTS[3],
        }
    }
}

impl fmt::Display for DialectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DialectId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sqlite" | "sqlite3" => Ok(Self::Sqlite),
            "postgres" | "postgresql" | "pg" => Ok(Self::Postgres),
            "mysql" | "mariadb" => Ok(Self::MySql),
            "mssql" | "sqlserver" => Ok(Self::MsSql),
            other => Err(format!(
                "unknown dialect '{other}' (expected sqlite, postgres, mysql or mssql)"
            )),
        }
    }
}

type EmitFn = fn(&SchemaOperation, &DialectRules) -> Result<Vec<String>>;

/// Per-dialect constants plus the mapping function
pub struct DialectRules {
    /// Dialect this entry describes
    pub id: DialectId,
    /// Opening and closing identifier quote
    pub quote: (char, char),
    /// Longest identifier in bytes; `None` means unlimited
    pub max_identifier_len: Option<usize>,
    /// Foreign keys can be added and dropped on existing tables
    pub native_foreign_keys: bool,
    /// Spelling of boolean true
    pub true_literal: &'static str,
    /// Spelling of boolean false
    pub false_literal: &'static str,
    emit: EmitFn,
}

impl fmt::Debug for DialectRules {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DialectRules")
            .field("id", &self.id)
            .field("quote", &self.quote)
            .field("max_identifier_len", &self.max_identifier_len)
            .field("native_foreign_keys", &self.native_foreign_keys)
            .finish_non_exhaustive()
    }
}

/// Static dialect table, indexed in [`DialectId::ALL`] order
pub static DIALECTS: [DialectRules; 4] = [
    DialectRules {
        id: DialectId::Sqlite,
        quote: ('"', '"'),
        max_identifier_len: None,
        native_foreign_keys: false,
        true_literal: "1",
        false_literal: "0",
        emit: sqlite::emit,
    },
    DialectRules {
        id: DialectId::Postgres,
        quote: ('"', '"'),
        max_identifier_len: Some(63),
        native_foreign_keys: true,
        true_literal: "TRUE",
        false_literal: "FALSE",
        emit: postgres::emit,
    },
    DialectRules {
        id: DialectId::MySql,
        quote: ('`', '`'),
        max_identifier_len: Some(64),
        native_foreign_keys: true,
        true_literal: "1",
        false_literal: "0",
        emit: mysql::emit,
    },
    DialectRules {
        id: DialectId::MsSql,
        quote: ('[', ']'),
        max_identifier_len: Some(128),
        native_foreign_keys: true,
        true_literal: "1",
        false_literal: "0",
        emit: mssql::emit,
    },
];

/// Statements implementing `op` in `dialect`
///
/// May return zero statements when the dialect has no equivalent and the
/// operation is safe to skip (foreign keys on SQLite).
///
/// # Errors
///
/// [`Error::DialectUnsupportedOperation`] when the operation cannot be
/// expressed.
pub fn emit(op: &SchemaOperation, dialect: DialectId) -> Result<Vec<String>> {
    let rules = dialect.rules();
    (rules.emit)(op, rules)
}

/// Statements for a whole operation list, in order
///
/// Fails on the first unsupported operation without returning partial output.
pub fn emit_all(ops: &[SchemaOperation], dialect: DialectId) -> Result<Vec<String>> {
    let mut statements = Vec::new();
    for op in ops {
        statements.extend(emit(op, dialect)?);
    }
    Ok(statements)
}

fn unsupported(rules: &DialectRules, op: &SchemaOperation, detail: &str) -> Error {
    let operation = if detail.is_empty() {
        op.to_string()
    } else {
        format!("{op} ({detail})")
    };
    Error::DialectUnsupportedOperation {
        dialect: rules.id,
        operation,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::io;
    use std::sync::Arc;

    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Capture {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn fk() -> SchemaOperation {
        SchemaOperation::AddForeignKey {
            table: "comments".into(),
            column: "post_id".into(),
            references_table: "posts".into(),
            references_column: "id".into(),
            on_delete: CascadePolicy::Restrict,
        }
    }

    #[test]
    fn test_table_matches_ids() {
        for (rules, id) in DIALECTS.iter().zip(DialectId::ALL) {
            assert_eq!(rules.id, id);
            assert_eq!(id.rules().id, id);
        }
    }

    #[test]
    fn test_dialect_parse_and_display() {
        for id in DialectId::ALL {
            assert_eq!(id.to_string().parse::<DialectId>(), Ok(id));
        }
        assert_eq!("PostgreSQL".parse::<DialectId>(), Ok(DialectId::Postgres));
        assert!("oracle".parse::<DialectId>().is_err());
    }

    #[test]
    fn test_dialect_serde_names() {
        let json = serde_json::to_string(&DialectId::MySql).unwrap();
        assert_eq!(json, "\"mysql\"");
        let parsed: DialectId = serde_json::from_str("\"mssql\"").unwrap();
        assert_eq!(parsed, DialectId::MsSql);
    }

    #[test]
    fn test_sqlite_foreign_key_is_skipped_and_logged() {
        let capture = Capture::default();
        let writer = capture.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::DEBUG)
            .finish();

        let statements = tracing::subscriber::with_default(subscriber, || {
            emit(&fk(), DialectId::Sqlite)
        })
        .unwrap();

        assert!(statements.is_empty());
        let logs = String::from_utf8(capture.0.lock().clone()).unwrap();
        assert!(logs.contains("INFO"), "missing info event: {logs}");
        assert!(logs.contains("AddForeignKey"), "missing operation: {logs}");
    }

    #[test]
    fn test_foreign_key_on_network_dialects() {
        assert_eq!(
            emit(&fk(), DialectId::Postgres).unwrap(),
            vec![r#"ALTER TABLE "comments" ADD CONSTRAINT "fk_comments_post_id" FOREIGN KEY ("post_id") REFERENCES "posts" ("id") ON DELETE RESTRICT"#]
        );
        assert_eq!(
            emit(&fk(), DialectId::MySql).unwrap(),
            vec!["ALTER TABLE `comments` ADD CONSTRAINT `fk_comments_post_id` FOREIGN KEY (`post_id`) REFERENCES `posts` (`id`) ON DELETE RESTRICT"]
        );
        assert_eq!(
            emit(&fk(), DialectId::MsSql).unwrap(),
            vec!["ALTER TABLE [comments] ADD CONSTRAINT [fk_comments_post_id] FOREIGN KEY ([post_id]) REFERENCES [posts] ([id]) ON DELETE NO ACTION"]
        );
    }

    #[test]
    fn test_change_column_unsupported_on_sqlite() {
        let op = SchemaOperation::ChangeColumn {
            table: "posts".into(),
            column: ColumnSpec::new("title", ColumnType::Text),
        };
        let err = emit(&op, DialectId::Sqlite).unwrap_err();
        assert!(matches!(
            err,
            Error::DialectUnsupportedOperation { dialect: DialectId::Sqlite, .. }
        ));
    }

    #[test]
    fn test_emit_all_stops_on_unsupported() {
        let ops = vec![
            SchemaOperation::DropTable { table: "a".into() },
            SchemaOperation::ChangeColumn {
                table: "a".into(),
                column: ColumnSpec::new("b", ColumnType::Text),
            },
        ];
        assert!(emit_all(&ops, DialectId::Sqlite).is_err());
        assert_eq!(emit_all(&ops, DialectId::Postgres).unwrap().len(), 4);
    }

    #[test]
    fn test_raw_statement_passes_through() {
        let op = SchemaOperation::RawStatement {
            sql: "UPDATE posts SET title = 'x'".into(),
        };
        for id in DialectId::ALL {
            assert_eq!(emit(&op, id).unwrap(), vec!["UPDATE posts SET title = 'x'"]);
        }
    }

    #[test]
    fn test_long_index_names_are_truncated_per_dialect() {
        let table = "a".repeat(70);
        let op = SchemaOperation::RemoveIndex {
            table: table.clone(),
            columns: vec!["b".repeat(70)],
        };
        let pg = emit(&op, DialectId::Postgres).unwrap();
        let name = pg[0]
            .trim_start_matches("DROP INDEX \"")
            .trim_end_matches('"');
        assert_eq!(name.len(), 63);

        let sqlite = emit(&op, DialectId::Sqlite).unwrap();
        assert!(sqlite[0].contains(&format!("idx_{table}_")));
    }
}
