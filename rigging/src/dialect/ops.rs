//! Abstract schema operations
//!
//! The closed vocabulary migrations are written in. Dialect modules map each
//! variant to concrete SQL; only [`SchemaOperation::RawStatement`] carries
//! user-written SQL.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One schema change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum SchemaOperation {
    /// Create a table with its columns
    CreateTable {
        /// Table name
        table: String,
        /// Columns in declaration order
        columns: Vec<ColumnSpec>,
    },
    /// Drop a table
    DropTable {
        /// Table name
        table: String,
    },
    /// Add a column to an existing table
    AddColumn {
        /// Table name
        table: String,
        /// New column
        column: ColumnSpec,
    },
    /// Remove a column
    RemoveColumn {
        /// Table name
        table: String,
        /// Column name
        column: String,
    },
    /// Change a column's type, nullability or default
    ChangeColumn {
        /// Table name
        table: String,
        /// New definition; `name` selects the column
        column: ColumnSpec,
    },
    /// Rename a column
    RenameColumn {
        /// Table name
        table: String,
        /// Current name
        from: String,
        /// New name
        to: String,
    },
    /// Create an index
    AddIndex {
        /// Table name
        table: String,
        /// Indexed columns, in order
        columns: Vec<String>,
        /// Unique index
        #[serde(default)]
        unique: bool,
    },
    /// Drop the index created by a matching `AddIndex`
    RemoveIndex {
        /// Table name
        table: String,
        /// Indexed columns, in order
        columns: Vec<String>,
    },
    /// Add a foreign key constraint
    AddForeignKey {
        /// Referencing table
        table: String,
        /// Referencing column
        column: String,
        /// Referenced table
        references_table: String,
        /// Referenced column
        references_column: String,
        /// Action on delete of the referenced row
        #[serde(default)]
        on_delete: CascadePolicy,
    },
    /// Drop the constraint created by a matching `AddForeignKey`
    RemoveForeignKey {
        /// Referencing table
        table: String,
        /// Referencing column
        column: String,
    },
    /// Verbatim SQL, passed through unchanged
    RawStatement {
        /// Statement text
        sql: String,
    },
}

impl SchemaOperation {
    /// Short operation name used in logs and errors
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::CreateTable { .. } => "CreateTable",
            Self::DropTable { .. } => "DropTable",
            Self::AddColumn { .. } => "AddColumn",
            Self::RemoveColumn { .. } => "RemoveColumn",
            Self::ChangeColumn { .. } => "ChangeColumn",
            Self::RenameColumn { .. } => "RenameColumn",
            Self::AddIndex { .. } => "AddIndex",
            Self::RemoveIndex { .. } => "RemoveIndex",
            Self::AddForeignKey { .. } => "AddForeignKey",
            Self::RemoveForeignKey { .. } => "RemoveForeignKey",
            Self::RawStatement { .. } => "RawStatement",
        }
    }

    /// Table the operation touches, if any
    #[must_use]
    pub fn table(&self) -> Option<&str> {
        match self {
            Self::CreateTable { table, .. }
            | Self::DropTable { table }
            | Self::AddColumn { table, .. }
            | Self::RemoveColumn { table, .. }
            | Self::ChangeColumn { table, .. }
            | Self::RenameColumn { table, .. }
            | Self::AddIndex { table, .. }
            | Self::RemoveIndex { table, .. }
            | Self::AddForeignKey { table, .. }
            | Self::RemoveForeignKey { table, .. } => Some(table),
            Self::RawStatement { .. } => None,
        }
    }
}

impl fmt::Display for SchemaOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.table() {
            Some(table) => write!(f, "{} on {table}", self.name()),
            None => f.write_str(self.name()),
        }
    }
}

/// Column definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSpec {
    /// Column name
    pub name: String,
    /// Abstract type
    pub column_type: ColumnType,
    /// Accepts NULL
    #[serde(default)]
    pub nullable: bool,
    /// Unique constraint
    #[serde(default)]
    pub unique: bool,
    /// Default value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<DefaultValue>,
    /// Auto-incrementing primary key
    #[serde(default)]
    pub primary_key: bool,
}

impl ColumnSpec {
    /// Nullable column without constraints
    #[must_use]
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            nullable: true,
            unique: false,
            default: None,
            primary_key: false,
        }
    }

    /// Auto-incrementing `BigInt` primary key
    #[must_use]
    pub fn primary_key(name: impl Into<String>) -> Self {
        Self {
            nullable: false,
            primary_key: true,
            ..Self::new(name, ColumnType::BigInt)
        }
    }

    /// Mark NOT NULL
    #[must_use]
    pub const fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Add a unique constraint
    #[must_use]
    pub const fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Set a default
    #[must_use]
    pub fn with_default(mut self, default: DefaultValue) -> Self {
        self.default = Some(default);
        self
    }
}

/// Abstract column type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ColumnType {
    /// Bounded string
    String {
        /// Maximum length in characters
        limit: u32,
    },
    /// Unbounded text
    Text,
    /// 32-bit integer
    Integer,
    /// 64-bit integer
    BigInt,
    /// Fixed-point number
    Decimal {
        /// Total digits
        precision: u8,
        /// Digits after the point
        scale: u8,
    },
    /// Boolean
    Boolean,
    /// Calendar date
    Date,
    /// Date and time without zone
    DateTime,
    /// UUID
    Uuid,
}

/// Column default
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefaultValue {
    /// String literal, quoted on emission
    Text(String),
    /// Numeric literal, emitted verbatim
    Number(String),
    /// Boolean literal, emitted with the dialect's spelling
    Bool(bool),
    /// Current timestamp at insert time
    CurrentTimestamp,
}

/// Referential action when the referenced row is deleted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CascadePolicy {
    /// Delete referencing rows
    #[default]
    Cascade,
    /// Refuse the delete
    Restrict,
    /// Null out the referencing column
    SetNull,
    /// Deferred check, no action
    NoAction,
}

impl CascadePolicy {
    /// Token accepted by `on_delete=`
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cascade => "cascade",
            Self::Restrict => "restrict",
            Self::SetNull => "set_null",
            Self::NoAction => "no_action",
        }
    }

    /// Standard SQL spelling
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Cascade => "CASCADE",
            Self::Restrict => "RESTRICT",
            Self::SetNull => "SET NULL",
            Self::NoAction => "NO ACTION",
        }
    }
}

impl std::str::FromStr for CascadePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cascade" => Ok(Self::Cascade),
            "restrict" => Ok(Self::Restrict),
            "set_null" | "setnull" | "nullify" => Ok(Self::SetNull),
            "no_action" | "noaction" => Ok(Self::NoAction),
            other => Err(format!(
                "unknown on_delete policy '{other}' (expected cascade, restrict, set_null or no_action)"
            )),
        }
    }
}
