//! Error types and error handling
//!
//! Every failure the engine can report is a variant of [`Error`]. Variants are
//! grouped into an [`ErrorClass`] so callers (the CLI in particular) can branch
//! on the kind of failure without matching every variant.

use crate::dialect::DialectId;
use std::path::PathBuf;
use thiserror::Error;

/// Engine error type
#[derive(Debug, Error)]
pub enum Error {
    /// Resource name is empty or contains characters outside `[A-Za-z0-9_]`
    #[error("Invalid resource name '{name}': {reason}")]
    InvalidResourceName {
        /// The rejected input
        name: String,
        /// Why it was rejected
        reason: &'static str,
    },

    /// Field declaration could not be parsed
    #[error("Invalid field declaration '{input}': {reason}")]
    InvalidFieldDeclaration {
        /// The rejected declaration
        input: String,
        /// Why it was rejected
        reason: String,
    },

    /// Field type is not one of the supported semantic types
    #[error("Unknown field type '{type_name}' for field '{field}'")]
    UnknownFieldType {
        /// Field name
        field: String,
        /// The unrecognized type token
        type_name: String,
    },

    /// The same field name appears twice in one declaration list
    #[error("Field '{0}' is declared more than once")]
    DuplicateField(String),

    /// Migration name given to `db new` is not snake case
    #[error("Invalid migration name '{name}': {reason}")]
    InvalidMigrationName {
        /// The rejected name
        name: String,
        /// Why it was rejected
        reason: &'static str,
    },

    /// A plan needs at least one field
    #[error("At least one field must be specified")]
    NoFields,

    /// A plan would produce the same artifact twice
    #[error("Duplicate artifact: {0}")]
    DuplicateArtifact(String),

    /// Template references a placeholder with no value
    #[error("Unresolved variable '{name}' in template '{template}'")]
    UnresolvedVariable {
        /// Template id
        template: String,
        /// Placeholder name
        name: String,
    },

    /// Template engine failure other than a missing variable
    #[error("Failed to render template '{template}': {message}")]
    Template {
        /// Template id
        template: String,
        /// Engine message
        message: String,
    },

    /// No template with this id exists in the catalogue
    #[error("Unknown template '{0}'")]
    UnknownTemplate(String),

    /// Insertion marker is missing from the target content
    #[error("Marker '{0}' not found")]
    MarkerNotFound(String),

    /// Insertion marker appears more than once
    #[error("Marker '{0}' appears more than once")]
    DuplicateMarker(String),

    /// Target path exists and belongs to someone else
    #[error("Refusing to write {path}: {reason}")]
    Conflict {
        /// Conflicting path
        path: PathBuf,
        /// What is in the way
        reason: &'static str,
    },

    /// File system failure
    #[error("I/O error on {path}: {source}")]
    Io {
        /// Path being accessed
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Rolling back a failed run failed as well
    #[error("Rollback failed after error ({original}): {source}")]
    RollbackFailed {
        /// The error that triggered the rollback
        original: Box<Error>,
        /// The error raised while undoing writes
        #[source]
        source: std::io::Error,
    },

    /// Schema operation has no mapping for the target dialect
    #[error("{operation} is not supported by {dialect}")]
    DialectUnsupportedOperation {
        /// Target dialect
        dialect: DialectId,
        /// Operation description
        operation: String,
    },

    /// Another migrator holds the ledger lock
    #[error("Migration ledger is locked: {0}")]
    LedgerLocked(String),

    /// Ledger storage is unreadable or was used incorrectly
    #[error("Ledger error: {0}")]
    Ledger(String),

    /// Revert requested with an empty ledger
    #[error("Nothing to revert: no migrations have been applied")]
    NothingToRevert,

    /// Revert requested for a script without down operations
    #[error("Migration {0} has no down operations and cannot be reverted")]
    ScriptNotReversible(String),

    /// Ledger records an id with no matching script
    #[error("Migration {0} is recorded in the ledger but no script was found")]
    UnknownMigration(String),

    /// Two scripts share one id
    #[error("Migration id {0} is used by more than one script")]
    DuplicateMigrationId(String),

    /// Migration file is malformed
    #[error("Invalid migration script {path}: {message}")]
    InvalidScript {
        /// Script file
        path: PathBuf,
        /// Parse or validation message
        message: String,
    },

    /// A statement failed inside a migration transaction
    #[error("Migration {id} failed on `{sql}`: {message}")]
    Statement {
        /// Migration id
        id: String,
        /// Failing statement
        sql: String,
        /// Database message
        message: String,
    },

    /// Illegal migration state change
    #[error("Migration {id} cannot move from {from} to {to}")]
    InvalidTransition {
        /// Migration id
        id: String,
        /// Current state
        from: &'static str,
        /// Requested state
        to: &'static str,
    },

    /// Serialization failure
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Database driver error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Coarse failure category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// Bad input, detected before any mutation
    Validation,
    /// Template or marker failure
    Render,
    /// File system failure
    Io,
    /// Dialect or database failure
    Dialect,
    /// Lock contention; safe to retry
    Concurrency,
    /// Migration bookkeeping failure
    Migration,
}

impl Error {
    /// Failure category of this error
    #[must_use]
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::InvalidResourceName { .. }
            | Self::InvalidFieldDeclaration { .. }
            | Self::UnknownFieldType { .. }
            | Self::DuplicateField(_)
            | Self::InvalidMigrationName { .. }
            | Self::NoFields
            | Self::DuplicateArtifact(_)
            | Self::Conflict { .. } => ErrorClass::Validation,
            Self::UnresolvedVariable { .. }
            | Self::Template { .. }
            | Self::UnknownTemplate(_)
            | Self::MarkerNotFound(_)
            | Self::DuplicateMarker(_) => ErrorClass::Render,
            Self::Io { .. } | Self::RollbackFailed { .. } => ErrorClass::Io,
            Self::DialectUnsupportedOperation { .. }
            | Self::Statement { .. }
            | Self::Database(_) => ErrorClass::Dialect,
            Self::LedgerLocked(_) => ErrorClass::Concurrency,
            Self::Ledger(_)
            | Self::NothingToRevert
            | Self::ScriptNotReversible(_)
            | Self::UnknownMigration(_)
            | Self::DuplicateMigrationId(_)
            | Self::InvalidScript { .. }
            | Self::InvalidTransition { .. }
            | Self::Serialization(_) => ErrorClass::Migration,
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type for engine operations
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_class() {
        assert_eq!(Error::NoFields.class(), ErrorClass::Validation);
        assert_eq!(
            Error::DuplicateArtifact("src/models/post.rs".into()).class(),
            ErrorClass::Validation
        );
    }

    #[test]
    fn test_bad_migration_name_is_validation() {
        let err = Error::InvalidMigrationName {
            name: "Add Slug".into(),
            reason: "must be snake case",
        };
        assert_eq!(err.class(), ErrorClass::Validation);
        assert!(err.to_string().contains("Add Slug"));
    }

    #[test]
    fn test_lock_contention_is_retryable_class() {
        let err = Error::LedgerLocked("held by pid 42".to_string());
        assert_eq!(err.class(), ErrorClass::Concurrency);
        assert!(err.to_string().contains("pid 42"));
    }

    #[test]
    fn test_rollback_failure_keeps_original() {
        let err = Error::RollbackFailed {
            original: Box::new(Error::MarkerNotFound("routes".into())),
            source: std::io::Error::other("disk gone"),
        };
        assert_eq!(err.class(), ErrorClass::Io);
        assert!(err.to_string().contains("routes"));
    }
}
