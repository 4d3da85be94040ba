//! SQLite statements
//!
//! SQLite cannot add or drop constraints on an existing table, so foreign key
//! operations are skipped with an `info` event and column changes are refused.

use super::common::column_definition;
use super::{unsupported, ColumnSpec, ColumnType, DialectRules, SchemaOperation};
use crate::error::Result;

fn column_type(column_type: ColumnType) -> &'static str {
    match column_type {
        ColumnType::String { .. }
        | ColumnType::Text
        | ColumnType::Date
        | ColumnType::DateTime
        | ColumnType::Uuid => "TEXT",
        ColumnType::Integer | ColumnType::BigInt | ColumnType::Boolean => "INTEGER",
        ColumnType::Decimal { .. } => "NUMERIC",
    }
}

fn column(rules: &DialectRules, col: &ColumnSpec) -> String {
    if col.primary_key {
        return format!("{} INTEGER PRIMARY KEY AUTOINCREMENT", rules.quote_ident(&col.name));
    }
    column_definition(
        rules,
        &col.name,
        column_type(col.column_type),
        col.nullable,
        col.unique,
        col.default.as_ref(),
    )
}

pub(super) fn emit(op: &SchemaOperation, rules: &DialectRules) -> Result<Vec<String>> {
    let q = |name: &str| rules.quote_ident(name);
    let sql = match op {
        SchemaOperation::CreateTable { table, columns } => {
            let columns: Vec<String> = columns.iter().map(|c| column(rules, c)).collect();
            format!("CREATE TABLE {} ({})", q(table), columns.join(", "))
        }
        SchemaOperation::DropTable { table } => format!("DROP TABLE {}", q(table)),
        SchemaOperation::AddColumn { table, column: col } => {
            if col.primary_key || col.unique {
                return Err(unsupported(
                    rules,
                    op,
                    "cannot add a PRIMARY KEY or UNIQUE column to an existing table",
                ));
            }
            format!("ALTER TABLE {} ADD COLUMN {}", q(table), column(rules, col))
        }
        SchemaOperation::RemoveColumn { table, column } => {
            format!("ALTER TABLE {} DROP COLUMN {}", q(table), q(column))
        }
        SchemaOperation::ChangeColumn { .. } => {
            return Err(unsupported(rules, op, "ALTER COLUMN requires a table rebuild"));
        }
        SchemaOperation::RenameColumn { table, from, to } => {
            format!("ALTER TABLE {} RENAME COLUMN {} TO {}", q(table), q(from), q(to))
        }
        SchemaOperation::AddIndex {
            table,
            columns,
            unique,
        } => format!(
            "CREATE {}INDEX {} ON {} ({})",
            if *unique { "UNIQUE " } else { "" },
            rules.index_name(table, columns),
            q(table),
            rules.column_list(columns)
        ),
        SchemaOperation::RemoveIndex { table, columns } => {
            format!("DROP INDEX {}", rules.index_name(table, columns))
        }
        SchemaOperation::AddForeignKey { table, column, .. }
        | SchemaOperation::RemoveForeignKey { table, column } => {
            tracing::info!(
                dialect = %rules.id,
                operation = op.name(),
                table = %table,
                column = %column,
                "Skipping foreign key operation; SQLite cannot alter constraints on existing tables"
            );
            return Ok(Vec::new());
        }
        SchemaOperation::RawStatement { sql } => sql.clone(),
    };
    Ok(vec![sql])
}
