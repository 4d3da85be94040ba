//! PostgreSQL statements

use super::common::column_definition;
use super::{unsupported, ColumnSpec, ColumnType, DialectRules, SchemaOperation};
use crate::error::Result;

fn column_type(column_type: ColumnType) -> String {
    match column_type {
        ColumnType::String { limit } => format!("VARCHAR({limit})"),
        ColumnType::Text => "TEXT".to_string(),
        ColumnType::Integer => "INTEGER".to_string(),
        ColumnType::BigInt => "BIGINT".to_string(),
        ColumnType::Decimal { precision, scale } => format!("NUMERIC({precision},{scale})"),
        ColumnType::Boolean => "BOOLEAN".to_string(),
        ColumnType::Date => "DATE".to_string(),
        ColumnType::DateTime => "TIMESTAMP".to_string(),
        ColumnType::Uuid => "UUID".to_string(),
    }
}

fn column(rules: &DialectRules, col: &ColumnSpec) -> String {
    let type_sql = column_type(col.column_type);
    if col.primary_key {
        return format!(
            "{} {type_sql} GENERATED BY DEFAULT AS IDENTITY PRIMARY KEY",
            rules.quote_ident(&col.name)
        );
    }
    column_definition(
        rules,
        &col.name,
        &type_sql,
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
            format!("ALTER TABLE {} ADD COLUMN {}", q(table), column(rules, col))
        }
        SchemaOperation::RemoveColumn { table, column } => {
            format!("ALTER TABLE {} DROP COLUMN {}", q(table), q(column))
        }
        SchemaOperation::ChangeColumn { table, column: col } => {
            if col.primary_key {
                return Err(unsupported(rules, op, "cannot change a primary key"));
            }
            let prefix = format!("ALTER TABLE {} ALTER COLUMN {}", q(table), q(&col.name));
            let type_sql = column_type(col.column_type);
            let nullability = if col.nullable {
                format!("{prefix} DROP NOT NULL")
            } else {
                format!("{prefix} SET NOT NULL")
            };
            let default = match &col.default {
                Some(value) => format!("{prefix} SET DEFAULT {}", rules.literal(value)),
                None => format!("{prefix} DROP DEFAULT"),
            };
            return Ok(vec![
                format!("{prefix} TYPE {type_sql} USING {}::{type_sql}", q(&col.name)),
                nullability,
                default,
            ]);
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
        SchemaOperation::AddForeignKey {
            table,
            column,
            references_table,
            references_column,
            on_delete,
        } => format!(
            "ALTER TABLE {} ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({}) ON DELETE {}",
            q(table),
            rules.foreign_key_name(table, column),
            q(column),
            q(references_table),
            q(references_column),
            on_delete.as_sql()
        ),
        SchemaOperation::RemoveForeignKey { table, column } => format!(
            "ALTER TABLE {} DROP CONSTRAINT {}",
            q(table),
            rules.foreign_key_name(table, column)
        ),
        SchemaOperation::RawStatement { sql } => sql.clone(),
    };
    Ok(vec![sql])
}
