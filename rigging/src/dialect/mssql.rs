//! SQL Server statements

use super::common::column_definition;
use super::{unsupported, CascadePolicy, ColumnSpec, ColumnType, DialectRules, SchemaOperation};
use crate::error::Result;

fn column_type(column_type: ColumnType) -> String {
    match column_type {
        ColumnType::String { limit } => format!("NVARCHAR({limit})"),
        ColumnType::Text => "NVARCHAR(MAX)".to_string(),
        ColumnType::Integer => "INT".to_string(),
        ColumnType::BigInt => "BIGINT".to_string(),
        ColumnType::Decimal { precision, scale } => format!("DECIMAL({precision},{scale})"),
        ColumnType::Boolean => "BIT".to_string(),
        ColumnType::Date => "DATE".to_string(),
        ColumnType::DateTime => "DATETIME2".to_string(),
        ColumnType::Uuid => "UNIQUEIDENTIFIER".to_string(),
    }
}

fn column(rules: &DialectRules, col: &ColumnSpec) -> String {
    let type_sql = column_type(col.column_type);
    if col.primary_key {
        return format!(
            "{} {type_sql} IDENTITY(1,1) PRIMARY KEY",
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

const fn on_delete(policy: CascadePolicy) -> &'static str {
    match policy {
        CascadePolicy::Restrict => CascadePolicy::NoAction.as_sql(),
        other => other.as_sql(),
    }
}

fn string_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
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
            format!("ALTER TABLE {} ADD {}", q(table), column(rules, col))
        }
        SchemaOperation::RemoveColumn { table, column } => {
            format!("ALTER TABLE {} DROP COLUMN {}", q(table), q(column))
        }
        SchemaOperation::ChangeColumn { table, column: col } => {
            if col.primary_key {
                return Err(unsupported(rules, op, "cannot change a primary key"));
            }
            if col.default.is_some() {
                return Err(unsupported(
                    rules,
                    op,
                    "defaults are named constraints; use a RawStatement",
                ));
            }
            format!(
                "ALTER TABLE {} ALTER COLUMN {} {}{}",
                q(table),
                q(&col.name),
                column_type(col.column_type),
                if col.nullable { " NULL" } else { " NOT NULL" }
            )
        }
        SchemaOperation::RenameColumn { table, from, to } => format!(
            "EXEC sp_rename {}, {}, 'COLUMN'",
            string_literal(&format!("{table}.{from}")),
            string_literal(to)
        ),
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
        SchemaOperation::RemoveIndex { table, columns } => format!(
            "DROP INDEX {} ON {}",
            rules.index_name(table, columns),
            q(table)
        ),
        SchemaOperation::AddForeignKey {
            table,
            column,
            references_table,
            references_column,
            on_delete: policy,
        } => format!(
            "ALTER TABLE {} ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({}) ON DELETE {}",
            q(table),
            rules.foreign_key_name(table, column),
            q(column),
            q(references_table),
            q(references_column),
            on_delete(*policy)
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
