//! MySQL / MariaDB statements
//!
//! MySQL commits DDL implicitly, so a failing migration can leave earlier
//! statements of the same script applied.

use super::common::column_definition;
use super::{unsupported, ColumnSpec, ColumnType, DialectRules, SchemaOperation};
use crate::error::Result;

fn column_type(column_type: ColumnType) -> String {
    match column_type {
        ColumnType::String { limit } => format!("VARCHAR({limit})"),
        ColumnType::Text => "TEXT".to_string(),
        ColumnType::Integer => "INT".to_string(),
        ColumnType::BigInt => "BIGINT".to_string(),
        ColumnType::Decimal { precision, scale } => format!("DECIMAL({precision},{scale})"),
        ColumnType::Boolean => "TINYINT(1)".to_string(),
        ColumnType::Date => "DATE".to_string(),
        ColumnType::DateTime => "DATETIME".to_string(),
        ColumnType::Uuid => "CHAR(36)".to_string(),
    }
}

fn column(rules: &DialectRules, col: &ColumnSpec, with_unique: bool) -> String {
    let type_sql = column_type(col.column_type);
    if col.primary_key {
        return format!(
            "{} {type_sql} NOT NULL AUTO_INCREMENT PRIMARY KEY",
            rules.quote_ident(&col.name)
        );
    }
    column_definition(
        rules,
        &col.name,
        &type_sql,
        col.nullable,
        with_unique && col.unique,
        col.default.as_ref(),
    )
}

pub(super) fn emit(op: &SchemaOperation, rules: &DialectRules) -> Result<Vec<String>> {
    let q = |name: &str| rules.quote_ident(name);
    let sql = match op {
        SchemaOperation::CreateTable { table, columns } => {
            let columns: Vec<String> = columns.iter().map(|c| column(rules, c, true)).collect();
            format!("CREATE TABLE {} ({})", q(table), columns.join(", "))
        }
        SchemaOperation::DropTable { table } => format!("DROP TABLE {}", q(table)),
        SchemaOperation::AddColumn { table, column: col } => {
            format!("ALTER TABLE {} ADD COLUMN {}", q(table), column(rules, col, true))
        }
        SchemaOperation::RemoveColumn { table, column } => {
            format!("ALTER TABLE {} DROP COLUMN {}", q(table), q(column))
        }
        SchemaOperation::ChangeColumn { table, column: col } => {
            if col.primary_key {
                return Err(unsupported(rules, op, "cannot change a primary key"));
            }
            // MODIFY re-declares the column; uniqueness lives in its own index
            format!("ALTER TABLE {} MODIFY COLUMN {}", q(table), column(rules, col, false))
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
            "ALTER TABLE {} DROP FOREIGN KEY {}",
            q(table),
            rules.foreign_key_name(table, column)
        ),
        SchemaOperation::RawStatement { sql } => sql.clone(),
    };
    Ok(vec![sql])
}

#[cfg(test)]
mod tests {
    use crate::dialect::{emit, ColumnSpec, ColumnType, DialectId, SchemaOperation};

    #[test]
    fn test_create_table_auto_increment() {
        let op = SchemaOperation::CreateTable {
            table: "users".into(),
            columns: vec![
                ColumnSpec::primary_key("id"),
                ColumnSpec::new("email", ColumnType::String { limit: 120 })
                    .not_null()
                    .unique(),
                ColumnSpec::new("token", ColumnType::Uuid),
            ],
        };
        assert_eq!(
            emit(&op, DialectId::MySql).unwrap(),
            vec!["CREATE TABLE `users` (`id` BIGINT NOT NULL AUTO_INCREMENT PRIMARY KEY, `email` VARCHAR(120) NOT NULL UNIQUE, `token` CHAR(36))"]
        );
    }

    #[test]
    fn test_modify_column_drops_unique() {
        let op = SchemaOperation::ChangeColumn {
            table: "users".into(),
            column: ColumnSpec::new("email", ColumnType::Text).unique(),
        };
        assert_eq!(
            emit(&op, DialectId::MySql).unwrap(),
            vec!["ALTER TABLE `users` MODIFY COLUMN `email` TEXT"]
        );
    }

    #[test]
    fn test_drop_index_and_foreign_key() {
        let index = SchemaOperation::RemoveIndex {
            table: "users".into(),
            columns: vec!["email".into()],
        };
        assert_eq!(
            emit(&index, DialectId::MySql).unwrap(),
            vec!["DROP INDEX `idx_users_email` ON `users`"]
        );
        let fk = SchemaOperation::RemoveForeignKey {
            table: "posts".into(),
            column: "user_id".into(),
        };
        assert_eq!(
            emit(&fk, DialectId::MySql).unwrap(),
            vec!["ALTER TABLE `posts` DROP FOREIGN KEY `fk_posts_user_id`"]
        );
    }
}
