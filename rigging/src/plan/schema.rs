//! Migration script synthesis for a new resource

use super::field::FieldDeclaration;
use super::relationship::Relationship;
use crate::dialect::{ColumnSpec, ColumnType, DefaultValue, SchemaOperation};
use crate::inflector::NamingVariantSet;
use crate::migrate::MigrationScript;

/// Name of the script creating `table`
#[must_use]
pub fn create_script_name(table: &str) -> String {
    format!("create_{table}")
}

/// Script creating the resource's table
///
/// `up` creates the table with an `id` primary key, the declared fields and
/// `created_at`/`updated_at` timestamps, then indexes indexed, unique and
/// foreign key columns, then adds the foreign keys. `down` removes the
/// foreign keys newest first and drops the table.
#[must_use]
pub fn create_table_script(
    id: &str,
    variants: &NamingVariantSet,
    fields: &[FieldDeclaration],
    relationships: &[Relationship],
) -> MigrationScript {
    let table = variants.storage_identifier.clone();

    let mut columns = vec![ColumnSpec::primary_key("id")];
    columns.extend(fields.iter().map(FieldDeclaration::column_spec));
    for name in ["created_at", "updated_at"] {
        columns.push(
            ColumnSpec::new(name, ColumnType::DateTime)
                .not_null()
                .with_default(DefaultValue::CurrentTimestamp),
        );
    }

    let mut up = vec![SchemaOperation::CreateTable {
        table: table.clone(),
        columns,
    }];

    let mut indexed: Vec<String> = Vec::new();
    for field in fields {
        let c = &field.constraints;
        if c.unique || c.indexed {
            let column = field.column_name();
            up.push(SchemaOperation::AddIndex {
                table: table.clone(),
                columns: vec![column.clone()],
                unique: c.unique,
            });
            indexed.push(column);
        }
    }
    for rel in relationships {
        if !indexed.contains(&rel.column) {
            up.push(SchemaOperation::AddIndex {
                table: table.clone(),
                columns: vec![rel.column.clone()],
                unique: false,
            });
        }
    }
    for rel in relationships {
        up.push(SchemaOperation::AddForeignKey {
            table: table.clone(),
            column: rel.column.clone(),
            references_table: rel.references_table.clone(),
            references_column: rel.references_column.clone(),
            on_delete: rel.on_delete,
        });
    }

    let mut down: Vec<SchemaOperation> = relationships
        .iter()
        .rev()
        .map(|rel| SchemaOperation::RemoveForeignKey {
            table: table.clone(),
            column: rel.column.clone(),
        })
        .collect();
    down.push(SchemaOperation::DropTable {
        table: table.clone(),
    });

    MigrationScript::new(id, create_script_name(&table), up, down)
}
