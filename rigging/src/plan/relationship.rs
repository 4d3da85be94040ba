//! Foreign key detection

use super::field::{FieldDeclaration, SemanticType};
use crate::dialect::CascadePolicy;
use crate::error::{Error, Result};
use crate::inflector::{NamingVariantSet, ResourceName};

/// A foreign key from the planned resource to another table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    /// Declaring field name
    pub field: String,
    /// Referencing column (`author_id`)
    pub column: String,
    /// Referenced resource, singular snake case (`user`)
    pub target: String,
    /// Referenced table (`users`)
    pub references_table: String,
    /// Referenced column
    pub references_column: String,
    /// Delete policy
    pub on_delete: CascadePolicy,
}

impl Relationship {
    fn new(field: &FieldDeclaration, target: &NamingVariantSet) -> Self {
        Self {
            field: field.name.clone(),
            column: field.column_name(),
            target: target.singular_snake.clone(),
            references_table: target.storage_identifier.clone(),
            references_column: "id".to_string(),
            on_delete: field.constraints.on_delete.unwrap_or_default(),
        }
    }
}

/// Find the foreign keys among `fields`
///
/// Explicit `references` fields always produce a relationship. An integer
/// field named `<x>_id` (or `<x>Id`) produces one when `<x>` is the resource
/// itself or one of the `known` resources.
///
/// # Errors
///
/// [`Error::InvalidFieldDeclaration`] if a `references` target is not a valid
/// resource name.
pub fn detect(
    resource: &NamingVariantSet,
    fields: &[FieldDeclaration],
    known: &[ResourceName],
) -> Result<Vec<Relationship>> {
    let mut relationships = Vec::new();

    for field in fields {
        match &field.semantic_type {
            SemanticType::Reference { resource: target } => {
                let target = ResourceName::parse(target).map_err(|e| {
                    Error::InvalidFieldDeclaration {
                        input: field.to_string(),
                        reason: e.to_string(),
                    }
                })?;
                relationships.push(Relationship::new(field, target.variants()));
            }
            SemanticType::Integer | SemanticType::BigInt => {
                let column = field.column_name();
                let Some(stem) = column.strip_suffix("_id") else {
                    continue;
                };
                if stem == resource.singular_snake {
                    relationships.push(Relationship::new(field, resource));
                } else if let Some(target) = known
                    .iter()
                    .map(ResourceName::variants)
                    .find(|v| v.singular_snake == stem)
                {
                    relationships.push(Relationship::new(field, target));
                }
            }
            _ => {}
        }
    }

    if !relationships.is_empty() {
        tracing::debug!(
            resource = %resource.singular_snake,
            count = relationships.len(),
            "Detected relationships"
        );
    }
    Ok(relationships)
}
