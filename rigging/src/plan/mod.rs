//! Artifact planning
//!
//! Turns a resource name and its field declarations into an ordered
//! [`GenerationPlan`]: one [`ArtifactDescriptor`] per file to create or
//! merge, the detected relationships and the migration script.
//!
//! Planning is pure. Nothing touches the file system until the plan is
//! executed by [`crate::generate::Orchestrator`].

mod field;
mod relationship;
mod schema;
mod variables;

pub use field::{FieldConstraints, FieldDeclaration, SemanticType, RESERVED_NAMES};
pub use relationship::{detect as detect_relationships, Relationship};
pub use schema::{create_script_name, create_table_script};
pub use variables::field_variables;

use crate::error::{Error, Result};
use crate::inflector::{NamingVariantSet, ResourceName};
use crate::migrate::MigrationScript;
use crate::template::Variables;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Category of generated artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// Migration script
    Migration,
    /// Data model and its registry entry
    Model,
    /// Request handlers, their registry entry and routes
    Handler,
    /// View templates
    View,
    /// Test file
    Test,
}

impl ArtifactKind {
    /// Every kind, in plan order
    pub const ALL: [Self; 5] = [
        Self::Migration,
        Self::Model,
        Self::Handler,
        Self::View,
        Self::Test,
    ];

    /// Every kind as a set
    #[must_use]
    pub fn all() -> BTreeSet<Self> {
        Self::ALL.into_iter().collect()
    }

    /// Lower-case name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Migration => "migration",
            Self::Model => "model",
            Self::Handler => "handler",
            Self::View => "view",
            Self::Test => "test",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArtifactKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "migration" | "migrations" => Ok(Self::Migration),
            "model" | "models" => Ok(Self::Model),
            "handler" | "handlers" | "controller" => Ok(Self::Handler),
            "view" | "views" | "template" | "templates" => Ok(Self::View),
            "test" | "tests" => Ok(Self::Test),
            other => Err(format!(
                "unknown artifact kind '{other}' (expected migration, model, handler, view or test)"
            )),
        }
    }
}

/// How an artifact reaches its target file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteMode {
    /// Write the whole file
    Create,
    /// Insert the rendered fragment at a marker
    Merge {
        /// Marker id
        marker: String,
        /// Template for the file when it does not exist yet
        seed_template: Option<String>,
    },
}

/// One file the plan produces
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactDescriptor {
    /// Category
    pub kind: ArtifactKind,
    /// Path relative to the project root
    pub target_path: PathBuf,
    /// Template to render
    pub template_id: String,
    /// Placeholder values
    pub variables: Variables,
    /// Create or merge
    pub write_mode: WriteMode,
}

/// Ordered artifacts for one resource
#[derive(Debug, Clone)]
pub struct GenerationPlan {
    /// Resource being generated
    pub resource: ResourceName,
    /// Its naming variants
    pub variants: NamingVariantSet,
    /// Artifacts in write order
    pub artifacts: Vec<ArtifactDescriptor>,
    /// Detected foreign keys
    pub relationships: Vec<Relationship>,
    /// Script written by the migration artifact
    pub migration: Option<MigrationScript>,
}

impl GenerationPlan {
    /// Target paths in write order, merged files included
    pub fn target_paths(&self) -> impl Iterator<Item = &Path> {
        self.artifacts.iter().map(|a| a.target_path.as_path())
    }

    /// Number of artifacts
    #[must_use]
    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    /// Whether the plan writes nothing
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }
}

/// Where artifacts go inside a project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectLayout {
    /// Model files
    pub models_dir: PathBuf,
    /// Handler files
    pub handlers_dir: PathBuf,
    /// View templates, one directory per resource
    pub views_dir: PathBuf,
    /// Test files
    pub tests_dir: PathBuf,
    /// Migration scripts
    pub migrations_dir: PathBuf,
    /// File listing model modules
    pub models_registry: PathBuf,
    /// File listing handler modules
    pub handlers_registry: PathBuf,
    /// Route table
    pub routes_file: PathBuf,
}

impl Default for ProjectLayout {
    fn default() -> Self {
        Self {
            models_dir: "src/models".into(),
            handlers_dir: "src/handlers".into(),
            views_dir: "templates".into(),
            tests_dir: "tests".into(),
            migrations_dir: "migrations".into(),
            models_registry: "src/models/mod.rs".into(),
            handlers_registry: "src/handlers/mod.rs".into(),
            routes_file: "src/routes.rs".into(),
        }
    }
}

/// Inputs to planning besides the resource itself
#[derive(Debug, Clone)]
pub struct PlanContext {
    /// Path layout
    pub layout: ProjectLayout,
    /// Resources that already exist in the project
    pub known_resources: Vec<ResourceName>,
    /// Id for the migration script
    pub migration_id: String,
    /// Crate name used by generated tests
    pub crate_name: String,
}

impl PlanContext {
    /// Default layout, no known resources, crate `app`
    #[must_use]
    pub fn new(migration_id: impl Into<String>) -> Self {
        Self {
            layout: ProjectLayout::default(),
            known_resources: Vec::new(),
            migration_id: migration_id.into(),
            crate_name: "app".to_string(),
        }
    }

    /// Use `layout`
    #[must_use]
    pub fn with_layout(mut self, layout: ProjectLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Treat `resources` as existing
    #[must_use]
    pub fn with_known_resources(mut self, resources: Vec<ResourceName>) -> Self {
        self.known_resources = resources;
        self
    }

    /// Crate name for generated `use` paths
    #[must_use]
    pub fn with_crate_name(mut self, name: impl Into<String>) -> Self {
        self.crate_name = name.into();
        self
    }
}

/// Builds generation plans
#[derive(Debug, Clone)]
pub struct ArtifactPlanner {
    context: PlanContext,
}

impl ArtifactPlanner {
    /// Planner over `context`
    #[must_use]
    pub const fn new(context: PlanContext) -> Self {
        Self { context }
    }

    /// Planning context
    #[must_use]
    pub const fn context(&self) -> &PlanContext {
        &self.context
    }

    /// Plan the artifacts of `kinds` for `resource`
    ///
    /// Artifacts are ordered migration, model, handler, views, test, with
    /// registry merges following the file they register.
    ///
    /// # Errors
    ///
    /// - [`Error::NoFields`] when `fields` is empty
    /// - [`Error::DuplicateField`] when two fields share a column
    /// - [`Error::DuplicateArtifact`] when two artifacts target the same
    ///   file, or the table name collides with a different known resource
    /// - [`Error::InvalidScript`] for a malformed migration id
    pub fn plan(
        &self,
        resource: &ResourceName,
        fields: &[FieldDeclaration],
        kinds: &BTreeSet<ArtifactKind>,
    ) -> Result<GenerationPlan> {
        if fields.is_empty() {
            return Err(Error::NoFields);
        }
        let mut columns = HashSet::new();
        for field in fields {
            if !columns.insert(field.column_name()) {
                return Err(Error::DuplicateField(field.column_name()));
            }
        }

        let variants = resource.variants().clone();
        if let Some(other) = self.context.known_resources.iter().find(|known| {
            let v = known.variants();
            v.storage_identifier == variants.storage_identifier
                && v.singular_snake != variants.singular_snake
        }) {
            tracing::debug!(resource = %resource, existing = %other, "Storage identifier collision");
            return Err(Error::DuplicateArtifact(variants.storage_identifier));
        }

        let relationships =
            relationship::detect(&variants, fields, &self.context.known_resources)?;

        let mut base = variants.to_variables();
        base.extend(field_variables(fields, &relationships));
        base.insert("crate_name".into(), self.context.crate_name.clone());

        let layout = &self.context.layout;
        let mut artifacts = Vec::new();
        let mut migration = None;

        if kinds.contains(&ArtifactKind::Migration) {
            let id = &self.context.migration_id;
            let script = create_table_script(id, &variants, fields, &relationships);
            let target_path = layout.migrations_dir.join(script.file_name());
            if !MigrationScript::is_valid_id(id) {
                return Err(Error::InvalidScript {
                    path: target_path,
                    message: format!("migration id '{id}' is not a YYYYMMDDHHMMSS timestamp"),
                });
            }

            let mut variables = base.clone();
            variables.insert("migration_name".into(), script.name.clone());
            variables.insert("script".into(), script.to_toml()?);
            artifacts.push(create(ArtifactKind::Migration, target_path, "migration", variables));
            migration = Some(script);
        }

        if kinds.contains(&ArtifactKind::Model) {
            artifacts.push(create(
                ArtifactKind::Model,
                layout.models_dir.join(format!("{}.rs", variants.singular_snake)),
                "model",
                base.clone(),
            ));
            artifacts.push(merge(
                ArtifactKind::Model,
                layout.models_registry.clone(),
                "models_registry_entry",
                "models",
                "models_registry",
                base.clone(),
            ));
        }

        if kinds.contains(&ArtifactKind::Handler) {
            artifacts.push(create(
                ArtifactKind::Handler,
                layout.handlers_dir.join(format!("{}.rs", variants.plural_snake)),
                "handler",
                base.clone(),
            ));
            artifacts.push(merge(
                ArtifactKind::Handler,
                layout.handlers_registry.clone(),
                "handlers_registry_entry",
                "handlers",
                "handlers_registry",
                base.clone(),
            ));
            artifacts.push(merge(
                ArtifactKind::Handler,
                layout.routes_file.clone(),
                "routes_entry",
                "routes",
                "routes",
                base.clone(),
            ));
        }

        if kinds.contains(&ArtifactKind::View) {
            let dir = layout.views_dir.join(&variants.plural_snake);
            for (file, template) in [
                ("index.html", "view_list"),
                ("show.html", "view_show"),
                ("form.html", "view_form"),
            ] {
                artifacts.push(create(ArtifactKind::View, dir.join(file), template, base.clone()));
            }
        }

        if kinds.contains(&ArtifactKind::Test) {
            artifacts.push(create(
                ArtifactKind::Test,
                layout.tests_dir.join(format!("{}_test.rs", variants.singular_snake)),
                "test",
                base,
            ));
        }

        check_targets(&artifacts)?;

        tracing::debug!(
            resource = %resource,
            artifacts = artifacts.len(),
            relationships = relationships.len(),
            "Planned generation"
        );

        Ok(GenerationPlan {
            resource: resource.clone(),
            variants,
            artifacts,
            relationships,
            migration,
        })
    }
}

fn create(
    kind: ArtifactKind,
    target_path: PathBuf,
    template_id: &str,
    variables: Variables,
) -> ArtifactDescriptor {
    ArtifactDescriptor {
        kind,
        target_path,
        template_id: template_id.to_string(),
        variables,
        write_mode: WriteMode::Create,
    }
}

fn merge(
    kind: ArtifactKind,
    target_path: PathBuf,
    template_id: &str,
    marker: &str,
    seed_template: &str,
    variables: Variables,
) -> ArtifactDescriptor {
    ArtifactDescriptor {
        kind,
        target_path,
        template_id: template_id.to_string(),
        variables,
        write_mode: WriteMode::Merge {
            marker: marker.to_string(),
            seed_template: Some(seed_template.to_string()),
        },
    }
}

/// A path may be created once, or merged any number of times at distinct
/// markers, but not both.
fn check_targets(artifacts: &[ArtifactDescriptor]) -> Result<()> {
    let mut seen: HashMap<&Path, Vec<&WriteMode>> = HashMap::new();
    for artifact in artifacts {
        let modes = seen.entry(artifact.target_path.as_path()).or_default();
        let clash = modes.iter().any(|existing| match (existing, &artifact.write_mode) {
            (WriteMode::Merge { marker: a, .. }, WriteMode::Merge { marker: b, .. }) => a == b,
            _ => true,
        });
        if clash {
            return Err(Error::DuplicateArtifact(
                artifact.target_path.display().to_string(),
            ));
        }
        modes.push(&artifact.write_mode);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn planner() -> ArtifactPlanner {
        ArtifactPlanner::new(PlanContext::new("20250101120000"))
    }

    fn fields(specs: &[&str]) -> Vec<FieldDeclaration> {
        specs
            .iter()
            .map(|s| FieldDeclaration::parse(s).unwrap())
            .collect()
    }

    fn resource(name: &str) -> ResourceName {
        ResourceName::parse(name).unwrap()
    }

    #[test]
    fn test_category_plan() {
        let plan = planner()
            .plan(&resource("category"), &fields(&["title:string:required"]), &ArtifactKind::all())
            .unwrap();

        let paths: Vec<_> = plan.target_paths().map(|p| p.to_string_lossy().into_owned()).collect();
        assert_eq!(
            paths,
            [
                "migrations/20250101120000_create_categories.toml",
                "src/models/category.rs",
                "src/models/mod.rs",
                "src/handlers/categories.rs",
                "src/handlers/mod.rs",
                "src/routes.rs",
                "templates/categories/index.html",
                "templates/categories/show.html",
                "templates/categories/form.html",
                "tests/category_test.rs",
            ]
        );

        let migrations: Vec<_> = plan
            .artifacts
            .iter()
            .filter(|a| a.kind == ArtifactKind::Migration)
            .collect();
        assert_eq!(migrations.len(), 1);
        let script = plan.migration.as_ref().unwrap();
        assert!(script.up.iter().all(|op| op.name() != "AddColumn"));
        assert_eq!(script.up[0].table(), Some("categories"));

        let models: Vec<_> = plan
            .artifacts
            .iter()
            .filter(|a| a.kind == ArtifactKind::Model && a.write_mode == WriteMode::Create)
            .collect();
        assert_eq!(models.len(), 1);
        assert_eq!(models[0].variables["singular_capitalized"], "Category");
        assert_eq!(models[0].variables["crate_name"], "app");
    }

    #[test]
    fn test_only_filter() {
        let kinds: BTreeSet<_> = [ArtifactKind::Model].into_iter().collect();
        let plan = planner()
            .plan(&resource("post"), &fields(&["title:string"]), &kinds)
            .unwrap();
        assert_eq!(plan.len(), 2);
        assert!(plan.migration.is_none());
        assert!(matches!(
            &plan.artifacts[1].write_mode,
            WriteMode::Merge { marker, .. } if marker == "models"
        ));
    }

    #[test]
    fn test_no_fields() {
        let err = planner()
            .plan(&resource("post"), &[], &ArtifactKind::all())
            .unwrap_err();
        assert!(matches!(err, Error::NoFields));
    }

    #[test]
    fn test_duplicate_field() {
        let err = planner()
            .plan(
                &resource("post"),
                &fields(&["publishedAt:datetime", "published_at:date"]),
                &ArtifactKind::all(),
            )
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateField(name) if name == "published_at"));
    }

    #[test]
    fn test_storage_collision_with_known_resource() {
        let ctx = PlanContext::new("20250101120000").with_known_resources(vec![resource("new")]);
        let err = ArtifactPlanner::new(ctx)
            .plan(&resource("news"), &fields(&["headline:string"]), &ArtifactKind::all())
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateArtifact(table) if table == "news"));
    }

    #[test]
    fn test_regenerating_known_resource_is_allowed() {
        let ctx = PlanContext::new("20250101120000").with_known_resources(vec![resource("post")]);
        assert!(ArtifactPlanner::new(ctx)
            .plan(&resource("Post"), &fields(&["title:string"]), &ArtifactKind::all())
            .is_ok());
    }

    #[test]
    fn test_overlapping_layout_is_duplicate() {
        let layout = ProjectLayout {
            handlers_dir: "src/models".into(),
            ..ProjectLayout::default()
        };
        let ctx = PlanContext::new("20250101120000").with_layout(layout);
        let err = ArtifactPlanner::new(ctx)
            .plan(&resource("sheep"), &fields(&["name:string"]), &ArtifactKind::all())
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateArtifact(path) if path.ends_with("sheep.rs")));
    }

    #[test]
    fn test_invalid_migration_id() {
        let err = ArtifactPlanner::new(PlanContext::new("soon"))
            .plan(&resource("post"), &fields(&["title:string"]), &ArtifactKind::all())
            .unwrap_err();
        assert!(matches!(err, Error::InvalidScript { .. }));
    }

    #[test]
    fn test_relationships_reach_variables() {
        let ctx = PlanContext::new("20250101120000").with_known_resources(vec![resource("post")]);
        let plan = ArtifactPlanner::new(ctx)
            .plan(
                &resource("comment"),
                &fields(&["body:text:required", "post_id:bigint:required"]),
                &ArtifactKind::all(),
            )
            .unwrap();
        assert_eq!(plan.relationships.len(), 1);
        assert_eq!(
            plan.artifacts[1].variables["relationship_list"],
            "(\"post_id\", \"posts\")"
        );
        let script = plan.migration.unwrap();
        assert!(script
            .up
            .iter()
            .any(|op| op.name() == "AddForeignKey"));
    }

    #[test]
    fn test_artifact_kind_parsing() {
        assert_eq!("models".parse::<ArtifactKind>().unwrap(), ArtifactKind::Model);
        assert_eq!("Views".parse::<ArtifactKind>().unwrap(), ArtifactKind::View);
        assert!("widgets".parse::<ArtifactKind>().is_err());
    }
}
