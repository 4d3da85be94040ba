//! `rig generate`: scaffold a resource
//!
//! ```bash
//! rig generate Post \
//!   title:string:required \
//!   body:text \
//!   author:references:User \
//!   published_at:datetime
//! ```

use super::{db, Project};
use anyhow::{Context, Result};
use console::style;
use rigging::generate::{GeneratedFile, LocalFileSystem, Orchestrator};
use rigging::inflector::ResourceName;
use rigging::migrate::MigrationScript;
use rigging::plan::{
    create_script_name, ArtifactKind, ArtifactPlanner, FieldDeclaration, GenerationPlan,
    PlanContext,
};
use std::collections::BTreeSet;

/// Scaffold a resource
#[derive(Debug, Clone)]
pub struct GenerateCommand {
    /// Resource name
    pub resource: String,
    /// Field tokens
    pub fields: Vec<String>,
    /// Restrict to these kinds; empty means all
    pub only: Vec<ArtifactKind>,
    /// Render without writing
    pub dry_run: bool,
    /// Apply pending migrations afterwards
    pub migrate: bool,
}

impl GenerateCommand {
    /// Run the command
    ///
    /// # Errors
    ///
    /// Returns an error if planning, generation or the follow-up migration
    /// fails.
    pub async fn execute(&self, project: &Project) -> Result<()> {
        println!(
            "\n{} {} {}",
            style("Generating").cyan().bold(),
            style(&self.resource).green().bold(),
            style("...").cyan().bold()
        );

        let plan = self.plan(project)?;
        let mut orchestrator =
            Orchestrator::new(LocalFileSystem::new(&project.root), project.templates())
                .dry_run(self.dry_run);
        let files = orchestrator
            .execute(&plan)
            .with_context(|| format!("Failed to generate {}", self.resource))?;

        print_files(&files, self.dry_run);

        if self.dry_run {
            println!("\n{}", style("Dry run: nothing was written.").yellow());
            return Ok(());
        }

        if self.migrate && plan.migration.is_some() {
            db::migrate(project, false).await?;
        }

        println!(
            "\n{} {} is ready!",
            style("✨").green().bold(),
            style(&plan.variants.title).green().bold()
        );
        print_next_steps(&plan, self.migrate);
        Ok(())
    }

    /// Build the plan for this invocation
    ///
    /// # Errors
    ///
    /// Returns an error for an invalid resource name or field token, or if
    /// the planner rejects the combination.
    pub fn plan(&self, project: &Project) -> Result<GenerationPlan> {
        let resource = ResourceName::parse(&self.resource)?;
        let fields = self
            .fields
            .iter()
            .map(|token| FieldDeclaration::parse(token))
            .collect::<rigging::Result<Vec<_>>>()
            .context("Failed to parse field definitions")?;

        let kinds: BTreeSet<ArtifactKind> = if self.only.is_empty() {
            ArtifactKind::all()
        } else {
            self.only.iter().copied().collect()
        };

        let mut context = PlanContext::new(migration_id(project, &resource)?)
            .with_layout(project.config.layout.clone())
            .with_known_resources(known_resources(project));
        if let Some(name) = project.crate_name() {
            context = context.with_crate_name(name);
        }

        Ok(ArtifactPlanner::new(context).plan(&resource, &fields, &kinds)?)
    }
}

/// Resources that already have a model file
fn known_resources(project: &Project) -> Vec<ResourceName> {
    let dir = project.path(&project.config.layout.models_dir);
    let Ok(entries) = std::fs::read_dir(&dir) else {
        return Vec::new();
    };
    let mut known: Vec<ResourceName> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().is_some_and(|ext| ext == "rs"))
        .filter_map(|path| path.file_stem().and_then(|s| s.to_str()).map(str::to_owned))
        .filter(|stem| stem != "mod")
        .filter_map(|stem| ResourceName::parse(&stem).ok())
        .collect();
    known.sort_by(|a, b| a.as_str().cmp(b.as_str()));
    tracing::debug!(count = known.len(), dir = %dir.display(), "Found existing resources");
    known
}

/// Reuse the id of an existing create script for this table so re-running
/// `generate` does not add a second migration
fn migration_id(project: &Project, resource: &ResourceName) -> Result<String> {
    let name = create_script_name(&resource.variants().storage_identifier);
    let scripts = MigrationScript::load_dir(&project.migrations_dir())
        .context("Failed to read existing migrations")?;
    Ok(scripts
        .into_iter()
        .find(|script| script.name == name)
        .map_or_else(|| MigrationScript::timestamp_id(chrono::Utc::now()), |script| script.id))
}

fn print_files(files: &[GeneratedFile], dry_run: bool) {
    let verb = if dry_run { "Would write" } else { "Wrote" };
    let changed = files.iter().filter(|f| f.changed).count();
    println!("\n{} {changed} of {} files:", style(verb).green().bold(), files.len());

    for file in files {
        let (mark, note) = match (file.is_new_file, file.changed) {
            (true, _) => (style("+").green(), "created"),
            (false, true) => (style("~").yellow(), "updated"),
            (false, false) => (style("=").dim(), "unchanged"),
        };
        println!(
            "  {mark} {} ({})",
            style(file.path.display()).dim(),
            style(note).dim()
        );
    }
}

fn print_next_steps(plan: &GenerationPlan, migrated: bool) {
    println!("\n{}", style("Next steps:").cyan().bold());
    let mut step = 1;
    if plan.migration.is_some() && !migrated {
        println!("  {step}. Apply the migration: {}", style("rig db migrate").yellow());
        step += 1;
    }
    if plan.artifacts.iter().any(|a| a.kind == ArtifactKind::Handler) {
        println!(
            "  {step}. Mount the routes: {}",
            style("Router::new().merge(routes::routes())").yellow()
        );
        step += 1;
    }
    println!("  {step}. Build your project: {}", style("cargo build").yellow());
}
