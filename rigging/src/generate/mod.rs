//! Plan execution
//!
//! The [`Orchestrator`] writes a [`GenerationPlan`] as one unit. Every
//! artifact is rendered and checked first; only then are files written, each
//! write recorded in an undo log. If any write fails the log is replayed so
//! the project is left exactly as it was.
//!
//! A file is owned by the generator when it carries the
//! [`GENERATED_HEADER`](crate::template::GENERATED_HEADER). Owned files may be
//! overwritten; any other existing file at a `Create` target is a conflict.
//! Merge targets are shared files and are edited in place.

mod fs;
mod undo;

pub use fs::{FileSystem, LocalFileSystem, MemoryFileSystem};

use crate::error::{Error, Result};
use crate::plan::{ArtifactDescriptor, GenerationPlan, WriteMode};
use crate::template::{merge_at_marker, Renderer, TemplateSource, GENERATED_HEADER};
use std::collections::HashMap;
use std::path::PathBuf;
use undo::{UndoEntry, UndoLog};

/// One artifact's outcome
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    /// Path relative to the project root
    pub path: PathBuf,
    /// Contents after this artifact
    pub content: String,
    /// The file did not exist before
    pub is_new_file: bool,
    /// The contents differ from what was on disk
    pub changed: bool,
}

/// Final state of one target path
struct Staged {
    path: PathBuf,
    original: Option<String>,
    content: Option<String>,
}

impl Staged {
    fn current(&self) -> Option<&str> {
        self.content.as_deref().or(self.original.as_deref())
    }

    fn is_unchanged(&self) -> bool {
        self.content.is_none() || self.content == self.original
    }
}

/// Renders and writes generation plans
pub struct Orchestrator<F> {
    fs: F,
    templates: Box<dyn TemplateSource>,
    renderer: Renderer,
    dry_run: bool,
}

impl<F: FileSystem> Orchestrator<F> {
    /// Orchestrator writing to `fs` with templates from `templates`
    pub fn new(fs: F, templates: Box<dyn TemplateSource>) -> Self {
        Self {
            fs,
            templates,
            renderer: Renderer::new(),
            dry_run: false,
        }
    }

    /// Render and report without writing
    #[must_use]
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Whether writes are skipped
    #[must_use]
    pub const fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Underlying file system
    pub const fn file_system(&self) -> &F {
        &self.fs
    }

    /// Consume the orchestrator, returning the file system
    pub fn into_file_system(self) -> F {
        self.fs
    }

    /// Write every artifact of `plan`, or none of them
    ///
    /// Returns one [`GeneratedFile`] per artifact, in plan order. Re-running a
    /// plan over its own output changes nothing.
    ///
    /// # Errors
    ///
    /// Render, merge and conflict errors are raised before anything is
    /// written. An I/O error while writing rolls back the batch and is
    /// returned as is, or as [`Error::RollbackFailed`] if the rollback itself
    /// fails.
    pub fn execute(&mut self, plan: &GenerationPlan) -> Result<Vec<GeneratedFile>> {
        let (staged, generated) = self.stage(plan)?;

        if self.dry_run {
            tracing::info!(resource = %plan.resource, files = generated.len(), "Dry run, nothing written");
            return Ok(generated);
        }

        let mut undo = UndoLog::default();
        for file in &staged {
            if file.is_unchanged() {
                continue;
            }
            if let Err(source) = self.write(file, &mut undo) {
                let error = Error::io(&file.path, source);
                return Err(self.roll_back(undo, error));
            }
        }

        let written = generated.iter().filter(|f| f.changed).count();
        tracing::info!(
            resource = %plan.resource,
            artifacts = generated.len(),
            written,
            "Generation complete"
        );
        Ok(generated)
    }

    fn stage(&self, plan: &GenerationPlan) -> Result<(Vec<Staged>, Vec<GeneratedFile>)> {
        let mut staged: Vec<Staged> = Vec::new();
        let mut index: HashMap<PathBuf, usize> = HashMap::new();
        let mut generated = Vec::with_capacity(plan.artifacts.len());

        for artifact in &plan.artifacts {
            let path = &artifact.target_path;
            if self.fs.is_dir(path) {
                return Err(Error::Conflict {
                    path: path.clone(),
                    reason: "a directory is in the way",
                });
            }

            let slot = match index.get(path) {
                Some(&slot) => slot,
                None => {
                    let original = self
                        .fs
                        .read_to_string(path)
                        .map_err(|e| Error::io(path, e))?;
                    staged.push(Staged {
                        path: path.clone(),
                        original,
                        content: None,
                    });
                    index.insert(path.clone(), staged.len() - 1);
                    staged.len() - 1
                }
            };

            let entry = &mut staged[slot];
            let content = self.render_artifact(artifact, entry.current())?;
            entry.content = Some(content.clone());

            tracing::debug!(
                kind = %artifact.kind,
                path = %path.display(),
                template = %artifact.template_id,
                "Rendered artifact"
            );
            generated.push(GeneratedFile {
                path: path.clone(),
                is_new_file: entry.original.is_none(),
                changed: entry.original.as_deref() != Some(content.as_str()),
                content,
            });
        }

        Ok((staged, generated))
    }

    fn render_artifact(&self, artifact: &ArtifactDescriptor, existing: Option<&str>) -> Result<String> {
        let template = self.templates.resolve(&artifact.template_id)?;
        let rendered = self.renderer.render(&template, &artifact.variables)?;

        match &artifact.write_mode {
            WriteMode::Create => match existing {
                None => Ok(rendered),
                Some(current) if current == rendered => Ok(rendered),
                Some(current) if current.contains(GENERATED_HEADER) => {
                    tracing::debug!(path = %artifact.target_path.display(), "Overwriting generated file");
                    Ok(rendered)
                }
                Some(_) => Err(Error::Conflict {
                    path: artifact.target_path.clone(),
                    reason: "file exists and was not generated by rigging",
                }),
            },
            WriteMode::Merge {
                marker,
                seed_template,
            } => {
                let base = match (existing, seed_template) {
                    (Some(current), _) => current.to_string(),
                    (None, Some(seed)) => {
                        let seed = self.templates.resolve(seed)?;
                        self.renderer.render(&seed, &artifact.variables)?
                    }
                    (None, None) => return Err(Error::MarkerNotFound(marker.clone())),
                };
                let outcome = merge_at_marker(&base, marker, &rendered)?;
                Ok(outcome.content(&base).to_string())
            }
        }
    }

    fn write(&mut self, file: &Staged, undo: &mut UndoLog) -> std::io::Result<()> {
        match &file.original {
            None => {
                for dir in self.fs.create_parent_dirs(&file.path)? {
                    undo.record(UndoEntry::CreatedDir(dir));
                }
                undo.record(UndoEntry::Created(file.path.clone()));
            }
            Some(prior) => undo.record(UndoEntry::Modified {
                path: file.path.clone(),
                prior: prior.clone(),
            }),
        }
        self.fs.write(&file.path, file.content.as_deref().unwrap_or_default())
    }

    fn roll_back(&mut self, undo: UndoLog, error: Error) -> Error {
        tracing::warn!(error = %error, changes = undo.len(), "Generation failed, rolling back");
        match undo.replay(&mut self.fs) {
            Ok(()) => error,
            Err(source) => Error::RollbackFailed {
                original: Box::new(error),
                source,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inflector::ResourceName;
    use crate::plan::{ArtifactKind, ArtifactPlanner, FieldDeclaration, PlanContext};
    use crate::template::{EmbeddedTemplates, MockTemplateSource, Template};
    use std::path::Path;

    fn plan(name: &str) -> GenerationPlan {
        let fields = vec![
            FieldDeclaration::parse("title:string:required").unwrap(),
            FieldDeclaration::parse("body:text").unwrap(),
        ];
        ArtifactPlanner::new(PlanContext::new("20250101120000"))
            .plan(&ResourceName::parse(name).unwrap(), &fields, &ArtifactKind::all())
            .unwrap()
    }

    fn orchestrator(fs: MemoryFileSystem) -> Orchestrator<MemoryFileSystem> {
        Orchestrator::new(fs, Box::new(EmbeddedTemplates))
    }

    #[test]
    fn test_fresh_project() {
        let mut orch = orchestrator(MemoryFileSystem::new());
        let files = orch.execute(&plan("post")).unwrap();

        assert_eq!(files.len(), 10);
        assert!(files.iter().all(|f| f.is_new_file && f.changed));

        let fs = orch.file_system();
        let model = fs.file("src/models/post.rs").unwrap();
        assert!(model.contains("pub struct Post {"));
        assert!(model.contains("    pub title: String,\n    pub body: Option<String>,\n"));
        assert!(fs.file("src/models/mod.rs").unwrap().contains("pub mod post;\n// rigging:marker models"));
        assert!(fs.file("src/routes.rs").unwrap().contains(".route(\"/posts\""));
        assert!(fs
            .file("templates/posts/index.html")
            .unwrap()
            .contains("<td>{{ item.title }}</td>"));
        assert!(fs.dirs().contains(Path::new("templates/posts")));
    }

    #[test]
    fn test_rerun_is_noop() {
        let mut orch = orchestrator(MemoryFileSystem::new());
        let plan = plan("post");
        orch.execute(&plan).unwrap();
        let snapshot = orch.file_system().clone();

        let files = orch.execute(&plan).unwrap();
        assert!(files.iter().all(|f| !f.changed && !f.is_new_file));
        assert_eq!(orch.file_system(), &snapshot);
    }

    #[test]
    fn test_second_resource_merges_registries() {
        let mut orch = orchestrator(MemoryFileSystem::new());
        orch.execute(&plan("post")).unwrap();
        let files = orch.execute(&plan("comment")).unwrap();

        let registry = files
            .iter()
            .find(|f| f.path == Path::new("src/models/mod.rs"))
            .unwrap();
        assert!(!registry.is_new_file);
        assert!(registry.changed);
        assert!(registry
            .content
            .contains("pub mod post;\npub mod comment;\n// rigging:marker models"));
    }

    #[test]
    fn test_user_file_conflict_writes_nothing() {
        let before = MemoryFileSystem::new().with_file("src/handlers/posts.rs", "// hand written\n");
        let mut orch = orchestrator(before.clone());

        let err = orch.execute(&plan("post")).unwrap_err();
        assert!(matches!(err, Error::Conflict { ref path, .. } if path == Path::new("src/handlers/posts.rs")));
        assert_eq!(orch.file_system(), &before);
    }

    #[test]
    fn test_directory_in_the_way() {
        let before = MemoryFileSystem::new().with_dir("src/models/post.rs");
        let mut orch = orchestrator(before.clone());
        let err = orch.execute(&plan("post")).unwrap_err();
        assert!(matches!(err, Error::Conflict { .. }));
        assert_eq!(orch.file_system(), &before);
    }

    #[test]
    fn test_write_failure_rolls_back() {
        let before = MemoryFileSystem::new().with_file(
            "src/models/mod.rs",
            "//! Models\n\npub mod user;\n// rigging:marker models\n",
        );
        let mut orch = orchestrator(before.clone().fail_writes_to("tests/post_test.rs"));

        let err = orch.execute(&plan("post")).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));

        let after = orch.into_file_system();
        assert_eq!(after.files(), before.files());
        assert_eq!(after.dirs(), before.dirs());
    }

    #[test]
    fn test_missing_marker_fails_before_writing() {
        let before = MemoryFileSystem::new().with_file("src/routes.rs", "// custom routes\n");
        let mut orch = orchestrator(before.clone());
        let err = orch.execute(&plan("post")).unwrap_err();
        assert!(matches!(err, Error::MarkerNotFound(marker) if marker == "routes"));
        assert_eq!(orch.file_system(), &before);
    }

    #[test]
    fn test_dry_run_writes_nothing() {
        let mut orch = orchestrator(MemoryFileSystem::new()).dry_run(true);
        let files = orch.execute(&plan("post")).unwrap();
        assert_eq!(files.len(), 10);
        assert!(orch.file_system().files().is_empty());
    }

    #[test]
    fn test_unresolved_variable_from_override() {
        let mut templates = MockTemplateSource::new();
        templates.expect_resolve().returning(|id| match id {
            "model" => Ok(Template::new("model", 2, "{{nonexistent}}")),
            other => EmbeddedTemplates.resolve(other),
        });
        let mut orch = Orchestrator::new(MemoryFileSystem::new(), Box::new(templates));
        let err = orch.execute(&plan("post")).unwrap_err();
        assert!(matches!(err, Error::UnresolvedVariable { ref name, .. } if name == "nonexistent"));
        assert!(orch.file_system().files().is_empty());
    }
}
