//! Integration tests for plan execution against a real directory

use rigging::generate::{LocalFileSystem, MemoryFileSystem, Orchestrator};
use rigging::inflector::ResourceName;
use rigging::migrate::MigrationScript;
use rigging::plan::{ArtifactKind, ArtifactPlanner, FieldDeclaration, GenerationPlan, PlanContext};
use rigging::template::{DirectoryTemplates, EmbeddedTemplates};
use rigging::{Error, ErrorClass};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn plan(name: &str, specs: &[&str]) -> GenerationPlan {
    let fields: Vec<_> = specs
        .iter()
        .map(|s| FieldDeclaration::parse(s).unwrap())
        .collect();
    ArtifactPlanner::new(PlanContext::new("20250101120000"))
        .plan(&ResourceName::parse(name).unwrap(), &fields, &ArtifactKind::all())
        .unwrap()
}

/// Every file under `root`, keyed by relative path
fn snapshot(root: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
    fn walk(root: &Path, dir: &Path, out: &mut BTreeMap<PathBuf, Vec<u8>>) {
        for entry in fs::read_dir(dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                out.insert(path.strip_prefix(root).unwrap().to_path_buf(), Vec::new());
                walk(root, &path, out);
            } else {
                out.insert(
                    path.strip_prefix(root).unwrap().to_path_buf(),
                    fs::read(&path).unwrap(),
                );
            }
        }
    }
    let mut out = BTreeMap::new();
    walk(root, root, &mut out);
    out
}

#[test]
fn test_category_scaffold_on_disk() {
    let dir = TempDir::new().unwrap();
    let plan = plan("category", &["title:string:required"]);
    let mut orch = Orchestrator::new(LocalFileSystem::new(dir.path()), Box::new(EmbeddedTemplates));

    let files = orch.execute(&plan).unwrap();
    assert_eq!(files.len(), plan.len());

    let model = fs::read_to_string(dir.path().join("src/models/category.rs")).unwrap();
    assert!(model.contains("pub struct Category {"));
    assert!(model.contains("pub const TABLE: &'static str = \"categories\";"));

    let migration_path = dir
        .path()
        .join("migrations/20250101120000_create_categories.toml");
    let script = MigrationScript::load_file(&migration_path).unwrap();
    assert_eq!(Some(&script), plan.migration.as_ref());
    assert_eq!(script.up.len(), 1);
    assert!(script.up.iter().all(|op| op.name() != "AddColumn"));
}

#[test]
fn test_rerun_is_byte_identical() {
    let dir = TempDir::new().unwrap();
    let plan = plan("post", &["title:string:required", "body:text", "published:boolean"]);
    let mut orch = Orchestrator::new(LocalFileSystem::new(dir.path()), Box::new(EmbeddedTemplates));

    orch.execute(&plan).unwrap();
    let first = snapshot(dir.path());

    let files = orch.execute(&plan).unwrap();
    assert!(files.iter().all(|f| !f.changed));
    assert_eq!(snapshot(dir.path()), first);
}

#[test]
fn test_failure_at_each_artifact_restores_directory() {
    let plan = plan("comment", &["body:text:required", "post_id:bigint"]);
    let targets: Vec<PathBuf> = plan.target_paths().map(Path::to_path_buf).collect();

    for (k, target) in targets.iter().enumerate() {
        let seeded = MemoryFileSystem::new()
            .with_file("src/models/mod.rs", "// rigging:marker models\n")
            .with_file("README.md", "hello\n");
        let mut orch = Orchestrator::new(
            seeded.clone().fail_writes_to(target),
            Box::new(EmbeddedTemplates),
        );

        let err = orch.execute(&plan).unwrap_err();
        assert_eq!(err.class(), ErrorClass::Io, "artifact {k}");

        let after = orch.into_file_system();
        assert_eq!(after.files(), seeded.files(), "artifact {k}: {}", target.display());
        assert_eq!(after.dirs(), seeded.dirs(), "artifact {k}: {}", target.display());
    }
}

#[test]
fn test_conflict_leaves_disk_untouched() {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("tests")).unwrap();
    fs::write(dir.path().join("tests/post_test.rs"), "// mine\n").unwrap();
    let before = snapshot(dir.path());

    let mut orch = Orchestrator::new(LocalFileSystem::new(dir.path()), Box::new(EmbeddedTemplates));
    let err = orch.execute(&plan("post", &["title:string"])).unwrap_err();
    assert!(matches!(err, Error::Conflict { .. }));
    assert_eq!(snapshot(dir.path()), before);
}

#[test]
fn test_template_override_directory() {
    let project = TempDir::new().unwrap();
    let overrides = TempDir::new().unwrap();
    fs::write(
        overrides.path().join("test.hbs"),
        "{{!-- version: 2 --}}\n// @generated by rigging\n// custom test for {{storage_identifier}}\n",
    )
    .unwrap();

    let mut orch = Orchestrator::new(
        LocalFileSystem::new(project.path()),
        Box::new(DirectoryTemplates::new(overrides.path())),
    );
    orch.execute(&plan("post", &["title:string"])).unwrap();

    let test = fs::read_to_string(project.path().join("tests/post_test.rs")).unwrap();
    assert_eq!(test, "// @generated by rigging\n// custom test for posts\n");
    assert!(project.path().join("src/models/post.rs").exists());
}
