//! File system abstraction
//!
//! Paths handed to a [`FileSystem`] are relative to the project root.

use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::{Path, PathBuf};

/// File operations the orchestrator needs
pub trait FileSystem {
    /// File contents, or `None` if the file does not exist
    fn read_to_string(&self, path: &Path) -> io::Result<Option<String>>;

    /// Whether `path` exists as a file or directory
    fn exists(&self, path: &Path) -> bool;

    /// Whether `path` is a directory
    fn is_dir(&self, path: &Path) -> bool;

    /// Create the missing ancestors of `path`, returning them outermost first
    fn create_parent_dirs(&mut self, path: &Path) -> io::Result<Vec<PathBuf>>;

    /// Write a whole file
    fn write(&mut self, path: &Path, content: &str) -> io::Result<()>;

    /// Delete a file
    fn remove_file(&mut self, path: &Path) -> io::Result<()>;

    /// Delete an empty directory
    fn remove_dir(&mut self, path: &Path) -> io::Result<()>;
}

fn missing_ancestors(path: &Path, exists: impl Fn(&Path) -> bool) -> Vec<PathBuf> {
    let mut missing: Vec<PathBuf> = path
        .parent()
        .into_iter()
        .flat_map(Path::ancestors)
        .filter(|dir| !dir.as_os_str().is_empty())
        .take_while(|dir| !exists(dir))
        .map(Path::to_path_buf)
        .collect();
    missing.reverse();
    missing
}

/// Create `dirs` in order; on failure remove the ones already created,
/// innermost first, and return the original error
fn create_dirs_or_undo(
    dirs: &[PathBuf],
    mut create: impl FnMut(&Path) -> io::Result<()>,
    mut remove: impl FnMut(&Path) -> io::Result<()>,
) -> io::Result<()> {
    for (done, dir) in dirs.iter().enumerate() {
        if let Err(e) = create(dir) {
            for created in dirs[..done].iter().rev() {
                if let Err(cleanup) = remove(created) {
                    tracing::warn!(
                        dir = %created.display(),
                        error = %cleanup,
                        "Could not remove directory"
                    );
                }
            }
            return Err(e);
        }
    }
    Ok(())
}

/// The real file system, rooted at a project directory
#[derive(Debug, Clone)]
pub struct LocalFileSystem {
    root: PathBuf,
}

impl LocalFileSystem {
    /// File system rooted at `root`
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Project root
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        self.root.join(path)
    }
}

impl FileSystem for LocalFileSystem {
    fn read_to_string(&self, path: &Path) -> io::Result<Option<String>> {
        match std::fs::read_to_string(self.resolve(path)) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn exists(&self, path: &Path) -> bool {
        self.resolve(path).exists()
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.resolve(path).is_dir()
    }

    fn create_parent_dirs(&mut self, path: &Path) -> io::Result<Vec<PathBuf>> {
        let missing = missing_ancestors(path, |dir| self.resolve(dir).exists());
        create_dirs_or_undo(
            &missing,
            |dir| std::fs::create_dir(self.resolve(dir)),
            |dir| std::fs::remove_dir(self.resolve(dir)),
        )?;
        Ok(missing)
    }

    fn write(&mut self, path: &Path, content: &str) -> io::Result<()> {
        std::fs::write(self.resolve(path), content)
    }

    fn remove_file(&mut self, path: &Path) -> io::Result<()> {
        std::fs::remove_file(self.resolve(path))
    }

    fn remove_dir(&mut self, path: &Path) -> io::Result<()> {
        std::fs::remove_dir(self.resolve(path))
    }
}

/// In-memory file system for tests and previews
///
/// Writes to the path set with [`MemoryFileSystem::fail_writes_to`] fail,
/// which exercises rollback.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryFileSystem {
    files: BTreeMap<PathBuf, String>,
    dirs: BTreeSet<PathBuf>,
    fail_on: Option<PathBuf>,
}

impl MemoryFileSystem {
    /// Empty file system
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file, creating its directories
    #[must_use]
    pub fn with_file(mut self, path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        let path = path.into();
        for dir in missing_ancestors(&path, |dir| self.dirs.contains(dir)) {
            self.dirs.insert(dir);
        }
        self.files.insert(path, content.into());
        self
    }

    /// Add a directory
    #[must_use]
    pub fn with_dir(mut self, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        for dir in path.ancestors().filter(|d| !d.as_os_str().is_empty()) {
            self.dirs.insert(dir.to_path_buf());
        }
        self
    }

    /// Make writes to `path` fail
    #[must_use]
    pub fn fail_writes_to(mut self, path: impl Into<PathBuf>) -> Self {
        self.fail_on = Some(path.into());
        self
    }

    /// Contents of a file
    #[must_use]
    pub fn file(&self, path: impl AsRef<Path>) -> Option<&str> {
        self.files.get(path.as_ref()).map(String::as_str)
    }

    /// Every file, by path
    #[must_use]
    pub const fn files(&self) -> &BTreeMap<PathBuf, String> {
        &self.files
    }

    /// Every directory
    #[must_use]
    pub const fn dirs(&self) -> &BTreeSet<PathBuf> {
        &self.dirs
    }
}

impl FileSystem for MemoryFileSystem {
    fn read_to_string(&self, path: &Path) -> io::Result<Option<String>> {
        Ok(self.files.get(path).cloned())
    }

    fn exists(&self, path: &Path) -> bool {
        self.files.contains_key(path) || self.dirs.contains(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.dirs.contains(path)
    }

    fn create_parent_dirs(&mut self, path: &Path) -> io::Result<Vec<PathBuf>> {
        let missing = missing_ancestors(path, |dir| self.exists(dir));
        if let Some(file) = missing
            .iter()
            .map(PathBuf::as_path)
            .chain(path.parent())
            .find(|dir| self.files.contains_key(*dir))
        {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("{} is a file", file.display()),
            ));
        }
        self.dirs.extend(missing.iter().cloned());
        Ok(missing)
    }

    fn write(&mut self, path: &Path, content: &str) -> io::Result<()> {
        if self.fail_on.as_deref() == Some(path) {
            return Err(io::Error::other(format!(
                "injected write failure for {}",
                path.display()
            )));
        }
        if self.dirs.contains(path) {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("{} is a directory", path.display()),
            ));
        }
        self.files.insert(path.to_path_buf(), content.to_string());
        Ok(())
    }

    fn remove_file(&mut self, path: &Path) -> io::Result<()> {
        self.files.remove(path).map(|_| ()).ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, path.display().to_string())
        })
    }

    fn remove_dir(&mut self, path: &Path) -> io::Result<()> {
        let occupied = self.files.keys().chain(self.dirs.iter()).any(|p| p.parent() == Some(path));
        if occupied {
            return Err(io::Error::other(format!("{} is not empty", path.display())));
        }
        if self.dirs.remove(path) {
            Ok(())
        } else {
            Err(io::Error::new(io::ErrorKind::NotFound, path.display().to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_parent_dirs_outermost_first() {
        let mut fs = MemoryFileSystem::new().with_dir("src");
        let created = fs
            .create_parent_dirs(Path::new("src/models/post.rs"))
            .unwrap();
        assert_eq!(created, [PathBuf::from("src/models")]);

        let created = fs
            .create_parent_dirs(Path::new("templates/posts/index.html"))
            .unwrap();
        assert_eq!(
            created,
            [PathBuf::from("templates"), PathBuf::from("templates/posts")]
        );
    }

    #[test]
    fn test_failed_dir_creation_removes_created_dirs() {
        let root = tempfile::tempdir().unwrap();
        let fs = LocalFileSystem::new(root.path());
        let dirs = [PathBuf::from("a"), PathBuf::from("a/b"), PathBuf::from("a/x/y")];

        let err = create_dirs_or_undo(
            &dirs,
            |dir| std::fs::create_dir(fs.resolve(dir)),
            |dir| std::fs::remove_dir(fs.resolve(dir)),
        )
        .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
        assert!(!root.path().join("a").exists());
    }

    #[test]
    fn test_memory_injected_failure() {
        let mut fs = MemoryFileSystem::new().fail_writes_to("a.txt");
        assert!(fs.write(Path::new("a.txt"), "x").is_err());
        assert!(fs.write(Path::new("b.txt"), "x").is_ok());
        assert_eq!(fs.file("b.txt"), Some("x"));
    }

    #[test]
    fn test_memory_remove_dir_requires_empty() {
        let mut fs = MemoryFileSystem::new().with_file("src/lib.rs", "");
        assert!(fs.remove_dir(Path::new("src")).is_err());
        fs.remove_file(Path::new("src/lib.rs")).unwrap();
        fs.remove_dir(Path::new("src")).unwrap();
        assert!(!fs.exists(Path::new("src")));
    }

    #[test]
    fn test_local_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut fs = LocalFileSystem::new(dir.path());
        let path = Path::new("src/models/post.rs");

        assert_eq!(fs.read_to_string(path).unwrap(), None);
        let created = fs.create_parent_dirs(path).unwrap();
        assert_eq!(created, [PathBuf::from("src"), PathBuf::from("src/models")]);
        fs.write(path, "pub struct Post;").unwrap();
        assert_eq!(fs.read_to_string(path).unwrap().as_deref(), Some("pub struct Post;"));
        assert!(fs.is_dir(Path::new("src/models")));

        fs.remove_file(path).unwrap();
        for dir in created.iter().rev() {
            fs.remove_dir(dir).unwrap();
        }
        assert!(!dir.path().join("src").exists());
    }
}
