//! Where file bytes come from and go to. The processor never touches the filesystem
//! itself; [`crate::project::Project`] reads and writes through a [`Persistence`].

use relative_path::{RelativePath, RelativePathBuf};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, SystemTime};

#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("File not found: {0}")]
    NotFound(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A file's bytes and the modification time they were read at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileContents {
    pub bytes: Vec<u8>,
    pub modified: SystemTime,
}

pub trait Persistence: Send + Sync {
    fn read(&self, path: &RelativePath) -> Result<FileContents, PersistError>;

    /// Writes `text` and returns the file's new modification time.
    fn write(&self, path: &RelativePath, text: &str) -> Result<SystemTime, PersistError>;
}

/// Files under a project root directory.
#[derive(Debug, Clone)]
pub struct FsPersistence {
    root: PathBuf,
}

impl FsPersistence {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Persistence for FsPersistence {
    fn read(&self, path: &RelativePath) -> Result<FileContents, PersistError> {
        let absolute_path = path.to_path(&self.root);
        if !absolute_path.exists() {
            return Err(PersistError::NotFound(absolute_path));
        }
        let bytes = fs::read(&absolute_path)?;
        let modified = fs::metadata(&absolute_path)?.modified()?;
        Ok(FileContents { bytes, modified })
    }

    fn write(&self, path: &RelativePath, text: &str) -> Result<SystemTime, PersistError> {
        let absolute_path = path.to_path(&self.root);

        // Create parent directories if they don't exist
        if let Some(parent) = absolute_path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(&absolute_path, text)?;
        Ok(fs::metadata(&absolute_path)?.modified()?)
    }
}

/// In-memory files with a logical clock, for tests and embedding.
///
/// Every write advances the clock by one second, so modification times are strictly
/// increasing regardless of the platform's timestamp resolution.
#[derive(Debug)]
pub struct MemoryPersistence {
    inner: Mutex<MemoryFiles>,
}

#[derive(Debug)]
struct MemoryFiles {
    files: HashMap<RelativePathBuf, FileContents>,
    clock: SystemTime,
    failing_writes: bool,
}

impl Default for MemoryPersistence {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(MemoryFiles {
                files: HashMap::new(),
                clock: SystemTime::UNIX_EPOCH + Duration::from_secs(1_000_000),
                failing_writes: false,
            }),
        }
    }

    fn files(&self) -> std::sync::MutexGuard<'_, MemoryFiles> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Stores `bytes` at the next clock tick, as if an outside editor wrote them.
    pub fn insert(&self, path: impl Into<RelativePathBuf>, bytes: impl Into<Vec<u8>>) -> SystemTime {
        let mut files = self.files();
        files.clock += Duration::from_secs(1);
        let modified = files.clock;
        files.files.insert(
            path.into(),
            FileContents {
                bytes: bytes.into(),
                modified,
            },
        );
        modified
    }

    pub fn text(&self, path: &RelativePath) -> Option<String> {
        let files = self.files();
        let contents = files.files.get(path)?;
        String::from_utf8(contents.bytes.clone()).ok()
    }

    /// Makes every following write fail with an I/O error.
    pub fn fail_writes(&self, failing: bool) {
        self.files().failing_writes = failing;
    }
}

impl Persistence for MemoryPersistence {
    fn read(&self, path: &RelativePath) -> Result<FileContents, PersistError> {
        self.files()
            .files
            .get(path)
            .cloned()
            .ok_or_else(|| PersistError::NotFound(PathBuf::from(path.as_str())))
    }

    fn write(&self, path: &RelativePath, text: &str) -> Result<SystemTime, PersistError> {
        if self.files().failing_writes {
            return Err(PersistError::Io(std::io::Error::other("write refused")));
        }
        Ok(self.insert(path.to_relative_path_buf(), text.as_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_read_file_not_found() {
        let root = TempDir::new().unwrap();
        let fs = FsPersistence::new(root.path());
        let result = fs.read(RelativePath::new("nonexistent.py"));
        assert!(matches!(result, Err(PersistError::NotFound(_))));
    }

    #[test]
    fn test_write_file_creates_parent_directories() {
        // Given an empty project root
        let root = TempDir::new().unwrap();
        let fs = FsPersistence::new(root.path());
        let path = RelativePath::new("src/pkg/mod.py");

        // When writing a nested file
        let written = fs.write(path, "# Doc\nx = 1\n").unwrap();

        // Then it reads back with the same bytes and modification time
        let contents = fs.read(path).unwrap();
        assert_eq!(contents.bytes, b"# Doc\nx = 1\n");
        assert_eq!(contents.modified, written);
        assert!(root.path().join("src").join("pkg").is_dir());
    }

    #[test]
    fn test_read_keeps_invalid_utf8() {
        let root = TempDir::new().unwrap();
        std::fs::write(root.path().join("bad.py"), [b'#', b' ', 0xff, b'\n']).unwrap();
        let contents = FsPersistence::new(root.path())
            .read(RelativePath::new("bad.py"))
            .unwrap();
        assert_eq!(contents.bytes, vec![b'#', b' ', 0xff, b'\n']);
    }

    #[test]
    fn test_memory_clock_advances_on_write() {
        let memory = MemoryPersistence::new();
        let first = memory.insert("a.md", "one");
        let second = memory.write(RelativePath::new("a.md"), "two").unwrap();
        assert!(second > first);
        assert_eq!(memory.text(RelativePath::new("a.md")).as_deref(), Some("two"));
    }

    #[test]
    fn test_memory_failing_writes() {
        let memory = MemoryPersistence::new();
        memory.fail_writes(true);
        assert!(memory.write(RelativePath::new("a.md"), "x").is_err());
        assert!(memory.read(RelativePath::new("a.md")).is_err());
    }
}
