//! In-memory project store.

use std::collections::{BTreeMap, BTreeSet};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::{DirHandle, FileHandle, ProjectStore};
use crate::error::{AtlasError, Result};

#[derive(Debug, Default)]
struct MemoryState {
    dirs: BTreeSet<PathBuf>,
    files: BTreeMap<PathBuf, String>,
    fail_writes: bool,
    writes: usize,
}

/// Project store kept entirely in memory.
///
/// Used for tests and for driving the loader against synthetic projects.
/// Write failures can be injected with [`MemoryStore::set_fail_writes`].
#[derive(Debug)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        let mut state = MemoryState::default();
        state.dirs.insert(PathBuf::new());
        Self {
            state: Mutex::new(state),
        }
    }

    /// Create a store pre-populated with `(relative path, contents)` pairs.
    pub fn with_files<P, T, I>(files: I) -> Self
    where
        P: Into<PathBuf>,
        T: Into<String>,
        I: IntoIterator<Item = (P, T)>,
    {
        let store = Self::new();
        for (path, text) in files {
            store.insert(path, text);
        }
        store
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert or replace a file, creating its parent directories.
    pub fn insert(&self, path: impl Into<PathBuf>, text: impl Into<String>) {
        let path = path.into();
        let mut state = self.lock();
        let mut parent = path.parent();
        while let Some(dir) = parent {
            state.dirs.insert(dir.to_path_buf());
            parent = dir.parent();
        }
        state.files.insert(path, text.into());
    }

    /// Current contents of a file, if it exists.
    pub fn contents(&self, path: impl AsRef<Path>) -> Option<String> {
        self.lock().files.get(path.as_ref()).cloned()
    }

    /// Whether a directory exists.
    pub fn has_dir(&self, path: impl AsRef<Path>) -> bool {
        self.lock().dirs.contains(path.as_ref())
    }

    /// Make every subsequent write fail (or succeed again).
    pub fn set_fail_writes(&self, fail: bool) {
        self.lock().fail_writes = fail;
    }

    /// Number of successful writes so far.
    pub fn write_count(&self) -> usize {
        self.lock().writes
    }
}

fn not_found(path: &Path) -> AtlasError {
    AtlasError::storage(
        path,
        std::io::Error::new(ErrorKind::NotFound, "no such entry"),
    )
}

impl ProjectStore for MemoryStore {
    fn root(&self) -> DirHandle {
        DirHandle::root()
    }

    async fn child_dir(&self, parent: &DirHandle, name: &str) -> Result<DirHandle> {
        let path = parent.join(name)?;
        let mut state = self.lock();
        if !state.dirs.contains(parent.path()) {
            return Err(not_found(parent.path()));
        }
        state.dirs.insert(path.clone());
        Ok(DirHandle { path })
    }

    async fn list_files(&self, dir: &DirHandle) -> Result<Vec<FileHandle>> {
        let state = self.lock();
        if !state.dirs.contains(dir.path()) {
            return Err(not_found(dir.path()));
        }
        Ok(state
            .files
            .keys()
            .filter(|path| path.parent() == Some(dir.path()))
            .map(|path| FileHandle::new(path.clone()))
            .collect())
    }

    async fn child_file(&self, dir: &DirHandle, name: &str) -> Result<FileHandle> {
        let path = dir.join(name)?;
        let mut state = self.lock();
        if !state.dirs.contains(dir.path()) {
            return Err(not_found(dir.path()));
        }
        state.files.entry(path.clone()).or_default();
        Ok(FileHandle::new(path))
    }

    async fn read_text(&self, file: &FileHandle) -> Result<String> {
        self.lock()
            .files
            .get(file.path())
            .cloned()
            .ok_or_else(|| not_found(file.path()))
    }

    async fn write_text(&self, file: &FileHandle, text: &str) -> Result<()> {
        let mut state = self.lock();
        if state.fail_writes {
            return Err(AtlasError::storage(
                file.path(),
                std::io::Error::other("injected write failure"),
            ));
        }
        let parent = file.path().parent().unwrap_or(Path::new(""));
        if !state.dirs.contains(parent) {
            return Err(not_found(parent));
        }
        state.files.insert(file.path().to_path_buf(), text.to_string());
        state.writes += 1;
        Ok(())
    }
}
