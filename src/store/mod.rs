//! Project Storage
//!
//! A hierarchical, key-addressable file store. Handles are paths relative to
//! the store root; the store decides what they map to.
//!
//! Every operation is a suspension point. Writes replace the whole file and
//! are flushed before the future resolves.

mod fs;
mod memory;

use std::path::{Path, PathBuf};

use crate::error::{AtlasError, Result};

pub use fs::FsStore;
pub use memory::MemoryStore;

/// Handle to a directory inside a store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DirHandle {
    path: PathBuf,
}

impl DirHandle {
    /// The store root.
    pub fn root() -> Self {
        Self {
            path: PathBuf::new(),
        }
    }

    /// Path relative to the store root.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Handle for a direct child of this directory.
    pub(crate) fn join(&self, name: &str) -> Result<PathBuf> {
        validate_entry_name(name)?;
        Ok(self.path.join(name))
    }
}

/// Handle to a file inside a store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileHandle {
    path: PathBuf,
}

impl FileHandle {
    pub(crate) fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Path relative to the store root.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name including extension, e.g. `redDot.json`.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// File name without its extension, e.g. `redDot`.
    pub fn stem(&self) -> String {
        self.path
            .file_stem()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Extension without the leading dot.
    pub fn extension(&self) -> Option<String> {
        self.path
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
    }
}

/// Storage collaborator used by the project loader.
///
/// Implementations are driven from a single task; futures are not required
/// to be `Send`.
#[allow(async_fn_in_trait)]
pub trait ProjectStore {
    /// The directory the project lives in.
    fn root(&self) -> DirHandle;

    /// Get or create the named child directory.
    async fn child_dir(&self, parent: &DirHandle, name: &str) -> Result<DirHandle>;

    /// Files directly inside `dir`, sorted by path.
    async fn list_files(&self, dir: &DirHandle) -> Result<Vec<FileHandle>>;

    /// Get or create (empty) the named child file.
    async fn child_file(&self, dir: &DirHandle, name: &str) -> Result<FileHandle>;

    /// Read the full text of a file.
    async fn read_text(&self, file: &FileHandle) -> Result<String>;

    /// Replace the full contents of a file.
    async fn write_text(&self, file: &FileHandle, text: &str) -> Result<()>;
}

/// Rejects names that would escape the parent directory.
pub(crate) fn validate_entry_name(name: &str) -> Result<()> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains('/')
        || name.contains('\\')
        || name.contains('\0');
    if invalid {
        return Err(AtlasError::InvalidFileName {
            name: name.to_string(),
        });
    }
    Ok(())
}
