//! Filesystem-backed project store.

use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;
use tracing::debug;
use uuid::Uuid;
use walkdir::WalkDir;

use super::{DirHandle, FileHandle, ProjectStore};
use crate::error::{AtlasError, Result};

/// Project store rooted at a directory on the local filesystem.
///
/// Writes go to a temporary sibling first and are renamed over the target,
/// so a reader never observes a half-written asset.
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    /// Open (creating if needed) a store rooted at `root`.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root)
            .await
            .map_err(|e| AtlasError::storage(&root, e))?;
        Ok(Self { root })
    }

    /// Absolute path of the store root.
    pub fn root_path(&self) -> &Path {
        &self.root
    }

    /// Absolute path for a store-relative path.
    pub fn absolute(&self, relative: &Path) -> PathBuf {
        self.root.join(relative)
    }

    fn temp_path_for(target: &Path) -> PathBuf {
        let file_name = target
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        target.with_file_name(format!(".{}.{}.tmp", file_name, Uuid::new_v4().simple()))
    }

    async fn write_replacing(target: &Path, text: &str) -> std::io::Result<()> {
        let temp = Self::temp_path_for(target);
        let written = async {
            let mut file = tokio::fs::File::create(&temp).await?;
            file.write_all(text.as_bytes()).await?;
            file.flush().await?;
            file.sync_all().await?;
            drop(file);
            tokio::fs::rename(&temp, target).await
        }
        .await;

        if written.is_err() {
            let _ = tokio::fs::remove_file(&temp).await;
        }
        written
    }
}

impl ProjectStore for FsStore {
    fn root(&self) -> DirHandle {
        DirHandle::root()
    }

    async fn child_dir(&self, parent: &DirHandle, name: &str) -> Result<DirHandle> {
        let relative = parent.join(name)?;
        let absolute = self.absolute(&relative);
        tokio::fs::create_dir_all(&absolute)
            .await
            .map_err(|e| AtlasError::storage(&absolute, e))?;
        Ok(DirHandle { path: relative })
    }

    async fn list_files(&self, dir: &DirHandle) -> Result<Vec<FileHandle>> {
        let absolute = self.absolute(dir.path());
        let relative_dir = dir.path().to_path_buf();

        let listing = {
            let walk_root = absolute.clone();
            tokio::task::spawn_blocking(move || -> std::io::Result<Vec<PathBuf>> {
                let mut names = Vec::new();
                for entry in WalkDir::new(&walk_root).min_depth(1).max_depth(1) {
                    let entry = entry.map_err(std::io::Error::from)?;
                    if entry.file_type().is_file() {
                        names.push(PathBuf::from(entry.file_name()));
                    }
                }
                Ok(names)
            })
            .await
            .map_err(|e| AtlasError::storage(&absolute, std::io::Error::other(e)))?
        };

        let mut files: Vec<FileHandle> = listing
            .map_err(|e| AtlasError::storage(&absolute, e))?
            .into_iter()
            .map(|name| FileHandle::new(relative_dir.join(name)))
            .collect();
        files.sort();

        debug!(dir = %absolute.display(), count = files.len(), "listed directory");
        Ok(files)
    }

    async fn child_file(&self, dir: &DirHandle, name: &str) -> Result<FileHandle> {
        let relative = dir.join(name)?;
        let absolute = self.absolute(&relative);
        tokio::fs::OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&absolute)
            .await
            .map_err(|e| AtlasError::storage(&absolute, e))?;
        Ok(FileHandle::new(relative))
    }

    async fn read_text(&self, file: &FileHandle) -> Result<String> {
        let absolute = self.absolute(file.path());
        tokio::fs::read_to_string(&absolute)
            .await
            .map_err(|e| AtlasError::storage(&absolute, e))
    }

    async fn write_text(&self, file: &FileHandle, text: &str) -> Result<()> {
        let absolute = self.absolute(file.path());
        Self::write_replacing(&absolute, text)
            .await
            .map_err(|e| AtlasError::storage(&absolute, e))?;
        debug!(file = %absolute.display(), bytes = text.len(), "wrote file");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_child_dir_creates_directory() {
        let temp = tempdir().unwrap();
        let store = FsStore::open(temp.path()).await.unwrap();

        let dir = store.child_dir(&store.root(), "Symbols").await.unwrap();

        assert_eq!(dir.path(), Path::new("Symbols"));
        assert!(temp.path().join("Symbols").is_dir());
    }

    #[tokio::test]
    async fn test_child_file_does_not_truncate() {
        let temp = tempdir().unwrap();
        std::fs::create_dir_all(temp.path().join("Layers")).unwrap();
        std::fs::write(temp.path().join("Layers").join("roads.json"), "{}").unwrap();
        let store = FsStore::open(temp.path()).await.unwrap();

        let dir = store.child_dir(&store.root(), "Layers").await.unwrap();
        let file = store.child_file(&dir, "roads.json").await.unwrap();

        assert_eq!(store.read_text(&file).await.unwrap(), "{}");
    }

    #[tokio::test]
    async fn test_write_replaces_contents_and_leaves_no_temp_files() {
        let temp = tempdir().unwrap();
        let store = FsStore::open(temp.path()).await.unwrap();
        let dir = store.child_dir(&store.root(), "Features").await.unwrap();
        let file = store.child_file(&dir, "parcels.json").await.unwrap();

        store.write_text(&file, "first version, long").await.unwrap();
        store.write_text(&file, "second").await.unwrap();

        assert_eq!(store.read_text(&file).await.unwrap(), "second");
        let listed = store.list_files(&dir).await.unwrap();
        assert_eq!(listed, vec![file]);
    }

    #[tokio::test]
    async fn test_list_files_skips_subdirectories_and_sorts() {
        let temp = tempdir().unwrap();
        let root = temp.path();
        std::fs::create_dir_all(root.join("Symbols").join("nested")).unwrap();
        std::fs::write(root.join("Symbols").join("b.json"), "{}").unwrap();
        std::fs::write(root.join("Symbols").join("a.json"), "{}").unwrap();
        std::fs::write(root.join("Symbols").join("nested").join("c.json"), "{}").unwrap();
        let store = FsStore::open(root).await.unwrap();

        let dir = store.child_dir(&store.root(), "Symbols").await.unwrap();
        let names: Vec<String> = store
            .list_files(&dir)
            .await
            .unwrap()
            .iter()
            .map(FileHandle::file_name)
            .collect();

        assert_eq!(names, vec!["a.json", "b.json"]);
    }

    #[tokio::test]
    async fn test_read_missing_file_is_storage_error() {
        let temp = tempdir().unwrap();
        let store = FsStore::open(temp.path()).await.unwrap();
        let missing = FileHandle::new(PathBuf::from("nope.json"));

        let err = store.read_text(&missing).await.unwrap_err();
        assert_eq!(err.error_code(), "STORAGE_ERROR");
    }

    #[tokio::test]
    async fn test_list_missing_directory_names_its_path() {
        let temp = tempdir().unwrap();
        let store = FsStore::open(temp.path()).await.unwrap();
        let dir = store.child_dir(&store.root(), "Layers").await.unwrap();
        std::fs::remove_dir(temp.path().join("Layers")).unwrap();

        match store.list_files(&dir).await.unwrap_err() {
            AtlasError::Storage { path, .. } => assert_eq!(path, temp.path().join("Layers")),
            other => panic!("unexpected error {:?}", other),
        }
    }
}
