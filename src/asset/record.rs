//! Asset record: the part every asset kind shares.

use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::error::{AtlasError, Result};
use crate::store::{FileHandle, ProjectStore};

/// A JSON file read from project storage.
///
/// Holds the storage handle, the raw text as read, and the parsed JSON. The
/// domain object each asset kind derives from this lives next to the record
/// in the kind's own struct.
#[derive(Debug, Clone)]
pub struct AssetRecord {
    handle: FileHandle,
    name: String,
    raw_text: String,
    json: Value,
}

impl AssetRecord {
    /// Read and parse the file behind `handle`.
    ///
    /// Always reads from storage; nothing is cached between calls.
    pub async fn load<S: ProjectStore>(store: &S, handle: &FileHandle) -> Result<Self> {
        let raw_text = store.read_text(handle).await?;
        Self::from_text(handle.clone(), raw_text)
    }

    /// Parse already-read text.
    pub fn from_text(handle: FileHandle, raw_text: String) -> Result<Self> {
        let json = serde_json::from_str(&raw_text).map_err(|source| AtlasError::MalformedAsset {
            file: handle.file_name(),
            source,
        })?;
        Ok(Self {
            name: handle.stem(),
            handle,
            raw_text,
            json,
        })
    }

    pub fn handle(&self) -> &FileHandle {
        &self.handle
    }

    /// Asset name: the file name without extension.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn file_name(&self) -> String {
        self.handle.file_name()
    }

    pub fn raw_text(&self) -> &str {
        &self.raw_text
    }

    pub fn json(&self) -> &Value {
        &self.json
    }

    /// SHA-256 of the raw text, hex encoded.
    pub fn digest(&self) -> String {
        format!("{:x}", Sha256::digest(self.raw_text.as_bytes()))
    }

    /// Swap in a resolved JSON tree without touching the raw text.
    pub(crate) fn set_json(&mut self, json: Value) {
        self.json = json;
    }

    /// Replace text and JSON together.
    pub(crate) fn replace(&mut self, json: Value, raw_text: String) {
        self.json = json;
        self.raw_text = raw_text;
    }
}
