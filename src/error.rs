//! Error handling for Atlas
//!
//! Every error that concerns a particular asset carries the offending file
//! name, and reference failures carry the missing reference name.

use std::path::PathBuf;

use thiserror::Error;

use crate::project::LoadStage;

/// Result type alias for Atlas operations
pub type Result<T> = std::result::Result<T, AtlasError>;

/// Main error type for Atlas operations
#[derive(Error, Debug)]
pub enum AtlasError {
    // Asset Errors
    #[error("Malformed asset {file}: {source}")]
    MalformedAsset {
        file: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Unsupported symbol type `{symbol_type}` in {file}")]
    UnsupportedSymbolType { file: String, symbol_type: String },

    #[error("Unresolved symbol reference `{symbol}` at {pointer} in {file}")]
    UnresolvedSymbolReference {
        file: String,
        symbol: String,
        pointer: String,
    },

    #[error("Unsupported renderer type `{renderer_type}` in {file}")]
    UnsupportedRendererType { file: String, renderer_type: String },

    #[error("Malformed feature set {file}: {reason}")]
    MalformedFeatureSet { file: String, reason: String },

    // Pipeline Errors
    #[error("Cannot load {stage} before {missing} have finished loading")]
    LoadOrderViolation { stage: LoadStage, missing: LoadStage },

    // Layer Errors
    #[error("Editing is disabled for layer {layer}")]
    EditingDisabled { layer: String },

    #[error("Layer not found: {name}")]
    LayerNotFound { name: String },

    // Storage Errors
    #[error("Storage error at {path}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid file name: `{name}`")]
    InvalidFileName { name: String },

    // Configuration Errors
    #[error("Invalid configuration: {reason}")]
    Config { reason: String },

    // Serialization Errors
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AtlasError {
    /// Build a storage error for `path`.
    pub fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        AtlasError::Storage {
            path: path.into(),
            source,
        }
    }

    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            AtlasError::MalformedAsset { .. } => "MALFORMED_ASSET",
            AtlasError::UnsupportedSymbolType { .. } => "UNSUPPORTED_SYMBOL_TYPE",
            AtlasError::UnresolvedSymbolReference { .. } => "UNRESOLVED_SYMBOL_REFERENCE",
            AtlasError::UnsupportedRendererType { .. } => "UNSUPPORTED_RENDERER_TYPE",
            AtlasError::MalformedFeatureSet { .. } => "MALFORMED_FEATURE_SET",
            AtlasError::LoadOrderViolation { .. } => "LOAD_ORDER_VIOLATION",
            AtlasError::EditingDisabled { .. } => "EDITING_DISABLED",
            AtlasError::LayerNotFound { .. } => "LAYER_NOT_FOUND",
            AtlasError::Storage { .. } => "STORAGE_ERROR",
            AtlasError::InvalidFileName { .. } => "INVALID_FILE_NAME",
            AtlasError::Config { .. } => "CONFIG_ERROR",
            AtlasError::Json(_) => "SERIALIZATION_ERROR",
        }
    }

    /// The asset file this error is about, when there is one.
    pub fn file(&self) -> Option<&str> {
        match self {
            AtlasError::MalformedAsset { file, .. }
            | AtlasError::UnsupportedSymbolType { file, .. }
            | AtlasError::UnresolvedSymbolReference { file, .. }
            | AtlasError::UnsupportedRendererType { file, .. }
            | AtlasError::MalformedFeatureSet { file, .. } => Some(file),
            _ => None,
        }
    }

    /// Returns a user-friendly recovery suggestion.
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            AtlasError::MalformedAsset { .. } => Some("Check the file is a single valid JSON object."),
            AtlasError::UnsupportedSymbolType { .. } => Some(
                "Use one of: simple-marker, simple-line, simple-fill, picture-marker, picture-fill, text.",
            ),
            AtlasError::UnresolvedSymbolReference { .. } => {
                Some("Add the missing symbol to the Symbols directory or fix the reference name.")
            }
            AtlasError::UnsupportedRendererType { .. } => {
                Some("Use one of: simple, unique-value, class-breaks, heatmap.")
            }
            AtlasError::MalformedFeatureSet { .. } => {
                Some("A feature set needs top-level `fields` and `features` arrays.")
            }
            AtlasError::EditingDisabled { .. } => {
                Some("Set `editingEnabled` to true in the layer file.")
            }
            _ => None,
        }
    }
}
