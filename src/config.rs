//! Project configuration.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AtlasError, Result};
use crate::project::LoadStage;
use crate::store::FileHandle;

/// Default directory holding symbol files.
pub const SYMBOLS_DIR: &str = "Symbols";
/// Default directory holding renderer files.
pub const RENDERERS_DIR: &str = "Renderers";
/// Default directory holding feature-set files.
pub const FEATURES_DIR: &str = "Features";
/// Default directory holding layer files.
pub const LAYERS_DIR: &str = "Layers";

/// Settings that shape how a project directory is read and written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProjectConfig {
    pub symbols_dir: String,
    pub renderers_dir: String,
    pub features_dir: String,
    pub layers_dir: String,

    /// Only files with this extension are treated as assets.
    pub asset_extension: String,

    /// Pretty-print feature sets written back after edits.
    pub pretty_json: bool,

    /// Object id attribute used when a feature set does not name one.
    pub default_object_id_field: String,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            symbols_dir: SYMBOLS_DIR.to_string(),
            renderers_dir: RENDERERS_DIR.to_string(),
            features_dir: FEATURES_DIR.to_string(),
            layers_dir: LAYERS_DIR.to_string(),
            asset_extension: "json".to_string(),
            pretty_json: true,
            default_object_id_field: "OBJECTID".to_string(),
        }
    }
}

impl ProjectConfig {
    /// Load a configuration file. Missing keys take their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| AtlasError::storage(path, e))?;
        let config: ProjectConfig =
            serde_json::from_str(&content).map_err(|e| AtlasError::Config {
                reason: format!("{}: {}", path.display(), e),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the loader cannot work with.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for stage in LoadStage::ALL {
            let dir = self.directory(stage);
            if dir.trim().is_empty() {
                return Err(AtlasError::Config {
                    reason: format!("directory for {} cannot be empty", stage),
                });
            }
            if !seen.insert(dir) {
                return Err(AtlasError::Config {
                    reason: format!("directory `{}` is used by more than one asset kind", dir),
                });
            }
        }
        if self.asset_extension.trim().is_empty() {
            return Err(AtlasError::Config {
                reason: "asset extension cannot be empty".to_string(),
            });
        }
        if self.default_object_id_field.trim().is_empty() {
            return Err(AtlasError::Config {
                reason: "default object id field cannot be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Directory name a stage reads from.
    pub fn directory(&self, stage: LoadStage) -> &str {
        match stage {
            LoadStage::Symbols => &self.symbols_dir,
            LoadStage::Renderers => &self.renderers_dir,
            LoadStage::FeatureSets => &self.features_dir,
            LoadStage::Layers => &self.layers_dir,
        }
    }

    /// Whether a listed file should be loaded as an asset.
    pub fn is_asset_file(&self, file: &FileHandle) -> bool {
        let name = file.file_name();
        !name.starts_with('.') && file.extension().as_deref() == Some(self.asset_extension.as_str())
    }
}
