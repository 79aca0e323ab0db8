//! Load pipeline stages
//!
//! Assets reference each other by name, and a reference can only be
//! resolved against assets that are already loaded. The four stages below
//! therefore run strictly one after another, each one a barrier for the
//! next:
//!
//! ```text
//! Symbols ──► Renderers ──► FeatureSets ──► Layers
//!    (leaves)   (→ symbols)    (no refs)      (→ renderers, feature sets)
//! ```

use std::fmt;

use crate::asset::AssetKind;
use crate::config::{FEATURES_DIR, LAYERS_DIR, RENDERERS_DIR, SYMBOLS_DIR};

/// One stage of the project load pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LoadStage {
    Symbols,
    Renderers,
    FeatureSets,
    Layers,
}

impl LoadStage {
    /// Every stage, in execution order.
    pub const ALL: [LoadStage; 4] = [
        LoadStage::Symbols,
        LoadStage::Renderers,
        LoadStage::FeatureSets,
        LoadStage::Layers,
    ];

    /// Stages whose output this stage resolves references against.
    pub fn requires(&self) -> &'static [LoadStage] {
        match self {
            LoadStage::Symbols => &[],
            LoadStage::Renderers => &[LoadStage::Symbols],
            LoadStage::FeatureSets => &[],
            LoadStage::Layers => &[LoadStage::Renderers, LoadStage::FeatureSets],
        }
    }

    /// Asset kind produced by this stage.
    pub fn kind(&self) -> AssetKind {
        match self {
            LoadStage::Symbols => AssetKind::Symbol,
            LoadStage::Renderers => AssetKind::Renderer,
            LoadStage::FeatureSets => AssetKind::FeatureSet,
            LoadStage::Layers => AssetKind::Layer,
        }
    }

    /// Directory this stage reads from when the config does not override it.
    pub fn default_directory(&self) -> &'static str {
        match self {
            LoadStage::Symbols => SYMBOLS_DIR,
            LoadStage::Renderers => RENDERERS_DIR,
            LoadStage::FeatureSets => FEATURES_DIR,
            LoadStage::Layers => LAYERS_DIR,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LoadStage::Symbols => "symbols",
            LoadStage::Renderers => "renderers",
            LoadStage::FeatureSets => "feature sets",
            LoadStage::Layers => "layers",
        }
    }
}

impl fmt::Display for LoadStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
