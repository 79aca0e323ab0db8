//! Project assets
//!
//! Each asset kind is built in two phases: a synchronous constructor that
//! takes an already-read [`AssetRecord`] plus already-resolved dependencies
//! and establishes the kind's invariants, and a free async `load_*`
//! function that does the I/O, resolves names against the registry, calls
//! the constructor, and registers the result.

pub mod feature_set;
pub mod layer;
pub mod record;
pub mod renderer;
pub mod symbol;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::config::ProjectConfig;
use crate::error::Result;
use crate::project::LoadStage;
use crate::registry::{ProjectRegistry, SharedFeatureSet};
use crate::store::{FileHandle, ProjectStore};

pub use feature_set::{load_feature_set, FeatureSetAsset};
pub use layer::{load_layer, LayerAsset, LayerDefinition, LayerSources};
pub use record::AssetRecord;
pub use renderer::{load_renderer, RendererAsset};
pub use symbol::{load_symbol, SymbolAsset};

/// The four kinds of asset a project holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AssetKind {
    Symbol,
    Renderer,
    FeatureSet,
    Layer,
}

impl AssetKind {
    pub const ALL: [AssetKind; 4] = [
        AssetKind::Symbol,
        AssetKind::Renderer,
        AssetKind::FeatureSet,
        AssetKind::Layer,
    ];

    /// Pipeline stage that loads this kind.
    pub fn stage(&self) -> LoadStage {
        match self {
            AssetKind::Symbol => LoadStage::Symbols,
            AssetKind::Renderer => LoadStage::Renderers,
            AssetKind::FeatureSet => LoadStage::FeatureSets,
            AssetKind::Layer => LoadStage::Layers,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AssetKind::Symbol => "symbol",
            AssetKind::Renderer => "renderer",
            AssetKind::FeatureSet => "feature-set",
            AssetKind::Layer => "layer",
        }
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssetKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "symbol" | "symbols" => Ok(AssetKind::Symbol),
            "renderer" | "renderers" => Ok(AssetKind::Renderer),
            "feature-set" | "featureset" | "feature" | "features" => Ok(AssetKind::FeatureSet),
            "layer" | "layers" => Ok(AssetKind::Layer),
            other => Err(format!(
                "unknown asset kind `{}`; expected symbol|renderer|feature-set|layer",
                other
            )),
        }
    }
}

/// An asset produced by one of the loaders.
#[derive(Debug, Clone)]
pub enum LoadedAsset {
    Symbol(Arc<SymbolAsset>),
    Renderer(Arc<RendererAsset>),
    FeatureSet {
        name: String,
        asset: SharedFeatureSet,
    },
    /// Layers stay owned by the registry; look them up by name.
    Layer {
        name: String,
    },
}

impl LoadedAsset {
    pub fn kind(&self) -> AssetKind {
        match self {
            LoadedAsset::Symbol(_) => AssetKind::Symbol,
            LoadedAsset::Renderer(_) => AssetKind::Renderer,
            LoadedAsset::FeatureSet { .. } => AssetKind::FeatureSet,
            LoadedAsset::Layer { .. } => AssetKind::Layer,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            LoadedAsset::Symbol(asset) => asset.name(),
            LoadedAsset::Renderer(asset) => asset.name(),
            LoadedAsset::FeatureSet { name, .. } | LoadedAsset::Layer { name } => name,
        }
    }
}

/// Load one file as an asset of `kind` and register it.
pub async fn load_asset<S: ProjectStore>(
    kind: AssetKind,
    store: &S,
    handle: &FileHandle,
    registry: &mut ProjectRegistry,
    config: &ProjectConfig,
) -> Result<LoadedAsset> {
    match kind {
        AssetKind::Symbol => load_symbol(store, handle, registry)
            .await
            .map(LoadedAsset::Symbol),
        AssetKind::Renderer => load_renderer(store, handle, registry)
            .await
            .map(LoadedAsset::Renderer),
        AssetKind::FeatureSet => {
            let asset = load_feature_set(store, handle, registry).await?;
            Ok(LoadedAsset::FeatureSet {
                name: handle.stem(),
                asset,
            })
        }
        AssetKind::Layer => load_layer(store, handle, registry, config)
            .await
            .map(|name| LoadedAsset::Layer { name }),
    }
}
