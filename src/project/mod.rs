//! Project Loader
//!
//! Connects to a project directory, creates the four asset directories when
//! they are missing, and loads every asset file stage by stage. Once
//! connected, the project owns the store, the registry and the combined
//! extent of its layers.

mod stage;

use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::asset::{load_asset, AssetKind, LayerAsset, LoadedAsset};
use crate::config::ProjectConfig;
use crate::error::{AtlasError, Result};
use crate::live::{EditResult, LayerEdits};
use crate::model::geometry::Extent;
use crate::registry::ProjectRegistry;
use crate::store::{DirHandle, ProjectStore};

pub use stage::LoadStage;

/// Counts and fingerprint of a loaded project.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSummary {
    pub symbols: usize,
    pub renderers: usize,
    pub feature_sets: usize,
    pub layers: usize,
    /// Features across every live layer.
    pub features: usize,
    pub extent: Option<Extent>,
    pub fingerprint: String,
}

/// A connected project.
#[derive(Debug)]
pub struct Project<S: ProjectStore> {
    store: S,
    config: ProjectConfig,
    dirs: BTreeMap<LoadStage, DirHandle>,
    registry: ProjectRegistry,
    extent: Option<Extent>,
}

impl<S: ProjectStore> Project<S> {
    /// Open the project in `store` and load every asset.
    ///
    /// # Errors
    /// Any storage, parse, decode or resolution failure aborts the whole
    /// connect; nothing partially loaded is returned.
    pub async fn connect(store: S, config: ProjectConfig) -> Result<Self> {
        config.validate()?;

        let root = store.root();
        let mut dirs = BTreeMap::new();
        for stage in LoadStage::ALL {
            let dir = store.child_dir(&root, config.directory(stage)).await?;
            dirs.insert(stage, dir);
        }

        let mut project = Self {
            store,
            config,
            dirs,
            registry: ProjectRegistry::new(),
            extent: None,
        };

        for stage in LoadStage::ALL {
            project.load_stage(stage).await?;
        }
        project.refresh_extent();

        info!(
            symbols = project.registry.symbol_count(),
            renderers = project.registry.renderer_count(),
            feature_sets = project.registry.feature_set_count(),
            layers = project.registry.layer_count(),
            "project loaded"
        );
        Ok(project)
    }

    async fn load_stage(&mut self, stage: LoadStage) -> Result<()> {
        let dir = &self.dirs[&stage];
        let files = self.store.list_files(dir).await?;
        debug!(%stage, dir = %dir.path().display(), entries = files.len(), "loading stage");

        let mut loaded = 0;
        for file in &files {
            if !self.config.is_asset_file(file) {
                debug!(%stage, file = %file.file_name(), "skipping non-asset file");
                continue;
            }
            load_asset(stage.kind(), &self.store, file, &mut self.registry, &self.config).await?;
            loaded += 1;
        }

        self.registry.mark_complete(stage);
        info!(%stage, loaded, "stage complete");
        Ok(())
    }

    /// Copy an external file into the project and load it.
    ///
    /// The text is copied verbatim; the file keeps its name.
    pub async fn add_asset(&mut self, kind: AssetKind, source: &Path) -> Result<LoadedAsset> {
        let file_name = source
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| AtlasError::InvalidFileName {
                name: source.display().to_string(),
            })?
            .to_string();
        let raw_text = tokio::fs::read_to_string(source)
            .await
            .map_err(|e| AtlasError::storage(source, e))?;

        self.import_asset(kind, &file_name, &raw_text).await
    }

    /// Write `raw_text` as `file_name` into the directory for `kind` and load it.
    ///
    /// An existing file with the same name is overwritten.
    pub async fn import_asset(
        &mut self,
        kind: AssetKind,
        file_name: &str,
        raw_text: &str,
    ) -> Result<LoadedAsset> {
        let extension = Path::new(file_name).extension().and_then(|e| e.to_str());
        if file_name.starts_with('.') || extension != Some(self.config.asset_extension.as_str()) {
            return Err(AtlasError::InvalidFileName {
                name: file_name.to_string(),
            });
        }

        let dir = &self.dirs[&kind.stage()];
        let exists = self
            .store
            .list_files(dir)
            .await?
            .iter()
            .any(|f| f.file_name() == file_name);
        if exists {
            warn!(%kind, file = file_name, "overwriting existing asset file");
        }

        let handle = self.store.child_file(dir, file_name).await?;
        self.store.write_text(&handle, raw_text).await?;
        let loaded = load_asset(kind, &self.store, &handle, &mut self.registry, &self.config).await?;

        if kind == AssetKind::Layer {
            self.refresh_extent();
        }
        info!(%kind, asset = loaded.name(), "asset added");
        Ok(loaded)
    }

    /// Apply edits to a layer and write them back to its feature set.
    pub async fn apply_edits(&mut self, layer: &str, edits: LayerEdits) -> Result<EditResult> {
        let target = self
            .registry
            .layer_mut(layer)
            .ok_or_else(|| AtlasError::LayerNotFound {
                name: layer.to_string(),
            })?;
        let result = target.apply_edits(edits, &self.store).await?;
        self.refresh_extent();
        Ok(result)
    }

    fn refresh_extent(&mut self) {
        self.extent = Extent::union_all(self.registry.layers().filter_map(|l| l.live().extent()));
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &ProjectConfig {
        &self.config
    }

    pub fn registry(&self) -> &ProjectRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut ProjectRegistry {
        &mut self.registry
    }

    /// Directory a stage reads from.
    pub fn directory(&self, stage: LoadStage) -> &DirHandle {
        &self.dirs[&stage]
    }

    pub fn layer(&self, name: &str) -> Option<&LayerAsset> {
        self.registry.layer(name)
    }

    /// Combined extent of every layer's live features.
    pub fn extent(&self) -> Option<Extent> {
        self.extent
    }

    pub async fn summary(&self) -> Result<ProjectSummary> {
        Ok(ProjectSummary {
            symbols: self.registry.symbol_count(),
            renderers: self.registry.renderer_count(),
            feature_sets: self.registry.feature_set_count(),
            layers: self.registry.layer_count(),
            features: self.registry.layers().map(|l| l.live().len()).sum(),
            extent: self.extent,
            fingerprint: self.fingerprint().await?,
        })
    }

    /// SHA-256 over every asset's name and domain object, in name order.
    ///
    /// Loading the same files twice yields the same fingerprint.
    pub async fn fingerprint(&self) -> Result<String> {
        let mut hasher = Sha256::new();
        let mut entry = |kind: AssetKind, name: &str, body: String| {
            hasher.update(kind.as_str().as_bytes());
            hasher.update([0]);
            hasher.update(name.as_bytes());
            hasher.update([0]);
            hasher.update(body.as_bytes());
            hasher.update([0]);
        };

        for symbol in self.registry.symbols() {
            entry(AssetKind::Symbol, symbol.name(), serde_json::to_string(symbol.to_json())?);
        }
        for renderer in self.registry.renderers() {
            entry(
                AssetKind::Renderer,
                renderer.name(),
                serde_json::to_string(renderer.renderer().as_ref())?,
            );
        }
        for (name, shared) in self.registry.feature_sets() {
            let body = serde_json::to_string(shared.lock().await.collection())?;
            entry(AssetKind::FeatureSet, name, body);
        }
        for layer in self.registry.layers() {
            let body = serde_json::to_string(&(layer.definition(), layer.live().query_features()))?;
            entry(AssetKind::Layer, layer.name(), body);
        }

        Ok(format!("{:x}", hasher.finalize()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Feature, Geometry};
    use crate::store::MemoryStore;
    use approx::assert_relative_eq;

    fn sample_store() -> MemoryStore {
        MemoryStore::with_files([
            ("Symbols/redDot.json", r#"{"type": "simple-marker", "color": "red"}"#),
            ("Renderers/simple.json", r#"{"type": "simple", "symbol": "redDot"}"#),
            (
                "Features/points.json",
                r#"{"fields": [{"name": "OBJECTID", "type": "esriFieldTypeOID"}],
                    "features": [{"attributes": {"OBJECTID": 1}, "geometry": {"x": 1.0, "y": 2.0}}]}"#,
            ),
            ("Layers/points.json", r#"{"featureSet": "points", "renderer": "simple"}"#),
            ("Layers/notes.txt", "not an asset"),
        ])
    }

    #[tokio::test]
    async fn test_connect_creates_missing_directories() {
        let store = MemoryStore::new();
        let project = Project::connect(store, ProjectConfig::default()).await.unwrap();

        for stage in LoadStage::ALL {
            assert!(project.store().has_dir(stage.default_directory()));
            assert!(project.registry().is_complete(stage));
        }
        assert_eq!(project.registry().layer_count(), 0);
        assert!(project.extent().is_none());
    }

    #[tokio::test]
    async fn test_connect_loads_every_stage() {
        let project = Project::connect(sample_store(), ProjectConfig::default())
            .await
            .unwrap();

        let layer = project.layer("points").unwrap();
        assert!(layer.renderer().is_some());
        assert_eq!(layer.live().len(), 1);

        let extent = project.extent().unwrap();
        assert_relative_eq!(extent.xmin, 1.0);
        assert_relative_eq!(extent.ymax, 2.0);
    }

    #[tokio::test]
    async fn test_apply_edits_unknown_layer() {
        let mut project = Project::connect(sample_store(), ProjectConfig::default())
            .await
            .unwrap();
        let err = project
            .apply_edits("ghost", LayerEdits::default())
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "LAYER_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_apply_edits_grows_extent() {
        let mut project = Project::connect(sample_store(), ProjectConfig::default())
            .await
            .unwrap();

        project
            .apply_edits(
                "points",
                LayerEdits::add(Feature::new(Some(Geometry::point(9.0, -3.0)))),
            )
            .await
            .unwrap();

        let extent = project.extent().unwrap();
        assert_relative_eq!(extent.xmax, 9.0);
        assert_relative_eq!(extent.ymin, -3.0);
    }

    #[tokio::test]
    async fn test_import_rejects_wrong_extension() {
        let mut project = Project::connect(MemoryStore::new(), ProjectConfig::default())
            .await
            .unwrap();
        let err = project
            .import_asset(AssetKind::Symbol, "dot.txt", "{}")
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "INVALID_FILE_NAME");
    }

    #[tokio::test]
    async fn test_summary_counts() {
        let project = Project::connect(sample_store(), ProjectConfig::default())
            .await
            .unwrap();
        let summary = project.summary().await.unwrap();

        assert_eq!(
            (summary.symbols, summary.renderers, summary.feature_sets, summary.layers),
            (1, 1, 1, 1)
        );
        assert_eq!(summary.features, 1);
        assert_eq!(summary.fingerprint.len(), 64);
    }
}
