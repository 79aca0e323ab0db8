//! CLI Command Implementations
//!
//! Implements the actual logic for each CLI command.

use std::path::Path;

use serde_json::Value;
use tracing::info;

use crate::asset::{AssetKind, LoadedAsset};
use crate::config::ProjectConfig;
use crate::error::{AtlasError, Result};
use crate::live::LayerEdits;
use crate::model::{Feature, Geometry};
use crate::project::{LoadStage, Project};
use crate::store::FsStore;

/// Read the configuration file if one was given, else use the defaults.
pub fn load_config(path: Option<&Path>) -> Result<ProjectConfig> {
    match path {
        Some(path) => ProjectConfig::from_file(path),
        None => Ok(ProjectConfig::default()),
    }
}

async fn open(root: &Path, config: ProjectConfig) -> Result<Project<FsStore>> {
    let store = FsStore::open(root).await?;
    Project::connect(store, config).await
}

/// Create the asset directories of a project.
pub async fn init_project(root: &Path, config: ProjectConfig) -> Result<()> {
    info!("Initializing project at: {}", root.display());

    let project = open(root, config).await?;

    println!("Project ready: {}", root.display());
    for stage in LoadStage::ALL {
        println!("  {:<12} {}", stage.to_string(), project.directory(stage).path().display());
    }
    Ok(())
}

/// Load a project and print what it holds.
pub async fn load_project(root: &Path, config: ProjectConfig, json: bool) -> Result<()> {
    info!("Loading project: {}", root.display());

    let project = open(root, config).await?;
    let summary = project.summary().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("Project: {}", root.display());
    println!("{:-<60}", "");
    println!("Symbols:      {}", summary.symbols);
    println!("Renderers:    {}", summary.renderers);
    println!("Feature sets: {}", summary.feature_sets);
    println!("Layers:       {}", summary.layers);
    for layer in project.registry().layers() {
        let live = layer.live();
        println!(
            "  {:<24} {:>6} features{}{}",
            live.title(),
            live.len(),
            if live.renderer().is_some() { ", rendered" } else { "" },
            if live.editing_enabled() { "" } else { ", read-only" },
        );
    }
    match summary.extent {
        Some(e) => println!("Extent:       [{}, {}] - [{}, {}]", e.xmin, e.ymin, e.xmax, e.ymax),
        None => println!("Extent:       (empty)"),
    }
    println!("Fingerprint:  {}", summary.fingerprint);
    Ok(())
}

/// Copy an asset file into a project.
pub async fn add_asset(root: &Path, config: ProjectConfig, kind: AssetKind, file: &Path) -> Result<()> {
    info!("Adding {} from: {}", kind, file.display());

    let mut project = open(root, config).await?;
    let loaded = project.add_asset(kind, file).await?;

    match &loaded {
        LoadedAsset::Renderer(renderer) => println!(
            "Added renderer {} ({} symbol references resolved)",
            renderer.name(),
            renderer.substitutions().len()
        ),
        other => println!("Added {} {}", other.kind(), other.name()),
    }
    Ok(())
}

/// Add one point feature through a layer.
pub async fn add_feature(
    root: &Path,
    config: ProjectConfig,
    layer: &str,
    x: f64,
    y: f64,
    attributes: Vec<(String, Value)>,
) -> Result<()> {
    info!("Adding feature to layer {} at ({}, {})", layer, x, y);

    let mut project = open(root, config).await?;
    let has_source = project
        .layer(layer)
        .ok_or_else(|| AtlasError::LayerNotFound {
            name: layer.to_string(),
        })?
        .source_feature()
        .is_some();

    let feature = attributes
        .into_iter()
        .fold(Feature::new(Some(Geometry::point(x, y))), |f, (k, v)| {
            f.with_attribute(k, v)
        });
    let result = project.apply_edits(layer, LayerEdits::add(feature)).await?;

    for outcome in &result.add_results {
        match (&outcome.object_id, &outcome.error) {
            (Some(id), None) => println!("Added feature {}", id),
            (_, Some(error)) => println!("Rejected: {}", error),
            (None, None) => {}
        }
    }
    if !has_source {
        println!("Layer {} has no feature set; the edit was not saved", layer);
    }
    Ok(())
}
