//! Renderer assets.

use std::sync::Arc;

use tracing::debug;

use super::record::AssetRecord;
use crate::error::Result;
use crate::model::renderer::{decode_renderer, RendererDefinition};
use crate::project::LoadStage;
use crate::registry::ProjectRegistry;
use crate::resolve::{substitute_symbols, Substitution, SymbolSource};
use crate::store::{FileHandle, ProjectStore};

/// A loaded renderer file with its symbol references resolved.
///
/// `record().json()` holds the substituted tree; `record().raw_text()` is
/// the file as stored, with references still by name.
#[derive(Debug, Clone)]
pub struct RendererAsset {
    record: AssetRecord,
    renderer: Arc<RendererDefinition>,
    substitutions: Vec<Substitution>,
}

impl RendererAsset {
    /// Resolve symbol references against `symbols`, then decode.
    ///
    /// # Errors
    /// - `UnresolvedSymbolReference` when a referenced symbol is not loaded.
    /// - `UnsupportedRendererType` when the `type` discriminator is unknown.
    /// - `MalformedAsset` when a known kind has invalid properties.
    pub fn new<S: SymbolSource + ?Sized>(mut record: AssetRecord, symbols: &S) -> Result<Self> {
        let file = record.file_name();
        let mut tree = record.json().clone();
        let substitutions = substitute_symbols(&mut tree, &file, symbols)?;
        let renderer = decode_renderer(&file, &tree)?;
        record.set_json(tree);

        Ok(Self {
            record,
            renderer: Arc::new(renderer),
            substitutions,
        })
    }

    pub fn name(&self) -> &str {
        self.record.name()
    }

    pub fn record(&self) -> &AssetRecord {
        &self.record
    }

    pub fn renderer(&self) -> &Arc<RendererDefinition> {
        &self.renderer
    }

    /// References that were substituted, sorted by JSON pointer.
    pub fn substitutions(&self) -> &[Substitution] {
        &self.substitutions
    }
}

/// Read, resolve, decode and register a renderer file.
///
/// Nothing is registered when resolution or decoding fails.
pub async fn load_renderer<S: ProjectStore>(
    store: &S,
    handle: &FileHandle,
    registry: &mut ProjectRegistry,
) -> Result<Arc<RendererAsset>> {
    registry.require_stages(LoadStage::Renderers)?;

    let record = AssetRecord::load(store, handle).await?;
    let asset = Arc::new(RendererAsset::new(record, &*registry)?);
    debug!(
        asset = asset.name(),
        kind = asset.renderer().kind().type_name(),
        references = asset.substitutions().len(),
        "loaded renderer"
    );

    registry.insert_renderer(Arc::clone(&asset));
    Ok(asset)
}
