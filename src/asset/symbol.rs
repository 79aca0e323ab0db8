//! Symbol assets.

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use super::record::AssetRecord;
use crate::error::Result;
use crate::model::symbol::{decode_symbol, SymbolDefinition};
use crate::project::LoadStage;
use crate::registry::ProjectRegistry;
use crate::store::{FileHandle, ProjectStore};

/// A loaded symbol file. Immutable once constructed.
#[derive(Debug, Clone)]
pub struct SymbolAsset {
    record: AssetRecord,
    symbol: Arc<SymbolDefinition>,
    serialized: Value,
}

impl SymbolAsset {
    /// Decode the record's JSON into a symbol.
    ///
    /// # Errors
    /// - `UnsupportedSymbolType` when the `type` discriminator is unknown.
    /// - `MalformedAsset` when a known kind has invalid properties.
    pub fn new(record: AssetRecord) -> Result<Self> {
        let symbol = decode_symbol(&record.file_name(), record.json())?;
        let serialized = serde_json::to_value(&symbol)?;
        Ok(Self {
            record,
            symbol: Arc::new(symbol),
            serialized,
        })
    }

    pub fn name(&self) -> &str {
        self.record.name()
    }

    pub fn record(&self) -> &AssetRecord {
        &self.record
    }

    pub fn symbol(&self) -> &Arc<SymbolDefinition> {
        &self.symbol
    }

    /// Serialized form substituted into renderers that reference this symbol.
    pub fn to_json(&self) -> &Value {
        &self.serialized
    }
}

/// Read, decode and register a symbol file.
pub async fn load_symbol<S: ProjectStore>(
    store: &S,
    handle: &FileHandle,
    registry: &mut ProjectRegistry,
) -> Result<Arc<SymbolAsset>> {
    registry.require_stages(LoadStage::Symbols)?;

    let record = AssetRecord::load(store, handle).await?;
    let asset = Arc::new(SymbolAsset::new(record)?);
    debug!(
        asset = asset.name(),
        kind = asset.symbol().kind().type_name(),
        "loaded symbol"
    );

    registry.insert_symbol(Arc::clone(&asset));
    Ok(asset)
}
