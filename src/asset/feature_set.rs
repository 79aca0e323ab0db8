//! Feature-set assets.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::debug;

use super::record::AssetRecord;
use crate::error::Result;
use crate::model::feature::FeatureCollection;
use crate::project::LoadStage;
use crate::registry::{ProjectRegistry, SharedFeatureSet};
use crate::store::{FileHandle, ProjectStore};

/// A loaded feature-set file.
///
/// The only asset whose domain object changes after load: edits made through
/// a layer replace the whole collection, and with it the record's JSON and
/// text, via [`FeatureSetAsset::replace_collection`].
#[derive(Debug, Clone)]
pub struct FeatureSetAsset {
    record: AssetRecord,
    collection: FeatureCollection,
}

impl FeatureSetAsset {
    /// # Errors
    /// - `MalformedFeatureSet` when `fields` or `features` is missing or
    ///   the collection does not match the schema.
    pub fn new(record: AssetRecord) -> Result<Self> {
        let collection = FeatureCollection::decode(&record.file_name(), record.json())?;
        Ok(Self { record, collection })
    }

    pub fn name(&self) -> &str {
        self.record.name()
    }

    pub fn handle(&self) -> &FileHandle {
        self.record.handle()
    }

    pub fn record(&self) -> &AssetRecord {
        &self.record
    }

    pub fn collection(&self) -> &FeatureCollection {
        &self.collection
    }

    /// Replace the domain object and re-serialize it.
    ///
    /// Returns the new file text; writing it to storage is up to the caller.
    pub fn replace_collection(&mut self, collection: FeatureCollection, pretty: bool) -> Result<&str> {
        let json = serde_json::to_value(&collection)?;
        let text = if pretty {
            serde_json::to_string_pretty(&json)?
        } else {
            serde_json::to_string(&json)?
        };
        self.record.replace(json, text);
        self.collection = collection;
        Ok(self.record.raw_text())
    }
}

/// Read, decode and register a feature-set file.
pub async fn load_feature_set<S: ProjectStore>(
    store: &S,
    handle: &FileHandle,
    registry: &mut ProjectRegistry,
) -> Result<SharedFeatureSet> {
    registry.require_stages(LoadStage::FeatureSets)?;

    let record = AssetRecord::load(store, handle).await?;
    let asset = FeatureSetAsset::new(record)?;
    let name = asset.name().to_string();
    debug!(
        asset = %name,
        fields = asset.collection().fields.len(),
        features = asset.collection().len(),
        "loaded feature set"
    );

    let shared = Arc::new(Mutex::new(asset));
    registry.insert_feature_set(name, Arc::clone(&shared));
    Ok(shared)
}
