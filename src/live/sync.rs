//! Write-back of live edits to feature-set files.

use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, info};

use super::layer::{EditEvent, EditableLayer};
use crate::error::Result;
use crate::registry::SharedFeatureSet;
use crate::store::ProjectStore;

/// Receiving end of a live layer's edit notifications.
///
/// Each drained notification replaces the target feature set's collection
/// with the layer's current features and overwrites the backing file in
/// full. Without a target, notifications are drained and dropped.
#[derive(Debug)]
pub struct EditSync {
    events: UnboundedReceiver<EditEvent>,
    target: Option<SharedFeatureSet>,
    pretty: bool,
}

impl EditSync {
    /// Subscribe to `live` and route its edits into `target`.
    pub fn attach(live: &mut EditableLayer, target: Option<SharedFeatureSet>, pretty: bool) -> Self {
        Self {
            events: live.subscribe(),
            target,
            pretty,
        }
    }

    /// Notifications received but not yet written back.
    pub fn pending(&self) -> usize {
        self.events.len()
    }

    /// Write back every pending notification.
    ///
    /// Stops at the first storage failure and returns it; the in-memory
    /// feature set keeps the edited collection. Returns the number of
    /// writes made.
    pub async fn flush<S: ProjectStore>(&mut self, live: &EditableLayer, store: &S) -> Result<usize> {
        let mut writes = 0;
        while let Ok(event) = self.events.try_recv() {
            let Some(target) = &self.target else {
                debug!(layer = %event.layer, revision = event.revision, "no feature set to sync");
                continue;
            };

            let (handle, text) = {
                let mut asset = target.lock().await;
                let text = asset
                    .replace_collection(live.query_features(), self.pretty)?
                    .to_string();
                (asset.handle().clone(), text)
            };
            store.write_text(&handle, &text).await?;
            writes += 1;

            info!(
                layer = %event.layer,
                revision = event.revision,
                file = %handle.file_name(),
                features = live.len(),
                "synced edits to feature set"
            );
        }
        Ok(writes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::{AssetRecord, FeatureSetAsset};
    use crate::live::{LayerEdits, LayerOptions};
    use crate::model::{Feature, FeatureCollection, Geometry};
    use crate::store::{FileHandle, MemoryStore};
    use std::path::PathBuf;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    const EMPTY: &str = r#"{"fields": [], "features": []}"#;

    fn shared_feature_set() -> SharedFeatureSet {
        let handle = FileHandle::new(PathBuf::from("Features/points.json"));
        let record = AssetRecord::from_text(handle, EMPTY.to_string()).unwrap();
        Arc::new(Mutex::new(FeatureSetAsset::new(record).unwrap()))
    }

    fn live_layer(source: Option<FeatureCollection>) -> EditableLayer {
        EditableLayer::new(
            source,
            LayerOptions {
                title: "points.json".to_string(),
                renderer: None,
                editing_enabled: true,
                default_object_id_field: "OBJECTID".to_string(),
            },
        )
    }

    #[tokio::test]
    async fn test_flush_writes_current_collection() {
        let store = MemoryStore::with_files([("Features/points.json", EMPTY)]);
        let target = shared_feature_set();
        let snapshot = target.lock().await.collection().clone();
        let mut live = live_layer(Some(snapshot));
        let mut sync = EditSync::attach(&mut live, Some(Arc::clone(&target)), false);

        live.apply_edits(LayerEdits::add(Feature::new(Some(Geometry::point(1.0, 1.0)))))
            .unwrap();
        assert_eq!(sync.pending(), 1);

        let writes = sync.flush(&live, &store).await.unwrap();

        assert_eq!(writes, 1);
        assert_eq!(sync.pending(), 0);
        let written = store.contents("Features/points.json").unwrap();
        let reparsed: serde_json::Value = serde_json::from_str(&written).unwrap();
        assert_eq!(reparsed["features"].as_array().unwrap().len(), 1);
        assert_eq!(target.lock().await.collection().len(), 1);
    }

    #[tokio::test]
    async fn test_flush_without_target_discards() {
        let store = MemoryStore::new();
        let mut live = live_layer(None);
        let mut sync = EditSync::attach(&mut live, None, true);

        live.apply_edits(LayerEdits::add(Feature::new(None))).unwrap();

        assert_eq!(sync.flush(&live, &store).await.unwrap(), 0);
        assert_eq!(sync.pending(), 0);
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn test_write_failure_keeps_memory_state() {
        let store = MemoryStore::with_files([("Features/points.json", EMPTY)]);
        store.set_fail_writes(true);
        let target = shared_feature_set();
        let mut live = live_layer(Some(FeatureCollection::default()));
        let mut sync = EditSync::attach(&mut live, Some(Arc::clone(&target)), false);

        live.apply_edits(LayerEdits::add(Feature::new(None))).unwrap();
        let err = sync.flush(&live, &store).await.unwrap_err();

        assert_eq!(err.error_code(), "STORAGE_ERROR");
        assert_eq!(target.lock().await.collection().len(), 1);
        assert_eq!(store.contents("Features/points.json").unwrap(), EMPTY);
    }
}
