//! Editable feature layer.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tracing::{debug, trace};

use crate::error::{AtlasError, Result};
use crate::model::feature::{Feature, FeatureCollection, Field};
use crate::model::geometry::Extent;
use crate::model::renderer::RendererDefinition;

const OID_FIELD_TYPE: &str = "esriFieldTypeOID";

/// Construction options for [`EditableLayer`].
#[derive(Debug, Clone)]
pub struct LayerOptions {
    pub title: String,
    pub renderer: Option<Arc<RendererDefinition>>,
    pub editing_enabled: bool,
    /// Object-id field used when the source names none.
    pub default_object_id_field: String,
}

/// One batch of edits.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerEdits {
    #[serde(default)]
    pub adds: Vec<Feature>,
    #[serde(default)]
    pub updates: Vec<Feature>,
    #[serde(default)]
    pub deletes: Vec<i64>,
}

impl LayerEdits {
    pub fn add(feature: Feature) -> Self {
        Self {
            adds: vec![feature],
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.adds.is_empty() && self.updates.is_empty() && self.deletes.is_empty()
    }
}

/// Result of a single add, update or delete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditOutcome {
    pub object_id: Option<i64>,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl EditOutcome {
    fn applied(object_id: i64) -> Self {
        Self {
            object_id: Some(object_id),
            success: true,
            error: None,
        }
    }

    fn failed(object_id: Option<i64>, error: impl Into<String>) -> Self {
        Self {
            object_id,
            success: false,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditResult {
    pub add_results: Vec<EditOutcome>,
    pub update_results: Vec<EditOutcome>,
    pub delete_results: Vec<EditOutcome>,
}

impl EditResult {
    fn count(outcomes: &[EditOutcome]) -> usize {
        outcomes.iter().filter(|o| o.success).count()
    }

    /// Number of edits that took effect.
    pub fn applied(&self) -> usize {
        Self::count(&self.add_results)
            + Self::count(&self.update_results)
            + Self::count(&self.delete_results)
    }

    pub fn failures(&self) -> impl Iterator<Item = &EditOutcome> {
        self.add_results
            .iter()
            .chain(&self.update_results)
            .chain(&self.delete_results)
            .filter(|o| !o.success)
    }
}

/// Notification sent to subscribers after edits took effect.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EditEvent {
    pub layer: String,
    pub revision: u64,
    pub added: usize,
    pub updated: usize,
    pub deleted: usize,
    pub at: DateTime<Utc>,
}

/// In-memory feature layer built from a feature-set snapshot.
///
/// Edits are applied synchronously; every call that changes the features
/// bumps `revision` and sends one [`EditEvent`] to each live subscriber.
#[derive(Debug)]
pub struct EditableLayer {
    title: String,
    template: FeatureCollection,
    features: Vec<Feature>,
    renderer: Option<Arc<RendererDefinition>>,
    editing_enabled: bool,
    object_id_field: String,
    /// `None` once the id space is used up.
    next_object_id: Option<i64>,
    revision: u64,
    subscribers: Vec<UnboundedSender<EditEvent>>,
}

impl EditableLayer {
    pub fn new(source: Option<FeatureCollection>, options: LayerOptions) -> Self {
        let mut template = source.unwrap_or_default();
        let features = std::mem::take(&mut template.features);

        let object_id_field = template
            .object_id_field_name
            .clone()
            .or_else(|| {
                template
                    .fields
                    .iter()
                    .find(|f| f.field_type == OID_FIELD_TYPE)
                    .map(|f| f.name.clone())
            })
            .unwrap_or(options.default_object_id_field);

        let next_object_id = features
            .iter()
            .filter_map(|f| f.object_id(&object_id_field))
            .max()
            .map_or(Some(1), |max| max.checked_add(1));

        Self {
            title: options.title,
            template,
            features,
            renderer: options.renderer,
            editing_enabled: options.editing_enabled,
            object_id_field,
            next_object_id,
            revision: 0,
            subscribers: Vec::new(),
        }
    }

    /// Register for edit notifications.
    pub fn subscribe(&mut self) -> UnboundedReceiver<EditEvent> {
        let (tx, rx) = unbounded_channel();
        self.subscribers.push(tx);
        rx
    }

    /// Subscribers whose receiver is still alive.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.iter().filter(|tx| !tx.is_closed()).count()
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn fields(&self) -> &[Field] {
        &self.template.fields
    }

    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn geometry_type(&self) -> Option<&str> {
        self.template.geometry_type.as_deref()
    }

    pub fn renderer(&self) -> Option<&Arc<RendererDefinition>> {
        self.renderer.as_ref()
    }

    pub fn editing_enabled(&self) -> bool {
        self.editing_enabled
    }

    pub fn object_id_field(&self) -> &str {
        &self.object_id_field
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn feature(&self, object_id: i64) -> Option<&Feature> {
        self.position(object_id).map(|i| &self.features[i])
    }

    /// Bounding box of every located feature.
    pub fn extent(&self) -> Option<Extent> {
        Extent::union_all(
            self.features
                .iter()
                .filter_map(|f| f.geometry.as_ref())
                .filter_map(|g| g.extent()),
        )
    }

    /// The complete current collection, in the shape of the source file.
    pub fn query_features(&self) -> FeatureCollection {
        FeatureCollection {
            features: self.features.clone(),
            ..self.template.clone()
        }
    }

    /// Apply a batch of adds, updates and deletes.
    ///
    /// Individual edits that cannot be applied are reported in the returned
    /// [`EditResult`]; the rest of the batch still goes through.
    ///
    /// # Errors
    /// - `EditingDisabled` when the layer is read-only.
    pub fn apply_edits(&mut self, edits: LayerEdits) -> Result<EditResult> {
        if !self.editing_enabled {
            return Err(AtlasError::EditingDisabled {
                layer: self.title.clone(),
            });
        }

        let result = EditResult {
            add_results: edits.adds.into_iter().map(|f| self.add(f)).collect(),
            update_results: edits.updates.into_iter().map(|f| self.update(f)).collect(),
            delete_results: edits.deletes.into_iter().map(|id| self.delete(id)).collect(),
        };

        for failure in result.failures() {
            debug!(
                layer = %self.title,
                object_id = ?failure.object_id,
                error = failure.error.as_deref().unwrap_or_default(),
                "edit rejected"
            );
        }

        if result.applied() > 0 {
            self.revision += 1;
            self.broadcast(EditEvent {
                layer: self.title.clone(),
                revision: self.revision,
                added: EditResult::count(&result.add_results),
                updated: EditResult::count(&result.update_results),
                deleted: EditResult::count(&result.delete_results),
                at: Utc::now(),
            });
        }

        Ok(result)
    }

    fn position(&self, object_id: i64) -> Option<usize> {
        self.features
            .iter()
            .position(|f| f.object_id(&self.object_id_field) == Some(object_id))
    }

    fn add(&mut self, mut feature: Feature) -> EditOutcome {
        let object_id = match feature.attributes.get(&self.object_id_field) {
            None | Some(Value::Null) => {
                let Some(id) = self.next_object_id else {
                    return EditOutcome::failed(None, "object ids exhausted");
                };
                feature
                    .attributes
                    .insert(self.object_id_field.clone(), Value::from(id));
                id
            }
            Some(value) => match value.as_i64() {
                Some(id) if self.position(id).is_some() => {
                    return EditOutcome::failed(Some(id), "object id already exists")
                }
                Some(i64::MAX) => {
                    return EditOutcome::failed(Some(i64::MAX), "object id out of range")
                }
                Some(id) => id,
                None => return EditOutcome::failed(None, "object id is not an integer"),
            },
        };

        // object_id < i64::MAX here, so the increment cannot overflow.
        self.next_object_id = self.next_object_id.map(|next| next.max(object_id + 1));
        self.features.push(feature);
        EditOutcome::applied(object_id)
    }

    /// Attributes present on `feature` overwrite the stored ones; the
    /// geometry is replaced when given.
    fn update(&mut self, feature: Feature) -> EditOutcome {
        let Some(object_id) = feature.object_id(&self.object_id_field) else {
            return EditOutcome::failed(None, "missing object id");
        };
        let Some(index) = self.position(object_id) else {
            return EditOutcome::failed(Some(object_id), "feature not found");
        };

        let target = &mut self.features[index];
        merge_attributes(&mut target.attributes, feature.attributes);
        if feature.geometry.is_some() {
            target.geometry = feature.geometry;
        }
        EditOutcome::applied(object_id)
    }

    fn delete(&mut self, object_id: i64) -> EditOutcome {
        match self.position(object_id) {
            Some(index) => {
                self.features.remove(index);
                EditOutcome::applied(object_id)
            }
            None => EditOutcome::failed(Some(object_id), "feature not found"),
        }
    }

    fn broadcast(&mut self, event: EditEvent) {
        trace!(layer = %event.layer, revision = event.revision, "broadcasting edit");
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}

fn merge_attributes(target: &mut Map<String, Value>, changes: Map<String, Value>) {
    for (key, value) in changes {
        target.insert(key, value);
    }
}
