//! Live layers
//!
//! The in-memory, editable side of a layer asset and the channel that
//! carries its edit notifications back to the feature-set file.

pub mod layer;
pub mod sync;

pub use layer::{EditEvent, EditOutcome, EditResult, EditableLayer, LayerEdits, LayerOptions};
pub use sync::EditSync;
