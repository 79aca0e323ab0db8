//! Atlas - File-Backed Map Asset Projects
//!
//! A project is a directory of JSON assets that reference each other by
//! name:
//! - Symbols: drawing styles
//! - Renderers: rules that pick a symbol per feature, naming symbols
//! - Feature sets: field schema plus features
//! - Layers: a feature set drawn with a renderer
//!
//! # Architecture
//!
//! [`project::Project::connect`] loads the four kinds strictly in that
//! order so every name is resolved against assets already in the
//! [`registry::ProjectRegistry`]. Each layer gets a live, editable copy of
//! its feature set; edits made through it are written back to the
//! feature-set file through the [`store::ProjectStore`] the project was
//! opened on.

pub mod asset;
pub mod cli;
pub mod config;
pub mod error;
pub mod live;
pub mod logging;
pub mod model;
pub mod project;
pub mod registry;
pub mod resolve;
pub mod store;

pub use asset::{AssetKind, AssetRecord, LoadedAsset};
pub use config::ProjectConfig;
pub use error::{AtlasError, Result};
pub use live::{EditResult, EditableLayer, LayerEdits};
pub use project::{LoadStage, Project, ProjectSummary};
pub use registry::ProjectRegistry;
pub use store::{FsStore, MemoryStore, ProjectStore};
