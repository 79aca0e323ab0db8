//! Domain objects decoded from asset JSON.

pub mod feature;
pub mod geometry;
pub mod renderer;
pub mod symbol;

pub use feature::{Feature, FeatureCollection, Field};
pub use geometry::{Extent, Geometry, Position};
pub use renderer::{decode_renderer, RendererDefinition, RendererKind};
pub use symbol::{decode_symbol, Color, SymbolDefinition, SymbolKind};
