//! Geometry shapes and spatial extents.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
}

impl Extent {
    /// Degenerate extent covering a single point.
    pub fn from_point(x: f64, y: f64) -> Self {
        Self {
            xmin: x,
            ymin: y,
            xmax: x,
            ymax: y,
        }
    }

    /// Grow this extent to include `(x, y)`.
    pub fn include_point(&mut self, x: f64, y: f64) {
        self.xmin = self.xmin.min(x);
        self.ymin = self.ymin.min(y);
        self.xmax = self.xmax.max(x);
        self.ymax = self.ymax.max(y);
    }

    /// Smallest extent covering both.
    pub fn union(&self, other: &Extent) -> Extent {
        Extent {
            xmin: self.xmin.min(other.xmin),
            ymin: self.ymin.min(other.ymin),
            xmax: self.xmax.max(other.xmax),
            ymax: self.ymax.max(other.ymax),
        }
    }

    pub fn width(&self) -> f64 {
        self.xmax - self.xmin
    }

    pub fn height(&self) -> f64 {
        self.ymax - self.ymin
    }

    pub fn center(&self) -> (f64, f64) {
        (
            (self.xmin + self.xmax) / 2.0,
            (self.ymin + self.ymax) / 2.0,
        )
    }

    /// Union of an iterator of extents, `None` when it is empty.
    pub fn union_all<I: IntoIterator<Item = Extent>>(extents: I) -> Option<Extent> {
        extents.into_iter().reduce(|acc, e| acc.union(&e))
    }
}

/// Coordinate tuple: `[x, y]` with optional trailing z/m values.
pub type Position = Vec<f64>;

/// Feature geometry, in the shape of the standard feature-set JSON.
///
/// Variants are distinguished by their keys, not by a tag, and are tried in
/// declaration order; `Point` goes last since it only needs an `x` key.
/// Keys a variant does not model (`spatialReference`, `hasZ`, `m`, ...) are
/// kept in `extra` and written back unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Geometry {
    Envelope {
        xmin: f64,
        ymin: f64,
        xmax: f64,
        ymax: f64,
        #[serde(flatten)]
        extra: Map<String, Value>,
    },
    Multipoint {
        points: Vec<Position>,
        #[serde(flatten)]
        extra: Map<String, Value>,
    },
    Polyline {
        paths: Vec<Vec<Position>>,
        #[serde(flatten)]
        extra: Map<String, Value>,
    },
    Polygon {
        rings: Vec<Vec<Position>>,
        #[serde(flatten)]
        extra: Map<String, Value>,
    },
    /// An empty point is written as `{"x": null}`.
    Point {
        #[serde(deserialize_with = "nullable")]
        x: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        y: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        z: Option<f64>,
        #[serde(flatten)]
        extra: Map<String, Value>,
    },
}

/// Present but possibly null.
fn nullable<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    Option::<f64>::deserialize(deserializer)
}

impl Geometry {
    /// Convenience constructor for a 2D point.
    pub fn point(x: f64, y: f64) -> Self {
        Geometry::Point {
            x: Some(x),
            y: Some(y),
            z: None,
            extra: Map::new(),
        }
    }

    /// Bounding box of this geometry, `None` for empty shapes.
    pub fn extent(&self) -> Option<Extent> {
        match self {
            Geometry::Point {
                x: Some(x),
                y: Some(y),
                ..
            } => Some(Extent::from_point(*x, *y)),
            Geometry::Point { .. } => None,
            Geometry::Envelope {
                xmin,
                ymin,
                xmax,
                ymax,
                ..
            } => Some(Extent {
                xmin: *xmin,
                ymin: *ymin,
                xmax: *xmax,
                ymax: *ymax,
            }),
            Geometry::Multipoint { points, .. } => positions_extent(points.iter()),
            Geometry::Polyline { paths, .. } => positions_extent(paths.iter().flatten()),
            Geometry::Polygon { rings, .. } => positions_extent(rings.iter().flatten()),
        }
    }
}

fn positions_extent<'a, I: Iterator<Item = &'a Position>>(positions: I) -> Option<Extent> {
    let mut extent: Option<Extent> = None;
    // Positions with fewer than two ordinates carry no location.
    for position in positions.filter(|p| p.len() >= 2) {
        let (x, y) = (position[0], position[1]);
        match extent.as_mut() {
            Some(e) => e.include_point(x, y),
            None => extent = Some(Extent::from_point(x, y)),
        }
    }
    extent
}
