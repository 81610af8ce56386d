use serde::Serialize;

use crate::error::{Error, Result};

/// A 2-D tile-space point. Coordinates are integers in tile units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// One ring (or line, or singleton point) of a decoded geometry.
pub type Ring = Vec<Point>;

/// Decoded coordinates of one feature: an ordered list of rings.
///
/// POINT is `[[p]]`, MULTIPOINT `[[p1], [p2], ...]`, LINESTRING one ring of
/// open vertices, POLYGON a shell plus holes with each ring closed, and
/// MULTIPOLYGON the flat concatenation of all polygon rings in feature
/// order.
pub type CoordinatesArray = Vec<Ring>;

/// Geometry kind of a single feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum GeometryKind {
    Point,
    LineString,
    Polygon,
    MultiPoint,
    MultiLineString,
    MultiPolygon,
}

impl GeometryKind {
    /// Maps the wire discriminant to a kind.
    pub fn from_discriminant(value: u32) -> Result<Self> {
        match value {
            0 => Ok(Self::Point),
            1 => Ok(Self::LineString),
            2 => Ok(Self::Polygon),
            3 => Ok(Self::MultiPoint),
            4 => Ok(Self::MultiLineString),
            5 => Ok(Self::MultiPolygon),
            _ => Err(Error::UnsupportedGeometry { value }),
        }
    }

    #[must_use]
    pub const fn to_discriminant(self) -> u32 {
        match self {
            Self::Point => 0,
            Self::LineString => 1,
            Self::Polygon => 2,
            Self::MultiPoint => 3,
            Self::MultiLineString => 4,
            Self::MultiPolygon => 5,
        }
    }

    #[must_use]
    pub const fn is_polygon(self) -> bool {
        matches!(self, Self::Polygon | Self::MultiPolygon)
    }

    /// GeoJSON-style name, the form map clients key styling off.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Point => "Point",
            Self::LineString => "LineString",
            Self::Polygon => "Polygon",
            Self::MultiPoint => "MultiPoint",
            Self::MultiLineString => "MultiLineString",
            Self::MultiPolygon => "MultiPolygon",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discriminants_round_trip() {
        for value in 0..6 {
            let kind = GeometryKind::from_discriminant(value).unwrap();
            assert_eq!(kind.to_discriminant(), value);
        }
        assert!(matches!(
            GeometryKind::from_discriminant(6),
            Err(Error::UnsupportedGeometry { value: 6 })
        ));
    }
}
