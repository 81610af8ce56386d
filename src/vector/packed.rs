//! Render-oriented geometry layout.
//!
//! The packed form stores run lengths in draw order instead of offset
//! arrays, which is what GPU upload paths want; the price is that finding
//! feature `i` requires scanning every run before it, so this variant only
//! supports whole-vector reconstruction.

use crate::error::{Error, Result, Section};
use crate::vector::convert::convert_geometry_vector;
use crate::vector::geometry::{GeometryTypes, GeometryVector};
use crate::vector::types::{CoordinatesArray, GeometryKind, Point};

#[derive(Debug, Clone)]
pub struct PackedGeometryVector {
    types: GeometryTypes,
    num_geometries: usize,
    /// Interleaved `x, y` pairs, rings emitted exactly as drawn (polygon
    /// rings already closed).
    positions: Vec<i32>,
    /// Vertices per ring, in draw order.
    ring_lengths: Vec<u32>,
    /// Rings per feature, in feature order.
    rings_per_feature: Vec<u32>,
}

impl PackedGeometryVector {
    pub fn new(
        types: GeometryTypes,
        positions: Vec<i32>,
        ring_lengths: Vec<u32>,
        rings_per_feature: Vec<u32>,
    ) -> Result<Self> {
        let total_rings: u64 = rings_per_feature.iter().map(|&count| u64::from(count)).sum();
        if total_rings != ring_lengths.len() as u64 {
            return Err(Error::malformed(
                Section::Topology,
                "ring counts disagree with ring lengths",
            ));
        }
        let total_vertices: u64 = ring_lengths.iter().map(|&count| u64::from(count)).sum();
        if total_vertices * 2 != positions.len() as u64 {
            return Err(Error::malformed(
                Section::VertexBuffer,
                "ring lengths disagree with the position buffer",
            ));
        }
        let num_geometries = rings_per_feature.len();
        Ok(Self {
            types,
            num_geometries,
            positions,
            ring_lengths,
            rings_per_feature,
        })
    }

    #[must_use]
    pub const fn num_geometries(&self) -> usize {
        self.num_geometries
    }

    pub fn geometry_type(&self, index: usize) -> Result<GeometryKind> {
        if index >= self.num_geometries {
            return Err(Error::OutOfRange {
                index,
                len: self.num_geometries,
            });
        }
        self.types.kind_at(index).ok_or(Error::OutOfRange {
            index,
            len: self.num_geometries,
        })
    }

    /// Rebuilds every feature's coordinates in one pass over the runs.
    pub fn decode_geometries(&self) -> Result<Vec<CoordinatesArray>> {
        let mut geometries = Vec::with_capacity(self.num_geometries);
        let mut ring_cursor = 0usize;
        let mut position_cursor = 0usize;
        for &ring_count in &self.rings_per_feature {
            let mut rings = Vec::with_capacity(ring_count as usize);
            for _ in 0..ring_count {
                let length = self.ring_lengths[ring_cursor] as usize;
                ring_cursor += 1;
                let pairs = self
                    .positions
                    .get(position_cursor..position_cursor + length * 2)
                    .ok_or_else(|| {
                        Error::malformed(Section::VertexBuffer, "position run exceeds buffer")
                    })?;
                position_cursor += length * 2;
                rings.push(
                    pairs
                        .chunks_exact(2)
                        .map(|pair| Point::new(pair[0], pair[1]))
                        .collect(),
                );
            }
            geometries.push(rings);
        }
        Ok(geometries)
    }
}

/// The two geometry representations a feature table can sit on. The
/// resolver branches on [`GeometrySource::supports_single_decode`] rather
/// than on the variant itself.
#[derive(Debug, Clone)]
pub enum GeometrySource {
    Columnar(GeometryVector),
    Packed(PackedGeometryVector),
}

impl GeometrySource {
    #[must_use]
    pub const fn num_geometries(&self) -> usize {
        match self {
            Self::Columnar(vector) => vector.num_geometries(),
            Self::Packed(vector) => vector.num_geometries(),
        }
    }

    pub fn geometry_type(&self, index: usize) -> Result<GeometryKind> {
        match self {
            Self::Columnar(vector) => vector.geometry_type(index),
            Self::Packed(vector) => vector.geometry_type(index),
        }
    }

    /// Whether one feature can be decoded without materializing the rest.
    #[must_use]
    pub const fn supports_single_decode(&self) -> bool {
        matches!(self, Self::Columnar(_))
    }

    pub fn decode_geometries(&self) -> Result<Vec<CoordinatesArray>> {
        match self {
            Self::Columnar(vector) => convert_geometry_vector(vector),
            Self::Packed(vector) => vector.decode_geometries(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packed_round_trip() {
        // Two features: a one-ring triangle (closed -> 4 vertices) and a
        // two-point multipoint.
        let types = GeometryTypes::Mixed(vec![GeometryKind::Polygon, GeometryKind::MultiPoint]);
        let positions = vec![0, 0, 10, 0, 0, 10, 0, 0, 5, 5, 6, 6];
        let vector =
            PackedGeometryVector::new(types, positions, vec![4, 1, 1], vec![1, 2]).unwrap();
        let geometries = vector.decode_geometries().unwrap();
        assert_eq!(geometries.len(), 2);
        assert_eq!(geometries[0][0].len(), 4);
        assert_eq!(geometries[1], vec![vec![Point::new(5, 5)], vec![Point::new(6, 6)]]);
    }

    #[test]
    fn inconsistent_runs_are_rejected() {
        let types = GeometryTypes::Single(GeometryKind::Point);
        assert!(PackedGeometryVector::new(types, vec![0, 0], vec![1, 1], vec![1]).is_err());
    }
}
