//! The decoded geometry column: topology offsets plus a vertex buffer.

use crate::decoder::MortonSettings;
use crate::error::{Error, Result, Section};
use crate::vector::types::{GeometryKind, Point};

/// Per-feature geometry kinds of a vector: one shared kind, or one kind
/// per feature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeometryTypes {
    Single(GeometryKind),
    Mixed(Vec<GeometryKind>),
}

impl GeometryTypes {
    #[must_use]
    pub fn kind_at(&self, index: usize) -> Option<GeometryKind> {
        match self {
            Self::Single(kind) => Some(*kind),
            Self::Mixed(kinds) => kinds.get(index).copied(),
        }
    }

    #[must_use]
    pub const fn is_single_type(&self) -> bool {
        matches!(self, Self::Single(_))
    }

    #[must_use]
    pub fn contains_polygon(&self) -> bool {
        match self {
            Self::Single(kind) => kind.is_polygon(),
            Self::Mixed(kinds) => kinds.iter().any(|kind| kind.is_polygon()),
        }
    }
}

/// Layout of the vertex buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexBufferType {
    /// Interleaved `x, y` pairs.
    Vec2,
    /// One Z-order code per vertex.
    Morton,
}

/// A fully decoded geometry vector.
///
/// The three offset arrays are monotonically non-decreasing and partition
/// the level below them; levels a vector does not need are absent. When
/// `vertex_offsets` is present every vertex lookup is indirected through it
/// (dictionary encoding).
#[derive(Debug, Clone)]
pub struct GeometryVector {
    types: GeometryTypes,
    num_geometries: usize,
    geometry_offsets: Option<Vec<u32>>,
    part_offsets: Option<Vec<u32>>,
    ring_offsets: Option<Vec<u32>>,
    vertex_offsets: Option<Vec<u32>>,
    vertex_buffer: Vec<i32>,
    vertex_buffer_type: VertexBufferType,
    morton: Option<MortonSettings>,
    contains_polygon: bool,
}

impl GeometryVector {
    /// Assembles a vector from decoded streams.
    ///
    /// # Errors
    ///
    /// `MissingParameter` when the buffer is Morton-encoded but no settings
    /// were carried by the stream metadata.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        types: GeometryTypes,
        num_geometries: usize,
        geometry_offsets: Option<Vec<u32>>,
        part_offsets: Option<Vec<u32>>,
        ring_offsets: Option<Vec<u32>>,
        vertex_offsets: Option<Vec<u32>>,
        vertex_buffer: Vec<i32>,
        vertex_buffer_type: VertexBufferType,
        morton: Option<MortonSettings>,
    ) -> Result<Self> {
        if vertex_buffer_type == VertexBufferType::Morton && morton.is_none() {
            return Err(Error::MissingParameter {
                name: "Morton numBits/coordinateShift".into(),
            });
        }
        let contains_polygon = types.contains_polygon();
        Ok(Self {
            types,
            num_geometries,
            geometry_offsets,
            part_offsets,
            ring_offsets,
            vertex_offsets,
            vertex_buffer,
            vertex_buffer_type,
            morton,
            contains_polygon,
        })
    }

    #[must_use]
    pub const fn num_geometries(&self) -> usize {
        self.num_geometries
    }

    #[must_use]
    pub const fn types(&self) -> &GeometryTypes {
        &self.types
    }

    #[must_use]
    pub const fn is_single_type(&self) -> bool {
        self.types.is_single_type()
    }

    #[must_use]
    pub const fn contains_polygon(&self) -> bool {
        self.contains_polygon
    }

    /// Kind of feature `index`.
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

    #[must_use]
    pub fn geometry_offsets(&self) -> Option<&[u32]> {
        self.geometry_offsets.as_deref()
    }

    #[must_use]
    pub fn part_offsets(&self) -> Option<&[u32]> {
        self.part_offsets.as_deref()
    }

    #[must_use]
    pub fn ring_offsets(&self) -> Option<&[u32]> {
        self.ring_offsets.as_deref()
    }

    #[must_use]
    pub fn vertex_offsets(&self) -> Option<&[u32]> {
        self.vertex_offsets.as_deref()
    }

    #[must_use]
    pub const fn vertex_buffer_type(&self) -> VertexBufferType {
        self.vertex_buffer_type
    }

    /// Reads the vertex occupying topology slot `slot`, resolving the
    /// dictionary indirection and the Morton packing where present.
    pub(crate) fn vertex_at_slot(&self, slot: usize) -> Result<Point> {
        let buffer_index = match &self.vertex_offsets {
            Some(offsets) => *offsets.get(slot).ok_or_else(|| {
                Error::malformed(Section::VertexBuffer, "vertex offset slot out of bounds")
            })? as usize,
            None => slot,
        };
        match self.vertex_buffer_type {
            VertexBufferType::Vec2 => {
                let pair = self
                    .vertex_buffer
                    .get(buffer_index * 2..buffer_index * 2 + 2)
                    .ok_or_else(|| {
                        Error::malformed(Section::VertexBuffer, "vertex index out of bounds")
                    })?;
                Ok(Point::new(pair[0], pair[1]))
            }
            VertexBufferType::Morton => {
                let code = *self.vertex_buffer.get(buffer_index).ok_or_else(|| {
                    Error::malformed(Section::VertexBuffer, "Morton code index out of bounds")
                })?;
                let settings = self.morton.ok_or(Error::MissingParameter {
                    name: "Morton numBits/coordinateShift".into(),
                })?;
                Ok(decode_morton(code as u32, settings))
            }
        }
    }

    /// Total number of vertex slots the topology addresses.
    pub(crate) fn num_vertex_slots(&self) -> usize {
        match &self.vertex_offsets {
            Some(offsets) => offsets.len(),
            None => match self.vertex_buffer_type {
                VertexBufferType::Vec2 => self.vertex_buffer.len() / 2,
                VertexBufferType::Morton => self.vertex_buffer.len(),
            },
        }
    }
}

/// Inverse Z-order mapping: de-interleaves a code into `(x, y)` and
/// removes the coordinate shift.
pub(crate) fn decode_morton(code: u32, settings: MortonSettings) -> Point {
    let x = compact_even_bits(code) as i32 - settings.coordinate_shift as i32;
    let y = compact_even_bits(code >> 1) as i32 - settings.coordinate_shift as i32;
    Point::new(x, y)
}

/// Packs `(x, y)` into a Z-order code; the inverse of [`decode_morton`].
/// Exists to synthesize Morton vertex buffers in tests.
#[must_use]
pub fn encode_morton(point: Point, settings: MortonSettings) -> u32 {
    let x = (point.x + settings.coordinate_shift as i32) as u32;
    let y = (point.y + settings.coordinate_shift as i32) as u32;
    spread_even_bits(x) | (spread_even_bits(y) << 1)
}

fn compact_even_bits(mut value: u32) -> u32 {
    value &= 0x5555_5555;
    value = (value | (value >> 1)) & 0x3333_3333;
    value = (value | (value >> 2)) & 0x0F0F_0F0F;
    value = (value | (value >> 4)) & 0x00FF_00FF;
    value = (value | (value >> 8)) & 0x0000_FFFF;
    value
}

fn spread_even_bits(mut value: u32) -> u32 {
    value &= 0x0000_FFFF;
    value = (value | (value << 8)) & 0x00FF_00FF;
    value = (value | (value << 4)) & 0x0F0F_0F0F;
    value = (value | (value << 2)) & 0x3333_3333;
    value = (value | (value << 1)) & 0x5555_5555;
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn morton_round_trip() {
        let settings = MortonSettings {
            num_bits: 26,
            coordinate_shift: 500,
        };
        for point in [
            Point::new(0, 0),
            Point::new(-500, -500),
            Point::new(4096, 4096),
            Point::new(17, 4000),
        ] {
            assert_eq!(decode_morton(encode_morton(point, settings), settings), point);
        }
    }

    #[test]
    fn morton_buffer_requires_settings() {
        let result = GeometryVector::new(
            GeometryTypes::Single(GeometryKind::Point),
            1,
            None,
            None,
            None,
            None,
            vec![0b1010],
            VertexBufferType::Morton,
            None,
        );
        assert!(matches!(result, Err(Error::MissingParameter { .. })));
    }
}
