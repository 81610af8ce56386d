//! Single-geometry extraction: decode one feature's coordinates without
//! touching the rest of the vector.
//!
//! For every legal vector and valid index this produces exactly what the
//! bulk pass produces at that index. Where the offsets needed to jump to
//! feature `index` are absent (a mixed multipoint without geometry
//! offsets, or a part level without its ring level), the extractor falls
//! back to the bulk pass and indexes its result.

use crate::error::{Error, Result};
use crate::vector::convert::convert_geometry_vector;
use crate::vector::geometry::GeometryVector;
use crate::vector::types::{CoordinatesArray, GeometryKind, Ring};

/// Decodes the coordinates of feature `index` alone.
pub fn convert_single_geometry(
    vector: &GeometryVector,
    index: usize,
) -> Result<CoordinatesArray> {
    if index >= vector.num_geometries() {
        return Err(Error::OutOfRange {
            index,
            len: vector.num_geometries(),
        });
    }
    let kind = vector.geometry_type(index)?;
    match try_single(vector, index, kind)? {
        Some(coordinates) => Ok(coordinates),
        None => fallback_via_bulk(vector, index),
    }
}

/// `Ok(None)` when the offsets required for isolated decoding are absent.
fn try_single(
    vector: &GeometryVector,
    index: usize,
    kind: GeometryKind,
) -> Result<Option<CoordinatesArray>> {
    match kind {
        GeometryKind::Point => {
            let Some((unit, _)) = outer_range(vector, index) else {
                return Ok(None);
            };
            let Some(slot) = unit_to_vertex(vector, unit) else {
                return Ok(None);
            };
            Ok(Some(vec![vec![vector.vertex_at_slot(slot)?]]))
        }
        GeometryKind::MultiPoint => {
            // Without geometry offsets the point count of feature `index`
            // is unknowable in isolation.
            if vector.geometry_offsets().is_none() {
                return Ok(None);
            }
            let Some((first, last)) = outer_range(vector, index) else {
                return Ok(None);
            };
            let Some(start) = unit_to_vertex(vector, first) else {
                return Ok(None);
            };
            let Some(end) = unit_to_vertex(vector, last) else {
                return Ok(None);
            };
            let mut rings = Vec::with_capacity(end.saturating_sub(start));
            for slot in start..end {
                rings.push(vec![vector.vertex_at_slot(slot)?]);
            }
            Ok(Some(rings))
        }
        GeometryKind::LineString => {
            let Some((part, _)) = outer_range(vector, index) else {
                return Ok(None);
            };
            let Some(line) = read_line(vector, part)? else {
                return Ok(None);
            };
            Ok(Some(vec![line]))
        }
        GeometryKind::MultiLineString => {
            if vector.geometry_offsets().is_none() {
                return Ok(None);
            }
            let Some((first, last)) = outer_range(vector, index) else {
                return Ok(None);
            };
            let mut rings = Vec::with_capacity(last.saturating_sub(first));
            for part in first..last {
                let Some(line) = read_line(vector, part)? else {
                    return Ok(None);
                };
                rings.push(line);
            }
            Ok(Some(rings))
        }
        GeometryKind::Polygon => {
            let Some((part, _)) = outer_range(vector, index) else {
                return Ok(None);
            };
            read_polygon_rings(vector, part)
        }
        GeometryKind::MultiPolygon => {
            if vector.geometry_offsets().is_none() {
                return Ok(None);
            }
            let Some((first, last)) = outer_range(vector, index) else {
                return Ok(None);
            };
            let mut rings = Vec::new();
            for part in first..last {
                let Some(polygon) = read_polygon_rings(vector, part)? else {
                    return Ok(None);
                };
                rings.extend(polygon);
            }
            Ok(Some(rings))
        }
    }
}

/// Range covered by feature `index` in the first present level below the
/// geometry level; identity when the vector has no geometry offsets.
fn outer_range(vector: &GeometryVector, index: usize) -> Option<(usize, usize)> {
    match vector.geometry_offsets() {
        Some(offsets) => {
            let start = *offsets.get(index)? as usize;
            let end = *offsets.get(index + 1)? as usize;
            Some((start, end))
        }
        None => Some((index, index + 1)),
    }
}

/// First vertex slot covered by unit `unit` of the first present level.
fn unit_to_vertex(vector: &GeometryVector, unit: usize) -> Option<usize> {
    if vector.part_offsets().is_some() {
        return part_to_vertex(vector, unit);
    }
    match vector.ring_offsets() {
        Some(rings) => rings.get(unit).map(|&slot| slot as usize),
        None => Some(unit),
    }
}

/// First vertex slot covered by part `part`.
fn part_to_vertex(vector: &GeometryVector, part: usize) -> Option<usize> {
    let below = *vector.part_offsets()?.get(part)? as usize;
    match vector.ring_offsets() {
        Some(rings) => rings.get(below).map(|&slot| slot as usize),
        None => Some(below),
    }
}

fn read_line(vector: &GeometryVector, part: usize) -> Result<Option<Ring>> {
    if vector.part_offsets().is_none() {
        return Ok(None);
    }
    let (Some(start), Some(end)) = (
        part_to_vertex(vector, part),
        part_to_vertex(vector, part + 1),
    ) else {
        return Ok(None);
    };
    let mut line = Vec::with_capacity(end.saturating_sub(start));
    for slot in start..end {
        line.push(vector.vertex_at_slot(slot)?);
    }
    Ok(Some(line))
}

fn read_polygon_rings(vector: &GeometryVector, part: usize) -> Result<Option<CoordinatesArray>> {
    let (Some(parts), Some(ring_offsets)) = (vector.part_offsets(), vector.ring_offsets()) else {
        return Ok(None);
    };
    let Some(first_ring) = parts.get(part).map(|&r| r as usize) else {
        return Ok(None);
    };
    let Some(last_ring) = parts.get(part + 1).map(|&r| r as usize) else {
        return Ok(None);
    };
    let mut rings = Vec::with_capacity(last_ring.saturating_sub(first_ring));
    for ring_index in first_ring..last_ring {
        let Some(start) = ring_offsets.get(ring_index).map(|&v| v as usize) else {
            return Ok(None);
        };
        let Some(end) = ring_offsets.get(ring_index + 1).map(|&v| v as usize) else {
            return Ok(None);
        };
        let mut ring = Vec::with_capacity(end.saturating_sub(start) + 1);
        for slot in start..end {
            ring.push(vector.vertex_at_slot(slot)?);
        }
        if let Some(&first) = ring.first() {
            ring.push(first);
        }
        rings.push(ring);
    }
    Ok(Some(rings))
}

fn fallback_via_bulk(vector: &GeometryVector, index: usize) -> Result<CoordinatesArray> {
    let mut all = convert_geometry_vector(vector)?;
    Ok(all.swap_remove(index))
}
