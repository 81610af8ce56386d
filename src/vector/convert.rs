//! Bulk geometry reconstruction: one pass over the whole vector.

use crate::error::{Error, Result, Section};
use crate::vector::geometry::GeometryVector;
use crate::vector::types::{CoordinatesArray, GeometryKind, Ring};

fn malformed(details: &'static str) -> Error {
    Error::malformed(Section::Topology, details)
}

/// Running cursors over the topology and vertex levels. Each feature
/// advances exactly the slots it covers; the end-of-pass check verifies
/// every array was consumed completely.
struct Counters {
    geometry: usize,
    part: usize,
    ring: usize,
    vertex: usize,
}

/// Reconstructs the coordinates of every feature in order.
pub fn convert_geometry_vector(vector: &GeometryVector) -> Result<Vec<CoordinatesArray>> {
    let mut counters = Counters {
        geometry: 0,
        part: 0,
        ring: 0,
        vertex: 0,
    };
    let mut geometries = Vec::with_capacity(vector.num_geometries());
    for index in 0..vector.num_geometries() {
        let kind = vector.geometry_type(index)?;
        geometries.push(convert_one(vector, kind, &mut counters)?);
    }

    check_consumed(vector.geometry_offsets(), counters.geometry, "geometry")?;
    check_consumed(vector.part_offsets(), counters.part, "part")?;
    check_consumed(vector.ring_offsets(), counters.ring, "ring")?;
    if counters.vertex != vector.num_vertex_slots() {
        return Err(malformed("vertex buffer not fully consumed"));
    }
    Ok(geometries)
}

fn convert_one(
    vector: &GeometryVector,
    kind: GeometryKind,
    counters: &mut Counters,
) -> Result<CoordinatesArray> {
    match kind {
        GeometryKind::Point => {
            advance_singleton_levels(vector, counters);
            let point = vector.vertex_at_slot(counters.vertex)?;
            counters.vertex += 1;
            Ok(vec![vec![point]])
        }
        GeometryKind::MultiPoint => {
            let num_points = take_range(vector.geometry_offsets(), &mut counters.geometry)
                .ok_or_else(|| malformed("multipoint without geometry offsets"))?;
            // In a mixed vector each point occupies one part (and ring) slot.
            if vector.part_offsets().is_some() {
                counters.part += num_points;
            }
            if vector.ring_offsets().is_some() {
                counters.ring += num_points;
            }
            let mut rings = Vec::with_capacity(num_points);
            for _ in 0..num_points {
                let point = vector.vertex_at_slot(counters.vertex)?;
                counters.vertex += 1;
                rings.push(vec![point]);
            }
            Ok(rings)
        }
        GeometryKind::LineString => {
            if vector.geometry_offsets().is_some() {
                counters.geometry += 1;
            }
            let line = read_line(vector, counters)?;
            Ok(vec![line])
        }
        GeometryKind::MultiLineString => {
            let num_lines = take_range(vector.geometry_offsets(), &mut counters.geometry)
                .ok_or_else(|| malformed("multilinestring without geometry offsets"))?;
            let mut rings = Vec::with_capacity(num_lines);
            for _ in 0..num_lines {
                rings.push(read_line(vector, counters)?);
            }
            Ok(rings)
        }
        GeometryKind::Polygon => {
            if vector.geometry_offsets().is_some() {
                counters.geometry += 1;
            }
            read_polygon_rings(vector, counters)
        }
        GeometryKind::MultiPolygon => {
            let num_polygons = take_range(vector.geometry_offsets(), &mut counters.geometry)
                .ok_or_else(|| malformed("multipolygon without geometry offsets"))?;
            // Flat list of rings: shells and holes concatenated in
            // polygon order.
            let mut rings = Vec::new();
            for _ in 0..num_polygons {
                rings.extend(read_polygon_rings(vector, counters)?);
            }
            Ok(rings)
        }
    }
}

/// A point feature in a mixed vector still occupies one slot at every
/// present topology level.
fn advance_singleton_levels(vector: &GeometryVector, counters: &mut Counters) {
    if vector.geometry_offsets().is_some() {
        counters.geometry += 1;
    }
    if vector.part_offsets().is_some() {
        counters.part += 1;
    }
    if vector.ring_offsets().is_some() {
        counters.ring += 1;
    }
}

/// Reads the vertices of one linestring (or one line of a multi-line).
///
/// In a polygon-bearing vector the vertex counts of lines live in the
/// ring offsets (the part level partitions rings there), so the part
/// counter advances alongside.
fn read_line(vector: &GeometryVector, counters: &mut Counters) -> Result<Ring> {
    let num_vertices = if vector.contains_polygon() && vector.ring_offsets().is_some() {
        counters.part += 1;
        take_range(vector.ring_offsets(), &mut counters.ring)
            .ok_or_else(|| malformed("line in polygon vector without ring offsets"))?
    } else {
        take_range(vector.part_offsets(), &mut counters.part)
            .ok_or_else(|| malformed("linestring without part offsets"))?
    };
    read_vertices(vector, counters, num_vertices, false)
}

/// Reads all rings of one polygon: the shell first, then the holes, each
/// ring closed by repeating its first vertex.
fn read_polygon_rings(vector: &GeometryVector, counters: &mut Counters) -> Result<CoordinatesArray> {
    let num_rings = take_range(vector.part_offsets(), &mut counters.part)
        .ok_or_else(|| malformed("polygon without part offsets"))?;
    let mut rings = Vec::with_capacity(num_rings);
    for _ in 0..num_rings {
        let num_vertices = take_range(vector.ring_offsets(), &mut counters.ring)
            .ok_or_else(|| malformed("polygon without ring offsets"))?;
        rings.push(read_vertices(vector, counters, num_vertices, true)?);
    }
    Ok(rings)
}

fn read_vertices(
    vector: &GeometryVector,
    counters: &mut Counters,
    num_vertices: usize,
    close: bool,
) -> Result<Ring> {
    let mut ring = Vec::with_capacity(num_vertices + usize::from(close));
    for _ in 0..num_vertices {
        ring.push(vector.vertex_at_slot(counters.vertex)?);
        counters.vertex += 1;
    }
    if close && let Some(&first) = ring.first() {
        ring.push(first);
    }
    Ok(ring)
}

/// Reads the width of the next range in `offsets`, advancing the counter.
/// `None` when the level is absent, exhausted, or non-monotonic.
fn take_range(offsets: Option<&[u32]>, counter: &mut usize) -> Option<usize> {
    let offsets = offsets?;
    let start = *offsets.get(*counter)?;
    let end = *offsets.get(*counter + 1)?;
    let width = end.checked_sub(start)?;
    *counter += 1;
    Some(width as usize)
}

fn check_consumed(offsets: Option<&[u32]>, counter: usize, level: &'static str) -> Result<()> {
    if let Some(offsets) = offsets
        && counter != offsets.len() - 1
    {
        return Err(Error::malformed(
            Section::Topology,
            format!("{level} offsets not fully consumed"),
        ));
    }
    Ok(())
}
