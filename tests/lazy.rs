#![allow(clippy::pedantic)]
//! Lazy facade behavior: the deferred geometry column, the adaptive
//! coordinates resolver, and the virtual layer.

mod common;

use bytes::Bytes;
use common::{const_geometry_type_stream, length_stream, mixed_geometry_type_stream, vertex_stream};
use mlt::decoder::{BitVector, LengthType};
use mlt::layer::{
    DeferredGeometryColumn, FeatureId, FeatureTable, FeatureTableBuilder, IdColumn, PropertyColumn,
    PropertyValues, TableOptions,
};
use mlt::vector::{
    GeometryKind, GeometrySource, GeometryTypes, GeometryVector, PackedGeometryVector, Point,
    VertexBufferType,
};
use mlt::Error;

fn point_vector(count: usize) -> GeometryVector {
    let buffer: Vec<i32> = (0..count as i32).flat_map(|i| [i, i * 2]).collect();
    GeometryVector::new(
        GeometryTypes::Single(GeometryKind::Point),
        count,
        None,
        None,
        None,
        None,
        buffer,
        VertexBufferType::Vec2,
        None,
    )
    .unwrap()
}

fn point_table(count: usize) -> FeatureTable {
    FeatureTableBuilder::new("points")
        .geometry(GeometrySource::Columnar(point_vector(count)))
        .build()
        .unwrap()
}

#[test]
fn coordinates_are_not_decoded_until_read() {
    let table = point_table(100);
    let layer = table.layer();
    let feature = layer.feature(7).unwrap();
    assert_eq!(feature.geometry_type(), GeometryKind::Point);
    let stats = table.resolver_stats();
    assert_eq!(stats.single_conversions, 0);
    assert_eq!(stats.bulk_conversions, 0);

    let coordinates = feature.coordinates().unwrap();
    assert_eq!(coordinates, &vec![vec![Point::new(7, 14)]]);
    assert_eq!(table.resolver_stats().single_conversions, 1);
}

#[test]
fn repeated_reads_hit_the_feature_cache() {
    let table = point_table(10);
    let layer = table.layer();
    let feature = layer.feature(3).unwrap();
    let first = feature.coordinates().unwrap() as *const _;
    let second = feature.coordinates().unwrap() as *const _;
    assert_eq!(first, second);
    assert_eq!(table.resolver_stats().single_conversions, 1);
}

#[test]
fn sequential_scan_triggers_exactly_one_bulk_conversion() {
    let table = point_table(100);
    let layer = table.layer();
    for index in 0..=35 {
        let feature = layer.feature(index).unwrap();
        feature.coordinates().unwrap();
    }
    let stats = table.resolver_stats();
    assert_eq!(stats.bulk_conversions, 1);
    // The threshold tripped on the 33rd access; everything before it was
    // a single decode, everything after came from the materialized cache.
    assert_eq!(stats.single_conversions, 32);

    let feature = layer.feature(90).unwrap();
    feature.coordinates().unwrap();
    let stats = table.resolver_stats();
    assert_eq!(stats.bulk_conversions, 1);
    assert_eq!(stats.single_conversions, 32);
}

#[test]
fn sparse_access_stays_on_single_decodes() {
    let table = point_table(100);
    let layer = table.layer();
    for index in [0usize, 50, 99] {
        let feature = layer.feature(index).unwrap();
        assert_eq!(
            feature.coordinates().unwrap(),
            &vec![vec![Point::new(index as i32, index as i32 * 2)]]
        );
    }
    let stats = table.resolver_stats();
    assert_eq!(stats.single_conversions, 3);
    assert_eq!(stats.bulk_conversions, 0);
}

#[test]
fn non_sequential_jump_resets_the_sequential_counter() {
    let table = point_table(100);
    let layer = table.layer();
    // Two sequential bursts of 20 with a jump between them: neither burst
    // alone reaches the threshold, and the jump must not carry it over.
    for index in (0..20).chain(60..80) {
        layer.feature(index).unwrap().coordinates().unwrap();
    }
    let stats = table.resolver_stats();
    assert_eq!(stats.bulk_conversions, 0);
    assert_eq!(stats.single_conversions, 40);
}

#[test]
fn strided_access_within_delta_two_counts_as_sequential() {
    let table = point_table(100);
    let layer = table.layer();
    for index in (0..70).step_by(2) {
        layer.feature(index).unwrap().coordinates().unwrap();
    }
    assert_eq!(table.resolver_stats().bulk_conversions, 1);
}

#[test]
fn absolute_access_threshold_materializes() {
    let table = point_table(100);
    let layer = table.layer();
    // Ping-pong between two far-apart indices: never near-sequential.
    for round in 0..512 {
        let index = if round % 2 == 0 { 0 } else { 70 };
        layer.feature(index).unwrap().coordinates().unwrap();
    }
    let stats = table.resolver_stats();
    assert_eq!(stats.bulk_conversions, 1);
    assert_eq!(stats.single_conversions, 511);
}

#[test]
fn packed_vector_materializes_on_first_access() {
    let types = GeometryTypes::Single(GeometryKind::Point);
    let positions = vec![1, 2, 3, 4, 5, 6];
    let packed =
        PackedGeometryVector::new(types, positions, vec![1, 1, 1], vec![1, 1, 1]).unwrap();
    let table = FeatureTableBuilder::new("packed")
        .geometry(GeometrySource::Packed(packed))
        .build()
        .unwrap();
    let layer = table.layer();
    let feature = layer.feature(1).unwrap();
    assert_eq!(feature.coordinates().unwrap(), &vec![vec![Point::new(3, 4)]]);
    let stats = table.resolver_stats();
    assert_eq!(stats.bulk_conversions, 1);
    assert_eq!(stats.single_conversions, 0);
}

fn point_column_tile(points: &[(i32, i32)]) -> (Bytes, usize) {
    let mut tile = const_geometry_type_stream(GeometryKind::Point.to_discriminant(), points.len() as u32);
    tile.extend_from_slice(&vertex_stream(points));
    (Bytes::from(tile), 2)
}

#[test]
fn deferred_type_query_does_not_decode_vertices() {
    // The vertex stream is replaced with garbage: a type query must still
    // succeed because only the leading stream is decoded.
    let mut tile = const_geometry_type_stream(GeometryKind::LineString.to_discriminant(), 4);
    tile.extend_from_slice(&[0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF]);
    let deferred = DeferredGeometryColumn::new(Bytes::from(tile), 0, 3, 4);
    assert_eq!(deferred.geometry_type(2).unwrap(), GeometryKind::LineString);
    assert!(deferred.get().is_err());
}

#[test]
fn deferred_column_decodes_on_get() {
    let points = [(16, -3), (25, 25), (0, 7)];
    let (tile, num_streams) = point_column_tile(&points);
    let deferred = DeferredGeometryColumn::new(tile, 0, num_streams, points.len());
    assert_eq!(deferred.num_features(), 3);
    assert_eq!(deferred.geometry_type(0).unwrap(), GeometryKind::Point);
    let vector = deferred.get().unwrap();
    assert_eq!(vector.num_geometries(), 3);
    assert!(matches!(
        deferred.geometry_type(5),
        Err(Error::OutOfRange { index: 5, len: 3 })
    ));
}

#[test]
fn table_over_deferred_column() {
    let points = [(1, 1), (2, 2), (3, 3)];
    let (tile, num_streams) = point_column_tile(&points);
    let deferred = DeferredGeometryColumn::new(tile, 0, num_streams, points.len());
    let table = FeatureTableBuilder::new("water")
        .deferred_geometry(deferred)
        .build()
        .unwrap();
    assert_eq!(table.num_features(), 3);
    // Type queries stay on the deferred fast path.
    assert_eq!(table.geometry_type(1).unwrap(), GeometryKind::Point);
    assert_eq!(table.resolver_stats().single_conversions, 0);

    let layer = table.layer();
    let feature = layer.feature(2).unwrap();
    assert_eq!(feature.coordinates().unwrap(), &vec![vec![Point::new(3, 3)]]);
}

#[test]
fn deferred_mixed_types_column() {
    let mut tile = mixed_geometry_type_stream(&[
        GeometryKind::Point.to_discriminant(),
        GeometryKind::LineString.to_discriminant(),
    ]);
    tile.extend_from_slice(&length_stream(LengthType::Geometries, &[1, 1]));
    tile.extend_from_slice(&length_stream(LengthType::Parts, &[1, 3]));
    tile.extend_from_slice(&vertex_stream(&[(9, 9), (0, 0), (1, 1), (2, 2)]));
    let deferred = DeferredGeometryColumn::new(Bytes::from(tile), 0, 4, 2);
    assert_eq!(deferred.geometry_type(0).unwrap(), GeometryKind::Point);
    assert_eq!(deferred.geometry_type(1).unwrap(), GeometryKind::LineString);

    let table = FeatureTableBuilder::new("mixed")
        .deferred_geometry(deferred)
        .build()
        .unwrap();
    let layer = table.layer();
    assert_eq!(
        layer.feature(1).unwrap().coordinates().unwrap(),
        &vec![vec![Point::new(0, 0), Point::new(1, 1), Point::new(2, 2)]]
    );
    assert_eq!(
        layer.feature(0).unwrap().coordinates().unwrap(),
        &vec![vec![Point::new(9, 9)]]
    );
}

#[test]
fn virtual_layer_features_carry_ids_and_properties() {
    let mut table_builder = FeatureTableBuilder::new("roads")
        .geometry(GeometrySource::Columnar(point_vector(3)))
        .ids(IdColumn::Long(vec![7, u64::from(u32::MAX) + 10, 9]))
        .options(TableOptions::new().with_extent(8192));
    table_builder = table_builder
        .property(PropertyColumn::new(
            "name",
            Some(BitVector::from_bools(&[true, false, true])),
            PropertyValues::String(vec!["main".into(), "side".into()]),
        ))
        .property(PropertyColumn::new(
            "lanes",
            None,
            PropertyValues::Int(vec![2, 4, 6]),
        ));
    let table = table_builder.build().unwrap();
    let layer = table.layer();
    assert_eq!(layer.len(), 3);
    assert_eq!(layer.extent(), 8192);
    assert_eq!(layer.name(), "roads");

    let first = layer.feature(0).unwrap();
    assert_eq!(first.id(), Some(FeatureId::Int(7)));
    assert_eq!(
        first.properties().get("name"),
        Some(&serde_json::Value::String("main".into()))
    );
    assert_eq!(
        first.properties().get("lanes"),
        Some(&serde_json::Value::from(2))
    );

    let second = layer.feature(1).unwrap();
    assert_eq!(second.id(), Some(FeatureId::Long(u64::from(u32::MAX) + 10)));
    // Null properties are omitted entirely.
    assert!(!second.properties().contains_key("name"));

    assert!(matches!(
        layer.feature(3),
        Err(Error::OutOfRange { index: 3, len: 3 })
    ));
}

#[test]
fn layer_iteration_yields_every_feature() {
    let table = point_table(5);
    let layer = table.layer();
    let mut count = 0usize;
    for feature in &layer {
        let feature = feature.unwrap();
        assert_eq!(feature.index(), count);
        count += 1;
    }
    assert_eq!(count, 5);
}
