//! Helpers for synthesizing encoded streams in integration tests.
#![allow(dead_code)]

use mlt::decoder::{
    DictionaryType, LengthType, LogicalLevelTechnique, LogicalStreamType, PhysicalLevelTechnique,
    PhysicalStreamType, RleMetadata, StreamMetadata, write_varint, zigzag_encode,
};

/// Serializes `metadata` with its byte length patched to the payload size,
/// followed by the payload itself.
pub fn encode_stream(mut metadata: StreamMetadata, payload: &[u8]) -> Vec<u8> {
    metadata.byte_length = payload.len() as u32;
    let mut out = Vec::new();
    metadata.encode(&mut out);
    out.extend_from_slice(payload);
    out
}

pub fn varints(values: &[u32]) -> Vec<u8> {
    let mut out = Vec::new();
    for &value in values {
        write_varint(value, &mut out);
    }
    out
}

pub fn plain_metadata(num_values: u32) -> StreamMetadata {
    StreamMetadata {
        physical_stream_type: PhysicalStreamType::Data,
        logical_stream_type: LogicalStreamType::None,
        logical_technique1: LogicalLevelTechnique::None,
        logical_technique2: LogicalLevelTechnique::None,
        physical_technique: PhysicalLevelTechnique::Varint,
        num_values,
        byte_length: 0,
        rle: None,
        morton: None,
    }
}

/// A constant geometry-type stream: RLE with a single run.
pub fn const_geometry_type_stream(kind: u32, num_features: u32) -> Vec<u8> {
    let mut metadata = plain_metadata(2);
    metadata.logical_technique1 = LogicalLevelTechnique::Rle;
    metadata.rle = Some(RleMetadata {
        runs: 1,
        num_rle_values: num_features,
    });
    encode_stream(metadata, &varints(&[num_features, kind]))
}

/// A per-feature geometry-type stream.
pub fn mixed_geometry_type_stream(kinds: &[u32]) -> Vec<u8> {
    let metadata = plain_metadata(kinds.len() as u32);
    encode_stream(metadata, &varints(kinds))
}

/// A LENGTH stream of plain varint run lengths.
pub fn length_stream(length_type: LengthType, lengths: &[u32]) -> Vec<u8> {
    let mut metadata = plain_metadata(lengths.len() as u32);
    metadata.physical_stream_type = PhysicalStreamType::Length;
    metadata.logical_stream_type = LogicalStreamType::Length(length_type);
    encode_stream(metadata, &varints(lengths))
}

/// A vertex DATA stream: componentwise-delta zig-zag varints.
pub fn vertex_stream(points: &[(i32, i32)]) -> Vec<u8> {
    let mut deltas = Vec::with_capacity(points.len() * 2);
    let mut previous = (0i32, 0i32);
    for &(x, y) in points {
        deltas.push(zigzag_encode(x.wrapping_sub(previous.0)));
        deltas.push(zigzag_encode(y.wrapping_sub(previous.1)));
        previous = (x, y);
    }
    let mut metadata = plain_metadata(deltas.len() as u32);
    metadata.logical_stream_type = LogicalStreamType::Dictionary(DictionaryType::Vertex);
    metadata.logical_technique1 = LogicalLevelTechnique::ComponentwiseDelta;
    encode_stream(metadata, &varints(&deltas))
}
