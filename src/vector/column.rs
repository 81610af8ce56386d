//! Decoding a geometry column: the geometry-type stream followed by the
//! topology, dictionary, and vertex streams it announces.

use crate::decoder::{
    Cursor, DictionaryType, IntStreamDecoder, LengthType, LogicalStreamType, PhysicalStreamType,
    StreamMetadata, VectorType, vector_type,
};
use crate::error::{Error, Result, Section};
use crate::vector::geometry::{GeometryTypes, GeometryVector, VertexBufferType};
use crate::vector::types::GeometryKind;

fn malformed(details: &'static str) -> Error {
    Error::malformed(Section::IntStream, details)
}

/// Decodes only the leading geometry-type stream of a column, leaving the
/// cursor at the next stream.
pub fn decode_geometry_types(
    tile: &[u8],
    cursor: &mut Cursor,
    num_features: usize,
) -> Result<GeometryTypes> {
    let metadata = StreamMetadata::decode(tile, cursor)?;
    let mut decoder = IntStreamDecoder::new();
    if vector_type(&metadata) == VectorType::Const {
        let value = decoder.decode_const_int_stream(tile, cursor, &metadata, false)?;
        return Ok(GeometryTypes::Single(GeometryKind::from_discriminant(
            value as u32,
        )?));
    }
    let values = decoder.decode_int_stream(tile, cursor, &metadata, false)?;
    if values.len() != num_features {
        return Err(malformed("geometry type stream disagrees with feature count"));
    }
    let kinds = values
        .into_iter()
        .map(|value| GeometryKind::from_discriminant(value as u32))
        .collect::<Result<Vec<_>>>()?;
    Ok(GeometryTypes::Mixed(kinds))
}

/// Decodes a whole geometry column of `num_streams` streams starting at
/// the cursor.
pub fn decode_geometry_column(
    tile: &[u8],
    cursor: &mut Cursor,
    num_streams: usize,
    num_features: usize,
) -> Result<GeometryVector> {
    if num_streams == 0 {
        return Err(malformed("geometry column without streams"));
    }
    let types = decode_geometry_types(tile, cursor, num_features)?;

    let mut decoder = IntStreamDecoder::new();
    let mut geometry_offsets = None;
    let mut part_offsets = None;
    let mut ring_offsets = None;
    let mut vertex_offsets = None;
    let mut vertex_buffer = None;
    let mut vertex_buffer_type = VertexBufferType::Vec2;
    let mut morton = None;

    for _ in 1..num_streams {
        let metadata = StreamMetadata::decode(tile, cursor)?;
        match metadata.physical_stream_type {
            PhysicalStreamType::Length => {
                let LogicalStreamType::Length(length_type) = metadata.logical_stream_type else {
                    return Err(malformed("length stream without a length type"));
                };
                let offsets =
                    decoder.decode_length_stream_to_offset_buffer(tile, cursor, &metadata)?;
                match length_type {
                    LengthType::Geometries => geometry_offsets = Some(offsets),
                    LengthType::Parts => part_offsets = Some(offsets),
                    LengthType::Rings => ring_offsets = Some(offsets),
                    LengthType::VarBinary | LengthType::Triangles => {
                        return Err(malformed("unexpected length stream in geometry column"));
                    }
                }
            }
            PhysicalStreamType::Offset => {
                vertex_offsets =
                    Some(decoder.decode_int_stream(tile, cursor, &metadata, false)?
                        .into_iter()
                        .map(|value| value as u32)
                        .collect());
            }
            PhysicalStreamType::Data => {
                let LogicalStreamType::Dictionary(dictionary_type) = metadata.logical_stream_type
                else {
                    return Err(malformed("geometry data stream without a dictionary type"));
                };
                match dictionary_type {
                    DictionaryType::Vertex | DictionaryType::None => {
                        vertex_buffer =
                            Some(decoder.decode_int_stream(tile, cursor, &metadata, true)?);
                        vertex_buffer_type = VertexBufferType::Vec2;
                    }
                    DictionaryType::Morton => {
                        morton = Some(metadata.morton.ok_or(Error::MissingParameter {
                            name: "Morton numBits/coordinateShift".into(),
                        })?);
                        vertex_buffer =
                            Some(decoder.decode_int_stream(tile, cursor, &metadata, false)?);
                        vertex_buffer_type = VertexBufferType::Morton;
                    }
                    DictionaryType::String => {
                        return Err(malformed("string dictionary in geometry column"));
                    }
                }
            }
            PhysicalStreamType::Present => {
                return Err(malformed("geometry columns are not nullable"));
            }
        }
    }

    GeometryVector::new(
        types,
        num_features,
        geometry_offsets,
        part_offsets,
        ring_offsets,
        vertex_offsets,
        vertex_buffer.ok_or_else(|| malformed("geometry column without a vertex buffer"))?,
        vertex_buffer_type,
        morton,
    )
}
