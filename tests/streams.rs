#![allow(clippy::pedantic)]
//! Integer stream decoding against synthesized tile bytes.

mod common;

use common::{encode_stream, plain_metadata, varints};
use mlt::decoder::{
    Cursor, IntStreamDecoder, LengthType, LogicalLevelTechnique, LogicalStreamType,
    PhysicalLevelTechnique, PhysicalStreamType, RleMetadata, StreamMetadata, VectorType,
    encode_byte_rle, encode_fastpfor, shared_workspace, vector_type, zigzag_encode,
};

#[test]
fn length_stream_to_offsets_and_cursor_position() {
    let mut metadata = plain_metadata(4);
    metadata.physical_stream_type = PhysicalStreamType::Length;
    metadata.logical_stream_type = LogicalStreamType::Length(LengthType::Parts);
    let tile = encode_stream(metadata, &varints(&[5, 0, 0, 3]));

    let mut cursor = Cursor::new();
    let metadata = StreamMetadata::decode(&tile, &mut cursor).unwrap();
    let mut decoder = IntStreamDecoder::new();
    let offsets = decoder
        .decode_length_stream_to_offset_buffer(&tile, &mut cursor, &metadata)
        .unwrap();
    assert_eq!(offsets, [0, 5, 5, 5, 8]);
    assert_eq!(cursor.get(), tile.len());
}

#[test]
fn delta_stream_prefix_sums() {
    let mut metadata = plain_metadata(4);
    metadata.logical_technique1 = LogicalLevelTechnique::Delta;
    let payload = varints(&[
        zigzag_encode(0),
        zigzag_encode(10),
        zigzag_encode(10),
        zigzag_encode(20),
    ]);
    let tile = encode_stream(metadata, &payload);

    let mut cursor = Cursor::new();
    let metadata = StreamMetadata::decode(&tile, &mut cursor).unwrap();
    let mut decoder = IntStreamDecoder::new();
    let values = decoder
        .decode_int_stream(&tile, &mut cursor, &metadata, true)
        .unwrap();
    assert_eq!(values, [0, 10, 20, 40]);
}

#[test]
fn present_stream_then_data_stream() {
    // A present stream followed by a data stream; the second decode must
    // pick up exactly where the first left off.
    let flags = [
        true, false, true, true, false, false, true, false, true, false, true,
    ];
    let mut packed_bytes = vec![0u8; flags.len().div_ceil(8)];
    for (i, &flag) in flags.iter().enumerate() {
        if flag {
            packed_bytes[i >> 3] |= 1 << (i & 7);
        }
    }
    let mut rle = Vec::new();
    encode_byte_rle(&packed_bytes, &mut rle);

    let mut present_metadata = plain_metadata(flags.len() as u32);
    present_metadata.physical_stream_type = PhysicalStreamType::Present;
    let mut tile = encode_stream(present_metadata, &rle);

    let data_metadata = plain_metadata(3);
    tile.extend_from_slice(&encode_stream(data_metadata, &varints(&[11, 12, 13])));

    let mut cursor = Cursor::new();
    let mut decoder = IntStreamDecoder::new();

    let metadata = StreamMetadata::decode(&tile, &mut cursor).unwrap();
    let present = decoder
        .decode_boolean_rle(&tile, &mut cursor, &metadata)
        .unwrap();
    assert_eq!(present.len(), flags.len());
    for (i, &flag) in flags.iter().enumerate() {
        assert_eq!(present.get(i), flag, "bit {i}");
    }

    let metadata = StreamMetadata::decode(&tile, &mut cursor).unwrap();
    let values = decoder
        .decode_int_stream(&tile, &mut cursor, &metadata, false)
        .unwrap();
    assert_eq!(values, [11, 12, 13]);
    assert_eq!(cursor.get(), tile.len());
}

#[test]
fn fastpfor_physical_stream_advances_exactly_byte_length() {
    let values: Vec<i32> = (0..300).map(|i| i * 5).collect();
    let payload = {
        let mut ws = shared_workspace().lock().unwrap();
        encode_fastpfor(&values, &mut ws)
    };
    let mut metadata = plain_metadata(values.len() as u32);
    metadata.physical_technique = PhysicalLevelTechnique::FastPfor;
    let mut tile = encode_stream(metadata, &payload);
    let trailer = [0xEEu8; 5];
    tile.extend_from_slice(&trailer);

    let mut cursor = Cursor::new();
    let metadata = StreamMetadata::decode(&tile, &mut cursor).unwrap();
    let payload_start = cursor.get();
    let mut decoder = IntStreamDecoder::new();
    let decoded = decoder
        .decode_int_stream(&tile, &mut cursor, &metadata, false)
        .unwrap();
    assert_eq!(decoded, values);
    assert_eq!(cursor.get(), payload_start + metadata.byte_length as usize);
    assert_eq!(cursor.get(), tile.len() - trailer.len());
}

#[test]
fn const_stream_detection_and_decode() {
    let mut metadata = plain_metadata(2);
    metadata.logical_technique1 = LogicalLevelTechnique::Rle;
    metadata.rle = Some(RleMetadata {
        runs: 1,
        num_rle_values: 40,
    });
    let tile = encode_stream(metadata, &varints(&[40, 6]));

    let mut cursor = Cursor::new();
    let metadata = StreamMetadata::decode(&tile, &mut cursor).unwrap();
    assert_eq!(vector_type(&metadata), VectorType::Const);
    let mut decoder = IntStreamDecoder::new();
    let value = decoder
        .decode_const_int_stream(&tile, &mut cursor, &metadata, false)
        .unwrap();
    assert_eq!(value, 6);
    assert_eq!(cursor.get(), tile.len());
}

#[test]
fn truncated_varint_stream_is_rejected() {
    let metadata = plain_metadata(3);
    // Payload claims three varints but holds one.
    let tile = encode_stream(metadata, &varints(&[1]));
    let mut cursor = Cursor::new();
    let metadata = StreamMetadata::decode(&tile, &mut cursor).unwrap();
    let mut decoder = IntStreamDecoder::new();
    assert!(
        decoder
            .decode_int_stream(&tile, &mut cursor, &metadata, false)
            .is_err()
    );
}
