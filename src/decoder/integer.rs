//! Stream-metadata-driven integer stream decoding: the physical layer
//! (raw / varint / FastPFOR) followed by the logical cascade (RLE, delta,
//! zig-zag, componentwise delta, Morton passthrough).

use crate::decoder::bits::{Cursor, zigzag_decode};
use crate::decoder::fastpfor::FastPforDecoder;
use crate::decoder::metadata::{
    LogicalLevelTechnique, PhysicalLevelTechnique, StreamMetadata,
};
use crate::error::{Error, Result, Section};

/// Shape of a decoded stream, inferred from its metadata. A CONST stream
/// carries one logical value for the whole column; a SEQUENCE stream an
/// arithmetic progression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VectorType {
    Flat,
    Const,
    Sequence,
}

/// Infers the vector type of an integer stream without decoding it.
#[must_use]
pub fn vector_type(metadata: &StreamMetadata) -> VectorType {
    if metadata.logical_technique1 == LogicalLevelTechnique::Rle {
        return match metadata.rle {
            Some(rle) if rle.runs == 1 => VectorType::Const,
            _ => VectorType::Flat,
        };
    }
    if metadata.num_values == 1 {
        return VectorType::Const;
    }
    if metadata.logical_technique1 == LogicalLevelTechnique::Delta
        && metadata.logical_technique2 == LogicalLevelTechnique::Rle
        && metadata.rle.is_some_and(|rle| rle.runs == 2)
    {
        return VectorType::Sequence;
    }
    VectorType::Flat
}

/// Bit-packed boolean vector produced by PRESENT streams.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitVector {
    bits: Vec<u8>,
    len: usize,
}

impl BitVector {
    /// Builds a bit vector from packed bytes (LSB-first within each byte).
    #[must_use]
    pub fn from_bytes(bits: Vec<u8>, len: usize) -> Self {
        debug_assert!(bits.len() * 8 >= len);
        Self { bits, len }
    }

    #[must_use]
    pub fn from_bools(values: &[bool]) -> Self {
        let mut bits = vec![0u8; values.len().div_ceil(8)];
        for (i, &value) in values.iter().enumerate() {
            if value {
                bits[i >> 3] |= 1 << (i & 7);
            }
        }
        Self {
            bits,
            len: values.len(),
        }
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[must_use]
    pub fn get(&self, index: usize) -> bool {
        debug_assert!(index < self.len);
        self.bits[index >> 3] >> (index & 7) & 1 == 1
    }

    /// Number of set bits strictly before `index`; the rank used to map a
    /// feature index into a dense nullable value buffer.
    #[must_use]
    pub fn rank(&self, index: usize) -> usize {
        let full_bytes = index >> 3;
        let mut count = self.bits[..full_bytes]
            .iter()
            .map(|byte| byte.count_ones() as usize)
            .sum::<usize>();
        let tail = index & 7;
        if tail != 0 {
            count += (self.bits[full_bytes] & ((1 << tail) - 1)).count_ones() as usize;
        }
        count
    }
}

/// Integer stream decoder owning the FastPFOR scratch buffers, so one
/// decoder can be reused across every stream of a tile.
pub struct IntStreamDecoder {
    fastpfor: FastPforDecoder,
}

impl IntStreamDecoder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            fastpfor: FastPforDecoder::new(),
        }
    }

    /// Decodes the physical layer only: `num_values` raw integers.
    fn decode_physical(
        &mut self,
        tile: &[u8],
        cursor: &mut Cursor,
        metadata: &StreamMetadata,
    ) -> Result<Vec<i32>> {
        let start = cursor.get();
        let byte_length = metadata.byte_length as usize;
        let num_values = metadata.num_values as usize;
        let values = match metadata.physical_technique {
            PhysicalLevelTechnique::None => {
                let mut values = Vec::with_capacity(num_values);
                for _ in 0..num_values {
                    values.push(cursor.read_i32_be(tile)?);
                }
                values
            }
            PhysicalLevelTechnique::Varint => {
                let mut values = Vec::with_capacity(num_values);
                for _ in 0..num_values {
                    values.push(cursor.read_varint(tile)? as i32);
                }
                values
            }
            PhysicalLevelTechnique::FastPfor => {
                let payload = tile
                    .get(start..start + byte_length)
                    .ok_or_else(|| {
                        Error::malformed(Section::IntStream, "stream payload exceeds tile")
                    })?;
                let values = self.fastpfor.decode(payload, num_values)?;
                cursor.set(start + byte_length);
                values
            }
        };
        if cursor.get() != start + byte_length {
            return Err(Error::malformed(
                Section::IntStream,
                "stream consumed a different number of bytes than its metadata declares",
            ));
        }
        Ok(values)
    }

    /// Decodes a full integer stream: physical layer plus logical cascade.
    pub fn decode_int_stream(
        &mut self,
        tile: &[u8],
        cursor: &mut Cursor,
        metadata: &StreamMetadata,
        signed: bool,
    ) -> Result<Vec<i32>> {
        let values = self.decode_physical(tile, cursor, metadata)?;
        decode_int_array(values, metadata, signed)
    }

    /// Decodes a CONST stream down to its single scalar.
    pub fn decode_const_int_stream(
        &mut self,
        tile: &[u8],
        cursor: &mut Cursor,
        metadata: &StreamMetadata,
        signed: bool,
    ) -> Result<i32> {
        let values = self.decode_physical(tile, cursor, metadata)?;
        let raw = if metadata.logical_technique1 == LogicalLevelTechnique::Rle {
            let runs = metadata
                .rle
                .ok_or_else(|| Error::malformed(Section::IntStream, "RLE stream without runs"))?
                .runs as usize;
            *values.get(runs).ok_or_else(|| {
                Error::malformed(Section::IntStream, "const RLE stream has no value part")
            })?
        } else {
            *values.first().ok_or_else(|| {
                Error::malformed(Section::IntStream, "const stream is empty")
            })?
        };
        Ok(if signed { zigzag_decode(raw as u32) } else { raw })
    }

    /// Decodes a SEQUENCE stream to its `(base, delta)` pair.
    pub fn decode_sequence_int_stream(
        &mut self,
        tile: &[u8],
        cursor: &mut Cursor,
        metadata: &StreamMetadata,
    ) -> Result<(i32, i32)> {
        let values = self.decode_physical(tile, cursor, metadata)?;
        let runs = metadata.rle.map_or(0, |rle| rle.runs);
        if runs != 2 || values.len() < 4 {
            return Err(Error::malformed(
                Section::IntStream,
                "sequence stream does not carry two runs",
            ));
        }
        // Runs [1, n-1], values [base, delta], both zig-zag encoded.
        Ok((
            zigzag_decode(values[2] as u32),
            zigzag_decode(values[3] as u32),
        ))
    }

    /// Decodes a LENGTH stream and converts it to an offset buffer:
    /// `out[0] = 0`, `out[i] = sum(lengths[..i])`, length `numValues + 1`.
    pub fn decode_length_stream_to_offset_buffer(
        &mut self,
        tile: &[u8],
        cursor: &mut Cursor,
        metadata: &StreamMetadata,
    ) -> Result<Vec<u32>> {
        let lengths = self.decode_int_stream(tile, cursor, metadata, false)?;
        let mut offsets = Vec::with_capacity(lengths.len() + 1);
        let mut total = 0u32;
        offsets.push(0);
        for &length in &lengths {
            total = total.checked_add(length as u32).ok_or_else(|| {
                Error::malformed(Section::LengthStream, "length stream overflows offsets")
            })?;
            offsets.push(total);
        }
        Ok(offsets)
    }

    /// Decodes a PRESENT stream: byte-level RLE over a bit-packed boolean
    /// vector of `decompressed_count` booleans.
    pub fn decode_boolean_rle(
        &mut self,
        tile: &[u8],
        cursor: &mut Cursor,
        metadata: &StreamMetadata,
    ) -> Result<BitVector> {
        let num_booleans = metadata.decompressed_count();
        let num_bytes = num_booleans.div_ceil(8);
        let start = cursor.get();
        let bytes = decode_byte_rle(tile, cursor, num_bytes)?;
        if cursor.get() != start + metadata.byte_length as usize {
            return Err(Error::malformed(
                Section::PresentStream,
                "present stream consumed a different number of bytes than declared",
            ));
        }
        Ok(BitVector::from_bytes(bytes, num_booleans))
    }
}

impl Default for IntStreamDecoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Applies the logical cascade to physically decoded values.
fn decode_int_array(
    values: Vec<i32>,
    metadata: &StreamMetadata,
    signed: bool,
) -> Result<Vec<i32>> {
    match metadata.logical_technique1 {
        LogicalLevelTechnique::Rle => {
            let expanded = expand_rle(&values, metadata)?;
            Ok(if signed {
                expanded
                    .into_iter()
                    .map(|value| zigzag_decode(value as u32))
                    .collect()
            } else {
                expanded
            })
        }
        LogicalLevelTechnique::Delta => {
            let deltas = if metadata.logical_technique2 == LogicalLevelTechnique::Rle {
                expand_rle(&values, metadata)?
            } else {
                values
            };
            Ok(decode_zigzag_delta(&deltas))
        }
        LogicalLevelTechnique::ComponentwiseDelta => Ok(decode_componentwise_delta(values)),
        // Morton codes stay packed; geometry decoding unpacks them per
        // vertex with the settings carried in the metadata.
        LogicalLevelTechnique::Morton => Ok(values),
        LogicalLevelTechnique::None => Ok(if signed {
            values
                .into_iter()
                .map(|value| zigzag_decode(value as u32))
                .collect()
        } else {
            values
        }),
        LogicalLevelTechnique::Pfor | LogicalLevelTechnique::PforDelta => Err(Error::malformed(
            Section::IntStream,
            "PFOR logical techniques are expressed at the physical level",
        )),
    }
}

/// Expands an RLE stream laid out as `runs` run lengths followed by the
/// run values.
fn expand_rle(values: &[i32], metadata: &StreamMetadata) -> Result<Vec<i32>> {
    let rle = metadata
        .rle
        .ok_or_else(|| Error::malformed(Section::IntStream, "RLE stream without run metadata"))?;
    let runs = rle.runs as usize;
    if values.len() < runs * 2 {
        return Err(Error::malformed(
            Section::IntStream,
            "RLE stream shorter than its run count",
        ));
    }
    let total = rle.num_rle_values as usize;
    let mut out = Vec::with_capacity(total);
    for run in 0..runs {
        let length = values[run] as usize;
        let value = values[runs + run];
        if out.len() + length > total {
            return Err(Error::malformed(
                Section::IntStream,
                "RLE run lengths disagree with the decompressed count",
            ));
        }
        out.resize(out.len() + length, value);
    }
    if out.len() != rle.num_rle_values as usize {
        return Err(Error::malformed(
            Section::IntStream,
            "RLE run lengths disagree with the decompressed count",
        ));
    }
    Ok(out)
}

/// Prefix-sums zig-zag encoded deltas.
fn decode_zigzag_delta(deltas: &[i32]) -> Vec<i32> {
    let mut out = Vec::with_capacity(deltas.len());
    let mut previous = 0i32;
    for &delta in deltas {
        previous = previous.wrapping_add(zigzag_decode(delta as u32));
        out.push(previous);
    }
    out
}

/// Prefix-sums zig-zag deltas independently over even and odd positions;
/// the layout used by interleaved 2-D vertex buffers.
fn decode_componentwise_delta(mut values: Vec<i32>) -> Vec<i32> {
    let mut x = 0i32;
    let mut y = 0i32;
    for pair in values.chunks_exact_mut(2) {
        x = x.wrapping_add(zigzag_decode(pair[0] as u32));
        y = y.wrapping_add(zigzag_decode(pair[1] as u32));
        pair[0] = x;
        pair[1] = y;
    }
    values
}

/// Decodes ORC-flavor byte RLE: a control byte `n < 0x80` introduces a run
/// of `n + 3` copies of the next byte, `n >= 0x80` introduces `256 - n`
/// literal bytes.
fn decode_byte_rle(tile: &[u8], cursor: &mut Cursor, num_bytes: usize) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(num_bytes);
    while out.len() < num_bytes {
        let header = *tile
            .get(cursor.get())
            .ok_or_else(|| Error::malformed(Section::PresentStream, "truncated byte RLE"))?;
        cursor.advance(1);
        if header < 0x80 {
            let run = usize::from(header) + 3;
            let value = *tile
                .get(cursor.get())
                .ok_or_else(|| Error::malformed(Section::PresentStream, "truncated byte RLE run"))?;
            cursor.advance(1);
            out.resize(out.len() + run, value);
        } else {
            let count = 256 - usize::from(header);
            let literals = tile
                .get(cursor.get()..cursor.get() + count)
                .ok_or_else(|| {
                    Error::malformed(Section::PresentStream, "truncated byte RLE literals")
                })?;
            cursor.advance(count);
            out.extend_from_slice(literals);
        }
    }
    if out.len() != num_bytes {
        return Err(Error::malformed(
            Section::PresentStream,
            "byte RLE produced more bytes than requested",
        ));
    }
    Ok(out)
}

/// Encodes bytes with the byte-RLE scheme decoded above. Test support.
pub fn encode_byte_rle(bytes: &[u8], out: &mut Vec<u8>) {
    let mut pos = 0usize;
    while pos < bytes.len() {
        // Measure the run at `pos`.
        let mut run = 1usize;
        while pos + run < bytes.len() && bytes[pos + run] == bytes[pos] && run < 130 {
            run += 1;
        }
        if run >= 3 {
            out.push((run - 3) as u8);
            out.push(bytes[pos]);
            pos += run;
        } else {
            // Collect literals until the next run of >= 3 (or 128 max).
            let mut end = pos + 1;
            while end < bytes.len() && end - pos < 128 {
                if end + 2 < bytes.len() && bytes[end] == bytes[end + 1] && bytes[end] == bytes[end + 2]
                {
                    break;
                }
                end += 1;
            }
            out.push((256 - (end - pos)) as u8);
            out.extend_from_slice(&bytes[pos..end]);
            pos = end;
        }
    }
}
