//! Stream metadata: the self-describing header read before every integer
//! stream in a tile column.

use serde::Serialize;

use crate::decoder::bits::{Cursor, write_varint};
use crate::error::{Error, Result, Section};

fn malformed(details: &'static str) -> Error {
    Error::malformed(Section::StreamMetadata, details)
}

/// Physical role of a stream within its column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhysicalStreamType {
    Present,
    Data,
    Offset,
    Length,
}

impl PhysicalStreamType {
    fn from_nibble(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Self::Present),
            1 => Ok(Self::Data),
            2 => Ok(Self::Offset),
            3 => Ok(Self::Length),
            _ => Err(malformed("unknown physical stream type")),
        }
    }

    const fn to_nibble(self) -> u8 {
        match self {
            Self::Present => 0,
            Self::Data => 1,
            Self::Offset => 2,
            Self::Length => 3,
        }
    }
}

/// What a DATA or OFFSET stream's values index into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DictionaryType {
    None,
    Vertex,
    Morton,
    String,
}

/// What a LENGTH stream's run lengths partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthType {
    VarBinary,
    Geometries,
    Parts,
    Rings,
    Triangles,
}

/// What an OFFSET stream's indices point at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OffsetType {
    Vertex,
    String,
}

/// Logical role of the stream, refining the physical type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalStreamType {
    None,
    Dictionary(DictionaryType),
    Length(LengthType),
    Offset(OffsetType),
}

impl LogicalStreamType {
    const fn discriminant(self) -> u8 {
        match self {
            Self::None => 0,
            Self::Dictionary(_) => 1,
            Self::Length(_) => 2,
            Self::Offset(_) => 3,
        }
    }

    const fn subtype(self) -> Option<u8> {
        match self {
            Self::None => None,
            Self::Dictionary(kind) => Some(match kind {
                DictionaryType::None => 0,
                DictionaryType::Vertex => 1,
                DictionaryType::Morton => 2,
                DictionaryType::String => 3,
            }),
            Self::Length(kind) => Some(match kind {
                LengthType::VarBinary => 0,
                LengthType::Geometries => 1,
                LengthType::Parts => 2,
                LengthType::Rings => 3,
                LengthType::Triangles => 4,
            }),
            Self::Offset(kind) => Some(match kind {
                OffsetType::Vertex => 0,
                OffsetType::String => 1,
            }),
        }
    }

    fn decode(discriminant: u8, tile: &[u8], cursor: &mut Cursor) -> Result<Self> {
        if discriminant == 0 {
            return Ok(Self::None);
        }
        let subtype = *tile
            .get(cursor.get())
            .ok_or_else(|| malformed("truncated logical stream type"))?;
        cursor.advance(1);
        match discriminant {
            1 => Ok(Self::Dictionary(match subtype {
                0 => DictionaryType::None,
                1 => DictionaryType::Vertex,
                2 => DictionaryType::Morton,
                3 => DictionaryType::String,
                _ => return Err(malformed("unknown dictionary type")),
            })),
            2 => Ok(Self::Length(match subtype {
                0 => LengthType::VarBinary,
                1 => LengthType::Geometries,
                2 => LengthType::Parts,
                3 => LengthType::Rings,
                4 => LengthType::Triangles,
                _ => return Err(malformed("unknown length type")),
            })),
            3 => Ok(Self::Offset(match subtype {
                0 => OffsetType::Vertex,
                1 => OffsetType::String,
                _ => return Err(malformed("unknown offset type")),
            })),
            _ => Err(malformed("unknown logical stream type")),
        }
    }
}

/// Value-level transformation applied before the physical encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalLevelTechnique {
    None,
    Delta,
    ComponentwiseDelta,
    Rle,
    Morton,
    Pfor,
    PforDelta,
}

impl LogicalLevelTechnique {
    fn from_bits(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Self::None),
            1 => Ok(Self::Delta),
            2 => Ok(Self::ComponentwiseDelta),
            3 => Ok(Self::Rle),
            4 => Ok(Self::Morton),
            5 => Ok(Self::Pfor),
            6 => Ok(Self::PforDelta),
            _ => Err(malformed("unknown logical level technique")),
        }
    }

    const fn to_bits(self) -> u8 {
        match self {
            Self::None => 0,
            Self::Delta => 1,
            Self::ComponentwiseDelta => 2,
            Self::Rle => 3,
            Self::Morton => 4,
            Self::Pfor => 5,
            Self::PforDelta => 6,
        }
    }
}

/// Byte-level encoding of the stream payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhysicalLevelTechnique {
    None,
    FastPfor,
    Varint,
}

impl PhysicalLevelTechnique {
    fn from_bits(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Self::None),
            1 => Ok(Self::FastPfor),
            2 => Ok(Self::Varint),
            _ => Err(malformed("unknown physical level technique")),
        }
    }

    const fn to_bits(self) -> u8 {
        match self {
            Self::None => 0,
            Self::FastPfor => 1,
            Self::Varint => 2,
        }
    }
}

/// Extension carried by RLE-encoded streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RleMetadata {
    pub runs: u32,
    pub num_rle_values: u32,
}

/// Bit layout used to pack `(x, y)` pairs into Z-order codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MortonSettings {
    pub num_bits: u32,
    pub coordinate_shift: u32,
}

/// Decoded header of one integer stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamMetadata {
    pub physical_stream_type: PhysicalStreamType,
    pub logical_stream_type: LogicalStreamType,
    pub logical_technique1: LogicalLevelTechnique,
    pub logical_technique2: LogicalLevelTechnique,
    pub physical_technique: PhysicalLevelTechnique,
    /// Number of values in the physical payload.
    pub num_values: u32,
    /// Exact byte length of the payload that follows this header.
    pub byte_length: u32,
    pub rle: Option<RleMetadata>,
    pub morton: Option<MortonSettings>,
}

impl StreamMetadata {
    /// Reads one stream header, leaving the cursor at the payload start.
    pub fn decode(tile: &[u8], cursor: &mut Cursor) -> Result<Self> {
        let stream_type = *tile
            .get(cursor.get())
            .ok_or_else(|| malformed("truncated stream type byte"))?;
        cursor.advance(1);
        let physical_stream_type = PhysicalStreamType::from_nibble(stream_type & 0x0F)?;
        let logical_stream_type = LogicalStreamType::decode(stream_type >> 4, tile, cursor)?;

        let techniques = *tile
            .get(cursor.get())
            .ok_or_else(|| malformed("truncated techniques byte"))?;
        cursor.advance(1);
        let logical_technique1 = LogicalLevelTechnique::from_bits(techniques >> 5)?;
        let logical_technique2 = LogicalLevelTechnique::from_bits((techniques >> 2) & 0x07)?;
        let physical_technique = PhysicalLevelTechnique::from_bits(techniques & 0x03)?;

        let num_values = cursor.read_varint(tile)?;
        let byte_length = cursor.read_varint(tile)?;

        let uses_rle = logical_technique1 == LogicalLevelTechnique::Rle
            || logical_technique2 == LogicalLevelTechnique::Rle;
        let rle = if uses_rle {
            Some(RleMetadata {
                runs: cursor.read_varint(tile)?,
                num_rle_values: cursor.read_varint(tile)?,
            })
        } else {
            None
        };

        let uses_morton = logical_technique1 == LogicalLevelTechnique::Morton
            || logical_technique2 == LogicalLevelTechnique::Morton;
        let morton = if uses_morton {
            Some(MortonSettings {
                num_bits: cursor.read_varint(tile)?,
                coordinate_shift: cursor.read_varint(tile)?,
            })
        } else {
            None
        };

        Ok(Self {
            physical_stream_type,
            logical_stream_type,
            logical_technique1,
            logical_technique2,
            physical_technique,
            num_values,
            byte_length,
            rle,
            morton,
        })
    }

    /// Final element count after the logical cascade is undone.
    #[must_use]
    pub fn decompressed_count(&self) -> usize {
        self.rle
            .map_or(self.num_values as usize, |rle| rle.num_rle_values as usize)
    }

    /// Serializes the header; the inverse of [`StreamMetadata::decode`].
    /// Exists so round-trip tests can synthesize streams.
    pub fn encode(&self, out: &mut Vec<u8>) {
        out.push(
            self.physical_stream_type.to_nibble() | (self.logical_stream_type.discriminant() << 4),
        );
        if let Some(subtype) = self.logical_stream_type.subtype() {
            out.push(subtype);
        }
        out.push(
            (self.logical_technique1.to_bits() << 5)
                | (self.logical_technique2.to_bits() << 2)
                | self.physical_technique.to_bits(),
        );
        write_varint(self.num_values, out);
        write_varint(self.byte_length, out);
        if let Some(rle) = self.rle {
            write_varint(rle.runs, out);
            write_varint(rle.num_rle_values, out);
        }
        if let Some(morton) = self.morton {
            write_varint(morton.num_bits, out);
            write_varint(morton.coordinate_shift, out);
        }
    }
}
