mod bits;
mod fastpfor;
mod integer;
mod metadata;
mod unpack;

pub use bits::{
    Cursor, write_varint, write_varint64, zigzag_decode, zigzag_decode64, zigzag_encode,
    zigzag_encode64,
};
pub use fastpfor::{
    BLOCK_SIZE, DEFAULT_PAGE_SIZE, FastPforDecoder, Workspace, encode as encode_fastpfor,
    encode_with_page_size, shared_workspace,
};
pub use integer::{BitVector, IntStreamDecoder, VectorType, encode_byte_rle, vector_type};
pub use metadata::{
    DictionaryType, LengthType, LogicalLevelTechnique, LogicalStreamType, MortonSettings,
    OffsetType, PhysicalLevelTechnique, PhysicalStreamType, RleMetadata, StreamMetadata,
};
pub use unpack::{pack32, unpack32, unpack256};
