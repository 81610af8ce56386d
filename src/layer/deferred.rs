//! Deferred geometry column: geometry-type queries without vertex decode.

use std::cell::OnceCell;

use bytes::Bytes;

use crate::decoder::Cursor;
use crate::error::{Error, Result};
use crate::vector::{
    GeometryKind, GeometryTypes, GeometryVector, decode_geometry_column, decode_geometry_types,
};

/// A geometry column whose streams have not been decoded yet.
///
/// Holds a handle to the raw tile bytes plus the stream count and byte
/// offset of the column. `geometry_type` decodes only the leading
/// geometry-type stream; `get` decodes everything. Both cache their result,
/// and neither is safe for concurrent mutation (the caches are cells).
pub struct DeferredGeometryColumn {
    tile: Bytes,
    offset: usize,
    num_streams: usize,
    num_features: usize,
    types: OnceCell<GeometryTypes>,
    vector: OnceCell<GeometryVector>,
}

impl DeferredGeometryColumn {
    #[must_use]
    pub const fn new(tile: Bytes, offset: usize, num_streams: usize, num_features: usize) -> Self {
        Self {
            tile,
            offset,
            num_streams,
            num_features,
            types: OnceCell::new(),
            vector: OnceCell::new(),
        }
    }

    #[must_use]
    pub const fn num_features(&self) -> usize {
        self.num_features
    }

    /// Kind of feature `index`. The first call decodes the geometry-type
    /// stream alone; later calls are O(1) lookups.
    pub fn geometry_type(&self, index: usize) -> Result<GeometryKind> {
        if index >= self.num_features {
            return Err(Error::OutOfRange {
                index,
                len: self.num_features,
            });
        }
        if self.types.get().is_none() {
            let mut cursor = Cursor::at(self.offset);
            let types = decode_geometry_types(&self.tile, &mut cursor, self.num_features)?;
            let _ = self.types.set(types);
        }
        let types = self.types.get().expect("populated above");
        types.kind_at(index).ok_or(Error::OutOfRange {
            index,
            len: self.num_features,
        })
    }

    /// Fully decodes the column, caching the vector.
    pub fn get(&self) -> Result<&GeometryVector> {
        if self.vector.get().is_none() {
            let vector = self.decode_vector()?;
            let _ = self.vector.set(vector);
        }
        Ok(self.vector.get().expect("populated above"))
    }

    /// Decodes the column without touching the cache; the feature table
    /// uses this to take ownership of the vector and drop the column (and
    /// with it the tile byte range).
    pub(crate) fn decode_vector(&self) -> Result<GeometryVector> {
        let mut cursor = Cursor::at(self.offset);
        decode_geometry_column(&self.tile, &mut cursor, self.num_streams, self.num_features)
    }
}
