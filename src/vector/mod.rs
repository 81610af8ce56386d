mod column;
mod convert;
mod geometry;
mod packed;
mod single;
mod types;

pub use column::{decode_geometry_column, decode_geometry_types};
pub use convert::convert_geometry_vector;
pub use geometry::{GeometryTypes, GeometryVector, VertexBufferType, encode_morton};
pub use packed::{GeometrySource, PackedGeometryVector};
pub use single::convert_single_geometry;
pub use types::{CoordinatesArray, GeometryKind, Point, Ring};
