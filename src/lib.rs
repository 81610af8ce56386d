//! Decoder for the MLT columnar vector-tile container.
//!
//! A tile column is a concatenation of integer streams, each prefixed by
//! self-describing metadata. The [`decoder`] module handles the physical
//! codecs (varint, FastPFOR) and the logical cascades (RLE, delta,
//! zig-zag, Morton); [`vector`] reconstructs feature geometries from the
//! decoded topology and vertex buffers; [`layer`] exposes features through
//! a lazy, access-pattern-adaptive facade.

pub mod decoder;
pub mod error;
pub mod layer;
pub mod logger;
pub mod vector;

pub use error::{Error, Result, Section};
pub use layer::{
    DeferredGeometryColumn, Feature, FeatureId, FeatureTable, FeatureTableBuilder, IdColumn,
    PropertyColumn, PropertyValue, PropertyValues, TableOptions, VirtualLayer,
};
pub use vector::{
    CoordinatesArray, GeometryKind, GeometrySource, GeometryVector, PackedGeometryVector, Point,
};
