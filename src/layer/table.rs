//! The feature table and its virtual layer facade.

use std::cell::{OnceCell, RefCell};
use std::collections::HashMap;

use serde::Serialize;

use crate::error::{Error, Result};
use crate::layer::deferred::DeferredGeometryColumn;
use crate::layer::property::PropertyColumn;
use crate::layer::resolver::{CoordinatesResolver, ResolverStats};
use crate::vector::{CoordinatesArray, GeometryKind, GeometrySource};

pub const DEFAULT_EXTENT: u32 = 4096;

/// Configures feature table construction.
#[derive(Debug, Clone)]
pub struct TableOptions {
    extent: u32,
}

impl TableOptions {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            extent: DEFAULT_EXTENT,
        }
    }

    #[must_use]
    pub const fn with_extent(mut self, extent: u32) -> Self {
        self.extent = extent;
        self
    }
}

impl Default for TableOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-feature identifier. Ids that fit 32 bits surface as `Int`; wider
/// ids keep their full width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FeatureId {
    Int(u32),
    Long(u64),
}

impl FeatureId {
    fn from_u64(value: u64) -> Self {
        u32::try_from(value).map_or(Self::Long(value), Self::Int)
    }
}

/// The id column of a feature table.
#[derive(Debug, Clone)]
pub enum IdColumn {
    Int(Vec<u32>),
    Long(Vec<u64>),
    /// Arithmetic progression decoded from a SEQUENCE stream.
    Sequence { base: u64, delta: u64 },
}

impl IdColumn {
    fn value(&self, index: usize) -> Option<FeatureId> {
        match self {
            Self::Int(values) => values.get(index).map(|&id| FeatureId::Int(id)),
            Self::Long(values) => values.get(index).map(|&id| FeatureId::from_u64(id)),
            Self::Sequence { base, delta } => {
                Some(FeatureId::from_u64(base + delta * index as u64))
            }
        }
    }
}

enum GeometrySlot {
    Decoded(GeometrySource),
    Deferred(DeferredGeometryColumn),
}

/// Builder for [`FeatureTable`] in the usual chained-setter style.
pub struct FeatureTableBuilder {
    name: String,
    geometry: Option<GeometrySource>,
    deferred: Option<DeferredGeometryColumn>,
    ids: Option<IdColumn>,
    properties: Vec<PropertyColumn>,
    options: TableOptions,
}

impl FeatureTableBuilder {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            geometry: None,
            deferred: None,
            ids: None,
            properties: Vec::new(),
            options: TableOptions::new(),
        }
    }

    #[must_use]
    pub fn geometry(mut self, source: GeometrySource) -> Self {
        self.geometry = Some(source);
        self
    }

    #[must_use]
    pub fn deferred_geometry(mut self, column: DeferredGeometryColumn) -> Self {
        self.deferred = Some(column);
        self
    }

    #[must_use]
    pub fn ids(mut self, ids: IdColumn) -> Self {
        self.ids = Some(ids);
        self
    }

    #[must_use]
    pub fn property(mut self, column: PropertyColumn) -> Self {
        self.properties.push(column);
        self
    }

    #[must_use]
    pub fn options(mut self, options: TableOptions) -> Self {
        self.options = options;
        self
    }

    /// Builds the table.
    ///
    /// # Errors
    ///
    /// `MissingGeometry` when neither a decoded geometry source nor a
    /// deferred column was supplied. A decoded source wins when both are.
    pub fn build(self) -> Result<FeatureTable> {
        let slot = match (self.geometry, self.deferred) {
            (Some(source), _) => GeometrySlot::Decoded(source),
            (None, Some(deferred)) => GeometrySlot::Deferred(deferred),
            (None, None) => return Err(Error::MissingGeometry),
        };
        let num_features = match &slot {
            GeometrySlot::Decoded(source) => source.num_geometries(),
            GeometrySlot::Deferred(deferred) => deferred.num_features(),
        };
        Ok(FeatureTable {
            name: self.name,
            slot: RefCell::new(slot),
            ids: self.ids,
            properties: self.properties,
            extent: self.options.extent,
            num_features,
            resolver: RefCell::new(CoordinatesResolver::new()),
        })
    }
}

/// One tile layer: a geometry source, an optional id column, and property
/// columns. Not safe for concurrent mutation; independent tables decoded
/// from independent tile buffers may be used in parallel.
pub struct FeatureTable {
    name: String,
    slot: RefCell<GeometrySlot>,
    ids: Option<IdColumn>,
    properties: Vec<PropertyColumn>,
    extent: u32,
    num_features: usize,
    resolver: RefCell<CoordinatesResolver>,
}

impl FeatureTable {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn extent(&self) -> u32 {
        self.extent
    }

    #[must_use]
    pub const fn num_features(&self) -> usize {
        self.num_features
    }

    /// Kind of feature `index` without any vertex decode.
    pub fn geometry_type(&self, index: usize) -> Result<GeometryKind> {
        if index >= self.num_features {
            return Err(Error::OutOfRange {
                index,
                len: self.num_features,
            });
        }
        match &*self.slot.borrow() {
            GeometrySlot::Decoded(source) => source.geometry_type(index),
            GeometrySlot::Deferred(deferred) => deferred.geometry_type(index),
        }
    }

    /// The vector-tile-layer shaped view over this table.
    #[must_use]
    pub const fn layer(&self) -> VirtualLayer<'_> {
        VirtualLayer { table: self }
    }

    /// Decode counters of the lazy resolver.
    #[must_use]
    pub fn resolver_stats(&self) -> ResolverStats {
        self.resolver.borrow().stats()
    }

    pub(crate) fn coordinates(&self, index: usize) -> Result<CoordinatesArray> {
        if index >= self.num_features {
            return Err(Error::OutOfRange {
                index,
                len: self.num_features,
            });
        }
        self.ensure_decoded()?;
        let slot = self.slot.borrow();
        let GeometrySlot::Decoded(source) = &*slot else {
            unreachable!("slot decoded above");
        };
        self.resolver.borrow_mut().resolve(source, index)
    }

    /// Swaps a deferred column for its decoded vector, releasing the
    /// column's hold on the raw tile bytes.
    fn ensure_decoded(&self) -> Result<()> {
        let decoded = match &*self.slot.borrow() {
            GeometrySlot::Decoded(_) => return Ok(()),
            GeometrySlot::Deferred(deferred) => deferred.decode_vector()?,
        };
        *self.slot.borrow_mut() = GeometrySlot::Decoded(GeometrySource::Columnar(decoded));
        Ok(())
    }
}

/// A view implementing the common vector-tile layer shape: `len`,
/// `feature(i)`, iteration.
pub struct VirtualLayer<'a> {
    table: &'a FeatureTable,
}

impl<'a> VirtualLayer<'a> {
    #[must_use]
    pub const fn len(&self) -> usize {
        self.table.num_features()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.table.num_features() == 0
    }

    #[must_use]
    pub fn name(&self) -> &'a str {
        self.table.name()
    }

    #[must_use]
    pub const fn extent(&self) -> u32 {
        self.table.extent()
    }

    /// Builds the ephemeral feature at `index`. Geometry type and
    /// properties are materialized here; coordinates stay lazy.
    pub fn feature(&self, index: usize) -> Result<Feature<'a>> {
        let table = self.table;
        if index >= table.num_features() {
            return Err(Error::OutOfRange {
                index,
                len: table.num_features(),
            });
        }
        let geometry_type = table.geometry_type(index)?;
        let id = table.ids.as_ref().and_then(|ids| ids.value(index));
        let mut properties = HashMap::with_capacity(table.properties.len());
        for column in &table.properties {
            // Null properties are omitted rather than carried as JSON null.
            if let Some(value) = column.value(index) {
                properties.insert(column.name().to_owned(), value.to_json());
            }
        }
        Ok(Feature {
            table,
            index,
            id,
            geometry_type,
            properties,
            coordinates: OnceCell::new(),
        })
    }

    #[must_use]
    pub const fn iter(&self) -> FeatureIter<'a> {
        FeatureIter {
            table: self.table,
            index: 0,
        }
    }
}

impl<'a> IntoIterator for &VirtualLayer<'a> {
    type Item = Result<Feature<'a>>;
    type IntoIter = FeatureIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Explicit index-advancing iterator over a layer's features.
pub struct FeatureIter<'a> {
    table: &'a FeatureTable,
    index: usize,
}

impl<'a> Iterator for FeatureIter<'a> {
    type Item = Result<Feature<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.table.num_features() {
            return None;
        }
        let feature = self.table.layer().feature(self.index);
        self.index += 1;
        Some(feature)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.table.num_features().saturating_sub(self.index);
        (remaining, Some(remaining))
    }
}

/// One feature of a layer: indices plus a shared reference back into the
/// table. Coordinates resolve on first read and are cached per instance.
pub struct Feature<'a> {
    table: &'a FeatureTable,
    index: usize,
    id: Option<FeatureId>,
    geometry_type: GeometryKind,
    properties: HashMap<String, serde_json::Value>,
    coordinates: OnceCell<CoordinatesArray>,
}

impl Feature<'_> {
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    #[must_use]
    pub const fn id(&self) -> Option<FeatureId> {
        self.id
    }

    #[must_use]
    pub const fn geometry_type(&self) -> GeometryKind {
        self.geometry_type
    }

    #[must_use]
    pub const fn properties(&self) -> &HashMap<String, serde_json::Value> {
        &self.properties
    }

    /// Coordinates of this feature, resolved through the table's adaptive
    /// resolver on first read.
    pub fn coordinates(&self) -> Result<&CoordinatesArray> {
        if let Some(coordinates) = self.coordinates.get() {
            return Ok(coordinates);
        }
        let resolved = self.table.coordinates(self.index)?;
        Ok(self.coordinates.get_or_init(|| resolved))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_geometry_is_an_error() {
        let result = FeatureTableBuilder::new("empty").build();
        assert!(matches!(result, Err(Error::MissingGeometry)));
    }

    #[test]
    fn sequence_ids_widen_per_value() {
        let ids = IdColumn::Sequence {
            base: u64::from(u32::MAX) - 1,
            delta: 1,
        };
        assert_eq!(ids.value(0), Some(FeatureId::Int(u32::MAX - 1)));
        assert_eq!(ids.value(1), Some(FeatureId::Int(u32::MAX)));
        assert_eq!(
            ids.value(2),
            Some(FeatureId::Long(u64::from(u32::MAX) + 1))
        );
    }
}
