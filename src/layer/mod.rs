mod deferred;
mod property;
mod resolver;
mod table;

pub use deferred::DeferredGeometryColumn;
pub use property::{PropertyColumn, PropertyValue, PropertyValues};
pub use resolver::{
    ABSOLUTE_ACCESS_THRESHOLD, MAX_INDEX_DELTA_FOR_SEQUENTIAL, NEAR_SEQUENTIAL_THRESHOLD,
    ResolverStats,
};
pub use table::{
    DEFAULT_EXTENT, Feature, FeatureId, FeatureIter, FeatureTable, FeatureTableBuilder, IdColumn,
    TableOptions, VirtualLayer,
};
