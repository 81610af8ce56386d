//! Access-pattern-adaptive coordinates resolution.
//!
//! Single-feature decode is cheap for sparse filters; once the caller is
//! clearly scanning, one bulk materialization is asymptotically faster and
//! reuses a single allocation.

use crate::error::Result;
use crate::logger::log_warn;
use crate::vector::{CoordinatesArray, GeometrySource, convert_single_geometry};

/// Largest forward jump still counted as near-sequential access.
pub const MAX_INDEX_DELTA_FOR_SEQUENTIAL: usize = 2;
/// Consecutive near-sequential accesses that trigger bulk materialization.
pub const NEAR_SEQUENTIAL_THRESHOLD: u32 = 32;
/// Total accesses that trigger bulk materialization regardless of pattern.
pub const ABSOLUTE_ACCESS_THRESHOLD: u32 = 512;

/// Decode counts, observable for diagnostics and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolverStats {
    pub single_conversions: u32,
    pub bulk_conversions: u32,
}

pub(crate) struct CoordinatesResolver {
    materialized: Option<Vec<CoordinatesArray>>,
    last_index: Option<usize>,
    near_sequential_count: u32,
    total_access_count: u32,
    stats: ResolverStats,
}

impl CoordinatesResolver {
    pub(crate) const fn new() -> Self {
        Self {
            materialized: None,
            last_index: None,
            near_sequential_count: 0,
            total_access_count: 0,
            stats: ResolverStats {
                single_conversions: 0,
                bulk_conversions: 0,
            },
        }
    }

    pub(crate) const fn stats(&self) -> ResolverStats {
        self.stats
    }

    /// Resolves the coordinates of feature `index`, deciding between a
    /// single-feature decode and a one-time bulk materialization.
    pub(crate) fn resolve(
        &mut self,
        source: &GeometrySource,
        index: usize,
    ) -> Result<CoordinatesArray> {
        if let Some(all) = &self.materialized {
            return Ok(all[index].clone());
        }

        self.total_access_count += 1;
        if let Some(last) = self.last_index {
            let near_sequential =
                index > last && index - last <= MAX_INDEX_DELTA_FOR_SEQUENTIAL;
            if near_sequential {
                self.near_sequential_count += 1;
            } else {
                self.near_sequential_count = 0;
            }
        }
        self.last_index = Some(index);

        if !source.supports_single_decode() {
            log_warn("geometry source cannot decode single features; materializing the column");
            return self.materialize(source, index);
        }
        if self.near_sequential_count >= NEAR_SEQUENTIAL_THRESHOLD
            || self.total_access_count >= ABSOLUTE_ACCESS_THRESHOLD
        {
            return self.materialize(source, index);
        }

        let GeometrySource::Columnar(vector) = source else {
            unreachable!("non-columnar sources were materialized above");
        };
        self.stats.single_conversions += 1;
        convert_single_geometry(vector, index)
    }

    fn materialize(
        &mut self,
        source: &GeometrySource,
        index: usize,
    ) -> Result<CoordinatesArray> {
        let all = source.decode_geometries()?;
        let coordinates = all[index].clone();
        self.materialized = Some(all);
        self.stats.bulk_conversions += 1;
        Ok(coordinates)
    }
}
