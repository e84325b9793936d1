use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub mod metric;
pub mod normalize;
pub mod reconcile;

pub use metric::{derive_metric, derive_metrics, AgeRange, DerivedMetric, MetricError};
pub use normalize::{
    extract_full_name, extract_short_name, normalize_label, NormalizeError, NormalizedName,
};
pub use reconcile::{
    reconcile, reconcile_with, AdminArea, JoinPolicy, JoinedFeature, MetricIndex,
    ReconcileSummary,
};

/// One row of the resident registration table for a single reporting month.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopulationRow {
    // e.g. "서울특별시 종로구 청운효자동(1111051500)"
    pub raw_label: String,

    // Single-year age -> residents. "100세 이상" is stored under 100.
    pub age_band_counts: BTreeMap<u32, u64>,
    pub total_population: u64,
}

impl PopulationRow {
    pub fn new(raw_label: impl Into<String>, total_population: u64) -> Self {
        Self {
            raw_label: raw_label.into(),
            age_band_counts: BTreeMap::new(),
            total_population,
        }
    }

    pub fn with_band(mut self, age: u32, count: u64) -> Self {
        self.age_band_counts.insert(age, count);
        self
    }

    // Ages without a recorded band count as zero
    pub fn count_in(&self, range: AgeRange) -> u64 {
        self.age_band_counts
            .range(range.lo()..=range.hi())
            .map(|(_, count)| *count)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_in_ignores_bands_outside_range() {
        let row = PopulationRow::new("종로구 청운효자동", 100)
            .with_band(9, 7)
            .with_band(10, 5)
            .with_band(19, 2)
            .with_band(20, 11);
        let range = AgeRange::new(10, 19).unwrap();
        assert_eq!(row.count_in(range), 7);
    }
}
