use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::normalize::{normalize_label, NormalizedName};
use crate::PopulationRow;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MetricError {
    #[error("age range {lo}-{hi} is inverted")]
    InvertedRange { lo: u32, hi: u32 },
    #[error("cannot parse age range {0:?}, expected e.g. \"10-19\"")]
    Parse(String),
}

/// Closed range of single-year ages, `lo..=hi`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgeRange {
    lo: u32,
    hi: u32,
}

impl AgeRange {
    /// Ages 10 to 19.
    pub const YOUTH: AgeRange = AgeRange { lo: 10, hi: 19 };

    pub fn new(lo: u32, hi: u32) -> Result<Self, MetricError> {
        if lo > hi {
            return Err(MetricError::InvertedRange { lo, hi });
        }
        Ok(Self { lo, hi })
    }

    pub fn lo(&self) -> u32 {
        self.lo
    }

    pub fn hi(&self) -> u32 {
        self.hi
    }
}

impl Default for AgeRange {
    fn default() -> Self {
        Self::YOUTH
    }
}

impl fmt::Display for AgeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.lo, self.hi)
    }
}

impl FromStr for AgeRange {
    type Err = MetricError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parse = |v: &str| {
            v.trim()
                .parse::<u32>()
                .map_err(|_| MetricError::Parse(s.to_string()))
        };
        match s.split_once('-') {
            Some((lo, hi)) => AgeRange::new(parse(lo)?, parse(hi)?),
            None => {
                let age = parse(s)?;
                AgeRange::new(age, age)
            }
        }
    }
}

/// Subgroup count and share for one district.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DerivedMetric {
    /// Normalized short name, the default join key.
    pub admin_name: String,
    pub district: Option<String>,
    pub subgroup_population: u64,
    /// `None` when the district has no residents at all.
    pub subgroup_percentage: Option<f64>,
}

pub fn derive_metric(row: &PopulationRow, name: &NormalizedName, range: AgeRange) -> DerivedMetric {
    let subgroup_population = row.count_in(range);
    let subgroup_percentage = if row.total_population > 0 {
        Some(100.0 * subgroup_population as f64 / row.total_population as f64)
    } else {
        None
    };

    DerivedMetric {
        admin_name: name.short_name.clone(),
        district: name.district.clone(),
        subgroup_population,
        subgroup_percentage: subgroup_percentage.filter(|p| p.is_finite()),
    }
}

/// Derives a metric for every row whose label normalizes; the rest are
/// skipped so they can never match a boundary.
pub fn derive_metrics(rows: &[PopulationRow], range: AgeRange) -> Vec<DerivedMetric> {
    rows.iter()
        .filter_map(|row| match normalize_label(&row.raw_label) {
            Ok(name) => Some(derive_metric(row, &name, range)),
            Err(err) => {
                tracing::warn!("skipping population row: {err}");
                None
            }
        })
        .collect()
}
