//! Left join of boundary features onto derived metrics.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::metric::DerivedMetric;

/// Anything that can be looked up by its administrative name.
pub trait AdminArea {
    /// Subdivision name, e.g. `"사직동"`.
    fn admin_name(&self) -> &str;

    /// Name including its parents, e.g. `"서울특별시 종로구 사직동"`.
    fn qualified_name(&self) -> &str {
        self.admin_name()
    }
}

/// How metrics are keyed for the join.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum JoinPolicy {
    /// Subdivision name alone. Same-named 행정동 in different districts
    /// collide and the later row wins.
    #[default]
    ShortName,
    /// `"<district> <subdivision>"`, matched against the last two tokens of
    /// the boundary name.
    Qualified,
}

impl JoinPolicy {
    fn metric_key(self, metric: &DerivedMetric) -> Option<String> {
        match self {
            JoinPolicy::ShortName => Some(metric.admin_name.clone()),
            JoinPolicy::Qualified => metric
                .district
                .as_ref()
                .map(|district| format!("{district} {}", metric.admin_name)),
        }
    }

    fn feature_key(self, admin_name: &str) -> String {
        match self {
            JoinPolicy::ShortName => admin_name.to_string(),
            JoinPolicy::Qualified => {
                let tokens: Vec<&str> = admin_name.split_whitespace().collect();
                let start = tokens.len().saturating_sub(2);
                tokens[start..].join(" ")
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JoinedFeature<F> {
    pub feature: F,
    pub metric: Option<DerivedMetric>,
}

impl<F> JoinedFeature<F> {
    pub fn subgroup_percentage(&self) -> Option<f64> {
        self.metric.as_ref().and_then(|m| m.subgroup_percentage)
    }
}

/// Key -> metric mapping the join runs against.
#[derive(Clone, Debug, Default)]
pub struct MetricIndex {
    policy: JoinPolicy,
    by_key: HashMap<String, DerivedMetric>,
    collisions: Vec<String>,
}

impl MetricIndex {
    pub fn build(metrics: &[DerivedMetric], policy: JoinPolicy) -> Self {
        let mut by_key = HashMap::with_capacity(metrics.len());
        let mut collisions = Vec::new();
        for metric in metrics {
            let Some(key) = policy.metric_key(metric) else {
                continue;
            };
            if by_key.insert(key.clone(), metric.clone()).is_some() {
                collisions.push(key);
            }
        }
        Self {
            policy,
            by_key,
            collisions,
        }
    }

    pub fn policy(&self) -> JoinPolicy {
        self.policy
    }

    /// Keys that were overwritten by a later metric, once per overwrite.
    pub fn collisions(&self) -> &[String] {
        &self.collisions
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }

    pub fn lookup(&self, admin_name: &str) -> Option<&DerivedMetric> {
        self.by_key.get(&self.policy.feature_key(admin_name))
    }

    /// Looks `area` up by the name its policy keys on.
    pub fn lookup_area<F: AdminArea>(&self, area: &F) -> Option<&DerivedMetric> {
        match self.policy {
            JoinPolicy::ShortName => self.lookup(area.admin_name()),
            JoinPolicy::Qualified => self.lookup(area.qualified_name()),
        }
    }
}

/// Joins on the normalized short name. Output has one entry per feature, in
/// input order.
pub fn reconcile<F>(features: &[F], metrics: &[DerivedMetric]) -> Vec<JoinedFeature<F>>
where
    F: AdminArea + Clone,
{
    reconcile_with(features, &MetricIndex::build(metrics, JoinPolicy::ShortName))
}

pub fn reconcile_with<F>(features: &[F], index: &MetricIndex) -> Vec<JoinedFeature<F>>
where
    F: AdminArea + Clone,
{
    features
        .iter()
        .map(|feature| JoinedFeature {
            metric: index.lookup_area(feature).cloned(),
            feature: feature.clone(),
        })
        .collect()
}

/// Match statistics of a join, for reporting.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    pub matched: usize,
    pub unmatched: Vec<String>,
}

impl ReconcileSummary {
    pub fn of<F: AdminArea>(joined: &[JoinedFeature<F>]) -> Self {
        let mut summary = Self::default();
        for entry in joined {
            match entry.metric {
                Some(_) => summary.matched += 1,
                None => summary
                    .unmatched
                    .push(entry.feature.qualified_name().to_string()),
            }
        }
        summary
    }

    pub fn total(&self) -> usize {
        self.matched + self.unmatched.len()
    }
}
