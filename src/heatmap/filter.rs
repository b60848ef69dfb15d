//! Conjunctive filter pipeline over the sample collection. The visible set
//! is always exactly the subset matching intensity AND date AND type; a
//! rejected predicate update leaves both the predicates and the view as they
//! were.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::error::{AppError, AppResult};

use super::sample::{MicroplasticSample, MicroplasticType};

#[derive(Debug, Clone, PartialEq)]
pub struct FilterSet {
    /// Inclusive intensity bounds, within [0, 100].
    pub intensity: (f64, f64),
    /// Inclusive date bounds.
    pub dates: (DateTime<Utc>, DateTime<Utc>),
    /// Accepted polymer types. An empty set hides everything.
    pub types: HashSet<MicroplasticType>,
}

impl Default for FilterSet {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            intensity: (0.0, 100.0),
            dates: (now - Duration::days(30), now),
            types: MicroplasticType::all().iter().copied().collect(),
        }
    }
}

impl FilterSet {
    pub fn matches(&self, s: &MicroplasticSample) -> bool {
        let (lo, hi) = self.intensity;
        let (start, end) = self.dates;
        s.intensity >= lo
            && s.intensity <= hi
            && s.sample_date >= start
            && s.sample_date <= end
            && self.types.contains(&s.microplastic_type)
    }
}

/// Owns the sample collection and its derived visible subset. Samples are
/// never mutated; only the predicates change.
pub struct HeatmapData {
    samples: Vec<MicroplasticSample>,
    filter: FilterSet,
    visible: Vec<MicroplasticSample>,
}

impl HeatmapData {
    pub fn new(samples: Vec<MicroplasticSample>) -> Self {
        Self::with_filter(samples, FilterSet::default())
    }

    pub fn with_filter(samples: Vec<MicroplasticSample>, filter: FilterSet) -> Self {
        let mut d = Self { samples, filter, visible: Vec::new() };
        d.recompute();
        d
    }

    pub fn samples(&self) -> &[MicroplasticSample] { &self.samples }
    pub fn visible(&self) -> &[MicroplasticSample] { &self.visible }
    pub fn filter(&self) -> &FilterSet { &self.filter }

    pub fn set_intensity_range(&mut self, lo: f64, hi: f64) -> AppResult<()> {
        if !(0.0..=100.0).contains(&lo) || !(0.0..=100.0).contains(&hi) || lo > hi {
            return Err(AppError::validation(
                "intensity_range",
                "intensity bounds must satisfy 0 <= lo <= hi <= 100",
            ));
        }
        self.filter.intensity = (lo, hi);
        self.recompute();
        Ok(())
    }

    pub fn set_date_range(&mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> AppResult<()> {
        if start > end {
            return Err(AppError::validation(
                "date_range",
                "date range start must not exceed end",
            ));
        }
        self.filter.dates = (start, end);
        self.recompute();
        Ok(())
    }

    pub fn set_types(&mut self, types: HashSet<MicroplasticType>) {
        self.filter.types = types;
        self.recompute();
    }

    /// Single O(n) pass in insertion order; no effect on the source
    /// collection. Idempotent for an unchanged predicate set.
    pub fn recompute(&mut self) {
        self.visible = self
            .samples
            .iter()
            .filter(|s| self.filter.matches(s))
            .cloned()
            .collect();
        debug!(total = self.samples.len(), visible = self.visible.len(), "heatmap filter applied");
    }
}
