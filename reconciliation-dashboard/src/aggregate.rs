//! Result aggregation for display: confidence histogram, match-type
//! breakdown and summary tiers.
//!
//! Pure functions over a record slice. Nothing here is stored; callers
//! recompute whenever the record set changes.

use crate::models::{records_from_value, MatchRecord, MatchType};
use serde::Serialize;

/// Lower bound (inclusive) and label for each confidence band, checked top-down.
const BANDS: [(f64, &str); 5] = [
    (0.90, "90-100%"),
    (0.80, "80-89%"),
    (0.70, "70-79%"),
    (0.60, "60-69%"),
    (f64::NEG_INFINITY, "<60%"),
];

pub const PERFECT_THRESHOLD: f64 = 0.95;
pub const GOOD_THRESHOLD: f64 = 0.80;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BandCount {
    pub label: &'static str,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchTypeCount {
    pub match_type: MatchType,
    pub count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SummaryTier {
    Perfect,
    Good,
    NeedsReview,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SummaryCounts {
    pub total: usize,
    pub perfect: usize,
    pub good: usize,
    pub needs_review: usize,
    /// `None` for an empty record set.
    pub average_confidence: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateView {
    /// Always five entries, highest band first.
    pub confidence_bands: Vec<BandCount>,
    /// In first-seen order.
    pub match_types: Vec<MatchTypeCount>,
    pub summary: SummaryCounts,
}

impl Default for AggregateView {
    fn default() -> Self {
        Self {
            confidence_bands: BANDS
                .iter()
                .map(|(_, label)| BandCount {
                    label: *label,
                    count: 0,
                })
                .collect(),
            match_types: Vec::new(),
            summary: SummaryCounts::default(),
        }
    }
}

/// Index into the band list for `confidence`. Anything that fails every
/// threshold, NaN included, lands in the catch-all band.
pub fn band_index(confidence: f64) -> usize {
    BANDS
        .iter()
        .position(|(lower, _)| confidence >= *lower)
        .unwrap_or(BANDS.len() - 1)
}

pub fn summary_tier(confidence: f64) -> SummaryTier {
    if confidence >= PERFECT_THRESHOLD {
        SummaryTier::Perfect
    } else if confidence >= GOOD_THRESHOLD {
        SummaryTier::Good
    } else {
        SummaryTier::NeedsReview
    }
}

pub fn aggregate(records: &[MatchRecord]) -> AggregateView {
    let mut view = AggregateView::default();
    if records.is_empty() {
        return view;
    }

    let mut confidence_sum = 0.0;
    for record in records {
        let confidence = record.match_confidence;
        confidence_sum += confidence;

        view.confidence_bands[band_index(confidence)].count += 1;

        match view
            .match_types
            .iter_mut()
            .find(|entry| entry.match_type == record.match_type)
        {
            Some(entry) => entry.count += 1,
            None => view.match_types.push(MatchTypeCount {
                match_type: record.match_type.clone(),
                count: 1,
            }),
        }

        match summary_tier(confidence) {
            SummaryTier::Perfect => view.summary.perfect += 1,
            SummaryTier::Good => view.summary.good += 1,
            SummaryTier::NeedsReview => view.summary.needs_review += 1,
        }
    }

    view.summary.total = records.len();
    view.summary.average_confidence = Some(confidence_sum / records.len() as f64);
    view
}

/// Aggregate a raw `data` payload. Non-array input gives the zero view.
pub fn aggregate_json(value: serde_json::Value) -> AggregateView {
    aggregate(&records_from_value(value))
}
