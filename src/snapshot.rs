//! Serializable summary snapshots of histogram state.
//!
//! [`HistogramSnapshot`] captures the aggregate statistics and a chosen set
//! of percentile points of a histogram as plain serde-serializable data,
//! for export over HTTP APIs, metric pipelines or files. It is a summary,
//! not a replica: use [`serialization`](crate::serialization) when the full
//! counts array must survive the trip.
//!
//! # Feature Flag
//!
//! This module requires the `serde` feature:
//!
//! ```toml
//! [dependencies]
//! istogrammi = { version = "0.3", features = ["serde"] }
//! ```
//!
//! # Examples
//!
//! ```rust,ignore
//! use istogrammi::snapshot::HistogramSnapshot;
//! use istogrammi::Histogram;
//!
//! let hist = Histogram::new(1, 3_600_000_000, 3).unwrap();
//! // ... record ...
//!
//! let snapshot = HistogramSnapshot::new(&hist).with_name("request_latency");
//! let json = serde_json::to_string(&snapshot).unwrap();
//! ```

use serde::{Deserialize, Serialize};

use crate::histogram::Histogram;

/// Percentiles reported when none are chosen explicitly.
pub const DEFAULT_PERCENTILES: &[f64] = &[50.0, 75.0, 90.0, 99.0, 99.9, 99.99, 100.0];

/// One percentile level of a snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PercentilePoint {
    /// The percentile level, in `[0, 100]`.
    pub percentile: f64,
    /// Value below which `percentile` percent of recordings fall.
    pub value: u64,
}

/// A point-in-time summary of a single histogram.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistogramSnapshot {
    /// Optional name identifying the measured quantity.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub name: Option<String>,
    /// Optional capture timestamp in milliseconds since the Unix epoch.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub timestamp_ms: Option<u64>,
    /// Total number of recorded values.
    pub total_count: u64,
    /// Lowest recorded value.
    pub min: u64,
    /// Highest recorded value.
    pub max: u64,
    /// Mean of recorded values.
    pub mean: f64,
    /// Standard deviation of recorded values.
    pub stdev: f64,
    /// The chosen percentile points, ascending.
    pub percentiles: Vec<PercentilePoint>,
}

impl HistogramSnapshot {
    /// Captures `histogram` at the [`DEFAULT_PERCENTILES`].
    pub fn new(histogram: &Histogram) -> Self {
        Self::with_percentiles(histogram, DEFAULT_PERCENTILES)
    }

    /// Captures `histogram` at the given percentile levels.
    pub fn with_percentiles(histogram: &Histogram, percentiles: &[f64]) -> Self {
        HistogramSnapshot {
            name: None,
            timestamp_ms: None,
            total_count: histogram.total_count(),
            min: histogram.min(),
            max: histogram.max(),
            mean: histogram.mean(),
            stdev: histogram.stdev(),
            percentiles: percentiles
                .iter()
                .map(|&percentile| PercentilePoint {
                    percentile,
                    value: histogram.value_at_percentile(percentile),
                })
                .collect(),
        }
    }

    /// Sets the name, returning `self` for chaining.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the capture timestamp, returning `self` for chaining.
    pub fn with_timestamp(mut self, timestamp_ms: u64) -> Self {
        self.timestamp_ms = Some(timestamp_ms);
        self
    }

    /// Finds the point captured at `percentile`, if any.
    pub fn get(&self, percentile: f64) -> Option<&PercentilePoint> {
        self.percentiles
            .iter()
            .find(|point| point.percentile == percentile)
    }
}
