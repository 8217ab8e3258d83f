//! JSON reports of histogram summaries.
//!
//! [`JsonReport`] serializes a [`HistogramSnapshot`] with `serde_json`.
//!
//! # Feature Flag
//!
//! This module requires the `json` feature:
//!
//! ```toml
//! [dependencies]
//! istogrammi = { version = "0.3", features = ["json"] }
//! ```
//!
//! # Examples
//!
//! ```rust,ignore
//! use istogrammi::Histogram;
//! use istogrammi::reports::json::JsonReport;
//!
//! let hist = Histogram::new(1, 3_600_000_000, 3).unwrap();
//! // ... record ...
//!
//! let json = JsonReport::new().pretty(true).render(&hist)?;
//! println!("{}", json);
//! ```

use crate::histogram::Histogram;
use crate::reports::Result;
use crate::snapshot::{HistogramSnapshot, DEFAULT_PERCENTILES};

/// Serializes histogram summaries to JSON.
#[derive(Debug, Clone)]
pub struct JsonReport {
    pretty: bool,
    percentiles: Vec<f64>,
}

impl JsonReport {
    /// Creates a report at the default percentile levels, compact output.
    pub fn new() -> Self {
        JsonReport {
            pretty: false,
            percentiles: DEFAULT_PERCENTILES.to_vec(),
        }
    }

    /// Enables or disables pretty-printing, returning `self` for chaining.
    pub fn pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    /// Sets the percentile levels to report, returning `self` for chaining.
    pub fn with_percentiles(mut self, percentiles: &[f64]) -> Self {
        self.percentiles = percentiles.to_vec();
        self
    }

    /// Renders `histogram` as a JSON summary.
    pub fn render(&self, histogram: &Histogram) -> Result<String> {
        self.render_snapshot(&HistogramSnapshot::with_percentiles(
            histogram,
            &self.percentiles,
        ))
    }

    /// Renders an already captured snapshot.
    pub fn render_snapshot(&self, snapshot: &HistogramSnapshot) -> Result<String> {
        let json = if self.pretty {
            serde_json::to_string_pretty(snapshot)?
        } else {
            serde_json::to_string(snapshot)?
        };
        Ok(json)
    }
}

impl Default for JsonReport {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_histogram() -> Histogram {
        let hist = Histogram::new(1, 1_000_000, 3).unwrap();
        for value in 1..=100 {
            hist.record(value).unwrap();
        }
        hist
    }

    #[test]
    fn renders_compact_json() {
        let json = JsonReport::new().render(&sample_histogram()).unwrap();
        assert!(json.contains("\"total_count\":100"));
        assert!(!json.contains('\n'));
    }

    #[test]
    fn renders_pretty_json() {
        let json = JsonReport::new()
            .pretty(true)
            .render(&sample_histogram())
            .unwrap();
        assert!(json.contains('\n'));
    }

    #[test]
    fn custom_percentiles_show_up() {
        let json = JsonReport::new()
            .with_percentiles(&[42.0])
            .render(&sample_histogram())
            .unwrap();
        assert!(json.contains("42.0"));
        assert!(!json.contains("99.9"));
    }

    #[test]
    fn named_snapshot_round_trips() {
        let snapshot = HistogramSnapshot::new(&sample_histogram()).with_name("latency");
        let json = JsonReport::new().render_snapshot(&snapshot).unwrap();
        let parsed: HistogramSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, snapshot);
    }
}
