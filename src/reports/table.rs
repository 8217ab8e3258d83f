//! Percentile distribution tables.
//!
//! [`PercentileTable`] renders a histogram's percentile distribution as a
//! formatted table using the `tabled` crate, one row per percentile tick.
//!
//! # Feature Flag
//!
//! This module requires the `table` feature:
//!
//! ```toml
//! [dependencies]
//! istogrammi = { version = "0.3", features = ["table"] }
//! ```
//!
//! # Examples
//!
//! ```rust,ignore
//! use istogrammi::Histogram;
//! use istogrammi::reports::table::{PercentileTable, TableStyle};
//!
//! let hist = Histogram::new(1, 3_600_000_000, 3).unwrap();
//! for value in 1..=10_000 {
//!     hist.record(value).unwrap();
//! }
//!
//! let table = PercentileTable::new()
//!     .with_style(TableStyle::Rounded)
//!     .with_ticks_per_half_distance(2);
//! println!("{}", table.render(&hist));
//! ```

use tabled::builder::Builder;
use tabled::settings::Style;

use crate::histogram::Histogram;

/// Available table styles for rendering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TableStyle {
    /// ASCII table with simple characters: +, -, |
    Ascii,
    /// Modern rounded corners (default)
    #[default]
    Rounded,
    /// Sharp corners with box-drawing characters
    Sharp,
    /// Modern style with clean lines
    Modern,
    /// GitHub-flavored Markdown table
    Markdown,
    /// No borders, just spacing
    Blank,
}

/// Renders the percentile distribution of a histogram as a table.
#[derive(Debug, Clone)]
pub struct PercentileTable {
    style: TableStyle,
    ticks_per_half_distance: u32,
}

impl PercentileTable {
    /// Creates a renderer with the default style and five ticks per half
    /// distance.
    pub fn new() -> Self {
        PercentileTable {
            style: TableStyle::default(),
            ticks_per_half_distance: 5,
        }
    }

    /// Sets the table style, returning `self` for chaining.
    pub fn with_style(mut self, style: TableStyle) -> Self {
        self.style = style;
        self
    }

    /// Sets the percentile resolution, returning `self` for chaining.
    /// Higher values produce more rows towards the tail.
    pub fn with_ticks_per_half_distance(mut self, ticks: u32) -> Self {
        self.ticks_per_half_distance = ticks;
        self
    }

    /// Renders `histogram`'s percentile distribution.
    pub fn render(&self, histogram: &Histogram) -> String {
        let mut builder = Builder::default();
        builder.push_record(["Percentile", "Value", "Count", "Cumulative"]);
        for item in histogram.iter_percentiles(self.ticks_per_half_distance) {
            builder.push_record([
                format!("{:.3}", item.percentile),
                item.value_range.end.saturating_sub(1).to_string(),
                item.count.to_string(),
                item.cumulative_count.to_string(),
            ]);
        }

        let mut table = builder.build();
        match self.style {
            TableStyle::Ascii => {
                table.with(Style::ascii());
            }
            TableStyle::Rounded => {
                table.with(Style::rounded());
            }
            TableStyle::Sharp => {
                table.with(Style::sharp());
            }
            TableStyle::Modern => {
                table.with(Style::modern());
            }
            TableStyle::Markdown => {
                table.with(Style::markdown());
            }
            TableStyle::Blank => {
                table.with(Style::blank());
            }
        }
        table.to_string()
    }
}

impl Default for PercentileTable {
    fn default() -> Self {
        Self::new()
    }
}
