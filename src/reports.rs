//! Rendered reports of histogram contents.
//!
//! This module turns a histogram into human- or machine-readable output:
//!
//! - [`table`] - a percentile distribution table using the `tabled` crate
//! - [`json`] - a JSON summary using serde
//!
//! # Unified Error Handling
//!
//! All report types use a unified [`ReportError`], so switching output
//! formats does not change error handling code.
//!
//! # Feature Flags
//!
//! Each report is gated behind a feature flag to minimize dependencies:
//!
//! - `table` - enables the [`table`] module
//! - `json` - enables the [`json`] module
//! - `full` - enables all report modules
//!
//! # Example
//!
//! ```rust,ignore
//! use istogrammi::Histogram;
//! use istogrammi::reports::table::PercentileTable;
//!
//! let hist = Histogram::new(1, 3_600_000_000, 3).unwrap();
//! // ... record ...
//! println!("{}", PercentileTable::new().render(&hist));
//! // ╭────────────┬─────────┬───────┬────────────╮
//! // │ Percentile │ Value   │ Count │ Cumulative │
//! // ├────────────┼─────────┼───────┼────────────┤
//! // │ 0.000      │ 23      │ 1     │ 1          │
//! // │ ...        │         │       │            │
//! // ╰────────────┴─────────┴───────┴────────────╯
//! ```

mod error;

pub use error::{ReportError, Result};

#[cfg(feature = "table")]
pub mod table;

#[cfg(feature = "json")]
pub mod json;
