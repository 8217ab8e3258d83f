//! Error types for histogram construction, recording and decoding.
//!
//! Every fallible operation in this crate returns one of the enums below
//! through an explicit `Result`; nothing is swallowed and nothing panics
//! outside of tests. The split mirrors the lifecycle of a histogram:
//!
//! - [`CreationError`] - invalid construction arguments. Fatal to that call
//!   only, never leaves partial state behind.
//! - [`RecordError`] - a value falls outside the representable range. The
//!   recording call fails cleanly with no mutation; the caller decides
//!   whether to drop, clamp or rebuild with a wider range.
//! - [`MergeError`] - two histograms with different bucket geometry cannot
//!   be merged.
//! - [`DecodeError`] - a malformed, truncated or version-mismatched snapshot.
//!   Decoding never returns a partially populated histogram.

use thiserror::Error;

/// Errors reported when constructing a histogram.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CreationError {
    /// The requested value range is not representable.
    ///
    /// `lowest` must be at least 1 and `highest` at least `2 * lowest`
    /// (a histogram spanning less than one binary order of magnitude has
    /// no usable bucket structure). For auto-ranging histograms the ratio
    /// between highest and lowest must be at least 2.
    #[error("invalid value range: lowest {lowest} / highest {highest} (highest must be >= 2 * lowest, lowest >= 1)")]
    InvalidRange {
        /// The lowest trackable value that was requested.
        lowest: u64,
        /// The highest trackable value that was requested.
        highest: u64,
    },

    /// The dynamic range of an auto-ranging histogram is below 2.
    #[error("invalid dynamic range ratio {0} (must be >= 2)")]
    InvalidRatio(u64),

    /// The number of significant figures is outside `[0, 5]`.
    #[error("invalid precision: {0} significant figures (must be between 0 and 5)")]
    InvalidPrecision(u8),

    /// The derived counts array would exceed the 64-bit index space.
    #[error("requested range and precision exceed the internal index space")]
    IndexSpaceExceeded,
}

/// Errors reported when recording a value.
#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum RecordError {
    /// The value maps outside the counts array. Nothing was recorded.
    #[error("value {0} is outside the trackable range")]
    ValueOutOfRange(u64),

    /// A negative or non-finite value was handed to an auto-ranging
    /// histogram. Nothing was recorded.
    #[error("value {0} is not recordable")]
    ValueNotRecordable(f64),

    /// An auto-ranging histogram could not shift far enough to cover the
    /// value without pushing an already recorded extreme out of range.
    /// Nothing was recorded and the range is unchanged.
    #[error("value {0} cannot be covered without exceeding the configured dynamic range")]
    ShiftExceedsRange(f64),
}

/// Errors reported when merging two histograms.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum MergeError {
    /// The histograms have different bucket geometry. Nothing was merged.
    #[error("histograms have incompatible bucket layouts")]
    IncompatibleLayout,
}

/// Errors reported when decoding a binary snapshot.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// The payload ended before the encoded structure was complete.
    #[error("snapshot payload is truncated")]
    Truncated,

    /// The payload does not start with the expected cookie.
    #[error("unrecognized snapshot cookie {0:#010x}")]
    UnknownCookie(u32),

    /// The cookie is ours but the format version is not supported.
    #[error("unsupported snapshot format version {0}")]
    UnsupportedVersion(u8),

    /// The encoded header fields do not form a constructible histogram.
    #[error("snapshot header is invalid: {0}")]
    InvalidHeader(#[from] CreationError),

    /// The counts stream addresses an index beyond the counts array.
    #[error("counts stream overruns the histogram counts array")]
    CountsOverrun,

    /// The sum of decoded bucket counts disagrees with the encoded total.
    #[error("decoded bucket counts do not add up to the encoded total count")]
    TotalCountMismatch,

    /// A varint or zero-run marker that cannot occur in a valid payload.
    #[error("malformed snapshot payload")]
    Malformed,
}
