//! Auto-ranging histogram for floating-point values.
//!
//! [`DoubleHistogram`] tracks `f64` magnitudes with a fixed *dynamic range*
//! (the ratio between the largest and smallest simultaneously trackable
//! value) instead of fixed absolute bounds. The covered window slides to
//! follow the data: recording a value below the current floor halves the
//! floor, recording one at or above the current ceiling doubles it, and in
//! both cases every previously recorded count is relocated by an exact
//! power-of-two shift of its integer representation. Nothing recorded is
//! ever lost or re-quantized by a shift.
//!
//! ```rust
//! use istogrammi::DoubleHistogram;
//!
//! let mut hist = DoubleHistogram::new(3_600_000_000, 3).unwrap();
//! hist.record(1.0).unwrap();
//! hist.record(2.5e-3).unwrap();   // slides the window downwards
//! hist.record(120.75).unwrap();
//!
//! assert_eq!(hist.total_count(), 3);
//! assert_eq!(hist.count_at_value(1.0), 1);
//! assert!(hist.current_lowest_value() <= 2.5e-3);
//! ```
//!
//! When a shift would push an already recorded extreme out of the window the
//! recording fails with [`RecordError::ShiftExceedsRange`] and no state
//! changes, so the caller can tell a dropped sample from a recorded one.
//!
//! Shifts rebuild the inner integer histogram, so recording takes `&mut
//! self`; this type is meant for single-threaded recording or behind an
//! external lock, unlike [`Histogram`] and the interval recorder.

use crate::errors::{CreationError, RecordError};
use crate::histogram::Histogram;
use crate::layout::sub_bucket_half_count_for;

/// An auto-ranging histogram of `f64` values with a fixed highest-to-lowest
/// dynamic range and configurable precision.
#[derive(Debug, Clone)]
pub struct DoubleHistogram {
    /// Integer-domain storage; doubles are mapped through
    /// `double_to_int_ratio` before they reach it.
    values: Histogram,
    highest_to_lowest_value_ratio: u64,
    /// Power-of-two ratio actually covered by the integer histogram; one
    /// binary order of magnitude wider than requested so the requested
    /// range fits at any alignment of the sliding window.
    internal_ratio: u64,
    /// The double value currently mapped to the bottom of the window.
    current_lowest_value: f64,
    /// Exclusive upper bound of the window; values at or above it force an
    /// upward shift.
    current_highest_limit: f64,
    /// Integer value that `current_lowest_value` maps to. Keeping the floor
    /// in the upper half of a bucket preserves full precision for every
    /// tracked double.
    lowest_tracking_integer: u64,
    double_to_int_ratio: f64,
    int_to_double_ratio: f64,
}

impl DoubleHistogram {
    /// Creates a histogram able to track values spanning
    /// `highest_to_lowest_value_ratio` at `significant_figures` decimal
    /// digits of precision, anywhere on the positive `f64` axis.
    pub fn new(
        highest_to_lowest_value_ratio: u64,
        significant_figures: u8,
    ) -> Result<Self, CreationError> {
        if highest_to_lowest_value_ratio < 2 {
            return Err(CreationError::InvalidRatio(highest_to_lowest_value_ratio));
        }
        if significant_figures > 5 {
            return Err(CreationError::InvalidPrecision(significant_figures));
        }
        let precision_factor = 10u64.pow(u32::from(significant_figures));
        match highest_to_lowest_value_ratio.checked_mul(precision_factor) {
            Some(scaled) if scaled < 1 << 61 => {}
            _ => return Err(CreationError::IndexSpaceExceeded),
        }

        let internal_ratio = highest_to_lowest_value_ratio.next_power_of_two() * 2;
        let lowest_tracking_integer = u64::from(sub_bucket_half_count_for(significant_figures));
        let integer_range = lowest_tracking_integer * internal_ratio;
        let values = Histogram::new(1, integer_range, significant_figures)?;

        let current_lowest_value = 1.0;
        Ok(DoubleHistogram {
            values,
            highest_to_lowest_value_ratio,
            internal_ratio,
            current_lowest_value,
            current_highest_limit: current_lowest_value * internal_ratio as f64,
            lowest_tracking_integer,
            double_to_int_ratio: lowest_tracking_integer as f64 / current_lowest_value,
            int_to_double_ratio: current_lowest_value / lowest_tracking_integer as f64,
        })
    }

    /// The configured highest-to-lowest dynamic range.
    #[inline]
    pub fn highest_to_lowest_value_ratio(&self) -> u64 {
        self.highest_to_lowest_value_ratio
    }

    /// The configured number of significant figures.
    #[inline]
    pub fn significant_figures(&self) -> u8 {
        self.values.layout().significant_figures()
    }

    /// The double value currently mapped to the bottom of the window.
    #[inline]
    pub fn current_lowest_value(&self) -> f64 {
        self.current_lowest_value
    }

    /// The integer-domain histogram backing this one.
    #[inline]
    pub fn integer_values(&self) -> &Histogram {
        &self.values
    }

    /// Total number of recorded values.
    #[inline]
    pub fn total_count(&self) -> u64 {
        self.values.total_count()
    }

    /// Records one occurrence of `value`, sliding the window if needed.
    pub fn record(&mut self, value: f64) -> Result<(), RecordError> {
        self.record_n(value, 1)
    }

    /// Records `count` occurrences of `value`.
    pub fn record_n(&mut self, value: f64, count: u64) -> Result<(), RecordError> {
        if !value.is_finite() || value < 0.0 {
            return Err(RecordError::ValueNotRecordable(value));
        }
        if value == 0.0 {
            // Zero is representable at any window position and never pins
            // the range.
            return self.values.record_n(0, count);
        }
        if value < self.current_lowest_value || value >= self.current_highest_limit {
            self.adjust_range_for(value)?;
        }
        self.values
            .record_n((value * self.double_to_int_ratio) as u64, count)
    }

    /// Records `value` and back-fills one sample at each point
    /// `value - k * expected_interval` while that point is at least
    /// `expected_interval`, in the double domain.
    ///
    /// With `expected_interval <= 0` this is plain [`record`](Self::record).
    pub fn record_corrected(
        &mut self,
        value: f64,
        expected_interval: f64,
    ) -> Result<(), RecordError> {
        self.record(value)?;
        if expected_interval <= 0.0 {
            return Ok(());
        }
        let mut missing = value - expected_interval;
        while missing >= expected_interval {
            self.record(missing)?;
            missing -= expected_interval;
        }
        Ok(())
    }

    /// Count recorded in the slot covering `value` at the current window
    /// position; 0 for values outside the window.
    pub fn count_at_value(&self, value: f64) -> u64 {
        if value < 0.0 || !value.is_finite() {
            return 0;
        }
        self.values
            .count_at_value((value * self.double_to_int_ratio) as u64)
    }

    /// Lowest recorded value, 0.0 when nothing (or only zero) was recorded.
    pub fn min(&self) -> f64 {
        self.values.min() as f64 * self.int_to_double_ratio
    }

    /// Highest recorded value, 0.0 when nothing was recorded.
    pub fn max(&self) -> f64 {
        self.values.max() as f64 * self.int_to_double_ratio
    }

    /// Mean of all recorded values, quantized to slot midpoints.
    pub fn mean(&self) -> f64 {
        self.values.mean() * self.int_to_double_ratio
    }

    /// Value below which `percentile` percent of the recordings fall.
    pub fn value_at_percentile(&self, percentile: f64) -> f64 {
        self.values.value_at_percentile(percentile) as f64 * self.int_to_double_ratio
    }

    /// Clears all counts. The window position is kept.
    pub fn reset(&mut self) {
        self.values.reset();
    }

    /// Rebuilds a histogram from decoded snapshot parts.
    pub(crate) fn from_parts(
        highest_to_lowest_value_ratio: u64,
        significant_figures: u8,
        floor: f64,
        values: Histogram,
    ) -> Result<Self, crate::errors::DecodeError> {
        let mut hist = Self::new(highest_to_lowest_value_ratio, significant_figures)?;
        if hist.values.layout() != values.layout() || !floor.is_finite() || floor <= 0.0 {
            return Err(crate::errors::DecodeError::Malformed);
        }
        hist.set_floor(floor);
        hist.values = values;
        Ok(hist)
    }

    /// Slides the window so that `value` becomes representable, relocating
    /// existing counts. Fails without touching anything when an already
    /// recorded extreme pins the window.
    fn adjust_range_for(&mut self, value: f64) -> Result<(), RecordError> {
        if value < self.current_lowest_value {
            match self.shift_down_magnitude(value) {
                Some((shift, floor)) => {
                    self.values = self.relocate(|value| value << shift)?;
                    self.set_floor(floor);
                }
                None => return Err(RecordError::ShiftExceedsRange(value)),
            }
        } else {
            match self.shift_up_magnitude(value) {
                Some((shift, floor)) => {
                    self.values = self.relocate(|value| value >> shift)?;
                    self.set_floor(floor);
                }
                None => return Err(RecordError::ShiftExceedsRange(value)),
            }
        }
        Ok(())
    }

    /// Number of halvings of the floor needed to cover `value` and the
    /// resulting floor, or `None` when recorded values pin the window
    /// above it.
    fn shift_down_magnitude(&self, value: f64) -> Option<(u32, f64)> {
        let mut shift = 0u32;
        let mut floor = self.current_lowest_value;
        while value < floor {
            floor /= 2.0;
            shift += 1;
        }
        if floor <= 0.0 {
            return None;
        }
        // Shifting multiplies every existing integer by 2^shift; the top
        // occupied slot must stay strictly inside the integer range.
        let top = self.values.max();
        if top == 0 {
            return Some((shift, floor));
        }
        let bound = self.lowest_tracking_integer * self.internal_ratio;
        top.checked_shl(shift)
            .filter(|&shifted| shifted < bound)
            .map(|_| (shift, floor))
    }

    /// Number of doublings of the floor needed to cover `value` and the
    /// resulting floor, or `None` when recorded values pin the window
    /// below it.
    fn shift_up_magnitude(&self, value: f64) -> Option<(u32, f64)> {
        let mut shift = 0u32;
        let mut floor = self.current_lowest_value;
        let mut limit = self.current_highest_limit;
        while value >= limit {
            limit *= 2.0;
            floor *= 2.0;
            shift += 1;
        }
        if !floor.is_finite() {
            return None;
        }
        // Shifting divides every existing integer by 2^shift; the lowest
        // occupied slot must stay in the upper half of its bucket or the
        // relocation would lose precision.
        let bottom = self.values.min_non_zero();
        if bottom == u64::MAX {
            return Some((shift, floor));
        }
        self.lowest_tracking_integer
            .checked_shl(shift)
            .filter(|&pinned| bottom >= pinned)
            .map(|_| (shift, floor))
    }

    /// Builds a same-layout histogram with every occupied slot re-recorded
    /// at the mapped integer value. Slot ranges scale by exact powers of
    /// two, so each source slot lands in exactly one destination slot.
    fn relocate(&self, map: impl Fn(u64) -> u64) -> Result<Histogram, RecordError> {
        let layout = *self.values.layout();
        let relocated = Histogram::with_layout(layout);
        for index in 0..self.values.len() {
            let count = self.values.count_at_index(index).unwrap_or(0);
            if count != 0 {
                relocated.record_n(map(layout.value_for(index)), count)?;
            }
        }
        Ok(relocated)
    }

    fn set_floor(&mut self, floor: f64) {
        self.current_lowest_value = floor;
        self.current_highest_limit = floor * self.internal_ratio as f64;
        self.double_to_int_ratio = self.lowest_tracking_integer as f64 / floor;
        self.int_to_double_ratio = floor / self.lowest_tracking_integer as f64;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // One hour in microseconds, the classic dynamic range.
    const RATIO: u64 = 3_600_000_000;
    const FIGURES: u8 = 3;

    fn assert_close(a: f64, b: f64, relative: f64) {
        assert!(
            (a - b).abs() <= b.abs() * relative,
            "{a} not within {relative} of {b}"
        );
    }

    #[test]
    fn construction_validates_arguments() {
        assert_eq!(
            DoubleHistogram::new(1, FIGURES).unwrap_err(),
            CreationError::InvalidRatio(1)
        );
        assert_eq!(
            DoubleHistogram::new(RATIO, 6).unwrap_err(),
            CreationError::InvalidPrecision(6)
        );
        // ratio * 10^figures must stay below 2^61.
        assert_eq!(
            DoubleHistogram::new(1 << 45, 5).unwrap_err(),
            CreationError::IndexSpaceExceeded
        );
        assert!(DoubleHistogram::new(RATIO, FIGURES).is_ok());
    }

    #[test]
    fn construction_reports_its_arguments() {
        let mut hist = DoubleHistogram::new(RATIO, FIGURES).unwrap();
        hist.record(f64::powi(2.0, 20)).unwrap();
        hist.record(1.0).unwrap();

        assert_eq!(hist.significant_figures(), FIGURES);
        assert_eq!(hist.highest_to_lowest_value_ratio(), RATIO);
        assert_close(hist.current_lowest_value(), 1.0, 0.001);
    }

    #[test]
    fn window_spans_one_extra_binary_order_of_magnitude() {
        // next_power_of_two(3.6e9) = 2^32, doubled for alignment headroom.
        let hist = DoubleHistogram::new(RATIO, FIGURES).unwrap();
        assert_eq!(hist.internal_ratio, 1 << 33);
    }

    #[test]
    fn doubling_fills_the_window_upwards() {
        let mut hist = DoubleHistogram::new(RATIO, FIGURES).unwrap();
        hist.record(0.0).unwrap();
        assert_eq!(hist.count_at_value(0.0), 1);

        let mut top = 1.0;
        while hist.record(top).is_ok() {
            top *= 2.0;
        }
        // The floor is pinned by the recorded 1.0, so the first failure is
        // one full internal range above it.
        assert_close(top, f64::powi(2.0, 33), 0.00001);
        assert_eq!(hist.count_at_value(0.0), 1);
    }

    #[test]
    fn halving_fills_the_window_downwards() {
        let mut hist = DoubleHistogram::new(RATIO, FIGURES).unwrap();
        hist.record(0.0).unwrap();

        let top = f64::powi(2.0, 33);
        let mut bottom = top;
        while hist.record(bottom).is_ok() {
            bottom /= 2.0;
        }
        assert_close(bottom, 1.0, 0.00001);
        assert_close(top / bottom, f64::powi(2.0, 33), 0.00001);
        assert_eq!(hist.count_at_value(0.0), 1);
    }

    #[test]
    fn halving_from_one_hits_the_ratio_bound() {
        let mut hist = DoubleHistogram::new(RATIO, FIGURES).unwrap();
        hist.record(1.0).unwrap();

        let mut value = 0.5;
        while hist.record(value).is_ok() {
            value /= 2.0;
        }
        // The 1.0 at the top pins the window; the first failure sits one
        // full internal range below it.
        assert!(matches!(
            hist.record(value),
            Err(RecordError::ShiftExceedsRange(_))
        ));
        assert_close(1.0 / value, f64::powi(2.0, 33), 0.00001);

        // Every count recorded before the cascade of shifts still reports.
        assert_eq!(hist.count_at_value(1.0), 1);
        assert_eq!(hist.count_at_value(0.5), 1);
        assert_eq!(hist.count_at_value(value * 2.0), 1);
        assert_eq!(hist.total_count(), 33);
    }

    #[test]
    fn record_updates_counts_and_total() {
        let mut hist = DoubleHistogram::new(RATIO, FIGURES).unwrap();
        hist.record(4.0).unwrap();
        assert_eq!(hist.count_at_value(4.0), 1);
        assert_eq!(hist.total_count(), 1);
    }

    #[test]
    fn overflow_when_recorded_extremes_pin_the_window() {
        let mut hist = DoubleHistogram::new(RATIO, FIGURES).unwrap();
        hist.record(RATIO as f64 * 3.0).unwrap();

        let err = hist.record(1.0).unwrap_err();
        assert_eq!(err, RecordError::ShiftExceedsRange(1.0));
        // Nothing changed.
        assert_eq!(hist.total_count(), 1);
        assert_eq!(hist.count_at_value(RATIO as f64 * 3.0), 1);
    }

    #[test]
    fn rejects_negative_and_non_finite_values() {
        let mut hist = DoubleHistogram::new(RATIO, FIGURES).unwrap();
        assert!(matches!(
            hist.record(-1.0),
            Err(RecordError::ValueNotRecordable(_))
        ));
        assert!(matches!(
            hist.record(f64::NAN),
            Err(RecordError::ValueNotRecordable(_))
        ));
        assert!(matches!(
            hist.record(f64::INFINITY),
            Err(RecordError::ValueNotRecordable(_))
        ));
        assert_eq!(hist.total_count(), 0);
    }

    #[test]
    fn downward_shift_preserves_recorded_counts() {
        let mut hist = DoubleHistogram::new(RATIO, FIGURES).unwrap();
        hist.record(1.0).unwrap();
        hist.record(4.0).unwrap();

        hist.record(0.25).unwrap();
        assert_close(hist.current_lowest_value(), 0.25, 0.00001);
        assert_eq!(hist.count_at_value(1.0), 1);
        assert_eq!(hist.count_at_value(4.0), 1);
        assert_eq!(hist.count_at_value(0.25), 1);
        assert_eq!(hist.total_count(), 3);
    }

    #[test]
    fn upward_shift_preserves_recorded_counts() {
        let mut hist = DoubleHistogram::new(RATIO, FIGURES).unwrap();
        hist.record(2.0).unwrap();
        hist.record(5.5).unwrap();

        // One doubling of the floor is enough, and 2.0 stays on it.
        let far = 1.5 * f64::powi(2.0, 33);
        hist.record(far).unwrap();
        assert_close(hist.current_lowest_value(), 2.0, 0.00001);
        assert_eq!(hist.count_at_value(2.0), 1);
        assert_eq!(hist.count_at_value(5.5), 1);
        assert_eq!(hist.count_at_value(far), 1);
        assert_eq!(hist.total_count(), 3);
    }

    #[test]
    fn corrected_record_backfills_in_the_double_domain() {
        let mut hist = DoubleHistogram::new(RATIO, FIGURES).unwrap();
        hist.record(0.0).unwrap();
        hist.record_corrected(4.0, 1.0).unwrap();

        assert_eq!(hist.count_at_value(0.0), 1);
        for value in [1.0, 2.0, 3.0, 4.0] {
            assert_eq!(hist.count_at_value(value), 1, "value {value}");
        }
        assert_eq!(hist.total_count(), 5);
    }

    #[test]
    fn corrected_record_with_non_positive_interval_is_plain() {
        let mut hist = DoubleHistogram::new(RATIO, FIGURES).unwrap();
        hist.record_corrected(4.0, 0.0).unwrap();
        assert_eq!(hist.total_count(), 1);
    }

    #[test]
    fn statistics_follow_the_window() {
        let mut hist = DoubleHistogram::new(RATIO, FIGURES).unwrap();
        for value in [0.5, 1.0, 2.0, 4.0] {
            hist.record(value).unwrap();
        }
        assert_close(hist.min(), 0.5, 0.01);
        assert_close(hist.max(), 4.0, 0.01);
        assert_close(hist.mean(), 1.875, 0.01);
        assert_close(hist.value_at_percentile(100.0), 4.0, 0.01);
    }

    #[test]
    fn reset_clears_counts_but_keeps_the_window() {
        let mut hist = DoubleHistogram::new(RATIO, FIGURES).unwrap();
        hist.record(0.125).unwrap();
        let floor = hist.current_lowest_value();
        hist.reset();
        assert_eq!(hist.total_count(), 0);
        assert_eq!(hist.current_lowest_value(), floor);
    }
}
