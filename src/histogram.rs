//! Fixed-range high-dynamic-range histogram with atomic counts.
//!
//! [`Histogram`] records integer values (latencies, sizes, any non-negative
//! magnitude) into logarithmically structured buckets so that every recorded
//! value keeps a configured number of significant figures, across the whole
//! range, at a fixed memory footprint. Recording is a single atomic add plus
//! two bounded CAS loops for the min/max aggregates, all through `&self`, so
//! one instance can be shared by any number of threads behind an `Arc`:
//!
//! ```rust
//! use std::sync::Arc;
//! use std::thread;
//! use istogrammi::Histogram;
//!
//! let hist = Arc::new(Histogram::new(1, 3_600_000_000, 3).unwrap());
//!
//! let mut handles = vec![];
//! for _ in 0..4 {
//!     let h = Arc::clone(&hist);
//!     handles.push(thread::spawn(move || {
//!         for i in 1..=1000 {
//!             h.record(i).unwrap();
//!         }
//!     }));
//! }
//! for handle in handles {
//!     handle.join().unwrap();
//! }
//!
//! assert_eq!(hist.total_count(), 4000);
//! assert_eq!(hist.max(), 1000);
//! println!("p99.9 = {}", hist.value_at_percentile(99.9));
//! ```
//!
//! Recording a value outside the trackable range fails with
//! [`RecordError::ValueOutOfRange`] and leaves the histogram untouched, so
//! overflow is always observable by the caller.

pub mod iter;

use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam_utils::CachePadded;

use crate::errors::{CreationError, MergeError, RecordError};
use crate::layout::BucketLayout;

/// A histogram of `u64` values with configurable range and precision.
///
/// The counts array is sized once at construction from
/// `(lowest_trackable_value, highest_trackable_value, significant_figures)`
/// and never reallocates; see [`BucketLayout`] for the bucket structure.
pub struct Histogram {
    layout: BucketLayout,
    counts: Box<[AtomicU64]>,
    total_count: CachePadded<AtomicU64>,
    /// Lowest recorded non-zero value, floored to its unit magnitude.
    /// `u64::MAX` while nothing non-zero has been recorded.
    min_non_zero_value: CachePadded<AtomicU64>,
    /// Highest recorded value, ceiled to its unit magnitude. 0 while empty.
    max_value: CachePadded<AtomicU64>,
}

impl Histogram {
    /// Creates a histogram tracking values in
    /// `[lowest_trackable_value, highest_trackable_value]` with
    /// `significant_figures` decimal digits of relative precision.
    ///
    /// `lowest_trackable_value` is the smallest value that must be
    /// distinguishable from 0; values below it are still recorded, at the
    /// unit resolution of bucket 0.
    pub fn new(
        lowest_trackable_value: u64,
        highest_trackable_value: u64,
        significant_figures: u8,
    ) -> Result<Self, CreationError> {
        let layout = BucketLayout::new(
            lowest_trackable_value,
            highest_trackable_value,
            significant_figures,
        )?;
        Ok(Self::with_layout(layout))
    }

    /// Creates a histogram tracking `[1, highest_trackable_value]`.
    pub fn with_max(
        highest_trackable_value: u64,
        significant_figures: u8,
    ) -> Result<Self, CreationError> {
        Self::new(1, highest_trackable_value, significant_figures)
    }

    pub(crate) fn with_layout(layout: BucketLayout) -> Self {
        let counts = (0..layout.counts_len())
            .map(|_| AtomicU64::new(0))
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Histogram {
            layout,
            counts,
            total_count: CachePadded::new(AtomicU64::new(0)),
            min_non_zero_value: CachePadded::new(AtomicU64::new(u64::MAX)),
            max_value: CachePadded::new(AtomicU64::new(0)),
        }
    }

    /// The bucket geometry of this histogram.
    #[inline]
    pub fn layout(&self) -> &BucketLayout {
        &self.layout
    }

    /// Number of slots in the counts array.
    #[inline]
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    /// Whether the histogram has no recordings.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.total_count() == 0
    }

    /// Records one occurrence of `value`.
    #[inline]
    pub fn record(&self, value: u64) -> Result<(), RecordError> {
        self.record_n(value, 1)
    }

    /// Records `count` occurrences of `value` as one logical operation.
    pub fn record_n(&self, value: u64, count: u64) -> Result<(), RecordError> {
        let index = self.layout.index_for(value);
        let slot = self
            .counts
            .get(index)
            .ok_or(RecordError::ValueOutOfRange(value))?;
        slot.fetch_add(count, Ordering::Relaxed);
        self.total_count.fetch_add(count, Ordering::Relaxed);
        self.update_min_max(value);
        Ok(())
    }

    /// Records `value`, then back-fills the samples a producer stalled for
    /// `value` would have missed: one extra recording at each point
    /// `value - k * expected_interval` while that point is at least
    /// `expected_interval`.
    ///
    /// With `expected_interval <= 0` this is plain [`record`](Self::record).
    pub fn record_corrected(
        &self,
        value: u64,
        expected_interval: u64,
    ) -> Result<(), RecordError> {
        self.record_corrected_n(value, 1, expected_interval)
    }

    /// Count-weighted form of [`record_corrected`](Self::record_corrected).
    pub fn record_corrected_n(
        &self,
        value: u64,
        count: u64,
        expected_interval: u64,
    ) -> Result<(), RecordError> {
        self.record_n(value, count)?;
        if expected_interval == 0 {
            return Ok(());
        }
        let mut missing = value.wrapping_sub(expected_interval);
        while missing >= expected_interval && missing < value {
            self.record_n(missing, count)?;
            missing -= expected_interval;
        }
        Ok(())
    }

    /// Adds every count of `other` into this histogram.
    ///
    /// Fails before touching anything when the bucket layouts differ;
    /// histograms must be configured identically to be merged.
    pub fn merge(&self, other: &Histogram) -> Result<(), MergeError> {
        if self.layout != other.layout {
            return Err(MergeError::IncompatibleLayout);
        }
        let mut observed = 0u64;
        for (slot, other_slot) in self.counts.iter().zip(other.counts.iter()) {
            let count = other_slot.load(Ordering::Relaxed);
            if count != 0 {
                slot.fetch_add(count, Ordering::Relaxed);
                observed += count;
            }
        }
        self.total_count.fetch_add(observed, Ordering::Relaxed);

        let other_max = other.max_value.load(Ordering::Relaxed);
        if other_max != 0 {
            fetch_max(&self.max_value, other_max);
        }
        let other_min = other.min_non_zero_value.load(Ordering::Relaxed);
        if other_min != u64::MAX {
            fetch_min(&self.min_non_zero_value, other_min);
        }
        Ok(())
    }

    /// Zeroes all counts and aggregates in place. The layout is unchanged.
    pub fn reset(&self) {
        for slot in self.counts.iter() {
            slot.store(0, Ordering::Relaxed);
        }
        self.total_count.store(0, Ordering::Relaxed);
        self.min_non_zero_value.store(u64::MAX, Ordering::Relaxed);
        self.max_value.store(0, Ordering::Relaxed);
    }

    /// Total number of recorded values.
    #[inline]
    pub fn total_count(&self) -> u64 {
        self.total_count.load(Ordering::Relaxed)
    }

    /// Count recorded in the slot that covers `value`, 0 when `value` is
    /// out of range.
    #[inline]
    pub fn count_at_value(&self, value: u64) -> u64 {
        self.counts
            .get(self.layout.index_for(value))
            .map_or(0, |slot| slot.load(Ordering::Relaxed))
    }

    /// Count recorded at slot `index`.
    #[inline]
    pub fn count_at_index(&self, index: usize) -> Option<u64> {
        self.counts.get(index).map(|slot| slot.load(Ordering::Relaxed))
    }

    /// Lowest recorded value, 0 if any zero was recorded or nothing was.
    pub fn min(&self) -> u64 {
        if self.total_count() == 0 || self.counts[0].load(Ordering::Relaxed) != 0 {
            0
        } else {
            self.min_non_zero()
        }
    }

    /// Lowest recorded non-zero value, `u64::MAX` when none was recorded.
    pub fn min_non_zero(&self) -> u64 {
        let raw = self.min_non_zero_value.load(Ordering::Relaxed);
        if raw == u64::MAX {
            u64::MAX
        } else {
            self.layout.lowest_equivalent(raw)
        }
    }

    /// Highest recorded value, 0 when nothing was recorded.
    pub fn max(&self) -> u64 {
        let raw = self.max_value.load(Ordering::Relaxed);
        if raw == 0 {
            0
        } else {
            self.layout.highest_equivalent(raw)
        }
    }

    /// Mean of all recorded values, quantized to slot midpoints.
    pub fn mean(&self) -> f64 {
        let total = self.total_count();
        if total == 0 {
            return 0.0;
        }
        let mut sum = 0.0;
        for (index, slot) in self.counts.iter().enumerate() {
            let count = slot.load(Ordering::Relaxed);
            if count != 0 {
                let mid = self.layout.median_equivalent(self.layout.value_for(index));
                sum += mid as f64 * count as f64;
            }
        }
        sum / total as f64
    }

    /// Standard deviation of all recorded values.
    pub fn stdev(&self) -> f64 {
        let total = self.total_count();
        if total == 0 {
            return 0.0;
        }
        let mean = self.mean();
        let mut geometric_dev_total = 0.0;
        for (index, slot) in self.counts.iter().enumerate() {
            let count = slot.load(Ordering::Relaxed);
            if count != 0 {
                let dev =
                    self.layout.median_equivalent(self.layout.value_for(index)) as f64 - mean;
                geometric_dev_total += dev * dev * count as f64;
            }
        }
        (geometric_dev_total / total as f64).sqrt()
    }

    /// Value below which `percentile` percent of the recordings fall.
    ///
    /// `percentile` is clamped to `[0, 100]`; 0.0 returns the lowest
    /// recorded slot, 100.0 the highest.
    pub fn value_at_percentile(&self, percentile: f64) -> u64 {
        let total = self.total_count();
        if total == 0 {
            return 0;
        }
        let requested = (percentile.min(100.0) / 100.0) * total as f64 + 0.5;
        let target = (requested as u64).max(1);

        let mut cumulative = 0u64;
        for (index, slot) in self.counts.iter().enumerate() {
            cumulative += slot.load(Ordering::Relaxed);
            if cumulative >= target {
                let value = self.layout.value_for(index);
                return if percentile == 0.0 {
                    self.layout.lowest_equivalent(value)
                } else {
                    self.layout.highest_equivalent(value)
                };
            }
        }
        0
    }

    /// Percentage of recordings at or below `value`.
    pub fn percentile_below(&self, value: u64) -> f64 {
        let total = self.total_count();
        if total == 0 {
            return 100.0;
        }
        let target = self.layout.index_for(value).min(self.counts.len() - 1);
        let below: u64 = self.counts[..=target]
            .iter()
            .map(|slot| slot.load(Ordering::Relaxed))
            .sum();
        100.0 * below as f64 / total as f64
    }

    /// Total count recorded between `low` and `high` inclusive, both rounded
    /// to their equivalent slot boundaries.
    pub fn count_between(&self, low: u64, high: u64) -> u64 {
        let low_index = self.layout.index_for(low).min(self.counts.len() - 1);
        let high_index = self.layout.index_for(high).min(self.counts.len() - 1);
        self.counts[low_index..=high_index]
            .iter()
            .map(|slot| slot.load(Ordering::Relaxed))
            .sum()
    }

    /// Overwrites the count at `index` without touching the aggregates;
    /// used when rebuilding a histogram from a decoded snapshot.
    pub(crate) fn set_count_at_index(&self, index: usize, count: u64) -> Option<()> {
        self.counts.get(index).map(|slot| {
            slot.store(count, Ordering::Relaxed);
        })
    }

    pub(crate) fn set_aggregates(&self, total: u64, min_raw: u64, max_raw: u64) {
        self.total_count.store(total, Ordering::Relaxed);
        self.min_non_zero_value.store(min_raw, Ordering::Relaxed);
        self.max_value.store(max_raw, Ordering::Relaxed);
    }

    pub(crate) fn min_non_zero_raw(&self) -> u64 {
        self.min_non_zero_value.load(Ordering::Relaxed)
    }

    pub(crate) fn max_raw(&self) -> u64 {
        self.max_value.load(Ordering::Relaxed)
    }

    fn update_min_max(&self, value: u64) {
        let mask = self.layout.unit_magnitude_mask();
        fetch_max(&self.max_value, value | mask);
        if value > mask {
            fetch_min(&self.min_non_zero_value, value & !mask);
        }
    }
}

/// Raises `slot` to `value` if larger, via a CAS loop.
fn fetch_max(slot: &AtomicU64, value: u64) {
    let mut current = slot.load(Ordering::Relaxed);
    while value > current {
        match slot.compare_exchange_weak(current, value, Ordering::Relaxed, Ordering::Relaxed) {
            Ok(_) => break,
            Err(actual) => current = actual,
        }
    }
}

/// Lowers `slot` to `value` if smaller, via a CAS loop.
fn fetch_min(slot: &AtomicU64, value: u64) {
    let mut current = slot.load(Ordering::Relaxed);
    while value < current {
        match slot.compare_exchange_weak(current, value, Ordering::Relaxed, Ordering::Relaxed) {
            Ok(_) => break,
            Err(actual) => current = actual,
        }
    }
}

impl Clone for Histogram {
    fn clone(&self) -> Self {
        let copy = Histogram::with_layout(self.layout);
        for (slot, source) in copy.counts.iter().zip(self.counts.iter()) {
            slot.store(source.load(Ordering::Relaxed), Ordering::Relaxed);
        }
        copy.set_aggregates(
            self.total_count(),
            self.min_non_zero_raw(),
            self.max_raw(),
        );
        copy
    }
}

impl PartialEq for Histogram {
    fn eq(&self, other: &Self) -> bool {
        self.layout == other.layout
            && self.total_count() == other.total_count()
            && self
                .counts
                .iter()
                .zip(other.counts.iter())
                .all(|(a, b)| a.load(Ordering::Relaxed) == b.load(Ordering::Relaxed))
    }
}

impl Debug for Histogram {
    /// Formats the configuration and aggregates, not the counts array.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Histogram")
            .field("lowest", &self.layout.lowest_trackable_value())
            .field("highest", &self.layout.highest_trackable_value())
            .field("significant_figures", &self.layout.significant_figures())
            .field("total_count", &self.total_count())
            .field("min", &self.min())
            .field("max", &self.max())
            .finish()
    }
}
