//! Interval sampling of concurrently recorded histograms.
//!
//! [`IntervalRecorder`] pairs two identically configured [`Histogram`]s
//! with a [`WriterReaderPhaser`]. Writer threads record into the *active*
//! histogram through `&self` - one atomic section enter, the recording,
//! one exit, no locks. A single sampler thread periodically calls
//! [`sample`](IntervalRecorder::sample), which swaps the buffers, drains
//! the writers still inside the retiring one, and hands back an exclusive
//! view of a histogram that is guaranteed quiescent: every recording that
//! finished before the sample is in it, every recording that started after
//! the swap is in the new active buffer, and recordings straddling the
//! swap are resolved by the phaser's epoch wait rather than by luck.
//!
//! ```rust
//! use std::sync::Arc;
//! use std::thread;
//! use istogrammi::IntervalRecorder;
//!
//! let recorder = Arc::new(IntervalRecorder::new(1, 3_600_000_000, 3).unwrap());
//!
//! let writer = {
//!     let recorder = Arc::clone(&recorder);
//!     thread::spawn(move || {
//!         for i in 1..=10_000u64 {
//!             recorder.record(i).unwrap();
//!         }
//!     })
//! };
//!
//! // Meanwhile, on the sampling thread:
//! let interval = recorder.sample();
//! println!("interval p99 = {}", interval.value_at_percentile(99.0));
//! drop(interval); // release the buffer before the next sample
//! # writer.join().unwrap();
//! ```
//!
//! The returned [`IntervalHistogram`] holds the phaser's reader lock for
//! its lifetime, so a second `sample` (from the one sampler thread this
//! type supports) must wait until the previous view is dropped or passed
//! back through [`sample_and_recycle`](IntervalRecorder::sample_and_recycle).

use std::ops::Deref;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crossbeam_utils::CachePadded;

use crate::errors::{CreationError, RecordError};
use crate::histogram::Histogram;
use crate::layout::BucketLayout;
use crate::phaser::{ReaderGuard, WriterReaderPhaser};

/// Default sleep granularity while a sample drains in-flight writers.
const DEFAULT_FLIP_WAIT_HINT: Duration = Duration::from_nanos(500);

/// Double-buffered histogram recorder for concurrent writers and one
/// periodic sampler. See the [module documentation](self).
#[derive(Debug)]
pub struct IntervalRecorder {
    histograms: [Histogram; 2],
    active: CachePadded<AtomicUsize>,
    phaser: WriterReaderPhaser,
    flip_wait_hint: Duration,
}

impl IntervalRecorder {
    /// Creates a recorder whose two buffers track
    /// `[lowest_trackable_value, highest_trackable_value]` with
    /// `significant_figures` digits of precision.
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
        Ok(IntervalRecorder {
            histograms: [
                Histogram::with_layout(layout),
                Histogram::with_layout(layout),
            ],
            active: CachePadded::new(AtomicUsize::new(0)),
            phaser: WriterReaderPhaser::new(),
            flip_wait_hint: DEFAULT_FLIP_WAIT_HINT,
        })
    }

    /// Sets the sleep granularity used while a sample waits for in-flight
    /// writers, returning `self` for chaining.
    pub fn with_flip_wait_hint(mut self, hint: Duration) -> Self {
        self.flip_wait_hint = hint;
        self
    }

    /// The bucket geometry shared by both buffers.
    pub fn layout(&self) -> &BucketLayout {
        self.histograms[0].layout()
    }

    /// Records one occurrence of `value` into the active buffer.
    #[inline]
    pub fn record(&self, value: u64) -> Result<(), RecordError> {
        let _section = self.phaser.writer_enter();
        self.active_histogram().record(value)
    }

    /// Records `count` occurrences of `value` into the active buffer.
    #[inline]
    pub fn record_n(&self, value: u64, count: u64) -> Result<(), RecordError> {
        let _section = self.phaser.writer_enter();
        self.active_histogram().record_n(value, count)
    }

    /// Coordinated-omission corrected recording into the active buffer;
    /// see [`Histogram::record_corrected`].
    #[inline]
    pub fn record_corrected(
        &self,
        value: u64,
        expected_interval: u64,
    ) -> Result<(), RecordError> {
        let _section = self.phaser.writer_enter();
        self.active_histogram().record_corrected(value, expected_interval)
    }

    /// Count-weighted corrected recording into the active buffer.
    #[inline]
    pub fn record_corrected_n(
        &self,
        value: u64,
        count: u64,
        expected_interval: u64,
    ) -> Result<(), RecordError> {
        let _section = self.phaser.writer_enter();
        self.active_histogram()
            .record_corrected_n(value, count, expected_interval)
    }

    /// Retires the active buffer and returns an exclusive view of it.
    ///
    /// The previously retired buffer is reset and promoted to active
    /// before the flip, so each recording shows up in exactly one sampled
    /// interval. Blocks while a previous [`IntervalHistogram`] is still
    /// alive (they share the phaser's reader lock), and while draining
    /// writers that are mid-recording in the retiring buffer.
    pub fn sample(&self) -> IntervalHistogram<'_> {
        let guard = self.phaser.reader_lock();
        let incoming = 1 - self.active.load(Ordering::Relaxed);
        self.histograms[incoming].reset();
        self.swap_and_flip(guard, incoming)
    }

    /// Like [`sample`](Self::sample), but reuses the caller's consumed
    /// view as the incoming buffer without resetting it again.
    ///
    /// The caller must have reset the view (via [`Histogram::reset`]
    /// through deref) after consuming it; this skips the reset pass that
    /// `sample` performs under the reader lock.
    ///
    /// # Panics
    ///
    /// Panics if `previous` came from a different recorder, or (in debug
    /// builds) if it was not reset.
    pub fn sample_and_recycle<'a>(
        &'a self,
        previous: IntervalHistogram<'a>,
    ) -> IntervalHistogram<'a> {
        assert!(
            std::ptr::eq(previous.guard.phaser(), &self.phaser),
            "interval histogram recycled into a different recorder"
        );
        debug_assert!(
            previous.is_empty(),
            "recycled interval histogram must be reset first"
        );
        let IntervalHistogram { index, guard, .. } = previous;
        debug_assert_eq!(index, 1 - self.active.load(Ordering::Relaxed));
        self.swap_and_flip(guard, index)
    }

    /// Publishes `incoming` as the active buffer, flips the phase and
    /// returns the retired buffer. `guard` proves the reader lock is held.
    fn swap_and_flip<'a>(
        &'a self,
        guard: ReaderGuard<'a>,
        incoming: usize,
    ) -> IntervalHistogram<'a> {
        let retiring = 1 - incoming;
        self.active.store(incoming, Ordering::Release);
        // After the flip no writer can still be touching `retiring`: those
        // counted under the old phase have exited, those counted after the
        // phase swap observe the index store above.
        guard.flip_phase(self.flip_wait_hint);
        IntervalHistogram {
            histogram: &self.histograms[retiring],
            index: retiring,
            guard,
        }
    }

    #[inline]
    fn active_histogram(&self) -> &Histogram {
        &self.histograms[self.active.load(Ordering::Acquire)]
    }
}

/// Exclusive view of a retired interval histogram.
///
/// Dereferences to [`Histogram`]; holds the recorder's reader lock until
/// dropped or recycled, which is what keeps the buffer reader-owned.
pub struct IntervalHistogram<'a> {
    histogram: &'a Histogram,
    index: usize,
    guard: ReaderGuard<'a>,
}

impl Deref for IntervalHistogram<'_> {
    type Target = Histogram;

    #[inline]
    fn deref(&self) -> &Histogram {
        self.histogram
    }
}

impl std::fmt::Debug for IntervalHistogram<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.histogram.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn recorder() -> IntervalRecorder {
        IntervalRecorder::new(1, 3_600_000_000, 3).unwrap()
    }

    #[test]
    fn records_land_in_the_sampled_interval() {
        let recorder = recorder();
        recorder.record(100).unwrap();
        recorder.record_n(200, 3).unwrap();

        let interval = recorder.sample();
        assert_eq!(interval.total_count(), 4);
        assert_eq!(interval.count_at_value(100), 1);
        assert_eq!(interval.count_at_value(200), 3);
    }

    #[test]
    fn sampling_starts_a_fresh_interval() {
        let recorder = recorder();
        recorder.record(100).unwrap();
        drop(recorder.sample());

        recorder.record(300).unwrap();
        let interval = recorder.sample();
        assert_eq!(interval.total_count(), 1);
        assert_eq!(interval.count_at_value(100), 0);
        assert_eq!(interval.count_at_value(300), 1);
    }

    #[test]
    fn recording_proceeds_while_a_view_is_held() {
        let recorder = recorder();
        recorder.record(1).unwrap();
        let interval = recorder.sample();

        // Writers are never blocked by the reader-owned view; this lands
        // in the new active buffer.
        recorder.record(2).unwrap();
        assert_eq!(interval.total_count(), 1);
        drop(interval);

        let next = recorder.sample();
        assert_eq!(next.count_at_value(2), 1);
    }

    #[test]
    fn recycling_skips_the_reset() {
        let recorder = recorder();
        recorder.record(10).unwrap();

        let interval = recorder.sample();
        assert_eq!(interval.total_count(), 1);
        interval.reset();

        recorder.record(20).unwrap();
        let interval = recorder.sample_and_recycle(interval);
        assert_eq!(interval.total_count(), 1);
        assert_eq!(interval.count_at_value(20), 1);
    }

    #[test]
    #[should_panic(expected = "different recorder")]
    fn recycling_into_another_recorder_panics() {
        let a = recorder();
        let b = recorder();
        let view = a.sample();
        let _ = b.sample_and_recycle(view);
    }

    #[test]
    fn corrected_recording_goes_through_the_phaser() {
        let recorder = recorder();
        recorder.record_corrected(4, 1).unwrap();
        let interval = recorder.sample();
        assert_eq!(interval.total_count(), 4);
    }

    #[test]
    fn overflow_is_reported_through_the_recorder() {
        let recorder = IntervalRecorder::new(1, 1000, 2).unwrap();
        assert!(recorder.record(1 << 40).is_err());
        assert_eq!(recorder.sample().total_count(), 0);
    }

    // Exactness under concurrency: every recording shows up in exactly one
    // sampled interval, for any interleaving of writers and the sampler.
    #[test]
    fn concurrent_counts_sum_exactly() {
        const WRITERS: u64 = 4;
        const PER_WRITER: u64 = 50_000;

        let recorder = Arc::new(recorder());

        let mut writers = vec![];
        for _ in 0..WRITERS {
            let recorder = Arc::clone(&recorder);
            writers.push(thread::spawn(move || {
                for i in 0..PER_WRITER {
                    recorder.record(1 + (i % 1000)).unwrap();
                }
            }));
        }

        let sampler = {
            let recorder = Arc::clone(&recorder);
            thread::spawn(move || {
                let mut collected = 0u64;
                for _ in 0..50 {
                    thread::sleep(Duration::from_millis(1));
                    collected += recorder.sample().total_count();
                }
                collected
            })
        };

        for writer in writers {
            writer.join().unwrap();
        }
        let mut total = sampler.join().unwrap();
        total += recorder.sample().total_count();

        assert_eq!(total, WRITERS * PER_WRITER);
    }
}
