//! Lazy iteration over histogram contents.
//!
//! All iterators yield [`IterItem`]s in ascending value order, are finite,
//! and can be restarted simply by creating a new iterator. They capture the
//! total count once at creation and are not meant to run concurrently with
//! recording; sample a quiescent histogram (e.g. the one returned by
//! [`IntervalRecorder::sample`](crate::recorder::IntervalRecorder::sample))
//! before iterating.
//!
//! - [`RecordedIter`] - one item per non-empty slot.
//! - [`LinearIter`] - fixed-width value steps.
//! - [`LogIter`] - exponentially growing value steps.
//! - [`PercentileIter`] - percentile levels closing in on 100%.

use std::ops::Range;

use super::Histogram;

/// One step of a histogram iteration.
#[derive(Debug, Clone, PartialEq)]
pub struct IterItem {
    /// Half-open range of values this step covers.
    pub value_range: Range<u64>,
    /// Count recorded inside `value_range`.
    pub count: u64,
    /// Total count recorded at or below this step.
    pub cumulative_count: u64,
    /// Percentage of all recordings at or below this step.
    pub percentile: f64,
}

impl Histogram {
    /// Iterates over every non-empty slot.
    pub fn iter_recorded(&self) -> RecordedIter<'_> {
        RecordedIter {
            histogram: self,
            index: 0,
            cumulative: 0,
            total: self.total_count(),
        }
    }

    /// Iterates in fixed steps of `value_units_per_step`, starting at 0.
    ///
    /// A slot wider than the step is attributed to the step containing its
    /// upper bound, so every count is reported exactly once.
    pub fn iter_linear(&self, value_units_per_step: u64) -> LinearIter<'_> {
        assert!(value_units_per_step > 0, "step must be non-zero");
        LinearIter {
            histogram: self,
            index: 0,
            step: value_units_per_step,
            next_level: value_units_per_step,
            cumulative: 0,
            total: self.total_count(),
            max: self.max(),
        }
    }

    /// Iterates in steps that start at `first_step_value` and grow by
    /// `log_base` each time.
    pub fn iter_log(&self, first_step_value: u64, log_base: f64) -> LogIter<'_> {
        assert!(first_step_value > 0, "first step must be non-zero");
        assert!(log_base > 1.0, "log base must exceed 1");
        LogIter {
            histogram: self,
            index: 0,
            first: true,
            next_level: first_step_value,
            next_level_float: first_step_value as f64,
            log_base,
            cumulative: 0,
            total: self.total_count(),
            max: self.max(),
        }
    }

    /// Iterates percentile levels from 0 towards 100, with
    /// `ticks_per_half_distance` steps for every halving of the distance
    /// that remains to 100%.
    pub fn iter_percentiles(&self, ticks_per_half_distance: u32) -> PercentileIter<'_> {
        assert!(ticks_per_half_distance > 0, "ticks must be non-zero");
        PercentileIter {
            histogram: self,
            index: 0,
            last_recorded_index: 0,
            cumulative: 0,
            total: self.total_count(),
            ticks_per_half_distance,
            level: 0.0,
            done: false,
        }
    }
}

/// Iterator over non-empty slots. See [`Histogram::iter_recorded`].
pub struct RecordedIter<'a> {
    histogram: &'a Histogram,
    index: usize,
    cumulative: u64,
    total: u64,
}

impl Iterator for RecordedIter<'_> {
    type Item = IterItem;

    fn next(&mut self) -> Option<IterItem> {
        let layout = self.histogram.layout();
        while self.index < self.histogram.len() {
            let index = self.index;
            self.index += 1;
            let count = self.histogram.count_at_index(index)?;
            if count == 0 {
                continue;
            }
            let value = layout.value_for(index);
            self.cumulative += count;
            return Some(IterItem {
                value_range: layout.lowest_equivalent(value)..layout.next_non_equivalent(value),
                count,
                cumulative_count: self.cumulative,
                percentile: percentile_of(self.cumulative, self.total),
            });
        }
        None
    }
}

/// Iterator over fixed-width steps. See [`Histogram::iter_linear`].
pub struct LinearIter<'a> {
    histogram: &'a Histogram,
    index: usize,
    step: u64,
    next_level: u64,
    cumulative: u64,
    total: u64,
    max: u64,
}

impl Iterator for LinearIter<'_> {
    type Item = IterItem;

    fn next(&mut self) -> Option<IterItem> {
        let start = self.next_level - self.step;
        if self.total == 0 || start > self.max {
            return None;
        }
        let count = consume_below(
            self.histogram,
            &mut self.index,
            self.next_level,
        );
        self.cumulative += count;
        let item = IterItem {
            value_range: start..self.next_level,
            count,
            cumulative_count: self.cumulative,
            percentile: percentile_of(self.cumulative, self.total),
        };
        self.next_level = self.next_level.saturating_add(self.step);
        Some(item)
    }
}

/// Iterator over exponentially growing steps. See [`Histogram::iter_log`].
pub struct LogIter<'a> {
    histogram: &'a Histogram,
    index: usize,
    first: bool,
    next_level: u64,
    next_level_float: f64,
    log_base: f64,
    cumulative: u64,
    total: u64,
    max: u64,
}

impl Iterator for LogIter<'_> {
    type Item = IterItem;

    fn next(&mut self) -> Option<IterItem> {
        // The first step starts at zero, like the linear iteration.
        let start = if self.first {
            self.first = false;
            0
        } else {
            (self.next_level_float / self.log_base) as u64
        };
        if self.total == 0 || start > self.max {
            return None;
        }
        let count = consume_below(self.histogram, &mut self.index, self.next_level);
        self.cumulative += count;
        let item = IterItem {
            value_range: start..self.next_level,
            count,
            cumulative_count: self.cumulative,
            percentile: percentile_of(self.cumulative, self.total),
        };
        self.next_level_float *= self.log_base;
        self.next_level = self.next_level_float as u64;
        Some(item)
    }
}

/// Iterator over percentile levels. See [`Histogram::iter_percentiles`].
pub struct PercentileIter<'a> {
    histogram: &'a Histogram,
    index: usize,
    last_recorded_index: usize,
    cumulative: u64,
    total: u64,
    ticks_per_half_distance: u32,
    level: f64,
    done: bool,
}

impl Iterator for PercentileIter<'_> {
    type Item = IterItem;

    fn next(&mut self) -> Option<IterItem> {
        if self.done || self.total == 0 {
            return None;
        }
        // Ceiling, so a level close enough to 100% consumes the last slot
        // and the iteration terminates for every distribution.
        let target = (((self.level / 100.0) * self.total as f64).ceil() as u64).max(1);

        let layout = self.histogram.layout();
        let mut reported = 0;
        while self.cumulative < target && self.index < self.histogram.len() {
            let count = self.histogram.count_at_index(self.index)?;
            if count != 0 {
                self.cumulative += count;
                reported += count;
                self.last_recorded_index = self.index;
            }
            self.index += 1;
        }
        let value = layout.value_for(self.last_recorded_index);

        let item = IterItem {
            value_range: layout.lowest_equivalent(value)..layout.next_non_equivalent(value),
            count: reported,
            cumulative_count: self.cumulative,
            percentile: self.level,
        };

        if self.cumulative >= self.total {
            // Everything is consumed; emit one final 100% tick and stop.
            if self.level >= 100.0 {
                self.done = true;
            } else {
                self.level = 100.0;
            }
        } else {
            // Halve the distance that remains to 100% every
            // `ticks_per_half_distance` steps: ticks get finer as the
            // iteration approaches the tail.
            let remaining = 100.0 - self.level;
            let half_distances = (100.0 / remaining).log2().floor() as i32 + 1;
            let tick = 100.0
                / (f64::from(self.ticks_per_half_distance) * f64::powi(2.0, half_distances));
            self.level = (self.level + tick).min(100.0);
        }
        Some(item)
    }
}

/// Adds up the counts of every slot whose upper bound lies below `level`,
/// advancing `index` past them.
fn consume_below(histogram: &Histogram, index: &mut usize, level: u64) -> u64 {
    let layout = histogram.layout();
    let mut count = 0;
    while *index < histogram.len() {
        let slot_top = layout.highest_equivalent(layout.value_for(*index));
        if slot_top >= level {
            break;
        }
        count += histogram.count_at_index(*index).unwrap_or(0);
        *index += 1;
    }
    count
}

fn percentile_of(cumulative: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        100.0 * cumulative as f64 / total as f64
    }
}
