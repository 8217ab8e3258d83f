use proptest::prelude::*;

use istogrammi::layout::BucketLayout;
use istogrammi::serialization::{decode, encode};
use istogrammi::Histogram;

proptest! {
    /// Property: decoding an index back to a value and encoding it again
    /// is the identity, for every slot of every valid layout.
    #[test]
    fn prop_index_value_round_trip(
        lowest in 1u64..1024,
        span in 2u64..1_000_000,
        figures in 0u8..=3,
    ) {
        let layout = BucketLayout::new(lowest, lowest * span, figures).unwrap();
        for index in 0..layout.counts_len() {
            let value = layout.value_for(index);
            prop_assert_eq!(layout.index_for(value), index);
            // Every value inside the slot maps to the same index.
            prop_assert_eq!(layout.index_for(layout.highest_equivalent(value)), index);
        }
    }

    /// Property: a recorded value is counted in the slot that covers it
    /// and total_count tracks the number of recordings.
    #[test]
    fn prop_recording_is_counted(values in prop::collection::vec(0u64..1_000_000, 1..200)) {
        let hist = Histogram::new(1, 1_000_000, 2).unwrap();
        for &value in &values {
            hist.record(value).unwrap();
            prop_assert!(hist.count_at_value(value) >= 1);
        }
        prop_assert_eq!(hist.total_count(), values.len() as u64);

        let summed: u64 = (0..hist.len())
            .map(|index| hist.count_at_index(index).unwrap())
            .sum();
        prop_assert_eq!(summed, values.len() as u64);
    }

    /// Property: corrected recording adds exactly
    /// 1 + floor((value - interval) / interval) recordings (the back-fill
    /// stops before zero), and behaves like plain recording for
    /// interval = 0.
    #[test]
    fn prop_corrected_recording_count(
        value in 1u64..100_000,
        interval in 0u64..10_000,
    ) {
        let hist = Histogram::new(1, 1_000_000, 3).unwrap();
        hist.record_corrected(value, interval).unwrap();

        let expected = if interval == 0 || value <= interval {
            1
        } else {
            1 + (value - interval) / interval
        };
        prop_assert_eq!(hist.total_count(), expected);
    }

    /// Property: snapshot round-trips reproduce totals, extremes and every
    /// slot count exactly.
    #[test]
    fn prop_snapshot_round_trip(values in prop::collection::vec(0u64..3_000_000, 0..100)) {
        let hist = Histogram::new(1, 3_600_000_000, 3).unwrap();
        for &value in &values {
            hist.record(value).unwrap();
        }

        let restored = decode(&encode(&hist)).unwrap();
        prop_assert_eq!(restored.total_count(), hist.total_count());
        prop_assert_eq!(restored.min(), hist.min());
        prop_assert_eq!(restored.max(), hist.max());
        prop_assert!(restored == hist);
    }

    /// Property: merging two histograms is count-preserving, slot by slot.
    #[test]
    fn prop_merge_preserves_counts(
        left in prop::collection::vec(0u64..1_000_000, 0..100),
        right in prop::collection::vec(0u64..1_000_000, 0..100),
    ) {
        let a = Histogram::new(1, 1_000_000, 2).unwrap();
        let b = Histogram::new(1, 1_000_000, 2).unwrap();
        for &value in &left {
            a.record(value).unwrap();
        }
        for &value in &right {
            b.record(value).unwrap();
        }

        a.merge(&b).unwrap();

        let reference = Histogram::new(1, 1_000_000, 2).unwrap();
        for &value in left.iter().chain(right.iter()) {
            reference.record(value).unwrap();
        }
        prop_assert_eq!(a.total_count(), (left.len() + right.len()) as u64);
        prop_assert!(a == reference);
    }

    /// Property: value_at_percentile never reports below the minimum or
    /// above the maximum recorded slot.
    #[test]
    fn prop_percentiles_stay_in_range(
        values in prop::collection::vec(1u64..1_000_000, 1..100),
        percentile in 0.0f64..100.0,
    ) {
        let hist = Histogram::new(1, 1_000_000, 2).unwrap();
        for &value in &values {
            hist.record(value).unwrap();
        }
        let reported = hist.value_at_percentile(percentile);
        prop_assert!(reported >= hist.min());
        prop_assert!(reported <= hist.max());
    }
}
