//! # Istogrammi - High-Dynamic-Range Histograms with Lock-Free Interval Sampling
//!
//! A Rust library for recording latency and magnitude measurements with
//! guaranteed relative precision across many orders of magnitude, and for
//! harvesting those measurements from hot writer threads **without locking
//! the recording path**.
//!
//! ## The Problem
//!
//! Averages hide tail latency, and fixed-width histogram buckets force an
//! impossible trade-off: fine buckets explode memory across a wide range,
//! coarse buckets destroy resolution exactly where latency spikes live.
//! On top of that, harvesting a histogram that several threads are
//! concurrently updating usually means a lock on the recording path or a
//! snapshot that tears in-flight updates.
//!
//! ## The Solution
//!
//! Two pieces, designed to compose:
//!
//! 1. **Logarithmic bucketing** ([`Histogram`]): values are indexed by
//!    binary order of magnitude plus a linear sub-bucket, so every value in
//!    the configured range keeps a fixed number of significant figures at a
//!    fixed memory footprint. Recording is a direct index computation and
//!    one atomic add - no search, no allocation, `&self` all the way.
//!
//! 2. **Epoch-based buffer flipping** ([`IntervalRecorder`] over
//!    [`phaser::WriterReaderPhaser`]): writers record into an *active*
//!    histogram inside a lock-free critical section; a sampler thread swaps
//!    active and inactive buffers and waits only for the writers already in
//!    flight. Every recording lands in exactly one sampled interval - no
//!    loss, no duplication, no locks where it hurts.
//!
//! ```text
//!   writer threads                        sampler thread
//!   ══════════════                        ══════════════
//!   enter ─┐                                   │
//!          ├─► [ active histogram ]            │ sample()
//!   exit ──┘         ▲      swap ──────────────┤   1. reset inactive
//!                    │                         │   2. swap buffers
//!                    ▼                         │   3. flip phase, drain
//!          [ inactive histogram ] ─────────────►   4. hand back interval
//! ```
//!
//! ## Available Types
//!
//! | Type | Description | Use Case |
//! |------|-------------|----------|
//! | [`Histogram`] | Fixed-range integer histogram, atomic counts | Latency/size distributions |
//! | [`DoubleHistogram`] | Auto-ranging `f64` histogram | Magnitudes with unknown scale |
//! | [`IntervalRecorder`] | Double-buffered recorder + phaser | Per-interval reporting under load |
//! | [`phaser::WriterReaderPhaser`] | Writer/reader epoch primitive | Build your own flipping structures |
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use std::thread;
//! use istogrammi::IntervalRecorder;
//!
//! // Track one hour in microseconds at 3 significant figures.
//! let recorder = Arc::new(IntervalRecorder::new(1, 3_600_000_000, 3).unwrap());
//!
//! // Writer threads record with no coordination beyond two atomic ops.
//! let writers: Vec<_> = (0..4)
//!     .map(|_| {
//!         let recorder = Arc::clone(&recorder);
//!         thread::spawn(move || {
//!             for i in 1..=10_000u64 {
//!                 recorder.record(i % 1_000 + 1).unwrap();
//!             }
//!         })
//!     })
//!     .collect();
//!
//! for writer in writers {
//!     writer.join().unwrap();
//! }
//!
//! // The sampler gets a quiescent histogram for the elapsed interval.
//! let interval = recorder.sample();
//! assert_eq!(interval.total_count(), 40_000);
//! println!("p99 = {}", interval.value_at_percentile(99.0));
//! ```
//!
//! Plain histograms work standalone when no interval sampling is needed:
//!
//! ```rust
//! use istogrammi::Histogram;
//!
//! let hist = Histogram::new(1, 1_000_000, 2).unwrap();
//! hist.record(100).unwrap();
//! hist.record_corrected(1_000, 100).unwrap(); // coordinated-omission fill
//! assert!(hist.total_count() > 2);
//! ```
//!
//! ## Precision
//!
//! `significant_figures` bounds the relative quantization error: with 3
//! significant figures every recorded value is reported within 0.1%. A
//! histogram covering `[1, 3_600_000_000]` (one hour in microseconds) at 3
//! significant figures uses 23k counters - about 184 KiB - and that
//! footprint never changes at runtime.
//!
//! ## Snapshots
//!
//! [`serialization`] encodes the full counts array as sign-folded varints
//! with zero-run compression, for embedding in logs or shipping between
//! processes; decoding validates cookie, version and totals before any
//! histogram is returned.
//!
//! ## Feature Flags
//!
//! | Feature | Module | Description |
//! |---------|--------|-------------|
//! | `serde` | [`snapshot`] | Serializable summary snapshots |
//! | `json` | [`reports::json`] | JSON reports via serde_json |
//! | `table` | [`reports::table`] | Percentile tables via `tabled` |
//! | `full` | All of the above | |
//!
//! ## Thread Safety
//!
//! [`Histogram`] and [`IntervalRecorder`] are `Send + Sync`; share them
//! with `Arc`. Recording uses relaxed atomics (aggregation happens on
//! read), the phaser pairs release exits with acquire drains so a sampled
//! interval always observes every recording it waited for.
//! [`DoubleHistogram`] rescales in place and is the one type that records
//! through `&mut self`.

pub mod double;
pub mod errors;
pub mod histogram;
pub mod layout;
pub mod phaser;
pub mod recorder;
pub mod reports;
pub mod serialization;

#[cfg(feature = "serde")]
pub mod snapshot;

pub use double::DoubleHistogram;
pub use errors::{CreationError, DecodeError, MergeError, RecordError};
pub use histogram::Histogram;
pub use recorder::{IntervalHistogram, IntervalRecorder};
