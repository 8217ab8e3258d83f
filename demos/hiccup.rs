//! Platform hiccup sampler.
//!
//! A recording thread repeatedly sleeps for one millisecond and records how
//! far past the deadline the wakeup actually landed - a direct measure of
//! scheduler and GC-style stalls. The main thread samples the recorder once
//! per interval and reports the percentile distribution of the overshoot.
//!
//! Run with:
//! ```bash
//! cargo run --release --example hiccup --features demo -- --interval 1
//! ```

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use clap::Parser;
use istogrammi::reports::json::JsonReport;
use istogrammi::reports::table::{PercentileTable, TableStyle};
use istogrammi::IntervalRecorder;

/// Output format for interval reports.
#[derive(Debug, Clone, Copy, clap::ValueEnum, Default)]
enum OutputFormat {
    /// Percentile distribution table
    #[default]
    Table,
    /// JSON summary, one document per interval
    Json,
}

/// Measure and report scheduling hiccups.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Seconds between samples
    #[arg(short, long, default_value = "1")]
    interval: u64,

    /// Number of intervals to report before exiting (0 = forever)
    #[arg(short, long, default_value = "0")]
    count: u64,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    format: OutputFormat,
}

/// One millisecond, the sleep quantum whose overshoot we measure.
const QUANTUM: Duration = Duration::from_millis(1);

fn record_hiccups(recorder: Arc<IntervalRecorder>) {
    loop {
        let start = Instant::now();
        thread::sleep(QUANTUM);
        let overshoot_us = start
            .elapsed()
            .saturating_sub(QUANTUM)
            .as_micros() as u64;
        // A stall beyond the one-day window is dropped, not clamped.
        let _ = recorder.record(overshoot_us);
    }
}

fn main() {
    let args = Args::parse();
    let interval = Duration::from_secs(args.interval.max(1));

    // A day in microseconds leaves room for any conceivable stall.
    let recorder = Arc::new(
        IntervalRecorder::new(1, 24 * 60 * 60 * 1_000_000, 3)
            .expect("recorder configuration is valid"),
    );

    {
        let recorder = Arc::clone(&recorder);
        thread::spawn(move || record_hiccups(recorder));
    }

    let table = PercentileTable::new().with_style(TableStyle::Rounded);
    let json = JsonReport::new();
    let started = Instant::now();

    for reported in 0.. {
        if args.count != 0 && reported == args.count {
            break;
        }
        thread::sleep(interval);

        let histogram = recorder.sample();
        let offset = started.elapsed().as_secs_f64();
        match args.format {
            OutputFormat::Table => {
                println!(
                    "--- interval at {offset:.1}s: {} samples, max {}us ---",
                    histogram.total_count(),
                    histogram.max()
                );
                println!("{}", table.render(&histogram));
            }
            OutputFormat::Json => {
                match json.render(&histogram) {
                    Ok(line) => println!("{line}"),
                    Err(err) => eprintln!("failed to render interval: {err}"),
                }
            }
        }
    }
}
