//! Writer/reader phase synchronization.
//!
//! [`WriterReaderPhaser`] coordinates any number of writer threads with a
//! single reader that periodically needs exclusive access to a structure the
//! writers update - without ever locking the writer path. Writers wrap each
//! update in a critical section ([`writer_enter`]); the reader swaps the
//! structure out and then *flips the phase*, which waits only for the
//! writers already inside a critical section, never for future ones.
//!
//! The state is an epoch pair: a tagged word holding the current phase
//! (even/odd) together with the number of critical sections entered under
//! it, plus one exit counter per phase. Entering increments the tagged word
//! with a compare-and-swap, so a writer learns the phase it was counted
//! under in the same atomic operation - the flip's swap of that word is
//! therefore a precise cut: every writer counted before it is waited for,
//! every writer counted after it observes all writes the reader published
//! before flipping (the buffer swap, in the interval recorder's case).
//!
//! ```rust
//! use std::time::Duration;
//! use istogrammi::phaser::WriterReaderPhaser;
//!
//! let phaser = WriterReaderPhaser::new();
//!
//! // writer threads, as often as they like:
//! {
//!     let _section = phaser.writer_enter();
//!     // ... update the active structure ...
//! } // leaving the scope exits the critical section
//!
//! // the one reader thread:
//! let guard = phaser.reader_lock();
//! // ... swap active/inactive structures ...
//! guard.flip_phase(Duration::from_nanos(500));
//! // every writer that could touch the retired structure is now gone
//! ```
//!
//! [`writer_enter`]: WriterReaderPhaser::writer_enter

use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::Duration;

use crossbeam_utils::{Backoff, CachePadded};
use parking_lot::{Mutex, MutexGuard};

/// The two alternating writer generations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Even,
    Odd,
}

impl Phase {
    /// The other phase.
    #[inline]
    pub fn toggled(self) -> Phase {
        match self {
            Phase::Even => Phase::Odd,
            Phase::Odd => Phase::Even,
        }
    }
}

/// Tagged state held in the phaser's start-epoch word: the current phase
/// and the number of critical sections entered under it since the last
/// flip. Packed into one `u64` so that entering can observe the phase and
/// increment the count in a single atomic operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct EpochState {
    phase: Phase,
    entries: u64,
}

impl EpochState {
    const PHASE_BIT: u64 = 1 << 63;

    #[inline]
    fn pack(self) -> u64 {
        debug_assert!(self.entries < Self::PHASE_BIT);
        match self.phase {
            Phase::Even => self.entries,
            Phase::Odd => self.entries | Self::PHASE_BIT,
        }
    }

    #[inline]
    fn unpack(word: u64) -> Self {
        EpochState {
            phase: if word & Self::PHASE_BIT == 0 {
                Phase::Even
            } else {
                Phase::Odd
            },
            entries: word & !Self::PHASE_BIT,
        }
    }
}

/// Epoch-based synchronization between lock-free writers and one flipping
/// reader. See the [module documentation](self) for the protocol.
#[derive(Debug)]
pub struct WriterReaderPhaser {
    start_epoch: CachePadded<AtomicU64>,
    even_exits: CachePadded<AtomicU64>,
    odd_exits: CachePadded<AtomicU64>,
    reader_mutex: Mutex<()>,
}

/// RAII token for one writer critical section.
///
/// Returned by [`WriterReaderPhaser::writer_enter`]; dropping it exits the
/// section and lets a concurrent flip of the recorded phase complete.
#[must_use = "dropping the section immediately makes the enter/exit pair empty"]
#[derive(Debug)]
pub struct WriterCriticalSection<'a> {
    phaser: &'a WriterReaderPhaser,
    phase: Phase,
}

impl WriterCriticalSection<'_> {
    /// The phase this section was counted under.
    #[inline]
    pub fn phase(&self) -> Phase {
        self.phase
    }
}

impl Drop for WriterCriticalSection<'_> {
    #[inline]
    fn drop(&mut self) {
        // Release: everything written inside the section becomes visible
        // to the reader that observes this exit while draining.
        self.phaser
            .exit_counter(self.phase)
            .fetch_add(1, Ordering::Release);
    }
}

/// Exclusive reader access, returned by
/// [`WriterReaderPhaser::reader_lock`]. Flipping the phase requires holding
/// this guard, which is what serializes concurrent flip attempts.
pub struct ReaderGuard<'a> {
    phaser: &'a WriterReaderPhaser,
    _lock: MutexGuard<'a, ()>,
}

impl ReaderGuard<'_> {
    /// The phaser this guard locks.
    #[inline]
    pub(crate) fn phaser(&self) -> &WriterReaderPhaser {
        self.phaser
    }

    /// Retires the current phase and waits until every writer that entered
    /// under it has exited.
    ///
    /// `wait_hint` is the sleep granularity used between drain probes once
    /// spinning stops being productive; `Duration::ZERO` yields instead.
    /// It is not a timeout: the flip returns only when the retired phase
    /// has drained, because the reader may only touch the retired buffer
    /// after that point.
    pub fn flip_phase(&self, wait_hint: Duration) {
        let phaser = self.phaser;
        let next_phase =
            EpochState::unpack(phaser.start_epoch.load(Ordering::Relaxed)).phase.toggled();

        // The counter for the phase that is about to start was fully
        // drained when that phase was last retired; rearm it before any
        // writer can be counted against it.
        phaser.exit_counter(next_phase).store(0, Ordering::Relaxed);

        let retired = EpochState::unpack(phaser.start_epoch.swap(
            EpochState {
                phase: next_phase,
                entries: 0,
            }
            .pack(),
            Ordering::AcqRel,
        ));

        let exits = phaser.exit_counter(retired.phase);
        let backoff = Backoff::new();
        while exits.load(Ordering::Acquire) != retired.entries {
            if backoff.is_completed() && !wait_hint.is_zero() {
                thread::sleep(wait_hint);
            } else {
                backoff.snooze();
            }
        }
    }
}

impl WriterReaderPhaser {
    /// Creates a phaser in the even phase with no writers in flight.
    pub const fn new() -> Self {
        WriterReaderPhaser {
            start_epoch: CachePadded::new(AtomicU64::new(0)),
            even_exits: CachePadded::new(AtomicU64::new(0)),
            odd_exits: CachePadded::new(AtomicU64::new(0)),
            reader_mutex: Mutex::new(()),
        }
    }

    /// Enters a writer critical section. Lock-free and allocation-free:
    /// a CAS loop on the tagged epoch word, nothing else.
    #[inline]
    pub fn writer_enter(&self) -> WriterCriticalSection<'_> {
        let mut current = self.start_epoch.load(Ordering::Relaxed);
        loop {
            let state = EpochState::unpack(current);
            let next = EpochState {
                phase: state.phase,
                entries: state.entries + 1,
            };
            // Acquire on success: a writer counted after a flip's swap sees
            // everything the reader published before it, in particular the
            // active-buffer exchange.
            match self.start_epoch.compare_exchange_weak(
                current,
                next.pack(),
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => {
                    return WriterCriticalSection {
                        phaser: self,
                        phase: state.phase,
                    }
                }
                Err(actual) => current = actual,
            }
        }
    }

    /// Acquires the reader lock, serializing flips and any work on a
    /// reader-owned buffer (such as reading a retired histogram before
    /// resetting it).
    pub fn reader_lock(&self) -> ReaderGuard<'_> {
        ReaderGuard {
            phaser: self,
            _lock: self.reader_mutex.lock(),
        }
    }

    /// Locks, flips and unlocks in one call. See [`ReaderGuard::flip_phase`].
    pub fn flip_phase(&self, wait_hint: Duration) {
        self.reader_lock().flip_phase(wait_hint);
    }

    /// The phase new writer sections are currently counted under.
    #[inline]
    pub fn current_phase(&self) -> Phase {
        EpochState::unpack(self.start_epoch.load(Ordering::Relaxed)).phase
    }

    #[inline]
    fn exit_counter(&self, phase: Phase) -> &AtomicU64 {
        match phase {
            Phase::Even => &self.even_exits,
            Phase::Odd => &self.odd_exits,
        }
    }
}

impl Default for WriterReaderPhaser {
    fn default() -> Self {
        Self::new()
    }
}
