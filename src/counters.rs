//! Per-cycle dependency counters.
//!
//! One finished-producer counter per job plus a single remaining-jobs
//! counter. Reset at the start of every cycle, reused without reallocation
//! for the lifetime of the compiled program.

use core::sync::atomic::{AtomicU32, Ordering};

/// Cache-line aligned atomic u32. Jobs complete on different workers, so
/// neighboring counters must not share a line.
#[repr(align(64))]
#[derive(Debug)]
struct PaddedCounter(AtomicU32);

impl PaddedCounter {
    fn new(value: u32) -> Self {
        Self(AtomicU32::new(value))
    }
}

/// Atomic dependency bookkeeping for one render cycle.
#[derive(Debug)]
pub struct DependencyCounters {
    finished: Box<[PaddedCounter]>,
    remaining: PaddedCounter,
}

impl DependencyCounters {
    /// Create counters for a program with `capacity` jobs.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            finished: (0..capacity).map(|_| PaddedCounter::new(0)).collect(),
            remaining: PaddedCounter::new(0),
        }
    }

    pub fn capacity(&self) -> usize {
        self.finished.len()
    }

    /// Zero every finished counter and set the remaining count.
    ///
    /// Must complete before any worker observes the seeded ready queue.
    /// The engine publishes the cycle with a Release store after calling
    /// this, which makes the plain stores here visible to workers.
    pub fn reset(&self, total_jobs: u32) {
        for counter in self.finished.iter() {
            counter.0.store(0, Ordering::Relaxed);
        }
        self.remaining.0.store(total_jobs, Ordering::Release);
    }

    /// Record that one upstream producer of `consumer` has completed.
    ///
    /// Returns the post-increment value. The caller compares it against the
    /// consumer's required input count; exactly one producer observes the
    /// final transition, which is what makes the single enqueue race-free
    /// under concurrent fan-in. The AcqRel ordering also publishes the
    /// producer's buffer writes to whichever worker later runs the
    /// consumer.
    #[inline]
    pub fn producer_done(&self, consumer: usize) -> u32 {
        self.finished[consumer].0.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Record that one job has completed, whatever its status.
    #[inline]
    pub fn job_done(&self) {
        let previous = self.remaining.0.fetch_sub(1, Ordering::AcqRel);
        debug_assert!(previous > 0, "remaining count went negative");
    }

    /// Jobs not yet completed in the current cycle. Zero is the cycle's
    /// termination condition.
    #[inline]
    pub fn remaining(&self) -> u32 {
        self.remaining.0.load(Ordering::Acquire)
    }

    /// Finished-producer count for one job. Diagnostic use only.
    pub fn finished(&self, job: usize) -> u32 {
        self.finished[job].0.load(Ordering::Acquire)
    }
}
