//! Bounded lock-free MPMC queue of job indices.
//!
//! This is the ready queue at the heart of the scheduler: any worker that
//! finishes a job may push newly-ready jobs, and every worker pops from it,
//! all on real-time threads. The container is a bounded ring with per-slot
//! sequence counters, sized at program compile time to the job count, so no
//! allocation ever happens during a cycle and no push can overflow when the
//! scheduling protocol holds (each id is enqueued at most once per cycle).
//!
//! The queue owns no ids between cycles: it is empty when a cycle ends and
//! reseeded with the generator ids when the next one starts. Its lifecycle
//! is tied to the compiled program, not to any global state.

use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicUsize, Ordering};

/// Cache-line aligned atomic counter, to keep the producer and consumer
/// cursors off each other's line.
#[repr(align(64))]
#[derive(Debug)]
struct Cursor(AtomicUsize);

struct Slot {
    /// Slot state stamp. `seq == pos` means free for the push at `pos`;
    /// `seq == pos + 1` means occupied for the pop at `pos`.
    seq: AtomicUsize,
    value: UnsafeCell<usize>,
}

/// Lock-free multi-producer multi-consumer queue of job indices.
///
/// `push` makes an id visible to future `pop` calls from any worker; `pop`
/// removes and returns an id, or `None` when the queue is momentarily
/// empty. Concurrent pushes and pops never lose or duplicate an id.
pub struct ReadyQueue {
    slots: Box<[Slot]>,
    mask: usize,
    head: Cursor,
    tail: Cursor,
}

// SAFETY: slot values are only written by the push that won the slot via
// compare_exchange on `tail`, and only read by the pop that won it via
// compare_exchange on `head`. The Acquire/Release pairing on `seq`
// publishes each value exactly once in each direction.
unsafe impl Send for ReadyQueue {}
unsafe impl Sync for ReadyQueue {}

impl ReadyQueue {
    /// Create a queue able to hold at least `capacity` ids.
    ///
    /// Capacity is rounded up to a power of two for cheap index masking.
    /// The scheduler sizes this to the compiled job count, which bounds the
    /// number of ids in flight within one cycle.
    pub fn with_capacity(capacity: usize) -> Self {
        let cap = capacity.max(2).next_power_of_two();
        let slots = (0..cap)
            .map(|i| Slot {
                seq: AtomicUsize::new(i),
                value: UnsafeCell::new(0),
            })
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Self {
            slots,
            mask: cap - 1,
            head: Cursor(AtomicUsize::new(0)),
            tail: Cursor(AtomicUsize::new(0)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Enqueue a job id. Returns false if the queue is full, which the
    /// scheduling protocol makes impossible; callers treat it as a fatal
    /// invariant violation rather than a recoverable condition.
    pub fn push(&self, id: usize) -> bool {
        let mut pos = self.tail.0.load(Ordering::Relaxed);
        loop {
            let slot = &self.slots[pos & self.mask];
            let seq = slot.seq.load(Ordering::Acquire);

            if seq == pos {
                // Slot is free for this position; claim it.
                match self.tail.0.compare_exchange_weak(
                    pos,
                    pos.wrapping_add(1),
                    Ordering::Relaxed,
                    Ordering::Relaxed,
                ) {
                    Ok(_) => {
                        // Sole writer of this slot until the Release below.
                        unsafe { *slot.value.get() = id };
                        slot.seq.store(pos.wrapping_add(1), Ordering::Release);
                        return true;
                    }
                    Err(current) => pos = current,
                }
            } else if (seq.wrapping_sub(pos) as isize) < 0 {
                // Slot still holds an element a full lap behind: full.
                return false;
            } else {
                // Another producer claimed this position; move on.
                pos = self.tail.0.load(Ordering::Relaxed);
            }
        }
    }

    /// Dequeue a job id, or `None` if the queue is currently empty.
    ///
    /// An empty result does not mean the cycle is over: another worker may
    /// be mid-propagation and about to push. The executor decides
    /// termination from the remaining-count, never from emptiness.
    pub fn pop(&self) -> Option<usize> {
        let mut pos = self.head.0.load(Ordering::Relaxed);
        loop {
            let slot = &self.slots[pos & self.mask];
            let seq = slot.seq.load(Ordering::Acquire);
            let expected = pos.wrapping_add(1);

            if seq == expected {
                // Slot holds an element for this position; claim it.
                match self.head.0.compare_exchange_weak(
                    pos,
                    pos.wrapping_add(1),
                    Ordering::Relaxed,
                    Ordering::Relaxed,
                ) {
                    Ok(_) => {
                        let id = unsafe { *slot.value.get() };
                        // Free the slot for the producer one lap ahead.
                        slot.seq
                            .store(pos.wrapping_add(self.mask + 1), Ordering::Release);
                        return Some(id);
                    }
                    Err(current) => pos = current,
                }
            } else if (seq.wrapping_sub(expected) as isize) < 0 {
                return None;
            } else {
                pos = self.head.0.load(Ordering::Relaxed);
            }
        }
    }

    /// True when no ids are enqueued. Only meaningful once no worker is
    /// pushing, e.g. after a cycle has terminated.
    pub fn is_empty(&self) -> bool {
        let head = self.head.0.load(Ordering::Acquire);
        let tail = self.tail.0.load(Ordering::Acquire);
        head == tail
    }
}

impl core::fmt::Debug for ReadyQueue {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ReadyQueue")
            .field("capacity", &self.capacity())
            .finish()
    }
}
