//! Structured fault reporting from the render thread.
//!
//! The executor never logs or prints on the realtime path. Non-success
//! statuses become [`RenderFault`] records handed to a [`FaultSink`], and
//! the host decides what to do with them off the realtime thread.

use crate::job::RenderStatus;
use core::sync::atomic::{AtomicU64, Ordering};
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};

/// A non-success status reported by one job during a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderFault {
    pub job: usize,
    pub status: RenderStatus,
}

/// Receives fault reports from the render thread.
///
/// # RT Safety
/// `report` is called from realtime workers and must not block, lock, or
/// allocate.
pub trait FaultSink: Send + Sync {
    fn report(&self, fault: RenderFault);
}

/// Discards all faults.
#[derive(Debug, Default)]
pub struct NullSink;

impl FaultSink for NullSink {
    fn report(&self, _fault: RenderFault) {}
}

/// Counts faults per category without retaining them.
#[derive(Debug, Default)]
pub struct CountingSink {
    no_connection: AtomicU64,
    too_many_frames: AtomicU64,
    not_running: AtomicU64,
    param_error: AtomicU64,
    unknown: AtomicU64,
}

impl CountingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total(&self) -> u64 {
        self.no_connection.load(Ordering::Relaxed)
            + self.too_many_frames.load(Ordering::Relaxed)
            + self.not_running.load(Ordering::Relaxed)
            + self.param_error.load(Ordering::Relaxed)
            + self.unknown.load(Ordering::Relaxed)
    }

    pub fn count(&self, status: RenderStatus) -> u64 {
        self.slot(status).load(Ordering::Relaxed)
    }

    fn slot(&self, status: RenderStatus) -> &AtomicU64 {
        match status {
            RenderStatus::NoConnection => &self.no_connection,
            RenderStatus::TooManyFrames => &self.too_many_frames,
            RenderStatus::NotRunning => &self.not_running,
            RenderStatus::ParamError => &self.param_error,
            RenderStatus::Ok | RenderStatus::Unknown(_) => &self.unknown,
        }
    }
}

impl FaultSink for CountingSink {
    fn report(&self, fault: RenderFault) {
        self.slot(fault.status).fetch_add(1, Ordering::Relaxed);
    }
}

/// Forwards faults over a bounded channel for a host thread to drain.
///
/// Uses `try_send`: when the channel is full the fault is dropped and
/// counted, never blocked on.
#[derive(Debug)]
pub struct ChannelSink {
    tx: Sender<RenderFault>,
    dropped: AtomicU64,
}

impl ChannelSink {
    /// Create a sink and the receiver the host drains.
    pub fn bounded(capacity: usize) -> (Self, Receiver<RenderFault>) {
        let (tx, rx) = bounded(capacity);
        (
            Self {
                tx,
                dropped: AtomicU64::new(0),
            },
            rx,
        )
    }

    /// Faults dropped because the channel was full.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl FaultSink for ChannelSink {
    fn report(&self, fault: RenderFault) {
        match self.tx.try_send(fault) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}

/// Drain pending faults to tracing. Call from a non-realtime thread.
pub fn log_pending(rx: &Receiver<RenderFault>) -> usize {
    let mut drained = 0;
    while let Ok(fault) = rx.try_recv() {
        tracing::warn!(job = fault.job, status = ?fault.status, "render fault");
        drained += 1;
    }
    drained
}
