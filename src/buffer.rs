//! Fixed-capacity audio buffers owned by the job table.
//!
//! Storage is allocated once when the graph is compiled and never moves or
//! grows afterwards. Each job writes its own buffer exactly once per cycle;
//! downstream jobs read it through the input block after the dependency
//! counters establish the writer-to-reader happens-before edge.

use core::cell::UnsafeCell;
use std::sync::Arc;

/// Channels per buffer. The engine renders deinterleaved stereo.
pub const CHANNEL_COUNT: usize = 2;

/// Bytes per sample (32-bit float).
pub const SAMPLE_BYTES: usize = core::mem::size_of::<f32>();

/// One channel of deinterleaved float samples.
///
/// `byte_len` mirrors the byte size field of a host buffer description.
/// Processing callbacks are allowed to shrink or clobber it; the executor
/// resets it to `frames * SAMPLE_BYTES` before every invocation.
#[derive(Debug)]
pub struct Channel {
    samples: Box<[f32]>,
    byte_len: usize,
}

impl Channel {
    fn new(max_frames: usize) -> Self {
        Self {
            samples: vec![0.0; max_frames].into_boxed_slice(),
            byte_len: max_frames * SAMPLE_BYTES,
        }
    }

    /// Current byte size, as last set by the executor or a callback.
    #[inline]
    pub fn byte_len(&self) -> usize {
        self.byte_len
    }

    /// Set the byte size. Callbacks may call this; the value is transient
    /// and reset at the next invocation.
    #[inline]
    pub fn set_byte_len(&mut self, bytes: usize) {
        debug_assert!(bytes <= self.samples.len() * SAMPLE_BYTES);
        self.byte_len = bytes;
    }

    /// Frames currently described by `byte_len`.
    #[inline]
    pub fn frames(&self) -> usize {
        self.byte_len / SAMPLE_BYTES
    }

    /// Samples within the current byte size.
    #[inline]
    pub fn samples(&self) -> &[f32] {
        &self.samples[..self.frames()]
    }

    /// Mutable samples within the current byte size.
    #[inline]
    pub fn samples_mut(&mut self) -> &mut [f32] {
        let frames = self.frames();
        &mut self.samples[..frames]
    }

    /// Base address of the channel storage. The storage must never move
    /// while a compiled program is alive; the executor checks this around
    /// every processing callback.
    #[inline]
    pub fn as_ptr(&self) -> *const f32 {
        self.samples.as_ptr()
    }
}

/// Two-channel deinterleaved buffer, sized to the compiled maximum frame
/// count. Used both for job outputs and for the host destination.
#[derive(Debug)]
pub struct BufferList {
    channels: [Channel; CHANNEL_COUNT],
    max_frames: usize,
}

impl BufferList {
    pub fn new(max_frames: usize) -> Self {
        Self {
            channels: [Channel::new(max_frames), Channel::new(max_frames)],
            max_frames,
        }
    }

    #[inline]
    pub fn max_frames(&self) -> usize {
        self.max_frames
    }

    #[inline]
    pub fn channel(&self, index: usize) -> &Channel {
        &self.channels[index]
    }

    #[inline]
    pub fn channel_mut(&mut self, index: usize) -> &mut Channel {
        &mut self.channels[index]
    }

    /// Reset both channel byte sizes to `frames * SAMPLE_BYTES`.
    ///
    /// Callbacks may have altered the sizes in a previous cycle, so the
    /// executor calls this before every invocation to make the buffer
    /// reflect the requested frame count rather than a stale one.
    #[inline]
    pub fn reset_byte_len(&mut self, frames: u32) {
        for channel in &mut self.channels {
            channel.set_byte_len(frames as usize * SAMPLE_BYTES);
        }
    }

    /// Zero the full storage of both channels.
    pub fn clear(&mut self) {
        for channel in &mut self.channels {
            channel.samples.fill(0.0);
        }
    }
}

struct BufferCell {
    max_frames: usize,
    list: UnsafeCell<BufferList>,
}

// SAFETY: access to the inner BufferList is governed by the scheduling
// protocol. Exactly one job writes a buffer per cycle, and readers run only
// after the writer's completion has been published through the dependency
// counters. See `BufferHandle::list_mut`.
unsafe impl Send for BufferCell {}
unsafe impl Sync for BufferCell {}

/// Shared handle to one job's output storage.
///
/// The job table owns one handle per job; the graph compiler clones handles
/// into the input blocks of downstream consumers. Cloning shares the same
/// storage.
#[derive(Clone)]
pub struct BufferHandle {
    cell: Arc<BufferCell>,
}

impl BufferHandle {
    pub fn new(max_frames: usize) -> Self {
        Self {
            cell: Arc::new(BufferCell {
                max_frames,
                list: UnsafeCell::new(BufferList::new(max_frames)),
            }),
        }
    }

    #[inline]
    pub fn max_frames(&self) -> usize {
        self.cell.max_frames
    }

    /// Shared access to the buffer.
    ///
    /// # Safety
    /// The caller must hold the scheduling guarantee that the owning job is
    /// not currently executing: either its completion was observed through
    /// the dependency counters in this cycle, or no cycle is in flight.
    #[inline]
    pub unsafe fn list(&self) -> &BufferList {
        &*self.cell.list.get()
    }

    /// Exclusive access to the buffer.
    ///
    /// # Safety
    /// The caller must be the one execution of the owning job in the
    /// current cycle, or must know that no cycle is in flight. The
    /// exactly-once property of the scheduler makes the first case unique.
    #[inline]
    #[allow(clippy::mut_from_ref)]
    pub unsafe fn list_mut(&self) -> &mut BufferList {
        &mut *self.cell.list.get()
    }
}

impl core::fmt::Debug for BufferHandle {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BufferHandle")
            .field("max_frames", &self.cell.max_frames)
            .finish()
    }
}
