//! Job descriptors and the per-cycle render context.

use crate::buffer::{BufferHandle, BufferList};

/// Render action flags, passed through from the host callback to every
/// processing callback. Opaque to the scheduler.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderFlags(pub u32);

/// Time reference for one render cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RenderTimestamp {
    /// Position of the first frame of the cycle, in samples.
    pub sample_time: f64,
    /// Host clock reference, if the host provides one.
    pub host_time: u64,
}

/// Per-cycle parameters handed to every processing callback.
#[derive(Debug, Clone, Copy)]
pub struct RenderContext {
    pub flags: RenderFlags,
    pub timestamp: RenderTimestamp,
    /// Requested frame count, bounded by the compiled maximum.
    pub frames: u32,
}

/// Status returned by a processing callback.
///
/// Anything other than `Ok` is non-fatal: the executor reports it and
/// treats the job as completed so downstream jobs still run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStatus {
    Ok,
    /// The node has no upstream connection to pull from.
    NoConnection,
    /// The node was asked for more frames than it can produce.
    TooManyFrames,
    /// The node's engine is not in a running state.
    NotRunning,
    /// A parameter was out of range or missing.
    ParamError,
    /// Unrecognized status code from a foreign node implementation.
    Unknown(i32),
}

impl RenderStatus {
    #[inline]
    pub fn is_ok(&self) -> bool {
        matches!(self, RenderStatus::Ok)
    }
}

/// Capability a processing callback uses to pull upstream audio.
///
/// Supplied by the graph compiler, passed through by the scheduler
/// untouched. Typical implementations capture [`BufferHandle`] clones of
/// the upstream jobs' outputs.
pub type InputBlock = Box<dyn FnMut(&RenderContext, &mut BufferList) -> RenderStatus + Send>;

/// A node's processing callback. Invoking it performs the node's signal
/// processing for the cycle's frame count, writing into the supplied
/// buffer. Must not block, allocate, or move the buffer storage.
pub type ProcessFn =
    Box<dyn FnMut(&RenderContext, &mut BufferList, Option<&mut InputBlock>) -> RenderStatus + Send>;

/// Compiled descriptor for one graph node's unit of work.
///
/// Produced by the external graph compiler, consumed read-only by the
/// scheduler for the lifetime of the compiled program.
pub struct RenderJob {
    /// The node's signal processing callback.
    pub process: ProcessFn,
    /// Upstream pull capability, if the node takes input.
    pub input_block: Option<InputBlock>,
    /// Output storage, written once per cycle by exactly this job.
    pub output: BufferHandle,
    /// Number of distinct upstream jobs that must complete before this job
    /// may run. Zero marks a generator.
    pub required_inputs: u32,
    /// Job ids that consume this job's output.
    pub downstream: Vec<usize>,
}

impl RenderJob {
    /// Descriptor for a generator node (no upstream dependencies).
    pub fn generator(process: ProcessFn, output: BufferHandle, downstream: Vec<usize>) -> Self {
        Self {
            process,
            input_block: None,
            output,
            required_inputs: 0,
            downstream,
        }
    }
}

impl core::fmt::Debug for RenderJob {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RenderJob")
            .field("required_inputs", &self.required_inputs)
            .field("downstream", &self.downstream)
            .field("has_input_block", &self.input_block.is_some())
            .finish()
    }
}
