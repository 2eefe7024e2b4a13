//! Lock-free per-cycle render scheduler for compiled audio graphs.
//!
//! Once per audio callback, the engine executes every job of a compiled
//! DAG exactly once, in dependency order, without blocking, locking, or
//! allocating on the render thread. Independent subgraphs may be processed
//! concurrently by helper workers.
//!
//! # Primary API
//!
//! - [`RenderEngine`] / [`RenderEngineBuilder`]: cycle lifecycle and helper workers
//! - [`ProgramBuilder`] / [`RenderProgram`]: the compiled job descriptor table
//! - [`RenderJob`] / [`RenderContext`] / [`RenderStatus`]: the node contract
//! - [`FaultSink`] and friends: structured fault reporting off the render thread
//!
//! # Example
//!
//! ```ignore
//! use ostinato::prelude::*;
//!
//! let mut builder = ProgramBuilder::new(512);
//! let out = BufferHandle::new(512);
//! builder.push(RenderJob::generator(
//!     Box::new(|ctx, dest, _| {
//!         dest.channel_mut(0).samples_mut().fill(0.0);
//!         dest.channel_mut(1).samples_mut().fill(0.0);
//!         RenderStatus::Ok
//!     }),
//!     out,
//!     vec![],
//! ));
//!
//! let mut engine = RenderEngine::builder().helpers(1).build()?;
//! engine.install(builder.build()?);
//!
//! // From the audio callback:
//! let mut dest = BufferList::new(512);
//! engine.render(RenderFlags::default(), RenderTimestamp::default(), 256, &mut dest)?;
//! ```
//!
//! Graph compilation, node DSP, and device I/O live outside this crate;
//! the scheduler consumes the compiled descriptor table read-only.

pub mod error;
pub use error::{Error, Result};

mod buffer;
pub use buffer::{BufferHandle, BufferList, Channel, CHANNEL_COUNT, SAMPLE_BYTES};

mod job;
pub use job::{
    InputBlock, ProcessFn, RenderContext, RenderFlags, RenderJob, RenderStatus, RenderTimestamp,
};

mod program;
pub use program::{ProgramBuilder, RenderProgram};

pub(crate) mod counters;
pub use counters::DependencyCounters;

pub(crate) mod queue;
pub use queue::ReadyQueue;

mod executor;

mod engine;
pub use engine::{RenderEngine, RenderEngineBuilder};

mod report;
pub use report::{log_pending, ChannelSink, CountingSink, FaultSink, NullSink, RenderFault};

/// Convenience re-exports.
pub mod prelude {
    pub use crate::buffer::{BufferHandle, BufferList, CHANNEL_COUNT, SAMPLE_BYTES};
    pub use crate::engine::{RenderEngine, RenderEngineBuilder};
    pub use crate::error::{Error, Result};
    pub use crate::job::{
        InputBlock, ProcessFn, RenderContext, RenderFlags, RenderJob, RenderStatus,
        RenderTimestamp,
    };
    pub use crate::program::{ProgramBuilder, RenderProgram};
    pub use crate::report::{ChannelSink, CountingSink, FaultSink, NullSink, RenderFault};
}
