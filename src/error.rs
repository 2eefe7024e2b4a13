//! Error types for ostinato.

use thiserror::Error;

/// Error type for host-facing, non-realtime operations.
///
/// Per-job render failures never surface here. They are absorbed by the
/// cycle executor and delivered to the configured [`FaultSink`](crate::FaultSink)
/// so a misbehaving node cannot stall the rest of the graph.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid program: {0}")]
    InvalidProgram(String),

    #[error("No program installed")]
    NoProgram,

    #[error("Frame count {requested} exceeds compiled maximum {max}")]
    FrameCountExceeded { requested: u32, max: u32 },

    #[error("Failed to spawn render worker")]
    WorkerSpawn(#[from] std::io::Error),
}

/// Result type alias.
pub type Result<T> = core::result::Result<T, Error>;
