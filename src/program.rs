//! Compiled render programs.
//!
//! A [`RenderProgram`] is the immutable job descriptor table the external
//! graph compiler hands to the engine: one entry per node in a finite DAG,
//! plus the list of generator ids used to seed each cycle. The scheduler
//! reads it, never mutates it; the only interior mutability is the callback
//! state each job carries, which the exactly-once execution protocol keeps
//! exclusive.

use crate::buffer::BufferHandle;
use crate::error::{Error, Result};
use crate::job::{InputBlock, ProcessFn, RenderJob};
use core::cell::UnsafeCell;

/// Mutable part of a job: its callback state. Accessed only by the single
/// execution of the job within a cycle.
pub(crate) struct JobBody {
    pub(crate) process: ProcessFn,
    pub(crate) input_block: Option<InputBlock>,
}

struct JobEntry {
    body: UnsafeCell<JobBody>,
    output: BufferHandle,
    required_inputs: u32,
    downstream: Box<[usize]>,
}

/// Immutable, compiled job table plus generator list.
///
/// The last job in the table is the terminal job; its output goes to the
/// host destination buffer instead of its own storage.
pub struct RenderProgram {
    jobs: Box<[JobEntry]>,
    generators: Box<[usize]>,
    max_frames: usize,
}

// SAFETY: the UnsafeCell in each entry is only dereferenced by the worker
// executing that job, and the scheduler runs every job exactly once per
// cycle. All other fields are read-only after construction.
unsafe impl Send for RenderProgram {}
unsafe impl Sync for RenderProgram {}

impl RenderProgram {
    /// Number of jobs in the program.
    #[inline]
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Index of the terminal job.
    #[inline]
    pub fn terminal(&self) -> usize {
        self.jobs.len() - 1
    }

    /// Ids of jobs with no upstream dependencies, used to seed each cycle.
    #[inline]
    pub fn generators(&self) -> &[usize] {
        &self.generators
    }

    /// Maximum frame count the program was compiled for.
    #[inline]
    pub fn max_frames(&self) -> usize {
        self.max_frames
    }

    #[inline]
    pub fn required_inputs(&self, job: usize) -> u32 {
        self.jobs[job].required_inputs
    }

    #[inline]
    pub fn downstream(&self, job: usize) -> &[usize] {
        &self.jobs[job].downstream
    }

    /// The job's output storage handle.
    pub fn output(&self, job: usize) -> &BufferHandle {
        &self.jobs[job].output
    }

    /// Exclusive access to a job's callback state.
    ///
    /// # Safety
    /// Caller must be the one execution of `job` in the current cycle.
    #[inline]
    #[allow(clippy::mut_from_ref)]
    pub(crate) unsafe fn body_mut(&self, job: usize) -> &mut JobBody {
        &mut *self.jobs[job].body.get()
    }
}

impl core::fmt::Debug for RenderProgram {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RenderProgram")
            .field("jobs", &self.jobs.len())
            .field("generators", &self.generators)
            .field("max_frames", &self.max_frames)
            .finish()
    }
}

/// Assembles and validates a [`RenderProgram`].
///
/// This is the contract surface for the external graph compiler. The
/// builder runs on a non-realtime thread and may allocate freely; it
/// checks the descriptor invariants the scheduler later relies on. It does
/// not re-run cycle detection, which is the compiler's responsibility at
/// graph-build time.
pub struct ProgramBuilder {
    jobs: Vec<RenderJob>,
    max_frames: usize,
}

impl ProgramBuilder {
    /// Start a program compiled for at most `max_frames` frames per cycle.
    pub fn new(max_frames: usize) -> Self {
        Self {
            jobs: Vec::new(),
            max_frames,
        }
    }

    /// Append a job descriptor. Returns the job's id. Jobs must be pushed
    /// with the terminal job last.
    pub fn push(&mut self, job: RenderJob) -> usize {
        self.jobs.push(job);
        self.jobs.len() - 1
    }

    /// Validate the descriptor invariants and produce the program.
    ///
    /// Checks that every downstream id is in range, that each job's
    /// required input count equals the number of edges pointing at it, that
    /// every job buffer matches the compiled maximum frame count, and that
    /// at least one generator exists to seed the first pop.
    pub fn build(self) -> Result<RenderProgram> {
        if self.jobs.is_empty() {
            return Err(Error::InvalidProgram("program has no jobs".into()));
        }

        let job_count = self.jobs.len();
        let mut produced = vec![0u32; job_count];

        for (id, job) in self.jobs.iter().enumerate() {
            for &consumer in &job.downstream {
                if consumer >= job_count {
                    return Err(Error::InvalidProgram(format!(
                        "job {id} lists downstream {consumer}, but program has {job_count} jobs"
                    )));
                }
                produced[consumer] += 1;
            }
            if job.output.max_frames() != self.max_frames {
                return Err(Error::InvalidProgram(format!(
                    "job {id} buffer holds {} frames, program compiled for {}",
                    job.output.max_frames(),
                    self.max_frames
                )));
            }
        }

        for (id, job) in self.jobs.iter().enumerate() {
            if produced[id] != job.required_inputs {
                return Err(Error::InvalidProgram(format!(
                    "job {id} requires {} inputs but {} edges point at it",
                    job.required_inputs, produced[id]
                )));
            }
        }

        let generators: Box<[usize]> = self
            .jobs
            .iter()
            .enumerate()
            .filter(|(_, job)| job.required_inputs == 0)
            .map(|(id, _)| id)
            .collect();

        if generators.is_empty() {
            return Err(Error::InvalidProgram(
                "program has no generator jobs to seed a cycle".into(),
            ));
        }

        let jobs = self
            .jobs
            .into_iter()
            .map(|job| JobEntry {
                body: UnsafeCell::new(JobBody {
                    process: job.process,
                    input_block: job.input_block,
                }),
                output: job.output,
                required_inputs: job.required_inputs,
                downstream: job.downstream.into_boxed_slice(),
            })
            .collect();

        Ok(RenderProgram {
            jobs,
            generators,
            max_frames: self.max_frames,
        })
    }
}
