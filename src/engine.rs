//! The render engine: cycle lifecycle, helper workers, program install.
//!
//! The host calls [`RenderEngine::render`] once per audio callback. The
//! call resets the dependency counters, seeds the ready queue with the
//! program's generators, publishes the cycle to any helper workers, runs
//! an executor loop on the calling thread, and returns once every job has
//! executed exactly once and every helper has left the cycle.
//!
//! # Cycle handshake
//!
//! Helpers coordinate with the host through a single epoch counter: odd
//! while a cycle is open, even while idle, written only by the host. A
//! helper joins a cycle by loading the published [`CycleParams`], checking
//! the epoch embedded in them, registering itself in the active count, and
//! revalidating the epoch. The host closes the epoch after its own loop
//! terminates and then waits for the active count to drain, so the next
//! cycle's reset can never race a straggling helper's propagation.

use crate::buffer::BufferList;
use crate::counters::DependencyCounters;
use crate::error::{Error, Result};
use crate::executor::{idle_backoff, run_cycle, CycleView};
use crate::job::{RenderContext, RenderFlags, RenderTimestamp};
use crate::program::RenderProgram;
use crate::queue::ReadyQueue;
use crate::report::{FaultSink, NullSink};
use arc_swap::ArcSwapOption;
use core::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

/// A compiled program bundled with its scheduler state. The ready queue
/// and dependency counters are sized to the program's job count and live
/// exactly as long as the program is installed.
struct ProgramState {
    program: RenderProgram,
    queue: ReadyQueue,
    counters: DependencyCounters,
}

/// Parameters of the cycle currently in flight, published to helpers.
struct CycleParams {
    epoch: u64,
    state: Arc<ProgramState>,
    ctx: RenderContext,
    dest: *mut BufferList,
}

// SAFETY: `dest` is only dereferenced while executing the terminal job,
// which can only be popped while the host thread is still inside `render`,
// keeping the pointee alive and reserved for this cycle. Everything else
// in the struct is Send + Sync on its own.
unsafe impl Send for CycleParams {}
unsafe impl Sync for CycleParams {}

struct EngineShared {
    /// Odd while a cycle is open, even while idle. Host is the only writer.
    epoch: AtomicU64,
    /// Helpers currently inside a cycle.
    active: AtomicUsize,
    cycle: ArcSwapOption<CycleParams>,
    shutdown: AtomicBool,
}

/// Executes an installed [`RenderProgram`] once per render cycle.
pub struct RenderEngine {
    installed: ArcSwapOption<ProgramState>,
    shared: Arc<EngineShared>,
    sink: Arc<dyn FaultSink>,
    helpers: Vec<JoinHandle<()>>,
}

impl RenderEngine {
    /// Create a new engine builder.
    pub fn builder() -> RenderEngineBuilder {
        RenderEngineBuilder::default()
    }

    /// Number of helper workers, not counting the host thread.
    pub fn helper_count(&self) -> usize {
        self.helpers.len()
    }

    /// True once a program has been installed.
    pub fn has_program(&self) -> bool {
        self.installed.load().is_some()
    }

    /// Install a compiled program, replacing any previous one.
    ///
    /// Non-realtime. Safe to call while audio is running: a cycle in
    /// flight keeps using the program it started with, and the next cycle
    /// picks up the new one.
    pub fn install(&self, program: RenderProgram) {
        tracing::debug!(
            jobs = program.len(),
            generators = program.generators().len(),
            max_frames = program.max_frames(),
            "installing render program"
        );
        let capacity = program.len();
        self.installed.store(Some(Arc::new(ProgramState {
            queue: ReadyQueue::with_capacity(capacity),
            counters: DependencyCounters::with_capacity(capacity),
            program,
        })));
    }

    /// Run one render cycle, filling `dest` with the terminal job's output.
    ///
    /// This is the single realtime entry point. It performs no allocation
    /// and takes no locks; per-job failures go to the fault sink and do
    /// not fail the cycle.
    pub fn render(
        &mut self,
        flags: RenderFlags,
        timestamp: RenderTimestamp,
        frames: u32,
        dest: &mut BufferList,
    ) -> Result<()> {
        let state = self.installed.load_full().ok_or(Error::NoProgram)?;

        let max_frames = state.program.max_frames().min(dest.max_frames());
        if frames as usize > max_frames {
            return Err(Error::FrameCountExceeded {
                requested: frames,
                max: max_frames as u32,
            });
        }

        let ctx = RenderContext {
            flags,
            timestamp,
            frames,
        };

        // Counters must be reset before the queue is observable, and the
        // queue seeded before the epoch opens.
        state.counters.reset(state.program.len() as u32);
        for &generator in state.program.generators() {
            let pushed = state.queue.push(generator);
            debug_assert!(pushed, "ready queue overflow seeding generators");
        }

        let epoch = if self.helpers.is_empty() {
            0
        } else {
            let epoch = self.shared.epoch.load(Ordering::Relaxed) + 1;
            self.shared.cycle.store(Some(Arc::new(CycleParams {
                epoch,
                state: state.clone(),
                ctx,
                dest: dest as *mut BufferList,
            })));
            self.shared.epoch.store(epoch, Ordering::Release);
            epoch
        };

        run_cycle(&CycleView {
            program: &state.program,
            queue: &state.queue,
            counters: &state.counters,
            ctx: &ctx,
            dest: dest as *mut BufferList,
            sink: self.sink.as_ref(),
        });

        if !self.helpers.is_empty() {
            // Close the cycle, then hold until every helper has left it.
            // A helper still inside can only be observing remaining == 0
            // and exiting; none may be propagating once this wait ends.
            self.shared.epoch.store(epoch + 1, Ordering::Release);
            while self.shared.active.load(Ordering::Acquire) != 0 {
                core::hint::spin_loop();
            }
        }

        debug_assert!(state.queue.is_empty(), "ready queue not drained");
        Ok(())
    }
}

impl Drop for RenderEngine {
    fn drop(&mut self) {
        self.shared.shutdown.store(true, Ordering::Release);
        for handle in self.helpers.drain(..) {
            let _ = handle.join();
        }
    }
}

fn helper_loop(shared: Arc<EngineShared>, sink: Arc<dyn FaultSink>) {
    let mut last_done = 0u64;
    let mut spins = 0u32;

    loop {
        if shared.shutdown.load(Ordering::Acquire) {
            return;
        }

        let epoch = shared.epoch.load(Ordering::Acquire);
        if epoch % 2 == 0 || epoch == last_done {
            idle_backoff(&mut spins);
            continue;
        }
        spins = 0;

        let Some(params) = shared.cycle.load_full() else {
            continue;
        };
        if params.epoch != epoch {
            continue;
        }

        shared.active.fetch_add(1, Ordering::AcqRel);
        // Revalidate under the active guard: once the host closes this
        // epoch it may reset the cycle state, so a late arrival must not
        // touch it.
        if shared.epoch.load(Ordering::Acquire) == epoch {
            run_cycle(&CycleView {
                program: &params.state.program,
                queue: &params.state.queue,
                counters: &params.state.counters,
                ctx: &params.ctx,
                dest: params.dest,
                sink: sink.as_ref(),
            });
        }
        shared.active.fetch_sub(1, Ordering::Release);
        last_done = epoch;
    }
}

/// Builder for [`RenderEngine`].
#[derive(Default)]
pub struct RenderEngineBuilder {
    helpers: usize,
    sink: Option<Arc<dyn FaultSink>>,
}

impl RenderEngineBuilder {
    /// Number of helper worker threads (default 0: the host render thread
    /// executes the whole cycle alone).
    pub fn helpers(mut self, count: usize) -> Self {
        self.helpers = count;
        self
    }

    /// Where per-job render faults go (default: discarded).
    pub fn fault_sink(mut self, sink: Arc<dyn FaultSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Build the engine and spawn its helper workers.
    pub fn build(self) -> Result<RenderEngine> {
        let shared = Arc::new(EngineShared {
            epoch: AtomicU64::new(0),
            active: AtomicUsize::new(0),
            cycle: ArcSwapOption::from(None),
            shutdown: AtomicBool::new(false),
        });
        let sink = self.sink.unwrap_or_else(|| Arc::new(NullSink));

        let mut helpers = Vec::with_capacity(self.helpers);
        for id in 0..self.helpers {
            let shared = shared.clone();
            let sink = sink.clone();
            let handle = std::thread::Builder::new()
                .name(format!("render-worker-{id}"))
                .spawn(move || helper_loop(shared, sink))?;
            helpers.push(handle);
        }

        tracing::debug!(helpers = helpers.len(), "render engine started");

        Ok(RenderEngine {
            installed: ArcSwapOption::from(None),
            shared,
            sink,
            helpers,
        })
    }
}
