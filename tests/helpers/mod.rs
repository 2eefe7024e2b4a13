//! Test helpers and fixtures for ostinato integration tests.
//!
//! Provides instrumented programs: every job records how often it ran and
//! stamps its start and finish against a shared monotone clock, so tests
//! can assert exactly-once execution and dependency order per cycle.

use ostinato::prelude::*;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

/// Standard compiled maximum for deterministic testing.
pub const TEST_MAX_FRAMES: usize = 512;

/// Per-job execution records for one instrumented program.
pub struct Recorder {
    clock: AtomicU64,
    runs: Box<[AtomicU32]>,
    started: Box<[AtomicU64]>,
    finished: Box<[AtomicU64]>,
}

impl Recorder {
    pub fn new(jobs: usize) -> Arc<Self> {
        Arc::new(Self {
            clock: AtomicU64::new(1),
            runs: (0..jobs).map(|_| AtomicU32::new(0)).collect(),
            started: (0..jobs).map(|_| AtomicU64::new(0)).collect(),
            finished: (0..jobs).map(|_| AtomicU64::new(0)).collect(),
        })
    }

    pub fn runs(&self, id: usize) -> u32 {
        self.runs[id].load(Ordering::SeqCst)
    }

    pub fn started(&self, id: usize) -> u64 {
        self.started[id].load(Ordering::SeqCst)
    }

    pub fn finished(&self, id: usize) -> u64 {
        self.finished[id].load(Ordering::SeqCst)
    }

    /// Assert every job ran exactly once since the last reset, then clear
    /// the run counters for the next cycle.
    pub fn assert_each_ran_once(&self) {
        for (id, runs) in self.runs.iter().enumerate() {
            assert_eq!(
                runs.swap(0, Ordering::SeqCst),
                1,
                "job {id} did not run exactly once"
            );
        }
    }

    /// Assert the completion stamp of every producer precedes the start
    /// stamp of its consumer for the most recent cycle.
    pub fn assert_dependency_order(&self, edges: &[(usize, usize)]) {
        for &(producer, consumer) in edges {
            assert!(
                self.finished(producer) < self.started(consumer),
                "job {consumer} started before its producer {producer} finished"
            );
        }
    }
}

/// Build an instrumented process callback for job `id`.
///
/// The callback fills channel 0 with `id as f32` so data flow is
/// observable, and optionally busy-waits to widen race windows.
pub fn instrument(recorder: &Arc<Recorder>, id: usize, delay_us: u64) -> ProcessFn {
    let recorder = recorder.clone();
    Box::new(move |ctx, out, _input| {
        recorder.started[id].store(
            recorder.clock.fetch_add(1, Ordering::SeqCst),
            Ordering::SeqCst,
        );

        if delay_us > 0 {
            let until = std::time::Instant::now() + std::time::Duration::from_micros(delay_us);
            while std::time::Instant::now() < until {
                std::hint::spin_loop();
            }
        }

        debug_assert_eq!(out.channel(0).frames() as u32, ctx.frames);
        out.channel_mut(0).samples_mut().fill(id as f32);

        recorder.runs[id].fetch_add(1, Ordering::SeqCst);
        recorder.finished[id].store(
            recorder.clock.fetch_add(1, Ordering::SeqCst),
            Ordering::SeqCst,
        );
        RenderStatus::Ok
    })
}

/// An instrumented program plus the edge list it was built from.
pub struct TestGraph {
    pub program: RenderProgram,
    pub edges: Vec<(usize, usize)>,
    pub recorder: Arc<Recorder>,
}

/// Linear chain: 0 -> 1 -> ... -> len-1 (terminal).
pub fn chain(len: usize, delay_us: u64) -> TestGraph {
    let edges: Vec<_> = (0..len - 1).map(|i| (i, i + 1)).collect();
    graph_from_edges(len, edges, delay_us)
}

/// Fan-out then fan-in: one generator, `width` independent middles, one
/// terminal that requires them all.
pub fn diamond(width: usize, delay_us: u64) -> TestGraph {
    let terminal = width + 1;
    let mut edges = Vec::new();
    for middle in 1..=width {
        edges.push((0, middle));
        edges.push((middle, terminal));
    }
    graph_from_edges(width + 2, edges, delay_us)
}

/// Two independent generators feeding a single terminal consumer.
pub fn fan_in_pair(delay_us: u64) -> TestGraph {
    graph_from_edges(3, vec![(0, 2), (1, 2)], delay_us)
}

/// Build an instrumented program from an arbitrary edge list over `jobs`
/// nodes. Node ids must be listed with the terminal last.
pub fn graph_from_edges(jobs: usize, edges: Vec<(usize, usize)>, delay_us: u64) -> TestGraph {
    let recorder = Recorder::new(jobs);
    let mut builder = ProgramBuilder::new(TEST_MAX_FRAMES);

    for id in 0..jobs {
        let required = edges.iter().filter(|&&(_, v)| v == id).count() as u32;
        let downstream = edges
            .iter()
            .filter(|&&(u, _)| u == id)
            .map(|&(_, v)| v)
            .collect();
        builder.push(RenderJob {
            process: instrument(&recorder, id, delay_us),
            input_block: None,
            output: BufferHandle::new(TEST_MAX_FRAMES),
            required_inputs: required,
            downstream,
        });
    }

    TestGraph {
        program: builder.build().expect("test graph must be valid"),
        edges,
        recorder,
    }
}

/// Engine with the given helper count and a null sink.
pub fn test_engine(helpers: usize) -> RenderEngine {
    RenderEngine::builder()
        .helpers(helpers)
        .build()
        .expect("failed to build test engine")
}

/// One render call with default flags and timestamp.
pub fn render_once(engine: &mut RenderEngine, frames: u32, dest: &mut BufferList) {
    engine
        .render(RenderFlags::default(), RenderTimestamp::default(), frames, dest)
        .expect("render cycle failed");
}
