//! The per-worker cycle executor.
//!
//! Every worker participating in a render cycle runs the same loop: pop a
//! ready job, execute its callback, propagate completion into the
//! dependency counters, and enqueue whichever downstream jobs became
//! ready. The loop ends when the remaining-count reaches zero, which
//! happens exactly when every job has executed once.

use crate::buffer::BufferList;
use crate::counters::DependencyCounters;
use crate::job::RenderContext;
use crate::program::RenderProgram;
use crate::queue::ReadyQueue;
use crate::report::{FaultSink, RenderFault};

/// Everything one worker needs to participate in a cycle.
///
/// The destination pointer targets the host buffer for the current render
/// call. It is only dereferenced while executing the terminal job, which
/// can only be popped while the host is still inside that call.
pub(crate) struct CycleView<'a> {
    pub program: &'a RenderProgram,
    pub queue: &'a ReadyQueue,
    pub counters: &'a DependencyCounters,
    pub ctx: &'a RenderContext,
    pub dest: *mut BufferList,
    pub sink: &'a dyn FaultSink,
}

/// Spins this many times before yielding the time slice when the queue is
/// momentarily empty mid-cycle.
const SPIN_LIMIT: u32 = 64;

/// Real-time-safe wait for more work. A worker must not block while the
/// remaining-count is nonzero: another worker may be mid-propagation and
/// about to push.
#[inline]
pub(crate) fn idle_backoff(spins: &mut u32) {
    if *spins < SPIN_LIMIT {
        *spins += 1;
        core::hint::spin_loop();
    } else {
        std::thread::yield_now();
    }
}

/// Run one worker's share of the current cycle to completion.
pub(crate) fn run_cycle(view: &CycleView<'_>) {
    let terminal = view.program.terminal();
    let mut spins = 0u32;

    while view.counters.remaining() > 0 {
        let Some(index) = view.queue.pop() else {
            idle_backoff(&mut spins);
            continue;
        };
        spins = 0;

        execute(view, index, terminal);

        // Propagate completion. Exactly one producer observes each
        // downstream job's final transition and performs the single push.
        for &consumer in view.program.downstream(index) {
            if view.counters.producer_done(consumer) == view.program.required_inputs(consumer) {
                let pushed = view.queue.push(consumer);
                debug_assert!(pushed, "ready queue overflow on job {consumer}");
            }
        }

        view.counters.job_done();
    }
}

fn execute(view: &CycleView<'_>, index: usize, terminal: usize) {
    // The terminal job renders straight into the host destination; every
    // other job renders into its own buffer.
    //
    // SAFETY: the scheduler pops each id exactly once per cycle, so this is
    // the only live mutable access to the job's body and buffer. The
    // destination pointer is valid because the host render call cannot
    // return while any job, the terminal included, is still unexecuted.
    let out: &mut BufferList = if index == terminal {
        unsafe { &mut *view.dest }
    } else {
        unsafe { view.program.output(index).list_mut() }
    };
    let body = unsafe { view.program.body_mut(index) };

    // Callbacks may have altered the byte sizes in a previous cycle.
    out.reset_byte_len(view.ctx.frames);

    let addr0 = out.channel(0).as_ptr();
    let addr1 = out.channel(1).as_ptr();

    let status = (body.process)(view.ctx, out, body.input_block.as_mut());

    // A callback relocating its output storage is a defect in the node
    // implementation, not a recoverable condition.
    debug_assert_eq!(addr0, out.channel(0).as_ptr(), "job {index} moved channel 0");
    debug_assert_eq!(addr1, out.channel(1).as_ptr(), "job {index} moved channel 1");

    if !status.is_ok() {
        view.sink.report(RenderFault { job: index, status });
    }
}
