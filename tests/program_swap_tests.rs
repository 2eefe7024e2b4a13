//! Program install and hot-swap tests.
//!
//! Each cycle runs exactly one coherent program: cycles before an install
//! use the old table, cycles after use the new one, including capacity
//! changes.

use ostinato::prelude::*;

mod helpers;
use helpers::*;

#[test]
fn test_swap_between_cycles() {
    let first = chain(3, 0);
    let second = diamond(4, 0);

    let mut engine = test_engine(0);
    engine.install(first.program);

    let mut dest = BufferList::new(TEST_MAX_FRAMES);
    for _ in 0..10 {
        render_once(&mut engine, 64, &mut dest);
        first.recorder.assert_each_ran_once();
    }

    engine.install(second.program);
    for _ in 0..10 {
        render_once(&mut engine, 64, &mut dest);
        second.recorder.assert_each_ran_once();
    }

    // The replaced program's jobs stayed untouched after the swap.
    assert_eq!(first.recorder.runs(0), 0);
}

#[test]
fn test_swap_grows_capacity_with_helpers() {
    let small = chain(2, 0);
    let large = diamond(24, 0);

    let mut engine = test_engine(2);
    engine.install(small.program);

    let mut dest = BufferList::new(TEST_MAX_FRAMES);
    for _ in 0..50 {
        render_once(&mut engine, 64, &mut dest);
        small.recorder.assert_each_ran_once();
    }

    engine.install(large.program);
    for _ in 0..50 {
        render_once(&mut engine, 64, &mut dest);
        large.recorder.assert_each_ran_once();
        large.recorder.assert_dependency_order(&large.edges);
    }
}

#[test]
fn test_install_from_other_thread() {
    let graph = chain(4, 0);
    let engine = test_engine(0);

    // install takes &self, so a non-realtime thread can swap programs
    // while the host owns the engine mutably elsewhere in time.
    std::thread::scope(|scope| {
        scope
            .spawn(|| {
                engine.install(graph.program);
            })
            .join()
            .unwrap();
    });

    assert!(engine.has_program());
}
