//! Fan-in scheduling tests.
//!
//! A consumer with two producers must never start before both have
//! finished, regardless of which finishes first. Randomized busy-wait
//! delays in the producers shuffle completion order across runs.

use ostinato::prelude::*;
use rand::Rng;

mod helpers;
use helpers::*;

#[test]
fn test_fan_in_waits_for_both_producers_single_worker() {
    let graph = fan_in_pair(0);
    let mut engine = test_engine(0);
    engine.install(graph.program);

    let mut dest = BufferList::new(TEST_MAX_FRAMES);
    for _ in 0..100 {
        render_once(&mut engine, 64, &mut dest);
        graph.recorder.assert_each_ran_once();
        graph.recorder.assert_dependency_order(&graph.edges);
    }
}

#[test]
fn test_fan_in_waits_for_both_producers_concurrent() {
    let mut rng = rand::thread_rng();

    // Fresh graphs across repeats vary which producer carries the delay.
    for _ in 0..20 {
        let delay = rng.gen_range(1..40);
        let graph = fan_in_pair(delay);
        let mut engine = test_engine(2);
        engine.install(graph.program);

        let mut dest = BufferList::new(TEST_MAX_FRAMES);
        for _ in 0..50 {
            render_once(&mut engine, 64, &mut dest);
            graph.recorder.assert_each_ran_once();
            graph.recorder.assert_dependency_order(&graph.edges);
        }
    }
}

#[test]
fn test_wide_diamond_concurrent() {
    let graph = diamond(16, 5);
    let mut engine = test_engine(3);
    engine.install(graph.program);

    let mut dest = BufferList::new(TEST_MAX_FRAMES);
    for _ in 0..200 {
        render_once(&mut engine, 128, &mut dest);
        graph.recorder.assert_each_ran_once();
        graph.recorder.assert_dependency_order(&graph.edges);
    }
}
