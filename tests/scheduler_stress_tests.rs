//! Long-running stress tests for ready-queue safety under concurrency.
//!
//! Repeated cycles over DAGs with wide fan-out and fan-in, multiple
//! workers. Any lost, duplicated, or double-enqueued job id shows up as an
//! execution count other than one.

use ostinato::prelude::*;

mod helpers;
use helpers::*;

const STRESS_CYCLES: usize = 10_000;

#[test]
fn test_diamond_stress_single_worker() {
    let graph = diamond(8, 0);
    let mut engine = test_engine(0);
    engine.install(graph.program);

    let mut dest = BufferList::new(TEST_MAX_FRAMES);
    for _ in 0..STRESS_CYCLES {
        render_once(&mut engine, 64, &mut dest);
        graph.recorder.assert_each_ran_once();
    }
}

#[test]
fn test_diamond_stress_multi_worker() {
    let graph = diamond(12, 0);
    let mut engine = test_engine(3);
    engine.install(graph.program);

    let mut dest = BufferList::new(TEST_MAX_FRAMES);
    for _ in 0..STRESS_CYCLES {
        render_once(&mut engine, 64, &mut dest);
        graph.recorder.assert_each_ran_once();
        graph.recorder.assert_dependency_order(&graph.edges);
    }
}

#[test]
fn test_layered_graph_stress_multi_worker() {
    // Three layers of four with full bipartite edges between consecutive
    // layers, funneled into one terminal.
    let mut edges = Vec::new();
    for u in 0..4 {
        for v in 4..8 {
            edges.push((u, v));
        }
    }
    for u in 4..8 {
        for v in 8..12 {
            edges.push((u, v));
        }
    }
    for u in 8..12 {
        edges.push((u, 12));
    }

    let graph = graph_from_edges(13, edges, 0);
    let mut engine = test_engine(4);
    engine.install(graph.program);

    let mut dest = BufferList::new(TEST_MAX_FRAMES);
    for _ in 0..STRESS_CYCLES {
        render_once(&mut engine, 32, &mut dest);
        graph.recorder.assert_each_ran_once();
        graph.recorder.assert_dependency_order(&graph.edges);
    }
}
