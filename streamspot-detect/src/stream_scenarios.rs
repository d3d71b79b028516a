// Copyright 2025 StreamSpot Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! End-to-end scenarios over the full engine: single-edge hashing, cold vs.
//! incremental agreement, cache rollback, the driver loop, and determinism
//! across runs.

use std::sync::atomic::AtomicBool;

use streamspot_core::{
    BadInputPolicy, BootstrapClusters, ClusterSpec, Edge, StreamParams, StreamSpotError,
};
use streamspot_index::{shingle_counts, GraphStore, HashFamily, StreamSketch};

use crate::engine::StreamEngine;
use crate::record::{RecordSink, ScoreRecord, VecSink};

const TRAIN_GID: u64 = 99;

fn small_params(cache_capacity: usize) -> StreamParams {
    StreamParams {
        sketch_bits: 4,
        bands: 2,
        band_bits: 2,
        chunk_length: 4,
        seed: 23,
        cache_capacity,
        snapshot_interval: 0,
        ..Default::default()
    }
}

fn train_edge() -> Edge {
    Edge::new(50, b'A', 51, b'B', b'X', TRAIN_GID)
}

fn one_cluster_boot() -> BootstrapClusters {
    BootstrapClusters {
        global_threshold: 0.5,
        chunk_length: None,
        clusters: vec![ClusterSpec {
            threshold: 0.5,
            members: vec![TRAIN_GID],
        }],
    }
}

fn bootstrapped_engine(params: StreamParams) -> StreamEngine {
    let mut engine = StreamEngine::new(params, "test").unwrap();
    engine.load_training_edge(&train_edge());
    engine.bootstrap(&one_cluster_boot()).unwrap();
    engine
}

/// Cold-construct the sketch a graph would have with exactly these edges.
fn cold_sketch(edges: &[Edge], params: &StreamParams) -> StreamSketch {
    let family = HashFamily::generate(params.sketch_bits, params.chunk_length, params.seed);
    let mut store = GraphStore::new();
    for e in edges {
        store.append(e);
    }
    let counts = shingle_counts(store.graph(edges[0].gid).unwrap(), params.chunk_length as usize);
    StreamSketch::from_chunk_counts(&counts, &family)
}

#[test]
fn scenario_single_edge_projection_is_one_hashed_chunk() {
    let params = small_params(0);
    let mut engine = bootstrapped_engine(params.clone());

    let record = engine
        .process_edge(&Edge::new(0, b'A', 1, b'B', b'X', 7))
        .unwrap();
    assert_eq!(record.gid, 7);

    // the sole shingle of graph 7 is " AXB", one chunk hashed per row
    let family = HashFamily::generate(params.sketch_bits, params.chunk_length, params.seed);
    let sketch = engine.sketch(7).unwrap();
    for row in 0..4 {
        assert_eq!(sketch.projection()[row], family.sign(row, b" AXB"));
    }
}

#[test]
fn scenario_incremental_matches_cold_reconstruction() {
    let params = small_params(0);
    let mut engine = bootstrapped_engine(params.clone());

    let edges = [
        Edge::new(0, b'A', 1, b'B', b'X', 7),
        Edge::new(0, b'A', 2, b'C', b'Y', 7),
    ];
    for e in &edges {
        engine.process_edge(e).unwrap();
    }

    // shingle " AXBYC" -> chunks {" AXB", "YC"}
    assert_eq!(engine.sketch(7).unwrap(), &cold_sketch(&edges, &params));
}

#[test]
fn scenario_cache_rollback_leaves_only_the_window() {
    let params = small_params(1);
    let mut engine = bootstrapped_engine(params.clone());

    let e1 = Edge::new(0, b'A', 1, b'B', b'X', 7);
    let e2 = Edge::new(0, b'A', 2, b'C', b'Y', 7);
    let e3 = Edge::new(4, b'A', 5, b'D', b'Z', 7);
    for e in [&e1, &e2, &e3] {
        engine.process_edge(e).unwrap();
    }

    // e1 and e2 were evicted and reverse-applied; only e3 remains
    assert_eq!(engine.stats().evictions, 2);
    assert_eq!(engine.graphs().graph(7).unwrap().edge_count(), 1);
    assert_eq!(engine.sketch(7).unwrap(), &cold_sketch(&[e3], &params));
}

#[test]
fn scenario_wider_window_keeps_last_w_edges() {
    let params = small_params(3);
    let mut engine = bootstrapped_engine(params.clone());

    // distinct sources, so every eviction reverses a whole-shingle append
    let edges: Vec<Edge> = (0..10)
        .map(|i| Edge::new(i, b'A', 100 + i, b'B' + (i % 3) as u8, b'X', 7))
        .collect();
    for e in &edges {
        engine.process_edge(e).unwrap();
    }

    assert_eq!(engine.stats().evictions, 7);
    assert_eq!(engine.graphs().graph(7).unwrap().edge_count(), 3);
    assert_eq!(engine.sketch(7).unwrap(), &cold_sketch(&edges[7..], &params));
}

#[test]
fn scenario_determinism_across_runs() {
    let run = || {
        let mut engine = bootstrapped_engine(small_params(1));
        let mut out: Vec<(u64, u64, i64)> = Vec::new();
        for e in [
            Edge::new(0, b'A', 1, b'B', b'X', 7),
            Edge::new(0, b'A', 2, b'C', b'Y', 7),
            Edge::new(4, b'A', 5, b'D', b'Z', 8),
            Edge::new(4, b'A', 6, b'B', b'Y', 8),
        ] {
            let r = engine.process_edge(&e).unwrap();
            // timestamps are wall-clock; everything else must replay exactly
            out.push((r.gid, r.anomaly_score.to_bits(), r.cluster));
        }
        out
    };
    assert_eq!(run(), run());
}

#[test]
fn scenario_cluster_sizes_conserved_through_stream() {
    let mut engine = bootstrapped_engine(small_params(0));
    for e in [
        Edge::new(0, b'A', 1, b'B', b'X', 7),
        Edge::new(0, b'A', 2, b'C', b'Y', 7),
        Edge::new(3, b'A', 4, b'D', b'Z', 8),
    ] {
        engine.process_edge(&e).unwrap();
        let clusters = engine.clusters().unwrap();
        let total: u32 = (0..clusters.cluster_count()).map(|c| clusters.size(c)).sum();
        assert_eq!(total as usize, clusters.assigned_count());
    }
}

#[test]
fn test_edge_before_bootstrap_is_fatal() {
    let mut engine = StreamEngine::new(small_params(0), "test").unwrap();
    let err = engine
        .process_edge(&Edge::new(0, b'A', 1, b'B', b'X', 7))
        .unwrap_err();
    assert!(matches!(err, StreamSpotError::InvariantViolated(_)));
}

#[test]
fn test_bootstrap_requires_training_edges() {
    let mut engine = StreamEngine::new(small_params(0), "test").unwrap();
    let err = engine.bootstrap(&one_cluster_boot()).unwrap_err();
    assert!(matches!(
        err,
        StreamSpotError::UnknownGraphInBootstrap { gid: TRAIN_GID }
    ));
}

#[test]
fn test_driver_skips_bad_lines_when_lenient() {
    let mut params = small_params(0);
    params.bad_input = BadInputPolicy::Skip;
    let mut engine = bootstrapped_engine(params);

    let edges = vec![
        Ok(Edge::new(0, b'A', 1, b'B', b'X', 7)),
        Err(StreamSpotError::bad_input(2, "expected 6 fields")),
        Ok(Edge::new(0, b'A', 2, b'C', b'Y', 7)),
    ];
    let stop = AtomicBool::new(false);
    let mut sink = VecSink::new();
    let summary = engine.stream(edges, &stop, &mut sink).unwrap();

    assert_eq!(summary.edges_processed, 2);
    assert_eq!(summary.edges_skipped, 1);
    assert_eq!(sink.records.len(), 2);
}

#[test]
fn test_driver_aborts_on_bad_line_by_default() {
    let mut engine = bootstrapped_engine(small_params(0));
    let edges = vec![
        Ok(Edge::new(0, b'A', 1, b'B', b'X', 7)),
        Err(StreamSpotError::bad_input(2, "expected 6 fields")),
    ];
    let stop = AtomicBool::new(false);
    let mut sink = VecSink::new();
    assert!(engine.stream(edges, &stop, &mut sink).is_err());
    assert_eq!(sink.records.len(), 1);
}

#[test]
fn test_driver_emits_periodic_and_final_snapshots() {
    let mut params = small_params(0);
    params.snapshot_interval = 2;
    let mut engine = bootstrapped_engine(params);

    let edges: Vec<_> = (0..3)
        .map(|i| Ok(Edge::new(i, b'A', i + 10, b'B', b'X', 7)))
        .collect();
    let stop = AtomicBool::new(false);
    let mut sink = VecSink::new();
    engine.stream(edges, &stop, &mut sink).unwrap();

    assert_eq!(sink.snapshots.len(), 2);
    assert_eq!(sink.snapshots[0].edge_num, 2);
    assert_eq!(sink.snapshots[1].edge_num, 3);
    // snapshots carry every classified graph, sorted by gid
    let gids: Vec<u64> = sink.snapshots[1].entries.iter().map(|s| s.gid).collect();
    assert_eq!(gids, vec![7, TRAIN_GID]);
}

#[test]
fn test_driver_honours_stop_flag() {
    let mut engine = bootstrapped_engine(small_params(0));
    let edges = vec![Ok(Edge::new(0, b'A', 1, b'B', b'X', 7))];
    let stop = AtomicBool::new(true);
    let mut sink = VecSink::new();
    let summary = engine.stream(edges, &stop, &mut sink).unwrap();
    assert!(summary.stopped_early);
    assert_eq!(summary.edges_processed, 0);
    assert!(sink.records.is_empty());
}

mod window_properties {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// With distinct sources, every eviction reverses a whole-shingle
        /// append, so the surviving state always equals a cold build over
        /// the trailing window.
        #[test]
        fn prop_cache_window_equals_cold_tail(
            n in 1usize..24,
            capacity in 1usize..6,
            dst_types in prop::collection::vec(b'B'..=b'E', 24),
        ) {
            let params = small_params(capacity);
            let mut engine = bootstrapped_engine(params.clone());
            let edges: Vec<Edge> = (0..n)
                .map(|i| Edge::new(i as u64, b'A', 200 + i as u64, dst_types[i], b'X', 7))
                .collect();
            for e in &edges {
                engine.process_edge(e).unwrap();
            }
            let window_start = n.saturating_sub(capacity);
            prop_assert_eq!(
                engine.sketch(7).unwrap(),
                &cold_sketch(&edges[window_start..], &params)
            );
            prop_assert_eq!(
                engine.graphs().graph(7).unwrap().edge_count(),
                n - window_start
            );
        }
    }
}

/// Sinks can fail; the driver must surface the error.
struct FailingSink;

impl RecordSink for FailingSink {
    fn record(&mut self, _record: &ScoreRecord) -> streamspot_core::Result<()> {
        Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "gone").into())
    }
}

#[test]
fn test_sink_errors_propagate() {
    let mut engine = bootstrapped_engine(small_params(0));
    let edges = vec![Ok(Edge::new(0, b'A', 1, b'B', b'X', 7))];
    let stop = AtomicBool::new(false);
    assert!(engine.stream(edges, &stop, &mut FailingSink).is_err());
}
