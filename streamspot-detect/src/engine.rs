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

//! Stream engine and driver
//!
//! The single-threaded per-edge pipeline: optional cache eviction with
//! reverse application, adjacency append, incremental chunk delta, sketch
//! update, cluster reassignment, record emission. There are no suspension
//! points inside an edge and nothing is ever retried; the driver loop checks
//! the stop flag between edges only.

use ahash::AHashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use streamspot_core::{BootstrapClusters, Edge, Result, StreamParams, StreamSpotError};
use streamspot_index::{append_delta, shingle_counts, GraphStore, HashFamily, StreamSketch};

use crate::cache::EdgeCache;
use crate::cluster::{ClusterSet, Membership};
use crate::record::{RecordSink, ScoreRecord, SnapshotEntry, StateSnapshot};

/// Cumulative per-stage timings and counters for one run.
#[derive(Debug, Clone, Default)]
pub struct EngineStats {
    pub edges_processed: u64,
    pub evictions: u64,
    pub graph_update: Duration,
    pub sketch_update: Duration,
    pub cluster_update: Duration,
}

impl EngineStats {
    /// Mean per-edge time spent in a stage.
    fn mean(total: Duration, count: u64) -> Duration {
        if count == 0 {
            Duration::ZERO
        } else {
            Duration::from_nanos((total.as_nanos() / u128::from(count)) as u64)
        }
    }

    pub fn mean_graph_update(&self) -> Duration {
        Self::mean(self.graph_update, self.edges_processed)
    }

    pub fn mean_sketch_update(&self) -> Duration {
        Self::mean(self.sketch_update, self.edges_processed)
    }

    pub fn mean_cluster_update(&self) -> Duration {
        Self::mean(self.cluster_update, self.edges_processed)
    }
}

/// What a finished (or stopped) stream run looked like.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub edges_processed: u64,
    pub edges_skipped: u64,
    pub stopped_early: bool,
    pub stats: EngineStats,
}

/// The streaming detector: all per-graph and per-cluster state plus the
/// read-only hash family.
pub struct StreamEngine {
    params: StreamParams,
    origin: String,
    family: HashFamily,
    store: GraphStore,
    sketches: AHashMap<u64, StreamSketch>,
    clusters: Option<ClusterSet>,
    cache: Option<EdgeCache>,
    stats: EngineStats,
}

impl StreamEngine {
    /// Validate parameters and allocate the hash family. The engine accepts
    /// no edges for scoring until [`bootstrap`](Self::bootstrap) has run.
    pub fn new(params: StreamParams, origin: impl Into<String>) -> Result<Self> {
        params.validate()?;
        let family = HashFamily::generate(params.sketch_bits, params.chunk_length, params.seed);
        let cache = params
            .cache_enabled()
            .then(|| EdgeCache::new(params.cache_capacity));
        Ok(Self {
            params,
            origin: origin.into(),
            family,
            store: GraphStore::new(),
            sketches: AHashMap::new(),
            clusters: None,
            cache,
            stats: EngineStats::default(),
        })
    }

    pub fn params(&self) -> &StreamParams {
        &self.params
    }

    pub fn stats(&self) -> &EngineStats {
        &self.stats
    }

    pub fn graphs(&self) -> &GraphStore {
        &self.store
    }

    pub fn sketch(&self, gid: u64) -> Option<&StreamSketch> {
        self.sketches.get(&gid)
    }

    pub fn clusters(&self) -> Option<&ClusterSet> {
        self.clusters.as_ref()
    }

    /// Load one training edge into the adjacency store.
    ///
    /// Training edges build graphs only; their sketches are constructed cold
    /// at bootstrap, and they never pass through the cache.
    pub fn load_training_edge(&mut self, e: &Edge) {
        self.store.append(e);
    }

    /// Cold-construct the training sketches and the reference cluster set.
    ///
    /// Every gid listed in `boot` must have received at least one training
    /// edge. Graphs outside the training set keep their zero sketches.
    pub fn bootstrap(&mut self, boot: &BootstrapClusters) -> Result<()> {
        let chunk_length = self.params.chunk_length as usize;
        for gid in boot.train_gids() {
            if self.sketches.contains_key(&gid) {
                continue; // listed in more than one cluster line
            }
            let graph = self
                .store
                .graph(gid)
                .filter(|g| !g.is_empty())
                .ok_or(StreamSpotError::UnknownGraphInBootstrap { gid })?;
            let counts = shingle_counts(graph, chunk_length);
            self.sketches
                .insert(gid, StreamSketch::from_chunk_counts(&counts, &self.family));
        }

        let set = ClusterSet::from_bootstrap(boot, &self.sketches, self.family.len())?;
        info!(
            clusters = set.cluster_count(),
            training_graphs = self.sketches.len(),
            global_threshold = set.global_threshold(),
            "bootstrap complete"
        );
        self.clusters = Some(set);
        Ok(())
    }

    /// Process one streamed edge and return its score record.
    pub fn process_edge(&mut self, e: &Edge) -> Result<ScoreRecord> {
        if self.clusters.is_none() {
            return Err(StreamSpotError::InvariantViolated(
                "edge streamed before bootstrap".into(),
            ));
        }

        if let Some(cache) = self.cache.as_mut() {
            let evicted = cache.admit(*e);
            for old in evicted {
                self.revert_edge(&old)?;
            }
        }

        let (score, membership) = self.apply_edge(e, 1)?;
        self.stats.edges_processed += 1;

        Ok(ScoreRecord {
            origin: self.origin.clone(),
            gid: e.gid,
            timestamp_ms: chrono::Utc::now().timestamp_millis(),
            anomaly_score: score,
            cluster: membership.code(),
        })
    }

    /// Forward (`direction = 1`) or reverse (`direction = -1`) application
    /// of one edge to graph, sketch, and clusters.
    ///
    /// Both directions derive the chunk delta from the adjacency list with
    /// the edge present: forward appends first, reverse removes afterwards.
    fn apply_edge(&mut self, e: &Edge, direction: i64) -> Result<(f64, Membership)> {
        let chunk_length = self.params.chunk_length as usize;

        let start = Instant::now();
        if direction > 0 {
            self.store.append(e);
        }
        let outgoing = self.store.outgoing(e.gid, e.source_key()).ok_or_else(|| {
            StreamSpotError::InvariantViolated(format!(
                "no adjacency for source ({}, {}) of graph {}",
                e.src_id, e.src_type as char, e.gid
            ))
        })?;
        self.stats.graph_update += start.elapsed();

        let start = Instant::now();
        let mut delta = append_delta(&self.family, e.src_type, outgoing, chunk_length);
        if direction < 0 {
            for d in &mut delta {
                *d = -*d;
            }
            self.store.remove(e)?;
        }
        let sketch = self
            .sketches
            .entry(e.gid)
            .or_insert_with(|| StreamSketch::new(self.params.sketch_bits as usize));
        sketch.apply_delta(&delta);
        self.stats.sketch_update += start.elapsed();

        let start = Instant::now();
        let result = match self.clusters.as_mut() {
            Some(clusters) => clusters.update(e.gid, &delta, sketch)?,
            None => {
                return Err(StreamSpotError::InvariantViolated(
                    "cluster update before bootstrap".into(),
                ))
            }
        };
        self.stats.cluster_update += start.elapsed();
        Ok(result)
    }

    /// Reverse-apply an evicted edge: negate its most recent contribution to
    /// the source's shingle, roll the sketch back, and rerun the cluster
    /// decision with the negated delta.
    fn revert_edge(&mut self, e: &Edge) -> Result<()> {
        debug!(gid = e.gid, src = e.src_id, "reverse-applying evicted edge");
        self.apply_edge(e, -1)?;
        self.stats.evictions += 1;
        Ok(())
    }

    /// Current scores and assignments of every classified graph.
    pub fn snapshot(&self, edge_num: u64) -> StateSnapshot {
        let entries = match &self.clusters {
            Some(clusters) => clusters
                .states()
                .into_iter()
                .map(|(gid, score, membership)| SnapshotEntry {
                    gid,
                    anomaly_score: score,
                    cluster: membership.code(),
                })
                .collect(),
            None => Vec::new(),
        };
        StateSnapshot { edge_num, entries }
    }

    /// Drive a whole stream: route every edge, deliver records and periodic
    /// snapshots to `sink`, honour `stop` between edges.
    ///
    /// Malformed lines follow the configured bad-input policy; every other
    /// error aborts the run.
    pub fn stream<I, S>(&mut self, edges: I, stop: &AtomicBool, sink: &mut S) -> Result<RunSummary>
    where
        I: IntoIterator<Item = Result<Edge>>,
        S: RecordSink,
    {
        use streamspot_core::BadInputPolicy;

        let interval = self.params.snapshot_interval;
        let mut processed = 0u64;
        let mut skipped = 0u64;
        let mut stopped_early = false;

        for item in edges {
            if stop.load(Ordering::Relaxed) {
                info!(processed, "stop signal observed; ending stream");
                stopped_early = true;
                break;
            }
            let e = match item {
                Ok(e) => e,
                Err(err)
                    if err.is_skippable() && self.params.bad_input == BadInputPolicy::Skip =>
                {
                    warn!(%err, "skipping malformed edge line");
                    skipped += 1;
                    continue;
                }
                Err(err) => return Err(err),
            };

            let record = self.process_edge(&e)?;
            sink.record(&record)?;
            processed += 1;

            if interval > 0 && processed % interval == 0 {
                sink.snapshot(&self.snapshot(processed))?;
            }
        }

        if interval > 0 && processed > 0 && processed % interval != 0 {
            sink.snapshot(&self.snapshot(processed))?;
        }

        info!(
            processed,
            skipped,
            evictions = self.stats.evictions,
            mean_graph_update_ns = self.stats.mean_graph_update().as_nanos() as u64,
            mean_sketch_update_ns = self.stats.mean_sketch_update().as_nanos() as u64,
            mean_cluster_update_ns = self.stats.mean_cluster_update().as_nanos() as u64,
            "stream complete"
        );

        Ok(RunSummary {
            edges_processed: processed,
            edges_skipped: skipped,
            stopped_early,
            stats: self.stats.clone(),
        })
    }
}
