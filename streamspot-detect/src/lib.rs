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

//! StreamSpot Detect
//!
//! The decision side of the detector: reference clusters with incrementally
//! maintained centroids, the bounded edge cache with sketch rollback, and
//! the stream engine that routes every edge through graph store, sketch
//! update, and cluster reassignment.

pub mod cache;
pub mod cluster;
pub mod engine;
pub mod record;

#[cfg(test)]
mod stream_scenarios;

pub use cache::EdgeCache;
pub use cluster::{sketch_distance, ClusterSet, Membership, ANOMALY_CODE, UNSEEN_CODE};
pub use engine::{EngineStats, RunSummary, StreamEngine};
pub use record::{RecordSink, ScoreRecord, SnapshotEntry, StateSnapshot, VecSink};
