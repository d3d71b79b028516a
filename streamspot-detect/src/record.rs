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

//! Emitted records
//!
//! One score record per processed edge, plus periodic whole-state snapshots.
//! Everything in a record is deterministic for a fixed seed except the
//! wall-clock timestamp.

use serde::Serialize;

use streamspot_core::Result;

/// Per-edge output record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreRecord {
    /// Deployment-chosen tag identifying the emitting stream.
    pub origin: String,
    /// Graph the edge belonged to.
    pub gid: u64,
    /// Millisecond wall-clock timestamp at processing time.
    pub timestamp_ms: i64,
    /// The graph's anomaly score after this edge.
    pub anomaly_score: f64,
    /// Assigned cluster code: a cluster id, `-1` anomaly, `-2` unseen.
    pub cluster: i64,
}

impl ScoreRecord {
    /// Tab-separated rendering, one line without the terminator.
    pub fn tsv(&self) -> String {
        format!(
            "{}\t{}\t{}\t{:.6}\t{}",
            self.origin, self.gid, self.timestamp_ms, self.anomaly_score, self.cluster
        )
    }
}

/// One graph's state inside a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnapshotEntry {
    pub gid: u64,
    pub anomaly_score: f64,
    pub cluster: i64,
}

/// All classified graphs' scores and assignments after `edge_num` edges,
/// sorted by gid.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateSnapshot {
    pub edge_num: u64,
    pub entries: Vec<SnapshotEntry>,
}

/// Where the driver delivers records and snapshots.
pub trait RecordSink {
    fn record(&mut self, record: &ScoreRecord) -> Result<()>;

    /// Periodic snapshots; sinks that do not care may ignore them.
    fn snapshot(&mut self, _snapshot: &StateSnapshot) -> Result<()> {
        Ok(())
    }
}

/// In-memory sink, used by tests and by callers that post-process a run.
#[derive(Debug, Default)]
pub struct VecSink {
    pub records: Vec<ScoreRecord>,
    pub snapshots: Vec<StateSnapshot>,
}

impl VecSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordSink for VecSink {
    fn record(&mut self, record: &ScoreRecord) -> Result<()> {
        self.records.push(record.clone());
        Ok(())
    }

    fn snapshot(&mut self, snapshot: &StateSnapshot) -> Result<()> {
        self.snapshots.push(snapshot.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tsv_rendering() {
        let record = ScoreRecord {
            origin: "streamspot".into(),
            gid: 7,
            timestamp_ms: 1234,
            anomaly_score: 0.25,
            cluster: -1,
        };
        assert_eq!(record.tsv(), "streamspot\t7\t1234\t0.250000\t-1");
    }

    #[test]
    fn test_vec_sink_collects_in_order() {
        let mut sink = VecSink::new();
        for gid in [3, 1, 2] {
            sink.record(&ScoreRecord {
                origin: "s".into(),
                gid,
                timestamp_ms: 0,
                anomaly_score: 0.0,
                cluster: 0,
            })
            .unwrap();
        }
        let gids: Vec<u64> = sink.records.iter().map(|r| r.gid).collect();
        assert_eq!(gids, vec![3, 1, 2]);
    }
}
