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

//! Reference clusters and membership
//!
//! The cluster set is fixed at bootstrap; only memberships and centroids
//! evolve. Per cluster: a member count, a real-valued centroid projection
//! (mean of member projections), its sign sketch, and an offline-learned
//! threshold. Membership is a dense relation — a per-graph assignment map
//! and a per-cluster size vector — with no cross-links between the sides.

use ahash::AHashMap;
use std::f64::consts::PI;

use streamspot_core::{BootstrapClusters, Result, StreamSpotError};
use streamspot_index::{SketchBits, StreamSketch};

/// Cluster code emitted for anomalous graphs.
pub const ANOMALY_CODE: i64 = -1;

/// Cluster code emitted for graphs never classified.
pub const UNSEEN_CODE: i64 = -2;

/// A graph's current cluster assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Membership {
    /// Never classified.
    #[default]
    Unseen,
    /// Further from every centroid than the applicable threshold.
    Anomaly,
    /// Member of the given reference cluster.
    Cluster(usize),
}

impl Membership {
    /// The integer code that appears in emitted records.
    pub fn code(&self) -> i64 {
        match self {
            Self::Unseen => UNSEEN_CODE,
            Self::Anomaly => ANOMALY_CODE,
            Self::Cluster(c) => *c as i64,
        }
    }

    pub fn cluster_id(&self) -> Option<usize> {
        match self {
            Self::Cluster(c) => Some(*c),
            _ => None,
        }
    }
}

/// Distance between two sign sketches.
///
/// Maps the sketch similarity back through its cosine interpretation:
/// `1 - cos(pi * (1 - sim))`, smaller is more similar.
pub fn sketch_distance(a: &SketchBits, b: &SketchBits) -> f64 {
    1.0 - (PI * (1.0 - a.similarity(b))).cos()
}

/// The fixed reference cluster set with evolving centroids and memberships.
#[derive(Debug, Clone)]
pub struct ClusterSet {
    global_threshold: f64,
    thresholds: Vec<f64>,
    sizes: Vec<u32>,
    centroid_projections: Vec<Vec<f64>>,
    centroid_bits: Vec<SketchBits>,
    membership: AHashMap<u64, Membership>,
    scores: AHashMap<u64, f64>,
    width: usize,
}

impl ClusterSet {
    /// Build centroids from the bootstrap clusters and the cold-constructed
    /// sketches of their member graphs.
    ///
    /// Every member's projection must be present in `sketches`; a missing
    /// one means the training stream never carried an edge for that gid.
    pub fn from_bootstrap(
        boot: &BootstrapClusters,
        sketches: &AHashMap<u64, StreamSketch>,
        width: usize,
    ) -> Result<Self> {
        let nclusters = boot.clusters.len();
        let mut set = Self {
            global_threshold: boot.global_threshold,
            thresholds: boot.clusters.iter().map(|c| c.threshold).collect(),
            sizes: vec![0; nclusters],
            centroid_projections: vec![vec![0.0; width]; nclusters],
            centroid_bits: vec![SketchBits::zeros(width); nclusters],
            membership: AHashMap::new(),
            scores: AHashMap::new(),
            width,
        };

        for (cid, cluster) in boot.clusters.iter().enumerate() {
            if cluster.members.is_empty() {
                return Err(StreamSpotError::InvariantViolated(format!(
                    "bootstrap cluster {cid} has no members"
                )));
            }
            for &gid in &cluster.members {
                let sketch = sketches
                    .get(&gid)
                    .ok_or(StreamSpotError::UnknownGraphInBootstrap { gid })?;
                for (slot, &p) in set.centroid_projections[cid]
                    .iter_mut()
                    .zip(sketch.projection())
                {
                    *slot += p as f64;
                }
                set.membership.insert(gid, Membership::Cluster(cid));
            }
            let size = cluster.members.len() as u32;
            set.sizes[cid] = size;
            for slot in &mut set.centroid_projections[cid] {
                *slot /= f64::from(size);
            }
            set.centroid_bits[cid].refresh_real(&set.centroid_projections[cid]);
        }

        // training scores: distance of each member to its own centroid
        for (cid, cluster) in boot.clusters.iter().enumerate() {
            for &gid in &cluster.members {
                let sketch = &sketches[&gid];
                set.scores
                    .insert(gid, sketch_distance(sketch.bits(), &set.centroid_bits[cid]));
            }
        }
        Ok(set)
    }

    pub fn cluster_count(&self) -> usize {
        self.sizes.len()
    }

    pub fn size(&self, cid: usize) -> u32 {
        self.sizes[cid]
    }

    pub fn threshold(&self, cid: usize) -> f64 {
        self.thresholds[cid]
    }

    pub fn global_threshold(&self) -> f64 {
        self.global_threshold
    }

    pub fn membership(&self, gid: u64) -> Membership {
        self.membership.get(&gid).copied().unwrap_or_default()
    }

    pub fn score(&self, gid: u64) -> Option<f64> {
        self.scores.get(&gid).copied()
    }

    /// Number of graphs currently assigned to a real cluster.
    pub fn assigned_count(&self) -> usize {
        self.membership
            .values()
            .filter(|m| m.cluster_id().is_some())
            .count()
    }

    /// Every classified graph's `(gid, score, membership)`, sorted by gid.
    pub fn states(&self) -> Vec<(u64, f64, Membership)> {
        let mut states: Vec<_> = self
            .scores
            .iter()
            .map(|(&gid, &score)| (gid, score, self.membership(gid)))
            .collect();
        states.sort_by_key(|s| s.0);
        states
    }

    fn distance_to(&self, cid: usize, bits: &SketchBits) -> f64 {
        sketch_distance(bits, &self.centroid_bits[cid])
    }

    /// The non-empty cluster nearest to `bits`; ties break to the lowest
    /// index for deterministic replay.
    fn nearest(&self, bits: &SketchBits) -> Option<(usize, f64)> {
        let mut best: Option<(usize, f64)> = None;
        for cid in 0..self.sizes.len() {
            if self.sizes[cid] == 0 {
                continue; // centroid undefined until it regains a member
            }
            let d = self.distance_to(cid, bits);
            if best.map_or(true, |(_, bd)| d < bd) {
                best = Some((cid, d));
            }
        }
        best
    }

    /// Remove `gid`'s pre-delta projection from cluster `cid`'s centroid.
    fn remove_member(&mut self, cid: usize, projection: &[i64], delta: &[i64]) {
        let m = f64::from(self.sizes[cid]);
        self.sizes[cid] -= 1;
        if self.sizes[cid] == 0 {
            // centroid undefined; zero it and leave the cluster out of
            // nearest-centroid search until a member returns
            for slot in &mut self.centroid_projections[cid] {
                *slot = 0.0;
            }
        } else {
            for (l, slot) in self.centroid_projections[cid].iter_mut().enumerate() {
                let pre = (projection[l] - delta[l]) as f64;
                *slot = (*slot * m - pre) / (m - 1.0);
            }
        }
        self.centroid_bits[cid].refresh_real(&self.centroid_projections[cid]);
    }

    /// Add `gid`'s current projection to cluster `cid`'s centroid.
    fn add_member(&mut self, cid: usize, projection: &[i64]) {
        let m = f64::from(self.sizes[cid]);
        self.sizes[cid] += 1;
        for (slot, &p) in self.centroid_projections[cid].iter_mut().zip(projection) {
            *slot = (*slot * m + p as f64) / (m + 1.0);
        }
        self.centroid_bits[cid].refresh_real(&self.centroid_projections[cid]);
    }

    /// Reclassify `gid` after its sketch absorbed `delta`.
    ///
    /// Invoked once per processed edge (and once per eviction with the
    /// negated delta). Returns the new anomaly score and membership.
    pub fn update(
        &mut self,
        gid: u64,
        delta: &[i64],
        sketch: &StreamSketch,
    ) -> Result<(f64, Membership)> {
        debug_assert_eq!(delta.len(), self.width);
        let (nearest, min_distance) = self.nearest(sketch.bits()).ok_or_else(|| {
            StreamSpotError::InvariantViolated("no non-empty cluster to classify against".into())
        })?;
        let previous = self.membership(gid);
        let threshold = self.global_threshold.min(self.thresholds[nearest]);
        let mut score = min_distance;

        if min_distance > threshold {
            // outlier
            self.membership.insert(gid, Membership::Anomaly);
            if let Some(prev) = previous.cluster_id() {
                self.remove_member(prev, sketch.projection(), delta);
                if prev == nearest && self.sizes[prev] > 0 {
                    // the nearest centroid moved when we left it
                    score = self.distance_to(nearest, sketch.bits());
                }
            }
        } else if previous.cluster_id() != Some(nearest) {
            // migrate (or first assignment)
            self.membership.insert(gid, Membership::Cluster(nearest));
            if let Some(prev) = previous.cluster_id() {
                self.remove_member(prev, sketch.projection(), delta);
            }
            self.add_member(nearest, sketch.projection());
            score = self.distance_to(nearest, sketch.bits());
        } else {
            // stay: nudge the centroid by the member's delta
            let size = f64::from(self.sizes[nearest]);
            for (slot, &d) in self.centroid_projections[nearest].iter_mut().zip(delta) {
                *slot += d as f64 / size;
            }
            self.centroid_bits[nearest].refresh_real(&self.centroid_projections[nearest]);
            score = self.distance_to(nearest, sketch.bits());
        }

        self.scores.insert(gid, score);
        Ok((score, self.membership(gid)))
    }
}
