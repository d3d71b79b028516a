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

//! Per-graph adjacency store
//!
//! For each `(graph id, source key)` an ordered list of outgoing destination
//! triples, in arrival order. A source key exists in a graph iff it has at
//! least one outgoing edge; destinations have no node-side entry of their
//! own. Arrival order is the only order kept — the shingle text concatenates
//! triples in exactly this order and the incremental update reasons about
//! the tail of the list.

use ahash::AHashMap;
use smallvec::SmallVec;

use streamspot_core::{Edge, NeighborTriple, Result, SourceKey, StreamSpotError};

/// Inline capacity of an outgoing list before spilling to the heap.
const INLINE_FANOUT: usize = 4;

/// Ordered outgoing triples of one source node.
pub type AdjacencyList = SmallVec<[NeighborTriple; INLINE_FANOUT]>;

/// One graph: source key → ordered outgoing list.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    nodes: AHashMap<SourceKey, AdjacencyList>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// The outgoing list of `key`, if the key has any edges.
    pub fn outgoing(&self, key: SourceKey) -> Option<&AdjacencyList> {
        self.nodes.get(&key)
    }

    /// Iterate `(source key, outgoing list)` pairs in unspecified order.
    pub fn sources(&self) -> impl Iterator<Item = (&SourceKey, &AdjacencyList)> {
        self.nodes.iter()
    }

    /// Number of source keys with at least one outgoing edge.
    pub fn source_count(&self) -> usize {
        self.nodes.len()
    }

    /// Total number of stored edges.
    pub fn edge_count(&self) -> usize {
        self.nodes.values().map(SmallVec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn append(&mut self, key: SourceKey, triple: NeighborTriple) {
        self.nodes.entry(key).or_default().push(triple);
    }

    fn remove(&mut self, key: SourceKey, triple: NeighborTriple) -> Result<()> {
        let list = self.nodes.get_mut(&key).ok_or_else(|| {
            StreamSpotError::InvariantViolated(format!(
                "remove of edge from absent source ({}, {})",
                key.0, key.1 as char
            ))
        })?;
        let pos = list.iter().position(|t| *t == triple).ok_or_else(|| {
            StreamSpotError::InvariantViolated(format!(
                "remove of missing edge ({}, {}) -> {}",
                key.0, key.1 as char, triple.dst_id
            ))
        })?;
        list.remove(pos);
        if list.is_empty() {
            self.nodes.remove(&key);
        }
        Ok(())
    }
}

/// All graphs seen on the stream, keyed by graph id.
///
/// Graphs are created on first edge and never dropped; with the edge cache
/// active a graph may become empty again, in which case its entry is erased
/// until the next edge recreates it.
#[derive(Debug, Clone, Default)]
pub struct GraphStore {
    graphs: AHashMap<u64, Graph>,
}

impl GraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push the destination triple onto the source's ordered list, creating
    /// the graph and the list as needed.
    pub fn append(&mut self, e: &Edge) {
        self.graphs
            .entry(e.gid)
            .or_default()
            .append(e.source_key(), e.triple());
    }

    /// Erase the first occurrence of the edge's destination triple from its
    /// source's list.
    ///
    /// Only the edge cache's eviction path may call this; a missing edge is
    /// a fatal invariant violation.
    pub fn remove(&mut self, e: &Edge) -> Result<()> {
        let graph = self.graphs.get_mut(&e.gid).ok_or_else(|| {
            StreamSpotError::InvariantViolated(format!("remove of edge from absent graph {}", e.gid))
        })?;
        graph.remove(e.source_key(), e.triple())?;
        if graph.is_empty() {
            self.graphs.remove(&e.gid);
        }
        Ok(())
    }

    pub fn graph(&self, gid: u64) -> Option<&Graph> {
        self.graphs.get(&gid)
    }

    /// The current outgoing list of an edge's source, if any.
    pub fn outgoing(&self, gid: u64, key: SourceKey) -> Option<&AdjacencyList> {
        self.graphs.get(&gid).and_then(|g| g.outgoing(key))
    }

    /// Number of graphs with at least one edge.
    pub fn graph_count(&self) -> usize {
        self.graphs.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(src: u64, dst: u64, gid: u64) -> Edge {
        Edge::new(src, b'A', dst, b'B', b'X', gid)
    }

    #[test]
    fn test_append_keeps_arrival_order() {
        let mut store = GraphStore::new();
        store.append(&edge(0, 1, 7));
        store.append(&edge(0, 2, 7));
        store.append(&edge(0, 1, 7)); // duplicates are kept

        let list = store.outgoing(7, (0, b'A')).unwrap();
        let dsts: Vec<u64> = list.iter().map(|t| t.dst_id).collect();
        assert_eq!(dsts, vec![1, 2, 1]);
    }

    #[test]
    fn test_graphs_are_isolated_by_gid() {
        let mut store = GraphStore::new();
        store.append(&edge(0, 1, 7));
        store.append(&edge(0, 2, 8));
        assert_eq!(store.outgoing(7, (0, b'A')).unwrap().len(), 1);
        assert_eq!(store.outgoing(8, (0, b'A')).unwrap().len(), 1);
    }

    #[test]
    fn test_remove_erases_first_occurrence_only() {
        let mut store = GraphStore::new();
        store.append(&edge(0, 1, 7));
        store.append(&edge(0, 2, 7));
        store.append(&edge(0, 1, 7));

        store.remove(&edge(0, 1, 7)).unwrap();
        let dsts: Vec<u64> = store
            .outgoing(7, (0, b'A'))
            .unwrap()
            .iter()
            .map(|t| t.dst_id)
            .collect();
        assert_eq!(dsts, vec![2, 1]);
    }

    #[test]
    fn test_removing_last_edge_erases_source_key() {
        let mut store = GraphStore::new();
        store.append(&edge(0, 1, 7));
        store.append(&edge(5, 6, 7));
        store.remove(&edge(0, 1, 7)).unwrap();
        assert!(store.outgoing(7, (0, b'A')).is_none());
        assert_eq!(store.graph(7).unwrap().source_count(), 1);
    }

    #[test]
    fn test_remove_missing_edge_is_invariant_violation() {
        let mut store = GraphStore::new();
        store.append(&edge(0, 1, 7));
        let err = store.remove(&edge(0, 9, 7)).unwrap_err();
        assert!(matches!(err, StreamSpotError::InvariantViolated(_)));
        let err = store.remove(&edge(0, 1, 99)).unwrap_err();
        assert!(matches!(err, StreamSpotError::InvariantViolated(_)));
    }

    #[test]
    fn test_edge_count() {
        let mut store = GraphStore::new();
        store.append(&edge(0, 1, 7));
        store.append(&edge(0, 2, 7));
        store.append(&edge(3, 4, 7));
        assert_eq!(store.graph(7).unwrap().edge_count(), 3);
        assert_eq!(store.graph(7).unwrap().source_count(), 2);
    }
}
