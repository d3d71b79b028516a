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

//! Typed edge records
//!
//! Every streamed edge carries a source node, a destination node, an edge
//! type, and the id of the graph it belongs to. Node and edge types are
//! single code units; node identifiers are dense `u64` values (decimal ids
//! from the input, or ids allocated by the reader's interner).

use serde::{Deserialize, Serialize};

/// A source node key: `(node_id, node_type)`.
///
/// The pair is hashed flat as a map key; two nodes with the same id but
/// different types are distinct sources.
pub type SourceKey = (u64, u8);

/// A typed, graph-tagged edge. Immutable once received.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    /// Source node id
    pub src_id: u64,
    /// Source node type (single code unit)
    pub src_type: u8,
    /// Destination node id
    pub dst_id: u64,
    /// Destination node type (single code unit)
    pub dst_type: u8,
    /// Edge type (single code unit)
    pub edge_type: u8,
    /// Id of the graph this edge belongs to
    pub gid: u64,
}

/// The destination-side triple stored in a source node's outgoing list.
///
/// Arrival order of these triples is load-bearing: the neighborhood shingle
/// concatenates them in exactly this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NeighborTriple {
    pub dst_id: u64,
    pub dst_type: u8,
    pub edge_type: u8,
}

impl Edge {
    pub fn new(
        src_id: u64,
        src_type: u8,
        dst_id: u64,
        dst_type: u8,
        edge_type: u8,
        gid: u64,
    ) -> Self {
        Self {
            src_id,
            src_type,
            dst_id,
            dst_type,
            edge_type,
            gid,
        }
    }

    /// The `(id, type)` key of this edge's source node.
    pub fn source_key(&self) -> SourceKey {
        (self.src_id, self.src_type)
    }

    /// The destination triple appended to the source's outgoing list.
    pub fn triple(&self) -> NeighborTriple {
        NeighborTriple {
            dst_id: self.dst_id,
            dst_type: self.dst_type,
            edge_type: self.edge_type,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_key_and_triple() {
        let e = Edge::new(3, b'A', 9, b'B', b'X', 7);
        assert_eq!(e.source_key(), (3, b'A'));
        assert_eq!(
            e.triple(),
            NeighborTriple {
                dst_id: 9,
                dst_type: b'B',
                edge_type: b'X',
            }
        );
    }

    #[test]
    fn test_same_id_different_type_is_distinct_source() {
        let a = Edge::new(1, b'A', 2, b'B', b'X', 0);
        let b = Edge::new(1, b'C', 2, b'B', b'X', 0);
        assert_ne!(a.source_key(), b.source_key());
    }
}
