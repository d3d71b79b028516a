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

//! Shingle fragmentation
//!
//! A source node's shingle is the text `<space><src_type>` followed by
//! `<edge_type><dst_type>` for every outgoing edge in arrival order, length
//! `2 * (fanout + 1)`. Shingles are split into consecutive fixed-length
//! chunks (the last one may be shorter) and the chunks are the keys fed to
//! the hash family. Defined for hop radius 1 only.

use ahash::AHashMap;
use smallvec::SmallVec;

use streamspot_core::NeighborTriple;

use crate::graph::Graph;

/// First character of every shingle.
pub const SHINGLE_SENTINEL: u8 = b' ';

/// One chunk of shingle text. Inline up to 16 bytes; longer chunk lengths
/// spill to the heap.
pub type Chunk = SmallVec<[u8; 16]>;

/// The full shingle text of a source node with the given outgoing list.
pub fn shingle_text(src_type: u8, outgoing: &[NeighborTriple]) -> Vec<u8> {
    let mut text = Vec::with_capacity(2 * (outgoing.len() + 1));
    text.push(SHINGLE_SENTINEL);
    text.push(src_type);
    for t in outgoing {
        text.push(t.edge_type);
        text.push(t.dst_type);
    }
    text
}

/// Split `text` into consecutive `chunk_length`-sized chunks; the final
/// chunk keeps whatever remains (length in `1..=chunk_length`).
pub fn chunks(text: &[u8], chunk_length: usize) -> impl Iterator<Item = &[u8]> {
    text.chunks(chunk_length)
}

/// The last `len` characters of the shingle, without materializing the rest.
///
/// The incremental update only ever needs the tail (at most the last chunk
/// plus one full chunk before it), so the text is reconstructed positionally
/// from the adjacency list.
pub fn shingle_suffix(src_type: u8, outgoing: &[NeighborTriple], len: usize) -> Chunk {
    let total = 2 * (outgoing.len() + 1);
    let len = len.min(total);
    let mut tail = Chunk::new();
    for pos in total - len..total {
        tail.push(match pos {
            0 => SHINGLE_SENTINEL,
            1 => src_type,
            _ => {
                let t = &outgoing[(pos - 2) / 2];
                if (pos - 2) % 2 == 0 {
                    t.edge_type
                } else {
                    t.dst_type
                }
            }
        });
    }
    tail
}

/// Chunk occurrence counts across a whole graph.
///
/// Cold construction only: builds every source node's shingle, splits it,
/// and counts chunks. The streaming path never calls this; it exists for
/// bootstrap and for verifying the incremental updates.
pub fn shingle_counts(graph: &Graph, chunk_length: usize) -> AHashMap<Vec<u8>, u32> {
    let mut counts = AHashMap::new();
    for (&(_, src_type), outgoing) in graph.sources() {
        let text = shingle_text(src_type, outgoing);
        for chunk in chunks(&text, chunk_length) {
            *counts.entry(chunk.to_vec()).or_insert(0) += 1;
        }
    }
    counts
}
