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

//! Incremental chunk deltas
//!
//! Appending one edge appends exactly two characters to its source node's
//! shingle, so only the final chunk boundary can move: at most two chunks
//! are gained and at most one is lost, whatever the graph's size. This
//! module derives that minimal add/remove set from the post-append adjacency
//! list and folds it into an `L`-wide projection delta.
//!
//! The same derivation, negated, reverses the most recent append for a
//! source — which is how cache eviction rolls a sketch back.

use smallvec::SmallVec;

use streamspot_core::NeighborTriple;

use crate::hash::HashFamily;
use crate::shingle::{shingle_suffix, Chunk};

/// Chunks gained and lost by one edge append.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChunkDelta {
    pub added: SmallVec<[Chunk; 2]>,
    pub removed: SmallVec<[Chunk; 1]>,
}

/// Derive the chunk delta for the edge that produced the last triple of
/// `outgoing`.
///
/// `outgoing` is the source's list *after* the append, so its length `n` is
/// at least 1 and the shingle length is `S = 2 * (n + 1)`. With
/// `last_len = ((S - 1) % C) + 1` the cases are:
///
/// - first edge for this source (`n == 1`): the whole 4-character shingle is
///   one new chunk (chunk length is validated to be at least 4);
/// - `last_len == 2`: the two appended characters form a complete new chunk
///   by themselves;
/// - `last_len == 1`: the appended characters straddle a chunk boundary; the
///   previous last chunk gains its final character (remove the short form,
///   add the filled form) and a new single-character chunk appears;
/// - otherwise: the last chunk grew by two characters (remove the short
///   form, add the grown form).
pub fn tail_chunk_delta(
    src_type: u8,
    outgoing: &[NeighborTriple],
    chunk_length: usize,
) -> ChunkDelta {
    debug_assert!(!outgoing.is_empty());
    debug_assert!(chunk_length >= 4);

    let shingle_len = 2 * (outgoing.len() + 1);
    let last_len = (shingle_len - 1) % chunk_length + 1;
    let mut delta = ChunkDelta::default();

    if outgoing.len() == 1 {
        delta
            .added
            .push(shingle_suffix(src_type, outgoing, shingle_len));
        return delta;
    }

    match last_len {
        2 => {
            delta.added.push(shingle_suffix(src_type, outgoing, 2));
        }
        1 => {
            let tail = shingle_suffix(src_type, outgoing, chunk_length + 1);
            let filled = Chunk::from_slice(&tail[..chunk_length]);
            let new_last = Chunk::from_slice(&tail[chunk_length..]);
            delta.removed.push(Chunk::from_slice(&filled[..chunk_length - 1]));
            delta.added.push(filled);
            delta.added.push(new_last);
        }
        _ => {
            let grown = shingle_suffix(src_type, outgoing, last_len);
            delta.removed.push(Chunk::from_slice(&grown[..last_len - 2]));
            delta.added.push(grown);
        }
    }
    delta
}

/// The `L`-wide projection delta for the edge that produced the last triple
/// of `outgoing`: `Σ added hashes − Σ removed hashes` per row.
pub fn append_delta(
    family: &HashFamily,
    src_type: u8,
    outgoing: &[NeighborTriple],
    chunk_length: usize,
) -> Vec<i64> {
    let chunks = tail_chunk_delta(src_type, outgoing, chunk_length);
    let mut delta = vec![0i64; family.len()];
    for chunk in &chunks.added {
        family.accumulate(chunk, 1, &mut delta);
    }
    for chunk in &chunks.removed {
        family.accumulate(chunk, -1, &mut delta);
    }
    delta
}
