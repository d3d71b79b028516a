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

//! StreamSpot Index
//!
//! The per-graph structures updated on every edge: the adjacency store used
//! for shingle reconstruction, the multilinear hash family, the StreamHash
//! sketch (projection vector + packed sign bits), and the incremental
//! chunk-delta derivation that keeps sketch updates constant-time.

pub mod graph;
pub mod hash;
pub mod incremental;
pub mod shingle;
pub mod streamhash;

pub use graph::{AdjacencyList, Graph, GraphStore};
pub use hash::{multilinear_sign, HashFamily};
pub use incremental::{append_delta, tail_chunk_delta, ChunkDelta};
pub use shingle::{
    chunks, shingle_counts, shingle_suffix, shingle_text, Chunk, SHINGLE_SENTINEL,
};
pub use streamhash::{SketchBits, StreamSketch};
