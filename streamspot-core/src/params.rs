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

//! Startup parameters
//!
//! Everything the engine needs to know before the first edge: sketch width,
//! banding shape, chunk length, PRNG seed, cache capacity, and the input
//! policy. All of it is fixed at startup and never mutated mid-stream.

use serde::{Deserialize, Serialize};

use crate::error::{Result, StreamSpotError};

/// Neighborhood hop radius supported by the incremental update.
///
/// The delta derivation reasons about the last two chunks of a source node's
/// shingle, which is only valid when one edge appends exactly two characters
/// of shingle text. Radius 1 is the only configuration that satisfies this.
pub const HOP_RADIUS: u32 = 1;

/// Default sketch width in bits.
pub const DEFAULT_SKETCH_BITS: u32 = 1000;

/// Default band count for deployments sharing parameters with the batch
/// banding pipeline. `sketch_bits` must equal `bands * band_bits`.
pub const DEFAULT_BANDS: u32 = 20;

/// Default bits per band.
pub const DEFAULT_BAND_BITS: u32 = 50;

/// Default chunk length for splitting shingles.
pub const DEFAULT_CHUNK_LENGTH: u32 = 8;

/// Default PRNG seed for the hash family.
pub const DEFAULT_SEED: u64 = 23;

/// Default number of edges between state snapshots.
pub const DEFAULT_SNAPSHOT_INTERVAL: u64 = 1000;

/// What to do with a malformed edge line once streaming has begun.
///
/// Startup-time input (bootstrap file, training edges) is always fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BadInputPolicy {
    /// Abort the run (default).
    #[default]
    Fatal,
    /// Log a warning and continue with the next line.
    Skip,
}

/// Engine configuration, validated once before any edge is consumed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamParams {
    /// Sketch width `L` in bits; must equal `bands * band_bits`.
    pub sketch_bits: u32,
    /// Band count `B` (used only to validate the banding shape).
    pub bands: u32,
    /// Bits per band `R`.
    pub band_bits: u32,
    /// Chunk length `C` for shingle splitting; must be at least 4 so the
    /// first edge of a source always fits a single chunk.
    pub chunk_length: u32,
    /// Seed for the hash-family PRNG.
    pub seed: u64,
    /// Edge-cache capacity `W`; 0 disables the cache.
    pub cache_capacity: usize,
    /// Edges between driver-side state snapshots; 0 disables snapshots.
    pub snapshot_interval: u64,
    /// Neighborhood hop radius; only [`HOP_RADIUS`] is accepted.
    pub hop_radius: u32,
    /// Policy for malformed edge lines at stream time.
    pub bad_input: BadInputPolicy,
}

impl Default for StreamParams {
    fn default() -> Self {
        Self {
            sketch_bits: DEFAULT_SKETCH_BITS,
            bands: DEFAULT_BANDS,
            band_bits: DEFAULT_BAND_BITS,
            chunk_length: DEFAULT_CHUNK_LENGTH,
            seed: DEFAULT_SEED,
            cache_capacity: 0,
            snapshot_interval: DEFAULT_SNAPSHOT_INTERVAL,
            hop_radius: HOP_RADIUS,
            bad_input: BadInputPolicy::Fatal,
        }
    }
}

impl StreamParams {
    /// Check every range constraint; fatal at startup on the first failure.
    pub fn validate(&self) -> Result<()> {
        if self.sketch_bits == 0 {
            return Err(StreamSpotError::ParameterOutOfRange(
                "sketch_bits must be positive".into(),
            ));
        }
        if self.sketch_bits != self.bands * self.band_bits {
            return Err(StreamSpotError::InvariantViolated(format!(
                "sketch_bits ({}) must equal bands * band_bits ({} * {})",
                self.sketch_bits, self.bands, self.band_bits
            )));
        }
        if self.chunk_length < 4 {
            return Err(StreamSpotError::ParameterOutOfRange(format!(
                "chunk_length must be at least 4, got {}",
                self.chunk_length
            )));
        }
        if self.hop_radius != HOP_RADIUS {
            return Err(StreamSpotError::ParameterOutOfRange(format!(
                "hop_radius {} is unsupported; the incremental update is \
                 defined for radius {} only",
                self.hop_radius, HOP_RADIUS
            )));
        }
        Ok(())
    }

    /// Whether the bounded edge cache is active.
    pub fn cache_enabled(&self) -> bool {
        self.cache_capacity > 0
    }
}
