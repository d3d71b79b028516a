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

//! Multilinear hash family
//!
//! `L` strongly-universal string hashes into `{-1, +1}`, each defined by
//! `chunk_length + 2` random 64-bit words drawn once from a seeded PRNG.
//! Independence across rows comes from the PRNG; the family is generated
//! before the first edge and never regenerated.
//!
//! Reference: Owen Kaser and Daniel Lemire, "Strongly universal string
//! hashing is fast", Computer Journal, 2014.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Hash a chunk to `-1` or `+1` with one row of random words.
///
/// `sum = words[0] + Σ words[i+1] * chunk[i]` in wrapping 64-bit arithmetic;
/// the sign is the most significant bit. Chunks shorter than the row's
/// capacity use only their first `len + 1` words; the remainder is never
/// read.
pub fn multilinear_sign(words: &[u64], chunk: &[u8]) -> i64 {
    debug_assert!(chunk.len() + 1 <= words.len());
    let mut sum = words[0];
    for (i, &b) in chunk.iter().enumerate() {
        sum = sum.wrapping_add(words[i + 1].wrapping_mul(u64::from(b)));
    }
    2 * ((sum >> 63) & 1) as i64 - 1
}

/// The process-wide family of `L` hash rows.
///
/// Read-only after construction; rows are indexed by sketch bit.
#[derive(Debug, Clone)]
pub struct HashFamily {
    rows: Vec<Vec<u64>>,
}

impl HashFamily {
    /// Draw `rows` rows of `chunk_length + 2` words from a seeded PRNG.
    pub fn generate(rows: u32, chunk_length: u32, seed: u64) -> Self {
        let mut prng = StdRng::seed_from_u64(seed);
        let width = chunk_length as usize + 2;
        let rows = (0..rows)
            .map(|_| (0..width).map(|_| prng.gen::<u64>()).collect())
            .collect();
        Self { rows }
    }

    /// Number of rows, equal to the sketch width `L`.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The sign of `chunk` under row `row`.
    pub fn sign(&self, row: usize, chunk: &[u8]) -> i64 {
        multilinear_sign(&self.rows[row], chunk)
    }

    /// Add `weight * sign(chunk)` into `acc` for every row.
    ///
    /// `acc.len()` must equal the family length; this is the single hot path
    /// of each edge update.
    pub fn accumulate(&self, chunk: &[u8], weight: i64, acc: &mut [i64]) {
        debug_assert_eq!(acc.len(), self.rows.len());
        for (slot, words) in acc.iter_mut().zip(&self.rows) {
            *slot += weight * multilinear_sign(words, chunk);
        }
    }
}
