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

//! Error types
//!
//! Nothing is retried and nothing is recovered once streaming has begun:
//! malformed input is either skipped or fatal per the configured policy, and
//! every other error aborts the run with a diagnostic.

use thiserror::Error;

/// Errors surfaced by the streaming engine and its readers.
#[derive(Debug, Error)]
pub enum StreamSpotError {
    /// Malformed edge or bootstrap line.
    #[error("malformed input at line {line}: {reason}")]
    BadInput { line: u64, reason: String },

    /// A training gid listed in the bootstrap file owns no edges.
    #[error("training graph {gid} has no edges at bootstrap completion")]
    UnknownGraphInBootstrap { gid: u64 },

    /// An internal invariant was broken; the process must abort.
    #[error("invariant violated: {0}")]
    InvariantViolated(String),

    /// A startup parameter is outside its legal range.
    #[error("parameter out of range: {0}")]
    ParameterOutOfRange(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl StreamSpotError {
    pub fn bad_input(line: u64, reason: impl Into<String>) -> Self {
        Self::BadInput {
            line,
            reason: reason.into(),
        }
    }

    /// True when the error may be skipped under the lenient input policy.
    pub fn is_skippable(&self) -> bool {
        matches!(self, Self::BadInput { .. })
    }
}

pub type Result<T> = std::result::Result<T, StreamSpotError>;
