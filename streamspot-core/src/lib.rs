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

//! StreamSpot Core
//!
//! Fundamental data types for the streaming graph anomaly detector: the edge
//! record, startup parameters, error types, and the readers for the two
//! external file formats (edge stream and bootstrap clusters).

pub mod edge;
pub mod error;
pub mod io;
pub mod params;

pub use edge::{Edge, NeighborTriple, SourceKey};
pub use error::{Result, StreamSpotError};
pub use io::{
    read_bootstrap, read_bootstrap_file, BootstrapClusters, ClusterSpec, EdgeReader, IdMode,
    NodeInterner,
};
pub use params::{BadInputPolicy, StreamParams, HOP_RADIUS};
