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

//! Input readers
//!
//! Two line-oriented formats feed the engine:
//!
//! - the edge stream, `src_id\tsrc_type\tdst_id\tdst_type\tedge_type\tgid`,
//!   one edge per line, with node identifiers either decimal integers or
//!   opaque tokens interned to dense ids;
//! - the bootstrap clusters file, a `nclusters global_threshold
//!   [chunk_length]` header followed by one `threshold gid gid ...` line per
//!   cluster.

use ahash::AHashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::edge::Edge;
use crate::error::{Result, StreamSpotError};

/// Field separator of the edge stream.
pub const EDGE_DELIMITER: char = '\t';

/// How node identifiers in the edge stream are interpreted.
///
/// The choice is made once per deployment; mixing modes within one stream
/// would alias interned ids with literal ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdMode {
    /// Identifiers are decimal `u64` values.
    #[default]
    Numeric,
    /// Identifiers are opaque tokens, mapped to dense ids on first sight.
    Interned,
}

/// Allocates dense `u64` ids for opaque node tokens in arrival order.
#[derive(Debug, Default)]
pub struct NodeInterner {
    ids: AHashMap<String, u64>,
}

impl NodeInterner {
    pub fn new() -> Self {
        Self::default()
    }

    /// The id for `token`, allocating the next dense id on first sight.
    pub fn intern(&mut self, token: &str) -> u64 {
        let next = self.ids.len() as u64;
        *self.ids.entry(token.to_owned()).or_insert(next)
    }

    /// Number of distinct tokens seen so far.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Streaming reader over an edge file or pipe.
///
/// Yields one `Result<Edge>` per input line; the caller decides whether a
/// [`StreamSpotError::BadInput`] is skipped or fatal.
pub struct EdgeReader<R: BufRead> {
    input: R,
    mode: IdMode,
    interner: NodeInterner,
    line_no: u64,
    buf: String,
}

impl EdgeReader<BufReader<File>> {
    /// Open an edge file on disk.
    pub fn open(path: impl AsRef<Path>, mode: IdMode) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self::new(BufReader::new(file), mode))
    }
}

impl<R: BufRead> EdgeReader<R> {
    pub fn new(input: R, mode: IdMode) -> Self {
        Self {
            input,
            mode,
            interner: NodeInterner::new(),
            line_no: 0,
            buf: String::new(),
        }
    }

    /// 1-based number of the most recently read line.
    pub fn line_no(&self) -> u64 {
        self.line_no
    }

    fn parse_id(&mut self, field: &str, line: u64) -> Result<u64> {
        match self.mode {
            IdMode::Numeric => field.parse::<u64>().map_err(|_| {
                StreamSpotError::bad_input(line, format!("invalid node id {field:?}"))
            }),
            IdMode::Interned => Ok(self.interner.intern(field)),
        }
    }

    fn parse_line(&mut self, line: u64) -> Result<Edge> {
        // Split without allocating; the interner copies only novel tokens.
        let raw = std::mem::take(&mut self.buf);
        let parsed = (|| {
            let mut fields = raw.trim_end_matches(['\n', '\r']).split(EDGE_DELIMITER);
            let mut next = |name: &str| {
                fields
                    .next()
                    .ok_or_else(|| StreamSpotError::bad_input(line, format!("missing {name}")))
            };

            let src_id = next("source id")?.to_owned();
            let src_type = single_token(next("source type")?, line, "source type")?;
            let dst_id = next("destination id")?.to_owned();
            let dst_type = single_token(next("destination type")?, line, "destination type")?;
            let edge_type = single_token(next("edge type")?, line, "edge type")?;
            let gid_field = next("graph id")?;
            let gid = gid_field.parse::<u64>().map_err(|_| {
                StreamSpotError::bad_input(line, format!("invalid graph id {gid_field:?}"))
            })?;
            if fields.next().is_some() {
                return Err(StreamSpotError::bad_input(line, "expected 6 fields"));
            }

            let src_id = self.parse_id(&src_id, line)?;
            let dst_id = self.parse_id(&dst_id, line)?;
            Ok(Edge::new(src_id, src_type, dst_id, dst_type, edge_type, gid))
        })();
        self.buf = raw;
        parsed
    }
}

impl<R: BufRead> Iterator for EdgeReader<R> {
    type Item = Result<Edge>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.buf.clear();
            match self.input.read_line(&mut self.buf) {
                Ok(0) => return None,
                Ok(_) => {
                    self.line_no += 1;
                    if self.buf.trim().is_empty() {
                        continue; // tolerate blank lines
                    }
                    let line = self.line_no;
                    return Some(self.parse_line(line));
                }
                Err(e) => return Some(Err(e.into())),
            }
        }
    }
}

fn single_token(field: &str, line: u64, name: &str) -> Result<u8> {
    let bytes = field.as_bytes();
    if bytes.len() != 1 {
        return Err(StreamSpotError::bad_input(
            line,
            format!("{name} must be a single code unit, got {field:?}"),
        ));
    }
    Ok(bytes[0])
}

/// One reference cluster from the bootstrap file.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterSpec {
    /// Per-cluster anomaly threshold learned offline.
    pub threshold: f64,
    /// Member graph ids.
    pub members: Vec<u64>,
}

/// Parsed bootstrap clusters file.
#[derive(Debug, Clone, PartialEq)]
pub struct BootstrapClusters {
    /// Global anomaly threshold from the header.
    pub global_threshold: f64,
    /// Chunk length from the three-field header variant, when present.
    pub chunk_length: Option<u32>,
    /// The fixed reference cluster set, in file order.
    pub clusters: Vec<ClusterSpec>,
}

impl BootstrapClusters {
    /// All training gids across every cluster, in file order.
    pub fn train_gids(&self) -> impl Iterator<Item = u64> + '_ {
        self.clusters.iter().flat_map(|c| c.members.iter().copied())
    }
}

/// Read a bootstrap clusters file from disk.
///
/// Both header variants are accepted. When the header carries a chunk length
/// and `expected_chunk_length` is given, the two must agree; a mismatch would
/// silently re-interpret every sketch built with the configured hash family.
pub fn read_bootstrap_file(
    path: impl AsRef<Path>,
    expected_chunk_length: Option<u32>,
) -> Result<BootstrapClusters> {
    let file = File::open(path)?;
    read_bootstrap(BufReader::new(file), expected_chunk_length)
}

/// Read a bootstrap clusters file from any buffered reader.
pub fn read_bootstrap(
    input: impl BufRead,
    expected_chunk_length: Option<u32>,
) -> Result<BootstrapClusters> {
    let mut lines = input.lines();
    let header = lines
        .next()
        .ok_or_else(|| StreamSpotError::bad_input(1, "empty bootstrap file"))??;
    let fields: Vec<&str> = header.split_whitespace().collect();
    if fields.len() != 2 && fields.len() != 3 {
        return Err(StreamSpotError::bad_input(
            1,
            format!("header must have 2 or 3 fields, got {}", fields.len()),
        ));
    }

    let nclusters: usize = fields[0]
        .parse()
        .map_err(|_| StreamSpotError::bad_input(1, "invalid cluster count"))?;
    let global_threshold: f64 = fields[1]
        .parse()
        .map_err(|_| StreamSpotError::bad_input(1, "invalid global threshold"))?;
    let chunk_length = match fields.get(2) {
        Some(f) => Some(
            f.parse::<u32>()
                .map_err(|_| StreamSpotError::bad_input(1, "invalid chunk length"))?,
        ),
        None => None,
    };
    if let (Some(got), Some(expected)) = (chunk_length, expected_chunk_length) {
        if got != expected {
            return Err(StreamSpotError::bad_input(
                1,
                format!("bootstrap chunk length {got} disagrees with configured {expected}"),
            ));
        }
    }

    let mut clusters = Vec::with_capacity(nclusters);
    for i in 0..nclusters {
        let line_no = i as u64 + 2;
        let line = lines.next().ok_or_else(|| {
            StreamSpotError::bad_input(line_no, format!("expected {nclusters} cluster lines"))
        })??;
        let mut fields = line.split_whitespace();
        let threshold: f64 = fields
            .next()
            .ok_or_else(|| StreamSpotError::bad_input(line_no, "missing cluster threshold"))?
            .parse()
            .map_err(|_| StreamSpotError::bad_input(line_no, "invalid cluster threshold"))?;
        let mut members = Vec::new();
        for f in fields {
            members.push(f.parse::<u64>().map_err(|_| {
                StreamSpotError::bad_input(line_no, format!("invalid member gid {f:?}"))
            })?);
        }
        if members.is_empty() {
            return Err(StreamSpotError::bad_input(
                line_no,
                "cluster has no members",
            ));
        }
        clusters.push(ClusterSpec { threshold, members });
    }

    Ok(BootstrapClusters {
        global_threshold,
        chunk_length,
        clusters,
    })
}
