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

//! StreamSpot CLI
//!
//! Reads the bootstrap clusters file and the edge stream, replays the
//! training edges, then streams the remaining edges through the detector,
//! emitting one score record per edge (TSV by default, JSON lines with
//! `--json`) and the captured state snapshots at the end.

use anyhow::{Context, Result};
use clap::Parser;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use tracing::{info, Level};

use streamspot_core::{
    read_bootstrap_file, BadInputPolicy, Edge, EdgeReader, IdMode, StreamParams,
};
use streamspot_detect::{RecordSink, ScoreRecord, StateSnapshot, StreamEngine};

#[derive(Parser)]
#[command(name = "streamspot")]
#[command(about = "Streaming anomaly detection over typed graph edges", long_about = None)]
struct Cli {
    /// Edge file (TSV: src_id, src_type, dst_id, dst_type, edge_type, gid),
    /// or "-" for stdin
    #[arg(long, default_value = "-")]
    edges: PathBuf,

    /// Bootstrap clusters file
    #[arg(long)]
    bootstrap: PathBuf,

    /// Sketch width in bits; must equal bands * band-bits
    #[arg(long, default_value_t = 1000)]
    sketch_bits: u32,

    /// Band count (shared with the batch banding pipeline's parameters)
    #[arg(long, default_value_t = 20)]
    bands: u32,

    /// Bits per band
    #[arg(long, default_value_t = 50)]
    band_bits: u32,

    /// Chunk length for shingle splitting (at least 4)
    #[arg(long, default_value_t = 8)]
    chunk_length: u32,

    /// PRNG seed for the hash family
    #[arg(long, default_value_t = 23)]
    seed: u64,

    /// Edge cache capacity; 0 disables the cache
    #[arg(long, default_value_t = 0)]
    cache_capacity: usize,

    /// Edges between state snapshots; 0 disables snapshots
    #[arg(long, default_value_t = 1000)]
    snapshot_interval: u64,

    /// Treat node identifiers as opaque tokens and intern them
    #[arg(long)]
    intern_ids: bool,

    /// Skip malformed edge lines instead of aborting
    #[arg(long)]
    skip_bad_input: bool,

    /// Origin tag stamped on every emitted record
    #[arg(long, default_value = "streamspot")]
    origin: String,

    /// Emit records as JSON lines instead of TSV
    #[arg(long)]
    json: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .init();

    let params = StreamParams {
        sketch_bits: cli.sketch_bits,
        bands: cli.bands,
        band_bits: cli.band_bits,
        chunk_length: cli.chunk_length,
        seed: cli.seed,
        cache_capacity: cli.cache_capacity,
        snapshot_interval: cli.snapshot_interval,
        bad_input: if cli.skip_bad_input {
            BadInputPolicy::Skip
        } else {
            BadInputPolicy::Fatal
        },
        ..Default::default()
    };

    let boot = read_bootstrap_file(&cli.bootstrap, Some(params.chunk_length))
        .with_context(|| format!("failed to read bootstrap file {:?}", cli.bootstrap))?;
    let train_gids: std::collections::HashSet<u64> = boot.train_gids().collect();
    info!(
        clusters = boot.clusters.len(),
        training_graphs = train_gids.len(),
        "bootstrap file loaded"
    );

    let mode = if cli.intern_ids {
        IdMode::Interned
    } else {
        IdMode::Numeric
    };
    let (train_edges, stream_edges) =
        load_edges(&cli.edges, mode, &train_gids, params.bad_input)
            .with_context(|| format!("failed to read edge file {:?}", cli.edges))?;
    info!(
        training_edges = train_edges.len(),
        stream_edges = stream_edges.len(),
        "edge input loaded"
    );

    let mut engine = StreamEngine::new(params, cli.origin.clone())
        .context("invalid startup parameters")?;
    for e in &train_edges {
        engine.load_training_edge(e);
    }
    engine
        .bootstrap(&boot)
        .context("bootstrap construction failed")?;

    let stop = AtomicBool::new(false);
    let mut sink = StdoutSink::new(cli.json);
    let summary = engine
        .stream(stream_edges, &stop, &mut sink)
        .context("stream processing failed")?;
    sink.finish().context("failed to flush output")?;

    info!(
        processed = summary.edges_processed,
        skipped = summary.edges_skipped,
        evictions = summary.stats.evictions,
        "done"
    );
    Ok(())
}

/// Read the whole edge input, splitting training edges (gids listed in the
/// bootstrap file) from the edges to be streamed, in file order.
///
/// Malformed lines are fatal here under the default policy; under the
/// lenient policy they are forwarded to the driver, which logs and counts
/// them.
fn load_edges(
    path: &Path,
    mode: IdMode,
    train_gids: &std::collections::HashSet<u64>,
    policy: BadInputPolicy,
) -> Result<(Vec<Edge>, Vec<streamspot_core::Result<Edge>>)> {
    let input: Box<dyn BufRead> = if path == Path::new("-") {
        Box::new(BufReader::new(io::stdin()))
    } else {
        Box::new(BufReader::new(
            File::open(path).with_context(|| format!("cannot open {path:?}"))?,
        ))
    };

    let mut train_edges = Vec::new();
    let mut stream_edges = Vec::new();
    for item in EdgeReader::new(input, mode) {
        match item {
            Ok(e) if train_gids.contains(&e.gid) => train_edges.push(e),
            Ok(e) => stream_edges.push(Ok(e)),
            Err(err) if policy == BadInputPolicy::Skip => stream_edges.push(Err(err)),
            Err(err) => return Err(err.into()),
        }
    }
    Ok((train_edges, stream_edges))
}

/// Writes records to stdout as they arrive and holds snapshots back until
/// the stream has ended, the way the batch tooling expects them.
struct StdoutSink {
    out: BufWriter<io::Stdout>,
    json: bool,
    snapshots: Vec<StateSnapshot>,
}

impl StdoutSink {
    fn new(json: bool) -> Self {
        Self {
            out: BufWriter::new(io::stdout()),
            json,
            snapshots: Vec::new(),
        }
    }

    /// Dump the captured snapshots and flush.
    fn finish(mut self) -> Result<()> {
        for snapshot in &self.snapshots {
            if self.json {
                serde_json::to_writer(&mut self.out, snapshot)?;
                writeln!(self.out)?;
            } else {
                writeln!(self.out, "# snapshot {}", snapshot.edge_num)?;
                for entry in &snapshot.entries {
                    writeln!(
                        self.out,
                        "{}\t{:.6}\t{}",
                        entry.gid, entry.anomaly_score, entry.cluster
                    )?;
                }
            }
        }
        self.out.flush()?;
        Ok(())
    }
}

impl RecordSink for StdoutSink {
    fn record(&mut self, record: &ScoreRecord) -> streamspot_core::Result<()> {
        if self.json {
            serde_json::to_writer(&mut self.out, record)
                .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
            writeln!(self.out)?;
        } else {
            writeln!(self.out, "{}", record.tsv())?;
        }
        Ok(())
    }

    fn snapshot(&mut self, snapshot: &StateSnapshot) -> streamspot_core::Result<()> {
        self.snapshots.push(snapshot.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_edges_splits_train_and_stream() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        writeln!(tmp, "0\tA\t1\tB\tX\t99").unwrap();
        writeln!(tmp, "0\tA\t1\tB\tX\t7").unwrap();
        writeln!(tmp, "2\tA\t3\tC\tY\t99").unwrap();

        let train_gids = std::collections::HashSet::from([99]);
        let (train, stream) =
            load_edges(tmp.path(), IdMode::Numeric, &train_gids, BadInputPolicy::Fatal).unwrap();
        assert_eq!(train.len(), 2);
        assert_eq!(stream.len(), 1);
        assert_eq!(stream[0].as_ref().unwrap().gid, 7);
    }

    #[test]
    fn test_load_edges_fatal_on_malformed_by_default() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        writeln!(tmp, "0\tA\t1\tB\tX\t99").unwrap();
        writeln!(tmp, "not an edge").unwrap();

        let train_gids = std::collections::HashSet::from([99]);
        assert!(
            load_edges(tmp.path(), IdMode::Numeric, &train_gids, BadInputPolicy::Fatal).is_err()
        );
        let (_, stream) =
            load_edges(tmp.path(), IdMode::Numeric, &train_gids, BadInputPolicy::Skip).unwrap();
        assert_eq!(stream.len(), 1);
        assert!(stream[0].is_err());
    }
}
