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

//! Per-edge sketch update benchmarks: the chunk-delta derivation plus the
//! projection update must stay flat as fanout grows.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use streamspot_core::NeighborTriple;
use streamspot_index::{append_delta, HashFamily, StreamSketch};

fn outgoing(fanout: usize) -> Vec<NeighborTriple> {
    (0..fanout)
        .map(|i| NeighborTriple {
            dst_id: i as u64,
            dst_type: b'B' + (i % 4) as u8,
            edge_type: b'X' + (i % 3) as u8,
        })
        .collect()
}

fn bench_append_delta(c: &mut Criterion) {
    let family = HashFamily::generate(1000, 8, 23);
    let mut group = c.benchmark_group("append_delta");
    for fanout in [1usize, 8, 64, 512] {
        let list = outgoing(fanout);
        group.bench_function(format!("fanout_{fanout}"), |b| {
            b.iter(|| append_delta(&family, black_box(b'A'), black_box(&list), 8))
        });
    }
    group.finish();
}

fn bench_apply_delta(c: &mut Criterion) {
    let family = HashFamily::generate(1000, 8, 23);
    let list = outgoing(16);
    let delta = append_delta(&family, b'A', &list, 8);
    let mut sketch = StreamSketch::new(1000);
    c.bench_function("apply_delta_1000_bits", |b| {
        b.iter(|| sketch.apply_delta(black_box(&delta)))
    });
}

criterion_group!(benches, bench_append_delta, bench_apply_delta);
criterion_main!(benches);
