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

//! Bounded edge cache
//!
//! A FIFO of the most recently streamed edges. When full, admitting a new
//! edge evicts from the head, and the engine reverse-applies each evicted
//! edge before appending the new one. Only the head is ever evicted; any
//! reorder would break the forward/reverse composition guarantee.

use smallvec::SmallVec;
use std::collections::VecDeque;

use streamspot_core::Edge;

/// FIFO window over the stream, capacity fixed at startup.
#[derive(Debug, Clone)]
pub struct EdgeCache {
    queue: VecDeque<Edge>,
    capacity: usize,
}

impl EdgeCache {
    /// A cache holding at most `capacity` edges. Capacity 0 is represented
    /// by not constructing a cache at all.
    pub fn new(capacity: usize) -> Self {
        debug_assert!(capacity > 0);
        Self {
            queue: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Enqueue `e`, first evicting head edges until there is room.
    ///
    /// Evicted edges are returned oldest-first; the caller must reverse-apply
    /// them in exactly that order before processing `e`.
    pub fn admit(&mut self, e: Edge) -> SmallVec<[Edge; 1]> {
        let mut evicted = SmallVec::new();
        while self.queue.len() >= self.capacity {
            // queue is non-empty whenever len >= capacity > 0
            if let Some(old) = self.queue.pop_front() {
                evicted.push(old);
            }
        }
        self.queue.push_back(e);
        evicted
    }
}
