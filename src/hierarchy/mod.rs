// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! Hierarchical bit-packed counter storage.
//!
//! A [`CounterHierarchy`] presents a flat array of logical counters while
//! physically storing them in progressively wider, progressively smaller
//! layers. Small counts (the common case in network traffic) live entirely
//! in the narrow base layer; the few heavy counters carry their high-order
//! digits into upper layers reached by overflow promotion.
//!
//! # Usage
//!
//! ```rust
//! use flowsketch::hierarchy::CounterHierarchy;
//!
//! // 1024 counters: 4-bit base, 8-bit middle, 16-bit top.
//! let mut ch = CounterHierarchy::new(1024, &[4, 8, 16], 0.25, 9001).unwrap();
//!
//! ch.increment(17, 100).unwrap();
//! assert_eq!(ch.count(17), 100);
//!
//! // The packed layers are far smaller than 1024 flat 28-bit counters.
//! assert!(ch.size_bytes() < ch.flat_size_bytes());
//! ```

mod packed;
mod sketch;

pub use self::packed::PackedArray;
pub use self::sketch::CounterHierarchy;
