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

//! Count-Min sketch and its conservative-update variant.
//!
//! Both estimate per-flow frequencies with one-sided error: the reported
//! count is never below the true count. The conservative-update variant
//! trades a read-before-write on every update for tighter over-estimation
//! at the same memory.
//!
//! # Usage
//!
//! ```rust
//! use flowsketch::countmin::CmSketch;
//! use flowsketch::flowkey::FlowKey;
//! use flowsketch::sketch::Sketch;
//!
//! let mut sketch = CmSketch::new(4, 2048, 13, 9001).unwrap();
//! let key = FlowKey::from_5_tuple(0x0a000001, 0x0a000002, 1234, 80, 6);
//!
//! sketch.update(&key, 3).unwrap();
//! assert!(sketch.estimate(&key).unwrap() >= 3);
//! ```
//!
//! Counters can be stored bit-packed through a
//! [`CounterHierarchy`](crate::hierarchy::CounterHierarchy):
//!
//! ```rust
//! use flowsketch::countmin::CuSketch;
//!
//! // 4-bit base cells, promotion into 8- and 20-bit layers.
//! let sketch = CuSketch::with_hierarchy(4, 2048, 13, &[4, 8, 20], 0.25, 9001).unwrap();
//! ```

mod sketch;

pub use self::sketch::CmSketch;
pub use self::sketch::CuSketch;
