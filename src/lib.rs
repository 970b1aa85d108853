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

//! Compact sketches for per-flow network traffic measurement.
//!
//! A measurement point sees a stream of packets, each attributed to a
//! flow by a fixed-length key (typically the 13-byte 5-tuple). Tracking
//! every flow exactly is too expensive at line rate, so the structures
//! here trade bounded memory for controlled estimation error:
//!
//! - [`bloom`]: membership filters, plain and counting.
//! - [`countmin`]: Count-Min and conservative-update per-flow counters.
//! - [`countsketch`]: unbiased signed-median frequency estimation.
//! - [`flowradar`]: invertible accounting that recovers exact per-flow
//!   counts by decoding.
//! - [`hashpipe`]: heavy-hitter tracking with exact keys.
//! - [`hierarchy`]: bit-packed multi-layer counter storage shared by the
//!   counter-array sketches.
//! - [`eval`]: ground-truth bookkeeping and accuracy metrics.
//!
//! All sketches take keys as [`flowkey::FlowKey`], hash them with seeded
//! MurmurHash3 ([`hash`]), implement the common [`sketch::Sketch`]
//! interface, and report failures through [`error::Error`].
//!
//! # Usage
//!
//! ```rust
//! use flowsketch::countmin::CmSketch;
//! use flowsketch::flowkey::{FIVE_TUPLE_KEY_LEN, FlowKey};
//! use flowsketch::sketch::Sketch;
//!
//! let mut cm = CmSketch::new(4, 2048, FIVE_TUPLE_KEY_LEN, 9001).unwrap();
//! let key = FlowKey::from_5_tuple(0x0a000001, 0x0a000002, 49152, 443, 6);
//!
//! cm.update(&key, 3).unwrap();
//! cm.update(&key, 2).unwrap();
//!
//! // Count-Min never underestimates.
//! assert!(cm.query(&key).unwrap() >= 5);
//! ```

pub mod bloom;
pub mod common;
pub mod countmin;
pub mod countsketch;
pub mod error;
pub mod eval;
pub mod flowkey;
pub mod flowradar;
pub mod hash;
pub mod hashpipe;
pub mod hierarchy;
pub mod sketch;
