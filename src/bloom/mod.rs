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

//! Bloom filters over flow keys: plain bits and saturating counters.
//!
//! # Usage
//!
//! ```rust
//! use flowsketch::bloom::BloomFilter;
//! use flowsketch::flowkey::FlowKey;
//!
//! let mut filter = BloomFilter::new(1 << 14, 7, 13, 9001).unwrap();
//! let key = FlowKey::from_5_tuple(0x0a000001, 0x0a000002, 1234, 80, 6);
//!
//! filter.insert(&key).unwrap();
//! assert!(filter.contains(&key).unwrap());
//! ```

mod counting;
mod sketch;

pub use self::counting::CountingBloomFilter;
pub use self::sketch::BloomFilter;
