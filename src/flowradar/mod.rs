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

//! FlowRadar: invertible flow accounting.
//!
//! Where Count-Min answers "roughly how big is this flow", FlowRadar can
//! answer "which flows were there, exactly how big were they" — as long as
//! the number of inserted flows stays within the counting table's
//! decodable load. Decoding peels cells containing a single flow and
//! cancels that flow out of its other cells, the same singleton-peeling
//! that underlies invertible Bloom lookup tables.
//!
//! # Usage
//!
//! ```rust
//! use flowsketch::flowradar::FlowRadar;
//! use flowsketch::flowkey::FlowKey;
//! use flowsketch::sketch::Sketch;
//!
//! let mut radar = FlowRadar::new(13, 1 << 14, 5, 1024, 3, 9001).unwrap();
//! let key = FlowKey::from_5_tuple(0x0a000001, 0x0a000002, 1234, 80, 6);
//!
//! radar.update(&key, 40).unwrap();
//!
//! let decoded = radar.decode();
//! assert!(decoded.is_complete());
//! assert_eq!(decoded.flows(), &[(key, 40)]);
//! ```

mod sketch;

pub use self::sketch::DecodedFlows;
pub use self::sketch::FlowRadar;
