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

use flowsketch::error::ErrorKind;
use flowsketch::eval::GroundTruth;
use flowsketch::flowkey::FIVE_TUPLE_KEY_LEN;
use flowsketch::flowkey::FlowKey;
use flowsketch::flowradar::FlowRadar;
use flowsketch::sketch::Sketch;
use googletest::assert_that;
use googletest::prelude::ge;
use googletest::prelude::le;

fn key(id: u32) -> FlowKey {
    FlowKey::from_5_tuple(id, !id, 8080, (id % 2048) as u16, 6)
}

#[test]
fn well_provisioned_table_decodes_every_flow() {
    let mut radar = FlowRadar::new(FIVE_TUPLE_KEY_LEN, 1 << 16, 5, 16_384, 3, 9001).unwrap();
    let mut truth = GroundTruth::new();

    // 2000 flows into 16k cells, packets delivered one at a time.
    for id in 0..2000u32 {
        for _ in 0..(id % 7 + 1) {
            radar.update(&key(id), 1).unwrap();
            truth.add(key(id), 1);
        }
    }
    assert_that!(radar.load_factor(), le(0.2));

    let flows = radar.decode_exact().unwrap();
    assert_eq!(flows.len(), truth.flows());
    for (flow, count) in &flows {
        assert_eq!(*count, truth.count(flow), "flow {flow:?}");
    }
}

#[test]
fn query_without_decode_upper_bounds_the_flow() {
    let mut radar = FlowRadar::new(FIVE_TUPLE_KEY_LEN, 1 << 14, 5, 1024, 3, 1).unwrap();
    for id in 0..200u32 {
        radar.update(&key(id), 5).unwrap();
    }
    for id in 0..200u32 {
        assert_that!(radar.query(&key(id)).unwrap(), ge(5));
    }
    assert_eq!(radar.query(&key(50_000)).unwrap(), 0);
}

#[test]
fn overloaded_table_reports_partial_decode() {
    let mut radar = FlowRadar::new(FIVE_TUPLE_KEY_LEN, 1 << 14, 5, 60, 3, 1).unwrap();
    for id in 0..600u32 {
        radar.update(&key(id), 1).unwrap();
    }

    let err = radar.decode_exact().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DecodeIncomplete);

    let decoded = radar.decode();
    assert!(!decoded.is_complete());
    assert_that!(decoded.remaining_cells(), ge(1));
    // Whatever was peeled before the stall is still trustworthy.
    for (flow, count) in decoded.flows() {
        let id = u32::from_be_bytes(flow.as_bytes()[0..4].try_into().unwrap());
        assert!(id < 600);
        assert_eq!(*count, 1);
    }
}
