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

use flowsketch::countsketch::CountSketch;
use flowsketch::flowkey::FIVE_TUPLE_KEY_LEN;
use flowsketch::flowkey::FlowKey;
use flowsketch::sketch::Sketch;
use googletest::assert_that;
use googletest::prelude::near;

const HEAVY_WEIGHT: u64 = 50_000;

fn key(id: u32) -> FlowKey {
    FlowKey::from_5_tuple(id, id.wrapping_mul(0x9e37_79b9), 53, (id % 512) as u16, 17)
}

#[test]
fn heavy_flow_estimate_is_unbiased_under_noise() {
    let mut cs = CountSketch::new(5, 2048, FIVE_TUPLE_KEY_LEN, 11).unwrap();
    cs.update(&key(0), HEAVY_WEIGHT).unwrap();
    for id in 1..10_000u32 {
        cs.update(&key(id), u64::from(id % 4 + 1)).unwrap();
    }

    // Signed cancellation keeps the median estimate centered on the true
    // count, unlike Count-Min's one-sided inflation.
    let estimate = cs.estimate(&key(0)).unwrap() as f64;
    assert_that!(estimate, near(HEAVY_WEIGHT as f64, 0.05 * HEAVY_WEIGHT as f64));
}

#[test]
fn merged_halves_match_single_pass() {
    let mut left = CountSketch::new(5, 1024, FIVE_TUPLE_KEY_LEN, 3).unwrap();
    let mut right = CountSketch::new(5, 1024, FIVE_TUPLE_KEY_LEN, 3).unwrap();
    let mut whole = CountSketch::new(5, 1024, FIVE_TUPLE_KEY_LEN, 3).unwrap();

    for id in 0..4000u32 {
        let target = if id % 2 == 0 { &mut left } else { &mut right };
        target.update(&key(id), u64::from(id % 8 + 1)).unwrap();
        whole.update(&key(id), u64::from(id % 8 + 1)).unwrap();
    }

    left.merge(&right).unwrap();
    for id in (0..4000u32).step_by(97) {
        assert_eq!(
            left.raw_estimate(&key(id)).unwrap(),
            whole.raw_estimate(&key(id)).unwrap()
        );
    }
}
