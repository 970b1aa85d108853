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

//! Offline accuracy scoring against exact per-flow totals.
//!
//! Nothing here is consumed by the sketch core; it exists so evaluation
//! harnesses and the crate's own tests can compare sketch estimates
//! against ground truth built from the same record stream.

use std::collections::HashMap;

use crate::error::Error;
use crate::flowkey::FlowKey;
use crate::flowkey::Record;
use crate::sketch::Sketch;

/// Exact per-flow totals accumulated over a record stream.
#[derive(Debug, Clone, Default)]
pub struct GroundTruth {
    counts: HashMap<FlowKey, u64>,
    total_weight: u64,
}

impl GroundTruth {
    /// Creates an empty ground truth.
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one record into the totals.
    pub fn observe(&mut self, record: &Record) {
        self.add(record.key.clone(), record.weight);
    }

    /// Adds `weight` to a flow's total.
    pub fn add(&mut self, key: FlowKey, weight: u64) {
        *self.counts.entry(key).or_insert(0) += weight;
        self.total_weight += weight;
    }

    /// True accumulated weight of a flow; zero if never observed.
    pub fn count(&self, key: &FlowKey) -> u64 {
        self.counts.get(key).copied().unwrap_or(0)
    }

    /// Number of distinct flows observed.
    pub fn flows(&self) -> usize {
        self.counts.len()
    }

    /// Sum of all observed weights.
    pub fn total_weight(&self) -> u64 {
        self.total_weight
    }

    /// Iterates over all flows and their true totals.
    pub fn iter(&self) -> impl Iterator<Item = (&FlowKey, u64)> {
        self.counts.iter().map(|(key, &count)| (key, count))
    }

    /// Flows whose true total reaches `threshold`.
    pub fn heavy_hitters(&self, threshold: u64) -> Vec<(FlowKey, u64)> {
        self.iter()
            .filter(|&(_, count)| count >= threshold)
            .map(|(key, count)| (key.clone(), count))
            .collect()
    }
}

/// Mean of `|estimate - truth|` over all observed flows.
pub fn average_absolute_error(truth: &GroundTruth, sketch: &impl Sketch) -> Result<f64, Error> {
    if truth.flows() == 0 {
        return Ok(0.0);
    }
    let mut sum = 0.0;
    for (key, expected) in truth.iter() {
        let got = sketch.query(key)?;
        sum += got.abs_diff(expected) as f64;
    }
    Ok(sum / truth.flows() as f64)
}

/// Mean of `|estimate - truth| / truth` over all observed flows.
pub fn average_relative_error(truth: &GroundTruth, sketch: &impl Sketch) -> Result<f64, Error> {
    if truth.flows() == 0 {
        return Ok(0.0);
    }
    let mut sum = 0.0;
    for (key, expected) in truth.iter() {
        let got = sketch.query(key)?;
        sum += got.abs_diff(expected) as f64 / expected as f64;
    }
    Ok(sum / truth.flows() as f64)
}

/// Precision/recall/F1 of a heavy-hitter report.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeavyHitterScore {
    /// Fraction of reported flows that are true heavy hitters.
    pub precision: f64,
    /// Fraction of true heavy hitters that were reported.
    pub recall: f64,
    /// Harmonic mean of precision and recall.
    pub f1: f64,
}

/// Scores a reported heavy-hitter set against the true one at `threshold`.
pub fn heavy_hitter_score(
    truth: &GroundTruth,
    reported: &[(FlowKey, u64)],
    threshold: u64,
) -> HeavyHitterScore {
    let actual = truth.heavy_hitters(threshold);
    let true_positives = reported
        .iter()
        .filter(|(key, _)| truth.count(key) >= threshold)
        .count();

    let precision = if reported.is_empty() {
        0.0
    } else {
        true_positives as f64 / reported.len() as f64
    };
    let recall = if actual.is_empty() {
        1.0
    } else {
        true_positives as f64 / actual.len() as f64
    };
    let f1 = if precision + recall == 0.0 {
        0.0
    } else {
        2.0 * precision * recall / (precision + recall)
    };
    HeavyHitterScore {
        precision,
        recall,
        f1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::countmin::CmSketch;

    fn key(id: u32) -> FlowKey {
        FlowKey::from_5_tuple(id, 1, 2, 3, 6)
    }

    #[test]
    fn ground_truth_accumulates() {
        let mut truth = GroundTruth::new();
        truth.observe(&Record::new(key(1), 5));
        truth.observe(&Record::new(key(1), 3));
        truth.observe(&Record::new(key(2), 1));

        assert_eq!(truth.count(&key(1)), 8);
        assert_eq!(truth.count(&key(3)), 0);
        assert_eq!(truth.flows(), 2);
        assert_eq!(truth.total_weight(), 9);
        assert_eq!(truth.heavy_hitters(5), vec![(key(1), 8)]);
    }

    #[test]
    fn errors_are_zero_for_an_exact_sketch() {
        let mut truth = GroundTruth::new();
        let mut cm = CmSketch::new(4, 4096, 13, 1).unwrap();
        for id in 0..20u32 {
            let weight = u64::from(id + 1);
            truth.add(key(id), weight);
            cm.update(&key(id), weight).unwrap();
        }
        // A wide sketch over few keys is collision-free.
        assert_eq!(average_absolute_error(&truth, &cm).unwrap(), 0.0);
        assert_eq!(average_relative_error(&truth, &cm).unwrap(), 0.0);
    }

    #[test]
    fn heavy_hitter_scoring() {
        let mut truth = GroundTruth::new();
        truth.add(key(1), 100);
        truth.add(key(2), 100);
        truth.add(key(3), 1);

        // One true hitter reported, one missed, one false report.
        let reported = vec![(key(1), 100), (key(3), 120)];
        let score = heavy_hitter_score(&truth, &reported, 50);
        assert_eq!(score.precision, 0.5);
        assert_eq!(score.recall, 0.5);
        assert!((score.f1 - 0.5).abs() < 1e-9);
    }
}
