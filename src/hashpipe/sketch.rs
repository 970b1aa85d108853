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

use std::collections::HashMap;

use crate::error::Error;
use crate::flowkey::FlowKey;
use crate::hash::FlowHash;
use crate::hash::hash_family;
use crate::sketch::Sketch;

/// One occupied pipeline slot.
#[derive(Debug, Clone)]
struct Entry {
    key: FlowKey,
    count: u64,
}

/// HashPipe: a pipeline of key/counter tables approximating heavy-hitter
/// retention under a hard per-stage capacity bound.
///
/// The first stage always admits the incoming key, evicting the resident
/// entry; each later stage keeps whichever of resident and carried entry
/// is larger and pushes the smaller one onward. The loser of the final
/// stage is dropped, so light flows wash out while heavy flows settle.
/// Arrival order influences which entries survive, not correctness of the
/// counts that do.
#[derive(Debug, Clone)]
pub struct HashPipe {
    depth: usize,
    width: usize,
    key_len: usize,
    hash_fns: Vec<FlowHash>,
    stages: Vec<Vec<Option<Entry>>>,
}

impl HashPipe {
    /// Creates a pipeline of `depth` stages of `width` slots each.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::ConfigInvalid`](crate::error::ErrorKind) for a
    /// zero depth, width or key length.
    pub fn new(depth: usize, width: usize, key_len: usize, seed: u32) -> Result<Self, Error> {
        if depth == 0 {
            return Err(Error::config_invalid("depth must be positive"));
        }
        if width == 0 {
            return Err(Error::config_invalid("width must be positive"));
        }
        if key_len == 0 {
            return Err(Error::config_invalid("key length must be positive"));
        }
        Ok(Self {
            depth,
            width,
            key_len,
            hash_fns: hash_family(depth, seed),
            stages: vec![vec![None; width]; depth],
        })
    }

    /// Number of pipeline stages.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Slots per stage.
    pub fn width(&self) -> usize {
        self.width
    }

    /// All flows whose tracked count reaches `threshold`, with their
    /// counts aggregated across stages.
    pub fn heavy_hitters(&self, threshold: u64) -> Vec<(FlowKey, u64)> {
        let mut totals: HashMap<&FlowKey, u64> = HashMap::new();
        for stage in &self.stages {
            for entry in stage.iter().flatten() {
                *totals.entry(&entry.key).or_insert(0) += entry.count;
            }
        }
        totals
            .into_iter()
            .filter(|&(_, count)| count >= threshold)
            .map(|(key, count)| (key.clone(), count))
            .collect()
    }

    /// Drops every tracked entry.
    pub fn clear(&mut self) {
        for stage in &mut self.stages {
            stage.fill(None);
        }
    }

    fn slot_index(&self, stage: usize, key: &FlowKey) -> usize {
        (self.hash_fns[stage].hash_key(key) % self.width as u64) as usize
    }
}

impl Sketch for HashPipe {
    fn key_len(&self) -> usize {
        self.key_len
    }

    fn update(&mut self, key: &FlowKey, weight: u64) -> Result<(), Error> {
        self.check_key(key)?;

        // Stage 0 always admits the arriving key.
        let idx = self.slot_index(0, key);
        let slot = &mut self.stages[0][idx];
        let mut carried = match slot {
            Some(entry) if entry.key == *key => {
                entry.count += weight;
                return Ok(());
            }
            Some(entry) => Some(std::mem::replace(
                entry,
                Entry {
                    key: key.clone(),
                    count: weight,
                },
            )),
            None => {
                *slot = Some(Entry {
                    key: key.clone(),
                    count: weight,
                });
                return Ok(());
            }
        };

        // Swap-forward: each stage keeps the larger entry and pushes the
        // smaller one on; the final loser is dropped.
        for stage in 1..self.depth {
            let Some(evicted) = carried.take() else {
                break;
            };
            let idx = self.slot_index(stage, &evicted.key);
            let slot = &mut self.stages[stage][idx];
            match slot {
                Some(entry) if entry.key == evicted.key => {
                    entry.count += evicted.count;
                }
                Some(entry) => {
                    carried = if evicted.count > entry.count {
                        Some(std::mem::replace(entry, evicted))
                    } else {
                        Some(evicted)
                    };
                }
                None => {
                    *slot = Some(evicted);
                }
            }
        }
        Ok(())
    }

    /// Sum of this key's resident counters across stages; zero if the key
    /// has been fully evicted (under-estimation is possible, the price of
    /// the hard capacity bound).
    fn query(&self, key: &FlowKey) -> Result<u64, Error> {
        self.check_key(key)?;
        let mut total = 0u64;
        for stage in 0..self.depth {
            let idx = self.slot_index(stage, key);
            if let Some(entry) = &self.stages[stage][idx] {
                if entry.key == *key {
                    total += entry.count;
                }
            }
        }
        Ok(total)
    }

    fn size_bytes(&self) -> usize {
        self.depth * self.width * (self.key_len + std::mem::size_of::<u64>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn key(id: u32) -> FlowKey {
        FlowKey::from_5_tuple(id, id.wrapping_mul(2654435761), 8080, id as u16, 6)
    }

    #[test]
    fn rejects_bad_config() {
        assert_eq!(
            HashPipe::new(0, 64, 13, 1).unwrap_err().kind(),
            ErrorKind::ConfigInvalid
        );
        assert_eq!(
            HashPipe::new(4, 0, 13, 1).unwrap_err().kind(),
            ErrorKind::ConfigInvalid
        );
        assert_eq!(
            HashPipe::new(4, 64, 0, 1).unwrap_err().kind(),
            ErrorKind::ConfigInvalid
        );
    }

    #[test]
    fn resident_key_accumulates_in_place() {
        let mut pipe = HashPipe::new(4, 64, 13, 1).unwrap();
        for _ in 0..10 {
            pipe.update(&key(1), 2).unwrap();
        }
        assert_eq!(pipe.query(&key(1)).unwrap(), 20);
    }

    #[test]
    fn heavy_flows_survive_light_churn() {
        let mut pipe = HashPipe::new(4, 128, 13, 7).unwrap();
        // Interleave a few heavy flows with a large churn of one-packet
        // flows; the heavies must retain (most of) their counts.
        for round in 0..1000u32 {
            for heavy in 0..5u32 {
                pipe.update(&key(heavy), 1).unwrap();
            }
            pipe.update(&key(1000 + round), 1).unwrap();
        }
        for heavy in 0..5u32 {
            let got = pipe.query(&key(heavy)).unwrap();
            assert!(got >= 900, "heavy flow {heavy} decayed to {got}");
        }
    }

    #[test]
    fn heavy_hitters_report_aggregated_counts() {
        let mut pipe = HashPipe::new(4, 128, 13, 7).unwrap();
        for _ in 0..500 {
            pipe.update(&key(1), 1).unwrap();
        }
        for id in 10..40u32 {
            pipe.update(&key(id), 1).unwrap();
        }

        let hh = pipe.heavy_hitters(100);
        assert_eq!(hh.len(), 1);
        assert_eq!(hh[0].0, key(1));
        assert!(hh[0].1 >= 500);
    }

    #[test]
    fn evicted_light_flow_reads_zero_or_less() {
        let mut pipe = HashPipe::new(2, 4, 13, 3).unwrap();
        // Tiny pipeline: flood it so early light flows get evicted.
        for id in 0..200u32 {
            pipe.update(&key(id), 1).unwrap();
        }
        // Whatever remains never exceeds the true count.
        for id in 0..200u32 {
            assert!(pipe.query(&key(id)).unwrap() <= 1);
        }
    }

    #[test]
    fn clear_empties_the_pipeline() {
        let mut pipe = HashPipe::new(4, 64, 13, 1).unwrap();
        pipe.update(&key(1), 5).unwrap();
        pipe.clear();
        assert_eq!(pipe.query(&key(1)).unwrap(), 0);
        assert!(pipe.heavy_hitters(1).is_empty());
    }

    #[test]
    fn size_matches_configuration() {
        let pipe = HashPipe::new(4, 128, 13, 1).unwrap();
        assert_eq!(pipe.size_bytes(), 4 * 128 * 21);
    }
}
