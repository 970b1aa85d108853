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

use std::collections::VecDeque;

use crate::bloom::BloomFilter;
use crate::error::Error;
use crate::flowkey::FlowKey;
use crate::hash::FlowHash;
use crate::hash::hash_family;
use crate::sketch::Sketch;

/// One counting-table cell: the XOR of all resident keys, how many flows
/// landed here, and their combined weight.
#[derive(Debug, Clone)]
struct Cell {
    flow_xor: Box<[u8]>,
    flow_count: u64,
    packet_count: u64,
}

impl Cell {
    fn fold_key(&mut self, key: &FlowKey) {
        for (dst, src) in self.flow_xor.iter_mut().zip(key.as_bytes()) {
            *dst ^= src;
        }
    }
}

/// FlowRadar: a Bloom flow filter plus an invertible counting table.
///
/// Each flow occupies one cell per table segment (distinct cells by
/// construction, so the XOR algebra stays invertible). The first packet of
/// a flow registers it in the filter and folds its key into its cells;
/// every packet adds its weight to the cells' packet counters.
///
/// [`decode`](Self::decode) recovers the exact flow multiset by peeling
/// pure cells, provided the load factor (flows per cell) stays below the
/// decodability threshold; past it, a partial result is returned.
#[derive(Debug, Clone)]
pub struct FlowRadar {
    key_len: usize,
    filter: BloomFilter,
    hash_fns: Vec<FlowHash>,
    segment_len: usize,
    cells: Vec<Cell>,
}

/// Outcome of a decode pass.
#[derive(Debug, Clone)]
pub struct DecodedFlows {
    flows: Vec<(FlowKey, u64)>,
    remaining_cells: usize,
}

impl DecodedFlows {
    /// Recovered flows with their exact accumulated weights.
    pub fn flows(&self) -> &[(FlowKey, u64)] {
        &self.flows
    }

    /// Consumes the result, yielding the recovered flows.
    pub fn into_flows(self) -> Vec<(FlowKey, u64)> {
        self.flows
    }

    /// Cells still holding undecoded flows after peeling stalled.
    pub fn remaining_cells(&self) -> usize {
        self.remaining_cells
    }

    /// Whether every inserted flow was recovered.
    pub fn is_complete(&self) -> bool {
        self.remaining_cells == 0
    }
}

impl FlowRadar {
    /// Creates a FlowRadar for keys of `key_len` bytes.
    ///
    /// `filter_bits`/`filter_hashes` size the flow filter; `num_cells` is
    /// the counting-table budget, split into `cell_hashes` equal segments
    /// (rounded up to a whole number per segment).
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::ConfigInvalid`](crate::error::ErrorKind) if any
    /// dimension is zero, `num_cells < cell_hashes`, or the filter
    /// parameters are out of range.
    pub fn new(
        key_len: usize,
        filter_bits: u64,
        filter_hashes: u32,
        num_cells: usize,
        cell_hashes: usize,
        seed: u32,
    ) -> Result<Self, Error> {
        if key_len == 0 {
            return Err(Error::config_invalid("key length must be positive"));
        }
        if cell_hashes == 0 {
            return Err(Error::config_invalid("cell hash count must be positive"));
        }
        if num_cells < cell_hashes {
            return Err(
                Error::config_invalid("counting table smaller than one cell per segment")
                    .with_context("num_cells", num_cells)
                    .with_context("cell_hashes", cell_hashes),
            );
        }

        let filter = BloomFilter::new(filter_bits, filter_hashes, key_len, seed)?;
        let segment_len = num_cells.div_ceil(cell_hashes);
        let cells = vec![
            Cell {
                flow_xor: vec![0u8; key_len].into_boxed_slice(),
                flow_count: 0,
                packet_count: 0,
            };
            segment_len * cell_hashes
        ];
        Ok(Self {
            key_len,
            filter,
            hash_fns: hash_family(cell_hashes, seed.wrapping_add(0x7f4a)),
            segment_len,
            cells,
        })
    }

    /// Total number of counting-table cells.
    pub fn num_cells(&self) -> usize {
        self.cells.len()
    }

    /// Flows per cell currently resident, the decodability driver.
    pub fn load_factor(&self) -> f64 {
        let flows: u64 = self.cells.iter().map(|c| c.flow_count).sum();
        flows as f64 / self.hash_fns.len() as f64 / self.cells.len() as f64
    }

    /// Recovers the flow multiset by iteratively peeling pure cells
    /// (cells holding exactly one flow).
    ///
    /// Always returns; when the load factor exceeded the decodable range
    /// the result is partial and [`DecodedFlows::is_complete`] is false.
    pub fn decode(&self) -> DecodedFlows {
        let mut cells = self.cells.clone();
        let mut queue: VecDeque<usize> = cells
            .iter()
            .enumerate()
            .filter(|(_, cell)| cell.flow_count == 1)
            .map(|(idx, _)| idx)
            .collect();

        let mut flows = Vec::new();
        while let Some(idx) = queue.pop_front() {
            if cells[idx].flow_count != 1 {
                continue;
            }
            let Ok(key) = FlowKey::new(cells[idx].flow_xor.to_vec()) else {
                continue;
            };
            let count = cells[idx].packet_count;

            for cell_idx in self.cell_indices(&key) {
                let cell = &mut cells[cell_idx];
                cell.fold_key(&key);
                cell.flow_count -= 1;
                cell.packet_count = cell.packet_count.saturating_sub(count);
                if cell.flow_count == 1 {
                    queue.push_back(cell_idx);
                }
            }
            flows.push((key, count));
        }

        let remaining_cells = cells.iter().filter(|cell| cell.flow_count > 0).count();
        DecodedFlows {
            flows,
            remaining_cells,
        }
    }

    /// Like [`decode`](Self::decode) but treats partial recovery as an
    /// error.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::DecodeIncomplete`](crate::error::ErrorKind)
    /// when peeling stalls before the table empties; the recovered prefix
    /// is available through [`decode`](Self::decode).
    pub fn decode_exact(&self) -> Result<Vec<(FlowKey, u64)>, Error> {
        let decoded = self.decode();
        if !decoded.is_complete() {
            return Err(Error::decode_incomplete(
                decoded.flows.len(),
                decoded.remaining_cells,
            ));
        }
        Ok(decoded.into_flows())
    }

    /// One distinct cell per segment, so a flow's cells never coincide.
    fn cell_indices(&self, key: &FlowKey) -> Vec<usize> {
        self.hash_fns
            .iter()
            .enumerate()
            .map(|(segment, hash)| {
                segment * self.segment_len
                    + (hash.hash_key(key) % self.segment_len as u64) as usize
            })
            .collect()
    }
}

impl Sketch for FlowRadar {
    fn key_len(&self) -> usize {
        self.key_len
    }

    fn update(&mut self, key: &FlowKey, weight: u64) -> Result<(), Error> {
        self.check_key(key)?;
        let seen_before = self.filter.contains_and_insert(key)?;
        for idx in self.cell_indices(key) {
            let cell = &mut self.cells[idx];
            if !seen_before {
                cell.fold_key(key);
                cell.flow_count += 1;
            }
            cell.packet_count += weight;
        }
        Ok(())
    }

    /// Cheap per-key upper bound: the minimum packet count over the flow's
    /// cells. Exact per-flow counts come from [`decode`](Self::decode).
    fn query(&self, key: &FlowKey) -> Result<u64, Error> {
        self.check_key(key)?;
        if !self.filter.contains(key)? {
            return Ok(0);
        }
        Ok(self
            .cell_indices(key)
            .into_iter()
            .map(|idx| self.cells[idx].packet_count)
            .min()
            .unwrap_or(0))
    }

    fn size_bytes(&self) -> usize {
        let cell_bytes = self.key_len + 2 * std::mem::size_of::<u64>();
        self.filter.size_bytes() + self.cells.len() * cell_bytes
    }
}
