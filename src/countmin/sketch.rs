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

use crate::error::Error;
use crate::flowkey::FlowKey;
use crate::hash::FlowHash;
use crate::hash::hash_family;
use crate::hierarchy::CounterHierarchy;
use crate::sketch::Sketch;

/// Shared depth-by-width counter matrix behind CmSketch and CuSketch.
///
/// The `depth * width` logical counters live in one [`CounterHierarchy`]
/// addressed row-major, so both sketches get narrow-counter storage for
/// free when a layered configuration is chosen.
#[derive(Debug, Clone)]
struct CounterMatrix {
    depth: usize,
    width: usize,
    key_len: usize,
    seed: u32,
    layer_bits: Vec<u32>,
    hash_fns: Vec<FlowHash>,
    ch: CounterHierarchy,
}

impl CounterMatrix {
    fn new(
        depth: usize,
        width: usize,
        key_len: usize,
        layer_bits: &[u32],
        layer_ratio: f64,
        seed: u32,
    ) -> Result<Self, Error> {
        if depth == 0 {
            return Err(Error::config_invalid("depth must be positive"));
        }
        if width == 0 {
            return Err(Error::config_invalid("width must be positive"));
        }
        if key_len == 0 {
            return Err(Error::config_invalid("key length must be positive"));
        }
        let ch = CounterHierarchy::new(depth * width, layer_bits, layer_ratio, seed)?;
        // Row hashes use seeds disjoint from the hierarchy's promotion
        // seeds so the two families stay uncorrelated.
        let hash_fns = hash_family(depth, seed.wrapping_add(0x9e37));
        Ok(Self {
            depth,
            width,
            key_len,
            seed,
            layer_bits: layer_bits.to_vec(),
            hash_fns,
            ch,
        })
    }

    /// Logical counter index the key maps to in `row`.
    fn cell(&self, row: usize, key: &FlowKey) -> usize {
        let col = (self.hash_fns[row].hash_key(key) % self.width as u64) as usize;
        row * self.width + col
    }

    fn counts(&self, key: &FlowKey) -> Vec<(usize, u64)> {
        (0..self.depth)
            .map(|row| {
                let idx = self.cell(row, key);
                (idx, self.ch.count(idx))
            })
            .collect()
    }

    fn min_count(&self, key: &FlowKey) -> u64 {
        (0..self.depth)
            .map(|row| self.ch.count(self.cell(row, key)))
            .min()
            .unwrap_or(0)
    }

    fn compatible(&self, other: &CounterMatrix) -> bool {
        self.depth == other.depth
            && self.width == other.width
            && self.key_len == other.key_len
            && self.seed == other.seed
            && self.layer_bits == other.layer_bits
    }

    /// Counter-wise add of `other` into `self`. A saturation in the widest
    /// layer is remembered and reported once, after every counter has been
    /// folded in.
    fn absorb(&mut self, other: &CounterMatrix) -> Result<(), Error> {
        let mut overflow = None;
        for idx in 0..self.depth * self.width {
            let delta = other.ch.count(idx);
            if delta == 0 {
                continue;
            }
            if let Err(err) = self.ch.increment(idx, delta) {
                overflow = Some(err);
            }
        }
        overflow.map_or(Ok(()), Err)
    }
}

/// Count-Min sketch: `depth` hash rows of `width` counters.
///
/// `update` increments one counter per row; `query` takes the minimum
/// across rows, which never under-estimates the true count (one-sided
/// error). The exception is a reported counter overflow, after which the
/// affected estimates are documented lower bounds.
#[derive(Debug, Clone)]
pub struct CmSketch {
    matrix: CounterMatrix,
}

impl CmSketch {
    /// Creates a sketch with flat 64-bit counters.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::ConfigInvalid`](crate::error::ErrorKind) for a
    /// zero depth, width or key length.
    pub fn new(depth: usize, width: usize, key_len: usize, seed: u32) -> Result<Self, Error> {
        Self::with_hierarchy(depth, width, key_len, &[64], 0.5, seed)
    }

    /// Creates a sketch whose counters live in a layered
    /// [`CounterHierarchy`] with the given cell widths and layer ratio.
    pub fn with_hierarchy(
        depth: usize,
        width: usize,
        key_len: usize,
        layer_bits: &[u32],
        layer_ratio: f64,
        seed: u32,
    ) -> Result<Self, Error> {
        Ok(Self {
            matrix: CounterMatrix::new(depth, width, key_len, layer_bits, layer_ratio, seed)?,
        })
    }

    /// Number of hash rows.
    pub fn depth(&self) -> usize {
        self.matrix.depth
    }

    /// Counters per row.
    pub fn width(&self) -> usize {
        self.matrix.width
    }

    /// Minimum count across this key's rows.
    pub fn estimate(&self, key: &FlowKey) -> Result<u64, Error> {
        self.check_key(key)?;
        Ok(self.matrix.min_count(key))
    }

    /// Merges another sketch counter-wise; valid because the Count-Min
    /// update rule is linear.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::ConfigInvalid`](crate::error::ErrorKind) on
    /// configuration mismatch and
    /// [`ErrorKind::CounterOverflow`](crate::error::ErrorKind) if a merged
    /// counter saturates the widest layer.
    pub fn merge(&mut self, other: &CmSketch) -> Result<(), Error> {
        if !self.matrix.compatible(&other.matrix) {
            return Err(Error::config_invalid(
                "cannot merge count-min sketches with different configurations",
            ));
        }
        self.matrix.absorb(&other.matrix)
    }
}

impl Sketch for CmSketch {
    fn key_len(&self) -> usize {
        self.matrix.key_len
    }

    fn update(&mut self, key: &FlowKey, weight: u64) -> Result<(), Error> {
        self.check_key(key)?;
        let mut overflow = None;
        for row in 0..self.matrix.depth {
            let idx = self.matrix.cell(row, key);
            if let Err(err) = self.matrix.ch.increment(idx, weight) {
                overflow = Some(err);
            }
        }
        overflow.map_or(Ok(()), Err)
    }

    fn query(&self, key: &FlowKey) -> Result<u64, Error> {
        self.estimate(key)
    }

    fn size_bytes(&self) -> usize {
        self.matrix.ch.size_bytes()
    }
}

/// Conservative-update variant of the Count-Min sketch.
///
/// Same layout and query as [`CmSketch`], but `update` raises only the row
/// counters that sit below the new row minimum, so every counter stays the
/// tightest upper bound the row has witnessed. At equal configuration its
/// estimates never exceed plain Count-Min's. The query path doubles as the
/// update path: each update reads all row counters first.
#[derive(Debug, Clone)]
pub struct CuSketch {
    matrix: CounterMatrix,
}

impl CuSketch {
    /// Creates a sketch with flat 64-bit counters.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::ConfigInvalid`](crate::error::ErrorKind) for a
    /// zero depth, width or key length.
    pub fn new(depth: usize, width: usize, key_len: usize, seed: u32) -> Result<Self, Error> {
        Self::with_hierarchy(depth, width, key_len, &[64], 0.5, seed)
    }

    /// Creates a sketch backed by a layered [`CounterHierarchy`].
    pub fn with_hierarchy(
        depth: usize,
        width: usize,
        key_len: usize,
        layer_bits: &[u32],
        layer_ratio: f64,
        seed: u32,
    ) -> Result<Self, Error> {
        Ok(Self {
            matrix: CounterMatrix::new(depth, width, key_len, layer_bits, layer_ratio, seed)?,
        })
    }

    /// Number of hash rows.
    pub fn depth(&self) -> usize {
        self.matrix.depth
    }

    /// Counters per row.
    pub fn width(&self) -> usize {
        self.matrix.width
    }

    /// Minimum count across this key's rows.
    pub fn estimate(&self, key: &FlowKey) -> Result<u64, Error> {
        self.check_key(key)?;
        Ok(self.matrix.min_count(key))
    }

    /// Merges another sketch counter-wise. The conservative rule is
    /// monotone, so summation keeps the one-sided guarantee, though the
    /// merged state may over-estimate more than a single sketch fed the
    /// combined stream would.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::ConfigInvalid`](crate::error::ErrorKind) on
    /// configuration mismatch and
    /// [`ErrorKind::CounterOverflow`](crate::error::ErrorKind) if a merged
    /// counter saturates the widest layer.
    pub fn merge(&mut self, other: &CuSketch) -> Result<(), Error> {
        if !self.matrix.compatible(&other.matrix) {
            return Err(Error::config_invalid(
                "cannot merge conservative-update sketches with different configurations",
            ));
        }
        self.matrix.absorb(&other.matrix)
    }
}

impl Sketch for CuSketch {
    fn key_len(&self) -> usize {
        self.matrix.key_len
    }

    fn update(&mut self, key: &FlowKey, weight: u64) -> Result<(), Error> {
        self.check_key(key)?;
        let cells = self.matrix.counts(key);
        let target = cells
            .iter()
            .map(|&(_, count)| count)
            .min()
            .unwrap_or(0)
            .saturating_add(weight);

        let mut overflow = None;
        for (idx, count) in cells {
            if count < target {
                if let Err(err) = self.matrix.ch.increment(idx, target - count) {
                    overflow = Some(err);
                }
            }
        }
        overflow.map_or(Ok(()), Err)
    }

    fn query(&self, key: &FlowKey) -> Result<u64, Error> {
        self.estimate(key)
    }

    fn size_bytes(&self) -> usize {
        self.matrix.ch.size_bytes()
    }
}
