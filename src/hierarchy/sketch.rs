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
use crate::hash::FlowHash;
use crate::hash::hash_family;
use crate::hierarchy::packed::PackedArray;

/// Hierarchical storage for an array of logical counters.
///
/// Layer 0 holds one narrow cell per logical counter; each wider layer is
/// geometrically smaller and only receives the carries of cells that
/// outgrew the layer below. Traffic counters are heavy-tailed, so the
/// common small counter pays for narrow bits only and the few elephants
/// promote upward.
///
/// A cell stores one base-2^bits digit of its logical value. Incrementing
/// past a layer's capacity writes the low digit in place and carries the
/// rest to a rehashed cell of the next layer; a per-layer status bitmap
/// records which cells have promoted so counters that never overflow never
/// read shared upper cells.
#[derive(Debug, Clone)]
pub struct CounterHierarchy {
    layers: Vec<PackedArray>,
    /// Promotion status bitmaps for every layer but the widest.
    overflowed: Vec<Box<[u64]>>,
    /// Per-layer promotion hash (layer l addresses layer l + 1).
    promote: Vec<FlowHash>,
    counters: usize,
}

impl CounterHierarchy {
    /// Creates a hierarchy of `counters` logical counters.
    ///
    /// `layer_bits` lists cell widths from narrowest to widest;
    /// `layer_ratio` is the size ratio between adjacent layers. Layer 0 has
    /// `counters` cells, layer `l + 1` has `ceil(len_l * layer_ratio)`.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::ConfigInvalid`](crate::error::ErrorKind) if
    /// `counters` is zero, `layer_bits` is empty, any width is outside
    /// `1..=64`, the widths sum to more than 64, or `layer_ratio` is
    /// outside `(0, 1)` while more than one layer is configured.
    pub fn new(
        counters: usize,
        layer_bits: &[u32],
        layer_ratio: f64,
        seed: u32,
    ) -> Result<Self, Error> {
        if counters == 0 {
            return Err(Error::config_invalid("counter count must be positive"));
        }
        if layer_bits.is_empty() {
            return Err(Error::config_invalid("at least one layer is required"));
        }
        for (layer, &bits) in layer_bits.iter().enumerate() {
            if !(1..=64).contains(&bits) {
                return Err(Error::config_invalid("layer width must be 1..=64 bits")
                    .with_context("layer", layer)
                    .with_context("bits", bits));
            }
        }
        let total_bits: u32 = layer_bits.iter().sum();
        if total_bits > 64 {
            return Err(
                Error::config_invalid("layer widths must sum to at most 64 bits")
                    .with_context("total_bits", total_bits),
            );
        }
        if layer_bits.len() > 1 && !(layer_ratio > 0.0 && layer_ratio < 1.0) {
            return Err(Error::config_invalid(
                "ratio of counters of adjacent layers must be in (0, 1)",
            )
            .with_context("layer_ratio", layer_ratio));
        }

        let mut layers = Vec::with_capacity(layer_bits.len());
        let mut len = counters;
        for &bits in layer_bits {
            layers.push(PackedArray::new(len, bits));
            len = ((len as f64 * layer_ratio).ceil() as usize).max(1);
        }

        let overflowed = layers[..layers.len() - 1]
            .iter()
            .map(|layer| vec![0u64; layer.len().div_ceil(64)].into_boxed_slice())
            .collect();

        Ok(Self {
            layers,
            overflowed,
            promote: hash_family(layer_bits.len().saturating_sub(1), seed),
            counters,
        })
    }

    /// Number of logical counters.
    pub fn counters(&self) -> usize {
        self.counters
    }

    /// Number of physical layers.
    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    /// Adds `delta` to the logical counter at `index`, promoting carries
    /// into wider layers as needed.
    ///
    /// The carry chain is resolved before anything is written, so a failed
    /// increment never leaves partially wrapped digits behind.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::CounterOverflow`](crate::error::ErrorKind) when
    /// the widest layer cannot absorb the carry. Every cell along the
    /// counter's promotion chain is pinned at its maximum, so the counter
    /// reads back as the largest representable value, a stable lower bound,
    /// and the hierarchy keeps operating.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range.
    pub fn increment(&mut self, index: usize, delta: u64) -> Result<(), Error> {
        assert!(index < self.counters, "counter index out of range");

        let last = self.layers.len() - 1;
        // (layer, cell index, new value, carried) per touched layer.
        let mut writes: Vec<(usize, usize, u64, bool)> = Vec::with_capacity(self.layers.len());
        let mut idx = index;
        let mut delta = delta;
        for layer in 0..self.layers.len() {
            let cell = self.layers[layer].get(idx);
            if layer == last {
                let room = self.layers[layer].max_value() - cell;
                if delta > room {
                    self.pin_chain(index);
                    return Err(Error::counter_overflow(index).with_context("layer", layer));
                }
                writes.push((layer, idx, cell + delta, false));
                break;
            }

            let bits = self.layers[layer].bits();
            let sum = u128::from(cell) + u128::from(delta);
            let digit = (sum & u128::from(self.layers[layer].max_value())) as u64;
            let carry = (sum >> bits) as u64;
            writes.push((layer, idx, digit, carry > 0));
            if carry == 0 {
                break;
            }
            idx = self.promoted_index(layer, idx);
            delta = carry;
        }

        for (layer, idx, value, carried) in writes {
            self.layers[layer].set(idx, value);
            if carried {
                self.mark_overflowed(layer, idx);
            }
        }
        Ok(())
    }

    /// Saturates every cell on the promotion chain of `index` at its layer
    /// maximum, making the counter read as the largest representable value.
    fn pin_chain(&mut self, index: usize) {
        let last = self.layers.len() - 1;
        let mut idx = index;
        for layer in 0..self.layers.len() {
            let max = self.layers[layer].max_value();
            self.layers[layer].set(idx, max);
            if layer == last {
                break;
            }
            self.mark_overflowed(layer, idx);
            idx = self.promoted_index(layer, idx);
        }
    }

    /// Reconstructs the logical counter at `index` by reassembling its
    /// digits across layers.
    ///
    /// Exact (equal to the sum of all applied deltas) as long as no two
    /// *promoted* cells collide in an upper layer and no overflow has been
    /// reported for this counter. A promoted-cell collision makes the
    /// result an upper bound; a reported overflow makes it a lower bound.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range.
    pub fn count(&self, index: usize) -> u64 {
        assert!(index < self.counters, "counter index out of range");

        let last = self.layers.len() - 1;
        let mut idx = index;
        let mut shift = 0u32;
        let mut total = 0u64;
        for layer in 0..self.layers.len() {
            total += self.layers[layer].get(idx) << shift;
            if layer == last || !self.has_overflowed(layer, idx) {
                break;
            }
            shift += self.layers[layer].bits();
            idx = self.promoted_index(layer, idx);
        }
        total
    }

    /// Zeroes every layer and promotion bitmap.
    pub fn clear(&mut self) {
        for layer in &mut self.layers {
            layer.clear();
        }
        for bitmap in &mut self.overflowed {
            for word in bitmap.iter_mut() {
                *word = 0;
            }
        }
    }

    /// Physical footprint in bytes: all layers plus the status bitmaps.
    pub fn size_bytes(&self) -> usize {
        let cells: usize = self.layers.iter().map(PackedArray::size_bytes).sum();
        let bitmaps: usize = self.overflowed.iter().map(|b| b.len() * 8).sum();
        cells + bitmaps
    }

    /// Footprint of the flat, full-width array this hierarchy replaces:
    /// every logical counter at the combined width of all layers. The gap
    /// to [`size_bytes`](Self::size_bytes) is the memory the hierarchy
    /// saves.
    pub fn flat_size_bytes(&self) -> usize {
        let total_bits: u32 = self.layers.iter().map(PackedArray::bits).sum();
        (self.counters * total_bits as usize).div_ceil(8)
    }

    fn promoted_index(&self, layer: usize, idx: usize) -> usize {
        let next_len = self.layers[layer + 1].len() as u64;
        (self.promote[layer].hash_u64(idx as u64) % next_len) as usize
    }

    fn mark_overflowed(&mut self, layer: usize, idx: usize) {
        self.overflowed[layer][idx / 64] |= 1u64 << (idx % 64);
    }

    fn has_overflowed(&self, layer: usize, idx: usize) -> bool {
        self.overflowed[layer][idx / 64] & (1u64 << (idx % 64)) != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn small_hierarchy() -> CounterHierarchy {
        // 4-bit base layer, 8-bit middle, 16-bit top.
        CounterHierarchy::new(64, &[4, 8, 16], 0.5, 1).unwrap()
    }

    #[test]
    fn rejects_bad_config() {
        assert_eq!(
            CounterHierarchy::new(0, &[4], 0.5, 1).unwrap_err().kind(),
            ErrorKind::ConfigInvalid
        );
        assert_eq!(
            CounterHierarchy::new(10, &[], 0.5, 1).unwrap_err().kind(),
            ErrorKind::ConfigInvalid
        );
        assert_eq!(
            CounterHierarchy::new(10, &[4, 65], 0.5, 1)
                .unwrap_err()
                .kind(),
            ErrorKind::ConfigInvalid
        );
        assert_eq!(
            CounterHierarchy::new(10, &[32, 33], 0.5, 1)
                .unwrap_err()
                .kind(),
            ErrorKind::ConfigInvalid
        );
        assert_eq!(
            CounterHierarchy::new(10, &[4, 8], 1.5, 1)
                .unwrap_err()
                .kind(),
            ErrorKind::ConfigInvalid
        );
        // A single layer needs no ratio.
        assert!(CounterHierarchy::new(10, &[64], 0.0, 1).is_ok());
    }

    #[test]
    fn counts_without_promotion_are_exact() {
        let mut ch = small_hierarchy();
        for _ in 0..15 {
            ch.increment(3, 1).unwrap();
        }
        assert_eq!(ch.count(3), 15);
        assert_eq!(ch.count(2), 0);
        assert_eq!(ch.count(4), 0);
    }

    #[test]
    fn promotion_preserves_exact_count() {
        let mut ch = small_hierarchy();
        // 4-bit base saturates at 15; push well past it.
        for _ in 0..1000 {
            ch.increment(7, 1).unwrap();
        }
        assert_eq!(ch.count(7), 1000);
    }

    #[test]
    fn bulk_delta_promotes_like_unit_increments() {
        let mut a = small_hierarchy();
        let mut b = small_hierarchy();
        a.increment(9, 12345).unwrap();
        for _ in 0..12345 {
            b.increment(9, 1).unwrap();
        }
        assert_eq!(a.count(9), 12345);
        assert_eq!(a.count(9), b.count(9));
    }

    #[test]
    fn widest_layer_saturation_is_reported() {
        // 2 + 2 bits: logical capacity 15.
        let mut ch = CounterHierarchy::new(8, &[2, 2], 0.5, 1).unwrap();
        ch.increment(0, 15).unwrap();
        assert_eq!(ch.count(0), 15);

        let err = ch.increment(0, 1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CounterOverflow);
        // Pinned at capacity, never wrapped.
        assert_eq!(ch.count(0), 15);
    }

    #[test]
    fn keeps_operating_after_overflow() {
        let mut ch = CounterHierarchy::new(8, &[2, 2], 0.5, 1).unwrap();
        ch.increment(0, 100).unwrap_err();
        ch.increment(1, 3).unwrap();
        assert_eq!(ch.count(1), 3);
    }

    #[test]
    fn physical_size_beats_flat_size() {
        let ch = CounterHierarchy::new(4096, &[4, 8, 16], 0.1, 1).unwrap();
        assert!(ch.size_bytes() < ch.flat_size_bytes());
        // Flat: 4096 * 28 bits.
        assert_eq!(ch.flat_size_bytes(), 4096 * 28 / 8);
    }

    #[test]
    fn size_is_update_independent() {
        let mut ch = small_hierarchy();
        let before = ch.size_bytes();
        for i in 0..64 {
            ch.increment(i, 500).unwrap();
        }
        assert_eq!(ch.size_bytes(), before);
    }

    #[test]
    fn clear_resets_counts_and_promotions() {
        let mut ch = small_hierarchy();
        ch.increment(5, 4000).unwrap();
        ch.clear();
        assert_eq!(ch.count(5), 0);
        ch.increment(5, 7).unwrap();
        assert_eq!(ch.count(5), 7);
    }
}
