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

//! The common contract implemented by every sketch variant.

use crate::error::Error;
use crate::flowkey::FlowKey;

/// Common operation set over all sketch variants.
///
/// A sketch owns all of its memory at construction time; `update` never
/// allocates. `query` returns a non-negative estimate of the accumulated
/// weight (filter-style variants report presence as 0 or 1). `size_bytes`
/// is the currency in which sketches are compared at a fixed memory budget.
pub trait Sketch {
    /// The key width in bytes this sketch was configured for.
    fn key_len(&self) -> usize;

    /// Registers an observation of `key` with the given weight.
    fn update(&mut self, key: &FlowKey, weight: u64) -> Result<(), Error>;

    /// Estimates the accumulated weight of `key`.
    fn query(&self, key: &FlowKey) -> Result<u64, Error>;

    /// Total memory footprint of the sketch's counter state in bytes.
    fn size_bytes(&self) -> usize;

    /// Rejects keys whose width disagrees with the configured one.
    fn check_key(&self, key: &FlowKey) -> Result<(), Error> {
        if key.len() != self.key_len() {
            return Err(Error::key_mismatch(self.key_len(), key.len()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    struct Fixed {
        key_len: usize,
    }

    impl Sketch for Fixed {
        fn key_len(&self) -> usize {
            self.key_len
        }

        fn update(&mut self, key: &FlowKey, _weight: u64) -> Result<(), Error> {
            self.check_key(key)
        }

        fn query(&self, key: &FlowKey) -> Result<u64, Error> {
            self.check_key(key)?;
            Ok(0)
        }

        fn size_bytes(&self) -> usize {
            0
        }
    }

    #[test]
    fn check_key_rejects_wrong_width() {
        let sketch = Fixed { key_len: 13 };
        let short = FlowKey::new(vec![0u8; 4]).unwrap();
        let err = sketch.query(&short).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::KeyMismatch);

        let ok = FlowKey::new(vec![0u8; 13]).unwrap();
        assert_eq!(sketch.query(&ok).unwrap(), 0);
    }
}
