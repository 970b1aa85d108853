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

//! Flow identity: fixed-length byte keys and observation records.

use byteorder::BigEndian;
use byteorder::ByteOrder;

use crate::error::Error;

/// Byte length of a packed 5-tuple key: two IPv4 addresses, two ports and
/// the transport protocol.
pub const FIVE_TUPLE_KEY_LEN: usize = 13;

/// A fixed-length byte sequence identifying a flow.
///
/// Immutable once constructed. Ordering is lexicographic over the raw bytes,
/// so keys of equal width sort the way their packed fields compare.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FlowKey {
    bytes: Box<[u8]>,
}

impl FlowKey {
    /// Wraps raw bytes as a flow key.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::ConfigInvalid`](crate::error::ErrorKind) for an
    /// empty byte sequence.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Result<Self, Error> {
        let bytes = bytes.into();
        if bytes.is_empty() {
            return Err(Error::config_invalid("flow key must not be empty"));
        }
        Ok(Self {
            bytes: bytes.into_boxed_slice(),
        })
    }

    /// Packs an IPv4 5-tuple into the canonical 13-byte key.
    ///
    /// Fields are laid out big-endian in the order src_ip, dst_ip,
    /// src_port, dst_port, protocol.
    pub fn from_5_tuple(
        src_ip: u32,
        dst_ip: u32,
        src_port: u16,
        dst_port: u16,
        protocol: u8,
    ) -> Self {
        let mut bytes = vec![0u8; FIVE_TUPLE_KEY_LEN];
        BigEndian::write_u32(&mut bytes[0..4], src_ip);
        BigEndian::write_u32(&mut bytes[4..8], dst_ip);
        BigEndian::write_u16(&mut bytes[8..10], src_port);
        BigEndian::write_u16(&mut bytes[10..12], dst_port);
        bytes[12] = protocol;
        Self {
            bytes: bytes.into_boxed_slice(),
        }
    }

    /// Returns the key width in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns whether the key is empty. Always false for a constructed key.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Returns the raw key bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Source address, if this is a 13-byte 5-tuple key.
    pub fn src_ip(&self) -> Option<u32> {
        self.five_tuple()
            .map(|b| BigEndian::read_u32(&b[0..4]))
    }

    /// Destination address, if this is a 13-byte 5-tuple key.
    pub fn dst_ip(&self) -> Option<u32> {
        self.five_tuple()
            .map(|b| BigEndian::read_u32(&b[4..8]))
    }

    /// Source port, if this is a 13-byte 5-tuple key.
    pub fn src_port(&self) -> Option<u16> {
        self.five_tuple()
            .map(|b| BigEndian::read_u16(&b[8..10]))
    }

    /// Destination port, if this is a 13-byte 5-tuple key.
    pub fn dst_port(&self) -> Option<u16> {
        self.five_tuple()
            .map(|b| BigEndian::read_u16(&b[10..12]))
    }

    /// Transport protocol, if this is a 13-byte 5-tuple key.
    pub fn protocol(&self) -> Option<u8> {
        self.five_tuple().map(|b| b[12])
    }

    fn five_tuple(&self) -> Option<&[u8]> {
        (self.bytes.len() == FIVE_TUPLE_KEY_LEN).then_some(&*self.bytes)
    }
}

/// One observation event: a flow key with the weight it contributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// The flow this observation belongs to.
    pub key: FlowKey,
    /// Weight of the observation (packet count, byte count, ...).
    pub weight: u64,
    /// Optional capture timestamp in nanoseconds; none of the sketches in
    /// this crate consume it, but ingestion pipelines carry it through.
    pub timestamp: Option<u64>,
}

impl Record {
    /// Creates a record without a timestamp.
    pub fn new(key: FlowKey, weight: u64) -> Self {
        Self {
            key,
            weight,
            timestamp: None,
        }
    }
}
