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

//! Row serializer bit-compatible with the JVM `BinaryRow` memory layout.
//!
//! Layout: one header byte (row kind) and the null bit set, padded to 8
//! bytes; one 8-byte slot per field; a variable-length part. Numerics sit in
//! their slot little-endian. Strings and binary up to 7 bytes pack into the
//! slot with `0x80 | len` in the highest byte; longer values live in the
//! variable part, word-aligned, with `(offset << 32) | len` in the slot.
//! Decimals beyond precision 18 store their minimal big-endian unscaled
//! bytes in a zeroed 16-byte region; timestamps beyond millisecond
//! precision store the millisecond in the variable part with the
//! nano-of-millisecond as the slot length.

use crate::data::{Decimal, Timestamp};
use crate::error::*;

const HEADER_SIZE_IN_BITS: usize = 8;

/// Null-bit region width: header bits plus one bit per field, rounded up to
/// whole 8-byte words.
fn null_bits_size_in_bytes(arity: usize) -> usize {
    ((arity + 63 + HEADER_SIZE_IN_BITS) / 64) * 8
}

#[derive(Debug)]
pub struct BinaryRowWriter {
    buffer: Vec<u8>,
    arity: usize,
    null_bits_size: usize,
}

impl BinaryRowWriter {
    pub fn new(arity: usize) -> Self {
        let null_bits_size = null_bits_size_in_bytes(arity);
        let fixed_size = null_bits_size + 8 * arity;
        Self {
            buffer: vec![0u8; fixed_size],
            arity,
            null_bits_size,
        }
    }

    /// Clear the row for reuse.
    pub fn reset(&mut self) {
        let fixed_size = self.null_bits_size + 8 * self.arity;
        self.buffer.clear();
        self.buffer.resize(fixed_size, 0);
    }

    fn field_offset(&self, pos: usize) -> usize {
        self.null_bits_size + 8 * pos
    }

    pub fn set_null_at(&mut self, pos: usize) {
        let bit = pos + HEADER_SIZE_IN_BITS;
        self.buffer[bit >> 3] |= 1u8 << (bit & 7);
        // slot stays zeroed
    }

    pub fn write_boolean(&mut self, pos: usize, value: bool) {
        let offset = self.field_offset(pos);
        self.buffer[offset] = value as u8;
    }

    pub fn write_byte(&mut self, pos: usize, value: i8) {
        let offset = self.field_offset(pos);
        self.buffer[offset] = value as u8;
    }

    pub fn write_short(&mut self, pos: usize, value: i16) {
        let offset = self.field_offset(pos);
        self.buffer[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
    }

    pub fn write_int(&mut self, pos: usize, value: i32) {
        let offset = self.field_offset(pos);
        self.buffer[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
    }

    pub fn write_long(&mut self, pos: usize, value: i64) {
        let offset = self.field_offset(pos);
        self.buffer[offset..offset + 8].copy_from_slice(&value.to_le_bytes());
    }

    pub fn write_float(&mut self, pos: usize, value: f32) {
        let offset = self.field_offset(pos);
        self.buffer[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
    }

    pub fn write_double(&mut self, pos: usize, value: f64) {
        let offset = self.field_offset(pos);
        self.buffer[offset..offset + 8].copy_from_slice(&value.to_le_bytes());
    }

    fn set_offset_and_size(&mut self, pos: usize, cursor: usize, size: u32) {
        let offset_and_size = ((cursor as u64) << 32) | size as u64;
        let offset = self.field_offset(pos);
        self.buffer[offset..offset + 8].copy_from_slice(&offset_and_size.to_le_bytes());
    }

    pub fn write_bytes(&mut self, pos: usize, bytes: &[u8]) {
        let len = bytes.len();
        if len <= 7 {
            // compact form: bytes in the low slot positions, 0x80 | len on
            // top
            let offset = self.field_offset(pos);
            self.buffer[offset..offset + len].copy_from_slice(bytes);
            self.buffer[offset + 7] = 0x80 | len as u8;
            return;
        }
        let cursor = self.buffer.len();
        let rounded = (len + 7) & !7;
        self.buffer.extend_from_slice(bytes);
        self.buffer.resize(cursor + rounded, 0);
        self.set_offset_and_size(pos, cursor, len as u32);
    }

    pub fn write_decimal(&mut self, pos: usize, value: &Decimal) -> Result<()> {
        if Decimal::is_compact(value.precision()) {
            let unscaled = i64::try_from(value.unscaled()).map_err(|_| Error::Invalid {
                message: format!(
                    "unscaled value of compact decimal({}, {}) does not fit 64 bits",
                    value.precision(),
                    value.scale()
                ),
            })?;
            self.write_long(pos, unscaled);
            return Ok(());
        }
        let bytes = value.to_unscaled_bytes();
        if bytes.len() > 16 {
            return InvalidSnafu {
                message: format!("decimal unscaled bytes of {} exceed 16", bytes.len()),
            }
            .fail();
        }
        let cursor = self.buffer.len();
        self.buffer.resize(cursor + 16, 0);
        self.buffer[cursor..cursor + bytes.len()].copy_from_slice(&bytes);
        self.set_offset_and_size(pos, cursor, bytes.len() as u32);
        Ok(())
    }

    pub fn write_timestamp(&mut self, pos: usize, value: &Timestamp, precision: i32) {
        if Timestamp::is_compact(precision) {
            self.write_long(pos, value.millisecond());
            return;
        }
        let cursor = self.buffer.len();
        self.buffer
            .extend_from_slice(&value.millisecond().to_le_bytes());
        self.set_offset_and_size(pos, cursor, value.nano_of_millisecond() as u32);
    }

    /// The serialized row bytes; always a whole number of 8-byte words.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }
}
