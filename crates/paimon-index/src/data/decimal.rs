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

use std::cmp::Ordering;

use crate::error::*;

/// Fixed-point decimal: a 128-bit unscaled value with precision and scale.
///
/// The index layer only compares decimals (total order within one
/// `(precision, scale)` pair) and serializes them; arithmetic stays with the
/// columnar library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Decimal {
    precision: u8,
    scale: i8,
    unscaled: i128,
}

impl Decimal {
    pub const MAX_PRECISION: u8 = 38;
    /// Largest precision whose unscaled value fits an i64.
    pub const MAX_COMPACT_PRECISION: u8 = 18;

    pub fn new(precision: u8, scale: i8, unscaled: i128) -> Self {
        Self {
            precision,
            scale,
            unscaled,
        }
    }

    pub fn precision(&self) -> u8 {
        self.precision
    }

    pub fn scale(&self) -> i8 {
        self.scale
    }

    pub fn unscaled(&self) -> i128 {
        self.unscaled
    }

    pub fn is_compact(precision: u8) -> bool {
        precision <= Self::MAX_COMPACT_PRECISION
    }

    pub fn compare_to(&self, other: &Decimal) -> Result<Ordering> {
        if self.scale != other.scale {
            return InvalidSnafu {
                message: format!(
                    "cannot compare decimals with different scale {} and {}",
                    self.scale, other.scale
                ),
            }
            .fail();
        }
        Ok(self.unscaled.cmp(&other.unscaled))
    }

    /// Minimal big-endian two's-complement bytes of the unscaled value, as
    /// the JVM `BigInteger#toByteArray` produces them.
    pub fn to_unscaled_bytes(&self) -> Vec<u8> {
        let be = self.unscaled.to_be_bytes();
        let mut start = 0usize;
        while start < be.len() - 1 {
            let current = be[start];
            let next_high_bit = be[start + 1] & 0x80 != 0;
            if (current == 0x00 && !next_high_bit) || (current == 0xFF && next_high_bit) {
                start += 1;
            } else {
                break;
            }
        }
        be[start..].to_vec()
    }
}
