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

use arrow::datatypes::TimeUnit;

/// Timestamp as milliseconds-since-epoch plus sub-millisecond nanoseconds.
///
/// Legal precisions are 0, 3, 6 and 9 fractional-second digits; timestamps
/// with precision up to [`Timestamp::MILLIS_PRECISION`] are "compact" and
/// representable by the millisecond alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp {
    millisecond: i64,
    nano_of_millisecond: i32,
}

impl Timestamp {
    pub const MILLIS_PRECISION: i32 = 3;

    pub fn new(millisecond: i64, nano_of_millisecond: i32) -> Self {
        debug_assert!((0..1_000_000).contains(&nano_of_millisecond));
        Self {
            millisecond,
            nano_of_millisecond,
        }
    }

    pub fn from_epoch_millis(millisecond: i64) -> Self {
        Self::new(millisecond, 0)
    }

    pub fn from_epoch_micros(micros: i64) -> Self {
        Self::new(micros.div_euclid(1000), (micros.rem_euclid(1000) * 1000) as i32)
    }

    pub fn from_epoch_nanos(nanos: i64) -> Self {
        Self::new(nanos.div_euclid(1_000_000), nanos.rem_euclid(1_000_000) as i32)
    }

    /// Build from one arrow timestamp value in the unit of its column.
    pub fn from_arrow_value(value: i64, unit: &TimeUnit) -> Self {
        match unit {
            TimeUnit::Second => Self::from_epoch_millis(value * 1000),
            TimeUnit::Millisecond => Self::from_epoch_millis(value),
            TimeUnit::Microsecond => Self::from_epoch_micros(value),
            TimeUnit::Nanosecond => Self::from_epoch_nanos(value),
        }
    }

    pub fn millisecond(&self) -> i64 {
        self.millisecond
    }

    pub fn nano_of_millisecond(&self) -> i32 {
        self.nano_of_millisecond
    }

    /// Microseconds since epoch; nanosecond remainders are truncated.
    pub fn to_microsecond(&self) -> i64 {
        self.millisecond * 1000 + (self.nano_of_millisecond / 1000) as i64
    }

    pub fn is_compact(precision: i32) -> bool {
        precision <= Self::MILLIS_PRECISION
    }

    /// Reduce to an int64 by precision: milliseconds when the column holds
    /// millisecond precision or coarser, microseconds otherwise.
    pub fn to_int64_by_precision(&self, precision: i32) -> i64 {
        if precision <= Self::MILLIS_PRECISION {
            self.millisecond
        } else {
            self.to_microsecond()
        }
    }
}

#[cfg(test)]
mod timestamp_tests {
    use super::*;

    #[test]
    fn test_to_microsecond() {
        assert_eq!(Timestamp::new(1745542802000, 123000).to_microsecond(), 1745542802000123);
        assert_eq!(Timestamp::new(-1765, 123000).to_microsecond(), -1764877);
        assert_eq!(Timestamp::new(0, 999).to_microsecond(), 0);
    }

    #[test]
    fn test_from_epoch_units() {
        assert_eq!(
            Timestamp::from_epoch_micros(1745542802000123),
            Timestamp::new(1745542802000, 123000)
        );
        assert_eq!(Timestamp::from_epoch_micros(-1764877), Timestamp::new(-1765, 123000));
        assert_eq!(
            Timestamp::from_epoch_nanos(1_000_123_456),
            Timestamp::new(1000, 123_456)
        );
        assert_eq!(Timestamp::from_epoch_nanos(-1), Timestamp::new(-1, 999_999));
    }

    #[test]
    fn test_ordering() {
        let a = Timestamp::new(10, 0);
        let b = Timestamp::new(10, 500);
        let c = Timestamp::new(11, 0);
        assert!(a < b && b < c);
    }

    #[test]
    fn test_precision_reduction() {
        let ts = Timestamp::new(1745542802000, 123000);
        assert_eq!(ts.to_int64_by_precision(3), 1745542802000);
        assert_eq!(ts.to_int64_by_precision(9), 1745542802000123);
    }
}
