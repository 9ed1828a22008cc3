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

use std::io::Cursor;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use roaring::RoaringBitmap;

use crate::error::*;
use crate::predicate::Function;
use crate::utils::roaring_utils;

pub const BSI_BITMAP_VERSION_1: u8 = 1;

/// A bit-sliced compressed bitmap over `[min, max]`.
///
/// `ebm` marks the row-ids that hold a value; `slices[b]` holds the row-ids
/// whose bit `b` of `value - min` is set. Range and equality queries run the
/// O'Neil bit-sliced compare, walking slices from the most significant bit
/// down while maintaining "equal so far" and strictly-less/greater sets.
///
/// See <a href="https://dl.acm.org/doi/10.1145/253262.253268">Improved query
/// performance with variant indexes</a>.
#[derive(Debug, Clone, PartialEq)]
pub struct BitSliceIndexRoaringBitmap {
    min: i64,
    max: i64,
    ebm: RoaringBitmap,
    slices: Vec<RoaringBitmap>,
}

impl BitSliceIndexRoaringBitmap {
    pub fn empty() -> Self {
        Self {
            min: 0,
            max: 0,
            ebm: RoaringBitmap::new(),
            slices: Vec::new(),
        }
    }

    /// Parse one serialized bit-slice bitmap, advancing the cursor past it.
    pub fn deserialize(cursor: &mut Cursor<&[u8]>) -> Result<Self> {
        let remaining = cursor.remaining();
        if remaining < 1 + 8 + 8 {
            return ShortReadSnafu {
                message: format!("bit slice bitmap head needs 17 bytes, got {remaining}"),
            }
            .fail();
        }
        let version = cursor.get_u8();
        if version > BSI_BITMAP_VERSION_1 {
            return InvalidSnafu {
                message: format!(
                    "read bsi index fail, do not support version {version}, please update the reader"
                ),
            }
            .fail();
        }
        let min = cursor.get_i64();
        let max = cursor.get_i64();
        let ebm = RoaringBitmap::deserialize_from(&mut *cursor)
            .map_err(|source| Error::BitmapSerialization { source })?;
        if cursor.remaining() < 4 {
            return ShortReadSnafu {
                message: "bit slice bitmap slice count".to_string(),
            }
            .fail();
        }
        let slice_count = cursor.get_i32();
        let mut slices = Vec::with_capacity(slice_count.max(0) as usize);
        for _ in 0..slice_count {
            let slice = RoaringBitmap::deserialize_from(&mut *cursor)
                .map_err(|source| Error::BitmapSerialization { source })?;
            slices.push(slice);
        }
        Ok(Self {
            min,
            max,
            ebm,
            slices,
        })
    }

    pub fn serialize(&self) -> Result<Bytes> {
        let mut output = BytesMut::new();
        output.put_u8(BSI_BITMAP_VERSION_1);
        output.put_i64(self.min);
        output.put_i64(self.max);
        output.put_slice(&roaring_utils::serialize(&self.ebm)?);
        output.put_i32(self.slices.len() as i32);
        for slice in &self.slices {
            output.put_slice(&roaring_utils::serialize(slice)?);
        }
        Ok(output.freeze())
    }

    /// Row-ids holding any value.
    pub fn is_not_null(&self) -> &RoaringBitmap {
        &self.ebm
    }

    pub fn equal(&self, literal: i64) -> Result<RoaringBitmap> {
        self.compare(Function::Equal, literal)
    }

    pub fn less_than(&self, literal: i64) -> Result<RoaringBitmap> {
        self.compare(Function::LessThan, literal)
    }

    pub fn less_or_equal(&self, literal: i64) -> Result<RoaringBitmap> {
        self.compare(Function::LessOrEqual, literal)
    }

    pub fn greater_than(&self, literal: i64) -> Result<RoaringBitmap> {
        self.compare(Function::GreaterThan, literal)
    }

    pub fn greater_or_equal(&self, literal: i64) -> Result<RoaringBitmap> {
        self.compare(Function::GreaterOrEqual, literal)
    }

    fn compare(&self, function: Function, literal: i64) -> Result<RoaringBitmap> {
        if let Some(result) = self.compare_using_min_max(function, literal)? {
            return Ok(result);
        }
        self.o_neil_compare(function, literal - self.min)
    }

    /// Cheap bound check that resolves predicates outside `[min, max]`
    /// without touching any slice. `None` means the literal is in bound and
    /// the full compare must run.
    pub fn compare_using_min_max(
        &self,
        function: Function,
        literal: i64,
    ) -> Result<Option<RoaringBitmap>> {
        let empty = RoaringBitmap::new;
        let all = || self.ebm.clone();
        match function {
            Function::Equal => {
                if self.min == self.max {
                    return Ok(Some(if literal == self.min { all() } else { empty() }));
                }
                if literal < self.min || literal > self.max {
                    return Ok(Some(empty()));
                }
                Ok(None)
            }
            Function::NotEqual => {
                if self.min == self.max {
                    return Ok(Some(if literal == self.min { empty() } else { all() }));
                }
                if literal < self.min || literal > self.max {
                    return Ok(Some(all()));
                }
                Ok(None)
            }
            Function::LessThan => {
                if literal <= self.min {
                    return Ok(Some(empty()));
                }
                if literal > self.max {
                    return Ok(Some(all()));
                }
                Ok(None)
            }
            Function::LessOrEqual => {
                if literal < self.min {
                    return Ok(Some(empty()));
                }
                if literal >= self.max {
                    return Ok(Some(all()));
                }
                Ok(None)
            }
            Function::GreaterThan => {
                if literal < self.min {
                    return Ok(Some(all()));
                }
                if literal >= self.max {
                    return Ok(Some(empty()));
                }
                Ok(None)
            }
            Function::GreaterOrEqual => {
                if literal <= self.min {
                    return Ok(Some(all()));
                }
                if literal > self.max {
                    return Ok(Some(empty()));
                }
                Ok(None)
            }
            other => InvalidSnafu {
                message: format!(
                    "invalid function {other} in min/max compare of BitSliceIndex, only support EQUAL/NOT_EQUAL/GREATER_OR_EQUAL/GREATER_THAN/LESS_OR_EQUAL/LESS_THAN"
                ),
            }
            .fail(),
        }
    }

    /// O'Neil bit-sliced compare against `predicate = literal - min`.
    pub fn o_neil_compare(&self, function: Function, predicate: i64) -> Result<RoaringBitmap> {
        let mut gt = RoaringBitmap::new();
        let mut lt = RoaringBitmap::new();
        let mut eq = self.ebm.clone();

        for i in (0..self.slices.len()).rev() {
            let bit = (predicate >> i) & 1;
            if bit == 1 {
                lt |= &eq - &self.slices[i];
                eq &= &self.slices[i];
            } else {
                gt |= &eq & &self.slices[i];
                eq -= &self.slices[i];
            }
        }

        match function {
            Function::NotEqual => Ok(&self.ebm - &eq),
            Function::Equal => Ok(eq),
            Function::GreaterThan => Ok(gt),
            Function::LessThan => Ok(lt),
            Function::GreaterOrEqual => Ok(gt | eq),
            Function::LessOrEqual => Ok(lt | eq),
            other => InvalidSnafu {
                message: format!(
                    "invalid function {other} in o'neil compare of BitSliceIndex, only support EQUAL/NOT_EQUAL/GREATER_OR_EQUAL/GREATER_THAN/LESS_OR_EQUAL/LESS_THAN"
                ),
            }
            .fail(),
        }
    }
}

/// Builds a bit-slice bitmap row by row.
#[derive(Debug)]
pub struct Appender {
    bsi: BitSliceIndexRoaringBitmap,
}

impl Appender {
    pub fn new(min: i64, max: i64) -> Result<Self> {
        if min > max {
            return InvalidSnafu {
                message: format!("invalid bounds [{min}, {max}] for BitSliceIndexRoaringBitmap"),
            }
            .fail();
        }
        let value_range = (max - min) as u64;
        let slice_count = (64 - value_range.leading_zeros()) as usize;
        Ok(Self {
            bsi: BitSliceIndexRoaringBitmap {
                min,
                max,
                ebm: RoaringBitmap::new(),
                slices: vec![RoaringBitmap::new(); slice_count],
            },
        })
    }

    pub fn append(&mut self, rid: u32, value: i64) -> Result<()> {
        if value > self.bsi.max {
            return InvalidSnafu {
                message: format!(
                    "value {value} is too large for append to BitSliceIndexRoaringBitmap"
                ),
            }
            .fail();
        }
        if value < self.bsi.min {
            return InvalidSnafu {
                message: format!(
                    "value {value} is too small for append to BitSliceIndexRoaringBitmap"
                ),
            }
            .fail();
        }
        if self.bsi.ebm.contains(rid) {
            return InvalidSnafu {
                message: format!(
                    "rid {rid} is already exists for append to BitSliceIndexRoaringBitmap"
                ),
            }
            .fail();
        }
        let offset = (value - self.bsi.min) as u64;
        for (bit, slice) in self.bsi.slices.iter_mut().enumerate() {
            if (offset >> bit) & 1 == 1 {
                slice.insert(rid);
            }
        }
        self.bsi.ebm.insert(rid);
        Ok(())
    }

    pub fn is_not_empty(&self) -> bool {
        !self.bsi.ebm.is_empty()
    }

    pub fn serialize(&self) -> Result<Bytes> {
        self.bsi.serialize()
    }

    pub fn build(self) -> BitSliceIndexRoaringBitmap {
        self.bsi
    }
}

#[cfg(test)]
mod bit_slice_bitmap_tests {
    use std::collections::BTreeMap;

    use rand::prelude::*;

    use super::*;

    const NUM_OF_ROWS: u32 = 10_000;
    const VALUE_BOUND: i64 = 1000;
    const VALUE_LT_MIN: i64 = 0;
    const VALUE_GT_MAX: i64 = VALUE_BOUND + 100;

    struct Fixture {
        bsi: BitSliceIndexRoaringBitmap,
        // value -> rids
        expected: BTreeMap<i64, Vec<u32>>,
    }

    /// Values in `[1, VALUE_BOUND]` with both bounds present and every fifth
    /// row null.
    fn fixture() -> Fixture {
        let mut rng = StdRng::seed_from_u64(0x9e3779b9);
        let mut expected: BTreeMap<i64, Vec<u32>> = BTreeMap::new();
        expected.entry(1).or_default().push(0);
        expected.entry(VALUE_BOUND).or_default().push(1);
        for rid in 2..NUM_OF_ROWS {
            if rid % 5 == 0 {
                continue;
            }
            let value = rng.gen_range(1..=VALUE_BOUND);
            expected.entry(value).or_default().push(rid);
        }
        let mut appender = Appender::new(1, VALUE_BOUND).unwrap();
        for (value, rids) in &expected {
            for rid in rids {
                appender.append(*rid, *value).unwrap();
            }
        }
        Fixture {
            bsi: appender.build(),
            expected,
        }
    }

    fn oracle(fixture: &Fixture, check: impl Fn(i64) -> bool) -> RoaringBitmap {
        let mut bitmap = RoaringBitmap::new();
        for (value, rids) in &fixture.expected {
            if check(*value) {
                for rid in rids {
                    bitmap.insert(*rid);
                }
            }
        }
        bitmap
    }

    #[test]
    fn test_serialize_roundtrip() {
        let mut appender = Appender::new(0, 10).unwrap();
        assert!(!appender.is_not_empty());
        appender.append(0, 0).unwrap();
        appender.append(1, 1).unwrap();
        appender.append(2, 2).unwrap();
        appender.append(10, 6).unwrap();
        assert!(appender.is_not_empty());

        assert!(appender.append(11, 20).is_err());
        assert!(appender.append(10, 6).is_err());

        let bytes = appender.serialize().unwrap();
        let bsi = appender.build();
        let mut cursor = Cursor::new(bytes.as_ref());
        let deserialized = BitSliceIndexRoaringBitmap::deserialize(&mut cursor).unwrap();
        assert_eq!(bsi, deserialized);
        assert_eq!(cursor.remaining(), 0);
    }

    #[test]
    fn test_equal_matches_oracle() {
        let fixture = fixture();
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..10 {
            let literal = rng.gen_range(1..=VALUE_BOUND);
            let result = fixture.bsi.equal(literal).unwrap();
            assert_eq!(result, oracle(&fixture, |v| v == literal));
        }
        assert!(fixture.bsi.equal(VALUE_LT_MIN).unwrap().is_empty());
        assert!(fixture.bsi.equal(VALUE_GT_MAX).unwrap().is_empty());
    }

    #[test]
    fn test_range_operators_match_oracle() {
        let fixture = fixture();
        let mut rng = StdRng::seed_from_u64(2);
        for _ in 0..10 {
            let literal = rng.gen_range(1..=VALUE_BOUND);
            assert_eq!(
                fixture.bsi.less_than(literal).unwrap(),
                oracle(&fixture, |v| v < literal)
            );
            assert_eq!(
                fixture.bsi.less_or_equal(literal).unwrap(),
                oracle(&fixture, |v| v <= literal)
            );
            assert_eq!(
                fixture.bsi.greater_than(literal).unwrap(),
                oracle(&fixture, |v| v > literal)
            );
            assert_eq!(
                fixture.bsi.greater_or_equal(literal).unwrap(),
                oracle(&fixture, |v| v >= literal)
            );
        }
    }

    #[test]
    fn test_out_of_bound_ranges() {
        let fixture = fixture();
        assert!(fixture.bsi.less_than(VALUE_LT_MIN).unwrap().is_empty());
        assert_eq!(
            fixture.bsi.less_than(VALUE_GT_MAX).unwrap(),
            *fixture.bsi.is_not_null()
        );
        assert!(fixture.bsi.less_or_equal(VALUE_LT_MIN).unwrap().is_empty());
        assert_eq!(
            fixture.bsi.less_or_equal(VALUE_GT_MAX).unwrap(),
            *fixture.bsi.is_not_null()
        );
        assert!(fixture.bsi.greater_than(VALUE_GT_MAX).unwrap().is_empty());
        assert_eq!(
            fixture.bsi.greater_than(VALUE_LT_MIN).unwrap(),
            *fixture.bsi.is_not_null()
        );
        assert!(fixture.bsi.greater_or_equal(VALUE_GT_MAX).unwrap().is_empty());
        assert_eq!(
            fixture.bsi.greater_or_equal(VALUE_LT_MIN).unwrap(),
            *fixture.bsi.is_not_null()
        );
    }

    #[test]
    fn test_not_equal_via_o_neil() {
        let fixture = fixture();
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..10 {
            let literal = rng.gen_range(1..=VALUE_BOUND);
            let result = fixture
                .bsi
                .o_neil_compare(Function::NotEqual, literal - 1)
                .unwrap();
            assert_eq!(result, oracle(&fixture, |v| v != literal));
        }
        assert!(fixture.bsi.o_neil_compare(Function::In, 1).is_err());
    }

    #[test]
    fn test_is_not_null() {
        let fixture = fixture();
        let mut expected = RoaringBitmap::new();
        for rids in fixture.expected.values() {
            for rid in rids {
                expected.insert(*rid);
            }
        }
        assert_eq!(*fixture.bsi.is_not_null(), expected);
    }

    #[test]
    fn test_compare_using_min_max() {
        let fixture = fixture();
        let in_bound = 500i64;
        for function in [
            Function::Equal,
            Function::NotEqual,
            Function::LessThan,
            Function::LessOrEqual,
            Function::GreaterThan,
            Function::GreaterOrEqual,
        ] {
            assert!(fixture
                .bsi
                .compare_using_min_max(function, in_bound)
                .unwrap()
                .is_none());
        }
        assert!(fixture
            .bsi
            .compare_using_min_max(Function::In, 10)
            .is_err());
    }

    #[test]
    fn test_single_value_bound() {
        let mut appender = Appender::new(1, 1).unwrap();
        appender.append(0, 1).unwrap();
        appender.append(1, 1).unwrap();
        appender.append(3, 1).unwrap();
        assert!(appender.append(4, 2).is_err());
        assert!(appender.append(4, 0).is_err());
        let bsi = appender.build();
        assert_eq!(bsi.equal(1).unwrap(), RoaringBitmap::from_iter([0u32, 1, 3]));
        assert_eq!(
            bsi.compare_using_min_max(Function::NotEqual, 1).unwrap(),
            Some(RoaringBitmap::new())
        );
        assert!(bsi.equal(2).unwrap().is_empty());
    }
}
