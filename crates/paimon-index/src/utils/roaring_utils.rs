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

//! Helpers around [`roaring::RoaringBitmap`] used by the index engines.
//!
//! The serialized frame is the portable roaring format shared with the Java
//! and CRoaring ecosystems, which is what the on-disk index bodies carry.

use bytes::Bytes;
use roaring::RoaringBitmap;
use snafu::ResultExt;

use crate::error::*;

/// N-ary union, linear in total cardinality.
pub fn fast_union<'a>(bitmaps: impl IntoIterator<Item = &'a RoaringBitmap>) -> RoaringBitmap {
    let mut result = RoaringBitmap::new();
    for bitmap in bitmaps {
        result |= bitmap;
    }
    result
}

/// Complement the bitmap over the half-open range `[lo, hi)`, leaving
/// everything outside the range untouched.
pub fn flip(bitmap: &mut RoaringBitmap, lo: u32, hi: u32) {
    if lo >= hi {
        return;
    }
    let mut mask = RoaringBitmap::new();
    mask.insert_range(lo..hi);
    *bitmap ^= mask;
}

/// The members of `bitmap` that fall into `[start, start + length)`, shifted
/// down by `start`. Used to intersect a file-level row-id bitmap with one
/// batch window.
pub fn window(bitmap: &RoaringBitmap, start: u32, length: u32) -> RoaringBitmap {
    let end = start.saturating_add(length);
    bitmap
        .iter()
        .skip_while(|row_id| *row_id < start)
        .take_while(|row_id| *row_id < end)
        .map(|row_id| row_id - start)
        .collect()
}

pub fn serialize(bitmap: &RoaringBitmap) -> Result<Bytes> {
    let mut buf = Vec::with_capacity(bitmap.serialized_size());
    bitmap
        .serialize_into(&mut buf)
        .context(BitmapSerializationSnafu)?;
    Ok(Bytes::from(buf))
}

pub fn deserialize(bytes: &[u8]) -> Result<RoaringBitmap> {
    RoaringBitmap::deserialize_from(bytes).context(BitmapSerializationSnafu)
}

#[cfg(test)]
mod roaring_utils_tests {
    use super::*;

    #[test]
    fn test_fast_union() {
        let a = RoaringBitmap::from_iter([1u32, 2, 3]);
        let b = RoaringBitmap::from_iter([3u32, 10]);
        let c = RoaringBitmap::new();
        let union = fast_union([&a, &b, &c]);
        assert_eq!(union, RoaringBitmap::from_iter([1u32, 2, 3, 10]));
    }

    #[test]
    fn test_flip_range() {
        let mut bitmap = RoaringBitmap::from_iter([1u32, 3, 100]);
        flip(&mut bitmap, 0, 5);
        assert_eq!(bitmap, RoaringBitmap::from_iter([0u32, 2, 4, 100]));

        // empty range is a no-op
        let before = bitmap.clone();
        flip(&mut bitmap, 7, 7);
        assert_eq!(bitmap, before);
    }

    #[test]
    fn test_window() {
        let bitmap = RoaringBitmap::from_iter([1u32, 5, 6, 9, 20]);
        assert_eq!(
            window(&bitmap, 5, 5),
            RoaringBitmap::from_iter([0u32, 1, 4])
        );
        assert!(window(&bitmap, 10, 5).is_empty());
    }

    #[test]
    fn test_serialize_roundtrip() {
        let mut bitmap = RoaringBitmap::from_iter([0u32, 1, 65536, 1 << 20]);
        bitmap.insert_range(100..200);
        let bytes = serialize(&bitmap).unwrap();
        assert_eq!(deserialize(&bytes).unwrap(), bitmap);
    }
}
