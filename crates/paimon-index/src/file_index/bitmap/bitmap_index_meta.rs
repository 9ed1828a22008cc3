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

//! Bitmap file index metadata, versions 1 and 2.
//!
//! V1 stores the whole value dictionary in the head. V2 partitions the sorted
//! dictionary into fixed-size index blocks and keeps only one representative
//! key per block in the head, so high-cardinality columns can be probed
//! without materializing the full dictionary. All head integers are
//! big-endian; a negative entry offset inlines a singleton bitmap whose only
//! element is `-1 - offset`.

use std::cmp::Ordering;
use std::collections::HashMap;

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::*;
use crate::predicate::Literal;
use crate::spec::FieldType;

pub const BITMAP_VERSION_1: u8 = 1;
pub const BITMAP_VERSION_2: u8 = 2;

pub const DEFAULT_INDEX_BLOCK_SIZE: i64 = 16 * 1024;

/// Dictionary entry: a value key and the position of its bitmap body.
///
/// `offset < 0` inlines a singleton: the bitmap's only element is
/// `-1 - offset` and `length` is meaningless (-1).
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub key: Literal,
    pub offset: i32,
    pub length: i32,
}

impl Entry {
    pub fn new(key: Literal, offset: i32, length: i32) -> Self {
        Self {
            key,
            offset,
            length,
        }
    }
}

/// Deserialized metadata of one bitmap index body.
#[derive(Debug)]
pub enum BitmapIndexMeta {
    V1(BitmapIndexMetaV1),
    V2(BitmapIndexMetaV2),
}

impl BitmapIndexMeta {
    /// Parse the metadata from an index body slice (starting at its version
    /// byte).
    pub fn deserialize(data: &Bytes, field_type: FieldType) -> Result<Self> {
        ensure_remaining(data, 1, "bitmap index version byte")?;
        match data[0] {
            BITMAP_VERSION_1 => Ok(Self::V1(BitmapIndexMetaV1::deserialize(data, field_type)?)),
            BITMAP_VERSION_2 => Ok(Self::V2(BitmapIndexMetaV2::deserialize(data, field_type)?)),
            version => InvalidSnafu {
                message: format!("unknown bitmap file index version {version}"),
            }
            .fail(),
        }
    }

    pub fn row_count(&self) -> u32 {
        match self {
            Self::V1(meta) => meta.row_count,
            Self::V2(meta) => meta.row_count,
        }
    }

    /// Offset of the bitmap body region within the index slice.
    pub fn body_start(&self) -> usize {
        match self {
            Self::V1(meta) => meta.body_start,
            Self::V2(meta) => meta.body_start,
        }
    }

    pub fn find_entry(&mut self, key: &Literal) -> Result<Option<Entry>> {
        match self {
            Self::V1(meta) => meta.find_entry(key),
            Self::V2(meta) => meta.find_entry(key),
        }
    }
}

/// V1: one monolithic dictionary, lengths recovered from consecutive
/// offsets.
#[derive(Debug)]
pub struct BitmapIndexMetaV1 {
    row_count: u32,
    has_null: bool,
    body_start: usize,
    entries: HashMap<Literal, Entry>,
    null_value_entry: Option<Entry>,
}

impl BitmapIndexMetaV1 {
    fn deserialize(data: &Bytes, field_type: FieldType) -> Result<Self> {
        let total_length = data.len();
        let mut buf = &data[1..];

        ensure_remaining(&buf, 9, "bitmap index v1 head")?;
        let row_count = buf.get_i32() as u32;
        let non_null_bitmap_number = buf.get_i32();
        let has_null = buf.get_u8() != 0;
        let null_value_offset = if has_null {
            ensure_remaining(&buf, 4, "bitmap index v1 null offset")?;
            buf.get_i32()
        } else {
            -1
        };

        let mut entries = HashMap::new();
        let mut last_key = Literal::null(field_type);
        let mut last_offset = null_value_offset;
        for _ in 0..non_null_bitmap_number {
            let key = read_value(&mut buf, field_type)?;
            ensure_remaining(&buf, 4, "bitmap index v1 entry offset")?;
            let offset = buf.get_i32();
            if offset >= 0 {
                if last_offset >= 0 {
                    let length = offset - last_offset;
                    entries.insert(last_key.clone(), Entry::new(last_key, last_offset, length));
                }
                last_offset = offset;
                last_key = key;
            } else {
                // negative offset inlines the bitmap
                entries.insert(key.clone(), Entry::new(key, offset, -1));
            }
        }
        let body_start = total_length - buf.remaining();
        if last_offset >= 0 {
            let length = total_length as i32 - body_start as i32 - last_offset;
            entries.insert(last_key.clone(), Entry::new(last_key, last_offset, length));
        }

        let null_value_entry = if has_null {
            let null_key = Literal::null(field_type);
            match entries.get(&null_key) {
                Some(entry) => Some(entry.clone()),
                None => Some(Entry::new(null_key, null_value_offset, -1)),
            }
        } else {
            None
        };

        Ok(Self {
            row_count,
            has_null,
            body_start,
            entries,
            null_value_entry,
        })
    }

    fn find_entry(&mut self, key: &Literal) -> Result<Option<Entry>> {
        if key.is_null() {
            if self.has_null {
                return Ok(self.null_value_entry.clone());
            }
            return Ok(None);
        }
        Ok(self.entries.get(key).cloned())
    }

    /// Write the v1 head (without the version byte): counts, null offset and
    /// the full dictionary.
    pub fn serialize(
        output: &mut BytesMut,
        row_count: u32,
        has_null: bool,
        null_value_entry: &Entry,
        write_entries: &[Entry],
    ) -> Result<()> {
        output.put_i32(row_count as i32);
        output.put_i32(write_entries.len() as i32);
        output.put_u8(has_null as u8);
        if has_null {
            output.put_i32(null_value_entry.offset);
        }
        for entry in write_entries {
            write_value(output, &entry.key)?;
            output.put_i32(entry.offset);
        }
        Ok(())
    }
}

/// One secondary-index block of the v2 layout. Entries deserialize on first
/// probe.
#[derive(Debug)]
struct BitmapIndexBlock {
    key: Literal,
    offset: i32,
    entries: Option<Vec<Entry>>,
}

impl BitmapIndexBlock {
    fn try_deserialize(
        &mut self,
        data: &Bytes,
        index_block_start: usize,
        field_type: FieldType,
    ) -> Result<()> {
        if self.entries.is_some() {
            return Ok(());
        }
        let start = index_block_start + self.offset as usize;
        if start > data.len() {
            return IndexOutOfRangeSnafu {
                message: format!("bitmap index block offset {start} out of slice"),
            }
            .fail();
        }
        let mut buf = &data[start..];
        ensure_remaining(&buf, 4, "bitmap index block entry number")?;
        let entry_number = buf.get_i32();
        let mut entries = Vec::with_capacity(entry_number.max(0) as usize);
        for _ in 0..entry_number {
            let key = read_value(&mut buf, field_type)?;
            ensure_remaining(&buf, 8, "bitmap index block entry")?;
            let offset = buf.get_i32();
            let length = buf.get_i32();
            entries.push(Entry::new(key, offset, length));
        }
        self.entries = Some(entries);
        Ok(())
    }

    fn find_entry(
        &mut self,
        data: &Bytes,
        index_block_start: usize,
        field_type: FieldType,
        key: &Literal,
    ) -> Result<Option<Entry>> {
        self.try_deserialize(data, index_block_start, field_type)?;
        let entries = self.entries.as_ref().unwrap();
        let idx = lower_bound(entries.len(), |i| entries[i].key.compare_to(key))?;
        if idx < entries.len() && entries[idx].key == *key {
            return Ok(Some(entries[idx].clone()));
        }
        Ok(None)
    }
}

/// V2: sorted index blocks with lazy per-block deserialization.
#[derive(Debug)]
pub struct BitmapIndexMetaV2 {
    field_type: FieldType,
    data: Bytes,
    row_count: u32,
    has_null: bool,
    index_block_start: usize,
    body_start: usize,
    blocks: Vec<BitmapIndexBlock>,
    null_value_entry: Option<Entry>,
}

impl BitmapIndexMetaV2 {
    fn deserialize(data: &Bytes, field_type: FieldType) -> Result<Self> {
        let total_length = data.len();
        let mut buf = &data[1..];

        ensure_remaining(&buf, 9, "bitmap index v2 head")?;
        let row_count = buf.get_i32() as u32;
        let _non_null_bitmap_number = buf.get_i32();
        let has_null = buf.get_u8() != 0;
        let null_value_entry = if has_null {
            ensure_remaining(&buf, 8, "bitmap index v2 null entry")?;
            let offset = buf.get_i32();
            let length = buf.get_i32();
            Some(Entry::new(Literal::null(field_type), offset, length))
        } else {
            None
        };

        ensure_remaining(&buf, 4, "bitmap index v2 block number")?;
        let block_number = buf.get_i32();
        let mut blocks = Vec::with_capacity(block_number.max(0) as usize);
        for _ in 0..block_number {
            let key = read_value(&mut buf, field_type)?;
            ensure_remaining(&buf, 4, "bitmap index v2 block offset")?;
            let offset = buf.get_i32();
            blocks.push(BitmapIndexBlock {
                key,
                offset,
                entries: None,
            });
        }
        ensure_remaining(&buf, 4, "bitmap index v2 body offset")?;
        let bitmap_body_offset = buf.get_i32();

        let index_block_start = total_length - buf.remaining();
        let body_start = index_block_start + bitmap_body_offset as usize;

        Ok(Self {
            field_type,
            data: data.clone(),
            row_count,
            has_null,
            index_block_start,
            body_start,
            blocks,
            null_value_entry,
        })
    }

    fn find_entry(&mut self, key: &Literal) -> Result<Option<Entry>> {
        if key.is_null() {
            if self.has_null {
                return Ok(self.null_value_entry.clone());
            }
            return Ok(None);
        }
        let block_idx = match self.find_block(key)? {
            Some(idx) => idx,
            None => return Ok(None),
        };
        let data = self.data.clone();
        self.blocks[block_idx].find_entry(&data, self.index_block_start, self.field_type, key)
    }

    /// Greatest block whose first key is `<= key`; `None` when the key sorts
    /// before every block.
    fn find_block(&self, key: &Literal) -> Result<Option<usize>> {
        if self.blocks.is_empty() {
            return Ok(None);
        }
        let idx = lower_bound(self.blocks.len(), |i| self.blocks[i].key.compare_to(key))?;
        if idx == 0 && self.blocks[0].key != *key {
            return Ok(None);
        }
        if idx == self.blocks.len() || self.blocks[idx].key != *key {
            return Ok(Some(idx - 1));
        }
        Ok(Some(idx))
    }

    /// Write the v2 head, block directory and index blocks (without the
    /// version byte). Entries are sorted and packed greedily so that no
    /// serialized block exceeds `block_size_limit`.
    pub fn serialize(
        output: &mut BytesMut,
        row_count: u32,
        has_null: bool,
        null_value_entry: &Entry,
        write_entries: &mut [Entry],
        block_size_limit: i64,
    ) -> Result<()> {
        output.put_i32(row_count as i32);
        output.put_i32(write_entries.len() as i32);
        output.put_u8(has_null as u8);
        if has_null {
            output.put_i32(null_value_entry.offset);
            output.put_i32(null_value_entry.length);
        }

        write_entries.sort_by(|a, b| a.key.compare_to(&b.key).unwrap_or(Ordering::Equal));

        // (first key, block offset, serialized size, entries); size counts
        // the 4-byte entry number
        let mut packed: Vec<(Literal, i32, i32, Vec<&Entry>)> = Vec::new();
        for entry in write_entries.iter() {
            let entry_bytes = 2 * 4 + key_serialized_size(&entry.key)?;
            match packed.last_mut() {
                Some((_, _, serialized_bytes, entries))
                    if *serialized_bytes as i64 + entry_bytes as i64 <= block_size_limit =>
                {
                    *serialized_bytes += entry_bytes;
                    entries.push(entry);
                }
                _ => {
                    if 4 + entry_bytes as i64 > block_size_limit {
                        return CapacityExceededSnafu {
                            message: format!(
                                "add entry to bitmap index block failed, entry takes {} bytes but the block size limit is {block_size_limit}",
                                entry_bytes
                            ),
                        }
                        .fail();
                    }
                    let offset = packed
                        .last()
                        .map(|(_, offset, serialized_bytes, _)| offset + serialized_bytes)
                        .unwrap_or(0);
                    packed.push((entry.key.clone(), offset, 4 + entry_bytes, vec![entry]));
                }
            }
        }

        output.put_i32(packed.len() as i32);
        let mut bitmap_body_offset = 0;
        for (first_key, offset, serialized_bytes, _) in &packed {
            write_value(output, first_key)?;
            output.put_i32(*offset);
            bitmap_body_offset += serialized_bytes;
        }
        output.put_i32(bitmap_body_offset);

        for (_, _, _, entries) in &packed {
            output.put_i32(entries.len() as i32);
            for entry in entries {
                write_value(output, &entry.key)?;
                output.put_i32(entry.offset);
                output.put_i32(entry.length);
            }
        }
        Ok(())
    }
}

/// First index whose element is not less than the probe, by the given
/// comparator.
fn lower_bound(
    len: usize,
    compare: impl Fn(usize) -> Result<Ordering>,
) -> Result<usize> {
    let mut lo = 0usize;
    let mut hi = len;
    while lo < hi {
        let mid = (lo + hi) / 2;
        if compare(mid)? == Ordering::Less {
            lo = mid + 1;
        } else {
            hi = mid;
        }
    }
    Ok(lo)
}

/// Write one dictionary key with the fixed-width-or-length-prefixed codec of
/// the head.
pub fn write_value(output: &mut BytesMut, literal: &Literal) -> Result<()> {
    match literal.field_type() {
        FieldType::Boolean => output.put_u8(literal.as_boolean()? as u8),
        FieldType::TinyInt => output.put_i8(literal.as_tiny_int()?),
        FieldType::SmallInt => output.put_i16(literal.as_small_int()?),
        FieldType::Int => output.put_i32(literal.as_int()?),
        FieldType::Date => output.put_i32(literal.as_int()?),
        FieldType::BigInt => output.put_i64(literal.as_big_int()?),
        FieldType::String | FieldType::Binary => {
            let bytes = literal.as_bytes()?;
            output.put_u32(bytes.len() as u32);
            output.put_slice(bytes);
        }
        other => {
            return InvalidSnafu {
                message: format!("invalid index field type {other}"),
            }
            .fail()
        }
    }
    Ok(())
}

/// Read one dictionary key; timestamps come back as `BIGINT` literals since
/// the meta level normalizes them.
pub fn read_value(buf: &mut &[u8], field_type: FieldType) -> Result<Literal> {
    match field_type {
        FieldType::Boolean => {
            ensure_remaining(buf, 1, "BOOLEAN key")?;
            Ok(Literal::from(buf.get_u8() != 0))
        }
        FieldType::TinyInt => {
            ensure_remaining(buf, 1, "TINYINT key")?;
            Ok(Literal::from(buf.get_i8()))
        }
        FieldType::SmallInt => {
            ensure_remaining(buf, 2, "SMALLINT key")?;
            Ok(Literal::from(buf.get_i16()))
        }
        FieldType::Int => {
            ensure_remaining(buf, 4, "INT key")?;
            Ok(Literal::from(buf.get_i32()))
        }
        FieldType::Date => {
            ensure_remaining(buf, 4, "DATE key")?;
            Ok(Literal::date(buf.get_i32()))
        }
        FieldType::BigInt => {
            ensure_remaining(buf, 8, "BIGINT key")?;
            Ok(Literal::from(buf.get_i64()))
        }
        FieldType::Timestamp => {
            ensure_remaining(buf, 8, "TIMESTAMP key")?;
            // normalized to BIGINT at the meta level
            Ok(Literal::from(buf.get_i64()))
        }
        FieldType::String | FieldType::Binary => {
            ensure_remaining(buf, 4, "key length")?;
            let length = buf.get_u32() as usize;
            ensure_remaining(buf, length, "key bytes")?;
            let bytes = buf.copy_to_bytes(length);
            Ok(Literal::bytes_of_type(field_type, bytes))
        }
        other => InvalidSnafu {
            message: format!("not support field type {other} in BitmapIndex"),
        }
        .fail(),
    }
}

/// On-disk size of one key, used for v2 block packing.
pub fn key_serialized_size(literal: &Literal) -> Result<i32> {
    match literal.field_type() {
        FieldType::Boolean | FieldType::TinyInt => Ok(1),
        FieldType::SmallInt => Ok(2),
        FieldType::Int | FieldType::Date | FieldType::Float => Ok(4),
        FieldType::BigInt | FieldType::Double => Ok(8),
        FieldType::String | FieldType::Binary => Ok(4 + literal.as_bytes()?.len() as i32),
        other => InvalidSnafu {
            message: format!("invalid index field type {other}"),
        }
        .fail(),
    }
}

fn ensure_remaining(buf: &impl Buf, needed: usize, what: &str) -> Result<()> {
    if buf.remaining() < needed {
        return ShortReadSnafu {
            message: format!(
                "{what}: need {needed} bytes but only {} remain",
                buf.remaining()
            ),
        }
        .fail();
    }
    Ok(())
}

#[cfg(test)]
mod bitmap_index_meta_tests {
    use super::*;

    fn check_string_meta(meta: &mut BitmapIndexMeta) {
        let entry_a = meta.find_entry(&Literal::string("a")).unwrap().unwrap();
        assert_eq!(entry_a.offset, 20);
        assert_eq!(entry_a.length, 20);

        let entry_b = meta.find_entry(&Literal::string("b")).unwrap().unwrap();
        assert_eq!(entry_b.offset, -3);
        assert_eq!(entry_b.length, -1);

        let entry_null = meta
            .find_entry(&Literal::null(FieldType::String))
            .unwrap()
            .unwrap();
        assert_eq!(entry_null.offset, 0);
        assert_eq!(entry_null.length, 20);

        assert!(meta.find_entry(&Literal::string("non")).unwrap().is_none());
        assert!(meta.find_entry(&Literal::string("A")).unwrap().is_none());
    }

    // the reference v1 blob: 5 rows, null bitmap at body offset 0, "a" at
    // offset 20, "b" inlined as row 2
    const V1_BYTES: [i8; 72] = [
        1, 0, 0, 0, 5, 0, 0, 0, 2, 1, 0, 0, 0, 0, 0, 0, 0, 1, 97, 0, 0, 0, 20, 0, 0, 0, 1, 98, -1,
        -1, -1, -3, 58, 48, 0, 0, 1, 0, 0, 0, 0, 0, 1, 0, 16, 0, 0, 0, 1, 0, 3, 0, 58, 48, 0, 0,
        1, 0, 0, 0, 0, 0, 1, 0, 16, 0, 0, 0, 0, 0, 4, 0,
    ];

    // same dictionary in the v2 layout: one index block holding both entries
    const V2_BYTES: [i8; 105] = [
        2, 0, 0, 0, 5, 0, 0, 0, 2, 1, 0, 0, 0, 0, 0, 0, 0, 20, 0, 0, 0, 1, 0, 0, 0, 1, 97, 0, 0,
        0, 0, 0, 0, 0, 30, 0, 0, 0, 2, 0, 0, 0, 1, 97, 0, 0, 0, 20, 0, 0, 0, 20, 0, 0, 0, 1, 98,
        -1, -1, -1, -3, -1, -1, -1, -1, 58, 48, 0, 0, 1, 0, 0, 0, 0, 0, 1, 0, 16, 0, 0, 0, 1, 0,
        3, 0, 58, 48, 0, 0, 1, 0, 0, 0, 0, 0, 1, 0, 16, 0, 0, 0, 0, 0, 4, 0,
    ];

    fn to_bytes(raw: &[i8]) -> Bytes {
        Bytes::from(raw.iter().map(|b| *b as u8).collect::<Vec<u8>>())
    }

    #[test]
    fn test_v1_string_meta() {
        let data = to_bytes(&V1_BYTES);
        let mut meta = BitmapIndexMeta::deserialize(&data, FieldType::String).unwrap();
        assert!(matches!(meta, BitmapIndexMeta::V1(_)));
        assert_eq!(meta.row_count(), 5);
        check_string_meta(&mut meta);
    }

    #[test]
    fn test_v2_string_meta() {
        let data = to_bytes(&V2_BYTES);
        let mut meta = BitmapIndexMeta::deserialize(&data, FieldType::String).unwrap();
        assert!(matches!(meta, BitmapIndexMeta::V2(_)));
        assert_eq!(meta.row_count(), 5);
        check_string_meta(&mut meta);
    }

    #[test]
    fn test_unsupported_key_type() {
        let data = to_bytes(&V2_BYTES);
        assert!(BitmapIndexMeta::deserialize(&data, FieldType::Decimal).is_err());
    }

    #[test]
    fn test_v2_block_packing_capacity() {
        let mut output = BytesMut::new();
        let null_entry = Entry::new(Literal::null(FieldType::String), 0, 0);
        let mut entries = vec![Entry::new(Literal::string("a very long key"), 0, 10)];
        let result = BitmapIndexMetaV2::serialize(
            &mut output,
            1,
            false,
            &null_entry,
            &mut entries,
            /*block_size_limit=*/ 8,
        );
        assert!(matches!(result, Err(Error::CapacityExceeded { .. })));
    }

    #[test]
    fn test_v2_blocks_split_and_sorted() {
        // limit sized so each block fits exactly one int entry (4 + 8 + 4)
        let mut output = BytesMut::new();
        let null_entry = Entry::new(Literal::null(FieldType::Int), 0, 0);
        let mut entries = vec![
            Entry::new(Literal::from(30i32), 20, 10),
            Entry::new(Literal::from(10i32), 0, 10),
            Entry::new(Literal::from(20i32), 10, 10),
        ];
        BitmapIndexMetaV2::serialize(&mut output, 3, false, &null_entry, &mut entries, 16)
            .unwrap();

        let mut full = BytesMut::new();
        full.put_u8(BITMAP_VERSION_2);
        full.extend_from_slice(&output);
        let data = full.freeze();
        let mut meta = BitmapIndexMeta::deserialize(&data, FieldType::Int).unwrap();
        for (key, offset) in [(10i32, 0), (20i32, 10), (30i32, 20)] {
            let entry = meta.find_entry(&Literal::from(key)).unwrap().unwrap();
            assert_eq!(entry.offset, offset);
            assert_eq!(entry.length, 10);
        }
        assert!(meta.find_entry(&Literal::from(5i32)).unwrap().is_none());
        assert!(meta.find_entry(&Literal::from(25i32)).unwrap().is_none());
    }
}
