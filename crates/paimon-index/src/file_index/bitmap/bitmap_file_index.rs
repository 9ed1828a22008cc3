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

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use arrow::array::Array;
use arrow::datatypes::Field;
use bytes::{BufMut, Bytes, BytesMut};
use indexmap::IndexMap;
use roaring::RoaringBitmap;

use crate::error::*;
use crate::file_index::bitmap::bitmap_index_meta::{
    BitmapIndexMeta, BitmapIndexMetaV1, BitmapIndexMetaV2, Entry, BITMAP_VERSION_1,
    BITMAP_VERSION_2, DEFAULT_INDEX_BLOCK_SIZE,
};
use crate::file_index::{BitmapIndexResult, FileIndexReader, FileIndexResult};
use crate::options::{get_from_options, MemorySize, Options};
use crate::predicate::literal_converter::literals_from_array;
use crate::predicate::{Function, LeafPredicate, Literal};
use crate::spec::{field_type_of, timestamp_precision, FieldType};
use crate::utils::roaring_utils;

/// Option key selecting the bitmap meta version (1 or 2, default 2).
pub const VERSION_OPTION: &str = "version";
/// Option key bounding one v2 index block, parsed by the memory-size
/// grammar.
pub const INDEX_BLOCK_SIZE_OPTION: &str = "index-block-size";

/// Timestamp columns are indexed as `BIGINT` after precision reduction.
fn converted_type(field_type: FieldType) -> FieldType {
    if field_type == FieldType::Timestamp {
        FieldType::BigInt
    } else {
        field_type
    }
}

fn convert_literal(literal: &Literal, precision: Option<i32>) -> Result<Literal> {
    if literal.field_type() != FieldType::Timestamp {
        return Ok(literal.clone());
    }
    if literal.is_null() {
        return Ok(Literal::null(FieldType::BigInt));
    }
    let precision = precision.ok_or_else(|| Error::DataTypeInvalid {
        message: "timestamp literal requires a timestamp column".to_string(),
    })?;
    Ok(Literal::from(
        literal.as_timestamp()?.to_int64_by_precision(precision),
    ))
}

/// Accumulates one column's values and serializes the bitmap index body.
pub struct BitmapFileIndexWriter {
    version: u8,
    timestamp_precision: Option<i32>,
    options: Options,
    id_to_bitmap: IndexMap<Literal, RoaringBitmap>,
    null_bitmap: RoaringBitmap,
    row_number: u32,
}

impl BitmapFileIndexWriter {
    pub fn new(field: &Field, options: Options) -> Result<Self> {
        let version = get_from_options::<u8>(&options, VERSION_OPTION, BITMAP_VERSION_2)?;
        if version != BITMAP_VERSION_1 && version != BITMAP_VERSION_2 {
            return InvalidSnafu {
                message: format!("invalid version: {version} for bitmap index"),
            }
            .fail();
        }
        let field_type = field_type_of(field.data_type())?;
        let timestamp_precision = if field_type == FieldType::Timestamp {
            Some(timestamp_precision(field.data_type())?)
        } else {
            None
        };
        Ok(Self {
            version,
            timestamp_precision,
            options,
            id_to_bitmap: IndexMap::new(),
            null_bitmap: RoaringBitmap::new(),
            row_number: 0,
        })
    }

    /// Feed one value array of the column, row by row.
    pub fn add_batch(&mut self, array: &dyn Array) -> Result<()> {
        for literal in literals_from_array(array)? {
            self.write(&literal)?;
        }
        Ok(())
    }

    pub fn write(&mut self, literal: &Literal) -> Result<()> {
        if literal.is_null() {
            self.null_bitmap.insert(self.row_number);
        } else {
            let converted = convert_literal(literal, self.timestamp_precision)?;
            self.id_to_bitmap
                .entry(converted)
                .or_default()
                .insert(self.row_number);
        }
        self.row_number += 1;
        Ok(())
    }

    /// Produce the index body: version byte, meta head and the concatenated
    /// bitmap bodies. A null bitmap with more than one row occupies the first
    /// body slice; singletons are inlined into their offsets.
    pub fn serialized_bytes(&self) -> Result<Bytes> {
        let null_bitmap_bytes = roaring_utils::serialize(&self.null_bitmap)?;

        let mut write_entries = Vec::with_capacity(self.id_to_bitmap.len());
        let mut serialized_bitmaps = Vec::new();
        let mut offset_ref = if self.null_bitmap.len() <= 1 {
            0i32
        } else {
            null_bitmap_bytes.len() as i32
        };
        for (literal, bitmap) in &self.id_to_bitmap {
            if bitmap.len() == 1 {
                let row = bitmap.min().unwrap_or(0) as i32;
                write_entries.push(Entry::new(literal.clone(), -1 - row, -1));
            } else {
                let bitmap_bytes = roaring_utils::serialize(bitmap)?;
                write_entries.push(Entry::new(
                    literal.clone(),
                    offset_ref,
                    bitmap_bytes.len() as i32,
                ));
                offset_ref += bitmap_bytes.len() as i32;
                serialized_bitmaps.push(bitmap_bytes);
            }
        }

        let has_null = !self.null_bitmap.is_empty();
        let null_value_offset = if self.null_bitmap.len() == 1 {
            -1 - self.null_bitmap.min().unwrap_or(0) as i32
        } else {
            0
        };
        let field_type = write_entries
            .first()
            .map(|e| e.key.field_type())
            .unwrap_or(FieldType::Int);
        let null_value_entry = Entry::new(
            Literal::null(converted_type(field_type)),
            null_value_offset,
            null_bitmap_bytes.len() as i32,
        );

        let mut output = BytesMut::new();
        output.put_u8(self.version);
        match self.version {
            BITMAP_VERSION_1 => {
                BitmapIndexMetaV1::serialize(
                    &mut output,
                    self.row_number,
                    has_null,
                    &null_value_entry,
                    &write_entries,
                )?;
            }
            BITMAP_VERSION_2 => {
                let block_size_limit = match self.options.get(INDEX_BLOCK_SIZE_OPTION) {
                    Some(raw) => MemorySize::parse_bytes(raw)?,
                    None => DEFAULT_INDEX_BLOCK_SIZE,
                };
                let mut entries = write_entries;
                BitmapIndexMetaV2::serialize(
                    &mut output,
                    self.row_number,
                    has_null,
                    &null_value_entry,
                    &mut entries,
                    block_size_limit,
                )?;
            }
            version => {
                return InvalidSnafu {
                    message: format!("invalid version: {version} for bitmap index"),
                }
                .fail()
            }
        }

        if self.null_bitmap.len() > 1 {
            output.put_slice(&null_bitmap_bytes);
        }
        for bitmap_bytes in serialized_bitmaps {
            output.put_slice(&bitmap_bytes);
        }
        Ok(output.freeze())
    }
}

struct BitmapReaderState {
    meta: Option<BitmapIndexMeta>,
    bitmaps: HashMap<Literal, RoaringBitmap>,
}

struct BitmapReaderCore {
    converted_type: FieldType,
    timestamp_precision: Option<i32>,
    data: Bytes,
    state: Mutex<BitmapReaderState>,
}

impl BitmapReaderCore {
    fn ensure_meta<'a>(
        &self,
        state: &'a mut BitmapReaderState,
    ) -> Result<&'a mut BitmapIndexMeta> {
        if state.meta.is_none() {
            state.meta = Some(BitmapIndexMeta::deserialize(&self.data, self.converted_type)?);
        }
        Ok(state.meta.as_mut().unwrap())
    }

    fn in_list_bitmap(
        &self,
        state: &mut BitmapReaderState,
        literals: &[Literal],
    ) -> Result<RoaringBitmap> {
        let mut result = RoaringBitmap::new();
        for literal in literals {
            let converted = convert_literal(literal, self.timestamp_precision)?;
            if let Some(bitmap) = state.bitmaps.get(&converted) {
                result |= bitmap;
                continue;
            }
            let bitmap = self.read_bitmap(state, &converted)?;
            result |= &bitmap;
            state.bitmaps.insert(converted, bitmap);
        }
        Ok(result)
    }

    fn read_bitmap(
        &self,
        state: &mut BitmapReaderState,
        literal: &Literal,
    ) -> Result<RoaringBitmap> {
        let meta = self.ensure_meta(state)?;
        let entry = match meta.find_entry(literal)? {
            Some(entry) => entry,
            None => return Ok(RoaringBitmap::new()),
        };
        if entry.offset < 0 {
            let mut bitmap = RoaringBitmap::new();
            bitmap.insert((-1 - entry.offset) as u32);
            return Ok(bitmap);
        }
        let start = meta.body_start() + entry.offset as usize;
        let end = start + entry.length as usize;
        if end > self.data.len() {
            return IndexOutOfRangeSnafu {
                message: format!(
                    "bitmap body slice {start}..{end} exceeds index slice of {} bytes",
                    self.data.len()
                ),
            }
            .fail();
        }
        roaring_utils::deserialize(&self.data[start..end])
    }

    fn row_count(&self, state: &mut BitmapReaderState) -> Result<u32> {
        Ok(self.ensure_meta(state)?.row_count())
    }
}

/// Reads a bitmap index body and answers predicates with lazy row-id
/// bitmaps. The meta deserializes on first force and every per-value bitmap
/// on first touch, cached per literal.
pub struct BitmapFileIndexReader {
    core: Arc<BitmapReaderCore>,
}

impl BitmapFileIndexReader {
    pub fn new(field: &Field, data: Bytes) -> Result<Self> {
        let field_type = field_type_of(field.data_type())?;
        let timestamp_precision = if field_type == FieldType::Timestamp {
            Some(timestamp_precision(field.data_type())?)
        } else {
            None
        };
        Ok(Self {
            core: Arc::new(BitmapReaderCore {
                converted_type: converted_type(field_type),
                timestamp_precision,
                data,
                state: Mutex::new(BitmapReaderState {
                    meta: None,
                    bitmaps: HashMap::new(),
                }),
            }),
        })
    }

    fn visit_in(&self, literals: Vec<Literal>) -> Result<FileIndexResult> {
        if literals.is_empty() {
            return InvalidSnafu {
                message: "literals cannot be empty in In predicate".to_string(),
            }
            .fail();
        }
        let core = self.core.clone();
        Ok(FileIndexResult::Bitmap(BitmapIndexResult::new(Box::new(
            move || {
                let mut state = core.state.lock().unwrap();
                core.in_list_bitmap(&mut state, &literals)
            },
        ))))
    }

    fn visit_not_in(&self, literals: Vec<Literal>) -> Result<FileIndexResult> {
        if literals.is_empty() {
            return InvalidSnafu {
                message: "literals cannot be empty in In predicate".to_string(),
            }
            .fail();
        }
        let core = self.core.clone();
        let null_literal = Literal::null(self.core.converted_type);
        Ok(FileIndexResult::Bitmap(BitmapIndexResult::new(Box::new(
            move || {
                let mut state = core.state.lock().unwrap();
                let mut bitmap = core.in_list_bitmap(&mut state, &literals)?;
                let row_count = core.row_count(&mut state)?;
                roaring_utils::flip(&mut bitmap, 0, row_count);
                // x NOT IN (...) is false for null-valued rows
                let null_bitmap = core.in_list_bitmap(&mut state, &[null_literal])?;
                bitmap -= null_bitmap;
                Ok(bitmap)
            },
        ))))
    }

    fn null_literal(&self) -> Literal {
        Literal::null(self.core.converted_type)
    }
}

impl FileIndexReader for BitmapFileIndexReader {
    fn evaluate(&self, predicate: &LeafPredicate) -> Result<FileIndexResult> {
        match predicate.function() {
            Function::Equal => self.visit_in(vec![predicate.literal()?.clone()]),
            Function::NotEqual => self.visit_not_in(vec![predicate.literal()?.clone()]),
            Function::In => self.visit_in(predicate.literals().to_vec()),
            Function::NotIn => self.visit_not_in(predicate.literals().to_vec()),
            Function::IsNull => self.visit_in(vec![self.null_literal()]),
            Function::IsNotNull => self.visit_not_in(vec![self.null_literal()]),
            _ => Ok(FileIndexResult::Remain),
        }
    }
}
