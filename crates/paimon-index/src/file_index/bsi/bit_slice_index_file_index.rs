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
use std::sync::Arc;

use arrow::array::Array;
use arrow::datatypes::Field;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use roaring::RoaringBitmap;

use crate::error::*;
use crate::file_index::bsi::{Appender, BitSliceIndexRoaringBitmap};
use crate::file_index::{BitmapIndexResult, FileIndexReader, FileIndexResult};
use crate::predicate::literal_converter::literals_from_array;
use crate::predicate::{Function, LeafPredicate, Literal};
use crate::spec::{field_type_of, timestamp_precision, FieldType};
use crate::utils::roaring_utils;

pub const BSI_VERSION_1: u8 = 1;

/// Maps a literal of the indexed column to the signed integer domain of the
/// bit-slice index.
#[derive(Debug, Clone, Copy)]
enum ValueMapper {
    TinyInt,
    SmallInt,
    Int,
    Date,
    BigInt,
    Timestamp { precision: i32 },
}

impl ValueMapper {
    fn for_field(field: &Field) -> Result<Self> {
        match field_type_of(field.data_type())? {
            FieldType::TinyInt => Ok(ValueMapper::TinyInt),
            FieldType::SmallInt => Ok(ValueMapper::SmallInt),
            FieldType::Int => Ok(ValueMapper::Int),
            FieldType::Date => Ok(ValueMapper::Date),
            FieldType::BigInt => Ok(ValueMapper::BigInt),
            FieldType::Timestamp => Ok(ValueMapper::Timestamp {
                precision: timestamp_precision(field.data_type())?,
            }),
            _ => InvalidSnafu {
                message:
                    "bit slice index only support TINYINT/SMALLINT/INT/BIGINT/DATE/TIMESTAMP"
                        .to_string(),
            }
            .fail(),
        }
    }

    fn map(&self, literal: &Literal) -> Result<i64> {
        if literal.is_null() {
            return InvalidSnafu {
                message: "literal cannot be null when mapped by the bit slice index".to_string(),
            }
            .fail();
        }
        match self {
            ValueMapper::TinyInt => Ok(literal.as_tiny_int()? as i64),
            ValueMapper::SmallInt => Ok(literal.as_small_int()? as i64),
            ValueMapper::Int | ValueMapper::Date => Ok(literal.as_int()? as i64),
            ValueMapper::BigInt => literal.as_big_int(),
            ValueMapper::Timestamp { precision } => {
                Ok(literal.as_timestamp()?.to_int64_by_precision(*precision))
            }
        }
    }
}

/// Accumulates one integer column and serializes the bsi body: positive
/// values go to one slice set, absolute values of negatives to another.
pub struct BitSliceIndexFileIndexWriter {
    mapper: ValueMapper,
    values: Vec<Option<i64>>,
}

impl BitSliceIndexFileIndexWriter {
    pub fn new(field: &Field) -> Result<Self> {
        Ok(Self {
            mapper: ValueMapper::for_field(field)?,
            values: Vec::new(),
        })
    }

    pub fn add_batch(&mut self, array: &dyn Array) -> Result<()> {
        for literal in literals_from_array(array)? {
            if literal.is_null() {
                self.values.push(None);
            } else {
                self.values.push(Some(self.mapper.map(&literal)?));
            }
        }
        Ok(())
    }

    pub fn write(&mut self, value: Option<i64>) {
        self.values.push(value);
    }

    pub fn serialized_bytes(&self) -> Result<Bytes> {
        let positive_max = self
            .values
            .iter()
            .flatten()
            .filter(|v| **v >= 0)
            .max()
            .copied()
            .unwrap_or(0);
        let negative_max = self
            .values
            .iter()
            .flatten()
            .filter(|v| **v < 0)
            .map(|v| -*v)
            .max()
            .unwrap_or(0);

        let mut positive = Appender::new(0, positive_max)?;
        let mut negative = Appender::new(0, negative_max)?;
        for (rid, value) in self.values.iter().enumerate() {
            match value {
                Some(value) if *value >= 0 => positive.append(rid as u32, *value)?,
                Some(value) => negative.append(rid as u32, -*value)?,
                None => {}
            }
        }

        let mut output = BytesMut::new();
        output.put_u8(BSI_VERSION_1);
        output.put_i32(self.values.len() as i32);
        output.put_u8(positive.is_not_empty() as u8);
        if positive.is_not_empty() {
            output.put_slice(&positive.serialize()?);
        }
        output.put_u8(negative.is_not_empty() as u8);
        if negative.is_not_empty() {
            output.put_slice(&negative.serialize()?);
        }
        Ok(output.freeze())
    }
}

/// Answers equality and range predicates over a signed integer column with
/// lazy row-id bitmaps.
pub struct BitSliceIndexFileIndexReader {
    row_count: u32,
    mapper: ValueMapper,
    positive: Arc<BitSliceIndexRoaringBitmap>,
    negative: Arc<BitSliceIndexRoaringBitmap>,
}

impl BitSliceIndexFileIndexReader {
    pub fn new(field: &Field, data: Bytes) -> Result<Self> {
        let mapper = ValueMapper::for_field(field)?;
        let mut cursor = Cursor::new(data.as_ref());
        if cursor.remaining() < 6 {
            return ShortReadSnafu {
                message: format!("bsi index head needs 6 bytes, got {}", cursor.remaining()),
            }
            .fail();
        }
        let version = cursor.get_u8();
        if version > BSI_VERSION_1 {
            return InvalidSnafu {
                message: format!(
                    "read bsi index file fail, do not support version {version}, please update plugin version"
                ),
            }
            .fail();
        }
        let row_count = cursor.get_i32() as u32;
        let has_positive = cursor.get_u8() != 0;
        let positive = if has_positive {
            BitSliceIndexRoaringBitmap::deserialize(&mut cursor)?
        } else {
            BitSliceIndexRoaringBitmap::empty()
        };
        if cursor.remaining() < 1 {
            return ShortReadSnafu {
                message: "bsi index negative slice flag".to_string(),
            }
            .fail();
        }
        let has_negative = cursor.get_u8() != 0;
        let negative = if has_negative {
            BitSliceIndexRoaringBitmap::deserialize(&mut cursor)?
        } else {
            BitSliceIndexRoaringBitmap::empty()
        };
        Ok(Self {
            row_count,
            mapper,
            positive: Arc::new(positive),
            negative: Arc::new(negative),
        })
    }

    fn lazy(
        &self,
        produce: impl FnOnce(
                Arc<BitSliceIndexRoaringBitmap>,
                Arc<BitSliceIndexRoaringBitmap>,
            ) -> Result<RoaringBitmap>
            + Send
            + 'static,
    ) -> FileIndexResult {
        let positive = self.positive.clone();
        let negative = self.negative.clone();
        FileIndexResult::Bitmap(BitmapIndexResult::new(Box::new(move || {
            produce(positive, negative)
        })))
    }

    fn in_list(
        positive: &BitSliceIndexRoaringBitmap,
        negative: &BitSliceIndexRoaringBitmap,
        values: &[i64],
    ) -> Result<RoaringBitmap> {
        let mut bitmaps = Vec::with_capacity(values.len());
        for value in values {
            let equal = if *value < 0 {
                negative.equal(-*value)?
            } else {
                positive.equal(*value)?
            };
            bitmaps.push(equal);
        }
        Ok(roaring_utils::fast_union(bitmaps.iter()))
    }

    fn mapped(&self, predicate: &LeafPredicate) -> Result<Vec<i64>> {
        predicate
            .literals()
            .iter()
            .map(|literal| self.mapper.map(literal))
            .collect()
    }
}

impl FileIndexReader for BitSliceIndexFileIndexReader {
    fn evaluate(&self, predicate: &LeafPredicate) -> Result<FileIndexResult> {
        match predicate.function() {
            Function::Equal | Function::In => {
                let values = self.mapped(predicate)?;
                Ok(self.lazy(move |positive, negative| {
                    Self::in_list(&positive, &negative, &values)
                }))
            }
            Function::NotEqual | Function::NotIn => {
                let values = self.mapped(predicate)?;
                Ok(self.lazy(move |positive, negative| {
                    let ebm = positive.is_not_null() | negative.is_not_null();
                    let in_bitmap = Self::in_list(&positive, &negative, &values)?;
                    Ok(ebm - in_bitmap)
                }))
            }
            Function::GreaterThan => {
                let value = self.mapper.map(predicate.literal()?)?;
                Ok(self.lazy(move |positive, negative| {
                    if value >= 0 {
                        positive.greater_than(value)
                    } else {
                        // any non-negative value beats any negative one
                        Ok(negative.less_than(-value)? | positive.is_not_null())
                    }
                }))
            }
            Function::GreaterOrEqual => {
                let value = self.mapper.map(predicate.literal()?)?;
                Ok(self.lazy(move |positive, negative| {
                    if value >= 0 {
                        positive.greater_or_equal(value)
                    } else {
                        Ok(negative.less_or_equal(-value)? | positive.is_not_null())
                    }
                }))
            }
            Function::LessThan => {
                let value = self.mapper.map(predicate.literal()?)?;
                Ok(self.lazy(move |positive, negative| {
                    if value < 0 {
                        negative.greater_than(-value)
                    } else {
                        Ok(positive.less_than(value)? | negative.is_not_null())
                    }
                }))
            }
            Function::LessOrEqual => {
                let value = self.mapper.map(predicate.literal()?)?;
                Ok(self.lazy(move |positive, negative| {
                    if value < 0 {
                        negative.greater_or_equal(-value)
                    } else {
                        Ok(positive.less_or_equal(value)? | negative.is_not_null())
                    }
                }))
            }
            Function::IsNull => {
                let row_count = self.row_count;
                Ok(self.lazy(move |positive, negative| {
                    let mut result = positive.is_not_null() | negative.is_not_null();
                    roaring_utils::flip(&mut result, 0, row_count);
                    Ok(result)
                }))
            }
            Function::IsNotNull => Ok(self.lazy(move |positive, negative| {
                Ok(positive.is_not_null() | negative.is_not_null())
            })),
            _ => Ok(FileIndexResult::Remain),
        }
    }
}
