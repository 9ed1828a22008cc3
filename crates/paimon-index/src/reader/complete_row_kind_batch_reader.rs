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

use std::sync::Arc;

use arrow::array::{Array, ArrayRef, Int8Array, StructArray};
use arrow::datatypes::{DataType, Field};

use crate::error::*;
use crate::metrics::Metrics;
use crate::reader::batch_reader::{BatchReader, BatchWithBitmap};
use crate::reader::row_kind::{RowKind, VALUE_KIND_FIELD};

/// Guarantees every batch carries a `_VALUE_KIND` column: batches that
/// already have one pass through, all others get a constant `insert` column
/// prepended. The constant array is grown once and sliced per batch.
pub struct CompleteRowKindBatchReader {
    reader: Box<dyn BatchReader>,
    row_kind_array: Option<ArrayRef>,
}

impl CompleteRowKindBatchReader {
    pub fn new(reader: Box<dyn BatchReader>) -> Self {
        Self {
            reader,
            row_kind_array: None,
        }
    }

    fn insert_kind_array(&mut self, length: usize) -> ArrayRef {
        let needs_grow = match &self.row_kind_array {
            Some(array) => array.len() < length,
            None => true,
        };
        if needs_grow {
            let values = vec![RowKind::Insert.to_byte_value(); length];
            self.row_kind_array = Some(Arc::new(Int8Array::from(values)));
        }
        let array = self.row_kind_array.as_ref().unwrap();
        if array.len() == length {
            array.clone()
        } else {
            array.slice(0, length)
        }
    }

    fn complete(&mut self, batch: StructArray) -> Result<StructArray> {
        if batch.column_by_name(VALUE_KIND_FIELD).is_some() {
            return Ok(batch);
        }
        let row_kind_array = self.insert_kind_array(batch.len());
        let (fields, columns, nulls) = batch.into_parts();

        let mut fields_with_kind =
            vec![Arc::new(Field::new(VALUE_KIND_FIELD, DataType::Int8, false))];
        fields_with_kind.extend(fields.iter().cloned());
        let mut columns_with_kind = vec![row_kind_array];
        columns_with_kind.extend(columns);

        StructArray::try_new(fields_with_kind.into(), columns_with_kind, nulls).map_err(|e| {
            Error::Invalid {
                message: format!("cannot prepend row kind column: {e}"),
            }
        })
    }
}

impl BatchReader for CompleteRowKindBatchReader {
    fn next_batch_with_bitmap(&mut self) -> Result<Option<BatchWithBitmap>> {
        let Some((batch, bitmap)) = self.reader.next_batch_with_bitmap()? else {
            return Ok(None);
        };
        Ok(Some((self.complete(batch)?, bitmap)))
    }

    fn close(&mut self) {
        self.reader.close()
    }

    fn reader_metrics(&self) -> Metrics {
        self.reader.reader_metrics()
    }
}

#[cfg(test)]
mod complete_row_kind_batch_reader_tests {
    use roaring::RoaringBitmap;

    use super::*;
    use crate::reader::batch_reader::testing::{int_batch, int_column, VecBatchReader};

    fn kinds(batch: &StructArray) -> Vec<i8> {
        batch
            .column_by_name(VALUE_KIND_FIELD)
            .unwrap()
            .as_any()
            .downcast_ref::<Int8Array>()
            .unwrap()
            .values()
            .to_vec()
    }

    #[test]
    fn test_prepends_insert_kind() {
        let source = VecBatchReader::all_valid(int_batch(&[10, 11, 12]), 2);
        let mut reader = CompleteRowKindBatchReader::new(Box::new(source));

        let (batch, _) = reader.next_batch_with_bitmap().unwrap().unwrap();
        assert_eq!(batch.num_columns(), 2);
        assert_eq!(kinds(&batch), vec![0, 0]);

        let (batch, _) = reader.next_batch_with_bitmap().unwrap().unwrap();
        assert_eq!(kinds(&batch), vec![0]);
        assert_eq!(
            int_column(&StructArray::from(vec![(
                Arc::new(Field::new("f1", DataType::Int32, true)),
                batch.column_by_name("f1").unwrap().clone(),
            )])),
            vec![12]
        );

        assert!(reader.next_batch_with_bitmap().unwrap().is_none());
    }

    #[test]
    fn test_passes_through_existing_kind_column() {
        let values: ArrayRef = Arc::new(Int8Array::from(vec![3i8, 0]));
        let payload: ArrayRef = Arc::new(arrow::array::Int32Array::from(vec![7, 8]));
        let batch = StructArray::from(vec![
            (
                Arc::new(Field::new(VALUE_KIND_FIELD, DataType::Int8, false)),
                values,
            ),
            (Arc::new(Field::new("f1", DataType::Int32, true)), payload),
        ]);
        let source = VecBatchReader::all_valid(batch, 4);
        let mut reader = CompleteRowKindBatchReader::new(Box::new(source));
        let (batch, _) = reader.next_batch_with_bitmap().unwrap().unwrap();
        assert_eq!(batch.num_columns(), 2);
        assert_eq!(kinds(&batch), vec![3, 0]);
    }

    #[test]
    fn test_keeps_partial_bitmap() {
        let source = VecBatchReader::new(
            int_batch(&[10, 11, 12]),
            RoaringBitmap::from_iter([2u32]),
            3,
        );
        let mut reader = CompleteRowKindBatchReader::new(Box::new(source));
        let (batch, bitmap) = reader.next_batch_with_bitmap().unwrap().unwrap();
        assert_eq!(batch.num_columns(), 2);
        assert_eq!(bitmap.iter().collect::<Vec<u32>>(), vec![2]);
    }
}
