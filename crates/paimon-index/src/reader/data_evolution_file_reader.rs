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

use arrow::array::{new_null_array, Array, ArrayRef, StructArray};
use arrow::datatypes::SchemaRef;

use crate::error::*;
use crate::metrics::Metrics;
use crate::reader::batch_reader::{
    all_valid_bitmap, collect_reader_metrics, concat_struct_arrays, filtered_slices, BatchReader,
    BatchWithBitmap,
};

/// Assembles rows that data evolution split across several files.
///
/// Each child reader supplies a subset of the output fields. For output
/// field `i`, `reader_offsets[i]` names the child and `field_offsets[i]` the
/// field within that child's batches; `-1` marks a field absent everywhere,
/// which is filled with typed nulls. Children must produce the same number
/// of rows per output batch; a mismatch is fatal.
pub struct DataEvolutionFileReader {
    readers: Vec<Option<Box<dyn BatchReader>>>,
    read_schema: SchemaRef,
    read_batch_size: usize,
    reader_offsets: Vec<i32>,
    field_offsets: Vec<i32>,
    // rows pulled beyond one output batch, per child
    cached_arrays: Vec<Vec<StructArray>>,
    non_exist_arrays: Vec<Option<ArrayRef>>,
}

impl DataEvolutionFileReader {
    pub fn new(
        readers: Vec<Option<Box<dyn BatchReader>>>,
        read_schema: SchemaRef,
        read_batch_size: usize,
        reader_offsets: Vec<i32>,
        field_offsets: Vec<i32>,
    ) -> Result<Self> {
        if read_schema.fields().is_empty() {
            return InvalidSnafu {
                message: "read schema must not be empty".to_string(),
            }
            .fail();
        }
        if read_schema.fields().len() != reader_offsets.len()
            || reader_offsets.len() != field_offsets.len()
        {
            return InvalidSnafu {
                message: "read schema, reader offsets and field offsets must have the same size"
                    .to_string(),
            }
            .fail();
        }
        if readers.len() <= 1 {
            return InvalidSnafu {
                message: "readers size is supposed to be more than 1".to_string(),
            }
            .fail();
        }
        let reader_count = readers.len();
        let field_count = read_schema.fields().len();
        Ok(Self {
            readers,
            read_schema,
            read_batch_size,
            reader_offsets,
            field_offsets,
            cached_arrays: (0..reader_count).map(|_| Vec::new()).collect(),
            non_exist_arrays: vec![None; field_count],
        })
    }

    fn cached_length(&self, reader_idx: usize) -> usize {
        self.cached_arrays[reader_idx]
            .iter()
            .map(|array| array.len())
            .sum()
    }

    /// Pull up to `read_batch_size` contiguous valid rows from one child,
    /// starting with anything truncated off the previous turn. `None` once
    /// the child is exhausted and no leftover remains.
    fn next_batch_for_single_reader(&mut self, reader_idx: usize) -> Result<Option<StructArray>> {
        let mut total_length = self.cached_length(reader_idx);
        if total_length >= self.read_batch_size {
            return InvalidSnafu {
                message: format!(
                    "Unexpected: the length of cached array in last turn {total_length} exceed read batch size {}",
                    self.read_batch_size
                ),
            }
            .fail();
        }
        let mut pieces = std::mem::take(&mut self.cached_arrays[reader_idx]);
        while total_length < self.read_batch_size {
            let reader = self.readers[reader_idx]
                .as_mut()
                .ok_or_else(|| Error::Unknown {
                    message: "reader slot without reader was polled".to_string(),
                })?;
            let Some((batch, bitmap)) = reader.next_batch_with_bitmap()? else {
                break;
            };
            for slice in filtered_slices(&batch, &bitmap)? {
                if total_length + slice.len() > self.read_batch_size {
                    // truncate to align the output batch size and keep the
                    // remainder for the next turn
                    let truncated_length = self.read_batch_size - total_length;
                    if truncated_length == 0 {
                        self.cached_arrays[reader_idx].push(slice);
                    } else {
                        pieces.push(slice.slice(0, truncated_length));
                        self.cached_arrays[reader_idx]
                            .push(slice.slice(truncated_length, slice.len() - truncated_length));
                        total_length += truncated_length;
                    }
                } else {
                    total_length += slice.len();
                    pieces.push(slice);
                }
            }
        }
        if pieces.is_empty() {
            return Ok(None);
        }
        Ok(Some(concat_struct_arrays(&pieces)?))
    }

    fn non_exist_array(&mut self, field_idx: usize, length: usize) -> ArrayRef {
        let needs_grow = match &self.non_exist_arrays[field_idx] {
            Some(array) => array.len() < length,
            None => true,
        };
        if needs_grow {
            self.non_exist_arrays[field_idx] = Some(new_null_array(
                self.read_schema.field(field_idx).data_type(),
                length,
            ));
        }
        let array = self.non_exist_arrays[field_idx].as_ref().unwrap();
        if array.len() == length {
            array.clone()
        } else {
            array.slice(0, length)
        }
    }
}

impl BatchReader for DataEvolutionFileReader {
    fn next_batch_with_bitmap(&mut self) -> Result<Option<BatchWithBitmap>> {
        let mut array_for_each_reader: Vec<Option<StructArray>> =
            Vec::with_capacity(self.readers.len());
        let mut array_length: Option<usize> = None;
        for reader_idx in 0..self.readers.len() {
            if self.readers[reader_idx].is_none() {
                // no read field from this slot
                array_for_each_reader.push(None);
                continue;
            }
            let Some(array) = self.next_batch_for_single_reader(reader_idx)? else {
                return Ok(None);
            };
            match array_length {
                None => array_length = Some(array.len()),
                Some(expected) if expected != array.len() => {
                    return InvalidSnafu {
                        message: "array for single reader length mismatch others".to_string(),
                    }
                    .fail()
                }
                Some(_) => {}
            }
            array_for_each_reader.push(Some(array));
        }
        let array_length = array_length.unwrap_or(0);

        let field_count = self.read_schema.fields().len();
        let mut columns: Vec<ArrayRef> = Vec::with_capacity(field_count);
        for field_idx in 0..field_count {
            let reader_offset = self.reader_offsets[field_idx];
            if reader_offset == -1 {
                columns.push(self.non_exist_array(field_idx, array_length));
                continue;
            }
            let source = array_for_each_reader
                .get(reader_offset as usize)
                .and_then(|a| a.as_ref())
                .ok_or_else(|| Error::IndexOutOfRange {
                    message: format!("no child batch at reader offset {reader_offset}"),
                })?;
            let field_offset = self.field_offsets[field_idx] as usize;
            if field_offset >= source.num_columns() {
                return IndexOutOfRangeSnafu {
                    message: format!(
                        "field offset {field_offset} out of range for child batch with {} columns",
                        source.num_columns()
                    ),
                }
                .fail();
            }
            columns.push(source.column(field_offset).clone());
        }

        let batch = StructArray::try_new(self.read_schema.fields().clone(), columns, None)
            .map_err(|e| Error::Invalid {
                message: format!("cannot assemble data evolution batch: {e}"),
            })?;
        let bitmap = all_valid_bitmap(array_length);
        Ok(Some((batch, bitmap)))
    }

    fn close(&mut self) {
        self.cached_arrays.iter_mut().for_each(|cache| cache.clear());
        self.non_exist_arrays.iter_mut().for_each(|slot| *slot = None);
        for reader in self.readers.iter_mut().flatten() {
            reader.close();
        }
    }

    fn reader_metrics(&self) -> Metrics {
        collect_reader_metrics(self.readers.iter().flatten().map(|r| r.as_ref()))
    }
}

#[cfg(test)]
mod data_evolution_file_reader_tests {
    use arrow::array::Int32Array;
    use arrow::datatypes::{DataType, Field, Schema};
    use roaring::RoaringBitmap;

    use super::*;
    use crate::reader::batch_reader::testing::VecBatchReader;

    fn single_column_batch(name: &str, values: &[Option<i32>]) -> StructArray {
        let column: ArrayRef = Arc::new(Int32Array::from(values.to_vec()));
        StructArray::from(vec![(
            Arc::new(Field::new(name, DataType::Int32, true)),
            column,
        )])
    }

    fn output_schema(names: &[&str]) -> SchemaRef {
        Arc::new(Schema::new(
            names
                .iter()
                .map(|name| Field::new(*name, DataType::Int32, true))
                .collect::<Vec<Field>>(),
        ))
    }

    fn column_values(batch: &StructArray, idx: usize) -> Vec<Option<i32>> {
        let array = batch
            .column(idx)
            .as_any()
            .downcast_ref::<Int32Array>()
            .unwrap();
        (0..array.len())
            .map(|i| if array.is_null(i) { None } else { Some(array.value(i)) })
            .collect()
    }

    fn reader(values: &[Option<i32>], name: &str, batch_size: usize) -> Box<dyn BatchReader> {
        Box::new(VecBatchReader::all_valid(
            single_column_batch(name, values),
            batch_size,
        ))
    }

    #[test]
    fn test_unions_fields_across_generations() {
        let a: Vec<Option<i32>> = (0..10).map(Some).collect();
        let b: Vec<Option<i32>> = (100..110).map(Some).collect();
        let readers = vec![Some(reader(&a, "a", 3)), Some(reader(&b, "b", 4))];
        let mut evolution = DataEvolutionFileReader::new(
            readers,
            output_schema(&["a", "b", "c"]),
            /*read_batch_size=*/ 4,
            vec![0, 1, -1],
            vec![0, 0, -1],
        )
        .unwrap();

        let mut seen_a = Vec::new();
        let mut seen_b = Vec::new();
        while let Some(batch) = evolution.next_batch().unwrap() {
            assert_eq!(batch.num_columns(), 3);
            assert!(batch.len() <= 4);
            seen_a.extend(column_values(&batch, 0));
            seen_b.extend(column_values(&batch, 1));
            // the absent field is filled with typed nulls
            assert!(column_values(&batch, 2).iter().all(|v| v.is_none()));
        }
        assert_eq!(seen_a, a);
        assert_eq!(seen_b, b);
    }

    #[test]
    fn test_row_count_mismatch_is_fatal() {
        let a: Vec<Option<i32>> = (0..10).map(Some).collect();
        let b: Vec<Option<i32>> = (100..105).map(Some).collect();
        let readers = vec![Some(reader(&a, "a", 4)), Some(reader(&b, "b", 4))];
        let mut evolution = DataEvolutionFileReader::new(
            readers,
            output_schema(&["a", "b"]),
            8,
            vec![0, 1],
            vec![0, 0],
        )
        .unwrap();
        assert!(evolution.next_batch_with_bitmap().is_err());
    }

    #[test]
    fn test_partial_bitmaps_are_compacted() {
        // child batches carry partial bitmaps; the assembled rows only hold
        // valid ones
        let a = single_column_batch("a", &(0..8).map(Some).collect::<Vec<_>>());
        let keep: RoaringBitmap = [0u32, 2, 3, 7].into_iter().collect();
        let left = Box::new(VecBatchReader::new(a, keep, 8)) as Box<dyn BatchReader>;
        let b: Vec<Option<i32>> = (100..104).map(Some).collect();
        let readers = vec![Some(left), Some(reader(&b, "b", 4))];
        let mut evolution = DataEvolutionFileReader::new(
            readers,
            output_schema(&["a", "b"]),
            4,
            vec![0, 1],
            vec![0, 0],
        )
        .unwrap();

        let batch = evolution.next_batch().unwrap().unwrap();
        assert_eq!(column_values(&batch, 0), vec![Some(0), Some(2), Some(3), Some(7)]);
        assert_eq!(
            column_values(&batch, 1),
            vec![Some(100), Some(101), Some(102), Some(103)]
        );
        assert!(evolution.next_batch().unwrap().is_none());
    }

    #[test]
    fn test_truncates_and_caches_leftovers() {
        // children deliver in mismatched chunk sizes; output realigns to the
        // read batch size
        let a: Vec<Option<i32>> = (0..9).map(Some).collect();
        let b: Vec<Option<i32>> = (100..109).map(Some).collect();
        let readers = vec![Some(reader(&a, "a", 5)), Some(reader(&b, "b", 2))];
        let mut evolution = DataEvolutionFileReader::new(
            readers,
            output_schema(&["a", "b"]),
            4,
            vec![0, 1],
            vec![0, 0],
        )
        .unwrap();

        let mut lengths = Vec::new();
        let mut seen_a = Vec::new();
        while let Some(batch) = evolution.next_batch().unwrap() {
            lengths.push(batch.len());
            seen_a.extend(column_values(&batch, 0));
        }
        assert_eq!(lengths, vec![4, 4, 1]);
        assert_eq!(seen_a, a);
    }

    #[test]
    fn test_create_validations() {
        let a: Vec<Option<i32>> = (0..2).map(Some).collect();
        assert!(DataEvolutionFileReader::new(
            vec![Some(reader(&a, "a", 2)), Some(reader(&a, "a", 2))],
            Arc::new(Schema::empty()),
            4,
            vec![],
            vec![],
        )
        .is_err());
        assert!(DataEvolutionFileReader::new(
            vec![Some(reader(&a, "a", 2)), Some(reader(&a, "a", 2))],
            output_schema(&["a"]),
            4,
            vec![0, 1],
            vec![0, 0],
        )
        .is_err());
        assert!(DataEvolutionFileReader::new(
            vec![Some(reader(&a, "a", 2))],
            output_schema(&["a"]),
            4,
            vec![0],
            vec![0],
        )
        .is_err());
    }
}
