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

use arrow::array::{Array, StructArray};
use roaring::RoaringBitmap;

use crate::error::*;
use crate::metrics::Metrics;

/// A columnar batch plus the set of row-ids within it that are valid.
pub type BatchWithBitmap = (StructArray, RoaringBitmap);

/// Streaming row-batch contract shared by every reader in the pipeline.
///
/// `None` is the end-of-stream sentinel and is sticky. Non-EOF batches carry
/// a bitmap with at least one valid row; producers drop empty intersections
/// instead of emitting them.
pub trait BatchReader: Send {
    fn next_batch_with_bitmap(&mut self) -> Result<Option<BatchWithBitmap>>;

    /// Next batch with all remaining rows physically contiguous: partial
    /// bitmaps are resolved by slicing the valid runs and concatenating
    /// them.
    fn next_batch(&mut self) -> Result<Option<StructArray>> {
        match self.next_batch_with_bitmap()? {
            None => Ok(None),
            Some(batch_with_bitmap) => apply_bitmap_to_batch(batch_with_bitmap).map(Some),
        }
    }

    fn close(&mut self);

    fn reader_metrics(&self) -> Metrics {
        Metrics::new()
    }
}

/// A file-level reader that also reports where its batches sit within the
/// data file.
pub trait FileBatchReader: BatchReader {
    /// First row number (within the data file) of the batch most recently
    /// returned.
    fn previous_batch_first_row_number(&self) -> u32;
}

/// Bitmap marking every row of a batch as valid.
pub fn all_valid_bitmap(length: usize) -> RoaringBitmap {
    let mut bitmap = RoaringBitmap::new();
    if length > 0 {
        bitmap.insert_range(0..length as u32);
    }
    bitmap
}

/// Sum the metrics of a set of child readers.
pub fn collect_reader_metrics<'a>(
    readers: impl IntoIterator<Item = &'a (dyn BatchReader + 'a)>,
) -> Metrics {
    let metrics = Metrics::new();
    for reader in readers {
        metrics.merge(&reader.reader_metrics());
    }
    metrics
}

/// Slice the array into its consecutive valid runs.
pub fn filtered_slices(
    array: &StructArray,
    bitmap: &RoaringBitmap,
) -> Result<Vec<StructArray>> {
    if bitmap.is_empty() {
        return InvalidSnafu {
            message: "selection bitmap cannot be empty in filtered_slices".to_string(),
        }
        .fail();
    }
    let length = array.len() as u32;
    let mut slices = Vec::new();
    let mut run_start: Option<u32> = None;
    let mut prev = 0u32;
    for row in bitmap.iter().take_while(|row| *row < length) {
        match run_start {
            None => run_start = Some(row),
            Some(start) => {
                if row != prev + 1 {
                    slices.push(array.slice(start as usize, (prev - start + 1) as usize));
                    run_start = Some(row);
                }
            }
        }
        prev = row;
    }
    if let Some(start) = run_start {
        slices.push(array.slice(start as usize, (prev - start + 1) as usize));
    }
    Ok(slices)
}

/// Concatenate struct arrays into one contiguous batch.
pub fn concat_struct_arrays(arrays: &[StructArray]) -> Result<StructArray> {
    if arrays.len() == 1 {
        // avoid data copy
        return Ok(arrays[0].clone());
    }
    let dyn_arrays: Vec<&dyn Array> = arrays.iter().map(|a| a as &dyn Array).collect();
    let concatenated = arrow::compute::concat(&dyn_arrays).map_err(|e| Error::Invalid {
        message: format!("failed to concatenate batches: {e}"),
    })?;
    concatenated
        .as_any()
        .downcast_ref::<StructArray>()
        .cloned()
        .ok_or_else(|| Error::Unknown {
            message: "concatenated batch is not a struct array".to_string(),
        })
}

/// Resolve a partial bitmap into a contiguous batch. Full bitmaps return the
/// batch untouched; empty bitmaps are a contract violation.
pub fn apply_bitmap_to_batch((array, bitmap): BatchWithBitmap) -> Result<StructArray> {
    if bitmap.is_empty() {
        return InvalidSnafu {
            message:
                "next_batch_with_bitmap should always return the result with at least one valid row except eof"
                    .to_string(),
        }
        .fail();
    }
    if bitmap.len() == array.len() as u64 {
        // all rows in batch are valid
        return Ok(array);
    }
    let slices = filtered_slices(&array, &bitmap)?;
    concat_struct_arrays(&slices)
}
