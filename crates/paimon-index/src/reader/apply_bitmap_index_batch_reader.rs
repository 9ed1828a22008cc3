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

use arrow::array::Array;
use roaring::RoaringBitmap;

use crate::error::*;
use crate::metrics::Metrics;
use crate::reader::batch_reader::{BatchReader, BatchWithBitmap, FileBatchReader};
use crate::utils::roaring_utils;

/// Applies a precomputed file-level row-id bitmap (from a file index) to a
/// file reader's batches. Each batch bitmap is intersected with the window
/// of the file bitmap covering the batch; empty intersections drop the batch
/// and fetch the next one.
pub struct ApplyBitmapIndexBatchReader {
    reader: Box<dyn FileBatchReader>,
    bitmap: RoaringBitmap,
}

impl ApplyBitmapIndexBatchReader {
    pub fn new(reader: Box<dyn FileBatchReader>, bitmap: RoaringBitmap) -> Self {
        Self { reader, bitmap }
    }
}

impl BatchReader for ApplyBitmapIndexBatchReader {
    fn next_batch_with_bitmap(&mut self) -> Result<Option<BatchWithBitmap>> {
        loop {
            let Some((batch, mut bitmap)) = self.reader.next_batch_with_bitmap()? else {
                return Ok(None);
            };
            let start = self.reader.previous_batch_first_row_number();
            let window = roaring_utils::window(&self.bitmap, start, batch.len() as u32);
            bitmap &= window;
            if bitmap.is_empty() {
                continue;
            }
            return Ok(Some((batch, bitmap)));
        }
    }

    fn next_batch(&mut self) -> Result<Option<arrow::array::StructArray>> {
        InvalidSnafu {
            message:
                "paimon inner reader ApplyBitmapIndexBatchReader should use next_batch_with_bitmap"
                    .to_string(),
        }
        .fail()
    }

    fn close(&mut self) {
        self.reader.close()
    }

    fn reader_metrics(&self) -> Metrics {
        self.reader.reader_metrics()
    }
}
