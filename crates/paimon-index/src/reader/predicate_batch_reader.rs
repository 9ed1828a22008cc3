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

use arrow::array::StructArray;
use roaring::RoaringBitmap;

use crate::error::*;
use crate::metrics::Metrics;
use crate::predicate::Predicate;
use crate::reader::batch_reader::{BatchReader, BatchWithBitmap};

/// Evaluates a predicate tree against each batch and intersects the pointwise
/// result with the upstream bitmap. Batches whose intersection comes out
/// empty are dropped.
pub struct PredicateBatchReader {
    reader: Box<dyn BatchReader>,
    predicate: Predicate,
}

impl PredicateBatchReader {
    pub fn new(reader: Box<dyn BatchReader>, predicate: Predicate) -> Self {
        Self { reader, predicate }
    }

    fn filter(&self, batch: &StructArray) -> Result<RoaringBitmap> {
        let rows = self.predicate.test(batch)?;
        let mut valid = RoaringBitmap::new();
        for (row, keep) in rows.iter().enumerate() {
            if *keep {
                valid.insert(row as u32);
            }
        }
        Ok(valid)
    }
}

impl BatchReader for PredicateBatchReader {
    fn next_batch_with_bitmap(&mut self) -> Result<Option<BatchWithBitmap>> {
        loop {
            let Some((batch, mut bitmap)) = self.reader.next_batch_with_bitmap()? else {
                return Ok(None);
            };
            let valid = self.filter(&batch)?;
            bitmap &= valid;
            if bitmap.is_empty() {
                continue;
            }
            return Ok(Some((batch, bitmap)));
        }
    }

    fn close(&mut self) {
        self.reader.close()
    }

    fn reader_metrics(&self) -> Metrics {
        self.reader.reader_metrics()
    }
}
