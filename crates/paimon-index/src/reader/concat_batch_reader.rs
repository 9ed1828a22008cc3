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

use crate::error::*;
use crate::metrics::Metrics;
use crate::reader::batch_reader::{collect_reader_metrics, BatchReader, BatchWithBitmap};

/// Chains readers sequentially, preserving their order. A child is closed as
/// soon as it reports end of stream.
pub struct ConcatBatchReader {
    readers: Vec<Box<dyn BatchReader>>,
    current: usize,
}

impl ConcatBatchReader {
    pub fn new(readers: Vec<Box<dyn BatchReader>>) -> Self {
        Self {
            readers,
            current: 0,
        }
    }
}

impl BatchReader for ConcatBatchReader {
    fn next_batch_with_bitmap(&mut self) -> Result<Option<BatchWithBitmap>> {
        while self.current < self.readers.len() {
            let current_reader = &mut self.readers[self.current];
            if let Some(result) = current_reader.next_batch_with_bitmap()? {
                return Ok(Some(result));
            }
            // current meets eof, move to next reader
            current_reader.close();
            self.current += 1;
        }
        Ok(None)
    }

    fn close(&mut self) {
        while self.current < self.readers.len() {
            self.readers[self.current].close();
            self.current += 1;
        }
    }

    fn reader_metrics(&self) -> Metrics {
        collect_reader_metrics(self.readers.iter().map(|r| r.as_ref()))
    }
}
