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
use arrow::datatypes::Field;
use bytes::Bytes;

use crate::error::*;
use crate::options::Options;

pub mod bitmap;
pub mod bloom_filter;
pub mod bsi;

mod file_index_format;
pub use file_index_format::*;

mod file_indexer;
pub use file_indexer::*;

mod file_index_result;
pub use file_index_result::*;

mod file_index_reader;
pub use file_index_reader::*;

mod empty_index;
pub use empty_index::*;

/// Identifier of the bitmap index kind.
pub const BITMAP_INDEX: &str = "bitmap";
/// Identifier of the bloom-filter index kind.
pub const BLOOM_FILTER_INDEX: &str = "bloom-filter";
/// Identifier of the bit-slice index kind.
pub const BSI_INDEX: &str = "bsi";

/// Writer side of one index of one column.
pub trait FileIndexWriter: Send {
    /// Feed one value array of the indexed column.
    fn add_batch(&mut self, array: &dyn Array) -> Result<()>;

    /// Serialize the accumulated index body.
    fn serialized_bytes(&self) -> Result<Bytes>;
}

/// Instantiate the reader registered for an index kind; `None` for kinds
/// this build does not know, which callers skip.
pub fn create_index_reader(
    index_type: &str,
    field: &Field,
    data: Bytes,
) -> Result<Option<Box<dyn FileIndexReader>>> {
    match index_type {
        BITMAP_INDEX => Ok(Some(Box::new(bitmap::BitmapFileIndexReader::new(
            field, data,
        )?))),
        BLOOM_FILTER_INDEX => Ok(Some(Box::new(
            bloom_filter::BloomFilterFileIndexReader::new(field, data)?,
        ))),
        BSI_INDEX => Ok(Some(Box::new(bsi::BitSliceIndexFileIndexReader::new(
            field, data,
        )?))),
        _ => Ok(None),
    }
}

/// Instantiate the writer registered for an index kind; `None` when the kind
/// is unknown or has no writer in this crate (the bloom filter is read-only
/// here).
pub fn create_index_writer(
    index_type: &str,
    field: &Field,
    options: Options,
) -> Result<Option<Box<dyn FileIndexWriter>>> {
    match index_type {
        BITMAP_INDEX => Ok(Some(Box::new(bitmap::BitmapFileIndexWriter::new(
            field, options,
        )?))),
        BSI_INDEX => Ok(Some(Box::new(bsi::BitSliceIndexFileIndexWriter::new(
            field,
        )?))),
        _ => Ok(None),
    }
}

impl FileIndexWriter for bitmap::BitmapFileIndexWriter {
    fn add_batch(&mut self, array: &dyn Array) -> Result<()> {
        bitmap::BitmapFileIndexWriter::add_batch(self, array)
    }

    fn serialized_bytes(&self) -> Result<Bytes> {
        bitmap::BitmapFileIndexWriter::serialized_bytes(self)
    }
}

impl FileIndexWriter for bsi::BitSliceIndexFileIndexWriter {
    fn add_batch(&mut self, array: &dyn Array) -> Result<()> {
        bsi::BitSliceIndexFileIndexWriter::add_batch(self, array)
    }

    fn serialized_bytes(&self) -> Result<Bytes> {
        bsi::BitSliceIndexFileIndexWriter::serialized_bytes(self)
    }
}

#[cfg(test)]
mod registry_tests {
    use arrow::array::Int32Array;
    use arrow::datatypes::DataType;

    use super::*;

    #[test]
    fn test_reader_registry_dispatch() {
        let field = Field::new("f0", DataType::Int32, true);
        assert!(create_index_reader("no-such-kind", &field, Bytes::new())
            .unwrap()
            .is_none());
        // known kind with a broken body propagates the error
        assert!(create_index_reader(BSI_INDEX, &field, Bytes::new()).is_err());
    }

    #[test]
    fn test_writer_registry_dispatch() {
        let field = Field::new("f0", DataType::Int32, true);
        let mut writer = create_index_writer(BITMAP_INDEX, &field, Options::new())
            .unwrap()
            .unwrap();
        writer
            .add_batch(&Int32Array::from(vec![Some(1), None, Some(1)]))
            .unwrap();
        assert!(!writer.serialized_bytes().unwrap().is_empty());

        assert!(create_index_writer(BLOOM_FILTER_INDEX, &field, Options::new())
            .unwrap()
            .is_none());
        assert!(create_index_writer("no-such-kind", &field, Options::new())
            .unwrap()
            .is_none());
    }
}
