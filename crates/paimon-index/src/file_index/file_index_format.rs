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

use arrow::datatypes::Schema;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use indexmap::IndexMap;
use log::{debug, warn};

use crate::error::*;
use crate::file_index::{create_index_reader, EmptyFileIndexReader, FileIndexReader};
use crate::io::{FileIO, InputFile, OutputFile};

/// Marks the beginning of a file index blob.
pub const MAGIC: u64 = 1493475289347502;

/// Used to mark an empty index: the file holds no rows for the column.
pub const EMPTY_INDEX_FLAG: i32 = -1;

const VERSION_1: i32 = 1;

/// File index file format. All columns and offsets are stored in the header.
///
/// ```text
///   _____________________________________    _____________________
/// ｜     magic    ｜version｜head length ｜
/// ｜-------------------------------------｜
/// ｜            column number            ｜
/// ｜-------------------------------------｜
/// ｜   column 1        ｜ index number   ｜
/// ｜-------------------------------------｜
/// ｜  index name 1 ｜start pos ｜length  ｜
/// ｜-------------------------------------｜            HEADER
/// ｜   column 2        ｜ index number   ｜
/// ｜-------------------------------------｜
/// ｜  index name 1 ｜start pos ｜length  ｜
/// ｜-------------------------------------｜
/// ｜                 ...                 ｜
/// ｜-------------------------------------｜    ---------------------
/// ｜                BODY                 ｜
/// ｜                BODY                 ｜             BODY
/// ｜_____________________________________｜    _____________________
///
/// - `magic`: 8 bytes long, big endian
/// - `version`: 4-byte integer
/// - `head length`: 4-byte integer, counts magic, version and itself
/// - `column number`: 4-byte integer
/// - `column x` / `index name x`: 2-byte length + UTF-8 bytes
/// - `start pos`: 4-byte integer from blob start, -1 flags an empty index
/// - `length`: 4-byte integer
/// - `BODY`: concatenated per-index bodies
/// ```
///
/// Impl Reference: <https://github.com/apache/paimon/blob/release-0.8.2/paimon-common/src/main/java/org/apache/paimon/fileindex/FileIndexFormat.java>
pub async fn write_column_indexes(
    path: &str,
    indexes: &IndexMap<String, IndexMap<String, Bytes>>,
) -> crate::Result<OutputFile> {
    let mut head_length = 8 + 4 + 4 + 4;
    for (column_name, index_map) in indexes {
        head_length += 2 + column_name.len() + 4;
        for index_name in index_map.keys() {
            head_length += 2 + index_name.len() + 4 + 4;
        }
    }

    let mut head = BytesMut::with_capacity(head_length);
    head.put_u64(MAGIC);
    head.put_i32(VERSION_1);
    head.put_i32(head_length as i32);
    head.put_i32(indexes.len() as i32);

    let mut body = BytesMut::new();
    for (column_name, index_map) in indexes {
        put_utf(&mut head, column_name)?;
        head.put_i32(index_map.len() as i32);
        for (index_name, data) in index_map {
            put_utf(&mut head, index_name)?;
            if data.is_empty() {
                head.put_i32(EMPTY_INDEX_FLAG);
                head.put_i32(0);
            } else {
                head.put_i32((head_length + body.len()) as i32);
                head.put_i32(data.len() as i32);
                body.put_slice(data);
            }
        }
    }

    let mut blob = head;
    blob.extend_from_slice(&body);

    let file_io = FileIO::from_url(path)?.build()?;
    let output = file_io.new_output(path);
    output.write(blob.freeze()).await?;
    Ok(output)
}

fn put_utf(buf: &mut BytesMut, value: &str) -> Result<()> {
    if value.len() > u16::MAX as usize {
        return InvalidSnafu {
            message: format!("name of {} bytes does not fit the index head", value.len()),
        }
        .fail();
    }
    buf.put_u16(value.len() as u16);
    buf.put_slice(value.as_bytes());
    Ok(())
}

/// Reader over one file index blob: parses the head once, then constructs
/// per-kind index readers on demand, fetching each body slice from storage.
pub struct FileIndexFormatReader {
    input: InputFile,
    // [column_name : [index_type : (offset, length)]]
    header: IndexMap<String, IndexMap<String, (i32, i32)>>,
}

impl FileIndexFormatReader {
    pub async fn open(input: InputFile) -> crate::Result<Self> {
        let fixed = input.read_range(0..16).await?;
        let mut buf = fixed.as_ref();
        let magic = buf.get_u64();
        if magic != MAGIC {
            return InvalidSnafu {
                message: "This file is not file index file.".to_string(),
            }
            .fail();
        }
        let version = buf.get_i32();
        if version != VERSION_1 {
            return InvalidSnafu {
                message: format!(
                    "This index file is version of {version}, not in supported version list [{VERSION_1}]"
                ),
            }
            .fail();
        }
        let head_length = buf.get_i32();
        if head_length < 16 {
            return InvalidSnafu {
                message: format!("invalid index head length {head_length}"),
            }
            .fail();
        }

        let head = input.read_range(16..head_length as u64).await?;
        let mut buf = head.as_ref();
        let column_number = get_i32(&mut buf)?;
        let mut header = IndexMap::new();
        for _ in 0..column_number {
            let column_name = get_utf(&mut buf)?;
            let index_number = get_i32(&mut buf)?;
            let mut index_map = IndexMap::new();
            for _ in 0..index_number {
                let index_name = get_utf(&mut buf)?;
                let offset = get_i32(&mut buf)?;
                let length = get_i32(&mut buf)?;
                index_map.insert(index_name, (offset, length));
            }
            header.insert(column_name, index_map);
        }
        debug!(
            "opened file index {} with {} indexed columns",
            input.path(),
            header.len()
        );

        Ok(Self { input, header })
    }

    /// All index kinds recorded for a column.
    pub fn index_types(&self, column_name: &str) -> Vec<String> {
        self.header
            .get(column_name)
            .map(|m| m.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Construct one reader per registered index of the column. Unknown
    /// index kinds are skipped; an empty-index entry yields the empty-index
    /// reader.
    pub async fn read_column_index(
        &self,
        column_name: &str,
        schema: &Schema,
    ) -> crate::Result<Vec<Box<dyn FileIndexReader>>> {
        let field = schema
            .field_with_name(column_name)
            .map_err(|_| Error::Invalid {
                message: format!("cannot find column {column_name} in schema"),
            })?;
        let mut readers: Vec<Box<dyn FileIndexReader>> = Vec::new();
        let Some(index_map) = self.header.get(column_name) else {
            return Ok(readers);
        };
        for (index_type, (offset, length)) in index_map {
            if *offset == EMPTY_INDEX_FLAG {
                readers.push(Box::new(EmptyFileIndexReader));
                continue;
            }
            let data = self
                .input
                .read_range(*offset as u64..(*offset + *length) as u64)
                .await?;
            match create_index_reader(index_type, field, data)? {
                Some(reader) => readers.push(reader),
                None => {
                    // skip the index not registered
                    warn!("skipping unknown file index type {index_type}");
                }
            }
        }
        Ok(readers)
    }
}

fn get_i32(buf: &mut &[u8]) -> Result<i32> {
    if buf.remaining() < 4 {
        return ShortReadSnafu {
            message: "file index head integer".to_string(),
        }
        .fail();
    }
    Ok(buf.get_i32())
}

fn get_utf(buf: &mut &[u8]) -> Result<String> {
    if buf.remaining() < 2 {
        return ShortReadSnafu {
            message: "file index head string length".to_string(),
        }
        .fail();
    }
    let length = buf.get_u16() as usize;
    if buf.remaining() < length {
        return ShortReadSnafu {
            message: "file index head string bytes".to_string(),
        }
        .fail();
    }
    let bytes = buf.copy_to_bytes(length);
    String::from_utf8(bytes.to_vec()).map_err(|e| Error::Invalid {
        message: format!("Invalid UTF-8 sequence in index head: {e}"),
    })
}

#[cfg(test)]
mod file_index_format_tests {
    use arrow::datatypes::{DataType, Field};
    use bytes::BufMut;

    use super::*;
    use crate::file_index::bitmap::BitmapFileIndexWriter;
    use crate::file_index::bloom_filter::fast_hash;
    use crate::file_index::{BITMAP_INDEX, BLOOM_FILTER_INDEX};
    use crate::options::Options;
    use crate::predicate::{FieldRef, Function, Literal, Predicate};
    use crate::spec::FieldType;
    use crate::utils::bloom_filter64::BloomFilter64;

    fn bitmap_body(values: &[&str]) -> Bytes {
        let mut writer =
            BitmapFileIndexWriter::new(&Field::new("c1", DataType::Utf8, true), Options::new())
                .unwrap();
        for value in values {
            writer.write(&Literal::string(value)).unwrap();
        }
        writer.serialized_bytes().unwrap()
    }

    fn bloom_body(values: &[&str]) -> Bytes {
        let mut filter = BloomFilter64::with_expected_items(16, 0.01);
        for value in values {
            filter.add_hash(fast_hash::hash64(value.as_bytes()));
        }
        let mut blob = BytesMut::new();
        blob.put_i32(filter.num_hash_functions());
        blob.put_slice(filter.bit_set().as_bytes());
        blob.freeze()
    }

    fn schema() -> Schema {
        Schema::new(vec![
            Field::new("c1", DataType::Utf8, true),
            Field::new("c2", DataType::Utf8, true),
        ])
    }

    fn equal_leaf(column: &str, index: usize, value: &str) -> crate::predicate::LeafPredicate {
        match Predicate::leaf(
            FieldRef::new(index, column, FieldType::String),
            Function::Equal,
            vec![Literal::string(value)],
        )
        .unwrap()
        {
            Predicate::Leaf(leaf) => leaf,
            _ => unreachable!(),
        }
    }

    async fn write_test_blob(path: &str) -> crate::Result<FileIndexFormatReader> {
        let values = ["a", "b", "a"];
        let mut c1 = IndexMap::new();
        c1.insert(BITMAP_INDEX.to_string(), bitmap_body(&values));
        c1.insert(BLOOM_FILTER_INDEX.to_string(), bloom_body(&values));
        let mut c2 = IndexMap::new();
        c2.insert("unknown-kind".to_string(), Bytes::from_static(b"whatever"));
        let mut indexes = IndexMap::new();
        indexes.insert("c1".to_string(), c1);
        indexes.insert("c2".to_string(), c2);

        let output = write_column_indexes(path, &indexes).await?;
        FileIndexFormatReader::open(output.to_input_file()).await
    }

    #[tokio::test]
    async fn test_round_trip_and_kind_dispatch() -> crate::Result<()> {
        let reader = write_test_blob("memory:/tmp/test_round_trip_and_kind_dispatch").await?;

        let readers = reader.read_column_index("c1", &schema()).await?;
        assert_eq!(readers.len(), 2);
        // both indexes agree that "a" may be present and refute "zz"
        for index_reader in &readers {
            assert!(index_reader
                .evaluate(&equal_leaf("c1", 0, "a"))
                .unwrap()
                .remain());
        }
        let bitmap_rows = readers[0]
            .evaluate(&equal_leaf("c1", 0, "a"))
            .unwrap()
            .to_row_ids()?
            .unwrap();
        assert_eq!(bitmap_rows.iter().collect::<Vec<u32>>(), vec![0, 2]);

        // unknown kinds are silently skipped
        let readers = reader.read_column_index("c2", &schema()).await?;
        assert!(readers.is_empty());

        // missing column is an error
        assert!(reader.read_column_index("c3", &schema()).await.is_err());
        Ok(())
    }

    #[tokio::test]
    async fn test_empty_index_entry() -> crate::Result<()> {
        let path = "memory:/tmp/test_empty_index_entry";
        let mut c1 = IndexMap::new();
        c1.insert(BITMAP_INDEX.to_string(), Bytes::new());
        let mut indexes = IndexMap::new();
        indexes.insert("c1".to_string(), c1);

        let output = write_column_indexes(path, &indexes).await?;
        let reader = FileIndexFormatReader::open(output.to_input_file()).await?;
        let readers = reader.read_column_index("c1", &schema()).await?;
        assert_eq!(readers.len(), 1);
        // the empty index proves absence for positive predicates
        assert!(!readers[0]
            .evaluate(&equal_leaf("c1", 0, "a"))
            .unwrap()
            .remain());
        Ok(())
    }

    #[tokio::test]
    async fn test_index_bitmap_drives_batch_reader() -> crate::Result<()> {
        use arrow::array::{ArrayRef, StringArray};
        use std::sync::Arc;

        use crate::reader::testing::VecBatchReader;
        use crate::reader::{ApplyBitmapIndexBatchReader, BatchReader};

        let path = "memory:/tmp/test_index_bitmap_drives_batch_reader";
        let values = ["a", "b", "b", "a", "c", "a"];
        let mut c1 = IndexMap::new();
        c1.insert(BITMAP_INDEX.to_string(), bitmap_body(&values));
        let mut indexes = IndexMap::new();
        indexes.insert("c1".to_string(), c1);
        let output = write_column_indexes(path, &indexes).await?;
        let reader = FileIndexFormatReader::open(output.to_input_file()).await?;

        let schema = Schema::new(vec![Field::new("c1", DataType::Utf8, true)]);
        let index_readers = reader.read_column_index("c1", &schema).await?;
        let row_ids = index_readers[0]
            .evaluate(&equal_leaf("c1", 0, "a"))
            .unwrap()
            .to_row_ids()?
            .unwrap();

        let column: ArrayRef = Arc::new(StringArray::from(values.to_vec()));
        let data = arrow::array::StructArray::from(vec![(
            Arc::new(Field::new("c1", DataType::Utf8, true)),
            column,
        )]);
        let file_reader = VecBatchReader::all_valid(data, /*batch_size=*/ 2);
        let mut filtered = ApplyBitmapIndexBatchReader::new(Box::new(file_reader), row_ids);

        let mut kept = Vec::new();
        while let Some((batch, bitmap)) = filtered.next_batch_with_bitmap()? {
            let strings = batch
                .column(0)
                .as_any()
                .downcast_ref::<StringArray>()
                .unwrap();
            for row in bitmap.iter() {
                kept.push(strings.value(row as usize).to_string());
            }
        }
        assert_eq!(kept, vec!["a", "a", "a"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_rejects_foreign_blob() -> crate::Result<()> {
        let path = "memory:/tmp/test_rejects_foreign_blob";
        let file_io = FileIO::from_url(path)?.build()?;
        let output = file_io.new_output(path);
        output
            .write(Bytes::from_static(b"0123456789abcdef0123"))
            .await?;
        assert!(FileIndexFormatReader::open(output.to_input_file())
            .await
            .is_err());
        Ok(())
    }
}
