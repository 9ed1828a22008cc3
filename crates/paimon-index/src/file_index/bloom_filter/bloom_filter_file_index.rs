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

use arrow::datatypes::Field;
use bytes::Bytes;

use crate::error::*;
use crate::file_index::bloom_filter::FastHash;
use crate::file_index::{FileIndexReader, FileIndexResult};
use crate::predicate::{Function, LeafPredicate, Literal};
use crate::utils::bloom_filter64::{BitSet, BloomFilter64};

/// Probabilistic membership index: can refute equality, nothing else.
pub struct BloomFilterFileIndexReader {
    hash: FastHash,
    filter: BloomFilter64,
}

impl BloomFilterFileIndexReader {
    pub fn new(field: &Field, data: Bytes) -> Result<Self> {
        if data.len() < 4 {
            return ShortReadSnafu {
                message: format!(
                    "bloom filter index needs at least 4 bytes, got {}",
                    data.len()
                ),
            }
            .fail();
        }
        // The writer states this as little-endian, but the wire bytes are
        // reconstructed with sign-extended shifts exactly like the reference
        // reader does; keep it byte for byte.
        let num_hash_functions = ((data[0] as i8 as i32) << 24)
            .wrapping_add((data[1] as i8 as i32) << 16)
            .wrapping_add((data[2] as i8 as i32) << 8)
            .wrapping_add(data[3] as i8 as i32);
        let hash = FastHash::for_type(field.data_type())?;
        let bit_set = BitSet::new(data[4..].to_vec());
        Ok(Self {
            hash,
            filter: BloomFilter64::from_existing(num_hash_functions, bit_set),
        })
    }

    fn visit_equal(&self, literal: &Literal) -> Result<FileIndexResult> {
        if literal.is_null() {
            return Ok(FileIndexResult::Remain);
        }
        let hash = self.hash.hash(literal)?;
        if self.filter.test_hash(hash) {
            Ok(FileIndexResult::Remain)
        } else {
            Ok(FileIndexResult::Skip)
        }
    }
}

impl FileIndexReader for BloomFilterFileIndexReader {
    fn evaluate(&self, predicate: &LeafPredicate) -> Result<FileIndexResult> {
        match predicate.function() {
            Function::Equal => self.visit_equal(predicate.literal()?),
            Function::In => {
                let mut result = FileIndexResult::Skip;
                for literal in predicate.literals() {
                    result = result.or(self.visit_equal(literal)?);
                }
                Ok(result)
            }
            _ => Ok(FileIndexResult::Remain),
        }
    }
}
