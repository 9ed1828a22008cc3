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
use crate::file_index::{FileIndexReader, FileIndexResult};
use crate::predicate::{Function, LeafPredicate};

/// Reader for the empty-index sentinel (`offset == -1` in the container
/// head). The file is known to contain no rows for this column, so every
/// positive predicate skips the file while the negated family stays
/// conservative.
#[derive(Debug, Default)]
pub struct EmptyFileIndexReader;

impl FileIndexReader for EmptyFileIndexReader {
    fn evaluate(&self, predicate: &LeafPredicate) -> Result<FileIndexResult> {
        match predicate.function() {
            Function::NotEqual | Function::NotIn | Function::IsNull => Ok(FileIndexResult::Remain),
            _ => Ok(FileIndexResult::Skip),
        }
    }
}
