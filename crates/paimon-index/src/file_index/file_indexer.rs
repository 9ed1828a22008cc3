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

use std::collections::HashMap;

use arrow::datatypes::Schema;

use crate::error::*;
use crate::file_index::{FileIndexFormatReader, FileIndexReader, FileIndexResult};
use crate::predicate::Predicate;

/// Evaluates a whole predicate tree against one data file's indexes.
///
/// Every leaf visits each index of its column and the verdicts intersect;
/// the tree then folds over `AND`/`OR`. Columns without any usable index
/// stay `Remain`.
pub struct FileIndexPredicateEvaluator {
    readers_by_column: HashMap<String, Vec<Box<dyn FileIndexReader>>>,
}

impl FileIndexPredicateEvaluator {
    /// Resolve the index readers for every column the predicate touches.
    pub async fn create(
        format_reader: &FileIndexFormatReader,
        schema: &Schema,
        predicate: &Predicate,
    ) -> Result<Self> {
        let mut readers_by_column = HashMap::new();
        let mut columns = Vec::new();
        collect_columns(predicate, &mut columns);
        for column in columns {
            if readers_by_column.contains_key(&column) {
                continue;
            }
            let readers = format_reader.read_column_index(&column, schema).await?;
            readers_by_column.insert(column, readers);
        }
        Ok(Self { readers_by_column })
    }

    /// Fold the tree into one verdict for the file.
    pub fn evaluate(&self, predicate: &Predicate) -> Result<FileIndexResult> {
        match predicate {
            Predicate::Leaf(leaf) => {
                let mut result = FileIndexResult::Remain;
                if let Some(readers) = self.readers_by_column.get(leaf.field().name()) {
                    for reader in readers {
                        result = result.and(reader.evaluate(leaf)?);
                    }
                }
                Ok(result)
            }
            Predicate::And(children) => {
                let mut result = FileIndexResult::Remain;
                for child in children {
                    result = result.and(self.evaluate(child)?);
                }
                Ok(result)
            }
            Predicate::Or(children) => {
                let mut result = FileIndexResult::Skip;
                for child in children {
                    result = result.or(self.evaluate(child)?);
                }
                Ok(result)
            }
        }
    }
}

fn collect_columns(predicate: &Predicate, columns: &mut Vec<String>) {
    match predicate {
        Predicate::Leaf(leaf) => columns.push(leaf.field().name().to_string()),
        Predicate::And(children) | Predicate::Or(children) => {
            for child in children {
                collect_columns(child, columns);
            }
        }
    }
}
