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

use std::cmp::Ordering;

use arrow::array::{Array, StructArray};

use crate::error::*;
use crate::predicate::literal_converter::literals_from_array;
use crate::predicate::{Function, LeafPredicate, Literal, Predicate};

impl Predicate {
    /// Evaluate the predicate tree against one columnar batch, returning one
    /// boolean per row. A null row value never satisfies a value predicate
    /// (SQL three-valued logic collapsed to keep/drop).
    pub fn test(&self, batch: &StructArray) -> Result<Vec<bool>> {
        match self {
            Predicate::Leaf(leaf) => leaf.test(batch),
            Predicate::And(children) => {
                let mut result = vec![true; batch.len()];
                for child in children {
                    let child_result = child.test(batch)?;
                    for (acc, row) in result.iter_mut().zip(child_result) {
                        *acc = *acc && row;
                    }
                }
                Ok(result)
            }
            Predicate::Or(children) => {
                let mut result = vec![false; batch.len()];
                for child in children {
                    let child_result = child.test(batch)?;
                    for (acc, row) in result.iter_mut().zip(child_result) {
                        *acc = *acc || row;
                    }
                }
                Ok(result)
            }
        }
    }
}

impl LeafPredicate {
    pub fn test(&self, batch: &StructArray) -> Result<Vec<bool>> {
        let index = self.field().index();
        if index >= batch.num_columns() {
            return IndexOutOfRangeSnafu {
                message: format!(
                    "field {} with index {index} out of range for batch with {} columns",
                    self.field().name(),
                    batch.num_columns()
                ),
            }
            .fail();
        }
        let values = literals_from_array(batch.column(index).as_ref())?;
        values.iter().map(|value| self.test_value(value)).collect()
    }

    fn test_value(&self, value: &Literal) -> Result<bool> {
        match self.function() {
            Function::IsNull => return Ok(value.is_null()),
            Function::IsNotNull => return Ok(!value.is_null()),
            _ => {}
        }
        if value.is_null() {
            return Ok(false);
        }
        match self.function() {
            Function::Equal => Ok(value == self.literal()?),
            Function::NotEqual => Ok(value != self.literal()?),
            Function::LessThan => Ok(value.compare_to(self.literal()?)? == Ordering::Less),
            Function::LessOrEqual => Ok(value.compare_to(self.literal()?)? != Ordering::Greater),
            Function::GreaterThan => Ok(value.compare_to(self.literal()?)? == Ordering::Greater),
            Function::GreaterOrEqual => Ok(value.compare_to(self.literal()?)? != Ordering::Less),
            Function::In => Ok(self.literals().iter().any(|l| value == l)),
            Function::NotIn => Ok(self.literals().iter().all(|l| value != l)),
            Function::StartsWith => {
                Ok(value.as_bytes()?.starts_with(self.literal()?.as_bytes()?))
            }
            Function::EndsWith => Ok(value.as_bytes()?.ends_with(self.literal()?.as_bytes()?)),
            Function::Contains => Ok(contains(value.as_bytes()?, self.literal()?.as_bytes()?)),
            Function::IsNull | Function::IsNotNull => unreachable!(),
        }
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    if needle.is_empty() {
        return true;
    }
    if needle.len() > haystack.len() {
        return false;
    }
    haystack.windows(needle.len()).any(|window| window == needle)
}
