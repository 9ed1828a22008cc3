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
use crate::file_index::FileIndexResult;
use crate::predicate::LeafPredicate;

/// One index of one column, able to answer a leaf predicate.
///
/// Implementations switch on the predicate function and answer `Remain` for
/// functions they cannot refute.
pub trait FileIndexReader: Send {
    fn evaluate(&self, predicate: &LeafPredicate) -> Result<FileIndexResult>;
}
