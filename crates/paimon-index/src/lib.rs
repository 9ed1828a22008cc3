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

//! Native Rust implementation of the Apache Paimon file-index subsystem.
//!
//! A file index is a compact, immutable, per-data-file auxiliary structure
//! that answers point and range predicates for a single column with a row-id
//! bitmap (or a keep/skip verdict) without scanning the data file. This crate
//! provides the container format, the bitmap / bloom-filter / bit-slice index
//! kinds, the predicate model that drives them, the batch-reader combinators
//! that apply the resulting bitmaps to columnar batches, and the bucket-id
//! calculator used by the write path.

mod error;
pub use error::*;

pub mod data;
pub mod file_index;
pub mod io;
pub mod metrics;
pub mod options;
pub mod predicate;
pub mod reader;
pub mod spec;
pub mod utils;
