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

mod batch_reader;
pub use batch_reader::*;

mod apply_bitmap_index_batch_reader;
pub use apply_bitmap_index_batch_reader::*;

mod complete_row_kind_batch_reader;
pub use complete_row_kind_batch_reader::*;

mod concat_batch_reader;
pub use concat_batch_reader::*;

mod data_evolution_file_reader;
pub use data_evolution_file_reader::*;

mod predicate_batch_reader;
pub use predicate_batch_reader::*;

mod row_kind;
pub use row_kind::*;
