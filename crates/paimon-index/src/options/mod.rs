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
use std::str::FromStr;

use crate::error::*;

mod memory_size;
pub use memory_size::MemorySize;

mod time_duration;
pub use time_duration::TimeDuration;

/// String-keyed options map handed to index factories.
pub type Options = HashMap<String, String>;

/// Look up `key` and parse it with `FromStr`, falling back to `default` when
/// the key is absent.
pub fn get_from_options<T: FromStr>(options: &Options, key: &str, default: T) -> Result<T> {
    match options.get(key) {
        None => Ok(default),
        Some(raw) => raw.parse::<T>().map_err(|_| Error::Invalid {
            message: format!("cannot parse option '{key}' from value '{raw}'"),
        }),
    }
}

/// Look up `key`, failing when it is absent.
pub fn get_required<'a>(options: &'a Options, key: &str) -> Result<&'a str> {
    options
        .get(key)
        .map(|value| value.as_str())
        .ok_or_else(|| Error::NotExist {
            key: key.to_string(),
        })
}
