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

use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::error::*;

/// Counter collection for one reader.
///
/// Every reader owns its metrics; a supervising thread may sample counters
/// while the reading thread updates them, so the map sits behind a mutex.
/// `merge` adds counter values and is commutative-associative but not
/// idempotent; `overwrite` replaces the local map wholesale.
#[derive(Debug, Default)]
pub struct Metrics {
    counters: Mutex<BTreeMap<String, u64>>,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_counter(&self, metric_name: &str, metric_value: u64) {
        let mut counters = self.counters.lock().unwrap();
        counters.insert(metric_name.to_string(), metric_value);
    }

    pub fn get_counter(&self, metric_name: &str) -> Result<u64> {
        let counters = self.counters.lock().unwrap();
        counters
            .get(metric_name)
            .copied()
            .ok_or_else(|| Error::KeyNotFound {
                message: format!("metric '{metric_name}' not found"),
            })
    }

    pub fn all_counters(&self) -> BTreeMap<String, u64> {
        self.counters.lock().unwrap().clone()
    }

    pub fn merge(&self, other: &Metrics) {
        if std::ptr::eq(self, other) {
            return;
        }
        let other_counters = other.all_counters();
        let mut counters = self.counters.lock().unwrap();
        for (name, value) in other_counters {
            *counters.entry(name).or_insert(0) += value;
        }
    }

    pub fn overwrite(&self, other: &Metrics) {
        if std::ptr::eq(self, other) {
            return;
        }
        let other_counters = other.all_counters();
        let mut counters = self.counters.lock().unwrap();
        *counters = other_counters;
    }

    /// Serialize the counter map as a sorted json object.
    pub fn to_json(&self) -> Result<String> {
        let counters = self.all_counters();
        serde_json::to_string(&counters).map_err(|source| Error::JsonSerialization { source })
    }
}
