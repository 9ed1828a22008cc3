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

use std::fmt::{Display, Formatter};

use crate::spec::FieldType;

/// Reference to one field of the read schema: position, name and type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldRef {
    index: usize,
    name: String,
    field_type: FieldType,
}

impl FieldRef {
    pub fn new(index: usize, name: &str, field_type: FieldType) -> Self {
        FieldRef {
            index,
            name: name.to_string(),
            field_type,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn field_type(&self) -> FieldType {
        self.field_type
    }
}

impl Display for FieldRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "FieldRef {{ index: {}, name: '{}', field_type: {} }}",
            self.index, self.name, self.field_type
        )
    }
}
