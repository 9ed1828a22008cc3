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

use arrow::datatypes::{DataType, TimeUnit};

use crate::error::*;

/// Logical field types carried by literals and predicates.
///
/// Reference: <https://github.com/apache/paimon/blob/release-0.8.2/paimon-common/src/main/java/org/apache/paimon/types/DataTypeRoot.java>
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    Boolean,
    TinyInt,
    SmallInt,
    Int,
    BigInt,
    Float,
    Double,
    String,
    Binary,
    Blob,
    Timestamp,
    Decimal,
    Date,
    Array,
    Map,
    Struct,
}

impl Display for FieldType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FieldType::Boolean => "BOOLEAN",
            FieldType::TinyInt => "TINYINT",
            FieldType::SmallInt => "SMALLINT",
            FieldType::Int => "INT",
            FieldType::BigInt => "BIGINT",
            FieldType::Float => "FLOAT",
            FieldType::Double => "DOUBLE",
            FieldType::String => "STRING",
            FieldType::Binary => "BINARY",
            FieldType::Blob => "BLOB",
            FieldType::Timestamp => "TIMESTAMP",
            FieldType::Decimal => "DECIMAL",
            FieldType::Date => "DATE",
            FieldType::Array => "ARRAY",
            FieldType::Map => "MAP",
            FieldType::Struct => "STRUCT",
        };
        write!(f, "{name}")
    }
}

impl FieldType {
    pub fn is_integer_numeric(&self) -> bool {
        matches!(
            self,
            FieldType::TinyInt | FieldType::SmallInt | FieldType::Int | FieldType::BigInt
        )
    }
}

/// Map an arrow data type to the logical field type used by the index layer.
///
/// Maps with nullable keys are rejected here; the JVM reference allows them
/// but the arrow columnar model does not.
pub fn field_type_of(data_type: &DataType) -> Result<FieldType> {
    match data_type {
        DataType::Boolean => Ok(FieldType::Boolean),
        DataType::Int8 => Ok(FieldType::TinyInt),
        DataType::Int16 => Ok(FieldType::SmallInt),
        DataType::Int32 => Ok(FieldType::Int),
        DataType::Int64 => Ok(FieldType::BigInt),
        DataType::Float32 => Ok(FieldType::Float),
        DataType::Float64 => Ok(FieldType::Double),
        DataType::Utf8 => Ok(FieldType::String),
        DataType::Binary => Ok(FieldType::Binary),
        DataType::LargeBinary => Ok(FieldType::Blob),
        DataType::Timestamp(_, _) => Ok(FieldType::Timestamp),
        DataType::Decimal128(_, _) => Ok(FieldType::Decimal),
        DataType::Date32 => Ok(FieldType::Date),
        DataType::List(_) => Ok(FieldType::Array),
        DataType::Map(entries, _) => {
            if let DataType::Struct(fields) = entries.data_type() {
                if let Some(key_field) = fields.first() {
                    if key_field.is_nullable() {
                        return DataTypeInvalidSnafu {
                            message: "map key must not be nullable".to_string(),
                        }
                        .fail();
                    }
                }
            }
            Ok(FieldType::Map)
        }
        DataType::Struct(_) => Ok(FieldType::Struct),
        DataType::Dictionary(_, value_type) => field_type_of(value_type),
        other => DataTypeInvalidSnafu {
            message: format!("Not support arrow type {other}"),
        }
        .fail(),
    }
}

/// Timestamp precision in fractional-second digits: 0, 3, 6 or 9.
pub fn timestamp_precision(data_type: &DataType) -> Result<i32> {
    match data_type {
        DataType::Timestamp(TimeUnit::Second, _) => Ok(0),
        DataType::Timestamp(TimeUnit::Millisecond, _) => Ok(3),
        DataType::Timestamp(TimeUnit::Microsecond, _) => Ok(6),
        DataType::Timestamp(TimeUnit::Nanosecond, _) => Ok(9),
        other => DataTypeInvalidSnafu {
            message: format!("{other} is not a timestamp type"),
        }
        .fail(),
    }
}
