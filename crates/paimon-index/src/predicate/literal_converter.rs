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

use arrow::array::{
    Array, BinaryArray, BooleanArray, Date32Array, Decimal128Array, DictionaryArray, Float32Array,
    Float64Array, Int16Array, Int32Array, Int64Array, Int8Array, LargeBinaryArray, StringArray,
    TimestampMicrosecondArray, TimestampMillisecondArray, TimestampNanosecondArray,
    TimestampSecondArray,
};
use arrow::datatypes::{ArrowNativeType, DataType, Int32Type, Int64Type, TimeUnit};
use bytes::Bytes;

use crate::data::{Decimal, Timestamp};
use crate::error::*;
use crate::predicate::Literal;
use crate::spec::FieldType;

macro_rules! convert_primitive {
    ($array:expr, $array_type:ty, $field_type:expr, $make:expr) => {{
        let typed = downcast::<$array_type>($array)?;
        (0..typed.len())
            .map(|i| {
                if typed.is_null(i) {
                    Literal::null($field_type)
                } else {
                    $make(typed.value(i))
                }
            })
            .collect()
    }};
}

fn downcast<'a, T: 'static>(array: &'a dyn Array) -> Result<&'a T> {
    array
        .as_any()
        .downcast_ref::<T>()
        .ok_or_else(|| Error::DataTypeInvalid {
            message: format!("cannot downcast array of type {}", array.data_type()),
        })
}

/// Convert every value of the array into a typed literal, nulls included.
pub fn literals_from_array(array: &dyn Array) -> Result<Vec<Literal>> {
    let literals: Vec<Literal> = match array.data_type() {
        DataType::Boolean => {
            convert_primitive!(array, BooleanArray, FieldType::Boolean, Literal::from)
        }
        DataType::Int8 => convert_primitive!(array, Int8Array, FieldType::TinyInt, Literal::from),
        DataType::Int16 => {
            convert_primitive!(array, Int16Array, FieldType::SmallInt, Literal::from)
        }
        DataType::Int32 => convert_primitive!(array, Int32Array, FieldType::Int, Literal::from),
        DataType::Int64 => convert_primitive!(array, Int64Array, FieldType::BigInt, Literal::from),
        DataType::Float32 => {
            convert_primitive!(array, Float32Array, FieldType::Float, Literal::from)
        }
        DataType::Float64 => {
            convert_primitive!(array, Float64Array, FieldType::Double, Literal::from)
        }
        DataType::Date32 => convert_primitive!(array, Date32Array, FieldType::Date, Literal::date),
        DataType::Utf8 => {
            convert_primitive!(array, StringArray, FieldType::String, Literal::string)
        }
        DataType::Binary => {
            convert_primitive!(array, BinaryArray, FieldType::Binary, Literal::binary)
        }
        DataType::LargeBinary => {
            convert_primitive!(array, LargeBinaryArray, FieldType::Blob, |v: &[u8]| {
                Literal::bytes_of_type(FieldType::Blob, Bytes::copy_from_slice(v))
            })
        }
        DataType::Timestamp(unit, _) => {
            let make = |v: i64| Literal::from(Timestamp::from_arrow_value(v, unit));
            match unit {
                TimeUnit::Second => {
                    convert_primitive!(array, TimestampSecondArray, FieldType::Timestamp, make)
                }
                TimeUnit::Millisecond => {
                    convert_primitive!(array, TimestampMillisecondArray, FieldType::Timestamp, make)
                }
                TimeUnit::Microsecond => {
                    convert_primitive!(array, TimestampMicrosecondArray, FieldType::Timestamp, make)
                }
                TimeUnit::Nanosecond => {
                    convert_primitive!(array, TimestampNanosecondArray, FieldType::Timestamp, make)
                }
            }
        }
        DataType::Decimal128(precision, scale) => {
            convert_primitive!(array, Decimal128Array, FieldType::Decimal, |v: i128| {
                Literal::from(Decimal::new(*precision, *scale, v))
            })
        }
        DataType::Dictionary(key_type, _) => match key_type.as_ref() {
            DataType::Int32 => {
                dictionary_literals(downcast::<DictionaryArray<Int32Type>>(array)?)?
            }
            DataType::Int64 => {
                dictionary_literals(downcast::<DictionaryArray<Int64Type>>(array)?)?
            }
            other => {
                return DataTypeInvalidSnafu {
                    message: format!("unsupported dictionary key type {other}"),
                }
                .fail()
            }
        },
        other => {
            return DataTypeInvalidSnafu {
                message: format!("cannot convert array of type {other} to literals"),
            }
            .fail()
        }
    };
    Ok(literals)
}

fn dictionary_literals<K: arrow::datatypes::ArrowDictionaryKeyType>(
    array: &DictionaryArray<K>,
) -> Result<Vec<Literal>> {
    let value_literals = literals_from_array(array.values().as_ref())?;
    let field_type = value_literals
        .first()
        .map(|l| l.field_type())
        .unwrap_or(FieldType::String);
    if !matches!(field_type, FieldType::String | FieldType::Binary) {
        return DataTypeInvalidSnafu {
            message: format!("unsupported dictionary value type {field_type}"),
        }
        .fail();
    }
    let keys = array.keys();
    (0..array.len())
        .map(|i| {
            if array.is_null(i) {
                Ok(Literal::null(field_type))
            } else {
                let key = keys.value(i).as_usize();
                value_literals
                    .get(key)
                    .cloned()
                    .ok_or_else(|| Error::IndexOutOfRange {
                        message: format!("dictionary key {key} out of range"),
                    })
            }
        })
        .collect()
}

#[cfg(test)]
mod literal_converter_tests {
    use std::sync::Arc;

    use arrow::array::ArrayRef;

    use super::*;

    #[test]
    fn test_convert_int_array_with_nulls() {
        let array = Int32Array::from(vec![Some(1), None, Some(3)]);
        let literals = literals_from_array(&array).unwrap();
        assert_eq!(
            literals,
            vec![
                Literal::from(1i32),
                Literal::null(FieldType::Int),
                Literal::from(3i32)
            ]
        );
    }

    #[test]
    fn test_convert_string_array() {
        let array = StringArray::from(vec![Some("a"), None, Some("bb")]);
        let literals = literals_from_array(&array).unwrap();
        assert_eq!(
            literals,
            vec![
                Literal::string("a"),
                Literal::null(FieldType::String),
                Literal::string("bb")
            ]
        );
    }

    #[test]
    fn test_convert_timestamp_array_keeps_nanos() {
        let array = TimestampNanosecondArray::from(vec![Some(1_000_123_456i64), None]);
        let literals = literals_from_array(&array).unwrap();
        assert_eq!(
            literals[0],
            Literal::from(Timestamp::new(1000, 123_456))
        );
        assert!(literals[1].is_null());
    }

    #[test]
    fn test_convert_dictionary_string_array() {
        let values = StringArray::from(vec!["x", "y"]);
        let keys = Int32Array::from(vec![Some(0), Some(1), None, Some(0)]);
        let dict = DictionaryArray::<Int32Type>::try_new(keys, Arc::new(values) as ArrayRef)
            .unwrap();
        let literals = literals_from_array(&dict).unwrap();
        assert_eq!(
            literals,
            vec![
                Literal::string("x"),
                Literal::string("y"),
                Literal::null(FieldType::String),
                Literal::string("x")
            ]
        );
    }

    #[test]
    fn test_convert_decimal_array() {
        let array = Decimal128Array::from(vec![Some(12345i128), None])
            .with_precision_and_scale(10, 2)
            .unwrap();
        let literals = literals_from_array(&array).unwrap();
        assert_eq!(literals[0], Literal::from(Decimal::new(10, 2, 12345)));
        assert!(literals[1].is_null());
    }
}
