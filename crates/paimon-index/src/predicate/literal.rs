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
use std::fmt::{Display, Formatter};
use std::hash::{Hash, Hasher};

use bytes::Bytes;

use crate::data::{Decimal, Timestamp};
use crate::error::*;
use crate::spec::FieldType;

/// An immutable typed value.
///
/// A literal carries its field type even when null. `Int` doubles as the
/// payload of `DATE` and `Bytes` as the payload of `STRING`/`BINARY`/`BLOB`;
/// the field type disambiguates.
#[derive(Debug, Clone)]
pub struct Literal {
    field_type: FieldType,
    value: Option<LiteralValue>,
}

#[derive(Debug, Clone)]
enum LiteralValue {
    Boolean(bool),
    TinyInt(i8),
    SmallInt(i16),
    Int(i32),
    BigInt(i64),
    Float(f32),
    Double(f64),
    Bytes(Bytes),
    Timestamp(Timestamp),
    Decimal(Decimal),
}

const FLOAT_EQUAL_EPSILON: f64 = 1e-5;

impl Literal {
    pub fn null(field_type: FieldType) -> Self {
        Self {
            field_type,
            value: None,
        }
    }

    pub fn date(days: i32) -> Self {
        Self {
            field_type: FieldType::Date,
            value: Some(LiteralValue::Int(days)),
        }
    }

    pub fn string(value: impl AsRef<str>) -> Self {
        Self {
            field_type: FieldType::String,
            value: Some(LiteralValue::Bytes(Bytes::copy_from_slice(
                value.as_ref().as_bytes(),
            ))),
        }
    }

    pub fn binary(value: impl AsRef<[u8]>) -> Self {
        Self {
            field_type: FieldType::Binary,
            value: Some(LiteralValue::Bytes(Bytes::copy_from_slice(value.as_ref()))),
        }
    }

    pub fn bytes_of_type(field_type: FieldType, value: Bytes) -> Self {
        debug_assert!(matches!(
            field_type,
            FieldType::String | FieldType::Binary | FieldType::Blob
        ));
        Self {
            field_type,
            value: Some(LiteralValue::Bytes(value)),
        }
    }

    pub fn field_type(&self) -> FieldType {
        self.field_type
    }

    pub fn is_null(&self) -> bool {
        self.value.is_none()
    }

    /// Parse a literal of the given type from its string rendering.
    pub fn from_string(field_type: FieldType, value_str: &str) -> Result<Literal> {
        fn parse<T: std::str::FromStr>(field_type: FieldType, value_str: &str) -> Result<T> {
            value_str.parse::<T>().map_err(|_| Error::Invalid {
                message: format!("cannot convert {value_str} to {field_type} type"),
            })
        }
        match field_type {
            FieldType::Boolean => Ok(parse::<bool>(field_type, value_str)?.into()),
            FieldType::TinyInt => Ok(parse::<i8>(field_type, value_str)?.into()),
            FieldType::SmallInt => Ok(parse::<i16>(field_type, value_str)?.into()),
            FieldType::Int => Ok(parse::<i32>(field_type, value_str)?.into()),
            FieldType::BigInt => Ok(parse::<i64>(field_type, value_str)?.into()),
            FieldType::Float => Ok(parse::<f32>(field_type, value_str)?.into()),
            FieldType::Double => Ok(parse::<f64>(field_type, value_str)?.into()),
            FieldType::Date => Ok(Literal::date(parse::<i32>(field_type, value_str)?)),
            FieldType::String => Ok(Literal::string(value_str)),
            FieldType::Binary => Ok(Literal::binary(value_str.as_bytes())),
            other => InvalidSnafu {
                message: format!("Do not support type {other}"),
            }
            .fail(),
        }
    }

    fn value(&self) -> Result<&LiteralValue> {
        self.value.as_ref().ok_or_else(|| Error::Invalid {
            message: format!("literal of type {} is null", self.field_type),
        })
    }

    pub fn as_boolean(&self) -> Result<bool> {
        match self.value()? {
            LiteralValue::Boolean(v) => Ok(*v),
            _ => self.type_mismatch("BOOLEAN"),
        }
    }

    pub fn as_tiny_int(&self) -> Result<i8> {
        match self.value()? {
            LiteralValue::TinyInt(v) => Ok(*v),
            _ => self.type_mismatch("TINYINT"),
        }
    }

    pub fn as_small_int(&self) -> Result<i16> {
        match self.value()? {
            LiteralValue::SmallInt(v) => Ok(*v),
            _ => self.type_mismatch("SMALLINT"),
        }
    }

    pub fn as_int(&self) -> Result<i32> {
        match self.value()? {
            LiteralValue::Int(v) => Ok(*v),
            _ => self.type_mismatch("INT"),
        }
    }

    pub fn as_big_int(&self) -> Result<i64> {
        match self.value()? {
            LiteralValue::BigInt(v) => Ok(*v),
            _ => self.type_mismatch("BIGINT"),
        }
    }

    pub fn as_float(&self) -> Result<f32> {
        match self.value()? {
            LiteralValue::Float(v) => Ok(*v),
            _ => self.type_mismatch("FLOAT"),
        }
    }

    pub fn as_double(&self) -> Result<f64> {
        match self.value()? {
            LiteralValue::Double(v) => Ok(*v),
            _ => self.type_mismatch("DOUBLE"),
        }
    }

    pub fn as_bytes(&self) -> Result<&[u8]> {
        match self.value()? {
            LiteralValue::Bytes(v) => Ok(v.as_ref()),
            _ => self.type_mismatch("STRING/BINARY"),
        }
    }

    pub fn as_timestamp(&self) -> Result<Timestamp> {
        match self.value()? {
            LiteralValue::Timestamp(v) => Ok(*v),
            _ => self.type_mismatch("TIMESTAMP"),
        }
    }

    pub fn as_decimal(&self) -> Result<Decimal> {
        match self.value()? {
            LiteralValue::Decimal(v) => Ok(*v),
            _ => self.type_mismatch("DECIMAL"),
        }
    }

    fn type_mismatch<T>(&self, requested: &str) -> Result<T> {
        DataTypeInvalidSnafu {
            message: format!(
                "literal of type {} accessed as {requested}",
                self.field_type
            ),
        }
        .fail()
    }

    pub fn compare_to(&self, other: &Literal) -> Result<Ordering> {
        if self.field_type != other.field_type {
            return InvalidSnafu {
                message: format!(
                    "cannot compare with different type [{}: {}], [{}: {}]",
                    self, self.field_type, other, other.field_type
                ),
            }
            .fail();
        }
        match (&self.value, &other.value) {
            (None, None) => Ok(Ordering::Equal),
            (None, Some(_)) | (Some(_), None) => InvalidSnafu {
                message: "cannot compare with null".to_string(),
            }
            .fail(),
            (Some(left), Some(right)) => match (left, right) {
                (LiteralValue::Boolean(a), LiteralValue::Boolean(b)) => Ok(a.cmp(b)),
                (LiteralValue::TinyInt(a), LiteralValue::TinyInt(b)) => Ok(a.cmp(b)),
                (LiteralValue::SmallInt(a), LiteralValue::SmallInt(b)) => Ok(a.cmp(b)),
                (LiteralValue::Int(a), LiteralValue::Int(b)) => Ok(a.cmp(b)),
                (LiteralValue::BigInt(a), LiteralValue::BigInt(b)) => Ok(a.cmp(b)),
                (LiteralValue::Float(a), LiteralValue::Float(b)) => Ok(a.total_cmp(b)),
                (LiteralValue::Double(a), LiteralValue::Double(b)) => Ok(a.total_cmp(b)),
                (LiteralValue::Bytes(a), LiteralValue::Bytes(b)) => Ok(a.as_ref().cmp(b.as_ref())),
                (LiteralValue::Timestamp(a), LiteralValue::Timestamp(b)) => Ok(a.cmp(b)),
                (LiteralValue::Decimal(a), LiteralValue::Decimal(b)) => a.compare_to(b),
                _ => InvalidSnafu {
                    message: format!("unsupported comparison for type {}", self.field_type),
                }
                .fail(),
            },
        }
    }
}

impl PartialEq for Literal {
    fn eq(&self, other: &Self) -> bool {
        if self.field_type != other.field_type {
            return false;
        }
        match (&self.value, &other.value) {
            (None, None) => true,
            (None, Some(_)) | (Some(_), None) => false,
            (Some(left), Some(right)) => match (left, right) {
                (LiteralValue::Boolean(a), LiteralValue::Boolean(b)) => a == b,
                (LiteralValue::TinyInt(a), LiteralValue::TinyInt(b)) => a == b,
                (LiteralValue::SmallInt(a), LiteralValue::SmallInt(b)) => a == b,
                (LiteralValue::Int(a), LiteralValue::Int(b)) => a == b,
                (LiteralValue::BigInt(a), LiteralValue::BigInt(b)) => a == b,
                (LiteralValue::Float(a), LiteralValue::Float(b)) => {
                    float_equal(*a as f64, *b as f64)
                }
                (LiteralValue::Double(a), LiteralValue::Double(b)) => float_equal(*a, *b),
                (LiteralValue::Bytes(a), LiteralValue::Bytes(b)) => a == b,
                (LiteralValue::Timestamp(a), LiteralValue::Timestamp(b)) => a == b,
                (LiteralValue::Decimal(a), LiteralValue::Decimal(b)) => a == b,
                _ => false,
            },
        }
    }
}

impl Eq for Literal {}

/// NaNs compare equal, infinities compare by sign, finite values within an
/// absolute epsilon of 1e-5.
fn float_equal(a: f64, b: f64) -> bool {
    if a.is_nan() && b.is_nan() {
        return true;
    }
    if a.is_infinite() || b.is_infinite() {
        return a == b;
    }
    (a - b).abs() < FLOAT_EQUAL_EPSILON
}

impl Hash for Literal {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.field_type.hash(state);
        match &self.value {
            None => state.write_u8(0),
            // floats compare within an epsilon, so they contribute no value
            // bits to the hash
            Some(LiteralValue::Float(_)) | Some(LiteralValue::Double(_)) => state.write_u8(1),
            Some(LiteralValue::Boolean(v)) => v.hash(state),
            Some(LiteralValue::TinyInt(v)) => v.hash(state),
            Some(LiteralValue::SmallInt(v)) => v.hash(state),
            Some(LiteralValue::Int(v)) => v.hash(state),
            Some(LiteralValue::BigInt(v)) => v.hash(state),
            Some(LiteralValue::Bytes(v)) => v.hash(state),
            Some(LiteralValue::Timestamp(v)) => v.hash(state),
            Some(LiteralValue::Decimal(v)) => v.hash(state),
        }
    }
}

impl Display for Literal {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.value {
            None => write!(f, "null"),
            Some(LiteralValue::Boolean(v)) => write!(f, "{v}"),
            Some(LiteralValue::TinyInt(v)) => write!(f, "{v}"),
            Some(LiteralValue::SmallInt(v)) => write!(f, "{v}"),
            Some(LiteralValue::Int(v)) => write!(f, "{v}"),
            Some(LiteralValue::BigInt(v)) => write!(f, "{v}"),
            Some(LiteralValue::Float(v)) => write!(f, "{v}"),
            Some(LiteralValue::Double(v)) => write!(f, "{v}"),
            Some(LiteralValue::Bytes(v)) => match std::str::from_utf8(v) {
                Ok(s) => write!(f, "{s}"),
                Err(_) => write!(f, "0x{}", hex_string(v)),
            },
            Some(LiteralValue::Timestamp(v)) => {
                write!(f, "{}ms+{}ns", v.millisecond(), v.nano_of_millisecond())
            }
            Some(LiteralValue::Decimal(v)) => {
                write!(f, "{}e-{}", v.unscaled(), v.scale())
            }
        }
    }
}

fn hex_string(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

impl From<bool> for Literal {
    fn from(value: bool) -> Self {
        Self {
            field_type: FieldType::Boolean,
            value: Some(LiteralValue::Boolean(value)),
        }
    }
}

impl From<i8> for Literal {
    fn from(value: i8) -> Self {
        Self {
            field_type: FieldType::TinyInt,
            value: Some(LiteralValue::TinyInt(value)),
        }
    }
}

impl From<i16> for Literal {
    fn from(value: i16) -> Self {
        Self {
            field_type: FieldType::SmallInt,
            value: Some(LiteralValue::SmallInt(value)),
        }
    }
}

impl From<i32> for Literal {
    fn from(value: i32) -> Self {
        Self {
            field_type: FieldType::Int,
            value: Some(LiteralValue::Int(value)),
        }
    }
}

impl From<i64> for Literal {
    fn from(value: i64) -> Self {
        Self {
            field_type: FieldType::BigInt,
            value: Some(LiteralValue::BigInt(value)),
        }
    }
}

impl From<f32> for Literal {
    fn from(value: f32) -> Self {
        Self {
            field_type: FieldType::Float,
            value: Some(LiteralValue::Float(value)),
        }
    }
}

impl From<f64> for Literal {
    fn from(value: f64) -> Self {
        Self {
            field_type: FieldType::Double,
            value: Some(LiteralValue::Double(value)),
        }
    }
}

impl From<Timestamp> for Literal {
    fn from(value: Timestamp) -> Self {
        Self {
            field_type: FieldType::Timestamp,
            value: Some(LiteralValue::Timestamp(value)),
        }
    }
}

impl From<Decimal> for Literal {
    fn from(value: Decimal) -> Self {
        Self {
            field_type: FieldType::Decimal,
            value: Some(LiteralValue::Decimal(value)),
        }
    }
}

#[cfg(test)]
mod literal_tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn test_null_carries_type() {
        let null_int = Literal::null(FieldType::Int);
        assert!(null_int.is_null());
        assert_eq!(null_int.field_type(), FieldType::Int);
        assert_ne!(null_int, Literal::null(FieldType::BigInt));
        assert_eq!(null_int, Literal::null(FieldType::Int));
        assert_ne!(null_int, Literal::from(0i32));
    }

    #[test]
    fn test_equality_exact_types() {
        assert_eq!(Literal::from(7i32), Literal::from(7i32));
        assert_ne!(Literal::from(7i32), Literal::from(8i32));
        // same numeric value but different type
        assert_ne!(Literal::from(7i32), Literal::from(7i64));
        assert_eq!(Literal::string("a"), Literal::string("a"));
        assert_ne!(Literal::string("a"), Literal::binary(b"a"));
    }

    #[test]
    fn test_float_equality_semantics() {
        assert_eq!(Literal::from(f64::NAN), Literal::from(f64::NAN));
        assert_eq!(Literal::from(f64::INFINITY), Literal::from(f64::INFINITY));
        assert_ne!(Literal::from(f64::INFINITY), Literal::from(f64::NEG_INFINITY));
        assert_eq!(Literal::from(1.000001f64), Literal::from(1.000002f64));
        assert_ne!(Literal::from(1.0f64), Literal::from(1.1f64));
        assert_eq!(Literal::from(2.0000001f32), Literal::from(2.0000002f32));
    }

    #[test]
    fn test_hash_agrees_with_equality() {
        let mut map: HashMap<Literal, u32> = HashMap::new();
        map.insert(Literal::string("key"), 1);
        map.insert(Literal::null(FieldType::String), 2);
        assert_eq!(map.get(&Literal::string("key")), Some(&1));
        assert_eq!(map.get(&Literal::null(FieldType::String)), Some(&2));
        // epsilon-equal floats hash identically since value bits are skipped
        map.insert(Literal::from(1.000001f64), 3);
        assert_eq!(map.get(&Literal::from(1.000002f64)), Some(&3));
    }

    #[test]
    fn test_compare_total_order_within_type() {
        assert_eq!(
            Literal::from(1i64).compare_to(&Literal::from(2i64)).unwrap(),
            Ordering::Less
        );
        assert_eq!(
            Literal::string("b").compare_to(&Literal::string("a")).unwrap(),
            Ordering::Greater
        );
        assert_eq!(
            Literal::date(10).compare_to(&Literal::date(10)).unwrap(),
            Ordering::Equal
        );
        assert!(Literal::from(1i32).compare_to(&Literal::from(1i64)).is_err());
        assert!(Literal::from(1i32)
            .compare_to(&Literal::null(FieldType::Int))
            .is_err());
    }

    #[test]
    fn test_from_string() {
        assert_eq!(
            Literal::from_string(FieldType::Int, "42").unwrap(),
            Literal::from(42i32)
        );
        assert_eq!(
            Literal::from_string(FieldType::Boolean, "true").unwrap(),
            Literal::from(true)
        );
        assert_eq!(
            Literal::from_string(FieldType::String, "abc").unwrap(),
            Literal::string("abc")
        );
        assert!(Literal::from_string(FieldType::Int, "abc").is_err());
        assert!(Literal::from_string(FieldType::Decimal, "1.23").is_err());
    }
}
