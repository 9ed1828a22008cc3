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

use std::hash::Hasher;

use arrow::datatypes::DataType;
use twox_hash::XxHash64;

use crate::error::*;
use crate::predicate::Literal;
use crate::spec::{field_type_of, timestamp_precision, FieldType};

/// 64-bit value hashing bit-compatible with the JVM bloom-filter writer.
///
/// Numerics widen to int64 and run through the Thomas Wang mixer; floats
/// hash their raw bit patterns (sign-extended for f32); strings and binary
/// run xxHash64 with seed 0.
#[derive(Debug, Clone, Copy)]
pub enum FastHash {
    Long,
    Float,
    Double,
    Timestamp { precision: i32 },
    Bytes,
}

impl FastHash {
    pub fn for_type(data_type: &DataType) -> Result<FastHash> {
        let field_type = field_type_of(data_type)?;
        match field_type {
            FieldType::TinyInt
            | FieldType::SmallInt
            | FieldType::Int
            | FieldType::Date
            | FieldType::BigInt => Ok(FastHash::Long),
            FieldType::Float => Ok(FastHash::Float),
            FieldType::Double => Ok(FastHash::Double),
            FieldType::Timestamp => Ok(FastHash::Timestamp {
                precision: timestamp_precision(data_type)?,
            }),
            FieldType::String | FieldType::Binary => Ok(FastHash::Bytes),
            other => InvalidSnafu {
                message: format!("bloom filter index does not support {other}"),
            }
            .fail(),
        }
    }

    pub fn hash(&self, literal: &Literal) -> Result<i64> {
        match self {
            FastHash::Long => {
                let value = match literal.field_type() {
                    FieldType::TinyInt => literal.as_tiny_int()? as i64,
                    FieldType::SmallInt => literal.as_small_int()? as i64,
                    FieldType::Int | FieldType::Date => literal.as_int()? as i64,
                    FieldType::BigInt => literal.as_big_int()?,
                    other => {
                        return DataTypeInvalidSnafu {
                            message: format!("cannot widen {other} literal to int64"),
                        }
                        .fail()
                    }
                };
                Ok(long_hash(value))
            }
            FastHash::Float => {
                let bits = literal.as_float()?.to_bits() as i32;
                Ok(long_hash(bits as i64))
            }
            FastHash::Double => {
                let bits = literal.as_double()?.to_bits() as i64;
                Ok(long_hash(bits))
            }
            FastHash::Timestamp { precision } => {
                let value = literal.as_timestamp()?.to_int64_by_precision(*precision);
                Ok(long_hash(value))
            }
            FastHash::Bytes => Ok(hash64(literal.as_bytes()?)),
        }
    }
}

/// Thomas Wang's 64-bit mixer with arithmetic right shifts and wrapping
/// additions, as the reference implementations run it.
pub fn long_hash(key: i64) -> i64 {
    let mut key = key;
    key = (!key).wrapping_add(key << 21); // key = (key << 21) - key - 1;
    key ^= key >> 24;
    key = key.wrapping_add(key << 3).wrapping_add(key << 8); // key * 265
    key ^= key >> 14;
    key = key.wrapping_add(key << 2).wrapping_add(key << 4); // key * 21
    key ^= key >> 28;
    key = key.wrapping_add(key << 31);
    key
}

/// xxHash64 with seed 0.
pub fn hash64(data: &[u8]) -> i64 {
    let mut hasher = XxHash64::with_seed(0);
    hasher.write(data);
    hasher.finish() as i64
}

#[cfg(test)]
mod fast_hash_tests {
    use arrow::datatypes::TimeUnit;

    use super::*;
    use crate::data::Timestamp;

    fn check(hash: FastHash, literals: &[Literal], expected: &[u64]) {
        assert_eq!(literals.len(), expected.len());
        for (literal, want) in literals.iter().zip(expected) {
            assert_eq!(hash.hash(literal).unwrap() as u64, *want, "literal {literal}");
        }
    }

    #[test]
    fn test_tiny_int_compatible_with_java() {
        let hash = FastHash::for_type(&DataType::Int8).unwrap();
        check(
            hash,
            &[
                Literal::from(-128i8),
                Literal::from(-100i8),
                Literal::from(-1i8),
                Literal::from(0i8),
                Literal::from(1i8),
                Literal::from(10i8),
                Literal::from(127i8),
            ],
            &[
                0xe547e8444a8fcdd1,
                0xdb213b4e3642747d,
                0x5bca868437950d03,
                0x0,
                0x5bca7c69b794f8ce,
                0x95ea2955abd45275,
                0x897cf79712f9ec7c,
            ],
        );
    }

    #[test]
    fn test_small_int_compatible_with_java() {
        let hash = FastHash::for_type(&DataType::Int16).unwrap();
        check(
            hash,
            &[
                Literal::from(-32768i16),
                Literal::from(-100i16),
                Literal::from(-1i16),
                Literal::from(0i16),
                Literal::from(1i16),
                Literal::from(10i16),
                Literal::from(32767i16),
            ],
            &[
                0x47ed1a480fd77cfb,
                0xdb213b4e3642747d,
                0x5bca868437950d03,
                0x0,
                0x5bca7c69b794f8ce,
                0x95ea2955abd45275,
                0xe968161ed2cd74ae,
            ],
        );
    }

    #[test]
    fn test_int_and_date_compatible_with_java() {
        for data_type in [DataType::Int32, DataType::Date32] {
            let hash = FastHash::for_type(&data_type).unwrap();
            let literals: Vec<Literal> =
                [-2147483648i32, -1034556, -1, 0, 1, 49647, 2147483647]
                    .into_iter()
                    .map(|v| {
                        if data_type == DataType::Date32 {
                            Literal::date(v)
                        } else {
                            Literal::from(v)
                        }
                    })
                    .collect();
            check(
                hash,
                &literals,
                &[
                    0x111ec0fd6aa8626c,
                    0xfb5d8d6df66551c8,
                    0x5bca868437950d03,
                    0x0,
                    0x5bca7c69b794f8ce,
                    0x94147f05a824e009,
                    0xc6d8bcc4d61c69a4,
                ],
            );
        }
    }

    #[test]
    fn test_big_int_compatible_with_java() {
        let hash = FastHash::for_type(&DataType::Int64).unwrap();
        check(
            hash,
            &[
                Literal::from(i64::MIN),
                Literal::from(-4598654206466i64),
                Literal::from(-1i64),
                Literal::from(0i64),
                Literal::from(1i64),
                Literal::from(8548553896418i64),
                Literal::from(i64::MAX),
            ],
            &[
                0x3be7d0f7780de548,
                0xebd8376102414af8,
                0x5bca868437950d03,
                0x0,
                0x5bca7c69b794f8ce,
                0xe7f3590a09b6693a,
                0x81ad52718398e837,
            ],
        );
    }

    #[test]
    fn test_timestamp_compatible_with_java() {
        let hash =
            FastHash::for_type(&DataType::Timestamp(TimeUnit::Nanosecond, None)).unwrap();
        check(
            hash,
            &[
                Literal::from(Timestamp::new(1745542802000, 123000)),
                Literal::from(Timestamp::new(1745542902000, 123000)),
                Literal::from(Timestamp::new(1745542602000, 123000)),
                Literal::from(Timestamp::new(-1745, 123000)),
                Literal::from(Timestamp::new(-1765, 123000)),
                Literal::from(Timestamp::new(1745542802000, 123000)),
                Literal::from(Timestamp::new(-1725, 123000)),
            ],
            &[
                0x3fa6477403e32e14,
                0x1ec9ecd0a1b07aea,
                0xd74122b773e5f45c,
                0xe7f352e64f55f259,
                0xbe8a32867c820cf2,
                0x3fa6477403e32e14,
                0xd3ffe009a770b6a0,
            ],
        );
    }

    #[test]
    fn test_float_compatible_with_java() {
        let hash = FastHash::for_type(&DataType::Float32).unwrap();
        check(
            hash,
            &[
                Literal::from(f32::MIN),
                Literal::from(-123.45f32),
                Literal::from(-12345.6f32),
                Literal::from(0.0f32),
                Literal::from(2.1f32),
                Literal::from(345.12f32),
                Literal::from(f32::MAX),
            ],
            &[
                0xecf6796dd7355dbc,
                0x1f4dcc5b8a502b70,
                0xe678035506c03314,
                0x0,
                0x08df65966db697d6,
                0xdc9b5b8828f877ee,
                0x0f9b567bea590d8d,
            ],
        );
    }

    #[test]
    fn test_double_compatible_with_java() {
        let hash = FastHash::for_type(&DataType::Float64).unwrap();
        check(
            hash,
            &[
                Literal::from(f64::MIN),
                Literal::from(-123.45f64),
                Literal::from(-12345.6f64),
                Literal::from(0.0f64),
                Literal::from(2.1f64),
                Literal::from(345.12f64),
                Literal::from(f64::MAX),
            ],
            &[
                0xb3c148792fed6cb9,
                0x0989ea602f70c211,
                0x8040a6007c7b22e0,
                0x0,
                0xfca8098dd6548561,
                0x477acb9b5361fc7f,
                0x0939ba81c9dffe90,
            ],
        );
    }

    #[test]
    fn test_string_and_binary_xxhash() {
        let hash = FastHash::for_type(&DataType::Utf8).unwrap();
        check(
            hash,
            &[
                Literal::string(""),
                Literal::string("example"),
                Literal::string("Have a nice day!"),
            ],
            &[0xef46db3751d8e999, 0xe6eda53558c41c5e, 0xe663266d57d776c2],
        );

        let hash = FastHash::for_type(&DataType::Binary).unwrap();
        check(
            hash,
            &[Literal::binary("我是一个粉刷匠".as_bytes())],
            &[0x9f01fcd3f19877e6],
        );
    }

    #[test]
    fn test_unsupported_type() {
        assert!(FastHash::for_type(&DataType::Boolean).is_err());
    }
}
