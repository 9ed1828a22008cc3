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
    Array, BinaryArray, BooleanArray, Date32Array, Decimal128Array, Float32Array, Float64Array,
    Int16Array, Int32Array, Int64Array, Int8Array, StringArray, StructArray,
    TimestampMicrosecondArray, TimestampMillisecondArray, TimestampNanosecondArray,
    TimestampSecondArray,
};
use arrow::datatypes::{DataType, Schema, TimeUnit};

use crate::data::{Decimal, Timestamp};
use crate::error::*;
use crate::utils::binary_row::BinaryRowWriter;
use crate::utils::murmur_hash::{hash_bytes_by_words, DEFAULT_SEED};

/// Bucket id returned by every row in postpone mode.
pub const POSTPONE_BUCKET_ID: i32 = -2;

#[derive(Debug, Clone, Copy)]
enum BucketMode {
    /// `num_buckets > 0`: hash the bucket-key row.
    Fixed(i32),
    /// `num_buckets == -1`: append table with a single logical bucket.
    Unaware,
    /// `num_buckets == -2`: primary-key table deferring bucket assignment.
    Postpone,
}

/// Deterministic row-to-bucket mapping of the write path, bit-compatible
/// with the JVM `FixedBucketRowKeyExtractor`.
#[derive(Debug)]
pub struct BucketIdCalculator {
    mode: BucketMode,
}

impl BucketIdCalculator {
    pub fn create(is_primary_key_table: bool, num_buckets: i32) -> Result<Self> {
        let mode = match num_buckets {
            n if n > 0 => BucketMode::Fixed(n),
            -1 => {
                if is_primary_key_table {
                    return InvalidSnafu {
                        message:
                            "DynamicBucketMode or CrossPartitionBucketMode cannot calculate bucket id"
                                .to_string(),
                    }
                    .fail();
                }
                BucketMode::Unaware
            }
            -2 => {
                if !is_primary_key_table {
                    return InvalidSnafu {
                        message: "Append table not support PostponeBucketMode".to_string(),
                    }
                    .fail();
                }
                BucketMode::Postpone
            }
            _ => {
                return InvalidSnafu {
                    message: "num buckets must be -1 or -2 or greater than 0".to_string(),
                }
                .fail()
            }
        };
        Ok(Self { mode })
    }

    /// Bucket id per row of the bucket-key array, in row order.
    pub fn calculate_bucket_ids(
        &self,
        bucket_keys: &StructArray,
        bucket_schema: &Schema,
    ) -> Result<Vec<i32>> {
        let row_count = bucket_keys.len();
        match self.mode {
            BucketMode::Unaware => Ok(vec![0; row_count]),
            BucketMode::Postpone => Ok(vec![POSTPONE_BUCKET_ID; row_count]),
            BucketMode::Fixed(num_buckets) => {
                let arity = bucket_schema.fields().len();
                if arity == 0 || bucket_keys.num_columns() != arity {
                    return InvalidSnafu {
                        message: format!(
                            "bucket keys with {} children mismatch bucket schema with {arity} fields",
                            bucket_keys.num_columns()
                        ),
                    }
                    .fail();
                }
                let mut writer = BinaryRowWriter::new(arity);
                let mut bucket_ids = Vec::with_capacity(row_count);
                for row in 0..row_count {
                    writer.reset();
                    for (pos, field) in bucket_schema.fields().iter().enumerate() {
                        write_field(
                            &mut writer,
                            pos,
                            field.data_type(),
                            bucket_keys.column(pos).as_ref(),
                            row,
                        )?;
                    }
                    let hash = hash_bytes_by_words(writer.as_bytes(), DEFAULT_SEED)?;
                    // |hash % n|, the reduction of the JVM bucket extractor
                    bucket_ids.push((hash % num_buckets).abs());
                }
                Ok(bucket_ids)
            }
        }
    }
}

fn write_field(
    writer: &mut BinaryRowWriter,
    pos: usize,
    data_type: &DataType,
    column: &dyn Array,
    row: usize,
) -> Result<()> {
    if column.is_null(row) {
        writer.set_null_at(pos);
        return Ok(());
    }
    fn downcast<'a, T: 'static>(column: &'a dyn Array, data_type: &DataType) -> Result<&'a T> {
        column
            .as_any()
            .downcast_ref::<T>()
            .ok_or_else(|| Error::DataTypeInvalid {
                message: format!("bucket key column is not of type {data_type}"),
            })
    }
    match data_type {
        DataType::Boolean => {
            writer.write_boolean(pos, downcast::<BooleanArray>(column, data_type)?.value(row))
        }
        DataType::Int8 => {
            writer.write_byte(pos, downcast::<Int8Array>(column, data_type)?.value(row))
        }
        DataType::Int16 => {
            writer.write_short(pos, downcast::<Int16Array>(column, data_type)?.value(row))
        }
        DataType::Int32 => {
            writer.write_int(pos, downcast::<Int32Array>(column, data_type)?.value(row))
        }
        DataType::Int64 => {
            writer.write_long(pos, downcast::<Int64Array>(column, data_type)?.value(row))
        }
        DataType::Float32 => {
            writer.write_float(pos, downcast::<Float32Array>(column, data_type)?.value(row))
        }
        DataType::Float64 => {
            writer.write_double(pos, downcast::<Float64Array>(column, data_type)?.value(row))
        }
        DataType::Date32 => {
            writer.write_int(pos, downcast::<Date32Array>(column, data_type)?.value(row))
        }
        DataType::Utf8 => writer.write_bytes(
            pos,
            downcast::<StringArray>(column, data_type)?.value(row).as_bytes(),
        ),
        DataType::Binary => {
            writer.write_bytes(pos, downcast::<BinaryArray>(column, data_type)?.value(row))
        }
        DataType::Decimal128(precision, scale) => {
            let value = downcast::<Decimal128Array>(column, data_type)?.value(row);
            writer.write_decimal(pos, &Decimal::new(*precision, *scale, value))?;
        }
        DataType::Timestamp(unit, _) => {
            let raw = match unit {
                TimeUnit::Second => {
                    downcast::<TimestampSecondArray>(column, data_type)?.value(row)
                }
                TimeUnit::Millisecond => {
                    downcast::<TimestampMillisecondArray>(column, data_type)?.value(row)
                }
                TimeUnit::Microsecond => {
                    downcast::<TimestampMicrosecondArray>(column, data_type)?.value(row)
                }
                TimeUnit::Nanosecond => {
                    downcast::<TimestampNanosecondArray>(column, data_type)?.value(row)
                }
            };
            let precision = crate::spec::timestamp_precision(data_type)?;
            let timestamp = Timestamp::from_arrow_value(raw, unit);
            writer.write_timestamp(pos, &timestamp, precision);
        }
        other => {
            return InvalidSnafu {
                message: format!("type {other} not support in write bucket row"),
            }
            .fail()
        }
    }
    Ok(())
}

#[cfg(test)]
mod bucket_id_calculator_tests {
    use std::sync::Arc;

    use arrow::array::ArrayRef;
    use arrow::datatypes::Field;

    use super::*;

    fn int_keys(values: &[Option<i32>]) -> (StructArray, Schema) {
        let column: ArrayRef = Arc::new(Int32Array::from(values.to_vec()));
        let field = Field::new("b0", DataType::Int32, true);
        let keys = StructArray::from(vec![(Arc::new(field.clone()), column)]);
        (keys, Schema::new(vec![field]))
    }

    #[test]
    fn test_invalid_modes() {
        assert!(BucketIdCalculator::create(true, 0).is_err());
        assert!(BucketIdCalculator::create(true, -1).is_err());
        assert!(BucketIdCalculator::create(false, -2).is_err());
        assert!(BucketIdCalculator::create(false, -3).is_err());
        assert!(BucketIdCalculator::create(false, -1).is_ok());
        assert!(BucketIdCalculator::create(true, -2).is_ok());
        assert!(BucketIdCalculator::create(false, 8).is_ok());
    }

    #[test]
    fn test_unaware_bucket() {
        let (keys, schema) = int_keys(&[Some(10), Some(-1), Some(50)]);
        let calculator = BucketIdCalculator::create(false, -1).unwrap();
        assert_eq!(
            calculator.calculate_bucket_ids(&keys, &schema).unwrap(),
            vec![0, 0, 0]
        );
    }

    #[test]
    fn test_postpone_bucket() {
        let (keys, schema) = int_keys(&[Some(10), Some(-1), Some(50)]);
        let calculator = BucketIdCalculator::create(true, -2).unwrap();
        assert_eq!(
            calculator.calculate_bucket_ids(&keys, &schema).unwrap(),
            vec![-2, -2, -2]
        );
    }

    #[test]
    fn test_fixed_bucket_deterministic_and_in_range() {
        let values: Vec<Option<i32>> = (0..100).map(Some).collect();
        let (keys, schema) = int_keys(&values);
        let calculator = BucketIdCalculator::create(true, 12345).unwrap();
        let first = calculator.calculate_bucket_ids(&keys, &schema).unwrap();
        let second = calculator.calculate_bucket_ids(&keys, &schema).unwrap();
        assert_eq!(first, second);
        assert!(first.iter().all(|bucket| (0..12345).contains(bucket)));
        // a hash worth its salt spreads 100 keys over more than one bucket
        assert!(first.iter().collect::<std::collections::HashSet<_>>().len() > 1);
    }

    #[test]
    fn test_null_rows_hash_consistently() {
        let (keys, schema) = int_keys(&[None, Some(7), None]);
        let calculator = BucketIdCalculator::create(false, 16).unwrap();
        let buckets = calculator.calculate_bucket_ids(&keys, &schema).unwrap();
        assert_eq!(buckets[0], buckets[2]);
    }

    #[test]
    fn test_variant_type_compatible_with_java() {
        // four reference rows with the bucket ids the JVM
        // FixedBucketRowKeyExtractor assigns for num_buckets = 12345
        let text = "olá mundo，你好世界。Two roads diverged in a wood, and I took the one \
                    less traveled by, And that has made all the difference.";
        let fields = vec![
            Field::new("v0", DataType::Boolean, true),
            Field::new("v1", DataType::Int8, true),
            Field::new("v2", DataType::Int16, true),
            Field::new("v3", DataType::Int32, true),
            Field::new("v4", DataType::Int64, true),
            Field::new("v5", DataType::Float32, true),
            Field::new("v6", DataType::Float64, true),
            Field::new("v7", DataType::Date32, true),
            Field::new("v8", DataType::Timestamp(TimeUnit::Nanosecond, None), true),
            Field::new("v9", DataType::Decimal128(30, 20), true),
            Field::new("v10", DataType::Utf8, true),
            Field::new("v11", DataType::Binary, true),
        ];
        let columns: Vec<ArrayRef> = vec![
            Arc::new(BooleanArray::from(vec![true, false, true, true])),
            Arc::new(Int8Array::from(vec![10i8, -128, 127, 0])),
            Arc::new(Int16Array::from(vec![200i16, -32768, 32767, 0])),
            Arc::new(Int32Array::from(vec![65536i32, -2147483648, 2147483647, 0])),
            Arc::new(Int64Array::from(vec![123456789i64, i64::MIN, i64::MAX, 0])),
            Arc::new(Float32Array::from(vec![
                0.0f32,
                -3.4028235E38,
                3.4028235E38,
                1.4E-45,
            ])),
            Arc::new(Float64Array::from(vec![
                0.0f64,
                -1.7976931348623157E308,
                1.7976931348623157E308,
                4.9E-324,
            ])),
            Arc::new(Date32Array::from(vec![2000i32, -719528, 2932896, 0])),
            Arc::new(TimestampNanosecondArray::from(vec![
                -86399999999500i64,
                i64::MIN,
                i64::MAX,
                0,
            ])),
            Arc::new(
                Decimal128Array::from(vec![
                    213448690000000000000009i128,
                    -99999999999999999999999999999999999999,
                    99999999999999999999999999999999999999,
                    0,
                ])
                .with_precision_and_scale(30, 20)
                .unwrap(),
            ),
            Arc::new(StringArray::from(vec![text, "Alice", "Alice", "Alice"])),
            Arc::new(BinaryArray::from(vec![
                b"Alice".as_slice(),
                text.as_bytes(),
                text.as_bytes(),
                text.as_bytes(),
            ])),
        ];
        let keys = StructArray::try_new(fields.clone().into(), columns, None).unwrap();
        let schema = Schema::new(fields);
        let calculator = BucketIdCalculator::create(true, 12345).unwrap();
        let expected = vec![11275, 12272, 6549, 11795];
        assert_eq!(
            calculator.calculate_bucket_ids(&keys, &schema).unwrap(),
            expected
        );
        // calculating multiple times yields the same result
        assert_eq!(
            calculator.calculate_bucket_ids(&keys, &schema).unwrap(),
            expected
        );
    }

    #[test]
    fn test_unsupported_key_type() {
        let field = Field::new(
            "b0",
            DataType::List(Arc::new(Field::new("item", DataType::Int64, true))),
            true,
        );
        let column: ArrayRef = Arc::new(arrow::array::ListArray::from_iter_primitive::<
            arrow::datatypes::Int64Type,
            _,
            _,
        >(vec![Some(vec![Some(1), Some(1), Some(2)])]));
        let keys = StructArray::from(vec![(Arc::new(field.clone()), column)]);
        let schema = Schema::new(vec![field]);
        let calculator = BucketIdCalculator::create(true, 10).unwrap();
        assert!(calculator.calculate_bucket_ids(&keys, &schema).is_err());
    }
}
