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

use arrow_array::cast::AsArray;
use arrow_array::types::{
    Date32Type, Float32Type, Float64Type, Int16Type, Int32Type, Int64Type, Int8Type,
    TimestampMicrosecondType, TimestampMillisecondType, TimestampNanosecondType,
    TimestampSecondType,
};
use arrow_array::{Array, ArrayRef};
use arrow_schema::{DataType, TimeUnit};

use crate::spec::{split_timestamp, BucketKind, Datum};
use crate::{ensure_valid, Error, ErrorKind, Result};

/// Hash of a single value. Null values always hash to 0.
trait HashFunction {
    fn hash_bool(v: bool) -> Result<i32>;

    /// Tiny, small and regular integers.
    fn hash_int(v: i32) -> Result<i32>;

    fn hash_long(v: i64) -> Result<i32>;

    fn hash_float(v: f32) -> Result<i32>;

    fn hash_double(v: f64) -> Result<i32>;

    fn hash_str(v: &str) -> Result<i32>;

    fn hash_binary(v: &[u8]) -> Result<i32>;

    /// v is days from unix epoch
    fn hash_date(v: i32) -> Result<i32> {
        Self::hash_int(v)
    }

    fn hash_timestamp(seconds: i64, nanos: u32) -> Result<i32>;

    fn hash_datum(datum: &Datum) -> Result<i32> {
        match datum {
            Datum::Null => Ok(0),
            Datum::Boolean(v) => Self::hash_bool(*v),
            Datum::TinyInt(v) => Self::hash_int(*v as i32),
            Datum::SmallInt(v) => Self::hash_int(*v as i32),
            Datum::Integer(v) => Self::hash_int(*v),
            Datum::BigInt(v) => Self::hash_long(*v),
            Datum::Real(v) => Self::hash_float(*v),
            Datum::Double(v) => Self::hash_double(*v),
            Datum::Varchar(v) => Self::hash_str(v),
            Datum::Varbinary(v) => Self::hash_binary(v),
            Datum::Date(v) => Self::hash_date(*v),
            Datum::Timestamp { seconds, nanos } => Self::hash_timestamp(*seconds, *nanos),
        }
    }

    fn hash_column(column: &dyn Array) -> Result<Vec<i32>> {
        match column.data_type() {
            DataType::Boolean => hash_values(column.as_boolean().iter(), Self::hash_bool),
            DataType::Int8 => hash_values(column.as_primitive::<Int8Type>().iter(), |v| {
                Self::hash_int(v as i32)
            }),
            DataType::Int16 => hash_values(column.as_primitive::<Int16Type>().iter(), |v| {
                Self::hash_int(v as i32)
            }),
            DataType::Int32 => {
                hash_values(column.as_primitive::<Int32Type>().iter(), Self::hash_int)
            }
            DataType::Int64 => {
                hash_values(column.as_primitive::<Int64Type>().iter(), Self::hash_long)
            }
            DataType::Float32 => {
                hash_values(column.as_primitive::<Float32Type>().iter(), Self::hash_float)
            }
            DataType::Float64 => {
                hash_values(column.as_primitive::<Float64Type>().iter(), Self::hash_double)
            }
            DataType::Utf8 => hash_values(column.as_string::<i32>().iter(), Self::hash_str),
            DataType::LargeUtf8 => hash_values(column.as_string::<i64>().iter(), Self::hash_str),
            DataType::Binary => hash_values(column.as_binary::<i32>().iter(), Self::hash_binary),
            DataType::LargeBinary => {
                hash_values(column.as_binary::<i64>().iter(), Self::hash_binary)
            }
            DataType::Date32 => {
                hash_values(column.as_primitive::<Date32Type>().iter(), Self::hash_date)
            }
            DataType::Timestamp(unit, _) => {
                let unit = *unit;
                let hash = |v: i64| {
                    let (seconds, nanos) = split_timestamp(v, unit);
                    Self::hash_timestamp(seconds, nanos)
                };
                match unit {
                    TimeUnit::Second => {
                        hash_values(column.as_primitive::<TimestampSecondType>().iter(), hash)
                    }
                    TimeUnit::Millisecond => hash_values(
                        column.as_primitive::<TimestampMillisecondType>().iter(),
                        hash,
                    ),
                    TimeUnit::Microsecond => hash_values(
                        column.as_primitive::<TimestampMicrosecondType>().iter(),
                        hash,
                    ),
                    TimeUnit::Nanosecond => hash_values(
                        column.as_primitive::<TimestampNanosecondType>().iter(),
                        hash,
                    ),
                }
            }
            other => Err(Error::new(
                ErrorKind::FeatureUnsupported,
                format!("Unsupported data type for bucketing: {other}"),
            )),
        }
    }
}

fn hash_values<T>(
    values: impl Iterator<Item = Option<T>>,
    hash: impl Fn(T) -> Result<i32>,
) -> Result<Vec<i32>> {
    values.map(|v| v.map_or(Ok(0), &hash)).collect()
}

/// Murmur3 x86 32-bit over the canonical byte form of each value.
struct NativeHash;

impl NativeHash {
    fn hash_bytes(mut v: &[u8]) -> Result<i32> {
        Ok(murmur3::murmur3_32(&mut v, 0)? as i32)
    }
}

impl HashFunction for NativeHash {
    fn hash_bool(v: bool) -> Result<i32> {
        Self::hash_int(v as i32)
    }

    fn hash_int(v: i32) -> Result<i32> {
        Self::hash_long(v as i64)
    }

    fn hash_long(v: i64) -> Result<i32> {
        Self::hash_bytes(v.to_le_bytes().as_slice())
    }

    fn hash_float(v: f32) -> Result<i32> {
        Self::hash_double(v as f64)
    }

    fn hash_double(v: f64) -> Result<i32> {
        Self::hash_long(v.to_bits() as i64)
    }

    fn hash_str(v: &str) -> Result<i32> {
        Self::hash_bytes(v.as_bytes())
    }

    fn hash_binary(v: &[u8]) -> Result<i32> {
        Self::hash_bytes(v)
    }

    /// Hashed as microseconds from unix epoch.
    fn hash_timestamp(seconds: i64, nanos: u32) -> Result<i32> {
        Self::hash_long(
            seconds
                .wrapping_mul(1_000_000)
                .wrapping_add((nanos / 1_000) as i64),
        )
    }
}

/// Hive's `ObjectInspectorUtils.hashCode`.
struct HiveHash;

impl HiveHash {
    fn fold_long(v: i64) -> i32 {
        (v ^ ((v as u64) >> 32) as i64) as i32
    }

    fn hash_bytes(init: i32, v: &[u8]) -> i32 {
        v.iter()
            .fold(init, |h, b| h.wrapping_mul(31).wrapping_add(*b as i8 as i32))
    }
}

impl HashFunction for HiveHash {
    fn hash_bool(v: bool) -> Result<i32> {
        Ok(v as i32)
    }

    fn hash_int(v: i32) -> Result<i32> {
        Ok(v)
    }

    fn hash_long(v: i64) -> Result<i32> {
        Ok(Self::fold_long(v))
    }

    fn hash_float(v: f32) -> Result<i32> {
        let bits = if v.is_nan() { 0x7fc0_0000 } else { v.to_bits() };
        Ok(bits as i32)
    }

    fn hash_double(v: f64) -> Result<i32> {
        let bits = if v.is_nan() {
            0x7ff8_0000_0000_0000
        } else {
            v.to_bits()
        };
        Ok(Self::fold_long(bits as i64))
    }

    /// Same as java `String.hashCode` for ascii strings.
    fn hash_str(v: &str) -> Result<i32> {
        Ok(Self::hash_bytes(0, v.as_bytes()))
    }

    /// `BytesWritable.hashCode`, which starts from 1.
    fn hash_binary(v: &[u8]) -> Result<i32> {
        Ok(Self::hash_bytes(1, v))
    }

    fn hash_timestamp(seconds: i64, nanos: u32) -> Result<i32> {
        let bits = (seconds << 30) | nanos as i64;
        Ok(Self::fold_long(bits))
    }
}

fn combine(acc: i32, hash: i32) -> i32 {
    acc.wrapping_mul(31).wrapping_add(hash)
}

fn bucket_n(hash: i32, bucket_count: u32) -> u32 {
    (hash & i32::MAX) as u32 % bucket_count
}

/// Bucket of a single row, given the values of its bucket columns in
/// bucketing order.
pub fn bucket_for(values: &[Datum], bucket_count: u32, kind: BucketKind) -> Result<u32> {
    ensure_valid!(bucket_count > 0, "bucket count can't be zero");
    let mut hash = 0;
    for value in values {
        let h = match kind {
            BucketKind::NativeHash => NativeHash::hash_datum(value)?,
            BucketKind::HiveCompatible => HiveHash::hash_datum(value)?,
        };
        hash = combine(hash, h);
    }
    Ok(bucket_n(hash, bucket_count))
}

/// Assigns rows to buckets, one column batch at a time.
///
/// For every row the result equals [`bucket_for`] applied to that row's
/// values.
#[derive(Debug, Clone, Copy)]
pub struct BucketFunction {
    kind: BucketKind,
    bucket_count: u32,
}

impl BucketFunction {
    /// Creates a bucket function. `bucket_count` must be positive.
    pub fn try_new(kind: BucketKind, bucket_count: u32) -> Result<Self> {
        ensure_valid!(bucket_count > 0, "bucket count can't be zero");
        Ok(Self { kind, bucket_count })
    }

    /// Number of buckets.
    pub fn bucket_count(&self) -> u32 {
        self.bucket_count
    }

    /// Buckets of all rows. `columns` are the bucket columns in bucketing
    /// order and must all have the same length.
    pub fn bucket_ids(&self, columns: &[ArrayRef]) -> Result<Vec<u32>> {
        let Some(first) = columns.first() else {
            return Err(Error::new(
                ErrorKind::DataInvalid,
                "at least one bucket column is required",
            ));
        };
        let mut hashes = vec![0i32; first.len()];
        for column in columns {
            if column.len() != hashes.len() {
                return Err(Error::new(
                    ErrorKind::DataInvalid,
                    "bucket columns have different lengths",
                ));
            }
            let column_hashes = match self.kind {
                BucketKind::NativeHash => NativeHash::hash_column(column.as_ref())?,
                BucketKind::HiveCompatible => HiveHash::hash_column(column.as_ref())?,
            };
            hashes
                .iter_mut()
                .zip(column_hashes)
                .for_each(|(acc, h)| *acc = combine(*acc, h));
        }
        Ok(hashes
            .into_iter()
            .map(|h| bucket_n(h, self.bucket_count))
            .collect())
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use arrow_array::{
        BinaryArray, BooleanArray, Date32Array, Float64Array, Int32Array, Int64Array,
        StringArray, TimestampMicrosecondArray, TimestampNanosecondArray,
    };
    use chrono::NaiveDate;

    use super::*;

    #[test]
    fn test_native_hash() {
        // test int
        assert_eq!(NativeHash::hash_int(34).unwrap(), 2017239379);
        // test long
        assert_eq!(NativeHash::hash_long(34).unwrap(), 2017239379);
        // test date
        let date = NaiveDate::from_ymd_opt(2017, 11, 16).unwrap();
        assert_eq!(
            NativeHash::hash_date(
                date.signed_duration_since(NaiveDate::from_ymd_opt(1970, 1, 1).unwrap())
                    .num_days() as i32
            )
            .unwrap(),
            -653330422
        );
        // test timestamp, 2017-11-16 22:31:08
        assert_eq!(
            NativeHash::hash_timestamp(1_510_871_468, 0).unwrap(),
            -2047944441
        );
        // test str
        assert_eq!(NativeHash::hash_str("iceberg").unwrap(), 1210000089);
        // test binary
        assert_eq!(
            NativeHash::hash_binary([0x00, 0x01, 0x02, 0x03].as_ref()).unwrap(),
            -188683207
        );
    }

    #[test]
    fn test_hive_hash() {
        assert_eq!(HiveHash::hash_bool(true).unwrap(), 1);
        assert_eq!(HiveHash::hash_bool(false).unwrap(), 0);
        assert_eq!(HiveHash::hash_int(-5).unwrap(), -5);
        assert_eq!(HiveHash::hash_long(34).unwrap(), 34);
        assert_eq!(HiveHash::hash_long(-1).unwrap(), 0);
        assert_eq!(HiveHash::hash_long(1 << 40).unwrap(), 256);
        assert_eq!(HiveHash::hash_float(1.0).unwrap(), 1065353216);
        assert_eq!(HiveHash::hash_double(1.0).unwrap(), 1072693248);
        assert_eq!(
            HiveHash::hash_float(f32::NAN).unwrap(),
            HiveHash::hash_float(-f32::NAN).unwrap()
        );
        assert_eq!(HiveHash::hash_str("iceberg").unwrap(), 1629187779);
        assert_eq!(
            HiveHash::hash_binary([0x00, 0x01, 0x02, 0x03].as_ref()).unwrap(),
            924547
        );
        assert_eq!(HiveHash::hash_date(17486).unwrap(), 17486);
        assert_eq!(
            HiveHash::hash_timestamp(1_510_871_468, 0).unwrap(),
            377717867
        );
        assert_eq!(HiveHash::hash_datum(&Datum::Null).unwrap(), 0);
    }

    #[test]
    fn test_bucket_for() {
        let kind = BucketKind::HiveCompatible;
        assert_eq!(bucket_for(&[Datum::Integer(5)], 4, kind).unwrap(), 1);
        assert_eq!(bucket_for(&[Datum::Integer(-1)], 4, kind).unwrap(), 3);
        assert_eq!(bucket_for(&[Datum::Null], 4, kind).unwrap(), 0);
        assert_eq!(
            bucket_for(&[Datum::Varchar("iceberg".to_string())], 16, kind).unwrap(),
            3
        );
        // 31 * 1 + 97
        assert_eq!(
            bucket_for(
                &[Datum::Integer(1), Datum::Varchar("a".to_string())],
                4,
                kind
            )
            .unwrap(),
            0
        );

        for kind in [BucketKind::NativeHash, BucketKind::HiveCompatible] {
            for v in -100..100 {
                let bucket = bucket_for(&[Datum::BigInt(v)], 7, kind).unwrap();
                assert!(bucket < 7);
            }
        }

        assert_eq!(
            bucket_for(&[Datum::Integer(1)], 0, kind)
                .unwrap_err()
                .kind(),
            ErrorKind::ValidationError
        );
    }

    #[test]
    fn test_bucket_ids_match_row_wise_buckets() {
        let columns: Vec<ArrayRef> = vec![
            Arc::new(Int32Array::from(vec![Some(1), None, Some(-7), Some(42)])),
            Arc::new(StringArray::from(vec![Some("a"), Some("b"), None, Some("iceberg")])),
            Arc::new(Int64Array::from(vec![1 << 40, -1, 0, i64::MAX])),
            Arc::new(BooleanArray::from(vec![true, false, true, false])),
            Arc::new(Float64Array::from(vec![1.0, f64::NAN, -0.5, 3.25])),
            Arc::new(BinaryArray::from_vec(vec![
                &b"x"[..],
                &b""[..],
                &b"yz"[..],
                &b"\xff"[..],
            ])),
            Arc::new(Date32Array::from(vec![17486, -1, 0, 365])),
            Arc::new(TimestampMicrosecondArray::from(vec![
                -1_500_000,
                0,
                1_510_871_468_000_000,
                1,
            ])),
        ];

        for kind in [BucketKind::NativeHash, BucketKind::HiveCompatible] {
            let function = BucketFunction::try_new(kind, 13).unwrap();
            let ids = function.bucket_ids(&columns).unwrap();
            assert_eq!(ids.len(), 4);
            for (row, id) in ids.iter().enumerate() {
                let values = columns
                    .iter()
                    .map(|c| Datum::from_array(c.as_ref(), row).unwrap())
                    .collect::<Vec<_>>();
                assert_eq!(*id, bucket_for(&values, 13, kind).unwrap());
            }
        }
    }

    #[test]
    fn test_timestamp_unit_does_not_change_bucket() {
        let micros: ArrayRef = Arc::new(TimestampMicrosecondArray::from(vec![1_510_871_468_000_000]));
        let nanos: ArrayRef = Arc::new(TimestampNanosecondArray::from(vec![
            1_510_871_468_000_000_000,
        ]));
        let function = BucketFunction::try_new(BucketKind::HiveCompatible, 32).unwrap();
        assert_eq!(
            function.bucket_ids(&[micros]).unwrap(),
            function.bucket_ids(&[nanos]).unwrap()
        );
    }

    #[test]
    fn test_unsupported_type() {
        let decimals: ArrayRef = Arc::new(
            arrow_array::Decimal128Array::from(vec![1420])
                .with_precision_and_scale(9, 2)
                .unwrap(),
        );
        let function = BucketFunction::try_new(BucketKind::NativeHash, 4).unwrap();
        assert_eq!(
            function.bucket_ids(&[decimals]).unwrap_err().kind(),
            ErrorKind::FeatureUnsupported
        );
    }
}
