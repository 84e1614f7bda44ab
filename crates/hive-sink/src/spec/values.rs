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

//! Scalar values of bucket and partition columns.

use std::fmt::{Display, UpperExp};

use arrow_array::cast::AsArray;
use arrow_array::types::{
    Date32Type, Float32Type, Float64Type, Int16Type, Int32Type, Int64Type, Int8Type,
    TimestampMicrosecondType, TimestampMillisecondType, TimestampNanosecondType,
    TimestampSecondType,
};
use arrow_array::Array;
use arrow_schema::{DataType, TimeUnit};
use chrono::{DateTime, NaiveDate};

use crate::{Error, ErrorKind, Result};

const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;
const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// A single, possibly null, value of a [`PrimitiveType`](super::PrimitiveType).
#[derive(Debug, Clone, PartialEq)]
pub enum Datum {
    /// Absent value of any type.
    Null,
    /// Boolean value.
    Boolean(bool),
    /// 8-bit integer value.
    TinyInt(i8),
    /// 16-bit integer value.
    SmallInt(i16),
    /// 32-bit integer value.
    Integer(i32),
    /// 64-bit integer value.
    BigInt(i64),
    /// 32-bit float value.
    Real(f32),
    /// 64-bit float value.
    Double(f64),
    /// Utf-8 string value.
    Varchar(String),
    /// Binary value.
    Varbinary(Vec<u8>),
    /// Days since unix epoch.
    Date(i32),
    /// Instant since unix epoch, `nanos` is always in `[0, 1e9)`.
    Timestamp {
        /// Whole seconds, rounded towards negative infinity.
        seconds: i64,
        /// Nanoseconds within the second.
        nanos: u32,
    },
}

impl Datum {
    /// Creates a timestamp from a count of `unit`s since unix epoch.
    pub fn timestamp(value: i64, unit: TimeUnit) -> Self {
        let (seconds, nanos) = split_timestamp(value, unit);
        Datum::Timestamp { seconds, nanos }
    }

    /// Reads the value at `row` of an arrow array.
    pub fn from_array(array: &dyn Array, row: usize) -> Result<Self> {
        if array.is_null(row) {
            return Ok(Datum::Null);
        }
        let datum = match array.data_type() {
            DataType::Boolean => Datum::Boolean(array.as_boolean().value(row)),
            DataType::Int8 => Datum::TinyInt(array.as_primitive::<Int8Type>().value(row)),
            DataType::Int16 => Datum::SmallInt(array.as_primitive::<Int16Type>().value(row)),
            DataType::Int32 => Datum::Integer(array.as_primitive::<Int32Type>().value(row)),
            DataType::Int64 => Datum::BigInt(array.as_primitive::<Int64Type>().value(row)),
            DataType::Float32 => Datum::Real(array.as_primitive::<Float32Type>().value(row)),
            DataType::Float64 => Datum::Double(array.as_primitive::<Float64Type>().value(row)),
            DataType::Utf8 => Datum::Varchar(array.as_string::<i32>().value(row).to_string()),
            DataType::LargeUtf8 => {
                Datum::Varchar(array.as_string::<i64>().value(row).to_string())
            }
            DataType::Binary => Datum::Varbinary(array.as_binary::<i32>().value(row).to_vec()),
            DataType::LargeBinary => {
                Datum::Varbinary(array.as_binary::<i64>().value(row).to_vec())
            }
            DataType::Date32 => Datum::Date(array.as_primitive::<Date32Type>().value(row)),
            DataType::Timestamp(unit, _) => {
                let value = match unit {
                    TimeUnit::Second => array.as_primitive::<TimestampSecondType>().value(row),
                    TimeUnit::Millisecond => {
                        array.as_primitive::<TimestampMillisecondType>().value(row)
                    }
                    TimeUnit::Microsecond => {
                        array.as_primitive::<TimestampMicrosecondType>().value(row)
                    }
                    TimeUnit::Nanosecond => {
                        array.as_primitive::<TimestampNanosecondType>().value(row)
                    }
                };
                Datum::timestamp(value, *unit)
            }
            other => {
                return Err(Error::new(
                    ErrorKind::FeatureUnsupported,
                    format!("Unsupported arrow data type: {other}"),
                ));
            }
        };
        Ok(datum)
    }

    /// Renders the value the way it appears in a hive partition directory
    /// name, before escaping. `None` for null.
    pub fn to_partition_string(&self) -> Result<Option<String>> {
        let value = match self {
            Datum::Null => return Ok(None),
            Datum::Boolean(v) => v.to_string(),
            Datum::TinyInt(v) => v.to_string(),
            Datum::SmallInt(v) => v.to_string(),
            Datum::Integer(v) => v.to_string(),
            Datum::BigInt(v) => v.to_string(),
            Datum::Real(v) => java_float_string(v, *v as f64),
            Datum::Double(v) => java_float_string(v, *v),
            Datum::Varchar(v) => v.clone(),
            Datum::Date(days) => days
                .checked_add(UNIX_EPOCH_DAYS_FROM_CE)
                .and_then(NaiveDate::from_num_days_from_ce_opt)
                .ok_or_else(|| {
                    Error::new(ErrorKind::DataInvalid, format!("Invalid date value: {days}"))
                })?
                .format("%Y-%m-%d")
                .to_string(),
            Datum::Timestamp { seconds, nanos } => DateTime::from_timestamp(*seconds, *nanos)
                .ok_or_else(|| {
                    Error::new(
                        ErrorKind::DataInvalid,
                        format!("Invalid timestamp value: {seconds}s {nanos}ns"),
                    )
                })?
                .naive_utc()
                .format("%Y-%m-%d %H:%M:%S%.f")
                .to_string(),
            Datum::Varbinary(_) => {
                return Err(Error::new(
                    ErrorKind::FeatureUnsupported,
                    "Binary values can't be used as partition values",
                ));
            }
        };
        Ok(Some(value))
    }
}

/// Formats a float the way java's `Double.toString` and `Float.toString`
/// do: plain notation in `[1e-3, 1e7)`, `d.dddEn` outside it, and always at
/// least one fractional digit.
fn java_float_string<T: Display + UpperExp>(value: T, magnitude: f64) -> String {
    if magnitude.is_nan() {
        return "NaN".to_string();
    }
    if magnitude.is_infinite() {
        return if magnitude > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    let abs = magnitude.abs();
    let text = if abs == 0.0 || (1e-3..1e7).contains(&abs) {
        format!("{value}")
    } else {
        format!("{value:E}")
    };
    let (mantissa, exponent) = text.split_at(text.find('E').unwrap_or(text.len()));
    if mantissa.contains('.') {
        text
    } else {
        format!("{mantissa}.0{exponent}")
    }
}

/// Splits a count of `unit`s since epoch into whole seconds and the
/// non-negative nanosecond remainder.
pub(crate) fn split_timestamp(value: i64, unit: TimeUnit) -> (i64, u32) {
    let per_second = match unit {
        TimeUnit::Second => 1,
        TimeUnit::Millisecond => 1_000,
        TimeUnit::Microsecond => 1_000_000,
        TimeUnit::Nanosecond => NANOS_PER_SECOND,
    };
    let nanos = value.rem_euclid(per_second) * (NANOS_PER_SECOND / per_second);
    (value.div_euclid(per_second), nanos as u32)
}
