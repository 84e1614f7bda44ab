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

/*!
 * Column types that can appear in bucketing metadata.
 */
use std::fmt::{Display, Formatter};

use arrow_schema::{DataType, TimeUnit};
use serde_derive::{Deserialize, Serialize};

use crate::{Error, ErrorKind, Result};

/// Primitive column types a bucketed table may be bucketed on.
///
/// The serialized form is the lower-case Hive type name, `Display` renders the
/// upper-case SQL name.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveType {
    /// True or False
    Boolean,
    /// 8-bit signed integer
    TinyInt,
    /// 16-bit signed integer
    SmallInt,
    /// 32-bit signed integer
    Integer,
    /// 64-bit signed integer
    BigInt,
    /// 32-bit IEEE 754 floating point.
    Real,
    /// 64-bit IEEE 754 floating point.
    Double,
    /// Arbitrary-length character sequences encoded in utf-8
    Varchar,
    /// Arbitrary-length byte array.
    Varbinary,
    /// Calendar date without timezone or time.
    Date,
    /// Timestamp, any precision.
    Timestamp,
}

impl PrimitiveType {
    /// The arrow type used to hold values of this type in memory.
    ///
    /// Timestamps are represented with nanosecond precision and no timezone;
    /// [`PrimitiveType::accepts`] is more lenient.
    pub fn to_arrow_type(&self) -> DataType {
        match self {
            PrimitiveType::Boolean => DataType::Boolean,
            PrimitiveType::TinyInt => DataType::Int8,
            PrimitiveType::SmallInt => DataType::Int16,
            PrimitiveType::Integer => DataType::Int32,
            PrimitiveType::BigInt => DataType::Int64,
            PrimitiveType::Real => DataType::Float32,
            PrimitiveType::Double => DataType::Float64,
            PrimitiveType::Varchar => DataType::Utf8,
            PrimitiveType::Varbinary => DataType::Binary,
            PrimitiveType::Date => DataType::Date32,
            PrimitiveType::Timestamp => DataType::Timestamp(TimeUnit::Nanosecond, None),
        }
    }

    /// Whether a column of the given arrow type can hold values of this type.
    pub fn accepts(&self, data_type: &DataType) -> bool {
        match (self, data_type) {
            (PrimitiveType::Varchar, DataType::Utf8 | DataType::LargeUtf8) => true,
            (PrimitiveType::Varbinary, DataType::Binary | DataType::LargeBinary) => true,
            (PrimitiveType::Timestamp, DataType::Timestamp(_, _)) => true,
            (t, data_type) => &t.to_arrow_type() == data_type,
        }
    }
}

impl TryFrom<&DataType> for PrimitiveType {
    type Error = Error;

    fn try_from(data_type: &DataType) -> Result<Self> {
        let t = match data_type {
            DataType::Boolean => PrimitiveType::Boolean,
            DataType::Int8 => PrimitiveType::TinyInt,
            DataType::Int16 => PrimitiveType::SmallInt,
            DataType::Int32 => PrimitiveType::Integer,
            DataType::Int64 => PrimitiveType::BigInt,
            DataType::Float32 => PrimitiveType::Real,
            DataType::Float64 => PrimitiveType::Double,
            DataType::Utf8 | DataType::LargeUtf8 => PrimitiveType::Varchar,
            DataType::Binary | DataType::LargeBinary => PrimitiveType::Varbinary,
            DataType::Date32 => PrimitiveType::Date,
            DataType::Timestamp(_, _) => PrimitiveType::Timestamp,
            other => {
                return Err(Error::new(
                    ErrorKind::FeatureUnsupported,
                    format!("Unsupported arrow data type for bucketing: {other}"),
                ));
            }
        };
        Ok(t)
    }
}

impl Display for PrimitiveType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PrimitiveType::Boolean => "BOOLEAN",
            PrimitiveType::TinyInt => "TINYINT",
            PrimitiveType::SmallInt => "SMALLINT",
            PrimitiveType::Integer => "INTEGER",
            PrimitiveType::BigInt => "BIGINT",
            PrimitiveType::Real => "REAL",
            PrimitiveType::Double => "DOUBLE",
            PrimitiveType::Varchar => "VARCHAR",
            PrimitiveType::Varbinary => "VARBINARY",
            PrimitiveType::Date => "DATE",
            PrimitiveType::Timestamp => "TIMESTAMP",
        };
        write!(f, "{name}")
    }
}
