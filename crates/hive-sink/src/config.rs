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

use std::collections::HashMap;
use std::fmt::Display;
use std::str::FromStr;

use parquet::file::properties::WriterProperties;

use crate::error::{Error, ErrorKind, Result};
use crate::spec::CompressionKind;

// Helper function to parse a property from a HashMap
// If the property is not found, use the default value
fn parse_property<T: FromStr>(
    properties: &HashMap<String, String>,
    key: &str,
    default: T,
) -> Result<T>
where
    <T as FromStr>::Err: Display,
{
    properties.get(key).map_or(Ok(default), |value| {
        value.parse::<T>().map_err(|e| {
            Error::new(
                ErrorKind::DataInvalid,
                format!("Invalid value for {key}: {e}"),
            )
        })
    })
}

/// SinkProperties that contains the writer settings of a hive data sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkProperties {
    /// The maximum number of distinct output units a single sink may open.
    pub max_partitions_per_writer: usize,
    /// The maximum number of rows in a parquet row group.
    pub parquet_max_row_group_rows: usize,
    /// The target size of a parquet data page.
    pub parquet_data_page_size_bytes: usize,
    /// Prefix of the names of unbucketed files.
    pub file_name_prefix: String,
}

impl SinkProperties {
    /// Maximum number of partitions and buckets one writer may open.
    pub const PROPERTY_MAX_PARTITIONS_PER_WRITER: &str = "hive.max-partitions-per-writers";
    /// Default value for max partitions per writer.
    pub const PROPERTY_MAX_PARTITIONS_PER_WRITER_DEFAULT: usize = 100;

    /// Maximum number of rows in a parquet row group.
    pub const PROPERTY_PARQUET_MAX_ROW_GROUP_ROWS: &str = "hive.parquet.writer.max-row-group-rows";
    /// Default value for parquet row group rows.
    pub const PROPERTY_PARQUET_MAX_ROW_GROUP_ROWS_DEFAULT: usize = 1024 * 1024;

    /// Target size of a parquet data page.
    pub const PROPERTY_PARQUET_DATA_PAGE_SIZE_BYTES: &str =
        "hive.parquet.writer.data-page-size-bytes";
    /// Default value for parquet data page size.
    pub const PROPERTY_PARQUET_DATA_PAGE_SIZE_BYTES_DEFAULT: usize = 1024 * 1024;

    /// Prefix of unbucketed file names.
    pub const PROPERTY_FILE_NAME_PREFIX: &str = "hive.file-name-prefix";
    /// Default value for the file name prefix.
    pub const PROPERTY_FILE_NAME_PREFIX_DEFAULT: &str = "data";

    /// Parquet writer properties for files compressed with `compression`.
    pub(crate) fn parquet_writer_properties(
        &self,
        compression: CompressionKind,
    ) -> Result<WriterProperties> {
        Ok(WriterProperties::builder()
            .set_compression(compression.to_parquet()?)
            .set_max_row_group_size(self.parquet_max_row_group_rows)
            .set_data_page_size_limit(self.parquet_data_page_size_bytes)
            .build())
    }
}

impl Default for SinkProperties {
    fn default() -> Self {
        Self {
            max_partitions_per_writer: Self::PROPERTY_MAX_PARTITIONS_PER_WRITER_DEFAULT,
            parquet_max_row_group_rows: Self::PROPERTY_PARQUET_MAX_ROW_GROUP_ROWS_DEFAULT,
            parquet_data_page_size_bytes: Self::PROPERTY_PARQUET_DATA_PAGE_SIZE_BYTES_DEFAULT,
            file_name_prefix: Self::PROPERTY_FILE_NAME_PREFIX_DEFAULT.to_string(),
        }
    }
}

impl TryFrom<&HashMap<String, String>> for SinkProperties {
    // parse by entry key or use default value
    type Error = Error;

    fn try_from(props: &HashMap<String, String>) -> Result<Self> {
        let properties = SinkProperties {
            max_partitions_per_writer: parse_property(
                props,
                SinkProperties::PROPERTY_MAX_PARTITIONS_PER_WRITER,
                SinkProperties::PROPERTY_MAX_PARTITIONS_PER_WRITER_DEFAULT,
            )?,
            parquet_max_row_group_rows: parse_property(
                props,
                SinkProperties::PROPERTY_PARQUET_MAX_ROW_GROUP_ROWS,
                SinkProperties::PROPERTY_PARQUET_MAX_ROW_GROUP_ROWS_DEFAULT,
            )?,
            parquet_data_page_size_bytes: parse_property(
                props,
                SinkProperties::PROPERTY_PARQUET_DATA_PAGE_SIZE_BYTES,
                SinkProperties::PROPERTY_PARQUET_DATA_PAGE_SIZE_BYTES_DEFAULT,
            )?,
            file_name_prefix: parse_property(
                props,
                SinkProperties::PROPERTY_FILE_NAME_PREFIX,
                SinkProperties::PROPERTY_FILE_NAME_PREFIX_DEFAULT.to_string(),
            )?,
        };

        if properties.parquet_max_row_group_rows == 0 {
            return Err(Error::new(
                ErrorKind::DataInvalid,
                format!(
                    "Invalid value for {}: must be positive",
                    SinkProperties::PROPERTY_PARQUET_MAX_ROW_GROUP_ROWS
                ),
            ));
        }
        Ok(properties)
    }
}
