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

//! Storage formats and compression kinds of written files.

use std::fmt::{Display, Formatter};

use parquet::basic::{Compression, ZstdLevel};
use serde_derive::{Deserialize, Serialize};

use crate::{Error, ErrorKind, Result};

/// File format of a hive table.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    /// Apache Parquet.
    #[default]
    Parquet,
    /// Apache ORC.
    Orc,
    /// DWRF, the ORC fork.
    Dwrf,
}

impl FileFormat {
    /// File name extension, without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            FileFormat::Parquet => "parquet",
            FileFormat::Orc => "orc",
            FileFormat::Dwrf => "dwrf",
        }
    }

    /// Whether this crate can encode files of this format.
    pub fn is_writable(&self) -> bool {
        matches!(self, FileFormat::Parquet)
    }
}

impl Display for FileFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.extension())
    }
}

/// Data compression formats
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionKind {
    /// No compression
    None,
    /// Snappy
    Snappy,
    /// Gzip compression
    Gzip,
    /// LZ4 raw blocks
    Lz4,
    /// Zstandard, default level
    #[default]
    Zstd,
}

impl CompressionKind {
    /// Parquet codec for this compression kind.
    pub(crate) fn to_parquet(self) -> Result<Compression> {
        let compression = match self {
            CompressionKind::None => Compression::UNCOMPRESSED,
            CompressionKind::Snappy => Compression::SNAPPY,
            CompressionKind::Gzip => Compression::GZIP(Default::default()),
            CompressionKind::Lz4 => Compression::LZ4_RAW,
            CompressionKind::Zstd => Compression::ZSTD(ZstdLevel::try_new(3).map_err(|e| {
                Error::new(ErrorKind::Unexpected, "Invalid zstd level").with_source(e)
            })?),
        };
        Ok(compression)
    }
}
