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

//! File writers, which encode record batches of one output unit into one
//! file of a physical format.

use arrow_array::RecordBatch;

use super::partitioning::UnitKey;
use super::CurrentFileStatus;
use crate::Result;

mod parquet_writer;
pub use parquet_writer::{ParquetWriter, ParquetWriterBuilder};
mod track_writer;

pub mod location_generator;

/// File writer builder trait.
#[async_trait::async_trait]
pub trait FileWriterBuilder: Send + Sync + Clone + 'static {
    /// The associated file writer type.
    type R: FileWriter;
    /// Build the file writer of output unit `key`.
    async fn build(&self, key: &UnitKey) -> Result<Self::R>;
}

/// File writer focus on writing record batch to different physical file format.(Such as parquet. orc)
#[async_trait::async_trait]
pub trait FileWriter: Send + 'static + CurrentFileStatus {
    /// Write record batch to file.
    async fn write(&mut self, batch: &RecordBatch) -> Result<()>;
    /// Flush buffered data, finalize the file and report what was written.
    async fn close(self) -> Result<WrittenFile>;
    /// Drop buffered data and remove whatever was already written.
    async fn abort(self) -> Result<()>;
}

/// A finalized file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenFile {
    /// Where the bytes were written.
    pub file_path: String,
    /// Where the file lives once the write commits.
    pub target_path: String,
    /// Number of rows in the file.
    pub row_count: u64,
    /// Size of the file.
    pub file_size_in_bytes: u64,
}
