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

//! Hive writer module.
//!
//! Writing a batch into a hive table takes three steps, each with its own
//! building block:
//! 1. [`partitioning::Partitioner`] splits a batch into the rows of each
//!    output unit, identified by a [`partitioning::UnitKey`] made of the hive
//!    partition path and the bucket.
//! 2. [`registry::OutputUnitRegistry`] owns one output unit per key, creating
//!    it lazily, and buffers rows of sorted units.
//! 3. A [`file_writer::FileWriter`] encodes the rows of one unit into a file
//!    (Such as parquet).
//!
//! [`crate::DataSink`] glues them together.
//!
//! # Example of writing one bucket file:
//! ```rust, no_run
//! use std::sync::Arc;
//!
//! use arrow_array::{ArrayRef, Int32Array, RecordBatch};
//! use arrow_schema::{DataType, Field, Schema};
//! use hive_sink::io::FileIO;
//! use hive_sink::spec::{CommitStrategy, FileFormat, LocationHandle};
//! use hive_sink::writer::file_writer::location_generator::{
//!     HiveFileNameGenerator, HiveLocationGenerator,
//! };
//! use hive_sink::writer::file_writer::{FileWriter, FileWriterBuilder, ParquetWriterBuilder};
//! use hive_sink::writer::partitioning::UnitKey;
//! use hive_sink::Result;
//! use parquet::file::properties::WriterProperties;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let file_io = FileIO::new_with_fs();
//!     let schema = Arc::new(Schema::new(vec![Field::new("a", DataType::Int32, true)]));
//!     let builder = ParquetWriterBuilder::new(
//!         WriterProperties::default(),
//!         schema.clone(),
//!         file_io,
//!         HiveLocationGenerator::new(LocationHandle::new("/tmp/t"), CommitStrategy::NoCommit),
//!         HiveFileNameGenerator::new("data".to_string(), "q".to_string(), FileFormat::Parquet),
//!     );
//!
//!     let mut writer = builder.build(&UnitKey::new(None, Some(0))).await?;
//!     let column: ArrayRef = Arc::new(Int32Array::from(vec![1, 2, 3]));
//!     writer
//!         .write(&RecordBatch::try_new(schema, vec![column])?)
//!         .await?;
//!     let written = writer.close().await?;
//!     println!("{written:?}");
//!     Ok(())
//! }
//! ```

pub mod file_writer;
pub mod partitioning;
pub mod registry;

/// The current file status of a writer.
/// This is implemented for writers that write a single file at a time.
pub trait CurrentFileStatus {
    /// Get the current file path.
    fn current_file_path(&self) -> String;
    /// Get the current file row number.
    fn current_row_num(&self) -> usize;
    /// Get the current file written size.
    fn current_written_size(&self) -> usize;
}
