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

//! Write path of hive tables.
//!
//! A [`DataSink`] accepts arrow record batches of one writer task and writes
//! them as parquet files laid out the way hive expects: one directory per
//! partition, one file per bucket, rows sorted inside buckets when the table
//! asks for it. Bucket assignment can be made bit-for-bit compatible with
//! hive.
//!
//! # Examples
//!
//! ## Write A Bucketed Table
//!
//! ```rust, no_run
//! use std::sync::Arc;
//!
//! use arrow_array::{ArrayRef, Int64Array, RecordBatch, StringArray};
//! use arrow_schema::{DataType, Field, Schema};
//! use hive_sink::io::FileIO;
//! use hive_sink::spec::{
//!     BucketKind, BucketingSpec, CommitStrategy, InsertTableHandle, LocationHandle,
//!     PrimitiveType, SortSpec,
//! };
//! use hive_sink::{DataSink, Result, SinkProperties};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let schema = Arc::new(Schema::new(vec![
//!         Field::new("id", DataType::Int64, false),
//!         Field::new("name", DataType::Utf8, true),
//!     ]));
//!     let bucketing = BucketingSpec::try_new(
//!         BucketKind::HiveCompatible,
//!         8,
//!         vec!["id".to_string()],
//!         vec![PrimitiveType::BigInt],
//!         vec![SortSpec::asc("name")?],
//!     )?;
//!     let handle = InsertTableHandle::builder()
//!         .schema(schema.clone())
//!         .bucketing(bucketing)
//!         .location(LocationHandle::new("/warehouse/db/t"))
//!         .build();
//!
//!     let mut sink = DataSink::try_new(
//!         handle,
//!         FileIO::new_with_fs(),
//!         CommitStrategy::NoCommit,
//!         SinkProperties::default(),
//!     )?;
//!     let columns: Vec<ArrayRef> = vec![
//!         Arc::new(Int64Array::from(vec![1, 2, 3])),
//!         Arc::new(StringArray::from(vec!["a", "b", "c"])),
//!     ];
//!     sink.append_data(&RecordBatch::try_new(schema, columns)?)
//!         .await?;
//!
//!     // One descriptor per written bucket file.
//!     for file in sink.close(true).await? {
//!         println!("{} rows in {}", file.row_count, file.target_path);
//!     }
//!     Ok(())
//! }
//! ```

#![deny(missing_docs)]

mod error;
pub use error::{Error, ErrorKind, Result};

mod config;
pub use config::SinkProperties;

pub mod io;
pub mod spec;
pub mod transform;
pub mod writer;

mod sink;
pub use sink::{CommitDescriptor, DataSink, HiveParquetWriterBuilder, SinkStateKind};
