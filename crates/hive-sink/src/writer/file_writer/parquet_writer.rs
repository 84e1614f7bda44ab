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

//! The module contains the file writer for parquet file format.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use arrow_array::RecordBatch;
use arrow_schema::SchemaRef as ArrowSchemaRef;
use bytes::Bytes;
use futures::future::BoxFuture;
use parquet::arrow::async_writer::AsyncFileWriter;
use parquet::arrow::AsyncArrowWriter;
use parquet::errors::ParquetError;
use parquet::file::properties::WriterProperties;

use super::location_generator::{FileNameGenerator, LocationGenerator};
use super::track_writer::TrackWriter;
use super::{FileWriter, FileWriterBuilder, WrittenFile};
use crate::io::{FileIO, FileWrite, OutputFile};
use crate::writer::partitioning::UnitKey;
use crate::writer::CurrentFileStatus;
use crate::{Error, ErrorKind, Result};

/// ParquetWriterBuilder is used to builder a [`ParquetWriter`]
#[derive(Clone)]
pub struct ParquetWriterBuilder<T: LocationGenerator, F: FileNameGenerator> {
    props: WriterProperties,
    schema: ArrowSchemaRef,

    file_io: FileIO,
    location_generator: T,
    file_name_generator: F,
}

impl<T: LocationGenerator, F: FileNameGenerator> ParquetWriterBuilder<T, F> {
    /// Create a new `ParquetWriterBuilder`.
    ///
    /// `schema` is the schema of the written files, which doesn't contain
    /// partition columns.
    pub fn new(
        props: WriterProperties,
        schema: ArrowSchemaRef,
        file_io: FileIO,
        location_generator: T,
        file_name_generator: F,
    ) -> Self {
        Self {
            props,
            schema,
            file_io,
            location_generator,
            file_name_generator,
        }
    }
}

#[async_trait::async_trait]
impl<T: LocationGenerator, F: FileNameGenerator> FileWriterBuilder for ParquetWriterBuilder<T, F> {
    type R = ParquetWriter;

    async fn build(&self, key: &UnitKey) -> Result<Self::R> {
        let file_name = self.file_name_generator.generate_file_name(key);
        let location = self.location_generator.generate_location(key, &file_name);

        let written_size = Arc::new(AtomicU64::new(0));
        let out_file = self.file_io.new_output(&location.write_path)?;
        let inner_writer = TrackWriter::new(out_file.writer().await?, written_size.clone());
        let writer = AsyncArrowWriter::try_new(
            AsyncFileWriterAdapter::new(inner_writer),
            self.schema.clone(),
            Some(self.props.clone()),
        )
        .map_err(|err| {
            Error::new(ErrorKind::WriteFailure, "Failed to build parquet writer.")
                .with_context("path", location.write_path.clone())
                .with_source(err)
        })?;

        Ok(ParquetWriter {
            writer,
            written_size,
            current_row_num: 0,
            out_file,
            target_path: location.target_path,
        })
    }
}

/// `ParquetWriter`` is used to write arrow data into parquet file on storage.
pub struct ParquetWriter {
    out_file: OutputFile,
    target_path: String,
    writer: AsyncArrowWriter<AsyncFileWriterAdapter<TrackWriter>>,
    written_size: Arc<AtomicU64>,
    current_row_num: usize,
}

#[async_trait::async_trait]
impl FileWriter for ParquetWriter {
    async fn write(&mut self, batch: &RecordBatch) -> Result<()> {
        self.writer.write(batch).await.map_err(|err| {
            Error::new(
                ErrorKind::WriteFailure,
                "Failed to write using parquet writer.",
            )
            .with_context("path", self.out_file.location())
            .with_source(err)
        })?;
        self.current_row_num += batch.num_rows();
        Ok(())
    }

    async fn close(self) -> Result<WrittenFile> {
        let metadata = self.writer.close().await.map_err(|err| {
            Error::new(ErrorKind::WriteFailure, "Failed to close parquet writer.")
                .with_context("path", self.out_file.location())
                .with_source(err)
        })?;

        Ok(WrittenFile {
            file_path: self.out_file.location().to_string(),
            target_path: self.target_path,
            row_count: metadata.num_rows as u64,
            file_size_in_bytes: self.written_size.load(Ordering::Relaxed),
        })
    }

    async fn abort(self) -> Result<()> {
        // Encoded row groups may already be on storage.
        drop(self.writer);
        self.out_file.delete().await
    }
}

impl CurrentFileStatus for ParquetWriter {
    fn current_file_path(&self) -> String {
        self.out_file.location().to_string()
    }

    fn current_row_num(&self) -> usize {
        self.current_row_num
    }

    fn current_written_size(&self) -> usize {
        self.written_size.load(Ordering::Relaxed) as usize
    }
}

/// Lets the parquet encoder write through a [`FileWrite`].
struct AsyncFileWriterAdapter<W: FileWrite> {
    inner: W,
}

impl<W: FileWrite> AsyncFileWriterAdapter<W> {
    fn new(inner: W) -> Self {
        Self { inner }
    }
}

impl<W: FileWrite> AsyncFileWriter for AsyncFileWriterAdapter<W> {
    fn write(&mut self, bs: Bytes) -> BoxFuture<'_, parquet::errors::Result<()>> {
        Box::pin(async {
            self.inner
                .write(bs)
                .await
                .map_err(|err| ParquetError::External(Box::new(err)))
        })
    }

    fn complete(&mut self) -> BoxFuture<'_, parquet::errors::Result<()>> {
        Box::pin(async {
            self.inner
                .close()
                .await
                .map_err(|err| ParquetError::External(Box::new(err)))
        })
    }
}
