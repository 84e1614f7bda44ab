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

//! The data sink: the write path of one writer task into a hive table.

use std::collections::HashSet;
use std::fmt::{Display, Formatter};

use arrow_array::RecordBatch;
use arrow_schema::SchemaRef as ArrowSchemaRef;
use serde_derive::{Deserialize, Serialize};

use crate::io::FileIO;
use crate::spec::{CommitStrategy, InsertTableHandle, PrimitiveType};
use crate::writer::file_writer::location_generator::{
    HiveFileNameGenerator, HiveLocationGenerator,
};
use crate::writer::file_writer::{FileWriterBuilder, ParquetWriterBuilder};
use crate::writer::partitioning::Partitioner;
use crate::writer::registry::OutputUnitRegistry;
use crate::{ensure_valid, Error, ErrorKind, Result, SinkProperties};

/// Writer builder used by [`DataSink::try_new`].
pub type HiveParquetWriterBuilder = ParquetWriterBuilder<HiveLocationGenerator, HiveFileNameGenerator>;

/// A file produced by a sink, to be registered with the table by the
/// coordinator of the write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitDescriptor {
    /// Where the bytes were written.
    pub file_path: String,
    /// Where the file lives once the write commits.
    pub target_path: String,
    /// Hive partition path of the file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partition: Option<String>,
    /// Bucket of the file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bucket_id: Option<u32>,
    /// Number of rows in the file.
    pub row_count: u64,
    /// Size of the file.
    pub file_size_in_bytes: u64,
}

#[derive(Debug)]
enum SinkState {
    Running,
    Closed(Vec<CommitDescriptor>),
    Aborted,
}

/// Lifecycle state of a [`DataSink`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkStateKind {
    /// Accepting data.
    Running,
    /// Committed, result cached.
    Closed,
    /// Discarded.
    Aborted,
}

impl Display for SinkStateKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SinkStateKind::Running => write!(f, "RUNNING"),
            SinkStateKind::Closed => write!(f, "CLOSED"),
            SinkStateKind::Aborted => write!(f, "ABORTED"),
        }
    }
}

/// Writes record batches into a hive table.
///
/// A sink starts `Running` and ends either `Closed`, after
/// [`DataSink::close`] with `commit = true`, or `Aborted`. Repeating the same
/// close is a no-op; the other one fails with
/// [`ErrorKind::InvalidTransition`].
///
/// ```rust, no_run
/// use std::sync::Arc;
///
/// use arrow_array::{ArrayRef, Int32Array, RecordBatch};
/// use arrow_schema::{DataType, Field, Schema};
/// use hive_sink::io::FileIO;
/// use hive_sink::spec::{CommitStrategy, InsertTableHandle, LocationHandle};
/// use hive_sink::{DataSink, Result, SinkProperties};
///
/// # async fn example() -> Result<()> {
/// let schema = Arc::new(Schema::new(vec![Field::new("a", DataType::Int32, true)]));
/// let handle = InsertTableHandle::builder()
///     .schema(schema.clone())
///     .location(LocationHandle::new("/warehouse/t"))
///     .build();
/// let mut sink = DataSink::try_new(
///     handle,
///     FileIO::new_with_fs(),
///     CommitStrategy::NoCommit,
///     SinkProperties::default(),
/// )?;
///
/// let column: ArrayRef = Arc::new(Int32Array::from(vec![1, 2, 3]));
/// sink.append_data(&RecordBatch::try_new(schema, vec![column])?)
///     .await?;
/// let files = sink.close(true).await?;
/// # Ok(())
/// # }
/// ```
pub struct DataSink<B: FileWriterBuilder = HiveParquetWriterBuilder> {
    schema: ArrowSchemaRef,
    partitioner: Partitioner,
    registry: OutputUnitRegistry<B>,
    state: SinkState,
    completed_bytes: u64,
}

impl DataSink {
    /// Creates a sink writing parquet files into the table of `handle`.
    pub fn try_new(
        handle: InsertTableHandle,
        file_io: FileIO,
        commit_strategy: CommitStrategy,
        properties: SinkProperties,
    ) -> Result<Self> {
        validate_handle(&handle)?;
        if !handle.file_format.is_writable() {
            return Err(Error::new(
                ErrorKind::FeatureUnsupported,
                format!("Writing {} files is not supported", handle.file_format),
            ));
        }

        let partitioner = Partitioner::try_new(
            &handle.schema,
            &handle.partitioned_by,
            handle.bucketing.as_ref(),
        )?;
        let writer_builder = ParquetWriterBuilder::new(
            properties.parquet_writer_properties(handle.compression)?,
            partitioner.data_schema().clone(),
            file_io.clone(),
            HiveLocationGenerator::new(handle.location.clone(), commit_strategy),
            HiveFileNameGenerator::new(
                properties.file_name_prefix.clone(),
                handle.query_id.clone(),
                handle.file_format,
            ),
        );
        Self::build(handle, partitioner, writer_builder, file_io, &properties)
    }
}

impl<B: FileWriterBuilder> DataSink<B> {
    /// Creates a sink writing files with `writer_builder`.
    ///
    /// The built writers receive batches without the partition columns of
    /// the table.
    pub fn try_new_with_writer_builder(
        handle: InsertTableHandle,
        writer_builder: B,
        file_io: FileIO,
        properties: SinkProperties,
    ) -> Result<Self> {
        validate_handle(&handle)?;
        let partitioner = Partitioner::try_new(
            &handle.schema,
            &handle.partitioned_by,
            handle.bucketing.as_ref(),
        )?;
        Self::build(handle, partitioner, writer_builder, file_io, &properties)
    }

    fn build(
        handle: InsertTableHandle,
        partitioner: Partitioner,
        writer_builder: B,
        file_io: FileIO,
        properties: &SinkProperties,
    ) -> Result<Self> {
        let data_schema = partitioner.data_schema();
        let sort_columns = handle
            .bucketing
            .as_ref()
            .map(|bucketing| bucketing.sorted_by())
            .unwrap_or_default()
            .iter()
            .map(|sort| -> Result<_> {
                Ok((data_schema.index_of(sort.column())?, sort.sort_options()))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            schema: handle.schema,
            registry: OutputUnitRegistry::new(
                writer_builder,
                file_io,
                sort_columns,
                properties.max_partitions_per_writer,
            ),
            partitioner,
            state: SinkState::Running,
            completed_bytes: 0,
        })
    }

    /// Schema of the accepted batches.
    pub fn schema(&self) -> &ArrowSchemaRef {
        &self.schema
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SinkStateKind {
        match self.state {
            SinkState::Running => SinkStateKind::Running,
            SinkState::Closed(_) => SinkStateKind::Closed,
            SinkState::Aborted => SinkStateKind::Aborted,
        }
    }

    /// In-memory size of the data accepted so far.
    pub fn completed_bytes(&self) -> u64 {
        self.completed_bytes
    }

    /// Number of open output units.
    pub fn num_output_units(&self) -> usize {
        self.registry.len()
    }

    /// Routes the rows of `batch` to their output units.
    ///
    /// A failed append leaves the sink running; rows of the batch may have
    /// reached some units already, so callers usually abort the sink.
    pub async fn append_data(&mut self, batch: &RecordBatch) -> Result<()> {
        match self.state {
            SinkState::Running => {}
            SinkState::Closed(_) => {
                return Err(Error::new(ErrorKind::InvalidState, "sink has been closed"));
            }
            SinkState::Aborted => {
                return Err(Error::new(ErrorKind::InvalidState, "sink has been aborted"));
            }
        }
        if batch.schema().fields() != self.schema.fields() {
            return Err(Error::new(
                ErrorKind::DataInvalid,
                "Record batch schema does not match the schema of the sink",
            )
            .with_context("expected", format!("{:?}", self.schema.fields()))
            .with_context("actual", format!("{:?}", batch.schema().fields())));
        }
        if batch.num_rows() == 0 {
            return Ok(());
        }

        let accepted_bytes = slice_memory_size(&self.partitioner.data_batch(batch)?)?;
        for (key, rows) in self.partitioner.partition(batch)? {
            self.registry.unit_for(&key).await?.write(rows).await?;
        }
        self.completed_bytes += accepted_bytes;
        Ok(())
    }

    /// Commits (`commit = true`) or aborts the sink.
    ///
    /// Committing finalizes every file and returns one descriptor per file;
    /// the result is cached and returned again by later commits. Aborting
    /// removes every file and returns an empty list. A failed commit leaves
    /// the sink aborted.
    pub async fn close(&mut self, commit: bool) -> Result<Vec<CommitDescriptor>> {
        if commit {
            match &self.state {
                SinkState::Running => {}
                SinkState::Closed(result) => return Ok(result.clone()),
                SinkState::Aborted => {
                    return Err(Error::new(
                        ErrorKind::InvalidTransition,
                        "can't close an aborted sink",
                    ));
                }
            }
            self.commit().await
        } else {
            match &self.state {
                SinkState::Running => {}
                SinkState::Closed(_) => {
                    return Err(Error::new(
                        ErrorKind::InvalidTransition,
                        "can't abort a closed sink",
                    ));
                }
                SinkState::Aborted => return Ok(vec![]),
            }
            self.abort().await;
            Ok(vec![])
        }
    }

    async fn commit(&mut self) -> Result<Vec<CommitDescriptor>> {
        let files = match self.registry.finish_all().await {
            Ok(files) => files,
            Err(err) => {
                tracing::warn!(error = %err, "Failed to commit data sink, aborting");
                self.state = SinkState::Aborted;
                return Err(err);
            }
        };

        let descriptors = files
            .into_iter()
            .map(|(key, file)| CommitDescriptor {
                file_path: file.file_path,
                target_path: file.target_path,
                partition: key.partition().map(str::to_string),
                bucket_id: key.bucket(),
                row_count: file.row_count,
                file_size_in_bytes: file.file_size_in_bytes,
            })
            .collect::<Vec<_>>();
        tracing::info!(
            files = descriptors.len(),
            rows = descriptors.iter().map(|d| d.row_count).sum::<u64>(),
            bytes = descriptors.iter().map(|d| d.file_size_in_bytes).sum::<u64>(),
            "Committed data sink"
        );
        self.state = SinkState::Closed(descriptors.clone());
        Ok(descriptors)
    }

    async fn abort(&mut self) {
        let units = self.registry.len();
        self.registry.abort_all().await;
        self.state = SinkState::Aborted;
        tracing::info!(units, "Aborted data sink");
    }
}

/// Checks that the partition, bucket and sort columns of `handle` fit its
/// schema.
fn validate_handle(handle: &InsertTableHandle) -> Result<()> {
    let schema = &handle.schema;
    let partition_columns: HashSet<&str> =
        handle.partitioned_by.iter().map(String::as_str).collect();
    ensure_valid!(
        partition_columns.len() == handle.partitioned_by.len(),
        "duplicate partition columns: {:?}",
        handle.partitioned_by
    );
    ensure_valid!(
        partition_columns.len() < schema.fields().len(),
        "all columns can't be partition columns"
    );
    for column in &handle.partitioned_by {
        let Ok(field) = schema.field_with_name(column) else {
            return Err(Error::new(
                ErrorKind::ValidationError,
                format!("partition column {column} not found in schema"),
            ));
        };
        let partition_type = PrimitiveType::try_from(field.data_type()).ok();
        ensure_valid!(
            partition_type.is_some_and(|t| t != PrimitiveType::Varbinary),
            "partition column {column} has unsupported type {}",
            field.data_type()
        );
    }

    let Some(bucketing) = &handle.bucketing else {
        return Ok(());
    };
    for (column, declared) in bucketing
        .bucketed_by()
        .iter()
        .zip(bucketing.bucketed_types())
    {
        let Ok(field) = schema.field_with_name(column) else {
            return Err(Error::new(
                ErrorKind::ValidationError,
                format!("bucket column {column} not found in schema"),
            ));
        };
        ensure_valid!(
            !partition_columns.contains(column.as_str()),
            "bucket column {column} can't be a partition column"
        );
        ensure_valid!(
            declared.accepts(field.data_type()),
            "bucket column {column} is declared as {declared} but has type {}",
            field.data_type()
        );
    }
    for sort in bucketing.sorted_by() {
        let column = sort.column();
        ensure_valid!(
            schema.field_with_name(column).is_ok(),
            "sort column {column} not found in schema"
        );
        ensure_valid!(
            !partition_columns.contains(column),
            "sort column {column} can't be a partition column"
        );
    }
    Ok(())
}

/// Bytes referenced by the rows of `batch`, excluding buffer space outside
/// the slice.
fn slice_memory_size(batch: &RecordBatch) -> Result<u64> {
    let mut size = 0;
    for column in batch.columns() {
        size += column.to_data().get_slice_memory_size()? as u64;
    }
    Ok(size)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use arrow_array::{ArrayRef, Int32Array, StringArray};
    use arrow_schema::{DataType, Field, Schema};
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::spec::{BucketKind, BucketingSpec, FileFormat, LocationHandle, SortSpec};

    fn schema() -> ArrowSchemaRef {
        Arc::new(Schema::new(vec![
            Field::new("id", DataType::Int32, false),
            Field::new("name", DataType::Utf8, true),
            Field::new("region", DataType::Utf8, true),
        ]))
    }

    fn handle() -> InsertTableHandle {
        InsertTableHandle::builder()
            .schema(schema())
            .location(LocationHandle::new("memory:/t"))
            .build()
    }

    fn sink(handle: InsertTableHandle) -> Result<DataSink> {
        DataSink::try_new(
            handle,
            FileIO::new_with_memory()?,
            CommitStrategy::NoCommit,
            SinkProperties::default(),
        )
    }

    fn bucketing(by: &str, t: PrimitiveType, sorted_by: Vec<SortSpec>) -> BucketingSpec {
        BucketingSpec::try_new(
            BucketKind::HiveCompatible,
            4,
            vec![by.to_string()],
            vec![t],
            sorted_by,
        )
        .unwrap()
    }

    fn batch(ids: Vec<i32>) -> RecordBatch {
        let names = ids.iter().map(|i| format!("n{i}")).collect::<Vec<_>>();
        let columns: Vec<ArrayRef> = vec![
            Arc::new(Int32Array::from(ids.clone())),
            Arc::new(StringArray::from(names)),
            Arc::new(StringArray::from(vec!["us"; ids.len()])),
        ];
        RecordBatch::try_new(schema(), columns).unwrap()
    }

    #[tokio::test]
    async fn test_fresh_sink() {
        let mut sink = sink(handle()).unwrap();
        assert_eq!(sink.state(), SinkStateKind::Running);
        assert_eq!(sink.completed_bytes(), 0);
        assert_eq!(sink.close(true).await.unwrap(), vec![]);
        assert_eq!(sink.state(), SinkStateKind::Closed);
    }

    #[tokio::test]
    async fn test_state_transitions() {
        let mut sink = sink(handle()).unwrap();
        sink.append_data(&batch(vec![1, 2])).await.unwrap();
        let result = sink.close(true).await.unwrap();
        assert_eq!(result.len(), 1);
        // Idempotent.
        assert_eq!(sink.close(true).await.unwrap(), result);

        let err = sink.close(false).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidTransition);
        assert_eq!(err.message(), "can't abort a closed sink");
        let err = sink.append_data(&batch(vec![3])).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
        assert_eq!(err.message(), "sink has been closed");
        assert_eq!(sink.state(), SinkStateKind::Closed);

        let mut sink = self::sink(handle()).unwrap();
        sink.append_data(&batch(vec![1, 2])).await.unwrap();
        assert_eq!(sink.close(false).await.unwrap(), vec![]);
        assert_eq!(sink.close(false).await.unwrap(), vec![]);
        assert_eq!(sink.state(), SinkStateKind::Aborted);

        let err = sink.close(true).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidTransition);
        assert_eq!(err.message(), "can't close an aborted sink");
        let err = sink.append_data(&batch(vec![3])).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
        assert_eq!(err.message(), "sink has been aborted");
    }

    #[tokio::test]
    async fn test_completed_bytes() {
        let mut sink = sink(handle()).unwrap();
        sink.append_data(&batch(vec![])).await.unwrap();
        assert_eq!(sink.completed_bytes(), 0);
        assert_eq!(sink.num_output_units(), 0);

        sink.append_data(&batch(vec![1, 2, 3])).await.unwrap();
        let after_first = sink.completed_bytes();
        assert!(after_first > 0);
        sink.append_data(&batch(vec![4])).await.unwrap();
        assert!(sink.completed_bytes() > after_first);

        let before_close = sink.completed_bytes();
        sink.close(true).await.unwrap();
        assert_eq!(sink.completed_bytes(), before_close);
    }

    #[tokio::test]
    async fn test_completed_bytes_of_slices() {
        let big = batch((0..100_000).collect());

        let mut sliced = sink(handle()).unwrap();
        for i in 0..10 {
            sliced.append_data(&big.slice(i, 1)).await.unwrap();
        }
        let mut copied = sink(handle()).unwrap();
        for i in 0..10 {
            copied.append_data(&batch(vec![i])).await.unwrap();
        }

        // Only the ten accepted rows count, not the buffers they share.
        assert_eq!(sliced.completed_bytes(), copied.completed_bytes());
        assert!(sliced.completed_bytes() < 1_000);
    }

    #[tokio::test]
    async fn test_schema_mismatch() {
        let mut sink = sink(handle()).unwrap();
        let other = Arc::new(Schema::new(vec![Field::new("x", DataType::Int32, true)]));
        let batch =
            RecordBatch::try_new(other, vec![Arc::new(Int32Array::from(vec![1])) as ArrayRef])
                .unwrap();
        let err = sink.append_data(&batch).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DataInvalid);
        assert_eq!(sink.state(), SinkStateKind::Running);
    }

    #[test]
    fn test_invalid_handles() {
        let with = |partitioned_by: Vec<&str>, bucketing: Option<BucketingSpec>| {
            let handle = handle();
            InsertTableHandle {
                partitioned_by: partitioned_by.into_iter().map(str::to_string).collect(),
                bucketing,
                ..handle
            }
        };

        let cases = [
            (
                with(vec!["nope"], None),
                "partition column nope not found in schema",
            ),
            (
                with(vec!["id", "name", "region"], None),
                "all columns can't be partition columns",
            ),
            (
                with(vec![], Some(bucketing("nope", PrimitiveType::Integer, vec![]))),
                "bucket column nope not found in schema",
            ),
            (
                with(vec![], Some(bucketing("id", PrimitiveType::BigInt, vec![]))),
                "bucket column id is declared as BIGINT but has type Int32",
            ),
            (
                with(
                    vec!["region"],
                    Some(bucketing("region", PrimitiveType::Varchar, vec![])),
                ),
                "bucket column region can't be a partition column",
            ),
            (
                with(
                    vec!["region"],
                    Some(bucketing("id", PrimitiveType::Integer, vec![
                        SortSpec::asc("region").unwrap()
                    ])),
                ),
                "sort column region can't be a partition column",
            ),
            (
                with(
                    vec![],
                    Some(bucketing("id", PrimitiveType::Integer, vec![
                        SortSpec::asc("nope").unwrap()
                    ])),
                ),
                "sort column nope not found in schema",
            ),
        ];

        for (handle, message) in cases {
            let err = sink(handle).err().unwrap();
            assert_eq!(err.kind(), ErrorKind::ValidationError);
            assert_eq!(err.message(), message);
        }
    }

    #[test]
    fn test_unwritable_format() {
        let handle = InsertTableHandle {
            file_format: FileFormat::Orc,
            ..handle()
        };
        let err = sink(handle).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::FeatureUnsupported);
    }

    #[test]
    fn test_commit_descriptor_serde() {
        let descriptor = CommitDescriptor {
            file_path: "/t/.tmp.000001_0_q.parquet_x".to_string(),
            target_path: "/t/000001_0_q.parquet".to_string(),
            partition: None,
            bucket_id: Some(1),
            row_count: 3,
            file_size_in_bytes: 42,
        };
        let json = serde_json::to_string(&descriptor).unwrap();
        assert_eq!(
            json,
            r#"{"filePath":"/t/.tmp.000001_0_q.parquet_x","targetPath":"/t/000001_0_q.parquet","bucketId":1,"rowCount":3,"fileSizeInBytes":42}"#
        );
        assert_eq!(
            serde_json::from_str::<CommitDescriptor>(&json).unwrap(),
            descriptor
        );
    }
}
