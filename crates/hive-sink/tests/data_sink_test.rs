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

//! Integration tests for the data sink, writing to the local file system.

use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow_array::cast::AsArray;
use arrow_array::types::Int64Type;
use arrow_array::{Array, ArrayRef, Int64Array, RecordBatch, StringArray};
use arrow_schema::{DataType, Field, Schema, SchemaRef};
use arrow_select::concat::concat_batches;
use hive_sink::io::FileIO;
use hive_sink::spec::{
    BucketKind, BucketingSpec, CommitStrategy, Datum, InsertTableHandle, LocationHandle,
    PrimitiveType, SortSpec,
};
use hive_sink::transform::bucket_for;
use hive_sink::{CommitDescriptor, DataSink, ErrorKind, SinkProperties, SinkStateKind};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("id", DataType::Int64, false),
        Field::new("name", DataType::Utf8, true),
        Field::new("region", DataType::Utf8, true),
    ]))
}

/// Rows `start..start + len`, names cycle backwards so that sorting changes
/// the order, regions cycle over `regions`.
fn batch(start: i64, len: usize, regions: &[Option<&str>]) -> RecordBatch {
    let ids = (start..start + len as i64).collect::<Vec<_>>();
    let names = ids
        .iter()
        .map(|id| (id % 7 != 0).then(|| format!("name-{}", 1000 - id % 50)))
        .collect::<Vec<_>>();
    let region = ids
        .iter()
        .map(|id| regions[*id as usize % regions.len()])
        .collect::<Vec<_>>();
    let columns: Vec<ArrayRef> = vec![
        Arc::new(Int64Array::from(ids)),
        Arc::new(StringArray::from(names)),
        Arc::new(StringArray::from(region)),
    ];
    RecordBatch::try_new(schema(), columns).unwrap()
}

fn handle(location: LocationHandle) -> InsertTableHandle {
    InsertTableHandle::builder()
        .schema(schema())
        .location(location)
        .query_id("q1")
        .build()
}

fn create_sink(handle: InsertTableHandle) -> DataSink {
    DataSink::try_new(
        handle,
        FileIO::new_with_fs(),
        CommitStrategy::NoCommit,
        SinkProperties::default(),
    )
    .unwrap()
}

fn temp_location(temp_dir: &TempDir) -> LocationHandle {
    LocationHandle::new(temp_dir.path().to_str().unwrap())
}

fn list_files(dir: &Path) -> Vec<PathBuf> {
    let mut files = vec![];
    if !dir.exists() {
        return files;
    }
    for entry in std::fs::read_dir(dir).unwrap() {
        let path = entry.unwrap().path();
        if path.is_dir() {
            files.extend(list_files(&path));
        } else {
            files.push(path);
        }
    }
    files.sort();
    files
}

fn read_file(path: &str) -> Vec<RecordBatch> {
    let reader = ParquetRecordBatchReaderBuilder::try_new(File::open(path).unwrap())
        .unwrap()
        .build()
        .unwrap();
    reader.map(|batch| batch.unwrap()).collect()
}

fn read_descriptor(descriptor: &CommitDescriptor, schema: &SchemaRef) -> RecordBatch {
    let batch = concat_batches(schema, &read_file(&descriptor.file_path)).unwrap();
    assert_eq!(batch.num_rows() as u64, descriptor.row_count);
    assert_eq!(
        std::fs::metadata(&descriptor.file_path).unwrap().len(),
        descriptor.file_size_in_bytes
    );
    batch
}

#[tokio::test]
async fn test_basic() {
    let temp_dir = TempDir::new().unwrap();
    let mut sink = create_sink(handle(temp_location(&temp_dir)));

    let batches = (0..10)
        .map(|i| batch(i * 500, 500, &[Some("us")]))
        .collect::<Vec<_>>();
    for batch in &batches {
        sink.append_data(batch).await.unwrap();
    }
    let results = sink.close(true).await.unwrap();
    assert_eq!(results.len(), 1);

    let descriptor = &results[0];
    assert_eq!(descriptor.file_path, descriptor.target_path);
    assert_eq!(descriptor.partition, None);
    assert_eq!(descriptor.bucket_id, None);
    assert!(descriptor.file_path.ends_with(".parquet"));
    assert_eq!(list_files(temp_dir.path()), vec![PathBuf::from(
        &descriptor.file_path
    )]);

    let expected = concat_batches(&schema(), &batches).unwrap();
    assert_eq!(read_descriptor(descriptor, &schema()), expected);
}

#[tokio::test]
async fn test_close() {
    for empty in [true, false] {
        let temp_dir = TempDir::new().unwrap();
        let mut sink = create_sink(handle(temp_location(&temp_dir)));
        let rows = batch(0, 1, &[Some("us")]);

        if !empty {
            sink.append_data(&rows).await.unwrap();
            assert!(sink.completed_bytes() > 0);
        } else {
            assert_eq!(sink.completed_bytes(), 0);
        }
        let results = sink.close(true).await.unwrap();

        // Can't append after close.
        let err = sink.append_data(&rows).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
        assert_eq!(err.message(), "sink has been closed");
        assert_eq!(sink.close(true).await.unwrap(), results);
        let err = sink.close(false).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidTransition);
        assert_eq!(err.message(), "can't abort a closed sink");
        assert_eq!(sink.state(), SinkStateKind::Closed);

        if !empty {
            assert_eq!(results.len(), 1);
            assert!(sink.completed_bytes() > 0);
            assert_eq!(read_descriptor(&results[0], &schema()), rows);
        } else {
            assert!(results.is_empty());
            assert_eq!(sink.completed_bytes(), 0);
            assert!(list_files(temp_dir.path()).is_empty());
        }
    }
}

#[tokio::test]
async fn test_abort() {
    for empty in [true, false] {
        let temp_dir = TempDir::new().unwrap();
        let mut sink = create_sink(handle(temp_location(&temp_dir)));
        let rows = batch(0, 1, &[Some("us")]);

        let initial_bytes = if !empty {
            sink.append_data(&rows).await.unwrap();
            assert_eq!(sink.num_output_units(), 1);
            sink.completed_bytes()
        } else {
            sink.completed_bytes()
        };
        assert_eq!(initial_bytes > 0, !empty);

        assert!(sink.close(false).await.unwrap().is_empty());
        // Can't close after abort.
        let err = sink.close(true).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidTransition);
        assert_eq!(err.message(), "can't close an aborted sink");
        assert!(sink.close(false).await.unwrap().is_empty());
        // Can't append after abort.
        let err = sink.append_data(&rows).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
        assert_eq!(err.message(), "sink has been aborted");

        assert_eq!(sink.completed_bytes(), initial_bytes);
        assert_eq!(sink.num_output_units(), 0);
        assert!(list_files(temp_dir.path()).is_empty());
    }
}

#[tokio::test]
async fn test_hive_bucketed_write() {
    let temp_dir = TempDir::new().unwrap();
    let bucketing = BucketingSpec::try_new(
        BucketKind::HiveCompatible,
        4,
        vec!["id".to_string()],
        vec![PrimitiveType::BigInt],
        vec![],
    )
    .unwrap();
    let handle = InsertTableHandle {
        bucketing: Some(bucketing),
        ..handle(temp_location(&temp_dir))
    };
    let mut sink = create_sink(handle);
    sink.append_data(&batch(0, 100, &[Some("us")])).await.unwrap();
    sink.append_data(&batch(100, 100, &[Some("eu")])).await.unwrap();
    assert_eq!(sink.num_output_units(), 4);

    let results = sink.close(true).await.unwrap();
    // Units are reported in the order of their first row.
    assert_eq!(
        results.iter().map(|d| d.bucket_id).collect::<Vec<_>>(),
        vec![Some(0), Some(1), Some(2), Some(3)]
    );
    assert_eq!(results.iter().map(|d| d.row_count).sum::<u64>(), 200);

    for descriptor in &results {
        let bucket = descriptor.bucket_id.unwrap();
        assert!(descriptor
            .file_path
            .ends_with(&format!("/{bucket:06}_0_q1.parquet")));

        let written = read_descriptor(descriptor, &schema());
        for id in written.column(0).as_primitive::<Int64Type>().values().iter() {
            assert_eq!(
                bucket_for(&[Datum::BigInt(*id)], 4, BucketKind::HiveCompatible).unwrap(),
                bucket
            );
        }
    }
}

#[tokio::test]
async fn test_sorted_buckets() {
    let temp_dir = TempDir::new().unwrap();
    let bucketing = BucketingSpec::try_new(
        BucketKind::NativeHash,
        3,
        vec!["region".to_string()],
        vec![PrimitiveType::Varchar],
        vec![SortSpec::asc("name").unwrap(), SortSpec::desc("id").unwrap()],
    )
    .unwrap();
    let handle = InsertTableHandle {
        bucketing: Some(bucketing),
        ..handle(temp_location(&temp_dir))
    };
    let mut sink = create_sink(handle);
    let regions = [Some("us"), Some("eu"), None, Some("ap")];
    for i in 0..5 {
        sink.append_data(&batch(i * 200, 200, &regions)).await.unwrap();
    }

    let results = sink.close(true).await.unwrap();
    assert_eq!(results.iter().map(|d| d.row_count).sum::<u64>(), 1000);
    for descriptor in &results {
        let written = read_descriptor(descriptor, &schema());
        let names = written.column(1).as_string::<i32>();
        let ids = written.column(0).as_primitive::<Int64Type>();
        let key = |row: usize| (names.is_valid(row).then(|| names.value(row)), -ids.value(row));
        // Nulls first, then names ascending, then ids descending.
        for row in 1..written.num_rows() {
            assert!(
                key(row - 1) <= key(row),
                "row {row} of {} out of order",
                descriptor.file_path
            );
        }
    }
}

#[tokio::test]
async fn test_sorted_buckets_descending_nulls_last() {
    let temp_dir = TempDir::new().unwrap();
    let bucketing = BucketingSpec::try_new(
        BucketKind::HiveCompatible,
        2,
        vec!["id".to_string()],
        vec![PrimitiveType::BigInt],
        vec![SortSpec::desc("name").unwrap()],
    )
    .unwrap();
    let handle = InsertTableHandle {
        bucketing: Some(bucketing),
        ..handle(temp_location(&temp_dir))
    };
    let mut sink = create_sink(handle);
    for i in 0..3 {
        sink.append_data(&batch(i * 100, 100, &[Some("us")]))
            .await
            .unwrap();
    }

    let results = sink.close(true).await.unwrap();
    let mut null_count = 0;
    for descriptor in &results {
        let written = read_descriptor(descriptor, &schema());
        let names = written.column(1).as_string::<i32>();
        let first_null = (0..written.num_rows())
            .find(|row| names.is_null(*row))
            .unwrap_or(written.num_rows());
        for row in first_null..written.num_rows() {
            assert!(names.is_null(row), "non-null name after nulls in row {row}");
        }
        for row in 1..first_null {
            assert!(names.value(row - 1) >= names.value(row));
        }
        null_count += written.num_rows() - first_null;
    }
    // Every seventh id has a null name.
    assert_eq!(null_count, 43);
}

#[tokio::test]
async fn test_partitioned_write() {
    let temp_dir = TempDir::new().unwrap();
    let handle = InsertTableHandle {
        partitioned_by: vec!["region".to_string()],
        ..handle(temp_location(&temp_dir))
    };
    let mut sink = create_sink(handle);
    sink.append_data(&batch(0, 30, &[Some("us"), None, Some("a/b")]))
        .await
        .unwrap();
    sink.append_data(&batch(30, 30, &[Some("us"), None, Some("a/b")]))
        .await
        .unwrap();

    let results = sink.close(true).await.unwrap();
    let partitions = results
        .iter()
        .map(|d| (d.partition.clone().unwrap(), d.row_count))
        .collect::<Vec<_>>();
    assert_eq!(partitions, vec![
        ("region=us".to_string(), 20),
        ("region=__HIVE_DEFAULT_PARTITION__".to_string(), 20),
        ("region=a%2Fb".to_string(), 20),
    ]);

    let data_schema = Arc::new(schema().project(&[0, 1]).unwrap());
    let root = temp_dir.path().to_str().unwrap();
    for descriptor in &results {
        let partition = descriptor.partition.as_deref().unwrap();
        assert!(descriptor
            .file_path
            .starts_with(&format!("{root}/{partition}/data-")));

        // Partition values live in the directory name only.
        let written = read_descriptor(descriptor, &data_schema);
        assert_eq!(written.schema(), data_schema);
    }
    assert_eq!(list_files(temp_dir.path()).len(), 3);
}

#[tokio::test]
async fn test_partition_limit() {
    let temp_dir = TempDir::new().unwrap();
    let handle = InsertTableHandle {
        partitioned_by: vec!["region".to_string()],
        ..handle(temp_location(&temp_dir))
    };
    let properties = SinkProperties::try_from(&HashMap::from([(
        SinkProperties::PROPERTY_MAX_PARTITIONS_PER_WRITER.to_string(),
        "2".to_string(),
    )]))
    .unwrap();
    let mut sink = DataSink::try_new(
        handle,
        FileIO::new_with_fs(),
        CommitStrategy::NoCommit,
        properties,
    )
    .unwrap();

    sink.append_data(&batch(0, 10, &[Some("us"), Some("eu")]))
        .await
        .unwrap();
    let err = sink
        .append_data(&batch(10, 10, &[Some("us"), Some("ap")]))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::LimitExceeded);
    assert_eq!(err.message(), "Exceeded limit of 2 distinct partitions.");
    assert_eq!(sink.state(), SinkStateKind::Running);

    assert!(sink.close(false).await.unwrap().is_empty());
    assert!(list_files(temp_dir.path()).is_empty());
}

#[tokio::test]
async fn test_task_commit() {
    let target_dir = TempDir::new().unwrap();
    let staging_dir = TempDir::new().unwrap();
    let target = target_dir.path().to_str().unwrap();
    let staging = staging_dir.path().to_str().unwrap();

    let bucketing = BucketingSpec::try_new(
        BucketKind::HiveCompatible,
        2,
        vec!["id".to_string()],
        vec![PrimitiveType::BigInt],
        vec![],
    )
    .unwrap();
    let handle = InsertTableHandle {
        bucketing: Some(bucketing),
        ..handle(LocationHandle::new(target).with_write_path(staging))
    };
    let mut sink = DataSink::try_new(
        handle,
        FileIO::new_with_fs(),
        CommitStrategy::TaskCommit,
        SinkProperties::default(),
    )
    .unwrap();
    sink.append_data(&batch(0, 10, &[Some("us")])).await.unwrap();

    let results = sink.close(true).await.unwrap();
    assert_eq!(results.len(), 2);
    for descriptor in &results {
        let bucket = descriptor.bucket_id.unwrap();
        assert_eq!(
            descriptor.target_path,
            format!("{target}/{bucket:06}_0_q1.parquet")
        );
        assert!(descriptor
            .file_path
            .starts_with(&format!("{staging}/.tmp.{bucket:06}_0_q1.parquet_")));
        assert_eq!(read_descriptor(descriptor, &schema()).num_rows(), 5);
    }
    // Moving files into place is up to the coordinator.
    assert!(list_files(target_dir.path()).is_empty());
    assert_eq!(list_files(staging_dir.path()).len(), 2);
}
