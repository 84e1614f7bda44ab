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

//! Routing of rows to output units.

use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

use arrow_array::{Array, BooleanArray, RecordBatch};
use arrow_schema::SchemaRef as ArrowSchemaRef;
use arrow_select::filter::filter_record_batch;
use itertools::Itertools;

use crate::spec::{BucketingSpec, Datum};
use crate::transform::BucketFunction;
use crate::{Error, ErrorKind, Result};

/// Directory value used for null and empty partition values.
pub const DEFAULT_PARTITION_VALUE: &str = "__HIVE_DEFAULT_PARTITION__";

/// Identifies an output unit: the partition directory and the bucket its rows
/// go to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct UnitKey {
    partition: Option<String>,
    bucket: Option<u32>,
}

impl UnitKey {
    /// Create a new `UnitKey`.
    pub fn new(partition: Option<String>, bucket: Option<u32>) -> Self {
        Self { partition, bucket }
    }

    /// Rendered hive partition path, e.g. `ds=2024-01-01/region=us`.
    pub fn partition(&self) -> Option<&str> {
        self.partition.as_deref()
    }

    /// Bucket id.
    pub fn bucket(&self) -> Option<u32> {
        self.bucket
    }
}

impl Display for UnitKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match (&self.partition, self.bucket) {
            (Some(partition), Some(bucket)) => write!(f, "{partition}#{bucket}"),
            (Some(partition), None) => write!(f, "{partition}"),
            (None, Some(bucket)) => write!(f, "#{bucket}"),
            (None, None) => write!(f, "<unpartitioned>"),
        }
    }
}

/// Escapes a partition column name or value the way hive does for directory
/// names: control characters and `"#%'*/:=?\{[]^` and DEL become `%XX`.
pub fn escape_path_name(path: &str) -> String {
    fn needs_escape(c: char) -> bool {
        matches!(
            c,
            '\u{00}'..='\u{1F}'
                | '"'
                | '#'
                | '%'
                | '\''
                | '*'
                | '/'
                | ':'
                | '='
                | '?'
                | '\\'
                | '\u{7F}'
                | '{'
                | '['
                | ']'
                | '^'
        )
    }

    let mut escaped = String::with_capacity(path.len());
    for c in path.chars() {
        if needs_escape(c) {
            escaped.push_str(&format!("%{:02X}", c as u32));
        } else {
            escaped.push(c);
        }
    }
    escaped
}

/// Renders a hive partition path from partition column names and one row of
/// their values.
pub fn partition_path(names: &[String], values: &[Datum]) -> Result<String> {
    if names.len() != values.len() {
        return Err(Error::new(
            ErrorKind::DataInvalid,
            format!(
                "Expected {} partition values, got {}",
                names.len(),
                values.len()
            ),
        ));
    }
    let segments = names
        .iter()
        .zip_eq(values)
        .map(|(name, value)| {
            let value = match value.to_partition_string()? {
                Some(value) if !value.is_empty() => escape_path_name(&value),
                _ => DEFAULT_PARTITION_VALUE.to_string(),
            };
            Ok(format!("{}={value}", escape_path_name(name)))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(segments.join("/"))
}

/// Splits record batches of a table into the rows of each output unit.
///
/// Partition columns are dropped from the split batches, since their values
/// live in the directory name.
pub struct Partitioner {
    data_schema: ArrowSchemaRef,
    data_indices: Vec<usize>,
    partition_names: Vec<String>,
    partition_indices: Vec<usize>,
    bucket_indices: Vec<usize>,
    bucket_function: Option<BucketFunction>,
}

impl Partitioner {
    /// Creates a partitioner for batches of `schema`.
    pub fn try_new(
        schema: &ArrowSchemaRef,
        partitioned_by: &[String],
        bucketing: Option<&BucketingSpec>,
    ) -> Result<Self> {
        let index_of = |name: &String| {
            schema.index_of(name).map_err(|err| {
                Error::new(
                    ErrorKind::ValidationError,
                    format!("column {name} not found in schema"),
                )
                .with_source(err)
            })
        };

        let partition_indices = partitioned_by.iter().map(index_of).collect::<Result<Vec<_>>>()?;
        let data_indices = (0..schema.fields().len())
            .filter(|i| !partition_indices.contains(i))
            .collect::<Vec<_>>();
        let (bucket_indices, bucket_function) = match bucketing {
            Some(bucketing) => (
                bucketing
                    .bucketed_by()
                    .iter()
                    .map(index_of)
                    .collect::<Result<Vec<_>>>()?,
                Some(BucketFunction::try_new(
                    bucketing.kind(),
                    bucketing.bucket_count(),
                )?),
            ),
            None => (vec![], None),
        };

        Ok(Self {
            data_schema: Arc::new(schema.project(&data_indices)?),
            data_indices,
            partition_names: partitioned_by.to_vec(),
            partition_indices,
            bucket_indices,
            bucket_function,
        })
    }

    /// Schema of the batches returned by [`Partitioner::partition`].
    pub fn data_schema(&self) -> &ArrowSchemaRef {
        &self.data_schema
    }

    /// Drops the partition columns of `batch`.
    pub fn data_batch(&self, batch: &RecordBatch) -> Result<RecordBatch> {
        Ok(batch.project(&self.data_indices)?)
    }

    /// Splits `batch` by unit key. Groups are returned in the order their
    /// first row appears in `batch`, rows keep their relative order.
    pub fn partition(&self, batch: &RecordBatch) -> Result<Vec<(UnitKey, RecordBatch)>> {
        let num_rows = batch.num_rows();
        if num_rows == 0 {
            return Ok(vec![]);
        }

        let bucket_ids = match &self.bucket_function {
            Some(function) => {
                let columns = self
                    .bucket_indices
                    .iter()
                    .map(|i| batch.column(*i).clone())
                    .collect::<Vec<_>>();
                Some(function.bucket_ids(&columns)?)
            }
            None => None,
        };
        let partitions = self.partition_paths(batch)?;

        let mut group_index: HashMap<UnitKey, usize> = HashMap::new();
        let mut groups: Vec<(UnitKey, Vec<usize>)> = vec![];
        for row in 0..num_rows {
            let key = UnitKey::new(
                partitions.as_ref().map(|p| p[row].clone()),
                bucket_ids.as_ref().map(|b| b[row]),
            );
            let idx = *group_index.entry(key.clone()).or_insert_with(|| {
                groups.push((key, vec![]));
                groups.len() - 1
            });
            groups[idx].1.push(row);
        }

        let data = self.data_batch(batch)?;
        if groups.len() == 1 {
            let (key, _) = groups.remove(0);
            return Ok(vec![(key, data)]);
        }

        groups
            .into_iter()
            .map(|(key, rows)| {
                let filter_array: BooleanArray = {
                    let mut filter = vec![false; num_rows];
                    rows.into_iter().for_each(|row| filter[row] = true);
                    filter.into()
                };
                Ok((key, filter_record_batch(&data, &filter_array)?))
            })
            .collect()
    }

    fn partition_paths(&self, batch: &RecordBatch) -> Result<Option<Vec<String>>> {
        if self.partition_indices.is_empty() {
            return Ok(None);
        }
        let columns: Vec<&dyn Array> = self
            .partition_indices
            .iter()
            .map(|i| batch.column(*i).as_ref())
            .collect();

        (0..batch.num_rows())
            .map(|row| {
                let values = columns
                    .iter()
                    .map(|column| Datum::from_array(*column, row))
                    .collect::<Result<Vec<_>>>()?;
                partition_path(&self.partition_names, &values)
            })
            .collect::<Result<Vec<_>>>()
            .map(Some)
    }
}
