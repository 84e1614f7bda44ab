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

//! This module contains the location generator and file name generator for generating path of data file.

use std::sync::atomic::AtomicU64;
use std::sync::Arc;

use uuid::Uuid;

use crate::spec::{CommitStrategy, FileFormat, LocationHandle};
use crate::writer::partitioning::UnitKey;

/// Where a file is written, and where it lives once the write commits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileLocation {
    /// Path the encoder writes to.
    pub write_path: String,
    /// Path of the file after commit.
    pub target_path: String,
}

/// `LocationGenerator` used to generate the location of data file.
pub trait LocationGenerator: Clone + Send + Sync + 'static {
    /// Generate absolute paths for the file of an output unit.
    /// e.g
    /// For key `ds=2024-01-01` and file name "000001_0_q.parquet", the target location may be
    /// "/table/ds=2024-01-01/000001_0_q.parquet"
    fn generate_location(&self, key: &UnitKey, file_name: &str) -> FileLocation;
}

/// Places files in hive partition directories below the write and target
/// directories of a [`LocationHandle`].
#[derive(Clone, Debug)]
pub struct HiveLocationGenerator {
    location: LocationHandle,
    commit_strategy: CommitStrategy,
}

impl HiveLocationGenerator {
    /// Create a new `HiveLocationGenerator`.
    pub fn new(location: LocationHandle, commit_strategy: CommitStrategy) -> Self {
        Self {
            location,
            commit_strategy,
        }
    }

    fn dir(root: &str, key: &UnitKey) -> String {
        match key.partition() {
            Some(partition) => format!("{root}/{partition}"),
            None => root.to_string(),
        }
    }
}

impl LocationGenerator for HiveLocationGenerator {
    fn generate_location(&self, key: &UnitKey, file_name: &str) -> FileLocation {
        let write_file_name = match self.commit_strategy {
            CommitStrategy::NoCommit => file_name.to_string(),
            CommitStrategy::TaskCommit => format!(".tmp.{file_name}_{}", Uuid::new_v4()),
        };
        FileLocation {
            write_path: format!(
                "{}/{write_file_name}",
                Self::dir(self.location.write_path(), key)
            ),
            target_path: format!(
                "{}/{file_name}",
                Self::dir(self.location.target_path(), key)
            ),
        }
    }
}

/// `FileNameGenerator` used to generate file name for data file. The file name can be passed to `LocationGenerator` to generate the location of the file.
pub trait FileNameGenerator: Clone + Send + Sync + 'static {
    /// Generate a file name for the output unit with `key`.
    fn generate_file_name(&self, key: &UnitKey) -> String;
}

/// `HiveFileNameGenerator` used to generate file name for data file.
///
/// Files of bucketed units are named like hive names bucket files,
/// `{bucket:06}_0_{query_id}.{format}`, so that readers can map files back
/// to buckets. Other files are named `{prefix}-{file_count:05}-{uuid}.{format}`.
#[derive(Clone, Debug)]
pub struct HiveFileNameGenerator {
    prefix: String,
    query_id: String,
    format: FileFormat,
    file_count: Arc<AtomicU64>,
}

impl HiveFileNameGenerator {
    /// Create a new `HiveFileNameGenerator`.
    pub fn new(prefix: String, query_id: String, format: FileFormat) -> Self {
        Self {
            prefix,
            query_id,
            format,
            file_count: Arc::new(AtomicU64::new(0)),
        }
    }
}

impl FileNameGenerator for HiveFileNameGenerator {
    fn generate_file_name(&self, key: &UnitKey) -> String {
        match key.bucket() {
            Some(bucket) => format!("{bucket:06}_0_{}.{}", self.query_id, self.format),
            None => {
                let file_id = self
                    .file_count
                    .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                format!(
                    "{}-{:05}-{}.{}",
                    self.prefix,
                    file_id,
                    Uuid::new_v4(),
                    self.format
                )
            }
        }
    }
}
