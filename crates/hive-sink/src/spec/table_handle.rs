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

//! Everything a sink needs to know about the table it writes into.

use arrow_schema::SchemaRef;
use serde_derive::{Deserialize, Serialize};
use typed_builder::TypedBuilder;
use uuid::Uuid;

use super::{BucketingSpec, CompressionKind, FileFormat};

/// Directories a sink writes into.
///
/// Files are written below `write_path`; `target_path` is where they live
/// after the query commits. Both are the same for direct writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationHandle {
    target_path: String,
    write_path: String,
}

impl LocationHandle {
    /// Writes directly into `target_path`.
    pub fn new(target_path: impl Into<String>) -> Self {
        let target_path = trim_trailing_slash(target_path.into());
        Self {
            write_path: target_path.clone(),
            target_path,
        }
    }

    /// Stages files under `write_path` before they are moved to `target_path`.
    pub fn with_write_path(mut self, write_path: impl Into<String>) -> Self {
        self.write_path = trim_trailing_slash(write_path.into());
        self
    }

    /// Final table or partition root directory.
    pub fn target_path(&self) -> &str {
        &self.target_path
    }

    /// Directory files are written into.
    pub fn write_path(&self) -> &str {
        &self.write_path
    }
}

fn trim_trailing_slash(mut path: String) -> String {
    while path.len() > 1 && path.ends_with('/') {
        path.pop();
    }
    path
}

/// How written files become visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitStrategy {
    /// Files are written at their final name.
    #[default]
    NoCommit,
    /// Files are written under a `.tmp.` name; the coordinator renames them to
    /// the reported target path when the task commits.
    TaskCommit,
}

/// Description of an insert into a hive table.
#[derive(Debug, Clone, TypedBuilder)]
pub struct InsertTableHandle {
    /// All columns of the table, data and partition columns alike.
    pub schema: SchemaRef,
    /// Partition columns, in directory nesting order.
    #[builder(default)]
    pub partitioned_by: Vec<String>,
    /// Bucketing of the table, if any.
    #[builder(default, setter(strip_option))]
    pub bucketing: Option<BucketingSpec>,
    /// Where files go.
    pub location: LocationHandle,
    /// Format of written files.
    #[builder(default)]
    pub file_format: FileFormat,
    /// Compression of written files.
    #[builder(default)]
    pub compression: CompressionKind,
    /// Identifier of the writing query, used in bucket file names.
    #[builder(default = Uuid::new_v4().to_string(), setter(into))]
    pub query_id: String,
}
