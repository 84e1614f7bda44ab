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

/*!
 * Bucketing of hive tables.
 */
use std::fmt::{Display, Formatter};

use serde_derive::{Deserialize, Serialize};

use _serde::BucketingSpecSerde;

use super::{PrimitiveType, SortSpec};
use crate::{ensure_valid, Result};

/// Hash function family used to assign rows to buckets.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BucketKind {
    /// Murmur3 over canonical value bytes. Fast, but not readable by hive.
    NativeHash,
    /// Bit-for-bit compatible with hive's `ObjectInspectorUtils.hashCode`.
    HiveCompatible,
}

impl Display for BucketKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            BucketKind::NativeHash => write!(f, "NATIVE_HASH"),
            BucketKind::HiveCompatible => write!(f, "HIVE_COMPATIBLE"),
        }
    }
}

/// How rows of a table are distributed over a fixed number of bucket files,
/// and how rows are ordered inside each bucket.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
#[serde(try_from = "BucketingSpecSerde", into = "BucketingSpecSerde")]
pub struct BucketingSpec {
    kind: BucketKind,
    bucket_count: u32,
    bucketed_by: Vec<String>,
    bucketed_types: Vec<PrimitiveType>,
    sorted_by: Vec<SortSpec>,
}

impl BucketingSpec {
    /// Creates a validated bucketing spec.
    ///
    /// Checks run in order and the first failure is reported: column and type
    /// counts must match, at least one column must be given, and the bucket
    /// count must be positive.
    pub fn try_new(
        kind: BucketKind,
        bucket_count: u32,
        bucketed_by: Vec<String>,
        bucketed_types: Vec<PrimitiveType>,
        sorted_by: Vec<SortSpec>,
    ) -> Result<Self> {
        ensure_valid!(
            bucketed_by.len() == bucketed_types.len(),
            "the number of bucket columns and types do not match"
        );
        ensure_valid!(!bucketed_by.is_empty(), "bucket columns must be set");
        ensure_valid!(bucket_count > 0, "bucket count can't be zero");
        Ok(Self {
            kind,
            bucket_count,
            bucketed_by,
            bucketed_types,
            sorted_by,
        })
    }

    /// Hash function family.
    pub fn kind(&self) -> BucketKind {
        self.kind
    }

    /// Number of buckets, always positive.
    pub fn bucket_count(&self) -> u32 {
        self.bucket_count
    }

    /// Bucket column names, in hashing order.
    pub fn bucketed_by(&self) -> &[String] {
        &self.bucketed_by
    }

    /// Declared types of the bucket columns.
    pub fn bucketed_types(&self) -> &[PrimitiveType] {
        &self.bucketed_types
    }

    /// Sort columns applied inside each bucket.
    pub fn sorted_by(&self) -> &[SortSpec] {
        &self.sorted_by
    }

    /// Whether rows inside each bucket must be sorted.
    pub fn is_sorted(&self) -> bool {
        !self.sorted_by.is_empty()
    }
}

impl Display for BucketingSpec {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f)?;
        writeln!(f, "BucketingSpec[<{} {}>", self.kind, self.bucket_count)?;
        writeln!(f, "\tBucket Columns:")?;
        for column in &self.bucketed_by {
            writeln!(f, "\t\t{column}")?;
        }
        writeln!(f, "\tBucket Types:")?;
        for t in &self.bucketed_types {
            writeln!(f, "\t\t{t}")?;
        }
        if self.is_sorted() {
            writeln!(f, "\tSortedBy Columns:")?;
            for sort in &self.sorted_by {
                writeln!(f, "\t\t{sort}")?;
            }
        }
        writeln!(f, "]")
    }
}

mod _serde {
    use serde_derive::{Deserialize, Serialize};

    use super::{BucketKind, BucketingSpec};
    use crate::spec::{PrimitiveType, SortSpec};
    use crate::Error;

    #[derive(Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub(super) struct BucketingSpecSerde {
        kind: BucketKind,
        bucket_count: u32,
        bucketed_by: Vec<String>,
        bucketed_types: Vec<PrimitiveType>,
        #[serde(default)]
        sorted_by: Vec<SortSpec>,
    }

    impl TryFrom<BucketingSpecSerde> for BucketingSpec {
        type Error = Error;

        fn try_from(value: BucketingSpecSerde) -> Result<Self, Self::Error> {
            BucketingSpec::try_new(
                value.kind,
                value.bucket_count,
                value.bucketed_by,
                value.bucketed_types,
                value.sorted_by,
            )
        }
    }

    impl From<BucketingSpec> for BucketingSpecSerde {
        fn from(value: BucketingSpec) -> Self {
            Self {
                kind: value.kind,
                bucket_count: value.bucket_count,
                bucketed_by: value.bucketed_by,
                bucketed_types: value.bucketed_types,
                sorted_by: value.sorted_by,
            }
        }
    }
}
