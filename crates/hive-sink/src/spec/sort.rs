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
 * Sorting
*/
use std::fmt::{Display, Formatter};

use arrow_schema::SortOptions;
use _serde::SortSpecSerde;
use serde_derive::{Deserialize, Serialize};

use crate::{ensure_valid, Result};

/// Sort column of a bucketed table: column name, direction and placement of
/// nulls.
///
/// Only `ASC NULLS FIRST` and `DESC NULLS LAST` are valid orders.
#[derive(Debug, PartialEq, Eq, Clone, Hash, Serialize, Deserialize)]
#[serde(try_from = "SortSpecSerde", into = "SortSpecSerde")]
pub struct SortSpec {
    column: String,
    ascending: bool,
    nulls_first: bool,
}

impl SortSpec {
    /// Creates a validated sort spec.
    pub fn try_new(column: impl Into<String>, ascending: bool, nulls_first: bool) -> Result<Self> {
        let column = column.into();
        ensure_valid!(!column.is_empty(), "sort column must be set");
        let spec = Self {
            column,
            ascending,
            nulls_first,
        };
        ensure_valid!(ascending == nulls_first, "bad sort order: {}", spec);
        Ok(spec)
    }

    /// Ascending, nulls first.
    pub fn asc(column: impl Into<String>) -> Result<Self> {
        Self::try_new(column, true, true)
    }

    /// Descending, nulls last.
    pub fn desc(column: impl Into<String>) -> Result<Self> {
        Self::try_new(column, false, false)
    }

    /// Name of the sort column.
    pub fn column(&self) -> &str {
        &self.column
    }

    /// Whether values sort in ascending order.
    pub fn ascending(&self) -> bool {
        self.ascending
    }

    /// Whether nulls sort before all values.
    pub fn nulls_first(&self) -> bool {
        self.nulls_first
    }

    /// Arrow sort options for ordering rows by this column.
    pub fn sort_options(&self) -> SortOptions {
        SortOptions {
            descending: !self.ascending,
            nulls_first: self.nulls_first,
        }
    }

    fn order(&self) -> String {
        format!(
            "{} NULLS {}",
            if self.ascending { "ASC" } else { "DESC" },
            if self.nulls_first { "FIRST" } else { "LAST" }
        )
    }
}

impl Display for SortSpec {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[COLUMN[{}] ORDER[{}]]", self.column, self.order())
    }
}

mod _serde {
    use serde_derive::{Deserialize, Serialize};

    use super::SortSpec;
    use crate::Error;

    #[derive(Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub(super) struct SortOrderSerde {
        ascending: bool,
        nulls_first: bool,
    }

    #[derive(Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub(super) struct SortSpecSerde {
        column_name: String,
        sort_order: SortOrderSerde,
    }

    impl TryFrom<SortSpecSerde> for SortSpec {
        type Error = Error;

        fn try_from(value: SortSpecSerde) -> Result<Self, Self::Error> {
            SortSpec::try_new(
                value.column_name,
                value.sort_order.ascending,
                value.sort_order.nulls_first,
            )
        }
    }

    impl From<SortSpec> for SortSpecSerde {
        fn from(value: SortSpec) -> Self {
            Self {
                column_name: value.column,
                sort_order: SortOrderSerde {
                    ascending: value.ascending,
                    nulls_first: value.nulls_first,
                },
            }
        }
    }
}
