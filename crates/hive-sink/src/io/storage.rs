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

//! Storage backends behind [`super::FileIO`].

use opendal::Operator;
#[cfg(feature = "storage-fs")]
use opendal::services::FsConfig;
#[cfg(feature = "storage-memory")]
use opendal::services::MemoryConfig;

use crate::{Error, ErrorKind, Result};

/// The storage carried by [`super::FileIO`].
#[derive(Debug)]
pub(crate) enum Storage {
    /// In-memory storage, shared by all clones of one `FileIO`.
    #[cfg(feature = "storage-memory")]
    Memory(Operator),
    /// Local file system rooted at `/`.
    #[cfg(feature = "storage-fs")]
    LocalFs,
}

impl Storage {
    #[cfg(feature = "storage-memory")]
    pub(crate) fn memory() -> Result<Self> {
        Ok(Self::Memory(
            Operator::from_config(MemoryConfig::default())?.finish(),
        ))
    }

    #[cfg(feature = "storage-fs")]
    pub(crate) fn local_fs() -> Self {
        Self::LocalFs
    }

    /// Creates operator from path.
    ///
    /// # Arguments
    ///
    /// * path: It should be *absolute* path starting with scheme string used to construct [`super::FileIO`].
    ///
    /// # Returns
    ///
    /// The return value consists of two parts:
    ///
    /// * An [`opendal::Operator`] instance used to operate on file.
    /// * Relative path to the root uri of [`opendal::Operator`].
    pub(crate) fn create_operator<'a>(&self, path: &'a str) -> Result<(Operator, &'a str)> {
        match self {
            #[cfg(feature = "storage-memory")]
            Storage::Memory(op) => {
                let relative_path = strip_scheme(path, "memory:/")?;
                Ok((op.clone(), relative_path))
            }
            #[cfg(feature = "storage-fs")]
            Storage::LocalFs => {
                let op = fs_config_build()?;
                let relative_path = strip_scheme(path, "file:/")?;
                Ok((op, relative_path))
            }
        }
    }
}

fn strip_scheme<'a>(path: &'a str, prefix: &str) -> Result<&'a str> {
    if let Some(stripped) = path.strip_prefix(prefix) {
        Ok(stripped.trim_start_matches('/'))
    } else if let Some(stripped) = path.strip_prefix('/') {
        Ok(stripped)
    } else {
        Err(Error::new(
            ErrorKind::DataInvalid,
            format!("Invalid path: {path}, should be absolute or start with {prefix}"),
        ))
    }
}

/// Build new opendal operator for the local file system.
#[cfg(feature = "storage-fs")]
fn fs_config_build() -> Result<Operator> {
    let mut cfg = FsConfig::default();
    cfg.root = Some("/".to_string());

    Ok(Operator::from_config(cfg)?.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_scheme() {
        assert_eq!(strip_scheme("memory:/t/a.parquet", "memory:/").unwrap(), "t/a.parquet");
        assert_eq!(strip_scheme("memory:///t/a.parquet", "memory:/").unwrap(), "t/a.parquet");
        assert_eq!(strip_scheme("/tmp/t/a.parquet", "file:/").unwrap(), "tmp/t/a.parquet");
        assert_eq!(
            strip_scheme("t/a.parquet", "file:/").unwrap_err().kind(),
            ErrorKind::DataInvalid
        );
    }
}
