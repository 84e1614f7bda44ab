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

use std::backtrace::{Backtrace, BacktraceStatus};
use std::fmt;
use std::fmt::{Debug, Display, Formatter};

/// Result that is a wrapper of `Result<T, hive_sink::Error>`
pub type Result<T> = std::result::Result<T, Error>;

/// ErrorKind is all kinds of Error returned by the sink and its metadata types.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// A sort or bucketing specification violates one of its invariants.
    ///
    /// Only raised while constructing (or deserializing) a spec, and while
    /// binding a spec to the schema of a new sink.
    ValidationError,

    /// The sink is not running, so it can't accept more data.
    InvalidState,

    /// The requested terminal transition is not reachable from the current
    /// terminal state, e.g. aborting a committed sink.
    InvalidTransition,

    /// The file encoder or the underlying storage failed while writing or
    /// finalizing a file.
    WriteFailure,

    /// Input data doesn't match what the sink was configured with.
    DataInvalid,

    /// The requested feature (file format, column type for hashing, storage
    /// scheme) is not supported.
    FeatureUnsupported,

    /// A per-writer limit, such as the number of open output files, was hit.
    LimitExceeded,

    /// Something happened that we don't know how to classify.
    Unexpected,
}

impl ErrorKind {
    /// Convert self into static str.
    pub fn into_static(self) -> &'static str {
        self.into()
    }
}

impl From<ErrorKind> for &'static str {
    fn from(v: ErrorKind) -> &'static str {
        match v {
            ErrorKind::ValidationError => "ValidationError",
            ErrorKind::InvalidState => "InvalidState",
            ErrorKind::InvalidTransition => "InvalidTransition",
            ErrorKind::WriteFailure => "WriteFailure",
            ErrorKind::DataInvalid => "DataInvalid",
            ErrorKind::FeatureUnsupported => "FeatureUnsupported",
            ErrorKind::LimitExceeded => "LimitExceeded",
            ErrorKind::Unexpected => "Unexpected",
        }
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.into_static())
    }
}

/// Error is the error struct returned by all hive-sink functions.
///
/// `Display` renders a single line:
///
/// ```shell
/// WriteFailure, context: { path: /warehouse/t/000001_0_q.parquet } => failed to close parquet writer, source: io error
/// ```
///
/// `Debug` renders the same information over multiple lines, followed by the
/// backtrace when `RUST_BACKTRACE` is enabled.
pub struct Error {
    kind: ErrorKind,
    message: String,

    context: Vec<(&'static str, String)>,

    source: Option<anyhow::Error>,
    backtrace: Backtrace,
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;

        if !self.context.is_empty() {
            let context = self
                .context
                .iter()
                .map(|(k, v)| format!("{k}: {v}"))
                .collect::<Vec<_>>()
                .join(", ");
            write!(f, ", context: {{ {context} }}")?;
        }

        if !self.message.is_empty() {
            write!(f, " => {}", self.message)?;
        }

        if let Some(source) = &self.source {
            write!(f, ", source: {source}")?;
        }

        Ok(())
    }
}

impl Debug for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            return f
                .debug_struct("Error")
                .field("kind", &self.kind)
                .field("message", &self.message)
                .field("context", &self.context)
                .field("source", &self.source)
                .field("backtrace", &self.backtrace)
                .finish();
        }

        write!(f, "{}", self.kind)?;
        if !self.message.is_empty() {
            write!(f, " => {}", self.message)?;
        }
        writeln!(f)?;

        if !self.context.is_empty() {
            writeln!(f)?;
            writeln!(f, "Context:")?;
            for (k, v) in self.context.iter() {
                writeln!(f, "   {k}: {v}")?;
            }
        }
        if let Some(source) = &self.source {
            writeln!(f)?;
            writeln!(f, "Source: {source:#}")?;
        }

        if self.backtrace.status() == BacktraceStatus::Captured {
            writeln!(f)?;
            writeln!(f, "Backtrace:")?;
            writeln!(f, "{}", self.backtrace)?;
        }

        Ok(())
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|v| v.as_ref())
    }
}

impl Error {
    /// Create a new Error with error kind and message.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            context: Vec::default(),

            source: None,
            // Capturing is free unless RUST_BACKTRACE is set.
            backtrace: Backtrace::capture(),
        }
    }

    /// Add more context in error.
    pub fn with_context(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.context.push((key, value.into()));
        self
    }

    /// Set source for error.
    ///
    /// # Notes
    ///
    /// Setting the source twice panics in debug builds.
    pub fn with_source(mut self, src: impl Into<anyhow::Error>) -> Self {
        debug_assert!(self.source.is_none(), "the source error has been set");

        self.source = Some(src.into());
        self
    }

    #[cfg(test)]
    fn with_backtrace(mut self, backtrace: Backtrace) -> Self {
        self.backtrace = backtrace;
        self
    }

    /// Return error's backtrace.
    ///
    /// Use `format!("{err:?}")` to print the error together with its backtrace.
    pub fn backtrace(&self) -> &Backtrace {
        &self.backtrace
    }

    /// Return error's kind.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Return error's message.
    #[inline]
    pub fn message(&self) -> &str {
        self.message.as_str()
    }
}

macro_rules! define_from_err {
    ($source: path, $error_kind: path, $msg: expr) => {
        impl std::convert::From<$source> for crate::error::Error {
            fn from(v: $source) -> Self {
                Self::new($error_kind, $msg).with_source(v)
            }
        }
    };
}

define_from_err!(
    opendal::Error,
    ErrorKind::WriteFailure,
    "Failure in doing io operation"
);

define_from_err!(
    parquet::errors::ParquetError,
    ErrorKind::WriteFailure,
    "Failure in parquet encoding"
);

define_from_err!(
    arrow_schema::ArrowError,
    ErrorKind::DataInvalid,
    "Arrow compute error"
);

define_from_err!(
    serde_json::Error,
    ErrorKind::DataInvalid,
    "Failed to convert from or to json"
);

define_from_err!(std::io::Error, ErrorKind::Unexpected, "IO Operation failed");

/// Returns a `ValidationError` built from a format string unless the
/// condition holds.
///
/// ```ignore
/// ensure_valid!(!column.is_empty(), "sort column must be set");
/// ```
#[macro_export]
macro_rules! ensure_valid {
    ($cond: expr, $($arg:tt)*) => {
        if !$cond {
            return Err($crate::Error::new(
                $crate::ErrorKind::ValidationError,
                format!($($arg)*),
            ));
        }
    };
}
