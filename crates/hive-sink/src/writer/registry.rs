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

//! Output units of a sink and the registry that owns them.

use std::collections::HashMap;

use arrow_array::{RecordBatch, UInt32Array};
use arrow_ord::sort::{LexicographicalComparator, SortColumn};
use arrow_schema::SortOptions;
use arrow_select::concat::concat_batches;
use arrow_select::take::take_record_batch;

use super::file_writer::{FileWriter, FileWriterBuilder, WrittenFile};
use super::partitioning::UnitKey;
use super::CurrentFileStatus;
use crate::io::FileIO;
use crate::{Error, ErrorKind, Result};

/// The rows written to one partition and bucket, and the file they go to.
///
/// Rows of unsorted units are written through to the file writer. Rows of
/// sorted units are buffered until [`OutputUnit::finish`].
pub struct OutputUnit<W: FileWriter> {
    key: UnitKey,
    writer: W,
    sort_columns: Vec<(usize, SortOptions)>,
    buffered: Vec<RecordBatch>,
    row_count: u64,
}

impl<W: FileWriter> OutputUnit<W> {
    fn new(key: UnitKey, writer: W, sort_columns: Vec<(usize, SortOptions)>) -> Self {
        Self {
            key,
            writer,
            sort_columns,
            buffered: vec![],
            row_count: 0,
        }
    }

    /// Key of this unit.
    pub fn key(&self) -> &UnitKey {
        &self.key
    }

    /// Rows accepted so far, buffered or written.
    pub fn row_count(&self) -> u64 {
        self.row_count
    }

    /// Path the file of this unit is written to.
    pub fn file_path(&self) -> String {
        self.writer.current_file_path()
    }

    fn is_sorted(&self) -> bool {
        !self.sort_columns.is_empty()
    }

    /// Accepts rows of this unit.
    pub async fn write(&mut self, batch: RecordBatch) -> Result<()> {
        if batch.num_rows() == 0 {
            return Ok(());
        }
        let num_rows = batch.num_rows() as u64;
        if self.is_sorted() {
            self.buffered.push(batch);
        } else {
            self.writer.write(&batch).await?;
        }
        self.row_count += num_rows;
        Ok(())
    }

    /// Writes buffered rows in sort order and finalizes the file.
    pub async fn finish(self) -> Result<WrittenFile> {
        let Self {
            mut writer,
            sort_columns,
            buffered,
            ..
        } = self;
        if !buffered.is_empty() {
            let sorted = sort_batches(&buffered, &sort_columns)?;
            writer.write(&sorted).await?;
        }
        writer.close().await
    }

    /// Drops buffered rows and removes the partial file.
    pub async fn abort(self) -> Result<()> {
        self.writer.abort().await
    }
}

fn sort_batches(
    batches: &[RecordBatch],
    sort_columns: &[(usize, SortOptions)],
) -> Result<RecordBatch> {
    let Some(first) = batches.first() else {
        return Err(Error::new(ErrorKind::Unexpected, "No rows to sort"));
    };
    let batch = concat_batches(&first.schema(), batches)?;
    let columns = sort_columns
        .iter()
        .map(|(idx, options)| SortColumn {
            values: batch.column(*idx).clone(),
            options: Some(*options),
        })
        .collect::<Vec<_>>();
    let comparator = LexicographicalComparator::try_new(&columns)?;

    // Stable: rows with equal keys keep arrival order.
    let mut indices = (0..batch.num_rows() as u32).collect::<Vec<_>>();
    indices.sort_by(|a, b| comparator.compare(*a as usize, *b as usize));
    Ok(take_record_batch(&batch, &UInt32Array::from(indices))?)
}

/// Arena of the output units of a sink, in creation order.
pub struct OutputUnitRegistry<B: FileWriterBuilder> {
    writer_builder: B,
    file_io: FileIO,
    sort_columns: Vec<(usize, SortOptions)>,
    max_units: usize,

    units: Vec<OutputUnit<B::R>>,
    index: HashMap<UnitKey, usize>,
}

impl<B: FileWriterBuilder> OutputUnitRegistry<B> {
    /// Creates an empty registry.
    ///
    /// `sort_columns` are indices into the written batches with their sort
    /// order; units are sorted when it is not empty. At most `max_units`
    /// units are created.
    pub fn new(
        writer_builder: B,
        file_io: FileIO,
        sort_columns: Vec<(usize, SortOptions)>,
        max_units: usize,
    ) -> Self {
        Self {
            writer_builder,
            file_io,
            sort_columns,
            max_units,
            units: vec![],
            index: HashMap::new(),
        }
    }

    /// Returns the unit of `key`, creating it and its file writer on first use.
    pub async fn unit_for(&mut self, key: &UnitKey) -> Result<&mut OutputUnit<B::R>> {
        if let Some(&idx) = self.index.get(key) {
            return Ok(&mut self.units[idx]);
        }
        if self.units.len() >= self.max_units {
            return Err(Error::new(
                ErrorKind::LimitExceeded,
                format!("Exceeded limit of {} distinct partitions.", self.max_units),
            )
            .with_context("unit", key.to_string()));
        }

        let writer = self.writer_builder.build(key).await?;
        tracing::debug!(
            unit = %key,
            path = %writer.current_file_path(),
            "Created output unit"
        );
        self.index.insert(key.clone(), self.units.len());
        self.units
            .push(OutputUnit::new(key.clone(), writer, self.sort_columns.clone()));
        let idx = self.units.len() - 1;
        Ok(&mut self.units[idx])
    }

    /// Units in creation order.
    pub fn all_units(&self) -> &[OutputUnit<B::R>] {
        &self.units
    }

    /// Number of units.
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Whether no unit was created yet.
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Finalizes every unit that received rows, in creation order, and
    /// aborts the others. The registry is empty afterwards.
    ///
    /// On failure, the remaining units are aborted and files finished so far
    /// are deleted before the error is returned.
    pub async fn finish_all(&mut self) -> Result<Vec<(UnitKey, WrittenFile)>> {
        self.index.clear();
        let mut units = std::mem::take(&mut self.units).into_iter();
        let mut finished = Vec::with_capacity(units.len());

        while let Some(unit) = units.next() {
            if unit.row_count() == 0 {
                abort_unit(unit).await;
                continue;
            }
            let key = unit.key().clone();
            let path = unit.file_path();
            match unit.finish().await {
                Ok(file) => finished.push((key, file)),
                Err(err) => {
                    tracing::warn!(unit = %key, error = %err, "Failed to finish output unit");
                    self.delete_file(&path).await;
                    for unit in units {
                        abort_unit(unit).await;
                    }
                    for (_, file) in &finished {
                        self.delete_file(&file.file_path).await;
                    }
                    return Err(err);
                }
            }
        }
        Ok(finished)
    }

    /// Aborts every unit. Failures to clean up are logged and skipped.
    pub async fn abort_all(&mut self) {
        self.index.clear();
        for unit in std::mem::take(&mut self.units) {
            abort_unit(unit).await;
        }
    }

    async fn delete_file(&self, path: &str) {
        if let Err(err) = self.file_io.delete(path).await {
            tracing::warn!(path, error = %err, "Failed to delete file");
        }
    }
}

async fn abort_unit<W: FileWriter>(unit: OutputUnit<W>) {
    let key = unit.key().clone();
    if let Err(err) = unit.abort().await {
        tracing::warn!(unit = %key, error = %err, "Failed to abort output unit");
    }
}
