//! Checkpointed batch writer
//!
//! Records are buffered and appended to the board's table in batches of
//! `batch_size`. A failed flush keeps the batch so the next flush retries it;
//! a process that dies mid-batch loses at most the unflushed records.

use crate::state::PostRecord;
use crate::storage::{PostTable, StorageResult};

/// Buffers records for one board table and flushes them in batches
pub struct CheckpointWriter<'a, T: PostTable + ?Sized> {
    store: &'a mut T,
    table: String,
    batch: Vec<PostRecord>,
    batch_size: usize,
    flushes: Vec<usize>,
}

impl<'a, T: PostTable + ?Sized> CheckpointWriter<'a, T> {
    pub fn new(store: &'a mut T, table: impl Into<String>, batch_size: usize) -> Self {
        let batch_size = batch_size.max(1);
        Self {
            store,
            table: table.into(),
            batch: Vec::with_capacity(batch_size),
            batch_size,
            flushes: Vec::new(),
        }
    }

    /// Adds a record to the current batch
    pub fn append(&mut self, record: PostRecord) {
        self.batch.push(record);
    }

    /// Flushes if the batch holds at least `batch_size` records
    ///
    /// Returns true if a flush happened.
    pub fn flush_if_full(&mut self) -> StorageResult<bool> {
        if self.batch.len() < self.batch_size {
            return Ok(false);
        }
        self.flush()?;
        Ok(true)
    }

    /// Flushes whatever is buffered, however small
    pub fn flush_remainder(&mut self) -> StorageResult<()> {
        self.flush()
    }

    fn flush(&mut self) -> StorageResult<()> {
        if self.batch.is_empty() {
            return Ok(());
        }

        let write_header = !self.store.table_exists(&self.table)?;
        self.store
            .append_rows(&self.table, &self.batch, write_header)?;

        let size = self.batch.len();
        self.flushes.push(size);
        self.batch.clear();

        tracing::info!(
            "Flushed {} records to {} ({} total)",
            size,
            self.table,
            self.persisted()
        );
        Ok(())
    }

    /// Records waiting for the next flush
    pub fn pending(&self) -> usize {
        self.batch.len()
    }

    /// Sizes of the successful flushes, in order
    pub fn flushes(&self) -> &[usize] {
        &self.flushes
    }

    /// Records written by this writer
    pub fn persisted(&self) -> usize {
        self.flushes.iter().sum()
    }
}
