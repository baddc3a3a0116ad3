//! The exporter: tails the log and drives the projection handlers.
//!
//! The exporter owns an independent log reader and a bookmark: the position
//! of the next record to export. One export round reads every available
//! record past the bookmark, folds them through the handlers, and executes
//! the resulting batch. The bookmark advances only after the batch is
//! applied; on any failure the handler caches are discarded and the reader
//! rewinds, so the same records are re-read on the next round and land as
//! idempotent writes.

use std::sync::Arc;
use std::time::Instant;

use strand_core::log::{CommitListener, LogReader, LogStorage};
use strand_core::observability::export_span;
use strand_core::Record;
use tokio::sync::Notify;
use tracing::{debug, warn};

use crate::batch::BatchRequest;
use crate::error::Result;
use crate::handler::DynExportHandler;
use crate::handlers::default_handlers;
use crate::metrics::ExporterMetrics;
use crate::store::ReadStore;

/// Wakes the exporter when the log commits a new entry.
pub struct CommitNotifier {
    notify: Arc<Notify>,
}

impl CommitNotifier {
    /// Creates a notifier around the given handle. Register the result with
    /// [`LogStorage::add_commit_listener`].
    #[must_use]
    pub fn new(notify: Arc<Notify>) -> Arc<Self> {
        Arc::new(Self { notify })
    }
}

impl CommitListener for CommitNotifier {
    fn on_commit(&self) {
        self.notify.notify_one();
    }
}

/// Tails one partition's log into the read store.
pub struct Exporter {
    partition_id: u16,
    reader: Box<dyn LogReader>,
    handlers: Vec<Box<dyn DynExportHandler>>,
    store: Arc<dyn ReadStore>,
    /// Position of the next record to export.
    next_position: u64,
    metrics: ExporterMetrics,
}

impl Exporter {
    /// Creates an exporter with the default handler set, starting at the
    /// beginning of the log.
    #[must_use]
    pub fn new(partition_id: u16, storage: &dyn LogStorage, store: Arc<dyn ReadStore>) -> Self {
        Self::with_handlers(partition_id, storage, store, default_handlers())
    }

    /// Creates an exporter with an explicit handler set.
    #[must_use]
    pub fn with_handlers(
        partition_id: u16,
        storage: &dyn LogStorage,
        store: Arc<dyn ReadStore>,
        handlers: Vec<Box<dyn DynExportHandler>>,
    ) -> Self {
        let mut reader = storage.new_reader();
        reader.seek(0);
        Self {
            partition_id,
            reader,
            handlers,
            store,
            next_position: 0,
            metrics: ExporterMetrics::new(),
        }
    }

    /// Position of the next record to export.
    #[must_use]
    pub const fn next_position(&self) -> u64 {
        self.next_position
    }

    /// Exports every record currently available past the bookmark.
    ///
    /// Returns the number of exported records; zero means the exporter is
    /// caught up.
    ///
    /// # Errors
    ///
    /// Returns an error when a block cannot be decoded, a handler fails, or
    /// the store refuses the batch. The bookmark does not advance; calling
    /// again retries the same records.
    pub async fn export_available(&mut self) -> Result<usize> {
        let records = {
            let span = export_span("collect", self.partition_id, self.next_position);
            let _guard = span.enter();
            self.collect_available()?
        };
        if records.is_empty() {
            return Ok(0);
        }
        self.metrics.record_read(records.len());

        match self.project(&records).await {
            Ok(()) => {
                let highest = records.last().map_or(self.next_position, |r| r.position);
                self.next_position = highest + 1;
                self.metrics.set_position(highest);
                debug!(
                    partition = self.partition_id,
                    exported = records.len(),
                    position = highest,
                    "export round finished"
                );
                Ok(records.len())
            }
            Err(error) => {
                warn!(
                    partition = self.partition_id,
                    position = self.next_position,
                    %error,
                    "export round failed, rewinding"
                );
                for handler in &mut self.handlers {
                    handler.reset();
                }
                self.reader.seek(self.next_position);
                Err(error)
            }
        }
    }

    /// Runs export rounds until an error occurs, waking on log commits.
    ///
    /// # Errors
    ///
    /// Propagates the first export failure; the caller decides whether to
    /// back off and resume.
    pub async fn run(&mut self, notify: Arc<Notify>) -> Result<()> {
        loop {
            while self.export_available().await? > 0 {}
            notify.notified().await;
        }
    }

    fn collect_available(&mut self) -> Result<Vec<Record>> {
        let mut records = Vec::new();
        while let Some(block) = self.reader.next_block() {
            for record in Record::decode_block(&block)? {
                // a rewound reader may re-yield the covering entry
                if record.position < self.next_position {
                    continue;
                }
                records.push(record);
            }
        }
        Ok(records)
    }

    async fn project(&mut self, records: &[Record]) -> Result<()> {
        for record in records {
            for handler in &mut self.handlers {
                if handler.handles(record) {
                    handler.process(record, self.store.as_ref()).await?;
                }
            }
        }

        let mut batch = BatchRequest::new();
        for handler in &mut self.handlers {
            handler.flush_batch(&mut batch)?;
        }
        if batch.is_empty() {
            return Ok(());
        }

        let ops = batch.len();
        let started = Instant::now();
        match self.store.execute(batch).await {
            Ok(()) => {
                self.metrics.record_batch("success", ops, started.elapsed());
                Ok(())
            }
            Err(error) => {
                self.metrics.record_batch("failure", ops, started.elapsed());
                Err(error)
            }
        }
    }
}
