//! Append-only, position-indexed log storage.
//!
//! The log is the source of truth for a partition: the state engine and the
//! exporter pipeline both consume it through independent [`LogReader`]s.
//! Appends store an opaque block covering a position range and report the
//! outcome through an [`AppendListener`] — write first, then commit, and
//! failures via `on_write_error` rather than an error escaping the append
//! call. Commit listeners are a broadcast: every registered listener
//! observes every commit before the next append's commit fires.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use bytes::Bytes;

use crate::error::Error;

/// Callback for the outcome of a single append.
pub trait AppendListener: Send + Sync {
    /// The block was written at the given storage index.
    fn on_write(&self, index: u64);
    /// The block was committed at the given storage index.
    fn on_commit(&self, index: u64);
    /// The append failed; the block was not stored.
    fn on_write_error(&self, error: Error);
}

/// Broadcast notification for committed appends.
pub trait CommitListener: Send + Sync {
    /// A block was committed.
    fn on_commit(&self);
}

/// Forward-only cursor over the log.
///
/// Readers are restartable by creating a new reader and seeking again, and
/// tolerate the log growing after they were opened.
pub trait LogReader: Send {
    /// Positions the cursor at the entry whose lowest position is the
    /// greatest one `<= position`, or at the first entry if none exists.
    /// Never overshoots: a reader resuming mid-entry-boundary re-reads the
    /// covering entry.
    fn seek(&mut self, position: u64);

    /// Returns true if a call to [`LogReader::next_block`] would yield an entry.
    fn has_next(&self) -> bool;

    /// Returns the next entry and advances the cursor.
    fn next_block(&mut self) -> Option<Bytes>;
}

/// Append-only block storage for one partition.
pub trait LogStorage: Send + Sync {
    /// Appends a block covering `[lowest_position, highest_position]` as the
    /// next log entry. The outcome is reported via `listener`; this call
    /// never fails on its own return path.
    fn append(
        &self,
        lowest_position: u64,
        highest_position: u64,
        block: Bytes,
        listener: &dyn AppendListener,
    );

    /// Opens an independent cursor over the log.
    fn new_reader(&self) -> Box<dyn LogReader>;

    /// Registers a commit listener. All registered listeners are notified on
    /// every subsequent commit.
    fn add_commit_listener(&self, listener: Arc<dyn CommitListener>);
}

#[derive(Default)]
struct LogEntries {
    blocks: Vec<Bytes>,
    /// Lowest position of each entry -> index into `blocks`.
    position_index: BTreeMap<u64, usize>,
    highest_position: Option<u64>,
}

/// In-memory [`LogStorage`] implementation.
///
/// Thread-safe via `RwLock`; used by the engine, the exporter, and tests.
/// Appends are expected to come from a single writer (the partition's
/// processing loop), readers may run concurrently.
#[derive(Clone, Default)]
pub struct InMemoryLogStorage {
    entries: Arc<RwLock<LogEntries>>,
    commit_listeners: Arc<RwLock<Vec<Arc<dyn CommitListener>>>>,
}

impl InMemoryLogStorage {
    /// Creates a new empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of entries in the log.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().expect("log lock poisoned").blocks.len()
    }

    /// Returns true if the log holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl LogStorage for InMemoryLogStorage {
    fn append(
        &self,
        lowest_position: u64,
        highest_position: u64,
        block: Bytes,
        listener: &dyn AppendListener,
    ) {
        if lowest_position > highest_position {
            listener.on_write_error(Error::InvalidInput(format!(
                "lowest position {lowest_position} exceeds highest position {highest_position}"
            )));
            return;
        }

        let index = {
            let Ok(mut entries) = self.entries.write() else {
                listener.on_write_error(Error::internal("log lock poisoned"));
                return;
            };

            if let Some(last) = entries.highest_position {
                if lowest_position <= last {
                    listener.on_write_error(Error::InvalidInput(format!(
                        "position {lowest_position} is not beyond the last appended position {last}"
                    )));
                    return;
                }
            }

            entries.blocks.push(block);
            let index = entries.blocks.len() as u64;
            let block_index = entries.blocks.len() - 1;
            entries.position_index.insert(lowest_position, block_index);
            entries.highest_position = Some(highest_position);
            index
        };

        listener.on_write(index);
        listener.on_commit(index);

        // Notify outside the entries lock so listeners may open readers.
        let listeners = self
            .commit_listeners
            .read()
            .map(|l| l.clone())
            .unwrap_or_default();
        for commit_listener in &listeners {
            commit_listener.on_commit();
        }
    }

    fn new_reader(&self) -> Box<dyn LogReader> {
        Box::new(InMemoryLogReader {
            entries: Arc::clone(&self.entries),
            next_index: 0,
        })
    }

    fn add_commit_listener(&self, listener: Arc<dyn CommitListener>) {
        if let Ok(mut listeners) = self.commit_listeners.write() {
            listeners.push(listener);
        }
    }
}

struct InMemoryLogReader {
    entries: Arc<RwLock<LogEntries>>,
    next_index: usize,
}

impl LogReader for InMemoryLogReader {
    fn seek(&mut self, position: u64) {
        let Ok(entries) = self.entries.read() else {
            self.next_index = 0;
            return;
        };
        self.next_index = entries
            .position_index
            .range(..=position)
            .next_back()
            .map_or(0, |(_, &index)| index);
    }

    fn has_next(&self) -> bool {
        self.entries
            .read()
            .map(|entries| self.next_index < entries.blocks.len())
            .unwrap_or(false)
    }

    fn next_block(&mut self) -> Option<Bytes> {
        let entries = self.entries.read().ok()?;
        let block = entries.blocks.get(self.next_index)?.clone();
        self.next_index += 1;
        Some(block)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU64, Ordering};

    #[derive(Default)]
    struct RecordingListener {
        calls: Mutex<Vec<String>>,
    }

    impl AppendListener for RecordingListener {
        fn on_write(&self, index: u64) {
            self.calls
                .lock()
                .unwrap()
                .push(format!("write:{index}"));
        }

        fn on_commit(&self, index: u64) {
            self.calls
                .lock()
                .unwrap()
                .push(format!("commit:{index}"));
        }

        fn on_write_error(&self, error: Error) {
            self.calls.lock().unwrap().push(format!("error:{error}"));
        }
    }

    struct CountingCommitListener(AtomicU64);

    impl CommitListener for CountingCommitListener {
        fn on_commit(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn append_at(log: &InMemoryLogStorage, position: u64) {
        let listener = RecordingListener::default();
        log.append(
            position,
            position,
            Bytes::from(position.to_string()),
            &listener,
        );
        let calls = listener.calls.lock().unwrap();
        assert_eq!(calls.len(), 2, "append at {position} failed: {calls:?}");
    }

    #[test]
    fn write_fires_before_commit() {
        let log = InMemoryLogStorage::new();
        let listener = RecordingListener::default();
        log.append(10, 12, Bytes::from_static(b"abc"), &listener);

        let calls = listener.calls.lock().unwrap();
        assert_eq!(*calls, vec!["write:1".to_string(), "commit:1".to_string()]);
    }

    #[test]
    fn seek_backs_up_to_covering_entry() {
        let log = InMemoryLogStorage::new();
        append_at(&log, 10);
        append_at(&log, 20);
        append_at(&log, 30);

        let mut reader = log.new_reader();
        reader.seek(25);
        assert_eq!(reader.next_block(), Some(Bytes::from("20")));
    }

    #[test]
    fn seek_exact_match_yields_that_entry() {
        let log = InMemoryLogStorage::new();
        append_at(&log, 10);
        append_at(&log, 20);
        append_at(&log, 30);

        let mut reader = log.new_reader();
        reader.seek(30);
        assert_eq!(reader.next_block(), Some(Bytes::from("30")));
    }

    #[test]
    fn seek_before_first_entry_clamps_to_start() {
        let log = InMemoryLogStorage::new();
        append_at(&log, 10);
        append_at(&log, 20);

        let mut reader = log.new_reader();
        reader.seek(5);
        assert_eq!(reader.next_block(), Some(Bytes::from("10")));
    }

    #[test]
    fn reader_is_forward_only_and_exhaustible() {
        let log = InMemoryLogStorage::new();
        append_at(&log, 10);
        append_at(&log, 20);

        let mut reader = log.new_reader();
        reader.seek(0);
        assert!(reader.has_next());
        assert!(reader.next_block().is_some());
        assert!(reader.next_block().is_some());
        assert!(!reader.has_next());
        assert!(reader.next_block().is_none());
    }

    #[test]
    fn reader_sees_entries_appended_after_open() {
        let log = InMemoryLogStorage::new();
        append_at(&log, 10);

        let mut reader = log.new_reader();
        reader.seek(0);
        assert!(reader.next_block().is_some());
        assert!(!reader.has_next());

        append_at(&log, 20);
        assert!(reader.has_next());
        assert_eq!(reader.next_block(), Some(Bytes::from("20")));
    }

    #[test]
    fn non_monotonic_append_reports_via_error_channel() {
        let log = InMemoryLogStorage::new();
        append_at(&log, 10);

        let listener = RecordingListener::default();
        log.append(10, 10, Bytes::from_static(b"dup"), &listener);
        let calls = listener.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].starts_with("error:"));
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn inverted_position_range_is_rejected() {
        let log = InMemoryLogStorage::new();
        let listener = RecordingListener::default();
        log.append(10, 5, Bytes::from_static(b"bad"), &listener);
        let calls = listener.calls.lock().unwrap();
        assert!(calls[0].starts_with("error:"));
        assert!(log.is_empty());
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;
        use std::collections::BTreeSet;

        proptest! {
            #[test]
            fn seek_lands_on_the_greatest_entry_at_or_below_target(
                positions in prop::collection::btree_set(1u64..10_000, 1..32),
                target in 0u64..12_000,
            ) {
                let log = InMemoryLogStorage::new();
                for &position in &positions {
                    append_at(&log, position);
                }

                let mut reader = log.new_reader();
                reader.seek(target);
                let block = reader.next_block().unwrap();
                let landed: u64 = std::str::from_utf8(&block).unwrap().parse().unwrap();

                let expected = floor_entry(&positions, target);
                prop_assert_eq!(landed, expected);
            }
        }

        fn floor_entry(positions: &BTreeSet<u64>, target: u64) -> u64 {
            positions
                .range(..=target)
                .next_back()
                .or_else(|| positions.iter().next())
                .copied()
                .unwrap()
        }
    }

    #[test]
    fn commit_listeners_observe_every_commit() {
        let log = InMemoryLogStorage::new();
        let first = Arc::new(CountingCommitListener(AtomicU64::new(0)));
        let second = Arc::new(CountingCommitListener(AtomicU64::new(0)));
        log.add_commit_listener(first.clone());
        append_at(&log, 10);
        log.add_commit_listener(second.clone());
        append_at(&log, 20);
        append_at(&log, 30);

        assert_eq!(first.0.load(Ordering::SeqCst), 3);
        assert_eq!(second.0.load(Ordering::SeqCst), 2);
    }
}
