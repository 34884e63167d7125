// /////////////////////////////////////////////////////////////////////////////
// HEPCorpus Aggregator
// Copyright (c) 2025 HEPCorpus Contributors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Transaction Log
//!
//! The all-or-nothing layer of the aggregator. A [`Transaction`] is a
//! scratch buffer: a per-file map of pending bytes plus a set of files
//! scheduled for closure. Writers never touch their files directly; they
//! append through the submission's transaction, and nothing reaches the
//! filesystem until [`Transaction::commit`] drains every buffer inside an
//! uninterruptible section.
//!
//! ## Guarantees
//!
//! - **Atomicity against interrupts**: commit runs with SIGINT delivery
//!   masked on platforms that support it; elsewhere commit is unguarded
//!   and the submission-set witness detects torn state on the next run
//! - **Abort is free**: dropping an uncommitted transaction discards the
//!   buffers; no file was modified
//! - **Ordering**: buffers drain in file-registration order, so two
//!   append handles opened against the same path (a writer evicted and
//!   re-created inside one transaction) flush oldest-first
//!
//! The transaction is an explicit value owned by the orchestrator for the
//! lifetime of one submission and threaded through every writer call; a
//! write issued after commit fails with
//! [`CorpusError::NoActiveTransaction`].

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, warn};

use hepcorpus_bootstrap::platform::uninterruptible;
use hepcorpus_domain::CorpusError;

static NEXT_FILE_ID: AtomicU64 = AtomicU64::new(1);

/// Whether a handle carries binary record bytes or newline-framed text.
///
/// The transaction checks every write against the handle mode; a mismatch
/// is a programming error, not a data error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileMode {
    Binary,
    Text,
}

/// An append-only file handle registered with the transaction system.
///
/// Handles are shared (`Rc`) between their owning writer and any
/// transaction that still holds pending bytes or a scheduled close for
/// them: eviction may drop the writer while the current transaction keeps
/// the handle alive until its buffers drain.
pub struct TxFile {
    id: u64,
    mode: FileMode,
    path: PathBuf,
    file: RefCell<File>,
    closed: Cell<bool>,
}

impl TxFile {
    /// Opens (creating if needed) `path` in append mode.
    pub fn open_append(path: &Path, mode: FileMode) -> Result<Rc<Self>, CorpusError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| {
                CorpusError::io_error(format!("cannot open {}: {}", path.display(), e))
            })?;
        Ok(Rc::new(Self {
            id: NEXT_FILE_ID.fetch_add(1, Ordering::Relaxed),
            mode,
            path: path.to_path_buf(),
            file: RefCell::new(file),
            closed: Cell::new(false),
        }))
    }

    pub fn mode(&self) -> FileMode {
        self.mode
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True once a transaction that scheduled this handle for closure has
    /// committed.
    pub fn is_closed(&self) -> bool {
        self.closed.get()
    }
}

struct PendingWrite {
    file: Rc<TxFile>,
    buf: Vec<u8>,
}

/// A scratch buffer of pending writes and scheduled file closures,
/// committed atomically per submission.
pub struct Transaction {
    committed: bool,
    // Keyed by handle id; BTreeMap keeps drain order = registration order.
    pending: BTreeMap<u64, PendingWrite>,
    to_close: BTreeMap<u64, Rc<TxFile>>,
}

impl Transaction {
    /// Starts an empty transaction.
    pub fn begin() -> Self {
        debug!("transaction started");
        Self {
            committed: false,
            pending: BTreeMap::new(),
            to_close: BTreeMap::new(),
        }
    }

    fn ensure_active(&self, operation: &str) -> Result<(), CorpusError> {
        if self.committed {
            Err(CorpusError::NoActiveTransaction(format!(
                "{} issued after commit",
                operation
            )))
        } else {
            Ok(())
        }
    }

    fn buffer_for(&mut self, file: &Rc<TxFile>) -> &mut Vec<u8> {
        &mut self
            .pending
            .entry(file.id)
            .or_insert_with(|| PendingWrite {
                file: Rc::clone(file),
                buf: Vec::new(),
            })
            .buf
    }

    /// Buffers record bytes for a binary handle.
    pub fn write_binary(&mut self, file: &Rc<TxFile>, bytes: &[u8]) -> Result<(), CorpusError> {
        self.ensure_active("binary write")?;
        if file.mode() != FileMode::Binary {
            return Err(CorpusError::ModeMismatch(format!(
                "binary write to text handle {}",
                file.path().display()
            )));
        }
        self.buffer_for(file).extend_from_slice(bytes);
        Ok(())
    }

    /// Buffers UTF-8 text for a text handle.
    pub fn write_text(&mut self, file: &Rc<TxFile>, text: &str) -> Result<(), CorpusError> {
        self.ensure_active("text write")?;
        if file.mode() != FileMode::Text {
            return Err(CorpusError::ModeMismatch(format!(
                "text write to binary handle {}",
                file.path().display()
            )));
        }
        self.buffer_for(file).extend_from_slice(text.as_bytes());
        Ok(())
    }

    /// Schedules `file` for closure at commit.
    pub fn schedule_close(&mut self, file: &Rc<TxFile>) -> Result<(), CorpusError> {
        self.ensure_active("close")?;
        self.to_close.insert(file.id, Rc::clone(file));
        Ok(())
    }

    /// Total bytes currently buffered across all handles.
    pub fn pending_bytes(&self) -> usize {
        self.pending.values().map(|p| p.buf.len()).sum()
    }

    /// Drains every buffer with synchronous writes, then marks every
    /// scheduled handle closed, all inside an uninterruptible section.
    pub fn commit(&mut self) -> Result<(), CorpusError> {
        self.ensure_active("commit")?;

        let pending = std::mem::take(&mut self.pending);
        let to_close = std::mem::take(&mut self.to_close);
        let bytes: usize = pending.values().map(|p| p.buf.len()).sum();

        uninterruptible(|| -> Result<(), CorpusError> {
            self.committed = true;
            for write in pending.into_values() {
                let mut file = write.file.file.borrow_mut();
                file.write_all(&write.buf).map_err(|e| {
                    CorpusError::io_error(format!(
                        "commit failed writing {}: {}",
                        write.file.path().display(),
                        e
                    ))
                })?;
                file.flush().map_err(|e| {
                    CorpusError::io_error(format!(
                        "commit failed flushing {}: {}",
                        write.file.path().display(),
                        e
                    ))
                })?;
            }
            for file in to_close.into_values() {
                file.closed.set(true);
            }
            Ok(())
        })?;

        debug!(bytes, "transaction committed");
        Ok(())
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        if !self.committed && !self.pending.is_empty() {
            warn!(
                bytes = self.pending_bytes(),
                "transaction dropped without commit; buffered writes discarded"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_writes_buffer_until_commit() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.txt");
        let file = TxFile::open_append(&path, FileMode::Text).unwrap();

        let mut txn = Transaction::begin();
        txn.write_text(&file, "alpha\n").unwrap();
        txn.write_text(&file, "beta\n").unwrap();
        assert_eq!(txn.pending_bytes(), 11);

        // Nothing hits the file before commit.
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");

        txn.commit().unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "alpha\nbeta\n");
    }

    #[test]
    fn test_dropped_transaction_discards_buffers() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.bin");
        let file = TxFile::open_append(&path, FileMode::Binary).unwrap();

        {
            let mut txn = Transaction::begin();
            txn.write_binary(&file, &[1, 2, 3]).unwrap();
        }

        assert_eq!(std::fs::read(&path).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn test_mode_mismatch_is_rejected() {
        let dir = TempDir::new().unwrap();
        let binary = TxFile::open_append(&dir.path().join("r.bin"), FileMode::Binary).unwrap();
        let text = TxFile::open_append(&dir.path().join("s.txt"), FileMode::Text).unwrap();

        let mut txn = Transaction::begin();
        let err = txn.write_text(&binary, "nope").unwrap_err();
        assert_eq!(err.category(), "transaction");
        let err = txn.write_binary(&text, &[0]).unwrap_err();
        assert_eq!(err.category(), "transaction");
    }

    #[test]
    fn test_write_after_commit_fails() {
        let dir = TempDir::new().unwrap();
        let file = TxFile::open_append(&dir.path().join("d.txt"), FileMode::Text).unwrap();

        let mut txn = Transaction::begin();
        txn.commit().unwrap();

        let err = txn.write_text(&file, "late").unwrap_err();
        assert!(matches!(err, CorpusError::NoActiveTransaction(_)));
        let err = txn.commit().unwrap_err();
        assert!(matches!(err, CorpusError::NoActiveTransaction(_)));
    }

    #[test]
    fn test_scheduled_close_applies_at_commit() {
        let dir = TempDir::new().unwrap();
        let file = TxFile::open_append(&dir.path().join("d.txt"), FileMode::Text).unwrap();

        let mut txn = Transaction::begin();
        txn.write_text(&file, "tail").unwrap();
        txn.schedule_close(&file).unwrap();
        assert!(!file.is_closed());

        txn.commit().unwrap();
        assert!(file.is_closed());
        assert_eq!(
            std::fs::read_to_string(dir.path().join("d.txt")).unwrap(),
            "tail"
        );
    }

    #[test]
    fn test_buffers_drain_in_registration_order() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("shared.bin");

        // Two append handles on the same path, as after an eviction and
        // re-creation inside one transaction.
        let older = TxFile::open_append(&path, FileMode::Binary).unwrap();
        let newer = TxFile::open_append(&path, FileMode::Binary).unwrap();

        let mut txn = Transaction::begin();
        txn.write_binary(&newer, b"late").unwrap();
        txn.write_binary(&older, b"early-").unwrap();
        txn.commit().unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"early-late");
    }
}
