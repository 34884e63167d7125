// /////////////////////////////////////////////////////////////////////////////
// HEPCorpus Aggregator
// Copyright (c) 2025 HEPCorpus Contributors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # String-Set Store
//!
//! A persistent unordered set of non-empty strings, one per line. The
//! aggregator uses it as the submission-id ledger: membership gates
//! idempotency, and the append goes through the submission's transaction
//! so it becomes the commit witness.
//!
//! The on-disk representation never starts or ends with a stray newline:
//! `add` writes a leading separator only when the file already has
//! content.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use hepcorpus_domain::CorpusError;

use super::transaction::{FileMode, Transaction, TxFile};

/// Persistent set of newline-separated strings.
pub struct StringSetStore {
    path: PathBuf,
    file: Rc<TxFile>,
    strings: HashSet<String>,
    has_content: bool,
}

impl StringSetStore {
    /// Opens the store at `path`, loading existing entries into memory.
    pub fn open(path: &Path) -> Result<Self, CorpusError> {
        let mut strings = HashSet::new();
        let mut has_content = false;

        if path.exists() {
            let content = fs::read_to_string(path).map_err(|e| {
                CorpusError::io_error(format!("cannot read {}: {}", path.display(), e))
            })?;
            has_content = !content.is_empty();
            for line in content.split('\n') {
                if !line.trim().is_empty() {
                    strings.insert(line.to_string());
                }
            }
        }

        let file = TxFile::open_append(path, FileMode::Text)?;
        Ok(Self {
            path: path.to_path_buf(),
            file,
            strings,
            has_content,
        })
    }

    /// O(1) membership test against the in-memory set.
    pub fn contains(&self, string: &str) -> bool {
        self.strings.contains(string)
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Adds `string` through `txn`; a no-op if it is already present.
    pub fn add(&mut self, string: &str, txn: &mut Transaction) -> Result<(), CorpusError> {
        if string.trim().is_empty() {
            return Err(CorpusError::schema_error(
                "empty strings are not allowed in the set store",
            ));
        }
        if string.contains('\n') {
            return Err(CorpusError::schema_error(format!(
                "set store strings cannot contain newlines: {:?}",
                string
            )));
        }
        if self.strings.contains(string) {
            return Ok(());
        }

        let mut line = String::new();
        if self.has_content {
            line.push('\n');
        }
        line.push_str(string);
        txn.write_text(&self.file, &line)?;

        self.strings.insert(string.to_string());
        self.has_content = true;
        Ok(())
    }

    /// Schedules the backing file for closure through `txn`.
    pub fn close(&self, txn: &mut Transaction) -> Result<(), CorpusError> {
        txn.schedule_close(&self.file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_no_leading_or_trailing_delimiters() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("submissions.txt");

        let mut store = StringSetStore::open(&path).unwrap();
        let mut txn = Transaction::begin();
        store.add("ins42", &mut txn).unwrap();
        txn.commit().unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "ins42");

        let mut txn = Transaction::begin();
        store.add("ins43", &mut txn).unwrap();
        txn.commit().unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "ins42\nins43");
    }

    #[test]
    fn test_two_adds_in_one_transaction_stay_separated() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("submissions.txt");

        let mut store = StringSetStore::open(&path).unwrap();
        let mut txn = Transaction::begin();
        store.add("ins1", &mut txn).unwrap();
        store.add("ins2", &mut txn).unwrap();
        txn.commit().unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "ins1\nins2");
    }

    #[test]
    fn test_reload_and_membership() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("submissions.txt");
        fs::write(&path, "ins7\nins8").unwrap();

        let store = StringSetStore::open(&path).unwrap();
        assert_eq!(store.len(), 2);
        assert!(store.contains("ins7"));
        assert!(store.contains("ins8"));
        assert!(!store.contains("ins9"));
    }

    #[test]
    fn test_duplicate_add_is_noop() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("submissions.txt");

        let mut store = StringSetStore::open(&path).unwrap();
        let mut txn = Transaction::begin();
        store.add("ins42", &mut txn).unwrap();
        store.add("ins42", &mut txn).unwrap();
        txn.commit().unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "ins42");
    }

    #[test]
    fn test_invalid_strings_rejected() {
        let dir = TempDir::new().unwrap();
        let mut store = StringSetStore::open(&dir.path().join("s.txt")).unwrap();
        let mut txn = Transaction::begin();

        assert!(store.add("  ", &mut txn).is_err());
        assert!(store.add("a\nb", &mut txn).is_err());
    }
}
