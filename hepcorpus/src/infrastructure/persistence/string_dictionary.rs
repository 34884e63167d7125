// /////////////////////////////////////////////////////////////////////////////
// HEPCorpus Aggregator
// Copyright (c) 2025 HEPCorpus Contributors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # String Dictionary
//!
//! Per-variable append-only table mapping strings to small integers, so
//! records can carry a varint id instead of a repeated label.
//!
//! The backing file holds one string per line; the 1-based line number is
//! the id. Id 0 is reserved for the empty string and never appears in the
//! file. Appends go through the active transaction, so a dictionary entry
//! becomes durable together with the records that reference it.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use hepcorpus_domain::CorpusError;

use super::transaction::{FileMode, Transaction, TxFile};

/// Append-only string-to-id mapping backed by a line-per-string file.
pub struct StringDictionary {
    path: PathBuf,
    file: Rc<TxFile>,
    ids: HashMap<String, u64>,
    // strings[id] is the string for that id; strings[0] is always "".
    strings: Vec<String>,
}

impl StringDictionary {
    /// Opens the dictionary at `path`, loading any existing entries.
    ///
    /// A missing or empty file is an empty dictionary holding only id 0.
    pub fn open(path: &Path) -> Result<Self, CorpusError> {
        let mut strings = vec![String::new()];
        let mut ids = HashMap::new();
        ids.insert(String::new(), 0);

        if path.exists() {
            let content = fs::read_to_string(path).map_err(|e| {
                CorpusError::io_error(format!("cannot read {}: {}", path.display(), e))
            })?;
            for line in content.split('\n') {
                if !line.is_empty() {
                    ids.insert(line.to_string(), strings.len() as u64);
                    strings.push(line.to_string());
                }
            }
        }

        let file = TxFile::open_append(path, FileMode::Text)?;
        Ok(Self {
            path: path.to_path_buf(),
            file,
            ids,
            strings,
        })
    }

    /// Returns the id of `string`, appending it through `txn` if new.
    pub fn id_for(&mut self, string: &str, txn: &mut Transaction) -> Result<u64, CorpusError> {
        if let Some(id) = self.ids.get(string) {
            return Ok(*id);
        }
        if string.contains('\n') {
            return Err(CorpusError::schema_error(format!(
                "dictionary strings cannot contain newlines: {:?}",
                string
            )));
        }

        let id = self.strings.len() as u64;
        txn.write_text(&self.file, &format!("{}\n", string))?;
        self.ids.insert(string.to_string(), id);
        self.strings.push(string.to_string());
        Ok(id)
    }

    /// Looks up the string for `id`.
    pub fn string_for(&self, id: u64) -> Option<&str> {
        self.strings.get(id as usize).map(String::as_str)
    }

    /// Number of known ids, id 0 included.
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        // Id 0 always exists; empty means no stored strings.
        self.strings.len() == 1
    }

    pub fn path(&self) -> &Path {
        &self.path
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
    fn test_empty_dictionary_has_only_id_zero() {
        let dir = TempDir::new().unwrap();
        let dict = StringDictionary::open(&dir.path().join("strings.txt")).unwrap();
        assert_eq!(dict.len(), 1);
        assert!(dict.is_empty());
        assert_eq!(dict.string_for(0), Some(""));
        assert_eq!(dict.string_for(1), None);
    }

    #[test]
    fn test_ids_are_line_numbers() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("strings.txt");
        let mut dict = StringDictionary::open(&path).unwrap();
        let mut txn = Transaction::begin();

        assert_eq!(dict.id_for("", &mut txn).unwrap(), 0);
        assert_eq!(dict.id_for("stat", &mut txn).unwrap(), 1);
        assert_eq!(dict.id_for("sys", &mut txn).unwrap(), 2);
        assert_eq!(dict.id_for("stat", &mut txn).unwrap(), 1);
        txn.commit().unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "stat\nsys\n");

        // Reopening assigns the same ids from the file contents.
        let reopened = StringDictionary::open(&path).unwrap();
        assert_eq!(reopened.len(), 3);
        assert_eq!(reopened.string_for(1), Some("stat"));
        assert_eq!(reopened.string_for(2), Some("sys"));
    }

    #[test]
    fn test_newlines_are_rejected() {
        let dir = TempDir::new().unwrap();
        let mut dict = StringDictionary::open(&dir.path().join("strings.txt")).unwrap();
        let mut txn = Transaction::begin();

        let err = dict.id_for("two\nlines", &mut txn).unwrap_err();
        assert_eq!(err.category(), "schema");
        // The failed insert must not leak an id.
        assert_eq!(dict.len(), 1);
    }

    #[test]
    fn test_uncommitted_entries_stay_in_memory_only() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("strings.txt");
        let mut dict = StringDictionary::open(&path).unwrap();

        {
            let mut txn = Transaction::begin();
            dict.id_for("orphan", &mut txn).unwrap();
            // dropped without commit
        }
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");
    }
}
