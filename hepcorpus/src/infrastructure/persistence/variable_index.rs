// /////////////////////////////////////////////////////////////////////////////
// HEPCorpus Aggregator
// Copyright (c) 2025 HEPCorpus Contributors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Variable Index
//!
//! JSON-backed mapping from variable name to that variable's on-disk
//! directory and committed record count. `variables.json` holds a single
//! object `{var_name: {dirName, recordCount}}` and is rewritten in place
//! inside an uninterruptible section.
//!
//! ## Directory naming
//!
//! A variable's directory name is its name stripped to alphanumerics plus
//! space, dot and underscore, suffixed with ` - ` and the last 6 hex
//! nibbles of the variable's SHA-1. The directory is placed under a
//! two-character subdirectory equal to the last two hex digits of the same
//! hash, capping per-directory fan-out on large corpora:
//!
//! ```text
//! PT (GeV)  →  <root>/7f/PT GeV - 93b77f/
//! ```
//!
//! Invariant: a variable directory exists on disk iff the variable key
//! exists in the index, so allocation (index rewrite + directory creation)
//! runs as one uninterruptible unit.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use tracing::debug;

use hepcorpus_bootstrap::platform::uninterruptible;
use hepcorpus_domain::CorpusError;

/// One entry of `variables.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableEntry {
    #[serde(rename = "dirName")]
    pub dir_name: String,
    #[serde(rename = "recordCount")]
    pub record_count: u64,
}

/// Mapping variable-name → on-disk directory, persisted as a single JSON
/// object.
pub struct VariableIndex {
    root: PathBuf,
    path: PathBuf,
    read_only: bool,
    index: BTreeMap<String, VariableEntry>,
}

impl VariableIndex {
    /// Opens (or initializes) the index stored as `<root>/<file_name>`.
    pub fn open(root: &Path, file_name: &str) -> Result<Self, CorpusError> {
        Self::open_with_mode(root, file_name, false)
    }

    /// Opens the index without permitting new variable allocations.
    pub fn open_read_only(root: &Path, file_name: &str) -> Result<Self, CorpusError> {
        Self::open_with_mode(root, file_name, true)
    }

    fn open_with_mode(root: &Path, file_name: &str, read_only: bool) -> Result<Self, CorpusError> {
        let path = root.join(file_name);
        let index = if path.exists() {
            let content = fs::read_to_string(&path).map_err(|e| {
                CorpusError::io_error(format!("cannot read {}: {}", path.display(), e))
            })?;
            serde_json::from_str(&content)?
        } else {
            BTreeMap::new()
        };
        Ok(Self {
            root: root.to_path_buf(),
            path,
            read_only,
            index,
        })
    }

    /// Returns the absolute directory for `var`, allocating (and creating)
    /// it on first use.
    pub fn directory_for(&mut self, var: &str) -> Result<PathBuf, CorpusError> {
        if let Some(entry) = self.index.get(var) {
            return Ok(self.root.join(&entry.dir_name));
        }
        if self.read_only {
            return Err(CorpusError::ReadOnlyVariable(var.to_string()));
        }

        let hash = short_hash(var);
        let dir_name = shard_prefix(&safe_filename(var, &hash), &hash);
        let full_path = self.root.join(&dir_name);

        // The index rewrite and the directory creation are one unit: a
        // directory must exist iff its variable is indexed.
        uninterruptible(|| -> Result<(), CorpusError> {
            self.index.insert(
                var.to_string(),
                VariableEntry {
                    dir_name: dir_name.clone(),
                    record_count: 0,
                },
            );
            self.save()?;
            fs::create_dir_all(&full_path).map_err(|e| {
                CorpusError::io_error(format!("cannot create {}: {}", full_path.display(), e))
            })?;
            Ok(())
        })?;

        debug!(variable = var, directory = %full_path.display(), "allocated variable directory");
        Ok(full_path)
    }

    /// Adds `delta` to the committed record count of `var` and rewrites
    /// the index file.
    pub fn update_count(&mut self, var: &str, delta: u64) -> Result<(), CorpusError> {
        let entry = self.index.get_mut(var).ok_or_else(|| {
            CorpusError::internal_error(format!("count update for unknown variable {:?}", var))
        })?;
        entry.record_count += delta;
        uninterruptible(|| self.save())
    }

    fn save(&self) -> Result<(), CorpusError> {
        let json = serde_json::to_string(&self.index)?;
        fs::write(&self.path, json).map_err(|e| {
            CorpusError::io_error(format!("cannot write {}: {}", self.path.display(), e))
        })
    }

    pub fn record_count(&self, var: &str) -> Option<u64> {
        self.index.get(var).map(|e| e.record_count)
    }

    pub fn contains(&self, var: &str) -> bool {
        self.index.contains_key(var)
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Iterates `(variable name, entry)` in name order.
    pub fn entries(&self) -> impl Iterator<Item = (&String, &VariableEntry)> {
        self.index.iter()
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Last 6 hex nibbles of the SHA-1 of `string`.
fn short_hash(string: &str) -> String {
    let digest = hex::encode(Sha1::digest(string.as_bytes()));
    digest[digest.len() - 6..].to_string()
}

/// A directory name without too many strange characters, suitable for a
/// variable.
fn safe_filename(var: &str, hash: &str) -> String {
    let safe: String = var
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '.' | '_'))
        .collect();
    // The hash keeps near-identical variable names apart.
    format!("{} - {}", safe, hash)
}

/// Nests `dir_name` under a two-hex-digit subdirectory so no single
/// directory accumulates thousands of entries.
fn shard_prefix(dir_name: &str, hash: &str) -> String {
    format!("{}/{}", &hash[hash.len() - 2..], dir_name)
}
