// /////////////////////////////////////////////////////////////////////////////
// HEPCorpus Aggregator
// Copyright (c) 2025 HEPCorpus Contributors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Corpus Checker
//!
//! Walks the variable index and parses every variable's `records.bin`
//! under the stream grammar, verifying:
//!
//! - the variable directory and record file exist
//! - the stream decodes cleanly until EOF
//! - every error `label_id` is a valid index into that variable's string
//!   dictionary
//! - the summed `record_count` over all groups equals the index's
//!   `recordCount`
//!
//! The index is opened read-only; checking never allocates directories.

use std::fs;
use std::path::Path;

use tracing::debug;

use hepcorpus_domain::CorpusError;

use crate::infrastructure::config::CorpusSettings;
use crate::infrastructure::persistence::{RecordStreamReader, VariableIndex, RECORDS_FILE, STRINGS_FILE};

/// Outcome of a corpus check.
#[derive(Debug, Clone, Default)]
pub struct CorpusReport {
    pub variables: usize,
    pub groups: u64,
    pub records: u64,
    pub problems: Vec<String>,
}

impl CorpusReport {
    pub fn is_clean(&self) -> bool {
        self.problems.is_empty()
    }
}

/// Verifies the corpus at `corpus` and returns what was found.
pub fn execute(corpus: &Path, settings: &CorpusSettings) -> Result<CorpusReport, CorpusError> {
    let index = VariableIndex::open_read_only(corpus, &settings.variables_file)?;
    let mut report = CorpusReport::default();

    for (var, entry) in index.entries() {
        report.variables += 1;
        let dir = corpus.join(&entry.dir_name);
        let records_path = dir.join(RECORDS_FILE);

        if !dir.is_dir() {
            report
                .problems
                .push(format!("{}: directory {} is missing", var, entry.dir_name));
            continue;
        }

        // An indexed variable with no committed groups yet has no record
        // file; that only matches a zero count.
        if !records_path.is_file() {
            if entry.record_count != 0 {
                report.problems.push(format!(
                    "{}: no records.bin but index claims {} records",
                    var, entry.record_count
                ));
            }
            continue;
        }

        let dictionary_len = dictionary_len(&dir.join(STRINGS_FILE))?;
        let mut reader = RecordStreamReader::open(&records_path)?;
        let mut records_seen: u64 = 0;

        loop {
            match reader.read_group() {
                Ok(Some(group)) => {
                    report.groups += 1;
                    records_seen += group.records.len() as u64;
                    for record in &group.records {
                        for error in &record.errors {
                            if error.label_id >= dictionary_len {
                                report.problems.push(format!(
                                    "{}: label id {} outside dictionary of {} entries",
                                    var, error.label_id, dictionary_len
                                ));
                            }
                        }
                    }
                }
                Ok(None) => break,
                Err(err) => {
                    report
                        .problems
                        .push(format!("{}: corrupt record stream: {}", var, err));
                    break;
                }
            }
        }

        if records_seen != entry.record_count {
            report.problems.push(format!(
                "{}: records.bin holds {} records, index claims {}",
                var, records_seen, entry.record_count
            ));
        }
        report.records += records_seen;
        debug!(variable = %var, records = records_seen, "checked");
    }

    Ok(report)
}

/// Number of ids in a dictionary file, the reserved id 0 included.
fn dictionary_len(path: &Path) -> Result<u64, CorpusError> {
    if !path.exists() {
        return Ok(1);
    }
    let content = fs::read_to_string(path)
        .map_err(|e| CorpusError::io_error(format!("cannot read {}: {}", path.display(), e)))?;
    Ok(1 + content.split('\n').filter(|line| !line.is_empty()).count() as u64)
}
