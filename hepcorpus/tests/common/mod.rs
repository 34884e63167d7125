// /////////////////////////////////////////////////////////////////////////////
// HEPCorpus Aggregator
// Copyright (c) 2025 HEPCorpus Contributors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Shared helpers for the integration tests.

use std::fs;
use std::path::{Path, PathBuf};

/// Materializes a submission directory: the manifest plus its data files.
pub fn write_submission(
    root: &Path,
    name: &str,
    manifest: &str,
    data_files: &[(&str, &str)],
) -> PathBuf {
    let dir = root.join(name);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("submission.yaml"), manifest).unwrap();
    for (file, content) in data_files {
        fs::write(dir.join(file), content).unwrap();
    }
    dir
}

/// Resolves a variable's directory through `variables.json`.
pub fn variable_dir(corpus: &Path, var: &str) -> PathBuf {
    let index: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(corpus.join("variables.json")).unwrap()).unwrap();
    let dir_name = index[var]["dirName"].as_str().unwrap();
    corpus.join(dir_name)
}

/// The committed record count `variables.json` claims for a variable.
pub fn record_count(corpus: &Path, var: &str) -> u64 {
    let index: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(corpus.join("variables.json")).unwrap()).unwrap();
    index[var]["recordCount"].as_u64().unwrap()
}
