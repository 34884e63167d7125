// /////////////////////////////////////////////////////////////////////////////
// HEPCorpus Aggregator
// Copyright (c) 2025 HEPCorpus Contributors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Corpus Settings
//!
//! Strongly typed configuration for the aggregator, layered as:
//!
//! 1. Built-in defaults
//! 2. An optional `hepcorpus.toml` settings file
//! 3. `HEPCORPUS_*` environment variable overrides, one per field:
//!    - **HEPCORPUS_CACHE_CAPACITY**: open-writer cache bound
//!    - **HEPCORPUS_SUBMISSION_FILE**: submission manifest name
//!    - **HEPCORPUS_VARIABLES_FILE**: variable index name
//!    - **HEPCORPUS_SUBMISSIONS_FILE**: submission ledger name
//!
//! Everything has a sensible default; a missing settings file is not an
//! error.

use std::env;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use hepcorpus_domain::CorpusError;

use super::persistence::lru_cache::DEFAULT_CAPACITY;

/// Aggregator configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorpusSettings {
    /// Bound on concurrently open per-variable writers.
    pub writer_cache_capacity: usize,
    /// Name of the submission manifest inside a submission directory.
    pub submission_file: String,
    /// Name of the variable index file at the corpus root.
    pub variables_file: String,
    /// Name of the submission-id ledger at the corpus root.
    pub submissions_file: String,
}

impl Default for CorpusSettings {
    fn default() -> Self {
        Self {
            writer_cache_capacity: DEFAULT_CAPACITY,
            submission_file: "submission.yaml".to_string(),
            variables_file: "variables.json".to_string(),
            submissions_file: "submissions.txt".to_string(),
        }
    }
}

impl CorpusSettings {
    /// Loads settings from an optional TOML file, then applies environment
    /// overrides and validates.
    pub fn load(path: Option<&Path>) -> Result<Self, CorpusError> {
        let mut settings = match path {
            Some(path) => {
                let content = fs::read_to_string(path).map_err(|e| {
                    CorpusError::InvalidConfiguration(format!(
                        "cannot read {}: {}",
                        path.display(),
                        e
                    ))
                })?;
                toml::from_str(&content).map_err(|e| {
                    CorpusError::InvalidConfiguration(format!(
                        "malformed {}: {}",
                        path.display(),
                        e
                    ))
                })?
            }
            None => Self::default(),
        };
        settings.apply_env();
        settings.validate()?;
        Ok(settings)
    }

    fn apply_env(&mut self) {
        if let Ok(value) = env::var("HEPCORPUS_CACHE_CAPACITY") {
            if let Ok(capacity) = value.parse() {
                self.writer_cache_capacity = capacity;
            }
        }
        for (var, field) in [
            ("HEPCORPUS_SUBMISSION_FILE", &mut self.submission_file),
            ("HEPCORPUS_VARIABLES_FILE", &mut self.variables_file),
            ("HEPCORPUS_SUBMISSIONS_FILE", &mut self.submissions_file),
        ] {
            // An explicitly empty override is left to validate() to
            // reject.
            if let Ok(value) = env::var(var) {
                *field = value;
            }
        }
    }

    pub fn validate(&self) -> Result<(), CorpusError> {
        if self.writer_cache_capacity == 0 {
            return Err(CorpusError::InvalidConfiguration(
                "writer_cache_capacity must be at least 1".to_string(),
            ));
        }
        for (field, value) in [
            ("submission_file", &self.submission_file),
            ("variables_file", &self.variables_file),
            ("submissions_file", &self.submissions_file),
        ] {
            if value.trim().is_empty() {
                return Err(CorpusError::InvalidConfiguration(format!(
                    "{} must not be empty",
                    field
                )));
            }
        }
        Ok(())
    }
}
