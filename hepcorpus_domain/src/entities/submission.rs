// /////////////////////////////////////////////////////////////////////////////
// HEPCorpus Aggregator
// Copyright (c) 2025 HEPCorpus Contributors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Submission Documents
//!
//! A submission is a directory holding `submission.yaml` plus the data
//! files it references. `submission.yaml` is a multi-document stream: the
//! first document is the [`SubmissionHeader`], every following document is
//! one [`TableMeta`].
//!
//! These structs are deliberately permissive: real submissions carry many
//! keys this pipeline does not consume, and serde ignores them.

use serde::Deserialize;

/// First document of `submission.yaml`.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmissionHeader {
    #[serde(default)]
    pub record_ids: Vec<RecordId>,
    #[serde(default)]
    pub comment: String,
}

/// One entry of the header's `record_ids` list.
///
/// The INSPIRE entry (`type: inspire`) identifies the publication and is
/// the basis of the submission's idempotency key.
#[derive(Debug, Clone, Deserialize)]
pub struct RecordId {
    #[serde(rename = "type")]
    pub id_type: String,
    pub id: i64,
}

/// One table document of `submission.yaml`.
#[derive(Debug, Clone, Deserialize)]
pub struct TableMeta {
    /// Human-readable table name, `"Table N"`.
    pub name: String,
    /// File (relative to the submission directory) holding the values.
    pub data_file: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub keywords: Vec<Keyword>,
}

/// A named keyword list attached to a table (observables, reactions,
/// cmenergies, phrases).
#[derive(Debug, Clone, Deserialize)]
pub struct Keyword {
    pub name: String,
    #[serde(default)]
    pub values: Vec<serde_yaml::Value>,
}
