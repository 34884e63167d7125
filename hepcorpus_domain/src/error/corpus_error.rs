// /////////////////////////////////////////////////////////////////////////////
// HEPCorpus Aggregator
// Copyright (c) 2025 HEPCorpus Contributors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Domain Error System
//!
//! Hierarchical error type for the corpus aggregator. Every layer reports
//! failures through [`CorpusError`]; the variants map one-to-one onto the
//! recovery policies the orchestrator applies:
//!
//! - **Row-local** - [`CorpusError::NotNumeric`]: the offending cell (or, if
//!   the whole column is affected, the variable) is skipped with a warning
//! - **Table-local** - [`CorpusError::RejectedTable`]: the table is counted,
//!   logged and skipped; the submission continues
//! - **Fatal** - codec, transaction, writer and index errors abort the
//!   submission's transaction; nothing is persisted
//!
//! Lookup misses ([`CorpusError::KeywordNotFound`],
//! [`CorpusError::QualifierNotFound`]) are mostly caught close to the call
//! site and substituted with defaults.
//!
//! The recovery predicates ([`CorpusError::is_row_local`],
//! [`CorpusError::is_table_rejection`]) let callers branch on policy without
//! matching on individual variants.

use thiserror::Error;

/// Domain-specific errors for the corpus aggregation system.
///
/// Each variant carries a descriptive message; the variant itself encodes
/// the recovery policy (see module docs).
#[derive(Error, Debug, Clone)]
pub enum CorpusError {
    /// A scalar could not be coerced to a finite float.
    #[error("not numeric: {0}")]
    NotNumeric(String),

    /// The table violates the input schema badly enough to be skipped
    /// (empty variable name, no usable variables).
    #[error("rejected table: {0}")]
    RejectedTable(String),

    /// A keyword lookup found no entry.
    #[error("no keyword {0}")]
    KeywordNotFound(String),

    /// A qualifier lookup found no entry.
    #[error("no qualifier {0}")]
    QualifierNotFound(String),

    /// Varint encoding was asked to encode a negative number.
    #[error("codec overflow: {0}")]
    CodecOverflow(String),

    /// The binary record stream does not parse under the grammar.
    #[error("codec error: {0}")]
    CodecError(String),

    /// Writer I/O was attempted against a transaction that already
    /// committed.
    #[error("no active transaction: {0}")]
    NoActiveTransaction(String),

    /// A binary write was issued against a text handle or vice versa.
    #[error("transaction mode mismatch: {0}")]
    ModeMismatch(String),

    /// A record writer was closed twice.
    #[error("writer closed twice: {0}")]
    DoubleClose(String),

    /// An unknown variable was requested while index writes are disabled.
    #[error("read-only variable index: {0}")]
    ReadOnlyVariable(String),

    /// Input documents that parse but contradict the submission schema
    /// (duplicate keywords, mismatched row counts, malformed error values).
    #[error("schema error: {0}")]
    SchemaError(String),

    #[error("IO error: {0}")]
    IoError(String),

    #[error("serialization error: {0}")]
    SerializationError(String),

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("internal error: {0}")]
    InternalError(String),
}

impl CorpusError {
    /// Creates a new not-numeric error
    pub fn not_numeric(msg: impl Into<String>) -> Self {
        Self::NotNumeric(msg.into())
    }

    /// Creates a new table rejection
    pub fn rejected_table(msg: impl Into<String>) -> Self {
        Self::RejectedTable(msg.into())
    }

    /// Creates a new schema error
    pub fn schema_error(msg: impl Into<String>) -> Self {
        Self::SchemaError(msg.into())
    }

    /// Creates a new IO error
    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::IoError(msg.into())
    }

    /// Creates a new internal error
    pub fn internal_error(msg: impl Into<String>) -> Self {
        Self::InternalError(msg.into())
    }

    /// True for failures that only invalidate a single cell or row.
    pub fn is_row_local(&self) -> bool {
        matches!(self, CorpusError::NotNumeric(_))
    }

    /// True for failures that skip the current table but leave the
    /// submission running.
    pub fn is_table_rejection(&self) -> bool {
        matches!(self, CorpusError::RejectedTable(_))
    }

    /// True for lookup misses that callers usually substitute with a
    /// default value.
    pub fn is_lookup_miss(&self) -> bool {
        matches!(
            self,
            CorpusError::KeywordNotFound(_) | CorpusError::QualifierNotFound(_)
        )
    }

    /// Gets the error category
    pub fn category(&self) -> &'static str {
        match self {
            CorpusError::NotNumeric(_) => "harmonization",
            CorpusError::RejectedTable(_) => "schema",
            CorpusError::KeywordNotFound(_) => "lookup",
            CorpusError::QualifierNotFound(_) => "lookup",
            CorpusError::CodecOverflow(_) => "codec",
            CorpusError::CodecError(_) => "codec",
            CorpusError::NoActiveTransaction(_) => "transaction",
            CorpusError::ModeMismatch(_) => "transaction",
            CorpusError::DoubleClose(_) => "writer",
            CorpusError::ReadOnlyVariable(_) => "index",
            CorpusError::SchemaError(_) => "schema",
            CorpusError::IoError(_) => "io",
            CorpusError::SerializationError(_) => "serialization",
            CorpusError::InvalidConfiguration(_) => "configuration",
            CorpusError::InternalError(_) => "internal",
        }
    }
}

// Implement conversion from standard library errors
impl From<std::io::Error> for CorpusError {
    fn from(err: std::io::Error) -> Self {
        CorpusError::IoError(err.to_string())
    }
}

impl From<serde_json::Error> for CorpusError {
    fn from(err: serde_json::Error) -> Self {
        CorpusError::SerializationError(err.to_string())
    }
}

impl From<serde_yaml::Error> for CorpusError {
    fn from(err: serde_yaml::Error) -> Self {
        CorpusError::SerializationError(err.to_string())
    }
}
