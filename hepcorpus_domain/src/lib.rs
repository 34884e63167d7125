// /////////////////////////////////////////////////////////////////////////////
// HEPCorpus Aggregator
// Copyright (c) 2025 HEPCorpus Contributors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # HEPCorpus Domain
//!
//! Pure domain layer for the HEPData corpus aggregator. This crate holds the
//! business model of the ingestion pipeline and nothing else: no file
//! handles, no transactions, no logging configuration.
//!
//! ## What lives here
//!
//! - **Error taxonomy** - [`CorpusError`], the single hierarchical error type
//!   shared by every layer, with recovery predicates that distinguish
//!   row-local, table-local and fatal failures
//! - **Value objects** - the strict numeric model ([`Record`],
//!   [`GroupMetadata`]), the weakly-typed YAML boundary ([`Scalar`]) and the
//!   varint-based binary record encoding
//! - **Entities** - serde views of submission and table documents as they
//!   appear on disk
//! - **Domain services** - the harmonizer: coercion of heterogeneous YAML
//!   scalars (percentages, ranges, scientific-notation variants) into strict
//!   floats, plus keyword/qualifier/reaction analysis
//!
//! ## What deliberately does not live here
//!
//! File I/O, the transaction log, the LRU writer cache and the on-disk
//! corpus layout are infrastructure concerns and live in the `hepcorpus`
//! application crate. The domain only defines the byte-level *encoding* of
//! records; the application decides where those bytes go.

pub mod entities;
pub mod error;
pub mod services;
pub mod value_objects;

// Re-export commonly used types
pub use error::CorpusError;
pub use value_objects::{GroupMetadata, Record, RecordError, Scalar};
