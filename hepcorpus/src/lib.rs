// /////////////////////////////////////////////////////////////////////////////
// HEPCorpus Aggregator
// Copyright (c) 2025 HEPCorpus Contributors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

// Production code safety enforced via CI
// (lib/bins checked separately from tests - tests may use unwrap/expect)

//! # HEPCorpus Aggregator
//!
//! Ingests HEPData submissions (nested YAML documents describing tables of
//! physics measurements) and produces a compact on-disk corpus partitioned
//! by independent-variable name.
//!
//! ## Architecture Overview
//!
//! The crate follows the layered layout of the workspace:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Entry Point (main)                       │
//! │  (CLI dispatch, logging setup, exit codes)                  │
//! └─────────────────────────────────────────────────────────────┘
//!                                │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Application Layer                          │
//! │  (RecordAggregator orchestrator, ingest/check use cases)    │
//! └─────────────────────────────────────────────────────────────┘
//!                                │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                Infrastructure Layer                         │
//! │  (Transaction log, LRU writer cache, record writer/reader,  │
//! │   string dictionary, string-set store, variable index)      │
//! └─────────────────────────────────────────────────────────────┘
//!                                │
//! ┌─────────────────────────────────────────────────────────────┐
//! │             Domain Layer (hepcorpus-domain)                 │
//! │  (Harmonizer, record model, binary encoding, errors)        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Corpus layout
//!
//! ```text
//! <corpus root>/
//! ├── variables.json            variable name → directory, record count
//! ├── submissions.txt           ingested submission ids (the commit witness)
//! └── <hh>/<name> - <6hex>/     one directory per variable
//!     ├── records.bin           EOF-delimited groups of binary records
//!     └── strings.txt           string dictionary backing error labels
//! ```
//!
//! ## Transactional model
//!
//! One submission is one transaction. Writers never touch files directly:
//! they append to per-file buffers held by the submission's
//! [`Transaction`](infrastructure::persistence::Transaction), which drains
//! everything synchronously inside a signal-masked section at commit. The
//! submission id is added to `submissions.txt` through the same
//! transaction, so the witness and the record bytes become visible
//! together or not at all.
//!
//! Ingestion is single-threaded by design: one submission at a time, no
//! suspension points inside a transaction, no cross-submission
//! parallelism.

pub mod application;
pub mod infrastructure;
