// /////////////////////////////////////////////////////////////////////////////
// HEPCorpus Aggregator
// Copyright (c) 2025 HEPCorpus Contributors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Application services.

pub mod record_aggregator;

pub use record_aggregator::{IngestStats, RecordAggregator, SubmissionOutcome};
