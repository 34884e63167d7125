// /////////////////////////////////////////////////////////////////////////////
// HEPCorpus Aggregator
// Copyright (c) 2025 HEPCorpus Contributors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Ingest a batch of submission directories into a corpus.

use std::path::{Path, PathBuf};

use tracing::info;

use hepcorpus_domain::CorpusError;

use crate::application::services::{IngestStats, RecordAggregator};
use crate::infrastructure::config::CorpusSettings;

/// Ingests `submissions` into the corpus at `corpus`, one transaction per
/// submission, and returns the run counters.
///
/// A failing submission aborts the run; everything committed before it
/// stays committed, and already-ingested submissions are skipped on retry.
pub fn execute(
    corpus: &Path,
    submissions: &[PathBuf],
    settings: CorpusSettings,
) -> Result<IngestStats, CorpusError> {
    let mut aggregator = RecordAggregator::open(corpus, settings)?;

    for path in submissions {
        info!("ingesting {}", path.display());
        aggregator.process_submission(path)?;
    }
    aggregator.finish()?;

    let stats = aggregator.stats().clone();
    stats.report();
    Ok(stats)
}
