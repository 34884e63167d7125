// /////////////////////////////////////////////////////////////////////////////
// HEPCorpus Aggregator
// Copyright (c) 2025 HEPCorpus Contributors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Load the fixed mini-demo fixture into a corpus.

use std::path::Path;

use hepcorpus_domain::CorpusError;

use crate::application::services::{IngestStats, RecordAggregator};
use crate::infrastructure::config::CorpusSettings;

/// Writes the two fake demo publications into the corpus at `corpus`.
pub fn execute(corpus: &Path, settings: CorpusSettings) -> Result<IngestStats, CorpusError> {
    let mut aggregator = RecordAggregator::open(corpus, settings)?;
    aggregator.load_mini_demo()?;
    aggregator.finish()?;

    let stats = aggregator.stats().clone();
    stats.report();
    Ok(stats)
}
