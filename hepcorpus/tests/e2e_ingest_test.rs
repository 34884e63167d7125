// /////////////////////////////////////////////////////////////////////////////
// HEPCorpus Aggregator
// Copyright (c) 2025 HEPCorpus Contributors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! End-to-end ingestion tests: a submission directory goes in, the corpus
//! layout and record bytes come out.

mod common;

use std::fs;

use tempfile::TempDir;

use common::{record_count, variable_dir, write_submission};
use hepcorpus::application::services::{RecordAggregator, SubmissionOutcome};
use hepcorpus::infrastructure::config::CorpusSettings;
use hepcorpus::infrastructure::persistence::{RecordStreamReader, RECORDS_FILE, STRINGS_FILE};

const MANIFEST: &str = "\
comment: Test publication
record_ids:
- {type: inspire, id: 42}
---
name: Table 1
data_file: Table1.yaml
keywords:
- {name: observables, values: [SIG]}
";

const TABLE1: &str = "\
independent_variables:
- header: {name: PT, units: GeV}
  values:
  - {low: 0, high: 10}
  - {low: 10, high: 20}
dependent_variables:
- header: {name: sigma}
  values:
  - {value: 1.5}
  - {value: '-'}
";

#[test]
fn ingests_single_table_submission() {
    let tmp = TempDir::new().unwrap();
    let corpus = tmp.path().join("corpus");
    let submission = write_submission(tmp.path(), "ins42", MANIFEST, &[("Table1.yaml", TABLE1)]);

    let mut aggregator = RecordAggregator::open(&corpus, CorpusSettings::default()).unwrap();
    let outcome = aggregator.process_submission(&submission).unwrap();
    aggregator.finish().unwrap();
    assert_eq!(outcome, SubmissionOutcome::Ingested);

    // The witness holds exactly the submission id, no stray newlines.
    assert_eq!(
        fs::read_to_string(corpus.join("submissions.txt")).unwrap(),
        "ins42"
    );

    // One variable directory, holding one group with one record: the "-"
    // placeholder row is dropped.
    let var_dir = variable_dir(&corpus, "PT (GeV)");
    assert!(var_dir.is_dir());
    assert_eq!(record_count(&corpus, "PT (GeV)"), 1);

    let mut reader = RecordStreamReader::open(&var_dir.join(RECORDS_FILE)).unwrap();
    let group = reader.read_group().unwrap().unwrap();
    assert_eq!(group.inspire_record, 42);
    assert_eq!(group.table_num, 1);
    assert_eq!(group.cmenergies, 0.0);
    assert_eq!(group.observables, "SIG");
    assert_eq!(group.var_y, "sigma");
    assert_eq!(group.records.len(), 1);
    assert_eq!(group.records[0].x_low, 0.0);
    assert_eq!(group.records[0].x_high, 10.0);
    assert_eq!(group.records[0].y, 1.5);
    assert!(group.records[0].errors.is_empty());
    assert!(reader.read_group().unwrap().is_none());

    let stats = aggregator.stats();
    assert_eq!(stats.submissions, 1);
    assert_eq!(stats.records_written, 1);
    assert_eq!(stats.tables_total, 1);
    assert_eq!(stats.tables_rejected, 0);
}

#[test]
fn reingestion_is_idempotent_and_byte_identical() {
    let tmp = TempDir::new().unwrap();
    let corpus = tmp.path().join("corpus");
    let submission = write_submission(tmp.path(), "ins42", MANIFEST, &[("Table1.yaml", TABLE1)]);

    let settings = CorpusSettings::default();
    let mut aggregator = RecordAggregator::open(&corpus, settings.clone()).unwrap();
    aggregator.process_submission(&submission).unwrap();
    aggregator.finish().unwrap();

    let var_dir = variable_dir(&corpus, "PT (GeV)");
    let first_bytes = fs::read(var_dir.join(RECORDS_FILE)).unwrap();
    let first_witness = fs::read_to_string(corpus.join("submissions.txt")).unwrap();

    // Same run, same process: the ledger is already in memory.
    let outcome = aggregator.process_submission(&submission).unwrap();
    assert_eq!(outcome, SubmissionOutcome::AlreadyPresent);
    aggregator.finish().unwrap();

    // Fresh aggregator over the same corpus: the ledger is re-read from
    // disk.
    let mut reopened = RecordAggregator::open(&corpus, settings).unwrap();
    let outcome = reopened.process_submission(&submission).unwrap();
    assert_eq!(outcome, SubmissionOutcome::AlreadyPresent);
    reopened.finish().unwrap();

    assert_eq!(fs::read(var_dir.join(RECORDS_FILE)).unwrap(), first_bytes);
    assert_eq!(
        fs::read_to_string(corpus.join("submissions.txt")).unwrap(),
        first_witness
    );
    assert_eq!(record_count(&corpus, "PT (GeV)"), 1);
}

#[test]
fn rejected_table_skips_but_submission_commits() {
    let manifest = "\
record_ids:
- {type: inspire, id: 7}
---
name: Table 1
data_file: Table1.yaml
---
name: Table 2
data_file: Table2.yaml
";
    // Table 1 has a nameless dependent variable and must be rejected.
    let bad_table = "\
independent_variables:
- header: {name: PT}
  values:
  - {value: 1}
dependent_variables:
- header: {name: ''}
  values:
  - {value: 2}
";

    let tmp = TempDir::new().unwrap();
    let corpus = tmp.path().join("corpus");
    let submission = write_submission(
        tmp.path(),
        "ins7",
        manifest,
        &[("Table1.yaml", bad_table), ("Table2.yaml", TABLE1)],
    );

    let mut aggregator = RecordAggregator::open(&corpus, CorpusSettings::default()).unwrap();
    let outcome = aggregator.process_submission(&submission).unwrap();
    aggregator.finish().unwrap();

    assert_eq!(outcome, SubmissionOutcome::Ingested);
    assert_eq!(aggregator.stats().tables_total, 2);
    assert_eq!(aggregator.stats().tables_rejected, 1);

    // Table 2 landed despite the rejection of Table 1.
    assert_eq!(record_count(&corpus, "PT (GeV)"), 1);
    assert_eq!(
        fs::read_to_string(corpus.join("submissions.txt")).unwrap(),
        "ins7"
    );
}

#[test]
fn aborted_submission_leaves_corpus_unchanged() {
    let tmp = TempDir::new().unwrap();
    let corpus = tmp.path().join("corpus");

    let good = write_submission(tmp.path(), "ins42", MANIFEST, &[("Table1.yaml", TABLE1)]);

    // Table 1 writes a group, then Table 2 fails fatally: more dependent
    // rows than independent ones.
    let bad_manifest = "\
record_ids:
- {type: inspire, id: 43}
---
name: Table 1
data_file: Table1.yaml
---
name: Table 2
data_file: Table2.yaml
";
    let bad_table = "\
independent_variables:
- header: {name: PT, units: GeV}
  values:
  - {value: 1}
dependent_variables:
- header: {name: sigma}
  values:
  - {value: 1}
  - {value: 2}
";
    let bad = write_submission(
        tmp.path(),
        "ins43",
        bad_manifest,
        &[("Table1.yaml", TABLE1), ("Table2.yaml", bad_table)],
    );

    let settings = CorpusSettings::default();
    let mut aggregator = RecordAggregator::open(&corpus, settings.clone()).unwrap();
    aggregator.process_submission(&good).unwrap();
    aggregator.finish().unwrap();

    let var_dir = variable_dir(&corpus, "PT (GeV)");
    let bytes_before = fs::read(var_dir.join(RECORDS_FILE)).unwrap();
    let witness_before = fs::read_to_string(corpus.join("submissions.txt")).unwrap();

    let mut aggregator = RecordAggregator::open(&corpus, settings.clone()).unwrap();
    assert!(aggregator.process_submission(&bad).is_err());

    // The failed submission left no bytes and no witness entry behind.
    assert_eq!(fs::read(var_dir.join(RECORDS_FILE)).unwrap(), bytes_before);
    assert_eq!(
        fs::read_to_string(corpus.join("submissions.txt")).unwrap(),
        witness_before
    );
    assert_eq!(record_count(&corpus, "PT (GeV)"), 1);

    // The corpus still verifies cleanly, and the failed submission can be
    // retried once fixed.
    let report =
        hepcorpus::application::use_cases::check_corpus::execute(&corpus, &settings).unwrap();
    assert!(report.is_clean(), "problems: {:?}", report.problems);
}

#[test]
fn writer_eviction_inside_a_submission_still_commits() {
    let manifest = "\
record_ids:
- {type: inspire, id: 9}
---
name: Table 1
data_file: Table1.yaml
";
    // Two independent variables force two writers; capacity 1 forces an
    // eviction inside the submission's transaction.
    let table = "\
independent_variables:
- header: {name: PT, units: GeV}
  values:
  - {low: 0, high: 1}
- header: {name: YRAP}
  values:
  - {value: 0.5}
dependent_variables:
- header: {name: sigma}
  values:
  - value: 3.5
    errors:
    - {symerror: '10%', label: stat}
";

    let tmp = TempDir::new().unwrap();
    let corpus = tmp.path().join("corpus");
    let submission = write_submission(tmp.path(), "ins9", manifest, &[("Table1.yaml", table)]);

    let settings = CorpusSettings {
        writer_cache_capacity: 1,
        ..CorpusSettings::default()
    };
    let mut aggregator = RecordAggregator::open(&corpus, settings.clone()).unwrap();
    aggregator.process_submission(&submission).unwrap();
    aggregator.finish().unwrap();

    assert_eq!(record_count(&corpus, "PT (GeV)"), 1);
    assert_eq!(record_count(&corpus, "YRAP"), 1);

    // Both shards decode, and the percentage error was divided by 100:
    // 3.5 * 10 / 100 = 0.35.
    for var in ["PT (GeV)", "YRAP"] {
        let dir = variable_dir(&corpus, var);
        let mut reader = RecordStreamReader::open(&dir.join(RECORDS_FILE)).unwrap();
        let group = reader.read_group().unwrap().unwrap();
        assert_eq!(group.records.len(), 1);
        let error = group.records[0].errors[0];
        assert!((error.plus - 0.35).abs() < 1e-6);
        assert_eq!(error.minus, error.plus);

        // "stat" was interned into this shard's dictionary as id 1.
        assert_eq!(error.label_id, 1);
        assert_eq!(
            fs::read_to_string(dir.join(STRINGS_FILE)).unwrap(),
            "stat\n"
        );
    }

    let report =
        hepcorpus::application::use_cases::check_corpus::execute(&corpus, &settings).unwrap();
    assert!(report.is_clean(), "problems: {:?}", report.problems);
}
