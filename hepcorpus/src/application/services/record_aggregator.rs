// /////////////////////////////////////////////////////////////////////////////
// HEPCorpus Aggregator
// Copyright (c) 2025 HEPCorpus Contributors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Record Aggregator
//!
//! The orchestrator: decomposes a submission into
//! `(variable, group metadata, records)` triples and drives them through
//! the writer cache under a single transaction.
//!
//! ## Transaction boundary
//!
//! One submission is one transaction. The submission is the external unit
//! of idempotency (its INSPIRE id); partial persistence would leak half a
//! submission into the corpus with no way to detect it. The submission id
//! is appended to the ledger inside the same transaction as the group
//! writes, so the witness and the records become visible together.
//!
//! ## Error policy
//!
//! - A rejected table (schema violation) is counted, logged and skipped;
//!   the submission continues
//! - Non-numeric cells and `"-"` placeholders skip their row; a group that
//!   loses every row is not written and logged once
//! - Any other error aborts the submission: the transaction is dropped and
//!   its buffers are discarded
//!
//! Record-count updates to the variable index are staged in memory and
//! applied after the commit succeeds: the index file is rewritten eagerly
//! (outside the transaction), so applying counts for a submission that
//! later aborts would permanently overstate `recordCount`.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_yaml::Value;
use tracing::{debug, info, warn};

use hepcorpus_domain::entities::{DataPoint, DataTable, ErrorEntry, SubmissionHeader, TableMeta, VariableBlock};
use hepcorpus_domain::services::harmonizing::{
    clean_cmenergies, clean_errors, coerce_float, find_inspire_record, find_keyword,
    find_qualifier, find_qualifier_many, is_plus_minus_range, parse_plus_minus_range,
    variable_name,
};
use hepcorpus_domain::{CorpusError, GroupMetadata, Record, Scalar};

use crate::infrastructure::config::CorpusSettings;
use crate::infrastructure::persistence::{
    RecordWriter, StringSetStore, Transaction, VariableIndex, WriterCache,
};

/// Counters reported at the end of a run.
#[derive(Debug, Clone, Default)]
pub struct IngestStats {
    pub submissions: u64,
    pub submissions_skipped: u64,
    pub tables_total: u64,
    pub tables_rejected: u64,
    pub records_written: u64,
}

impl IngestStats {
    /// Logs the run summary.
    pub fn report(&self) {
        info!("Indexed {} submissions.", self.submissions);
        if self.submissions_skipped > 0 {
            info!(
                "Skipped {} submissions already in the corpus.",
                self.submissions_skipped
            );
        }
        if self.tables_total > 0 {
            info!(
                "Scanned {} tables, rejected {} tables ({:.2}%).",
                self.tables_total,
                self.tables_rejected,
                100.0 * (self.tables_rejected as f64 / self.tables_total as f64)
            );
        }
        info!("Wrote {} records.", self.records_written);
    }
}

/// What `process_submission` did with a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionOutcome {
    Ingested,
    /// The submission id was already in the ledger; nothing was touched.
    AlreadyPresent,
}

/// Orchestrates submission ingestion into a corpus rooted at one
/// directory.
pub struct RecordAggregator {
    root: PathBuf,
    settings: CorpusSettings,
    variables: VariableIndex,
    submissions: StringSetStore,
    writers: WriterCache<RecordWriter>,
    stats: IngestStats,
}

impl RecordAggregator {
    /// Opens (creating if needed) the corpus at `root`.
    pub fn open(root: &Path, settings: CorpusSettings) -> Result<Self, CorpusError> {
        settings.validate()?;
        fs::create_dir_all(root).map_err(|e| {
            CorpusError::io_error(format!("cannot create corpus root {}: {}", root.display(), e))
        })?;

        let variables = VariableIndex::open(root, &settings.variables_file)?;
        let submissions = StringSetStore::open(&root.join(&settings.submissions_file))?;
        let writers = WriterCache::new(settings.writer_cache_capacity);

        Ok(Self {
            root: root.to_path_buf(),
            settings,
            variables,
            submissions,
            writers,
            stats: IngestStats::default(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn stats(&self) -> &IngestStats {
        &self.stats
    }

    /// Ingests one submission directory.
    ///
    /// Reads `submission.yaml`, checks the idempotency ledger, processes
    /// every table under a fresh transaction and commits. A table-level
    /// rejection skips that table; any other failure aborts the whole
    /// submission with the corpus untouched.
    pub fn process_submission(&mut self, path: &Path) -> Result<SubmissionOutcome, CorpusError> {
        let manifest = path.join(&self.settings.submission_file);
        let content = fs::read_to_string(&manifest).map_err(|e| {
            CorpusError::io_error(format!("cannot read {}: {}", manifest.display(), e))
        })?;

        let mut header: Option<SubmissionHeader> = None;
        let mut tables: Vec<TableMeta> = Vec::new();
        for (i, doc) in serde_yaml::Deserializer::from_str(&content).enumerate() {
            if i == 0 {
                header = Some(SubmissionHeader::deserialize(doc)?);
            } else {
                tables.push(TableMeta::deserialize(doc)?);
            }
        }
        let header = header
            .ok_or_else(|| CorpusError::schema_error(format!("{} is empty", manifest.display())))?;

        let inspire_record = find_inspire_record(&header)?;
        let submission_id = format!("ins{}", inspire_record);

        if self.submissions.contains(&submission_id) {
            warn!("skipping {}: already in the corpus", submission_id);
            self.stats.submissions_skipped += 1;
            return Ok(SubmissionOutcome::AlreadyPresent);
        }

        let mut txn = Transaction::begin();
        let mut staged_counts: BTreeMap<String, u64> = BTreeMap::new();

        for table in &tables {
            self.stats.tables_total += 1;
            match self.process_table(&mut txn, path, inspire_record, table, &mut staged_counts) {
                Ok(()) => {}
                Err(err) if err.is_table_rejection() => {
                    warn!(
                        "rejected table \"{}\" of {}: {}",
                        table.name, submission_id, err
                    );
                    self.stats.tables_rejected += 1;
                }
                // Dropping the transaction discards its buffers.
                Err(err) => return Err(err),
            }
        }

        self.submissions.add(&submission_id, &mut txn)?;
        txn.commit()?;

        for (var, delta) in staged_counts {
            self.variables.update_count(&var, delta)?;
            self.stats.records_written += delta;
        }
        self.stats.submissions += 1;
        debug!("committed {}", submission_id);
        Ok(SubmissionOutcome::Ingested)
    }

    /// Processes one table document: harmonizes its metadata, builds the
    /// per-(var_x, var_y) groups and writes them through the cached
    /// writers.
    fn process_table(
        &mut self,
        txn: &mut Transaction,
        submission_path: &Path,
        inspire_record: i64,
        table: &TableMeta,
        staged_counts: &mut BTreeMap<String, u64>,
    ) -> Result<(), CorpusError> {
        let table_num = parse_table_number(&table.name)?;

        let data_path = submission_path.join(&table.data_file);
        let content = fs::read_to_string(&data_path).map_err(|e| {
            CorpusError::io_error(format!("cannot read {}: {}", data_path.display(), e))
        })?;
        let doc: DataTable = serde_yaml::from_str(&content)?;

        if doc.independent_variables.is_empty() {
            return Err(CorpusError::rejected_table("no independent variables"));
        }
        if doc.dependent_variables.is_empty() {
            return Err(CorpusError::rejected_table("no dependent variables"));
        }
        for var in doc
            .independent_variables
            .iter()
            .chain(doc.dependent_variables.iter())
        {
            if var.header.name.trim().is_empty() {
                return Err(CorpusError::rejected_table("variable with empty name"));
            }
        }

        let observables = {
            let values = find_keyword(table, "observables")?;
            if values.is_empty() {
                "unknown".to_string()
            } else {
                values
                    .iter()
                    .map(|v| Scalar::from_yaml(v).to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            }
        };

        // Only used when RE is not specified on the dependent variable.
        let default_reaction = find_keyword(table, "reactions")?
            .first()
            .map(|v| Scalar::from_yaml(v).to_string())
            .unwrap_or_default();

        // Each independent variable gets as many records as the table has
        // usable rows, once per dependent variable.
        for indep_var in &doc.independent_variables {
            let var_x = variable_name(&indep_var.header);

            for dep_var in &doc.dependent_variables {
                let cmenergies = group_cmenergies(table, dep_var)?;
                let reaction = match find_qualifier_many(dep_var, "RE") {
                    Ok(values) => values[0].to_string(),
                    Err(err) if err.is_lookup_miss() => default_reaction.clone(),
                    Err(err) => return Err(err),
                };

                let metadata = GroupMetadata {
                    inspire_record,
                    table_num,
                    cmenergies,
                    reaction,
                    observables: observables.clone(),
                    var_x: var_x.clone(),
                    var_y: dep_var.header.name.clone(),
                };

                let records = build_records(&indep_var.values, dep_var)?;
                if records.is_empty() {
                    if !dep_var.values.is_empty() {
                        warn!(
                            "excluded \"{}\" vs \"{}\" in {}: no numeric rows",
                            metadata.var_y, var_x, table.name
                        );
                    }
                    continue;
                }

                let count = records.len() as u64;
                self.write_group(txn, &metadata, &records)?;
                *staged_counts.entry(var_x.clone()).or_insert(0) += count;
            }
        }

        Ok(())
    }

    fn write_group(
        &mut self,
        txn: &mut Transaction,
        metadata: &GroupMetadata,
        records: &[Record],
    ) -> Result<(), CorpusError> {
        let dir = self.variables.directory_for(&metadata.var_x)?;
        let writer = self
            .writers
            .get(&metadata.var_x, txn, |_, _| RecordWriter::open(&dir))?;
        writer.write_group(txn, metadata, records)
    }

    /// Loads the fixed two-publication fixture used for smoke testing.
    pub fn load_mini_demo(&mut self) -> Result<(), CorpusError> {
        for (submission_id, groups) in mini_demo_fixture() {
            if self.submissions.contains(&submission_id) {
                warn!("skipping {}: already in the corpus", submission_id);
                self.stats.submissions_skipped += 1;
                continue;
            }

            let mut txn = Transaction::begin();
            let mut staged_counts: BTreeMap<String, u64> = BTreeMap::new();
            for (metadata, records) in &groups {
                self.write_group(&mut txn, metadata, records)?;
                *staged_counts.entry(metadata.var_x.clone()).or_insert(0) +=
                    records.len() as u64;
            }
            self.submissions.add(&submission_id, &mut txn)?;
            txn.commit()?;

            for (var, delta) in staged_counts {
                self.variables.update_count(&var, delta)?;
                self.stats.records_written += delta;
            }
            self.stats.submissions += 1;
        }
        Ok(())
    }

    /// Closes every cached writer under a final transaction.
    pub fn finish(&mut self) -> Result<(), CorpusError> {
        if self.writers.is_empty() {
            return Ok(());
        }
        let mut txn = Transaction::begin();
        self.writers.close_all(&mut txn)?;
        txn.commit()
    }
}

/// Extracts `N` from a `"Table N"` name.
fn parse_table_number(name: &str) -> Result<i64, CorpusError> {
    let digits = name.trim().trim_start_matches("Table").trim();
    digits.parse::<i64>().map_err(|_| {
        CorpusError::schema_error(format!("table name {:?} carries no number", name))
    })
}

/// Resolves the group's cmenergies: the `SQRT(S)/NUCLEON` qualifier if
/// present, else the table's `cmenergies` keyword, else 0. The on-disk
/// header stores the lower bound of the harmonized range.
fn group_cmenergies(table: &TableMeta, dep_var: &VariableBlock) -> Result<f32, CorpusError> {
    let raw = match find_qualifier(dep_var, "SQRT(S)/NUCLEON") {
        Ok(value) => Some(value),
        Err(err) if err.is_lookup_miss() => {
            let values = find_keyword(table, "cmenergies")?;
            match values.len() {
                0 => None,
                1 => Some(Scalar::from_yaml(&values[0])),
                _ => {
                    return Err(CorpusError::schema_error(
                        "cmenergies keyword must hold a single value",
                    ))
                }
            }
        }
        Err(err) => return Err(err),
    };

    match raw {
        Some(scalar) => {
            let (low, _high) = clean_cmenergies(&scalar)?;
            Ok(low as f32)
        }
        None => Ok(0.0),
    }
}

/// Builds the records of one `(indep_var, dep_var)` group, skipping rows
/// with `"-"` placeholders, stringly-typed x bounds or non-numeric y.
fn build_records(
    x_values: &[DataPoint],
    dep_var: &VariableBlock,
) -> Result<Vec<Record>, CorpusError> {
    let mut records = Vec::new();

    for (row, cell) in dep_var.values.iter().enumerate() {
        let y_scalar = Scalar::from_yaml_opt(cell.value.as_ref());
        if y_scalar.is_dash() {
            continue;
        }

        let x = x_values.get(row).ok_or_else(|| {
            CorpusError::schema_error(format!(
                "row {} has no matching independent-variable value",
                row
            ))
        })?;
        let (x_low, x_high) = match resolve_x_bounds(x)? {
            Some(bounds) => bounds,
            None => continue,
        };

        // A LaTeX range keeps the center as y and synthesizes a symmetric
        // error labelled "_pm".
        let mut pm_error: Option<f64> = None;
        let y = match &y_scalar {
            Scalar::Text(text) if is_plus_minus_range(&y_scalar) => {
                let (center, plus_minus) = parse_plus_minus_range(text)?;
                pm_error = Some(plus_minus);
                center
            }
            _ => match coerce_float(&y_scalar) {
                Ok(v) => v,
                Err(err) if err.is_row_local() => continue,
                Err(err) => return Err(err),
            },
        };

        let mut entries = cell.errors.clone();
        if let Some(plus_minus) = pm_error {
            entries.push(ErrorEntry {
                label: Some("_pm".to_string()),
                symerror: Some(Value::Number(serde_yaml::Number::from(plus_minus))),
                asymerror: None,
            });
        }
        let errors = clean_errors(y, &entries)?;

        records.push(Record {
            x_low: x_low as f32,
            x_high: x_high as f32,
            y: y as f32,
            errors,
        });
    }

    Ok(records)
}

/// Resolves one independent-variable cell to `(low, high)` bounds, or
/// `None` when the row must be skipped.
fn resolve_x_bounds(x: &DataPoint) -> Result<Option<(f64, f64)>, CorpusError> {
    if x.has_bounds() {
        let low = Scalar::from_yaml_opt(x.low.as_ref());
        let high = Scalar::from_yaml_opt(x.high.as_ref());
        // Stringly-typed bounds reject the row rather than coercing.
        if low.as_text().is_some() || high.as_text().is_some() {
            return Ok(None);
        }
        match (coerce_float(&low), coerce_float(&high)) {
            (Ok(lo), Ok(hi)) => Ok(Some((lo, hi))),
            _ => Ok(None),
        }
    } else {
        let value = Scalar::from_yaml_opt(x.value.as_ref());
        match value.as_text() {
            Some(text) if is_plus_minus_range(&value) => {
                let (center, plus_minus) = parse_plus_minus_range(text)?;
                Ok(Some((center - plus_minus, center + plus_minus)))
            }
            Some(_) => Ok(None),
            None => match coerce_float(&value) {
                Ok(v) => Ok(Some((v, v))),
                Err(_) => Ok(None),
            },
        }
    }
}

/// The two fake publications of the mini demo.
fn mini_demo_fixture() -> Vec<(String, Vec<(GroupMetadata, Vec<Record>)>)> {
    fn group(
        inspire_record: i64,
        table_num: i64,
        var_x: &str,
        var_y: &str,
        points: &[(f32, f32)],
    ) -> (GroupMetadata, Vec<Record>) {
        (
            GroupMetadata {
                inspire_record,
                table_num,
                cmenergies: 0.0,
                reaction: String::new(),
                observables: "unknown".to_string(),
                var_x: var_x.to_string(),
                var_y: var_y.to_string(),
            },
            points
                .iter()
                .map(|&(x, y)| Record::point(x, y, Vec::new()))
                .collect(),
        )
    }

    vec![
        (
            "ins1".to_string(),
            vec![
                group(1, 1, "time", "speed", &[(1.0, 10.0), (2.0, 11.0)]),
                group(
                    1,
                    2,
                    "time",
                    "acceleration",
                    &[(1.0, 5.0), (2.0, 5.0), (3.0, 5.0), (4.0, 4.0)],
                ),
            ],
        ),
        (
            "ins2".to_string(),
            vec![
                group(2, 1, "time", "distance", &[(1.0, 100.0), (2.0, 110.0)]),
                group(
                    2,
                    2,
                    "time",
                    "speed",
                    &[(1.0, 50.0), (2.0, 40.0), (3.0, 50.0), (4.0, 40.0)],
                ),
            ],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_table_number() {
        assert_eq!(parse_table_number("Table 1").unwrap(), 1);
        assert_eq!(parse_table_number("Table 27").unwrap(), 27);
        assert!(parse_table_number("Figure 3").is_err());
    }

    fn dep_var(doc: &str) -> VariableBlock {
        serde_yaml::from_str(doc).unwrap()
    }

    fn x_points(doc: &str) -> Vec<DataPoint> {
        serde_yaml::from_str(doc).unwrap()
    }

    #[test]
    fn test_build_records_skips_placeholders_and_strings() {
        let xs = x_points(
            "[{low: 0, high: 10}, {low: 10, high: 20}, {low: twenty, high: thirty}, {value: 30}]",
        );
        let dep = dep_var(
            "{header: {name: sigma}, values: [{value: 1.5}, {value: '-'}, {value: 2.5}, {value: junk}]}",
        );

        let records = build_records(&xs, &dep).unwrap();
        // Row 1 is the "-" placeholder, row 2 has string bounds, row 3 is
        // non-numeric y; only row 0 survives.
        assert_eq!(records.len(), 1);
        assert_eq!(records[0], Record { x_low: 0.0, x_high: 10.0, y: 1.5, errors: vec![] });
    }

    #[test]
    fn test_build_records_expands_x_range_strings() {
        let xs = x_points(r#"[{value: '5 $\pm$ 1'}]"#);
        let dep = dep_var("{header: {name: sigma}, values: [{value: 2}]}");

        let records = build_records(&xs, &dep).unwrap();
        assert_eq!(records[0].x_low, 4.0);
        assert_eq!(records[0].x_high, 6.0);
    }

    #[test]
    fn test_build_records_synthesizes_pm_error_for_y_ranges() {
        let xs = x_points("[{value: 1}]");
        let dep = dep_var(r#"{header: {name: sigma}, values: [{value: '10 $\pm$ 0.5'}]}"#);

        let records = build_records(&xs, &dep).unwrap();
        assert_eq!(records[0].y, 10.0);
        assert_eq!(records[0].errors.len(), 1);
        assert_eq!(records[0].errors[0].label, "_pm");
        assert_eq!(records[0].errors[0].plus, 0.5);
        assert_eq!(records[0].errors[0].minus, 0.5);
    }

    #[test]
    fn test_build_records_row_count_mismatch_is_fatal() {
        let xs = x_points("[{value: 1}]");
        let dep = dep_var("{header: {name: sigma}, values: [{value: 1}, {value: 2}]}");

        let err = build_records(&xs, &dep).unwrap_err();
        assert_eq!(err.category(), "schema");
    }

    #[test]
    fn test_group_cmenergies_prefers_qualifier() {
        let table: TableMeta = serde_yaml::from_str(
            "{name: Table 1, data_file: t.yaml, keywords: [{name: cmenergies, values: [200]}]}",
        )
        .unwrap();

        let with_qualifier = dep_var(
            "{header: {name: sigma}, qualifiers: [{name: 'SQRT(S)/NUCLEON', value: '2760 GeV'}]}",
        );
        assert_eq!(group_cmenergies(&table, &with_qualifier).unwrap(), 2760.0);

        let without = dep_var("{header: {name: sigma}}");
        assert_eq!(group_cmenergies(&table, &without).unwrap(), 200.0);

        let bare_table: TableMeta =
            serde_yaml::from_str("{name: Table 1, data_file: t.yaml}").unwrap();
        assert_eq!(group_cmenergies(&bare_table, &without).unwrap(), 0.0);
    }

    #[test]
    fn test_group_cmenergies_range_stores_lower_bound() {
        let table: TableMeta = serde_yaml::from_str(
            "{name: Table 1, data_file: t.yaml, keywords: [{name: cmenergies, values: ['200-400']}]}",
        )
        .unwrap();
        let dep = dep_var("{header: {name: sigma}}");
        assert_eq!(group_cmenergies(&table, &dep).unwrap(), 200.0);
    }
}
