// /////////////////////////////////////////////////////////////////////////////
// HEPCorpus Aggregator
// Copyright (c) 2025 HEPCorpus Contributors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Table Data Files
//!
//! Each table document references a data file (`TableN.yaml`) holding the
//! actual values: parallel `independent_variables[]` and
//! `dependent_variables[]` arrays whose `values[]` lists line up row by
//! row.
//!
//! Value cells are kept as raw `serde_yaml::Value` because their types are
//! unreliable in the wild: a bin bound may be a float, an integer, or a
//! string; a dependent value may be `"-"`; an error may be a percentage
//! string. The harmonizer owns all interpretation.

use serde::Deserialize;

/// Parsed contents of a table data file.
#[derive(Debug, Clone, Deserialize)]
pub struct DataTable {
    #[serde(default)]
    pub independent_variables: Vec<VariableBlock>,
    #[serde(default)]
    pub dependent_variables: Vec<VariableBlock>,
}

/// One variable column: header, optional qualifiers, and the value cells.
///
/// Independent and dependent variables share this shape; independent
/// variables simply never carry qualifiers.
#[derive(Debug, Clone, Deserialize)]
pub struct VariableBlock {
    pub header: VariableHeader,
    #[serde(default)]
    pub qualifiers: Vec<Qualifier>,
    #[serde(default)]
    pub values: Vec<DataPoint>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VariableHeader {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub units: Option<String>,
}

/// A per-column annotation on a dependent variable, e.g. the `RE` reaction
/// or `SQRT(S)/NUCLEON`.
#[derive(Debug, Clone, Deserialize)]
pub struct Qualifier {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub value: serde_yaml::Value,
}

/// One value cell. Independent variables use either `value` or the
/// `low`/`high` pair; dependent variables use `value` plus `errors`.
#[derive(Debug, Clone, Deserialize)]
pub struct DataPoint {
    #[serde(default)]
    pub value: Option<serde_yaml::Value>,
    #[serde(default)]
    pub low: Option<serde_yaml::Value>,
    #[serde(default)]
    pub high: Option<serde_yaml::Value>,
    #[serde(default)]
    pub errors: Vec<ErrorEntry>,
}

/// One error source attached to a value cell.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorEntry {
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub symerror: Option<serde_yaml::Value>,
    #[serde(default)]
    pub asymerror: Option<AsymError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AsymError {
    pub plus: serde_yaml::Value,
    pub minus: serde_yaml::Value,
}

impl DataPoint {
    /// True when the cell expresses a bin through explicit bounds.
    pub fn has_bounds(&self) -> bool {
        self.low.is_some() && self.high.is_some()
    }
}
