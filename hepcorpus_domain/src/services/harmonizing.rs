// /////////////////////////////////////////////////////////////////////////////
// HEPCorpus Aggregator
// Copyright (c) 2025 HEPCorpus Contributors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Harmonizer
//!
//! Coercion of the weakly-typed submission input into the strict numeric
//! model, plus the small lookup helpers the aggregator needs (keywords,
//! qualifiers, the INSPIRE id, reaction analysis).
//!
//! ## Coercion rules
//!
//! - An IEEE-754 float passes through, except that infinities clamp to
//!   `±1.7e308` and NaN fails with a not-numeric error
//! - Strings are accepted in three shapes: plain decimal, `mantissa e
//!   exponent`, and the `mantissa exp exponent` variant (any internal
//!   spacing); everything else is not numeric
//! - `"<float> $\pm$ <float>"` denotes a centered range. Independent
//!   variables expand it to `low`/`high` bounds; dependent variables keep
//!   the center and synthesize a symmetric `_pm` error
//! - Percentage error strings convert as `y * pct / 100`
//! - `cmenergies` accepts bare numbers, `"<n> GeV"` and `"<lo>-<hi>"`
//!   ranges (a hyphen in first position is a minus sign, not a range)
//!
//! ## Failure classification
//!
//! Coercion failures are row-local ([`CorpusError::NotNumeric`]); schema
//! contradictions (duplicate keywords, malformed error entries) are fatal
//! ([`CorpusError::SchemaError`]); lookup misses are
//! [`CorpusError::KeywordNotFound`] / [`CorpusError::QualifierNotFound`]
//! and are usually substituted with defaults by the caller.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::entities::{ErrorEntry, SubmissionHeader, TableMeta, VariableBlock, VariableHeader};
use crate::error::CorpusError;
use crate::value_objects::{RecordError, Scalar};

/// Largest finite stand-in for infinite input values.
const FLOAT_CLAMP: f64 = 1.7e308;

// All this to parse a floating point number
const FLOAT_SRC: &str = r"[-+]?(?:\d+(?:\.\d*)?|\.\d+)(?:[eE][-+]?\d+)?";

static PLAIN_FLOAT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!("^{}$", FLOAT_SRC)).unwrap());

static EXP_NOTATION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!("^({}) *exp *({})$", FLOAT_SRC, FLOAT_SRC)).unwrap());

static PLUS_MINUS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"^({}) *\$\\pm\$ *({})$", FLOAT_SRC, FLOAT_SRC)).unwrap());

static REACTION_ARROW_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r" *-+> *").unwrap());

fn clamp_nonfinite(value: f64, original: &Scalar) -> Result<f64, CorpusError> {
    if value.is_nan() {
        Err(CorpusError::not_numeric(original.to_string()))
    } else if value.is_infinite() {
        Ok(if value > 0.0 { FLOAT_CLAMP } else { -FLOAT_CLAMP })
    } else {
        Ok(value)
    }
}

/// Coerces a scalar into a finite `f64`.
pub fn coerce_float(value: &Scalar) -> Result<f64, CorpusError> {
    match value {
        Scalar::Int(i) => Ok(*i as f64),
        Scalar::Float(v) => clamp_nonfinite(*v, value),
        Scalar::Text(t) => {
            let t = t.trim();
            let parsed = if let Some(caps) = EXP_NOTATION_RE.captures(t) {
                format!("{}e{}", &caps[1], &caps[2]).parse::<f64>()
            } else if PLAIN_FLOAT_RE.is_match(t) {
                t.parse::<f64>()
            } else {
                return Err(CorpusError::not_numeric(t));
            };
            match parsed {
                Ok(v) => clamp_nonfinite(v, value),
                Err(_) => Err(CorpusError::not_numeric(t)),
            }
        }
        Scalar::Null => Err(CorpusError::not_numeric("null")),
    }
}

/// Coerces a scalar, mapping the `"-"` placeholder to `None`.
pub fn coerce_float_or_null(value: &Scalar) -> Result<Option<f64>, CorpusError> {
    if value.is_dash() {
        Ok(None)
    } else {
        coerce_float(value).map(Some)
    }
}

/// True when the scalar is a `"<float> $\pm$ <float>"` range string.
pub fn is_plus_minus_range(value: &Scalar) -> bool {
    matches!(value, Scalar::Text(t) if PLUS_MINUS_RE.is_match(t.trim()))
}

/// Parses a `$\pm$` range string into `(center, plus_minus)`.
pub fn parse_plus_minus_range(text: &str) -> Result<(f64, f64), CorpusError> {
    let caps = PLUS_MINUS_RE
        .captures(text.trim())
        .ok_or_else(|| CorpusError::not_numeric(text))?;
    let center = coerce_float(&Scalar::Text(caps[1].to_string()))?;
    let plus_minus = coerce_float(&Scalar::Text(caps[2].to_string()))?;
    Ok((center, plus_minus))
}

/// Harmonizes a `cmenergies` value into a `(min, max)` pair.
///
/// Numbers become a degenerate range; strings are trimmed, stripped of a
/// trailing ` GeV`, and split on the last hyphen past the first character.
pub fn clean_cmenergies(value: &Scalar) -> Result<(f64, f64), CorpusError> {
    match value {
        Scalar::Int(i) => Ok((*i as f64, *i as f64)),
        Scalar::Float(v) => Ok((*v, *v)),
        Scalar::Text(t) => {
            let mut t = t.trim();
            if let Some(stripped) = t.strip_suffix(" GeV") {
                t = stripped.trim_end();
            }

            // A hyphen anywhere but the first character splits a range;
            // a leading hyphen is a minus sign.
            match t.rfind('-').filter(|idx| *idx >= 1) {
                Some(idx) => {
                    let lo = parse_point(&t[..idx])?;
                    let hi = parse_point(&t[idx + 1..])?;
                    Ok((lo, hi))
                }
                None => {
                    let v = parse_point(t)?;
                    Ok((v, v))
                }
            }
        }
        Scalar::Null => Err(CorpusError::schema_error("cmenergies value is null")),
    }
}

fn parse_point(text: &str) -> Result<f64, CorpusError> {
    text.trim()
        .parse::<f64>()
        .map_err(|_| CorpusError::not_numeric(text))
}

/// Converts one raw error value into an absolute `f64`.
///
/// Accepts numbers, percentage strings (`"5%"` means `y * 5 / 100`) and
/// numeric strings. A malformed error value is a schema error: unlike a
/// non-numeric measurement it cannot be skipped row-locally without
/// silently losing uncertainty information.
fn clean_error_value(y: f64, value: &Scalar) -> Result<f64, CorpusError> {
    match value {
        Scalar::Int(i) => Ok(*i as f64),
        Scalar::Float(v) => Ok(*v),
        Scalar::Text(t) => {
            let t = t.trim();
            if let Some(pct_text) = t.strip_suffix('%') {
                let pct = pct_text.trim().parse::<f64>().map_err(|_| {
                    CorpusError::schema_error(format!("invalid percentage error value: {}", t))
                })?;
                Ok(y * pct / 100.0)
            } else {
                coerce_float(value).map_err(|_| {
                    CorpusError::schema_error(format!("invalid format for error value: {}", t))
                })
            }
        }
        Scalar::Null => Err(CorpusError::schema_error("error value is null")),
    }
}

/// Harmonizes the error list of one value cell.
///
/// Asymmetric entries convert both branches; symmetric entries store the
/// converted value in both slots. A missing label becomes the empty string
/// (string id 0 once interned).
pub fn clean_errors(y: f64, errors: &[ErrorEntry]) -> Result<Vec<RecordError>, CorpusError> {
    let mut out = Vec::with_capacity(errors.len());
    for entry in errors {
        let label = entry.label.clone().unwrap_or_default();

        let (minus, plus) = if let Some(asym) = &entry.asymerror {
            let minus = clean_error_value(y, &Scalar::from_yaml(&asym.minus))?;
            let plus = clean_error_value(y, &Scalar::from_yaml(&asym.plus))?;
            (minus, plus)
        } else if let Some(sym) = &entry.symerror {
            let v = clean_error_value(y, &Scalar::from_yaml(sym))?;
            (v, v)
        } else {
            return Err(CorpusError::schema_error(format!(
                "error entry \"{}\" has neither symerror nor asymerror",
                label
            )));
        };

        out.push(RecordError {
            label,
            minus: minus as f32,
            plus: plus as f32,
        });
    }
    Ok(out)
}

/// Finds the unique keyword entry named `name`.
///
/// Zero matches yield an empty list; two or more are a schema error.
pub fn find_keyword<'a>(
    table: &'a TableMeta,
    name: &str,
) -> Result<&'a [serde_yaml::Value], CorpusError> {
    let mut matches = table.keywords.iter().filter(|k| k.name == name);
    match (matches.next(), matches.next()) {
        (None, _) => Ok(&[]),
        (Some(k), None) => Ok(&k.values),
        (Some(_), Some(_)) => Err(CorpusError::schema_error(format!(
            "too many entries for keyword {}",
            name
        ))),
    }
}

/// Finds the unique qualifier named `name` on a dependent variable.
pub fn find_qualifier(dep_var: &VariableBlock, name: &str) -> Result<Scalar, CorpusError> {
    let mut matches = dep_var.qualifiers.iter().filter(|q| q.name == name);
    match (matches.next(), matches.next()) {
        (None, _) => Err(CorpusError::QualifierNotFound(name.to_string())),
        (Some(q), None) => Ok(Scalar::from_yaml(&q.value)),
        (Some(_), Some(_)) => Err(CorpusError::schema_error(format!(
            "too many entries for qualifier {}",
            name
        ))),
    }
}

/// Finds every qualifier named `name`, in document order.
pub fn find_qualifier_many(
    dep_var: &VariableBlock,
    name: &str,
) -> Result<Vec<Scalar>, CorpusError> {
    let matches: Vec<Scalar> = dep_var
        .qualifiers
        .iter()
        .filter(|q| q.name == name)
        .map(|q| Scalar::from_yaml(&q.value))
        .collect();
    if matches.is_empty() {
        Err(CorpusError::QualifierNotFound(name.to_string()))
    } else {
        Ok(matches)
    }
}

/// Extracts the INSPIRE record id from a submission header.
pub fn find_inspire_record(header: &SubmissionHeader) -> Result<i64, CorpusError> {
    let mut matches = header
        .record_ids
        .iter()
        .filter(|r| r.id_type == "inspire");
    match (matches.next(), matches.next()) {
        (Some(r), None) => Ok(r.id),
        (None, _) => Err(CorpusError::schema_error(
            "submission header has no inspire record id",
        )),
        (Some(_), Some(_)) => Err(CorpusError::schema_error(
            "submission header has multiple inspire record ids",
        )),
    }
}

/// Renders a variable header as the corpus-facing variable name,
/// annotating the units when present: `"PT (GeV)"`.
pub fn variable_name(header: &VariableHeader) -> String {
    match &header.units {
        Some(units) if !units.trim().is_empty() => format!("{} ({})", header.name, units),
        _ => header.name.clone(),
    }
}

/// The two stages of a reaction string, split into particles.
#[derive(Debug, Clone, PartialEq)]
pub struct Reaction {
    pub input: String,
    pub output: String,
    pub particles_in: Vec<String>,
    pub particles_out: Vec<String>,
}

/// Analyzes a reaction string such as `"P P --> Z0 X"`.
///
/// The arrow is any run of hyphens followed by `>`, with optional spaces.
/// The first stage is the input, the last stage the output; particles are
/// space-separated within a stage.
pub fn parse_reaction(text: &str) -> Reaction {
    let stages: Vec<&str> = REACTION_ARROW_RE.split(text.trim()).collect();
    let input = stages.first().copied().unwrap_or("").trim().to_string();
    let output = stages.last().copied().unwrap_or("").trim().to_string();
    Reaction {
        particles_in: input.split_whitespace().map(str::to_string).collect(),
        particles_out: output.split_whitespace().map(str::to_string).collect(),
        input,
        output,
    }
}
