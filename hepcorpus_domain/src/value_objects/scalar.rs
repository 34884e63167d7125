// /////////////////////////////////////////////////////////////////////////////
// HEPCorpus Aggregator
// Copyright (c) 2025 HEPCorpus Contributors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Scalar Boundary Type
//!
//! Submission documents carry values whose YAML type says little about their
//! meaning: integers, floats, strings that mean floats (`"6.28e3"`,
//! `"12%"`, `"3.1 $\pm$ 0.2"`), and the `"-"` placeholder for a missing
//! measurement. [`Scalar`] is the tagged variant those values are funneled
//! through at the edge of the harmonizer; everything downstream of the
//! harmonizer consumes strict floats only.

use std::fmt;

/// A dynamically-typed YAML scalar as found in submission value cells.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    /// Absent value (`null`, `~`, or a missing key).
    Null,
    Int(i64),
    Float(f64),
    Text(String),
}

impl Scalar {
    /// Converts a parsed YAML value into the scalar model.
    ///
    /// Booleans and non-scalar nodes are preserved as text so that float
    /// coercion rejects them with a message naming the offending value.
    pub fn from_yaml(value: &serde_yaml::Value) -> Self {
        use serde_yaml::Value;
        match value {
            Value::Null => Scalar::Null,
            Value::Bool(b) => Scalar::Text(b.to_string()),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Scalar::Int(i)
                } else {
                    Scalar::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            Value::String(s) => Scalar::Text(s.clone()),
            _ => Scalar::Text("<non-scalar>".to_string()),
        }
    }

    /// Converts an optional YAML value, mapping `None` to [`Scalar::Null`].
    pub fn from_yaml_opt(value: Option<&serde_yaml::Value>) -> Self {
        value.map(Self::from_yaml).unwrap_or(Scalar::Null)
    }

    /// True for the `"-"` placeholder used for missing measurements.
    pub fn is_dash(&self) -> bool {
        matches!(self, Scalar::Text(t) if t == "-")
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Scalar::Text(t) => Some(t),
            _ => None,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Null => write!(f, "null"),
            Scalar::Int(i) => write!(f, "{}", i),
            Scalar::Float(v) => write!(f, "{}", v),
            Scalar::Text(t) => write!(f, "{}", t),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_yaml_mapping() {
        let v: serde_yaml::Value = serde_yaml::from_str("42").unwrap();
        assert_eq!(Scalar::from_yaml(&v), Scalar::Int(42));

        let v: serde_yaml::Value = serde_yaml::from_str("2.5").unwrap();
        assert_eq!(Scalar::from_yaml(&v), Scalar::Float(2.5));

        let v: serde_yaml::Value = serde_yaml::from_str("'7000 GeV'").unwrap();
        assert_eq!(Scalar::from_yaml(&v), Scalar::Text("7000 GeV".into()));

        let v: serde_yaml::Value = serde_yaml::from_str("null").unwrap();
        assert_eq!(Scalar::from_yaml(&v), Scalar::Null);
    }

    #[test]
    fn test_dash_placeholder() {
        assert!(Scalar::Text("-".into()).is_dash());
        assert!(!Scalar::Text("-5".into()).is_dash());
        assert!(!Scalar::Int(-5).is_dash());
    }

    #[test]
    fn test_display() {
        assert_eq!(Scalar::Int(13000).to_string(), "13000");
        assert_eq!(Scalar::Text("SIG".into()).to_string(), "SIG");
        assert_eq!(Scalar::Null.to_string(), "null");
    }
}
