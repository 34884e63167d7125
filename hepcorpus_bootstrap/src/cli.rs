// /////////////////////////////////////////////////////////////////////////////
// HEPCorpus Aggregator
// Copyright (c) 2025 HEPCorpus Contributors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Command-Line Interface Module
//!
//! Bootstrap-layer CLI handling: clap parsing followed by a validation pass.
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │  1. Cli::parse()                    │  Parse CLI with clap
//! └─────────────────┬───────────────────┘
//!                   ↓
//! ┌─────────────────────────────────────┐
//! │  2. validate_cli()                  │  Paths and ranges checked
//! └─────────────────┬───────────────────┘
//!                   ↓
//! ┌─────────────────────────────────────┐
//! │  3. ValidatedCli                    │  Safe, validated config
//! └─────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use thiserror::Error;

/// CLI parse/validation errors
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("invalid value for --{arg}: {reason}")]
    InvalidValue { arg: String, reason: String },

    #[error("submission directory {0} does not exist or is not a directory")]
    MissingSubmission(PathBuf),

    #[error("corpus directory {0} does not exist")]
    MissingCorpus(PathBuf),
}

/// Raw clap surface of the `hepcorpus` binary.
#[derive(Debug, Parser)]
#[command(
    name = "hepcorpus",
    version,
    about = "Aggregates HEPData submissions into a per-variable binary corpus"
)]
pub struct Cli {
    /// Enable verbose (debug-level) logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to an optional hepcorpus.toml settings file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Override the open-writer cache capacity
    #[arg(long, global = true)]
    pub cache_capacity: Option<usize>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Ingest one or more submission directories into the corpus
    Add {
        /// Corpus root directory (created if absent)
        corpus: PathBuf,

        /// Submission directories, each holding a submission.yaml
        #[arg(required = true)]
        submissions: Vec<PathBuf>,
    },

    /// Load the fixed two-publication mini fixture, for smoke testing
    AddMiniDemo {
        /// Corpus root directory (created if absent)
        corpus: PathBuf,
    },

    /// Parse every record file of a corpus and verify the record counts
    Check {
        /// Corpus root directory
        corpus: PathBuf,
    },
}

/// Validated CLI configuration.
#[derive(Debug, Clone)]
pub struct ValidatedCli {
    pub command: ValidatedCommand,
    pub verbose: bool,
    pub config: Option<PathBuf>,
    pub cache_capacity: Option<usize>,
}

/// Validated command variants
#[derive(Debug, Clone)]
pub enum ValidatedCommand {
    Add {
        corpus: PathBuf,
        submissions: Vec<PathBuf>,
    },
    AddMiniDemo {
        corpus: PathBuf,
    },
    Check {
        corpus: PathBuf,
    },
}

/// Parse and validate CLI arguments.
///
/// # Errors
///
/// Returns [`ParseError`] if any validation fails.
pub fn parse_and_validate() -> Result<ValidatedCli, ParseError> {
    validate_cli(Cli::parse())
}

fn validate_cli(cli: Cli) -> Result<ValidatedCli, ParseError> {
    if let Some(capacity) = cli.cache_capacity {
        if capacity == 0 {
            return Err(ParseError::InvalidValue {
                arg: "cache-capacity".to_string(),
                reason: "must be greater than 0".to_string(),
            });
        }
    }

    if let Some(ref path) = cli.config {
        if !path.is_file() {
            return Err(ParseError::InvalidValue {
                arg: "config".to_string(),
                reason: format!("{} is not a readable file", path.display()),
            });
        }
    }

    let command = match cli.command {
        Commands::Add { corpus, submissions } => {
            for submission in &submissions {
                if !submission.is_dir() {
                    return Err(ParseError::MissingSubmission(submission.clone()));
                }
            }
            ValidatedCommand::Add { corpus, submissions }
        }
        Commands::AddMiniDemo { corpus } => ValidatedCommand::AddMiniDemo { corpus },
        Commands::Check { corpus } => {
            if !corpus.is_dir() {
                return Err(ParseError::MissingCorpus(corpus));
            }
            ValidatedCommand::Check { corpus }
        }
    };

    Ok(ValidatedCli {
        command,
        verbose: cli.verbose,
        config: cli.config,
        cache_capacity: cli.cache_capacity,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_requires_submissions() {
        let result = Cli::try_parse_from(["hepcorpus", "add", "/tmp/corpus"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_add_parses_multiple_submissions() {
        let cli =
            Cli::try_parse_from(["hepcorpus", "add", "corpus", "ins1", "ins2", "-v"]).unwrap();
        assert!(cli.verbose);
        match cli.command {
            Commands::Add { corpus, submissions } => {
                assert_eq!(corpus, PathBuf::from("corpus"));
                assert_eq!(submissions.len(), 2);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_zero_cache_capacity_rejected() {
        let tmp = std::env::temp_dir();
        let cli = Cli::try_parse_from([
            "hepcorpus",
            "--cache-capacity",
            "0",
            "add",
            "corpus",
            tmp.to_str().unwrap(),
        ])
        .unwrap();
        let err = validate_cli(cli).unwrap_err();
        assert!(matches!(err, ParseError::InvalidValue { .. }));
    }

    #[test]
    fn test_missing_submission_rejected() {
        let cli = Cli::try_parse_from([
            "hepcorpus",
            "add",
            "corpus",
            "/definitely/not/a/real/submission",
        ])
        .unwrap();
        let err = validate_cli(cli).unwrap_err();
        assert!(matches!(err, ParseError::MissingSubmission(_)));
    }

    #[test]
    fn test_mini_demo_and_check() {
        let tmp = std::env::temp_dir();
        let cli = Cli::try_parse_from(["hepcorpus", "add-mini-demo", "corpus"]).unwrap();
        assert!(matches!(
            validate_cli(cli).unwrap().command,
            ValidatedCommand::AddMiniDemo { .. }
        ));

        let cli =
            Cli::try_parse_from(["hepcorpus", "check", tmp.to_str().unwrap()]).unwrap();
        assert!(matches!(
            validate_cli(cli).unwrap().command,
            ValidatedCommand::Check { .. }
        ));
    }
}
