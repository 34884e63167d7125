// /////////////////////////////////////////////////////////////////////////////
// HEPCorpus Aggregator
// Copyright (c) 2025 HEPCorpus Contributors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # HEPCorpus CLI
//!
//! Entry point of the `hepcorpus` binary. The bootstrap crate parses and
//! validates the arguments; this file wires logging, loads settings and
//! dispatches to the application use cases.
//!
//! ```bash
//! # Ingest submissions
//! hepcorpus add ./corpus ./submissions/ins1116150 ./submissions/ins1198427
//!
//! # Smoke-test fixture
//! hepcorpus add-mini-demo ./corpus
//!
//! # Verify an existing corpus
//! hepcorpus check ./corpus
//! ```

use std::process;

use tracing_subscriber::EnvFilter;

use hepcorpus::application::use_cases::{check_corpus, ingest_submissions, load_mini_demo};
use hepcorpus::infrastructure::config::CorpusSettings;
use hepcorpus_bootstrap::{bootstrap_cli, ExitCode, ValidatedCli, ValidatedCommand};
use hepcorpus_domain::CorpusError;

fn main() -> process::ExitCode {
    let cli = match bootstrap_cli() {
        Ok(cli) => cli,
        Err(err) => {
            eprintln!("error: {}", err);
            return ExitCode::UsageError.into();
        }
    };

    init_tracing(cli.verbose);

    match run(&cli) {
        Ok(code) => code.into(),
        Err(err) => {
            tracing::error!("{}", err);
            exit_code_for(&err).into()
        }
    }
}

/// Log filter precedence: `HEPCORPUS_LOG`, else `-v` picks debug, else
/// info.
fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("HEPCORPUS_LOG")
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "info" }));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: &ValidatedCli) -> Result<ExitCode, CorpusError> {
    let mut settings = CorpusSettings::load(cli.config.as_deref())?;
    if let Some(capacity) = cli.cache_capacity {
        settings.writer_cache_capacity = capacity;
    }

    match &cli.command {
        ValidatedCommand::Add { corpus, submissions } => {
            ingest_submissions::execute(corpus, submissions, settings)?;
            Ok(ExitCode::Success)
        }
        ValidatedCommand::AddMiniDemo { corpus } => {
            load_mini_demo::execute(corpus, settings)?;
            Ok(ExitCode::Success)
        }
        ValidatedCommand::Check { corpus } => {
            let report = check_corpus::execute(corpus, &settings)?;
            println!(
                "checked {} variables: {} groups, {} records",
                report.variables, report.groups, report.records
            );
            if report.is_clean() {
                Ok(ExitCode::Success)
            } else {
                for problem in &report.problems {
                    eprintln!("problem: {}", problem);
                }
                Ok(ExitCode::DataError)
            }
        }
    }
}

fn exit_code_for(err: &CorpusError) -> ExitCode {
    match err.category() {
        "io" => ExitCode::IoError,
        "schema" | "serialization" | "harmonization" | "codec" | "lookup" => ExitCode::DataError,
        "configuration" => ExitCode::UsageError,
        "transaction" | "writer" | "internal" | "index" => ExitCode::Software,
        _ => ExitCode::Error,
    }
}
