// /////////////////////////////////////////////////////////////////////////////
// HEPCorpus Aggregator
// Copyright (c) 2025 HEPCorpus Contributors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Bootstrap Module
//!
//! The bootstrap module sits **outside** the enterprise application layers
//! (domain, application, infrastructure) and provides:
//!
//! - **Argument parsing** - clap-based CLI with a validation layer
//! - **Exit codes** - Unix exit code mapping (BSD `sysexits.h`)
//! - **Platform abstraction** - the uninterruptible section used by the
//!   transaction commit path (SIGINT masking on POSIX, no-op elsewhere)
//! - **Logging** - a minimal bootstrap-phase logger routed through
//!   `tracing`
//!
//! ## Architecture Position
//!
//! Bootstrap can be depended on by the application crate, never the other
//! way around: the aggregator's commit path borrows the platform guard from
//! here, and `main` borrows CLI parsing and exit-code mapping, but no
//! domain type leaks into this crate.

pub mod cli;
pub mod exit_code;
pub mod logger;
pub mod platform;

// Re-export commonly used types
pub use cli::{parse_and_validate, ParseError, ValidatedCli, ValidatedCommand};
pub use exit_code::ExitCode;
pub use platform::{supports_interrupt_masking, uninterruptible, MaskedInterrupts};

/// Bootstrap and parse CLI arguments.
///
/// Parses the process arguments with clap, applies the validation layer and
/// returns the validated configuration. Clap handles `--help` and
/// `--version` itself and exits the process.
///
/// # Errors
///
/// Returns [`cli::ParseError`] if validation fails.
pub fn bootstrap_cli() -> Result<ValidatedCli, ParseError> {
    cli::parse_and_validate()
}
