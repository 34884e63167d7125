// /////////////////////////////////////////////////////////////////////////////
// HEPCorpus Aggregator
// Copyright (c) 2025 HEPCorpus Contributors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Exit Code Management
//!
//! Standardized Unix exit codes following BSD `sysexits.h` conventions:
//!
//! - **0**: Success
//! - **1**: General error
//! - **64-74**: Specific error conditions (`sysexits.h` subset)

use std::fmt;

/// Exit codes following Unix conventions (BSD sysexits.h)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(i32)]
pub enum ExitCode {
    /// Successful termination (0)
    #[default]
    Success = 0,

    /// General error (1)
    Error = 1,

    /// Command line usage error (64)
    UsageError = 64,

    /// Data format error (65): malformed submissions, corrupt record
    /// streams
    DataError = 65,

    /// Cannot open input (66): missing submission directory or data file
    NoInput = 66,

    /// Internal software error (70): transaction/writer misuse
    Software = 70,

    /// Cannot create output (73): corpus directory not writable
    CantCreate = 73,

    /// I/O error (74)
    IoError = 74,
}

impl ExitCode {
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_i32())
    }
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        std::process::ExitCode::from(code.as_i32() as u8)
    }
}
