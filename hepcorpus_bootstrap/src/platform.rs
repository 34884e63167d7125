// /////////////////////////////////////////////////////////////////////////////
// HEPCorpus Aggregator
// Copyright (c) 2025 HEPCorpus Contributors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Platform Abstraction Module
//!
//! OS-specific functionality needed by the aggregator, which today is a
//! single concern: the **uninterruptible section**. Transaction commits and
//! variable-index rewrites must not be torn apart by a user interrupt, so
//! on POSIX platforms SIGINT delivery is blocked with `sigprocmask` for the
//! duration of the section and released (with any pending signal then
//! delivered) when the guard drops.
//!
//! On platforms without signal masking the guard is a no-op: the commit
//! proceeds unguarded and the corpus relies on the submission-set witness
//! to detect a torn commit on the next run.
//!
//! ## Usage
//!
//! ```rust
//! use hepcorpus_bootstrap::platform::uninterruptible;
//!
//! let flushed = uninterruptible(|| {
//!     // drain buffers, close files...
//!     42
//! });
//! assert_eq!(flushed, 42);
//! ```

/// RAII guard for a section with SIGINT delivery blocked.
///
/// Construction blocks SIGINT for the calling thread; dropping the guard
/// restores the previous signal mask. Guards nest: each one restores
/// exactly the mask it observed.
pub struct MaskedInterrupts {
    #[cfg(unix)]
    previous: libc::sigset_t,
}

impl MaskedInterrupts {
    /// Begins an uninterruptible section.
    #[cfg(unix)]
    pub fn begin() -> Self {
        // Safety: sigemptyset/sigaddset/sigprocmask only touch the mask of
        // the calling thread and the sets are local to this function.
        unsafe {
            let mut blocked: libc::sigset_t = std::mem::zeroed();
            libc::sigemptyset(&mut blocked);
            libc::sigaddset(&mut blocked, libc::SIGINT);

            let mut previous: libc::sigset_t = std::mem::zeroed();
            libc::sigprocmask(libc::SIG_BLOCK, &blocked, &mut previous);

            Self { previous }
        }
    }

    /// Begins an uninterruptible section (no-op on this platform).
    #[cfg(not(unix))]
    pub fn begin() -> Self {
        Self {}
    }
}

impl Drop for MaskedInterrupts {
    fn drop(&mut self) {
        #[cfg(unix)]
        // Safety: restores the mask captured in begin() for this thread.
        unsafe {
            libc::sigprocmask(libc::SIG_SETMASK, &self.previous, std::ptr::null_mut());
        }
    }
}

/// Runs `f` with interactive interrupts masked (where supported).
pub fn uninterruptible<T>(f: impl FnOnce() -> T) -> T {
    let _guard = MaskedInterrupts::begin();
    f()
}

/// Whether this platform actually masks interrupts during commit.
pub const fn supports_interrupt_masking() -> bool {
    cfg!(unix)
}
