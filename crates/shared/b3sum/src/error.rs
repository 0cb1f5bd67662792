//! Errors surfaced at the CLI boundary.
//!
//! The `b3` hash core itself never fails (see its crate docs); every error a user of this binary
//! can hit originates from parsing a flag or touching the filesystem.

use std::path::PathBuf;
use thiserror::Error;

/// CLI-boundary error kinds.
#[derive(Debug, Error)]
pub(crate) enum CliError {
    /// `--keyed` was not exactly 64 hex digits (32 bytes).
    #[error("--keyed key must be exactly 64 hex digits (32 bytes), got {digits} digits")]
    InvalidKeyHex {
        /// Number of digits actually provided
        digits: usize,
    },
    /// `--keyed` contained non-hex characters.
    #[error("--keyed key is not valid hex: {0}")]
    InvalidKeyHexDigits(#[from] hex::FromHexError),
    /// `--length` does not fit in this platform's `usize`.
    #[error("--length {0} does not fit in this platform's output buffer")]
    InvalidLengthArg(u64),
    /// Reading the input file failed.
    #[error("failed to read {path}: {source}")]
    IoError {
        /// Path that could not be read
        path: PathBuf,
        /// Underlying OS error
        #[source]
        source: std::io::Error,
    },
}
