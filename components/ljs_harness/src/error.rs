//! Error types for the harness

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Faults originating in the harness itself, as opposed to failures of the
/// interpreter under test. A test that fails, times out, or is skipped is an
/// [`Outcome`](crate::report::Outcome); a `HarnessError` aborts the run.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// A subprocess could not be spawned
    #[error("failed to spawn `{program}`: {source}")]
    Spawn {
        /// Program that was being launched
        program: String,
        /// Underlying spawn error
        source: io::Error,
    },

    /// Reading a fixture or fixture-adjacent file failed
    #[error("i/o error on `{path}`: {source}")]
    Io {
        /// File being accessed
        path: PathBuf,
        /// Underlying I/O error
        source: io::Error,
    },

    /// A spawned child was missing a standard stream we asked to be piped
    #[error("child `{program}` had no {stream} pipe")]
    MissingPipe {
        /// Program that was launched
        program: String,
        /// Stream name, `stdin` or `stdout`
        stream: &'static str,
    },

    /// Waiting on a child process failed
    #[error("failed to wait on `{program}`: {source}")]
    Wait {
        /// Program being waited on
        program: String,
        /// Underlying wait error
        source: io::Error,
    },
}

/// Result type for harness operations
pub type HarnessResult<T> = Result<T, HarnessError>;
