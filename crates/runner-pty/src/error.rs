//! Error types for the runner-pty crate.

use std::io;

/// The error type for PTY operations.
#[derive(Debug, thiserror::Error)]
pub enum PtyError {
    /// Failed to allocate a new PTY pair.
    #[error("failed to create PTY: {0}")]
    Create(#[source] io::Error),

    /// Failed to spawn the child process.
    #[error("failed to spawn `{program}`: {source}")]
    Spawn {
        /// The program that could not be started.
        program: String,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// An I/O error occurred on the PTY.
    #[error("PTY I/O error: {0}")]
    Io(#[from] io::Error),

    /// Failed to wait for the child process.
    #[error("failed to wait for child: {0}")]
    Wait(#[source] io::Error),

    /// Failed to signal the child process.
    #[error("failed to send signal: {0}")]
    Signal(#[source] io::Error),

    /// The command line could not be parsed.
    #[error("invalid command line: {reason}")]
    InvalidCommand {
        /// Why the command line was rejected.
        reason: String,
    },
}

impl PtyError {
    /// Create an invalid command error.
    pub fn invalid_command(reason: impl Into<String>) -> Self {
        Self::InvalidCommand {
            reason: reason.into(),
        }
    }

    #[cfg(unix)]
    pub(crate) fn from_errno(errno: rustix::io::Errno) -> io::Error {
        io::Error::from_raw_os_error(errno.raw_os_error())
    }
}

/// Result type alias for PTY operations.
pub type Result<T> = std::result::Result<T, PtyError>;
