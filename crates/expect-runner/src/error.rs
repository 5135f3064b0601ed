//! Error types for expect-runner.
//!
//! Everything here is fatal to a run. Conditions a scenario expects (a
//! timeout it registered a sentinel for, a panic banner, end-of-stream) are
//! handled as ordinary pattern matches and never surface as errors. Timeout
//! and EOF errors carry the tail of the output buffer so the operator can see
//! what the child was doing when the run gave up.

use std::time::Duration;

use thiserror::Error;

use crate::state::StateId;

/// Maximum length of buffer content to display in error messages.
const MAX_BUFFER_DISPLAY: usize = 500;

/// Lines of buffer tail shown when the buffer is too large to show whole.
const TAIL_LINES: usize = 6;

/// Format buffer content for display, keeping only the tail of large buffers.
fn format_buffer_snippet(buffer: &str) -> String {
    if buffer.is_empty() {
        return "(empty buffer)".to_string();
    }

    let lines: Vec<&str> = buffer.lines().collect();
    if buffer.len() <= MAX_BUFFER_DISPLAY || lines.len() <= TAIL_LINES {
        return format!(
            "┌─ buffer ({} bytes) ──────────────────────\n│ {}\n└────────────────────────────────────────",
            buffer.len(),
            lines.join("\n│ ")
        );
    }

    let tail = &lines[lines.len() - TAIL_LINES..];
    format!(
        "┌─ buffer ({} bytes, {} lines) ─────────────\n│ ... ({} lines hidden)\n│ {}\n└────────────────────────────────────────",
        buffer.len(),
        lines.len(),
        lines.len() - tail.len(),
        tail.join("\n│ ")
    )
}

fn format_timeout_error(duration: Duration, buffer: &str) -> String {
    format!(
        "timeout after {duration:?} with no active pattern matching and no timeout pattern registered\n\
         \n\
         {}",
        format_buffer_snippet(buffer)
    )
}

fn format_eof_error(buffer: &str) -> String {
    format!(
        "child output closed with no active pattern matching and no EOF pattern registered\n\
         \n\
         {}",
        format_buffer_snippet(buffer)
    )
}

/// The main error type for expect-runner operations.
#[derive(Debug, Error)]
pub enum ExpectError {
    /// Failed to spawn the child process.
    #[error("failed to spawn process: {0}")]
    Spawn(#[from] runner_pty::PtyError),

    /// An I/O error talking to the child or reading configuration.
    #[error("{context}: {source}")]
    IoWithContext {
        /// What operation was being performed.
        context: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The wait timed out and no active pattern handles timeouts.
    #[error("{}", format_timeout_error(*duration, buffer))]
    Timeout {
        /// The timeout duration that elapsed.
        duration: Duration,
        /// Buffer contents at the time of timeout.
        buffer: String,
    },

    /// The child's output closed and no active pattern handles EOF.
    #[error("{}", format_eof_error(buffer))]
    Eof {
        /// Buffer contents when EOF was reached.
        buffer: String,
    },

    /// Invalid regex pattern.
    #[error("invalid regex pattern: {0}")]
    Regex(#[from] regex::Error),

    /// A state id that is not registered with the runner.
    #[error("state {id} is not registered with this runner")]
    UnknownState {
        /// The dangling id.
        id: StateId,
    },

    /// A pattern index that does not exist in its state.
    #[error("state {state} has no pattern at index {index}")]
    UnknownPattern {
        /// The state that was addressed.
        state: StateId,
        /// The missing pattern index.
        index: usize,
    },

    /// A command operation was addressed to a state without a command queue.
    #[error("state {id} does not own a command sequence")]
    NotACommandState {
        /// The state that was addressed.
        id: StateId,
    },

    /// Configuration error.
    #[error("configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },
}

/// Result type alias for expect-runner operations.
pub type Result<T> = std::result::Result<T, ExpectError>;

impl ExpectError {
    /// Create a timeout error.
    pub fn timeout(duration: Duration, buffer: impl Into<String>) -> Self {
        Self::Timeout {
            duration,
            buffer: buffer.into(),
        }
    }

    /// Create an EOF error.
    pub fn eof(buffer: impl Into<String>) -> Self {
        Self::Eof {
            buffer: buffer.into(),
        }
    }

    /// Create an I/O error with context.
    pub fn io_context(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::IoWithContext {
            context: context.into(),
            source,
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Whether this is a timeout error.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Whether this is an EOF error.
    #[must_use]
    pub const fn is_eof(&self) -> bool {
        matches!(self, Self::Eof { .. })
    }

    /// Get the buffer contents carried by timeout and EOF errors.
    #[must_use]
    pub fn buffer(&self) -> Option<&str> {
        match self {
            Self::Timeout { buffer, .. } | Self::Eof { buffer } => Some(buffer),
            _ => None,
        }
    }
}
