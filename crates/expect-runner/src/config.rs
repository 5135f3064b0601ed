//! Configuration types for expect-runner.
//!
//! A [`RunnerConfig`] is assembled from defaults, an optional TOML file
//! ([`file`]) and `EXPECT_RUNNER_*` environment variables ([`env`]), in that
//! order of increasing precedence. Callers may override fields afterwards
//! with the builder methods.

pub mod env;
pub mod file;

use std::path::Path;
use std::time::Duration;

use runner_pty::WindowSize;

use crate::error::Result;

/// Default timeout for a single wait on the child's output.
///
/// Just over an hour: emulated hardware running a full test suite can stay
/// silent for a long time between prompts.
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(3660);

/// Default delay before each write to the child.
pub const DEFAULT_SEND_DELAY: Duration = Duration::from_millis(50);

/// Default output buffer size (1 MiB).
pub const DEFAULT_BUFFER_SIZE: usize = 1024 * 1024;

/// Configuration for a run.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Timeout applied to every wait on the child's output.
    pub wait_timeout: Duration,

    /// Delay before each write to the child.
    pub send_delay: Duration,

    /// Line terminator appended by line sends.
    pub line_ending: LineEnding,

    /// Whether to mirror the child's output to stdout.
    pub echo: bool,

    /// Maximum number of unmatched output bytes kept for matching.
    pub buffer_size: usize,

    /// Terminal size presented to the child.
    pub window_size: WindowSize,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            wait_timeout: DEFAULT_WAIT_TIMEOUT,
            send_delay: DEFAULT_SEND_DELAY,
            line_ending: LineEnding::default(),
            echo: true,
            buffer_size: DEFAULT_BUFFER_SIZE,
            window_size: WindowSize::default(),
        }
    }
}

impl RunnerConfig {
    /// Create a configuration with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load defaults, then the optional TOML file, then the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_toml_file(path)?,
            None => Self::default(),
        };
        env::EnvConfig::default().apply(&mut config)?;
        Ok(config)
    }

    /// Set the wait timeout.
    #[must_use]
    pub const fn wait_timeout(mut self, timeout: Duration) -> Self {
        self.wait_timeout = timeout;
        self
    }

    /// Set the delay before each write.
    #[must_use]
    pub const fn send_delay(mut self, delay: Duration) -> Self {
        self.send_delay = delay;
        self
    }

    /// Set the line ending style.
    #[must_use]
    pub const fn line_ending(mut self, line_ending: LineEnding) -> Self {
        self.line_ending = line_ending;
        self
    }

    /// Set whether child output is mirrored to stdout.
    #[must_use]
    pub const fn echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    /// Set the output buffer size.
    #[must_use]
    pub const fn buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size;
        self
    }

    /// Set the terminal size presented to the child.
    #[must_use]
    pub const fn window_size(mut self, cols: u16, rows: u16) -> Self {
        self.window_size = WindowSize::new(cols, rows);
        self
    }
}

/// Line ending styles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LineEnding {
    /// Unix-style line ending (LF).
    #[default]
    Lf,

    /// Windows-style line ending (CRLF).
    CrLf,

    /// Carriage return only, what a terminal's Enter key sends.
    Cr,
}

impl LineEnding {
    /// Get the line ending as a string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Lf => "\n",
            Self::CrLf => "\r\n",
            Self::Cr => "\r",
        }
    }

    /// Get the line ending as bytes.
    #[must_use]
    pub const fn as_bytes(self) -> &'static [u8] {
        self.as_str().as_bytes()
    }
}

impl std::str::FromStr for LineEnding {
    type Err = crate::error::ExpectError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "lf" => Ok(Self::Lf),
            "crlf" => Ok(Self::CrLf),
            "cr" => Ok(Self::Cr),
            other => Err(crate::error::ExpectError::config(format!(
                "unknown line ending '{other}' (expected lf, crlf or cr)"
            ))),
        }
    }
}
