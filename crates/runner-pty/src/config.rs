//! Configuration for spawning a child on a PTY.

use std::path::PathBuf;

/// Terminal window size in character cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSize {
    /// Number of columns.
    pub cols: u16,
    /// Number of rows.
    pub rows: u16,
}

impl WindowSize {
    /// Create a new window size.
    #[must_use]
    pub const fn new(cols: u16, rows: u16) -> Self {
        Self { cols, rows }
    }
}

impl Default for WindowSize {
    fn default() -> Self {
        Self::new(80, 24)
    }
}

impl From<(u16, u16)> for WindowSize {
    fn from((cols, rows): (u16, u16)) -> Self {
        Self::new(cols, rows)
    }
}

/// Settings applied when the child is spawned.
///
/// The child inherits the parent environment; `env` entries are added on
/// top of it.
#[derive(Debug, Clone, Default)]
pub struct PtyConfig {
    /// Initial window size.
    pub window_size: WindowSize,
    /// Extra environment variables.
    pub env: Vec<(String, String)>,
    /// Working directory for the child.
    pub working_directory: Option<PathBuf>,
}

impl PtyConfig {
    /// Create a configuration with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the window size.
    #[must_use]
    pub fn window_size(mut self, size: impl Into<WindowSize>) -> Self {
        self.window_size = size.into();
        self
    }

    /// Add an environment variable.
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Set the working directory.
    #[must_use]
    pub fn working_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_directory = Some(dir.into());
        self
    }
}
