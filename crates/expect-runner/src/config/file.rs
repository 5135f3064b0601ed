//! TOML configuration files.
//!
//! ```toml
//! wait_timeout_secs = 600
//! send_delay_ms = 0
//! echo = true
//! buffer_size = 65536
//! line_ending = "lf"
//!
//! [window]
//! cols = 132
//! rows = 43
//! ```
//!
//! Every key is optional; missing keys keep their current value.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use super::RunnerConfig;
use crate::error::{ExpectError, Result};

/// The on-disk shape of a runner configuration file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    /// Wait timeout in seconds.
    pub wait_timeout_secs: Option<u64>,
    /// Delay before each write, in milliseconds.
    pub send_delay_ms: Option<u64>,
    /// Mirror child output to stdout.
    pub echo: Option<bool>,
    /// Output buffer size in bytes.
    pub buffer_size: Option<usize>,
    /// Line ending: `lf`, `crlf` or `cr`.
    pub line_ending: Option<String>,
    /// Terminal size.
    pub window: Option<WindowSection>,
}

/// The `[window]` table.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WindowSection {
    /// Columns.
    pub cols: u16,
    /// Rows.
    pub rows: u16,
}

impl ConfigFile {
    /// Parse configuration from TOML text.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| ExpectError::config(e.to_string()))
    }

    /// Read and parse a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ExpectError::io_context(format!("reading config file {}", path.display()), e)
        })?;
        Self::parse(&content)
    }

    /// Overlay the values present in this file onto `config`.
    pub fn apply(&self, config: &mut RunnerConfig) -> Result<()> {
        if let Some(secs) = self.wait_timeout_secs {
            config.wait_timeout = Duration::from_secs(secs);
        }
        if let Some(ms) = self.send_delay_ms {
            config.send_delay = Duration::from_millis(ms);
        }
        if let Some(echo) = self.echo {
            config.echo = echo;
        }
        if let Some(size) = self.buffer_size {
            config.buffer_size = size;
        }
        if let Some(ref ending) = self.line_ending {
            config.line_ending = ending.parse()?;
        }
        if let Some(window) = self.window {
            config.window_size = runner_pty::WindowSize::new(window.cols, window.rows);
        }
        Ok(())
    }
}

impl RunnerConfig {
    /// Load a configuration file over the defaults, ignoring the environment.
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let mut config = Self::default();
        ConfigFile::load(path)?.apply(&mut config)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LineEnding;

    #[test]
    fn parses_full_file() {
        let file = ConfigFile::parse(
            r#"
            wait_timeout_secs = 600
            send_delay_ms = 0
            echo = false
            line_ending = "crlf"

            [window]
            cols = 132
            rows = 43
            "#,
        )
        .unwrap();

        let mut config = RunnerConfig::default();
        file.apply(&mut config).unwrap();
        assert_eq!(config.wait_timeout, Duration::from_secs(600));
        assert!(config.send_delay.is_zero());
        assert!(!config.echo);
        assert_eq!(config.line_ending, LineEnding::CrLf);
        assert_eq!(config.window_size.cols, 132);
    }

    #[test]
    fn empty_file_keeps_defaults() {
        let mut config = RunnerConfig::default();
        ConfigFile::parse("").unwrap().apply(&mut config).unwrap();
        assert_eq!(config.wait_timeout, crate::config::DEFAULT_WAIT_TIMEOUT);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = ConfigFile::parse("timeout = 5").unwrap_err();
        assert!(matches!(err, ExpectError::Config { .. }));
    }

    fn write_temp(name: &str, content: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("{name}-{}.toml", std::process::id()));
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn loads_file_over_defaults() {
        let path = write_temp("expect-runner-config", "send_delay_ms = 5\necho = false\n");
        let config = RunnerConfig::from_toml_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(config.send_delay, Duration::from_millis(5));
        assert!(!config.echo);
        assert_eq!(config.wait_timeout, crate::config::DEFAULT_WAIT_TIMEOUT);
    }

    #[test]
    fn missing_file_names_the_path() {
        let path = std::env::temp_dir().join("expect-runner-no-such-config.toml");
        let err = RunnerConfig::from_toml_file(&path).unwrap_err();
        assert!(matches!(err, ExpectError::IoWithContext { .. }));
        assert!(err.to_string().contains("expect-runner-no-such-config.toml"));
    }

    #[test]
    fn bad_line_ending_is_rejected_on_apply() {
        let file = ConfigFile::parse(r#"line_ending = "nl""#).unwrap();
        assert!(file.apply(&mut RunnerConfig::default()).is_err());
    }
}
