//! Environment-based configuration.

use std::time::Duration;

use super::RunnerConfig;
use crate::error::{ExpectError, Result};

/// Environment configuration prefix.
pub const DEFAULT_PREFIX: &str = "EXPECT_RUNNER";

/// Recognized variable names, without the prefix.
pub mod vars {
    /// Wait timeout in seconds.
    pub const TIMEOUT: &str = "TIMEOUT";
    /// Delay before each write, in milliseconds.
    pub const SEND_DELAY_MS: &str = "SEND_DELAY_MS";
    /// Mirror child output to stdout.
    pub const ECHO: &str = "ECHO";
    /// Output buffer size in bytes.
    pub const BUFFER_SIZE: &str = "BUFFER_SIZE";
    /// Line ending: `lf`, `crlf` or `cr`.
    pub const LINE_ENDING: &str = "LINE_ENDING";
}

type Lookup = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Environment variable reader.
pub struct EnvConfig {
    /// Prefix for environment variables.
    prefix: String,
    /// Where values come from.
    lookup: Lookup,
}

impl std::fmt::Debug for EnvConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvConfig")
            .field("prefix", &self.prefix)
            .finish()
    }
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self::new(DEFAULT_PREFIX)
    }
}

impl EnvConfig {
    /// Create a reader over the process environment.
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            lookup: Box::new(|name| std::env::var(name).ok()),
        }
    }

    /// Create a reader over an arbitrary source of values.
    #[must_use]
    pub fn with_lookup(
        prefix: impl Into<String>,
        lookup: impl Fn(&str) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        Self {
            prefix: prefix.into(),
            lookup: Box::new(lookup),
        }
    }

    /// Build the full environment variable name.
    fn var_name(&self, name: &str) -> String {
        if self.prefix.is_empty() {
            name.to_uppercase()
        } else {
            format!("{}_{}", self.prefix, name.to_uppercase())
        }
    }

    /// Get a string value.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<String> {
        (self.lookup)(&self.var_name(name))
    }

    /// Get a parsed value; a set but unparsable value is an error.
    pub fn parse<T: std::str::FromStr>(&self, name: &str) -> Result<Option<T>> {
        self.get(name)
            .map(|v| {
                v.trim().parse().map_err(|_| {
                    ExpectError::config(format!("{}: cannot parse '{v}'", self.var_name(name)))
                })
            })
            .transpose()
    }

    /// Get a boolean value.
    #[must_use]
    pub fn bool(&self, name: &str) -> Option<bool> {
        self.get(name).map(|v| {
            matches!(
                v.to_lowercase().as_str(),
                "1" | "true" | "yes" | "on" | "enabled"
            )
        })
    }

    /// Overlay every recognized variable that is set onto `config`.
    pub fn apply(&self, config: &mut RunnerConfig) -> Result<()> {
        if let Some(secs) = self.parse::<u64>(vars::TIMEOUT)? {
            config.wait_timeout = Duration::from_secs(secs);
        }
        if let Some(ms) = self.parse::<u64>(vars::SEND_DELAY_MS)? {
            config.send_delay = Duration::from_millis(ms);
        }
        if let Some(echo) = self.bool(vars::ECHO) {
            config.echo = echo;
        }
        if let Some(size) = self.parse::<usize>(vars::BUFFER_SIZE)? {
            config.buffer_size = size;
        }
        if let Some(ending) = self.parse(vars::LINE_ENDING)? {
            config.line_ending = ending;
        }
        Ok(())
    }
}
