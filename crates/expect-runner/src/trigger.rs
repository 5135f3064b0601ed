//! Match criteria for patterns.
//!
//! A [`Trigger`] is what a pattern waits for: literal text, a regular
//! expression, or one of the two sentinels that fire when the child's output
//! closes ([`Trigger::Eof`]) or a wait runs out of time
//! ([`Trigger::Timeout`]).
//!
//! Text triggers are matched against raw output bytes, so match offsets are
//! always byte offsets into the buffer even when the child emits partial or
//! invalid UTF-8. In regex triggers `.` also matches line breaks, so a
//! pattern such as `root@.*#` still finds a prompt the console has wrapped.

use std::fmt;

use regex::bytes::{Regex, RegexBuilder};

use crate::error::Result;

/// A criterion matched against the child's output.
#[derive(Clone)]
pub enum Trigger {
    /// Match an exact string.
    Literal(String),

    /// Match a regular expression.
    Regex(CompiledRegex),

    /// Match end of stream (the child closed its output).
    Eof,

    /// Match when a wait times out.
    Timeout,
}

impl Trigger {
    /// Create a literal trigger.
    #[must_use]
    pub fn literal(s: impl Into<String>) -> Self {
        Self::Literal(s.into())
    }

    /// Create a regex trigger.
    ///
    /// The pattern is compiled with `.` matching newlines.
    pub fn regex(pattern: &str) -> Result<Self> {
        let regex = RegexBuilder::new(pattern).dot_matches_new_line(true).build()?;
        Ok(Self::Regex(CompiledRegex {
            pattern: pattern.to_string(),
            regex,
        }))
    }

    /// Create an EOF sentinel.
    #[must_use]
    pub const fn eof() -> Self {
        Self::Eof
    }

    /// Create a timeout sentinel.
    #[must_use]
    pub const fn timeout() -> Self {
        Self::Timeout
    }

    /// Get the trigger as a string for display purposes.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Literal(s) => s,
            Self::Regex(r) => r.pattern(),
            Self::Eof => "<EOF>",
            Self::Timeout => "<TIMEOUT>",
        }
    }

    /// Find the leftmost match in `haystack`, as a byte range.
    ///
    /// Sentinels never match text.
    #[must_use]
    pub fn find(&self, haystack: &[u8]) -> Option<(usize, usize)> {
        match self {
            Self::Literal(s) => find_bytes(haystack, s.as_bytes()).map(|pos| (pos, pos + s.len())),
            Self::Regex(r) => r.regex.find(haystack).map(|m| (m.start(), m.end())),
            Self::Eof | Self::Timeout => None,
        }
    }

    /// Check if this is the EOF sentinel.
    #[must_use]
    pub const fn is_eof(&self) -> bool {
        matches!(self, Self::Eof)
    }

    /// Check if this is the timeout sentinel.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }
}

impl fmt::Debug for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(s) => write!(f, "Literal({s:?})"),
            Self::Regex(r) => write!(f, "Regex({:?})", r.pattern()),
            Self::Eof => write!(f, "Eof"),
            Self::Timeout => write!(f, "Timeout"),
        }
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for Trigger {
    fn from(s: &str) -> Self {
        Self::Literal(s.to_string())
    }
}

impl From<String> for Trigger {
    fn from(s: String) -> Self {
        Self::Literal(s)
    }
}

/// A compiled regular expression with its source pattern.
#[derive(Clone)]
pub struct CompiledRegex {
    pattern: String,
    regex: Regex,
}

impl CompiledRegex {
    /// Get the source pattern.
    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }
}

/// Find the earliest match among `triggers`.
///
/// Returns the index of the winning trigger and the end offset of its match.
/// The match starting earliest in `haystack` wins; when two matches start at
/// the same offset the trigger listed first wins.
#[must_use]
pub fn find_earliest(triggers: &[&Trigger], haystack: &[u8]) -> Option<(usize, usize)> {
    let mut best: Option<(usize, usize, usize)> = None;

    for (idx, trigger) in triggers.iter().enumerate() {
        if let Some((start, end)) = trigger.find(haystack) {
            match best {
                Some((_, best_start, _)) if start >= best_start => {}
                _ => best = Some((idx, start, end)),
            }
        }
    }

    best.map(|(idx, _, end)| (idx, end))
}

fn find_bytes(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() {
        return Some(0);
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
