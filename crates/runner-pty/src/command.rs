//! Command line splitting.
//!
//! VM invocations are usually passed around as a single string
//! (`qemu-system-aarch64 -m 1024M ... -snapshot`). [`CommandLine::parse`]
//! splits such a string into a program and its arguments the way a POSIX
//! shell would for plain words, single quotes, double quotes and backslash
//! escapes. No expansion of any kind is performed.

use std::fmt;

use crate::error::{PtyError, Result};

/// A program and its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    program: String,
    args: Vec<String>,
}

impl CommandLine {
    /// Create a command line for `program` with no arguments.
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Append an argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Build a command line from already split words.
    pub fn from_words<I, S>(words: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut words = words.into_iter().map(Into::into);
        let program = words
            .next()
            .ok_or_else(|| PtyError::invalid_command("empty command"))?;
        Ok(Self {
            program,
            args: words.collect(),
        })
    }

    /// Split a command string into words.
    pub fn parse(line: &str) -> Result<Self> {
        Self::from_words(split_words(line)?)
    }

    /// The program to execute.
    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    /// The arguments, excluding the program.
    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.args
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Quote {
    None,
    Single,
    Double,
}

fn split_words(line: &str) -> Result<Vec<String>> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quote = Quote::None;
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match (quote, c) {
            (Quote::None, c) if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            (Quote::None, '\'') => {
                quote = Quote::Single;
                in_word = true;
            }
            (Quote::None, '"') => {
                quote = Quote::Double;
                in_word = true;
            }
            (Quote::None, '\\') => {
                let escaped = chars
                    .next()
                    .ok_or_else(|| PtyError::invalid_command("trailing backslash"))?;
                current.push(escaped);
                in_word = true;
            }
            (Quote::Single, '\'') | (Quote::Double, '"') => quote = Quote::None,
            (Quote::Double, '\\') => match chars.next() {
                Some(next @ ('"' | '\\' | '$' | '`')) => current.push(next),
                Some(other) => {
                    current.push('\\');
                    current.push(other);
                }
                None => return Err(PtyError::invalid_command("unterminated double quote")),
            },
            (_, c) => {
                current.push(c);
                in_word = true;
            }
        }
    }

    match quote {
        Quote::Single => return Err(PtyError::invalid_command("unterminated single quote")),
        Quote::Double => return Err(PtyError::invalid_command("unterminated double quote")),
        Quote::None => {}
    }
    if in_word {
        words.push(current);
    }
    Ok(words)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_whitespace() {
        let cmd = CommandLine::parse("qemu-system-aarch64  -m 1024M\t-snapshot").unwrap();
        assert_eq!(cmd.program(), "qemu-system-aarch64");
        assert_eq!(cmd.args(), ["-m", "1024M", "-snapshot"]);
    }

    #[test]
    fn honors_quotes() {
        let cmd = CommandLine::parse(r#"sh -c 'echo "hi there"' "a b" c\ d"#).unwrap();
        assert_eq!(cmd.program(), "sh");
        assert_eq!(cmd.args(), ["-c", "echo \"hi there\"", "a b", "c d"]);
    }

    #[test]
    fn empty_quotes_are_an_argument() {
        let cmd = CommandLine::parse("prog '' x").unwrap();
        assert_eq!(cmd.args(), ["", "x"]);
    }

    #[test]
    fn double_quote_escapes() {
        let cmd = CommandLine::parse(r#"prog "a\"b" "c\d""#).unwrap();
        assert_eq!(cmd.args(), ["a\"b", "c\\d"]);
    }

    #[test]
    fn rejects_empty_and_unterminated() {
        assert!(CommandLine::parse("   ").is_err());
        assert!(CommandLine::parse("prog 'open").is_err());
        assert!(CommandLine::parse("prog \"open").is_err());
        assert!(CommandLine::parse("prog \\").is_err());
    }

    #[test]
    fn display_joins_words() {
        let cmd = CommandLine::new("echo").arg("a").arg("b");
        assert_eq!(cmd.to_string(), "echo a b");
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn parse_never_panics(line in ".{0,64}") {
                let _ = CommandLine::parse(&line);
            }

            #[test]
            fn single_quoted_words_survive(words in prop::collection::vec("[^']{0,12}", 1..5)) {
                let line: Vec<String> = words.iter().map(|w| format!("'{w}'")).collect();
                let cmd = CommandLine::parse(&line.join(" ")).unwrap();
                prop_assert_eq!(cmd.program(), words[0].as_str());
                prop_assert_eq!(cmd.args(), &words[1..]);
            }
        }
    }
}
