//! expect-runner: pattern-driven automation of interactive console sessions
//!
//! A scenario is a set of [`State`]s, each holding [`Pattern`]s that bind a
//! [`Trigger`] to a chain of [`Action`]s. The [`Runner`] spawns the child on a
//! pseudo-terminal, waits for the earliest match among the patterns of the
//! currently enabled states, runs the winning chain, and repeats until an
//! action terminates the run.
//!
//! Timeouts and end-of-stream are ordinary triggers. A scenario that wants to
//! survive them registers [`Trigger::Timeout`] and [`Trigger::Eof`] patterns;
//! otherwise they end the run with an error.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use expect_runner::prelude::*;
//!
//! fn main() -> Result<()> {
//!     let mut runner = Runner::new(RunnerConfig::default());
//!
//!     let prompt = Trigger::regex(r"\$ $")?;
//!     let shell = runner.add_state(State::command("shell", prompt, true, Duration::ZERO));
//!     runner.commands_mut(shell)?.add_command("uname -a").add_command("exit");
//!
//!     runner.add_state(
//!         State::new("sentinels", true)
//!             .with_pattern(Pattern::new(Trigger::eof()).with_action(Action::terminate(0)))
//!             .with_pattern(Pattern::new(Trigger::timeout()).with_action(Action::terminate(1))),
//!     );
//!
//!     let code = runner.run("/bin/sh -i")?;
//!     std::process::exit(code);
//! }
//! ```

pub mod action;
pub mod buffer;
pub mod command;
pub mod config;
pub mod error;
pub mod mock;
pub mod prelude;
pub mod runner;
pub mod session;
pub mod state;
pub mod trigger;

pub use action::{Action, Flow};
pub use buffer::OutputBuffer;
pub use command::CommandSequence;
pub use config::{LineEnding, RunnerConfig};
pub use error::{ExpectError, Result};
pub use runner::Runner;
pub use session::Session;
pub use state::{Pattern, PatternRef, State, StateId, StateRegistry};
pub use trigger::Trigger;
