//! Convenient re-exports for writing scenarios.
//!
//! ```
//! use expect_runner::prelude::*;
//! ```

pub use crate::action::{Action, Flow};
pub use crate::command::CommandSequence;
pub use crate::config::{LineEnding, RunnerConfig};
pub use crate::error::{ExpectError, Result};
pub use crate::runner::Runner;
pub use crate::session::Session;
pub use crate::state::{Pattern, PatternRef, State, StateId};
pub use crate::trigger::Trigger;
