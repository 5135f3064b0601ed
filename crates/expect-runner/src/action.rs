//! Actions bound to patterns.

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};

use crate::command::CommandSequence;
use crate::error::Result;
use crate::session::Session;
use crate::state::{StateId, StateRegistry};

/// Whether the run goes on after an action chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum Flow {
    /// Wait for the next match.
    Continue,
    /// End the run with this exit code.
    Terminate(i32),
}

/// A side effect executed when a pattern matches.
#[derive(Debug, Clone)]
pub enum Action {
    /// End the run with an exit code. Later actions in the chain are skipped.
    Terminate(i32),

    /// Enable some states, then disable others.
    ///
    /// A state in both lists ends up disabled.
    ChangeState {
        /// States to enable.
        enable: Vec<StateId>,
        /// States to disable.
        disable: Vec<StateId>,
    },

    /// Write bytes verbatim.
    Send(Vec<u8>),

    /// Write a line, optionally pacing each character.
    SendLine {
        /// The line, without terminator.
        line: String,
        /// Delay after each character; zero sends the line in one write.
        pacing: Duration,
    },

    /// Send the next command of a queue.
    Commands(CommandSequence),
}

impl Action {
    /// Create a terminate action.
    #[must_use]
    pub const fn terminate(code: i32) -> Self {
        Self::Terminate(code)
    }

    /// Create a state change action.
    #[must_use]
    pub fn change_state(
        enable: impl IntoIterator<Item = StateId>,
        disable: impl IntoIterator<Item = StateId>,
    ) -> Self {
        Self::ChangeState {
            enable: enable.into_iter().collect(),
            disable: disable.into_iter().collect(),
        }
    }

    /// Create a raw send action.
    #[must_use]
    pub fn send(data: impl AsRef<[u8]>) -> Self {
        Self::Send(data.as_ref().to_vec())
    }

    /// Create a line send action.
    #[must_use]
    pub fn send_line(line: impl Into<String>, pacing: Duration) -> Self {
        Self::SendLine {
            line: line.into(),
            pacing,
        }
    }

    /// Run the action.
    ///
    /// `owner` is the state whose pattern fired.
    pub async fn run<T>(
        &mut self,
        owner: StateId,
        states: &mut StateRegistry,
        session: &mut Session<T>,
    ) -> Result<Flow>
    where
        T: AsyncRead + AsyncWrite + Unpin,
    {
        match self {
            Self::Terminate(code) => return Ok(Flow::Terminate(*code)),
            Self::ChangeState { enable, disable } => {
                for id in enable.iter() {
                    states.set_enabled(*id, true)?;
                }
                for id in disable.iter() {
                    states.set_enabled(*id, false)?;
                }
            }
            Self::Send(data) => session.send(data).await?,
            Self::SendLine { line, pacing } => {
                tracing::debug!(line = %line, ?pacing, "sending line");
                session.send_line(line, *pacing).await?;
            }
            Self::Commands(seq) => seq.fire(owner, states, session).await?,
        }
        Ok(Flow::Continue)
    }
}

/// Run a chain of actions in order, stopping at the first terminate.
pub(crate) async fn run_chain<T>(
    actions: &mut [Action],
    owner: StateId,
    states: &mut StateRegistry,
    session: &mut Session<T>,
) -> Result<Flow>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    for action in actions.iter_mut() {
        if let Flow::Terminate(code) = action.run(owner, states, session).await? {
            return Ok(Flow::Terminate(code));
        }
    }
    Ok(Flow::Continue)
}
