//! Bounded command queue driven by a recurring prompt.
//!
//! A [`CommandSequence`] sends one queued command each time its pattern
//! fires. Sending a command makes the prompt reappear, which fires the
//! pattern again, so a single prompt trigger walks the whole queue. Once the
//! last command is out the owning state is disabled and the successor state,
//! if any, is enabled.

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};

use crate::error::Result;
use crate::session::Session;
use crate::state::{StateId, StateRegistry};

/// An ordered queue of commands sent one per firing.
#[derive(Debug, Clone, Default)]
pub struct CommandSequence {
    commands: Vec<String>,
    late_commands: Vec<String>,
    idx: usize,
    pacing: Duration,
    next_state: Option<StateId>,
    finished: bool,
}

impl CommandSequence {
    /// Create an empty sequence whose commands are sent with `pacing`
    /// between characters.
    #[must_use]
    pub fn new(pacing: Duration) -> Self {
        Self {
            pacing,
            ..Self::default()
        }
    }

    /// Queue a command.
    pub fn add_command(&mut self, command: impl Into<String>) -> &mut Self {
        self.commands.push(command.into());
        self
    }

    /// Queue a command that runs after every regular command, including
    /// ones added later.
    pub fn add_late_command(&mut self, command: impl Into<String>) -> &mut Self {
        self.late_commands.push(command.into());
        self
    }

    /// Set the state enabled once the queue is exhausted.
    pub fn set_next_state(&mut self, next: StateId) -> &mut Self {
        self.next_state = Some(next);
        self
    }

    /// Get the successor state.
    #[must_use]
    pub const fn next_state(&self) -> Option<StateId> {
        self.next_state
    }

    /// Get the per-character pacing.
    #[must_use]
    pub const fn pacing(&self) -> Duration {
        self.pacing
    }

    /// Total number of queued commands.
    #[must_use]
    pub fn len(&self) -> usize {
        self.commands.len() + self.late_commands.len()
    }

    /// Check if nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of commands sent so far.
    #[must_use]
    pub const fn sent(&self) -> usize {
        self.idx
    }

    /// Check whether the hand-off to the successor has happened.
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.finished
    }

    /// The command the next firing sends.
    #[must_use]
    pub fn pending(&self) -> Option<&str> {
        if self.idx < self.commands.len() {
            Some(&self.commands[self.idx])
        } else {
            self.late_commands
                .get(self.idx - self.commands.len())
                .map(String::as_str)
        }
    }

    /// Send the next command; hand off to the successor once exhausted.
    ///
    /// `owner` is the state whose pattern fired. Firing after the hand-off
    /// sends nothing and changes no state.
    pub async fn fire<T>(
        &mut self,
        owner: StateId,
        states: &mut StateRegistry,
        session: &mut Session<T>,
    ) -> Result<()>
    where
        T: AsyncRead + AsyncWrite + Unpin,
    {
        if self.finished {
            tracing::warn!(
                state = %owner,
                sent = self.idx,
                "command sequence fired after it was exhausted; ignoring"
            );
            return Ok(());
        }

        if let Some(command) = self.pending() {
            tracing::info!(state = %owner, command, "sending command");
            session.send_line(command, self.pacing).await?;
            self.idx += 1;
        }

        if self.idx == self.len() {
            states.set_enabled(owner, false)?;
            if let Some(next) = self.next_state {
                states.set_enabled(next, true)?;
            }
            self.finished = true;
            tracing::debug!(state = %owner, next = ?self.next_state, "command sequence exhausted");
        }
        Ok(())
    }
}
