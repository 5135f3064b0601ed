//! The match/dispatch loop.
//!
//! A [`Runner`] owns every state of a scenario. Each cycle it collects the
//! patterns of the enabled states, waits once for the earliest of them to
//! fire, and runs that pattern's action chain to completion. The loop only
//! ends when an action terminates the run or an error escapes.

use std::mem;

use tokio::io::{AsyncRead, AsyncWrite};

use crate::action::{Action, Flow, run_chain};
use crate::command::CommandSequence;
use crate::config::RunnerConfig;
use crate::error::{ExpectError, Result};
use crate::session::Session;
use crate::state::{Pattern, PatternRef, State, StateId, StateRegistry};
use crate::trigger::Trigger;

/// A scenario's states and the loop that drives them.
#[derive(Debug, Default)]
pub struct Runner {
    states: StateRegistry,
    config: RunnerConfig,
}

impl Runner {
    /// Create a runner with no states.
    #[must_use]
    pub fn new(config: RunnerConfig) -> Self {
        Self {
            states: StateRegistry::new(),
            config,
        }
    }

    /// Get the configuration.
    #[must_use]
    pub const fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Get mutable access to the configuration.
    pub fn config_mut(&mut self) -> &mut RunnerConfig {
        &mut self.config
    }

    /// Register a state. Registration order is pattern priority order.
    pub fn add_state(&mut self, state: State) -> StateId {
        let id = self.states.add(state);
        tracing::trace!(state = %id, "state registered");
        id
    }

    /// Get a state.
    pub fn state(&self, id: StateId) -> Result<&State> {
        self.states.get(id)
    }

    /// Get a state mutably.
    pub fn state_mut(&mut self, id: StateId) -> Result<&mut State> {
        self.states.get_mut(id)
    }

    /// Get all states.
    #[must_use]
    pub const fn states(&self) -> &StateRegistry {
        &self.states
    }

    /// Append a pattern to a registered state.
    pub fn add_pattern(&mut self, id: StateId, pattern: Pattern) -> Result<PatternRef> {
        let index = self.states.get_mut(id)?.add_pattern(pattern);
        Ok(PatternRef::new(id, index))
    }

    /// Get a registered pattern mutably.
    pub fn pattern_mut(&mut self, at: PatternRef) -> Result<&mut Pattern> {
        self.states.pattern_mut(at)
    }

    /// Append an action to a registered pattern.
    pub fn add_action(&mut self, at: PatternRef, action: Action) -> Result<()> {
        self.states.pattern_mut(at)?.add_action(action);
        Ok(())
    }

    /// Get the command sequence of a command state.
    pub fn commands_mut(&mut self, id: StateId) -> Result<&mut CommandSequence> {
        self.states
            .get_mut(id)?
            .command_sequence_mut()
            .ok_or(ExpectError::NotACommandState { id })
    }

    /// Check whether a state is enabled.
    pub fn is_enabled(&self, id: StateId) -> Result<bool> {
        Ok(self.states.get(id)?.is_enabled())
    }

    /// Switch a state on or off outside of any action.
    pub fn set_enabled(&mut self, id: StateId, enabled: bool) -> Result<()> {
        self.states.set_enabled(id, enabled)
    }

    /// The patterns the next wait will use, in priority order.
    #[must_use]
    pub fn active_patterns(&self) -> Vec<PatternRef> {
        self.states.active_patterns()
    }

    /// Run one match/dispatch cycle.
    ///
    /// The active set is computed before the wait, so state changes made by
    /// the winning chain only take effect on the next cycle.
    pub async fn step<T>(&mut self, session: &mut Session<T>) -> Result<Flow>
    where
        T: AsyncRead + AsyncWrite + Unpin,
    {
        let active = self.active_patterns();
        let triggers = active
            .iter()
            .map(|at| self.states.pattern(*at).map(Pattern::trigger))
            .collect::<Result<Vec<&Trigger>>>()?;
        tracing::debug!(active = triggers.len(), "waiting for output");

        let winner = active[session.expect_any(&triggers, self.config.wait_timeout).await?];
        self.fire(winner, session).await
    }

    /// Run the action chain of one pattern.
    pub async fn fire<T>(&mut self, at: PatternRef, session: &mut Session<T>) -> Result<Flow>
    where
        T: AsyncRead + AsyncWrite + Unpin,
    {
        let pattern = self.states.pattern_mut(at)?;
        tracing::info!(
            state = %at.state,
            pattern = at.index,
            trigger = %pattern.trigger(),
            "pattern matched"
        );

        // The chain is taken out so its actions can mutate the registry.
        let mut actions = mem::take(&mut pattern.actions);
        let flow = run_chain(&mut actions, at.state, &mut self.states, session).await;
        self.states.pattern_mut(at)?.actions = actions;
        flow
    }

    /// Drive `session` until an action terminates the run.
    ///
    /// Returns the exit code passed to the terminating action.
    pub async fn drive<T>(&mut self, session: &mut Session<T>) -> Result<i32>
    where
        T: AsyncRead + AsyncWrite + Unpin,
    {
        loop {
            if let Flow::Terminate(code) = self.step(session).await? {
                tracing::info!(code, "run terminated");
                return Ok(code);
            }
        }
    }

    /// Spawn `command_line` on a PTY and drive it to termination.
    ///
    /// Runs on a current-thread runtime. The child's output is mirrored to
    /// stdout when echo is enabled. A child still running when the run ends
    /// is killed.
    #[cfg(unix)]
    pub fn run(&mut self, command_line: &str) -> Result<i32> {
        let command = runner_pty::CommandLine::parse(command_line)?;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| ExpectError::io_context("creating runtime", e))?;
        runtime.block_on(self.run_spawned(&command))
    }

    #[cfg(unix)]
    async fn run_spawned(&mut self, command: &runner_pty::CommandLine) -> Result<i32> {
        let pty_config = runner_pty::PtyConfig::new().window_size(self.config.window_size);
        let (master, mut child) = runner_pty::spawn(command, &pty_config)?;
        tracing::info!(pid = child.pid(), %command, "child spawned");

        let mut session = Session::new(master, &self.config);
        if self.config.echo {
            session.set_echo(std::io::stdout());
        }

        let result = self.drive(&mut session).await;
        let cleanup = stop_child(&mut child).await;
        keep_outcome(result, cleanup)
    }
}

/// Kill the child if it outlived the run.
#[cfg(unix)]
async fn stop_child(child: &mut runner_pty::PtyChild) -> runner_pty::Result<()> {
    if child.is_running()? {
        tracing::debug!(pid = child.pid(), "killing child");
        child.kill()?;
        child.wait().await?;
    }
    Ok(())
}

/// A failure while stopping the child never replaces the run's outcome.
#[cfg(unix)]
fn keep_outcome(result: Result<i32>, cleanup: runner_pty::Result<()>) -> Result<i32> {
    if let Err(e) = cleanup {
        tracing::warn!(error = %e, "failed to stop child");
    }
    result
}
