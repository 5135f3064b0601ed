//! States, patterns and the registry that owns them.
//!
//! A [`State`] is a named group of [`Pattern`]s that is switched on and off as
//! a unit. States live in a [`StateRegistry`] arena and are referred to by
//! [`StateId`], which is how actions name the states they enable or disable.
//! The order of states in the registry, and of patterns within each state,
//! is the priority order used when two patterns match at the same offset.

use std::fmt;
use std::time::Duration;

use crate::action::Action;
use crate::command::CommandSequence;
use crate::error::{ExpectError, Result};
use crate::trigger::Trigger;

/// Stable identifier of a state registered with a runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateId(usize);

impl StateId {
    /// Create an id from a registry index.
    #[must_use]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// Get the registry index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Address of a pattern: its state and its position within that state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PatternRef {
    /// The owning state.
    pub state: StateId,
    /// Position within the state's pattern list.
    pub index: usize,
}

impl PatternRef {
    /// Create a pattern reference.
    #[must_use]
    pub const fn new(state: StateId, index: usize) -> Self {
        Self { state, index }
    }
}

/// A trigger bound to an ordered chain of actions.
#[derive(Debug, Clone)]
pub struct Pattern {
    trigger: Trigger,
    pub(crate) actions: Vec<Action>,
}

impl Pattern {
    /// Create a pattern with no actions.
    #[must_use]
    pub fn new(trigger: impl Into<Trigger>) -> Self {
        Self {
            trigger: trigger.into(),
            actions: Vec::new(),
        }
    }

    /// Append an action to the chain.
    pub fn add_action(&mut self, action: Action) -> &mut Self {
        self.actions.push(action);
        self
    }

    /// Append an action, builder style.
    #[must_use]
    pub fn with_action(mut self, action: Action) -> Self {
        self.actions.push(action);
        self
    }

    /// Get the trigger.
    #[must_use]
    pub const fn trigger(&self) -> &Trigger {
        &self.trigger
    }

    /// Get the action chain.
    #[must_use]
    pub fn actions(&self) -> &[Action] {
        &self.actions
    }
}

/// A named, switchable group of patterns.
#[derive(Debug, Clone)]
pub struct State {
    name: String,
    enabled: bool,
    patterns: Vec<Pattern>,
}

impl State {
    /// Create an empty state.
    #[must_use]
    pub fn new(name: impl Into<String>, enabled: bool) -> Self {
        Self {
            name: name.into(),
            enabled,
            patterns: Vec::new(),
        }
    }

    /// Create a command state.
    ///
    /// The state holds a single pattern on `prompt` whose only action is an
    /// empty [`CommandSequence`] paced by `pacing`. Every time the prompt
    /// appears the next queued command is sent.
    #[must_use]
    pub fn command(
        name: impl Into<String>,
        prompt: impl Into<Trigger>,
        enabled: bool,
        pacing: Duration,
    ) -> Self {
        let mut state = Self::new(name, enabled);
        state.add_pattern(
            Pattern::new(prompt).with_action(Action::Commands(CommandSequence::new(pacing))),
        );
        state
    }

    /// Append a pattern and return its index within this state.
    pub fn add_pattern(&mut self, pattern: Pattern) -> usize {
        self.patterns.push(pattern);
        self.patterns.len() - 1
    }

    /// Append a pattern, builder style.
    #[must_use]
    pub fn with_pattern(mut self, pattern: Pattern) -> Self {
        self.patterns.push(pattern);
        self
    }

    /// Get the state's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Check whether the state contributes patterns to the next wait.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Switch the state on or off.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Get the patterns in priority order.
    #[must_use]
    pub fn patterns(&self) -> &[Pattern] {
        &self.patterns
    }

    /// Get a pattern by index.
    #[must_use]
    pub fn pattern_mut(&mut self, index: usize) -> Option<&mut Pattern> {
        self.patterns.get_mut(index)
    }

    /// Get the first command sequence bound to any of this state's patterns.
    #[must_use]
    pub fn command_sequence_mut(&mut self) -> Option<&mut CommandSequence> {
        self.patterns
            .iter_mut()
            .flat_map(|p| p.actions.iter_mut())
            .find_map(|a| match a {
                Action::Commands(seq) => Some(seq),
                _ => None,
            })
    }
}

/// Arena of states addressed by [`StateId`].
#[derive(Debug, Clone, Default)]
pub struct StateRegistry {
    states: Vec<State>,
}

impl StateRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a state and return its id.
    pub fn add(&mut self, state: State) -> StateId {
        self.states.push(state);
        StateId(self.states.len() - 1)
    }

    /// Get a state.
    pub fn get(&self, id: StateId) -> Result<&State> {
        self.states
            .get(id.0)
            .ok_or(ExpectError::UnknownState { id })
    }

    /// Get a state mutably.
    pub fn get_mut(&mut self, id: StateId) -> Result<&mut State> {
        self.states
            .get_mut(id.0)
            .ok_or(ExpectError::UnknownState { id })
    }

    /// Get a pattern.
    pub fn pattern(&self, at: PatternRef) -> Result<&Pattern> {
        self.get(at.state)?
            .patterns
            .get(at.index)
            .ok_or(ExpectError::UnknownPattern {
                state: at.state,
                index: at.index,
            })
    }

    /// Get a pattern mutably.
    pub fn pattern_mut(&mut self, at: PatternRef) -> Result<&mut Pattern> {
        self.get_mut(at.state)?
            .patterns
            .get_mut(at.index)
            .ok_or(ExpectError::UnknownPattern {
                state: at.state,
                index: at.index,
            })
    }

    /// Switch a state on or off.
    pub fn set_enabled(&mut self, id: StateId, enabled: bool) -> Result<()> {
        let state = self.get_mut(id)?;
        if state.enabled != enabled {
            tracing::debug!(state = %id, name = %state.name, enabled, "state toggled");
        }
        state.enabled = enabled;
        Ok(())
    }

    /// Patterns of all enabled states, in registration order.
    #[must_use]
    pub fn active_patterns(&self) -> Vec<PatternRef> {
        self.iter()
            .filter(|(_, state)| state.enabled)
            .flat_map(|(id, state)| (0..state.patterns.len()).map(move |i| PatternRef::new(id, i)))
            .collect()
    }

    /// Iterate over states with their ids.
    pub fn iter(&self) -> impl Iterator<Item = (StateId, &State)> {
        self.states.iter().enumerate().map(|(i, s)| (StateId(i), s))
    }

    /// Number of registered states.
    #[must_use]
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Check if no states are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}
