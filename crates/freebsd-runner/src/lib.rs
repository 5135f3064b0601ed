//! freebsd-runner: drive a FreeBSD virtual machine over its console
//!
//! A [`Scenario`] is an `expect-runner` state graph for one VM run: an
//! always-enabled background state that decides how the run ends, followed by
//! a chain of [`stage`]s (loader, boot, tests, shutdown) that hand control to
//! one another.
//!
//! The background state ends the run with status 0 when the machine reports
//! its uptime, asks for a key to reboot or closes its console, and with
//! status 1 on a kernel panic or when the console stays silent for a whole
//! wait.

pub mod stage;

use std::time::Duration;

use expect_runner::prelude::*;

pub use stage::{Boot, EarlyBoot, FbsdTests, Installed, Link, Loader, Shutdown, Stage};

/// Settings threaded through every stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScenarioConfig {
    /// Delay after each typed character. Zero types whole lines at once.
    pub key_delay: Duration,
}

impl ScenarioConfig {
    /// Create a configuration with the given key delay.
    #[must_use]
    pub const fn new(key_delay: Duration) -> Self {
        Self { key_delay }
    }
}

/// A FreeBSD run under construction.
#[derive(Debug)]
pub struct Scenario {
    runner: Runner,
    config: ScenarioConfig,
    background: StateId,
    last: Option<Installed>,
}

impl Scenario {
    /// Create a scenario with only the background state installed.
    pub fn new(runner_config: RunnerConfig, config: ScenarioConfig) -> Result<Self> {
        let mut runner = Runner::new(runner_config);
        let background = runner.add_state(
            State::new("background", true)
                .with_pattern(
                    Pattern::new(Trigger::regex(r"Uptime:.*")?).with_action(Action::terminate(0)),
                )
                .with_pattern(
                    Pattern::new("Please press any key to reboot.")
                        .with_action(Action::terminate(0)),
                )
                .with_pattern(Pattern::new(Trigger::eof()).with_action(Action::terminate(0)))
                .with_pattern(Pattern::new("KDB: enter: panic").with_action(Action::terminate(1)))
                .with_pattern(Pattern::new(Trigger::timeout()).with_action(Action::terminate(1))),
        );

        Ok(Self {
            runner,
            config,
            background,
            last: None,
        })
    }

    /// Build the standard run: optional loader commands, boot, optional
    /// test suite, shutdown.
    pub fn standard(
        runner_config: RunnerConfig,
        config: ScenarioConfig,
        loader_commands: &[String],
        run_tests: bool,
    ) -> Result<Self> {
        let mut scenario = Self::new(runner_config, config)?;

        if !loader_commands.is_empty() {
            scenario.add_stage(EarlyBoot)?;
            let loader = loader_commands
                .iter()
                .fold(Loader::new(), |loader, cmd| loader.command(cmd.as_str()));
            scenario.add_stage(loader)?;
        }
        scenario.add_stage(Boot)?;
        if run_tests {
            scenario.add_stage(FbsdTests)?;
        }
        scenario.add_stage(Shutdown::default())?;

        Ok(scenario)
    }

    /// Install `stage` and make it the successor of the previous stage.
    ///
    /// Fails if the previous stage is a final one.
    pub fn add_stage(&mut self, stage: impl Stage) -> Result<StateId> {
        let link = match self.last {
            Some(Installed { state, link: None }) => {
                return Err(ExpectError::config(format!(
                    "state {state} ends the scenario and cannot have a successor"
                )));
            }
            Some(Installed { link, .. }) => link,
            None => None,
        };

        let installed = stage.install(&mut self.runner, self.config.key_delay)?;
        if let Some(link) = link {
            link.connect(&mut self.runner, installed.state)?;
        }
        tracing::debug!(state = %installed.state, "stage added");
        self.last = Some(installed);
        Ok(installed.state)
    }

    /// Get the background state.
    #[must_use]
    pub const fn background(&self) -> StateId {
        self.background
    }

    /// Get the scenario configuration.
    #[must_use]
    pub const fn config(&self) -> &ScenarioConfig {
        &self.config
    }

    /// Get the underlying runner.
    #[must_use]
    pub const fn runner(&self) -> &Runner {
        &self.runner
    }

    /// Get the underlying runner mutably.
    pub fn runner_mut(&mut self) -> &mut Runner {
        &mut self.runner
    }

    /// Spawn the VM command and drive it to termination.
    #[cfg(unix)]
    pub fn run(&mut self, command: &str) -> Result<i32> {
        self.runner.run(command)
    }

    /// Consume the scenario and return its runner.
    #[must_use]
    pub fn into_runner(self) -> Runner {
        self.runner
    }
}
