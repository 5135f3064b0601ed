//! The stages of a FreeBSD boot.
//!
//! Each stage installs its states into the runner and reports how a
//! successor is wired to it. Stages are chained by [`crate::Scenario::add_stage`].

use std::time::Duration;

use expect_runner::prelude::*;

/// Shell prompt of the root user.
pub const ROOT_PROMPT: &str = r"root@.*#";

/// How control passes from an installed stage to the next one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Link {
    /// When this pattern fires, disable its state and enable the successor.
    Pattern(PatternRef),
    /// When this command state's queue is exhausted, enable the successor.
    Commands(StateId),
}

impl Link {
    /// Make `next` the successor of this stage.
    pub fn connect(self, runner: &mut Runner, next: StateId) -> Result<()> {
        match self {
            Self::Pattern(at) => runner.add_action(at, Action::change_state([next], [at.state])),
            Self::Commands(id) => {
                runner.commands_mut(id)?.set_next_state(next);
                Ok(())
            }
        }
    }
}

/// A stage that has been installed into a runner.
#[derive(Debug, Clone, Copy)]
pub struct Installed {
    /// The stage's entry state.
    pub state: StateId,
    /// Where a successor hooks in; `None` for a final stage.
    pub link: Option<Link>,
}

/// One step of the boot sequence.
pub trait Stage {
    /// Register the stage's state with `runner`.
    ///
    /// `key_delay` paces every line the stage types.
    fn install(self, runner: &mut Runner, key_delay: Duration) -> Result<Installed>;
}

/// Interrupt the boot menu to reach the loader prompt.
#[derive(Debug, Clone, Copy, Default)]
pub struct EarlyBoot;

impl Stage for EarlyBoot {
    fn install(self, runner: &mut Runner, _key_delay: Duration) -> Result<Installed> {
        let state = runner.add_state(State::new("early-boot", true));
        let menu = runner.add_pattern(
            state,
            Pattern::new("to boot immediately, or any other key for command prompt.")
                .with_action(Action::send(" ")),
        )?;
        Ok(Installed {
            state,
            link: Some(Link::Pattern(menu)),
        })
    }
}

/// Type commands at the loader's `OK` prompt, then `boot`.
#[derive(Debug, Clone, Default)]
pub struct Loader {
    commands: Vec<String>,
}

impl Loader {
    /// Create a loader stage with no extra commands.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a loader command.
    #[must_use]
    pub fn command(mut self, cmd: impl Into<String>) -> Self {
        self.commands.push(cmd.into());
        self
    }
}

impl Stage for Loader {
    fn install(self, runner: &mut Runner, key_delay: Duration) -> Result<Installed> {
        let state = runner.add_state(State::command("loader", "OK", false, key_delay));
        let queue = runner.commands_mut(state)?;
        queue.add_late_command("boot");
        for cmd in self.commands {
            queue.add_command(cmd);
        }
        Ok(Installed {
            state,
            link: Some(Link::Commands(state)),
        })
    }
}

/// Follow the kernel and rc output until `login:`, then log in as root.
#[derive(Debug, Clone, Copy, Default)]
pub struct Boot;

impl Stage for Boot {
    fn install(self, runner: &mut Runner, key_delay: Duration) -> Result<Installed> {
        // Progress markers carry no actions; matching them keeps the buffer short.
        let mut boot = State::new("boot", true)
            .with_pattern(Pattern::new(
                "FreeBSD is a registered trademark of The FreeBSD Foundation.",
            ))
            .with_pattern(Pattern::new("Trying to mount root from"))
            .with_pattern(Pattern::new("Feeding entropy"))
            .with_pattern(Pattern::new("Starting"));
        let login = boot.add_pattern(
            Pattern::new("login:").with_action(Action::send_line("root", key_delay)),
        );

        let state = runner.add_state(boot);
        Ok(Installed {
            state,
            link: Some(Link::Pattern(PatternRef::new(state, login))),
        })
    }
}

/// Run the test suite with kyua and export a JUnit report.
#[derive(Debug, Clone, Copy, Default)]
pub struct FbsdTests;

impl Stage for FbsdTests {
    fn install(self, runner: &mut Runner, key_delay: Duration) -> Result<Installed> {
        let state = runner.add_state(State::command(
            "tests",
            Trigger::regex(ROOT_PROMPT)?,
            false,
            key_delay,
        ));
        runner
            .commands_mut(state)?
            .add_command("mount -t msdosfs /dev/vtbd1 /mnt")
            .add_command("cd /usr/tests")
            .add_command("kyua test")
            .add_command("kyua report-junit --output=/mnt/output.xml")
            .add_command("umount /mnt");

        // Per-test result lines and GELI chatter, absorbed while kyua runs.
        runner.add_pattern(state, Pattern::new(Trigger::regex(r".*->")?))?;
        runner.add_pattern(state, Pattern::new("GEOM_ELI"))?;

        Ok(Installed {
            state,
            link: Some(Link::Commands(state)),
        })
    }
}

/// Power the machine off.
///
/// Sending `shutdown -p now` disables the prompt state and enables a
/// power-off state. The run then ends through the background state, or
/// through the power-off state when firmware reboots the machine instead of
/// powering it off. Shutdown is always the final stage.
#[derive(Debug, Clone)]
pub struct Shutdown {
    prompt: String,
}

impl Shutdown {
    /// Shut down from a custom shell prompt regex.
    #[must_use]
    pub fn with_prompt(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
        }
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::with_prompt(ROOT_PROMPT)
    }
}

impl Stage for Shutdown {
    fn install(self, runner: &mut Runner, key_delay: Duration) -> Result<Installed> {
        let state = runner.add_state(State::command(
            "shutdown",
            Trigger::regex(&self.prompt)?,
            false,
            key_delay,
        ));
        // Firmware prints this banner at power-on too, so it only counts
        // once shutdown has been requested.
        let power_off = runner.add_state(
            State::new("power-off", false).with_pattern(
                Pattern::new("Booting Trusted Firmware").with_action(Action::terminate(0)),
            ),
        );
        runner
            .commands_mut(state)?
            .add_command("shutdown -p now")
            .set_next_state(power_off);

        Ok(Installed { state, link: None })
    }
}
