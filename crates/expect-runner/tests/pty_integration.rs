//! Runs small scenarios against real processes on a PTY.

#![cfg(unix)]

use std::time::Duration;

use expect_runner::prelude::*;

fn config() -> RunnerConfig {
    RunnerConfig::new()
        .send_delay(Duration::ZERO)
        .echo(false)
        .wait_timeout(Duration::from_secs(10))
}

#[test]
fn echo_output_reaches_pattern() {
    let mut runner = Runner::new(config());
    runner.add_state(
        State::new("main", true)
            .with_pattern(Pattern::new("hello-pty").with_action(Action::terminate(0)))
            .with_pattern(Pattern::new(Trigger::eof()).with_action(Action::terminate(2)))
            .with_pattern(Pattern::new(Trigger::timeout()).with_action(Action::terminate(3))),
    );

    assert_eq!(runner.run("echo hello-pty").unwrap(), 0);
}

#[test]
fn eof_after_exit_fires_sentinel() {
    let mut runner = Runner::new(config());
    runner.add_state(
        State::new("main", true)
            .with_pattern(Pattern::new(Trigger::eof()).with_action(Action::terminate(4))),
    );

    assert_eq!(runner.run("true").unwrap(), 4);
}

#[test]
fn shell_prompt_drives_commands() {
    let mut runner = Runner::new(config());
    let shell = runner.add_state(State::command(
        "shell",
        Trigger::regex(r"PROMPT> ").unwrap(),
        true,
        Duration::ZERO,
    ));
    let done = runner.add_state(
        State::new("done", false)
            .with_pattern(Pattern::new("marker-42").with_action(Action::terminate(0))),
    );
    runner.add_state(
        State::new("background", true)
            .with_pattern(Pattern::new(Trigger::eof()).with_action(Action::terminate(5)))
            .with_pattern(Pattern::new(Trigger::timeout()).with_action(Action::terminate(6))),
    );
    runner
        .commands_mut(shell)
        .unwrap()
        .add_command("echo marker-$((40 + 2))")
        .set_next_state(done);

    let code = runner.run("/bin/sh -c 'PS1=\"PROMPT> \" exec /bin/sh -i'").unwrap();
    assert_eq!(code, 0);
}

#[test]
fn missing_program_is_a_spawn_error() {
    let mut runner = Runner::new(config());
    let err = runner.run("/nonexistent/vm-binary --boot").unwrap_err();
    assert!(matches!(err, ExpectError::Spawn(_)));
}
