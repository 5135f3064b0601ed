//! End-to-end scenario tests against a scripted child.
//!
//! Each test builds a small state graph through the composition API and
//! drives it with `Runner::drive` over a `ScriptedChild`.

use std::time::Duration;

use expect_runner::mock::ScriptedChild;
use expect_runner::prelude::*;

fn config() -> RunnerConfig {
    RunnerConfig::new()
        .send_delay(Duration::ZERO)
        .echo(false)
        .wait_timeout(Duration::from_secs(5))
}

/// A prompt drives a one-command queue, then hands off to the login state.
#[tokio::test]
async fn command_sequence_hands_off_to_successor() {
    let mut runner = Runner::new(config());
    let s1 = runner.add_state(State::command("s1", "ready", true, Duration::ZERO));
    let s2 = runner.add_state(
        State::new("s2", false)
            .with_pattern(Pattern::new("login:").with_action(Action::terminate(0))),
    );
    runner.commands_mut(s1).unwrap().add_command("ls").set_next_state(s2);

    let child = ScriptedChild::new().output("ready\n").on_input("ls\n", "login:\n");
    let mut session = Session::new(child.clone(), runner.config());

    let code = runner.drive(&mut session).await.unwrap();

    assert_eq!(code, 0);
    assert_eq!(child.writes(), vec![b"ls\n".to_vec()]);
    assert!(!runner.is_enabled(s1).unwrap());
    assert!(runner.is_enabled(s2).unwrap());
}

/// Silence until the wait times out ends the run through the timeout sentinel.
#[tokio::test(start_paused = true)]
async fn timeout_sentinel_terminates_with_failure() {
    let mut runner = Runner::new(config().wait_timeout(Duration::from_millis(200)));
    runner.add_state(
        State::new("watchdog", true)
            .with_pattern(Pattern::new(Trigger::timeout()).with_action(Action::terminate(1))),
    );

    let child = ScriptedChild::new();
    let mut session = Session::new(child.clone(), runner.config());

    assert_eq!(runner.drive(&mut session).await.unwrap(), 1);
    assert!(child.writes().is_empty());
}

/// A state named in both lists of a state change ends up disabled.
#[tokio::test]
async fn overlapping_state_change_leaves_state_disabled() {
    let mut runner = Runner::new(config());
    let target = runner.add_state(State::new("target", true));
    let trigger = runner.add_state(State::new("trigger", true));
    let toggle = runner.add_pattern(trigger, Pattern::new("toggle")).unwrap();
    runner
        .add_action(toggle, Action::change_state([target], [target]))
        .unwrap();
    runner.add_action(toggle, Action::terminate(0)).unwrap();

    let mut session = Session::new(ScriptedChild::new().output("toggle"), runner.config());

    assert_eq!(runner.drive(&mut session).await.unwrap(), 0);
    assert!(!runner.is_enabled(target).unwrap());
}

/// Nothing after a terminate runs and its code becomes the run's exit code.
#[tokio::test]
async fn terminate_stops_the_chain() {
    let mut runner = Runner::new(config());
    let other = runner.add_state(State::new("other", false));
    runner.add_state(
        State::new("panic", true).with_pattern(
            Pattern::new("KDB: enter: panic")
                .with_action(Action::terminate(1))
                .with_action(Action::send_line("reboot", Duration::ZERO))
                .with_action(Action::change_state([other], [])),
        ),
    );

    let child = ScriptedChild::new().output("panic: page fault\nKDB: enter: panic\n");
    let mut session = Session::new(child.clone(), runner.config());

    assert_eq!(runner.drive(&mut session).await.unwrap(), 1);
    assert!(child.writes().is_empty());
    assert!(!runner.is_enabled(other).unwrap());
}

/// A disabled state's pattern never fires, even if its text arrives first.
#[tokio::test]
async fn disabled_states_do_not_match() {
    let mut runner = Runner::new(config());
    runner.add_state(
        State::new("hidden", false)
            .with_pattern(Pattern::new("login:").with_action(Action::terminate(9))),
    );
    runner.add_state(
        State::new("visible", true)
            .with_pattern(Pattern::new("OK").with_action(Action::terminate(0))),
    );

    let mut session = Session::new(ScriptedChild::new().output("login:\nOK"), runner.config());

    assert_eq!(runner.drive(&mut session).await.unwrap(), 0);
}

/// The earliest match in the output wins over an earlier-registered pattern.
#[tokio::test]
async fn earliest_output_position_wins() {
    let mut runner = Runner::new(config());
    runner.add_state(
        State::new("late", true)
            .with_pattern(Pattern::new("Uptime:").with_action(Action::terminate(0))),
    );
    runner.add_state(
        State::new("early", true)
            .with_pattern(Pattern::new("KDB:").with_action(Action::terminate(1))),
    );

    let mut session = Session::new(
        ScriptedChild::new().output("KDB: enter: panic\nUptime: 3s\n"),
        runner.config(),
    );

    assert_eq!(runner.drive(&mut session).await.unwrap(), 1);
}

/// End-of-stream fires the EOF sentinel once the text patterns are exhausted.
#[tokio::test]
async fn eof_sentinel_terminates_cleanly() {
    let mut runner = Runner::new(config());
    runner.add_state(
        State::new("background", true)
            .with_pattern(Pattern::new(Trigger::eof()).with_action(Action::terminate(0)))
            .with_pattern(Pattern::new(Trigger::timeout()).with_action(Action::terminate(1))),
    );

    let child = ScriptedChild::new().output("Powering off...\n").close();
    let mut session = Session::new(child, runner.config());

    assert_eq!(runner.drive(&mut session).await.unwrap(), 0);
}

/// Without sentinels, end-of-stream and timeouts are fatal errors.
#[tokio::test(start_paused = true)]
async fn missing_sentinels_are_fatal() {
    let mut runner = Runner::new(config().wait_timeout(Duration::from_secs(1)));
    runner.add_state(
        State::new("only", true)
            .with_pattern(Pattern::new("never").with_action(Action::terminate(0))),
    );

    let mut closed = Session::new(ScriptedChild::new().close(), runner.config());
    assert!(runner.drive(&mut closed).await.unwrap_err().is_eof());

    let mut silent = Session::new(ScriptedChild::new(), runner.config());
    assert!(runner.drive(&mut silent).await.unwrap_err().is_timeout());
}

/// A prompt that keeps reappearing walks commands and late commands in order.
#[tokio::test]
async fn loader_commands_run_before_late_boot() {
    let mut runner = Runner::new(config());
    let loader = runner.add_state(State::command("loader", "OK ", true, Duration::ZERO));
    let boot = runner.add_state(
        State::new("boot", false)
            .with_pattern(Pattern::new("login:").with_action(Action::terminate(0))),
    );
    {
        let commands = runner.commands_mut(loader).unwrap();
        commands.add_late_command("boot");
        commands.add_command("set hw.usb.disable=1");
        commands.set_next_state(boot);
    }

    let child = ScriptedChild::new()
        .output("OK ")
        .on_input("set hw.usb.disable=1\n", "OK ")
        .on_input("boot\n", "Booting...\nlogin: ");
    let mut session = Session::new(child.clone(), runner.config());

    assert_eq!(runner.drive(&mut session).await.unwrap(), 0);
    assert_eq!(child.written_str(), "set hw.usb.disable=1\nboot\n");
}

/// A prompt the console wrapped onto a second line still matches a regex.
#[tokio::test(start_paused = true)]
async fn regex_prompt_matches_across_line_break() {
    let mut runner = Runner::new(config());
    runner.add_state(
        State::new("shell", true)
            .with_pattern(
                Pattern::new(Trigger::regex(r"root@.*#").unwrap())
                    .with_action(Action::terminate(0)),
            )
            .with_pattern(Pattern::new(Trigger::timeout()).with_action(Action::terminate(1))),
    );

    let child = ScriptedChild::new().output("root@host-with-a-wrapped\r\nprompt # ");
    let mut session = Session::new(child, runner.config());

    assert_eq!(runner.drive(&mut session).await.unwrap(), 0);
}

/// A failed read ends the run even when EOF and timeout sentinels are active.
#[tokio::test]
async fn read_error_is_fatal() {
    let mut runner = Runner::new(config());
    runner.add_state(
        State::new("background", true)
            .with_pattern(Pattern::new(Trigger::eof()).with_action(Action::terminate(0)))
            .with_pattern(Pattern::new(Trigger::timeout()).with_action(Action::terminate(1))),
    );

    let child = ScriptedChild::new();
    child.fail_next_read("device not configured");
    let mut session = Session::new(child, runner.config());

    let err = runner.drive(&mut session).await.unwrap_err();
    assert!(matches!(
        &err,
        ExpectError::IoWithContext { context, .. } if context == "reading from process"
    ));
}

/// A failed send aborts the rest of its chain and the run.
#[tokio::test]
async fn write_error_aborts_the_chain() {
    let mut runner = Runner::new(config());
    let next = runner.add_state(State::new("next", false));
    runner.add_state(
        State::new("login", true).with_pattern(
            Pattern::new("login:")
                .with_action(Action::send("root\n"))
                .with_action(Action::change_state([next], []))
                .with_action(Action::terminate(0)),
        ),
    );

    let child = ScriptedChild::new().output("login: ");
    child.fail_next_write("broken pipe");
    let mut session = Session::new(child.clone(), runner.config());

    let err = runner.drive(&mut session).await.unwrap_err();
    assert!(matches!(
        &err,
        ExpectError::IoWithContext { context, .. } if context == "writing to process"
    ));
    assert!(child.writes().is_empty());
    assert!(!runner.is_enabled(next).unwrap());
}
