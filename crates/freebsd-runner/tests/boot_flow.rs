//! Full boot flows against a scripted console.

use std::time::Duration;

use expect_runner::mock::ScriptedChild;
use expect_runner::{RunnerConfig, Session};
use freebsd_runner::{Scenario, ScenarioConfig};

const BANNER: &str = "\
Booting...\r\n\
---<<BOOT>>---\r\n\
Copyright (c) 1992-2024 The FreeBSD Project.\r\n\
FreeBSD is a registered trademark of The FreeBSD Foundation.\r\n\
Trying to mount root from ufs:/dev/vtbd0p2 [rw]...\r\n\
Feeding entropy: .\r\n\
Starting devd.\r\n\
Starting sshd.\r\n\
\r\n\
FreeBSD/arm64 (freebsd) (ttyu0)\r\n\
\r\n\
login: ";

fn runner_config() -> RunnerConfig {
    RunnerConfig::new()
        .send_delay(Duration::ZERO)
        .echo(false)
        .wait_timeout(Duration::from_secs(30))
}

async fn drive(scenario: Scenario, child: &ScriptedChild) -> i32 {
    let mut runner = scenario.into_runner();
    let mut session = Session::new(child.clone(), runner.config());
    runner.drive(&mut session).await.unwrap()
}

#[tokio::test]
async fn boot_login_and_shutdown() {
    let scenario =
        Scenario::standard(runner_config(), ScenarioConfig::default(), &[], false).unwrap();
    let child = ScriptedChild::new()
        .output(BANNER)
        .on_input("root\n", "root@freebsd:~ # ")
        .on_input(
            "shutdown -p now\n",
            "Shutdown NOW!\r\nshutdown: [pid 812]\r\nUptime: 1m12s\r\n",
        );

    assert_eq!(drive(scenario, &child).await, 0);
    assert_eq!(child.written_str(), "root\nshutdown -p now\n");
}

#[tokio::test]
async fn loader_commands_are_typed_before_boot() {
    let scenario = Scenario::standard(
        runner_config(),
        ScenarioConfig::default(),
        &["set hw.physmem=1G".to_string(), "set boot_verbose=1".to_string()],
        false,
    )
    .unwrap();
    let child = ScriptedChild::new()
        .output("Hit [Enter] to boot immediately, or any other key for command prompt.\r\n")
        .on_input(" ", "\r\nType '?' for a list of commands.\r\nOK ")
        .on_input("set hw.physmem=1G\n", "OK ")
        .on_input("set boot_verbose=1\n", "OK ")
        .on_input("boot\n", BANNER)
        .on_input("root\n", "root@freebsd:~ # ")
        .close_on_input("shutdown -p now\n");

    assert_eq!(drive(scenario, &child).await, 0);
    assert_eq!(
        child.written_str(),
        " set hw.physmem=1G\nset boot_verbose=1\nboot\nroot\nshutdown -p now\n"
    );
}

#[tokio::test]
async fn test_suite_runs_between_login_and_shutdown() {
    let scenario =
        Scenario::standard(runner_config(), ScenarioConfig::default(), &[], true).unwrap();
    let child = ScriptedChild::new()
        .output(BANNER)
        .on_input("root\n", "root@freebsd:~ # ")
        .on_input("mount -t msdosfs /dev/vtbd1 /mnt\n", "root@freebsd:~ # ")
        .on_input("cd /usr/tests\n", "root@freebsd:/usr/tests # ")
        .on_input(
            "kyua test\n",
            "sys/kern/pipe_test:pipe_ino  ->  passed  [0.012s]\r\n\
             GEOM_ELI: Device md0.eli created.\r\n\
             sys/kern/ptrace_test:ptrace__parent_wait  ->  passed  [0.104s]\r\n\
             ===> Summary\r\n\
             root@freebsd:/usr/tests # ",
        )
        .on_input(
            "kyua report-junit --output=/mnt/output.xml\n",
            "root@freebsd:/usr/tests # ",
        )
        .on_input("umount /mnt\n", "root@freebsd:/usr/tests # ")
        .close_on_input("shutdown -p now\n");

    assert_eq!(drive(scenario, &child).await, 0);
    assert_eq!(
        child.written_str(),
        "root\n\
         mount -t msdosfs /dev/vtbd1 /mnt\n\
         cd /usr/tests\n\
         kyua test\n\
         kyua report-junit --output=/mnt/output.xml\n\
         umount /mnt\n\
         shutdown -p now\n"
    );
}

#[tokio::test]
async fn kernel_panic_fails_the_run() {
    let scenario =
        Scenario::standard(runner_config(), ScenarioConfig::default(), &[], false).unwrap();
    let child = ScriptedChild::new().output(
        "Trying to mount root from ufs:/dev/vtbd0p2 [rw]...\r\n\
         panic: vm_fault_lookup: fault on nofault entry\r\n\
         KDB: enter: panic\r\n\
         [ thread pid 1 tid 100002 ]\r\n\
         db> ",
    );

    assert_eq!(drive(scenario, &child).await, 1);
    assert!(child.writes().is_empty());
}

#[tokio::test(start_paused = true)]
async fn silent_console_times_out() {
    let config = runner_config().wait_timeout(Duration::from_secs(3660));
    let scenario = Scenario::standard(config, ScenarioConfig::default(), &[], false).unwrap();
    let child = ScriptedChild::new().output("Booting...\r\n");

    assert_eq!(drive(scenario, &child).await, 1);
}

#[tokio::test]
async fn firmware_reboot_counts_as_shutdown() {
    let scenario =
        Scenario::standard(runner_config(), ScenarioConfig::default(), &[], false).unwrap();
    let child = ScriptedChild::new()
        .output(BANNER)
        .on_input("root\n", "root@freebsd:~ # ")
        .on_input("shutdown -p now\n", "NOTICE:  Booting Trusted Firmware\r\n");

    assert_eq!(drive(scenario, &child).await, 0);
}

#[tokio::test(start_paused = true)]
async fn key_delay_paces_login() {
    let config = ScenarioConfig::new(Duration::from_millis(20));
    let scenario = Scenario::standard(runner_config(), config, &[], false).unwrap();
    let child = ScriptedChild::new()
        .output(BANNER)
        .on_input("root\n", "root@freebsd:~ # ")
        .close_on_input("shutdown -p now\n");

    assert_eq!(drive(scenario, &child).await, 0);

    let writes = child.writes();
    let login: Vec<&[u8]> = writes[..5].iter().map(Vec::as_slice).collect();
    assert_eq!(login, [b"r".as_slice(), b"o", b"o", b"t", b"\n"]);
}
