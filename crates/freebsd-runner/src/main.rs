//! freebsd-runner - boot a FreeBSD VM, optionally run its test suite, and
//! shut it down, all through the serial console.
//!
//! The VM's console is mirrored to stdout; diagnostics go to stderr. The
//! process exits with the status chosen by the scenario (0 on a clean
//! shutdown, 1 on a panic or a silent console) or 1 if the run fails.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use expect_runner::RunnerConfig;
use freebsd_runner::{Scenario, ScenarioConfig};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Drive a FreeBSD virtual machine over its console
#[derive(Parser, Debug)]
#[command(name = "freebsd-runner")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Delay between each key press, in seconds
    #[arg(long, default_value = "0", value_parser = parse_seconds)]
    key_delay: Duration,

    /// Run a command at the loader prompt (repeatable)
    #[arg(long = "loader", value_name = "CMD")]
    loader: Vec<String>,

    /// Run the FreeBSD test suite
    #[arg(long)]
    tests: bool,

    /// Give up after this many seconds without a recognized line
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Path to a runner configuration file
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Do not mirror the console to stdout
    #[arg(long)]
    quiet: bool,

    /// Log filter (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn", env = "RUST_LOG")]
    log_level: String,

    /// VM command to run
    command: String,
}

fn parse_seconds(s: &str) -> Result<Duration, String> {
    let secs: f64 = s.parse().map_err(|e| format!("invalid number of seconds: {e}"))?;
    Duration::try_from_secs_f64(secs).map_err(|e| format!("invalid delay: {e}"))
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    match run(&cli) {
        Ok(code) => ExitCode::from(status_byte(code)),
        Err(e) => {
            eprintln!("freebsd-runner: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Map a scenario exit code to a process status; codes outside `0..=255` fail.
fn status_byte(code: i32) -> u8 {
    u8::try_from(code).unwrap_or(1)
}

fn run(cli: &Cli) -> expect_runner::Result<i32> {
    let mut runner_config = RunnerConfig::load(cli.config.as_deref())?;
    if let Some(secs) = cli.timeout {
        runner_config.wait_timeout = Duration::from_secs(secs);
    }
    if cli.quiet {
        runner_config.echo = false;
    }

    let mut scenario = Scenario::standard(
        runner_config,
        ScenarioConfig::new(cli.key_delay),
        &cli.loader,
        cli.tests,
    )?;
    scenario.run(&cli.command)
}
