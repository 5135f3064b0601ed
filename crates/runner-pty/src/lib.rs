//! runner-pty: PTY process spawning for expect-runner
//!
//! This crate starts a child process on a freshly allocated pseudo-terminal
//! and hands back an async byte stream to the PTY master plus a handle on the
//! child's lifecycle. It is the process-spawn facility consumed by
//! `expect-runner`; it does no pattern matching of its own.
//!
//! # Quick Start
//!
//! ```ignore
//! use runner_pty::{CommandLine, PtyConfig};
//! use tokio::io::{AsyncReadExt, AsyncWriteExt};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let command = CommandLine::parse("/bin/sh -i")?;
//!     let (mut master, mut child) = runner_pty::spawn(&command, &PtyConfig::default())?;
//!
//!     master.write_all(b"echo hello\n").await?;
//!     let mut buf = [0u8; 1024];
//!     let n = master.read(&mut buf).await?;
//!     println!("{}", String::from_utf8_lossy(&buf[..n]));
//!
//!     child.kill()?;
//!     Ok(())
//! }
//! ```

pub mod command;
pub mod config;
pub mod error;

#[cfg(unix)]
mod child;
#[cfg(unix)]
mod master;

pub use command::CommandLine;
pub use config::{PtyConfig, WindowSize};
pub use error::{PtyError, Result};

#[cfg(unix)]
pub use child::{ExitStatus, PtyChild, spawn_child};
#[cfg(unix)]
pub use master::{PtyMaster, open_slave};

/// Allocate a PTY and spawn `command` on it.
///
/// Must be called from within a tokio runtime with I/O enabled.
#[cfg(unix)]
pub fn spawn(command: &CommandLine, config: &PtyConfig) -> Result<(PtyMaster, PtyChild)> {
    let (master, slave_path) = PtyMaster::open()?;
    master.set_window_size(config.window_size)?;
    let slave_fd = open_slave(&slave_path)?;
    let child = spawn_child(slave_fd, command, config)?;
    Ok((master, child))
}
