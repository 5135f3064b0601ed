//! Child process spawning and lifecycle on a Unix PTY.

use std::io;
use std::os::unix::io::{AsRawFd, FromRawFd, OwnedFd};
use std::process::{ExitStatus as StdExitStatus, Stdio};

use tokio::process::{Child as TokioChild, Command};

use crate::command::CommandLine;
use crate::config::PtyConfig;
use crate::error::{PtyError, Result};

/// How a child process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    /// Exited normally with the given code.
    Exited(i32),
    /// Terminated by the given signal.
    Signaled(i32),
}

impl ExitStatus {
    /// Whether the child exited with code zero.
    #[must_use]
    pub const fn success(self) -> bool {
        matches!(self, Self::Exited(0))
    }
}

impl From<StdExitStatus> for ExitStatus {
    fn from(status: StdExitStatus) -> Self {
        use std::os::unix::process::ExitStatusExt;
        if let Some(code) = status.code() {
            Self::Exited(code)
        } else if let Some(signal) = status.signal() {
            Self::Signaled(signal)
        } else {
            Self::Exited(-1)
        }
    }
}

/// A child process attached to the slave side of a PTY.
#[derive(Debug)]
pub struct PtyChild {
    child: TokioChild,
    pid: u32,
    status: Option<ExitStatus>,
}

impl PtyChild {
    /// The child's process id.
    #[must_use]
    pub const fn pid(&self) -> u32 {
        self.pid
    }

    /// Check whether the child has exited, without blocking.
    pub fn try_wait(&mut self) -> Result<Option<ExitStatus>> {
        if self.status.is_none() {
            self.status = self.child.try_wait().map_err(PtyError::Wait)?.map(Into::into);
        }
        Ok(self.status)
    }

    /// Wait for the child to exit.
    pub async fn wait(&mut self) -> Result<ExitStatus> {
        if let Some(status) = self.status {
            return Ok(status);
        }
        let status = ExitStatus::from(self.child.wait().await.map_err(PtyError::Wait)?);
        self.status = Some(status);
        Ok(status)
    }

    /// Whether the child is still running.
    pub fn is_running(&mut self) -> Result<bool> {
        Ok(self.try_wait()?.is_none())
    }

    /// Send `SIGKILL` to the child.
    pub fn kill(&mut self) -> Result<()> {
        self.child.start_kill().map_err(PtyError::Signal)
    }
}

/// Spawn `command` with the PTY slave at `slave_fd` as its controlling
/// terminal and standard streams.
///
/// The child runs in a new session. The slave descriptor is closed in the
/// parent once the child has been started so that end-of-stream is observed
/// on the master when the child exits.
pub fn spawn_child(
    slave_fd: OwnedFd,
    command: &CommandLine,
    config: &PtyConfig,
) -> Result<PtyChild> {
    let slave_raw = slave_fd.as_raw_fd();
    let spawn_error = |source: io::Error| PtyError::Spawn {
        program: command.program().to_string(),
        source,
    };

    let mut cmd = Command::new(command.program());
    cmd.args(command.args());
    cmd.envs(config.env.iter().map(|(k, v)| (k.as_str(), v.as_str())));
    if let Some(ref dir) = config.working_directory {
        cmd.current_dir(dir);
    }

    // SAFETY: each call duplicates a descriptor we own; the resulting fds are
    // owned by the Stdio values.
    unsafe {
        cmd.stdin(Stdio::from_raw_fd(dup(slave_raw).map_err(spawn_error)?));
        cmd.stdout(Stdio::from_raw_fd(dup(slave_raw).map_err(spawn_error)?));
        cmd.stderr(Stdio::from_raw_fd(dup(slave_raw).map_err(spawn_error)?));
    }

    // SAFETY: setsid and ioctl are async-signal-safe. stdin is the slave by
    // the time this hook runs.
    unsafe {
        cmd.pre_exec(|| {
            if libc::setsid() == -1 {
                return Err(io::Error::last_os_error());
            }
            if libc::ioctl(0, libc::TIOCSCTTY, 0) == -1 {
                return Err(io::Error::last_os_error());
            }
            Ok(())
        });
    }

    let child = cmd.spawn().map_err(spawn_error)?;
    drop(cmd);
    drop(slave_fd);

    let pid = child
        .id()
        .ok_or_else(|| spawn_error(io::Error::other("child exited before its pid was read")))?;
    tracing::debug!(pid, command = %command, "spawned child on pty");

    Ok(PtyChild {
        child,
        pid,
        status: None,
    })
}

fn dup(fd: i32) -> io::Result<i32> {
    // SAFETY: dup on a descriptor we hold open has no memory-safety impact.
    let new_fd = unsafe { libc::dup(fd) };
    if new_fd == -1 {
        Err(io::Error::last_os_error())
    } else {
        Ok(new_fd)
    }
}
