//! The master side of a Unix pseudo-terminal.

use std::io;
use std::os::unix::io::{AsRawFd, OwnedFd, RawFd};
use std::pin::Pin;
use std::task::{Context, Poll};

use rustix::fs::{Mode, OFlags, fcntl_setfl, open};
use rustix::io::Errno;
use rustix::pty::{OpenptFlags, grantpt, openpt, ptsname, unlockpt};
use rustix::termios::{Winsize, tcsetwinsize};
use tokio::io::unix::AsyncFd;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

use crate::config::WindowSize;
use crate::error::{PtyError, Result};

/// Async handle on the master side of a PTY.
///
/// Reads yield the child's console output, writes are delivered to the
/// child as keyboard input. Once the child side is gone the kernel reports
/// `EIO` on read; that is surfaced as end-of-stream (a zero-length read).
pub struct PtyMaster {
    async_fd: AsyncFd<OwnedFd>,
}

impl std::fmt::Debug for PtyMaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PtyMaster")
            .field("fd", &self.async_fd.as_raw_fd())
            .finish()
    }
}

impl PtyMaster {
    /// Allocate a PTY pair, returning the master and the slave's path.
    ///
    /// Must be called from within a tokio runtime.
    pub fn open() -> Result<(Self, String)> {
        let master_fd = openpt(OpenptFlags::RDWR | OpenptFlags::NOCTTY)
            .map_err(|e| PtyError::Create(PtyError::from_errno(e)))?;
        grantpt(&master_fd).map_err(|e| PtyError::Create(PtyError::from_errno(e)))?;
        unlockpt(&master_fd).map_err(|e| PtyError::Create(PtyError::from_errno(e)))?;

        let slave_path = ptsname(&master_fd, Vec::new())
            .map_err(|e| PtyError::Create(PtyError::from_errno(e)))?
            .into_string()
            .map_err(|_| {
                PtyError::Create(io::Error::new(
                    io::ErrorKind::InvalidData,
                    "slave path is not valid UTF-8",
                ))
            })?;

        fcntl_setfl(&master_fd, OFlags::NONBLOCK)
            .map_err(|e| PtyError::Create(PtyError::from_errno(e)))?;
        let async_fd = AsyncFd::new(master_fd).map_err(PtyError::Create)?;

        Ok((Self { async_fd }, slave_path))
    }

    /// Set the terminal window size seen by the child.
    pub fn set_window_size(&self, size: WindowSize) -> Result<()> {
        let winsize = Winsize {
            ws_col: size.cols,
            ws_row: size.rows,
            ws_xpixel: 0,
            ws_ypixel: 0,
        };
        tcsetwinsize(self.async_fd.get_ref(), winsize)
            .map_err(|e| PtyError::Io(PtyError::from_errno(e)))
    }
}

impl AsRawFd for PtyMaster {
    fn as_raw_fd(&self) -> RawFd {
        self.async_fd.as_raw_fd()
    }
}

impl AsyncRead for PtyMaster {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        loop {
            let mut guard = match self.async_fd.poll_read_ready(cx) {
                Poll::Ready(Ok(guard)) => guard,
                Poll::Ready(Err(e)) => return Poll::Ready(Err(e)),
                Poll::Pending => return Poll::Pending,
            };

            let unfilled = buf.initialize_unfilled();
            match rustix::io::read(self.async_fd.get_ref(), unfilled) {
                Ok(n) => {
                    buf.advance(n);
                    return Poll::Ready(Ok(()));
                }
                Err(Errno::AGAIN) => {
                    guard.clear_ready();
                }
                // Linux reports EIO once the last slave descriptor is closed.
                Err(Errno::IO) => return Poll::Ready(Ok(())),
                Err(e) => return Poll::Ready(Err(PtyError::from_errno(e))),
            }
        }
    }
}

impl AsyncWrite for PtyMaster {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        loop {
            let mut guard = match self.async_fd.poll_write_ready(cx) {
                Poll::Ready(Ok(guard)) => guard,
                Poll::Ready(Err(e)) => return Poll::Ready(Err(e)),
                Poll::Pending => return Poll::Pending,
            };

            match rustix::io::write(self.async_fd.get_ref(), buf) {
                Ok(n) => return Poll::Ready(Ok(n)),
                Err(Errno::AGAIN) => {
                    guard.clear_ready();
                }
                Err(e) => return Poll::Ready(Err(PtyError::from_errno(e))),
            }
        }
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

/// Open the slave side of a PTY by path.
pub fn open_slave(path: &str) -> Result<OwnedFd> {
    open(path, OFlags::RDWR | OFlags::NOCTTY, Mode::empty())
        .map_err(|e| PtyError::Create(PtyError::from_errno(e)))
}
