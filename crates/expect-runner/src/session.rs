//! The child handle used by actions and the match loop.
//!
//! A [`Session`] owns the byte stream to the child together with the output
//! buffer that triggers are matched against. It provides the three
//! primitives the engine needs: raw sends, paced line sends and the
//! multiplexed wait [`Session::expect_any`].

use std::io::Write;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::Instant;

use crate::buffer::OutputBuffer;
use crate::config::{LineEnding, RunnerConfig};
use crate::error::{ExpectError, Result};
use crate::trigger::{Trigger, find_earliest};

/// Size of a single read from the child.
const READ_CHUNK: usize = 4096;

/// A session with a child process over an async byte stream.
pub struct Session<T> {
    /// The underlying transport (PTY master, scripted child, ...).
    transport: T,
    /// Unmatched output.
    buffer: OutputBuffer,
    /// Console mirror for everything the child prints.
    echo: Option<Box<dyn Write + Send>>,
    /// Line terminator for line sends.
    line_ending: LineEnding,
    /// Delay before each write.
    send_delay: Duration,
    /// EOF flag.
    eof: bool,
}

impl<T: AsyncRead + AsyncWrite + Unpin> Session<T> {
    /// Create a new session over `transport`.
    ///
    /// The console mirror starts unset; see [`Session::set_echo`].
    pub fn new(transport: T, config: &RunnerConfig) -> Self {
        Self {
            transport,
            buffer: OutputBuffer::new(config.buffer_size),
            echo: None,
            line_ending: config.line_ending,
            send_delay: config.send_delay,
            eof: false,
        }
    }

    /// Mirror every chunk read from the child to `sink`.
    pub fn set_echo(&mut self, sink: impl Write + Send + 'static) {
        self.echo = Some(Box::new(sink));
    }

    /// Check if EOF has been detected.
    #[must_use]
    pub const fn is_eof(&self) -> bool {
        self.eof
    }

    /// Get the unmatched output buffer.
    pub fn buffer_mut(&mut self) -> &mut OutputBuffer {
        &mut self.buffer
    }

    /// Send bytes to the process as a single write.
    pub async fn send(&mut self, data: &[u8]) -> Result<()> {
        if !self.send_delay.is_zero() {
            tokio::time::sleep(self.send_delay).await;
        }

        self.transport
            .write_all(data)
            .await
            .map_err(|e| ExpectError::io_context("writing to process", e))?;
        self.transport
            .flush()
            .await
            .map_err(|e| ExpectError::io_context("flushing process input", e))?;
        Ok(())
    }

    /// Send a line followed by the configured line ending.
    ///
    /// With a non-zero `pacing` every character is written on its own with a
    /// sleep of `pacing` after it, then the terminator is written without
    /// pacing. With zero pacing the line and terminator go out as one write.
    pub async fn send_line(&mut self, line: &str, pacing: Duration) -> Result<()> {
        if pacing.is_zero() {
            let mut data = Vec::with_capacity(line.len() + 2);
            data.extend_from_slice(line.as_bytes());
            data.extend_from_slice(self.line_ending.as_bytes());
            return self.send(&data).await;
        }

        let mut utf8 = [0u8; 4];
        for ch in line.chars() {
            self.send(ch.encode_utf8(&mut utf8).as_bytes()).await?;
            tokio::time::sleep(pacing).await;
        }
        let ending = self.line_ending.as_bytes();
        self.send(ending).await
    }

    /// Wait until one of `triggers` fires and return its index.
    ///
    /// Text triggers are checked against the buffer before every read, so
    /// output left over from the previous match can satisfy the next wait.
    /// On a text match the buffer is consumed through the end of the match.
    /// When the child's output closes the first [`Trigger::Eof`] in
    /// `triggers` fires and the buffer is cleared; when `timeout` elapses the
    /// first [`Trigger::Timeout`] fires. Without the matching sentinel the
    /// wait fails with [`ExpectError::Eof`] or [`ExpectError::Timeout`].
    pub async fn expect_any(&mut self, triggers: &[&Trigger], timeout: Duration) -> Result<usize> {
        let deadline = Instant::now() + timeout;

        loop {
            if let Some((idx, end)) = find_earliest(triggers, self.buffer.as_slice()) {
                self.buffer.consume(end);
                return Ok(idx);
            }

            if self.eof {
                return match triggers.iter().position(|t| t.is_eof()) {
                    Some(idx) => {
                        self.buffer.clear();
                        Ok(idx)
                    }
                    None => Err(ExpectError::eof(self.buffer.as_str_lossy())),
                };
            }

            let now = Instant::now();
            if now >= deadline {
                return match triggers.iter().position(|t| t.is_timeout()) {
                    Some(idx) => Ok(idx),
                    None => Err(ExpectError::timeout(timeout, self.buffer.as_str_lossy())),
                };
            }

            self.read_with_timeout(deadline - now).await?;
        }
    }

    /// Read one chunk from the transport, giving up after `timeout`.
    async fn read_with_timeout(&mut self, timeout: Duration) -> Result<usize> {
        let mut buf = [0u8; READ_CHUNK];

        match tokio::time::timeout(timeout, self.transport.read(&mut buf)).await {
            Ok(Ok(0)) => {
                tracing::debug!("child output closed");
                self.eof = true;
                Ok(0)
            }
            Ok(Ok(n)) => {
                self.mirror(&buf[..n]);
                self.buffer.append(&buf[..n]);
                Ok(n)
            }
            Ok(Err(e)) => Err(ExpectError::io_context("reading from process", e)),
            // The caller checks the deadline.
            Err(_) => Ok(0),
        }
    }

    fn mirror(&mut self, chunk: &[u8]) {
        if let Some(sink) = self.echo.as_mut() {
            // The mirror is for the operator only; losing it must not end the run.
            if let Err(e) = sink.write_all(chunk).and_then(|()| sink.flush()) {
                tracing::warn!(error = %e, "console mirror failed, disabling it");
                self.echo = None;
            }
        }
    }
}

impl<T> std::fmt::Debug for Session<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("buffer", &self.buffer)
            .field("echo", &self.echo.is_some())
            .field("line_ending", &self.line_ending)
            .field("send_delay", &self.send_delay)
            .field("eof", &self.eof)
            .finish()
    }
}
