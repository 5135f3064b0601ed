//! Scripted in-memory child for dry-running scenarios.
//!
//! [`ScriptedChild`] stands in for a spawned process. It hands out queued
//! output one chunk per read, answers input it recognizes with more output,
//! and records every write. When it runs out of output it stays silent
//! (reads pend) until it is closed, which makes timeouts and end-of-stream
//! easy to provoke.
//!
//! ```
//! use expect_runner::mock::ScriptedChild;
//!
//! let child = ScriptedChild::new()
//!     .output("login: ")
//!     .on_input("root\n", "root@freebsd:~ # ")
//!     .close_on_input("shutdown -p now\n");
//! # let _ = child;
//! ```

use std::collections::VecDeque;
use std::io;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll, Waker};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

/// Something the child does once it has seen a given input.
#[derive(Debug)]
struct Reaction {
    needle: Vec<u8>,
    output: Option<Vec<u8>>,
    close: bool,
}

#[derive(Debug, Default)]
struct Inner {
    /// Output chunks waiting to be read.
    chunks: VecDeque<Vec<u8>>,
    /// Reactions, consumed strictly in order.
    reactions: VecDeque<Reaction>,
    /// Every write call, as received.
    writes: Vec<Vec<u8>>,
    /// All written bytes.
    input: Vec<u8>,
    /// Offset in `input` where the next reaction search starts.
    scan_from: usize,
    /// Output closed once the queued chunks are drained.
    closed: bool,
    /// Error returned by the next read.
    error: Option<String>,
    /// Error returned by the next write.
    write_error: Option<String>,
    /// Reader parked on an empty queue.
    waker: Option<Waker>,
}

impl Inner {
    fn wake(&mut self) {
        if let Some(waker) = self.waker.take() {
            waker.wake();
        }
    }

    fn react(&mut self) {
        while let Some(reaction) = self.reactions.front() {
            let haystack = &self.input[self.scan_from..];
            let Some(pos) = haystack
                .windows(reaction.needle.len().max(1))
                .position(|w| w == reaction.needle.as_slice())
            else {
                break;
            };
            self.scan_from += pos + reaction.needle.len();

            if let Some(reaction) = self.reactions.pop_front() {
                if let Some(output) = reaction.output {
                    self.chunks.push_back(output);
                }
                self.closed |= reaction.close;
            }
            self.wake();
        }
    }
}

/// An in-memory child process driven by a script.
///
/// Clones share state, so a test can keep one handle for inspection while a
/// session owns another.
#[derive(Debug, Clone, Default)]
pub struct ScriptedChild {
    inner: Arc<Mutex<Inner>>,
}

impl ScriptedChild {
    /// Create a silent child.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue a chunk of output, builder style.
    #[must_use]
    pub fn output(self, chunk: impl AsRef<[u8]>) -> Self {
        self.push_output(chunk);
        self
    }

    /// Close the output once everything queued so far has been read.
    #[must_use]
    pub fn close(self) -> Self {
        self.signal_eof();
        self
    }

    /// Produce `output` once `input` has been written.
    ///
    /// Reactions are matched in registration order, each against input
    /// written after the previous reaction's match.
    #[must_use]
    pub fn on_input(self, input: impl AsRef<[u8]>, output: impl AsRef<[u8]>) -> Self {
        self.lock().reactions.push_back(Reaction {
            needle: input.as_ref().to_vec(),
            output: Some(output.as_ref().to_vec()),
            close: false,
        });
        self
    }

    /// Close the output once `input` has been written.
    #[must_use]
    pub fn close_on_input(self, input: impl AsRef<[u8]>) -> Self {
        self.lock().reactions.push_back(Reaction {
            needle: input.as_ref().to_vec(),
            output: None,
            close: true,
        });
        self
    }

    /// Queue a chunk of output.
    pub fn push_output(&self, chunk: impl AsRef<[u8]>) {
        let mut inner = self.lock();
        inner.chunks.push_back(chunk.as_ref().to_vec());
        inner.wake();
    }

    /// Close the output once everything queued has been read.
    pub fn signal_eof(&self) {
        let mut inner = self.lock();
        inner.closed = true;
        inner.wake();
    }

    /// Fail the next read with `message`.
    pub fn fail_next_read(&self, message: impl Into<String>) {
        let mut inner = self.lock();
        inner.error = Some(message.into());
        inner.wake();
    }

    /// Fail the next write with `message`. The failed write is not recorded.
    pub fn fail_next_write(&self, message: impl Into<String>) {
        self.lock().write_error = Some(message.into());
    }

    /// Every write call received, in order.
    #[must_use]
    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.lock().writes.clone()
    }

    /// All written bytes concatenated.
    #[must_use]
    pub fn written(&self) -> Vec<u8> {
        self.lock().input.clone()
    }

    /// All written bytes as text.
    #[must_use]
    pub fn written_str(&self) -> String {
        String::from_utf8_lossy(&self.written()).into_owned()
    }
}

impl AsyncRead for ScriptedChild {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let mut inner = self.lock();

        if let Some(error) = inner.error.take() {
            return Poll::Ready(Err(io::Error::other(error)));
        }

        if let Some(mut chunk) = inner.chunks.pop_front() {
            let n = buf.remaining().min(chunk.len());
            buf.put_slice(&chunk[..n]);
            if n < chunk.len() {
                inner.chunks.push_front(chunk.split_off(n));
            }
            return Poll::Ready(Ok(()));
        }

        if inner.closed {
            return Poll::Ready(Ok(()));
        }

        inner.waker = Some(cx.waker().clone());
        Poll::Pending
    }
}

impl AsyncWrite for ScriptedChild {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let mut inner = self.lock();
        if let Some(error) = inner.write_error.take() {
            return Poll::Ready(Err(io::Error::other(error)));
        }
        inner.writes.push(buf.to_vec());
        inner.input.extend_from_slice(buf);
        inner.react();
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}
