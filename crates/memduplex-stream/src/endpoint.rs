use std::future::Future;
use std::io::SeekFrom;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use bytes::Bytes;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::error::{Result, StreamError};
use crate::inbox::{Inbox, WaiterId, STREAM_WAITER};
use crate::message::Message;

/// One side of an in-memory duplex pair.
///
/// Bytes written here are queued on the counterpart's inbox; reads drain
/// this endpoint's own inbox. Writes and reads on the same endpoint may run
/// on different threads at the same time since they touch different
/// queues.
///
/// Created by [`pair`](crate::pair). Dropping an endpoint disposes it.
#[derive(Debug)]
pub struct Endpoint {
    label: String,
    inbox: Arc<Inbox>,
    counterpart: Arc<Inbox>,
    closed: AtomicBool,
}

impl Endpoint {
    pub(crate) fn new(label: String, inbox: Arc<Inbox>, counterpart: Arc<Inbox>) -> Self {
        Self {
            label,
            inbox,
            counterpart,
            closed: AtomicBool::new(false),
        }
    }

    pub(crate) fn inbox(&self) -> &Inbox {
        &self.inbox
    }

    /// Diagnostic name of this endpoint.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Whether [`dispose`](Self::dispose) has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Number of messages queued for this endpoint, including a closure
    /// sentinel if one has been posted.
    pub fn pending_messages(&self) -> usize {
        self.inbox.len()
    }

    /// Read up to `buf.len()` bytes, blocking until data or closure arrives.
    ///
    /// Returns 0 once the counterpart has disposed and everything it wrote
    /// has been read. Short reads are normal. An empty `buf` returns 0
    /// without waiting.
    pub fn read(&self, buf: &mut [u8]) -> Result<usize> {
        self.ensure_open()?;
        if buf.is_empty() {
            return Ok(0);
        }

        let n = self.inbox.read_blocking(buf)?;
        trace!(endpoint = %self.label, bytes = n, "read");
        Ok(n)
    }

    /// Blocking read into `buf[offset..offset + count]`.
    pub fn read_range(&self, buf: &mut [u8], offset: usize, count: usize) -> Result<usize> {
        let range = checked_range(buf.len(), offset, count)?;
        self.read(&mut buf[range])
    }

    /// Read without blocking. `Ok(None)` when nothing is queued yet.
    pub fn try_read(&self, buf: &mut [u8]) -> Result<Option<usize>> {
        self.ensure_open()?;
        if buf.is_empty() {
            return Ok(Some(0));
        }
        self.inbox.try_read(buf).transpose()
    }

    /// Read up to `buf.len()` bytes, suspending the task until data or
    /// closure arrives.
    ///
    /// If `cancel` fires before data is available the call fails with
    /// [`StreamError::Cancelled`] and nothing is consumed. With `None` the
    /// wait cannot be interrupted.
    pub async fn read_async(
        &self,
        buf: &mut [u8],
        cancel: Option<&CancellationToken>,
    ) -> Result<usize> {
        self.ensure_open()?;
        if buf.is_empty() {
            return Ok(0);
        }

        let read = Readable::new(&self.inbox, buf);

        let n = match cancel {
            Some(token) => {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => {
                        debug!(endpoint = %self.label, "async read cancelled");
                        return Err(StreamError::Cancelled);
                    }
                    n = read => n?,
                }
            }
            None => read.await?,
        };

        trace!(endpoint = %self.label, bytes = n, "async read");
        Ok(n)
    }

    /// Async read into `buf[offset..offset + count]`.
    pub async fn read_range_async(
        &self,
        buf: &mut [u8],
        offset: usize,
        count: usize,
        cancel: Option<&CancellationToken>,
    ) -> Result<usize> {
        let range = checked_range(buf.len(), offset, count)?;
        self.read_async(&mut buf[range], cancel).await
    }

    /// Queue a copy of `buf` for the counterpart.
    ///
    /// Zero-length writes are ignored; an empty message is reserved for
    /// closure.
    pub fn write(&self, buf: &[u8]) -> Result<()> {
        self.ensure_open()?;
        if buf.is_empty() {
            return Ok(());
        }

        let depth = self
            .counterpart
            .push(Message::new(Bytes::copy_from_slice(buf)));
        trace!(endpoint = %self.label, bytes = buf.len(), depth, "write");
        Ok(())
    }

    /// Write `buf[offset..offset + count]`.
    pub fn write_range(&self, buf: &[u8], offset: usize, count: usize) -> Result<()> {
        let range = checked_range(buf.len(), offset, count)?;
        self.write(&buf[range])
    }

    /// Async form of [`write`](Self::write). Never suspends.
    pub async fn write_async(&self, buf: &[u8], cancel: Option<&CancellationToken>) -> Result<()> {
        if cancel.is_some_and(CancellationToken::is_cancelled) {
            return Err(StreamError::Cancelled);
        }
        self.write(buf)
    }

    /// No-op; writes are visible to the counterpart as soon as they return.
    pub fn flush(&self) -> Result<()> {
        self.ensure_open()
    }

    /// Close this endpoint and post the closure sentinel to the counterpart.
    ///
    /// Only the first call has any effect.
    pub fn dispose(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            trace!(endpoint = %self.label, "already disposed");
            return;
        }

        let depth = self.counterpart.push(Message::sentinel());
        debug!(endpoint = %self.label, depth, "endpoint disposed");
    }

    pub fn seek(&self, _pos: SeekFrom) -> Result<u64> {
        self.unsupported("seek")
    }

    pub fn length(&self) -> Result<u64> {
        self.unsupported("length")
    }

    pub fn set_length(&self, _len: u64) -> Result<()> {
        self.unsupported("set_length")
    }

    pub fn position(&self) -> Result<u64> {
        self.unsupported("position")
    }

    pub fn set_position(&self, _pos: u64) -> Result<()> {
        self.unsupported("set_position")
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(StreamError::Disposed);
        }
        Ok(())
    }

    fn unsupported<T>(&self, operation: &'static str) -> Result<T> {
        self.ensure_open()?;
        Err(StreamError::NotSupported { operation })
    }
}

impl Drop for Endpoint {
    fn drop(&mut self) {
        self.inbox.deregister(STREAM_WAITER);
        self.dispose();
    }
}

/// Pending async read on one inbox. Dropping it, whether after completion,
/// cancellation or a timeout, withdraws its waker from the wake token.
struct Readable<'a> {
    inbox: &'a Inbox,
    waiter: WaiterId,
    buf: &'a mut [u8],
}

impl<'a> Readable<'a> {
    fn new(inbox: &'a Inbox, buf: &'a mut [u8]) -> Self {
        Self {
            inbox,
            waiter: inbox.new_waiter(),
            buf,
        }
    }
}

impl Future for Readable<'_> {
    type Output = Result<usize>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        this.inbox.poll_read(cx, this.waiter, this.buf)
    }
}

impl Drop for Readable<'_> {
    fn drop(&mut self) {
        self.inbox.deregister(self.waiter);
    }
}

fn checked_range(len: usize, offset: usize, count: usize) -> Result<std::ops::Range<usize>> {
    match offset.checked_add(count) {
        Some(end) if end <= len => Ok(offset..end),
        _ => Err(StreamError::InvalidArgument { offset, count, len }),
    }
}
