//! `std::io` and `tokio::io` trait implementations for [`Endpoint`].
//!
//! These let a duplex pair stand in for a socket or pipe in code written
//! against the standard I/O traits. End of stream is reported as a 0-byte
//! read once the counterpart has disposed.

use std::io::{self, Read, Seek, SeekFrom, Write};
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

use crate::endpoint::Endpoint;
use crate::inbox::STREAM_WAITER;

impl Read for Endpoint {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Endpoint::read(self, buf).map_err(Into::into)
    }
}

impl Read for &Endpoint {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Endpoint::read(*self, buf).map_err(Into::into)
    }
}

impl Write for Endpoint {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Endpoint::write(self, buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Endpoint::flush(self).map_err(Into::into)
    }
}

impl Write for &Endpoint {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Endpoint::write(*self, buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Endpoint::flush(*self).map_err(Into::into)
    }
}

impl Seek for Endpoint {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        Endpoint::seek(self, pos).map_err(Into::into)
    }
}

impl AsyncRead for Endpoint {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        if this.is_closed() {
            return Poll::Ready(Err(crate::StreamError::Disposed.into()));
        }
        if buf.remaining() == 0 {
            return Poll::Ready(Ok(()));
        }

        let dst = buf.initialize_unfilled();
        match this.inbox().poll_read(cx, STREAM_WAITER, dst) {
            Poll::Ready(Ok(n)) => {
                buf.advance(n);
                Poll::Ready(Ok(()))
            }
            Poll::Ready(Err(err)) => Poll::Ready(Err(err.into())),
            Poll::Pending => Poll::Pending,
        }
    }
}

impl AsyncWrite for Endpoint {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Poll::Ready(
            Endpoint::write(self.get_mut(), buf)
                .map(|()| buf.len())
                .map_err(Into::into),
        )
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Endpoint::flush(self.get_mut()).map_err(Into::into))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.get_mut().dispose();
        Poll::Ready(Ok(()))
    }
}
