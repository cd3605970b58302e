//! In-process full-duplex byte stream pair.
//!
//! [`pair`] returns two linked [`Endpoint`]s. Bytes written on one are read,
//! in order, from the other, with no OS or network transport underneath:
//! - blocking reads ([`Endpoint::read`]) park the calling thread
//! - async reads ([`Endpoint::read_async`]) suspend the task and can be
//!   cancelled with a [`CancellationToken`]
//! - [`Endpoint::dispose`] (or dropping the endpoint) signals end of stream
//!
//! Each write is queued as one message. A read never spans two messages, so
//! short reads are normal. Framing is left to the caller.
//!
//! Endpoints also implement `std::io::{Read, Write, Seek}` and
//! `tokio::io::{AsyncRead, AsyncWrite}`.

pub mod endpoint;
pub mod error;
mod inbox;
mod io;
mod message;
pub mod pair;

pub use endpoint::Endpoint;
pub use error::{Result, StreamError};
pub use pair::{pair, pair_with_config, PairConfig};
pub use tokio_util::sync::CancellationToken;
