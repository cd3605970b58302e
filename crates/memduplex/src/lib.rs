//! In-memory duplex byte streams for testing protocol and I/O code.
//!
//! memduplex gives two in-process parties a bidirectional byte stream that
//! behaves like a pipe or socket, without touching the OS.
//!
//! # Crate Structure
//!
//! - [`stream`] — The endpoint pair, its errors and configuration
//!
//! ```
//! use memduplex::stream::pair;
//!
//! let (client, server) = pair();
//! client.write(b"hello").unwrap();
//!
//! let mut buf = [0u8; 16];
//! let n = server.read(&mut buf).unwrap();
//! assert_eq!(&buf[..n], b"hello");
//! ```

/// Re-export stream types.
pub mod stream {
    pub use memduplex_stream::*;
}

pub use memduplex_stream::{pair, pair_with_config, Endpoint, PairConfig, StreamError};
