use std::io;

/// Errors that can occur on a duplex endpoint.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// The endpoint has been disposed.
    #[error("endpoint disposed")]
    Disposed,

    /// The operation is not supported by an in-memory duplex stream.
    #[error("{operation} is not supported on a duplex endpoint")]
    NotSupported { operation: &'static str },

    /// The requested range does not fit inside the caller's buffer.
    #[error("range {offset}+{count} out of bounds for buffer of {len} bytes")]
    InvalidArgument {
        offset: usize,
        count: usize,
        len: usize,
    },

    /// An asynchronous operation was cancelled before it completed.
    #[error("operation cancelled")]
    Cancelled,

    /// Internal invariant broken; indicates misuse, not a runtime condition.
    #[error("invariant violation: {0}")]
    InvariantViolation(&'static str),
}

pub type Result<T> = std::result::Result<T, StreamError>;

impl From<StreamError> for io::Error {
    fn from(err: StreamError) -> Self {
        let kind = match &err {
            StreamError::Disposed => io::ErrorKind::BrokenPipe,
            StreamError::NotSupported { .. } => io::ErrorKind::Unsupported,
            StreamError::InvalidArgument { .. } => io::ErrorKind::InvalidInput,
            StreamError::Cancelled => io::ErrorKind::Interrupted,
            StreamError::InvariantViolation(_) => io::ErrorKind::Other,
        };
        io::Error::new(kind, err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_kinds() {
        let cases = [
            (StreamError::Disposed, io::ErrorKind::BrokenPipe),
            (
                StreamError::NotSupported { operation: "seek" },
                io::ErrorKind::Unsupported,
            ),
            (
                StreamError::InvalidArgument {
                    offset: 4,
                    count: 4,
                    len: 6,
                },
                io::ErrorKind::InvalidInput,
            ),
            (StreamError::Cancelled, io::ErrorKind::Interrupted),
            (
                StreamError::InvariantViolation("test"),
                io::ErrorKind::Other,
            ),
        ];

        for (err, kind) in cases {
            let io_err: io::Error = err.into();
            assert_eq!(io_err.kind(), kind);
        }
    }

    #[test]
    fn io_error_keeps_source() {
        let io_err: io::Error = StreamError::Disposed.into();
        let inner = io_err
            .get_ref()
            .and_then(|e| e.downcast_ref::<StreamError>())
            .expect("inner error should be StreamError");
        assert!(matches!(inner, StreamError::Disposed));
    }

    #[test]
    fn display_messages() {
        let err = StreamError::InvalidArgument {
            offset: 2,
            count: 9,
            len: 4,
        };
        assert_eq!(
            err.to_string(),
            "range 2+9 out of bounds for buffer of 4 bytes"
        );
        assert_eq!(
            StreamError::NotSupported {
                operation: "position"
            }
            .to_string(),
            "position is not supported on a duplex endpoint"
        );
    }
}
