use std::fmt;
use std::io;

use memduplex_stream::StreamError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    CliError::new(INTERNAL, format!("{context}: {err}"))
}

pub fn stream_error(context: &str, err: StreamError) -> CliError {
    let code = match err {
        StreamError::Disposed | StreamError::Cancelled => FAILURE,
        StreamError::InvalidArgument { .. } | StreamError::NotSupported { .. } => USAGE,
        StreamError::InvariantViolation(_) => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn mismatch(context: &str, detail: impl fmt::Display) -> CliError {
    CliError::new(DATA_INVALID, format!("{context}: {detail}"))
}

/// Map a panicked worker thread to an internal error.
pub fn worker_panicked(name: &str) -> CliError {
    CliError::new(INTERNAL, format!("{name} thread panicked"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_error_codes() {
        assert_eq!(stream_error("x", StreamError::Disposed).code, FAILURE);
        assert_eq!(stream_error("x", StreamError::Cancelled).code, FAILURE);
        assert_eq!(
            stream_error(
                "x",
                StreamError::InvalidArgument {
                    offset: 1,
                    count: 1,
                    len: 1
                }
            )
            .code,
            USAGE
        );
        assert_eq!(
            stream_error("x", StreamError::InvariantViolation("boom")).code,
            INTERNAL
        );
    }

    #[test]
    fn message_includes_context() {
        let err = stream_error("read failed", StreamError::Disposed);
        assert_eq!(err.to_string(), "read failed: endpoint disposed");
        assert_eq!(mismatch("verify", "byte 3").to_string(), "verify: byte 3");
    }
}
