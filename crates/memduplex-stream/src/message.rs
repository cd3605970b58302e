use bytes::Bytes;

/// One write's payload together with its read cursor.
///
/// A zero-length message is the closure sentinel. It is never reported as
/// consumed, so once it reaches the head of a queue it stays there.
#[derive(Debug, Clone)]
pub struct Message {
    payload: Bytes,
    cursor: usize,
}

impl Message {
    /// Wrap a payload with the cursor at the start.
    pub fn new(payload: impl Into<Bytes>) -> Self {
        Self {
            payload: payload.into(),
            cursor: 0,
        }
    }

    /// The closure sentinel.
    pub fn sentinel() -> Self {
        Self::new(Bytes::new())
    }

    /// Copy as many unread bytes as fit into `dst` and advance the cursor.
    ///
    /// Returns the number of bytes copied. Only the single reader draining
    /// the owning queue may call this.
    pub fn consume(&mut self, dst: &mut [u8]) -> usize {
        let n = dst.len().min(self.remaining());
        dst[..n].copy_from_slice(&self.payload[self.cursor..self.cursor + n]);
        self.cursor += n;
        debug_assert!(
            self.cursor <= self.payload.len(),
            "cursor advanced past payload"
        );
        n
    }

    /// True once every byte has been read. Always false for the sentinel.
    pub fn is_consumed(&self) -> bool {
        !self.payload.is_empty() && self.cursor == self.payload.len()
    }

    pub fn is_sentinel(&self) -> bool {
        self.payload.is_empty()
    }

    /// Unread bytes left in this message.
    pub fn remaining(&self) -> usize {
        self.payload.len() - self.cursor
    }
}
