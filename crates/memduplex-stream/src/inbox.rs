use std::collections::{HashMap, VecDeque};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll, Waker};

use crate::error::{Result, StreamError};
use crate::message::Message;

/// Identifies one async reader's slot in the wake token.
pub(crate) type WaiterId = u64;

/// Slot used by the `AsyncRead` impl. Only one `&mut` poller can exist at a
/// time, so every poll replaces the same entry.
pub(crate) const STREAM_WAITER: WaiterId = 0;

/// The receiving queue of one endpoint.
///
/// One mutex covers the queue and the wake token. Blocking readers park on
/// `readable`; async readers register their waker on the current token,
/// one slot per waiter. Every push fires the token (all registered wakers)
/// and starts a fresh one, and broadcasts on the condvar. A waiter that
/// gives up withdraws its slot, so abandoned reads leave nothing behind.
#[derive(Debug, Default)]
pub(crate) struct Inbox {
    state: Mutex<InboxState>,
    readable: Condvar,
}

#[derive(Debug, Default)]
struct InboxState {
    queue: VecDeque<Message>,
    wake_token: HashMap<WaiterId, Waker>,
    last_waiter: WaiterId,
}

impl Inbox {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    // Queue mutations never leave the state half-updated, so a poisoned
    // lock is still safe to use.
    fn lock(&self) -> MutexGuard<'_, InboxState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a message and wake every waiting reader.
    ///
    /// Returns the queue depth after the append.
    pub(crate) fn push(&self, message: Message) -> usize {
        let (depth, fired) = {
            let mut state = self.lock();
            state.queue.push_back(message);
            (state.queue.len(), std::mem::take(&mut state.wake_token))
        };

        self.readable.notify_all();
        for waker in fired.into_values() {
            waker.wake();
        }
        depth
    }

    /// Block the calling thread until a message is queued, then consume
    /// from the head.
    pub(crate) fn read_blocking(&self, dst: &mut [u8]) -> Result<usize> {
        let mut state = self.lock();
        while state.queue.is_empty() {
            state = self
                .readable
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
        state.consume_head(dst)
    }

    /// Allocate a fresh slot for one async read.
    pub(crate) fn new_waiter(&self) -> WaiterId {
        let mut state = self.lock();
        state.last_waiter += 1;
        state.last_waiter
    }

    /// Consume from the head if a message is queued; otherwise register the
    /// task under `waiter` on the current wake token and return `Pending`.
    ///
    /// The emptiness check and the registration happen under one lock, so a
    /// push cannot slip in between them unnoticed. Re-polling replaces the
    /// waiter's previous waker.
    pub(crate) fn poll_read(
        &self,
        cx: &mut Context<'_>,
        waiter: WaiterId,
        dst: &mut [u8],
    ) -> Poll<Result<usize>> {
        let mut state = self.lock();
        if state.queue.is_empty() {
            state
                .wake_token
                .entry(waiter)
                .and_modify(|waker| waker.clone_from(cx.waker()))
                .or_insert_with(|| cx.waker().clone());
            return Poll::Pending;
        }
        Poll::Ready(state.consume_head(dst))
    }

    /// Withdraw `waiter` from the wake token, if it is still registered.
    pub(crate) fn deregister(&self, waiter: WaiterId) {
        self.lock().wake_token.remove(&waiter);
    }

    /// Consume from the head without waiting. `None` if the queue is empty.
    pub(crate) fn try_read(&self, dst: &mut [u8]) -> Option<Result<usize>> {
        let mut state = self.lock();
        if state.queue.is_empty() {
            return None;
        }
        Some(state.consume_head(dst))
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().queue.len()
    }

    #[cfg(test)]
    pub(crate) fn waiters(&self) -> usize {
        self.lock().wake_token.len()
    }
}

impl InboxState {
    fn consume_head(&mut self, dst: &mut [u8]) -> Result<usize> {
        let head = self
            .queue
            .front_mut()
            .ok_or(StreamError::InvariantViolation("read resumed on an empty inbox"))?;

        let n = head.consume(dst);
        if head.is_consumed() {
            self.queue.pop_front();
        }
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::task::Wake;
    use std::time::Duration;

    use super::*;

    struct CountingWaker(std::sync::atomic::AtomicUsize);

    impl Wake for CountingWaker {
        fn wake(self: Arc<Self>) {
            self.0.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        }
    }

    #[test]
    fn head_removed_only_when_consumed() {
        let inbox = Inbox::new();
        inbox.push(Message::new(&b"abcd"[..]));
        inbox.push(Message::new(&b"ef"[..]));

        let mut buf = [0u8; 3];
        assert_eq!(inbox.try_read(&mut buf).unwrap().unwrap(), 3);
        assert_eq!(&buf, b"abc");
        assert_eq!(inbox.len(), 2);

        assert_eq!(inbox.try_read(&mut buf).unwrap().unwrap(), 1);
        assert_eq!(buf[0], b'd');
        assert_eq!(inbox.len(), 1);

        assert_eq!(inbox.try_read(&mut buf).unwrap().unwrap(), 2);
        assert_eq!(&buf[..2], b"ef");
        assert!(inbox.try_read(&mut buf).is_none());
    }

    #[test]
    fn sentinel_stays_at_head() {
        let inbox = Inbox::new();
        inbox.push(Message::sentinel());

        let mut buf = [0u8; 4];
        for _ in 0..5 {
            assert_eq!(inbox.try_read(&mut buf).unwrap().unwrap(), 0);
        }
        assert_eq!(inbox.len(), 1);
    }

    #[test]
    fn push_fires_and_renews_wake_token() {
        let inbox = Inbox::new();
        let counter = Arc::new(CountingWaker(0.into()));
        let waker = Waker::from(Arc::clone(&counter));
        let mut cx = Context::from_waker(&waker);
        let mut buf = [0u8; 4];

        let waiter = inbox.new_waiter();

        assert!(inbox.poll_read(&mut cx, waiter, &mut buf).is_pending());
        // Re-polling the same waiter does not register twice.
        assert!(inbox.poll_read(&mut cx, waiter, &mut buf).is_pending());
        assert_eq!(inbox.waiters(), 1);

        inbox.push(Message::new(&b"x"[..]));
        assert_eq!(counter.0.load(std::sync::atomic::Ordering::SeqCst), 1);
        assert_eq!(inbox.waiters(), 0);

        match inbox.poll_read(&mut cx, waiter, &mut buf) {
            Poll::Ready(Ok(1)) => assert_eq!(buf[0], b'x'),
            other => panic!("unexpected poll result: {other:?}"),
        }

        // A later push does not fire the already-spent token.
        inbox.push(Message::new(&b"y"[..]));
        assert_eq!(counter.0.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[test]
    fn every_waiter_is_woken_by_one_push() {
        let inbox = Inbox::new();
        let first = Arc::new(CountingWaker(0.into()));
        let second = Arc::new(CountingWaker(0.into()));
        let mut buf = [0u8; 4];

        for counter in [&first, &second] {
            let waker = Waker::from(Arc::clone(counter));
            let mut cx = Context::from_waker(&waker);
            let waiter = inbox.new_waiter();
            assert!(inbox.poll_read(&mut cx, waiter, &mut buf).is_pending());
        }
        assert_eq!(inbox.waiters(), 2);

        inbox.push(Message::new(&b"x"[..]));
        assert_eq!(first.0.load(std::sync::atomic::Ordering::SeqCst), 1);
        assert_eq!(second.0.load(std::sync::atomic::Ordering::SeqCst), 1);
        assert_eq!(inbox.waiters(), 0);
    }

    #[test]
    fn repolling_a_waiter_replaces_its_waker() {
        let inbox = Inbox::new();
        let stale = Arc::new(CountingWaker(0.into()));
        let fresh = Arc::new(CountingWaker(0.into()));
        let mut buf = [0u8; 4];

        for counter in [&stale, &fresh] {
            let waker = Waker::from(Arc::clone(counter));
            let mut cx = Context::from_waker(&waker);
            assert!(inbox.poll_read(&mut cx, STREAM_WAITER, &mut buf).is_pending());
        }
        assert_eq!(inbox.waiters(), 1);

        inbox.push(Message::new(&b"x"[..]));
        assert_eq!(stale.0.load(std::sync::atomic::Ordering::SeqCst), 0);
        assert_eq!(fresh.0.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[test]
    fn deregistered_waiter_is_not_woken() {
        let inbox = Inbox::new();
        let counter = Arc::new(CountingWaker(0.into()));
        let waker = Waker::from(Arc::clone(&counter));
        let mut cx = Context::from_waker(&waker);
        let mut buf = [0u8; 4];

        let waiter = inbox.new_waiter();
        assert!(inbox.poll_read(&mut cx, waiter, &mut buf).is_pending());
        inbox.deregister(waiter);
        assert_eq!(inbox.waiters(), 0);

        inbox.push(Message::new(&b"x"[..]));
        assert_eq!(counter.0.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[test]
    fn blocking_reader_is_woken_by_push() {
        let inbox = Arc::new(Inbox::new());

        let reader = {
            let inbox = Arc::clone(&inbox);
            std::thread::spawn(move || {
                let mut buf = [0u8; 8];
                let n = inbox.read_blocking(&mut buf).unwrap();
                buf[..n].to_vec()
            })
        };

        std::thread::sleep(Duration::from_millis(20));
        inbox.push(Message::new(&b"wake"[..]));

        assert_eq!(reader.join().unwrap(), b"wake");
    }
}
