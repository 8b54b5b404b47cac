//! Subscriber fan-out.
//!
//! Each attached subscriber gets its own bounded channel. The pump's fan-out
//! loop never blocks on a slow subscriber: a full queue marks that
//! subscriber laggard and closes it, per the "disconnect-laggard" choice
//! recorded in `DESIGN.md` for the open backpressure-policy question.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use flume::{Receiver, Sender, TryRecvError};
use termalive_screen::RingBuffer;

/// An item delivered to a subscriber: either a chunk of pty output or the
/// terminal "the session is gone" notice, sent exactly once as the last
/// item on every live subscriber's stream.
#[derive(Clone, Debug)]
pub enum SessionEvent {
    Output(Vec<u8>),
    Exited(i32),
}

#[derive(Default)]
pub(crate) struct Subscribers {
    next_id: AtomicU64,
    senders: Mutex<HashMap<u64, Sender<SessionEvent>>>,
}

impl Subscribers {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Take a ring snapshot and register a new subscriber under one
    /// critical section, so no byte written by a concurrent
    /// [`Subscribers::write_and_broadcast`] call can land in both the
    /// snapshot and the new subscriber's stream (or in neither).
    pub(crate) fn register_with_snapshot(
        self: &Arc<Self>,
        capacity: usize,
        ring: &RingBuffer,
    ) -> (Vec<u8>, u64, Receiver<SessionEvent>) {
        let mut senders = self.senders.lock().expect("subscriber map poisoned");
        let snapshot = ring.snapshot();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = flume::bounded(capacity.max(1));
        senders.insert(id, tx);
        (snapshot, id, rx)
    }

    pub(crate) fn unregister(&self, id: u64) {
        self.senders.lock().expect("subscriber map poisoned").remove(&id);
    }

    /// Write `bytes` to the ring and forward them to every live subscriber
    /// under the same critical section used by
    /// [`Subscribers::register_with_snapshot`], so a subscription can never
    /// observe this chunk twice (once in its snapshot, once in its stream)
    /// or not at all.
    pub(crate) fn write_and_broadcast(&self, ring: &RingBuffer, bytes: &[u8]) {
        let mut senders = self.senders.lock().expect("subscriber map poisoned");
        ring.write(bytes);
        senders.retain(|id, tx| match tx.try_send(SessionEvent::Output(bytes.to_vec())) {
            Ok(()) => true,
            Err(flume::TrySendError::Full(_)) => {
                log::warn!("subscriber {id} is laggard, disconnecting");
                false
            },
            Err(flume::TrySendError::Disconnected(_)) => false,
        });
    }

    /// Notify every live subscriber the session has ended, then drop them
    /// all: the event channel itself closing (sender dropped) is what ends
    /// the subscriber's stream after this last item is drained.
    pub(crate) fn broadcast_exit(&self, exit_code: i32) {
        let mut senders = self.senders.lock().expect("subscriber map poisoned");
        for (_, tx) in senders.drain() {
            let _ = tx.try_send(SessionEvent::Exited(exit_code));
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.senders.lock().expect("subscriber map poisoned").len()
    }
}

/// A live subscription to a session's output. Dropping it (or calling
/// [`OutputStream::detach`] explicitly) unregisters it promptly.
pub struct OutputStream {
    id: u64,
    receiver: Receiver<SessionEvent>,
    subscribers: Arc<Subscribers>,
}

impl OutputStream {
    pub(crate) fn new(
        id: u64,
        receiver: Receiver<SessionEvent>,
        subscribers: Arc<Subscribers>,
    ) -> Self {
        Self { id, receiver, subscribers }
    }

    /// Blocking receive of the next event.
    pub fn recv(&self) -> Option<SessionEvent> {
        self.receiver.recv().ok()
    }

    /// Async receive of the next event.
    pub async fn recv_async(&self) -> Option<SessionEvent> {
        self.receiver.recv_async().await.ok()
    }

    /// Non-blocking receive.
    pub fn try_recv(&self) -> Result<SessionEvent, TryRecvError> {
        self.receiver.try_recv()
    }

    /// Detach from the session. Equivalent to dropping this stream.
    pub fn detach(self) {
        drop(self);
    }
}

impl Drop for OutputStream {
    fn drop(&mut self) {
        self.subscribers.unregister(self.id);
    }
}
