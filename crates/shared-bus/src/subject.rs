//! # Per-Type Subject
//!
//! One [`Subject`] exists per event type. It holds the ordered subscriber
//! list and performs synchronous fan-out.
//!
//! ## Locking
//!
//! - `table`: guards the subscriber list and the closed flag
//! - `queue`: the draining flag and events published while draining
//!
//! Neither lock is held while a subscriber runs. Delivery iterates a snapshot
//! taken under `table`, so handlers are free to subscribe or unsubscribe
//! while being called. Cross-publisher serialization is the bus's job.
//!
//! ## Nested Publishes
//!
//! A handler that publishes its own event type does not recurse: the event is
//! queued and delivered once the current fan-out has reached every
//! subscriber, so all subscribers observe events in publish order.

use crate::events::Event;
use parking_lot::{Mutex, RwLock};
use std::any::Any;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::trace;

/// Callback subscriber.
pub type Handler<E> = Arc<dyn Fn(&E) + Send + Sync>;

/// Where a subscriber's events go.
pub(crate) enum Sink<E> {
    /// Queued into a [`Subscription`](crate::Subscription) feed.
    Feed(mpsc::UnboundedSender<E>),
    /// Invoked inline on the publisher's thread.
    Handler(Handler<E>),
}

impl<E> Clone for Sink<E> {
    fn clone(&self) -> Self {
        match self {
            Self::Feed(tx) => Self::Feed(tx.clone()),
            Self::Handler(h) => Self::Handler(Arc::clone(h)),
        }
    }
}

struct Slot<E> {
    id: u64,
    sink: Sink<E>,
}

impl<E> Clone for Slot<E> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            sink: self.sink.clone(),
        }
    }
}

struct SlotTable<E> {
    slots: Vec<Slot<E>>,
    closed: bool,
}

struct DeliveryQueue<E> {
    draining: bool,
    pending: VecDeque<E>,
}

/// Clears the draining flag however the drain loop ends.
struct DrainGuard<'a, E> {
    queue: &'a Mutex<DeliveryQueue<E>>,
}

impl<E> Drop for DrainGuard<'_, E> {
    fn drop(&mut self) {
        let mut queue = self.queue.lock();
        queue.draining = false;
        // Only non-empty when a subscriber panicked mid-delivery.
        queue.pending.clear();
    }
}

/// Broadcast channel for a single event type.
pub struct Subject<E: Event> {
    table: RwLock<SlotTable<E>>,
    queue: Mutex<DeliveryQueue<E>>,
    next_id: AtomicU64,
}

impl<E: Event> Subject<E> {
    pub(crate) fn new() -> Self {
        Self {
            table: RwLock::new(SlotTable {
                slots: Vec::new(),
                closed: false,
            }),
            queue: Mutex::new(DeliveryQueue {
                draining: false,
                pending: VecDeque::new(),
            }),
            next_id: AtomicU64::new(1),
        }
    }

    /// Append a subscriber. Returns `None` once the subject is closed.
    pub(crate) fn attach(&self, sink: Sink<E>) -> Option<u64> {
        let mut table = self.table.write();
        if table.closed {
            return None;
        }
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        table.slots.push(Slot { id, sink });
        trace!(event = E::NAME, subscription = id, "Subscriber attached");
        Some(id)
    }

    /// Deliver `event` to every subscriber attached at call time, in
    /// attachment order. Returns the number of subscribers reached.
    ///
    /// Called while this subject is already draining, the event is queued
    /// behind the current one and the return value is the number of
    /// subscribers attached at the time of the call.
    pub(crate) fn publish(&self, event: E) -> usize {
        {
            let mut queue = self.queue.lock();
            if queue.draining {
                queue.pending.push_back(event);
                trace!(
                    event = E::NAME,
                    queued = queue.pending.len(),
                    "Nested publish queued"
                );
                return self.len();
            }
            queue.draining = true;
        }
        let _drain = DrainGuard { queue: &self.queue };

        let delivered = self.deliver(&event);
        loop {
            // Pop in its own statement: the queue lock must not be held
            // while subscribers run.
            let next = self.queue.lock().pending.pop_front();
            match next {
                Some(next) => {
                    self.deliver(&next);
                }
                None => break,
            }
        }
        delivered
    }

    fn deliver(&self, event: &E) -> usize {
        let snapshot: Vec<Slot<E>> = self.table.read().slots.clone();

        let mut delivered = 0;
        for slot in snapshot {
            match slot.sink {
                Sink::Feed(tx) => {
                    // A receiver dropped without detaching is simply skipped.
                    if tx.send(event.clone()).is_ok() {
                        delivered += 1;
                    }
                }
                Sink::Handler(handler) => {
                    handler(event);
                    delivered += 1;
                }
            }
        }
        delivered
    }

    pub(crate) fn len(&self) -> usize {
        self.table.read().slots.len()
    }
}

/// Type-erased view of a [`Subject`], stored in the bus registry and held
/// weakly by subscription handles.
pub(crate) trait ErasedSubject: Send + Sync {
    /// Remove one subscriber. Returns `true` if it was still attached.
    fn detach(&self, id: u64) -> bool;

    /// Drop every subscriber and refuse new ones. Feeds observe end-of-stream.
    fn close(&self);

    fn subscriber_count(&self) -> usize;

    fn event_name(&self) -> &'static str;

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<E: Event> ErasedSubject for Subject<E> {
    fn detach(&self, id: u64) -> bool {
        let mut table = self.table.write();
        let before = table.slots.len();
        table.slots.retain(|slot| slot.id != id);
        let removed = table.slots.len() != before;
        if removed {
            trace!(event = E::NAME, subscription = id, "Subscriber detached");
        }
        removed
    }

    fn close(&self) {
        let mut table = self.table.write();
        table.closed = true;
        table.slots.clear();
        drop(table);
        self.queue.lock().pending.clear();
    }

    fn subscriber_count(&self) -> usize {
        self.len()
    }

    fn event_name(&self) -> &'static str {
        E::NAME
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}
