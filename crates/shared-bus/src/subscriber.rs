//! # Event Subscriber
//!
//! Defines the subscription side of the event bus.

use crate::events::Event;
use crate::subject::ErasedSubject;
use std::pin::Pin;
use std::sync::Weak;
use std::task::{Context, Poll};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_stream::Stream;
use tracing::debug;

/// Errors from subscription operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    /// The feed ended: unsubscribed, or the event bus was disposed.
    #[error("Event bus closed")]
    Closed,
}

/// Links a handle to its slot in a subject.
///
/// Detaches on `release` or drop; the subject is held weakly so a handle
/// never keeps a disposed bus alive.
pub(crate) struct SubscriptionToken {
    id: u64,
    event: &'static str,
    subject: Weak<dyn ErasedSubject>,
    active: bool,
}

impl SubscriptionToken {
    pub(crate) fn new(id: u64, event: &'static str, subject: Weak<dyn ErasedSubject>) -> Self {
        Self {
            id,
            event,
            subject,
            active: true,
        }
    }

    /// Returns `true` only for the call that actually detached.
    fn release(&mut self) -> bool {
        if !self.active {
            return false;
        }
        self.active = false;

        let detached = self
            .subject
            .upgrade()
            .is_some_and(|subject| subject.detach(self.id));
        debug!(event = self.event, subscription = self.id, "Subscription dropped");
        detached
    }

    fn is_active(&self) -> bool {
        self.active && self.subject.strong_count() > 0
    }
}

impl Drop for SubscriptionToken {
    fn drop(&mut self) {
        self.release();
    }
}

/// A subscription handle for receiving events of type `E`.
///
/// Events are queued when published and drained by the holder. When dropped,
/// the subscription is automatically cleaned up.
pub struct Subscription<E: Event> {
    /// Queue filled by the subject.
    receiver: mpsc::UnboundedReceiver<E>,

    /// Slot in the subject.
    token: SubscriptionToken,
}

impl<E: Event> Subscription<E> {
    pub(crate) fn new(receiver: mpsc::UnboundedReceiver<E>, token: SubscriptionToken) -> Self {
        Self { receiver, token }
    }

    /// Receive the next event.
    ///
    /// # Returns
    ///
    /// - `Some(event)` - The next queued event
    /// - `None` - The feed ended (unsubscribed or bus disposed) and is drained
    pub async fn recv(&mut self) -> Option<E> {
        self.receiver.recv().await
    }

    /// Try to receive the next event without waiting.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(event))` - An event was queued
    /// - `Ok(None)` - Nothing queued yet
    /// - `Err(SubscriptionError::Closed)` - The feed ended and is drained
    pub fn try_recv(&mut self) -> Result<Option<E>, SubscriptionError> {
        match self.receiver.try_recv() {
            Ok(event) => Ok(Some(event)),
            Err(mpsc::error::TryRecvError::Empty) => Ok(None),
            Err(mpsc::error::TryRecvError::Disconnected) => Err(SubscriptionError::Closed),
        }
    }

    /// Drain every event queued so far.
    pub fn drain(&mut self) -> Vec<E> {
        let mut events = Vec::new();
        while let Ok(event) = self.receiver.try_recv() {
            events.push(event);
        }
        events
    }

    /// Stop further delivery. Already-queued events remain readable.
    ///
    /// Safe to call repeatedly; returns `true` only on the call that detached.
    pub fn unsubscribe(&mut self) -> bool {
        self.token.release()
    }

    /// Whether this handle is still attached to a live subject.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.token.is_active()
    }

    /// Convert into a [`Stream`].
    #[must_use]
    pub fn into_stream(self) -> EventStream<E> {
        EventStream::new(self)
    }
}

/// Handle for a callback subscription.
///
/// The callback stays attached for as long as this handle lives.
#[must_use = "dropping the handle unsubscribes the handler"]
pub struct HandlerSubscription {
    token: SubscriptionToken,
}

impl HandlerSubscription {
    pub(crate) fn new(token: SubscriptionToken) -> Self {
        Self { token }
    }

    /// Detach the callback. Safe to call repeatedly.
    pub fn unsubscribe(&mut self) -> bool {
        self.token.release()
    }

    /// Whether the callback is still attached to a live subject.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.token.is_active()
    }

    /// Name of the event type this handler listens to.
    #[must_use]
    pub fn event_name(&self) -> &'static str {
        self.token.event
    }
}

/// A stream wrapper for subscriptions.
///
/// Implements `tokio_stream::Stream` for use with stream combinators.
pub struct EventStream<E: Event> {
    subscription: Subscription<E>,
}

impl<E: Event> EventStream<E> {
    /// Create a new event stream from a subscription.
    #[must_use]
    pub fn new(subscription: Subscription<E>) -> Self {
        Self { subscription }
    }

    /// Give back the underlying subscription.
    #[must_use]
    pub fn into_inner(self) -> Subscription<E> {
        self.subscription
    }
}

impl<E: Event> Stream for EventStream<E> {
    type Item = E;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().subscription.receiver.poll_recv(cx)
    }
}
