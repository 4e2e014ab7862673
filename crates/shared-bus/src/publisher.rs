//! # Event Publisher
//!
//! Defines the publishing side of the event bus and the bus itself.

use crate::events::Event;
use crate::subject::{ErasedSubject, Handler, Sink, Subject};
use crate::subscriber::{HandlerSubscription, Subscription, SubscriptionToken};
use parking_lot::{ReentrantMutex, RwLock};
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, trace};

/// Errors from bus operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BusError {
    /// The bus was disposed; no further publish/subscribe is possible.
    #[error("Event bus disposed")]
    Disposed,

    /// The registry held a subject of the wrong element type for this key.
    #[error("Subject registered for {event} has a different element type")]
    SubjectTypeMismatch { event: &'static str },
}

/// Trait for publishing events to the bus.
///
/// This is the interface subsystems use to emit events for consumption by
/// other subsystems.
pub trait EventPublisher: Send + Sync {
    /// Publish an event to the bus.
    ///
    /// Delivery happens before this returns, on the caller's thread.
    ///
    /// # Returns
    ///
    /// The number of active subscribers that received the event.
    fn publish<E: Event>(&self, event: E) -> Result<usize, BusError>;

    /// Get the total number of events published.
    fn events_published(&self) -> u64;
}

/// In-memory implementation of the event bus.
///
/// Holds one [`Subject`] per event type, keyed by `TypeId`. Subjects are
/// created lazily on first subscription and live until [`dispose`].
///
/// Publishes from different threads are delivered one at a time under a
/// single bus-wide lock. The lock is reentrant, so a handler may publish any
/// event type from inside delivery.
///
/// [`dispose`]: InMemoryEventBus::dispose
pub struct InMemoryEventBus {
    /// Per-type subjects.
    subjects: RwLock<HashMap<TypeId, Arc<dyn ErasedSubject>>>,

    /// Serializes delivery across all event types.
    delivery: ReentrantMutex<()>,

    /// Set once by `dispose`.
    disposed: AtomicBool,

    /// Total events published.
    events_published: AtomicU64,
}

impl InMemoryEventBus {
    /// Create a new, empty event bus.
    #[must_use]
    pub fn new() -> Self {
        Self {
            subjects: RwLock::new(HashMap::new()),
            delivery: ReentrantMutex::new(()),
            disposed: AtomicBool::new(false),
            events_published: AtomicU64::new(0),
        }
    }

    /// Subscribe to future events of type `E`.
    ///
    /// Returns a [`Subscription`] feed. Events published before this call are
    /// not replayed.
    pub fn subscribe<E: Event>(&self) -> Result<Subscription<E>, BusError> {
        let subject = self.subject_or_create::<E>()?;
        let (tx, rx) = mpsc::unbounded_channel();
        let id = subject.attach(Sink::Feed(tx)).ok_or(BusError::Disposed)?;

        debug!(event = E::NAME, topic = ?E::TOPIC, subscription = id, "New subscription created");

        Ok(Subscription::new(rx, Self::token(&subject, id)))
    }

    /// Subscribe a callback to events of type `E`.
    ///
    /// The handler runs synchronously inside `publish`, on the publisher's
    /// thread. It stays attached for as long as the returned handle lives.
    pub fn subscribe_with<E, F>(&self, handler: F) -> Result<HandlerSubscription, BusError>
    where
        E: Event,
        F: Fn(&E) + Send + Sync + 'static,
    {
        let subject = self.subject_or_create::<E>()?;
        let handler: Handler<E> = Arc::new(handler);
        let id = subject
            .attach(Sink::Handler(handler))
            .ok_or(BusError::Disposed)?;

        debug!(
            event = E::NAME,
            topic = ?E::TOPIC,
            subscription = id,
            "New handler subscription created"
        );

        Ok(HandlerSubscription::new(Self::token(&subject, id)))
    }

    /// Close every subject and refuse further publish/subscribe.
    ///
    /// Feeds drain whatever they already hold and then report end-of-stream.
    /// Calling this more than once is harmless.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }

        let subjects: Vec<_> = self.subjects.write().drain().map(|(_, s)| s).collect();
        for subject in &subjects {
            trace!(event = subject.event_name(), "Closing subject");
            subject.close();
        }

        info!(
            subjects = subjects.len(),
            events_published = self.events_published(),
            "Event bus disposed"
        );
    }

    /// Whether [`dispose`](Self::dispose) has been called.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// Number of active subscribers for `E`.
    #[must_use]
    pub fn subscriber_count<E: Event>(&self) -> usize {
        self.subjects
            .read()
            .get(&TypeId::of::<E>())
            .map_or(0, |s| s.subscriber_count())
    }

    /// Number of per-type subjects created so far.
    #[must_use]
    pub fn subject_count(&self) -> usize {
        self.subjects.read().len()
    }

    fn ensure_open(&self) -> Result<(), BusError> {
        if self.is_disposed() {
            Err(BusError::Disposed)
        } else {
            Ok(())
        }
    }

    /// Look up the subject for `E` without creating it.
    fn existing_subject<E: Event>(&self) -> Result<Option<Arc<Subject<E>>>, BusError> {
        let subjects = self.subjects.read();
        subjects
            .get(&TypeId::of::<E>())
            .map(Self::downcast::<E>)
            .transpose()
    }

    /// Look up the subject for `E`, creating it on first use.
    fn subject_or_create<E: Event>(&self) -> Result<Arc<Subject<E>>, BusError> {
        self.ensure_open()?;
        if let Some(subject) = self.existing_subject::<E>()? {
            return Ok(subject);
        }

        let mut subjects = self.subjects.write();
        // Re-check under the write lock: dispose or another creator may have won.
        self.ensure_open()?;
        let entry = subjects.entry(TypeId::of::<E>()).or_insert_with(|| {
            debug!(event = E::NAME, "Subject created");
            let subject: Arc<dyn ErasedSubject> = Arc::new(Subject::<E>::new());
            subject
        });
        Self::downcast::<E>(entry)
    }

    fn downcast<E: Event>(entry: &Arc<dyn ErasedSubject>) -> Result<Arc<Subject<E>>, BusError> {
        Arc::clone(entry)
            .into_any()
            .downcast::<Subject<E>>()
            .map_err(|_| BusError::SubjectTypeMismatch { event: E::NAME })
    }

    fn token<E: Event>(subject: &Arc<Subject<E>>, id: u64) -> SubscriptionToken {
        let erased: Arc<dyn ErasedSubject> = Arc::clone(subject) as Arc<dyn ErasedSubject>;
        SubscriptionToken::new(id, E::NAME, Arc::downgrade(&erased))
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventPublisher for InMemoryEventBus {
    fn publish<E: Event>(&self, event: E) -> Result<usize, BusError> {
        self.ensure_open()?;

        // Always increment counter (event was attempted)
        self.events_published.fetch_add(1, Ordering::Relaxed);

        let Some(subject) = self.existing_subject::<E>()? else {
            trace!(event = E::NAME, "Event dropped (no subscribers)");
            return Ok(0);
        };

        let receivers = {
            let _delivery = self.delivery.lock();
            subject.publish(event)
        };
        debug!(
            event = E::NAME,
            topic = ?E::TOPIC,
            receivers = receivers,
            "Event published"
        );
        Ok(receivers)
    }

    fn events_published(&self) -> u64 {
        self.events_published.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{JumpInput, PlayerJumped, StateChanged};
    use parking_lot::Mutex;
    use shared_types::{GameState, Vector3};
    use std::sync::Barrier;
    use std::time::Duration;

    fn changed(previous: GameState, current: GameState) -> StateChanged {
        StateChanged { previous, current }
    }

    #[test]
    fn test_publish_no_subscribers() {
        let bus = InMemoryEventBus::new();

        let receivers = bus.publish(JumpInput).unwrap();
        assert_eq!(receivers, 0);
        assert_eq!(bus.events_published(), 1);
        // Publishing alone never allocates a subject.
        assert_eq!(bus.subject_count(), 0);
    }

    #[test]
    fn test_publish_with_subscriber() {
        let bus = InMemoryEventBus::new();

        // Create subscriber BEFORE publishing
        let _sub = bus.subscribe::<JumpInput>().unwrap();

        let receivers = bus.publish(JumpInput).unwrap();
        assert_eq!(receivers, 1);
        assert_eq!(bus.subscriber_count::<JumpInput>(), 1);
    }

    #[test]
    fn test_multiple_subscribers_fan_out_in_order() {
        let bus = InMemoryEventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let handles: Vec<_> = (0..3)
            .map(|tag| {
                let log = Arc::clone(&log);
                bus.subscribe_with(move |e: &StateChanged| log.lock().push((tag, e.current)))
                    .unwrap()
            })
            .collect();

        let receivers = bus
            .publish(changed(GameState::MainMenu, GameState::Playing))
            .unwrap();

        assert_eq!(receivers, 3);
        assert_eq!(
            *log.lock(),
            vec![
                (0, GameState::Playing),
                (1, GameState::Playing),
                (2, GameState::Playing)
            ]
        );
        drop(handles);
    }

    #[test]
    fn test_republish_from_handler_keeps_publish_order() {
        let bus = Arc::new(InMemoryEventBus::new());
        let seen = Arc::new(Mutex::new(Vec::new()));

        let weak = Arc::downgrade(&bus);
        let _echo = bus
            .subscribe_with(move |e: &PlayerJumped| {
                if e.position.x == 1.0 {
                    if let Some(bus) = weak.upgrade() {
                        bus.publish(PlayerJumped {
                            position: Vector3::new(2.0, 0.0, 0.0),
                        })
                        .unwrap();
                    }
                }
            })
            .unwrap();
        let log = Arc::clone(&seen);
        let _record = bus
            .subscribe_with(move |e: &PlayerJumped| log.lock().push(e.position.x))
            .unwrap();
        let mut feed = bus.subscribe::<PlayerJumped>().unwrap();

        bus.publish(PlayerJumped {
            position: Vector3::new(1.0, 0.0, 0.0),
        })
        .unwrap();

        assert_eq!(*seen.lock(), vec![1.0, 2.0]);
        let fed: Vec<f32> = feed.drain().iter().map(|e| e.position.x).collect();
        assert_eq!(fed, vec![1.0, 2.0]);
        assert_eq!(bus.events_published(), 2);
    }

    #[test]
    fn test_delivery_is_keyed_by_exact_type() {
        let bus = InMemoryEventBus::new();
        let _jumps = bus.subscribe::<JumpInput>().unwrap();

        let receivers = bus
            .publish(changed(GameState::Playing, GameState::Paused))
            .unwrap();
        assert_eq!(receivers, 0);
    }

    #[test]
    fn test_one_subject_per_type() {
        let bus = InMemoryEventBus::new();
        let _a = bus.subscribe::<JumpInput>().unwrap();
        let _b = bus.subscribe::<JumpInput>().unwrap();
        let _c = bus.subscribe::<StateChanged>().unwrap();

        assert_eq!(bus.subject_count(), 2);
    }

    #[test]
    fn test_subject_survives_last_unsubscribe() {
        let bus = InMemoryEventBus::new();
        {
            let _sub = bus.subscribe::<JumpInput>().unwrap();
        }
        assert_eq!(bus.subscriber_count::<JumpInput>(), 0);
        assert_eq!(bus.subject_count(), 1);
    }

    #[test]
    fn test_publish_after_dispose_fails() {
        let bus = InMemoryEventBus::new();
        bus.dispose();

        assert_eq!(bus.publish(JumpInput), Err(BusError::Disposed));
        assert!(matches!(bus.subscribe::<JumpInput>(), Err(BusError::Disposed)));
        assert!(matches!(
            bus.subscribe_with(|_: &JumpInput| {}),
            Err(BusError::Disposed)
        ));
    }

    #[test]
    fn test_dispose_is_idempotent() {
        let bus = InMemoryEventBus::new();
        let _sub = bus.subscribe::<JumpInput>().unwrap();

        bus.dispose();
        bus.dispose();

        assert!(bus.is_disposed());
        assert_eq!(bus.subject_count(), 0);
    }

    #[test]
    fn test_default_bus() {
        let bus = InMemoryEventBus::default();
        assert_eq!(bus.subject_count(), 0);
        assert_eq!(bus.events_published(), 0);
        assert!(!bus.is_disposed());
    }

    #[test]
    fn test_concurrent_publishers() {
        let bus = Arc::new(InMemoryEventBus::new());
        let count = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&count);
        let _sub = bus
            .subscribe_with(move |_: &JumpInput| {
                counter.fetch_add(1, Ordering::Relaxed);
            })
            .unwrap();

        let threads: Vec<_> = (0..4)
            .map(|_| {
                let bus = Arc::clone(&bus);
                std::thread::spawn(move || {
                    for _ in 0..250 {
                        bus.publish(JumpInput).unwrap();
                    }
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }

        assert_eq!(count.load(Ordering::Relaxed), 1000);
        assert_eq!(bus.events_published(), 1000);
    }

    #[test]
    fn test_concurrent_first_subscribe_shares_one_subject() {
        const THREADS: usize = 8;
        let bus = Arc::new(InMemoryEventBus::new());
        let barrier = Arc::new(Barrier::new(THREADS));

        let threads: Vec<_> = (0..THREADS)
            .map(|_| {
                let bus = Arc::clone(&bus);
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    barrier.wait();
                    bus.subscribe::<JumpInput>().unwrap()
                })
            })
            .collect();
        let mut subs: Vec<_> = threads.into_iter().map(|t| t.join().unwrap()).collect();

        assert_eq!(bus.subject_count(), 1);
        assert_eq!(bus.subscriber_count::<JumpInput>(), THREADS);
        assert_eq!(bus.publish(JumpInput).unwrap(), THREADS);
        for sub in &mut subs {
            assert_eq!(sub.try_recv().unwrap(), Some(JumpInput));
        }
    }

    #[test]
    fn test_cross_publishing_handlers_on_two_threads() {
        let bus = Arc::new(InMemoryEventBus::new());
        let barrier = Arc::new(Barrier::new(2));
        let jumps = Arc::new(AtomicU64::new(0));
        let landings = Arc::new(AtomicU64::new(0));

        // JumpInput -> PlayerJumped and PlayerJumped -> JumpInput, each once
        // per thread-originated event.
        let _on_input = {
            let weak = Arc::downgrade(&bus);
            let barrier = Arc::clone(&barrier);
            let jumps = Arc::clone(&jumps);
            bus.subscribe_with(move |_: &JumpInput| {
                if jumps.fetch_add(1, Ordering::SeqCst) == 0 {
                    barrier.wait();
                    if let Some(bus) = weak.upgrade() {
                        bus.publish(PlayerJumped {
                            position: Vector3::ZERO,
                        })
                        .unwrap();
                    }
                }
            })
            .unwrap()
        };
        let _on_jumped = {
            let weak = Arc::downgrade(&bus);
            let landings = Arc::clone(&landings);
            bus.subscribe_with(move |_: &PlayerJumped| {
                if landings.fetch_add(1, Ordering::SeqCst) == 0 {
                    if let Some(bus) = weak.upgrade() {
                        bus.publish(JumpInput).unwrap();
                    }
                }
            })
            .unwrap()
        };

        let (done_tx, done_rx) = std::sync::mpsc::channel();
        let first = {
            let bus = Arc::clone(&bus);
            let done = done_tx.clone();
            std::thread::spawn(move || {
                bus.publish(JumpInput).unwrap();
                done.send(()).ok();
            })
        };
        let second = {
            let bus = Arc::clone(&bus);
            let barrier = Arc::clone(&barrier);
            std::thread::spawn(move || {
                barrier.wait();
                bus.publish(PlayerJumped {
                    position: Vector3::ZERO,
                })
                .unwrap();
                done_tx.send(()).ok();
            })
        };

        for _ in 0..2 {
            done_rx
                .recv_timeout(Duration::from_secs(5))
                .expect("publishers should not deadlock");
        }
        first.join().unwrap();
        second.join().unwrap();

        assert_eq!(jumps.load(Ordering::SeqCst), 2);
        assert_eq!(landings.load(Ordering::SeqCst), 2);
    }
}
