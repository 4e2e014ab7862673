//! Input adapter.
//!
//! Device polling lives in the host; this adapter turns already-decoded
//! player intent into bus events, and goes quiet while disabled.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use shared_bus::{BusError, EventPublisher, InMemoryEventBus, InteractInput, JumpInput, MoveInput};
use shared_types::Vector3;
use tracing::{debug, trace};

pub struct InputService {
    bus: Arc<InMemoryEventBus>,
    enabled: AtomicBool,
    published: AtomicU64,
}

impl InputService {
    /// Create an enabled input service.
    pub fn new(bus: Arc<InMemoryEventBus>) -> Self {
        Self {
            bus,
            enabled: AtomicBool::new(true),
            published: AtomicU64::new(0),
        }
    }

    pub fn enable(&self) {
        if !self.enabled.swap(true, Ordering::AcqRel) {
            debug!("Input enabled");
        }
    }

    pub fn disable(&self) {
        if self.enabled.swap(false, Ordering::AcqRel) {
            debug!("Input disabled");
        }
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Number of input events published so far.
    #[must_use]
    pub fn published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }

    /// Publish a move intent. The direction is clamped to unit length; a
    /// zero direction is not an intent and publishes nothing.
    ///
    /// Returns `Ok(true)` when an event was published.
    pub fn submit_move(&self, direction: Vector3) -> Result<bool, BusError> {
        if direction == Vector3::ZERO {
            return Ok(false);
        }
        self.emit(MoveInput {
            direction: direction.clamp_length(),
        })
    }

    pub fn submit_jump(&self) -> Result<bool, BusError> {
        self.emit(JumpInput)
    }

    pub fn submit_interact(&self, target: Option<String>) -> Result<bool, BusError> {
        self.emit(InteractInput { target })
    }

    fn emit<E: shared_bus::Event>(&self, event: E) -> Result<bool, BusError> {
        if !self.is_enabled() {
            trace!(event = E::NAME, "Input ignored while disabled");
            return Ok(false);
        }
        self.bus.publish(event)?;
        self.published.fetch_add(1, Ordering::Relaxed);
        Ok(true)
    }
}
