//! Effects controller.
//!
//! Collects presentation requests triggered by gameplay events. Rendering
//! them is up to the host, which drains the queue once per frame.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use shared_bus::{
    BusError, HandlerSubscription, InMemoryEventBus, ObjectMoved, PlayerJumped, StateChanged,
};
use shared_types::{GameState, Vector3};
use tracing::{debug, trace};

/// Pending requests kept before the oldest are dropped.
pub const MAX_PENDING_EFFECTS: usize = 256;

/// A request to play a visual or audio effect.
#[derive(Debug, Clone, PartialEq)]
pub enum EffectRequest {
    JumpDust { position: Vector3 },
    Footstep { object: String, position: Vector3 },
    GameOverFade,
}

pub struct EffectsController {
    pending: Arc<Mutex<VecDeque<EffectRequest>>>,
    _subscriptions: Vec<HandlerSubscription>,
}

impl EffectsController {
    pub fn new(bus: &InMemoryEventBus) -> Result<Self, BusError> {
        let pending = Arc::new(Mutex::new(VecDeque::new()));

        let on_jump = {
            let pending = Arc::clone(&pending);
            bus.subscribe_with(move |event: &PlayerJumped| {
                push(
                    &pending,
                    EffectRequest::JumpDust {
                        position: event.position,
                    },
                );
            })?
        };
        let on_move = {
            let pending = Arc::clone(&pending);
            bus.subscribe_with(move |event: &ObjectMoved| {
                push(
                    &pending,
                    EffectRequest::Footstep {
                        object: event.object.clone(),
                        position: event.position,
                    },
                );
            })?
        };
        let on_state = {
            let pending = Arc::clone(&pending);
            bus.subscribe_with(move |event: &StateChanged| {
                if event.current == GameState::GameOver {
                    push(&pending, EffectRequest::GameOverFade);
                }
            })?
        };

        debug!("Effects controller attached");

        Ok(Self {
            pending,
            _subscriptions: vec![on_jump, on_move, on_state],
        })
    }

    /// Take every pending request, oldest first.
    pub fn drain(&self) -> Vec<EffectRequest> {
        self.pending.lock().drain(..).collect()
    }

    #[must_use]
    pub fn pending(&self) -> usize {
        self.pending.lock().len()
    }
}

fn push(pending: &Mutex<VecDeque<EffectRequest>>, request: EffectRequest) {
    let mut pending = pending.lock();
    if pending.len() == MAX_PENDING_EFFECTS {
        trace!("Effect queue full, dropping oldest");
        pending.pop_front();
    }
    pending.push_back(request);
}
