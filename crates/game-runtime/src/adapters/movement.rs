//! Movement controller.
//!
//! Turns input events into gameplay events, but only while the lifecycle is
//! `Playing`. It learns the current state purely from `StateChanged`
//! notifications and never calls into the state machine.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use shared_bus::{
    BusError, EventPublisher, HandlerSubscription, InMemoryEventBus, JumpInput, MoveInput,
    ObjectMoved, PlayerJumped, StateChanged,
};
use shared_types::{GameState, Vector3};
use tracing::{debug, trace, warn};

use crate::container::MovementConfig;

#[derive(Debug)]
struct MovementState {
    game_state: GameState,
    position: Vector3,
    moves: u64,
    jumps: u64,
}

pub struct MovementController {
    state: Arc<Mutex<MovementState>>,
    _subscriptions: Vec<HandlerSubscription>,
}

impl MovementController {
    /// Attach to `bus`, assuming the lifecycle is currently in `initial`.
    pub fn new(
        bus: &Arc<InMemoryEventBus>,
        config: MovementConfig,
        initial: GameState,
    ) -> Result<Self, BusError> {
        let state = Arc::new(Mutex::new(MovementState {
            game_state: initial,
            position: Vector3::ZERO,
            moves: 0,
            jumps: 0,
        }));
        // Handlers live inside the bus; a strong bus reference here would
        // keep the bus alive through its own subjects.
        let weak_bus = Arc::downgrade(bus);

        let on_state = {
            let state = Arc::clone(&state);
            bus.subscribe_with(move |event: &StateChanged| {
                state.lock().game_state = event.current;
            })?
        };

        let on_move = {
            let state = Arc::clone(&state);
            let weak = Weak::clone(&weak_bus);
            let speed = config.speed;
            let object = config.object_name.clone();
            bus.subscribe_with(move |event: &MoveInput| {
                let moved = {
                    let mut s = state.lock();
                    if s.game_state != GameState::Playing {
                        trace!(state = %s.game_state, "Move ignored outside play");
                        return;
                    }
                    let delta = event.direction.scale(speed);
                    s.position = s.position + delta;
                    s.moves += 1;
                    ObjectMoved {
                        object: object.clone(),
                        position: s.position,
                        delta,
                    }
                };
                publish(&weak, moved);
            })?
        };

        let on_jump = {
            let state = Arc::clone(&state);
            let weak = Weak::clone(&weak_bus);
            bus.subscribe_with(move |_: &JumpInput| {
                let jumped = {
                    let mut s = state.lock();
                    if s.game_state != GameState::Playing {
                        trace!(state = %s.game_state, "Jump ignored outside play");
                        return;
                    }
                    s.jumps += 1;
                    PlayerJumped {
                        position: s.position,
                    }
                };
                publish(&weak, jumped);
            })?
        };

        debug!(
            speed = config.speed,
            object = %config.object_name,
            %initial,
            "Movement controller attached"
        );

        Ok(Self {
            state,
            _subscriptions: vec![on_state, on_move, on_jump],
        })
    }

    #[must_use]
    pub fn position(&self) -> Vector3 {
        self.state.lock().position
    }

    /// Last lifecycle state seen on the bus.
    #[must_use]
    pub fn game_state(&self) -> GameState {
        self.state.lock().game_state
    }

    /// Number of moves applied.
    #[must_use]
    pub fn moves(&self) -> u64 {
        self.state.lock().moves
    }

    #[must_use]
    pub fn jumps(&self) -> u64 {
        self.state.lock().jumps
    }
}

fn publish<E: shared_bus::Event>(bus: &Weak<InMemoryEventBus>, event: E) {
    let Some(bus) = bus.upgrade() else {
        return;
    };
    if let Err(e) = bus.publish(event) {
        warn!(event = E::NAME, error = %e, "Dropped gameplay event");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller(initial: GameState) -> (Arc<InMemoryEventBus>, MovementController) {
        let bus = Arc::new(InMemoryEventBus::new());
        let config = MovementConfig {
            speed: 2.0,
            object_name: "hero".to_string(),
        };
        let controller = MovementController::new(&bus, config, initial).unwrap();
        (bus, controller)
    }

    #[test]
    fn test_moves_only_while_playing() {
        let (bus, controller) = controller(GameState::MainMenu);
        let mut moved = bus.subscribe::<ObjectMoved>().unwrap();

        bus.publish(MoveInput {
            direction: Vector3::new(1.0, 0.0, 0.0),
        })
        .unwrap();
        assert!(moved.try_recv().unwrap().is_none());
        assert_eq!(controller.position(), Vector3::ZERO);

        bus.publish(StateChanged {
            previous: GameState::MainMenu,
            current: GameState::Playing,
        })
        .unwrap();
        bus.publish(MoveInput {
            direction: Vector3::new(1.0, 0.0, 0.0),
        })
        .unwrap();

        let event = moved.try_recv().unwrap().unwrap();
        assert_eq!(event.object, "hero");
        assert_eq!(event.delta, Vector3::new(2.0, 0.0, 0.0));
        assert_eq!(event.position, Vector3::new(2.0, 0.0, 0.0));
        assert_eq!(controller.moves(), 1);
    }

    #[test]
    fn test_pause_stops_movement() {
        let (bus, controller) = controller(GameState::Playing);
        let mut jumps = bus.subscribe::<PlayerJumped>().unwrap();

        bus.publish(JumpInput).unwrap();
        bus.publish(StateChanged {
            previous: GameState::Playing,
            current: GameState::Paused,
        })
        .unwrap();
        bus.publish(JumpInput).unwrap();

        assert_eq!(jumps.drain().len(), 1);
        assert_eq!(controller.jumps(), 1);
        assert_eq!(controller.game_state(), GameState::Paused);
    }

    #[test]
    fn test_positions_accumulate() {
        let (bus, controller) = controller(GameState::Playing);

        for _ in 0..3 {
            bus.publish(MoveInput {
                direction: Vector3::new(0.0, 0.0, 1.0),
            })
            .unwrap();
        }

        assert_eq!(controller.position(), Vector3::new(0.0, 0.0, 6.0));
    }

    #[test]
    fn test_drop_detaches_handlers() {
        let (bus, controller) = controller(GameState::Playing);
        assert_eq!(bus.subscriber_count::<MoveInput>(), 1);

        drop(controller);

        assert_eq!(bus.subscriber_count::<MoveInput>(), 0);
        assert_eq!(bus.subscriber_count::<StateChanged>(), 0);
    }

    #[test]
    fn test_attach_to_disposed_bus_fails() {
        let bus = Arc::new(InMemoryEventBus::new());
        bus.dispose();
        let result = MovementController::new(&bus, MovementConfig::default(), GameState::Playing);
        assert!(matches!(result, Err(BusError::Disposed)));
    }
}
