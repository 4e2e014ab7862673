//! # Runtime Integration Tests
//!
//! Drive a fully composed runtime through the public API only: the
//! composition root builds everything, tests talk to it through the bus, the
//! container and the lifecycle.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use game_runtime::adapters::{
    EffectRequest, EffectsController, InputService, MovementController, SceneLoader,
};
use game_runtime::lifecycle::HookError;
use game_runtime::{
    AppContext, CompositionRoot, ContainerError, InstallerKind, LifecycleError, RuntimeConfig,
    TransitionHook,
};
use shared_bus::{
    BusError, EventPublisher, MoveInput, ObjectMoved, PlayerJumped, SceneLoadCompleted,
    SceneLoadProgress, StateChanged,
};
use shared_types::{GameState, SceneId, Vector3};
use tokio::time::timeout;

fn test_config() -> RuntimeConfig {
    let mut config = RuntimeConfig::default();
    config.lifecycle.init_delay = Duration::from_millis(1);
    config.scene.step_delay = Duration::ZERO;
    config
}

fn compose(config: RuntimeConfig) -> AppContext {
    let installers = InstallerKind::defaults(&config);
    CompositionRoot::isolated(config)
        .compose(installers)
        .expect("composition should succeed")
}

fn change(previous: GameState, current: GameState) -> StateChanged {
    StateChanged { previous, current }
}

#[tokio::test]
async fn test_initialize_then_start_scenario() {
    let app = compose(test_config());
    let lifecycle = app.lifecycle();
    let mut changes = lifecycle.subscribe_changes().unwrap();

    lifecycle.initialize().await.unwrap();

    assert_eq!(lifecycle.current_state(), GameState::MainMenu);
    let seen = changes.drain();
    assert_eq!(
        seen,
        vec![
            change(GameState::Uninitialized, GameState::Initializing),
            change(GameState::Initializing, GameState::MainMenu),
        ]
    );

    lifecycle.start().await.unwrap();

    assert_eq!(lifecycle.current_state(), GameState::Playing);
    let started = timeout(Duration::from_millis(100), changes.recv())
        .await
        .expect("should receive within timeout")
        .expect("bus should be open");
    assert_eq!(started, change(GameState::MainMenu, GameState::Playing));
    assert!(changes.try_recv().unwrap().is_none());
}

#[tokio::test]
async fn test_intermediate_notification_can_be_suppressed() {
    let mut config = test_config();
    config.lifecycle.notify_intermediate = false;
    let app = compose(config);
    let mut changes = app.lifecycle().subscribe_changes().unwrap();

    app.lifecycle().initialize().await.unwrap();

    assert_eq!(
        changes.drain(),
        vec![change(GameState::Initializing, GameState::MainMenu)]
    );
}

#[tokio::test]
async fn test_pause_resume_round_trip() {
    let app = compose(test_config());
    let lifecycle = app.lifecycle();
    lifecycle.initialize().await.unwrap();
    lifecycle.start().await.unwrap();
    let mut changes = lifecycle.subscribe_changes().unwrap();

    lifecycle.pause().await.unwrap();
    lifecycle.resume().await.unwrap();

    assert_eq!(lifecycle.current_state(), GameState::Playing);
    assert_eq!(
        changes.drain(),
        vec![
            change(GameState::Playing, GameState::Paused),
            change(GameState::Paused, GameState::Playing),
        ]
    );
}

#[tokio::test]
async fn test_concurrent_start_publishes_once() {
    let app = compose(test_config());
    let lifecycle = Arc::clone(app.lifecycle());
    lifecycle.initialize().await.unwrap();
    let mut changes = lifecycle.subscribe_changes().unwrap();

    let first = tokio::spawn({
        let lifecycle = Arc::clone(&lifecycle);
        async move { lifecycle.start().await }
    });
    let second = tokio::spawn({
        let lifecycle = Arc::clone(&lifecycle);
        async move { lifecycle.start().await }
    });
    let results = [first.await.unwrap(), second.await.unwrap()];

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results.iter().any(|r| matches!(
        r,
        Err(LifecycleError::InvalidTransition {
            from: GameState::Playing,
            to: GameState::Playing,
            ..
        })
    )));
    assert_eq!(
        changes.drain(),
        vec![change(GameState::MainMenu, GameState::Playing)]
    );
}

#[tokio::test]
async fn test_initial_scene_loads_during_initialize() {
    let app = compose(test_config());
    let mut completed = app.bus().subscribe::<SceneLoadCompleted>().unwrap();
    let mut progress = app.bus().subscribe::<SceneLoadProgress>().unwrap();

    app.lifecycle().initialize().await.unwrap();

    let completed = completed.drain();
    assert_eq!(completed.len(), 1);
    assert_eq!(completed[0].scene, SceneId::new("main_menu"));
    assert_eq!(progress.drain().last().map(|p| p.progress), Some(1.0));

    let loader = app.resolve::<SceneLoader>().unwrap();
    assert_eq!(loader.current_scene(), Some(SceneId::new("main_menu")));
}

#[tokio::test]
async fn test_gameplay_reacts_only_while_playing() {
    let app = compose(test_config());
    let input = app.resolve::<InputService>().unwrap();
    let movement = app.resolve::<MovementController>().unwrap();
    let effects = app.resolve::<EffectsController>().unwrap();
    let mut moved = app.bus().subscribe::<ObjectMoved>().unwrap();
    let mut jumped = app.bus().subscribe::<PlayerJumped>().unwrap();

    app.lifecycle().initialize().await.unwrap();
    input.submit_move(Vector3::new(1.0, 0.0, 0.0)).unwrap();
    assert!(moved.drain().is_empty());

    app.lifecycle().start().await.unwrap();
    input.submit_move(Vector3::new(1.0, 0.0, 0.0)).unwrap();
    input.submit_jump().unwrap();

    let moves = moved.drain();
    assert_eq!(moves.len(), 1);
    assert_eq!(moves[0].position, Vector3::new(5.0, 0.0, 0.0));
    assert_eq!(jumped.drain().len(), 1);

    app.lifecycle().pause().await.unwrap();
    input.submit_move(Vector3::new(1.0, 0.0, 0.0)).unwrap();
    assert!(moved.drain().is_empty());
    assert_eq!(movement.position(), Vector3::new(5.0, 0.0, 0.0));

    app.lifecycle().resume().await.unwrap();
    app.lifecycle().game_over().await.unwrap();

    let requests = effects.drain();
    assert!(matches!(requests[0], EffectRequest::Footstep { .. }));
    assert!(matches!(requests[1], EffectRequest::JumpDust { .. }));
    assert_eq!(requests.last(), Some(&EffectRequest::GameOverFade));
}

#[tokio::test]
async fn test_disabled_input_emits_nothing() {
    let app = compose(test_config());
    let input = app.resolve::<InputService>().unwrap();
    let mut moves = app.bus().subscribe::<MoveInput>().unwrap();

    input.disable();
    assert!(!input.submit_move(Vector3::new(0.0, 1.0, 0.0)).unwrap());
    assert!(moves.try_recv().unwrap().is_none());
}

#[tokio::test]
async fn test_container_identity_and_missing_service() {
    struct NeverRegistered;

    let app = compose(test_config());

    let first = app.resolve::<InputService>().unwrap();
    let second = app.resolve::<InputService>().unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    assert!(matches!(
        app.resolve::<NeverRegistered>(),
        Err(ContainerError::NotFound { .. })
    ));
}

#[tokio::test]
async fn test_unsubscribe_leaves_other_subscribers() {
    let app = compose(test_config());
    let bus = app.bus();
    let mut first = bus.subscribe::<PlayerJumped>().unwrap();
    let mut second = bus.subscribe::<PlayerJumped>().unwrap();

    assert!(first.unsubscribe());
    let delivered = bus
        .publish(PlayerJumped {
            position: Vector3::ZERO,
        })
        .unwrap();

    // Second feed plus the effects controller's handler.
    assert_eq!(delivered, 2);
    assert!(first.try_recv().is_err());
    assert_eq!(second.drain().len(), 1);
}

struct FlakyHook {
    failures_left: AtomicUsize,
}

#[async_trait]
impl TransitionHook for FlakyHook {
    fn name(&self) -> &'static str {
        "flaky"
    }

    async fn before_enter(&self, _from: GameState, to: GameState) -> Result<(), HookError> {
        if to != GameState::MainMenu {
            return Ok(());
        }
        let left = self.failures_left.load(Ordering::SeqCst);
        if left > 0 {
            self.failures_left.store(left - 1, Ordering::SeqCst);
            return Err(HookError::new("assets not ready"));
        }
        Ok(())
    }
}

#[tokio::test]
async fn test_failed_initialization_can_be_retried() {
    let app = compose(test_config());
    let lifecycle = app.lifecycle();
    lifecycle.add_hook(Arc::new(FlakyHook {
        failures_left: AtomicUsize::new(1),
    }));
    let mut changes = lifecycle.subscribe_changes().unwrap();

    let err = lifecycle.initialize().await.unwrap_err();
    assert!(matches!(err, LifecycleError::Hook { hook: "flaky", .. }));
    assert_eq!(lifecycle.current_state(), GameState::Initializing);

    lifecycle.initialize().await.unwrap();
    assert_eq!(lifecycle.current_state(), GameState::MainMenu);
    assert_eq!(
        changes.drain(),
        vec![
            change(GameState::Uninitialized, GameState::Initializing),
            change(GameState::Initializing, GameState::MainMenu),
        ]
    );
}

#[tokio::test]
async fn test_shutdown_closes_everything() {
    let app = compose(test_config());
    let mut changes = app.lifecycle().subscribe_changes().unwrap();
    app.lifecycle().initialize().await.unwrap();

    app.shutdown().await;

    assert_eq!(
        app.bus().publish(change(GameState::MainMenu, GameState::Playing)),
        Err(BusError::Disposed)
    );
    assert!(matches!(
        app.bus().subscribe::<StateChanged>(),
        Err(BusError::Disposed)
    ));
    assert_eq!(
        app.lifecycle().start().await,
        Err(LifecycleError::ShutDown)
    );
    // Shutdown changes nothing and announces nothing.
    assert_eq!(app.lifecycle().current_state(), GameState::MainMenu);
    assert_eq!(changes.drain().len(), 2);
    assert!(changes.recv().await.is_none());
}
