//! The process-wide composition guard.
//!
//! Lives in its own test binary: the guard is process state, and claiming it
//! here must not interfere with tests that compose isolated roots.

use game_runtime::{CompositionError, CompositionRoot, InstallerKind, RuntimeConfig};

#[test]
fn test_second_claim_is_rejected() {
    let config = RuntimeConfig::default();
    let installers = InstallerKind::defaults(&config);

    let root = CompositionRoot::claim(config.clone()).expect("first claim succeeds");
    assert!(CompositionRoot::is_claimed());
    let _app = root.compose(installers).expect("composition succeeds");

    let second = CompositionRoot::claim(config.clone());
    assert!(matches!(second, Err(CompositionError::AlreadyComposed)));

    // Isolated roots are outside the guard.
    assert!(CompositionRoot::isolated(config).compose(Vec::new()).is_ok());
}
