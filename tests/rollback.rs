// ABOUTME: Integration tests for manual rollback.
// ABOUTME: Tests moving the current link back one release at a time.

mod support;

use caravel::release::{DeployErrorKind, rollback};
use support::{A, B, C, Fixture, ScriptedExecutor};

fn fixture_with_three_releases() -> Fixture {
    let fx = Fixture::new();
    for name in [A, B, C] {
        fx.add_release(name);
    }
    fx
}

#[tokio::test]
async fn rollback_walks_back_to_oldest() {
    let fx = fixture_with_three_releases();
    fx.point_current(C);
    let exec = ScriptedExecutor::new("web1");

    let first = rollback(&exec, &fx.layout).await.unwrap();
    assert_eq!(first.host, "web1");
    assert_eq!(first.from.as_str(), C);
    assert_eq!(first.to.as_str(), B);
    assert_eq!(fx.current_target(), Some(fx.releases_root().join(B)));

    let second = rollback(&exec, &fx.layout).await.unwrap();
    assert_eq!(second.to.as_str(), A);
    assert_eq!(fx.current_target(), Some(fx.releases_root().join(A)));

    let err = rollback(&exec, &fx.layout).await.unwrap_err();
    assert_eq!(err.kind(), DeployErrorKind::NoPreviousRelease);
    assert_eq!(fx.current_target(), Some(fx.releases_root().join(A)));
}

#[tokio::test]
async fn rollback_keeps_every_release_directory() {
    let fx = fixture_with_three_releases();
    fx.point_current(C);
    let exec = ScriptedExecutor::new("web1");

    rollback(&exec, &fx.layout).await.unwrap();

    assert_eq!(fx.release_names(), vec![A, B, C]);
}

#[tokio::test]
async fn rollback_without_current_fails() {
    let fx = fixture_with_three_releases();
    let exec = ScriptedExecutor::new("web1");

    let err = rollback(&exec, &fx.layout).await.unwrap_err();

    assert_eq!(err.kind(), DeployErrorKind::NoPreviousRelease);
    assert_eq!(err.host(), Some("web1"));
    assert!(fx.current_target().is_none());
}

#[tokio::test]
async fn rollback_from_unknown_release_fails() {
    let fx = fixture_with_three_releases();
    fx.add_release("hand-made");
    fx.point_current("hand-made");
    let exec = ScriptedExecutor::new("web1");

    let err = rollback(&exec, &fx.layout).await.unwrap_err();

    assert_eq!(err.kind(), DeployErrorKind::NoPreviousRelease);
    assert_eq!(fx.current_target(), Some(fx.releases_root().join("hand-made")));
}
