//! Instance lifetimes and failure containment.

use beard::{Config, Registry};
use std::{collections::HashMap, sync::atomic::Ordering, time::Duration};
use tokio::time::advance;

mod common;
use common::{FRAGILE_ERRORS, Foo, Fragile, Lingering, harness, harness_with, text};

fn foo_and_lingering() -> Registry {
    let mut registry = Registry::new();
    registry.register_beard::<Foo>().unwrap();
    registry.register_beard::<Lingering>().unwrap();
    registry
}

#[tokio::test(start_paused = true)]
async fn idle_instances_are_torn_down_and_recreated() {
    let h = harness(foo_and_lingering());

    h.delegator.handle_message(&text(1, "/foo")).await;
    assert_eq!(h.delegator.live_instances(), 2);

    advance(Duration::from_secs(9)).await;
    assert_eq!(h.delegator.reap_idle(), 0);

    // Activity pushes the deadline forward.
    h.delegator.handle_message(&text(1, "hello")).await;
    advance(Duration::from_secs(9)).await;
    assert_eq!(h.delegator.reap_idle(), 0);

    advance(Duration::from_secs(2)).await;
    assert_eq!(h.delegator.reap_idle(), 1);
    assert!(!h.delegator.is_live("Foo", 1));
    assert!(h.delegator.is_live("Lingering", 1));

    advance(Duration::from_secs(20)).await;
    assert_eq!(h.delegator.reap_idle(), 1);
    assert_eq!(h.delegator.live_instances(), 0);

    // The next event brings both back.
    h.delegator.handle_message(&text(1, "/foo")).await;
    assert_eq!(h.delegator.live_instances(), 2);
    assert_eq!(h.transport.sent_to(1), vec!["foo!", "foo!"]);
}

#[tokio::test(start_paused = true)]
async fn configured_timeouts_win_over_declared_ones() {
    let config = Config {
        timeouts: HashMap::from([("Lingering".to_owned(), 2), ("Foo".to_owned(), 60)]),
        ..Config::default()
    };
    let h = harness_with(foo_and_lingering(), config);

    h.delegator.handle_message(&text(5, "hi")).await;
    advance(Duration::from_secs(3)).await;
    assert_eq!(h.delegator.reap_idle(), 1);
    assert!(h.delegator.is_live("Foo", 5));
    assert!(!h.delegator.is_live("Lingering", 5));
}

#[tokio::test(start_paused = true)]
async fn reaper_runs_until_the_delegator_is_dropped() {
    let mut registry = Registry::new();
    registry.register_beard::<Foo>().unwrap();
    let h = harness(registry);
    let reaper = h.delegator.spawn_reaper();

    h.delegator.handle_message(&text(1, "/foo")).await;
    h.delegator.handle_message(&text(2, "/foo")).await;
    assert_eq!(h.delegator.live_instances(), 2);

    tokio::time::sleep(Duration::from_secs(12)).await;
    assert_eq!(h.delegator.live_instances(), 0);

    drop(h.delegator);
    tokio::time::timeout(Duration::from_secs(5), reaper)
        .await
        .expect("reaper should stop")
        .unwrap();
}

#[tokio::test]
async fn failures_are_contained() {
    let mut registry = Registry::new();
    registry.register_beard::<Fragile>().unwrap();
    registry.register_beard::<Foo>().unwrap();
    let h = harness(registry.clone());

    let report = h.delegator.handle_message(&text(1, "/boom")).await;
    assert_eq!(report.failed, 1);
    assert_eq!(report.delivered, 1);
    assert_eq!(h.transport.sent_to(1), vec!["Sorry, something went wrong"]);
    assert_eq!(FRAGILE_ERRORS.load(Ordering::SeqCst), 1);

    // Other chats and other beards are unaffected.
    let report = h.delegator.handle_message(&text(2, "/ok")).await;
    assert_eq!(report.failed, 0);
    assert_eq!(h.transport.sent_to(2), vec!["fine"]);
    h.delegator.handle_message(&text(1, "/foo")).await;

    // The failed instance stays live and keeps working.
    assert!(h.delegator.is_live("Fragile", 1));
    h.delegator.handle_message(&text(1, "/ok")).await;
    assert_eq!(
        h.transport.sent_to(1),
        vec!["Sorry, something went wrong", "foo!", "fine"]
    );

    // Configured apology, with the failure forwarded to the chat.
    let config = Config {
        apology: "Oops, that broke".to_owned(),
        forward_logs: true,
        ..Config::default()
    };
    let h = harness_with(registry, config);
    let report = h.delegator.handle_message(&text(3, "/boom")).await;
    assert_eq!(report.failed, 1);

    let sent = h.transport.sent_to(3);
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0], "Oops, that broke");
    assert!(sent[1].contains("kaboom"), "forwarded: {}", sent[1]);
    assert_eq!(FRAGILE_ERRORS.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn failed_apology_is_still_contained() {
    let mut registry = Registry::new();
    registry.register_beard::<Foo>().unwrap();
    let h = harness(registry);

    h.transport.set_fail_sends(true);
    let report = h.delegator.handle_message(&text(1, "/foo")).await;
    assert_eq!(report.failed, 1);
    assert!(h.transport.sent().is_empty());

    h.transport.set_fail_sends(false);
    let report = h.delegator.handle_message(&text(1, "/foo")).await;
    assert_eq!(report.handled, 1);
    assert_eq!(h.transport.sent_to(1), vec!["foo!"]);
}
