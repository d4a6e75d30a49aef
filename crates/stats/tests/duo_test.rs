//! Co-presence ("duo time") end-to-end over a seeded store.

use pretty_assertions::assert_eq;
use voicetime_core::{BruteForce, UserId};
use voicetime_stats::{StatsConfig, StatsEngine};

use stats_shared::{engine, record, store, MONDAY};

#[tokio::test]
async fn same_channel_overlap_is_counted() {
    let (engine, store) = engine().await;

    // Alice 10:00-10:30, Bob 10:15-10:45, same channel.
    store
        .commit_session(&record(1, "alice", 1, MONDAY + 36_000, MONDAY + 37_800))
        .await
        .unwrap();
    store
        .commit_session(&record(2, "bob", 1, MONDAY + 36_900, MONDAY + 38_700))
        .await
        .unwrap();

    assert_eq!(engine.duo_time(UserId(1), UserId(2)).await.unwrap(), 900);
}

#[tokio::test]
async fn different_channels_never_count() {
    let (engine, store) = engine().await;

    store
        .commit_session(&record(1, "alice", 1, MONDAY + 36_000, MONDAY + 37_800))
        .await
        .unwrap();
    store
        .commit_session(&record(2, "bob", 2, MONDAY + 36_900, MONDAY + 38_700))
        .await
        .unwrap();

    assert_eq!(engine.duo_time(UserId(1), UserId(2)).await.unwrap(), 0);
}

#[tokio::test]
async fn touching_intervals_share_no_second() {
    let (engine, store) = engine().await;

    store
        .commit_session(&record(1, "alice", 1, 0, 100))
        .await
        .unwrap();
    store
        .commit_session(&record(2, "bob", 1, 100, 200))
        .await
        .unwrap();

    assert_eq!(engine.duo_time(UserId(1), UserId(2)).await.unwrap(), 0);
}

#[tokio::test]
async fn duo_time_is_symmetric() {
    let (engine, store) = engine().await;

    for (user, name, channel, start, end) in [
        (1, "alice", 1, 0, 500),
        (1, "alice", 2, 600, 900),
        (2, "bob", 1, 250, 700),
        (2, "bob", 2, 650, 800),
        (1, "alice", 1, 1_000, 1_100),
    ] {
        store
            .commit_session(&record(user, name, channel, start, end))
            .await
            .unwrap();
    }

    let ab = engine.duo_time(UserId(1), UserId(2)).await.unwrap();
    let ba = engine.duo_time(UserId(2), UserId(1)).await.unwrap();
    assert_eq!(ab, ba);
    // ch1: [0,500] x [250,700] = 250; ch2: [600,900] x [650,800] = 150.
    assert_eq!(ab, 400);
}

#[tokio::test]
async fn strategies_agree_on_the_same_history() {
    let store = store().await;

    for (user, name, channel, start, end) in [
        (1, "alice", 1, 0, 300),
        (1, "alice", 1, 300, 600),
        (2, "bob", 1, 150, 450),
        (2, "bob", 3, 500, 900),
        (1, "alice", 3, 550, 700),
        (2, "bob", 1, 0, 50),
    ] {
        store
            .commit_session(&record(user, name, channel, start, end))
            .await
            .unwrap();
    }

    let indexed = StatsEngine::new(store.clone());
    let brute = StatsEngine::with_strategy(
        store.clone(),
        StatsConfig::default(),
        Box::new(BruteForce),
    );

    assert_eq!(
        indexed.duo_time(UserId(1), UserId(2)).await.unwrap(),
        brute.duo_time(UserId(1), UserId(2)).await.unwrap(),
    );
}

#[tokio::test]
async fn users_with_no_shared_history_score_zero() {
    let (engine, store) = engine().await;
    store
        .commit_session(&record(1, "alice", 1, 0, 1_000))
        .await
        .unwrap();

    assert_eq!(engine.duo_time(UserId(1), UserId(2)).await.unwrap(), 0);
    assert_eq!(engine.duo_time(UserId(3), UserId(4)).await.unwrap(), 0);
}
