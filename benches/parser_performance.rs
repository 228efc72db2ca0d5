//! Performance benchmarks for listing parsing and presence tracking

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use player_watch::error::Result;
use player_watch::types::{NotificationProfile, ServerProfile};
use player_watch::{parse_players, Notifier, PlayerQuery, PresenceTracker, ServerPoller};
use std::collections::HashSet;
use std::sync::Arc;

// Query that always returns the same listing
struct BenchQuery {
    reply: String,
}

#[async_trait::async_trait]
impl PlayerQuery for BenchQuery {
    async fn query_players(&self) -> Result<String> {
        Ok(self.reply.clone())
    }

    async fn check(&self) -> Result<()> {
        Ok(())
    }
}

struct BenchNotifier;

#[async_trait::async_trait]
impl Notifier for BenchNotifier {
    async fn send(&self, _destination: &str, _subject: &str, _message: &str) -> Result<()> {
        Ok(())
    }
}

fn listing(players: usize) -> String {
    let mut raw = format!("Online players ({})\n", players);
    for i in 0..players {
        raw.push_str(&format!("player_{} (online)\n", i));
    }
    raw
}

fn bench_parse_players(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_players");
    let ignore: HashSet<String> = (0..10).map(|i| format!("player_{}", i * 7)).collect();

    for players in [10, 100, 1000] {
        let raw = listing(players);
        group.bench_with_input(BenchmarkId::from_parameter(players), &raw, |b, raw| {
            b.iter(|| black_box(parse_players(black_box(raw), &ignore)))
        });
    }
    group.finish();
}

fn bench_tracker_diff(c: &mut Criterion) {
    let names: Vec<String> = (0..500).map(|i| format!("player_{}", i)).collect();

    c.bench_function("tracker_diff_all_known", |b| {
        let mut tracker = PresenceTracker::default();
        tracker.diff_and_commit(&names);
        b.iter(|| black_box(tracker.diff_and_commit(black_box(&names))))
    });

    c.bench_function("tracker_diff_all_new", |b| {
        b.iter(|| {
            let mut tracker = PresenceTracker::default();
            black_box(tracker.diff_and_commit(black_box(&names)))
        })
    });
}

fn bench_poll_cycle(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let server = ServerProfile {
        name: "bench".to_string(),
        address: "127.0.0.1:27015".to_string(),
        password: "secret".to_string(),
        poll_interval_seconds: 30,
        ignore: HashSet::new(),
        timeout_seconds: 5,
        command: "/players o".to_string(),
    };
    let notification = NotificationProfile {
        destination: "1".to_string(),
        prefix: "Now online:".to_string(),
    };

    c.bench_function("poll_cycle_100_players", |b| {
        b.iter(|| {
            rt.block_on(async {
                let mut poller = ServerPoller::new(
                    server.clone(),
                    notification.clone(),
                    Arc::new(BenchQuery {
                        reply: listing(100),
                    }),
                    Arc::new(BenchNotifier),
                );
                black_box(poller.run_once().await)
            })
        })
    });
}

criterion_group!(
    benches,
    bench_parse_players,
    bench_tracker_diff,
    bench_poll_cycle
);
criterion_main!(benches);
