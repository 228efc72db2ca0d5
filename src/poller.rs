//! Per-server poll cycle
//!
//! A [`ServerPoller`] owns the presence state of exactly one server and runs
//! query -> parse -> diff -> notify for it. Failures of the remote query or
//! of the notifier end the cycle but never the process.

use crate::metrics::MetricsCollector;
use crate::notify::Notifier;
use crate::presence::{parse_players, PresenceTracker};
use crate::rcon::PlayerQuery;
use crate::types::{NotificationProfile, PollOutcome, ServerProfile, ServerStats};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

/// Drives the poll cycle for one server
pub struct ServerPoller {
    server: ServerProfile,
    notification: NotificationProfile,
    query: Arc<dyn PlayerQuery>,
    notifier: Arc<dyn Notifier>,
    tracker: PresenceTracker,
    stats: Arc<RwLock<ServerStats>>,
    metrics: Option<Arc<MetricsCollector>>,
}

impl ServerPoller {
    pub fn new(
        server: ServerProfile,
        notification: NotificationProfile,
        query: Arc<dyn PlayerQuery>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            server,
            notification,
            query,
            notifier,
            tracker: PresenceTracker::new(),
            stats: Arc::new(RwLock::new(ServerStats::default())),
            metrics: None,
        }
    }

    /// Create a poller that also reports to Prometheus
    pub fn with_metrics(
        server: ServerProfile,
        notification: NotificationProfile,
        query: Arc<dyn PlayerQuery>,
        notifier: Arc<dyn Notifier>,
        metrics: Arc<MetricsCollector>,
    ) -> Self {
        let mut poller = Self::new(server, notification, query, notifier);
        poller.metrics = Some(metrics);
        poller
    }

    pub fn server(&self) -> &ServerProfile {
        &self.server
    }

    pub fn tracker(&self) -> &PresenceTracker {
        &self.tracker
    }

    /// Shared handle to this server's counters
    pub fn stats(&self) -> Arc<RwLock<ServerStats>> {
        self.stats.clone()
    }

    /// Run one full poll cycle
    pub async fn run_once(&mut self) -> PollOutcome {
        let start_time = Instant::now();
        debug!("Checking for new players on '{}'", self.server.name);

        let outcome = self.poll().await;

        self.stats
            .write()
            .await
            .record(&outcome, self.tracker.len());

        if let Some(metrics) = &self.metrics {
            metrics.record_poll(
                &self.server.name,
                &outcome,
                self.tracker.len(),
                start_time.elapsed(),
            );
        }

        outcome
    }

    async fn poll(&mut self) -> PollOutcome {
        let raw = match self.query.query_players().await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(
                    "Player query for '{}' ({}) failed, skipping this cycle: {:#}",
                    self.server.name, self.server.address, e
                );
                return PollOutcome::QueryFailed {
                    reason: format!("{:#}", e),
                };
            }
        };

        let online = parse_players(&raw, &self.server.ignore);
        let new_players = self.tracker.diff_and_commit(&online);

        if new_players.is_empty() {
            debug!(
                "'{}' reports {} players online, none new",
                self.server.name,
                online.len()
            );
            return PollOutcome::NoNewPlayers {
                online: online.len(),
            };
        }

        info!(
            "New players on '{}': {}",
            self.server.name,
            new_players.join(", ")
        );

        let message = self.notification.format_message(&new_players);
        match self
            .notifier
            .send(&self.notification.destination, &self.server.name, &message)
            .await
        {
            Ok(()) => PollOutcome::Notified { new_players },
            Err(e) => {
                error!(
                    "Failed to announce new players on '{}': {:#}",
                    self.server.name, e
                );
                PollOutcome::NotifyFailed {
                    new_players,
                    reason: format!("{:#}", e),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::notify::MockNotifier;
    use async_trait::async_trait;
    use mockall::predicate::eq;
    use std::collections::{HashSet, VecDeque};
    use std::sync::Mutex;

    /// Replays scripted query replies; `None` is a failed query
    struct ScriptedQuery {
        replies: Mutex<VecDeque<Option<String>>>,
    }

    impl ScriptedQuery {
        fn new(replies: Vec<Option<&str>>) -> Self {
            Self {
                replies: Mutex::new(
                    replies
                        .into_iter()
                        .map(|r| r.map(str::to_string))
                        .collect(),
                ),
            }
        }
    }

    #[async_trait]
    impl PlayerQuery for ScriptedQuery {
        async fn query_players(&self) -> Result<String> {
            match self.replies.lock().unwrap().pop_front().flatten() {
                Some(raw) => Ok(raw),
                None => Err(anyhow::anyhow!("connection refused")),
            }
        }

        async fn check(&self) -> Result<()> {
            Ok(())
        }
    }

    fn server(ignore: &[&str]) -> ServerProfile {
        ServerProfile {
            name: "factorio".to_string(),
            address: "127.0.0.1:27015".to_string(),
            password: "pw".to_string(),
            poll_interval_seconds: 30,
            ignore: ignore.iter().map(|s| s.to_string()).collect::<HashSet<_>>(),
            timeout_seconds: 5,
            command: "/players o".to_string(),
        }
    }

    fn notification() -> NotificationProfile {
        NotificationProfile {
            destination: "-100".to_string(),
            prefix: "Now online:".to_string(),
        }
    }

    #[tokio::test]
    async fn test_new_players_are_announced_once() {
        let query = Arc::new(ScriptedQuery::new(vec![
            Some("Online players (2)\nAlice (online)\nBob (online)\n"),
            Some("Online players (2)\nAlice (online)\nBob (online)\n"),
        ]));
        let mut notifier = MockNotifier::new();
        notifier
            .expect_send()
            .with(eq("-100"), eq("factorio"), eq("Now online: Alice, Bob"))
            .times(1)
            .returning(|_, _, _| Ok(()));

        let mut poller = ServerPoller::new(server(&[]), notification(), query, Arc::new(notifier));

        assert_eq!(
            poller.run_once().await,
            PollOutcome::Notified {
                new_players: vec!["Alice".to_string(), "Bob".to_string()]
            }
        );
        assert_eq!(
            poller.run_once().await,
            PollOutcome::NoNewPlayers { online: 2 }
        );
        assert_eq!(poller.stats().read().await.polls, 2);
    }

    #[tokio::test]
    async fn test_failed_query_leaves_state_untouched() {
        let query = Arc::new(ScriptedQuery::new(vec![
            Some("Online players\nAlice (online)"),
            None,
        ]));
        let mut notifier = MockNotifier::new();
        notifier.expect_send().times(1).returning(|_, _, _| Ok(()));

        let mut poller = ServerPoller::new(server(&[]), notification(), query, Arc::new(notifier));
        poller.run_once().await;
        let before = poller.tracker().clone();

        let outcome = poller.run_once().await;
        assert!(matches!(outcome, PollOutcome::QueryFailed { .. }));
        assert_eq!(poller.tracker(), &before);
        assert!(poller.tracker().contains("Alice"));

        let stats = poller.stats().read().await.clone();
        assert_eq!(stats.query_failures, 1);
        assert_eq!(stats.last_outcome.as_deref(), Some("query_failed"));
    }

    #[tokio::test]
    async fn test_notify_failure_is_not_fatal() {
        let query = Arc::new(ScriptedQuery::new(vec![
            Some("Online players\nAlice (online)"),
            Some("Online players\nAlice (online)\nCarol (online)"),
        ]));
        let mut notifier = MockNotifier::new();
        let mut seq = mockall::Sequence::new();
        notifier
            .expect_send()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _| Err(anyhow::anyhow!("chat unreachable")));
        notifier
            .expect_send()
            .with(eq("-100"), eq("factorio"), eq("Now online: Carol"))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _| Ok(()));

        let mut poller = ServerPoller::new(server(&[]), notification(), query, Arc::new(notifier));

        let first = poller.run_once().await;
        assert!(matches!(first, PollOutcome::NotifyFailed { .. }));
        assert_eq!(first.new_players(), ["Alice".to_string()]);

        let second = poller.run_once().await;
        assert_eq!(
            second,
            PollOutcome::Notified {
                new_players: vec!["Carol".to_string()]
            }
        );
    }

    #[tokio::test]
    async fn test_ignored_and_absent_players_send_nothing() {
        let query = Arc::new(ScriptedQuery::new(vec![
            Some("Online players\nAFK-bot (online)"),
            Some("Unknown command"),
        ]));
        let mut notifier = MockNotifier::new();
        notifier.expect_send().times(0);

        let mut poller = ServerPoller::new(
            server(&["AFK-bot"]),
            notification(),
            query,
            Arc::new(notifier),
        );

        assert_eq!(
            poller.run_once().await,
            PollOutcome::NoNewPlayers { online: 0 }
        );
        assert_eq!(
            poller.run_once().await,
            PollOutcome::NoNewPlayers { online: 0 }
        );
        assert!(poller.tracker().is_empty());
    }

    #[tokio::test]
    async fn test_metrics_are_recorded() {
        let metrics = Arc::new(MetricsCollector::new().unwrap());
        let query = Arc::new(ScriptedQuery::new(vec![Some("Online players\nAlice (online)")]));
        let mut notifier = MockNotifier::new();
        notifier.expect_send().returning(|_, _, _| Ok(()));

        let mut poller = ServerPoller::with_metrics(
            server(&[]),
            notification(),
            query,
            Arc::new(notifier),
            metrics.clone(),
        );
        poller.run_once().await;

        let polls = metrics
            .poll()
            .polls_total
            .with_label_values(&["factorio", "notified"])
            .get();
        assert_eq!(polls, 1);
        assert_eq!(
            metrics
                .poll()
                .known_players
                .with_label_values(&["factorio"])
                .get(),
            1
        );
    }
}
