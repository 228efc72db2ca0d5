//! Fixed-interval scheduling of server pollers
//!
//! Every poller gets its own Tokio task and its own interval. The first poll
//! happens one full interval after scheduling. A cycle always runs to the
//! end before the next tick is taken, and late ticks are delayed rather than
//! bunched, so cycles of one server never overlap.

use crate::poller::ServerPoller;
use crate::types::ServerStats;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

struct ScheduledServer {
    name: String,
    stats: Arc<RwLock<ServerStats>>,
    handle: Option<JoinHandle<()>>,
}

/// Owns one polling task per server
pub struct Scheduler {
    servers: Vec<ScheduledServer>,
    shutdown_tx: broadcast::Sender<()>,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    pub fn new() -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            servers: Vec::new(),
            shutdown_tx,
        }
    }

    /// Start polling a server on its configured interval
    pub fn schedule(&mut self, poller: ServerPoller) {
        let name = poller.server().name.clone();
        let period = poller.server().poll_interval();
        let stats = poller.stats();
        let shutdown_rx = self.shutdown_tx.subscribe();

        info!("Scheduling '{}' every {}s", name, period.as_secs());
        let handle = tokio::spawn(run_schedule(poller, period, shutdown_rx));

        self.servers.push(ScheduledServer {
            name,
            stats,
            handle: Some(handle),
        });
    }

    /// Number of scheduled servers
    pub fn len(&self) -> usize {
        self.servers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }

    /// Copy of every server's counters, keyed by server name
    pub async fn snapshot(&self) -> BTreeMap<String, ServerStats> {
        let mut snapshot = BTreeMap::new();
        for server in &self.servers {
            snapshot.insert(server.name.clone(), server.stats.read().await.clone());
        }
        snapshot
    }

    /// Number of polling tasks still alive
    pub fn running_tasks(&self) -> usize {
        self.servers
            .iter()
            .filter(|server| {
                server
                    .handle
                    .as_ref()
                    .is_some_and(|handle| !handle.is_finished())
            })
            .count()
    }

    /// Stop all polling. Cycles already in flight finish first.
    ///
    /// Counters stay readable through [`Scheduler::snapshot`] afterwards.
    pub async fn shutdown(&mut self) {
        let active = self
            .servers
            .iter()
            .filter(|server| server.handle.is_some())
            .count();
        if active == 0 {
            return;
        }

        info!("Stopping {} server pollers...", active);
        // Nobody subscribed means every task already ended
        let _ = self.shutdown_tx.send(());

        for server in &mut self.servers {
            let Some(handle) = server.handle.take() else {
                continue;
            };
            match handle.await {
                Ok(()) => debug!("Poller for '{}' stopped", server.name),
                Err(e) => warn!("Poller for '{}' ended abnormally: {}", server.name, e),
            }
        }

        info!("All server pollers stopped");
    }
}

async fn run_schedule(
    mut poller: ServerPoller,
    period: Duration,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    let mut interval = interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = shutdown_rx.recv() => break,
            _ = interval.tick() => {
                let outcome = poller.run_once().await;
                debug!(
                    "Poll cycle for '{}' finished: {}",
                    poller.server().name,
                    outcome.label()
                );
            }
        }
    }

    debug!("Schedule for '{}' ended", poller.server().name);
}
