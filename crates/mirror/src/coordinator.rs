//! # Refresh Coordinator
//!
//! Every trigger (startup, timer, webhook) refreshes the version state on its
//! own task as soon as it is submitted, so a new tag becomes visible without
//! waiting for earlier downloads. Cache syncs go to one long-lived worker over
//! a channel.
//!
//! Sync jobs that queue up while a sync is in progress are coalesced into a
//! single follow-up run against the newest descriptor, so overlapping triggers
//! never produce concurrent syncs.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::cache::{CacheStore, SyncReport};
use crate::state::VersionState;

/// What caused a refresh
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshTrigger {
    Startup,
    Timer,
    Notification { tag: String },
}

impl fmt::Display for RefreshTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefreshTrigger::Startup => f.write_str("startup"),
            RefreshTrigger::Timer => f.write_str("timer"),
            RefreshTrigger::Notification { tag } => write!(f, "notification({tag})"),
        }
    }
}

/// Result of one refresh-then-sync run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    Synced(SyncReport),
    FetchFailed(String),
}

struct SyncJob {
    trigger: RefreshTrigger,
    done: oneshot::Sender<RefreshOutcome>,
}

/// Awaitable completion of a submitted refresh. Dropping it is fire-and-forget.
#[derive(Debug)]
pub struct RefreshTicket {
    rx: oneshot::Receiver<RefreshOutcome>,
}

impl RefreshTicket {
    /// Wait for the sync that served this submission. `None` if the worker is gone.
    pub async fn wait(self) -> Option<RefreshOutcome> {
        self.rx.await.ok()
    }
}

/// Cheap, cloneable submission handle.
#[derive(Debug, Clone)]
pub struct RefreshCoordinator {
    state: Arc<VersionState>,
    tx: mpsc::UnboundedSender<SyncJob>,
}

impl RefreshCoordinator {
    /// Create a coordinator and the sync worker it feeds. The worker must be
    /// run (see [`RefreshWorker::run`]) for submissions to complete.
    pub fn new(
        state: Arc<VersionState>,
        store: Arc<CacheStore>,
        auth_token: Option<String>,
    ) -> (Self, RefreshWorker) {
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = RefreshWorker {
            state: state.clone(),
            store,
            auth_token: auth_token.filter(|t| !t.is_empty()),
            rx,
        };
        (Self { state, tx }, worker)
    }

    /// Create a coordinator and spawn its worker on the current runtime.
    pub fn spawn(
        state: Arc<VersionState>,
        store: Arc<CacheStore>,
        auth_token: Option<String>,
    ) -> (Self, JoinHandle<()>) {
        let (coordinator, worker) = Self::new(state, store, auth_token);
        (coordinator, tokio::spawn(worker.run()))
    }

    /// Start a metadata refresh now and queue the follow-up sync; returns
    /// without waiting for either.
    pub fn submit(&self, trigger: RefreshTrigger) -> RefreshTicket {
        let (done, rx) = oneshot::channel();
        if self.tx.is_closed() {
            warn!(trigger = %trigger, "Refresh worker is not running, dropping refresh request");
            return RefreshTicket { rx };
        }

        debug!(trigger = %trigger, "Refresh submitted");
        let state = self.state.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            match state.refresh().await {
                Ok(_) => {
                    if tx.send(SyncJob { trigger, done }).is_err() {
                        warn!("Refresh worker stopped, skipping sync");
                    }
                }
                // already logged by the version state
                Err(e) => {
                    let _ = done.send(RefreshOutcome::FetchFailed(e.to_string()));
                }
            }
        });
        RefreshTicket { rx }
    }

    /// Submit and forget.
    pub fn trigger(&self, trigger: RefreshTrigger) {
        drop(self.submit(trigger));
    }

    /// Submit a [`RefreshTrigger::Timer`] refresh every `period` for the
    /// lifetime of the worker. The immediate first tick is skipped since the
    /// startup refresh covers it.
    pub fn spawn_interval(&self, period: Duration) -> JoinHandle<()> {
        let coordinator = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval.tick().await;

            loop {
                interval.tick().await;
                if coordinator.tx.is_closed() {
                    debug!("Refresh worker gone, stopping timer");
                    break;
                }
                coordinator.trigger(RefreshTrigger::Timer);
            }
        })
    }
}

pub struct RefreshWorker {
    state: Arc<VersionState>,
    store: Arc<CacheStore>,
    auth_token: Option<String>,
    rx: mpsc::UnboundedReceiver<SyncJob>,
}

impl RefreshWorker {
    /// Serve sync jobs until every coordinator handle is dropped.
    pub async fn run(mut self) {
        info!("Refresh worker started");

        while let Some(first) = self.rx.recv().await {
            let mut batch = vec![first];
            while let Ok(job) = self.rx.try_recv() {
                batch.push(job);
            }

            if batch.len() > 1 {
                debug!(coalesced = batch.len(), "Coalescing queued sync requests");
            }
            let triggers = batch
                .iter()
                .map(|job| job.trigger.to_string())
                .collect::<Vec<_>>()
                .join(",");

            let outcome = self.sync_current(&triggers).await;
            for job in batch {
                let _ = job.done.send(outcome.clone());
            }
        }

        info!("Refresh worker stopped");
    }

    async fn sync_current(&self, triggers: &str) -> RefreshOutcome {
        // jobs are only queued after a successful refresh
        let Some(release) = self.state.current() else {
            return RefreshOutcome::FetchFailed("no release available".to_owned());
        };
        info!(triggers = %triggers, tag = %release.tag, "Syncing release");
        let report = self
            .store
            .sync_all(&release, self.auth_token.as_deref())
            .await;
        RefreshOutcome::Synced(report)
    }
}
