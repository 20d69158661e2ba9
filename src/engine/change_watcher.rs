use tokio::time::{Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::reasoning::{ReasoningOrchestrator, RefreshOutcome};
use crate::scoring::ChangeFingerprinter;
use crate::sensing::TabTracker;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchOutcome {
    Unchanged,
    /// A change is waiting for the gate to open.
    Deferred,
    Refreshed,
    /// The refresh ran but failed; the change stays pending.
    Failed,
}

/// Fingerprints the open tab set and asks for a refresh when it changes.
/// A change seen while the gate is closed stays pending until it opens.
pub struct ChangeWatcher {
    tabs: TabTracker,
    orchestrator: ReasoningOrchestrator,
    fingerprinter: ChangeFingerprinter,
    pending: bool,
}

impl ChangeWatcher {
    pub fn new(tabs: TabTracker, orchestrator: ReasoningOrchestrator) -> Self {
        Self {
            tabs,
            orchestrator,
            fingerprinter: ChangeFingerprinter::new(),
            pending: false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub async fn check(&mut self) -> WatchOutcome {
        let items = self.tabs.snapshot().open_items();
        if self.fingerprinter.observe(&items) {
            log_debug!("open tab set changed ({} tabs)", items.len());
            self.pending = true;
        }

        if !self.pending {
            return WatchOutcome::Unchanged;
        }
        if !self.orchestrator.may_refresh() {
            return WatchOutcome::Deferred;
        }

        match self.orchestrator.refresh_on_change().await {
            RefreshOutcome::Committed(_) => {
                self.pending = false;
                WatchOutcome::Refreshed
            }
            RefreshOutcome::Denied(decision) => {
                log_debug!("change refresh lost the gate: {decision:?}");
                WatchOutcome::Deferred
            }
            RefreshOutcome::Failed(err) => {
                log_warn!("change refresh failed, will retry: {err}");
                WatchOutcome::Failed
            }
        }
    }
}

pub async fn change_watch_loop(
    mut watcher: ChangeWatcher,
    interval: Duration,
    cancel_token: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel_token.cancelled() => {
                log_info!("change watcher shutting down");
                break;
            }
            _ = ticker.tick() => {
                let outcome = tokio::select! {
                    biased;
                    _ = cancel_token.cancelled() => break,
                    outcome = watcher.check() => outcome,
                };
                if outcome == WatchOutcome::Refreshed {
                    log_info!("analysis refreshed after workspace change");
                }
            }
        }
    }
}
