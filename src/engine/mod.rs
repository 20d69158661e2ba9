mod change_watcher;

pub use change_watcher::{change_watch_loop, ChangeWatcher, WatchOutcome};

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::task::JoinHandle;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::clock::Clock;
use crate::config::FocusConfig;
use crate::metrics::SessionStats;
use crate::models::AnalysisResult;
use crate::reasoning::{ReasoningOracle, ReasoningOrchestrator};
use crate::sensing::{
    ActiveFocusSource, ItemSetSource, TabSetSnapshot, TabSetState, TabTracker, WindowSnapshot,
    WindowState, WindowTracker,
};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

struct WatcherTask {
    cancel_token: CancellationToken,
    handle: JoinHandle<()>,
}

/// Owns both trackers, the orchestrator and the change watcher.
pub struct FocusEngine {
    config: FocusConfig,
    window: WindowTracker,
    tabs: TabTracker,
    orchestrator: ReasoningOrchestrator,
    watcher: Mutex<Option<WatcherTask>>,
}

fn lock(watcher: &Mutex<Option<WatcherTask>>) -> MutexGuard<'_, Option<WatcherTask>> {
    match watcher.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

impl FocusEngine {
    pub fn new(
        config: FocusConfig,
        clock: Arc<dyn Clock>,
        focus_source: Arc<dyn ActiveFocusSource>,
        tab_source: Arc<dyn ItemSetSource>,
        oracle: Arc<dyn ReasoningOracle>,
    ) -> Self {
        let window = WindowTracker::new(
            "window",
            WindowState::new(config.window.clone(), config.engagement.clone()),
            Box::new(focus_source),
            Arc::clone(&clock),
            Duration::from_millis(config.window.poll_timeout_ms),
        );
        let tabs = TabTracker::new(
            "tabs",
            TabSetState::new(config.tabs.clone(), config.engagement.clone()),
            Box::new(Arc::clone(&tab_source)),
            Arc::clone(&clock),
            Duration::from_millis(config.tabs.poll_timeout_ms),
        );
        let orchestrator = ReasoningOrchestrator::new(
            &config,
            clock,
            oracle,
            window.clone(),
            tabs.clone(),
            tab_source,
        );

        Self {
            config,
            window,
            tabs,
            orchestrator,
            watcher: Mutex::new(None),
        }
    }

    /// Start both trackers and the change watcher. Must run inside a tokio runtime.
    pub fn start(&self) {
        self.window
            .start_polling(Duration::from_millis(self.config.window.poll_interval_ms));
        self.tabs
            .start_polling(Duration::from_millis(self.config.tabs.poll_interval_ms));

        let mut watcher = lock(&self.watcher);
        if watcher.as_ref().is_some_and(|task| !task.handle.is_finished()) {
            log_warn!("change watcher already running");
            return;
        }

        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(change_watch_loop(
            ChangeWatcher::new(self.tabs.clone(), self.orchestrator.clone()),
            Duration::from_millis(self.config.change_check_interval_ms),
            cancel_token.clone(),
        ));
        *watcher = Some(WatcherTask {
            cancel_token,
            handle,
        });
        log_info!("focus engine started");
    }

    /// Stop sampling and watching. Accumulated state is kept.
    pub fn stop(&self) {
        self.window.stop_polling();
        self.tabs.stop_polling();
        if let Some(task) = lock(&self.watcher).take() {
            task.cancel_token.cancel();
            log_info!("focus engine stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.window.is_polling() || self.tabs.is_polling()
    }

    pub fn window_snapshot(&self) -> WindowSnapshot {
        self.window.snapshot()
    }

    pub fn tab_snapshot(&self) -> TabSetSnapshot {
        self.tabs.snapshot()
    }

    pub async fn get_analysis(&self, force: bool) -> Arc<AnalysisResult> {
        self.orchestrator.get_analysis(force).await
    }

    pub fn last_known_good(&self) -> Option<(Arc<AnalysisResult>, u64)> {
        self.orchestrator.last_known_good()
    }

    pub fn session_stats(&self) -> SessionStats {
        self.orchestrator.session_stats()
    }

    pub fn window_tracker(&self) -> &WindowTracker {
        &self.window
    }

    pub fn tab_tracker(&self) -> &TabTracker {
        &self.tabs
    }

    pub fn orchestrator(&self) -> &ReasoningOrchestrator {
        &self.orchestrator
    }
}

impl Drop for FocusEngine {
    fn drop(&mut self) {
        self.stop();
    }
}
