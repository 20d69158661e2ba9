use serde::{Deserialize, Serialize};

use crate::config::{EngagementConfig, TrackerConfig};
use crate::models::{HistoryEntry, ItemActivity, ItemCategory};

use super::classify::classify_app;
use super::ledger::{FocusLedger, ItemSighting};
use super::source::{FocusObservation, WindowBounds};
use super::tracker::{SampledState, SampledStateTracker};

pub type WindowTracker = SampledStateTracker<WindowState>;

/// Immutable view of the window tracker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowSnapshot {
    pub taken_at_ms: u64,
    pub current: Option<ItemActivity>,
    pub current_bounds: Option<WindowBounds>,
    pub history: Vec<HistoryEntry>,
    /// Every known window, most focused first.
    pub items: Vec<ItemActivity>,
}

impl WindowSnapshot {
    pub fn cumulative_ms(&self, id: &str) -> u64 {
        self.items
            .iter()
            .find(|activity| activity.item.id == id)
            .map(|activity| activity.counters.cumulative_focus_ms)
            .unwrap_or(0)
    }
}

/// Active-window state machine: every observation is the window in focus.
#[derive(Debug, Clone)]
pub struct WindowState {
    ledger: FocusLedger,
    bounds: Option<WindowBounds>,
}

impl WindowState {
    pub fn new(config: TrackerConfig, engagement: EngagementConfig) -> Self {
        Self {
            ledger: FocusLedger::new(config, engagement),
            bounds: None,
        }
    }

    pub fn history_len(&self) -> usize {
        self.ledger.history_len()
    }
}

impl SampledState for WindowState {
    type Observation = FocusObservation;
    type Snapshot = WindowSnapshot;

    fn apply(&mut self, observation: FocusObservation, now_ms: u64) {
        let FocusObservation {
            id,
            title,
            app_name,
            app_path,
            bounds,
            interactions,
        } = observation;

        // Windows without an owning app are shell chrome (menu bar, dock).
        let is_system = app_name.is_empty();
        self.ledger.sight(
            ItemSighting {
                id: &id,
                title: &title,
                locator: &app_path,
                app_name: if is_system { "System UI" } else { app_name.as_str() },
            },
            || {
                if is_system {
                    ItemCategory::System
                } else {
                    classify_app(&app_name)
                }
            },
            now_ms,
        );
        self.ledger.record_focus(Some(&id), interactions, now_ms);
        self.bounds = bounds;
        self.ledger.prune(now_ms);
    }

    fn snapshot(&self, now_ms: u64) -> WindowSnapshot {
        WindowSnapshot {
            taken_at_ms: now_ms,
            current: self.ledger.current_activity(),
            current_bounds: self.bounds.clone(),
            history: self.ledger.recent_history(now_ms),
            items: self.ledger.activities(),
        }
    }
}
