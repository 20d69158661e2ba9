use serde::{Deserialize, Serialize};

use crate::config::{EngagementConfig, TrackerConfig};
use crate::models::{HistoryEntry, ItemActivity, TrackedItem};

use super::classify::classify_url;
use super::ledger::{FocusLedger, ItemSighting};
use super::source::TabObservation;
use super::tracker::{SampledState, SampledStateTracker};

pub type TabTracker = SampledStateTracker<TabSetState>;

/// Immutable view of the tab-set tracker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TabSetSnapshot {
    pub taken_at_ms: u64,
    pub active: Option<ItemActivity>,
    /// Currently open tabs in browser order.
    pub open_tabs: Vec<ItemActivity>,
    pub history: Vec<HistoryEntry>,
    /// Every known tab including recently closed ones, most focused first.
    pub items: Vec<ItemActivity>,
}

impl TabSetSnapshot {
    pub fn open_items(&self) -> Vec<TrackedItem> {
        self.open_tabs.iter().map(|tab| tab.item.clone()).collect()
    }

    /// Open tabs ranked by engagement, highest first.
    pub fn most_engaged(&self, limit: usize) -> Vec<&ItemActivity> {
        let mut ranked: Vec<&ItemActivity> = self.open_tabs.iter().collect();
        ranked.sort_by(|a, b| {
            b.engagement
                .cmp(&a.engagement)
                .then_with(|| a.item.id.cmp(&b.item.id))
        });
        ranked.truncate(limit);
        ranked
    }

    pub fn work_related_share(&self) -> f64 {
        if self.open_tabs.is_empty() {
            return 0.0;
        }
        let work = self
            .open_tabs
            .iter()
            .filter(|tab| tab.item.work_related)
            .count();
        work as f64 / self.open_tabs.len() as f64
    }
}

/// Open-tab-set state machine. The active tab is the focused item; tabs
/// missing from an observation are closed but keep their counters until swept.
#[derive(Debug, Clone)]
pub struct TabSetState {
    ledger: FocusLedger,
    open: Vec<String>,
}

impl TabSetState {
    pub fn new(config: TrackerConfig, engagement: EngagementConfig) -> Self {
        Self {
            ledger: FocusLedger::new(config, engagement),
            open: Vec::new(),
        }
    }

    pub fn open_count(&self) -> usize {
        self.open.len()
    }
}

impl SampledState for TabSetState {
    type Observation = Vec<TabObservation>;
    type Snapshot = TabSetSnapshot;

    fn apply(&mut self, observation: Vec<TabObservation>, now_ms: u64) {
        let mut open = Vec::with_capacity(observation.len());
        let mut active: Option<(&str, u32)> = None;

        for tab in &observation {
            self.ledger.sight(
                ItemSighting {
                    id: &tab.id,
                    title: &tab.title,
                    locator: &tab.url,
                    app_name: "",
                },
                || classify_url(&tab.url),
                now_ms,
            );
            if tab.active && active.is_none() {
                active = Some((&tab.id, tab.interactions));
            } else if tab.interactions > 0 {
                self.ledger.add_interactions(&tab.id, tab.interactions);
            }
            open.push(tab.id.clone());
        }

        match active {
            Some((id, interactions)) => self.ledger.record_focus(Some(id), interactions, now_ms),
            None => self.ledger.record_focus(None, 0, now_ms),
        }
        self.open = open;
        self.ledger.prune(now_ms);
    }

    fn snapshot(&self, now_ms: u64) -> TabSetSnapshot {
        TabSetSnapshot {
            taken_at_ms: now_ms,
            active: self.ledger.current_activity(),
            open_tabs: self
                .open
                .iter()
                .filter_map(|id| self.ledger.activity(id))
                .collect(),
            history: self.ledger.recent_history(now_ms),
            items: self.ledger.activities(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ItemCategory;
    use crate::scoring::fingerprint;

    fn tab(id: &str, title: &str, url: &str, active: bool) -> TabObservation {
        TabObservation {
            id: id.to_string(),
            title: title.to_string(),
            url: url.to_string(),
            active,
            interactions: 0,
        }
    }

    fn state() -> TabSetState {
        TabSetState::new(TrackerConfig::default(), EngagementConfig::default())
    }

    fn workspace(active: &str) -> Vec<TabObservation> {
        vec![
            tab("1", "acme/app", "https://github.com/acme/app", active == "1"),
            tab("2", "tokio - Rust", "https://docs.rs/tokio", active == "2"),
            tab("3", "Home / X", "https://x.com/home", active == "3"),
        ]
    }

    #[test]
    fn tabs_are_classified_once_by_host() {
        let mut state = state();
        state.apply(workspace("1"), 0);
        let snapshot = state.snapshot(0);

        assert_eq!(snapshot.open_tabs.len(), 3);
        assert_eq!(snapshot.open_tabs[0].item.category, ItemCategory::Development);
        assert_eq!(snapshot.open_tabs[1].item.category, ItemCategory::Documentation);
        assert_eq!(snapshot.open_tabs[2].item.category, ItemCategory::Social);
        assert!((snapshot.work_related_share() - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(snapshot.active.unwrap().item.id, "1");
    }

    #[test]
    fn switching_active_tab_records_history() {
        let mut state = state();
        state.apply(workspace("1"), 0);
        state.apply(workspace("1"), 5_000);
        state.apply(workspace("3"), 10_000);

        let snapshot = state.snapshot(10_000);
        assert_eq!(snapshot.history.len(), 1);
        assert_eq!(snapshot.history[0].item.id, "1");
        assert_eq!(snapshot.history[0].duration_ms, 10_000);
        assert_eq!(snapshot.active.unwrap().item.id, "3");
    }

    #[test]
    fn closed_tabs_leave_the_open_set_but_keep_counters() {
        let mut state = state();
        state.apply(workspace("1"), 0);
        state.apply(workspace("1"), 5_000);
        state.apply(vec![tab("2", "tokio - Rust", "https://docs.rs/tokio", true)], 10_000);

        let snapshot = state.snapshot(10_000);
        assert_eq!(state.open_count(), 1);
        assert_eq!(snapshot.open_tabs.len(), 1);
        let closed = snapshot.items.iter().find(|a| a.item.id == "1").unwrap();
        assert_eq!(closed.counters.cumulative_focus_ms, 10_000);
    }

    #[test]
    fn empty_window_clears_focus() {
        let mut state = state();
        state.apply(workspace("2"), 0);
        state.apply(Vec::new(), 3_000);

        let snapshot = state.snapshot(3_000);
        assert!(snapshot.active.is_none());
        assert!(snapshot.open_tabs.is_empty());
        assert_eq!(snapshot.history.len(), 1);
    }

    #[test]
    fn accumulating_time_does_not_change_fingerprints() {
        let mut state = state();
        state.apply(workspace("1"), 0);
        let before = fingerprint(&state.snapshot(0).open_items());

        state.apply(workspace("1"), 5_000);
        state.apply(workspace("1"), 10_000);
        let after_snapshot = state.snapshot(10_000);
        assert!(after_snapshot.active.as_ref().unwrap().counters.cumulative_focus_ms > 0);
        assert_eq!(before, fingerprint(&after_snapshot.open_items()));

        let mut retitled = workspace("1");
        retitled[1].title = "tokio::sync - Rust".to_string();
        state.apply(retitled, 15_000);
        assert_ne!(before, fingerprint(&state.snapshot(15_000).open_items()));
    }

    #[test]
    fn background_interactions_are_counted_without_focus() {
        let mut state = state();
        let mut tabs = workspace("1");
        tabs[1].interactions = 4;
        state.apply(tabs, 0);

        let snapshot = state.snapshot(0);
        let docs = snapshot.open_tabs.iter().find(|a| a.item.id == "2").unwrap();
        assert_eq!(docs.counters.interactions, 4);
        assert_eq!(docs.counters.focus_count, 0);
    }
}
