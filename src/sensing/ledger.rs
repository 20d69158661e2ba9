use std::collections::{HashMap, VecDeque};

use crate::config::{EngagementConfig, TrackerConfig};
use crate::models::{ActivityCounters, HistoryEntry, ItemActivity, ItemCategory, TrackedItem};
use crate::scoring::engagement_score;

#[derive(Debug, Clone)]
struct LedgerItem {
    item: TrackedItem,
    counters: ActivityCounters,
}

#[derive(Debug, Clone)]
struct CurrentFocus {
    id: String,
    started_at_ms: u64,
}

/// Display attributes reported by one observation of an item.
#[derive(Debug, Clone, Copy)]
pub struct ItemSighting<'a> {
    pub id: &'a str,
    pub title: &'a str,
    pub locator: &'a str,
    pub app_name: &'a str,
}

/// Focus accounting shared by the window and tab trackers: known items with
/// their counters, which one is focused, and the completed focus intervals.
#[derive(Debug, Clone)]
pub struct FocusLedger {
    config: TrackerConfig,
    engagement: EngagementConfig,
    items: HashMap<String, LedgerItem>,
    current: Option<CurrentFocus>,
    history: VecDeque<HistoryEntry>,
    last_sample_ms: Option<u64>,
}

impl FocusLedger {
    pub fn new(config: TrackerConfig, engagement: EngagementConfig) -> Self {
        Self {
            config,
            engagement,
            items: HashMap::new(),
            current: None,
            history: VecDeque::new(),
            last_sample_ms: None,
        }
    }

    /// Register or refresh an item. `classify` only runs the first time an id is seen.
    pub fn sight(
        &mut self,
        sighting: ItemSighting<'_>,
        classify: impl FnOnce() -> ItemCategory,
        now_ms: u64,
    ) {
        let entry = self.items.entry(sighting.id.to_string()).or_insert_with(|| {
            let category = classify();
            LedgerItem {
                item: TrackedItem {
                    id: sighting.id.to_string(),
                    title: sighting.title.to_string(),
                    locator: sighting.locator.to_string(),
                    app_name: sighting.app_name.to_string(),
                    category,
                    work_related: category.is_work_related(),
                },
                counters: ActivityCounters {
                    first_seen_ms: now_ms,
                    ..ActivityCounters::default()
                },
            }
        });

        entry.item.title = sighting.title.to_string();
        entry.item.locator = sighting.locator.to_string();
        entry.item.app_name = sighting.app_name.to_string();
        entry.counters.last_seen_ms = now_ms;
    }

    /// Credit the time since the previous sample to whatever was focused, then
    /// move focus to `focused`. Interactions go to the newly focused item.
    pub fn record_focus(&mut self, focused: Option<&str>, interactions: u32, now_ms: u64) {
        let elapsed = self
            .last_sample_ms
            .map(|last| now_ms.saturating_sub(last).min(self.config.max_sample_gap_ms))
            .unwrap_or(0);
        self.last_sample_ms = Some(now_ms);

        let same_focus = match (&self.current, focused) {
            (Some(current), Some(id)) => current.id == id,
            (None, None) => true,
            _ => false,
        };

        if let Some(current) = &self.current {
            if let Some(entry) = self.items.get_mut(&current.id) {
                entry.counters.cumulative_focus_ms += elapsed;
                if same_focus {
                    entry.counters.continuous_focus_ms += elapsed;
                    entry.counters.last_focused_ms = Some(now_ms);
                }
            }
        }

        if !same_focus {
            self.close_current(now_ms);
            if let Some(id) = focused {
                if let Some(entry) = self.items.get_mut(id) {
                    entry.counters.focus_count += 1;
                    entry.counters.continuous_focus_ms = 0;
                    entry.counters.last_focused_ms = Some(now_ms);
                    self.current = Some(CurrentFocus {
                        id: id.to_string(),
                        started_at_ms: now_ms,
                    });
                }
            }
        }

        if let Some(id) = focused {
            self.add_interactions(id, interactions);
        }
    }

    pub fn add_interactions(&mut self, id: &str, interactions: u32) {
        if let Some(entry) = self.items.get_mut(id) {
            entry.counters.interactions += u64::from(interactions);
        }
    }

    fn close_current(&mut self, now_ms: u64) {
        let Some(previous) = self.current.take() else {
            return;
        };
        let Some(entry) = self.items.get_mut(&previous.id) else {
            return;
        };

        entry.counters.continuous_focus_ms = 0;

        // Timestamps only move forward, so appending keeps the history ordered.
        let started_at_ms = self
            .history
            .back()
            .map(|last| previous.started_at_ms.max(last.started_at_ms))
            .unwrap_or(previous.started_at_ms);
        self.history.push_back(HistoryEntry {
            item: entry.item.clone(),
            started_at_ms,
            duration_ms: now_ms.saturating_sub(started_at_ms),
        });
    }

    /// Trim history older than the retention window and forget stale items.
    pub fn prune(&mut self, now_ms: u64) -> (usize, usize) {
        let history_cutoff = now_ms.saturating_sub(self.config.history_retention_ms);
        let mut trimmed = 0;
        while self
            .history
            .front()
            .is_some_and(|entry| entry.ended_at_ms() < history_cutoff)
        {
            self.history.pop_front();
            trimmed += 1;
        }

        let stale_cutoff = now_ms.saturating_sub(self.config.stale_item_ms);
        let current_id = self.current.as_ref().map(|c| c.id.clone());
        let before = self.items.len();
        self.items.retain(|id, entry| {
            Some(id) == current_id.as_ref() || entry.counters.last_seen_ms >= stale_cutoff
        });

        (trimmed, before - self.items.len())
    }

    pub fn current_id(&self) -> Option<&str> {
        self.current.as_ref().map(|c| c.id.as_str())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.items.contains_key(id)
    }

    pub fn activity(&self, id: &str) -> Option<ItemActivity> {
        self.items.get(id).map(|entry| ItemActivity {
            item: entry.item.clone(),
            counters: entry.counters.clone(),
            engagement: engagement_score(&entry.counters, &self.engagement),
        })
    }

    pub fn current_activity(&self) -> Option<ItemActivity> {
        self.current_id().and_then(|id| self.activity(id))
    }

    /// History entries that ended inside the retention window, oldest first.
    pub fn recent_history(&self, now_ms: u64) -> Vec<HistoryEntry> {
        let cutoff = now_ms.saturating_sub(self.config.history_retention_ms);
        self.history
            .iter()
            .filter(|entry| entry.ended_at_ms() >= cutoff)
            .cloned()
            .collect()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Every known item, most focused first.
    pub fn activities(&self) -> Vec<ItemActivity> {
        let mut all: Vec<ItemActivity> = self
            .items
            .keys()
            .filter_map(|id| self.activity(id))
            .collect();
        all.sort_by(|a, b| {
            b.counters
                .cumulative_focus_ms
                .cmp(&a.counters.cumulative_focus_ms)
                .then_with(|| a.item.id.cmp(&b.item.id))
        });
        all
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ledger() -> FocusLedger {
        FocusLedger::new(TrackerConfig::default(), EngagementConfig::default())
    }

    fn sight(ledger: &mut FocusLedger, id: &str, title: &str, now_ms: u64) {
        ledger.sight(
            ItemSighting {
                id,
                title,
                locator: "",
                app_name: "Editor",
            },
            || ItemCategory::Development,
            now_ms,
        );
    }

    #[test]
    fn steady_focus_accumulates_without_history() {
        let mut ledger = ledger();
        let mut last_continuous = 0;
        for step in 0..10u64 {
            let now = step * 2_000;
            sight(&mut ledger, "a", "main.rs", now);
            ledger.record_focus(Some("a"), 1, now);
            let counters = ledger.current_activity().unwrap().counters;
            assert!(counters.continuous_focus_ms >= last_continuous);
            last_continuous = counters.continuous_focus_ms;
        }

        let counters = ledger.current_activity().unwrap().counters;
        assert_eq!(ledger.history_len(), 0);
        assert_eq!(counters.cumulative_focus_ms, 18_000);
        assert_eq!(counters.continuous_focus_ms, 18_000);
        assert_eq!(counters.focus_count, 1);
        assert_eq!(counters.interactions, 10);
    }

    #[test]
    fn switching_focus_closes_an_interval() {
        let mut ledger = ledger();
        sight(&mut ledger, "a", "main.rs", 0);
        ledger.record_focus(Some("a"), 0, 0);
        sight(&mut ledger, "a", "main.rs", 4_000);
        ledger.record_focus(Some("a"), 0, 4_000);
        sight(&mut ledger, "b", "lib.rs", 6_000);
        ledger.record_focus(Some("b"), 0, 6_000);

        let history = ledger.recent_history(6_000);
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].item.id, "a");
        assert_eq!(history[0].started_at_ms, 0);
        assert_eq!(history[0].duration_ms, 6_000);

        let a = ledger.activity("a").unwrap().counters;
        assert_eq!(a.cumulative_focus_ms, 6_000);
        assert_eq!(a.continuous_focus_ms, 0);
        assert_eq!(ledger.current_id(), Some("b"));
    }

    #[test]
    fn classification_is_fixed_at_first_sight() {
        let mut ledger = ledger();
        ledger.sight(
            ItemSighting { id: "t", title: "one", locator: "https://a", app_name: "" },
            || ItemCategory::Social,
            0,
        );
        ledger.sight(
            ItemSighting { id: "t", title: "two", locator: "https://b", app_name: "" },
            || panic!("classifier must not run twice"),
            1_000,
        );
        let item = ledger.activity("t").unwrap().item;
        assert_eq!(item.category, ItemCategory::Social);
        assert!(!item.work_related);
        assert_eq!(item.title, "two");
    }

    #[test]
    fn long_gaps_are_capped() {
        let mut ledger = ledger();
        sight(&mut ledger, "a", "main.rs", 0);
        ledger.record_focus(Some("a"), 0, 0);
        sight(&mut ledger, "a", "main.rs", 120_000);
        ledger.record_focus(Some("a"), 0, 120_000);
        assert_eq!(
            ledger.activity("a").unwrap().counters.cumulative_focus_ms,
            TrackerConfig::default().max_sample_gap_ms
        );
    }

    #[test]
    fn prune_trims_prefix_and_sweeps_stale_items() {
        let mut ledger = FocusLedger::new(
            TrackerConfig {
                history_retention_ms: 10_000,
                stale_item_ms: 30_000,
                ..TrackerConfig::default()
            },
            EngagementConfig::default(),
        );
        sight(&mut ledger, "a", "a", 0);
        ledger.record_focus(Some("a"), 0, 0);
        sight(&mut ledger, "b", "b", 2_000);
        ledger.record_focus(Some("b"), 0, 2_000);
        sight(&mut ledger, "c", "c", 20_000);
        ledger.record_focus(Some("c"), 0, 20_000);
        assert_eq!(ledger.history_len(), 2);

        let (trimmed, swept) = ledger.prune(20_000);
        assert_eq!(trimmed, 1);
        assert_eq!(swept, 0);
        assert_eq!(ledger.recent_history(20_000)[0].item.id, "b");

        let (_, swept) = ledger.prune(45_000);
        assert_eq!(swept, 2);
        assert!(ledger.contains("c"));
        assert!(!ledger.contains("a"));
    }
}
