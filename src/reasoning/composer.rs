use serde::Serialize;

use crate::clock::to_datetime;
use crate::models::{FocusState, ItemActivity, ItemCategory};
use crate::sensing::{ContentSignals, TabSetSnapshot, WindowSnapshot};

use super::memory::MemoryEntry;
use super::temporal::{SemanticState, StateTransition, TemporalContext};

const RECENT_TRANSITIONS: usize = 5;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ItemSummary {
    pub id: String,
    pub title: String,
    pub locator: String,
    pub app_name: String,
    pub category: ItemCategory,
    pub work_related: bool,
    pub engagement: u8,
    pub cumulative_focus_secs: u64,
    pub continuous_focus_secs: u64,
    pub interactions: u64,
}

impl From<&ItemActivity> for ItemSummary {
    fn from(activity: &ItemActivity) -> Self {
        Self {
            id: activity.item.id.clone(),
            title: activity.item.title.clone(),
            locator: activity.item.locator.clone(),
            app_name: activity.item.app_name.clone(),
            category: activity.item.category,
            work_related: activity.item.work_related,
            engagement: activity.engagement,
            cumulative_focus_secs: activity.counters.cumulative_focus_ms / 1_000,
            continuous_focus_secs: activity.counters.continuous_focus_ms / 1_000,
            interactions: activity.counters.interactions,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct HistorySummary {
    pub title: String,
    pub app_name: String,
    pub category: ItemCategory,
    pub ago_secs: u64,
    pub duration_secs: u64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ItemDetail {
    pub id: String,
    pub signals: ContentSignals,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MemorySummary {
    pub ago_secs: u64,
    pub focus_state: FocusState,
    pub focus_score: u8,
    pub task: String,
    pub significance: f64,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TemporalSummary {
    pub session_duration_secs: u64,
    pub current_state: Option<FocusState>,
    pub current_state_secs: Option<u64>,
    pub focus_session_count: usize,
    pub recent_transitions: Vec<StateTransition>,
}

/// Everything the oracle sees for one analysis.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ContextPayload {
    pub generated_at: String,
    pub active_window: Option<ItemSummary>,
    pub window_history: Vec<HistorySummary>,
    pub active_tab: Option<ItemSummary>,
    pub open_tabs: Vec<ItemSummary>,
    pub work_related_share: f64,
    pub details: Vec<ItemDetail>,
    pub memories: Vec<MemorySummary>,
    pub temporal: TemporalSummary,
    pub semantic: SemanticState,
}

impl ContextPayload {
    pub fn to_json(&self) -> String {
        // Every field is plain data; serialization cannot fail.
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Borrowed inputs for one composition.
pub struct ContextSources<'a> {
    pub window: &'a WindowSnapshot,
    pub tabs: &'a TabSetSnapshot,
    pub memories: &'a [MemoryEntry],
    pub temporal: &'a TemporalContext,
    pub semantic: &'a SemanticState,
    pub details: Vec<ItemDetail>,
}

/// Builds the oracle payload. Pure: no I/O, no clock reads.
#[derive(Debug, Clone)]
pub struct ContextComposer {
    history_limit: usize,
}

impl ContextComposer {
    pub fn new(history_limit: usize) -> Self {
        Self { history_limit }
    }

    pub fn compose(&self, sources: ContextSources<'_>, now_ms: u64) -> ContextPayload {
        let ContextSources {
            window,
            tabs,
            memories,
            temporal,
            semantic,
            details,
        } = sources;

        let history_start = window.history.len().saturating_sub(self.history_limit);
        let window_history = window.history[history_start..]
            .iter()
            .rev()
            .map(|entry| HistorySummary {
                title: entry.item.title.clone(),
                app_name: entry.item.app_name.clone(),
                category: entry.item.category,
                ago_secs: now_ms.saturating_sub(entry.ended_at_ms()) / 1_000,
                duration_secs: entry.duration_ms / 1_000,
            })
            .collect();

        let memories = memories
            .iter()
            .map(|entry| MemorySummary {
                ago_secs: now_ms.saturating_sub(entry.timestamp_ms) / 1_000,
                focus_state: entry.analysis.focus_state,
                focus_score: entry.analysis.focus_score,
                task: entry.analysis.current_task.clone(),
                significance: entry.significance,
                tags: entry.tags.clone(),
            })
            .collect();

        let transitions_start = temporal
            .transitions
            .len()
            .saturating_sub(RECENT_TRANSITIONS);

        ContextPayload {
            generated_at: to_datetime(now_ms).to_rfc3339(),
            active_window: window.current.as_ref().map(ItemSummary::from),
            window_history,
            active_tab: tabs.active.as_ref().map(ItemSummary::from),
            open_tabs: tabs.open_tabs.iter().map(ItemSummary::from).collect(),
            work_related_share: tabs.work_related_share(),
            details,
            memories,
            temporal: TemporalSummary {
                session_duration_secs: temporal.session_duration_ms(now_ms) / 1_000,
                current_state: temporal.focus_sessions.back().map(|s| s.state),
                current_state_secs: temporal.current_state_duration_ms(now_ms).map(|ms| ms / 1_000),
                focus_session_count: temporal.focus_sessions.len(),
                recent_transitions: temporal
                    .transitions
                    .iter()
                    .skip(transitions_start)
                    .cloned()
                    .collect(),
            },
            semantic: semantic.clone(),
        }
    }
}
