use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::SignificanceConfig;
use crate::models::{AnalysisResult, FocusState, ItemCategory, RecommendedAction};
use crate::sensing::{TabSetSnapshot, WindowSnapshot};

use super::temporal::SemanticState;

const MAX_ORACLE_TAGS: usize = 12;

/// Compact summary of the workspace an analysis was made from.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ContextDigest {
    pub active_window: Option<String>,
    pub active_app: Option<String>,
    pub active_tab: Option<String>,
    /// Categories of the focused window and active tab, deduplicated.
    pub categories: Vec<ItemCategory>,
    pub open_tab_count: usize,
    pub work_related_share: f64,
}

impl ContextDigest {
    pub fn from_snapshots(window: &WindowSnapshot, tabs: &TabSetSnapshot) -> Self {
        let mut categories = Vec::new();
        for activity in window.current.iter().chain(tabs.active.iter()) {
            if !categories.contains(&activity.item.category) {
                categories.push(activity.item.category);
            }
        }

        Self {
            active_window: window.current.as_ref().map(|a| a.item.title.clone()),
            active_app: window.current.as_ref().map(|a| a.item.app_name.clone()),
            active_tab: tabs.active.as_ref().map(|a| a.item.title.clone()),
            categories,
            open_tab_count: tabs.open_tabs.len(),
            work_related_share: tabs.work_related_share(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MemoryEntry {
    pub id: Uuid,
    pub timestamp_ms: u64,
    pub context: ContextDigest,
    pub analysis: Arc<AnalysisResult>,
    pub significance: f64,
    pub tags: Vec<String>,
}

impl MemoryEntry {
    pub fn new(
        timestamp_ms: u64,
        context: ContextDigest,
        analysis: Arc<AnalysisResult>,
        significance: f64,
        tags: Vec<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp_ms,
            context,
            analysis,
            significance: significance.clamp(0.0, 1.0),
            tags,
        }
    }
}

/// How much an analysis is worth remembering. Every condition can only raise
/// the score; the result is clamped to `[0, 1]`.
pub fn compute_significance(
    analysis: &AnalysisResult,
    prior: Option<&SemanticState>,
    config: &SignificanceConfig,
) -> f64 {
    let mut significance = config.base;

    if analysis.focus_state == FocusState::Peak
        && analysis.confidence >= config.peak_confidence_min
    {
        significance += config.peak_state_bonus;
    }

    let task_changed = analysis.task_changed
        || prior.is_some_and(|state| state.is_task_change(&analysis.current_task));
    if task_changed {
        significance += config.task_change_bonus;
    }

    if analysis.focus_score > config.high_score_threshold {
        significance += config.high_score_bonus;
    }

    if analysis.action != RecommendedAction::Maintain {
        significance += config.non_default_action_bonus;
    }

    significance.clamp(0.0, 1.0)
}

/// Lowercased, deduplicated tags: state, action, active categories, then the
/// oracle's own tags.
pub fn derive_tags(analysis: &AnalysisResult, digest: &ContextDigest) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    let mut push = |tag: &str| {
        let tag = tag.trim().to_lowercase();
        if !tag.is_empty() && !tags.contains(&tag) {
            tags.push(tag);
        }
    };

    push(analysis.focus_state.as_str());
    push(analysis.action.as_str());
    for category in &digest.categories {
        push(category.as_str());
    }
    for tag in analysis.tags.iter().take(MAX_ORACLE_TAGS) {
        push(tag);
    }
    tags
}

/// Bounded ring of past analyses, ranked for retrieval by significance and
/// recency.
#[derive(Debug, Clone)]
pub struct SignificanceMemory {
    entries: VecDeque<MemoryEntry>,
    capacity: usize,
    recency_window_ms: u64,
    recency_bonus: f64,
    retain_threshold: f64,
}

impl SignificanceMemory {
    pub fn new(config: &SignificanceConfig) -> Self {
        let capacity = config.capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            recency_window_ms: config.recency_window_ms,
            recency_bonus: config.recency_bonus,
            retain_threshold: config.retain_threshold,
        }
    }

    pub fn append(&mut self, entry: MemoryEntry) {
        self.entries.push_back(entry);
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    /// Recent or highly significant entries, best first. Ties go to the newer entry.
    pub fn retrieve(&self, now_ms: u64, limit: usize) -> Vec<MemoryEntry> {
        let mut ranked: Vec<(f64, &MemoryEntry)> = self
            .entries
            .iter()
            .filter_map(|entry| {
                let recent = now_ms.saturating_sub(entry.timestamp_ms) <= self.recency_window_ms;
                if !recent && entry.significance <= self.retain_threshold {
                    return None;
                }
                let bonus = if recent { self.recency_bonus } else { 0.0 };
                Some((entry.significance + bonus, entry))
            })
            .collect();

        ranked.sort_by(|(score_a, a), (score_b, b)| {
            score_b
                .total_cmp(score_a)
                .then_with(|| b.timestamp_ms.cmp(&a.timestamp_ms))
        });

        ranked
            .into_iter()
            .take(limit)
            .map(|(_, entry)| entry.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn average_significance(&self) -> f64 {
        if self.entries.is_empty() {
            return 0.0;
        }
        let total: f64 = self.entries.iter().map(|entry| entry.significance).sum();
        total / self.entries.len() as f64
    }

    /// Most frequent tags across all entries; ties alphabetically.
    pub fn top_tags(&self, limit: usize) -> Vec<String> {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for tag in self.entries.iter().flat_map(|entry| entry.tags.iter()) {
            *counts.entry(tag.as_str()).or_insert(0) += 1;
        }

        let mut ranked: Vec<(&str, usize)> = counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        ranked
            .into_iter()
            .take(limit)
            .map(|(tag, _)| tag.to_string())
            .collect()
    }
}
