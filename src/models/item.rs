use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ItemCategory {
    Development,
    Documentation,
    Communication,
    Productivity,
    Research,
    Social,
    Entertainment,
    Shopping,
    News,
    System,
    Other,
}

impl ItemCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemCategory::Development => "development",
            ItemCategory::Documentation => "documentation",
            ItemCategory::Communication => "communication",
            ItemCategory::Productivity => "productivity",
            ItemCategory::Research => "research",
            ItemCategory::Social => "social",
            ItemCategory::Entertainment => "entertainment",
            ItemCategory::Shopping => "shopping",
            ItemCategory::News => "news",
            ItemCategory::System => "system",
            ItemCategory::Other => "other",
        }
    }

    pub fn is_work_related(&self) -> bool {
        matches!(
            self,
            ItemCategory::Development
                | ItemCategory::Documentation
                | ItemCategory::Communication
                | ItemCategory::Productivity
                | ItemCategory::Research
        )
    }
}

/// Something a tracker has observed: a window or a browser tab.
///
/// `id` is the stable identity and is never reassigned. Display attributes
/// follow the latest observation; the classification is fixed at first sight.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrackedItem {
    pub id: String,
    pub title: String,
    /// URL for tabs, application path or bundle for windows.
    pub locator: String,
    /// Owning application name, empty for tabs.
    pub app_name: String,
    pub category: ItemCategory,
    pub work_related: bool,
}

/// Per-item activity accounting, mutated only by the owning tracker.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ActivityCounters {
    /// Monotonic total of focused time.
    pub cumulative_focus_ms: u64,
    /// Length of the current uninterrupted focus; zero when not focused.
    pub continuous_focus_ms: u64,
    /// Number of times this item became the focused item.
    pub focus_count: u64,
    /// Monotonic count of input events attributed to the item.
    pub interactions: u64,
    pub first_seen_ms: u64,
    pub last_seen_ms: u64,
    pub last_focused_ms: Option<u64>,
}

/// One completed focus interval.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryEntry {
    pub item: TrackedItem,
    pub started_at_ms: u64,
    pub duration_ms: u64,
}

impl HistoryEntry {
    pub fn ended_at_ms(&self) -> u64 {
        self.started_at_ms.saturating_add(self.duration_ms)
    }
}

/// A tracked item together with its counters and derived engagement score.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ItemActivity {
    pub item: TrackedItem,
    pub counters: ActivityCounters,
    pub engagement: u8,
}
