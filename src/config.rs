use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

/// Tuning for one sampled-state tracker.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub poll_interval_ms: u64,
    /// Each poll is abandoned after this long; the cycle then counts as "source unavailable".
    pub poll_timeout_ms: u64,
    pub history_retention_ms: u64,
    /// Items not observed for this long are dropped from the ledger.
    pub stale_item_ms: u64,
    /// Upper bound on focus time credited by a single sample.
    pub max_sample_gap_ms: u64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 2_000,
            poll_timeout_ms: 1_500,
            history_retention_ms: 10 * 60 * 1_000,
            stale_item_ms: 60 * 60 * 1_000,
            max_sample_gap_ms: 10_000,
        }
    }
}

/// Thresholds at which each engagement sub-score saturates, and their weights.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngagementConfig {
    pub time_threshold_secs: f64,
    pub interaction_threshold: f64,
    pub continuous_threshold_secs: f64,
    pub weight_time: f64,
    pub weight_interaction: f64,
    pub weight_continuous: f64,
}

impl Default for EngagementConfig {
    fn default() -> Self {
        Self {
            time_threshold_secs: 300.0,
            interaction_threshold: 20.0,
            continuous_threshold_secs: 180.0,
            weight_time: 0.4,
            weight_interaction: 0.3,
            weight_continuous: 0.3,
        }
    }
}

/// Significance heuristics and memory sizing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SignificanceConfig {
    pub base: f64,
    pub peak_state_bonus: f64,
    pub peak_confidence_min: f64,
    pub task_change_bonus: f64,
    pub high_score_bonus: f64,
    pub high_score_threshold: u8,
    pub non_default_action_bonus: f64,
    pub recency_window_ms: u64,
    pub recency_bonus: f64,
    /// Entries above this significance survive retrieval even when old.
    pub retain_threshold: f64,
    pub capacity: usize,
}

impl Default for SignificanceConfig {
    fn default() -> Self {
        Self {
            base: 0.5,
            peak_state_bonus: 0.3,
            peak_confidence_min: 0.8,
            task_change_bonus: 0.2,
            high_score_bonus: 0.2,
            high_score_threshold: 80,
            non_default_action_bonus: 0.1,
            recency_window_ms: 30 * 60 * 1_000,
            recency_bonus: 0.3,
            retain_threshold: 0.7,
            capacity: 100,
        }
    }
}

/// Rate limiting, caching and oracle call behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReasoningConfig {
    pub min_interval_ms: u64,
    pub initialization_delay_ms: u64,
    pub cache_ttl_ms: u64,
    pub oracle_timeout_ms: u64,
    pub detail_timeout_ms: u64,
    /// How many open tabs get `extract_detail` enrichment per analysis.
    pub detail_limit: usize,
    pub memory_limit: usize,
    pub history_limit: usize,
    /// Bound on temporal focus sessions and transition events.
    pub temporal_capacity: usize,
}

impl Default for ReasoningConfig {
    fn default() -> Self {
        Self {
            min_interval_ms: 30_000,
            initialization_delay_ms: 15_000,
            cache_ttl_ms: 60_000,
            oracle_timeout_ms: 20_000,
            detail_timeout_ms: 2_000,
            detail_limit: 3,
            memory_limit: 5,
            history_limit: 12,
            temporal_capacity: 50,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FocusConfig {
    pub window: TrackerConfig,
    pub tabs: TrackerConfig,
    pub engagement: EngagementConfig,
    pub significance: SignificanceConfig,
    pub reasoning: ReasoningConfig,
    pub change_check_interval_ms: u64,
}

impl Default for FocusConfig {
    fn default() -> Self {
        Self {
            window: TrackerConfig::default(),
            tabs: TrackerConfig {
                poll_interval_ms: 5_000,
                poll_timeout_ms: 4_000,
                ..TrackerConfig::default()
            },
            engagement: EngagementConfig::default(),
            significance: SignificanceConfig::default(),
            reasoning: ReasoningConfig::default(),
            change_check_interval_ms: 5_000,
        }
    }
}

impl FocusConfig {
    /// Read a JSON config file. Missing fields fall back to defaults; a missing
    /// file yields the default config.
    pub fn load(path: &Path) -> Result<Self> {
        let config = if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config at {}", path.display()))?
        } else {
            Self::default()
        };

        Ok(config.with_env_overrides())
    }

    /// `FLOWSYNC_DEBUG=1` shortens every interval so a development session
    /// produces analyses within seconds.
    pub fn with_env_overrides(self) -> Self {
        let debug_mode = std::env::var("FLOWSYNC_DEBUG")
            .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        if debug_mode {
            self.debug()
        } else {
            self
        }
    }

    pub fn debug(mut self) -> Self {
        self.window.poll_interval_ms = 1_000;
        self.tabs.poll_interval_ms = 1_000;
        self.change_check_interval_ms = 1_000;
        self.reasoning.min_interval_ms = 5_000;
        self.reasoning.initialization_delay_ms = 2_000;
        self.reasoning.cache_ttl_ms = 10_000;
        self
    }
}
