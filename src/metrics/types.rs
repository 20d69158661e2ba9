use serde::{Deserialize, Serialize};

use crate::models::FocusBand;

/// Session-level summary exposed to surfaces.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionStats {
    pub session_duration_ms: u64,
    pub memory_entries: usize,
    pub focus_sessions: usize,
    pub average_significance: f64,
    pub top_tags: Vec<String>,
    /// Band of the last successful analysis, if any.
    pub focus_band: Option<FocusBand>,
    /// Age of the cached analysis while it is still valid.
    pub cache_age_ms: Option<u64>,
}

impl Default for SessionStats {
    fn default() -> Self {
        Self {
            session_duration_ms: 0,
            memory_entries: 0,
            focus_sessions: 0,
            average_significance: 0.0,
            top_tags: Vec::new(),
            focus_band: None,
            cache_age_ms: None,
        }
    }
}
