mod types;

pub use types::SessionStats;

use crate::models::AnalysisResult;
use crate::reasoning::{AnalysisCache, SignificanceMemory, TemporalContext};

const TOP_TAGS: usize = 5;

/// Read-only view over the reasoning state at `now_ms`.
pub struct StatsSources<'a> {
    pub memory: &'a SignificanceMemory,
    pub temporal: &'a TemporalContext,
    pub cache: &'a AnalysisCache,
    pub last_good: Option<&'a AnalysisResult>,
}

pub fn collect(sources: StatsSources<'_>, now_ms: u64) -> SessionStats {
    SessionStats {
        session_duration_ms: sources.temporal.session_duration_ms(now_ms),
        memory_entries: sources.memory.len(),
        focus_sessions: sources.temporal.sessions_started,
        average_significance: sources.memory.average_significance(),
        top_tags: sources.memory.top_tags(TOP_TAGS),
        focus_band: sources.last_good.map(AnalysisResult::band),
        cache_age_ms: sources.cache.age_ms(now_ms),
    }
}
