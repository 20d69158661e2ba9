use std::sync::Arc;

use crate::models::AnalysisResult;

#[derive(Debug, Clone)]
pub struct CachedAnalysis {
    pub result: Arc<AnalysisResult>,
    pub stored_at_ms: u64,
}

/// Single-slot TTL cache. An expired entry reads exactly like an empty slot.
#[derive(Debug, Clone)]
pub struct AnalysisCache {
    slot: Option<CachedAnalysis>,
    ttl_ms: u64,
}

impl AnalysisCache {
    pub fn new(ttl_ms: u64) -> Self {
        Self { slot: None, ttl_ms }
    }

    pub fn get(&self, now_ms: u64) -> Option<Arc<AnalysisResult>> {
        self.slot
            .as_ref()
            .filter(|cached| now_ms.saturating_sub(cached.stored_at_ms) < self.ttl_ms)
            .map(|cached| Arc::clone(&cached.result))
    }

    pub fn set(&mut self, result: Arc<AnalysisResult>, now_ms: u64) {
        self.slot = Some(CachedAnalysis {
            result,
            stored_at_ms: now_ms,
        });
    }

    pub fn invalidate(&mut self) {
        self.slot = None;
    }

    /// Age of a still-valid entry.
    pub fn age_ms(&self, now_ms: u64) -> Option<u64> {
        self.get(now_ms)?;
        self.slot
            .as_ref()
            .map(|cached| now_ms.saturating_sub(cached.stored_at_ms))
    }
}
