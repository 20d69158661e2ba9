use std::sync::{Arc, Mutex, MutexGuard};

use tokio::task::JoinSet;
use tokio::time::{self, Duration};

use crate::clock::Clock;
use crate::config::{FocusConfig, ReasoningConfig, SignificanceConfig};
use crate::metrics::{self, SessionStats, StatsSources};
use crate::models::AnalysisResult;
use crate::sensing::{ItemSetSource, TabSetSnapshot, TabTracker, WindowTracker};

use super::cache::{AnalysisCache, CachedAnalysis};
use super::composer::{ContextComposer, ContextPayload, ContextSources, ItemDetail};
use super::gate::{GateDecision, RateLimitedRefreshGate};
use super::memory::{
    compute_significance, derive_tags, ContextDigest, MemoryEntry, SignificanceMemory,
};
use super::oracle::{parse_analysis, OracleRequest, ReasoningError, ReasoningOracle};
use super::temporal::{SemanticState, TemporalContext};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

struct ReasoningState {
    cache: AnalysisCache,
    gate: RateLimitedRefreshGate,
    memory: SignificanceMemory,
    temporal: TemporalContext,
    semantic: SemanticState,
    last_good: Option<CachedAnalysis>,
}

struct Inner {
    state: Mutex<ReasoningState>,
    oracle: Arc<dyn ReasoningOracle>,
    clock: Arc<dyn Clock>,
    window: WindowTracker,
    tabs: TabTracker,
    detail_source: Arc<dyn ItemSetSource>,
    composer: ContextComposer,
    config: ReasoningConfig,
    significance: SignificanceConfig,
    fallback: Arc<AnalysisResult>,
}

fn lock(state: &Mutex<ReasoningState>) -> MutexGuard<'_, ReasoningState> {
    match state.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Returns the gate to idle however the call ends, including cancellation.
struct InFlightGuard<'a> {
    state: &'a Mutex<ReasoningState>,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        lock(self.state).gate.end_call();
    }
}

/// What became of one refresh attempt.
#[derive(Debug)]
pub enum RefreshOutcome {
    /// The oracle answered and the analysis was stored.
    Committed(Arc<AnalysisResult>),
    Denied(GateDecision),
    Failed(ReasoningError),
}

impl RefreshOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, RefreshOutcome::Committed(_))
    }
}

/// Serves analyses from cache, rate-limits fresh ones and turns every
/// failure into the safe default.
#[derive(Clone)]
pub struct ReasoningOrchestrator {
    inner: Arc<Inner>,
}

impl ReasoningOrchestrator {
    pub fn new(
        config: &FocusConfig,
        clock: Arc<dyn Clock>,
        oracle: Arc<dyn ReasoningOracle>,
        window: WindowTracker,
        tabs: TabTracker,
        detail_source: Arc<dyn ItemSetSource>,
    ) -> Self {
        let now_ms = clock.now_ms();
        let reasoning = config.reasoning.clone();

        let state = ReasoningState {
            cache: AnalysisCache::new(reasoning.cache_ttl_ms),
            gate: RateLimitedRefreshGate::new(
                now_ms,
                reasoning.min_interval_ms,
                reasoning.initialization_delay_ms,
            ),
            memory: SignificanceMemory::new(&config.significance),
            temporal: TemporalContext::new(now_ms, reasoning.temporal_capacity),
            semantic: SemanticState::default(),
            last_good: None,
        };

        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(state),
                oracle,
                clock,
                window,
                tabs,
                detail_source,
                composer: ContextComposer::new(reasoning.history_limit),
                config: reasoning,
                significance: config.significance.clone(),
                fallback: Arc::new(AnalysisResult::safe_default()),
            }),
        }
    }

    /// Current analysis. Never fails: a denied or failed refresh yields the
    /// cached value or the safe default.
    pub async fn get_analysis(&self, force: bool) -> Arc<AnalysisResult> {
        if !force {
            if let Some(hit) = self.cached() {
                return hit;
            }
        }

        match self.attempt(force).await {
            RefreshOutcome::Committed(analysis) => analysis,
            RefreshOutcome::Denied(_) | RefreshOutcome::Failed(_) => self.cached_or_default(),
        }
    }

    /// Refresh after a workspace change: no cache short-circuit, full gate.
    /// Only `Committed` means the change reached the oracle and was stored.
    pub async fn refresh_on_change(&self) -> RefreshOutcome {
        self.attempt(false).await
    }

    /// Whether a non-forced refresh would be admitted right now.
    pub fn may_refresh(&self) -> bool {
        let now_ms = self.inner.clock.now_ms();
        lock(&self.inner.state).gate.may_refresh(now_ms)
    }

    /// Most recent successful analysis and its age, even after the cache expired.
    pub fn last_known_good(&self) -> Option<(Arc<AnalysisResult>, u64)> {
        let now_ms = self.inner.clock.now_ms();
        lock(&self.inner.state).last_good.as_ref().map(|cached| {
            (
                Arc::clone(&cached.result),
                now_ms.saturating_sub(cached.stored_at_ms),
            )
        })
    }

    pub fn session_stats(&self) -> SessionStats {
        let now_ms = self.inner.clock.now_ms();
        let state = lock(&self.inner.state);
        metrics::collect(
            StatsSources {
                memory: &state.memory,
                temporal: &state.temporal,
                cache: &state.cache,
                last_good: state.last_good.as_ref().map(|cached| cached.result.as_ref()),
            },
            now_ms,
        )
    }

    pub fn memory_len(&self) -> usize {
        lock(&self.inner.state).memory.len()
    }

    fn cached(&self) -> Option<Arc<AnalysisResult>> {
        let now_ms = self.inner.clock.now_ms();
        lock(&self.inner.state).cache.get(now_ms)
    }

    fn cached_or_default(&self) -> Arc<AnalysisResult> {
        self.cached().unwrap_or_else(|| Arc::clone(&self.inner.fallback))
    }

    async fn attempt(&self, forced: bool) -> RefreshOutcome {
        let inner = &self.inner;
        let now_ms = inner.clock.now_ms();

        {
            let mut state = lock(&inner.state);
            let decision = state.gate.try_begin(now_ms, forced);
            if decision != GateDecision::Allowed {
                log_debug!("analysis refresh denied (forced={forced}): {decision:?}");
                return RefreshOutcome::Denied(decision);
            }
            if forced {
                state.cache.invalidate();
            }
        }

        let _in_flight = InFlightGuard { state: &inner.state };
        log_info!("requesting fresh analysis (forced={forced})");

        let window = inner.window.snapshot();
        let tabs = inner.tabs.snapshot();
        let details = self.collect_details(&tabs).await;
        let digest = ContextDigest::from_snapshots(&window, &tabs);

        let payload = {
            let state = lock(&inner.state);
            let memories = state.memory.retrieve(now_ms, inner.config.memory_limit);
            inner.composer.compose(
                ContextSources {
                    window: &window,
                    tabs: &tabs,
                    memories: &memories,
                    temporal: &state.temporal,
                    semantic: &state.semantic,
                    details,
                },
                now_ms,
            )
        };

        match self.infer(&payload).await {
            Ok(analysis) => RefreshOutcome::Committed(self.commit(analysis, digest)),
            Err(err) => {
                log_warn!("analysis failed, serving cached or safe default: {err}");
                RefreshOutcome::Failed(err)
            }
        }
    }

    async fn infer(&self, payload: &ContextPayload) -> Result<AnalysisResult, ReasoningError> {
        let timeout_ms = self.inner.config.oracle_timeout_ms;
        let request = OracleRequest::new(payload.to_json());

        let text = time::timeout(
            Duration::from_millis(timeout_ms),
            self.inner.oracle.infer(&request),
        )
        .await
        .map_err(|_| ReasoningError::OracleTimeout(timeout_ms))??;

        parse_analysis(&text)
    }

    /// Store a validated analysis everywhere it belongs.
    fn commit(&self, analysis: AnalysisResult, digest: ContextDigest) -> Arc<AnalysisResult> {
        let inner = &self.inner;
        let now_ms = inner.clock.now_ms();
        let analysis = Arc::new(analysis);

        let mut state = lock(&inner.state);
        let significance =
            compute_significance(&analysis, Some(&state.semantic), &inner.significance);
        let tags = derive_tags(&analysis, &digest);

        state.cache.set(Arc::clone(&analysis), now_ms);
        state.last_good = Some(CachedAnalysis {
            result: Arc::clone(&analysis),
            stored_at_ms: now_ms,
        });
        state.temporal.record(&analysis, now_ms);
        state.semantic.record(&analysis, &tags);
        state.memory.append(MemoryEntry::new(
            now_ms,
            digest,
            Arc::clone(&analysis),
            significance,
            tags,
        ));

        log_info!(
            "analysis stored: state={} score={} significance={significance:.2}",
            analysis.focus_state.as_str(),
            analysis.focus_score
        );
        analysis
    }

    /// Content signals for the active tab and the most engaged open tabs.
    /// Failures and timeouts just drop that tab's detail.
    async fn collect_details(&self, tabs: &TabSetSnapshot) -> Vec<ItemDetail> {
        let limit = self.inner.config.detail_limit;
        if limit == 0 {
            return Vec::new();
        }

        let mut ids: Vec<String> = Vec::with_capacity(limit);
        let candidates = tabs
            .active
            .iter()
            .chain(tabs.most_engaged(limit).into_iter());
        for activity in candidates {
            if ids.len() == limit {
                break;
            }
            if !ids.contains(&activity.item.id) {
                ids.push(activity.item.id.clone());
            }
        }

        let timeout = Duration::from_millis(self.inner.config.detail_timeout_ms);
        let mut set = JoinSet::new();
        for (index, id) in ids.into_iter().enumerate() {
            let source = Arc::clone(&self.inner.detail_source);
            set.spawn(async move {
                let outcome = time::timeout(timeout, source.extract_detail(&id)).await;
                (index, id, outcome)
            });
        }

        let mut details = Vec::new();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((index, id, Ok(Ok(Some(signals))))) => {
                    details.push((index, ItemDetail { id, signals }));
                }
                Ok((_, _, Ok(Ok(None)))) => {}
                Ok((_, id, Ok(Err(err)))) => log_debug!("detail for {id} unavailable: {err}"),
                Ok((_, id, Err(_))) => log_debug!("detail for {id} timed out"),
                Err(err) => log_warn!("detail task failed: {err}"),
            }
        }
        details.sort_by_key(|(index, _)| *index);
        details.into_iter().map(|(_, detail)| detail).collect()
    }
}
