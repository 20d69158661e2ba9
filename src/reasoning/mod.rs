pub mod cache;
pub mod composer;
pub mod gate;
pub mod memory;
pub mod oracle;
pub mod orchestrator;
pub mod temporal;

pub use cache::{AnalysisCache, CachedAnalysis};
pub use composer::{ContextComposer, ContextPayload, ContextSources, ItemDetail};
pub use gate::{GateDecision, GateStatus, RateLimitedRefreshGate};
pub use memory::{
    compute_significance, derive_tags, ContextDigest, MemoryEntry, SignificanceMemory,
};
pub use oracle::{
    parse_analysis, OracleError, OracleRequest, ReasoningError, ReasoningOracle,
    ANALYSIS_INSTRUCTION,
};
pub use orchestrator::{ReasoningOrchestrator, RefreshOutcome};
pub use temporal::{FocusSession, SemanticState, StateTransition, TemporalContext};
