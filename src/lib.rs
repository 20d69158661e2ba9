//! FlowSync core: samples the active window and open tabs, scores engagement,
//! and asks a reasoning oracle for a rate-limited, cached focus analysis.

pub mod clock;
pub mod config;
pub mod engine;
pub mod metrics;
pub mod models;
pub mod reasoning;
pub mod scoring;
pub mod sensing;
pub mod utils;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::FocusConfig;
pub use engine::{ChangeWatcher, FocusEngine, WatchOutcome};
pub use metrics::SessionStats;
pub use models::{AnalysisResult, FocusBand, FocusState, RecommendedAction};
pub use reasoning::{
    OracleError, OracleRequest, ReasoningOracle, ReasoningOrchestrator, RefreshOutcome,
};
pub use sensing::{
    ActiveFocusSource, ContentSignals, FocusObservation, ItemSetSource, SourceError,
    TabObservation,
};
pub use utils::init_logging;
