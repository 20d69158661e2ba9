pub mod analysis;
pub mod item;

pub use analysis::{
    AnalysisResult, FocusBand, FocusState, RecommendedAction, ANALYSIS_SCHEMA_VERSION,
};
pub use item::{ActivityCounters, HistoryEntry, ItemActivity, ItemCategory, TrackedItem};
