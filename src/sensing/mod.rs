pub mod classify;
pub mod ledger;
pub mod source;
pub mod tabs;
pub mod tracker;
pub mod window;

pub use source::{
    ActiveFocusSource, ContentSignals, FocusObservation, ItemSetSource, ObservationSource,
    SourceError, TabObservation, WindowBounds,
};
pub use tabs::{TabSetSnapshot, TabSetState, TabTracker};
pub use tracker::{PollOutcome, SampledState, SampledStateTracker};
pub use window::{WindowSnapshot, WindowState, WindowTracker};
