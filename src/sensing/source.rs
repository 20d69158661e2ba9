//! Capabilities the trackers consume. Implementations live in the desktop
//! shell (accessibility APIs, browser extension bridge); the core only sees
//! these traits.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SourceError {
    #[error("source unavailable: {0}")]
    Unavailable(String),

    #[error("source did not answer within {0}ms")]
    Timeout(u64),

    #[error("nothing to report this cycle")]
    Empty,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WindowBounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// The focused window at one instant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FocusObservation {
    /// Stable window identity, e.g. `"<bundle id>:<window id>"`.
    pub id: String,
    pub title: String,
    pub app_name: String,
    /// Bundle identifier or executable path.
    pub app_path: String,
    pub bounds: Option<WindowBounds>,
    /// Input events seen since the previous sample.
    #[serde(default)]
    pub interactions: u32,
}

/// One open tab at one instant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TabObservation {
    pub id: String,
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub interactions: u32,
}

/// On-demand enrichment for a single tab.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ContentSignals {
    pub headings: Vec<String>,
    pub excerpt: String,
    pub word_count: u64,
    pub scroll_depth: Option<f64>,
}

#[async_trait]
pub trait ActiveFocusSource: Send + Sync {
    /// `Ok(None)` means the platform had nothing focused to report.
    async fn query(&self) -> Result<Option<FocusObservation>, SourceError>;
}

#[async_trait]
pub trait ItemSetSource: Send + Sync {
    async fn query(&self) -> Result<Vec<TabObservation>, SourceError>;

    /// Expensive content extraction, only called while composing an analysis.
    async fn extract_detail(&self, _id: &str) -> Result<Option<ContentSignals>, SourceError> {
        Ok(None)
    }
}

/// What a polling tracker needs from any source: one sample per call.
#[async_trait]
pub trait ObservationSource<O>: Send + Sync {
    async fn observe(&self) -> Result<O, SourceError>;
}

#[async_trait]
impl ObservationSource<FocusObservation> for Arc<dyn ActiveFocusSource> {
    async fn observe(&self) -> Result<FocusObservation, SourceError> {
        self.query().await?.ok_or(SourceError::Empty)
    }
}

#[async_trait]
impl ObservationSource<Vec<TabObservation>> for Arc<dyn ItemSetSource> {
    async fn observe(&self) -> Result<Vec<TabObservation>, SourceError> {
        self.query().await
    }
}
