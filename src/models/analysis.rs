use serde::{Deserialize, Serialize};

pub const ANALYSIS_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FocusState {
    Peak,
    Focused,
    Neutral,
    Distracted,
    Fatigued,
}

impl FocusState {
    pub fn as_str(&self) -> &'static str {
        match self {
            FocusState::Peak => "peak",
            FocusState::Focused => "focused",
            FocusState::Neutral => "neutral",
            FocusState::Distracted => "distracted",
            FocusState::Fatigued => "fatigued",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum RecommendedAction {
    #[default]
    Maintain,
    TakeBreak,
    CloseDistractions,
    DeepenFocus,
    SwitchTask,
}

impl RecommendedAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecommendedAction::Maintain => "maintain",
            RecommendedAction::TakeBreak => "take_break",
            RecommendedAction::CloseDistractions => "close_distractions",
            RecommendedAction::DeepenFocus => "deepen_focus",
            RecommendedAction::SwitchTask => "switch_task",
        }
    }
}

/// Coarse ambient band derived from `focus_score`, used by lighting and
/// similar low-resolution surfaces.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FocusBand {
    Fatigued,
    WarmingUp,
    Engaged,
    DeepFlow,
}

impl FocusBand {
    pub fn from_score(focus_score: u8) -> Self {
        match focus_score {
            0..=19 => FocusBand::Fatigued,
            20..=49 => FocusBand::WarmingUp,
            50..=79 => FocusBand::Engaged,
            _ => FocusBand::DeepFlow,
        }
    }
}

/// Validated oracle verdict on the current workspace.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisResult {
    pub schema_version: u32,
    pub focus_state: FocusState,
    pub confidence: f64,
    pub focus_score: u8,
    pub cognitive_load: u8,
    pub current_task: String,
    pub task_changed: bool,
    pub action: RecommendedAction,
    pub distracting_items: Vec<String>,
    pub summary: String,
    pub tags: Vec<String>,
}

impl AnalysisResult {
    /// Neutral answer served whenever no trustworthy analysis is available.
    pub fn safe_default() -> Self {
        Self {
            schema_version: ANALYSIS_SCHEMA_VERSION,
            focus_state: FocusState::Neutral,
            confidence: 0.0,
            focus_score: 50,
            cognitive_load: 50,
            current_task: "unknown".to_string(),
            task_changed: false,
            action: RecommendedAction::Maintain,
            distracting_items: Vec::new(),
            summary: String::new(),
            tags: Vec::new(),
        }
    }

    pub fn band(&self) -> FocusBand {
        FocusBand::from_score(self.focus_score)
    }

    pub fn is_safe_default(&self) -> bool {
        self == &Self::safe_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safe_default_is_mid_scale_and_maintain() {
        let default = AnalysisResult::safe_default();
        assert_eq!(default.action, RecommendedAction::Maintain);
        assert_eq!(default.confidence, 0.0);
        assert_eq!(default.focus_score, 50);
        assert_eq!(default.cognitive_load, 50);
        assert!(default.is_safe_default());
    }

    #[test]
    fn bands_follow_score_thresholds() {
        assert_eq!(FocusBand::from_score(0), FocusBand::Fatigued);
        assert_eq!(FocusBand::from_score(19), FocusBand::Fatigued);
        assert_eq!(FocusBand::from_score(20), FocusBand::WarmingUp);
        assert_eq!(FocusBand::from_score(50), FocusBand::Engaged);
        assert_eq!(FocusBand::from_score(80), FocusBand::DeepFlow);
        assert_eq!(FocusBand::from_score(100), FocusBand::DeepFlow);
    }
}
