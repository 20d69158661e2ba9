use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::models::{AnalysisResult, FocusState, RecommendedAction};

/// A stretch of time spent in one focus state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FocusSession {
    pub state: FocusState,
    pub task: String,
    pub started_at_ms: u64,
    /// `None` while this is the open session.
    pub ended_at_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StateTransition {
    pub at_ms: u64,
    pub from: FocusState,
    pub to: FocusState,
}

/// Session timeline, updated only after a successful analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemporalContext {
    pub session_start_ms: u64,
    pub last_activity_ms: u64,
    pub focus_sessions: VecDeque<FocusSession>,
    pub transitions: VecDeque<StateTransition>,
    /// Sessions opened since start; `focus_sessions` only keeps the latest.
    #[serde(default)]
    pub sessions_started: usize,
    #[serde(skip)]
    capacity: usize,
}

impl TemporalContext {
    pub fn new(session_start_ms: u64, capacity: usize) -> Self {
        Self {
            session_start_ms,
            last_activity_ms: session_start_ms,
            focus_sessions: VecDeque::new(),
            transitions: VecDeque::new(),
            sessions_started: 0,
            capacity: capacity.max(1),
        }
    }

    pub fn record(&mut self, analysis: &AnalysisResult, now_ms: u64) {
        self.last_activity_ms = now_ms;

        let previous = self.focus_sessions.back().map(|session| session.state);
        match previous {
            Some(state) if state == analysis.focus_state => {
                if let Some(open) = self.focus_sessions.back_mut() {
                    open.task = analysis.current_task.clone();
                }
            }
            _ => {
                if let Some(from) = previous {
                    if let Some(open) = self.focus_sessions.back_mut() {
                        open.ended_at_ms = Some(now_ms);
                    }
                    self.transitions.push_back(StateTransition {
                        at_ms: now_ms,
                        from,
                        to: analysis.focus_state,
                    });
                    if self.transitions.len() > self.capacity {
                        self.transitions.pop_front();
                    }
                }
                self.focus_sessions.push_back(FocusSession {
                    state: analysis.focus_state,
                    task: analysis.current_task.clone(),
                    started_at_ms: now_ms,
                    ended_at_ms: None,
                });
                self.sessions_started += 1;
                if self.focus_sessions.len() > self.capacity {
                    self.focus_sessions.pop_front();
                }
            }
        }
    }

    pub fn session_duration_ms(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.session_start_ms)
    }

    /// How long the open focus session has lasted.
    pub fn current_state_duration_ms(&self, now_ms: u64) -> Option<u64> {
        self.focus_sessions
            .back()
            .map(|session| now_ms.saturating_sub(session.started_at_ms))
    }
}

/// What the last successful analysis concluded; the prior for significance.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SemanticState {
    pub current_task: Option<String>,
    pub focus_state: Option<FocusState>,
    pub last_action: Option<RecommendedAction>,
    pub recent_topics: Vec<String>,
}

const RECENT_TOPICS_MAX: usize = 10;

impl SemanticState {
    pub fn record(&mut self, analysis: &AnalysisResult, tags: &[String]) {
        self.current_task = Some(analysis.current_task.clone());
        self.focus_state = Some(analysis.focus_state);
        self.last_action = Some(analysis.action);

        for tag in tags.iter().rev() {
            self.recent_topics.retain(|existing| existing != tag);
            self.recent_topics.insert(0, tag.clone());
        }
        self.recent_topics.truncate(RECENT_TOPICS_MAX);
    }

    /// Whether `task` differs from the remembered one. No prior means no change.
    pub fn is_task_change(&self, task: &str) -> bool {
        self.current_task
            .as_deref()
            .is_some_and(|previous| !previous.eq_ignore_ascii_case(task.trim()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analysis(state: FocusState, task: &str) -> AnalysisResult {
        AnalysisResult {
            focus_state: state,
            current_task: task.to_string(),
            ..AnalysisResult::safe_default()
        }
    }

    #[test]
    fn same_state_extends_the_open_session() {
        let mut temporal = TemporalContext::new(0, 50);
        temporal.record(&analysis(FocusState::Focused, "review"), 20_000);
        temporal.record(&analysis(FocusState::Focused, "review"), 60_000);

        assert_eq!(temporal.focus_sessions.len(), 1);
        assert!(temporal.transitions.is_empty());
        assert_eq!(temporal.last_activity_ms, 60_000);
        assert_eq!(temporal.current_state_duration_ms(70_000), Some(50_000));
    }

    #[test]
    fn state_change_closes_session_and_logs_transition() {
        let mut temporal = TemporalContext::new(0, 50);
        temporal.record(&analysis(FocusState::Focused, "review"), 20_000);
        temporal.record(&analysis(FocusState::Distracted, "browsing"), 90_000);

        assert_eq!(temporal.focus_sessions.len(), 2);
        assert_eq!(temporal.focus_sessions[0].ended_at_ms, Some(90_000));
        assert_eq!(
            temporal.transitions[0],
            StateTransition {
                at_ms: 90_000,
                from: FocusState::Focused,
                to: FocusState::Distracted
            }
        );
    }

    #[test]
    fn timeline_is_bounded() {
        let mut temporal = TemporalContext::new(0, 3);
        let states = [FocusState::Focused, FocusState::Distracted];
        for step in 0..10u64 {
            temporal.record(&analysis(states[(step % 2) as usize], "t"), step * 1_000);
        }
        assert_eq!(temporal.focus_sessions.len(), 3);
        assert_eq!(temporal.transitions.len(), 3);
        assert_eq!(temporal.sessions_started, 10);
    }

    #[test]
    fn semantic_state_tracks_task_and_topics() {
        let mut semantic = SemanticState::default();
        assert!(!semantic.is_task_change("anything"));

        semantic.record(
            &analysis(FocusState::Focused, "Code review"),
            &["rust".into(), "github".into()],
        );
        assert!(!semantic.is_task_change("code review"));
        assert!(semantic.is_task_change("Writing docs"));

        semantic.record(
            &analysis(FocusState::Focused, "Writing docs"),
            &["docs".into(), "rust".into()],
        );
        assert_eq!(semantic.recent_topics, vec!["docs", "rust", "github"]);
    }
}
