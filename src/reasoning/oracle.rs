use async_trait::async_trait;
use serde::Deserialize;

use crate::models::{
    AnalysisResult, FocusState, RecommendedAction, ANALYSIS_SCHEMA_VERSION,
};

const MAX_TAGS: usize = 12;

/// Instruction sent with every context payload.
pub const ANALYSIS_INSTRUCTION: &str = "\
You assess a person's focus from a snapshot of their workspace. \
Reply with exactly one JSON object and nothing else, using these fields: \
schema_version (always 1), \
focus_state (one of peak, focused, neutral, distracted, fatigued), \
confidence (0.0 to 1.0), \
focus_score (integer 0 to 100), \
cognitive_load (integer 0 to 100), \
current_task (short non-empty label), \
task_changed (bool, optional), \
action (one of maintain, take_break, close_distractions, deepen_focus, switch_task), \
distracting_items (list of item ids, optional), \
summary (one sentence, optional), \
tags (at most 12 short lowercase topics, optional). \
Do not add other fields.";

/// Transport-level failure reported by an oracle implementation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OracleError {
    #[error("Oracle unavailable: {message}")]
    Unavailable { message: String },

    #[error("Rate limited by oracle")]
    RateLimited,

    #[error("Oracle rejected request: {message}")]
    Rejected { message: String },
}

impl OracleError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected {
            message: message.into(),
        }
    }
}

/// Why an analysis attempt produced no result.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ReasoningError {
    #[error("Oracle did not answer within {0}ms")]
    OracleTimeout(u64),

    #[error(transparent)]
    Oracle(#[from] OracleError),

    #[error("Malformed analysis: {0}")]
    MalformedResult(String),
}

#[derive(Debug, Clone)]
pub struct OracleRequest {
    pub instruction: String,
    /// Serialized context payload.
    pub payload: String,
}

impl OracleRequest {
    pub fn new(payload: String) -> Self {
        Self {
            instruction: ANALYSIS_INSTRUCTION.to_string(),
            payload,
        }
    }
}

/// External reasoning service. Implementations may fail or return any text.
#[async_trait]
pub trait ReasoningOracle: Send + Sync {
    async fn infer(&self, request: &OracleRequest) -> Result<String, OracleError>;
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawAnalysis {
    schema_version: u32,
    focus_state: FocusState,
    confidence: f64,
    focus_score: i64,
    cognitive_load: i64,
    current_task: String,
    #[serde(default)]
    task_changed: bool,
    action: RecommendedAction,
    #[serde(default)]
    distracting_items: Vec<String>,
    #[serde(default)]
    summary: String,
    #[serde(default)]
    tags: Vec<String>,
}

/// Unwrap a reply fenced as ```json ... ``` or ``` ... ```.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(body) = rest.trim_end().strip_suffix("```") else {
        return trimmed;
    };
    // Drop the info string on the opening line.
    match body.find('\n') {
        Some(newline) => body[newline + 1..].trim(),
        None => body.trim(),
    }
}

fn percent(field: &str, value: i64) -> Result<u8, ReasoningError> {
    u8::try_from(value)
        .ok()
        .filter(|v| *v <= 100)
        .ok_or_else(|| ReasoningError::MalformedResult(format!("{field} out of range: {value}")))
}

/// Parse and validate an oracle reply against analysis schema v1.
pub fn parse_analysis(text: &str) -> Result<AnalysisResult, ReasoningError> {
    let body = strip_code_fence(text);
    let raw: RawAnalysis = serde_json::from_str(body)
        .map_err(|e| ReasoningError::MalformedResult(e.to_string()))?;

    if raw.schema_version != ANALYSIS_SCHEMA_VERSION {
        return Err(ReasoningError::MalformedResult(format!(
            "unsupported schema_version {}",
            raw.schema_version
        )));
    }
    if !(0.0..=1.0).contains(&raw.confidence) {
        return Err(ReasoningError::MalformedResult(format!(
            "confidence out of range: {}",
            raw.confidence
        )));
    }
    let focus_score = percent("focus_score", raw.focus_score)?;
    let cognitive_load = percent("cognitive_load", raw.cognitive_load)?;

    let current_task = raw.current_task.trim().to_string();
    if current_task.is_empty() {
        return Err(ReasoningError::MalformedResult(
            "current_task is empty".to_string(),
        ));
    }
    if raw.tags.len() > MAX_TAGS {
        return Err(ReasoningError::MalformedResult(format!(
            "too many tags: {}",
            raw.tags.len()
        )));
    }

    Ok(AnalysisResult {
        schema_version: raw.schema_version,
        focus_state: raw.focus_state,
        confidence: raw.confidence,
        focus_score,
        cognitive_load,
        current_task,
        task_changed: raw.task_changed,
        action: raw.action,
        distracting_items: raw.distracting_items,
        summary: raw.summary,
        tags: raw.tags,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"{
        "schema_version": 1,
        "focus_state": "focused",
        "confidence": 0.9,
        "focus_score": 72,
        "cognitive_load": 40,
        "current_task": "Reviewing a pull request",
        "action": "close_distractions",
        "distracting_items": ["3"],
        "tags": ["rust", "code-review"]
    }"#;

    #[test]
    fn parses_a_valid_reply() {
        let analysis = parse_analysis(VALID).unwrap();
        assert_eq!(analysis.focus_state, FocusState::Focused);
        assert_eq!(analysis.focus_score, 72);
        assert_eq!(analysis.action, RecommendedAction::CloseDistractions);
        assert!(!analysis.task_changed);
        assert_eq!(analysis.summary, "");
        assert_eq!(analysis.distracting_items, vec!["3"]);
    }

    #[test]
    fn unwraps_code_fences() {
        let fenced = format!("```json\n{VALID}\n```");
        assert!(parse_analysis(&fenced).is_ok());
        let bare = format!("```\n{VALID}\n```\n");
        assert!(parse_analysis(&bare).is_ok());
    }

    #[test]
    fn rejects_unknown_fields_and_prose() {
        let extra = VALID.replacen(
            "\"schema_version\": 1,",
            "\"schema_version\": 1, \"mood\": \"good\",",
            1,
        );
        assert!(matches!(parse_analysis(&extra), Err(ReasoningError::MalformedResult(_))));
        assert!(matches!(
            parse_analysis("I think the user is focused."),
            Err(ReasoningError::MalformedResult(_))
        ));
    }

    #[test]
    fn rejects_out_of_range_values() {
        let cases = [
            VALID.replace("\"confidence\": 0.9", "\"confidence\": 1.5"),
            VALID.replace("\"focus_score\": 72", "\"focus_score\": 101"),
            VALID.replace("\"cognitive_load\": 40", "\"cognitive_load\": -1"),
            VALID.replace("\"schema_version\": 1", "\"schema_version\": 2"),
            VALID.replace("Reviewing a pull request", "  "),
            VALID.replace("\"focus_state\": \"focused\"", "\"focus_state\": \"zoned\""),
        ];
        for case in cases {
            assert!(
                matches!(parse_analysis(&case), Err(ReasoningError::MalformedResult(_))),
                "accepted: {case}"
            );
        }
    }

    #[test]
    fn rejects_too_many_tags() {
        let tags: Vec<String> = (0..13).map(|i| format!("\"t{i}\"")).collect();
        let reply = VALID.replace(
            "[\"rust\", \"code-review\"]",
            &format!("[{}]", tags.join(", ")),
        );
        assert!(matches!(parse_analysis(&reply), Err(ReasoningError::MalformedResult(_))));
    }

    #[test]
    fn oracle_errors_convert() {
        let err: ReasoningError = OracleError::unavailable("connection refused").into();
        assert_eq!(err.to_string(), "Oracle unavailable: connection refused");
    }
}
