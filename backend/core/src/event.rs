use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Something that happened during one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunEvent {
    pub id: Uuid,
    pub run_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub kind: RunEventKind,
    pub payload: serde_json::Value,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RunEventKind {
    /// The selection was too small or dismissed; the run ends at idle
    SelectionDiscarded,
    /// The run moved to a new state
    StateChanged,
    /// An OCR provider is being tried
    OcrAttempt,
    /// An OCR provider failed and the chain advanced
    OcrProviderFailed,
    /// The user was asked to type the question
    ManualInputRequested,
    /// The AI backend was called
    AiRequested,
    /// The run reached `Done(success)`
    RunCompleted,
    /// The run reached `Done(failure)`
    RunFailed,
}

impl RunEvent {
    pub fn new(run_id: Uuid, kind: RunEventKind, payload: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            run_id,
            timestamp: Utc::now(),
            kind,
            payload,
        }
    }
}

impl std::fmt::Display for RunEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::SelectionDiscarded => "selection_discarded",
            Self::StateChanged => "state_changed",
            Self::OcrAttempt => "ocr_attempt",
            Self::OcrProviderFailed => "ocr_provider_failed",
            Self::ManualInputRequested => "manual_input_requested",
            Self::AiRequested => "ai_requested",
            Self::RunCompleted => "run_completed",
            Self::RunFailed => "run_failed",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let event = RunEvent::new(
            Uuid::new_v4(),
            RunEventKind::OcrProviderFailed,
            serde_json::json!({"provider": "ocr_space", "error": "timed out"}),
        );
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("ocr_provider_failed"));
        let back: RunEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back.kind, RunEventKind::OcrProviderFailed);
        assert_eq!(back.run_id, event.run_id);
    }
}
