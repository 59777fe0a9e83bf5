//! Pipeline event log: one structured line per run event on a dedicated target.

use tracing::info;

use snapsolve_core::RunEvent;

use crate::redact::redact_json;

/// Filter on this target to get only run events.
pub const PIPELINE_EVENTS_TARGET: &str = "pipeline_events";

pub struct PipelineEventLogger;

impl PipelineEventLogger {
    /// Emit `event` with its payload redacted.
    pub fn log(event: &RunEvent) {
        let payload = redact_json(&event.payload);
        info!(
            target: PIPELINE_EVENTS_TARGET,
            run_id = %event.run_id,
            event_id = %event.id,
            kind = %event.kind,
            timestamp = %event.timestamp.to_rfc3339(),
            payload = %payload,
            "Pipeline event"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use snapsolve_core::RunEventKind;

    #[test]
    fn test_log_without_subscriber_does_not_panic() {
        let event = RunEvent::new(
            uuid::Uuid::new_v4(),
            RunEventKind::AiRequested,
            serde_json::json!({"provider": "gemini", "url": "https://x/v1/models?key=AIzaSyA1234567890abcdefghij"}),
        );
        PipelineEventLogger::log(&event);
    }
}
