use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use snapsolve_core::{PipelineError, PipelineResult, PipelineState, RunEvent, RunEventKind};
use snapsolve_logging::PipelineEventLogger;

/// State and event history of one pipeline run.
///
/// No state is shared between runs; each gets its own tracker.
#[derive(Debug)]
pub struct RunTracker {
    run_id: Uuid,
    state: PipelineState,
    transitions: Vec<PipelineState>,
    events: Vec<RunEvent>,
}

impl RunTracker {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            state: PipelineState::Idle,
            transitions: vec![PipelineState::Idle],
            events: Vec::new(),
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Move forward to `next`. Going back, staying put or leaving `Done` is refused.
    pub fn advance(&mut self, next: PipelineState) -> Result<(), PipelineError> {
        if self.state.is_terminal() || next.ordinal() <= self.state.ordinal() {
            return Err(PipelineError::Internal(format!(
                "illegal state transition {} -> {}",
                self.state, next
            )));
        }
        debug!(run_id = %self.run_id, from = %self.state, to = %next, "State transition");
        let from = self.state;
        self.state = next;
        self.transitions.push(next);
        self.record(
            RunEventKind::StateChanged,
            json!({ "from": from.to_string(), "to": next.to_string() }),
        );
        Ok(())
    }

    /// Append an event and emit it on the pipeline event log.
    pub fn record(&mut self, kind: RunEventKind, payload: Value) {
        let event = RunEvent::new(self.run_id, kind, payload);
        PipelineEventLogger::log(&event);
        self.events.push(event);
    }

    /// Close the run with a success.
    pub fn succeed(self, extracted_text: String, answer: String) -> RunReport {
        self.finish(PipelineResult::answered(extracted_text, answer))
    }

    /// Close the run with a failure, keeping any text recognized so far.
    pub fn fail(self, error: &PipelineError, extracted_text: Option<String>) -> RunReport {
        self.finish(PipelineResult::failed(error, extracted_text))
    }

    /// End at idle without a result.
    pub fn discard(mut self, reason: &str) -> RunReport {
        self.record(RunEventKind::SelectionDiscarded, json!({ "reason": reason }));
        self.into_report(None)
    }

    fn finish(mut self, result: PipelineResult) -> RunReport {
        let done = PipelineState::Done {
            success: result.success,
        };
        if let Err(e) = self.advance(done) {
            debug!(run_id = %self.run_id, error = %e, "Run already finished");
        }
        let kind = if result.success {
            RunEventKind::RunCompleted
        } else {
            RunEventKind::RunFailed
        };
        self.record(
            kind,
            json!({
                "errorKind": result.error_kind,
                "error": result.error,
            }),
        );
        self.into_report(Some(result))
    }

    fn into_report(self, result: Option<PipelineResult>) -> RunReport {
        RunReport {
            run_id: self.run_id,
            final_state: self.state,
            transitions: self.transitions,
            events: self.events,
            result,
        }
    }
}

impl Default for RunTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything one run produced.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: Uuid,
    pub final_state: PipelineState,
    /// States visited, starting with `Idle`.
    pub transitions: Vec<PipelineState>,
    pub events: Vec<RunEvent>,
    /// `None` when the selection was discarded before capture.
    pub result: Option<PipelineResult>,
}

impl RunReport {
    pub fn events_of(&self, kind: RunEventKind) -> impl Iterator<Item = &RunEvent> {
        self.events.iter().filter(move |e| e.kind == kind)
    }
}
