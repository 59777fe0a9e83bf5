//! Structured logging for snapsolve.
//!
//! Handles secret redaction, console and rolling JSON file output, and the
//! per-run pipeline event log.

pub mod event_logger;
pub mod logger;
pub mod redact;

pub use event_logger::{PipelineEventLogger, PIPELINE_EVENTS_TARGET};
pub use logger::init_logger;
pub use redact::{redact_json, redact_sensitive_data};
