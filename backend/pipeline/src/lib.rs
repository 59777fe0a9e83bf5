//! The snapsolve orchestrator.
//!
//! One run walks `Idle → Capturing → Cropping → ExtractingText → AwaitingAi →
//! Done`, strictly in that order. Every stage failure ends the run in
//! `Done(failure)` with a `PipelineResult`; nothing escapes to the caller.

pub mod builder;
pub mod orchestrator;
pub mod run;
pub mod service;

pub use builder::{build_ocr_chain, build_ocr_providers, retry_policy, DEFAULT_HF_OCR_MODEL, DEFAULT_OLLAMA_VISION_MODEL};
pub use orchestrator::{Orchestrator, Selection};
pub use run::{RunReport, RunTracker};
pub use service::serve;

pub use snapsolve_core::{open_channel, BackgroundEndpoint, UiEndpoint};
