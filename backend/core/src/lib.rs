pub mod channel;
pub mod deadline;
pub mod error;
pub mod event;
pub mod message;
pub mod traits;
pub mod types;

pub use channel::{open_channel, BackgroundEndpoint, Responder, UiEndpoint};
pub use deadline::{spawn_with_deadline, DeadlineError};
pub use error::{AiError, CaptureError, ErrorKind, OcrProviderError, PipelineError};
pub use event::{RunEvent, RunEventKind};
pub use message::{CaptureRequest, CaptureResponse, ChannelMessage};
pub use traits::{AiBackend, DeclineManualInput, ManualInput, OcrProvider};
pub use types::{
    AiConfig, CapturedImage, ImageEncoding, OcrResult, PipelineResult, PipelineState,
    ProviderKind, SelectionRect, MIN_OCR_TEXT_CHARS, MIN_SELECTION_PX,
};
