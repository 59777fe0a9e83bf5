use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, Mutex};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::PipelineError;
use crate::message::{CaptureRequest, CaptureResponse, ChannelMessage};
use crate::types::{PipelineResult, SelectionRect};

/// Default channel buffer size for each direction.
const DEFAULT_BUFFER_SIZE: usize = 32;

type Reply = Option<PipelineResult>;
type PendingTable = Arc<Mutex<HashMap<Uuid, oneshot::Sender<Reply>>>>;

/// Open a presentation channel between a UI surface and the background coordinator.
///
/// Must be called inside a Tokio runtime: a dispatcher task routes responses
/// to waiting requests by correlation id.
pub fn open_channel(round_trip_timeout: Duration) -> (UiEndpoint, BackgroundEndpoint) {
    open_channel_with_buffer(DEFAULT_BUFFER_SIZE, round_trip_timeout)
}

pub fn open_channel_with_buffer(
    buffer: usize,
    round_trip_timeout: Duration,
) -> (UiEndpoint, BackgroundEndpoint) {
    let (to_background, from_ui) = mpsc::channel(buffer);
    let (to_ui, from_background) = mpsc::channel(buffer);
    let pending: PendingTable = Arc::new(Mutex::new(HashMap::new()));
    let (alive_tx, alive_rx) = oneshot::channel();

    tokio::spawn(dispatch_responses(from_background, alive_rx, Arc::clone(&pending)));
    info!(buffer_size = buffer, "Presentation channel opened");

    (
        UiEndpoint {
            to_background,
            pending,
            round_trip_timeout,
            _alive: Arc::new(alive_tx),
        },
        BackgroundEndpoint {
            from_ui,
            responder: Responder { to_ui },
        },
    )
}

async fn dispatch_responses(
    mut from_background: mpsc::Receiver<ChannelMessage>,
    mut ui_alive: oneshot::Receiver<()>,
    pending: PendingTable,
) {
    loop {
        let msg = tokio::select! {
            msg = from_background.recv() => match msg {
                Some(msg) => msg,
                None => break,
            },
            _ = &mut ui_alive => {
                debug!("UI surface closed; no further responses can be delivered");
                break;
            }
        };
        let id = msg.correlation_id();
        let reply = match msg {
            ChannelMessage::CaptureComplete(response) => Some(response.result),
            ChannelMessage::SelectionDiscarded { .. } => None,
            ChannelMessage::CaptureArea(_) => {
                warn!(correlation_id = %id, "UI surface ignoring capture request sent to it");
                continue;
            }
        };
        match pending.lock().await.remove(&id) {
            Some(waiter) => {
                if waiter.send(reply).is_err() {
                    debug!(correlation_id = %id, "Requester gave up before the response arrived");
                }
            }
            None => debug!(correlation_id = %id, "Discarding response for unknown or expired request"),
        }
    }

    // Either side is gone: dropping the waiters fails every in-flight request.
    drop(from_background);
    let mut table = pending.lock().await;
    if !table.is_empty() {
        warn!(in_flight = table.len(), "Background context closed with requests in flight");
    }
    table.clear();
}

/// The UI surface's side: sends selections and awaits exactly one result each.
#[derive(Clone)]
pub struct UiEndpoint {
    to_background: mpsc::Sender<ChannelMessage>,
    pending: PendingTable,
    round_trip_timeout: Duration,
    // Dropped with the last UI handle, which stops the dispatcher.
    _alive: Arc<oneshot::Sender<()>>,
}

impl UiEndpoint {
    /// Send a capture request and wait for its result.
    ///
    /// `None` means the background discarded the selection without running.
    /// Delivery failures and missing responses come back as a failed
    /// `PipelineResult` with a channel error rather than hanging.
    pub async fn request(&self, rect: SelectionRect, device_pixel_ratio: f64) -> Option<PipelineResult> {
        let correlation_id = Uuid::new_v4();
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(correlation_id, tx);

        let msg = ChannelMessage::CaptureArea(CaptureRequest {
            correlation_id,
            coordinates: rect,
            device_pixel_ratio,
        });
        if self.to_background.send(msg).await.is_err() {
            self.pending.lock().await.remove(&correlation_id);
            return Some(channel_failure("background context is not listening"));
        }
        debug!(correlation_id = %correlation_id, "Capture request sent");

        match tokio::time::timeout(self.round_trip_timeout, rx).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(_)) => Some(channel_failure("background context closed before responding")),
            Err(_) => {
                self.pending.lock().await.remove(&correlation_id);
                Some(channel_failure(&format!(
                    "no response within {}ms",
                    self.round_trip_timeout.as_millis()
                )))
            }
        }
    }

    /// Number of requests still waiting for a response.
    pub async fn in_flight(&self) -> usize {
        self.pending.lock().await.len()
    }
}

fn channel_failure(detail: &str) -> PipelineResult {
    PipelineResult::failed(&PipelineError::Channel(detail.to_string()), None)
}

/// The background coordinator's side.
pub struct BackgroundEndpoint {
    from_ui: mpsc::Receiver<ChannelMessage>,
    responder: Responder,
}

impl BackgroundEndpoint {
    /// Next capture request, or `None` once every UI handle is dropped.
    pub async fn recv(&mut self) -> Option<CaptureRequest> {
        while let Some(msg) = self.from_ui.recv().await {
            match msg {
                ChannelMessage::CaptureArea(request) => return Some(request),
                other => warn!(
                    correlation_id = %other.correlation_id(),
                    "Background ignoring non-request message"
                ),
            }
        }
        None
    }

    pub fn responder(&self) -> Responder {
        self.responder.clone()
    }
}

/// Sends responses back to the UI; cheap to clone into per-run tasks.
#[derive(Clone)]
pub struct Responder {
    to_ui: mpsc::Sender<ChannelMessage>,
}

impl Responder {
    /// Deliver the outcome of one request. Fails when the UI side is torn down.
    pub async fn deliver(&self, correlation_id: Uuid, reply: Option<PipelineResult>) -> Result<(), PipelineError> {
        let msg = match reply {
            Some(result) => ChannelMessage::CaptureComplete(CaptureResponse { correlation_id, result }),
            None => ChannelMessage::SelectionDiscarded { correlation_id },
        };
        self.to_ui
            .send(msg)
            .await
            .map_err(|_| PipelineError::Channel("UI surface is gone; result discarded".to_string()))
    }
}
