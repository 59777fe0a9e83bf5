use std::sync::Arc;

use tracing::{debug, info, warn};

use snapsolve_core::BackgroundEndpoint;

use crate::orchestrator::{Orchestrator, Selection};

/// Answer capture requests from the UI until every UI handle is dropped.
///
/// Each request runs on its own task, so a slow run does not hold up the next.
pub async fn serve(orchestrator: Arc<Orchestrator>, mut endpoint: BackgroundEndpoint) {
    info!("Pipeline service started");
    while let Some(request) = endpoint.recv().await {
        let orchestrator = Arc::clone(&orchestrator);
        let responder = endpoint.responder();
        tokio::spawn(async move {
            let correlation_id = request.correlation_id;
            debug!(correlation_id = %correlation_id, "Capture request received");
            let report = orchestrator
                .handle(Selection::Area {
                    rect: request.coordinates,
                    device_pixel_ratio: request.device_pixel_ratio,
                })
                .await;
            if let Err(e) = responder.deliver(correlation_id, report.result).await {
                warn!(correlation_id = %correlation_id, run_id = %report.run_id, error = %e, "Result not delivered");
            }
        });
    }
    info!("Pipeline service stopped: UI surface closed");
}
