use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{PipelineResult, SelectionRect};

/// Messages exchanged between the UI surface and the background coordinator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ChannelMessage {
    /// UI → background: run the pipeline on this selection
    CaptureArea(CaptureRequest),
    /// Background → UI: the run finished
    CaptureComplete(CaptureResponse),
    /// Background → UI: the run ended at idle without a result
    SelectionDiscarded {
        #[serde(rename = "correlationId")]
        correlation_id: Uuid,
    },
}

/// A capture request from the UI surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureRequest {
    pub correlation_id: Uuid,
    pub coordinates: SelectionRect,
    #[serde(default = "default_pixel_ratio")]
    pub device_pixel_ratio: f64,
}

fn default_pixel_ratio() -> f64 {
    1.0
}

/// The single response to a `CaptureRequest`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureResponse {
    pub correlation_id: Uuid,
    pub result: PipelineResult,
}

impl ChannelMessage {
    pub fn correlation_id(&self) -> Uuid {
        match self {
            ChannelMessage::CaptureArea(r) => r.correlation_id,
            ChannelMessage::CaptureComplete(r) => r.correlation_id,
            ChannelMessage::SelectionDiscarded { correlation_id } => *correlation_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_serialization_roundtrip() {
        let msg = ChannelMessage::CaptureComplete(CaptureResponse {
            correlation_id: Uuid::new_v4(),
            result: PipelineResult::answered("2+2=?", "4"),
        });
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"action\":\"capture_complete\""));
        let back: ChannelMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(back, msg);
    }

    #[test]
    fn test_pixel_ratio_defaults_to_one() {
        let id = Uuid::new_v4();
        let json = format!(
            r#"{{"action":"capture_area","correlationId":"{id}","coordinates":{{"x":1,"y":2,"width":30,"height":40}}}}"#
        );
        let msg: ChannelMessage = serde_json::from_str(&json).unwrap();
        match msg {
            ChannelMessage::CaptureArea(req) => {
                assert_eq!(req.device_pixel_ratio, 1.0);
                assert_eq!(req.coordinates, SelectionRect::new(1, 2, 30, 40));
            }
            other => panic!("unexpected message {other:?}"),
        }
        assert_eq!(
            ChannelMessage::SelectionDiscarded { correlation_id: id }.correlation_id(),
            id
        );
    }
}
