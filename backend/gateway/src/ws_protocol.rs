//! WebSocket protocol of the whiteboard gateway.
//!
//! Every text frame is `{"event": "<name>", "data": <payload>}`.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use whiteboard_core::{Shape, ShapeUpdate};

pub type ClientId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CursorPosition {
    pub x: f64,
    pub y: f64,
}

/// A cursor position relayed with the id of the client it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CursorRelay {
    pub id: ClientId,
    pub x: f64,
    pub y: f64,
}

/// Client -> server events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ClientEvent {
    /// Free-text instruction for the assistant.
    HandleUserPrompt(String),
    CreateShape(Shape),
    UpdateShape(ShapeUpdate),
    CursorPosition(CursorPosition),
}

/// Server -> client events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ServerEvent {
    /// Every shape on the canvas.
    Snapshot(Vec<Shape>),
    /// Progress of the instruction this client issued; empty once done.
    Updates(String),
    UserEntered(ClientId),
    UserExited(ClientId),
    UpdateShape(Shape),
    CursorPosition(CursorRelay),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_prompt_frame() {
        let event: ClientEvent = serde_json::from_value(json!({
            "event": "handle-user-prompt",
            "data": "draw a red square at the origin"
        }))
        .unwrap();
        assert_eq!(
            event,
            ClientEvent::HandleUserPrompt("draw a red square at the origin".into())
        );
    }

    #[test]
    fn test_update_shape_frame_is_partial() {
        let event: ClientEvent = serde_json::from_value(json!({
            "event": "update-shape",
            "data": {"id": 4, "x": 12.5}
        }))
        .unwrap();
        let ClientEvent::UpdateShape(update) = event else {
            panic!("expected update-shape");
        };
        assert_eq!(update.id, 4);
        assert_eq!(update.patch.x, Some(12.5));
        assert_eq!(update.patch.y, None);
    }

    #[test]
    fn test_server_frames() {
        let snapshot = ServerEvent::Snapshot(vec![Shape::new(1, 0.0, 0.0, 2.0, 2.0)]);
        let value = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(value["event"], "snapshot");
        assert_eq!(value["data"][0]["id"], 1);

        let id = Uuid::new_v4();
        let value = serde_json::to_value(ServerEvent::UserEntered(id)).unwrap();
        assert_eq!(value, json!({"event": "user-entered", "data": id.to_string()}));

        let value = serde_json::to_value(ServerEvent::CursorPosition(CursorRelay {
            id,
            x: 1.0,
            y: 2.0,
        }))
        .unwrap();
        assert_eq!(value["event"], "cursor-position");
        assert_eq!(value["data"]["id"], id.to_string());
    }

    #[test]
    fn test_unknown_event_is_rejected() {
        let parsed = serde_json::from_value::<ClientEvent>(json!({"event": "delete-all", "data": null}));
        assert!(parsed.is_err());
    }
}
