use serde::{Deserialize, Serialize};

/// Incoming WebSocket message from client. Clients only listen; anything they
/// send is acknowledged and dropped.
#[derive(Debug, Deserialize)]
pub struct WebSocketMessage {
    pub action: String,
    #[serde(flatten)]
    pub data: serde_json::Value,
}

/// Broadcast message sent to a hospital's connected clients. Carries the
/// change kind only; clients reload the affected list on receipt.
#[derive(Debug, Serialize)]
pub struct BroadcastMessage {
    pub r#type: String,
    pub hospital_id: String,
    #[serde(flatten)]
    pub data: serde_json::Value,
}

impl BroadcastMessage {
    pub fn new(message_type: &str, hospital_id: &str, data: serde_json::Value) -> Self {
        Self {
            r#type: message_type.to_string(),
            hospital_id: hospital_id.to_string(),
            data,
        }
    }
}
