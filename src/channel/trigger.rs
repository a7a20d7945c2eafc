// src/channel/trigger.rs
//! Wire format of the update trigger: `{"trigger":"update","timestamp":"<RFC 3339>"}`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const UPDATE_KIND: &str = "update";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateTrigger {
    #[serde(rename = "trigger")]
    pub kind: String,
    #[serde(rename = "timestamp", default, skip_serializing_if = "Option::is_none")]
    pub issued_at: Option<DateTime<Utc>>,
}

impl UpdateTrigger {
    pub fn now() -> Self {
        Self {
            kind: UPDATE_KIND.to_string(),
            issued_at: Some(Utc::now()),
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        // Serializing a struct of a String and a timestamp cannot fail.
        serde_json::to_vec(self).unwrap_or_default()
    }
}

/// What the consumer should do with one channel payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerMessage {
    Update(UpdateTrigger),
    /// Decoded, but `trigger` names something other than `update`.
    Foreign(String),
    /// Not JSON, or JSON without a string `trigger` field.
    Malformed(String),
}

pub fn decode_trigger(payload: &[u8]) -> TriggerMessage {
    match serde_json::from_slice::<UpdateTrigger>(payload) {
        Ok(t) if t.kind == UPDATE_KIND => TriggerMessage::Update(t),
        Ok(t) => TriggerMessage::Foreign(t.kind),
        Err(e) => TriggerMessage::Malformed(e.to_string()),
    }
}
