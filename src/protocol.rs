//! The wire envelope and message payload shapes, plus tolerance for a
//! couple of legacy payload shapes older clients still send. This module
//! only knows about shapes and (de)serialization; `gateway` owns routing
//! and `room`/`registry` own the actual state transitions.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::document::OperationKind;

/// A single frame in either direction: `{ id?, event, payload }`.
/// `id` is empty for broadcasts and for the legacy payload shapes that
/// carried no ack callback.
#[derive(Debug, Clone, Deserialize)]
pub struct InboundEnvelope {
    #[serde(default)]
    pub id: String,
    pub event: String,
    #[serde(default)]
    pub payload: Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct OutboundEnvelope {
    #[serde(skip_serializing_if = "str::is_empty")]
    pub id: String,
    pub event: String,
    pub payload: Value,
}

impl OutboundEnvelope {
    pub fn reply(id: &str, event: &str, payload: Value) -> Self {
        Self {
            id: id.to_string(),
            event: event.to_string(),
            payload,
        }
    }

    pub fn broadcast(event: &str, payload: Value) -> Self {
        Self {
            id: String::new(),
            event: event.to_string(),
            payload,
        }
    }
}

pub mod events {
    pub const CREATE_ROOM: &str = "create-room";
    pub const JOIN_ROOM: &str = "join-room";
    pub const DOCUMENT_OPERATION: &str = "document-operation";
    pub const CURSOR_POSITION: &str = "cursor-position";
    pub const LANGUAGE_CHANGE: &str = "language-change";
    pub const REQUEST_SYNC: &str = "request-sync";

    pub const USER_JOINED: &str = "user-joined";
    pub const USER_LEFT: &str = "user-left";
    pub const DOCUMENT_UPDATE: &str = "document-update";
    pub const OPERATION_ACK: &str = "operation-ack";
    pub const OPERATION_ERROR: &str = "operation-error";
    pub const CURSOR_UPDATE: &str = "cursor-update";
    pub const LANGUAGE_CHANGED: &str = "language-changed";
    pub const DOCUMENT_SYNC: &str = "document-sync";
    pub const SYNC_ERROR: &str = "sync-error";
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateRoomPayload {
    #[serde(rename = "userName", default)]
    pub user_name: Option<String>,
}

/// Parses a `create-room` payload, tolerating the legacy shape where the
/// payload is entirely absent.
pub fn parse_create_room_payload(value: &Value) -> CreateRoomPayload {
    if value.is_null() {
        return CreateRoomPayload::default();
    }
    serde_json::from_value(value.clone()).unwrap_or_default()
}

#[derive(Debug, Clone, Deserialize)]
pub struct JoinRoomPayload {
    #[serde(rename = "roomId")]
    pub room_id: String,
    #[serde(rename = "userName", default)]
    pub user_name: Option<String>,
}

/// Parses a `join-room` payload, tolerating the legacy bare-string shape:
/// a plain JSON string is treated as the room id with no requested user
/// name.
pub fn parse_join_room_payload(value: &Value) -> Option<JoinRoomPayload> {
    if let Some(room_id) = value.as_str() {
        return Some(JoinRoomPayload {
            room_id: room_id.to_string(),
            user_name: None,
        });
    }
    serde_json::from_value(value.clone()).ok()
}

#[derive(Debug, Clone, Deserialize)]
pub struct OperationPayload {
    #[serde(flatten)]
    pub kind: OperationKind,
    #[serde(default)]
    pub id: String,
}

pub fn parse_operation_payload(value: &Value) -> Option<OperationPayload> {
    serde_json::from_value(value.clone()).ok()
}

#[derive(Debug, Clone, Deserialize)]
pub struct LanguageChangePayload {
    pub language: String,
    #[serde(rename = "userId", default)]
    pub user_id: Option<String>,
}

pub fn parse_language_change_payload(value: &Value) -> Option<LanguageChangePayload> {
    serde_json::from_value(value.clone()).ok()
}
