//! Error kinds surfaced across the protocol and HTTP surfaces. Every
//! variant's `Display` is the exact user-visible wire string; nothing
//! richer is ever sent to a client. Server-side detail, if any, belongs in
//! a `log::warn!`/`log::error!` call at the call site, not in this type.

use thiserror::Error;

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Invalid room ID format")]
    InvalidRoomIdFormat,
    #[error("Room not found")]
    RoomNotFound,
    #[error("Already in a different room")]
    AlreadyInADifferentRoom,
    #[error("Room is full")]
    RoomFull,
    #[error("Invalid user data")]
    InvalidUserData,
    #[error("Invalid operation")]
    InvalidOperation,
}

impl ProtocolError {
    /// The exact wire string (identical to `Display`, exposed so call
    /// sites that build JSON payloads don't need to route through
    /// `to_string()` / `format!` at every use).
    pub fn as_wire_str(&self) -> &'static str {
        match self {
            ProtocolError::InvalidRoomIdFormat => "Invalid room ID format",
            ProtocolError::RoomNotFound => "Room not found",
            ProtocolError::AlreadyInADifferentRoom => "Already in a different room",
            ProtocolError::RoomFull => "Room is full",
            ProtocolError::InvalidUserData => "Invalid user data",
            ProtocolError::InvalidOperation => "Invalid operation",
        }
    }
}

impl From<crate::document::ValidationError> for ProtocolError {
    fn from(_: crate::document::ValidationError) -> Self {
        ProtocolError::InvalidOperation
    }
}
