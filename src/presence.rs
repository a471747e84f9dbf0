//! Per-member presence records.

use serde::{Deserialize, Serialize};

/// Window within which a member counts as actively present. Configurable
/// via `config::ServerConfig`; this constant is the default used wherever
/// no config is threaded through (e.g. plain unit tests).
pub const DEFAULT_ACTIVE_WINDOW_SECS: i64 = 30;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CursorPosition {
    pub line: u32,
    pub column: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Presence {
    pub id: String,
    pub name: String,
    pub color: String,
    #[serde(default)]
    pub cursor: CursorPosition,
    pub joined_at: i64,
    pub last_seen: i64,
}

/// `Presence` plus its derived `isActive` flag, the shape actually put on
/// the wire in a `users` list (`isActive` is derived, never stored).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceView<'a> {
    #[serde(flatten)]
    pub presence: &'a Presence,
    pub is_active: bool,
}

impl Presence {
    pub fn new(id: String, name: String, color: String, now: i64) -> Self {
        Self {
            id,
            name,
            color,
            cursor: CursorPosition::default(),
            joined_at: now,
            last_seen: now,
        }
    }

    /// `isActive = now - lastSeen < active_window`.
    pub fn is_active(&self, now: i64, active_window_secs: i64) -> bool {
        now - self.last_seen < active_window_secs
    }

    pub fn touch(&mut self, now: i64) {
        self.last_seen = now;
    }

    /// The wire view of this presence: itself plus the derived `isActive`
    /// flag, as put into a `users` list or a `user-joined`/`cursor-update`
    /// payload.
    pub fn to_view(&self, is_active: bool) -> PresenceView<'_> {
        PresenceView {
            presence: self,
            is_active,
        }
    }
}
