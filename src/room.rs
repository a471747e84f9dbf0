//! A single room: its document, membership, and bounded history.

use std::collections::{HashMap, VecDeque};

use serde::Serialize;

use crate::document::{Document, HistoryEntry, Operation, ValidationError};
use crate::error::ProtocolError;
use crate::presence::Presence;

/// The fixed seed text every new room's document starts from.
pub const WELCOME_DOCUMENT: &str = "// Welcome to the collaborative editor!\n// Start typing to see real-time collaboration in action\n\nconsole.log(\"Hello, collaborative world!\");";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomStats {
    pub id: String,
    pub user_count: usize,
    pub max_users: usize,
    pub document_length: usize,
    pub operation_count: usize,
    pub created_at: i64,
    pub last_activity: i64,
    pub is_active: bool,
}

/// Outcome of a successful `Room::apply_operation` call, carrying
/// everything the caller needs to build broadcasts/acks while still
/// holding the room lock; the snapshot is captured under lock, the
/// network write happens after release.
pub struct AppliedOperation {
    pub operation: Operation,
    pub previous_length: usize,
    pub new_length: usize,
}

pub struct Room {
    pub id: String,
    pub document: Document,
    pub members: HashMap<String, Presence>,
    history: VecDeque<HistoryEntry>,
    history_cap: usize,
    pub created_at: i64,
    pub last_activity: i64,
    pub max_users: usize,
}

impl Room {
    pub fn new(id: String, now: i64, max_users: usize, history_cap: usize) -> Self {
        Self {
            id,
            document: Document::new(WELCOME_DOCUMENT),
            members: HashMap::new(),
            history: VecDeque::with_capacity(history_cap.min(1024)),
            history_cap,
            created_at: now,
            last_activity: now,
            max_users,
        }
    }

    pub fn add_user(&mut self, id: String, name: String, color: String, now: i64) -> Result<Presence, ProtocolError> {
        if self.members.len() >= self.max_users {
            return Err(ProtocolError::RoomFull);
        }
        if name.is_empty() || color.is_empty() {
            return Err(ProtocolError::InvalidUserData);
        }
        let presence = Presence::new(id.clone(), name, color, now);
        self.members.insert(id, presence.clone());
        self.last_activity = now;
        Ok(presence)
    }

    /// Idempotent: bumps `lastActivity` regardless of whether `id` was a
    /// member.
    pub fn remove_user(&mut self, id: &str, now: i64) -> Option<Presence> {
        self.last_activity = now;
        self.members.remove(id)
    }

    pub fn update_user_activity(&mut self, id: &str, now: i64) {
        if let Some(presence) = self.members.get_mut(id) {
            presence.touch(now);
        }
    }

    pub fn update_cursor(&mut self, id: &str, line: u32, column: u32, now: i64) -> bool {
        if let Some(presence) = self.members.get_mut(id) {
            presence.cursor.line = line;
            presence.cursor.column = column;
            presence.touch(now);
            true
        } else {
            false
        }
    }

    pub fn validate_operation(&self, op: &Operation) -> Result<(), ValidationError> {
        op.validate(&self.document)
    }

    /// Precondition: `validate_operation(op)` already returned `Ok`.
    /// Stamps `appliedAt`, applies the effect to the
    /// document, pushes into the bounded (ring-buffer) history, and bumps
    /// `lastActivity`.
    pub fn apply_operation(&mut self, op: Operation, now: i64) -> AppliedOperation {
        let outcome = op.apply(&mut self.document);

        self.history.push_back(HistoryEntry {
            operation: op.clone(),
            applied_at: now,
        });
        while self.history.len() > self.history_cap {
            self.history.pop_front();
        }

        self.last_activity = now;

        AppliedOperation {
            operation: op,
            previous_length: outcome.previous_length,
            new_length: outcome.new_length,
        }
    }

    pub fn user_list(&self, now: i64, active_window_secs: i64) -> Vec<(Presence, bool)> {
        self.members
            .values()
            .map(|p| (p.clone(), p.is_active(now, active_window_secs)))
            .collect()
    }

    /// Last `n` entries of history, oldest first (used by `document-sync`
    /// and by the HTTP introspection surface's `recentOperations`).
    pub fn recent_history(&self, n: usize) -> Vec<HistoryEntry> {
        let len = self.history.len();
        let skip = len.saturating_sub(n);
        self.history.iter().skip(skip).cloned().collect()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// `isActive` here uses the room-level window, distinct from
    /// per-member `Presence::is_active`.
    pub fn stats(&self, now: i64, room_active_window_secs: i64) -> RoomStats {
        RoomStats {
            id: self.id.clone(),
            user_count: self.members.len(),
            max_users: self.max_users,
            document_length: self.document.len(),
            operation_count: self.history.len(),
            created_at: self.created_at,
            last_activity: self.last_activity,
            is_active: now - self.last_activity < room_active_window_secs,
        }
    }

    pub fn should_cleanup(&self, now: i64, idle_timeout_secs: i64) -> bool {
        self.members.is_empty() && now - self.last_activity > idle_timeout_secs
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}
