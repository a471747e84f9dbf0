//! Process-wide room registry.
//!
//! The registry mutex guards only the `id -> Room` map itself; each Room is
//! independently guarded by its own mutex. A session only ever holds a
//! room id, never a `MutexGuard` across an await point or a network
//! write.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::error::ProtocolError;
use crate::identifiers::{generate_room_id, is_valid_room_id};
use crate::room::Room;

pub type SharedRoom = Arc<Mutex<Room>>;

pub struct Registry {
    rooms: Mutex<HashMap<String, SharedRoom>>,
    max_users_per_room: usize,
    history_cap: usize,
}

impl Registry {
    pub fn new(max_users_per_room: usize, history_cap: usize) -> Self {
        Self {
            rooms: Mutex::new(HashMap::new()),
            max_users_per_room,
            history_cap,
        }
    }

    /// Allocates a fresh id (retrying on the astronomically unlikely
    /// collision), constructs the Room with the welcome document, and
    /// inserts it. Does not add a participant; the `create-room` handler
    /// joins its own session afterward.
    pub fn create(&self, now: i64) -> SharedRoom {
        let mut rooms = self.rooms.lock().unwrap_or_else(|e| e.into_inner());
        let id = loop {
            let candidate = generate_room_id();
            if !rooms.contains_key(&candidate) {
                break candidate;
            }
        };
        let room = Arc::new(Mutex::new(Room::new(
            id.clone(),
            now,
            self.max_users_per_room,
            self.history_cap,
        )));
        rooms.insert(id, room.clone());
        room
    }

    /// Room ids are case-insensitive, uppercased before lookup. Also
    /// rejects ids that fail the lexical rule before ever touching the
    /// map.
    pub fn lookup(&self, id: &str) -> Result<SharedRoom, ProtocolError> {
        let normalized = id.to_uppercase();
        if !is_valid_room_id(&normalized) {
            return Err(ProtocolError::InvalidRoomIdFormat);
        }
        let rooms = self.rooms.lock().unwrap_or_else(|e| e.into_inner());
        rooms
            .get(&normalized)
            .cloned()
            .ok_or(ProtocolError::RoomNotFound)
    }

    /// Unlinks a room. Called when its last member leaves, or by `sweep`.
    pub fn remove(&self, id: &str) {
        let mut rooms = self.rooms.lock().unwrap_or_else(|e| e.into_inner());
        rooms.remove(&id.to_uppercase());
    }

    /// All rooms currently registered, for the `GET /health` surface and
    /// for `sweep`. Cloning the `Arc`s is cheap; the caller then locks
    /// each room independently.
    pub fn all_rooms(&self) -> Vec<SharedRoom> {
        let rooms = self.rooms.lock().unwrap_or_else(|e| e.into_inner());
        rooms.values().cloned().collect()
    }

    pub fn get(&self, id: &str) -> Option<SharedRoom> {
        let rooms = self.rooms.lock().unwrap_or_else(|e| e.into_inner());
        rooms.get(&id.to_uppercase()).cloned()
    }

    pub fn room_count(&self) -> usize {
        self.rooms.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Removes any room satisfying
    /// `members.empty ∧ (now - lastActivity) > idle_timeout`. The registry
    /// lock must not be held while waiting on a per-room lock
    /// indefinitely, so per-room locks are tried non-blockingly here; a
    /// room mid-operation is simply skipped for this sweep and caught on
    /// the next one.
    pub fn sweep(&self, now: i64, idle_timeout_secs: i64) -> Vec<String> {
        let mut removed = Vec::new();
        let mut rooms = self.rooms.lock().unwrap_or_else(|e| e.into_inner());
        rooms.retain(|id, room| {
            let should_remove = match room.try_lock() {
                Ok(guard) => guard.should_cleanup(now, idle_timeout_secs),
                Err(_) => false,
            };
            if should_remove {
                removed.push(id.clone());
            }
            !should_remove
        });
        removed
    }
}
