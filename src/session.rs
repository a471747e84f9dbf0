//! Per-connection session state and message dispatch.
//!
//! A `Session` holds at most one room binding and owns no transport itself:
//! `gateway` drives the actual socket, calls `Session::dispatch` for every
//! inbound frame, and separately filters the `events::EventBus` broadcast
//! stream against `current_room_id`/`id` before writing to the wire. This
//! keeps every state transition in this module pure and unit-testable
//! without a real socket.

use serde_json::{json, Value};

use crate::config::ServerConfig;
use crate::document::Operation;
use crate::error::ProtocolError;
use crate::events::{EventBus, RoomEvent};
use crate::identifiers::{allocate_name, ColorAllocator};
use crate::presence::Presence;
use crate::protocol::{self, events as ev, InboundEnvelope, OutboundEnvelope};
use crate::registry::Registry;
use crate::room::Room;

fn presence_json(presence: &Presence, is_active: bool) -> Value {
    serde_json::to_value(presence.to_view(is_active)).unwrap_or(Value::Null)
}

pub struct Session {
    pub id: String,
    pub current_room_id: Option<String>,
}

impl Session {
    pub fn new(id: String) -> Self {
        Self {
            id,
            current_room_id: None,
        }
    }

    /// Dispatches one inbound envelope. Returns the direct
    /// reply addressed to this session, if the message produces one.
    /// Broadcasts to other members are published to `events` before this
    /// returns, never after — there is no further I/O once `dispatch`
    /// hands control back to `gateway`.
    pub fn dispatch(
        &mut self,
        envelope: InboundEnvelope,
        registry: &Registry,
        events: &EventBus,
        colors: &ColorAllocator,
        config: &ServerConfig,
        now: i64,
    ) -> Option<OutboundEnvelope> {
        match envelope.event.as_str() {
            ev::CREATE_ROOM => Some(self.handle_create_room(
                &envelope.id,
                &envelope.payload,
                registry,
                colors,
                config,
                now,
            )),
            ev::JOIN_ROOM => Some(self.handle_join_room(
                &envelope.id,
                &envelope.payload,
                registry,
                events,
                colors,
                config,
                now,
            )),
            ev::DOCUMENT_OPERATION => {
                self.handle_document_operation(&envelope.payload, registry, events, now)
            }
            ev::CURSOR_POSITION => {
                self.handle_cursor_position(&envelope.payload, registry, events, now);
                None
            }
            ev::LANGUAGE_CHANGE => {
                self.handle_language_change(&envelope.payload, registry, events, now);
                None
            }
            ev::REQUEST_SYNC => Some(self.handle_request_sync(&envelope.id, registry, now)),
            other => {
                log::warn!("session {}: ignoring unknown event {other:?}", self.id);
                None
            }
        }
    }

    /// Creates a fresh room and auto-joins its own creator to it.
    fn handle_create_room(
        &mut self,
        msg_id: &str,
        payload: &Value,
        registry: &Registry,
        colors: &ColorAllocator,
        config: &ServerConfig,
        now: i64,
    ) -> OutboundEnvelope {
        let parsed = protocol::parse_create_room_payload(payload);
        let room = registry.create(now);

        let (room_id, presence, stats, document, users) = {
            let mut guard = room.lock().unwrap_or_else(|e| e.into_inner());
            let name = parsed
                .user_name
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| allocate_name(guard.members.len()));
            let color = colors.next_color().to_string();
            let presence = guard
                .add_user(self.id.clone(), name, color, now)
                .expect("a freshly created room cannot be full or hold invalid seed data");
            let stats = guard.stats(now, config.room_stats_active_window_secs);
            let document = guard.document.text();
            let users: Vec<Value> = guard
                .user_list(now, config.presence_active_window_secs)
                .iter()
                .map(|(p, active)| presence_json(p, *active))
                .collect();
            (guard.id.clone(), presence, stats, document, users)
        };

        self.current_room_id = Some(room_id.clone());
        log::info!("room {room_id} created by session {}", self.id);

        OutboundEnvelope::reply(
            msg_id,
            "create-room-ack",
            json!({
                "success": true,
                "roomId": room_id,
                "document": document,
                "users": users,
                "user": presence_json(&presence, true),
                "roomStats": stats,
            }),
        )
    }

    /// Handles idempotent rejoin, cross-room conflict, and the normal
    /// join path, in that precedence order.
    fn handle_join_room(
        &mut self,
        msg_id: &str,
        payload: &Value,
        registry: &Registry,
        events: &EventBus,
        colors: &ColorAllocator,
        config: &ServerConfig,
        now: i64,
    ) -> OutboundEnvelope {
        let Some(parsed) = protocol::parse_join_room_payload(payload) else {
            return OutboundEnvelope::reply(
                msg_id,
                "join-room-error",
                json!({"success": false, "error": ProtocolError::InvalidRoomIdFormat.as_wire_str()}),
            );
        };

        if let Some(current) = self.current_room_id.clone() {
            if current.eq_ignore_ascii_case(&parsed.room_id) {
                let room = registry
                    .get(&current)
                    .expect("session's current room vanished from the registry");
                let guard = room.lock().unwrap_or_else(|e| e.into_inner());
                return self.join_ack(msg_id, &guard, config, now);
            }
            return OutboundEnvelope::reply(
                msg_id,
                "join-room-error",
                json!({"success": false, "error": ProtocolError::AlreadyInADifferentRoom.as_wire_str()}),
            );
        }

        let room = match registry.lookup(&parsed.room_id) {
            Ok(room) => room,
            Err(e) => {
                return OutboundEnvelope::reply(
                    msg_id,
                    "join-room-error",
                    json!({"success": false, "error": e.as_wire_str()}),
                )
            }
        };

        let (room_id, presence, user_count) = {
            let mut guard = room.lock().unwrap_or_else(|e| e.into_inner());
            let name = parsed
                .user_name
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| allocate_name(guard.members.len()));
            let color = colors.next_color().to_string();
            let presence = match guard.add_user(self.id.clone(), name, color, now) {
                Ok(p) => p,
                Err(e) => {
                    return OutboundEnvelope::reply(
                        msg_id,
                        "join-room-error",
                        json!({"success": false, "error": e.as_wire_str()}),
                    )
                }
            };
            (guard.id.clone(), presence, guard.members.len())
        };

        self.current_room_id = Some(room_id.clone());

        events.publish(RoomEvent {
            room_id: room_id.clone(),
            except_session: Some(self.id.clone()),
            envelope: OutboundEnvelope::broadcast(
                ev::USER_JOINED,
                json!({"user": presence_json(&presence, true), "userCount": user_count}),
            ),
        });

        let guard = room.lock().unwrap_or_else(|e| e.into_inner());
        self.join_ack(msg_id, &guard, config, now)
    }

    /// Shared success-reply builder for both the fresh join and the
    /// idempotent-rejoin path; the only difference between them is whether
    /// `add_user` ran, which the caller has already decided by this point.
    fn join_ack(&self, msg_id: &str, room: &Room, config: &ServerConfig, now: i64) -> OutboundEnvelope {
        let stats = room.stats(now, config.room_stats_active_window_secs);
        let document = room.document.text();
        let users: Vec<Value> = room
            .user_list(now, config.presence_active_window_secs)
            .iter()
            .map(|(p, active)| presence_json(p, *active))
            .collect();
        let user = room
            .members
            .get(&self.id)
            .map(|p| presence_json(p, true))
            .unwrap_or(Value::Null);
        let document_version = stats.operation_count;

        OutboundEnvelope::reply(
            msg_id,
            "join-room-ack",
            json!({
                "success": true,
                "document": document,
                "users": users,
                "user": user,
                "roomStats": stats,
                "documentVersion": document_version,
            }),
        )
    }

    /// Validates and applies a document operation. Returns the
    /// `operation-ack` or `operation-error` addressed back to this
    /// session; any
    /// `document-update` to the rest of the room is published to `events`
    /// before this returns.
    fn handle_document_operation(
        &mut self,
        payload: &Value,
        registry: &Registry,
        events: &EventBus,
        now: i64,
    ) -> Option<OutboundEnvelope> {
        let room_id = self.current_room_id.clone()?;
        let room = registry.get(&room_id)?;

        let Some(parsed) = protocol::parse_operation_payload(payload) else {
            let operation_id = payload.get("id").and_then(|v| v.as_str()).map(str::to_string);
            return Some(OutboundEnvelope::broadcast(
                ev::OPERATION_ERROR,
                json!({
                    "error": ProtocolError::InvalidOperation.as_wire_str(),
                    "operation": payload,
                    "operationId": operation_id,
                }),
            ));
        };

        let operation_id = parsed.id.clone();
        let operation = Operation {
            kind: parsed.kind,
            id: parsed.id,
            user_id: self.id.clone(),
            timestamp: now,
            room_id: room_id.clone(),
        };

        // validate -> apply -> publish all happen under the room lock, so the
        // broadcast enqueue order matches the apply order; `events.publish`
        // is a non-blocking in-memory send, not the transport write or
        // timer wait that the room lock must never be held across.
        let outcome = {
            let mut guard = room.lock().unwrap_or_else(|e| e.into_inner());
            match guard.validate_operation(&operation) {
                Ok(()) => {
                    let applied = guard.apply_operation(operation.clone(), now).operation;
                    events.publish(RoomEvent {
                        room_id: room_id.clone(),
                        except_session: Some(self.id.clone()),
                        envelope: OutboundEnvelope::broadcast(
                            ev::DOCUMENT_UPDATE,
                            serde_json::to_value(&applied).unwrap_or(Value::Null),
                        ),
                    });
                    Ok(applied)
                }
                Err(e) => Err(ProtocolError::from(e)),
            }
        };

        match outcome {
            Ok(applied) => Some(OutboundEnvelope::broadcast(
                ev::OPERATION_ACK,
                json!({"success": true, "operationId": operation_id, "operation": applied}),
            )),
            Err(err) => {
                log::warn!(
                    "session {} rejected operation {operation_id} in room {room_id}: {err}",
                    self.id
                );
                Some(OutboundEnvelope::broadcast(
                    ev::OPERATION_ERROR,
                    json!({"error": err.as_wire_str(), "operation": operation, "operationId": operation_id}),
                ))
            }
        }
    }

    /// `cursor-position` has no validation, no ack, and no ordering
    /// relationship to `document-update`; cursor drift is accepted.
    fn handle_cursor_position(&mut self, payload: &Value, registry: &Registry, events: &EventBus, now: i64) {
        let Some(room_id) = self.current_room_id.clone() else {
            return;
        };
        let Some(room) = registry.get(&room_id) else {
            return;
        };
        let line = payload.get("line").and_then(Value::as_u64).unwrap_or(0) as u32;
        let column = payload.get("column").and_then(Value::as_u64).unwrap_or(0) as u32;

        let user = {
            let mut guard = room.lock().unwrap_or_else(|e| e.into_inner());
            if !guard.update_cursor(&self.id, line, column, now) {
                return;
            }
            guard.members.get(&self.id).cloned()
        };
        let Some(user) = user else {
            return;
        };

        events.publish(RoomEvent {
            room_id,
            except_session: Some(self.id.clone()),
            envelope: OutboundEnvelope::broadcast(
                ev::CURSOR_UPDATE,
                json!({
                    "userId": self.id,
                    "position": {"line": line, "column": column},
                    "user": presence_json(&user, true),
                }),
            ),
        });
    }

    /// `language-change` is a no-ack broadcast, not a document mutation.
    /// `userId` may be supplied by the sender (historically the
    /// driving editor's active user) or defaults to this session.
    fn handle_language_change(&mut self, payload: &Value, registry: &Registry, events: &EventBus, now: i64) {
        let Some(room_id) = self.current_room_id.clone() else {
            return;
        };
        let Some(room) = registry.get(&room_id) else {
            return;
        };
        let Some(parsed) = protocol::parse_language_change_payload(payload) else {
            return;
        };

        let user_id = parsed.user_id.unwrap_or_else(|| self.id.clone());
        let user_name = {
            let mut guard = room.lock().unwrap_or_else(|e| e.into_inner());
            guard.update_user_activity(&self.id, now);
            guard.members.get(&user_id).map(|p| p.name.clone())
        };

        events.publish(RoomEvent {
            room_id,
            except_session: Some(self.id.clone()),
            envelope: OutboundEnvelope::broadcast(
                ev::LANGUAGE_CHANGED,
                json!({"userId": user_id, "language": parsed.language, "userName": user_name}),
            ),
        });
    }

    /// Unbound sessions and vanished rooms both report `sync-error` with
    /// `"Room not found"`.
    fn handle_request_sync(&mut self, msg_id: &str, registry: &Registry, now: i64) -> OutboundEnvelope {
        let room = self.current_room_id.as_deref().and_then(|id| registry.get(id));
        let Some(room) = room else {
            return OutboundEnvelope::reply(
                msg_id,
                ev::SYNC_ERROR,
                json!({"error": ProtocolError::RoomNotFound.as_wire_str()}),
            );
        };

        let guard = room.lock().unwrap_or_else(|e| e.into_inner());
        OutboundEnvelope::reply(
            msg_id,
            ev::DOCUMENT_SYNC,
            json!({
                "document": guard.document.text(),
                "version": guard.history_len(),
                "operations": guard.recent_history(50),
                "timestamp": now,
            }),
        )
    }

    /// On disconnect, leaves the bound room (if any), broadcasts
    /// `user-left` to the remaining members, and asks the registry to
    /// remove the room if it is now empty.
    pub fn disconnect(&mut self, registry: &Registry, events: &EventBus, now: i64) {
        let Some(room_id) = self.current_room_id.take() else {
            return;
        };
        let Some(room) = registry.get(&room_id) else {
            return;
        };

        let is_empty = {
            let mut guard = room.lock().unwrap_or_else(|e| e.into_inner());
            guard.remove_user(&self.id, now);
            guard.is_empty()
        };

        events.publish(RoomEvent {
            room_id: room_id.clone(),
            except_session: None,
            envelope: OutboundEnvelope::broadcast(ev::USER_LEFT, json!(self.id)),
        });

        if is_empty {
            registry.remove(&room_id);
            log::info!("room {room_id} removed: empty after disconnect");
        }
    }
}
